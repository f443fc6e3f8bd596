//! Pagination module
//!
//! Supports: Cursor (`links.next`), Offset (`next_offset`), Page/Count (`total`)
//!
//! # Overview
//!
//! Klaviyo endpoint families disagree on how to page. Each convention is a
//! [`Paginator`]; [`paginate`] turns any of them into the same lazy stream of
//! page data so callers never care which one an endpoint uses.

mod strategies;
mod stream;
mod types;

pub use strategies::{
    CursorPaginator, OffsetPaginator, PageCountPaginator, DEFAULT_MAX_PAGES, OFFSET_PAGE_SIZE,
    PAGE_COUNT_PAGE_SIZE,
};
pub use stream::{page_records, paginate, PageStream};
pub use types::{NextPage, PaginationCursor, PaginationKind, PaginationState, Paginator};
