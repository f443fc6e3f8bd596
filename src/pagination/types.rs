//! Pagination types and traits
//!
//! Defines the core pagination abstractions used by all strategies.

use crate::error::Result;
use crate::types::{JsonValue, Params};
use serde::{Deserialize, Serialize};

/// Continuation metadata taken from a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationCursor {
    /// `links.next` of a JSON:API page
    NextLink(String),
    /// `next_offset` token of a legacy offset page
    NextOffset(String),
    /// Next page index, with the total the API reported
    PageIndex { page: u32, total: u64 },
}

/// Result of the next page computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// More pages available from this cursor
    Continue(PaginationCursor),
    /// No more pages
    Done,
}

impl NextPage {
    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Check if this is a continue result
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }
}

/// The pagination convention an endpoint family uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationKind {
    /// Follow `links.next` through `page_cursor`
    Cursor,
    /// Follow `next_offset` through `offset`
    Offset,
    /// Count `page` up until `total` is covered
    PageCount,
}

/// Tracks pagination state during iteration
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// Index of the page being processed (0-based)
    pub page: u32,
    /// Pages fetched so far
    pub pages_fetched: u32,
    /// Records fetched so far
    pub records_fetched: u64,
    /// Most recent continuation cursor
    pub cursor: Option<PaginationCursor>,
    /// Is pagination complete?
    pub done: bool,
}

impl PaginationState {
    /// Create a new pagination state
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one fetched page
    pub fn add_page(&mut self, records: usize) {
        self.pages_fetched += 1;
        self.records_fetched += records as u64;
    }

    /// Remember the cursor for the next call
    pub fn advance(&mut self, cursor: PaginationCursor) {
        if let PaginationCursor::PageIndex { page, .. } = cursor {
            self.page = page;
        }
        self.cursor = Some(cursor);
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self) {
        self.cursor = None;
        self.done = true;
    }
}

/// Core trait for pagination strategies
pub trait Paginator: Send + Sync {
    /// Convention implemented by this strategy
    fn kind(&self) -> PaginationKind;

    /// Parameters for the first request
    fn initial_params(&self) -> Params;

    /// Parameters for the request following `cursor`
    fn next_params(&self, cursor: &PaginationCursor) -> Params;

    /// Process a response and determine if there's a next page
    fn process_response(
        &self,
        body: &JsonValue,
        records_count: usize,
        state: &mut PaginationState,
    ) -> Result<NextPage>;
}
