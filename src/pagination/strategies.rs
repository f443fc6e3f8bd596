//! Pagination strategy implementations
//!
//! Each strategy handles one of the conventions found across Klaviyo
//! endpoint families.

use super::types::{NextPage, PaginationCursor, PaginationKind, PaginationState, Paginator};
use crate::error::{Error, Result};
use crate::types::{JsonValue, OptionStringExt, Params};
use std::sync::Arc;
use tracing::warn;

/// Page size of offset paginated endpoints
pub const OFFSET_PAGE_SIZE: u32 = 100;

/// Page size of page/count paginated endpoints
pub const PAGE_COUNT_PAGE_SIZE: u32 = 10;

/// Hard ceiling on page/count iterations
pub const DEFAULT_MAX_PAGES: u32 = 10_000;

impl PaginationKind {
    /// Build the default strategy for this convention
    pub fn paginator(self) -> Arc<dyn Paginator> {
        match self {
            Self::Cursor => Arc::new(CursorPaginator::new()),
            Self::Offset => Arc::new(OffsetPaginator::new(OFFSET_PAGE_SIZE)),
            Self::PageCount => Arc::new(PageCountPaginator::new(PAGE_COUNT_PAGE_SIZE)),
        }
    }
}

// ============================================================================
// Cursor Pagination
// ============================================================================

/// JSON:API cursor pagination
///
/// Reads `links.next` and passes it back as `page_cursor`.
#[derive(Debug, Clone)]
pub struct CursorPaginator {
    /// Parameter name carrying the cursor
    pub cursor_param: String,
}

impl Default for CursorPaginator {
    fn default() -> Self {
        Self {
            cursor_param: "page_cursor".to_string(),
        }
    }
}

impl CursorPaginator {
    /// Create a new cursor paginator
    pub fn new() -> Self {
        Self::default()
    }
}

impl Paginator for CursorPaginator {
    fn kind(&self) -> PaginationKind {
        PaginationKind::Cursor
    }

    fn initial_params(&self) -> Params {
        Params::new()
    }

    fn next_params(&self, cursor: &PaginationCursor) -> Params {
        let mut params = Params::new();
        if let PaginationCursor::NextLink(link) = cursor {
            params.insert(self.cursor_param.clone(), link.clone());
        }
        params
    }

    fn process_response(
        &self,
        body: &JsonValue,
        records_count: usize,
        state: &mut PaginationState,
    ) -> Result<NextPage> {
        state.add_page(records_count);

        let next = body
            .pointer("/links/next")
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .none_if_empty();

        match next {
            Some(link) => {
                let cursor = PaginationCursor::NextLink(link);
                state.advance(cursor.clone());
                Ok(NextPage::Continue(cursor))
            }
            None => {
                state.mark_done();
                Ok(NextPage::Done)
            }
        }
    }
}

// ============================================================================
// Offset Pagination
// ============================================================================

/// Legacy offset-token pagination
///
/// Every call carries `count`; the `next_offset` of a response becomes the
/// `offset` of the next call.
#[derive(Debug, Clone)]
pub struct OffsetPaginator {
    /// Records per page
    pub page_size: u32,
}

impl OffsetPaginator {
    /// Create a new offset paginator
    pub fn new(page_size: u32) -> Self {
        Self { page_size }
    }
}

impl Paginator for OffsetPaginator {
    fn kind(&self) -> PaginationKind {
        PaginationKind::Offset
    }

    fn initial_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("count".to_string(), self.page_size.to_string());
        params
    }

    fn next_params(&self, cursor: &PaginationCursor) -> Params {
        let mut params = self.initial_params();
        if let PaginationCursor::NextOffset(offset) = cursor {
            params.insert("offset".to_string(), offset.clone());
        }
        params
    }

    fn process_response(
        &self,
        body: &JsonValue,
        records_count: usize,
        state: &mut PaginationState,
    ) -> Result<NextPage> {
        state.add_page(records_count);

        // A null token has no offset to send; following it would restart at
        // the first page, so it ends pagination like an absent key.
        let token = match body.get("next_offset") {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(s)) => Some(s.clone()),
            Some(JsonValue::Number(n)) => Some(n.to_string()),
            Some(other) => {
                return Err(Error::decode(format!(
                    "next_offset is neither a string nor a number: {other}"
                )))
            }
        };

        match token {
            Some(offset) => {
                let cursor = PaginationCursor::NextOffset(offset);
                state.advance(cursor.clone());
                Ok(NextPage::Continue(cursor))
            }
            None => {
                state.mark_done();
                Ok(NextPage::Done)
            }
        }
    }
}

// ============================================================================
// Page/Count Pagination
// ============================================================================

/// Legacy page/count pagination
///
/// Pages are 0-based. Iteration stops once `total <= (page + 1) * count`.
/// A wrong `total` would never satisfy that, so an empty page ends the
/// sequence and more than `max_pages` pages is an error.
#[derive(Debug, Clone)]
pub struct PageCountPaginator {
    /// Records per page
    pub page_size: u32,
    /// Iteration ceiling
    pub max_pages: u32,
}

impl PageCountPaginator {
    /// Create a new page/count paginator
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Set the iteration ceiling
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    fn params_for(&self, page: u32) -> Params {
        let mut params = Params::new();
        params.insert("page".to_string(), page.to_string());
        params.insert("count".to_string(), self.page_size.to_string());
        params
    }
}

impl Paginator for PageCountPaginator {
    fn kind(&self) -> PaginationKind {
        PaginationKind::PageCount
    }

    fn initial_params(&self) -> Params {
        self.params_for(0)
    }

    fn next_params(&self, cursor: &PaginationCursor) -> Params {
        match cursor {
            PaginationCursor::PageIndex { page, .. } => self.params_for(*page),
            _ => self.initial_params(),
        }
    }

    fn process_response(
        &self,
        body: &JsonValue,
        records_count: usize,
        state: &mut PaginationState,
    ) -> Result<NextPage> {
        state.add_page(records_count);

        let total = body
            .get("total")
            .and_then(JsonValue::as_u64)
            .ok_or_else(|| Error::decode("page/count response has no numeric 'total'"))?;

        let covered = u64::from(state.page + 1) * u64::from(self.page_size);
        if total <= covered {
            state.mark_done();
            return Ok(NextPage::Done);
        }

        if records_count == 0 {
            warn!(
                "Page {} came back empty although total is {}, stopping",
                state.page, total
            );
            state.mark_done();
            return Ok(NextPage::Done);
        }

        let next = state.page + 1;
        if next >= self.max_pages {
            return Err(Error::PaginationLimit {
                max_pages: self.max_pages,
            });
        }

        let cursor = PaginationCursor::PageIndex { page: next, total };
        state.advance(cursor.clone());
        Ok(NextPage::Continue(cursor))
    }
}
