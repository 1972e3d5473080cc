//! Pagination state
//!
//! The state a cursor paginator carries between pages.

/// Tracks pagination state during one extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationState {
    /// Cursor to send with the next request (`None` before the first page)
    pub cursor: Option<String>,
    /// Set once the API reports no further pages; never cleared
    pub finished: bool,
}

impl PaginationState {
    /// Create a new pagination state
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark pagination as complete
    pub fn mark_finished(&mut self) {
        self.finished = true;
    }

    /// Set cursor
    pub fn set_cursor(&mut self, cursor: String) {
        self.cursor = Some(cursor);
    }
}
