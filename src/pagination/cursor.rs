//! Cursor paginator
//!
//! Reads the next-page token from each successful response body.

use super::types::PaginationState;
use crate::decode::extract_jsonpath;
use crate::error::{Error, Result};
use serde_json::Value;
use tracing::debug;

/// Where X API responses carry the next-page token
pub const DEFAULT_CURSOR_PATH: &str = "meta.next_token";

/// Cursor-based paginator (`Active` until the response has no next token)
#[derive(Debug, Clone)]
pub struct CursorPaginator {
    cursor_path: String,
    state: PaginationState,
}

impl Default for CursorPaginator {
    fn default() -> Self {
        Self::new(DEFAULT_CURSOR_PATH)
    }
}

impl CursorPaginator {
    /// Create a paginator reading the cursor at `cursor_path`
    pub fn new(cursor_path: impl Into<String>) -> Self {
        Self {
            cursor_path: cursor_path.into(),
            state: PaginationState::new(),
        }
    }

    /// Whether another page may be requested
    pub fn has_more(&self) -> bool {
        !self.state.finished
    }

    /// Whether pagination has ended
    pub fn finished(&self) -> bool {
        self.state.finished
    }

    /// Cursor for the next request; `None` for the first page
    pub fn current_value(&self) -> Option<&str> {
        self.state.cursor.as_deref()
    }

    /// Current state snapshot
    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    /// Advance from a successful response body.
    ///
    /// A present, non-empty token becomes the current cursor. A missing or
    /// empty token finishes pagination. A token equal to the current one
    /// would re-request the same page forever, so it is an error.
    pub fn advance(&mut self, body: &Value) -> Result<()> {
        if self.state.finished {
            return Ok(());
        }

        match extract_jsonpath(body, &self.cursor_path).filter(|t| !t.is_empty()) {
            Some(token) => {
                if self.state.cursor.as_deref() == Some(token.as_str()) {
                    return Err(Error::PaginationLoop { token });
                }
                debug!("Next page cursor: {}", token);
                self.state.set_cursor(token);
            }
            None => {
                debug!("No cursor at '{}', pagination finished", self.cursor_path);
                self.state.mark_finished();
            }
        }

        Ok(())
    }
}
