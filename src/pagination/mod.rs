//! Pagination module
//!
//! Cursor (next-token) pagination for APIs that return the token for the
//! following page inside the response body, e.g. `meta.next_token`.
//!
//! # Overview
//!
//! A [`CursorPaginator`] is either active or finished. Each successful page
//! advances it exactly once; once finished it stays finished.

mod cursor;
mod types;

pub use cursor::{CursorPaginator, DEFAULT_CURSOR_PATH};
pub use types::PaginationState;
