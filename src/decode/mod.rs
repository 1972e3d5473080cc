//! Record extraction module
//!
//! Pulls records out of a parsed JSON response body with a path expression
//! (`$.data[*]`), and reads single values (cursors, counters) by dotted path.
//!
//! # Overview
//!
//! Simple dotted paths with array indexing are walked directly; anything
//! richer (filters, recursive descent, inner wildcards) goes through
//! jsonpath-rust.

mod extractor;

pub use extractor::{extract_jsonpath, extract_path_value, RecordExtractor};
