//! Record extractor and path helpers

use crate::error::{Error, Result};
use serde_json::Value;

/// Extracts the records of one page from a response body
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    record_path: String,
}

impl RecordExtractor {
    /// Create an extractor for the given record path, e.g. `$.data[*]`
    pub fn new(record_path: impl Into<String>) -> Self {
        Self {
            record_path: record_path.into(),
        }
    }

    /// The configured record path
    pub fn record_path(&self) -> &str {
        &self.record_path
    }

    /// Extract records from a parsed body.
    ///
    /// A path that matches nothing yields no records; the X API omits `data`
    /// entirely on an empty page.
    pub fn extract(&self, body: &Value) -> Result<Vec<Value>> {
        let path = self.record_path.as_str();

        if path.is_empty() || path == "$" {
            return Ok(match body {
                Value::Array(arr) => arr.clone(),
                other => vec![other.clone()],
            });
        }

        if is_simple_path(path) {
            Ok(match extract_simple_path(body, path) {
                Some(Value::Array(arr)) => arr,
                Some(Value::Null) | None => vec![],
                Some(v) => vec![v],
            })
        } else {
            extract_with_jsonpath(body, path).map_err(|e| Error::RecordExtraction {
                path: path.to_string(),
                message: e.to_string(),
            })
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Extract a scalar from JSON as a string using a dotted path.
/// Supports basic paths like "$.meta.next_token" or "meta.next_token".
pub fn extract_jsonpath(value: &Value, path: &str) -> Option<String> {
    match extract_path_value(value, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Borrow a nested value by dotted path (objects only)
pub fn extract_path_value<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);

    let mut current = value;
    for part in path.split('.') {
        match current {
            Value::Object(map) => {
                current = map.get(part)?;
            }
            _ => return None,
        }
    }

    Some(current)
}

/// Dotted names with optional `[n]`/`[-n]` indexes and at most a trailing `[*]`
fn is_simple_path(path: &str) -> bool {
    if path.contains("..") || path.contains('?') || path.contains('@') {
        return false;
    }
    match path.find('*') {
        None => true,
        Some(pos) => path.ends_with("[*]") && pos == path.len() - 2,
    }
}

/// Extract a value using simple dot-notation path
fn extract_simple_path(value: &Value, path: &str) -> Option<Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);

    let mut current = value;
    for part in path.split('.') {
        // Handle array indexing like "data[0]", "data[-1]" or "data[*]"
        if let Some(bracket_pos) = part.find('[') {
            let name = &part[..bracket_pos];
            let index_str = part[bracket_pos + 1..].strip_suffix(']')?;

            if !name.is_empty() {
                current = current.get(name)?;
            }

            if index_str == "*" {
                return Some(current.clone());
            }

            let index = index_str.parse::<i64>().ok()?;
            let Value::Array(arr) = current else {
                return None;
            };
            #[allow(clippy::cast_possible_wrap)]
            let idx = if index < 0 {
                arr.len() as i64 + index
            } else {
                index
            };
            current = arr.get(usize::try_from(idx).ok()?)?;
        } else {
            current = current.get(part)?;
        }
    }

    Some(current.clone())
}

/// Extract records using jsonpath-rust
fn extract_with_jsonpath(value: &Value, path: &str) -> Result<Vec<Value>> {
    use jsonpath_rust::JsonPath;

    let jp = JsonPath::try_from(path)
        .map_err(|e| Error::json_path(format!("Invalid JSONPath: {e}")))?;

    match jp.find(value) {
        Value::Array(arr) => Ok(arr),
        Value::Null => Ok(vec![]),
        other => Ok(vec![other]),
    }
}
