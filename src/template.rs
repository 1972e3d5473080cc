//! Path template interpolation
//!
//! Handles `{variable}` placeholders in stream path templates such as
//! `/2/users/{user_id}/tweets`. Variables resolve against the tap
//! configuration; dotted names (`{credentials.user_id}`) walk nested objects.
//! Substituted values are percent-encoded as single path segments.

use crate::error::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use url::form_urlencoded;

/// Regex for matching path placeholders: {variable.path}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}").unwrap()
});

/// Context for template interpolation
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Tap configuration values
    pub config: Value,
}

impl TemplateContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create context with config values
    pub fn with_config(config: Value) -> Self {
        Self { config }
    }

    /// Get a value by path (e.g., "user_id" or "config.user_id")
    pub fn get(&self, path: &str) -> Option<&Value> {
        let parts: Vec<&str> = path.split('.').collect();

        let found = match parts.as_slice() {
            ["config", rest @ ..] if !rest.is_empty() => get_nested_value(&self.config, rest),
            _ => get_nested_value(&self.config, &parts),
        };

        found.filter(|v| !v.is_null())
    }
}

/// Get a nested value from a JSON value by path
fn get_nested_value<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for part in path {
        match current {
            Value::Object(map) => {
                current = map.get(*part)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Render a template string with the given context
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut missing = Vec::new();

    let rendered = TEMPLATE_REGEX.replace_all(template, |cap: &regex::Captures<'_>| {
        let var_path = &cap[1];
        match ctx.get(var_path) {
            Some(value) => encode_segment(&value_to_string(value)),
            None => {
                missing.push(var_path.to_string());
                String::new()
            }
        }
    });

    if missing.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(Error::undefined_var(missing.join(", ")))
    }
}

/// Percent-encode a value so it stays within one path segment
fn encode_segment(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Convert a JSON value to a string for template substitution
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_path_substitution() {
        let ctx = TemplateContext::with_config(json!({
            "user_id": "2244994945"
        }));

        let result = render("/2/users/{user_id}/tweets", &ctx).unwrap();
        assert_eq!(result, "/2/users/2244994945/tweets");
    }

    #[test]
    fn test_explicit_config_prefix() {
        let ctx = TemplateContext::with_config(json!({"user_id": "42"}));
        assert_eq!(render("/users/{config.user_id}", &ctx).unwrap(), "/users/42");
    }

    #[test]
    fn test_nested_value() {
        let ctx = TemplateContext::with_config(json!({
            "account": {"id": "abc"}
        }));

        let result = render("/accounts/{account.id}", &ctx).unwrap();
        assert_eq!(result, "/accounts/abc");
    }

    #[test]
    fn test_values_are_encoded_as_one_segment() {
        let ctx = TemplateContext::with_config(json!({"user_id": "a/b?c"}));
        assert_eq!(
            render("/2/users/{user_id}/tweets", &ctx).unwrap(),
            "/2/users/a%2Fb%3Fc/tweets"
        );

        let ctx = TemplateContext::with_config(json!({"user_id": "a b+c"}));
        assert_eq!(render("/users/{user_id}", &ctx).unwrap(), "/users/a%20b%2Bc");
    }

    #[test]
    fn test_undefined_variable() {
        let ctx = TemplateContext::new();
        let err = render("/2/users/{user_id}/tweets", &ctx).unwrap_err();
        assert!(matches!(err, Error::UndefinedVariable { .. }));
        assert!(err.to_string().contains("user_id"));
    }

    #[test]
    fn test_null_counts_as_undefined() {
        let ctx = TemplateContext::with_config(json!({"user_id": null}));
        assert!(render("/2/users/{user_id}/tweets", &ctx).is_err());
    }

    #[test]
    fn test_number_substitution() {
        let ctx = TemplateContext::with_config(json!({"user_id": 12345}));
        assert_eq!(render("/2/users/{user_id}", &ctx).unwrap(), "/2/users/12345");
    }

    #[test]
    fn test_no_templates() {
        let ctx = TemplateContext::new();
        let result = render("/2/tweets/search/recent", &ctx).unwrap();
        assert_eq!(result, "/2/tweets/search/recent");
    }
}
