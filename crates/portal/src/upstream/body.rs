//! Mapping of raw backend response bodies to JSON.

use serde_json::{Value, json};
use thiserror::Error;

/// The backend answered with a body that is not JSON.
///
/// Carries the raw text so it can be handed to the client as a `detail`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("upstream body is not valid JSON ({} bytes)", .text.len())]
pub struct RawTextError {
    /// The body exactly as received.
    pub text: String,
}

impl RawTextError {
    /// Convert into the `{"detail": <raw text>}` body relayed to the client.
    #[must_use]
    pub fn into_detail(self) -> Value {
        json!({ "detail": self.text })
    }
}

/// Parse a backend response body.
///
/// An empty body maps to `null`. Anything else must be valid JSON.
///
/// # Errors
///
/// Returns `RawTextError` holding the original text when it is not JSON.
pub fn parse_upstream_body(text: &str) -> Result<Value, RawTextError> {
    if text.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|_| RawTextError {
        text: text.to_owned(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_json_object() {
        let value = parse_upstream_body(r#"{"access_token":"a","refresh_token":"r"}"#).unwrap();
        assert_eq!(value["access_token"], "a");
    }

    #[test]
    fn test_json_scalar() {
        assert_eq!(parse_upstream_body("\"ok\"").unwrap(), json!("ok"));
        assert_eq!(parse_upstream_body("42").unwrap(), json!(42));
    }

    #[test]
    fn test_empty_is_null() {
        assert_eq!(parse_upstream_body("").unwrap(), Value::Null);
    }

    #[test]
    fn test_html_is_raw_text() {
        let err = parse_upstream_body("<html>502 Bad Gateway</html>").unwrap_err();
        assert_eq!(err.text, "<html>502 Bad Gateway</html>");
        assert_eq!(
            err.into_detail(),
            json!({ "detail": "<html>502 Bad Gateway</html>" })
        );
    }

    #[test]
    fn test_whitespace_is_raw_text() {
        let err = parse_upstream_body("  ").unwrap_err();
        assert_eq!(err.into_detail(), json!({ "detail": "  " }));
    }

    #[test]
    fn test_backend_detail_is_kept() {
        assert_eq!(
            parse_upstream_body(r#"{"detail":"Ungültiger Refresh Token"}"#).unwrap(),
            json!({ "detail": "Ungültiger Refresh Token" })
        );
    }
}
