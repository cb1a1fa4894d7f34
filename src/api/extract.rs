//! Extractors that reject bad input as structured 422 errors.
//!
//! axum's stock `Json` and `Path` answer 400/415 with plain-text bodies.
//! These wrappers report the failing field instead, in the same error shape
//! as every other failure.

use crate::error::IssueTrackerError;
use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use serde_json::error::Category;

/// JSON body deserialized with the failing field path preserved.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = IssueTrackerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| IssueTrackerError::validation("body", e.body_text()))?;
        decode_json(&bytes).map(Self)
    }
}

/// Decode a JSON document, mapping failures to field-level errors.
///
/// # Errors
///
/// Returns `InvalidStatus`/`InvalidPriority` for unknown enum values and a
/// `Validation` error for everything else.
pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, IssueTrackerError> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    let value = serde_path_to_error::deserialize(&mut de).map_err(json_error)?;
    de.end().map_err(|e| {
        IssueTrackerError::validation(
            "body",
            format!("malformed JSON: {}", strip_position(&e.to_string())),
        )
    })?;
    Ok(value)
}

fn json_error(err: serde_path_to_error::Error<serde_json::Error>) -> IssueTrackerError {
    let path = err.path().to_string();
    let inner = err.into_inner();
    let message = strip_position(&inner.to_string()).to_string();

    if matches!(inner.classify(), Category::Syntax | Category::Eof | Category::Io) {
        return IssueTrackerError::validation("body", format!("malformed JSON: {message}"));
    }

    let field = backticked(&message, "missing field ")
        .or_else(|| backticked(&message, "unknown field "))
        .map(ToString::to_string)
        .or_else(|| (path != "." && path != "?").then_some(path))
        .unwrap_or_else(|| "body".to_string());

    if let Some(value) = backticked(&message, "unknown variant ") {
        match field.as_str() {
            "status" => {
                return IssueTrackerError::InvalidStatus {
                    status: value.to_string(),
                };
            }
            "priority" => {
                return IssueTrackerError::InvalidPriority {
                    priority: value.to_string(),
                };
            }
            _ => {}
        }
    }

    IssueTrackerError::validation(field, message)
}

/// serde_json appends "at line X column Y", which means nothing to a client
/// that already gets the field name.
fn strip_position(message: &str) -> &str {
    message
        .rfind(" at line ")
        .map_or(message, |idx| &message[..idx])
}

/// The first `` `quoted` `` token after `prefix`, if the message starts with it.
fn backticked<'a>(message: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = message.strip_prefix(prefix)?.strip_prefix('`')?;
    rest.find('`').map(|end| &rest[..end])
}

/// A positive integer issue id taken from the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for IssueId
where
    S: Send + Sync,
{
    type Rejection = IssueTrackerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| IssueTrackerError::validation("id", e.body_text()))?;
        parse_issue_id(&raw).map(Self)
    }
}

/// Parse a path segment into an issue id.
///
/// # Errors
///
/// Returns a validation error on field `id` unless `raw` is a positive
/// 64-bit integer.
pub fn parse_issue_id(raw: &str) -> Result<i64, IssueTrackerError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(IssueTrackerError::validation("id", "must be a positive integer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::schemas::{IssueCreate, IssuePatch};

    fn field_of(err: &IssueTrackerError) -> String {
        err.field_errors()
            .first()
            .map(|e| e.field.clone())
            .unwrap_or_default()
    }

    #[test]
    fn missing_field_names_the_field() {
        let err = decode_json::<IssueCreate>(br#"{"title": "t"}"#).unwrap_err();
        assert_eq!(field_of(&err), "reporter");
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn wrong_type_names_the_path() {
        let err = decode_json::<IssueCreate>(br#"{"title": 5, "reporter": "r"}"#).unwrap_err();
        assert_eq!(field_of(&err), "title");
        assert!(!err.to_string().contains("line"));
    }

    #[test]
    fn unknown_field_is_named() {
        let err = decode_json::<IssuePatch>(br#"{"severity": "high"}"#).unwrap_err();
        assert_eq!(field_of(&err), "severity");
    }

    #[test]
    fn unknown_enum_value_becomes_enum_error() {
        let err = decode_json::<IssueCreate>(br#"{"title": "t", "reporter": "r", "status": "done"}"#)
            .unwrap_err();
        assert!(matches!(err, IssueTrackerError::InvalidStatus { ref status } if status == "done"));

        let err = decode_json::<IssuePatch>(br#"{"priority": "urgent"}"#).unwrap_err();
        assert!(matches!(err, IssueTrackerError::InvalidPriority { .. }));
    }

    #[test]
    fn malformed_json_is_a_body_error() {
        let bodies: [&[u8]; 4] = [b"{\"title\": ", b"not json", b"{} trailing", b""];
        for body in bodies {
            let err = decode_json::<IssuePatch>(body).unwrap_err();
            assert_eq!(field_of(&err), "body", "body {:?}", String::from_utf8_lossy(body));
        }
    }

    #[test]
    fn issue_id_must_be_positive_integer() {
        assert_eq!(parse_issue_id("42").unwrap(), 42);
        for raw in ["0", "-1", "abc", "1.5", "99999999999999999999"] {
            assert!(parse_issue_id(raw).is_err(), "{raw} should be rejected");
        }
    }
}
