//! JSON envelope codec.
//!
//! Responses wrap their payload under a single named key
//! (`{"book": {...}}`) and end with a newline. Request bodies decode into
//! typed shapes; unknown fields are ignored.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{de::DeserializeOwned, ser::SerializeMap, Serialize, Serializer};
use serde_json::error::Category;
use thiserror::Error;

use crate::error::AppError;

/// Failure to turn a request body into the expected shape. Always a client fault.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("body must not be empty")]
    Empty,

    #[error("body contains badly-formed JSON (at line {line}, column {column})")]
    Syntax { line: usize, column: usize },

    #[error("body contains incomplete JSON")]
    Truncated,

    #[error("body does not match the expected shape: {0}")]
    Shape(#[source] serde_json::Error),
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            Category::Syntax => DecodeError::Syntax {
                line: err.line(),
                column: err.column(),
            },
            Category::Eof => DecodeError::Truncated,
            Category::Data | Category::Io => DecodeError::Shape(err),
        }
    }
}

/// Decode a request body into `T`.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, DecodeError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(DecodeError::Empty);
    }
    serde_json::from_slice(body).map_err(DecodeError::from)
}

struct Wrapped<'a, T: ?Sized> {
    key: &'a str,
    value: &'a T,
}

impl<T: Serialize + ?Sized> Serialize for Wrapped<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.key, self.value)?;
        map.end()
    }
}

/// Serialize `{"<key>": value}` followed by a newline.
pub fn encode<T: Serialize + ?Sized>(key: &str, value: &T) -> serde_json::Result<Vec<u8>> {
    terminate(serde_json::to_vec(&Wrapped { key, value }))
}

fn terminate(body: serde_json::Result<Vec<u8>>) -> serde_json::Result<Vec<u8>> {
    body.map(|mut bytes| {
        bytes.push(b'\n');
        bytes
    })
}

/// A JSON response with status, caller-supplied headers, and an encoded body.
///
/// Encoding happens eagerly; a value that fails to serialize turns into a 500
/// when the envelope is rendered.
#[must_use]
pub struct Envelope {
    status: StatusCode,
    headers: HeaderMap,
    body: serde_json::Result<Vec<u8>>,
}

impl Envelope {
    pub fn new<T: Serialize + ?Sized>(status: StatusCode, key: &str, value: &T) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: encode(key, value),
        }
    }

    pub fn ok<T: Serialize + ?Sized>(key: &str, value: &T) -> Self {
        Self::new(StatusCode::OK, key, value)
    }

    /// A response whose body is `value` itself, with no wrapping key.
    pub fn bare<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: terminate(serde_json::to_vec(value)),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let bytes = match self.body {
            Ok(bytes) => bytes,
            Err(err) => {
                return AppError::Internal(
                    anyhow::Error::new(err).context("failed to encode response body"),
                )
                .into_response()
            }
        };

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.extend(self.headers);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Shape {
        name: String,
        count: u32,
    }

    #[test]
    fn encode_wraps_value_under_key_with_trailing_newline() {
        let bytes = encode("message", "book successfully deleted").unwrap();
        assert_eq!(bytes, b"{\"message\":\"book successfully deleted\"}\n");
    }

    #[test]
    fn encode_reports_unserializable_values() {
        let mut bad = BTreeMap::new();
        bad.insert(vec![1u8], "non-string key");
        assert!(encode("bad", &bad).is_err());
    }

    #[tokio::test]
    async fn envelope_sets_status_headers_and_body() {
        let response = Envelope::new(StatusCode::CREATED, "count", &3)
            .with_header(header::LOCATION, HeaderValue::from_static("v1/books/3"))
            .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(response.headers()[header::LOCATION], "v1/books/3");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"{\"count\":3}\n");
    }

    #[tokio::test]
    async fn envelope_with_unserializable_value_renders_500() {
        let mut bad = BTreeMap::new();
        bad.insert(vec![1u8], 1);
        let response = Envelope::ok("bad", &bad).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn decode_ignores_unknown_fields() {
        let shape: Shape = decode(br#"{"name":"a","count":2,"extra":true}"#).unwrap();
        assert_eq!(
            shape,
            Shape {
                name: "a".to_string(),
                count: 2
            }
        );
    }

    #[test]
    fn decode_classifies_failures() {
        assert!(matches!(decode::<Shape>(b""), Err(DecodeError::Empty)));
        assert!(matches!(decode::<Shape>(b"  \n"), Err(DecodeError::Empty)));
        assert!(matches!(
            decode::<Shape>(br#"{"name":"a","count":2"#),
            Err(DecodeError::Truncated)
        ));
        assert!(matches!(
            decode::<Shape>(br#"{"name": a}"#),
            Err(DecodeError::Syntax { line: 1, .. })
        ));
        assert!(matches!(
            decode::<Shape>(br#"{"name":"a","count":"two"}"#),
            Err(DecodeError::Shape(_))
        ));
        assert!(matches!(
            decode::<Shape>(br#"{"name":"a","count":-1}"#),
            Err(DecodeError::Shape(_))
        ));
    }
}
