//! The response record hooks and handlers mutate.
//!
//! # Design Decisions
//! - Bytes, text and streams go to the wire unchanged
//! - Anything else is held as a JSON value and serialized on finalize
//! - An explicitly set content-type always wins over the JSON default

use std::fmt;

use axum::body::{Body, Bytes};
use axum::http::header::{HeaderValue, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use serde::Serialize;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Body of a response record.
#[derive(Default)]
pub enum ResponseBody {
    #[default]
    Empty,
    Bytes(Bytes),
    Text(String),
    Stream(Body),
    Json(serde_json::Value),
}

impl ResponseBody {
    /// Serialize any value into a JSON body.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(ResponseBody::Json(serde_json::to_value(value)?))
    }

    /// Whether the body can be written as-is.
    pub fn is_wire(&self) -> bool {
        !matches!(self, ResponseBody::Json(_))
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Empty => f.write_str("Empty"),
            ResponseBody::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            ResponseBody::Text(t) => f.debug_tuple("Text").field(t).finish(),
            ResponseBody::Stream(_) => f.write_str("Stream"),
            ResponseBody::Json(v) => f.debug_tuple("Json").field(v).finish(),
        }
    }
}

impl From<&'static str> for ResponseBody {
    fn from(s: &'static str) -> Self {
        ResponseBody::Text(s.to_string())
    }
}

impl From<String> for ResponseBody {
    fn from(s: String) -> Self {
        ResponseBody::Text(s)
    }
}

impl From<Bytes> for ResponseBody {
    fn from(b: Bytes) -> Self {
        ResponseBody::Bytes(b)
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(b: Vec<u8>) -> Self {
        ResponseBody::Bytes(Bytes::from(b))
    }
}

impl From<Body> for ResponseBody {
    fn from(b: Body) -> Self {
        ResponseBody::Stream(b)
    }
}

impl From<serde_json::Value> for ResponseBody {
    fn from(v: serde_json::Value) -> Self {
        ResponseBody::Json(v)
    }
}

/// Status, headers and body accumulated over a dispatch.
#[derive(Debug)]
pub struct ResponseRecord {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

impl Default for ResponseRecord {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: ResponseBody::Empty,
        }
    }
}

impl ResponseRecord {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Convert a non-wire body into JSON text, setting the JSON content-type
    /// unless one was set explicitly.
    pub fn finalize(mut self) -> Result<Self, serde_json::Error> {
        if let ResponseBody::Json(value) = &self.body {
            let encoded = serde_json::to_vec(value)?;
            self.body = ResponseBody::Bytes(Bytes::from(encoded));
            if !self.headers.contains_key(CONTENT_TYPE) {
                self.headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_bodies_pass_through() {
        let record = ResponseRecord {
            body: "hello".into(),
            ..Default::default()
        }
        .finalize()
        .unwrap();

        assert!(matches!(record.body, ResponseBody::Text(ref s) if s == "hello"));
        assert!(record.headers.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_json_body_sets_content_type() {
        let record = ResponseRecord {
            body: json!({ "id": 7 }).into(),
            ..Default::default()
        }
        .finalize()
        .unwrap();

        assert_eq!(record.headers.get(CONTENT_TYPE).unwrap(), JSON_CONTENT_TYPE);
        match record.body {
            ResponseBody::Bytes(b) => assert_eq!(&b[..], br#"{"id":7}"#),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_explicit_content_type_wins() {
        let mut record = ResponseRecord::new(StatusCode::OK);
        record
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/vnd.api+json"));
        record.body = ResponseBody::json(&vec![1, 2, 3]).unwrap();

        let record = record.finalize().unwrap();
        assert_eq!(
            record.headers.get(CONTENT_TYPE).unwrap(),
            "application/vnd.api+json"
        );
        assert!(record.body.is_wire());
    }
}
