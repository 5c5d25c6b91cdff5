//! Response conversion.
//!
//! # Responsibilities
//! - Turn the final response record into an HTTP response
//! - Serialize JSON bodies and set their content-type
//! - Produce the fallback 404 and 500 responses
//!
//! # Design Decisions
//! - Streaming bodies are passed through without buffering
//! - A record that fails to serialize becomes a 500, never a partial write

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::dispatch::response::{ResponseBody, ResponseRecord};

impl IntoResponse for ResponseRecord {
    fn into_response(self) -> Response {
        let record = match self.finalize() {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response body");
                return internal_error();
            }
        };

        let body = match record.body {
            ResponseBody::Empty => Body::empty(),
            ResponseBody::Bytes(bytes) => Body::from(bytes),
            ResponseBody::Text(text) => Body::from(text),
            ResponseBody::Stream(body) => body,
            // finalize() leaves no JSON values behind
            ResponseBody::Json(value) => Body::from(value.to_string()),
        };

        let mut response = Response::new(body);
        *response.status_mut() = record.status;
        *response.headers_mut() = record.headers;
        response
    }
}

/// Response for a request no route matched.
pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

/// Response for a failed dispatch.
pub fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::response::JSON_CONTENT_TYPE;
    use axum::http::header::CONTENT_TYPE;
    use serde_json::json;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_json_record() {
        let mut record = ResponseRecord::new(StatusCode::CREATED);
        record.body = json!({ "ok": true }).into();

        let response = record.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), JSON_CONTENT_TYPE);
        assert_eq!(body_text(response).await, r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_text_record_keeps_headers() {
        let mut record = ResponseRecord::default();
        record.headers.insert("x-powered-by", "waypoint".parse().unwrap());
        record.body = "hi".into();

        let response = record.into_response();
        assert_eq!(response.headers().get("x-powered-by").unwrap(), "waypoint");
        assert!(response.headers().get(CONTENT_TYPE).is_none());
        assert_eq!(body_text(response).await, "hi");
    }

    #[tokio::test]
    async fn test_fallbacks() {
        assert_eq!(not_found().status(), StatusCode::NOT_FOUND);
        assert_eq!(internal_error().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
