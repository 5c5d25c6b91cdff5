//! Request identification.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every request
//! - Expose the ID to hooks, handlers and log spans
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - An ID supplied by the client is kept, not replaced
//! - The same ID is echoed on the response

use axum::http::{HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::dispatch::context::Context;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Placeholder used when no ID is present.
const UNKNOWN: &str = "unknown";

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Access to the request ID of a request in flight.
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> &str {
        self.headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(UNKNOWN)
    }
}

impl RequestIdExt for Context {
    fn request_id(&self) -> &str {
        self.header(X_REQUEST_ID).unwrap_or(UNKNOWN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_generated_ids_are_uuids() {
        let request = Request::builder().body(Body::empty()).unwrap();
        let mut make = UuidRequestId;
        let a = make.make_request_id(&request).unwrap();
        let b = make.make_request_id(&request).unwrap();

        let a = a.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(a).is_ok());
        assert_ne!(a, b.header_value().to_str().unwrap());
    }

    #[test]
    fn test_request_id_lookup() {
        let request = Request::builder()
            .header(X_REQUEST_ID, "abc-123")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request.request_id(), "abc-123");

        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(request.request_id(), "unknown");
    }
}
