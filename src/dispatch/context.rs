//! Per-request context shared by every link of a dispatch chain.
//!
//! # Responsibilities
//! - Expose the request line, headers, params and body reader
//! - Hold the mutable response record hooks and handlers build up
//! - Provide the single sanctioned `respond` operation
//!
//! # Design Decisions
//! - `Context` is a cheap handle (`Arc`) so hooks can keep it across awaits
//! - `respond` commits a snapshot and flips `responded`; later mutations of
//!   the record never reach the wire

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Body;
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{HeaderMap, Method, Request, StatusCode, Uri};

use crate::dispatch::body::BodyReader;
use crate::dispatch::error::DispatchError;
use crate::dispatch::response::{ResponseBody, ResponseRecord};
use crate::routing::params::ParamBindings;
use crate::routing::route::Route;

/// Handle to one request's dispatch state.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    params: ParamBindings,
    route: Arc<Route>,
    body: BodyReader,
    response: Mutex<ResponseState>,
}

#[derive(Default)]
struct ResponseState {
    record: ResponseRecord,
    committed: Option<ResponseRecord>,
}

impl Context {
    /// Build the context for a resolved request. `body_limit` bounds how many
    /// body bytes the [`BodyReader`] will buffer.
    pub fn new(
        request: Request<Body>,
        route: Arc<Route>,
        params: ParamBindings,
        body_limit: usize,
    ) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            inner: Arc::new(Inner {
                method: parts.method,
                uri: parts.uri,
                headers: parts.headers,
                params,
                route,
                body: BodyReader::new(body, body_limit),
                response: Mutex::new(ResponseState::default()),
            }),
        }
    }

    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    pub fn path(&self) -> &str {
        self.inner.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    /// Request header value, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn params(&self) -> &ParamBindings {
        &self.inner.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.inner.params.get(name)
    }

    /// The matched route.
    pub fn route(&self) -> &Arc<Route> {
        &self.inner.route
    }

    pub fn body(&self) -> &BodyReader {
        &self.inner.body
    }

    fn state(&self) -> MutexGuard<'_, ResponseState> {
        self.inner
            .response
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `respond` has been called.
    pub fn responded(&self) -> bool {
        self.state().committed.is_some()
    }

    pub fn status(&self) -> StatusCode {
        self.state().record.status
    }

    pub fn set_status(&self, status: StatusCode) {
        self.state().record.status = status;
    }

    pub fn set_header(&self, name: HeaderName, value: HeaderValue) {
        self.state().record.headers.insert(name, value);
    }

    /// Response header value as currently set on the record.
    pub fn response_header(&self, name: &str) -> Option<String> {
        self.state()
            .record
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    pub fn set_body(&self, body: impl Into<ResponseBody>) {
        self.state().record.body = body.into();
    }

    /// Run a closure against the accumulated response record.
    pub fn with_response<R>(&self, f: impl FnOnce(&mut ResponseRecord) -> R) -> R {
        f(&mut self.state().record)
    }

    /// Commit the response now. The accumulated headers are kept; status and
    /// body are replaced. Only the first call succeeds.
    pub fn respond(&self, status: StatusCode, body: impl Into<ResponseBody>) -> Result<(), DispatchError> {
        let mut state = self.state();
        if state.committed.is_some() {
            return Err(DispatchError::AlreadyResponded);
        }

        let record = std::mem::take(&mut state.record);
        state.committed = Some(ResponseRecord {
            status,
            headers: record.headers.clone(),
            body: body.into(),
        });
        // Keep the headers visible to hooks still unwinding.
        state.record.headers = record.headers;
        Ok(())
    }

    /// Take the response to send: the committed one if `respond` was called,
    /// otherwise the accumulated record.
    pub fn into_record(self) -> ResponseRecord {
        let mut state = self.state();
        let record = match state.committed.take() {
            Some(committed) => committed,
            None => std::mem::take(&mut state.record),
        };
        record
    }
}
