//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the dispatch fallback
//! - Wire up middleware (tracing, request ID, timeout, panics, limits)
//! - Bind server to listener
//! - Resolve each request against the active route table
//! - Run the dispatch chain and send exactly one response
//! - Observability (metrics, correlation IDs)

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header::HeaderName, Request},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::dispatch::{Context, DispatchChain};
use crate::http::request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
use crate::http::response::{internal_error, not_found};
use crate::lifecycle::shutdown;
use crate::mount::RouteRegistry;
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RouteRegistry>,
    pub body_limit: usize,
}

/// HTTP server for the router.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a new HTTP server serving the routes held by `registry`.
    pub fn new(config: AppConfig, registry: Arc<RouteRegistry>) -> Self {
        let router = build_router(&config, registry);
        Self { router, config }
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            request_timeout_secs = self.config.timeouts.request_secs,
            "HTTP server starting"
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The fully layered router, e.g. for in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(config: &AppConfig, registry: Arc<RouteRegistry>) -> Router {
    let state = AppState {
        registry,
        body_limit: config.limits.max_body_size,
    };
    let request_id = HeaderName::from_static(X_REQUEST_ID);

    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(request_id.clone(), UuidRequestId))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request.request_id(),
                )
            }),
        )
        .layer(PropagateRequestIdLayer::new(request_id))
        .layer(RequestBodyLimitLayer::new(config.limits.max_body_size))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

    Router::new()
        .fallback(dispatch_handler)
        .with_state(state)
        .layer(middleware)
}

/// Resolve the request, run its chain and convert the outcome.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    // One snapshot per request; a concurrent remount does not affect it.
    let table = state.registry.table();
    let Some(resolution) = table.resolve(method.as_str(), &path) else {
        tracing::debug!(method = %method, path = %path, "No route matched");
        metrics::record_request(method.as_str(), metrics::UNMATCHED, 404, start);
        return not_found();
    };

    let endpoint = resolution.endpoint;
    let pattern = endpoint.route().pattern().to_string();
    tracing::debug!(
        method = %method,
        path = %path,
        route = %pattern,
        source = %endpoint.source(),
        "Route matched"
    );

    let cx = Context::new(
        request,
        Arc::clone(endpoint.route()),
        resolution.params,
        state.body_limit,
    );
    let chain = DispatchChain::new(endpoint.chain());

    let response = match chain.run(cx.clone()).await {
        Ok(()) => cx.into_record().into_response(),
        Err(e) => {
            tracing::error!(
                method = %method,
                path = %path,
                route = %pattern,
                error = %e,
                "Request dispatch failed"
            );
            internal_error()
        }
    };

    metrics::record_request(method.as_str(), &pattern, response.status().as_u16(), start);
    response
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = %detail, "Handler panicked");
    internal_error()
}
