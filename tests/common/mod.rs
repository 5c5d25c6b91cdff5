//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use waypoint::config::AppConfig;
use waypoint::http::{build_router, HttpServer};
use waypoint::lifecycle::Shutdown;
use waypoint::mount::{RouteDeclaration, RouteRegistry, RouteSource};

/// Mount `source` and wrap it in a registry.
pub fn registry(source: impl RouteSource + 'static) -> Arc<RouteRegistry> {
    let (registry, _) = RouteRegistry::mount(Arc::new(source)).expect("mount failed");
    Arc::new(registry)
}

/// Fully layered router over inline declarations.
pub fn router(declarations: Vec<RouteDeclaration>) -> Router {
    build_router(&AppConfig::default(), registry(declarations))
}

/// Serve `registry` on an ephemeral port until the returned handle is triggered.
pub async fn spawn_server(registry: Arc<RouteRegistry>) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(AppConfig::default(), registry);
    let stop = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, stop).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
