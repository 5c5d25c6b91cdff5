//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Mount the routes and bind the listener
//! - Start background tasks (signals, config watcher, remounts)
//! - Drain in-flight requests on shutdown, bounded by a deadline
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)
//! - Reload errors are logged; the running routes stay active

use std::future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};

use crate::config::{AppConfig, ConfigError, ConfigWatcher};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::{spawn_signal_listener, SignalEvent};
use crate::mount::{ConventionSource, MountError, RouteRegistry};
use crate::observability::metrics;

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("initial mount failed: {0}")]
    Mount(#[from] MountError),

    #[error("invalid metrics address `{0}`")]
    MetricsAddress(String),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to watch config file: {0}")]
    Watch(#[from] notify::Error),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Everything needed to run the router process.
pub struct Startup {
    config: AppConfig,
    source: ConventionSource,
    watch: Option<PathBuf>,
}

impl Startup {
    /// `source` is re-read with the config's naming rules before mounting.
    pub fn new(config: AppConfig, mut source: ConventionSource) -> Self {
        source.set_routes_config(config.routes.clone());
        Self {
            config,
            source,
            watch: None,
        }
    }

    /// Reload the config and remount whenever `path` changes.
    pub fn watch(mut self, path: PathBuf) -> Self {
        self.watch = Some(path);
        self
    }

    /// Run until a shutdown signal arrives.
    pub async fn run(self) -> Result<(), StartupError> {
        let Startup {
            config,
            source,
            watch,
        } = self;

        // 1. Metrics
        if config.observability.metrics_enabled {
            let addr: SocketAddr = config
                .observability
                .metrics_address
                .parse()
                .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
            metrics::init_metrics(addr)?;
        }

        // 2. Routes
        let (registry, _) = RouteRegistry::mount(Arc::new(source.clone()))?;
        let registry = Arc::new(registry);

        // 3. Listener
        let listener = TcpListener::bind(config.listener.bind_address()).await?;
        tracing::info!(address = %listener.local_addr()?, "Listening for connections");

        // 4. Background tasks
        let shutdown = Shutdown::new();
        let mut stop = shutdown.subscribe();
        let signals = spawn_signal_listener(shutdown.clone());

        let mut _watcher = None;
        let mut config_updates = None;
        if let Some(path) = watch {
            let (watcher, updates) = ConfigWatcher::new(&path);
            _watcher = Some(watcher.run()?);
            config_updates = Some(updates);
        }

        tokio::spawn(reload_loop(
            Arc::clone(&registry),
            source,
            config.clone(),
            signals,
            config_updates,
            shutdown.subscribe(),
        ));

        // 5. Serve
        let deadline = Duration::from_secs(config.timeouts.shutdown_secs);
        let server = HttpServer::new(config, registry);
        let mut handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

        tokio::select! {
            result = &mut handle => return Ok(result??),
            _ = stop.recv() => {}
        }

        match tokio::time::timeout(deadline, &mut handle).await {
            Ok(result) => result??,
            Err(_) => {
                tracing::warn!(
                    deadline_secs = deadline.as_secs(),
                    "Shutdown deadline exceeded, dropping in-flight requests"
                );
                handle.abort();
            }
        }

        tracing::info!("Shutdown complete");
        Ok(())
    }
}

/// Remount on SIGHUP and on config changes until shutdown.
async fn reload_loop(
    registry: Arc<RouteRegistry>,
    mut source: ConventionSource,
    mut config: AppConfig,
    mut signals: mpsc::UnboundedReceiver<SignalEvent>,
    mut config_updates: Option<mpsc::UnboundedReceiver<AppConfig>>,
    mut stop: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            event = signals.recv() => match event {
                Some(SignalEvent::Remount) => {
                    tracing::info!("Remount requested by signal");
                    // Failures are logged by the registry; the current table stays.
                    if let Err(e) = registry.remount() {
                        tracing::debug!(error = %e, "Signal remount rejected");
                    }
                }
                Some(SignalEvent::Shutdown) | None => return,
            },
            update = next_update(&mut config_updates) => match update {
                Some(new_config) => {
                    warn_restart_only(&config, &new_config);
                    source.set_routes_config(new_config.routes.clone());
                    if let Err(e) = registry.remount_from(Arc::new(source.clone())) {
                        tracing::debug!(error = %e, "Config remount rejected");
                    }
                    config = new_config;
                }
                None => config_updates = None,
            },
            _ = stop.recv() => return,
        }
    }
}

async fn next_update(rx: &mut Option<mpsc::UnboundedReceiver<AppConfig>>) -> Option<AppConfig> {
    match rx {
        Some(rx) => rx.recv().await,
        None => future::pending().await,
    }
}

/// Settings applied at startup only.
fn warn_restart_only(current: &AppConfig, new: &AppConfig) {
    if current.listener != new.listener
        || current.timeouts != new.timeouts
        || current.limits != new.limits
        || current.observability != new.observability
    {
        tracing::warn!("Config change includes settings that only apply after a restart");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoutesConfig;
    use crate::dispatch::{empty, Context};

    fn source() -> ConventionSource {
        ConventionSource::new("test", RoutesConfig::default())
            .handler("index.get.rs", |_cx: Context| async { empty() })
    }

    #[tokio::test]
    async fn test_reload_loop_remounts_on_signal() {
        let (registry, _) = RouteRegistry::mount(Arc::new(source())).unwrap();
        let registry = Arc::new(registry);
        let before = registry.table();

        let shutdown = Shutdown::new();
        let (signals_tx, signals) = mpsc::unbounded_channel();
        let task = tokio::spawn(reload_loop(
            Arc::clone(&registry),
            source(),
            AppConfig::default(),
            signals,
            None,
            shutdown.subscribe(),
        ));

        signals_tx.send(SignalEvent::Remount).unwrap();
        signals_tx.send(SignalEvent::Shutdown).unwrap();
        task.await.unwrap();

        assert!(!Arc::ptr_eq(&before, &registry.table()));
        assert!(registry.table().resolve("GET", "/").is_some());
    }

    #[tokio::test]
    async fn test_reload_loop_applies_route_config() {
        let (registry, _) = RouteRegistry::mount(Arc::new(source())).unwrap();
        let registry = Arc::new(registry);

        let shutdown = Shutdown::new();
        let (_signals_tx, signals) = mpsc::unbounded_channel();
        let (updates_tx, updates) = mpsc::unbounded_channel();
        let task = tokio::spawn(reload_loop(
            Arc::clone(&registry),
            source(),
            AppConfig::default(),
            signals,
            Some(updates),
            shutdown.subscribe(),
        ));

        // With `.ts` as the extension, `index.get.rs` no longer names a GET route.
        let mut config = AppConfig::default();
        config.routes.extension = ".ts".to_string();
        updates_tx.send(config).unwrap();
        drop(updates_tx);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        shutdown.trigger();
        task.await.unwrap();

        assert!(registry.table().resolve("GET", "/").is_none());
    }
}
