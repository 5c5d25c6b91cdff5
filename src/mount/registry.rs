//! The active route table and remounting.

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;

use crate::mount::builder::{build, MountReport};
use crate::mount::declaration::RouteSource;
use crate::mount::error::MountError;
use crate::observability::metrics;
use crate::routing::router::RouteTable;

/// Owns the route source and the currently published table.
///
/// Readers take one snapshot per request with [`RouteRegistry::table`]; a
/// remount builds a complete new table and publishes it with a single store,
/// so a request sees either the old table or the new one, never a mix.
pub struct RouteRegistry {
    source: Mutex<Arc<dyn RouteSource>>,
    table: ArcSwap<RouteTable>,
}

impl RouteRegistry {
    /// Build the initial table. Fails if the source or the table is invalid.
    pub fn mount(source: Arc<dyn RouteSource>) -> Result<(Self, MountReport), MountError> {
        let (table, report) = build(source.as_ref())?;
        log_report(&report);
        metrics::set_routes_mounted(report.routes);

        Ok((
            Self {
                source: Mutex::new(source),
                table: ArcSwap::from_pointee(table),
            },
            report,
        ))
    }

    /// Snapshot of the active table.
    pub fn table(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }

    /// The source later remounts are built from.
    pub fn source(&self) -> Arc<dyn RouteSource> {
        let source = self.source.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*source)
    }

    /// Rebuild from the current source and swap the result in. On error the
    /// active table is left untouched.
    pub fn remount(&self) -> Result<MountReport, MountError> {
        let source = self.source();
        self.publish(source.as_ref())
    }

    /// Rebuild from a replacement source and adopt it for later remounts.
    /// On error both the table and the source stay as they were.
    pub fn remount_from(&self, source: Arc<dyn RouteSource>) -> Result<MountReport, MountError> {
        let report = self.publish(source.as_ref())?;
        *self.source.lock().unwrap_or_else(PoisonError::into_inner) = source;
        Ok(report)
    }

    fn publish(&self, source: &dyn RouteSource) -> Result<MountReport, MountError> {
        let (table, report) = match build(source) {
            Ok(built) => built,
            Err(e) => {
                tracing::error!(
                    source = %source.id(),
                    error = %e,
                    "Remount failed, keeping current routes"
                );
                return Err(e);
            }
        };

        self.table.store(Arc::new(table));
        log_report(&report);
        metrics::set_routes_mounted(report.routes);
        metrics::record_remount();
        Ok(report)
    }
}

fn log_report(report: &MountReport) {
    tracing::info!(
        source = %report.source,
        routes = report.routes,
        hook_scopes = report.hook_scopes,
        skipped = report.skipped.len(),
        "Routes mounted"
    );
}
