//! Observability hook for filter passes

#[cfg(test)]
use mockall::automock;
use tracing::{error, info};

use crate::filter::error::FilterError;

/// Receives the events a filter pass produces
///
/// The filter never returns its internal failures to the caller, so this is the
/// only place they become visible.
#[cfg_attr(test, automock)]
pub trait FilterObserver: Send + Sync {
    /// Versions were hidden from `package`
    fn versions_filtered(&self, package: &str, removed: &[String]);

    /// Filtering `package` failed and its metadata was passed through unfiltered
    fn filter_failed(&self, package: &str, error: &FilterError);
}

/// Default observer that emits `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl FilterObserver for TracingObserver {
    fn versions_filtered(&self, package: &str, removed: &[String]) {
        info!(
            package = package,
            removed = removed.len(),
            versions = ?removed,
            "filtered {} version(s) from {}",
            removed.len(),
            package
        );
    }

    fn filter_failed(&self, package: &str, error: &FilterError) {
        error!(package = package, error = %error, "failed to filter metadata, passing it through");
    }
}
