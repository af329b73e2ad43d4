//! Age-based filtering of package metadata
//!
//! Hides every version published within the quarantine window from a registry
//! packument and repairs the `dist-tags` that pointed at hidden versions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  metadata   │────▶│  AgeFilter  │────▶│  dist_tags  │
//! │ (validate)  │     │   (plan)    │     │  (repair)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐
//!                     │  observer   │
//!                     │  (events)   │
//!                     └─────────────┘
//! ```
//!
//! A pass is planned against a read-only [`MetadataView`] and only applied once
//! planning succeeded, so a failure leaves the document untouched.
//!
//! # Modules
//!
//! - [`metadata`]: Validation of the document shape
//! - [`publish_time`]: Parsing of `time` entries
//! - [`dist_tags`]: Replacement targets for dangling tags
//! - [`observer`]: Event sink for filtered packages and failures
//! - [`error`]: Internal failure taxonomy

pub mod dist_tags;
pub mod error;
pub mod metadata;
pub mod observer;
pub mod publish_time;

use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::AgeFilterConfig;
use crate::filter::dist_tags::{TagRepair, plan_tag_repairs};
use crate::filter::error::FilterError;
use crate::filter::metadata::{
    DIST_TAGS_KEY, MetadataView, NAME_KEY, UNKNOWN_PACKAGE, VERSIONS_KEY, Validation,
};
use crate::filter::observer::{FilterObserver, TracingObserver};
use crate::filter::publish_time::parse_publish_time;

/// Changes made by one filter pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterReport {
    /// Hidden versions, in document order
    pub removed: Vec<String>,
    /// Repaired tags, in document order
    pub tags: IndexMap<String, TagRepair>,
}

impl FilterReport {
    /// Whether the pass left the document unchanged
    pub fn is_unchanged(&self) -> bool {
        self.removed.is_empty() && self.tags.is_empty()
    }
}

/// Hides versions younger than the quarantine window
pub struct AgeFilter<O: FilterObserver = TracingObserver> {
    window: TimeDelta,
    observer: O,
}

impl AgeFilter<TracingObserver> {
    pub fn new(window: TimeDelta) -> Self {
        Self::with_observer(window, TracingObserver)
    }

    pub fn from_config(config: &AgeFilterConfig) -> Self {
        Self::new(config.quarantine_days.window())
    }
}

impl<O: FilterObserver> AgeFilter<O> {
    pub fn with_observer(window: TimeDelta, observer: O) -> Self {
        Self { window, observer }
    }

    pub fn window(&self) -> TimeDelta {
        self.window
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Filter `metadata` against the current wall-clock time.
    ///
    /// See [`filter_metadata_at`](Self::filter_metadata_at).
    pub fn filter_metadata(&self, metadata: Value) -> Value {
        self.filter_metadata_at(metadata, Utc::now())
    }

    /// Filter `metadata` as of `now`.
    ///
    /// The document is consumed and returned: on success it is the same value
    /// with quarantined versions removed and tags repaired. Documents that are
    /// not package metadata come back unchanged. Internal failures never
    /// propagate; the original document is returned and the failure is
    /// reported to the observer.
    pub fn filter_metadata_at(&self, mut metadata: Value, now: DateTime<Utc>) -> Value {
        self.filter_in_place_at(&mut metadata, now);
        metadata
    }

    /// Filter `metadata` in place as of `now`, failing open like
    /// [`filter_metadata_at`](Self::filter_metadata_at).
    ///
    /// Returns whether the document changed.
    pub fn filter_in_place_at(&self, metadata: &mut Value, now: DateTime<Utc>) -> bool {
        !self.filter_report_at(metadata, now).is_unchanged()
    }

    /// Filter `metadata` in place as of `now`, failing open, and report what
    /// changed.
    ///
    /// A failure is reported to the observer and yields an empty report with
    /// `metadata` untouched.
    pub fn filter_report_at(&self, metadata: &mut Value, now: DateTime<Utc>) -> FilterReport {
        self.apply_at(metadata, now).unwrap_or_else(|e| {
            let package = metadata
                .get(NAME_KEY)
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN_PACKAGE);
            self.observer.filter_failed(package, &e);
            FilterReport::default()
        })
    }

    /// Filter `metadata` in place as of `now`, reporting what changed.
    ///
    /// On error `metadata` has not been modified.
    pub fn apply_at(
        &self,
        metadata: &mut Value,
        now: DateTime<Utc>,
    ) -> Result<FilterReport, FilterError> {
        let (package, report) = match MetadataView::validate(metadata) {
            Validation::Invalid => {
                debug!("Not package metadata, passing through");
                return Ok(FilterReport::default());
            }
            Validation::Valid(view) => {
                (view.package_name().to_string(), self.plan(&view, now)?)
            }
        };

        if report.removed.is_empty() {
            return Ok(report);
        }

        apply_report(metadata, &report);
        self.observer.versions_filtered(&package, &report.removed);

        Ok(report)
    }

    /// Whether a version with the given `time` entry is still quarantined.
    ///
    /// Versions of unknown age are never quarantined.
    fn is_quarantined(&self, published: Option<&Value>, now: DateTime<Utc>) -> bool {
        published
            .and_then(parse_publish_time)
            .is_some_and(|published| now.signed_duration_since(published) < self.window)
    }

    fn plan(
        &self,
        view: &MetadataView<'_>,
        now: DateTime<Utc>,
    ) -> Result<FilterReport, FilterError> {
        let time = view.time()?;

        let removed: Vec<String> = view
            .versions()
            .keys()
            .filter(|v| self.is_quarantined(time.and_then(|t| t.get(v.as_str())), now))
            .cloned()
            .collect();

        if removed.is_empty() {
            return Ok(FilterReport::default());
        }

        let tags = match view.dist_tags()? {
            Some(dist_tags) => {
                let removed_set: HashSet<&str> = removed.iter().map(String::as_str).collect();
                plan_tag_repairs(dist_tags, view.versions(), &removed_set, time)
            }
            None => IndexMap::new(),
        };

        debug!(
            package = view.package_name(),
            removed = removed.len(),
            repaired_tags = tags.len(),
            "Planned filter pass"
        );

        Ok(FilterReport { removed, tags })
    }
}

/// Apply a planned pass. `metadata` must have been validated.
fn apply_report(metadata: &mut Value, report: &FilterReport) {
    let Some(object) = metadata.as_object_mut() else {
        return;
    };

    if let Some(versions) = object.get_mut(VERSIONS_KEY).and_then(Value::as_object_mut) {
        for version in &report.removed {
            versions.shift_remove(version);
        }
    }

    if let Some(dist_tags) = object.get_mut(DIST_TAGS_KEY).and_then(Value::as_object_mut) {
        for (tag, repair) in &report.tags {
            match repair {
                TagRepair::Repoint { to, .. } => {
                    dist_tags.insert(tag.clone(), Value::String(to.clone()));
                }
                TagRepair::Delete { .. } => {
                    dist_tags.shift_remove(tag);
                }
            }
        }
    }
}
