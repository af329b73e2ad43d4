//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, TimeDelta, TimeZone, Utc};

use npm_age_filter::filter::AgeFilter;
use npm_age_filter::filter::error::FilterError;
use npm_age_filter::filter::observer::FilterObserver;

/// Event captured by [`RecordingObserver`]
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Filtered { package: String, removed: Vec<String> },
    Failed { package: String, error: FilterError },
}

/// Observer that keeps every event for later assertions
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl FilterObserver for RecordingObserver {
    fn versions_filtered(&self, package: &str, removed: &[String]) {
        self.events.lock().unwrap().push(Event::Filtered {
            package: package.to_string(),
            removed: removed.to_vec(),
        });
    }

    fn filter_failed(&self, package: &str, error: &FilterError) {
        self.events.lock().unwrap().push(Event::Failed {
            package: package.to_string(),
            error: error.clone(),
        });
    }
}

/// Fixed reference instant used as "now"
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 0).unwrap()
}

/// RFC 3339 timestamp `delta` before [`now`]
pub fn ago(delta: TimeDelta) -> String {
    (now() - delta).to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn days_ago(days: i64) -> String {
    ago(TimeDelta::days(days))
}

/// Filter with a seven day window and a recording observer
pub fn recording_filter() -> AgeFilter<RecordingObserver> {
    AgeFilter::with_observer(TimeDelta::days(7), RecordingObserver::default())
}
