//! Response interception for outgoing package metadata
//!
//! A registry host hands its responses to the interceptor before writing them
//! to the client. Responses that carry package metadata are filtered; all other
//! responses go out unchanged.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::AgeFilterConfig;
use crate::filter::AgeFilter;
use crate::filter::observer::{FilterObserver, TracingObserver};

/// An outgoing response body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// An already-structured JSON body
    Json(Value),
    /// A text body, possibly a serialized JSON document
    Text(String),
    /// A raw body, possibly a UTF-8 serialized JSON document
    Bytes(Vec<u8>),
}

/// Applies an [`AgeFilter`] to response bodies
pub struct ResponseInterceptor<O: FilterObserver = TracingObserver> {
    filter: AgeFilter<O>,
}

impl ResponseInterceptor<TracingObserver> {
    /// Build an interceptor from host-provided settings
    pub fn from_config(config: &AgeFilterConfig) -> Self {
        debug!(
            quarantine_days = config.quarantine_days.days(),
            "Creating age filter interceptor"
        );
        Self::new(AgeFilter::from_config(config))
    }
}

impl<O: FilterObserver> ResponseInterceptor<O> {
    pub fn new(filter: AgeFilter<O>) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &AgeFilter<O> {
        &self.filter
    }

    pub fn intercept(&self, payload: Payload) -> Payload {
        self.intercept_at(payload, Utc::now())
    }

    /// Filter `payload` as of `now`.
    ///
    /// Serialized bodies are only re-serialized when the filter changed them,
    /// otherwise they are returned byte-for-byte.
    pub fn intercept_at(&self, payload: Payload, now: DateTime<Utc>) -> Payload {
        match payload {
            Payload::Json(value) => Payload::Json(self.filter.filter_metadata_at(value, now)),
            Payload::Text(text) => match self.filter_serialized(text.as_bytes(), now) {
                Some(filtered) => Payload::Text(filtered),
                None => Payload::Text(text),
            },
            Payload::Bytes(bytes) => match self.filter_serialized(&bytes, now) {
                Some(filtered) => Payload::Bytes(filtered.into_bytes()),
                None => Payload::Bytes(bytes),
            },
        }
    }

    /// Re-serialized body, or `None` when the body must go out unchanged
    fn filter_serialized(&self, body: &[u8], now: DateTime<Utc>) -> Option<String> {
        let mut document: Value = serde_json::from_slice(body).ok()?;
        if !self.filter.filter_in_place_at(&mut document, now) {
            return None;
        }

        serde_json::to_string(&document)
            .inspect_err(|e| warn!("Failed to serialize filtered metadata: {}", e))
            .ok()
    }
}
