//! npm-age-filter - hides recently published versions from npm package metadata
//!
//! Versions published within a configurable quarantine window are removed from
//! registry packuments before they reach clients, and `dist-tags` are repaired
//! so they keep resolving.

pub mod config;
pub mod filter;
pub mod interceptor;
pub mod logging;
