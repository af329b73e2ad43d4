//! Guarded view over a package metadata document
//!
//! A registry packument is only filtered once it has been validated into a
//! [`MetadataView`]. Anything that does not look like package metadata is
//! reported as [`Validation::Invalid`] and passed through by the caller.

use serde_json::{Map, Value};

use crate::filter::error::{FilterError, json_type_name};

pub const NAME_KEY: &str = "name";
pub const VERSIONS_KEY: &str = "versions";
pub const TIME_KEY: &str = "time";
pub const DIST_TAGS_KEY: &str = "dist-tags";

/// Name used in events when the document has no usable `name`
pub const UNKNOWN_PACKAGE: &str = "unknown";

/// Result of validating a document before filtering
#[derive(Debug)]
pub enum Validation<'a> {
    /// The document has a `versions` object and can be filtered
    Valid(MetadataView<'a>),
    /// Not package metadata; must be passed through unchanged
    Invalid,
}

/// Borrowed, read-only view of the fields the filter works on
#[derive(Debug, Clone, Copy)]
pub struct MetadataView<'a> {
    name: Option<&'a str>,
    versions: &'a Map<String, Value>,
    time: Option<&'a Value>,
    dist_tags: Option<&'a Value>,
}

impl<'a> MetadataView<'a> {
    pub fn validate(document: &'a Value) -> Validation<'a> {
        let Some(object) = document.as_object() else {
            return Validation::Invalid;
        };
        let Some(versions) = object.get(VERSIONS_KEY).and_then(Value::as_object) else {
            return Validation::Invalid;
        };

        Validation::Valid(Self {
            name: object.get(NAME_KEY).and_then(Value::as_str),
            versions,
            time: object.get(TIME_KEY).filter(|v| !v.is_null()),
            dist_tags: object.get(DIST_TAGS_KEY).filter(|v| !v.is_null()),
        })
    }

    /// Package name, or [`UNKNOWN_PACKAGE`]
    pub fn package_name(&self) -> &'a str {
        self.name.unwrap_or(UNKNOWN_PACKAGE)
    }

    pub fn versions(&self) -> &'a Map<String, Value> {
        self.versions
    }

    /// The `time` object; `None` when absent or null
    pub fn time(&self) -> Result<Option<&'a Map<String, Value>>, FilterError> {
        match self.time {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(other) => Err(FilterError::MalformedTime(json_type_name(other))),
        }
    }

    /// The `dist-tags` object; `None` when absent or null
    pub fn dist_tags(&self) -> Result<Option<&'a Map<String, Value>>, FilterError> {
        match self.dist_tags {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(other) => Err(FilterError::MalformedDistTags(json_type_name(other))),
        }
    }
}

/// Whether `document` has the shape of package metadata
pub fn is_package_metadata(document: &Value) -> bool {
    matches!(MetadataView::validate(document), Validation::Valid(_))
}
