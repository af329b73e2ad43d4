use thiserror::Error;

/// Internal failures while planning a filter pass.
///
/// These never reach callers of [`AgeFilter::filter_metadata`](super::AgeFilter::filter_metadata);
/// they are reported to the observer and the metadata is passed through unfiltered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("\"dist-tags\" is not an object (found {0})")]
    MalformedDistTags(&'static str),

    #[error("\"time\" is not an object (found {0})")]
    MalformedTime(&'static str),
}

/// Name of the JSON type of `value`, for error messages.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
