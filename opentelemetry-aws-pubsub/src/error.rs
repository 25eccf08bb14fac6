//! Error type for decoding message attributes and envelopes.

/// Errors surfaced while decoding inbound messages and their attributes.
///
/// Failures to extract trace context are not represented here: they are
/// logged and treated as "no context" by the propagator.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An SNS attribute carried a `Type` outside of `String`, `String.Array`,
    /// `Number` and `Binary`.
    #[error("unknown attribute type: {0:?}")]
    UnknownAttributeType(String),

    /// An SQS attribute carried a `dataType` whose base kind is not `String`,
    /// `Number` or `Binary`.
    #[error("unknown attribute kind: {0:?}")]
    UnknownAttributeKind(String),

    /// A binary attribute payload was not valid base64.
    #[error("invalid binary attribute value: {0}")]
    InvalidBinaryValue(#[from] base64::DecodeError),

    /// The message envelope was not valid JSON for the expected shape.
    #[error("failed to decode message: {0}")]
    Json(#[from] serde_json::Error),
}
