//! Error types for wire parsing, materialization, and encoding.

use crate::tree::SentinelKind;

/// The primary error type for all codec operations.
///
/// Every fallible operation in this crate returns `WireError` by value; the
/// core never retries and never logs on its own behalf. Coercion fallbacks
/// (unparsable ints/floats/bools) are deliberately *not* errors; see
/// [`crate::materialize::coerce`].
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// A `required`-tagged field was left at its zero value when encoding
    /// request options.
    #[error("field '{field}' is required for this request")]
    Required {
        /// Wire name of the missing field.
        field: &'static str,
    },

    /// The token stream ended unexpectedly or violated the wire grammar.
    /// Fatal; the parser does not attempt recovery.
    #[error("malformed document: {0}")]
    Malformed(String),

    /// The remote answered with an `error` sentinel instead of row data.
    #[error("remote returned {kind} (code {code}): {message}")]
    Remote {
        /// Which sentinel element was decoded.
        kind: SentinelKind,
        /// Numeric code from the sentinel's `code` child.
        code: i64,
        /// Text from the sentinel's `message` child.
        message: String,
    },

    /// A timestamp field matched neither accepted wire format.
    #[error("timestamp '{value}' matches neither accepted format")]
    TimeFormat {
        /// The raw wire value that failed to parse.
        value: String,
    },

    /// XML writer error while rendering wire bytes.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// IO error while rendering wire bytes.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Custom error message.
    #[error("{0}")]
    Custom(String),
}

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, WireError>;
