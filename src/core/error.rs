//! Error types for XMP operations
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Error types for XMP operations
#[derive(Debug, Error)]
pub enum XmpError {
    /// Bad parameter provided to a function
    #[error("Bad parameter: {0}")]
    BadParam(String),

    /// Bad value provided (e.g., a failed type coercion)
    #[error("Bad value: {0}")]
    BadValue(String),

    /// Bad schema URI or namespace
    #[error("Bad schema: {0}")]
    BadSchema(String),

    /// Bad path expression
    #[error("Bad XPath: {0}")]
    BadXPath(String),

    /// Inconsistent property options
    #[error("Bad options: {0}")]
    BadOptions(String),

    /// Structurally invalid RDF
    #[error("Bad RDF: {0}")]
    BadRdf(String),

    /// Structurally invalid XMP (well-formed RDF outside the XMP subset)
    #[error("Bad XMP: {0}")]
    BadXmp(String),

    /// Malformed underlying XML
    #[error("Bad XML: {0}")]
    BadXml(String),

    /// Malformed byte stream (encoding problems in the source text)
    #[error("Bad stream: {0}")]
    BadStream(String),

    /// Internal error (should not occur in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for XMP operations
pub type XmpResult<T> = Result<T, XmpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = XmpError::BadParam("test".to_string());
        assert!(err.to_string().contains("Bad parameter: test"));

        let err = XmpError::BadXPath("unterminated quote".to_string());
        assert!(err.to_string().contains("Bad XPath"));
    }
}
