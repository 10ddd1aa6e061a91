//! Unified error handling for bXporter
//!
//! Every stage of an export (graph walk, animation flattening, encoding and
//! decoding) reports failures through this one error type. All variants are
//! fatal to the export that raised them.

use thiserror::Error;

/// Unified error type for all bXporter operations
#[derive(Error, Debug)]
pub enum Error {
    // ==================== Export Errors ====================

    /// A required cross-reference could not be resolved
    #[error("{kind} not found: \"{name}\"")]
    ReferenceNotFound {
        kind: &'static str,
        name: String,
    },

    /// An encountered type is outside the supported set
    #[error("Unsupported {kind} \"{name}\": {found}")]
    UnsupportedType {
        kind: &'static str,
        name: String,
        found: String,
    },

    /// Data that must agree with itself does not
    #[error("Consistency violation: {message}")]
    ConsistencyViolation {
        message: String,
    },

    // ==================== I/O Errors ====================

    /// Standard I/O error (sink or source)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Scene snapshot could not be deserialized
    #[error("Snapshot error: {0}")]
    Json(#[from] serde_json::Error),

    // ==================== Decode Errors ====================

    /// Invalid magic bytes at file start
    #[error("Invalid magic: expected {expected:?}, found {found:?}")]
    InvalidMagic {
        expected: Vec<u8>,
        found: Vec<u8>,
    },

    /// Unsupported format version
    #[error("Unsupported version: {version} (supported: {supported})")]
    UnsupportedVersion {
        version: u32,
        supported: u32,
    },

    /// Unexpected end of data
    #[error("Unexpected end of data at offset {offset}")]
    UnexpectedEof {
        offset: u64,
    },

    /// Structurally invalid data
    #[error("Invalid data: {message}")]
    InvalidData {
        message: String,
    },

    // ==================== General Errors ====================

    /// Error with context naming the entity or field being processed
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

/// Result type using the unified Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a reference-not-found error
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Error::ReferenceNotFound {
            kind,
            name: name.into(),
        }
    }

    /// Create an unsupported-type error
    pub fn unsupported(kind: &'static str, name: impl Into<String>, found: impl Into<String>) -> Self {
        Error::UnsupportedType {
            kind,
            name: name.into(),
            found: found.into(),
        }
    }

    /// Create a consistency violation
    pub fn consistency(message: impl Into<String>) -> Self {
        Error::ConsistencyViolation {
            message: message.into(),
        }
    }

    /// Create an invalid data error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Error::InvalidData {
            message: message.into(),
        }
    }

    /// The innermost error, with all context layers removed
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::WithContext { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Check if this is an unresolved reference
    pub fn is_reference_not_found(&self) -> bool {
        matches!(self.root_cause(), Error::ReferenceNotFound { .. })
    }

    /// Check if this is an unsupported type
    pub fn is_unsupported_type(&self) -> bool {
        matches!(self.root_cause(), Error::UnsupportedType { .. })
    }

    /// Check if this is a consistency violation
    pub fn is_consistency_violation(&self) -> bool {
        matches!(self.root_cause(), Error::ConsistencyViolation { .. })
    }

    /// Check if this is a decode error
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self.root_cause(),
            Error::InvalidMagic { .. }
                | Error::UnsupportedVersion { .. }
                | Error::UnexpectedEof { .. }
                | Error::InvalidData { .. }
        )
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_with_context() {
        let err = Error::not_found("Texture", "wood");
        let contextualized = err.with_context("material \"Floor\"");

        let message = contextualized.to_string();
        assert!(message.contains("material \"Floor\""));
        assert!(message.contains("wood"));
    }

    #[test]
    fn test_classification_sees_through_context() {
        let err = Error::consistency("axis mismatch")
            .with_context("track \"Walk\"")
            .with_context("object \"Cube\"");

        assert!(err.is_consistency_violation());
        assert!(!err.is_reference_not_found());
        assert!(!err.is_decode_error());
    }

    #[test]
    fn test_is_unsupported_type() {
        let err = Error::unsupported("texture", "Clouds", "CLOUDS");
        assert!(err.is_unsupported_type());
        assert_eq!(err.to_string(), "Unsupported texture \"Clouds\": CLOUDS");
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::not_found("Mesh", "Cube"));
        let with_context = result.context("object \"Cube.001\"");

        assert!(with_context.is_err());
        assert!(with_context.unwrap_err().to_string().contains("Cube.001"));
    }
}
