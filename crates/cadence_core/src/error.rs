//! Core error types for cadence.

use std::fmt;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Invalid encoding
    InvalidEncoding {
        /// Why encoding or decoding failed
        reason: String,
    },

    /// Invalid ID format
    InvalidId {
        /// Why the identifier was rejected
        reason: String,
    },

    /// Invalid version
    InvalidVersion {
        /// Why the version was rejected
        reason: String,
    },

    /// Validation error
    Validation {
        /// Field or object being validated
        field: String,
        /// Why validation failed
        reason: String,
    },

    /// Not found
    NotFound {
        /// Kind of entity
        kind: String,
        /// Identifier that was looked up
        id: String,
    },
}

impl CoreError {
    /// Shorthand for a validation error
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEncoding { reason } => write!(f, "Invalid encoding: {}", reason),
            Self::InvalidId { reason } => write!(f, "Invalid ID: {}", reason),
            Self::InvalidVersion { reason } => write!(f, "Invalid version: {}", reason),
            Self::Validation { field, reason } => {
                write!(f, "Validation failed for {}: {}", field, reason)
            }
            Self::NotFound { kind, id } => write!(f, "{} not found: {}", kind, id),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidEncoding {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::InvalidId {
            reason: "empty".to_string(),
        };
        assert_eq!(format!("{}", err), "Invalid ID: empty");

        let err = CoreError::NotFound {
            kind: "Scenario".to_string(),
            id: "dr-drill".to_string(),
        };
        assert_eq!(format!("{}", err), "Scenario not found: dr-drill");
    }

    #[test]
    fn test_validation_shorthand() {
        let err = CoreError::validation("strategy", "unknown name `lifo`");
        let s = format!("{}", err);
        assert!(s.contains("strategy"));
        assert!(s.contains("lifo"));
    }

    #[test]
    fn test_from_serde_json() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: CoreError = parse.unwrap_err().into();
        assert!(matches!(err, CoreError::InvalidEncoding { .. }));
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(
            CoreError::validation("a", "b"),
            CoreError::validation("a", "b")
        );
        assert_ne!(
            CoreError::validation("a", "b"),
            CoreError::InvalidEncoding {
                reason: "b".to_string()
            }
        );
    }
}
