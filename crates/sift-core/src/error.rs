//! Error types and error code constants for sift.
//!
//! Discovery distinguishes between two families of problems:
//!
//! - **Non-fatal** problems (a selector matches nothing, an identifier only
//!   partially resolves, a selector is malformed, the inspector fails for one
//!   element) never surface as `Err`. They are recorded as
//!   [`ResolutionIssue`](crate::report::ResolutionIssue)s and logged.
//! - **Fatal** problems ([`ConfigurationError`]) abort discovery through
//!   [`DiscoveryError`], since they indicate an incompatible input rather
//!   than a legitimate "not found".
//!
//! [`SiftError`] is the unified type rendered by the CLI; `impl From<X> for
//! SiftError` bridges subsystem errors and [`OutputErrorCode`] maps each
//! variant to a stable exit code.
//!
//! ## Exit Codes
//!
//! - `3`: Configuration errors (unknown execution or lock mode)
//! - `4`: Catalog errors (catalog or config file unreadable or invalid)
//! - `10`: Internal errors (bugs, unexpected state)
//!
//! Malformed selector text is reported as an issue, not an error. Usage
//! errors exit with `2` from argument parsing before discovery starts.

use std::fmt;

use thiserror::Error;

use crate::tree::TreeError;

// ============================================================================
// Configuration Errors
// ============================================================================

/// An enumerated value in declarative metadata or configuration is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Unknown execution mode value.
    #[error("unknown execution mode '{value}' declared on [{element}]")]
    UnknownExecutionMode { value: String, element: String },

    /// Unknown resource access mode value.
    #[error("unknown resource access mode '{value}' for resource '{resource}' declared on [{element}]")]
    UnknownLockMode {
        value: String,
        resource: String,
        element: String,
    },

    /// Invalid configuration value.
    #[error("invalid value '{value}' for configuration key '{key}': {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },
}

// ============================================================================
// Discovery Errors
// ============================================================================

/// Failure that aborts a discovery run.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Declarative metadata could not be interpreted.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The tree rejected a node the resolver built (internal invariant broken).
    #[error("internal discovery error: {0}")]
    Tree(#[from] TreeError),
}

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output and CLI exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Configuration errors (unknown modes).
    ConfigurationError = 3,
    /// Catalog or config file could not be loaded.
    CatalogError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum SiftError {
    /// Configuration error (fatal for discovery).
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Catalog or config file could not be loaded.
    #[error("failed to load {path}: {message}")]
    CatalogLoad { path: String, message: String },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl From<&SiftError> for OutputErrorCode {
    fn from(err: &SiftError) -> Self {
        match err {
            SiftError::Configuration { .. } => OutputErrorCode::ConfigurationError,
            SiftError::CatalogLoad { .. } => OutputErrorCode::CatalogError,
            SiftError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<SiftError> for OutputErrorCode {
    fn from(err: SiftError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Bridges
// ============================================================================

impl From<ConfigurationError> for SiftError {
    fn from(err: ConfigurationError) -> Self {
        SiftError::Configuration {
            message: err.to_string(),
        }
    }
}

impl From<DiscoveryError> for SiftError {
    fn from(err: DiscoveryError) -> Self {
        match err {
            DiscoveryError::Configuration(inner) => SiftError::from(inner),
            DiscoveryError::Tree(inner) => SiftError::internal(inner.to_string()),
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl SiftError {
    /// Create a catalog load error.
    pub fn catalog_load(path: impl Into<String>, message: impl Into<String>) -> Self {
        SiftError::CatalogLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        SiftError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod error_code_mapping {
        use super::*;

        #[test]
        fn configuration_error_maps_to_configuration_code() {
            let err = SiftError::from(ConfigurationError::UnknownExecutionMode {
                value: "sideways".to_string(),
                element: "a.B".to_string(),
            });
            assert_eq!(err.error_code(), OutputErrorCode::ConfigurationError);
            assert_eq!(err.error_code().code(), 3);
        }

        #[test]
        fn discovery_error_unwraps_configuration() {
            let err = DiscoveryError::from(ConfigurationError::InvalidValue {
                key: "engine_id".to_string(),
                value: String::new(),
                message: "must not be blank".to_string(),
            });
            let sift = SiftError::from(err);
            assert_eq!(sift.error_code(), OutputErrorCode::ConfigurationError);
        }

        #[test]
        fn catalog_and_internal_codes() {
            assert_eq!(SiftError::catalog_load("c.json", "missing").error_code().code(), 4);
            assert_eq!(SiftError::internal("bug").error_code().code(), 10);
        }
    }

    mod error_display {
        use super::*;

        #[test]
        fn unknown_lock_mode_names_resource_and_element() {
            let err = ConfigurationError::UnknownLockMode {
                value: "WRITE_ONLY".to_string(),
                resource: "db".to_string(),
                element: "a.B#m()".to_string(),
            };
            assert_eq!(
                err.to_string(),
                "unknown resource access mode 'WRITE_ONLY' for resource 'db' declared on [a.B#m()]"
            );
        }

        #[test]
        fn catalog_load_display() {
            let err = SiftError::catalog_load("c.json", "no such file");
            assert_eq!(err.to_string(), "failed to load c.json: no such file");
        }

        #[test]
        fn output_code_display() {
            assert_eq!(format!("{}", OutputErrorCode::CatalogError), "4");
            assert_eq!(format!("{}", OutputErrorCode::InternalError), "10");
        }
    }
}
