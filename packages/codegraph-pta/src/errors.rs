//! Error types for codegraph-pta
//!
//! Two families live here:
//! - configuration problems (wrapped [`ConfigError`]), fatal at construction
//! - IR contract violations discovered while building the PAG, fatal for the run
//!
//! Precision-loss conditions (an unresolvable dynamic callee, a missing base
//! node for a built-in operation) are not errors: they are logged with
//! `tracing::warn!` and the affected edge is skipped.

use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for pointer analysis operations
#[derive(Debug, Error)]
pub enum PtaError {
    /// Invalid analysis configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A value shape that cannot become a PAG node (constants, expressions)
    #[error("Unsupported value for PAG node: {0}")]
    UnsupportedValue(String),

    /// Static invoke without a call site in the call graph
    #[error("Can not find static call site for stmt {0}")]
    StaticCallSiteNotFound(String),

    /// Invoke statement unknown to the call graph
    #[error("Can not find call site by stmt {0}")]
    CallSiteNotFound(String),

    /// Call graph node without a backing method
    #[error("Can not find method for call graph node {0}")]
    MethodNotFound(String),

    /// Caller of a call site missing from the call graph
    #[error("Can not get caller method node {0}")]
    CallerNotFound(String),

    /// Callee body has no `this := this-ref` statement
    #[error("Can not get this ptr of method {0}")]
    MissingThisAssignment(String),

    /// Return operand that is neither a local nor a constant
    #[error("Return value is not a local or constant: {0}")]
    UnexpectedReturnValue(String),

    /// Receiver local of an instance call has no PAG node
    #[error("Can not get base node for {0}")]
    BaseNodeNotFound(String),

    /// IO error (debug dump)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Statistics serialization error (debug dump)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PtaError {
    /// Create an unsupported-value error
    pub fn unsupported(value: impl std::fmt::Display) -> Self {
        PtaError::UnsupportedValue(value.to_string())
    }

    /// Whether this error came from configuration validation
    pub fn is_config(&self) -> bool {
        matches!(self, PtaError::Config(_))
    }
}

/// Result type alias for pointer analysis operations
pub type Result<T> = std::result::Result<T, PtaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_converts() {
        let err: PtaError = ConfigError::Validation("bad".into()).into();
        assert!(err.is_config());
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_unsupported_message() {
        let err = PtaError::unsupported("const 1");
        assert!(!err.is_config());
        assert_eq!(err.to_string(), "Unsupported value for PAG node: const 1");
    }
}
