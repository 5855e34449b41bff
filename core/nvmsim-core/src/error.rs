//! Error types for the nvmsim cost simulator.
//!
//! All public APIs return `SimResult<T>`. No panics in library code, except
//! for the entry-count invariant checks of the adaptive-merging decorators.

use thiserror::Error;

/// Unified error type for all simulator operations.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid construction parameters (partition geometry, device spec, LAM tuning)
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid argument passed to an operation
    #[error("invalid argument: {message}\nContext: {context}")]
    InvalidArgument { message: String, context: String },

    /// Operation not supported by this index
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Standard I/O error (configuration files)
    #[error("io error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl SimError {
    pub(crate) fn invalid_argument(message: impl Into<String>, context: impl Into<String>) -> Self {
        SimError::InvalidArgument {
            message: message.into(),
            context: context.into(),
        }
    }
}

/// Result type alias for all simulator operations.
pub type SimResult<T> = Result<T, SimError>;

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_config() {
        let err = SimError::InvalidConfig("partition smaller than one record".to_string());
        assert_eq!(
            err.to_string(),
            "invalid configuration: partition smaller than one record"
        );
    }

    #[test]
    fn error_display_invalid_argument() {
        let err = SimError::invalid_argument("selectivity 1.5 outside [0, 1]", "find_point_entries");
        assert!(err.to_string().contains("invalid argument"));
        assert!(err.to_string().contains("1.5"));
        assert!(err.to_string().contains("find_point_entries"));
    }

    #[test]
    fn error_display_unsupported() {
        let err = SimError::Unsupported("bulkload on AdaptiveMerging".to_string());
        assert_eq!(
            err.to_string(),
            "unsupported operation: bulkload on AdaptiveMerging"
        );
    }

    #[test]
    fn serde_json_error_converts() {
        let parse: Result<u32, _> = serde_json::from_str("not json");
        let err: SimError = parse.unwrap_err().into();
        assert!(matches!(err, SimError::Serialization(_)));
    }

    #[test]
    fn sim_result_err() {
        let result: SimResult<f64> = Err(SimError::Unsupported("x".to_string()));
        assert!(result.is_err());
    }
}
