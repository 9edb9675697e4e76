use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A wizard answer that fails its field's constraint.
///
/// Recovered locally: the wizard re-prompts and the session stays put.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("'{value}' does not look like a repository URL")]
    NotAUrl { value: String },

    #[error("'{value}' is not a KernelSU option (choose both, sus, ksu or skip)")]
    UnknownKsuMode { value: String },

    #[error("{field} must not contain whitespace")]
    ContainsWhitespace { field: &'static str },
}

/// Errors from triggering the CI workflow.
///
/// Every variant ends the wizard run; none are retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DispatchError {
    /// HTTP 401/403: the CI token is missing, expired or lacks scope.
    #[error("not authorized to trigger the workflow: {0}")]
    Unauthorized(String),

    /// HTTP 404: owner, repository or workflow file does not exist.
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    /// HTTP 422: the workflow rejected the inputs or ref.
    #[error("workflow rejected the inputs: {0}")]
    InvalidInput(String),

    /// Network failure, timeout or any other unexpected status.
    #[error("temporary failure: {0}")]
    Transient(String),
}

impl DispatchError {
    /// Whether starting a new run later might succeed without changes.
    pub fn is_transient(&self) -> bool {
        matches!(self, DispatchError::Transient(_))
    }
}

/// Errors from the chat transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("chat API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),
}

/// Errors from loading process configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required credential is absent. Fatal at startup.
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    Io(String),

    #[error("failed to parse config file: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::Empty { field: "Kernel Branch" };
        assert_eq!(err.to_string(), "Kernel Branch cannot be empty");
    }

    #[test]
    fn test_dispatch_error_display() {
        let err = DispatchError::Unauthorized("Bad credentials".to_string());
        assert_eq!(
            err.to_string(),
            "not authorized to trigger the workflow: Bad credentials"
        );
        assert!(!err.is_transient());
        assert!(DispatchError::Transient("timed out".to_string()).is_transient());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Missing("GITHUB_TOKEN");
        assert_eq!(err.to_string(), "missing required setting GITHUB_TOKEN");
    }

    #[test]
    fn test_dispatch_error_serde_shape() {
        let err = DispatchError::InvalidInput("Unexpected inputs provided".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "invalid_input");
        assert_eq!(json["detail"], "Unexpected inputs provided");
    }
}
