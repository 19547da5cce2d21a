//! Error types for Forge

use thiserror::Error;

/// The main error type for Forge operations.
///
/// Variants fall into four user-facing categories: configuration,
/// external-service, content-policy, and data errors. All of them render
/// to a single human-readable message; none are retried automatically.
#[derive(Debug, Error)]
pub enum ForgeError {
    // Configuration
    #[error("{provider} credential is not configured. Run `forge config set` or set the matching FORGE_* environment variable")]
    MissingCredential { provider: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // External service
    #[error("Service error: {0}")]
    ServiceError(String),

    // Content policy
    #[error("Generation was blocked by the content safety filter. Try a different prompt")]
    SafetyBlocked,

    #[error("The provider returned an empty result: {0}")]
    EmptyResult(String),

    // Data
    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Corrupt local state: {0}")]
    CorruptState(String),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("Export error: {0}")]
    ExportError(String),

    // Domain lookups
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("A generation request is already in flight")]
    GenerationInProgress,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for Forge operations
pub type Result<T> = std::result::Result<T, ForgeError>;

impl From<serde_json::Error> for ForgeError {
    fn from(err: serde_json::Error) -> Self {
        ForgeError::CorruptState(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_message_names_provider() {
        let err = ForgeError::MissingCredential {
            provider: "Gemini".to_string(),
        };
        assert!(err.to_string().contains("Gemini"));
        assert!(err.to_string().contains("forge config set"));
    }

    #[test]
    fn test_safety_blocked_message() {
        let err = ForgeError::SafetyBlocked;
        assert!(err.to_string().contains("safety"));
    }
}
