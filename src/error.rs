//! Error types for the Vercel provider.

use thiserror::Error;

/// Errors returned by provider operations.
///
/// Each variant maps onto a gRPC status code and, inside RPC responses, onto
/// an error [`Diagnostic`](crate::schema::Diagnostic).
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The remote object does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Configuration or an identifier failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The Vercel API returned an error other than "not found".
    #[error("Remote error: {0}")]
    Remote(String),

    /// A local file could not be read.
    #[error("IO error: {0}")]
    Io(String),

    /// The provider is not (or cannot be) configured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// State or configuration JSON did not match the expected shape.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A gRPC transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

impl ProviderError {
    /// Get the error message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Remote(msg) => msg,
            Self::Io(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::Transport(_err) => "transport error (see Debug output)",
        }
    }

    /// Short, human-readable title used as a diagnostic summary.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Resource not found",
            Self::Validation(_) => "Invalid configuration",
            Self::Remote(_) => "Vercel API error",
            Self::Io(_) => "Error reading file",
            Self::Configuration(_) => "Provider not configured",
            Self::UnknownResource(_) => "Unknown resource type",
            Self::Serialization(_) => "Invalid state",
            Self::Transport(_) => "Transport error",
        }
    }

    /// Whether this error means the remote object is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Remote(msg) => tonic::Status::unavailable(msg),
            ProviderError::Io(msg) => tonic::Status::internal(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            }
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("Transport error: {}", err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("example.com".to_string());
        assert_eq!(format!("{}", err), "Resource not found: example.com");

        let err = ProviderError::Validation("bad id".to_string());
        assert_eq!(format!("{}", err), "Validation error: bad id");

        let err = ProviderError::Io("missing.txt".to_string());
        assert_eq!(format!("{}", err), "IO error: missing.txt");
    }

    #[test]
    fn test_error_to_status() {
        let status: tonic::Status = ProviderError::NotFound("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let status: tonic::Status = ProviderError::Validation("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status: tonic::Status = ProviderError::Remote("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::Unavailable);

        let status: tonic::Status = ProviderError::Configuration("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let status: tonic::Status = ProviderError::Io("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::Internal);
    }

    #[test]
    fn test_message_and_summary() {
        let err = ProviderError::Remote("500 internal".to_string());
        assert_eq!(err.message(), "500 internal");
        assert_eq!(err.summary(), "Vercel API error");
        assert!(!err.is_not_found());

        assert!(ProviderError::NotFound("x".to_string()).is_not_found());
    }
}
