use thiserror::Error;

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type for the provisioning tools
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Missing required environment variable(s): {}", .variables.join(", "))]
    MissingConfiguration { variables: Vec<String> },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Logging error: {message}")]
    Logging { message: String },
}

impl CoreError {
    /// Create a new missing configuration error
    pub fn missing_configuration(variables: Vec<String>) -> Self {
        Self::MissingConfiguration { variables }
    }

    /// Create a new configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new logging error
    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }

    /// Whether this error originates from absent or invalid configuration
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CoreError::MissingConfiguration { .. } | CoreError::Configuration { .. }
        )
    }
}
