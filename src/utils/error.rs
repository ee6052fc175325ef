use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("{source_name} responded with HTTP {status}")]
    HttpStatus { source_name: String, status: u16 },

    #[error("{source_name} returned a malformed response: {message}")]
    MalformedResponse {
        source_name: String,
        message: String,
    },

    #[error("{source_name} timed out")]
    Timeout { source_name: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },
}

impl ResolveError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Whether a source adapter may retry the call that produced this error.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ApiError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let rate_limited = ResolveError::HttpStatus {
            source_name: "usda".to_string(),
            status: 429,
        };
        let server_error = ResolveError::HttpStatus {
            source_name: "usda".to_string(),
            status: 503,
        };
        let unauthorized = ResolveError::HttpStatus {
            source_name: "usda".to_string(),
            status: 401,
        };

        assert!(rate_limited.is_transient());
        assert!(server_error.is_transient());
        assert!(!unauthorized.is_transient());
        assert!(ResolveError::Timeout {
            source_name: "web".to_string()
        }
        .is_transient());
        assert!(!ResolveError::invalid_input("empty").is_transient());
    }
}
