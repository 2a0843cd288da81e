use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoteError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV export error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Index {index} is out of bounds for a list of {len} entries")]
    IndexError { index: usize, len: usize },

    #[error("No user is logged in")]
    NotAuthenticated,

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("Backend returned {status}: {message}")]
    BackendStatus { status: u16, message: String },

    #[error("Malformed {resource} payload: {message}")]
    MalformedResponse { resource: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Backend,
    Input,
    Configuration,
    Storage,
    Session,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl VoteError {
    pub fn validation(message: impl Into<String>) -> Self {
        VoteError::ValidationError {
            message: message.into(),
        }
    }

    pub fn malformed(resource: &str, message: impl Into<String>) -> Self {
        VoteError::MalformedResponse {
            resource: resource.to_string(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            VoteError::ApiError(_) => ErrorCategory::Network,
            VoteError::BackendStatus { .. }
            | VoteError::MalformedResponse { .. }
            | VoteError::NotFound { .. } => ErrorCategory::Backend,
            VoteError::ValidationError { .. } | VoteError::IndexError { .. } => {
                ErrorCategory::Input
            }
            VoteError::ConfigError { .. }
            | VoteError::ConfigValidationError { .. }
            | VoteError::InvalidConfigValueError { .. }
            | VoteError::MissingConfigError { .. } => ErrorCategory::Configuration,
            VoteError::IoError(_) | VoteError::SerializationError(_) | VoteError::CsvError(_) => {
                ErrorCategory::Storage
            }
            VoteError::NotAuthenticated => ErrorCategory::Session,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            VoteError::NotFound { .. } => ErrorSeverity::Low,
            VoteError::ApiError(_) | VoteError::BackendStatus { .. } => ErrorSeverity::Medium,
            VoteError::ValidationError { .. }
            | VoteError::IndexError { .. }
            | VoteError::NotAuthenticated
            | VoteError::MalformedResponse { .. }
            | VoteError::ConfigError { .. }
            | VoteError::ConfigValidationError { .. }
            | VoteError::InvalidConfigValueError { .. }
            | VoteError::MissingConfigError { .. } => ErrorSeverity::High,
            VoteError::IoError(_) | VoteError::SerializationError(_) | VoteError::CsvError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check the backend endpoint and your connection, then try again",
            ErrorCategory::Backend => "The backend rejected the request; refresh and try again",
            ErrorCategory::Input => "Check the category name, game id or positions you entered",
            ErrorCategory::Configuration => "Fix the configuration file or command line flags",
            ErrorCategory::Storage => "Check that the session file is readable and writable",
            ErrorCategory::Session => "Log in with `boardgame-vote login --email <address>` first",
        }
    }

    /// Short message meant for a transient notification.
    pub fn user_friendly_message(&self) -> String {
        match self {
            VoteError::ApiError(e) if e.is_timeout() => "The backend took too long to answer".to_string(),
            VoteError::ApiError(_) => "Could not reach the backend".to_string(),
            VoteError::BackendStatus { message, .. } => format!("Request failed: {}", message),
            VoteError::MalformedResponse { resource, .. } => {
                format!("The backend sent an unexpected {} response", resource)
            }
            VoteError::NotAuthenticated => "You need to log in first".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VoteError>;
