use std::path::PathBuf;

use crate::validate::Issue;

/// Failure talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("could not reach the server: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    /// HTTP 401 on a non-session endpoint.
    #[error("session expired")]
    SessionExpired,

    #[error("server returned {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status { status: u16, message: Option<String> },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("invalid server url '{0}'")]
    InvalidUrl(String),
}

impl ApiError {
    /// The sentence shown to the user for this error.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { message: Some(m), .. } if !m.trim().is_empty() => m.clone(),
            ApiError::Network(_) => {
                "Unable to connect to the server. Please check your internet connection.".to_string()
            }
            ApiError::Timeout => "Request timed out. Please try again.".to_string(),
            ApiError::SessionExpired => "Session expired. Please log in again.".to_string(),
            ApiError::Status { status: 400, .. } => "Bad request. Please check the data you provided.".to_string(),
            ApiError::Status { status: 404, .. } => "The requested item could not be found.".to_string(),
            ApiError::Status { status: 500, .. } => "Server encountered an error. Please try again later.".to_string(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ApiError::Status { status: status.as_u16(), message: None }
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

/// Failure reading or writing local state files.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

/// Top-level error of a CLI command.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid task: {}", .0.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("; "))]
    Invalid(Vec<Issue>),

    #[error("{0}")]
    Usage(String),
}

impl AppError {
    pub fn user_message(&self) -> String {
        match self {
            AppError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}
