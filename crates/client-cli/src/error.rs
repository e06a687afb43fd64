use shared::Role;
use thiserror::Error;

/// Failure talking to the course API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error on {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned {status}{}", detail_suffix(.detail))]
    Status {
        endpoint: String,
        status: u16,
        detail: Option<String>,
    },

    #[error("unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("session storage: {0}")]
    Storage(#[from] StorageError),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {}", d)).unwrap_or_default()
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("could not determine data directory")]
    NoDataDir,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("corrupt session file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Why a bootstrap ended in a redirect to login
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to fetch user info: {0}")]
    Identity(#[source] ApiError),

    #[error("you are not authorized to access the {required} area (signed in as {actual})")]
    RoleMismatch { required: Role, actual: Role },

    #[error("failed to fetch {what}: {source}")]
    Dependent {
        what: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("session storage: {0}")]
    Storage(#[from] StorageError),
}

/// Client-side form validation failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Failure of a user action after the session is ready
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("session storage: {0}")]
    Storage(#[from] StorageError),
}
