//! Error taxonomy shared by every fnctl crate

use thiserror::Error;

/// Errors surfaced by providers, resource clients and the invoke path.
///
/// Backends translate HTTP responses into these values at their boundary;
/// nothing above the resource client ever sees a raw response.
#[derive(Error, Debug)]
pub enum FnError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid API endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("No provider with id '{0}' is registered")]
    UnknownProvider(String),

    #[error("{kind} {name} not found")]
    NotFound { kind: String, name: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotSupported(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server error [{status}]: {message}")]
    Internal { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Private key error: {0}")]
    Key(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FnError>;

/// Coarse classification of [`FnError`] used for retry and exit-code decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidEndpoint,
    UnknownProvider,
    NotFound,
    Conflict,
    PreconditionFailed,
    BadRequest,
    NotSupported,
    Unauthorized,
    Forbidden,
    Timeout,
    Cancelled,
    Transport,
    Internal,
    Config,
    Key,
    Decode,
    Io,
}

impl ErrorKind {
    /// Process exit code for this kind: 1 user error, 2 transport/remote, 3 not supported.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::NotSupported => 3,
            ErrorKind::Transport
            | ErrorKind::Timeout
            | ErrorKind::Cancelled
            | ErrorKind::Internal
            | ErrorKind::Decode
            | ErrorKind::Io => 2,
            _ => 1,
        }
    }

    /// Kinds that a transient retry loop may attempt again.
    ///
    /// `PreconditionFailed` is retryable only inside the optimistic update
    /// loop, which checks for it explicitly.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout | ErrorKind::Transport | ErrorKind::Internal
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "invalid-argument",
            ErrorKind::InvalidEndpoint => "invalid-endpoint",
            ErrorKind::UnknownProvider => "unknown-provider",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::PreconditionFailed => "precondition-failed",
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::NotSupported => "not-supported",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Transport => "transport",
            ErrorKind::Internal => "internal",
            ErrorKind::Config => "config",
            ErrorKind::Key => "key",
            ErrorKind::Decode => "decode",
            ErrorKind::Io => "io",
        };
        write!(f, "{}", name)
    }
}

impl FnError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FnError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            FnError::InvalidEndpoint { .. } => ErrorKind::InvalidEndpoint,
            FnError::UnknownProvider(_) => ErrorKind::UnknownProvider,
            FnError::NotFound { .. } => ErrorKind::NotFound,
            FnError::Conflict(_) => ErrorKind::Conflict,
            FnError::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            FnError::BadRequest(_) => ErrorKind::BadRequest,
            FnError::NotSupported(_) => ErrorKind::NotSupported,
            FnError::Unauthorized(_) => ErrorKind::Unauthorized,
            FnError::Forbidden(_) => ErrorKind::Forbidden,
            FnError::Timeout(_) => ErrorKind::Timeout,
            FnError::Cancelled => ErrorKind::Cancelled,
            FnError::Transport(_) => ErrorKind::Transport,
            FnError::Internal { .. } => ErrorKind::Internal,
            FnError::Config(_) => ErrorKind::Config,
            FnError::Key(_) => ErrorKind::Key,
            FnError::Decode(_) => ErrorKind::Decode,
            FnError::Io(_) => ErrorKind::Io,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }

    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        FnError::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Map a non-success HTTP status onto the taxonomy.
    ///
    /// `subject` names what was being addressed (an id or a name) and is
    /// carried by `NotFound`; `message` is the server's own text, if any.
    pub fn from_status(status: u16, subject: &str, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("HTTP status {}", status));
        match status {
            400 => FnError::BadRequest(message),
            401 => FnError::Unauthorized(message),
            403 => FnError::Forbidden(message),
            404 => FnError::not_found("resource", subject),
            409 => FnError::Conflict(message),
            412 => FnError::PreconditionFailed(message),
            408 | 504 => FnError::Timeout(message),
            _ => FnError::Internal { status, message },
        }
    }
}

impl From<reqwest::Error> for FnError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FnError::Timeout(err.to_string())
        } else if err.is_decode() {
            FnError::Decode(err.to_string())
        } else {
            FnError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FnError {
    fn from(err: serde_json::Error) -> Self {
        FnError::Decode(err.to_string())
    }
}

/// Error body shapes returned by the control planes.
///
/// The open-source server has used both `{"message": ".."}` and
/// `{"error": {"message": ".."}}`; the managed cloud adds a `code`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<NestedError>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct NestedError {
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Best-effort message extraction from a raw error body.
    pub fn message_from(bytes: &[u8]) -> Option<String> {
        let body: ErrorBody = serde_json::from_slice(bytes).ok()?;
        body.message
            .or_else(|| body.error.and_then(|e| e.message))
            .filter(|m| !m.is_empty())
    }
}
