//! Error types for sqlpilot.
//!
//! `AppError` is returned by the capabilities (database, LLM, config) and the
//! binary. `WorkflowError` is the taxonomy the workflow controller reasons
//! about when deciding whether to retry.

use thiserror::Error;

/// Main error type for sqlpilot operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database connection errors (host unreachable, auth failed, pool exhausted, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (syntax errors, unknown columns, timeouts, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// LLM API errors (unreachable server, timeouts, malformed responses, etc.)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration errors (invalid config file, bad connection string, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Llm(_) => "LLM Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Connection(msg)
            | Self::Query(msg)
            | Self::Llm(msg)
            | Self::Config(msg)
            | Self::Internal(msg) => msg,
        }
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

/// Marker carried in the text form of a critical error.
///
/// The job layer looks for it when deciding whether a run failed.
pub const CRITICAL_MARKER: &str = "CRITICAL_DB_CONNECTION_ERROR";

/// Failure classes observed by the workflow controller.
///
/// The `Display` text is what gets quoted back to the model on retry, so it
/// should read like a database error message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// Schema could not be fetched after all attempts. Never retried.
    #[error("CRITICAL_DB_CONNECTION_ERROR")]
    CriticalConnection,

    /// The safety gate rejected the candidate statement.
    #[error("Read-only policy: data-modifying statements are not permitted.")]
    UnsafeQuery,

    /// The database rejected or failed the query.
    #[error("Database returned: {0}")]
    Execution(String),

    /// The completion capability failed or produced nothing usable.
    #[error("SQL generation failed: {0}")]
    Generation(String),
}

impl WorkflowError {
    /// Returns true for the failure class that bypasses retry.
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::CriticalConnection)
    }

    /// Returns true if the controller may loop back to generation.
    pub fn is_retryable(&self) -> bool {
        !self.is_critical()
    }

    /// Short label attached to workflow warnings.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CriticalConnection => "critical_connection",
            Self::UnsafeQuery => "unsafe_query",
            Self::Execution(_) => "execution",
            Self::Generation(_) => "generation",
        }
    }
}

impl From<AppError> for WorkflowError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Llm(msg) => Self::Generation(msg),
            other => Self::Execution(other.message().to_string()),
        }
    }
}
