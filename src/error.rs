//! Error types for the MCP database server.
//!
//! Every failure the server reports carries a stable `kind` tag so that an
//! assistant can tell "fix your input" apart from "the database is unavailable"
//! and "the statement failed".

use crate::gate::PolicyViolation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid input: {message}")]
    Validation { message: String },

    #[error("Query blocked: {0}")]
    PolicyViolation(PolicyViolation),

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Not connected to a database")]
    NotConnected,

    #[error("Query failed: {message}")]
    Execution {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("{object_type} '{name}' not found")]
    NotFound { object_type: String, name: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Coarse grouping of errors by who has to act on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller sent something unacceptable.
    Input,
    /// The database (or connection to it) is unavailable.
    Environment,
    /// The statement reached the database and failed there.
    Statement,
    Internal,
}

impl DbError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create an execution error with optional SQL state.
    pub fn execution(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Execution {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    pub fn not_found(object_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            object_type: object_type.into(),
            name: name.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable tag for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::PolicyViolation(_) => "policy_violation",
            Self::Connection { .. } | Self::NotConnected => "connection_error",
            Self::Execution { .. } => "execution_error",
            Self::NotFound { .. } => "not_found",
            Self::Internal { .. } => "internal_error",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } | Self::PolicyViolation(_) | Self::NotFound { .. } => {
                ErrorCategory::Input
            }
            Self::Connection { .. } | Self::NotConnected => ErrorCategory::Environment,
            Self::Execution { .. } => ErrorCategory::Statement,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Execution { suggestion, .. } => Some(suggestion),
            Self::NotConnected => Some("Call connect_to_database first"),
            Self::PolicyViolation(violation) => Some(violation.suggestion()),
            Self::NotFound { .. } => Some("Use list_tables to see the available tables"),
            _ => None,
        }
    }

    /// Wrap any error raised while opening a connection as a connection error,
    /// keeping connection errors as they are.
    pub fn into_connection_error(self, suggestion: &str) -> Self {
        match self {
            Self::Connection { .. } | Self::Validation { .. } => self,
            other => Self::connection(other.to_string(), suggestion),
        }
    }
}

impl From<PolicyViolation> for DbError {
    fn from(violation: PolicyViolation) -> Self {
        Self::PolicyViolation(violation)
    }
}

/// Convert sqlx errors raised while connecting or reading catalogs.
/// Statement execution maps its own errors in `db::executor`.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::execution(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced tables and columns",
                )
            }
            sqlx::Error::PoolTimedOut => DbError::connection(
                "Timed out waiting for a database connection",
                "The database may be overloaded or unreachable",
            ),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => DbError::execution(
                format!("Column not found: {}", col),
                None,
                "Use describe_table to check column names",
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            other => DbError::execution(
                other.to_string(),
                None,
                "Check the SQL statement and try again",
            ),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

fn error_data(err: &DbError) -> Option<serde_json::Value> {
    let mut data = serde_json::json!({ "kind": err.kind() });
    if let Some(suggestion) = err.suggestion() {
        data["suggestion"] = serde_json::Value::String(suggestion.to_string());
    }
    if let DbError::PolicyViolation(violation) = err {
        data["reason"] = serde_json::to_value(violation).unwrap_or_default();
    }
    Some(data)
}

/// Convert DbError to MCP ErrorData for semantic error categorization.
/// The `data` object always carries the `kind` tag and, when available, a suggestion.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        let data = error_data(&err);
        match &err {
            DbError::Validation { .. } | DbError::PolicyViolation(_) => {
                rmcp::ErrorData::invalid_params(err.to_string(), data)
            }

            DbError::NotFound { .. } => rmcp::ErrorData::resource_not_found(err.to_string(), data),

            DbError::Execution {
                message, sql_state, ..
            } => {
                let msg = match sql_state {
                    Some(code) => format!("Query failed: {} (SQLSTATE: {})", message, code),
                    None => err.to_string(),
                };
                rmcp::ErrorData::invalid_params(msg, data)
            }

            DbError::Connection { .. } | DbError::NotConnected | DbError::Internal { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), data)
            }
        }
    }
}
