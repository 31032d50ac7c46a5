//! Error types for orm-lite.

use thiserror::Error;

/// The main error type for orm-lite operations.
#[derive(Debug, Error)]
pub enum OrmError {
    /// Table name or connection missing, or an unusable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A table that was never declared or registered.
    #[error("Unknown table: '{0}'")]
    UnknownTable(String),

    /// Malformed column declaration.
    #[error("Declaration error in {table}.{column}: {message}")]
    Declaration {
        table: String,
        column: String,
        message: String,
    },

    /// A supplied value failed type validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Insert refused because required columns have no value.
    #[error("Required fields missed: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    /// Update called without any assignment.
    #[error("Nothing to update")]
    NothingToUpdate,

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The store rejected or failed to run a statement.
    #[error("Error SQL query executing: {label}: {message}")]
    Execution { label: String, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed.
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Why a supplied value could not be bound to its column.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Incorrect value type for {column}({declared_type}): {value}")]
    IncorrectType {
        column: String,
        declared_type: String,
        value: String,
    },

    #[error("Unrecognized type {declared_type} for column {column}")]
    UnrecognizedType {
        column: String,
        declared_type: String,
    },
}

/// Coarse failure classes, so callers can tell "no rows" from "refused"
/// from "the store failed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Validation,
    Execution,
}

impl OrmError {
    /// Create a declaration error for one column.
    pub fn declaration(
        table: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Declaration {
            table: table.into(),
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an execution error tagged with the failing operation.
    pub fn execution(label: impl Into<String>, message: impl ToString) -> Self {
        Self::Execution {
            label: label.into(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_)
            | Self::UnknownTable(_)
            | Self::Declaration { .. }
            | Self::Io(_)
            | Self::Toml(_) => ErrorKind::Configuration,
            Self::Validation(_) | Self::MissingRequired(_) | Self::NothingToUpdate => {
                ErrorKind::Validation
            }
            Self::Connection(_) | Self::Execution { .. } => ErrorKind::Execution,
        }
    }
}

/// Result type alias for orm-lite operations.
pub type OrmResult<T> = Result<T, OrmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OrmError::MissingRequired(vec!["id".into(), "email".into()]);
        assert_eq!(err.to_string(), "Required fields missed: id, email");

        let err = OrmError::execution("add", "UNIQUE constraint failed: users.id");
        assert_eq!(
            err.to_string(),
            "Error SQL query executing: add: UNIQUE constraint failed: users.id"
        );
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(OrmError::Config("x".into()).kind(), ErrorKind::Configuration);
        assert_eq!(OrmError::NothingToUpdate.kind(), ErrorKind::Validation);
        let err: OrmError = ValidationError::UnrecognizedType {
            column: "price".into(),
            declared_type: "DECIMAL".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(OrmError::execution("drop", "locked").kind(), ErrorKind::Execution);
    }
}
