//! Error types for litorm

use crate::value::{StorageType, Value};
use thiserror::Error;

/// Result type alias for litorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Structural problems in table declarations or query references.
///
/// These are always detected before any statement reaches the engine:
/// either while a table is built, when a connection is opened, or when a
/// query is prepared.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("table `{0}` is declared more than once")]
    DuplicateTable(String),

    #[error("record type `{0}` is mapped by more than one table")]
    DuplicateRecordType(String),

    #[error("table `{0}` declares no columns")]
    EmptyTable(String),

    #[error("column `{column}` is declared more than once in table `{table}`")]
    DuplicateColumn { table: String, column: String },

    #[error("table `{0}` declares more than one primary key")]
    MultiplePrimaryKeys(String),

    #[error("table `{0}` has no primary key")]
    MissingPrimaryKey(String),

    #[error("column `{table}`.`{column}` uses AUTOINCREMENT but is not an INTEGER PRIMARY KEY")]
    InvalidAutoincrement { table: String, column: String },

    #[error("foreign key `{table}`.`{column}` references unknown table `{referenced}`")]
    UnknownReferencedTable {
        table: String,
        column: String,
        referenced: String,
    },

    #[error(
        "foreign key `{table}`.`{column}` references unknown column `{referenced_table}`.`{referenced_column}`"
    )]
    UnknownReferencedColumn {
        table: String,
        column: String,
        referenced_table: String,
        referenced_column: String,
    },

    #[error("table `{0}` is not part of this query")]
    UnknownTable(String),

    #[error("no column `{column}` in {table}")]
    UnknownColumn { table: String, column: String },

    #[error("column `{0}` is ambiguous in this query")]
    AmbiguousColumn(String),
}

/// Error types for database operations
#[derive(Debug, Clone, Error)]
pub enum OrmError {
    /// Declaration or reference error
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A value whose storage class does not fit the column
    #[error("Type mismatch on column '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: StorageType,
        found: &'static str,
    },

    /// Row or item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The engine rejected the SQL text
    #[error("Prepare error: {message} (sql: {sql})")]
    Prepare { sql: String, message: String },

    /// Statement execution error
    #[error("Step error: {0}")]
    Step(String),

    /// Unique or primary key constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// NOT NULL constraint violation
    #[error("Not null violation: {0}")]
    NotNullViolation(String),

    /// Opening or configuring the storage handle failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// Builder misuse (empty SET, mutation after prepare, placeholder mismatch)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl OrmError {
    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a type mismatch error for a value that does not fit `column`
    pub fn type_mismatch(column: impl Into<String>, expected: StorageType, found: &Value) -> Self {
        Self::TypeMismatch {
            column: column.into(),
            expected,
            found: found.type_name(),
        }
    }

    pub(crate) fn prepare(sql: &str, err: impl std::fmt::Display) -> Self {
        Self::Prepare {
            sql: sql.to_string(),
            message: err.to_string(),
        }
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a schema error
    pub fn is_schema_error(&self) -> bool {
        matches!(self, Self::Schema(_))
    }

    /// Check if this is a type mismatch error
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }

    /// The schema error carried by this error, if any.
    pub fn as_schema_error(&self) -> Option<&SchemaError> {
        match self {
            Self::Schema(err) => Some(err),
            _ => None,
        }
    }

    /// Parse a rusqlite error into a more specific OrmError
    pub fn from_sqlite(err: rusqlite::Error) -> Self {
        use rusqlite::ffi;

        if let rusqlite::Error::SqliteFailure(code, message) = &err {
            let detail = message.clone().unwrap_or_else(|| code.to_string());
            match code.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return Self::UniqueViolation(detail);
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return Self::ForeignKeyViolation(detail),
                ffi::SQLITE_CONSTRAINT_NOTNULL => return Self::NotNullViolation(detail),
                _ => {}
            }
        }
        Self::Step(err.to_string())
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_failures_are_classified() {
        let unique = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE),
            Some("UNIQUE constraint failed: users.name".to_string()),
        );
        let err = OrmError::from_sqlite(unique);
        assert!(err.is_unique_violation());
        assert!(err.to_string().contains("users.name"));

        let fk = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY),
            None,
        );
        assert!(matches!(OrmError::from_sqlite(fk), OrmError::ForeignKeyViolation(_)));
    }

    #[test]
    fn other_failures_become_step_errors() {
        let err = OrmError::from_sqlite(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(err, OrmError::Step(_)));
    }

    #[test]
    fn schema_errors_convert() {
        let err: OrmError = SchemaError::DuplicateTable("users".into()).into();
        assert!(err.is_schema_error());
        assert_eq!(
            err.as_schema_error(),
            Some(&SchemaError::DuplicateTable("users".into()))
        );
    }
}
