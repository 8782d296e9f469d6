//! Error types for SQLRecord operations.

use std::fmt;

/// The primary error type for all SQLRecord operations.
#[derive(Debug)]
pub enum Error {
    /// Record-level errors raised by dispatch, finders and persistence
    Record(RecordError),
    /// Query execution errors reported by the connection layer
    Query(QueryError),
    /// Type conversion errors
    Type(TypeError),
    /// Invalid entity declarations
    Schema(SchemaError),
    /// Serialization/deserialization errors
    Serde(String),
    /// Custom error with message
    Custom(String),
}

/// An error raised by the record layer itself.
#[derive(Debug, Clone)]
pub struct RecordError {
    pub kind: RecordErrorKind,
    /// The attribute, method or entity name the error is about
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordErrorKind {
    /// Read or write of a name that is neither a column, an association nor
    /// an `_ids` accessor
    AttributeNotFound,
    /// Write attempted on a destroyed record
    ObjectFrozen,
    /// Method-style call that matches no association prefix or operation
    MethodOrAssociationNotFound,
    /// Id or id-list finder returned no rows
    RecordNotFound,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Syntax error in SQL
    Syntax,
    /// Constraint violation (unique, foreign key, etc.)
    Constraint,
    /// Connectivity lost or refused
    Connection,
    /// Other database error
    Database,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
    pub rust_type: Option<&'static str>,
}

#[derive(Debug)]
pub struct SchemaError {
    pub kind: SchemaErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorKind {
    /// Entity registered twice
    DuplicateEntity,
    /// Entity name not registered
    UnknownEntity,
    /// A field name is declared twice (column vs association, or two associations)
    DuplicateField,
    /// Association target cannot be resolved
    UnknownTarget,
    /// Invalid declaration, such as a missing primary key column
    Invalid,
}

impl Error {
    /// Build an `AttributeNotFound` error.
    pub fn attribute_not_found(name: &str) -> Self {
        Error::Record(RecordError {
            kind: RecordErrorKind::AttributeNotFound,
            name: name.to_string(),
            message: format!("attribute called '{name}' doesn't exist"),
        })
    }

    /// Build an `ObjectFrozen` error.
    pub fn object_frozen(name: &str) -> Self {
        Error::Record(RecordError {
            kind: RecordErrorKind::ObjectFrozen,
            name: name.to_string(),
            message: format!("can not update '{name}' as object is frozen"),
        })
    }

    /// Build a `MethodOrAssociationNotFound` error.
    pub fn method_not_found(name: &str) -> Self {
        Error::Record(RecordError {
            kind: RecordErrorKind::MethodOrAssociationNotFound,
            name: name.to_string(),
            message: format!("method or association not found for '{name}'"),
        })
    }

    /// Build a `RecordNotFound` error.
    pub fn record_not_found(entity: &str) -> Self {
        Error::Record(RecordError {
            kind: RecordErrorKind::RecordNotFound,
            name: entity.to_string(),
            message: format!("couldn't find any {entity}"),
        })
    }

    /// Build a schema error.
    pub fn schema(kind: SchemaErrorKind, message: impl Into<String>) -> Self {
        Error::Schema(SchemaError {
            kind,
            message: message.into(),
        })
    }

    /// The record error kind, if this is a record-level error.
    pub fn record_error_kind(&self) -> Option<RecordErrorKind> {
        match self {
            Error::Record(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Is this a `RecordNotFound` error?
    pub fn is_record_not_found(&self) -> bool {
        self.record_error_kind() == Some(RecordErrorKind::RecordNotFound)
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Record(e) => write!(f, "{}", e.message),
            Error::Query(e) => write!(f, "Query error: {}", e.message),
            Error::Type(e) => {
                if let Some(col) = &e.column {
                    write!(
                        f,
                        "Type error in column '{}': expected {}, found {}",
                        col, e.expected, e.actual
                    )
                } else {
                    write!(f, "Type error: expected {}, found {}", e.expected, e.actual)
                }
            }
            Error::Schema(e) => write!(f, "Schema error: {}", e.message),
            Error::Serde(msg) => write!(f, "Serialization error: {}", msg),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<RecordError> for Error {
    fn from(err: RecordError) -> Self {
        Error::Record(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Error::Schema(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err.to_string())
    }
}

/// Result type alias for SQLRecord operations.
pub type Result<T> = std::result::Result<T, Error>;
