//! Error types for the PLY library.

use thiserror::Error;

/// Main error type for PLY operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Header line violates the header grammar
    #[error("Malformed header at line {line}: {message}")]
    MalformedHeader { line: usize, message: String },

    /// Format line names a version other than 1.0
    #[error("Unsupported PLY version: {0}")]
    UnsupportedVersion(String),

    /// Type is not registered (by Rust type or by header name)
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// Property is bound to a different type than requested
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Property has no type yet
    #[error("Property '{0}' is not bound to a type")]
    NotBound(String),

    /// Supplied value count differs from the element row count
    #[error("Length mismatch: expected {expected} rows, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Element or property not found by name
    #[error("Not found: {0}")]
    NotFound(String),

    /// List index type is not uint8/uint16/uint32
    #[error("Invalid list index type '{name}' at line {line}")]
    InvalidListIndexType { line: usize, name: String },

    /// Body data could not be decoded
    #[error("Malformed body: {0}")]
    MalformedBody(String),

    /// A type alias is already claimed by another registered type
    #[error("Type name already registered: {0}")]
    DuplicateTypeName(String),

    /// The Rust type is already registered
    #[error("Type already registered: {0}")]
    DuplicateType(String),

    /// List row longer than a 32-bit count prefix can describe
    #[error("List row of length {0} exceeds the largest index width")]
    ListTooLong(usize),

    /// Column buffer for this many rows could not be reserved
    #[error("Cannot allocate a column of {0} rows")]
    TooManyRows(usize),

    /// Element or property name that cannot be written into a header
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// I/O error (unopenable path, truncated stream, failed write)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a malformed header error for a 1-based line number.
    pub fn malformed(line: usize, msg: impl Into<String>) -> Self {
        Self::MalformedHeader { line, message: msg.into() }
    }

    /// Create a malformed body error.
    pub fn body(msg: impl Into<String>) -> Self {
        Self::MalformedBody(msg.into())
    }
}

/// Result type alias for PLY operations.
pub type Result<T> = std::result::Result<T, Error>;
