//! Error types for aliasforge

use std::fmt;

/// Result type alias for aliasforge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for aliasforge
#[derive(Debug)]
pub enum Error {
    /// Optimistic-concurrency conflict: the expected previous version no
    /// longer matches the stored latest for a subject.
    StaleWrite {
        subject: String,
        stored: Option<u64>,
        expected: Option<u64>,
    },
    /// An alias, org, metric, or field failed to resolve
    NotFound(String),
    /// Creation collided with an existing org, alias, or field
    AlreadyExists(String),
    /// Unsupported field-type name
    InvalidType(String),
    /// One or more names collide with reserved stop-word patterns
    ReservedName(Vec<String>),
    /// A record could not be encoded: missing org/metric value, unparsable
    /// timestamp, or an uncoercible field value
    MalformedRecord(String),
    /// Repository backend failure
    Repository(String),
    /// Serialization errors
    Serialization(String),
    /// Configuration errors
    Config(String),
    /// Too many retries
    TooManyRetries,
    /// Internal error
    Internal(String),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::StaleWrite {
                subject,
                stored,
                expected,
            } => write!(
                f,
                "Stale write on subject {}: stored latest is {:?}, expected {:?}",
                subject, stored, expected
            ),
            Error::NotFound(what) => write!(f, "Not found: {}", what),
            Error::AlreadyExists(what) => write!(f, "Already exists: {}", what),
            Error::InvalidType(name) => write!(f, "Invalid field type: {}", name),
            Error::ReservedName(names) => {
                write!(f, "Reserved names not allowed: {}", names.join(", "))
            }
            Error::MalformedRecord(msg) => write!(f, "Malformed record: {}", msg),
            Error::Repository(msg) => write!(f, "Repository error: {}", msg),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::TooManyRetries => {
                write!(f, "Too many retries: operation failed after maximum retry attempts")
            }
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
