//! # Error Definitions
//!
//! The central ledger of codec, coercion and remote failures.

use std::fmt;

use dynpack::Error as PackError;
use dynpack::MessageType;

use crate::exception::ApplicationException;

/// Failures while converting, encoding or decoding values.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The binary protocol rejected the bytes or the write sequence.
    Protocol(PackError),
    /// The reply envelope was an exception.
    Remote(ApplicationException),
    /// A native value has no wire representation.
    Unsupported(String),
    /// Two members of one record declared the same field id.
    DuplicateFieldId(i16),
    /// A decoded value could not be mapped onto the requested shape.
    ///
    /// `path` lists the field keys (`field_<id>`) and sequence indices leading to the
    /// offending value, outermost first.
    Coercion { path: Vec<String>, message: String },
    /// The envelope kind cannot appear where a reply is expected.
    UnexpectedMessage(MessageType),
    /// Values nested deeper than the configured limit.
    RecursionLimitExceeded(usize),
}

impl Error {
    pub(crate) fn coercion(message: impl Into<String>) -> Self {
        Error::Coercion { path: Vec::new(), message: message.into() }
    }

    /// Prefixes a coercion error with the field or index it occurred under.
    pub fn at(self, segment: impl Into<String>) -> Self {
        match self {
            Error::Coercion { mut path, message } => {
                path.insert(0, segment.into());
                Error::Coercion { path, message }
            }
            other => other,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Protocol(e) => write!(f, "Protocol error: {}", e),
            Error::Remote(e) => write!(f, "Remote error: {}", e),
            Error::Unsupported(msg) => write!(f, "Unsupported value: {}", msg),
            Error::DuplicateFieldId(id) => write!(f, "Duplicate field id: {}", id),
            Error::Coercion { path, message } if path.is_empty() => {
                write!(f, "Coercion failed: {}", message)
            }
            Error::Coercion { path, message } => {
                write!(f, "Coercion failed at {}: {}", path.join("."), message)
            }
            Error::UnexpectedMessage(kind) => write!(f, "Unexpected message kind: {:?}", kind),
            Error::RecursionLimitExceeded(limit) => write!(f, "Nesting exceeds {} levels", limit),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PackError> for Error {
    fn from(e: PackError) -> Self {
        match e {
            PackError::DepthLimitExceeded(limit) => Self::RecursionLimitExceeded(limit),
            other => Self::Protocol(other),
        }
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Unsupported(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::coercion(msg.to_string())
    }

    fn missing_field(field: &'static str) -> Self {
        Error::Coercion { path: vec![field.to_string()], message: "missing field".into() }
    }
}

/// A specialized Result type for value operations.
pub type Result<T> = std::result::Result<T, Error>;
