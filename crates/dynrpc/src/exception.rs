//! The payload of an exception envelope.

use std::fmt;

use crate::value::Record;
use crate::value::Value;

const MESSAGE_FIELD: i16 = 1;
const KIND_FIELD: i16 = 2;

/// Used when the exception payload carries no readable message.
const GENERIC_MESSAGE: &str = "remote application exception";

/// Standard application exception kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationExceptionKind {
    Unknown = 0,
    UnknownMethod = 1,
    InvalidMessageType = 2,
    WrongMethodName = 3,
    BadSequenceId = 4,
    MissingResult = 5,
    InternalError = 6,
    ProtocolError = 7,
    InvalidTransform = 8,
    InvalidProtocol = 9,
    UnsupportedClientType = 10,
}

impl ApplicationExceptionKind {
    pub fn from_i32(v: i32) -> Self {
        match v {
            1 => Self::UnknownMethod,
            2 => Self::InvalidMessageType,
            3 => Self::WrongMethodName,
            4 => Self::BadSequenceId,
            5 => Self::MissingResult,
            6 => Self::InternalError,
            7 => Self::ProtocolError,
            8 => Self::InvalidTransform,
            9 => Self::InvalidProtocol,
            10 => Self::UnsupportedClientType,
            _ => Self::Unknown,
        }
    }
}

/// A fault raised by the remote side instead of a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationException {
    pub kind: ApplicationExceptionKind,
    pub message: String,
}

impl ApplicationException {
    pub fn new(kind: ApplicationExceptionKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    /// Extracts the message (field 1) and kind (field 2) from a decoded payload.
    ///
    /// Missing or mistyped fields fall back to a generic message and `Unknown`.
    pub fn from_record(record: &Record) -> Self {
        let message = match record.get(MESSAGE_FIELD) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => GENERIC_MESSAGE.to_string(),
        };
        let kind = match record.get(KIND_FIELD) {
            Some(Value::I32(v)) => ApplicationExceptionKind::from_i32(*v),
            _ => ApplicationExceptionKind::Unknown,
        };
        Self { kind, message }
    }

    /// Used when the payload could not be decoded at all.
    pub fn generic() -> Self {
        Self::new(ApplicationExceptionKind::Unknown, GENERIC_MESSAGE)
    }

    /// The payload record, as a server would write it.
    pub fn to_record(&self) -> Record {
        let mut record = Record::new("TApplicationException");
        record.set(MESSAGE_FIELD, Value::String(self.message.clone()));
        record.set(KIND_FIELD, Value::I32(self.kind as i32));
        record
    }
}

impl fmt::Display for ApplicationException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ApplicationException {}
