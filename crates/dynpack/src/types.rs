//! Core types for the Thrift binary protocol

use std::fmt;

/// Version marker carried in the high half of a strict message header.
pub const VERSION_1: u32 = 0x8001_0000;
/// Mask selecting the version bits of a strict message header.
pub const VERSION_MASK: u32 = 0xffff_0000;

/// Wire type tags.
///
/// A zero tag (`Stop`) terminates a record.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TType {
    Stop = 0,
    Void = 1,
    Bool = 2,
    Byte = 3,
    Double = 4,
    I16 = 6,
    I32 = 8,
    I64 = 10,
    String = 11,
    Struct = 12,
    Map = 13,
    Set = 14,
    List = 15,
    Uuid = 16,
}

impl TType {
    pub const fn from_u8(b: u8) -> Option<Self> {
        match b {
            0 => Some(TType::Stop),
            1 => Some(TType::Void),
            2 => Some(TType::Bool),
            3 => Some(TType::Byte),
            4 => Some(TType::Double),
            6 => Some(TType::I16),
            8 => Some(TType::I32),
            10 => Some(TType::I64),
            11 => Some(TType::String),
            12 => Some(TType::Struct),
            13 => Some(TType::Map),
            14 => Some(TType::Set),
            15 => Some(TType::List),
            16 => Some(TType::Uuid),
            _ => None,
        }
    }

    /// The smallest number of bytes a value of this type occupies on the wire.
    ///
    /// Used to reject collection counts that cannot possibly fit in the remaining input.
    pub const fn min_wire_size(self) -> usize {
        match self {
            TType::Stop | TType::Void => 0,
            TType::Bool | TType::Byte | TType::Struct => 1,
            TType::I16 => 2,
            TType::I32 | TType::String => 4,
            TType::I64 | TType::Double => 8,
            TType::Set | TType::List => 5,
            TType::Map => 6,
            TType::Uuid => 16,
        }
    }
}

/// The kind of an envelope.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Call = 1,
    Reply = 2,
    Exception = 3,
    Oneway = 4,
}

impl MessageType {
    pub const fn from_u8(b: u8) -> Option<Self> {
        match b {
            1 => Some(MessageType::Call),
            2 => Some(MessageType::Reply),
            3 => Some(MessageType::Exception),
            4 => Some(MessageType::Oneway),
            _ => None,
        }
    }
}

/// The outer framing of a request or response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub name: String,
    pub kind: MessageType,
    pub seq: i32,
}

impl MessageHeader {
    pub fn new(name: impl Into<String>, kind: MessageType, seq: i32) -> Self {
        Self { name: name.into(), kind, seq }
    }
}

/// A field header inside a record.
///
/// When `ttype` is `TType::Stop` the record is finished and `id` is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHeader {
    pub ttype: TType,
    pub id: i16,
}

impl FieldHeader {
    pub fn is_stop(&self) -> bool {
        self.ttype == TType::Stop
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListHeader {
    pub elem: TType,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetHeader {
    pub elem: TType,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapHeader {
    pub key: TType,
    pub value: TType,
    pub count: usize,
}

/// Internal state tracking for the `Encoder` stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The virtual root; allows any number of items.
    Root,
    /// A message body; allows at most one record.
    Message,
    /// A record; only field headers and the stop marker may be written.
    Struct,
    /// A field payload; exactly one item.
    Field,
    /// Exactly the declared number of items.
    List,
    /// Exactly the declared number of items.
    Set,
    /// Exactly twice the declared number of items (keys and values).
    Map,
}

/// Limits and strictness knobs shared by the encoder and decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Reject message headers without a version marker.
    pub strict_read: bool,
    /// Write message headers with a version marker.
    pub strict_write: bool,
    /// Maximum length of a string or binary and maximum element count of a collection.
    pub max_length: usize,
    /// Maximum nesting of records and collections.
    pub recursion_limit: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            strict_read: false,
            strict_write: true,
            max_length: i32::MAX as usize,
            recursion_limit: 64,
        }
    }
}

/// Binary protocol errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Buffer exhausted while reading.
    UnexpectedEnd,
    /// Byte does not correspond to a wire type.
    InvalidType(u8),
    /// Byte does not correspond to a message kind.
    InvalidMessageType(u8),
    /// Strict header carried an unknown version.
    BadVersion(u32),
    /// Strict reading is enabled but the header had no version marker.
    MissingVersion,
    /// A length or count on the wire was negative.
    NegativeSize(i32),
    /// A length or count exceeded the configured limit.
    SizeLimit { size: usize, limit: usize },
    /// String data is not valid UTF-8.
    InvalidUtf8,
    /// Closed a record without writing the stop marker.
    MissingStop,
    /// A collection received a different number of items than its header declared.
    CountMismatch { expected: usize, actual: usize },
    /// Closing or writing into a scope that does not match the active scope.
    ScopeMismatch { expected: Scope, actual: Scope },
    /// Attempted to close a scope when only the Root remains.
    ScopeUnderflow,
    /// Attempted to finalize the buffer with open scopes.
    ScopeStillOpen,
    /// Attempted to write more items than the scope allows.
    TooManyItems(Scope),
    /// Closed a field without writing its value.
    EmptyField,
    /// Records and collections nested deeper than the recursion limit.
    DepthLimitExceeded(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnexpectedEnd => write!(f, "Unexpected end of input"),
            Error::InvalidType(b) => write!(f, "Invalid type byte: {:#04x}", b),
            Error::InvalidMessageType(b) => write!(f, "Invalid message type: {}", b),
            Error::BadVersion(v) => write!(f, "Bad protocol version: {:#010x}", v),
            Error::MissingVersion => write!(f, "Missing version in message header"),
            Error::NegativeSize(n) => write!(f, "Negative size: {}", n),
            Error::SizeLimit { size, limit } => write!(f, "Size {} exceeds limit {}", size, limit),
            Error::CountMismatch { expected, actual } => {
                write!(f, "Count mismatch: header declared {}, wrote {}", expected, actual)
            }
            Error::ScopeMismatch { expected, actual } => {
                write!(f, "Scope mismatch: expected {:?}, found {:?}", expected, actual)
            }
            Error::TooManyItems(s) => write!(f, "Too many items in scope {:?}", s),
            Error::DepthLimitExceeded(limit) => write!(f, "Nesting exceeds depth limit {}", limit),
            _ => write!(f, "{:?}", self),
        }
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` for protocol operations.
pub type Result<T> = std::result::Result<T, Error>;
