//! # Dynpack
//!
//! The Thrift binary protocol, over plain byte buffers.
//!
//! ## Philosophy
//!
//! - **Explicit State**: The `Encoder` keeps a stack of open scopes and refuses writes
//!   that would produce a malformed message (records without a stop marker, lists with
//!   the wrong number of items, fields without a value).
//! - **Bounded**: The `Decoder` is a bounds-checked view. Lengths and counts are checked
//!   against the remaining bytes and the configured limits before anything is allocated.
//! - **Schema-agnostic**: Nothing here knows about IDL types. Values are written and read
//!   one header or scalar at a time; `Decoder::skip` walks any value structurally.
//!
//! ## Format
//!
//! - **Message**: `[0x8001_0000 | kind: i32][name: string][seq: i32]` (strict)
//!   or `[name: string][kind: u8][seq: i32]` (non-strict)
//! - **Field**: `[type: u8][id: i16]`, a record ends with a `0x00` type byte
//! - **List / Set**: `[elem: u8][count: i32]`
//! - **Map**: `[key: u8][value: u8][count: i32]`
//! - **Strings / Binary**: `[len: i32][bytes]`
//!
//! All integers are Big-Endian.

pub mod types;
pub mod encoder;
pub mod decoder;

pub use types::Error;
pub use types::Result;
pub use types::TType;
pub use types::MessageType;
pub use types::MessageHeader;
pub use types::FieldHeader;
pub use types::ListHeader;
pub use types::SetHeader;
pub use types::MapHeader;
pub use types::ProtocolConfig;

pub use encoder::Encoder;
pub use types::Scope;

pub use decoder::Decoder;

#[cfg(test)]
mod tests;
