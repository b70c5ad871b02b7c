//! # DynRPC
//!
//! Schema-less Thrift values.
//!
//! ## Architecture
//!
//! A `Value` is the universal runtime representation of anything that travels on the
//! wire. Native Rust values become `Value`s through serde (`to_value`), where the
//! serializer method serde calls decides the wire type and `#[serde(rename = "field_N")]`
//! decides the field id. `Value`s go back into native shapes through `from_value`.
//!
//! The codec (`encode_value`, `decode_value`) walks `Value`s against a `dynpack`
//! encoder or decoder without any IDL-generated code.

mod args;
mod de;
mod decode;
mod encode;
mod error;
mod exception;
mod infer;
mod ser;
mod set;
mod value;


pub use crate::error::Error;
pub use crate::error::Result;

pub use crate::value::Value;
pub use crate::value::Record;
pub use crate::value::field_key;
pub use crate::value::parse_field_key;

pub use crate::exception::ApplicationException;
pub use crate::exception::ApplicationExceptionKind;

pub use crate::infer::infer_type;
pub use crate::infer::list_element_type;
pub use crate::infer::map_entry_types;

pub use crate::encode::encode_value;
pub use crate::encode::encode_record;
pub use crate::encode::encode_call;
pub use crate::encode::args_record;

pub use crate::decode::decode_value;
pub use crate::decode::decode_record;
pub use crate::decode::decode_message;
pub use crate::decode::decode_reply;

pub use crate::ser::to_value;
pub use crate::ser::ValueSerializer;
pub use crate::de::from_value;

pub use crate::set::Set;
pub use crate::set::as_set;

pub use crate::args::Args;
