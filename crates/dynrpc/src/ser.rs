//! # Type Inference on the way out
//!
//! `ValueSerializer` turns anything `Serialize` into a `Value`. The serializer method
//! serde calls carries the declared native width, so the wire type never depends on
//! the magnitude of the value.
//!
//! | native                       | wire                       |
//! |------------------------------|----------------------------|
//! | `bool`                       | `Bool`                     |
//! | `i8` / `u8` (bit cast)       | `Byte`                     |
//! | `i16`                        | `I16`                      |
//! | `i32` / `u16`                | `I32`                      |
//! | `i64` / `u32` / `u64`        | `I64` (`u64` must fit)     |
//! | `f32` / `f64`                | `Double`                   |
//! | `char` / `str`               | `String`                   |
//! | bytes                        | `String` (as `Binary`)     |
//! | sequences, tuples            | `List`                     |
//! | `Set<C>`, `as_set`           | `Set`                      |
//! | maps                         | `Map`                      |
//! | structs                      | `Struct`, ids from `field_N` names |
//! | `None`, `()`                 | nothing                    |
//! | unit enum variants           | `I32` variant index        |

use serde::Serialize;
use serde::ser;
use serde::ser::Impossible;

use crate::error::Error;
use crate::error::Result;
use crate::set::SET_TOKEN;
use crate::value::Record;
use crate::value::Value;
use crate::value::parse_field_key;

/// Converts a native value into a `Value`.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    value.serialize(ValueSerializer)
}

/// The serde `Serializer` producing `Value`s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueSerializer;

fn data_variant(name: &str, variant: &str) -> Error {
    Error::Unsupported(format!("enum variant {name}::{variant} carries data"))
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = SerializeList;
    type SerializeTuple = SerializeList;
    type SerializeTupleStruct = SerializeList;
    type SerializeTupleVariant = Impossible<Value, Error>;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeRecord;
    type SerializeStructVariant = Impossible<Value, Error>;

    fn serialize_bool(self, v: bool) -> Result<Value> { Ok(Value::Bool(v)) }
    fn serialize_i8(self, v: i8) -> Result<Value> { Ok(Value::Byte(v)) }
    fn serialize_i16(self, v: i16) -> Result<Value> { Ok(Value::I16(v)) }
    fn serialize_i32(self, v: i32) -> Result<Value> { Ok(Value::I32(v)) }
    fn serialize_i64(self, v: i64) -> Result<Value> { Ok(Value::I64(v)) }
    fn serialize_u8(self, v: u8) -> Result<Value> { Ok(Value::Byte(v as i8)) }
    fn serialize_u16(self, v: u16) -> Result<Value> { Ok(Value::I32(v as i32)) }
    fn serialize_u32(self, v: u32) -> Result<Value> { Ok(Value::I64(v as i64)) }

    fn serialize_u64(self, v: u64) -> Result<Value> {
        i64::try_from(v)
            .map(Value::I64)
            .map_err(|_| Error::Unsupported(format!("{v} does not fit in i64")))
    }

    fn serialize_f32(self, v: f32) -> Result<Value> { Ok(Value::Double(v as f64)) }
    fn serialize_f64(self, v: f64) -> Result<Value> { Ok(Value::Double(v)) }
    fn serialize_char(self, v: char) -> Result<Value> { Ok(Value::String(v.to_string())) }
    fn serialize_str(self, v: &str) -> Result<Value> { Ok(Value::String(v.to_owned())) }
    fn serialize_bytes(self, v: &[u8]) -> Result<Value> { Ok(Value::Binary(v.to_vec())) }

    fn serialize_none(self) -> Result<Value> { Ok(Value::Void) }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value> { Ok(Value::Void) }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Value> {
        Ok(Value::Record(Record::new(name)))
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
    ) -> Result<Value> {
        i32::try_from(variant_index)
            .map(Value::I32)
            .map_err(|_| Error::Unsupported(format!("enum variant {name}::{variant} index")))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Value> {
        let inner = value.serialize(self)?;
        if name != SET_TOKEN {
            return Ok(inner);
        }
        match inner {
            Value::List(items) | Value::Set(items) => Ok(Value::Set(items)),
            other => Err(Error::Unsupported(format!("a {} cannot be sent as a set", other.kind()))),
        }
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _value: &T,
    ) -> Result<Value> {
        Err(data_variant(name, variant))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeList> {
        Ok(SerializeList { items: Vec::with_capacity(len.unwrap_or(0)) })
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeList> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SerializeList> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(data_variant(name, variant))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<SerializeMap> {
        Ok(SerializeMap { entries: Vec::with_capacity(len.unwrap_or(0)), next_key: None })
    }

    fn serialize_struct(self, name: &'static str, _len: usize) -> Result<SerializeRecord> {
        Ok(SerializeRecord { record: Record::new(name) })
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(data_variant(name, variant))
    }
}

// ==========================================================================
//  Compound builders
// ==========================================================================

pub struct SerializeList {
    items: Vec<Value>,
}

impl SerializeList {
    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }
}

impl ser::SerializeSeq for SerializeList {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(Value::List(self.items))
    }
}

impl ser::SerializeTuple for SerializeList {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(Value::List(self.items))
    }
}

impl ser::SerializeTupleStruct for SerializeList {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(Value::List(self.items))
    }
}

pub struct SerializeMap {
    entries: Vec<(Value, Value)>,
    next_key: Option<Value>,
}

impl ser::SerializeMap for SerializeMap {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<()> {
        self.next_key = Some(key.serialize(ValueSerializer)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| Error::Unsupported("map value without a key".into()))?;
        self.entries.push((key, value.serialize(ValueSerializer)?));
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Map(self.entries))
    }
}

/// Collects the `field_<N>` members of a struct; other members are not transmitted.
pub struct SerializeRecord {
    record: Record,
}

/// The field id a struct member carries, or `None` for members left off the wire.
///
/// A member spelled like a field key must name a positive id in canonical form.
fn member_field_id(key: &str) -> Result<Option<i16>> {
    let Some(suffix) = key.strip_prefix("field_") else {
        return Ok(None);
    };
    if !suffix.starts_with(|c: char| c.is_ascii_digit() || c == '+' || c == '-') {
        return Ok(None);
    }
    match parse_field_key(key) {
        Some(id) if id > 0 => Ok(Some(id)),
        _ => Err(Error::Unsupported(format!("member {key} needs a positive field id"))),
    }
}

impl ser::SerializeStruct for SerializeRecord {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<()> {
        let Some(id) = member_field_id(key)? else {
            return Ok(());
        };
        let value = value.serialize(ValueSerializer)?;
        if value.is_void() {
            return Ok(());
        }
        self.record.insert(id, value)
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Record(self.record))
    }
}
