//! Coercion: decoded `Value`s into caller-declared shapes.
//!
//! `Value` is itself a serde `Deserializer`. Records are presented as maps keyed by
//! `field_<id>`, which is exactly what `#[serde(rename = "field_N")]` members ask for.
//! Failures carry the path of keys and indices leading to the offending value.

use std::collections::btree_map;
use std::vec;

use serde::de;
use serde::de::DeserializeOwned;
use serde::de::DeserializeSeed;
use serde::de::Visitor;
use serde::de::value::SeqDeserializer;
use serde::de::value::StringDeserializer;
use serde::de::value::U32Deserializer;
use serde::forward_to_deserialize_any;

use crate::error::Error;
use crate::error::Result;
use crate::value::Record;
use crate::value::Value;
use crate::value::field_key;

/// Coerces a value into `T`.
///
/// # Errors
/// Returns `Error::Coercion` naming the failing path when the shapes disagree.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    T::deserialize(value)
}

impl<'de> de::Deserializer<'de> for Value {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Void => visitor.visit_unit(),
            Value::Bool(v) => visitor.visit_bool(v),
            Value::Byte(v) => visitor.visit_i8(v),
            Value::I16(v) => visitor.visit_i16(v),
            Value::I32(v) => visitor.visit_i32(v),
            Value::I64(v) => visitor.visit_i64(v),
            Value::Double(v) => visitor.visit_f64(v),
            Value::String(v) => visitor.visit_string(v),
            Value::Binary(v) => visitor.visit_byte_buf(v),
            Value::Record(record) => visitor.visit_map(RecordAccess::new(record)),
            Value::List(items) | Value::Set(items) => visit_items(items, visitor),
            Value::Map(entries) => visitor.visit_map(MapEntries::new(entries)),
        }
    }

    /// Bytes travel signed; an unsigned target takes the bits back.
    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Byte(v) => visitor.visit_u8(v as u8),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Void => visitor.visit_none(),
            other => visitor.visit_some(other),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Binary(bytes) => {
                let mut seq = SeqDeserializer::<_, Error>::new(bytes.into_iter());
                let out = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(out)
            }
            other => other.deserialize_any(visitor),
        }
    }

    /// Enums arrive as their i32 variant index, or as the variant name.
    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self {
            Value::String(variant) => visitor.visit_enum(StringDeserializer::<Error>::new(variant)),
            other => {
                let index = other
                    .as_i64()
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| Error::coercion(format!("expected {name}, found {}", other.kind())))?;
                visitor.visit_enum(U32Deserializer::<Error>::new(index))
            }
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct tuple tuple_struct map struct identifier
    }
}

fn visit_items<'de, V: Visitor<'de>>(items: Vec<Value>, visitor: V) -> Result<V::Value> {
    let len = items.len();
    let mut seq = SeqItems { iter: items.into_iter().enumerate() };
    let out = visitor.visit_seq(&mut seq)?;
    match seq.iter.len() {
        0 => Ok(out),
        _ => Err(de::Error::invalid_length(len, &"fewer elements")),
    }
}

// ==========================================================================
//  Access adapters
// ==========================================================================

struct SeqItems {
    iter: std::iter::Enumerate<vec::IntoIter<Value>>,
}

impl<'de> de::SeqAccess<'de> for SeqItems {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        match self.iter.next() {
            Some((index, value)) => seed.deserialize(value).map(Some).map_err(|e| e.at(index.to_string())),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

/// Presents a record as a map keyed by `field_<id>`.
struct RecordAccess {
    iter: btree_map::IntoIter<i16, Value>,
    pending: Option<(i16, Value)>,
}

impl RecordAccess {
    fn new(record: Record) -> Self {
        Self { iter: record.into_fields().into_iter(), pending: None }
    }
}

impl<'de> de::MapAccess<'de> for RecordAccess {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        let Some((id, value)) = self.iter.next() else {
            return Ok(None);
        };
        self.pending = Some((id, value));
        seed.deserialize(StringDeserializer::<Error>::new(field_key(id))).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        let (id, value) = self
            .pending
            .take()
            .ok_or_else(|| Error::coercion("value requested before key"))?;
        seed.deserialize(value).map_err(|e| e.at(field_key(id)))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapEntries {
    iter: std::iter::Enumerate<vec::IntoIter<(Value, Value)>>,
    pending: Option<(usize, Value)>,
}

impl MapEntries {
    fn new(entries: Vec<(Value, Value)>) -> Self {
        Self { iter: entries.into_iter().enumerate(), pending: None }
    }
}

impl<'de> de::MapAccess<'de> for MapEntries {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        let Some((index, (key, value))) = self.iter.next() else {
            return Ok(None);
        };
        self.pending = Some((index, value));
        seed.deserialize(key).map(Some).map_err(|e| e.at(format!("{index}.key")))
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        let (index, value) = self
            .pending
            .take()
            .ok_or_else(|| Error::coercion("value requested before key"))?;
        seed.deserialize(value).map_err(|e| e.at(index.to_string()))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}
