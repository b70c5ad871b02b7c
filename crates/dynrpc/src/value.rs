//! The schema-less value model.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::error::Error;
use crate::error::Result;

const FIELD_PREFIX: &str = "field_";

/// The key a record field is exposed under: `field_<id>`.
pub fn field_key(id: i16) -> String {
    format!("{FIELD_PREFIX}{id}")
}

/// Recovers the field id from a `field_<id>` key.
///
/// Only the exact spelling `field_key` produces is accepted: `field_01` and `field_+1` are not keys.
pub fn parse_field_key(key: &str) -> Option<i16> {
    let digits = key.strip_prefix(FIELD_PREFIX)?;
    let id: i16 = digits.parse().ok()?;
    (id.to_string() == digits).then_some(id)
}

/// Any value that has been or will be transmitted.
///
/// `Void` is the absent value; it is never written to the wire.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Void,
    Bool(bool),
    Byte(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Double(f64),
    String(String),
    /// Shares the string wire type; bytes that are valid UTF-8 decode back as `String`.
    Binary(Vec<u8>),
    Record(Record),
    List(Vec<Value>),
    Set(Vec<Value>),
    /// Entries in iteration order.
    Map(Vec<(Value, Value)>),
}

impl Value {
    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    /// Short description used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Bool(_) => "bool",
            Value::Byte(_) => "byte",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::Record(_) => "record",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self { Value::Bool(v) => Some(*v), _ => None }
    }

    /// Any integer value, widened.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(*v as i64),
            Value::I16(v) => Some(*v as i64),
            Value::I32(v) => Some(*v as i64),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self { Value::Double(v) => Some(*v), _ => None }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self { Value::String(v) => Some(v), _ => None }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self { Value::Record(r) => Some(r), _ => None }
    }

    /// Elements of a list or set.
    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self { Value::Map(entries) => Some(entries), _ => None }
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self { Value::$variant(v.into()) }
            }
        )*
    };
}

impl_from_scalar! {
    bool => Bool,
    i8 => Byte,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f64 => Double,
    String => String,
    &str => String,
    Vec<u8> => Binary,
    Record => Record,
}

/// A record: a shape name and its fields, ordered by id.
///
/// The binary protocol does not transmit the name; decoded records have an empty one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    name: String,
    fields: BTreeMap<i16, Value>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: BTreeMap::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a field.
    ///
    /// # Errors
    /// Returns `Error::DuplicateFieldId` if the id is already present.
    pub fn insert(&mut self, id: i16, value: Value) -> Result<()> {
        match self.fields.entry(id) {
            Entry::Occupied(_) => Err(Error::DuplicateFieldId(id)),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    /// Adds or replaces a field.
    pub fn set(&mut self, id: i16, value: Value) {
        self.fields.insert(id, value);
    }

    /// Builder-style `insert`.
    pub fn with(mut self, id: i16, value: impl Into<Value>) -> Result<Self> {
        self.insert(id, value.into())?;
        Ok(self)
    }

    pub fn get(&self, id: i16) -> Option<&Value> {
        self.fields.get(&id)
    }

    /// Looks a field up by its `field_<id>` key.
    pub fn get_key(&self, key: &str) -> Option<&Value> {
        self.get(parse_field_key(key)?)
    }

    pub fn remove(&mut self, id: i16) -> Option<Value> {
        self.fields.remove(&id)
    }

    /// Fields in ascending id order.
    pub fn fields(&self) -> impl Iterator<Item = (i16, &Value)> {
        self.fields.iter().map(|(id, value)| (*id, value))
    }

    /// Field keys (`field_<id>`) in ascending id order.
    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.fields.keys().map(|id| field_key(*id))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_fields(self) -> BTreeMap<i16, Value> {
        self.fields
    }
}
