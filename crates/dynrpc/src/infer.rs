//! Runtime type inference: which wire type a value travels as.

use dynpack::TType;

use crate::value::Value;

/// Maps a value onto its wire type tag. Pure; encoding and coercion agree on it.
pub fn infer_type(value: &Value) -> TType {
    match value {
        Value::Void => TType::Void,
        Value::Bool(_) => TType::Bool,
        Value::Byte(_) => TType::Byte,
        Value::I16(_) => TType::I16,
        Value::I32(_) => TType::I32,
        Value::I64(_) => TType::I64,
        Value::Double(_) => TType::Double,
        Value::String(_) | Value::Binary(_) => TType::String,
        Value::Record(_) => TType::Struct,
        Value::List(_) => TType::List,
        Value::Set(_) => TType::Set,
        Value::Map(_) => TType::Map,
    }
}

/// Element type of a list or set: the type of the last element, `Void` when empty.
pub fn list_element_type(items: &[Value]) -> TType {
    items.last().map(infer_type).unwrap_or(TType::Void)
}

/// Key and value types of a map: taken from the first entry, `Void` when empty.
pub fn map_entry_types(entries: &[(Value, Value)]) -> (TType, TType) {
    entries
        .first()
        .map(|(k, v)| (infer_type(k), infer_type(v)))
        .unwrap_or((TType::Void, TType::Void))
}
