//! Value Encoder: `Value` trees onto a `dynpack::Encoder`.

use dynpack::Encoder;
use dynpack::ListHeader;
use dynpack::MapHeader;
use dynpack::MessageHeader;
use dynpack::MessageType;
use dynpack::SetHeader;
use dynpack::TType;

use crate::error::Error;
use crate::error::Result;
use crate::infer::infer_type;
use crate::infer::list_element_type;
use crate::infer::map_entry_types;
use crate::value::Record;
use crate::value::Value;

/// Sequence number of every call; replies are not correlated.
const CALL_SEQ: i32 = 0;

/// Encodes a single value.
///
/// `Void` writes nothing; callers omit absent fields rather than encode them.
pub fn encode_value(enc: &mut Encoder, value: &Value) -> Result<()> {
    match value {
        Value::Void => {}
        Value::Bool(v) => enc.bool(*v)?,
        Value::Byte(v) => enc.byte(*v)?,
        Value::I16(v) => enc.i16(*v)?,
        Value::I32(v) => enc.i32(*v)?,
        Value::I64(v) => enc.i64(*v)?,
        Value::Double(v) => enc.double(*v)?,
        Value::String(v) => enc.string(v)?,
        Value::Binary(v) => enc.binary(v)?,
        Value::Record(record) => encode_record(enc, record)?,
        Value::List(items) => {
            let elem = list_element_type(items);
            check_elements("list", items.iter(), elem)?;
            enc.list_begin(ListHeader { elem, count: items.len() })?;
            for item in items {
                encode_value(enc, item)?;
            }
            enc.list_end()?;
        }
        Value::Set(items) => {
            let elem = list_element_type(items);
            check_elements("set", items.iter(), elem)?;
            enc.set_begin(SetHeader { elem, count: items.len() })?;
            for item in items {
                encode_value(enc, item)?;
            }
            enc.set_end()?;
        }
        Value::Map(entries) => {
            let (key, val) = map_entry_types(entries);
            check_elements("map key", entries.iter().map(|(k, _)| k), key)?;
            check_elements("map value", entries.iter().map(|(_, v)| v), val)?;
            enc.map_begin(MapHeader { key, value: val, count: entries.len() })?;
            for (k, v) in entries {
                encode_value(enc, k)?;
                encode_value(enc, v)?;
            }
            enc.map_end()?;
        }
    }
    Ok(())
}

/// Encodes a record: its non-void fields in ascending id order, then the stop marker.
pub fn encode_record(enc: &mut Encoder, record: &Record) -> Result<()> {
    enc.struct_begin(record.name())?;
    for (id, value) in record.fields() {
        if value.is_void() {
            continue;
        }
        enc.field_begin("", infer_type(value), id)?;
        encode_value(enc, value)?;
        enc.field_end()?;
    }
    enc.field_stop()?;
    enc.struct_end()?;
    Ok(())
}

/// Numbers call arguments `1..=N` into a `<method>_args` record.
pub fn args_record(method: &str, args: Vec<Value>) -> Result<Record> {
    let mut record = Record::new(format!("{method}_args"));
    for (i, arg) in args.into_iter().enumerate() {
        let id = i16::try_from(i + 1)
            .map_err(|_| Error::Unsupported(format!("{} arguments", i + 1)))?;
        record.insert(id, arg)?;
    }
    Ok(record)
}

/// Encodes a complete call envelope.
///
/// The argument record is only written when there are arguments.
pub fn encode_call(enc: &mut Encoder, method: &str, args: Vec<Value>) -> Result<()> {
    enc.message_begin(&MessageHeader::new(method, MessageType::Call, CALL_SEQ))?;
    if !args.is_empty() {
        let record = args_record(method, args)?;
        encode_record(enc, &record)?;
    }
    enc.message_end()?;
    Ok(())
}

/// Collections are homogeneous on the wire: every element must match the header type.
fn check_elements<'v>(
    what: &str,
    items: impl Iterator<Item = &'v Value>,
    expected: TType,
) -> Result<()> {
    for item in items {
        if item.is_void() {
            return Err(Error::Unsupported(format!("absent {what} in a collection")));
        }
        let found = infer_type(item);
        if found != expected {
            return Err(Error::Unsupported(format!(
                "mixed {what} types: {:?} alongside {:?}",
                found, expected
            )));
        }
    }
    Ok(())
}
