//! Value Decoder: `dynpack::Decoder` input back into `Value` trees.

use dynpack::Decoder;
use dynpack::MessageHeader;
use dynpack::MessageType;
use dynpack::TType;

use crate::error::Error;
use crate::error::Result;
use crate::exception::ApplicationException;
use crate::value::Record;
use crate::value::Value;

/// Decodes one value of the given wire type.
///
/// Types without a materialized form (`Void`, `Uuid`) are skipped and come back as
/// `Value::Void`. Strings that are not UTF-8 come back as `Value::Binary`.
pub fn decode_value(dec: &mut Decoder<'_>, ttype: TType) -> Result<Value> {
    let value = match ttype {
        TType::Bool => Value::Bool(dec.bool()?),
        TType::Byte => Value::Byte(dec.byte()?),
        TType::I16 => Value::I16(dec.i16()?),
        TType::I32 => Value::I32(dec.i32()?),
        TType::I64 => Value::I64(dec.i64()?),
        TType::Double => Value::Double(dec.double()?),
        TType::String => {
            let bytes = dec.binary()?;
            match std::str::from_utf8(bytes) {
                Ok(s) => Value::String(s.to_owned()),
                Err(_) => Value::Binary(bytes.to_vec()),
            }
        }
        TType::Struct => Value::Record(decode_record(dec)?),
        TType::List => {
            let header = dec.list_begin()?;
            let items = decode_items(dec, header.elem, header.count)?;
            dec.list_end()?;
            Value::List(items)
        }
        TType::Set => {
            let header = dec.set_begin()?;
            let items = decode_items(dec, header.elem, header.count)?;
            dec.set_end()?;
            Value::List(items)
        }
        TType::Map => {
            let header = dec.map_begin()?;
            let mut entries = Vec::with_capacity(header.count);
            for _ in 0..header.count {
                let key = decode_value(dec, header.key)?;
                let value = decode_value(dec, header.value)?;
                entries.push((key, value));
            }
            dec.map_end()?;
            Value::Map(entries)
        }
        TType::Void | TType::Uuid | TType::Stop => {
            dec.skip(ttype)?;
            Value::Void
        }
    };
    Ok(value)
}

fn decode_items(dec: &mut Decoder<'_>, elem: TType, count: usize) -> Result<Vec<Value>> {
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(decode_value(dec, elem)?);
    }
    Ok(items)
}

/// Decodes a record body up to and including its stop marker.
///
/// Fields that decode to `Void` are left out. A repeated id keeps the last value.
pub fn decode_record(dec: &mut Decoder<'_>) -> Result<Record> {
    dec.struct_begin()?;
    let mut record = Record::default();
    loop {
        let field = dec.field_begin()?;
        if field.is_stop() {
            break;
        }
        let value = decode_value(dec, field.ttype)?;
        dec.field_end()?;
        if !value.is_void() {
            record.set(field.id, value);
        }
    }
    dec.struct_end()?;
    Ok(record)
}

/// Reads a reply envelope and its body record.
///
/// # Errors
/// - `Error::Remote` for exception envelopes.
/// - `Error::UnexpectedMessage` for call and oneway envelopes.
pub fn decode_reply(dec: &mut Decoder<'_>) -> Result<(MessageHeader, Record)> {
    let header = dec.message_begin()?;
    tracing::trace!(name = %header.name, kind = ?header.kind, seq = header.seq, "reply header");
    match header.kind {
        MessageType::Reply => {}
        MessageType::Exception => {
            let fault = match decode_record(dec) {
                Ok(payload) => ApplicationException::from_record(&payload),
                Err(e) => {
                    tracing::debug!(error = %e, "unreadable exception payload");
                    ApplicationException::generic()
                }
            };
            return Err(Error::Remote(fault));
        }
        kind @ (MessageType::Call | MessageType::Oneway) => {
            return Err(Error::UnexpectedMessage(kind));
        }
    }
    let record = decode_record(dec)?;
    dec.message_end()?;
    Ok((header, record))
}

/// Reads a reply envelope and returns its body as `Value::Record`.
pub fn decode_message(dec: &mut Decoder<'_>) -> Result<Value> {
    let (_, record) = decode_reply(dec)?;
    Ok(Value::Record(record))
}
