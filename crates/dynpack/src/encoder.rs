use crate::types::Error;
use crate::types::FieldHeader;
use crate::types::ListHeader;
use crate::types::MapHeader;
use crate::types::MessageHeader;
use crate::types::ProtocolConfig;
use crate::types::Result;
use crate::types::Scope;
use crate::types::SetHeader;
use crate::types::TType;
use crate::types::VERSION_1;

/// An active scope on the `Encoder` stack.
struct Frame {
    scope: Scope,
    /// Items the scope must receive before it may be closed (collections only).
    expected: usize,
    count: usize,
    /// Set once a record has written its stop marker.
    stopped: bool,
    /// Field payload type; a `Void` field may be closed empty.
    field_type: TType,
}

impl Frame {
    fn new(scope: Scope) -> Self {
        Self { scope, expected: 0, count: 0, stopped: false, field_type: TType::Void }
    }
}

/// A bounded, state-machine driven encoder.
///
/// # Structural Invariants
///
/// 1.  **Records**: Only `field_begin` and `field_stop` may be written directly into a
///     record, and `struct_end` fails unless the stop marker was written.
/// 2.  **Fields**: Exactly one item (unless the field type is `Void`).
/// 3.  **Collections**: Exactly the declared count (maps: count keys and count values).
/// 4.  **Messages**: At most one record body.
/// 5.  **Root**: The encoder must end in the Root scope to finalize bytes.
pub struct Encoder {
    buf: Vec<u8>,
    /// Bottom is always `Scope::Root`.
    stack: Vec<Frame>,
    /// Open records and collections, checked against the recursion limit.
    nesting: usize,
    config: ProtocolConfig,
}

fn is_nesting(scope: Scope) -> bool {
    matches!(scope, Scope::Struct | Scope::List | Scope::Set | Scope::Map)
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    /// Creates a new encoder with the default protocol configuration.
    pub fn new() -> Self {
        Self::with_config(ProtocolConfig::default())
    }

    pub fn with_config(config: ProtocolConfig) -> Self {
        let mut stack = Vec::with_capacity(8);
        stack.push(Frame::new(Scope::Root));
        Self { buf: Vec::with_capacity(256), stack, nesting: 0, config }
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Number of scopes currently open above the root.
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    /// Consumes the encoder and returns the final byte vector.
    ///
    /// # Errors
    /// Returns `Error::ScopeStillOpen` if any scope is still open.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        if self.stack.len() > 1 {
            return Err(Error::ScopeStillOpen);
        }
        Ok(self.buf)
    }

    /// Returns a view of the current buffer.
    ///
    /// # Errors
    /// Returns `Error::ScopeStillOpen` if any scope is still open.
    pub fn as_bytes(&self) -> Result<&[u8]> {
        if self.stack.len() > 1 {
            return Err(Error::ScopeStillOpen);
        }
        Ok(&self.buf)
    }

    fn current_frame(&mut self) -> &mut Frame {
        // the root frame is never popped
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn check_write(&mut self) -> Result<()> {
        let frame = self.current_frame();
        match frame.scope {
            Scope::Root => Ok(()),
            Scope::Struct => Err(Error::ScopeMismatch { expected: Scope::Field, actual: Scope::Struct }),
            Scope::Message | Scope::Field => {
                if frame.count >= 1 {
                    Err(Error::TooManyItems(frame.scope))
                } else {
                    Ok(())
                }
            }
            Scope::List | Scope::Set | Scope::Map => {
                if frame.count >= frame.expected {
                    Err(Error::TooManyItems(frame.scope))
                } else {
                    Ok(())
                }
            }
        }
    }

    fn on_item_written(&mut self) {
        self.current_frame().count += 1;
    }

    fn push(&mut self, frame: Frame) -> Result<()> {
        if is_nesting(frame.scope) {
            if self.nesting >= self.config.recursion_limit {
                return Err(Error::DepthLimitExceeded(self.config.recursion_limit));
            }
            self.nesting += 1;
        }
        self.stack.push(frame);
        Ok(())
    }

    fn pop(&mut self, expected: Scope) -> Result<Frame> {
        if self.stack.len() <= 1 {
            return Err(Error::ScopeUnderflow);
        }
        let actual = self.current_frame().scope;
        if actual != expected {
            return Err(Error::ScopeMismatch { expected, actual });
        }
        if is_nesting(expected) {
            self.nesting -= 1;
        }
        self.stack.pop().ok_or(Error::ScopeUnderflow)
    }

    fn check_len(&self, len: usize) -> Result<i32> {
        let limit = self.config.max_length.min(i32::MAX as usize);
        if len > limit {
            return Err(Error::SizeLimit { size: len, limit });
        }
        Ok(len as i32)
    }

    fn put_i16(&mut self, v: i16) { self.buf.extend_from_slice(&v.to_be_bytes()); }
    fn put_i32(&mut self, v: i32) { self.buf.extend_from_slice(&v.to_be_bytes()); }

    // ------------------------------------------------------------------
    //  Envelope
    // ------------------------------------------------------------------

    /// Writes the message header and opens the message body.
    pub fn message_begin(&mut self, header: &MessageHeader) -> Result<()> {
        self.check_write()?;
        let name_len = self.check_len(header.name.len())?;
        if self.config.strict_write {
            self.put_i32((VERSION_1 | header.kind as u32) as i32);
            self.put_i32(name_len);
            self.buf.extend_from_slice(header.name.as_bytes());
            self.put_i32(header.seq);
        } else {
            self.put_i32(name_len);
            self.buf.extend_from_slice(header.name.as_bytes());
            self.buf.push(header.kind as u8);
            self.put_i32(header.seq);
        }
        self.push(Frame::new(Scope::Message))
    }

    /// Closes the message body.
    pub fn message_end(&mut self) -> Result<()> {
        self.pop(Scope::Message)?;
        self.on_item_written();
        Ok(())
    }

    // ------------------------------------------------------------------
    //  Records
    // ------------------------------------------------------------------

    /// Opens a record. The name is not written by the binary protocol.
    pub fn struct_begin(&mut self, _name: &str) -> Result<()> {
        self.check_write()?;
        self.push(Frame::new(Scope::Struct))
    }

    /// Closes a record.
    ///
    /// # Errors
    /// Returns `Error::MissingStop` if `field_stop` was not written.
    pub fn struct_end(&mut self) -> Result<()> {
        if self.current_frame().scope == Scope::Struct && !self.current_frame().stopped {
            return Err(Error::MissingStop);
        }
        self.pop(Scope::Struct)?;
        self.on_item_written();
        Ok(())
    }

    /// Writes a field header. The name is not written by the binary protocol.
    pub fn field_begin(&mut self, _name: &str, ttype: TType, id: i16) -> Result<()> {
        let frame = self.current_frame();
        if frame.scope != Scope::Struct {
            return Err(Error::ScopeMismatch { expected: Scope::Struct, actual: frame.scope });
        }
        if frame.stopped || ttype == TType::Stop {
            return Err(Error::TooManyItems(Scope::Struct));
        }
        self.buf.push(ttype as u8);
        self.put_i16(id);
        let mut field = Frame::new(Scope::Field);
        field.field_type = ttype;
        self.push(field)
    }

    pub fn field_header(&mut self, header: FieldHeader) -> Result<()> {
        if header.is_stop() {
            self.field_stop()
        } else {
            self.field_begin("", header.ttype, header.id)
        }
    }

    /// Closes a field.
    ///
    /// # Errors
    /// Returns `Error::EmptyField` if no value was written for a non-`Void` field.
    pub fn field_end(&mut self) -> Result<()> {
        let frame = self.pop(Scope::Field)?;
        if frame.count == 0 && frame.field_type != TType::Void {
            return Err(Error::EmptyField);
        }
        Ok(())
    }

    /// Writes the stop marker terminating the current record.
    pub fn field_stop(&mut self) -> Result<()> {
        let frame = self.current_frame();
        if frame.scope != Scope::Struct {
            return Err(Error::ScopeMismatch { expected: Scope::Struct, actual: frame.scope });
        }
        if frame.stopped {
            return Err(Error::TooManyItems(Scope::Struct));
        }
        frame.stopped = true;
        self.buf.push(TType::Stop as u8);
        Ok(())
    }

    // ------------------------------------------------------------------
    //  Collections
    // ------------------------------------------------------------------

    fn collection_begin(&mut self, scope: Scope, count: usize, items: usize) -> Result<i32> {
        self.check_write()?;
        let wire_count = self.check_len(count)?;
        let mut frame = Frame::new(scope);
        frame.expected = items;
        self.push(frame)?;
        Ok(wire_count)
    }

    fn collection_end(&mut self, scope: Scope) -> Result<()> {
        let frame = self.pop(scope)?;
        if frame.count != frame.expected {
            return Err(Error::CountMismatch { expected: frame.expected, actual: frame.count });
        }
        self.on_item_written();
        Ok(())
    }

    /// Begins a list of `header.count` items.
    pub fn list_begin(&mut self, header: ListHeader) -> Result<()> {
        let count = self.collection_begin(Scope::List, header.count, header.count)?;
        self.buf.push(header.elem as u8);
        self.put_i32(count);
        Ok(())
    }

    pub fn list_end(&mut self) -> Result<()> { self.collection_end(Scope::List) }

    /// Begins a set of `header.count` items.
    pub fn set_begin(&mut self, header: SetHeader) -> Result<()> {
        let count = self.collection_begin(Scope::Set, header.count, header.count)?;
        self.buf.push(header.elem as u8);
        self.put_i32(count);
        Ok(())
    }

    pub fn set_end(&mut self) -> Result<()> { self.collection_end(Scope::Set) }

    /// Begins a map of `header.count` key/value pairs.
    pub fn map_begin(&mut self, header: MapHeader) -> Result<()> {
        let items = header.count.checked_mul(2)
            .ok_or(Error::SizeLimit { size: header.count, limit: self.config.max_length })?;
        let count = self.collection_begin(Scope::Map, header.count, items)?;
        self.buf.push(header.key as u8);
        self.buf.push(header.value as u8);
        self.put_i32(count);
        Ok(())
    }

    pub fn map_end(&mut self) -> Result<()> { self.collection_end(Scope::Map) }

    // ------------------------------------------------------------------
    //  Scalars
    // ------------------------------------------------------------------

    pub fn bool(&mut self, v: bool) -> Result<()> { self.check_write()?; self.buf.push(v as u8); self.on_item_written(); Ok(()) }
    pub fn byte(&mut self, v: i8) -> Result<()> { self.check_write()?; self.buf.push(v as u8); self.on_item_written(); Ok(()) }
    pub fn i16(&mut self, v: i16) -> Result<()> { self.check_write()?; self.put_i16(v); self.on_item_written(); Ok(()) }
    pub fn i32(&mut self, v: i32) -> Result<()> { self.check_write()?; self.put_i32(v); self.on_item_written(); Ok(()) }
    pub fn i64(&mut self, v: i64) -> Result<()> { self.check_write()?; self.buf.extend_from_slice(&v.to_be_bytes()); self.on_item_written(); Ok(()) }
    pub fn double(&mut self, v: f64) -> Result<()> { self.check_write()?; self.buf.extend_from_slice(&v.to_bits().to_be_bytes()); self.on_item_written(); Ok(()) }
    pub fn uuid(&mut self, v: &[u8; 16]) -> Result<()> { self.check_write()?; self.buf.extend_from_slice(v); self.on_item_written(); Ok(()) }

    /// Encodes a UTF-8 string as a length-prefixed blob.
    pub fn string(&mut self, v: &str) -> Result<()> {
        self.binary(v.as_bytes())
    }

    /// Encodes raw bytes as a length-prefixed blob.
    pub fn binary(&mut self, v: &[u8]) -> Result<()> {
        self.check_write()?;
        let len = self.check_len(v.len())?;
        self.put_i32(len);
        self.buf.extend_from_slice(v);
        self.on_item_written();
        Ok(())
    }
}
