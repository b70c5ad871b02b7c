use crate::types::Error;
use crate::types::FieldHeader;
use crate::types::ListHeader;
use crate::types::MapHeader;
use crate::types::MessageHeader;
use crate::types::MessageType;
use crate::types::ProtocolConfig;
use crate::types::Result;
use crate::types::SetHeader;
use crate::types::TType;
use crate::types::VERSION_1;
use crate::types::VERSION_MASK;

/// A zero-copy, bounds-checked reader over a byte slice.
///
/// Reading advances the internal position. Records and collections track nesting
/// depth so that hostile input cannot recurse without bound.
///
/// # Errors
/// All read operations return `Error::UnexpectedEnd` if the buffer is exhausted.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
    depth: usize,
    config: ProtocolConfig,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder over the slice with the default protocol configuration.
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_config(buf, ProtocolConfig::default())
    }

    pub fn with_config(buf: &'a [u8], config: ProtocolConfig) -> Self {
        Self { buf, pos: 0, depth: 0, config }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::UnexpectedEnd);
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    fn read_ttype(&mut self) -> Result<TType> {
        let b = self.read_u8()?;
        TType::from_u8(b).ok_or(Error::InvalidType(b))
    }

    /// Reads a wire length or count and checks it against the limits.
    fn read_size(&mut self) -> Result<usize> {
        let n = self.i32()?;
        if n < 0 {
            return Err(Error::NegativeSize(n));
        }
        let size = n as usize;
        if size > self.config.max_length {
            return Err(Error::SizeLimit { size, limit: self.config.max_length });
        }
        Ok(size)
    }

    /// Rejects collections whose minimal encoding is larger than the rest of the input.
    ///
    /// Element types without a wire representation are only valid for empty collections.
    fn check_elements(&self, count: usize, types: &[TType]) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let mut per_item = 0;
        for ttype in types {
            if matches!(ttype, TType::Stop | TType::Void) {
                return Err(Error::InvalidType(*ttype as u8));
            }
            per_item += ttype.min_wire_size();
        }
        match count.checked_mul(per_item) {
            Some(needed) if needed <= self.remaining() => Ok(()),
            _ => Err(Error::UnexpectedEnd),
        }
    }

    fn enter(&mut self) -> Result<()> {
        if self.depth >= self.config.recursion_limit {
            return Err(Error::DepthLimitExceeded(self.config.recursion_limit));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // ------------------------------------------------------------------
    //  Envelope
    // ------------------------------------------------------------------

    /// Reads a strict or (if allowed) non-strict message header.
    pub fn message_begin(&mut self) -> Result<MessageHeader> {
        let size = self.i32()?;
        if size < 0 {
            let word = size as u32;
            let version = word & VERSION_MASK;
            if version != VERSION_1 {
                return Err(Error::BadVersion(version));
            }
            let kind_byte = (word & 0xff) as u8;
            let kind = MessageType::from_u8(kind_byte).ok_or(Error::InvalidMessageType(kind_byte))?;
            let name = self.string()?.to_owned();
            let seq = self.i32()?;
            Ok(MessageHeader { name, kind, seq })
        } else {
            if self.config.strict_read {
                return Err(Error::MissingVersion);
            }
            let len = size as usize;
            if len > self.config.max_length {
                return Err(Error::SizeLimit { size: len, limit: self.config.max_length });
            }
            let name = std::str::from_utf8(self.read_bytes(len)?)
                .map_err(|_| Error::InvalidUtf8)?
                .to_owned();
            let kind_byte = self.read_u8()?;
            let kind = MessageType::from_u8(kind_byte).ok_or(Error::InvalidMessageType(kind_byte))?;
            let seq = self.i32()?;
            Ok(MessageHeader { name, kind, seq })
        }
    }

    pub fn message_end(&mut self) -> Result<()> {
        Ok(())
    }

    // ------------------------------------------------------------------
    //  Records
    // ------------------------------------------------------------------

    pub fn struct_begin(&mut self) -> Result<()> {
        self.enter()
    }

    pub fn struct_end(&mut self) -> Result<()> {
        self.leave();
        Ok(())
    }

    /// Reads a field header. A stop marker carries no id.
    pub fn field_begin(&mut self) -> Result<FieldHeader> {
        let ttype = self.read_ttype()?;
        if ttype == TType::Stop {
            return Ok(FieldHeader { ttype, id: 0 });
        }
        let id = self.i16()?;
        Ok(FieldHeader { ttype, id })
    }

    pub fn field_end(&mut self) -> Result<()> {
        Ok(())
    }

    // ------------------------------------------------------------------
    //  Collections
    // ------------------------------------------------------------------

    pub fn list_begin(&mut self) -> Result<ListHeader> {
        let elem = self.read_ttype()?;
        let count = self.read_size()?;
        self.check_elements(count, &[elem])?;
        self.enter()?;
        Ok(ListHeader { elem, count })
    }

    pub fn list_end(&mut self) -> Result<()> {
        self.leave();
        Ok(())
    }

    pub fn set_begin(&mut self) -> Result<SetHeader> {
        let elem = self.read_ttype()?;
        let count = self.read_size()?;
        self.check_elements(count, &[elem])?;
        self.enter()?;
        Ok(SetHeader { elem, count })
    }

    pub fn set_end(&mut self) -> Result<()> {
        self.leave();
        Ok(())
    }

    pub fn map_begin(&mut self) -> Result<MapHeader> {
        let key = self.read_ttype()?;
        let value = self.read_ttype()?;
        let count = self.read_size()?;
        self.check_elements(count, &[key, value])?;
        self.enter()?;
        Ok(MapHeader { key, value, count })
    }

    pub fn map_end(&mut self) -> Result<()> {
        self.leave();
        Ok(())
    }

    // ------------------------------------------------------------------
    //  Scalars
    // ------------------------------------------------------------------

    pub fn bool(&mut self) -> Result<bool> { Ok(self.read_u8()? == 1) }
    pub fn byte(&mut self) -> Result<i8> { Ok(self.read_u8()? as i8) }
    pub fn i16(&mut self) -> Result<i16> { Ok(i16::from_be_bytes(self.read_array()?)) }
    pub fn i32(&mut self) -> Result<i32> { Ok(i32::from_be_bytes(self.read_array()?)) }
    pub fn i64(&mut self) -> Result<i64> { Ok(i64::from_be_bytes(self.read_array()?)) }
    pub fn double(&mut self) -> Result<f64> { Ok(f64::from_bits(u64::from_be_bytes(self.read_array()?))) }
    pub fn uuid(&mut self) -> Result<[u8; 16]> { self.read_array() }

    /// Decodes a length-prefixed blob.
    pub fn binary(&mut self) -> Result<&'a [u8]> {
        let len = self.read_size()?;
        self.read_bytes(len)
    }

    /// Decodes a length-prefixed UTF-8 string.
    pub fn string(&mut self) -> Result<&'a str> {
        let bytes = self.binary()?;
        std::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
    }

    /// Skips a value of the given type and everything nested inside it.
    pub fn skip(&mut self, ttype: TType) -> Result<()> {
        match ttype {
            TType::Stop => Err(Error::InvalidType(TType::Stop as u8)),
            TType::Void => Ok(()),
            TType::Bool | TType::Byte => self.read_bytes(1).map(drop),
            TType::I16 => self.read_bytes(2).map(drop),
            TType::I32 => self.read_bytes(4).map(drop),
            TType::I64 | TType::Double => self.read_bytes(8).map(drop),
            TType::Uuid => self.read_bytes(16).map(drop),
            TType::String => self.binary().map(drop),
            TType::Struct => {
                self.struct_begin()?;
                loop {
                    let field = self.field_begin()?;
                    if field.is_stop() {
                        break;
                    }
                    self.skip(field.ttype)?;
                    self.field_end()?;
                }
                self.struct_end()
            }
            TType::List => {
                let header = self.list_begin()?;
                for _ in 0..header.count {
                    self.skip(header.elem)?;
                }
                self.list_end()
            }
            TType::Set => {
                let header = self.set_begin()?;
                for _ in 0..header.count {
                    self.skip(header.elem)?;
                }
                self.set_end()
            }
            TType::Map => {
                let header = self.map_begin()?;
                for _ in 0..header.count {
                    self.skip(header.key)?;
                    self.skip(header.value)?;
                }
                self.map_end()
            }
        }
    }
}
