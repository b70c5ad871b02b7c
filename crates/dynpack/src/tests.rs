use crate::*;
use std::f64::consts::PI;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn non_strict() -> ProtocolConfig {
    ProtocolConfig { strict_read: false, strict_write: false, ..ProtocolConfig::default() }
}

// ============================================================================
//  SCALAR TESTS (Happy Path)
// ============================================================================

#[test]
fn test_bool_byte_roundtrip() -> Result<()> {
    let mut enc = Encoder::new();
    enc.bool(true)?;
    enc.bool(false)?;
    enc.byte(i8::MIN)?;
    enc.byte(i8::MAX)?;

    let bytes = enc.into_bytes()?;
    assert_eq!(bytes, vec![0x01, 0x00, 0x80, 0x7f]);

    let mut dec = Decoder::new(&bytes);
    assert!(dec.bool()?);
    assert!(!dec.bool()?);
    assert_eq!(dec.byte()?, i8::MIN);
    assert_eq!(dec.byte()?, i8::MAX);
    assert_eq!(dec.remaining(), 0);
    Ok(())
}

#[test]
fn test_integers_are_big_endian() -> Result<()> {
    let mut enc = Encoder::new();
    enc.i16(0x0102)?;
    enc.i32(0x01020304)?;
    enc.i64(-2)?;

    let bytes = enc.into_bytes()?;
    assert_eq!(&bytes[0..2], &[0x01, 0x02]);
    assert_eq!(&bytes[2..6], &[0x01, 0x02, 0x03, 0x04]);
    assert_eq!(&bytes[6..14], &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe]);

    let mut dec = Decoder::new(&bytes);
    assert_eq!(dec.i16()?, 0x0102);
    assert_eq!(dec.i32()?, 0x01020304);
    assert_eq!(dec.i64()?, -2);
    Ok(())
}

#[test]
fn test_double_string_binary_uuid_roundtrip() -> Result<()> {
    let id = [7u8; 16];
    let mut enc = Encoder::new();
    enc.double(PI)?;
    enc.string("Hello World 🚀")?;
    enc.binary(&[0xde, 0xad, 0xbe, 0xef])?;
    enc.uuid(&id)?;

    let bytes = enc.into_bytes()?;
    let mut dec = Decoder::new(&bytes);
    assert_eq!(dec.double()?, PI);
    assert_eq!(dec.string()?, "Hello World 🚀");
    assert_eq!(dec.binary()?, &[0xde, 0xad, 0xbe, 0xef]);
    assert_eq!(dec.uuid()?, id);
    assert_eq!(dec.remaining(), 0);
    Ok(())
}

// ============================================================================
//  ENVELOPE TESTS
// ============================================================================

#[test]
fn test_strict_call_layout() -> Result<()> {
    let mut enc = Encoder::new();
    enc.message_begin(&MessageHeader::new("ping", MessageType::Call, 0))?;
    enc.struct_begin("ping_args")?;
    enc.field_begin("arg1", TType::I32, 1)?;
    enc.i32(7)?;
    enc.field_end()?;
    enc.field_stop()?;
    enc.struct_end()?;
    enc.message_end()?;

    let bytes = enc.into_bytes()?;
    let expected: Vec<u8> = vec![
        0x80, 0x01, 0x00, 0x01, // version | call
        0x00, 0x00, 0x00, 0x04, b'p', b'i', b'n', b'g',
        0x00, 0x00, 0x00, 0x00, // seq
        0x08, 0x00, 0x01, 0x00, 0x00, 0x00, 0x07, // i32 field 1
        0x00, // stop
    ];
    assert_eq!(bytes, expected);
    Ok(())
}

#[test]
fn test_strict_header_roundtrip() -> Result<()> {
    let header = MessageHeader::new("GetUser", MessageType::Reply, 42);
    let mut enc = Encoder::new();
    enc.message_begin(&header)?;
    enc.message_end()?;
    let bytes = enc.into_bytes()?;

    let mut dec = Decoder::new(&bytes);
    assert_eq!(dec.message_begin()?, header);
    dec.message_end()?;
    Ok(())
}

#[test]
fn test_non_strict_header_roundtrip() -> Result<()> {
    let header = MessageHeader::new("legacy", MessageType::Exception, 3);
    let mut enc = Encoder::with_config(non_strict());
    enc.message_begin(&header)?;
    enc.message_end()?;
    let bytes = enc.into_bytes()?;

    // name length first, then the kind byte after the name
    assert_eq!(&bytes[0..4], &[0, 0, 0, 6]);
    assert_eq!(bytes[10], MessageType::Exception as u8);

    let mut dec = Decoder::with_config(&bytes, non_strict());
    assert_eq!(dec.message_begin()?, header);
    Ok(())
}

#[test]
fn test_strict_read_rejects_unversioned_header() -> Result<()> {
    let mut enc = Encoder::with_config(non_strict());
    enc.message_begin(&MessageHeader::new("legacy", MessageType::Call, 0))?;
    enc.message_end()?;
    let bytes = enc.into_bytes()?;

    let strict = ProtocolConfig { strict_read: true, ..ProtocolConfig::default() };
    let mut dec = Decoder::with_config(&bytes, strict);
    assert_eq!(dec.message_begin(), Err(Error::MissingVersion));
    Ok(())
}

#[test]
fn test_default_reads_unversioned_header() -> Result<()> {
    let header = MessageHeader::new("legacy", MessageType::Reply, 0);
    let mut enc = Encoder::with_config(non_strict());
    enc.message_begin(&header)?;
    enc.message_end()?;
    let bytes = enc.into_bytes()?;

    let config = ProtocolConfig::default();
    assert!(!config.strict_read);
    assert!(config.strict_write);
    assert_eq!(Decoder::new(&bytes).message_begin()?, header);
    Ok(())
}

#[test]
fn test_bad_version() {
    let bytes = [0x80, 0x02, 0x00, 0x01, 0, 0, 0, 0, 0, 0, 0, 0];
    let mut dec = Decoder::new(&bytes);
    assert_eq!(dec.message_begin(), Err(Error::BadVersion(0x8002_0000)));
}

#[test]
fn test_invalid_message_type() {
    let bytes = [0x80, 0x01, 0x00, 0x09, 0, 0, 0, 0, 0, 0, 0, 0];
    let mut dec = Decoder::new(&bytes);
    assert_eq!(dec.message_begin(), Err(Error::InvalidMessageType(9)));
}

// ============================================================================
//  STRUCTURAL INVARIANTS (Encoder)
// ============================================================================

#[test]
fn test_struct_end_requires_stop() -> Result<()> {
    let mut enc = Encoder::new();
    enc.struct_begin("s")?;
    enc.field_begin("a", TType::Bool, 1)?;
    enc.bool(true)?;
    enc.field_end()?;
    assert_eq!(enc.struct_end(), Err(Error::MissingStop));
    Ok(())
}

#[test]
fn test_no_fields_after_stop() -> Result<()> {
    let mut enc = Encoder::new();
    enc.struct_begin("s")?;
    enc.field_stop()?;
    assert_eq!(enc.field_begin("late", TType::I32, 2), Err(Error::TooManyItems(Scope::Struct)));
    assert_eq!(enc.field_stop(), Err(Error::TooManyItems(Scope::Struct)));
    Ok(())
}

#[test]
fn test_scalar_directly_in_struct_rejected() -> Result<()> {
    let mut enc = Encoder::new();
    enc.struct_begin("s")?;
    assert!(matches!(enc.i32(1), Err(Error::ScopeMismatch { .. })));
    Ok(())
}

#[test]
fn test_field_requires_exactly_one_value() -> Result<()> {
    let mut enc = Encoder::new();
    enc.struct_begin("s")?;
    enc.field_begin("a", TType::I32, 1)?;
    assert_eq!(enc.field_end(), Err(Error::EmptyField));

    let mut enc = Encoder::new();
    enc.struct_begin("s")?;
    enc.field_begin("a", TType::I32, 1)?;
    enc.i32(1)?;
    assert_eq!(enc.i32(2), Err(Error::TooManyItems(Scope::Field)));
    Ok(())
}

#[test]
fn test_list_count_enforced() -> Result<()> {
    let mut enc = Encoder::new();
    enc.list_begin(ListHeader { elem: TType::I32, count: 2 })?;
    enc.i32(1)?;
    assert_eq!(enc.list_end(), Err(Error::CountMismatch { expected: 2, actual: 1 }));

    let mut enc = Encoder::new();
    enc.set_begin(SetHeader { elem: TType::I32, count: 1 })?;
    enc.i32(1)?;
    assert_eq!(enc.i32(2), Err(Error::TooManyItems(Scope::Set)));
    Ok(())
}

#[test]
fn test_map_counts_keys_and_values() -> Result<()> {
    let mut enc = Encoder::new();
    enc.map_begin(MapHeader { key: TType::String, value: TType::I64, count: 1 })?;
    enc.string("k")?;
    assert_eq!(enc.map_end(), Err(Error::CountMismatch { expected: 2, actual: 1 }));
    Ok(())
}

#[test]
fn test_into_bytes_with_open_scope() -> Result<()> {
    let mut enc = Encoder::new();
    enc.list_begin(ListHeader { elem: TType::I32, count: 0 })?;
    assert!(enc.as_bytes().is_err());
    assert_eq!(enc.into_bytes(), Err(Error::ScopeStillOpen));
    Ok(())
}

#[test]
fn test_scope_mismatch_and_underflow() -> Result<()> {
    let mut enc = Encoder::new();
    assert_eq!(enc.list_end(), Err(Error::ScopeUnderflow));

    enc.list_begin(ListHeader { elem: TType::I32, count: 0 })?;
    assert_eq!(enc.set_end(), Err(Error::ScopeMismatch { expected: Scope::Set, actual: Scope::List }));
    Ok(())
}

#[test]
fn test_encoder_depth_limit() -> Result<()> {
    let config = ProtocolConfig { recursion_limit: 3, ..ProtocolConfig::default() };
    let mut enc = Encoder::with_config(config);
    enc.list_begin(ListHeader { elem: TType::List, count: 1 })?;
    enc.list_begin(ListHeader { elem: TType::List, count: 1 })?;
    enc.list_begin(ListHeader { elem: TType::List, count: 1 })?;
    assert_eq!(enc.depth(), 3);
    assert_eq!(
        enc.list_begin(ListHeader { elem: TType::I32, count: 0 }),
        Err(Error::DepthLimitExceeded(3))
    );
    Ok(())
}

// ============================================================================
//  DECODER BOUNDS
// ============================================================================

#[test]
fn test_negative_sizes_rejected() {
    let bytes = [0xff, 0xff, 0xff, 0xff];
    assert_eq!(Decoder::new(&bytes).binary(), Err(Error::NegativeSize(-1)));

    let bytes = [TType::I32 as u8, 0xff, 0xff, 0xff, 0xfe];
    assert_eq!(Decoder::new(&bytes).list_begin(), Err(Error::NegativeSize(-2)));
}

#[test]
fn test_size_limit() -> Result<()> {
    let mut enc = Encoder::new();
    enc.string("too long for the limit")?;
    let bytes = enc.into_bytes()?;

    let config = ProtocolConfig { max_length: 4, ..ProtocolConfig::default() };
    let mut dec = Decoder::with_config(&bytes, config);
    assert_eq!(dec.string(), Err(Error::SizeLimit { size: 22, limit: 4 }));
    Ok(())
}

#[test]
fn test_count_larger_than_input() {
    // claims a million i64s with no payload
    let bytes = [TType::I64 as u8, 0x00, 0x0f, 0x42, 0x40];
    assert_eq!(Decoder::new(&bytes).list_begin(), Err(Error::UnexpectedEnd));
}

#[test]
fn test_void_elements_only_in_empty_collections() {
    let bytes = [TType::Void as u8, 0, 0, 0, 0];
    assert!(Decoder::new(&bytes).list_begin().is_ok());

    let bytes = [TType::Void as u8, 0, 0, 0, 5];
    assert_eq!(Decoder::new(&bytes).list_begin(), Err(Error::InvalidType(TType::Void as u8)));
}

#[test]
fn test_invalid_field_type() {
    let bytes = [0x05, 0x00, 0x01];
    assert_eq!(Decoder::new(&bytes).field_begin(), Err(Error::InvalidType(5)));
}

#[test]
fn test_truncated_input() {
    let bytes = [0x00, 0x00, 0x00];
    assert_eq!(Decoder::new(&bytes).i32(), Err(Error::UnexpectedEnd));
    let bytes = [0x00, 0x00, 0x00, 0x05, b'a'];
    assert_eq!(Decoder::new(&bytes).string(), Err(Error::UnexpectedEnd));
}

#[test]
fn test_decoder_depth_limit() -> Result<()> {
    let mut enc = Encoder::new();
    for _ in 0..4 {
        enc.list_begin(ListHeader { elem: TType::List, count: 1 })?;
    }
    enc.list_begin(ListHeader { elem: TType::I32, count: 0 })?;
    for _ in 0..5 {
        enc.list_end()?;
    }
    let bytes = enc.into_bytes()?;

    let config = ProtocolConfig { recursion_limit: 3, ..ProtocolConfig::default() };
    let mut dec = Decoder::with_config(&bytes, config);
    assert_eq!(dec.skip(TType::List), Err(Error::DepthLimitExceeded(3)));

    let mut dec = Decoder::new(&bytes);
    dec.skip(TType::List)?;
    assert_eq!(dec.remaining(), 0);
    Ok(())
}

// ============================================================================
//  SKIPPING
// ============================================================================

#[test]
fn test_skip_nested_struct() -> Result<()> {
    let mut enc = Encoder::new();
    enc.struct_begin("outer")?;

    enc.field_begin("inner", TType::Struct, 1)?;
    enc.struct_begin("inner")?;
    enc.field_begin("names", TType::List, 1)?;
    enc.list_begin(ListHeader { elem: TType::String, count: 2 })?;
    enc.string("a")?;
    enc.string("bc")?;
    enc.list_end()?;
    enc.field_end()?;
    enc.field_begin("scores", TType::Map, 2)?;
    enc.map_begin(MapHeader { key: TType::I16, value: TType::Double, count: 1 })?;
    enc.i16(1)?;
    enc.double(0.5)?;
    enc.map_end()?;
    enc.field_end()?;
    enc.field_begin("id", TType::Uuid, 3)?;
    enc.uuid(&[1u8; 16])?;
    enc.field_end()?;
    enc.field_stop()?;
    enc.struct_end()?;
    enc.field_end()?;

    enc.field_stop()?;
    enc.struct_end()?;
    enc.i32(99)?;
    let bytes = enc.into_bytes()?;

    let mut dec = Decoder::new(&bytes);
    dec.skip(TType::Struct)?;
    assert_eq!(dec.i32()?, 99);
    assert_eq!(dec.remaining(), 0);
    Ok(())
}

#[test]
fn test_skip_stop_is_invalid() {
    let bytes = [0u8; 4];
    assert_eq!(Decoder::new(&bytes).skip(TType::Stop), Err(Error::InvalidType(0)));
}

// ============================================================================
//  ROBUSTNESS
// ============================================================================

#[test]
fn test_random_input_never_panics() {
    let mut rng = StdRng::seed_from_u64(0x7468_7269_6674);
    for _ in 0..2_000 {
        let len = rng.gen_range(0..64);
        let bytes: Vec<u8> = (0..len).map(|_| rng.r#gen()).collect();

        let mut dec = Decoder::new(&bytes);
        let _ = dec.message_begin();
        let _ = dec.skip(TType::Struct);

        let mut dec = Decoder::new(&bytes);
        let _ = dec.skip(TType::Map);
    }
}
