use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use super::*;
use crate::config::{ByteOrderKind, SerializationConfig};
use crate::context::{DeserializationContext, SerializationContext};
use crate::debug::{MemoryLogger, Severity};
use crate::format::every_kind;
use crate::format::{DataReader, DataWriter, EntryType, PrimitiveArray, PrimitiveSlice};
use crate::info::PrimitiveKind;
use crate::reflect::{Decimal, Guid};
use crate::registry::Registry;

fn write_with(config: SerializationConfig, f: impl FnOnce(&mut BinaryDataWriter<'_, Vec<u8>>)) -> Vec<u8> {
    let mut context = SerializationContext::new(Arc::new(Registry::new()), config).unwrap();
    let mut writer = BinaryDataWriter::new(Vec::new(), &mut context);
    f(&mut writer);
    writer.flush().unwrap();
    writer.into_inner()
}

fn write(f: impl FnOnce(&mut BinaryDataWriter<'_, Vec<u8>>)) -> Vec<u8> {
    write_with(SerializationConfig::default(), f)
}

fn read_context() -> (DeserializationContext, Arc<MemoryLogger>) {
    let logger = Arc::new(MemoryLogger::new());
    let mut context =
        DeserializationContext::new(Arc::new(Registry::new()), SerializationConfig::default())
            .unwrap();
    context.set_logger(logger.clone());
    (context, logger)
}

#[test]
fn literal_i32() {
    let bytes = write(|w| w.write_i32(None, 12345).unwrap());
    assert_eq!(bytes, [24, 0x39, 0x30, 0x00, 0x00]);
}

#[test]
fn literal_wide_string() {
    let config = SerializationConfig {
        narrow_strings: false,
        ..Default::default()
    };
    let bytes = write_with(config, |w| w.write_string(None, "Hi").unwrap());
    assert_eq!(bytes, [40, 1, 2, 0, 0, 0, 0x48, 0, 0x69, 0]);
}

#[test]
fn narrow_string_fast_path() {
    let bytes = write(|w| w.write_string(Some("n"), "ab").unwrap());
    // tag, name (flag, len, 'n'), flag, len, 'a', 'b'
    assert_eq!(bytes, [39, 0, 1, 0, 0, 0, b'n', 0, 2, 0, 0, 0, b'a', b'b']);

    let bytes = write(|w| w.write_string(None, "π").unwrap());
    assert_eq!(bytes[1], 1, "non latin-1 text falls back to UTF-16");
}

#[test]
fn big_endian_session() {
    let config = SerializationConfig {
        byte_order: ByteOrderKind::Big,
        ..Default::default()
    };
    let bytes = write_with(config.clone(), |w| w.write_i32(None, 12345).unwrap());
    assert_eq!(bytes, [24, 0, 0, 0x30, 0x39]);

    let mut context = DeserializationContext::new(Arc::new(Registry::new()), config).unwrap();
    let mut reader = BinaryDataReader::new(&bytes[..], &mut context);
    assert_eq!(reader.read_i32().unwrap(), Some(12345));
}

#[test]
fn values_read_back() {
    let guid = Guid::from_u128(0x0011_2233_4455_6677_8899_aabb_ccdd_eeff);
    let decimal: Decimal = "-3.25".parse().unwrap();
    let bytes = write(|w| {
        w.begin_struct_node(None, None).unwrap();
        w.write_bool(Some("b"), true).unwrap();
        w.write_u8(Some("u"), 200).unwrap();
        w.write_f32(Some("f"), 1.5).unwrap();
        w.write_decimal(Some("d"), decimal).unwrap();
        w.write_char(Some("c"), 'é').unwrap();
        w.write_guid(Some("g"), guid).unwrap();
        w.write_null(Some("n")).unwrap();
        w.end_node().unwrap();
    });

    let (mut context, logger) = read_context();
    let mut reader = BinaryDataReader::new(&bytes[..], &mut context);
    let header = reader.enter_node().unwrap().unwrap();
    assert_eq!(header.id, -1);
    assert!(header.ty.is_none());

    let entry = reader.peek_entry().unwrap();
    assert_eq!((entry.kind, entry.name.as_deref()), (EntryType::Boolean, Some("b")));
    assert_eq!(reader.read_bool().unwrap(), Some(true));
    // Widening is always fine.
    assert_eq!(reader.read_i64().unwrap(), Some(200));
    assert_eq!(reader.read_f64().unwrap(), Some(1.5));
    assert_eq!(reader.read_decimal().unwrap(), Some(decimal));
    assert_eq!(reader.read_char().unwrap(), Some('é'));
    assert_eq!(reader.read_guid().unwrap(), Some(guid));
    assert!(reader.read_null().unwrap());
    reader.exit_node().unwrap();

    assert_eq!(reader.peek_entry().unwrap().kind, EntryType::EndOfStream);
    assert!(logger.entries().is_empty());
}

#[test]
fn narrowing_out_of_range_warns() {
    let bytes = write(|w| w.write_i32(None, 300).unwrap());
    let (mut context, logger) = read_context();
    let mut reader = BinaryDataReader::new(&bytes[..], &mut context);
    assert_eq!(reader.read_u8().unwrap(), None);
    assert_eq!(logger.count(Severity::Warning), 1);
}

#[test]
fn type_table_is_per_session() {
    let ty = <Vec<u8> as crate::info::Typed>::type_info();
    let bytes = write(|w| {
        w.begin_reference_node(None, Some(ty), 0).unwrap();
        w.end_node().unwrap();
        w.begin_reference_node(None, Some(ty), 1).unwrap();
        w.end_node().unwrap();
    });
    let name = "alloc::vec::Vec<u8>";
    // first node declares the type by name, the second by id
    assert_eq!(bytes[1], tag::TYPE_NAME);
    let second = 1 + 1 + 4 + 1 + 4 + name.len() + 4 + 1;
    assert_eq!(&bytes[second..second + 2], [2, tag::TYPE_ID]);

    let (mut context, _) = read_context();
    context.registry().register::<Vec<u8>>();
    let mut reader = BinaryDataReader::new(&bytes[..], &mut context);
    for id in 0..2 {
        let header = reader.enter_node().unwrap().unwrap();
        assert_eq!(header.id, id);
        assert!(header.ty.is_some_and(|t| t.type_id() == ty.type_id()));
        assert_eq!(header.type_name.as_deref(), Some(name));
        reader.exit_node().unwrap();
    }
}

#[test]
fn primitive_arrays_bulk_copy() {
    let values = vec![1.5_f64, -2.0, 1e300];
    let bytes = write(|w| {
        w.begin_struct_node(None, None).unwrap();
        w.write_primitive_array(PrimitiveSlice::F64(&values)).unwrap();
        w.end_node().unwrap();
    });
    let (mut context, _) = read_context();
    let mut reader = BinaryDataReader::new(&bytes[..], &mut context);
    reader.enter_node().unwrap();
    assert_eq!(
        reader.read_primitive_array(PrimitiveKind::F64).unwrap(),
        Some(PrimitiveArray::F64(values))
    );
    reader.exit_node().unwrap();
}

#[test]
fn skip_is_structural() {
    let bytes = write(|w| {
        w.begin_struct_node(None, None).unwrap();
        w.begin_struct_node(Some("skipped"), None).unwrap();
        w.begin_array_node(2).unwrap();
        w.write_string(None, "a").unwrap();
        w.write_external_reference_string(None, "key").unwrap();
        w.end_array_node().unwrap();
        w.write_primitive_array(PrimitiveSlice::U16(&[1, 2, 3])).unwrap();
        w.end_node().unwrap();
        w.write_i64(Some("kept"), -1).unwrap();
        w.end_node().unwrap();
    });

    let (mut context, logger) = read_context();
    let mut reader = BinaryDataReader::new(&bytes[..], &mut context);
    reader.enter_node().unwrap();
    reader.skip_entry().unwrap();
    let entry = reader.peek_entry().unwrap();
    assert_eq!(entry.name.as_deref(), Some("kept"));
    assert_eq!(reader.read_i64().unwrap(), Some(-1));
    // End markers are never skipped.
    reader.skip_entry().unwrap();
    assert_eq!(reader.peek_entry().unwrap().kind, EntryType::EndOfNode);
    reader.exit_node().unwrap();
    assert!(logger.entries().is_empty());
}

#[test]
fn invalid_tag_ends_stream() {
    let (mut context, logger) = read_context();
    let bytes = [200_u8, 1, 2, 3];
    let mut reader = BinaryDataReader::new(&bytes[..], &mut context);
    assert_eq!(reader.peek_entry().unwrap().kind, EntryType::Invalid);
    reader.skip_entry().unwrap();
    assert_eq!(reader.peek_entry().unwrap().kind, EntryType::EndOfStream);
    assert_eq!(logger.count(Severity::Error), 1);
}

#[test]
fn truncation_degrades() {
    let (mut context, logger) = read_context();
    let bytes = [24_u8, 0x39, 0x30];
    let mut reader = BinaryDataReader::new(&bytes[..], &mut context);
    assert_eq!(reader.read_i32().unwrap(), None);
    assert!(logger.contains("ends in the middle"));
    assert_eq!(reader.peek_entry().unwrap().kind, EntryType::EndOfStream);
}

#[test]
fn mismatched_read_skips_value() {
    let bytes = write(|w| {
        w.write_string(None, "text").unwrap();
        w.write_i32(None, 5).unwrap();
    });
    let (mut context, logger) = read_context();
    let mut reader = BinaryDataReader::new(&bytes[..], &mut context);
    assert_eq!(reader.read_integer().unwrap(), None);
    assert_eq!(reader.read_integer().unwrap(), Some(5));
    assert_eq!(logger.count(Severity::Warning), 1);
}

#[test]
fn skipping_every_kind_ends_where_reading_does() {
    let bytes = write(|w| every_kind::write(w));

    let (mut context, logger) = read_context();
    context.registry().register::<Vec<u8>>();
    let mut reader = BinaryDataReader::new(&bytes[..], &mut context);
    every_kind::read(&mut reader);
    let read_to = reader.position();
    assert_eq!(read_to, bytes.len());

    let mut reader = BinaryDataReader::new(&bytes[..], &mut context);
    every_kind::skip(&mut reader);
    assert_eq!(reader.position(), read_to);
    assert!(logger.entries().is_empty(), "{:?}", logger.entries());
}
