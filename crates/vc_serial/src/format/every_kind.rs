//! A node holding one entry of every kind, shared by the format tests.

use alloc::vec;
use alloc::vec::Vec;

use crate::format::{DataReader, DataWriter, EntryType, PrimitiveArray, PrimitiveSlice};
use crate::info::{PrimitiveKind, Typed};
use crate::reflect::{Decimal, Guid};

/// Member names in write order; `last` follows them.
pub(crate) const NAMES: [&str; 24] = [
    "bool", "i8", "u8", "i16", "u16", "i32", "u32", "i64", "u64", "f32", "f64", "decimal", "char",
    "string", "guid", "null", "iref", "xindex", "xguid", "xstring", "struct", "reference", "array",
    "bytes",
];

fn guid() -> Guid {
    Guid::from_u128(0x0011_2233_4455_6677_8899_aabb_ccdd_eeff)
}

fn decimal() -> Decimal {
    Decimal::new(-1250, 2).unwrap()
}

pub(crate) fn write(w: &mut dyn DataWriter) {
    w.begin_struct_node(None, None).unwrap();
    w.write_bool(Some("bool"), true).unwrap();
    w.write_i8(Some("i8"), -8).unwrap();
    w.write_u8(Some("u8"), 8).unwrap();
    w.write_i16(Some("i16"), -16).unwrap();
    w.write_u16(Some("u16"), 16).unwrap();
    w.write_i32(Some("i32"), -32).unwrap();
    w.write_u32(Some("u32"), 32).unwrap();
    w.write_i64(Some("i64"), -64).unwrap();
    w.write_u64(Some("u64"), 64).unwrap();
    w.write_f32(Some("f32"), 0.5).unwrap();
    w.write_f64(Some("f64"), -2.25).unwrap();
    w.write_decimal(Some("decimal"), decimal()).unwrap();
    w.write_char(Some("char"), 'é').unwrap();
    w.write_string(Some("string"), "text").unwrap();
    w.write_guid(Some("guid"), guid()).unwrap();
    w.write_null(Some("null")).unwrap();
    w.write_internal_reference(Some("iref"), 3).unwrap();
    w.write_external_reference_index(Some("xindex"), 4).unwrap();
    w.write_external_reference_guid(Some("xguid"), guid()).unwrap();
    w.write_external_reference_string(Some("xstring"), "asset/key").unwrap();

    w.begin_struct_node(Some("struct"), None).unwrap();
    w.write_i32(Some("x"), 1).unwrap();
    w.end_node().unwrap();

    w.begin_reference_node(Some("reference"), Some(<Vec<u8>>::type_info()), 0).unwrap();
    w.end_node().unwrap();

    w.begin_struct_node(Some("array"), None).unwrap();
    w.begin_array_node(2).unwrap();
    w.begin_reference_node(None, None, 1).unwrap();
    w.write_u8(Some("x"), 1).unwrap();
    w.end_node().unwrap();
    w.write_u8(None, 2).unwrap();
    w.end_array_node().unwrap();
    w.end_node().unwrap();

    w.begin_struct_node(Some("bytes"), None).unwrap();
    w.write_primitive_array(PrimitiveSlice::U16(&[1, 2, 3])).unwrap();
    w.end_node().unwrap();

    w.write_i32(Some("last"), -1).unwrap();
    w.end_node().unwrap();
}

/// Reads every member with its typed read, up to the end of the stream.
pub(crate) fn read(r: &mut dyn DataReader) {
    r.enter_node().unwrap().unwrap();
    assert_eq!(r.read_bool().unwrap(), Some(true));
    assert_eq!(r.read_i8().unwrap(), Some(-8));
    assert_eq!(r.read_u8().unwrap(), Some(8));
    assert_eq!(r.read_i16().unwrap(), Some(-16));
    assert_eq!(r.read_u16().unwrap(), Some(16));
    assert_eq!(r.read_i32().unwrap(), Some(-32));
    assert_eq!(r.read_u32().unwrap(), Some(32));
    assert_eq!(r.read_i64().unwrap(), Some(-64));
    assert_eq!(r.read_u64().unwrap(), Some(64));
    assert_eq!(r.read_f32().unwrap(), Some(0.5));
    assert_eq!(r.read_f64().unwrap(), Some(-2.25));
    assert_eq!(r.read_decimal().unwrap(), Some(decimal()));
    assert_eq!(r.read_char().unwrap(), Some('é'));
    assert_eq!(r.read_string().unwrap().as_deref(), Some("text"));
    assert_eq!(r.read_guid().unwrap(), Some(guid()));
    assert!(r.read_null().unwrap());
    assert_eq!(r.read_internal_reference().unwrap(), Some(3));
    assert_eq!(r.read_external_reference_index().unwrap(), Some(4));
    assert_eq!(r.read_external_reference_guid().unwrap(), Some(guid()));
    assert_eq!(
        r.read_external_reference_string().unwrap().as_deref(),
        Some("asset/key")
    );

    r.enter_node().unwrap().unwrap();
    assert_eq!(r.read_i32().unwrap(), Some(1));
    r.exit_node().unwrap();

    let header = r.enter_node().unwrap().unwrap();
    assert_eq!(header.id, 0);
    assert_eq!(header.ty.map(|t| t.type_path()), Some("alloc::vec::Vec<u8>"));
    r.exit_node().unwrap();

    r.enter_node().unwrap().unwrap();
    assert_eq!(r.enter_array().unwrap(), Some(2));
    assert_eq!(r.enter_node().unwrap().unwrap().id, 1);
    assert_eq!(r.read_u8().unwrap(), Some(1));
    r.exit_node().unwrap();
    assert_eq!(r.read_u8().unwrap(), Some(2));
    r.exit_array().unwrap();
    r.exit_node().unwrap();

    r.enter_node().unwrap().unwrap();
    assert_eq!(
        r.read_primitive_array(PrimitiveKind::U16).unwrap(),
        Some(PrimitiveArray::U16(vec![1, 2, 3]))
    );
    r.exit_node().unwrap();

    assert_eq!(r.read_i32().unwrap(), Some(-1));
    r.exit_node().unwrap();
    assert_eq!(r.peek_entry().unwrap().kind, EntryType::EndOfStream);
}

/// Skips every member one entry at a time, up to the end of the stream.
pub(crate) fn skip(r: &mut dyn DataReader) {
    r.enter_node().unwrap().unwrap();
    for name in NAMES {
        let entry = r.peek_entry().unwrap();
        assert_eq!(entry.name.as_deref(), Some(name), "{:?}", entry.kind);
        r.skip_entry().unwrap();
    }
    assert_eq!(r.peek_entry().unwrap().name.as_deref(), Some("last"));
    assert_eq!(r.read_i32().unwrap(), Some(-1));
    r.exit_node().unwrap();
    assert_eq!(r.peek_entry().unwrap().kind, EntryType::EndOfStream);
}
