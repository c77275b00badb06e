use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt::Write;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::info::PrimitiveKind;
use crate::reflect::Reflect;

macro_rules! primitive_arrays {
    ($($kind:ident($ty:ty)),* $(,)?) => {
        /// An owned run of fixed-stride primitives, the payload of a
        /// primitive array entry.
        #[derive(Debug, Clone, PartialEq)]
        pub enum PrimitiveArray {
            $($kind(Vec<$ty>),)*
        }

        /// A borrowed run of fixed-stride primitives.
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub enum PrimitiveSlice<'a> {
            $($kind(&'a [$ty]),)*
        }

        impl PrimitiveArray {
            #[inline]
            pub fn kind(&self) -> PrimitiveKind {
                match self {
                    $(Self::$kind(_) => PrimitiveKind::$kind,)*
                }
            }

            #[inline]
            pub fn len(&self) -> usize {
                match self {
                    $(Self::$kind(v) => v.len(),)*
                }
            }

            #[inline]
            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            #[inline]
            pub fn as_slice(&self) -> PrimitiveSlice<'_> {
                match self {
                    $(Self::$kind(v) => PrimitiveSlice::$kind(v),)*
                }
            }

            /// Boxes every element, for collections without bulk access.
            pub fn into_boxed(self) -> Vec<Box<dyn Reflect>> {
                match self {
                    $(Self::$kind(v) => v
                        .into_iter()
                        .map(|item| Box::new(item) as Box<dyn Reflect>)
                        .collect(),)*
                }
            }

            /// Moves the elements into `target` if it is the matching `Vec`.
            pub fn assign_to_vec(self, target: &mut dyn Any) -> Result<(), Self> {
                match self {
                    $(Self::$kind(v) => match target.downcast_mut::<Vec<$ty>>() {
                        Some(target) => {
                            *target = v;
                            Ok(())
                        }
                        None => Err(Self::$kind(v)),
                    },)*
                }
            }
        }

        impl<'a> PrimitiveSlice<'a> {
            /// Borrows `value` if it is a `Vec` of a fixed-stride primitive.
            pub fn from_vec(value: &'a dyn Any) -> Option<Self> {
                $(if let Some(v) = value.downcast_ref::<Vec<$ty>>() {
                    return Some(Self::$kind(v));
                })*
                None
            }

            #[inline]
            pub fn kind(&self) -> PrimitiveKind {
                match self {
                    $(Self::$kind(_) => PrimitiveKind::$kind,)*
                }
            }

            #[inline]
            pub fn len(&self) -> usize {
                match self {
                    $(Self::$kind(v) => v.len(),)*
                }
            }

            #[inline]
            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }
        }
    };
}

primitive_arrays! {
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
}

#[inline]
fn char_unit(c: char) -> u16 {
    u16::try_from(u32::from(c)).unwrap_or(0xFFFD)
}

#[inline]
fn unit_char(unit: u16) -> char {
    char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER)
}

impl PrimitiveSlice<'_> {
    /// Element byte width on the wire.
    #[inline]
    pub fn stride(&self) -> usize {
        self.kind().stride().unwrap_or(0)
    }

    /// Appends the raw elements to `out`.
    pub fn encode(&self, big_endian: bool, out: &mut Vec<u8>) {
        if big_endian {
            self.encode_with::<BigEndian>(out);
        } else {
            self.encode_with::<LittleEndian>(out);
        }
    }

    fn encode_with<B: ByteOrder>(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.resize(start + self.len() * self.stride(), 0);
        let dst = &mut out[start..];
        match *self {
            Self::Bool(v) => dst.iter_mut().zip(v).for_each(|(d, b)| *d = u8::from(*b)),
            Self::I8(v) => dst.iter_mut().zip(v).for_each(|(d, b)| *d = *b as u8),
            Self::U8(v) => dst.copy_from_slice(v),
            Self::I16(v) => B::write_i16_into(v, dst),
            Self::U16(v) => B::write_u16_into(v, dst),
            Self::I32(v) => B::write_i32_into(v, dst),
            Self::U32(v) => B::write_u32_into(v, dst),
            Self::I64(v) => B::write_i64_into(v, dst),
            Self::U64(v) => B::write_u64_into(v, dst),
            Self::F32(v) => B::write_f32_into(v, dst),
            Self::F64(v) => B::write_f64_into(v, dst),
            Self::Char(v) => dst
                .chunks_exact_mut(2)
                .zip(v)
                .for_each(|(d, c)| B::write_u16(d, char_unit(*c))),
        }
    }

    /// Writes the elements as text separated by `sep`.
    ///
    /// Chars are written as their UTF-16 unit so every element is numeric.
    pub fn write_text(&self, sep: &str, out: &mut String) {
        macro_rules! join {
            ($v:expr, $f:expr) => {
                for (i, item) in $v.iter().enumerate() {
                    if i > 0 {
                        out.push_str(sep);
                    }
                    $f(out, item);
                }
            };
        }
        match *self {
            Self::Bool(v) => join!(v, |o: &mut String, b: &bool| o.push_str(if *b { "true" } else { "false" })),
            Self::I8(v) => join!(v, |o: &mut String, n: &i8| { let _ = write!(o, "{n}"); }),
            Self::U8(v) => join!(v, |o: &mut String, n: &u8| { let _ = write!(o, "{n}"); }),
            Self::I16(v) => join!(v, |o: &mut String, n: &i16| { let _ = write!(o, "{n}"); }),
            Self::U16(v) => join!(v, |o: &mut String, n: &u16| { let _ = write!(o, "{n}"); }),
            Self::I32(v) => join!(v, |o: &mut String, n: &i32| { let _ = write!(o, "{n}"); }),
            Self::U32(v) => join!(v, |o: &mut String, n: &u32| { let _ = write!(o, "{n}"); }),
            Self::I64(v) => join!(v, |o: &mut String, n: &i64| { let _ = write!(o, "{n}"); }),
            Self::U64(v) => join!(v, |o: &mut String, n: &u64| { let _ = write!(o, "{n}"); }),
            Self::F32(v) => join!(v, |o: &mut String, n: &f32| o.push_str(&float_to_text(f64::from(*n), true))),
            Self::F64(v) => join!(v, |o: &mut String, n: &f64| o.push_str(&float_to_text(*n, false))),
            Self::Char(v) => join!(v, |o: &mut String, c: &char| { let _ = write!(o, "{}", char_unit(*c)); }),
        }
    }
}

impl PrimitiveArray {
    /// Decodes `count` raw elements of `kind` from `bytes`.
    ///
    /// `None` if the kind has no fixed stride or the byte length does not
    /// match.
    pub fn decode(kind: PrimitiveKind, count: usize, bytes: &[u8], big_endian: bool) -> Option<Self> {
        let stride = kind.stride()?;
        if count.checked_mul(stride)? != bytes.len() {
            return None;
        }
        if big_endian {
            Self::decode_with::<BigEndian>(kind, count, bytes)
        } else {
            Self::decode_with::<LittleEndian>(kind, count, bytes)
        }
    }

    fn decode_with<B: ByteOrder>(kind: PrimitiveKind, count: usize, bytes: &[u8]) -> Option<Self> {
        macro_rules! read_into {
            ($kind:ident, $ty:ty, $read:ident) => {{
                let mut values: Vec<$ty> = vec![Default::default(); count];
                B::$read(bytes, &mut values);
                Self::$kind(values)
            }};
        }
        Some(match kind {
            PrimitiveKind::Bool => Self::Bool(bytes.iter().map(|b| *b != 0).collect()),
            PrimitiveKind::I8 => Self::I8(bytes.iter().map(|b| *b as i8).collect()),
            PrimitiveKind::U8 => Self::U8(bytes.to_vec()),
            PrimitiveKind::I16 => read_into!(I16, i16, read_i16_into),
            PrimitiveKind::U16 => read_into!(U16, u16, read_u16_into),
            PrimitiveKind::I32 => read_into!(I32, i32, read_i32_into),
            PrimitiveKind::U32 => read_into!(U32, u32, read_u32_into),
            PrimitiveKind::I64 => read_into!(I64, i64, read_i64_into),
            PrimitiveKind::U64 => read_into!(U64, u64, read_u64_into),
            PrimitiveKind::F32 => read_into!(F32, f32, read_f32_into),
            PrimitiveKind::F64 => read_into!(F64, f64, read_f64_into),
            PrimitiveKind::Char => {
                Self::Char(bytes.chunks_exact(2).map(|c| unit_char(B::read_u16(c))).collect())
            }
            _ => return None,
        })
    }

    /// Parses elements written by [`PrimitiveSlice::write_text`].
    pub fn from_text<'a>(kind: PrimitiveKind, items: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        macro_rules! parse {
            ($kind:ident, $parse:expr) => {
                Self::$kind(
                    items
                        .into_iter()
                        .map(|s| $parse(s.trim()))
                        .collect::<Option<Vec<_>>>()?,
                )
            };
        }
        Some(match kind {
            PrimitiveKind::Bool => parse!(Bool, |s: &str| s.parse::<bool>().ok()),
            PrimitiveKind::I8 => parse!(I8, |s: &str| s.parse::<i8>().ok()),
            PrimitiveKind::U8 => parse!(U8, |s: &str| s.parse::<u8>().ok()),
            PrimitiveKind::I16 => parse!(I16, |s: &str| s.parse::<i16>().ok()),
            PrimitiveKind::U16 => parse!(U16, |s: &str| s.parse::<u16>().ok()),
            PrimitiveKind::I32 => parse!(I32, |s: &str| s.parse::<i32>().ok()),
            PrimitiveKind::U32 => parse!(U32, |s: &str| s.parse::<u32>().ok()),
            PrimitiveKind::I64 => parse!(I64, |s: &str| s.parse::<i64>().ok()),
            PrimitiveKind::U64 => parse!(U64, |s: &str| s.parse::<u64>().ok()),
            PrimitiveKind::F32 => parse!(F32, |s: &str| float_from_text(s).map(|f| f as f32)),
            PrimitiveKind::F64 => parse!(F64, float_from_text),
            PrimitiveKind::Char => parse!(Char, |s: &str| s.parse::<u16>().ok().map(unit_char)),
            _ => return None,
        })
    }
}

/// Text of a float that always reads back as a float: finite values keep a
/// `.` or an exponent, the rest use `NaN`, `Infinity` and `-Infinity`.
pub(crate) fn float_to_text(value: f64, single: bool) -> String {
    if value.is_nan() {
        return String::from("NaN");
    }
    if value.is_infinite() {
        return String::from(if value > 0.0 { "Infinity" } else { "-Infinity" });
    }
    if single {
        alloc::format!("{:?}", value as f32)
    } else {
        alloc::format!("{value:?}")
    }
}

/// Inverse of [`float_to_text`]; also accepts plain integers.
pub(crate) fn float_from_text(text: &str) -> Option<f64> {
    match text {
        "NaN" => Some(f64::NAN),
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        _ => text.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn byte_layout_follows_order() {
        let values = vec![1_i32, -2];
        let slice = PrimitiveSlice::from_vec(&values).unwrap();
        assert_eq!(slice.kind(), PrimitiveKind::I32);
        assert_eq!(slice.stride(), 4);

        let mut little = Vec::new();
        slice.encode(false, &mut little);
        assert_eq!(little, [1, 0, 0, 0, 0xFE, 0xFF, 0xFF, 0xFF]);

        let mut big = Vec::new();
        slice.encode(true, &mut big);
        assert_eq!(big, [0, 0, 0, 1, 0xFF, 0xFF, 0xFF, 0xFE]);

        let back = PrimitiveArray::decode(PrimitiveKind::I32, 2, &big, true).unwrap();
        assert_eq!(back, PrimitiveArray::I32(values));
    }

    #[test]
    fn decode_rejects_bad_lengths() {
        assert!(PrimitiveArray::decode(PrimitiveKind::U16, 2, &[0, 0, 0], false).is_none());
        assert!(PrimitiveArray::decode(PrimitiveKind::String, 0, &[], false).is_none());
    }

    #[test]
    fn chars_use_utf16_units() {
        let chars = vec!['a', 'é'];
        let mut bytes = Vec::new();
        PrimitiveSlice::Char(&chars).encode(false, &mut bytes);
        assert_eq!(bytes, [0x61, 0, 0xE9, 0]);

        let mut text = String::new();
        PrimitiveSlice::Char(&chars).write_text(",", &mut text);
        assert_eq!(text, "97,233");
        assert_eq!(
            PrimitiveArray::from_text(PrimitiveKind::Char, text.split(',')),
            Some(PrimitiveArray::Char(chars))
        );
    }

    #[test]
    fn float_text_keeps_kind() {
        let values = vec![1.0_f64, f64::INFINITY, 0.1];
        let mut text = String::new();
        PrimitiveSlice::F64(&values).write_text(", ", &mut text);
        assert_eq!(text, "1.0, Infinity, 0.1");
        assert_eq!(
            PrimitiveArray::from_text(PrimitiveKind::F64, text.split(',')),
            Some(PrimitiveArray::F64(values))
        );
        assert_eq!(float_to_text(f64::NAN, false), "NaN");
    }

    #[test]
    fn assign_checks_target() {
        let mut target: Vec<u8> = Vec::new();
        PrimitiveArray::U8(vec![1, 2]).assign_to_vec(&mut target).unwrap();
        assert_eq!(target, [1, 2]);

        let mut wrong: Vec<i8> = Vec::new();
        assert!(PrimitiveArray::U8(vec![1]).assign_to_vec(&mut wrong).is_err());
    }
}
