use core::any::TypeId;
use core::fmt;

use crate::info::{TypeInfo, Typed};
use crate::reflect::{Decimal, Guid};

/// Every value kind a writer can emit as a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    Isize,
    Usize,
    F32,
    F64,
    Decimal,
    Char,
    String,
    Guid,
}

impl PrimitiveKind {
    /// Kind of `T`, if `T` is one of the primitive types.
    pub fn of<T: ?Sized + 'static>() -> Option<Self> {
        let id = TypeId::of::<T>();
        macro_rules! check {
            ($($ty:ty => $kind:ident),* $(,)?) => {
                $(if id == TypeId::of::<$ty>() { return Some(Self::$kind); })*
            };
        }
        check! {
            bool => Bool, i8 => I8, u8 => U8, i16 => I16, u16 => U16,
            i32 => I32, u32 => U32, i64 => I64, u64 => U64,
            isize => Isize, usize => Usize, f32 => F32, f64 => F64,
            Decimal => Decimal, char => Char, alloc::string::String => String,
            Guid => Guid,
        }
        None
    }

    /// Element byte width inside a primitive array, `None` for kinds
    /// that cannot be bulk-copied.
    pub const fn stride(self) -> Option<usize> {
        match self {
            Self::Bool | Self::I8 | Self::U8 => Some(1),
            Self::I16 | Self::U16 | Self::Char => Some(2),
            Self::I32 | Self::U32 | Self::F32 => Some(4),
            Self::I64 | Self::U64 | Self::F64 => Some(8),
            Self::Isize | Self::Usize | Self::Decimal | Self::String | Self::Guid => None,
        }
    }

    /// The [`TypeInfo`] of the Rust type behind this kind.
    pub fn type_info(self) -> &'static TypeInfo {
        match self {
            Self::Bool => bool::type_info(),
            Self::I8 => i8::type_info(),
            Self::U8 => u8::type_info(),
            Self::I16 => i16::type_info(),
            Self::U16 => u16::type_info(),
            Self::I32 => i32::type_info(),
            Self::U32 => u32::type_info(),
            Self::I64 => i64::type_info(),
            Self::U64 => u64::type_info(),
            Self::Isize => isize::type_info(),
            Self::Usize => usize::type_info(),
            Self::F32 => f32::type_info(),
            Self::F64 => f64::type_info(),
            Self::Decimal => Decimal::type_info(),
            Self::Char => char::type_info(),
            Self::String => alloc::string::String::type_info(),
            Self::Guid => Guid::type_info(),
        }
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::I8
                | Self::U8
                | Self::I16
                | Self::U16
                | Self::I32
                | Self::U32
                | Self::I64
                | Self::U64
                | Self::Isize
                | Self::Usize
        )
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_of() {
        assert_eq!(PrimitiveKind::of::<i32>(), Some(PrimitiveKind::I32));
        assert_eq!(
            PrimitiveKind::of::<alloc::string::String>(),
            Some(PrimitiveKind::String)
        );
        assert_eq!(PrimitiveKind::of::<Vec<i32>>(), None);
    }

    #[test]
    fn strides() {
        assert_eq!(PrimitiveKind::Char.stride(), Some(2));
        assert_eq!(PrimitiveKind::F64.stride(), Some(8));
        assert_eq!(PrimitiveKind::String.stride(), None);
    }

    #[test]
    fn kind_round_trips_through_info() {
        let info = PrimitiveKind::U16.type_info();
        assert_eq!(info.as_primitive(), Some(PrimitiveKind::U16));
        assert!(info.ty().is::<u16>());
    }
}
