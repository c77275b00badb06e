use crate::info::{NonGenericTypeInfoCell, PrimitiveKind, TypeInfo, TypeKind, TypePath, Typed};
use crate::reflect::{Decimal, Guid};

macro_rules! impl_primitive {
    ($ty:ty, $kind:ident, $path:expr, $name:expr, $module:expr) => {
        impl TypePath for $ty {
            #[inline]
            fn type_path() -> &'static str {
                $path
            }

            #[inline]
            fn type_name() -> &'static str {
                $name
            }

            #[inline]
            fn module_path() -> Option<&'static str> {
                $module
            }
        }

        impl Typed for $ty {
            fn type_info() -> &'static TypeInfo {
                static CELL: NonGenericTypeInfoCell = NonGenericTypeInfoCell::new();
                CELL.get_or_init(|| {
                    TypeInfo::new::<Self>(TypeKind::Primitive(PrimitiveKind::$kind))
                        .with_default::<Self>()
                })
            }
        }
    };
    ($ty:ident, $kind:ident) => {
        impl_primitive!($ty, $kind, stringify!($ty), stringify!($ty), None);
    };
}

impl_primitive!(bool, Bool);
impl_primitive!(i8, I8);
impl_primitive!(u8, U8);
impl_primitive!(i16, I16);
impl_primitive!(u16, U16);
impl_primitive!(i32, I32);
impl_primitive!(u32, U32);
impl_primitive!(i64, I64);
impl_primitive!(u64, U64);
impl_primitive!(isize, Isize);
impl_primitive!(usize, Usize);
impl_primitive!(f32, F32);
impl_primitive!(f64, F64);
impl_primitive!(char, Char);
impl_primitive!(
    alloc::string::String,
    String,
    "alloc::string::String",
    "String",
    Some("alloc::string")
);
impl_primitive!(Guid, Guid, "uuid::Uuid", "Uuid", Some("uuid"));
impl_primitive!(
    Decimal,
    Decimal,
    "vc_serial::reflect::Decimal",
    "Decimal",
    Some("vc_serial::reflect")
);
