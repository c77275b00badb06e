use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::reflect::Reflect;

/// One unit variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantInfo {
    pub name: &'static str,
    pub discriminant: i64,
}

/// A field-less enum, encoded through its discriminant.
#[derive(Debug)]
pub struct EnumInfo {
    variants: Box<[VariantInfo]>,
    to_discriminant: fn(&dyn Reflect) -> Option<i64>,
    from_discriminant: fn(i64) -> Option<Box<dyn Reflect>>,
}

impl EnumInfo {
    pub fn new(
        variants: Vec<VariantInfo>,
        to_discriminant: fn(&dyn Reflect) -> Option<i64>,
        from_discriminant: fn(i64) -> Option<Box<dyn Reflect>>,
    ) -> Self {
        Self {
            variants: variants.into_boxed_slice(),
            to_discriminant,
            from_discriminant,
        }
    }

    #[inline]
    pub fn variants(&self) -> &[VariantInfo] {
        &self.variants
    }

    pub fn variant_by_discriminant(&self, discriminant: i64) -> Option<&VariantInfo> {
        self.variants.iter().find(|v| v.discriminant == discriminant)
    }

    #[inline]
    pub fn discriminant_of(&self, value: &dyn Reflect) -> Option<i64> {
        (self.to_discriminant)(value)
    }

    #[inline]
    pub fn from_discriminant(&self, discriminant: i64) -> Option<Box<dyn Reflect>> {
        (self.from_discriminant)(discriminant)
    }
}
