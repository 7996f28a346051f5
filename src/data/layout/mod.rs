//! Layouts of primitive array elements.
//!
//! Every primitive component type has a Rust type with the same layout as an element of the
//! pinned buffer. Most of them are plain Rust primitives, `boolean` and `char` have their own
//! layout types because the foreign representation doesn't match Rust's `bool` and `char`.
//!
//! The [`Primitive`] trait converts between these layouts and host values. Element access on a
//! pinned buffer is dispatched to the right layout with [`dispatch_primitive`].
//!
//! [`dispatch_primitive`]: crate::dispatch_primitive

pub mod bool;
pub mod char;

use crate::{
    data::{component::PrimitiveKind, host::HostValue},
    error::{JarrayResult, TypeError},
};

/// A primitive element layout.
///
/// Safety: `Self` must have the layout of an element of a primitive array of kind `KIND`, and
/// every bit pattern must be valid.
pub unsafe trait Primitive: Copy + Default + PartialEq + 'static {
    /// The kind of array this layout belongs to.
    const KIND: PrimitiveKind;

    /// Name of the host representation that is accepted by `from_host`, used in errors.
    const EXPECTED: &'static str;

    /// Converts the element to its host representation.
    fn into_host(self) -> HostValue;

    /// Converts a host value to an element. Returns `None` if the value has the wrong host
    /// type.
    fn try_from_host(value: &HostValue) -> Option<Self>;

    /// Converts a host value to an element, fails with a `TypeError` naming the expected kind.
    #[inline]
    fn from_host(value: &HostValue) -> JarrayResult<Self> {
        match Self::try_from_host(value) {
            Some(v) => Ok(v),
            None => Err(TypeError::Expected {
                expected: Self::EXPECTED,
                found: value.type_name(),
            })?,
        }
    }
}

macro_rules! impl_integral {
    ($type:ty, $kind:ident, $expected:literal) => {
        unsafe impl Primitive for $type {
            const KIND: PrimitiveKind = PrimitiveKind::$kind;
            const EXPECTED: &'static str = $expected;

            #[inline]
            fn into_host(self) -> HostValue {
                HostValue::Int(self as i64)
            }

            #[inline]
            fn try_from_host(value: &HostValue) -> Option<Self> {
                // Values are truncated to the element width.
                match value {
                    HostValue::Int(i) => Some(*i as $type),
                    HostValue::Bool(b) => Some(*b as $type),
                    _ => None,
                }
            }
        }
    };
}

macro_rules! impl_floating {
    ($type:ty, $kind:ident) => {
        unsafe impl Primitive for $type {
            const KIND: PrimitiveKind = PrimitiveKind::$kind;
            const EXPECTED: &'static str = "float";

            #[inline]
            fn into_host(self) -> HostValue {
                HostValue::Float(self as f64)
            }

            #[inline]
            fn try_from_host(value: &HostValue) -> Option<Self> {
                match value {
                    HostValue::Float(f) => Some(*f as $type),
                    _ => None,
                }
            }
        }
    };
}

impl_integral!(i8, Byte, "int (byte)");
impl_integral!(i16, Short, "int (short)");
impl_integral!(i32, Int, "int");
impl_integral!(i64, Long, "int (long)");
impl_floating!(f32, Float);
impl_floating!(f64, Double);

/// Runs `$body` with `$t` bound to the layout type of the primitive kind `$kind`.
///
/// This is the single place where a primitive kind is mapped to its layout, every operation on
/// pinned buffers goes through it.
#[macro_export]
macro_rules! dispatch_primitive {
    ($kind:expr, $t:ident => $body:expr) => {
        match $kind {
            $crate::data::component::PrimitiveKind::Boolean => {
                type $t = $crate::data::layout::bool::JBoolean;
                $body
            }
            $crate::data::component::PrimitiveKind::Byte => {
                type $t = i8;
                $body
            }
            $crate::data::component::PrimitiveKind::Char => {
                type $t = $crate::data::layout::char::JChar;
                $body
            }
            $crate::data::component::PrimitiveKind::Short => {
                type $t = i16;
                $body
            }
            $crate::data::component::PrimitiveKind::Int => {
                type $t = i32;
                $body
            }
            $crate::data::component::PrimitiveKind::Long => {
                type $t = i64;
                $body
            }
            $crate::data::component::PrimitiveKind::Float => {
                type $t = f32;
                $body
            }
            $crate::data::component::PrimitiveKind::Double => {
                type $t = f64;
                $body
            }
        }
    };
}
