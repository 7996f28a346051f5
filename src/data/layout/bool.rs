//! Layout type for `boolean`.
//!
//! A foreign `boolean` is stored as a byte. In Rust it's unsound to create a `bool` from any
//! byte other than 0 or 1, so elements of a `boolean` array are read as a [`JBoolean`] instead.
use std::fmt::{Debug, Formatter, Result as FmtResult};

use super::Primitive;
use crate::data::{component::PrimitiveKind, host::HostValue};

/// A foreign `boolean`.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JBoolean(u8);

impl JBoolean {
    pub const FALSE: JBoolean = JBoolean(0);
    pub const TRUE: JBoolean = JBoolean(1);

    #[inline]
    pub const fn new(val: bool) -> Self {
        JBoolean(val as u8)
    }

    /// Returns the value of the `JBoolean` as a `u8`.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Returns the value of the `JBoolean` as a `bool`.
    #[inline]
    pub const fn as_bool(self) -> bool {
        self.0 != 0
    }
}

impl Debug for JBoolean {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.0 {
            0 => f.write_str("false"),
            1 => f.write_str("true"),
            n => f.write_fmt(format_args!("{} <invalid boolean>", n)),
        }
    }
}

unsafe impl Primitive for JBoolean {
    const KIND: PrimitiveKind = PrimitiveKind::Boolean;
    const EXPECTED: &'static str = "boolean";

    #[inline]
    fn into_host(self) -> HostValue {
        HostValue::Bool(self.as_bool())
    }

    #[inline]
    fn try_from_host(value: &HostValue) -> Option<Self> {
        match value {
            HostValue::Bool(b) => Some(JBoolean::new(*b)),
            HostValue::Int(i) => Some(JBoolean::new(*i != 0)),
            _ => None,
        }
    }
}
