//! Layout type for `char`.
//!
//! A foreign `char` is a UTF-16 code unit, not a Unicode scalar value. Lone surrogates are
//! valid elements, so they're stored as a [`JChar`] rather than a Rust `char`.
use std::fmt::{Debug, Formatter, Result as FmtResult, Write};

use super::Primitive;
use crate::data::{component::PrimitiveKind, host::HostValue};

/// A foreign `char`.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JChar(u16);

impl JChar {
    #[inline]
    pub const fn new(val: u16) -> Self {
        JChar(val)
    }

    /// Converts a Rust `char` to a `JChar`, returns `None` if it doesn't fit in a single code
    /// unit.
    #[inline]
    pub fn from_char(ch: char) -> Option<Self> {
        let mut buf = [0u16; 2];
        match ch.encode_utf16(&mut buf) {
            [unit] => Some(JChar(*unit)),
            _ => None,
        }
    }

    /// Returns the code unit.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns the value as a `char` if it isn't a surrogate.
    #[inline]
    pub fn try_as_char(self) -> Option<char> {
        char::from_u32(self.0 as u32)
    }
}

impl Debug for JChar {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if let Some(ch) = self.try_as_char() {
            f.write_char(ch)
        } else {
            f.write_fmt(format_args!("{:#06x} <surrogate>", self.0))
        }
    }
}

unsafe impl Primitive for JChar {
    const KIND: PrimitiveKind = PrimitiveKind::Char;
    const EXPECTED: &'static str = "char";

    /// Surrogates have no text representation, they're returned as their code unit.
    #[inline]
    fn into_host(self) -> HostValue {
        match self.try_as_char() {
            Some(ch) => HostValue::Str(ch.into()),
            None => HostValue::Int(self.0 as i64),
        }
    }

    #[inline]
    fn try_from_host(value: &HostValue) -> Option<Self> {
        match value {
            HostValue::Int(i) => Some(JChar(*i as u16)),
            HostValue::Str(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => JChar::from_char(ch),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}
