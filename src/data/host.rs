//! Values of the host runtime.
//!
//! The host is a dynamic runtime: a value is an integer, a float, text, `None`, or a proxy for
//! something that lives in the foreign runtime. Elements read from an array are converted to a
//! [`HostValue`], values written to an array are converted from one. Slices only appear as
//! subscripts.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use super::{
    array::{slice::SliceDescriptor, JArray},
    object::ForeignObject,
};

/// A value of the host runtime.
#[derive(Clone)]
pub enum HostValue {
    /// The host's null value.
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A proxy for an arbitrary foreign object.
    Object(ForeignObject),
    /// A wrapped foreign array.
    Array(JArray),
    /// A slice written in the host's subscript syntax, only valid as a subscript.
    Slice(SliceDescriptor),
}

impl HostValue {
    /// The name of the host type of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::None => "NoneType",
            HostValue::Bool(_) => "bool",
            HostValue::Int(_) => "int",
            HostValue::Float(_) => "float",
            HostValue::Str(_) => "str",
            HostValue::Object(_) => "jobject",
            HostValue::Array(_) => "jarray",
            HostValue::Slice(_) => "slice",
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, HostValue::None)
    }

    /// Returns the integer value, booleans are integers.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            HostValue::Int(i) => Some(*i),
            HostValue::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            HostValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&JArray> {
        match self {
            HostValue::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ForeignObject> {
        match self {
            HostValue::Object(o) => Some(o),
            _ => None,
        }
    }
}

/// Scalars and text compare by value, foreign objects and arrays by identity.
impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::None, HostValue::None) => true,
            (HostValue::Bool(a), HostValue::Bool(b)) => a == b,
            (HostValue::Int(a), HostValue::Int(b)) => a == b,
            (HostValue::Float(a), HostValue::Float(b)) => a == b,
            (HostValue::Str(a), HostValue::Str(b)) => a == b,
            (HostValue::Object(a), HostValue::Object(b)) => a == b,
            (HostValue::Array(a), HostValue::Array(b)) => a == b,
            (HostValue::Slice(a), HostValue::Slice(b)) => a == b,
            _ => false,
        }
    }
}

impl Debug for HostValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            HostValue::None => f.write_str("None"),
            HostValue::Bool(b) => Debug::fmt(b, f),
            HostValue::Int(i) => Debug::fmt(i, f),
            HostValue::Float(x) => Debug::fmt(x, f),
            HostValue::Str(s) => Debug::fmt(s, f),
            HostValue::Object(o) => Debug::fmt(o, f),
            HostValue::Array(a) => Debug::fmt(a, f),
            HostValue::Slice(s) => Debug::fmt(s, f),
        }
    }
}

impl From<bool> for HostValue {
    fn from(v: bool) -> Self {
        HostValue::Bool(v)
    }
}

impl From<i64> for HostValue {
    fn from(v: i64) -> Self {
        HostValue::Int(v)
    }
}

impl From<i32> for HostValue {
    fn from(v: i32) -> Self {
        HostValue::Int(v as i64)
    }
}

impl From<f64> for HostValue {
    fn from(v: f64) -> Self {
        HostValue::Float(v)
    }
}

impl From<&str> for HostValue {
    fn from(v: &str) -> Self {
        HostValue::Str(v.into())
    }
}

impl From<String> for HostValue {
    fn from(v: String) -> Self {
        HostValue::Str(v)
    }
}

impl From<ForeignObject> for HostValue {
    fn from(v: ForeignObject) -> Self {
        HostValue::Object(v)
    }
}

impl From<JArray> for HostValue {
    fn from(v: JArray) -> Self {
        HostValue::Array(v)
    }
}

impl From<SliceDescriptor> for HostValue {
    fn from(v: SliceDescriptor) -> Self {
        HostValue::Slice(v)
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => HostValue::None,
        }
    }
}
