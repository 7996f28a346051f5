//! Slicing and the subscript protocol.
//!
//! A slice is a new foreign array of the same component type that holds a copy of a range of
//! elements, it doesn't share storage with the array it was taken from. Only contiguous slices
//! are supported.

use std::ops::Range;

use tracing::debug;

use super::{new_foreign_array, JArray};
use crate::{
    catch::{catch_exceptions, catch_local},
    data::{component::ComponentType, host::HostValue},
    env::refs::as_nullable,
    error::{JarrayResult, RuntimeError, TypeError},
};

/// The bounds of a slice, as written in the host's subscript syntax.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SliceDescriptor {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl SliceDescriptor {
    #[inline]
    pub const fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        SliceDescriptor { start, stop, step }
    }

    /// A slice that covers the whole array.
    #[inline]
    pub const fn full() -> Self {
        SliceDescriptor::new(None, None, None)
    }

    /// Resolves the bounds for an array of `length` elements. Negative bounds count from the
    /// end, bounds past either end are clamped.
    pub fn indices(&self, length: usize) -> JarrayResult<(i64, i64)> {
        let step = self.step.unwrap_or(1);
        if step != 1 {
            return Err(TypeError::UnsupportedStep { step })?;
        }

        let length = length as i64;
        let normalize = |bound: Option<i64>, default: i64| match bound {
            None => default,
            Some(b) if b < 0 => (b + length).max(0),
            Some(b) => b.min(length),
        };

        Ok((normalize(self.start, 0), normalize(self.stop, length)))
    }
}

impl From<Range<i64>> for SliceDescriptor {
    fn from(range: Range<i64>) -> Self {
        SliceDescriptor::new(Some(range.start), Some(range.end), None)
    }
}

/// A subscript: a single index or a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subscript {
    Index(i64),
    Slice(SliceDescriptor),
}

impl Subscript {
    /// Converts a host value to a subscript. Only integers are valid indices, booleans aren't.
    pub fn from_host(value: &HostValue) -> JarrayResult<Self> {
        match value {
            HostValue::Int(i) => Ok(Subscript::Index(*i)),
            HostValue::Slice(slice) => Ok(Subscript::Slice(*slice)),
            _ => Err(TypeError::Subscript)?,
        }
    }
}

impl From<i64> for Subscript {
    fn from(index: i64) -> Self {
        Subscript::Index(index)
    }
}

impl From<SliceDescriptor> for Subscript {
    fn from(slice: SliceDescriptor) -> Self {
        Subscript::Slice(slice)
    }
}

impl From<Range<i64>> for Subscript {
    fn from(range: Range<i64>) -> Self {
        Subscript::Slice(range.into())
    }
}

impl JArray {
    /// Returns a new array that holds a copy of the elements in `[low, high)`.
    ///
    /// `low` is clamped to `[0, len]` and `high` to `[low, len]`, so the result is never
    /// larger than this array and may be empty.
    pub fn slice(&self, low: i64, high: i64) -> JarrayResult<JArray> {
        let length = self.len() as i64;
        let low = low.clamp(0, length);
        let high = high.clamp(low, length);
        let len = (high - low) as usize;

        let inner = self.inner();
        let ty = inner.component()?;
        let class = match ty {
            ComponentType::Primitive(_) => None,
            _ => Some(inner.component_class()?),
        };

        let env = self.env();
        let array = new_foreign_array(env, ty, class, len as i32, None)?;
        let sliced = JArray::wrap(env, array.as_obj())?;
        debug!(low, high, component = %ty, "slicing array");

        match ty {
            ComponentType::Primitive(_) => {
                let src = inner.pinned.borrow();
                let dst = sliced.inner().pinned.borrow();
                let src = src.as_ref().ok_or(RuntimeError::MissingPinnedBuffer)?;
                let dst = dst.as_ref().ok_or(RuntimeError::MissingPinnedBuffer)?;
                dst.copy_from(src, low as usize, len)?;
            }
            _ => {
                let src = self.as_obj();
                let dst = sliced.as_obj();
                for i in 0..len {
                    let from = (low as usize + i) as i32;
                    let elem = catch_local(env, |e| e.get_object_array_element(src, from))?;
                    catch_exceptions(env, |e| {
                        e.set_object_array_element(dst, i as i32, as_nullable(&elem))
                    })?;
                }
            }
        }

        Ok(sliced)
    }

    /// Evaluates a subscript. An index returns the element, negative indices count from the
    /// end. A slice returns a new array.
    pub fn subscript(&self, subscript: impl Into<Subscript>) -> JarrayResult<HostValue> {
        match subscript.into() {
            Subscript::Index(mut index) => {
                if index < 0 {
                    index += self.len() as i64;
                }
                self.get(index)
            }
            Subscript::Slice(slice) => {
                let (start, stop) = slice.indices(self.len())?;
                Ok(HostValue::Array(self.slice(start, stop)?))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::JarrayError;

    #[test]
    fn indices_are_normalized() {
        assert_eq!(SliceDescriptor::full().indices(5).unwrap(), (0, 5));
        assert_eq!(SliceDescriptor::from(1..4).indices(5).unwrap(), (1, 4));
        assert_eq!(SliceDescriptor::new(Some(-2), None, None).indices(5).unwrap(), (3, 5));
        assert_eq!(SliceDescriptor::new(Some(-9), Some(99), None).indices(5).unwrap(), (0, 5));
        assert_eq!(SliceDescriptor::new(None, Some(-1), Some(1)).indices(5).unwrap(), (0, 4));
    }

    #[test]
    fn steps_are_rejected() {
        for step in [0, 2, -1] {
            let err = SliceDescriptor::new(None, None, Some(step)).indices(5).unwrap_err();
            assert_eq!(*err, JarrayError::TypeError(TypeError::UnsupportedStep { step }));
        }

        // Even if the slice would be empty.
        assert!(SliceDescriptor::new(Some(3), Some(3), Some(2)).indices(0).is_err());
    }

    #[test]
    fn subscripts_are_integers_or_slices() {
        assert_eq!(Subscript::from_host(&HostValue::Int(-1)).unwrap(), Subscript::Index(-1));

        let slice = SliceDescriptor::from(1..3);
        assert_eq!(Subscript::from_host(&slice.into()).unwrap(), Subscript::Slice(slice));

        for value in [HostValue::from("0"), HostValue::Bool(true), HostValue::Float(0.0)] {
            let err = Subscript::from_host(&value).unwrap_err();
            assert_eq!(*err, JarrayError::TypeError(TypeError::Subscript));
        }
    }
}
