//! Element access.
//!
//! Elements of primitive arrays are read from and written to the pinned buffer, elements of
//! reference arrays are fetched and stored one at a time by the foreign runtime. Bounds and
//! host types are checked before the foreign runtime is called.

use tracing::trace;

use super::JArray;
use crate::{
    catch::{catch_exceptions, catch_local},
    data::{
        component::ComponentType,
        host::HostValue,
        layout::Primitive,
        object::{host_to_object, string_to_text, text_to_string, wrap_object},
    },
    dispatch_primitive,
    env::{refs::as_nullable, ObjectRef},
    error::{IndexError, JarrayResult, RuntimeError, TypeError, ValueError},
};

impl JArray {
    /// Returns the element at `index`.
    ///
    /// Primitive elements are converted to their host representation. A foreign null becomes
    /// [`HostValue::None`], strings become text and nested arrays are wrapped in a new handle.
    pub fn get(&self, index: i64) -> JarrayResult<HostValue> {
        let idx = self.check_index(index)?;
        let inner = self.inner();

        match inner.component()? {
            ComponentType::Primitive(kind) => {
                let pinned = inner.pinned.borrow();
                let buffer = pinned.as_ref().ok_or(RuntimeError::MissingPinnedBuffer)?;
                dispatch_primitive!(kind, T => Ok(buffer.read::<T>(idx)?.into_host()))
            }
            ty => {
                let env = self.env();
                let array = self.as_obj();
                let elem = catch_local(env, |e| e.get_object_array_element(array, idx as i32))?;
                trace!(index, component = %ty, "fetched element");

                let Some(elem) = elem else {
                    return Ok(HostValue::None);
                };

                match ty {
                    ComponentType::String => Ok(HostValue::Str(string_to_text(env, elem.as_obj())?)),
                    ComponentType::Array => Ok(HostValue::Array(JArray::wrap(env, elem.as_obj())?)),
                    _ => wrap_object(env, elem.as_obj()),
                }
            }
        }
    }

    /// Replaces the element at `index` with `value`.
    ///
    /// Integral elements require an integer, floating point elements a float, and `char`
    /// elements a single character or an integral code point. Strings require text or `None`,
    /// nested arrays a [`JArray`] or `None`. Values stored in an object array must be instances
    /// of its component class. The foreign runtime performs its own store check as well.
    pub fn set(&self, index: i64, value: &HostValue) -> JarrayResult<()> {
        let idx = self.check_index(index)?;
        let inner = self.inner();
        let env = self.env();
        let array = self.as_obj();

        let ty = inner.component()?;
        let elem = match ty {
            ComponentType::Primitive(kind) => {
                let pinned = inner.pinned.borrow();
                let buffer = pinned.as_ref().ok_or(RuntimeError::MissingPinnedBuffer)?;
                return dispatch_primitive!(kind, T => buffer.write(idx, T::from_host(value)?));
            }
            ComponentType::String => match value {
                HostValue::None => None,
                HostValue::Str(s) => Some(text_to_string(env, s)?),
                _ => {
                    return Err(TypeError::Expected {
                        expected: "str",
                        found: value.type_name(),
                    })?
                }
            },
            ComponentType::Array => match value {
                HostValue::None => None,
                HostValue::Array(a) => catch_local(env, |e| e.new_local_ref(a.as_obj()))?,
                _ => {
                    return Err(TypeError::Expected {
                        expected: "jarray",
                        found: value.type_name(),
                    })?
                }
            },
            ComponentType::Object => host_to_object(env, value, inner.component_class()?)?,
        };

        trace!(index, component = %ty, "storing element");
        catch_exceptions(env, |e| {
            e.set_object_array_element(array, idx as i32, as_nullable(&elem))
        })
    }

    /// Returns the index of the first element equal to `value`.
    ///
    /// Primitives and strings compare by value, objects and nested arrays by identity. `None`
    /// matches the first null element of a reference array.
    pub fn index(&self, value: &HostValue) -> JarrayResult<usize> {
        match self.find(value)? {
            Some(idx) => Ok(idx),
            None => Err(ValueError::NotInArray)?,
        }
    }

    /// Returns `true` if an element is equal to `value`, see [`JArray::index`].
    pub fn contains(&self, value: &HostValue) -> JarrayResult<bool> {
        Ok(self.find(value)?.is_some())
    }

    fn find(&self, value: &HostValue) -> JarrayResult<Option<usize>> {
        let inner = self.inner();
        let ty = inner.component()?;

        if let ComponentType::Primitive(kind) = ty {
            let pinned = inner.pinned.borrow();
            let buffer = pinned.as_ref().ok_or(RuntimeError::MissingPinnedBuffer)?;
            return dispatch_primitive!(kind, T => buffer.position(T::from_host(value)?));
        }

        let target = match (ty, value) {
            (_, HostValue::None) => Target::Null,
            (ComponentType::String, HostValue::Str(s)) => Target::Text(s),
            (ComponentType::Object, HostValue::Object(o)) => Target::Identity(o.as_obj()),
            (ComponentType::Object | ComponentType::Array, HostValue::Array(a)) => {
                Target::Identity(a.as_obj())
            }
            _ => {
                let expected = match ty {
                    ComponentType::String => "str",
                    ComponentType::Array => "jarray",
                    _ => "jobject",
                };
                return Err(TypeError::Expected {
                    expected,
                    found: value.type_name(),
                })?;
            }
        };

        let env = self.env();
        let array = self.as_obj();
        for idx in 0..self.len() {
            let elem = catch_local(env, |e| e.get_object_array_element(array, idx as i32))?;

            let found = match (&target, elem) {
                (Target::Null, None) => true,
                (Target::Text(s), Some(elem)) => string_to_text(env, elem.as_obj())? == **s,
                (Target::Identity(obj), Some(elem)) => {
                    catch_exceptions(env, |e| e.is_same_object(Some(*obj), Some(elem.as_obj())))?
                }
                _ => false,
            };

            if found {
                return Ok(Some(idx));
            }
        }

        Ok(None)
    }

    // Converts `index` to a position in the array, fails if it's out of bounds.
    fn check_index(&self, index: i64) -> JarrayResult<usize> {
        let length = match self.inner().length() {
            Some(length) => length,
            None => Err(IndexError::Unresolved)?,
        };

        if index < 0 || index >= length as i64 {
            return Err(IndexError::OutOfRange {
                index,
                length: length as i64,
            })?;
        }

        Ok(index as usize)
    }
}

enum Target<'a> {
    Null,
    Text(&'a String),
    Identity(ObjectRef),
}
