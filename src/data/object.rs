//! Foreign objects and value conversion.
//!
//! Arrays of strings and objects hand out and accept values that aren't arrays: text, and
//! arbitrary foreign objects. [`ForeignObject`] is a minimal proxy for the latter, it keeps the
//! object alive and compares by identity. The functions in this module convert between host
//! values and foreign references.

use std::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    rc::Rc,
};

use crate::{
    catch::{catch_exceptions, catch_local, catch_local_nonnull},
    data::{array::JArray, component::STRING_CLASS, host::HostValue},
    env::{
        refs::{GlobalRef, LocalRef},
        EnvRef, ObjectRef,
    },
    error::{JarrayResult, TypeError},
};

/// A proxy for a foreign object.
///
/// Clones share the same durable reference. Two proxies are equal if they refer to the same
/// foreign object.
#[derive(Clone)]
pub struct ForeignObject {
    inner: Rc<ObjectInner>,
}

struct ObjectInner {
    object: GlobalRef,
    class: GlobalRef,
}

impl ForeignObject {
    /// Creates a proxy for `obj`. The reference is not consumed.
    pub fn new(env: &EnvRef, obj: ObjectRef) -> JarrayResult<Self> {
        let class = catch_local_nonnull(env, "GetObjectClass", |e| e.get_object_class(obj))?;
        let class = GlobalRef::new(env, class.as_obj())?;
        let object = GlobalRef::new(env, obj)?;

        Ok(ForeignObject {
            inner: Rc::new(ObjectInner { object, class }),
        })
    }

    /// Returns a reference to the wrapped object.
    #[inline]
    pub fn as_obj(&self) -> ObjectRef {
        self.inner.object.as_obj()
    }

    /// Returns a reference to the class of the wrapped object.
    #[inline]
    pub fn class(&self) -> ObjectRef {
        self.inner.class.as_obj()
    }

    /// Returns the environment the object belongs to.
    #[inline]
    pub fn env(&self) -> &EnvRef {
        self.inner.object.env()
    }

    /// Returns the name of the object's class.
    pub fn class_name(&self) -> JarrayResult<String> {
        class_name(self.env(), self.class())
    }

    /// Calls `toString` on the wrapped object.
    pub fn to_text(&self) -> JarrayResult<String> {
        object_to_text(self.env(), self.as_obj())
    }
}

impl PartialEq for ForeignObject {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
            || self
                .env()
                .is_same_object(Some(self.as_obj()), Some(other.as_obj()))
    }
}

impl Debug for ForeignObject {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ForeignObject")
            .field("object", &self.as_obj())
            .finish()
    }
}

impl Display for ForeignObject {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.to_text() {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str("<cannot display object>"),
        }
    }
}

/// Returns the name of `class`.
pub(crate) fn class_name(env: &EnvRef, class: ObjectRef) -> JarrayResult<String> {
    Ok(catch_exceptions(env, |e| e.get_class_name(class))?.unwrap_or_default())
}

/// Calls `toString` on `obj`.
pub(crate) fn object_to_text(env: &EnvRef, obj: ObjectRef) -> JarrayResult<String> {
    Ok(catch_exceptions(env, |e| e.to_string(obj))?.unwrap_or_else(|| "null".into()))
}

/// Converts a foreign string to text.
pub fn string_to_text(env: &EnvRef, string: ObjectRef) -> JarrayResult<String> {
    Ok(catch_exceptions(env, |e| e.get_string(string))?.unwrap_or_default())
}

/// Converts text to a new foreign string.
pub fn text_to_string<'env>(env: &'env EnvRef, text: &str) -> JarrayResult<LocalRef<'env>> {
    catch_local_nonnull(env, "NewString", |e| e.new_string(text))
}

/// Wraps a non-null foreign reference in the matching host value: strings become text, arrays
/// a new [`JArray`], everything else a [`ForeignObject`].
pub fn wrap_object(env: &EnvRef, obj: ObjectRef) -> JarrayResult<HostValue> {
    let class = catch_local_nonnull(env, "GetObjectClass", |e| e.get_object_class(obj))?;

    if class_name(env, class.as_obj())? == STRING_CLASS {
        return Ok(HostValue::Str(string_to_text(env, obj)?));
    }

    if catch_local(env, |e| e.get_component_type(class.as_obj()))?.is_some() {
        return Ok(HostValue::Array(JArray::wrap(env, obj)?));
    }

    Ok(HostValue::Object(ForeignObject::new(env, obj)?))
}

/// Converts a host value to a reference that can be stored in an array whose component class
/// is `class`.
///
/// `None` becomes a foreign null. Text becomes a new string if `class` is assignable from the
/// string class, proxies and arrays are passed as a new local reference to the object they wrap
/// if that object is an instance of `class`. Other host values can't be converted.
pub fn host_to_object<'env>(
    env: &'env EnvRef,
    value: &HostValue,
    class: ObjectRef,
) -> JarrayResult<Option<LocalRef<'env>>> {
    let obj = match value {
        HostValue::None => return Ok(None),
        HostValue::Str(s) => {
            let string_class = catch_local_nonnull(env, "FindClass", |e| e.find_class(STRING_CLASS))?;
            let string_class = string_class.as_obj();
            if catch_exceptions(env, |e| e.is_assignable_from(string_class, class))? {
                return Ok(Some(text_to_string(env, s)?));
            }
            None
        }
        HostValue::Object(o) => Some(o.as_obj()),
        HostValue::Array(a) => Some(a.as_obj()),
        _ => None,
    };

    if let Some(obj) = obj {
        if catch_exceptions(env, |e| e.is_instance_of(Some(obj), class))? {
            return catch_local(env, |e| e.new_local_ref(obj));
        }
    }

    Err(TypeError::IncompatibleElement {
        element_type: class_name(env, class)?,
        value_type: value.type_name().into(),
    })?
}
