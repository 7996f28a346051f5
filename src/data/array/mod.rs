//! Wrapped foreign arrays.
//!
//! A [`JArray`] is the host-side handle of a single foreign array. It owns a durable reference
//! to the array and, if the elements are references, to the component class. The component type
//! and length of the array are resolved once, when the handle is created, and never change.
//!
//! Arrays with a primitive component type are pinned when the handle is created: the foreign
//! runtime hands out a view of the array's memory, or a private copy of it, which is held until
//! the handle is dropped. Reads and writes go directly through this buffer. Changes made to a
//! copy only become visible to the foreign runtime after [`JArray::commit`] has been called.
//! When the handle is dropped the buffer is released without writing it back.
//!
//! Arrays of strings, objects and nested arrays are never pinned, every element access is a
//! round trip to the foreign runtime.
//!
//! Two handles can wrap the same foreign array. Each pins the array independently, if either of
//! them has been handed a copy it's undefined whether writes through one handle are visible
//! through the other.
//!
//! Handles are cheap to clone, clones share the same buffer. The host runtime is
//! single-threaded, handles are neither `Send` nor `Sync`.

pub mod accessor;
pub mod iter;
pub mod pinned;
pub mod slice;

use std::{
    cell::RefCell,
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    rc::Rc,
};

use once_cell::unsync::OnceCell;
use tracing::{debug, warn};

use self::pinned::PinnedBuffer;
use crate::{
    catch::{catch_exceptions, catch_local_nonnull},
    data::{
        component::{self, classify, ComponentType, PrimitiveKind, STRING_CLASS},
        host::HostValue,
        object::{host_to_object, object_to_text, ForeignObject},
    },
    env::{
        refs::{as_nullable, GlobalRef, LocalRef},
        EnvRef, ObjectRef, ReleaseMode,
    },
    error::{ArgumentError, JarrayResult, RuntimeError, TypeError},
    protocol,
};

/// Describes the element type of a new array.
#[derive(Debug, Clone, Copy)]
pub enum TypeDescriptor<'a> {
    /// An array of primitives.
    Primitive(PrimitiveKind),
    /// An array of strings.
    String,
    /// An array whose component class is the class of an existing object.
    ObjectOf(&'a ForeignObject),
    /// An array of arrays, whose component class is the class of an existing array.
    ArrayOf(&'a JArray),
    /// An array whose component class is `class`.
    Class(ObjectRef),
}

impl From<PrimitiveKind> for TypeDescriptor<'_> {
    fn from(kind: PrimitiveKind) -> Self {
        TypeDescriptor::Primitive(kind)
    }
}

/// A wrapped foreign array.
#[derive(Clone)]
pub struct JArray {
    inner: Rc<ArrayInner>,
}

pub(crate) struct ArrayInner {
    array: GlobalRef,
    component: OnceCell<ComponentType>,
    // Only set if the component type is a reference type.
    component_class: OnceCell<GlobalRef>,
    length: OnceCell<usize>,
    pinned: RefCell<Option<PinnedBuffer>>,
}

impl JArray {
    /// Wraps an existing foreign array. The reference is not consumed.
    ///
    /// The component type is resolved, and primitive arrays are pinned. If any step fails, every
    /// reference that has been acquired so far is released before the error is returned.
    pub fn wrap(env: &EnvRef, array: ObjectRef) -> JarrayResult<Self> {
        protocol::init();

        let inner = ArrayInner::new(env, array)?;
        inner.init(None)?;
        Ok(JArray {
            inner: Rc::new(inner),
        })
    }

    /// Wraps an existing foreign array given as a raw, possibly null, reference.
    pub fn wrap_raw(env: &EnvRef, array: *mut std::ffi::c_void) -> JarrayResult<Self> {
        match ObjectRef::from_raw(array) {
            Some(array) => Self::wrap(env, array),
            None => Err(RuntimeError::InvalidArray)?,
        }
    }

    /// Creates a new foreign array with `size` elements of the type described by `descriptor`.
    ///
    /// If `value` is provided the elements are initialized with it. A primitive array is filled
    /// with `value` if it has the matching host type, a `char` array can also be initialized
    /// from text: its leading elements take the characters of the text and the remaining
    /// elements keep their zero value. A value of any other host type leaves the array zeroed.
    /// Arrays of references are filled with the converted value, which must be compatible.
    pub fn new(
        env: &EnvRef,
        size: i64,
        descriptor: TypeDescriptor<'_>,
        value: Option<&HostValue>,
    ) -> JarrayResult<Self> {
        protocol::init();

        if size < 0 {
            return Err(ArgumentError::NegativeSize { size })?;
        }
        let len = i32::try_from(size).map_err(|_| ArgumentError::SizeTooLarge { size })?;

        let (ty, class) = describe(env, descriptor)?;
        let array = new_foreign_array(env, ty, as_nullable(&class), len, value)?;

        let inner = ArrayInner::new(env, array.as_obj())?;
        inner.preset(ty, as_nullable(&class))?;
        inner.init(value)?;

        debug!(component = %ty, len, "created array");
        Ok(JArray {
            inner: Rc::new(inner),
        })
    }

    /// Creates a new array from the arguments of a host constructor call.
    ///
    /// The accepted shapes are `(size, type_id[, value])`, `(size, object)` and
    /// `(size, jarray)`. The type id must be one of the primitive ids or the string id of
    /// [`ComponentType`].
    pub fn new_from_args(env: &EnvRef, args: &[HostValue]) -> JarrayResult<Self> {
        protocol::init();

        if !(2..=3).contains(&args.len()) {
            return Err(ArgumentError::ArgCount { n: args.len() })?;
        }

        let size = match args[0] {
            HostValue::Int(size) => size,
            _ => Err(ArgumentError::UnknownArgs)?,
        };

        match &args[1] {
            HostValue::Int(type_id) => {
                if size < 0 {
                    return Err(ArgumentError::NegativeSize { size })?;
                }

                let descriptor = match ComponentType::from_type_id(*type_id)? {
                    ComponentType::Primitive(kind) => TypeDescriptor::Primitive(kind),
                    _ => TypeDescriptor::String,
                };
                Self::new(env, size, descriptor, args.get(2))
            }
            HostValue::Object(o) if args.len() == 2 => {
                Self::new(env, size, TypeDescriptor::ObjectOf(o), None)
            }
            HostValue::Array(a) if args.len() == 2 => {
                Self::new(env, size, TypeDescriptor::ArrayOf(a), None)
            }
            _ => Err(ArgumentError::UnknownArgType)?,
        }
    }

    /// Returns the number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.length().unwrap_or(0)
    }

    /// Returns `true` if the array has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the resolved component type.
    #[inline]
    pub fn component_type(&self) -> Option<ComponentType> {
        self.inner.component.get().copied()
    }

    /// Returns the component class if the elements are references.
    #[inline]
    pub fn component_class(&self) -> Option<ObjectRef> {
        self.inner.component_class.get().map(GlobalRef::as_obj)
    }

    /// Returns a reference to the wrapped array.
    #[inline]
    pub fn as_obj(&self) -> ObjectRef {
        self.inner.array.as_obj()
    }

    /// Returns the environment the array belongs to.
    #[inline]
    pub fn env(&self) -> &EnvRef {
        self.inner.env()
    }

    /// Returns `true` if a buffer is pinned.
    pub fn is_pinned(&self) -> bool {
        self.inner.pinned.borrow().is_some()
    }

    /// Returns whether the pinned buffer is a private copy, or `None` if nothing is pinned.
    pub fn is_copy(&self) -> Option<bool> {
        self.inner.pinned.borrow().as_ref().map(PinnedBuffer::is_copy)
    }

    /// Writes the pinned buffer back to the foreign array. The buffer remains pinned.
    ///
    /// Does nothing for arrays of references.
    pub fn commit(&self) -> JarrayResult<()> {
        debug!("commit");
        self.inner.release(ReleaseMode::Commit)?;
        self.inner.pin()
    }

    #[inline]
    pub(crate) fn inner(&self) -> &ArrayInner {
        &self.inner
    }

    #[cfg(test)]
    pub(crate) fn strong_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }
}

impl ArrayInner {
    fn new(env: &EnvRef, array: ObjectRef) -> JarrayResult<Self> {
        Ok(ArrayInner {
            array: GlobalRef::new(env, array)?,
            component: OnceCell::new(),
            component_class: OnceCell::new(),
            length: OnceCell::new(),
            pinned: RefCell::new(None),
        })
    }

    #[inline]
    pub(crate) fn env(&self) -> &EnvRef {
        self.array.env()
    }

    #[inline]
    pub(crate) fn as_obj(&self) -> ObjectRef {
        self.array.as_obj()
    }

    #[inline]
    pub(crate) fn length(&self) -> Option<usize> {
        self.length.get().copied()
    }

    #[inline]
    pub(crate) fn component(&self) -> JarrayResult<ComponentType> {
        match self.component.get() {
            Some(ty) => Ok(*ty),
            None => Err(TypeError::Unresolved)?,
        }
    }

    #[inline]
    pub(crate) fn component_class(&self) -> JarrayResult<ObjectRef> {
        match self.component_class.get() {
            Some(class) => Ok(class.as_obj()),
            None => Err(RuntimeError::NullResult {
                operation: "GetComponentType",
            })?,
        }
    }

    // Sets the component type of an array whose type is already known.
    fn preset(&self, ty: ComponentType, class: Option<ObjectRef>) -> JarrayResult<()> {
        if let (true, Some(class)) = (ty.is_reference(), class) {
            let _ = self.component_class.set(GlobalRef::new(self.env(), class)?);
        }
        let _ = self.component.set(ty);
        Ok(())
    }

    fn init(&self, fill: Option<&HostValue>) -> JarrayResult<()> {
        let env = self.env();
        let array = self.as_obj();

        if self.component.get().is_none() {
            let (ty, class) = component::resolve(env, array)?;
            if ty.is_reference() {
                let _ = self
                    .component_class
                    .set(GlobalRef::new(env, class.as_obj())?);
            }
            let _ = self.component.set(ty);
        }

        if self.length.get().is_none() {
            let length = catch_exceptions(env, |e| e.get_array_length(array))?;
            let _ = self.length.set(length.max(0) as usize);
        }

        self.pin()?;

        if let Some(value) = fill {
            self.fill(value)?;
        }

        Ok(())
    }
}

impl Drop for ArrayInner {
    fn drop(&mut self) {
        // The class and array references are released after this, when the fields are dropped.
        if let Err(e) = self.release(ReleaseMode::Abort) {
            warn!(error = %e, "failed to release pinned buffer");
        }
    }
}

// Returns the component type and, for arrays of references, the component class.
fn describe<'env>(
    env: &'env EnvRef,
    descriptor: TypeDescriptor<'_>,
) -> JarrayResult<(ComponentType, Option<LocalRef<'env>>)> {
    let res = match descriptor {
        TypeDescriptor::Primitive(kind) => (ComponentType::Primitive(kind), None),
        TypeDescriptor::String => {
            let class = catch_local_nonnull(env, "FindClass", |e| e.find_class(STRING_CLASS))?;
            (ComponentType::String, Some(class))
        }
        TypeDescriptor::ObjectOf(o) => {
            let class = catch_local_nonnull(env, "NewLocalRef", |e| e.new_local_ref(o.class()))?;
            (ComponentType::Object, Some(class))
        }
        TypeDescriptor::ArrayOf(a) => {
            let class =
                catch_local_nonnull(env, "GetObjectClass", |e| e.get_object_class(a.as_obj()))?;
            (ComponentType::Array, Some(class))
        }
        TypeDescriptor::Class(class) => match classify(env, class)? {
            ty @ ComponentType::Primitive(_) => (ty, None),
            ty => {
                let class = catch_local_nonnull(env, "NewLocalRef", |e| e.new_local_ref(class))?;
                (ty, Some(class))
            }
        },
    };

    Ok(res)
}

// Allocates a new foreign array. Arrays of references are filled with `value` if provided.
pub(crate) fn new_foreign_array<'env>(
    env: &'env EnvRef,
    ty: ComponentType,
    class: Option<ObjectRef>,
    len: i32,
    value: Option<&HostValue>,
) -> JarrayResult<LocalRef<'env>> {
    match (ty, class) {
        (ComponentType::Primitive(kind), _) => {
            catch_local_nonnull(env, "NewPrimitiveArray", |e| e.new_primitive_array(kind, len))
        }
        (_, Some(class)) => {
            let init = match value {
                Some(value) => host_to_object(env, value, class)?,
                None => None,
            };

            catch_local_nonnull(env, "NewObjectArray", |e| {
                e.new_object_array(len, class, as_nullable(&init))
            })
        }
        (_, None) => Err(RuntimeError::NullResult {
            operation: "GetComponentType",
        })?,
    }
}

/// Arrays compare by identity.
impl PartialEq for JArray {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
            || self
                .env()
                .is_same_object(Some(self.as_obj()), Some(other.as_obj()))
    }
}

impl Debug for JArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("JArray")
            .field("array", &self.as_obj())
            .field("component", &self.component_type())
            .field("length", &self.inner.length())
            .field("is_copy", &self.is_copy())
            .finish()
    }
}

/// Renders the foreign `toString` of the array.
impl Display for JArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match object_to_text(self.env(), self.as_obj()) {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str("<cannot display array>"),
        }
    }
}
