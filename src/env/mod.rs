//! The embedding call interface.
//!
//! The foreign runtime owns all array memory and its object model, this crate only ever talks
//! to it through [`ForeignEnv`]. The trait is shaped after a JNI-style function table: every
//! method is a synchronous round trip, any of them may leave an exception pending, and every
//! reference returned by a method that produces one is a new local reference that the caller
//! must release.
//!
//! Callers in this crate never invoke these methods directly, they go through the helpers in
//! [`catch`] which check for a pending exception before a result is inspected, and wrap
//! returned references in [`LocalRef`] so they are released before the call that produced them
//! returns.
//!
//! [`catch`]: crate::catch
//! [`LocalRef`]: refs::LocalRef

pub mod refs;
#[cfg(feature = "sim")]
pub mod sim;

use std::{
    ffi::c_void,
    fmt::{Debug, Formatter, Result as FmtResult},
    ptr::NonNull,
    rc::Rc,
};

use crate::data::component::PrimitiveKind;

/// Shared handle to the embedding call interface.
pub type EnvRef = Rc<dyn ForeignEnv>;

/// An opaque, non-null reference to a foreign object. A foreign `null` is represented as `None`.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef(NonNull<c_void>);

impl ObjectRef {
    /// Wrap a raw reference, returns `None` if it's null.
    #[inline]
    pub fn from_raw(raw: *mut c_void) -> Option<Self> {
        NonNull::new(raw).map(ObjectRef)
    }

    /// Returns the raw reference.
    #[inline]
    pub fn as_raw(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

impl Debug for ObjectRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "ObjectRef({:p})", self.0)
    }
}

/// How a pinned primitive buffer is handed back to the foreign runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseMode {
    /// Write the buffer back to the array, the buffer remains valid.
    Commit,
    /// Free the buffer without writing it back.
    Abort,
}

/// The memory view returned when a primitive array is pinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawElements {
    /// Pointer to the first element.
    pub ptr: NonNull<c_void>,
    /// `true` if `ptr` points to a private copy rather than the array's backing memory.
    pub is_copy: bool,
}

/// The function table of the foreign runtime.
///
/// All methods that return an `ObjectRef` return a new local reference. Methods may leave an
/// exception pending, in which case the returned value must not be used.
pub trait ForeignEnv {
    /// Returns `true` if an exception is pending.
    fn exception_check(&self) -> bool;

    /// Returns the pending exception without clearing it.
    fn exception_occurred(&self) -> Option<ObjectRef>;

    /// Clears the pending exception.
    fn exception_clear(&self);

    /// Creates a new global reference to `obj`.
    fn new_global_ref(&self, obj: ObjectRef) -> Option<ObjectRef>;

    /// Deletes a global reference.
    fn delete_global_ref(&self, obj: ObjectRef);

    /// Creates a new local reference to `obj`.
    fn new_local_ref(&self, obj: ObjectRef) -> Option<ObjectRef>;

    /// Deletes a local reference.
    fn delete_local_ref(&self, obj: ObjectRef);

    /// Returns `true` if both references refer to the same object, two nulls are the same.
    fn is_same_object(&self, a: Option<ObjectRef>, b: Option<ObjectRef>) -> bool;

    /// Returns the class of `obj`.
    fn get_object_class(&self, obj: ObjectRef) -> Option<ObjectRef>;

    /// Returns the component class of an array class, or `None` if `class` is not an array
    /// class.
    fn get_component_type(&self, class: ObjectRef) -> Option<ObjectRef>;

    /// Returns the fully qualified name of `class`.
    fn get_class_name(&self, class: ObjectRef) -> Option<String>;

    /// Finds a class by its fully qualified name.
    fn find_class(&self, name: &str) -> Option<ObjectRef>;

    /// Returns `true` if `obj` is an instance of `class`. A null object is an instance of every
    /// class.
    fn is_instance_of(&self, obj: Option<ObjectRef>, class: ObjectRef) -> bool;

    /// Returns `true` if instances of `sub` can be assigned to `sup`.
    fn is_assignable_from(&self, sub: ObjectRef, sup: ObjectRef) -> bool;

    /// Creates a new string.
    fn new_string(&self, text: &str) -> Option<ObjectRef>;

    /// Returns the content of a string.
    fn get_string(&self, string: ObjectRef) -> Option<String>;

    /// Calls `toString` on `obj`.
    fn to_string(&self, obj: ObjectRef) -> Option<String>;

    /// Returns the length of an array.
    fn get_array_length(&self, array: ObjectRef) -> i32;

    /// Creates a new zeroed primitive array.
    fn new_primitive_array(&self, kind: PrimitiveKind, len: i32) -> Option<ObjectRef>;

    /// Creates a new object array whose elements are initialized to `init`.
    fn new_object_array(
        &self,
        len: i32,
        class: ObjectRef,
        init: Option<ObjectRef>,
    ) -> Option<ObjectRef>;

    /// Returns the element of an object array at `index`.
    fn get_object_array_element(&self, array: ObjectRef, index: i32) -> Option<ObjectRef>;

    /// Stores `value` in an object array at `index`. The runtime checks that `value` is
    /// compatible with the component class.
    fn set_object_array_element(&self, array: ObjectRef, index: i32, value: Option<ObjectRef>);

    /// Pins the elements of a primitive array. The result is either a view of the array's
    /// backing memory or a private copy.
    fn get_primitive_array_elements(
        &self,
        kind: PrimitiveKind,
        array: ObjectRef,
    ) -> Option<RawElements>;

    /// Releases pinned elements.
    ///
    /// Safety: `elems` must have been returned by `get_primitive_array_elements` for the same
    /// array and kind, and must not have been freed yet.
    unsafe fn release_primitive_array_elements(
        &self,
        kind: PrimitiveKind,
        array: ObjectRef,
        elems: NonNull<c_void>,
        mode: ReleaseMode,
    );
}
