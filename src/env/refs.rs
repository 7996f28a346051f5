//! Owned foreign references.
//!
//! A [`GlobalRef`] is durable: it's valid across calls until it's dropped. A [`LocalRef`] is
//! transient: it's released when it goes out of scope, which keeps the foreign runtime's local
//! reference table from growing while a handle is in use.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use super::{EnvRef, ObjectRef};
use crate::{
    catch::check_exception,
    error::{JarrayResult, RuntimeError},
};

/// A durable reference, deleted exactly once when dropped.
pub struct GlobalRef {
    env: EnvRef,
    obj: ObjectRef,
}

impl GlobalRef {
    /// Creates a new durable reference to `obj`.
    pub fn new(env: &EnvRef, obj: ObjectRef) -> JarrayResult<Self> {
        let global = env
            .new_global_ref(obj)
            .map(|global| unsafe { GlobalRef::from_owned(env.clone(), global) });
        check_exception(env)?;

        match global {
            Some(global) => Ok(global),
            None => Err(RuntimeError::NullResult {
                operation: "NewGlobalRef",
            })?,
        }
    }

    // Safety: `obj` must be a global reference owned by the caller.
    pub(crate) unsafe fn from_owned(env: EnvRef, obj: ObjectRef) -> Self {
        GlobalRef { env, obj }
    }

    /// Returns the wrapped reference.
    #[inline]
    pub fn as_obj(&self) -> ObjectRef {
        self.obj
    }

    /// Returns the environment this reference belongs to.
    #[inline]
    pub fn env(&self) -> &EnvRef {
        &self.env
    }
}

impl Drop for GlobalRef {
    fn drop(&mut self) {
        self.env.delete_global_ref(self.obj)
    }
}

impl Debug for GlobalRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_tuple("GlobalRef").field(&self.obj).finish()
    }
}

/// A transient reference, deleted when dropped.
pub struct LocalRef<'env> {
    env: &'env EnvRef,
    obj: ObjectRef,
}

impl<'env> LocalRef<'env> {
    // Safety: `obj` must be a local reference owned by the caller.
    pub(crate) unsafe fn from_owned(env: &'env EnvRef, obj: ObjectRef) -> Self {
        LocalRef { env, obj }
    }

    /// Returns the wrapped reference.
    #[inline]
    pub fn as_obj(&self) -> ObjectRef {
        self.obj
    }
}

impl Drop for LocalRef<'_> {
    fn drop(&mut self) {
        self.env.delete_local_ref(self.obj)
    }
}

impl Debug for LocalRef<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_tuple("LocalRef").field(&self.obj).finish()
    }
}

/// Returns the wrapped reference of an optional local reference, `None` is a foreign null.
#[inline]
pub(crate) fn as_nullable(local: &Option<LocalRef<'_>>) -> Option<ObjectRef> {
    local.as_ref().map(LocalRef::as_obj)
}
