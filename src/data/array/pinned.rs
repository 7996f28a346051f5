//! Pinned primitive buffers.
//!
//! Pinning hands out either a view of the array's backing memory or a private copy. The handle
//! owns at most one buffer at a time. Releasing it with [`ReleaseMode::Abort`] frees it,
//! releasing it with [`ReleaseMode::Commit`] writes a copy back and keeps the buffer valid.
//!
//! A direct view is never released with `Abort`: the foreign runtime has nothing to free and
//! nothing to discard, the call is skipped entirely.

use std::{ffi::c_void, ptr::NonNull};

use tracing::{debug, trace, warn};

use super::ArrayInner;
use crate::{
    catch::check_exception,
    data::{component::PrimitiveKind, host::HostValue, layout::char::JChar, layout::Primitive},
    dispatch_primitive,
    env::ReleaseMode,
    error::{JarrayResult, RuntimeError},
};

/// A pinned primitive buffer.
#[derive(Debug)]
pub(crate) struct PinnedBuffer {
    kind: PrimitiveKind,
    ptr: NonNull<c_void>,
    len: usize,
    is_copy: bool,
}

impl PinnedBuffer {
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_copy(&self) -> bool {
        self.is_copy
    }

    #[inline]
    fn check<T: Primitive>(&self) -> JarrayResult<()> {
        if T::KIND != self.kind {
            return Err(RuntimeError::BufferKind {
                expected: self.kind.name(),
                found: T::KIND.name(),
            })?;
        }

        Ok(())
    }

    /// Reads the element at `index`.
    ///
    /// Panics if `index` is out of bounds.
    pub(crate) fn read<T: Primitive>(&self, index: usize) -> JarrayResult<T> {
        self.check::<T>()?;
        assert!(index < self.len, "index out of bounds");

        // Safety: the buffer holds `len` elements of type `T` and is valid while it's pinned.
        unsafe { Ok(self.ptr.cast::<T>().as_ptr().add(index).read()) }
    }

    /// Writes the element at `index`.
    ///
    /// Panics if `index` is out of bounds.
    pub(crate) fn write<T: Primitive>(&self, index: usize, value: T) -> JarrayResult<()> {
        self.check::<T>()?;
        assert!(index < self.len, "index out of bounds");

        // Safety: the buffer holds `len` elements of type `T` and is valid while it's pinned.
        unsafe { self.ptr.cast::<T>().as_ptr().add(index).write(value) }
        Ok(())
    }

    /// Returns the index of the first element equal to `value`.
    pub(crate) fn position<T: Primitive>(&self, value: T) -> JarrayResult<Option<usize>> {
        Ok(self.as_slice::<T>()?.iter().position(|elem| *elem == value))
    }

    /// Sets every element to `value`.
    pub(crate) fn fill<T: Primitive>(&self, value: T) -> JarrayResult<()> {
        self.check::<T>()?;
        for i in 0..self.len {
            // Safety: the buffer holds `len` elements of type `T`.
            unsafe { self.ptr.cast::<T>().as_ptr().add(i).write(value) }
        }
        Ok(())
    }

    /// Copies `len` elements starting at `offset` of `src` to the start of this buffer.
    ///
    /// Panics if either range is out of bounds.
    pub(crate) fn copy_from(&self, src: &PinnedBuffer, offset: usize, len: usize) -> JarrayResult<()> {
        if src.kind != self.kind {
            return Err(RuntimeError::BufferKind {
                expected: self.kind.name(),
                found: src.kind.name(),
            })?;
        }
        assert!(offset + len <= src.len, "source range out of bounds");
        assert!(len <= self.len, "destination range out of bounds");

        let size = self.kind.size();
        // Safety: both ranges are in bounds and the buffers belong to different arrays.
        unsafe {
            std::ptr::copy_nonoverlapping(
                src.ptr.cast::<u8>().as_ptr().add(offset * size),
                self.ptr.cast::<u8>().as_ptr(),
                len * size,
            )
        }
        Ok(())
    }

    fn as_slice<T: Primitive>(&self) -> JarrayResult<&[T]> {
        self.check::<T>()?;
        // Safety: the buffer holds `len` elements of type `T` and outlives the borrow.
        unsafe { Ok(std::slice::from_raw_parts(self.ptr.cast::<T>().as_ptr(), self.len)) }
    }
}

impl ArrayInner {
    /// Pins the elements of a primitive array. Does nothing if the array holds references or a
    /// buffer is already pinned.
    pub(crate) fn pin(&self) -> JarrayResult<()> {
        let Some(kind) = self.component()?.primitive() else {
            return Ok(());
        };

        let mut pinned = self.pinned.borrow_mut();
        if pinned.is_some() {
            return Ok(());
        }

        let env = self.env();
        let array = self.as_obj();
        let elems = env.get_primitive_array_elements(kind, array);

        if env.exception_check() {
            // A buffer handed out alongside an exception is freed before the error surfaces.
            if let Some(elems) = elems {
                warn!(kind = kind.name(), "buffer returned with pending exception");
                unsafe {
                    env.release_primitive_array_elements(kind, array, elems.ptr, ReleaseMode::Abort)
                }
            }
            check_exception(env)?;
        }

        match elems {
            Some(elems) => {
                debug!(kind = kind.name(), is_copy = elems.is_copy, "pinned array");
                *pinned = Some(PinnedBuffer {
                    kind,
                    ptr: elems.ptr,
                    len: self.length().unwrap_or(0),
                    is_copy: elems.is_copy,
                });
                Ok(())
            }
            None => Err(RuntimeError::NullResult {
                operation: "GetPrimitiveArrayElements",
            })?,
        }
    }

    /// Releases the pinned buffer.
    ///
    /// `Commit` writes the buffer back and keeps it pinned. `Abort` frees it, the array must be
    /// pinned again before its elements can be accessed. Does nothing if no buffer is pinned.
    pub(crate) fn release(&self, mode: ReleaseMode) -> JarrayResult<()> {
        let mut pinned = self.pinned.borrow_mut();
        let Some(buffer) = pinned.as_ref() else {
            return Ok(());
        };

        let (kind, ptr, is_copy) = (buffer.kind, buffer.ptr, buffer.is_copy);
        if mode == ReleaseMode::Abort {
            *pinned = None;
            if !is_copy {
                trace!(kind = kind.name(), "dropped direct view");
                return Ok(());
            }
        }

        let env = self.env();
        // Safety: `ptr` was returned by `get_primitive_array_elements` for this array and
        // hasn't been freed.
        unsafe { env.release_primitive_array_elements(kind, self.as_obj(), ptr, mode) }
        debug!(kind = kind.name(), ?mode, is_copy, "released array");

        check_exception(env)
    }

    /// Fills a freshly created primitive array with `value`. A value of the wrong host type
    /// leaves the array untouched, text fills the leading elements of a `char` array.
    pub(crate) fn fill(&self, value: &HostValue) -> JarrayResult<()> {
        let Some(kind) = self.component()?.primitive() else {
            return Ok(());
        };

        let pinned = self.pinned.borrow();
        let buffer = pinned.as_ref().ok_or(RuntimeError::MissingPinnedBuffer)?;

        match (kind, value) {
            (PrimitiveKind::Char, HostValue::Str(text)) => {
                for (i, unit) in text.encode_utf16().take(buffer.len()).enumerate() {
                    buffer.write(i, JChar::new(unit))?;
                }
                Ok(())
            }
            _ => dispatch_primitive!(kind, T => {
                match T::try_from_host(value) {
                    Some(value) => buffer.fill(value),
                    None => {
                        trace!(kind = kind.name(), value = value.type_name(), "ignored initial value");
                        Ok(())
                    }
                }
            }),
        }
    }
}
