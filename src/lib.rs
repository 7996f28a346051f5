//! jarray lets a dynamic host runtime use arrays that are owned by a managed foreign runtime,
//! which can only be reached through an embedding call interface shaped after JNI.
//!
//! # Overview
//!
//! An incomplete list of features that are currently supported by jarray:
//!
//!  - Wrap an existing foreign array, or create a new one with a size, an element type and an
//!    optional initial value.
//!  - Arrays of all eight primitive types, strings, arbitrary objects and nested arrays.
//!  - Read and write elements, find elements with `index` and `contains`.
//!  - Take contiguous slices, which are copied to a new foreign array.
//!  - Iterate over the elements of an array.
//!  - Primitive arrays are pinned while they're wrapped, pinned memory is released exactly once
//!    when the handle is dropped.
//!  - Foreign exceptions are caught immediately after every call and converted to an error.
//!  - An in-process reference runtime that can be used to test code that uses jarray without a
//!    foreign VM.
//!
//! # Features
//!
//! - `sim`
//!
//!   Enables the reference runtime in [`env::sim`]. This feature is enabled by default.
//!
//! # Using this crate
//!
//! Everything starts with an [`EnvRef`], a shared handle to an implementation of [`ForeignEnv`].
//! An embedder implements this trait on top of the foreign runtime's function table, the `sim`
//! feature provides one that runs in-process:
//!
//! ```
//! use jarray::prelude::*;
//!
//! # fn main() -> JarrayResult<()> {
//! let env: EnvRef = SimEnv::new();
//!
//! let array = JArray::new(&env, 5, TypeDescriptor::Primitive(PrimitiveKind::Int), None)?;
//! for i in 0..5 {
//!     array.set(i, &HostValue::Int(i))?;
//! }
//!
//! let slice = array.slice(1, 4)?;
//! assert_eq!(slice.len(), 3);
//! assert_eq!(slice.index(&HostValue::Int(3))?, 2);
//! assert_eq!(array.index(&HostValue::Int(3))?, 3);
//! assert!(!array.contains(&HostValue::Int(99))?);
//!
//! let elements = array.iter().collect::<JarrayResult<Vec<_>>>()?;
//! assert_eq!(elements.len(), 5);
//! # Ok(())
//! # }
//! ```
//!
//! Primitive arrays may be pinned by copy, in which case changes only become visible to the
//! foreign runtime after [`JArray::commit`] has been called. Dropping a handle discards
//! uncommitted changes.
//!
//! [`EnvRef`]: crate::env::EnvRef
//! [`ForeignEnv`]: crate::env::ForeignEnv
//! [`JArray::commit`]: crate::data::array::JArray::commit

#![forbid(rustdoc::broken_intra_doc_links)]

pub mod catch;
pub mod data;
pub mod env;
pub mod error;
pub mod prelude;
pub mod protocol;
