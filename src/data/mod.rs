//! Wrapped arrays and the data they contain.
//!
//! [`array`] contains the array handle and everything that can be done with it. The element
//! type of an array is described by [`component`], [`layout`] maps primitive element types to
//! Rust types, and [`host`] and [`object`] deal with the values that are read from and written
//! to arrays.

pub mod array;
pub mod component;
pub mod host;
pub mod layout;
pub mod object;
