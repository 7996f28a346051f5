//! The array type as it's registered with the host runtime.
//!
//! The host needs a type descriptor for wrapped arrays: the names of the array and iterator
//! types, their documentation, and a table of the methods that can be called by name. This
//! descriptor is computed once per process, the first time any entry point calls [`init`].
//! Calling it again returns the same descriptor.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::{
    data::{
        array::{slice::Subscript, JArray},
        host::HostValue,
    },
    error::{ArgumentError, JarrayResult, TypeError},
};

static ARRAY_TYPE: OnceCell<ArrayType> = OnceCell::new();

/// Signature of a method in the method table.
pub type MethodFn = fn(&JArray, &[HostValue]) -> JarrayResult<HostValue>;

/// A method that can be called by name.
#[derive(Clone, Copy)]
pub struct MethodDef {
    pub name: &'static str,
    pub doc: &'static str,
    pub call: MethodFn,
}

impl Debug for MethodDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MethodDef").field("name", &self.name).finish()
    }
}

/// The type descriptor of wrapped arrays.
#[derive(Debug)]
pub struct ArrayType {
    /// Name of the array type.
    pub name: &'static str,
    /// Name of the iterator type.
    pub iter_name: &'static str,
    pub doc: &'static str,
    pub iter_doc: &'static str,
    pub methods: &'static [MethodDef],
}

impl ArrayType {
    /// Returns the method named `name`.
    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.name == name)
    }
}

static METHODS: [MethodDef; 3] = [
    MethodDef {
        name: "__getitem__",
        doc: "Returns the element at the given index, or a copy of the given slice.",
        call: getitem,
    },
    MethodDef {
        name: "index",
        doc: "Returns the index of the first element equal to the argument.",
        call: index,
    },
    MethodDef {
        name: "commit",
        doc: "Writes pending changes back to the foreign array.",
        call: commit,
    },
];

/// Returns the type descriptor, computing it if it doesn't exist yet.
pub fn init() -> &'static ArrayType {
    ARRAY_TYPE.get_or_init(|| {
        debug!("registering array type");
        ArrayType {
            name: "jarray.JArray",
            iter_name: "jarray.JArrayIter",
            doc: "A wrapped foreign array.",
            iter_doc: "Iterates over the elements of a wrapped foreign array.",
            methods: &METHODS,
        }
    })
}

/// Calls the method named `name` on `array`.
pub fn invoke(array: &JArray, name: &str, args: &[HostValue]) -> JarrayResult<HostValue> {
    match init().method(name) {
        Some(method) => (method.call)(array, args),
        None => Err(TypeError::NoSuchMethod { name: name.into() })?,
    }
}

fn single_arg(args: &[HostValue]) -> JarrayResult<&HostValue> {
    match args {
        [arg] => Ok(arg),
        _ => Err(ArgumentError::ArgCount { n: args.len() })?,
    }
}

fn getitem(array: &JArray, args: &[HostValue]) -> JarrayResult<HostValue> {
    let subscript = Subscript::from_host(single_arg(args)?)?;
    array.subscript(subscript)
}

fn index(array: &JArray, args: &[HostValue]) -> JarrayResult<HostValue> {
    let idx = array.index(single_arg(args)?)?;
    Ok(HostValue::Int(idx as i64))
}

fn commit(array: &JArray, args: &[HostValue]) -> JarrayResult<HostValue> {
    if !args.is_empty() {
        return Err(ArgumentError::ArgCount { n: args.len() })?;
    }

    array.commit()?;
    Ok(HostValue::None)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let a = init();
        let b = init();
        assert!(std::ptr::eq(a, b));
        assert_eq!(a.name, "jarray.JArray");
        assert_eq!(a.iter_name, "jarray.JArrayIter");
    }

    #[test]
    fn method_table() {
        let ty = init();
        for name in ["__getitem__", "index", "commit"] {
            assert!(ty.method(name).is_some(), "{name}");
        }
        assert!(ty.method("append").is_none());
    }
}
