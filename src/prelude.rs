//! Reexports structs and traits you're likely to need.

#[cfg(feature = "sim")]
pub use crate::env::sim::{PinPolicy, SimEnv, SimEnvBuilder, SimStats};
pub use crate::{
    data::{
        array::{
            iter::JArrayIter,
            slice::{SliceDescriptor, Subscript},
            JArray, TypeDescriptor,
        },
        component::{ComponentType, PrimitiveKind},
        host::HostValue,
        layout::{bool::JBoolean, char::JChar, Primitive},
        object::ForeignObject,
    },
    env::{EnvRef, ForeignEnv, ObjectRef, ReleaseMode},
    error::{JarrayError, JarrayResult},
};
