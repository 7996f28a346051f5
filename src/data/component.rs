//! Component types.
//!
//! The element type of a foreign array is resolved once, when the array is wrapped, and mapped
//! to the closed set of representations in [`ComponentType`]. Eight of them are primitive and
//! stored contiguously, these arrays are pinned. The other three hold references and are only
//! accessed element-wise.

use std::fmt::{Display, Formatter, Result as FmtResult};

use tracing::debug;

use crate::{
    catch::{catch_exceptions, catch_local},
    env::{refs::LocalRef, EnvRef, ObjectRef},
    error::{ArgumentError, JarrayResult, TypeResolutionError},
};

pub(crate) static STRING_CLASS: &str = "java.lang.String";

/// The primitive element kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveKind {
    /// All primitive kinds.
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Char,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    /// The name of the primitive class.
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    /// The descriptor character used in array class names, e.g. `I` in `[I`.
    pub fn descriptor(self) -> char {
        match self {
            PrimitiveKind::Boolean => 'Z',
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Char => 'C',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Double => 'D',
        }
    }

    /// Size of a single element in bytes.
    pub fn size(self) -> usize {
        match self {
            PrimitiveKind::Boolean | PrimitiveKind::Byte => 1,
            PrimitiveKind::Char | PrimitiveKind::Short => 2,
            PrimitiveKind::Int | PrimitiveKind::Float => 4,
            PrimitiveKind::Long | PrimitiveKind::Double => 8,
        }
    }

    /// Returns `true` for `Float` and `Double`.
    pub fn is_floating(self) -> bool {
        matches!(self, PrimitiveKind::Float | PrimitiveKind::Double)
    }

    /// Maps the name of a primitive class to its kind.
    pub fn from_name(name: &str) -> Option<Self> {
        PrimitiveKind::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Maps a descriptor character to its kind.
    pub fn from_descriptor(c: char) -> Option<Self> {
        PrimitiveKind::ALL.into_iter().find(|k| k.descriptor() == c)
    }
}

/// The element kind of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// A primitive, contiguously stored element type.
    Primitive(PrimitiveKind),
    /// `java.lang.String`.
    String,
    /// Any other class.
    Object,
    /// A nested array.
    Array,
}

impl ComponentType {
    pub const BOOLEAN_ID: i64 = 0;
    pub const INT_ID: i64 = 1;
    pub const LONG_ID: i64 = 2;
    pub const OBJECT_ID: i64 = 3;
    pub const STRING_ID: i64 = 4;
    pub const VOID_ID: i64 = 5;
    pub const DOUBLE_ID: i64 = 6;
    pub const SHORT_ID: i64 = 7;
    pub const FLOAT_ID: i64 = 8;
    pub const ARRAY_ID: i64 = 9;
    pub const CHAR_ID: i64 = 10;
    pub const BYTE_ID: i64 = 11;

    /// Returns `true` if elements are stored contiguously and the array can be pinned.
    #[inline]
    pub fn is_primitive(self) -> bool {
        matches!(self, ComponentType::Primitive(_))
    }

    /// Returns `true` if elements are references, i.e. the array holds a component class.
    #[inline]
    pub fn is_reference(self) -> bool {
        !self.is_primitive()
    }

    /// Returns the primitive kind, if any.
    #[inline]
    pub fn primitive(self) -> Option<PrimitiveKind> {
        match self {
            ComponentType::Primitive(kind) => Some(kind),
            _ => None,
        }
    }

    /// The numeric type id used by the host to describe element types.
    pub fn type_id(self) -> i64 {
        match self {
            ComponentType::Primitive(PrimitiveKind::Boolean) => Self::BOOLEAN_ID,
            ComponentType::Primitive(PrimitiveKind::Byte) => Self::BYTE_ID,
            ComponentType::Primitive(PrimitiveKind::Char) => Self::CHAR_ID,
            ComponentType::Primitive(PrimitiveKind::Short) => Self::SHORT_ID,
            ComponentType::Primitive(PrimitiveKind::Int) => Self::INT_ID,
            ComponentType::Primitive(PrimitiveKind::Long) => Self::LONG_ID,
            ComponentType::Primitive(PrimitiveKind::Float) => Self::FLOAT_ID,
            ComponentType::Primitive(PrimitiveKind::Double) => Self::DOUBLE_ID,
            ComponentType::String => Self::STRING_ID,
            ComponentType::Object => Self::OBJECT_ID,
            ComponentType::Array => Self::ARRAY_ID,
        }
    }

    /// Maps a type id to a component type. Ids that need a component class (object and array)
    /// and `void` are rejected: an array can't be created from the id alone.
    pub fn from_type_id(type_id: i64) -> Result<Self, ArgumentError> {
        let ty = match type_id {
            Self::BOOLEAN_ID => ComponentType::Primitive(PrimitiveKind::Boolean),
            Self::BYTE_ID => ComponentType::Primitive(PrimitiveKind::Byte),
            Self::CHAR_ID => ComponentType::Primitive(PrimitiveKind::Char),
            Self::SHORT_ID => ComponentType::Primitive(PrimitiveKind::Short),
            Self::INT_ID => ComponentType::Primitive(PrimitiveKind::Int),
            Self::LONG_ID => ComponentType::Primitive(PrimitiveKind::Long),
            Self::FLOAT_ID => ComponentType::Primitive(PrimitiveKind::Float),
            Self::DOUBLE_ID => ComponentType::Primitive(PrimitiveKind::Double),
            Self::STRING_ID => ComponentType::String,
            _ => Err(ArgumentError::UnknownTypeId { type_id })?,
        };

        Ok(ty)
    }
}

impl Display for ComponentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ComponentType::Primitive(kind) => f.write_str(kind.name()),
            ComponentType::String => f.write_str("string"),
            ComponentType::Object => f.write_str("object"),
            ComponentType::Array => f.write_str("array"),
        }
    }
}

/// Maps a component class to a component type.
pub(crate) fn classify(env: &EnvRef, class: ObjectRef) -> JarrayResult<ComponentType> {
    let name = catch_exceptions(env, |e| e.get_class_name(class))?
        .ok_or(TypeResolutionError::UnnamedClass)?;

    if let Some(kind) = PrimitiveKind::from_name(&name) {
        return Ok(ComponentType::Primitive(kind));
    }

    if name == STRING_CLASS {
        return Ok(ComponentType::String);
    }

    if name == "void" {
        return Err(TypeResolutionError::UnknownComponent { class_name: name })?;
    }

    let nested = catch_local(env, |e| e.get_component_type(class))?;
    if nested.is_some() {
        Ok(ComponentType::Array)
    } else {
        Ok(ComponentType::Object)
    }
}

/// Resolves the component type of `array`.
///
/// Returns the component type and the component class as a transient reference, which is
/// dropped by the caller once it has been promoted to a durable one.
pub(crate) fn resolve<'env>(
    env: &'env EnvRef,
    array: ObjectRef,
) -> JarrayResult<(ComponentType, LocalRef<'env>)> {
    let class = catch_local(env, |e| e.get_object_class(array))?
        .ok_or(TypeResolutionError::UnnamedClass)?;

    let component = match catch_local(env, |e| e.get_component_type(class.as_obj()))? {
        Some(component) => component,
        None => {
            let class_name = catch_exceptions(env, |e| e.get_class_name(class.as_obj()))?
                .unwrap_or_default();
            Err(TypeResolutionError::NotAnArray { class_name })?
        }
    };

    let ty = classify(env, component.as_obj())?;
    debug!(component = %ty, "resolved component type");
    Ok((ty, component))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn type_ids_round_trip_for_constructible_types() {
        for kind in PrimitiveKind::ALL {
            let ty = ComponentType::Primitive(kind);
            assert_eq!(ComponentType::from_type_id(ty.type_id()).unwrap(), ty);
        }

        assert_eq!(
            ComponentType::from_type_id(ComponentType::STRING_ID).unwrap(),
            ComponentType::String
        );
    }

    #[test]
    fn type_ids_that_need_a_class_are_rejected() {
        for id in [
            ComponentType::OBJECT_ID,
            ComponentType::ARRAY_ID,
            ComponentType::VOID_ID,
            -1,
            12,
        ] {
            assert_eq!(
                ComponentType::from_type_id(id),
                Err(ArgumentError::UnknownTypeId { type_id: id })
            );
        }
    }

    #[test]
    fn descriptors_are_unique() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(PrimitiveKind::from_descriptor(kind.descriptor()), Some(kind));
            assert_eq!(PrimitiveKind::from_name(kind.name()), Some(kind));
        }
    }
}
