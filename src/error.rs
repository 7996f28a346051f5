//! Everything related to errors.

use thiserror::Error;

/// Alias that is used for most `Result`s in this crate.
pub type JarrayResult<T> = Result<T, Box<JarrayError>>;

/// The element class of an array could not be mapped to a component type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeResolutionError {
    #[error("unsupported component class {class_name}")]
    UnknownComponent { class_name: String },
    #[error("{class_name} is not an array class")]
    NotAnArray { class_name: String },
    #[error("component class has no name")]
    UnnamedClass,
}

/// Invalid constructor arguments.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("invalid size {size}")]
    NegativeSize { size: i64 },
    #[error("size {size} exceeds the maximum array length")]
    SizeTooLarge { size: i64 },
    #[error("unknown type id {type_id}")]
    UnknownTypeId { type_id: i64 },
    #[error("unknown arg type: expected one of: type id, foreign object, jarray")]
    UnknownArgType,
    #[error("unknown arg types")]
    UnknownArgs,
    #[error("wrong number of arguments: {n}")]
    ArgCount { n: usize },
}

/// Index errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("array index out of range: {index} (length {length})")]
    OutOfRange { index: i64, length: i64 },
    #[error("array length has not been resolved")]
    Unresolved,
}

/// Type errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("expected {expected}, got {found}")]
    Expected {
        expected: &'static str,
        found: &'static str,
    },
    #[error("{value_type} cannot be stored in an array of {element_type}")]
    IncompatibleElement {
        element_type: String,
        value_type: String,
    },
    #[error("only contiguous slices supported, got step {step}")]
    UnsupportedStep { step: i64 },
    #[error("jarray indices must be integers or slices")]
    Subscript,
    #[error("component type has not been resolved")]
    Unresolved,
    #[error("jarray has no method named {name}")]
    NoSuchMethod { name: String },
}

/// Value errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("index(x): x not in array")]
    NotInArray,
}

/// Errors that indicate a lifecycle bug rather than a user error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("pinned array shouldn't be null")]
    MissingPinnedBuffer,
    #[error("invalid array object")]
    InvalidArray,
    #[error("{operation} returned null without raising an exception")]
    NullResult { operation: &'static str },
    #[error("pinned buffer holds {found} elements, not {expected}")]
    BufferKind {
        expected: &'static str,
        found: &'static str,
    },
}

/// Foreign exception converted to a string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{msg}")]
pub struct Exception {
    class: String,
    msg: String,
}

impl Exception {
    pub(crate) fn new(class: String, msg: String) -> Self {
        Exception { class, msg }
    }

    /// Returns the name of the exception's class.
    pub fn class_name(&self) -> &str {
        &self.class
    }

    /// Returns a reference to the error message.
    pub fn get_message(&self) -> &str {
        &self.msg
    }
}

/// All different errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JarrayError {
    #[error("Type resolution error: {0}")]
    TypeResolutionError(TypeResolutionError),
    #[error("Invalid argument: {0}")]
    ArgumentError(ArgumentError),
    #[error("Index error: {0}")]
    IndexError(IndexError),
    #[error("Type error: {0}")]
    TypeError(TypeError),
    #[error("Value error: {0}")]
    ValueError(ValueError),
    #[error("Runtime error: {0}")]
    RuntimeError(RuntimeError),
    #[error("Exception: {0}")]
    Exception(Exception),
}

impl JarrayError {
    /// Returns `true` if this error wraps a foreign exception.
    pub fn is_exception(&self) -> bool {
        matches!(self, JarrayError::Exception(_))
    }

    /// Returns the wrapped foreign exception, if any.
    pub fn as_exception(&self) -> Option<&Exception> {
        match self {
            JarrayError::Exception(e) => Some(e),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($type:ident) => {
        impl From<$type> for JarrayError {
            #[inline]
            fn from(e: $type) -> Self {
                JarrayError::$type(e)
            }
        }

        impl From<$type> for Box<JarrayError> {
            #[inline]
            fn from(e: $type) -> Self {
                Box::new(JarrayError::from(e))
            }
        }
    };
}

impl_from!(TypeResolutionError);
impl_from!(ArgumentError);
impl_from!(IndexError);
impl_from!(TypeError);
impl_from!(ValueError);
impl_from!(RuntimeError);
impl_from!(Exception);
