//! Exception bridging.
//!
//! Any call into the foreign runtime can leave an exception pending. The functions in this
//! module run such a call and check for a pending exception immediately afterwards. If one is
//! pending it's cleared and converted to [`JarrayError::Exception`], and the value produced by
//! the call is discarded: a result is never returned alongside a pending exception.
//!
//! References returned by a call are wrapped in a [`LocalRef`] before the check, so they're
//! released even if the call turns out to have failed.
//!
//! [`JarrayError::Exception`]: crate::error::JarrayError::Exception

use tracing::debug;

use crate::{
    env::{refs::LocalRef, EnvRef, ForeignEnv, ObjectRef},
    error::{Exception, JarrayResult, RuntimeError},
};

static UNKNOWN_EXCEPTION: &str = "<unknown exception>";
static CANNOT_DISPLAY_EXCEPTION: &str = "<cannot display exception>";

/// Converts a pending exception to an error, returns `Ok(())` if no exception is pending.
pub fn check_exception(env: &EnvRef) -> JarrayResult<()> {
    if !env.exception_check() {
        return Ok(());
    }

    let exc = env.exception_occurred();
    env.exception_clear();

    let exc = match exc {
        Some(exc) => unsafe { LocalRef::from_owned(env, exc) },
        None => {
            return Err(Exception::new(
                UNKNOWN_EXCEPTION.into(),
                UNKNOWN_EXCEPTION.into(),
            ))?
        }
    };

    let exception = describe(env, exc.as_obj());
    debug!(class = exception.class_name(), message = exception.get_message(), "foreign exception");
    Err(exception)?
}

fn describe(env: &EnvRef, exc: ObjectRef) -> Exception {
    // Describing the exception must not leave another one behind, and no call is made while
    // one is pending.
    let class = env.get_object_class(exc);
    let class = class.map(|class| unsafe { LocalRef::from_owned(env, class) });
    if discard_pending(env) {
        return undescribable();
    }

    let class_name = match class {
        Some(class) => env.get_class_name(class.as_obj()),
        None => None,
    };
    if discard_pending(env) {
        return undescribable();
    }

    let message = env.to_string(exc);
    if discard_pending(env) {
        return undescribable();
    }

    Exception::new(
        class_name.unwrap_or_else(|| UNKNOWN_EXCEPTION.into()),
        message.unwrap_or_else(|| CANNOT_DISPLAY_EXCEPTION.into()),
    )
}

fn discard_pending(env: &EnvRef) -> bool {
    if env.exception_check() {
        env.exception_clear();
        return true;
    }

    false
}

fn undescribable() -> Exception {
    Exception::new(UNKNOWN_EXCEPTION.into(), CANNOT_DISPLAY_EXCEPTION.into())
}

/// Runs `func` and checks for a pending exception. If one is pending the value returned by
/// `func` is dropped and the exception is returned.
#[inline]
pub fn catch_exceptions<T, F>(env: &EnvRef, func: F) -> JarrayResult<T>
where
    F: FnOnce(&dyn ForeignEnv) -> T,
{
    let res = func(&**env);
    check_exception(env)?;
    Ok(res)
}

/// Runs `func`, which returns a new local reference or null, and checks for a pending
/// exception. The reference is released if an exception is pending.
#[inline]
pub fn catch_local<'env, F>(env: &'env EnvRef, func: F) -> JarrayResult<Option<LocalRef<'env>>>
where
    F: FnOnce(&dyn ForeignEnv) -> Option<ObjectRef>,
{
    let res = func(&**env).map(|obj| unsafe { LocalRef::from_owned(env, obj) });
    check_exception(env)?;
    Ok(res)
}

/// Like [`catch_local`], but a null result without a pending exception is treated as an
/// inconsistency of the foreign runtime.
#[inline]
pub fn catch_local_nonnull<'env, F>(
    env: &'env EnvRef,
    operation: &'static str,
    func: F,
) -> JarrayResult<LocalRef<'env>>
where
    F: FnOnce(&dyn ForeignEnv) -> Option<ObjectRef>,
{
    match catch_local(env, func)? {
        Some(obj) => Ok(obj),
        None => Err(RuntimeError::NullResult { operation })?,
    }
}
