//! Action invocation with exception capture.
//!
//! A panic escaping an action is the Rust counterpart of a thrown exception:
//! it is caught and recorded as a [`CaughtException`] instead of failing the
//! test. Asynchronous actions are driven to completion on a dedicated
//! current-thread runtime, so they never try to resume on the caller's
//! executor. Calling them from inside a running runtime is rejected, since
//! blocking there would stall that runtime.

use crate::reflection::friendly_type_name;
use crate::result::{MvcTestError, MvcTestResult};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

/// Type name recorded for panics that carry a plain message
pub const PANIC_TYPE_NAME: &str = "panic";

/// Payload of [`throw`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrownException {
    /// Friendly name of the error type
    pub type_name: String,
    /// Error message
    pub message: String,
}

/// Raise an error from inside an action as a typed exception.
///
/// ```ignore
/// fn delete(&mut self, id: u32) -> ActionResult {
///     if id == 0 {
///         throw(InvalidIdError);
///     }
///     self.ok()
/// }
/// ```
pub fn throw<E: Error + 'static>(error: E) -> ! {
    panic::panic_any(ThrownException {
        type_name: friendly_type_name::<E>(),
        message: error.to_string(),
    })
}

/// An exception that escaped the action under test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaughtException {
    type_name: String,
    message: String,
}

impl CaughtException {
    /// Create from parts
    #[must_use]
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Interpret a panic payload
    #[must_use]
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let payload = match payload.downcast::<ThrownException>() {
            Ok(thrown) => return Self::new(thrown.type_name, thrown.message),
            Err(payload) => payload,
        };
        let message = payload
            .downcast_ref::<&'static str>()
            .map(|message| (*message).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "Box<dyn Any>".to_string());
        Self::new(PANIC_TYPE_NAME, message)
    }

    /// Friendly name of the exception type
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Exception message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the exception was raised with [`throw`] for error type `E`
    #[must_use]
    pub fn is<E: 'static>(&self) -> bool {
        self.type_name == friendly_type_name::<E>()
    }
}

impl fmt::Display for CaughtException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} with '{}' message", self.type_name, self.message)
    }
}

/// Run a synchronous action, capturing a panic as an exception
pub fn invoke_sync<R>(action: impl FnOnce() -> R) -> Result<R, CaughtException> {
    panic::catch_unwind(AssertUnwindSafe(action)).map_err(CaughtException::from_panic)
}

/// Run an asynchronous action to completion on a fresh current-thread runtime.
///
/// The outer error is a setup failure; the inner one is the captured
/// exception, whether raised while creating the future or while polling it.
///
/// # Errors
///
/// Blocking on the action is impossible from inside a Tokio runtime, so a
/// caller that is itself async (a `#[tokio::test]` function, for example)
/// gets [`MvcTestError::BlockingInsideRuntime`]. Async actions are tested
/// from plain `#[test]` functions.
pub fn invoke_async<'a, R>(
    action_name: &str,
    start: impl FnOnce() -> LocalBoxFuture<'a, R>,
) -> MvcTestResult<Result<R, CaughtException>> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(MvcTestError::BlockingInsideRuntime {
            action: action_name.to_string(),
        });
    }
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let future = match invoke_sync(start) {
        Ok(future) => future,
        Err(exception) => return Ok(Err(exception)),
    };
    let outcome = runtime
        .block_on(AssertUnwindSafe(future).catch_unwind())
        .map_err(CaughtException::from_panic);
    debug!(action = action_name, faulted = outcome.is_err(), "async action completed");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("order {0} was not found")]
    struct OrderNotFound(u32);

    #[test]
    fn test_sync_value() {
        assert_eq!(invoke_sync(|| 2 + 2), Ok(4));
    }

    #[test]
    fn test_sync_panic_message() {
        let caught = invoke_sync(|| -> u8 { panic!("boom {}", 1) }).unwrap_err();
        assert_eq!(caught.type_name(), PANIC_TYPE_NAME);
        assert_eq!(caught.message(), "boom 1");
    }

    #[test]
    fn test_thrown_error_is_typed() {
        let caught = invoke_sync(|| -> u8 { throw(OrderNotFound(7)) }).unwrap_err();
        assert_eq!(caught.type_name(), "OrderNotFound");
        assert_eq!(caught.message(), "order 7 was not found");
        assert!(caught.is::<OrderNotFound>());
        assert_eq!(caught.to_string(), "OrderNotFound with 'order 7 was not found' message");
    }

    #[test]
    fn test_async_value() {
        let base = 1;
        let outcome = invoke_async("Index", || async move { base + 1 }.boxed_local()).unwrap();
        assert_eq!(outcome, Ok(2));
    }

    #[test]
    fn test_async_panic_is_captured() {
        let outcome: MvcTestResult<Result<(), CaughtException>> =
            invoke_async("Index", || async { throw(OrderNotFound(3)) }.boxed_local());
        assert!(outcome.unwrap().unwrap_err().is::<OrderNotFound>());
    }

    #[test]
    fn test_async_panic_while_starting() {
        let outcome: MvcTestResult<Result<u8, CaughtException>> = invoke_async("Index", || panic!("before future"));
        assert_eq!(outcome.unwrap().unwrap_err().message(), "before future");
    }

    #[tokio::test]
    async fn test_async_inside_runtime_is_rejected() {
        let outcome = invoke_async("Index", || async { 1 }.boxed_local());
        assert!(matches!(outcome, Err(MvcTestError::BlockingInsideRuntime { action }) if action == "Index"));
    }
}
