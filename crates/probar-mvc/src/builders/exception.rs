//! Assertions over an exception that escaped the action.

use super::InvokedAction;
use crate::invoker::{CaughtException, PANIC_TYPE_NAME};
use crate::reflection::friendly_type_name;
use crate::result::{MvcTestError, MvcTestResult};
use std::fmt;

/// Entry point of `should_throw()`
pub struct ShouldThrowTestBuilder<P> {
    parent: P,
}

impl<P: InvokedAction> ShouldThrowTestBuilder<P> {
    pub(crate) fn new(parent: P) -> Self {
        Self { parent }
    }

    /// Checks over the caught exception
    #[must_use]
    pub fn exception(self) -> ExceptionTestBuilder<P> {
        ExceptionTestBuilder { parent: self.parent }
    }

    /// Back to the invoked action
    pub fn and_also(self) -> P {
        self.parent
    }
}

/// Checks over the type and message of the caught exception
pub struct ExceptionTestBuilder<P> {
    parent: P,
}

impl<P: InvokedAction> ExceptionTestBuilder<P> {
    fn caught(&self) -> MvcTestResult<&CaughtException> {
        self.parent
            .test_context()
            .caught_exception()
            .ok_or_else(|| MvcTestError::InvocationAssertion {
                message: self
                    .parent
                    .failure_context()
                    .message("exception to be thrown", "none was caught"),
            })
    }

    fn error(&self, expected: &str, actual: &str) -> MvcTestError {
        MvcTestError::ExceptionAssertion {
            message: self.parent.failure_context().message(expected, actual),
        }
    }

    /// Raised with `throw` for error type `E`.
    ///
    /// # Errors
    ///
    /// `ExceptionAssertion` naming the caught type.
    pub fn of_type<E: 'static>(self) -> MvcTestResult<Self> {
        let caught = self.caught()?;
        if caught.is::<E>() {
            return Ok(self);
        }
        let actual = caught.type_name().to_string();
        Err(self.error(
            &format!("{} exception", friendly_type_name::<E>()),
            &format!("instead received {actual}"),
        ))
    }

    /// A plain panic rather than a thrown error
    pub fn panic(self) -> MvcTestResult<Self> {
        let caught = self.caught()?;
        if caught.type_name() == PANIC_TYPE_NAME {
            return Ok(self);
        }
        let actual = caught.type_name().to_string();
        Err(self.error(&format!("{PANIC_TYPE_NAME} exception"), &format!("instead received {actual}")))
    }

    /// Message is exactly `expected`
    pub fn with_message(self, expected: &str) -> MvcTestResult<Self> {
        let actual = self.caught()?.message().to_string();
        if actual == expected {
            return Ok(self);
        }
        Err(self.error(
            &format!("exception with message '{expected}'"),
            &format!("instead received '{actual}'"),
        ))
    }

    /// Message includes `fragment`
    pub fn containing_message(self, fragment: &str) -> MvcTestResult<Self> {
        let actual = self.caught()?.message().to_string();
        if actual.contains(fragment) {
            return Ok(self);
        }
        Err(self.error(
            &format!("exception message to contain '{fragment}'"),
            &format!("instead received '{actual}'"),
        ))
    }

    /// The exception satisfies `predicate`
    pub fn passing(self, predicate: impl FnOnce(&CaughtException) -> bool) -> MvcTestResult<Self> {
        if predicate(self.caught()?) {
            return Ok(self);
        }
        Err(self.error("exception to pass the given predicate", "it failed"))
    }

    /// Back to the invoked action
    pub fn and_also(self) -> P {
        self.parent
    }
}

impl<P: fmt::Debug> fmt::Debug for ShouldThrowTestBuilder<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShouldThrowTestBuilder").field("parent", &self.parent).finish()
    }
}

impl<P: fmt::Debug> fmt::Debug for ExceptionTestBuilder<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionTestBuilder").field("parent", &self.parent).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::thrown;
    use crate::invoker::CaughtException;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("article was not found")]
    struct NotFoundError;

    #[derive(Debug, Error)]
    #[error("access denied")]
    struct AccessDenied;

    fn not_found() -> CaughtException {
        CaughtException::new(crate::reflection::friendly_type_name::<NotFoundError>(), "article was not found")
    }

    #[test]
    fn test_type_and_message() {
        let result = thrown(not_found())
            .should_throw()
            .unwrap()
            .exception()
            .of_type::<NotFoundError>()
            .and_then(|exception| exception.with_message("article was not found"))
            .and_then(|exception| exception.containing_message("not found"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_wrong_type() {
        let error = thrown(not_found())
            .should_throw()
            .unwrap()
            .exception()
            .of_type::<AccessDenied>()
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "When calling index action in HomeController expected AccessDenied exception, but instead received NotFoundError."
        );
    }

    #[test]
    fn test_wrong_message() {
        let error = thrown(not_found())
            .should_throw()
            .unwrap()
            .exception()
            .with_message("gone")
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "When calling index action in HomeController expected exception with message 'gone', but instead received 'article was not found'."
        );
    }

    #[test]
    fn test_panic() {
        let caught = CaughtException::new(crate::invoker::PANIC_TYPE_NAME, "index out of bounds");
        let builder = thrown(caught).should_throw().unwrap().exception();
        assert!(builder.panic().is_ok());
        assert!(thrown(not_found()).should_throw().unwrap().exception().panic().is_err());
    }
}
