//! Builders over an invoked action.

use super::exception::ShouldThrowTestBuilder;
use super::pass_for::ShouldPassForTestBuilder;
use super::should_have::ShouldHaveTestBuilder;
use super::should_return::ShouldReturnTestBuilder;
use super::InvokedAction;
use crate::context::TestContext;
use crate::mvc::controller::Controller;
use crate::reflection::Reflect;
use crate::result::{MvcTestError, MvcTestResult};
use std::fmt;
use std::marker::PhantomData;

/// An invoked action returning `R`
pub struct ActionTestBuilder<C, R> {
    context: TestContext<C>,
    output: PhantomData<fn() -> R>,
}

impl<C: Controller, R: Reflect> ActionTestBuilder<C, R> {
    pub(crate) fn new(context: TestContext<C>) -> Self {
        Self {
            context,
            output: PhantomData,
        }
    }

    /// Assertions over the returned value.
    ///
    /// # Errors
    ///
    /// `InvocationAssertion` when the action threw.
    pub fn should_return(self) -> MvcTestResult<ShouldReturnTestBuilder<Self>> {
        ensure_no_exception(&self.context)?;
        Ok(ShouldReturnTestBuilder::new(self))
    }

    /// Assertions over model state, cache, session, temp data and attributes
    #[must_use]
    pub fn should_have(self) -> ShouldHaveTestBuilder<Self> {
        ShouldHaveTestBuilder::new(self)
    }

    /// Assertions over the caught exception.
    ///
    /// # Errors
    ///
    /// `InvocationAssertion` when nothing was thrown.
    pub fn should_throw(self) -> MvcTestResult<ShouldThrowTestBuilder<Self>> {
        ensure_exception(&self.context)?;
        Ok(ShouldThrowTestBuilder::new(self))
    }

    /// Raw callbacks over the test state
    #[must_use]
    pub fn should_pass_for(self) -> ShouldPassForTestBuilder<Self> {
        ShouldPassForTestBuilder::new(self)
    }

    /// Test context
    #[must_use]
    pub fn test_context(&self) -> &TestContext<C> {
        &self.context
    }

    /// Take the test context
    #[must_use]
    pub fn into_test_context(self) -> TestContext<C> {
        self.context
    }
}

impl<C: Controller, R: Reflect> InvokedAction for ActionTestBuilder<C, R> {
    type Controller = C;
    type Output = R;

    fn test_context(&self) -> &TestContext<C> {
        &self.context
    }
}

impl<C, R> fmt::Debug for ActionTestBuilder<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionTestBuilder")
            .field("output", &std::any::type_name::<R>())
            .field("context", &self.context)
            .finish()
    }
}

/// An invoked action without a return value
pub struct VoidActionTestBuilder<C> {
    context: TestContext<C>,
}

impl<C: Controller> VoidActionTestBuilder<C> {
    pub(crate) fn new(context: TestContext<C>) -> Self {
        Self { context }
    }

    /// The action completed without throwing
    pub fn should_return_empty(self) -> MvcTestResult<Self> {
        ensure_no_exception(&self.context)?;
        Ok(self)
    }

    /// Assertions over model state, cache, session, temp data and attributes
    #[must_use]
    pub fn should_have(self) -> ShouldHaveTestBuilder<Self> {
        ShouldHaveTestBuilder::new(self)
    }

    /// Assertions over the caught exception
    pub fn should_throw(self) -> MvcTestResult<ShouldThrowTestBuilder<Self>> {
        ensure_exception(&self.context)?;
        Ok(ShouldThrowTestBuilder::new(self))
    }

    /// Raw callbacks over the test state
    #[must_use]
    pub fn should_pass_for(self) -> ShouldPassForTestBuilder<Self> {
        ShouldPassForTestBuilder::new(self)
    }

    /// Test context
    #[must_use]
    pub fn test_context(&self) -> &TestContext<C> {
        &self.context
    }
}

impl<C: Controller> InvokedAction for VoidActionTestBuilder<C> {
    type Controller = C;
    type Output = ();

    fn test_context(&self) -> &TestContext<C> {
        &self.context
    }
}

impl<C> fmt::Debug for VoidActionTestBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoidActionTestBuilder")
            .field("context", &self.context)
            .finish()
    }
}

fn ensure_no_exception<C: Controller>(context: &TestContext<C>) -> MvcTestResult<()> {
    match context.caught_exception() {
        Some(exception) => Err(MvcTestError::InvocationAssertion {
            message: context.failure_message(
                "no exception",
                &format!("{exception} was thrown without being caught"),
            ),
        }),
        None => Ok(()),
    }
}

fn ensure_exception<C: Controller>(context: &TestContext<C>) -> MvcTestResult<()> {
    if context.caught_exception().is_some() {
        return Ok(());
    }
    Err(MvcTestError::InvocationAssertion {
        message: context.failure_message("exception to be thrown", "none was caught"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ActionInvocation;
    use crate::expression::{MethodCallInfo, MethodIdentity};
    use crate::invoker::CaughtException;
    use crate::mvc::controller::ControllerContext;
    use crate::reflection::Constructor;

    #[derive(Debug, Default)]
    struct PingController {
        context: ControllerContext,
    }

    impl Controller for PingController {
        fn controller_context(&self) -> &ControllerContext {
            &self.context
        }

        fn controller_context_mut(&mut self) -> &mut ControllerContext {
            &mut self.context
        }

        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::new(Vec::new(), |_| Some(Self::default()))]
        }
    }

    fn invoked(exception: Option<CaughtException>) -> TestContext<PingController> {
        let mut context = TestContext::new();
        context.apply(ActionInvocation {
            action_name: "ping".to_string(),
            call: MethodCallInfo {
                method: MethodIdentity::instance("ping"),
                argument_count: 0,
                source: "|c| c.ping()".to_string(),
            },
            arguments: Vec::new(),
            result: exception.is_none().then(|| Box::new(()) as Box<dyn Reflect>),
            exception,
        });
        context
    }

    #[test]
    fn test_should_return_rejects_exception() {
        let builder = ActionTestBuilder::<_, ()>::new(invoked(Some(CaughtException::new("IoError", "disk full"))));
        let error = builder.should_return().unwrap_err();
        assert_eq!(
            error.to_string(),
            "When calling ping action in PingController expected no exception, but IoError with 'disk full' message was thrown without being caught."
        );
    }

    #[test]
    fn test_should_throw_requires_exception() {
        let builder = VoidActionTestBuilder::new(invoked(None));
        let error = builder.should_throw().unwrap_err();
        assert_eq!(
            error.to_string(),
            "When calling ping action in PingController expected exception to be thrown, but none was caught."
        );
    }

    #[test]
    fn test_void_returns_empty() {
        assert!(VoidActionTestBuilder::new(invoked(None)).should_return_empty().is_ok());
    }
}
