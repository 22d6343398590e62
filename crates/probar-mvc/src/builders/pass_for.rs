//! Raw callbacks over the state of an invoked action.
//!
//! Each `the_*` method hands a component to a closure that asserts on its
//! own; each `the_*_matching` method turns a `false` predicate into an
//! assertion error.

use super::InvokedAction;
use crate::context::TestContext;
use crate::mvc::cache::MemoryCache;
use crate::mvc::http::HttpContext;
use crate::mvc::model_state::ModelStateDictionary;
use crate::mvc::routing::RouteData;
use crate::reflection::Reflect;
use crate::result::{MvcTestError, MvcTestResult};
use std::fmt;

/// Entry point of `should_pass_for()`
pub struct ShouldPassForTestBuilder<P> {
    parent: P,
}

impl<P: InvokedAction> ShouldPassForTestBuilder<P> {
    pub(crate) fn new(parent: P) -> Self {
        Self { parent }
    }

    fn failed(&self, subject: &str, error: fn(String) -> MvcTestError) -> MvcTestError {
        error(
            self.parent
                .failure_context()
                .message(&format!("{subject} to pass the given predicate"), "it failed"),
        )
    }

    fn controller(&self) -> MvcTestResult<&P::Controller> {
        self.parent
            .test_context()
            .controller()
            .ok_or_else(|| MvcTestError::InvocationAssertion {
                message: self
                    .parent
                    .failure_context()
                    .message("controller instance", "none was created"),
            })
    }

    /// The controller instance
    pub fn the_controller(self, assertions: impl FnOnce(&P::Controller)) -> MvcTestResult<Self> {
        assertions(self.controller()?);
        Ok(self)
    }

    /// The controller instance satisfies `predicate`
    pub fn the_controller_matching(self, predicate: impl FnOnce(&P::Controller) -> bool) -> MvcTestResult<Self> {
        if predicate(self.controller()?) {
            return Ok(self);
        }
        Err(self.failed("controller", |message| MvcTestError::InvocationAssertion { message }))
    }

    /// The returned value, when it has the declared type
    pub fn the_action_result(self, assertions: impl FnOnce(&P::Output)) -> MvcTestResult<Self>
    where
        P::Output: Reflect,
    {
        let value = self
            .parent
            .test_context()
            .action_result()
            .and_then(|value| value.as_any().downcast_ref::<P::Output>())
            .ok_or_else(|| MvcTestError::ActionResultAssertion {
                message: self.parent.failure_context().message("action result", "none was returned"),
            })?;
        assertions(value);
        Ok(self)
    }

    /// The returned value satisfies `predicate`
    pub fn the_action_result_matching(self, predicate: impl FnOnce(&P::Output) -> bool) -> MvcTestResult<Self>
    where
        P::Output: Reflect,
    {
        let passed = self
            .parent
            .test_context()
            .action_result()
            .and_then(|value| value.as_any().downcast_ref::<P::Output>())
            .is_some_and(predicate);
        if passed {
            return Ok(self);
        }
        Err(self.failed("action result", |message| MvcTestError::ActionResultAssertion { message }))
    }

    /// The model state
    pub fn the_model_state(self, assertions: impl FnOnce(&ModelStateDictionary)) -> MvcTestResult<Self> {
        assertions(self.parent.test_context().model_state());
        Ok(self)
    }

    /// The model state satisfies `predicate`
    pub fn the_model_state_matching(self, predicate: impl FnOnce(&ModelStateDictionary) -> bool) -> MvcTestResult<Self> {
        if predicate(self.parent.test_context().model_state()) {
            return Ok(self);
        }
        Err(self.failed("model state", |message| MvcTestError::ModelStateAssertion { message }))
    }

    /// The HTTP context
    pub fn the_http_context(self, assertions: impl FnOnce(&HttpContext)) -> MvcTestResult<Self> {
        assertions(self.parent.test_context().http_context());
        Ok(self)
    }

    /// The HTTP context satisfies `predicate`
    pub fn the_http_context_matching(self, predicate: impl FnOnce(&HttpContext) -> bool) -> MvcTestResult<Self> {
        if predicate(self.parent.test_context().http_context()) {
            return Ok(self);
        }
        Err(self.failed("HTTP context", |message| MvcTestError::InvocationAssertion { message }))
    }

    /// The memory cache
    pub fn the_memory_cache(self, assertions: impl FnOnce(&MemoryCache)) -> MvcTestResult<Self> {
        assertions(self.parent.test_context().memory_cache());
        Ok(self)
    }

    /// The memory cache satisfies `predicate`
    pub fn the_memory_cache_matching(self, predicate: impl FnOnce(&MemoryCache) -> bool) -> MvcTestResult<Self> {
        if predicate(self.parent.test_context().memory_cache()) {
            return Ok(self);
        }
        Err(self.failed("memory cache", |message| MvcTestError::DataProviderAssertion { message }))
    }

    /// The route data of the request
    pub fn the_route_data(self, assertions: impl FnOnce(&RouteData)) -> MvcTestResult<Self> {
        assertions(self.parent.test_context().route_data());
        Ok(self)
    }

    /// The route data satisfies `predicate`
    pub fn the_route_data_matching(self, predicate: impl FnOnce(&RouteData) -> bool) -> MvcTestResult<Self> {
        if predicate(self.parent.test_context().route_data()) {
            return Ok(self);
        }
        Err(self.failed("route data", |message| MvcTestError::InvocationAssertion { message }))
    }

    /// The whole test context
    pub fn the_test_context(self, assertions: impl FnOnce(&TestContext<P::Controller>)) -> MvcTestResult<Self> {
        assertions(self.parent.test_context());
        Ok(self)
    }

    /// The test context satisfies `predicate`
    pub fn the_test_context_matching(
        self,
        predicate: impl FnOnce(&TestContext<P::Controller>) -> bool,
    ) -> MvcTestResult<Self> {
        if predicate(self.parent.test_context()) {
            return Ok(self);
        }
        Err(self.failed("test context", |message| MvcTestError::InvocationAssertion { message }))
    }

    /// Back to the invoked action
    pub fn and_also(self) -> P {
        self.parent
    }
}

impl<P: fmt::Debug> fmt::Debug for ShouldPassForTestBuilder<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShouldPassForTestBuilder").field("parent", &self.parent).finish()
    }
}
