//! Assertions over the state an action left behind.

use super::attributes::AttributesTestBuilder;
use super::cache::MemoryCacheTestBuilder;
use super::data::DataProviderTestBuilder;
use super::model_state::ModelStateTestBuilder;
use super::InvokedAction;
use crate::result::{MvcTestError, MvcTestResult};
use std::fmt;

/// Entry point of `should_have()`
pub struct ShouldHaveTestBuilder<P> {
    parent: P,
}

impl<P: InvokedAction> ShouldHaveTestBuilder<P> {
    pub(crate) fn new(parent: P) -> Self {
        Self { parent }
    }

    fn model_state_error(&self, expected: &str, actual: &str) -> MvcTestError {
        MvcTestError::ModelStateAssertion {
            message: self.parent.failure_context().message(expected, actual),
        }
    }

    fn data_error(&self, expected: &str, actual: &str) -> MvcTestError {
        MvcTestError::DataProviderAssertion {
            message: self.parent.failure_context().message(expected, actual),
        }
    }

    /// No model errors.
    ///
    /// # Errors
    ///
    /// `ModelStateAssertion` when any key has an error.
    pub fn valid_model_state(self) -> MvcTestResult<Self> {
        if self.parent.test_context().model_state().is_valid() {
            return Ok(self);
        }
        Err(self.model_state_error("to have valid model state with no errors", "it had some"))
    }

    /// At least one model error
    pub fn invalid_model_state(self) -> MvcTestResult<Self> {
        if !self.parent.test_context().model_state().is_valid() {
            return Ok(self);
        }
        Err(self.model_state_error("to have invalid model state", "was in fact valid"))
    }

    /// Exactly `count` model errors
    pub fn invalid_model_state_with_errors(self, count: usize) -> MvcTestResult<Self> {
        let actual = self.parent.test_context().model_state().error_count();
        if actual == count && count > 0 {
            return Ok(self);
        }
        Err(self.model_state_error(
            &format!("to have invalid model state with {count} errors"),
            &format!("contained {actual}"),
        ))
    }

    /// Detailed model state checks
    pub fn model_state(
        self,
        check: impl FnOnce(ModelStateTestBuilder) -> MvcTestResult<ModelStateTestBuilder>,
    ) -> MvcTestResult<Self> {
        let model_state = self.parent.test_context().model_state().clone();
        check(ModelStateTestBuilder::new(model_state, self.parent.failure_context()))?;
        Ok(self)
    }

    /// Memory cache checks
    pub fn memory_cache(
        self,
        check: impl FnOnce(MemoryCacheTestBuilder) -> MvcTestResult<MemoryCacheTestBuilder>,
    ) -> MvcTestResult<Self> {
        let cache = self.parent.test_context().memory_cache().clone();
        check(MemoryCacheTestBuilder::new(cache, self.parent.failure_context()))?;
        Ok(self)
    }

    /// The memory cache is empty
    pub fn no_memory_cache_entries(self) -> MvcTestResult<Self> {
        if self.parent.test_context().memory_cache().is_empty() {
            return Ok(self);
        }
        Err(self.data_error("to have memory cache with no entries", "in fact it had some"))
    }

    /// Session checks
    pub fn session(
        self,
        check: impl FnOnce(DataProviderTestBuilder) -> MvcTestResult<DataProviderTestBuilder>,
    ) -> MvcTestResult<Self> {
        let entries = self.parent.test_context().http_context().session.entries();
        check(DataProviderTestBuilder::new("session", entries, self.parent.failure_context()))?;
        Ok(self)
    }

    /// The session is empty
    pub fn no_session_entries(self) -> MvcTestResult<Self> {
        if self.parent.test_context().http_context().session.is_empty() {
            return Ok(self);
        }
        Err(self.data_error("to have session with no entries", "in fact it had some"))
    }

    /// Temp data checks
    pub fn temp_data(
        self,
        check: impl FnOnce(DataProviderTestBuilder) -> MvcTestResult<DataProviderTestBuilder>,
    ) -> MvcTestResult<Self> {
        let entries = self.parent.test_context().controller_context().temp_data.entries();
        check(DataProviderTestBuilder::new("temp data", entries, self.parent.failure_context()))?;
        Ok(self)
    }

    /// The temp data is empty
    pub fn no_temp_data_entries(self) -> MvcTestResult<Self> {
        if self.parent.test_context().controller_context().temp_data.is_empty() {
            return Ok(self);
        }
        Err(self.data_error("to have temp data with no entries", "in fact it had some"))
    }

    fn action_attributes_builder(&self) -> AttributesTestBuilder {
        let attributes = self
            .parent
            .test_context()
            .controller_context()
            .action_descriptor
            .as_ref()
            .map(|descriptor| descriptor.attributes.clone())
            .unwrap_or_default();
        AttributesTestBuilder::new("action", attributes, self.parent.failure_context())
    }

    /// Checks over the attributes of the invoked action
    pub fn action_attributes(
        self,
        check: impl FnOnce(AttributesTestBuilder) -> MvcTestResult<AttributesTestBuilder>,
    ) -> MvcTestResult<Self> {
        check(self.action_attributes_builder())?;
        Ok(self)
    }

    /// The invoked action has no attributes
    pub fn no_action_attributes(self) -> MvcTestResult<Self> {
        self.action_attributes_builder().with_total_number_of(0)?;
        Ok(self)
    }

    /// Back to the invoked action
    pub fn and_also(self) -> P {
        self.parent
    }
}

impl<P: fmt::Debug> fmt::Debug for ShouldHaveTestBuilder<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShouldHaveTestBuilder").field("parent", &self.parent).finish()
    }
}
