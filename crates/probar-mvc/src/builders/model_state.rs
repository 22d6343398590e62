//! Model state assertions.

use crate::context::FailureContext;
use crate::mvc::model_state::ModelStateDictionary;
use crate::result::{MvcTestError, MvcTestResult};

fn model_state_error(message: String) -> MvcTestError {
    MvcTestError::ModelStateAssertion { message }
}

/// Checks over the model state after the action ran
#[derive(Debug, Clone)]
pub struct ModelStateTestBuilder {
    model_state: ModelStateDictionary,
    failure: FailureContext,
}

impl ModelStateTestBuilder {
    pub(crate) const fn new(model_state: ModelStateDictionary, failure: FailureContext) -> Self {
        Self { model_state, failure }
    }

    /// Model state under test
    #[must_use]
    pub const fn model_state(&self) -> &ModelStateDictionary {
        &self.model_state
    }

    /// At least one error against `key`
    pub fn containing_error(self, key: &str) -> MvcTestResult<Self> {
        if !self.model_state.errors(key).is_empty() {
            return Ok(self);
        }
        Err(model_state_error(self.failure.message(
            &format!("to have a model error against key '{key}'"),
            "none found",
        )))
    }

    /// An error against `key` reading exactly `message`
    pub fn containing_error_with_message(self, key: &str, message: &str) -> MvcTestResult<Self> {
        let errors = self.model_state.errors(key);
        if errors.contains(&message) {
            return Ok(self);
        }
        if errors.is_empty() {
            return Err(model_state_error(self.failure.message(
                &format!("to have a model error against key '{key}'"),
                "none found",
            )));
        }
        Err(model_state_error(self.failure.message(
            &format!("error message for key '{key}' to be '{message}'"),
            &format!("instead found '{}'", errors.join("', '")),
        )))
    }

    /// An error against `key` including `fragment`
    pub fn containing_error_message_including(self, key: &str, fragment: &str) -> MvcTestResult<Self> {
        let errors = self.model_state.errors(key);
        if errors.iter().any(|error| error.contains(fragment)) {
            return Ok(self);
        }
        Err(model_state_error(self.failure.message(
            &format!("error message for key '{key}' to include '{fragment}'"),
            &format!("instead found '{}'", errors.join("', '")),
        )))
    }

    /// No errors against `key`
    pub fn containing_no_error(self, key: &str) -> MvcTestResult<Self> {
        if self.model_state.errors(key).is_empty() {
            return Ok(self);
        }
        Err(model_state_error(self.failure.message(
            &format!("to have no model errors against key '{key}'"),
            "found some",
        )))
    }

    /// Exactly `count` errors across all keys
    pub fn with_error_count(self, count: usize) -> MvcTestResult<Self> {
        let actual = self.model_state.error_count();
        if actual == count {
            return Ok(self);
        }
        Err(model_state_error(self.failure.message(
            &format!("model state to have {count} errors"),
            &format!("in fact contained {actual}"),
        )))
    }

    /// Only these keys have errors
    pub fn with_invalid_keys(self, keys: &[&str]) -> MvcTestResult<Self> {
        let actual: Vec<&str> = self.model_state.invalid_keys().collect();
        if actual.len() == keys.len() && keys.iter().all(|key| actual.contains(key)) {
            return Ok(self);
        }
        Err(model_state_error(self.failure.message(
            &format!("model state errors against '{}'", keys.join("', '")),
            &format!("in fact found errors against '{}'", actual.join("', '")),
        )))
    }
}
