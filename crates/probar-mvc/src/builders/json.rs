//! JSON result assertions.

use super::results::{model_error, verify_value_matching};
use super::{
    difference, returned_action_result, unexpected_result, verify_content_type, verify_status_code, verify_value,
    verify_value_of_type, InvokedAction,
};
use crate::context::FailureContext;
use crate::mvc::results::{
    ActionResult, DefaultValueHandling, Formatting, JsonResult, JsonSerializerSettings, NullValueHandling,
    ReferenceLoopHandling, TypeNameHandling,
};
use crate::reflection::{deep_equality, describe, Reflect};
use crate::result::{MvcTestError, MvcTestResult};
use http::StatusCode;
use std::fmt;

fn json_error(message: String) -> MvcTestError {
    MvcTestError::JsonResultAssertion { message }
}

/// `json()` assertions
pub struct JsonTestBuilder<P> {
    parent: P,
}

impl<P: InvokedAction> JsonTestBuilder<P> {
    pub(crate) fn new(parent: P) -> Self {
        Self { parent }
    }

    fn result(&self) -> MvcTestResult<&JsonResult> {
        match returned_action_result(&self.parent)? {
            ActionResult::Json(result) => Ok(result),
            other => Err(unexpected_result(&self.parent, "JsonResult", other)),
        }
    }

    /// The serialized value deeply equals `expected`
    pub fn with_value(self, expected: impl Reflect) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_value(
            &self.parent.failure_context(),
            "response model",
            &expected,
            result.value.as_deref(),
            model_error,
        )?;
        Ok(self)
    }

    /// The serialized value has type `T`
    pub fn with_value_of_type<T: Reflect>(self) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_value_of_type::<T>(
            &self.parent.failure_context(),
            "response model",
            result.value.as_deref(),
            model_error,
        )?;
        Ok(self)
    }

    /// The serialized value is a `T` accepted by `predicate`
    pub fn with_value_matching<T: Reflect>(self, predicate: impl FnOnce(&T) -> bool) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_value_matching(&self.parent.failure_context(), result.value.as_deref(), predicate)?;
        Ok(self)
    }

    /// No settings were given, or the given ones equal the defaults
    pub fn with_default_serializer_settings(self) -> MvcTestResult<Self> {
        self.with_serializer_settings(JsonSerializerSettings::default())
    }

    /// The serializer settings deeply equal `expected`; absent settings count as the defaults.
    ///
    /// # Errors
    ///
    /// `JsonResultAssertion` naming the first differing setting.
    pub fn with_serializer_settings(self, expected: JsonSerializerSettings) -> MvcTestResult<Self> {
        let result = self.result()?;
        let actual = result.serializer_settings.clone().unwrap_or_default();
        let comparison = deep_equality(&expected, &actual);
        if comparison.are_equal() {
            return Ok(self);
        }
        Err(json_error(self.parent.failure_context().message(
            "JSON result serializer settings to be the given ones",
            &difference(&comparison),
        )))
    }

    /// Setting-by-setting checks
    pub fn with_serializer_settings_matching(
        self,
        check: impl FnOnce(JsonSerializerSettingsTestBuilder) -> MvcTestResult<JsonSerializerSettingsTestBuilder>,
    ) -> MvcTestResult<Self> {
        let settings = self.result()?.serializer_settings.clone().unwrap_or_default();
        check(JsonSerializerSettingsTestBuilder::new(settings, self.parent.failure_context()))?;
        Ok(self)
    }

    /// Explicit status code
    pub fn with_status_code(self, expected: StatusCode) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_status_code(&self.parent.failure_context(), "JSON result", expected, result.status_code)?;
        Ok(self)
    }

    /// Explicit content type
    pub fn with_content_type(self, content_type: &str) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_content_type(
            &self.parent.failure_context(),
            "JSON result",
            content_type,
            result.content_type.as_deref(),
            json_error,
        )?;
        Ok(self)
    }

    /// Back to the invoked action
    pub fn and_also(self) -> P {
        self.parent
    }
}

impl<P: fmt::Debug> fmt::Debug for JsonTestBuilder<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonTestBuilder").field("parent", &self.parent).finish()
    }
}

/// Checks over individual serializer settings
#[derive(Debug, Clone)]
pub struct JsonSerializerSettingsTestBuilder {
    settings: JsonSerializerSettings,
    failure: FailureContext,
}

impl JsonSerializerSettingsTestBuilder {
    pub(crate) const fn new(settings: JsonSerializerSettings, failure: FailureContext) -> Self {
        Self { settings, failure }
    }

    fn check<T: Reflect + PartialEq>(self, setting: &str, expected: &T, actual: &T) -> MvcTestResult<Self> {
        if expected == actual {
            return Ok(self);
        }
        Err(json_error(self.failure.message(
            &format!("JSON result serializer settings to have '{}' {setting}", describe(expected)),
            &format!("in fact found '{}'", describe(actual)),
        )))
    }

    /// Output formatting
    pub fn with_formatting(self, expected: Formatting) -> MvcTestResult<Self> {
        let actual = self.settings.formatting;
        self.check("formatting", &expected, &actual)
    }

    /// Null member handling
    pub fn with_null_value_handling(self, expected: NullValueHandling) -> MvcTestResult<Self> {
        let actual = self.settings.null_value_handling;
        self.check("null value handling", &expected, &actual)
    }

    /// Default member handling
    pub fn with_default_value_handling(self, expected: DefaultValueHandling) -> MvcTestResult<Self> {
        let actual = self.settings.default_value_handling;
        self.check("default value handling", &expected, &actual)
    }

    /// Reference loop handling
    pub fn with_reference_loop_handling(self, expected: ReferenceLoopHandling) -> MvcTestResult<Self> {
        let actual = self.settings.reference_loop_handling;
        self.check("reference loop handling", &expected, &actual)
    }

    /// Type name handling
    pub fn with_type_name_handling(self, expected: TypeNameHandling) -> MvcTestResult<Self> {
        let actual = self.settings.type_name_handling;
        self.check("type name handling", &expected, &actual)
    }

    /// Date format string
    pub fn with_date_format_string(self, expected: &str) -> MvcTestResult<Self> {
        let actual = self.settings.date_format_string.clone();
        self.check("date format string", &expected.to_string(), &actual)
    }

    /// Culture name
    pub fn with_culture(self, expected: &str) -> MvcTestResult<Self> {
        let actual = self.settings.culture.clone();
        self.check("culture", &expected.to_string(), &actual)
    }

    /// Maximum nesting depth
    pub fn with_max_depth(self, expected: u32) -> MvcTestResult<Self> {
        let actual = self.settings.max_depth;
        self.check("max depth", &Some(expected), &actual)
    }

    /// Whether trailing content is rejected
    pub fn with_check_additional_content(self, expected: bool) -> MvcTestResult<Self> {
        let actual = self.settings.check_additional_content;
        self.check("check additional content", &expected, &actual)
    }
}
