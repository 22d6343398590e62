//! Created result assertions.

use super::results::{model_error, verify_value_matching};
use super::{
    owned, returned_action_result, unexpected_result, verify_collection, verify_contains, verify_route_values,
    verify_value, verify_value_of_type, InvokedAction,
};
use crate::mvc::results::{route_values, ActionResult, CreatedResult};
use crate::reflection::Reflect;
use crate::result::{MvcTestError, MvcTestResult};
use std::fmt;

fn created_error(message: String) -> MvcTestError {
    MvcTestError::CreatedResultAssertion { message }
}

/// `created()` assertions over `CreatedResult`, `CreatedAtActionResult`
/// and `CreatedAtRouteResult`
pub struct CreatedTestBuilder<P> {
    parent: P,
}

impl<P: InvokedAction> CreatedTestBuilder<P> {
    pub(crate) fn new(parent: P) -> Self {
        Self { parent }
    }

    fn result(&self) -> MvcTestResult<&CreatedResult> {
        match returned_action_result(&self.parent)? {
            ActionResult::Created(result) | ActionResult::CreatedAtAction(result) | ActionResult::CreatedAtRoute(result) => {
                Ok(result)
            }
            other => Err(unexpected_result(&self.parent, "CreatedResult", other)),
        }
    }

    fn expect_part(self, part: &str, expected: &str, actual: Option<String>) -> MvcTestResult<Self> {
        if actual.as_deref() == Some(expected) {
            return Ok(self);
        }
        Err(created_error(self.parent.failure_context().message(
            &format!("created result to have '{expected}' {part}"),
            &format!("in fact it was '{}'", actual.unwrap_or_default()),
        )))
    }

    /// Location header
    pub fn at_location(self, location: &str) -> MvcTestResult<Self> {
        let actual = self.result()?.location.clone();
        self.expect_part("location", location, actual)
    }

    /// Target action name
    pub fn at_action(self, action: &str) -> MvcTestResult<Self> {
        let actual = self.result()?.action_name.clone();
        self.expect_part("action name", action, actual)
    }

    /// Target controller name
    pub fn at_controller(self, controller: &str) -> MvcTestResult<Self> {
        let actual = self.result()?.controller_name.clone();
        self.expect_part("controller name", controller, actual)
    }

    /// Target route name
    pub fn at_route(self, route: &str) -> MvcTestResult<Self> {
        let actual = self.result()?.route_name.clone();
        self.expect_part("route name", route, actual)
    }

    /// One route value
    pub fn with_route_value(self, key: &str, value: impl ToString) -> MvcTestResult<Self> {
        let expected = value.to_string();
        let actual = self.result()?.route_values.get(key).cloned();
        match actual {
            Some(found) if found == expected => Ok(self),
            Some(found) => Err(created_error(self.parent.failure_context().message(
                &format!("created result route values to contain '{key}' with '{expected}' value"),
                &format!("in fact found '{found}'"),
            ))),
            None => Err(created_error(self.parent.failure_context().message(
                &format!("created result route values to contain '{key}' key"),
                "such was not found",
            ))),
        }
    }

    /// Exactly these route values
    pub fn with_route_values<K, V>(self, expected: impl IntoIterator<Item = (K, V)>) -> MvcTestResult<Self>
    where
        K: Into<String>,
        V: ToString,
    {
        let expected = route_values(expected);
        let result = self.result()?;
        verify_route_values(
            &self.parent.failure_context(),
            "created result",
            &expected,
            &result.route_values,
            created_error,
        )?;
        Ok(self)
    }

    /// One of the content types is `content_type`
    pub fn containing_content_type(self, content_type: &str) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_contains(
            &self.parent.failure_context(),
            "created result",
            "content type",
            content_type,
            &result.content_types,
            created_error,
        )?;
        Ok(self)
    }

    /// Exactly these content types; the count is checked before membership
    pub fn with_content_types(self, content_types: &[&str]) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_collection(
            &self.parent.failure_context(),
            "created result",
            "content type",
            &owned(content_types),
            &result.content_types,
            created_error,
        )?;
        Ok(self)
    }

    /// One of the output formatters is `formatter`
    pub fn containing_output_formatter(self, formatter: &str) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_contains(
            &self.parent.failure_context(),
            "created result",
            "output formatter",
            formatter,
            &result.formatters,
            created_error,
        )?;
        Ok(self)
    }

    /// Exactly these output formatters
    pub fn with_output_formatters(self, formatters: &[&str]) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_collection(
            &self.parent.failure_context(),
            "created result",
            "output formatter",
            &owned(formatters),
            &result.formatters,
            created_error,
        )?;
        Ok(self)
    }

    /// The created value deeply equals `expected`
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

    /// The created value has type `T`
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

    /// The created value is a `T` accepted by `predicate`
    pub fn with_value_matching<T: Reflect>(self, predicate: impl FnOnce(&T) -> bool) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_value_matching(&self.parent.failure_context(), result.value.as_deref(), predicate)?;
        Ok(self)
    }

    /// Back to the invoked action
    pub fn and_also(self) -> P {
        self.parent
    }
}

impl<P: fmt::Debug> fmt::Debug for CreatedTestBuilder<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreatedTestBuilder").field("parent", &self.parent).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::invoked;
    use crate::mvc::results::{route_values, ActionResult, CreatedResult};

    fn created_at_action() -> ActionResult {
        ActionResult::CreatedAtAction(
            CreatedResult::at_action("details", route_values([("id", 42)]), 42_u32)
                .with_content_type("application/json")
                .with_formatter("JsonOutputFormatter"),
        )
    }

    #[test]
    fn test_created_at_action() {
        let builder = invoked(created_at_action()).should_return().unwrap().created().unwrap();
        let builder = builder.at_action("details").unwrap();
        let builder = builder.with_route_values([("id", 42)]).unwrap();
        let builder = builder.containing_content_type("application/json").unwrap();
        let builder = builder.with_output_formatters(&["JsonOutputFormatter"]).unwrap();
        assert!(builder.with_value(42_u32).is_ok());
    }

    #[test]
    fn test_content_type_count_reported_first() {
        let error = invoked(created_at_action())
            .should_return()
            .unwrap()
            .created()
            .unwrap()
            .with_content_types(&["application/json", "text/xml"])
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "When calling index action in HomeController expected created result to have 2 content types, but in fact found 1."
        );
    }

    #[test]
    fn test_wrong_location() {
        let result = ActionResult::Created(CreatedResult::at_location("/api/articles/1", 1_u32));
        let error = invoked(result)
            .should_return()
            .unwrap()
            .created()
            .unwrap()
            .at_location("/api/articles/2")
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "When calling index action in HomeController expected created result to have '/api/articles/2' location, but in fact it was '/api/articles/1'."
        );
    }
}
