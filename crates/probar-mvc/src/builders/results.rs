//! Builders for OK, view, content and status code results.

use super::{
    owned, returned_action_result, unexpected_result, verify_collection, verify_contains, verify_content_type,
    verify_status_code, verify_value, verify_value_of_type, InvokedAction,
};
use crate::mvc::results::{ActionResult, ContentResult, ObjectResult, ViewResult};
use crate::reflection::Reflect;
use crate::result::{MvcTestError, MvcTestResult};
use http::StatusCode;
use std::fmt;

fn ok_error(message: String) -> MvcTestError {
    MvcTestError::OkResultAssertion { message }
}

pub(super) fn model_error(message: String) -> MvcTestError {
    MvcTestError::ResponseModelAssertion { message }
}

fn view_error(message: String) -> MvcTestError {
    MvcTestError::ViewResultAssertion { message }
}

fn content_error(message: String) -> MvcTestError {
    MvcTestError::ContentResultAssertion { message }
}

/// A predicate over a carried value of type `T`
pub(super) fn verify_value_matching<T: Reflect>(
    failure: &crate::context::FailureContext,
    value: Option<&dyn Reflect>,
    predicate: impl FnOnce(&T) -> bool,
) -> MvcTestResult<()> {
    if value
        .and_then(|value| value.as_any().downcast_ref::<T>())
        .is_some_and(predicate)
    {
        return Ok(());
    }
    Err(model_error(
        failure.message("response model to pass the given predicate", "it failed"),
    ))
}

/// `ok()` assertions
pub struct OkTestBuilder<P> {
    parent: P,
}

impl<P: InvokedAction> OkTestBuilder<P> {
    pub(crate) fn new(parent: P) -> Self {
        Self { parent }
    }

    fn result(&self) -> MvcTestResult<&ObjectResult> {
        match returned_action_result(&self.parent)? {
            ActionResult::Ok(result) => Ok(result),
            other => Err(unexpected_result(&self.parent, "OkResult", other)),
        }
    }

    /// The response model deeply equals `expected`
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

    /// The response model has type `T`
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

    /// The response model is a `T` accepted by `predicate`
    pub fn with_value_matching<T: Reflect>(self, predicate: impl FnOnce(&T) -> bool) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_value_matching(&self.parent.failure_context(), result.value.as_deref(), predicate)?;
        Ok(self)
    }

    /// No response model
    pub fn with_no_value(self) -> MvcTestResult<Self> {
        if self.result()?.value.is_some() {
            return Err(ok_error(
                self.parent
                    .failure_context()
                    .message("OK result to have no response model", "in fact such was found"),
            ));
        }
        Ok(self)
    }

    /// One of the content types is `content_type`
    pub fn containing_content_type(self, content_type: &str) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_contains(
            &self.parent.failure_context(),
            "OK result",
            "content type",
            content_type,
            &result.content_types,
            ok_error,
        )?;
        Ok(self)
    }

    /// Exactly these content types, in any order
    pub fn with_content_types(self, content_types: &[&str]) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_collection(
            &self.parent.failure_context(),
            "OK result",
            "content type",
            &owned(content_types),
            &result.content_types,
            ok_error,
        )?;
        Ok(self)
    }

    /// One of the output formatters is `formatter`
    pub fn containing_output_formatter(self, formatter: &str) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_contains(
            &self.parent.failure_context(),
            "OK result",
            "output formatter",
            formatter,
            &result.formatters,
            ok_error,
        )?;
        Ok(self)
    }

    /// Exactly these output formatters, in any order
    pub fn with_output_formatters(self, formatters: &[&str]) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_collection(
            &self.parent.failure_context(),
            "OK result",
            "output formatter",
            &owned(formatters),
            &result.formatters,
            ok_error,
        )?;
        Ok(self)
    }

    /// Back to the invoked action
    pub fn and_also(self) -> P {
        self.parent
    }
}

/// `view()` and `partial_view()` assertions
pub struct ViewTestBuilder<P> {
    parent: P,
    partial: bool,
}

impl<P: InvokedAction> ViewTestBuilder<P> {
    pub(crate) fn new(parent: P, partial: bool) -> Self {
        Self { parent, partial }
    }

    const fn subject(&self) -> &'static str {
        if self.partial {
            "partial view result"
        } else {
            "view result"
        }
    }

    fn result(&self) -> MvcTestResult<&ViewResult> {
        match (returned_action_result(&self.parent)?, self.partial) {
            (ActionResult::View(result), false) | (ActionResult::PartialView(result), true) => Ok(result),
            (other, partial) => Err(unexpected_result(
                &self.parent,
                if partial { "PartialViewResult" } else { "ViewResult" },
                other,
            )),
        }
    }

    /// The view name is `name`.
    ///
    /// # Errors
    ///
    /// `ViewResultAssertion` with the actual name, `default` when unnamed.
    pub fn with_name(self, name: &str) -> MvcTestResult<Self> {
        let actual = self.result()?.view_name.as_deref();
        if actual == Some(name) {
            return Ok(self);
        }
        Err(view_error(self.parent.failure_context().message(
            &format!("{} to be '{name}'", self.subject()),
            &format!("instead received '{}'", actual.unwrap_or("default")),
        )))
    }

    /// No explicit view name
    pub fn with_default_name(self) -> MvcTestResult<Self> {
        match self.result()?.view_name.as_deref() {
            None => Ok(self),
            Some(actual) => Err(view_error(self.parent.failure_context().message(
                &format!("{} to be the default one", self.subject()),
                &format!("instead received '{actual}'"),
            ))),
        }
    }

    /// The model deeply equals `expected`
    pub fn with_model(self, expected: impl Reflect) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_value(
            &self.parent.failure_context(),
            "response model",
            &expected,
            result.model.as_deref(),
            model_error,
        )?;
        Ok(self)
    }

    /// The model has type `T`
    pub fn with_model_of_type<T: Reflect>(self) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_value_of_type::<T>(
            &self.parent.failure_context(),
            "response model",
            result.model.as_deref(),
            model_error,
        )?;
        Ok(self)
    }

    /// The model is a `T` accepted by `predicate`
    pub fn with_model_matching<T: Reflect>(self, predicate: impl FnOnce(&T) -> bool) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_value_matching(&self.parent.failure_context(), result.model.as_deref(), predicate)?;
        Ok(self)
    }

    /// Explicit status code
    pub fn with_status_code(self, expected: StatusCode) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_status_code(&self.parent.failure_context(), self.subject(), expected, result.status_code)?;
        Ok(self)
    }

    /// Explicit content type
    pub fn with_content_type(self, content_type: &str) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_content_type(
            &self.parent.failure_context(),
            self.subject(),
            content_type,
            result.content_type.as_deref(),
            view_error,
        )?;
        Ok(self)
    }

    /// Back to the invoked action
    pub fn and_also(self) -> P {
        self.parent
    }
}

/// `content()` assertions
pub struct ContentTestBuilder<P> {
    parent: P,
}

impl<P: InvokedAction> ContentTestBuilder<P> {
    pub(crate) fn new(parent: P) -> Self {
        Self { parent }
    }

    fn result(&self) -> MvcTestResult<&ContentResult> {
        match returned_action_result(&self.parent)? {
            ActionResult::Content(result) => Ok(result),
            other => Err(unexpected_result(&self.parent, "ContentResult", other)),
        }
    }

    /// The content is exactly `expected`
    pub fn with_content(self, expected: &str) -> MvcTestResult<Self> {
        let actual = self.result()?.content.as_deref();
        if actual == Some(expected) {
            return Ok(self);
        }
        Err(content_error(self.parent.failure_context().message(
            &format!("content result to contain '{expected}'"),
            &format!("instead received '{}'", actual.unwrap_or_default()),
        )))
    }

    /// The content includes `fragment`
    pub fn containing(self, fragment: &str) -> MvcTestResult<Self> {
        let actual = self.result()?.content.as_deref().unwrap_or_default();
        if actual.contains(fragment) {
            return Ok(self);
        }
        Err(content_error(self.parent.failure_context().message(
            &format!("content result to include '{fragment}'"),
            &format!("instead received '{actual}'"),
        )))
    }

    /// The content satisfies `predicate`
    pub fn passing(self, predicate: impl FnOnce(&str) -> bool) -> MvcTestResult<Self> {
        let actual = self.result()?.content.as_deref().unwrap_or_default();
        if predicate(actual) {
            return Ok(self);
        }
        Err(content_error(
            self.parent
                .failure_context()
                .message("content result to pass the given predicate", "it failed"),
        ))
    }

    /// Explicit content type
    pub fn with_content_type(self, content_type: &str) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_content_type(
            &self.parent.failure_context(),
            "content result",
            content_type,
            result.content_type.as_deref(),
            content_error,
        )?;
        Ok(self)
    }

    /// Explicit status code
    pub fn with_status_code(self, expected: StatusCode) -> MvcTestResult<Self> {
        let result = self.result()?;
        verify_status_code(&self.parent.failure_context(), "content result", expected, result.status_code)?;
        Ok(self)
    }

    /// Back to the invoked action
    pub fn and_also(self) -> P {
        self.parent
    }
}

/// Assertions over status code results: `status_code`, `not_found`, `bad_request`
pub struct StatusCodeTestBuilder<P> {
    parent: P,
}

impl<P: InvokedAction> StatusCodeTestBuilder<P> {
    pub(crate) fn new(parent: P) -> Self {
        Self { parent }
    }

    /// The effective status code is `expected`
    pub fn with_status_code(self, expected: StatusCode) -> MvcTestResult<Self> {
        let result = returned_action_result(&self.parent)?;
        verify_status_code(&self.parent.failure_context(), "action result", expected, result.status_code())?;
        Ok(self)
    }

    /// The carried value deeply equals `expected`
    pub fn with_value(self, expected: impl Reflect) -> MvcTestResult<Self> {
        let result = returned_action_result(&self.parent)?;
        verify_value(&self.parent.failure_context(), "response model", &expected, result.value(), model_error)?;
        Ok(self)
    }

    /// The carried value has type `T`
    pub fn with_value_of_type<T: Reflect>(self) -> MvcTestResult<Self> {
        let result = returned_action_result(&self.parent)?;
        verify_value_of_type::<T>(&self.parent.failure_context(), "response model", result.value(), model_error)?;
        Ok(self)
    }

    /// No carried value
    pub fn with_no_value(self) -> MvcTestResult<Self> {
        let result = returned_action_result(&self.parent)?;
        if result.value().is_some() {
            return Err(model_error(self.parent.failure_context().message(
                &format!("{} to have no response model", result.kind_name()),
                "in fact such was found",
            )));
        }
        Ok(self)
    }

    /// Back to the invoked action
    pub fn and_also(self) -> P {
        self.parent
    }
}

macro_rules! debug_builder {
    ($($name:ident),*) => {
        $(
            impl<P: fmt::Debug> fmt::Debug for $name<P> {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_struct(stringify!($name)).field("parent", &self.parent).finish()
                }
            }
        )*
    };
}

debug_builder!(OkTestBuilder, ViewTestBuilder, ContentTestBuilder, StatusCodeTestBuilder);
