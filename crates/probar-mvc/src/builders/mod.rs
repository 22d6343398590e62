//! Fluent controller test builders.
//!
//! ```text
//! for_controller::<C>()                ControllerBuilder<C>      configuration
//! └── calling!(builder, |c| ..)?       ActionTestBuilder<C, R>   invoked action
//!     ├── .should_return()?            ShouldReturnTestBuilder   action result
//!     ├── .should_have()               ShouldHaveTestBuilder     ambient state
//!     ├── .should_throw()?             ShouldThrowTestBuilder    caught exception
//!     └── .should_pass_for()           ShouldPassForTestBuilder  raw callbacks
//! ```
//!
//! Every assertion returns `MvcTestResult`; a failed expectation is one of the
//! assertion variants of [`MvcTestError`], carrying the formatted message.
//! `and_also()` returns to the invoked action so checks can be chained.

mod action;
mod attributes;
mod cache;
mod controller;
mod created;
mod data;
mod exception;
mod json;
mod model_state;
mod pass_for;
mod redirect;
mod results;
mod should_have;
mod should_return;
#[cfg(test)]
mod testing;

pub use action::{ActionTestBuilder, VoidActionTestBuilder};
pub use attributes::AttributesTestBuilder;
pub use cache::{MemoryCacheEntryTestBuilder, MemoryCacheTestBuilder};
pub use controller::{ControllerBuilder, ControllerShouldHaveTestBuilder, PreparedCall};
pub use created::CreatedTestBuilder;
pub use data::DataProviderTestBuilder;
pub use exception::{ExceptionTestBuilder, ShouldThrowTestBuilder};
pub use json::{JsonSerializerSettingsTestBuilder, JsonTestBuilder};
pub use model_state::ModelStateTestBuilder;
pub use pass_for::ShouldPassForTestBuilder;
pub use redirect::RedirectTestBuilder;
pub use results::{ContentTestBuilder, OkTestBuilder, StatusCodeTestBuilder, ViewTestBuilder};
pub use should_have::ShouldHaveTestBuilder;
pub use should_return::ShouldReturnTestBuilder;

use crate::context::{FailureContext, TestContext};
use crate::mvc::controller::Controller;
use crate::mvc::results::{ActionResult, RouteValues};
use crate::reflection::{deep_equality, friendly_name_of, friendly_type_name, DeepEqualityResult, Reflect, Reflection};
use crate::result::{MvcTestError, MvcTestResult};
use http::StatusCode;
use std::fmt;

/// Start testing a controller
#[must_use]
pub fn for_controller<C: Controller>() -> ControllerBuilder<C> {
    ControllerBuilder::new()
}

/// A builder over an action that has been invoked
pub trait InvokedAction: Sized {
    /// Controller type
    type Controller: Controller;
    /// Declared return type of the action
    type Output;

    /// Test context of the invocation
    fn test_context(&self) -> &TestContext<Self::Controller>;

    /// Names for failure messages
    fn failure_context(&self) -> FailureContext {
        self.test_context().failure_context()
    }
}

/// The [`ActionResult`] inside a returned value: the value itself, the `Ok`
/// side of a `Result`, or the target of a transparent wrapper.
pub(crate) fn action_result_of(value: &dyn Reflect) -> Option<&ActionResult> {
    if let Some(result) = value.as_any().downcast_ref::<ActionResult>() {
        return Some(result);
    }
    match value.reflect() {
        Reflection::Transparent(inner) | Reflection::Shared { target: inner, .. } => action_result_of(inner),
        Reflection::Variant { name: "Ok", fields } => fields.first().and_then(|field| action_result_of(field.value)),
        _ => None,
    }
}

/// The action result returned by the invoked action
pub(crate) fn returned_action_result<P: InvokedAction>(parent: &P) -> MvcTestResult<&ActionResult> {
    let context = parent.test_context();
    context
        .action_result()
        .and_then(action_result_of)
        .ok_or_else(|| MvcTestError::ActionResultAssertion {
            message: context.failure_message(
                "action result",
                &format!(
                    "instead received {}",
                    context
                        .action_result()
                        .map_or_else(|| "no value".to_string(), |value| crate::reflection::friendly_name_of(value))
                ),
            ),
        })
}

/// Failure for a returned action result of the wrong kind
pub(crate) fn unexpected_result<P: InvokedAction>(parent: &P, expected: &str, actual: &ActionResult) -> MvcTestError {
    MvcTestError::ActionResultAssertion {
        message: parent.failure_context().message(
            &format!("action result to be {expected}"),
            &format!("instead received {}", actual.kind_name()),
        ),
    }
}

/// "404 (Not Found)"
pub(crate) fn status_text(code: StatusCode) -> String {
    format!("{} ({})", code.as_u16(), code.canonical_reason().unwrap_or("Unknown"))
}

pub(crate) fn verify_status_code(
    failure: &FailureContext,
    subject: &str,
    expected: StatusCode,
    actual: Option<StatusCode>,
) -> MvcTestResult<()> {
    if actual == Some(expected) {
        return Ok(());
    }
    Err(MvcTestError::HttpStatusCodeAssertion {
        message: failure.message(
            &format!("{subject} to have {} status code", status_text(expected)),
            &format!("instead received {}", actual.map_or_else(|| "none".to_string(), status_text)),
        ),
    })
}

/// Deep comparison of a carried value against the expected one
pub(crate) fn verify_value(
    failure: &FailureContext,
    subject: &str,
    expected: &dyn Reflect,
    actual: Option<&dyn Reflect>,
    error: fn(String) -> MvcTestError,
) -> MvcTestResult<()> {
    let Some(actual) = actual else {
        return Err(error(failure.message(
            &format!("{subject} to be the given model"),
            "such was not found",
        )));
    };
    let result = deep_equality(expected, actual);
    if result.are_equal() {
        return Ok(());
    }
    Err(error(
        failure.message(&format!("{subject} to be the given model"), &difference(&result)),
    ))
}

pub(crate) fn verify_value_of_type<T: Reflect>(
    failure: &FailureContext,
    subject: &str,
    actual: Option<&dyn Reflect>,
    error: fn(String) -> MvcTestError,
) -> MvcTestResult<()> {
    if actual.is_some_and(|value| value.as_any().is::<T>()) {
        return Ok(());
    }
    Err(error(failure.message(
        &format!("{subject} to be of {} type", friendly_type_name::<T>()),
        &format!(
            "instead received {}",
            actual.map_or_else(|| "no value".to_string(), friendly_name_of)
        ),
    )))
}

pub(crate) fn verify_content_type(
    failure: &FailureContext,
    subject: &str,
    expected: &str,
    actual: Option<&str>,
    error: fn(String) -> MvcTestError,
) -> MvcTestResult<()> {
    if actual == Some(expected) {
        return Ok(());
    }
    Err(error(failure.message(
        &format!("{subject} to have '{expected}' content type"),
        &format!("instead received '{}'", shown(actual.as_ref())),
    )))
}

/// "in fact it was different. Difference occurs at ..." for a failed deep comparison
pub(crate) fn difference(result: &DeepEqualityResult) -> String {
    match result.failure_message() {
        Some(message) => format!("in fact it was different. {}", message.trim_end_matches('.')),
        None => "in fact it was different".to_string(),
    }
}

/// Rendered option value for messages
pub(crate) fn shown<T: fmt::Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "none".to_string(), ToString::to_string)
}

fn counted(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Count first, then membership; a count mismatch is the reported failure.
pub(crate) fn verify_collection<T: PartialEq + fmt::Display>(
    failure: &FailureContext,
    subject: &str,
    noun: &str,
    expected: &[T],
    actual: &[T],
    error: fn(String) -> MvcTestError,
) -> MvcTestResult<()> {
    if expected.len() != actual.len() {
        return Err(error(failure.message(
            &format!("{subject} to have {}", counted(expected.len(), noun)),
            &format!("in fact found {}", actual.len()),
        )));
    }
    // Each actual item satisfies at most one expected item.
    let mut used = vec![false; actual.len()];
    let missing = expected.iter().find(|item| {
        let position = actual
            .iter()
            .zip(&used)
            .position(|(candidate, taken)| !taken && candidate == *item);
        match position {
            Some(position) => {
                used[position] = true;
                false
            }
            None => true,
        }
    });
    if let Some(missing) = missing {
        return Err(error(failure.message(
            &format!("{subject} {noun}s to contain '{missing}'"),
            "none was found",
        )));
    }
    Ok(())
}

/// Membership of a single item
pub(crate) fn verify_contains(
    failure: &FailureContext,
    subject: &str,
    noun: &str,
    expected: &str,
    actual: &[String],
    error: fn(String) -> MvcTestError,
) -> MvcTestResult<()> {
    if actual.iter().any(|item| item == expected) {
        return Ok(());
    }
    Err(error(failure.message(
        &format!("{subject} {noun}s to contain '{expected}'"),
        "none was found",
    )))
}

/// Owned strings for comparison against stored collections
pub(crate) fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

/// Route values compared as a collection keyed by name
pub(crate) fn verify_route_values(
    failure: &FailureContext,
    subject: &str,
    expected: &RouteValues,
    actual: &RouteValues,
    error: fn(String) -> MvcTestError,
) -> MvcTestResult<()> {
    if expected.len() != actual.len() {
        return Err(error(failure.message(
            &format!("{subject} to have {}", counted(expected.len(), "route value")),
            &format!("in fact found {}", actual.len()),
        )));
    }
    for (key, value) in expected {
        match actual.get(key) {
            Some(found) if found == value => {}
            Some(found) => {
                return Err(error(failure.message(
                    &format!("{subject} route values to contain '{key}' with '{value}' value"),
                    &format!("in fact found '{found}'"),
                )))
            }
            None => {
                return Err(error(failure.message(
                    &format!("{subject} route values to contain '{key}' key"),
                    "such was not found",
                )))
            }
        }
    }
    Ok(())
}
