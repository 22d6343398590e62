//! Assertions over the value an action returned.

use super::created::CreatedTestBuilder;
use super::json::JsonTestBuilder;
use super::redirect::RedirectTestBuilder;
use super::results::{ContentTestBuilder, OkTestBuilder, StatusCodeTestBuilder, ViewTestBuilder};
use super::{
    difference, returned_action_result, unexpected_result, verify_status_code, verify_value_of_type, InvokedAction,
};
use crate::mvc::results::ActionResult;
use crate::reflection::{deep_equality, is_null, Reflect};
use crate::result::{MvcTestError, MvcTestResult};
use http::StatusCode;
use std::fmt;

/// Entry point of `should_return()`
pub struct ShouldReturnTestBuilder<P> {
    parent: P,
}

impl<P: InvokedAction> ShouldReturnTestBuilder<P> {
    pub(crate) fn new(parent: P) -> Self {
        Self { parent }
    }

    /// The returned value deeply equals `expected`.
    ///
    /// # Errors
    ///
    /// `ActionResultAssertion` naming the first difference.
    pub fn value(self, expected: P::Output) -> MvcTestResult<P>
    where
        P::Output: Reflect,
    {
        let context = self.parent.test_context();
        let Some(actual) = context.action_result() else {
            return Err(MvcTestError::ActionResultAssertion {
                message: context.failure_message("action result to be the given model", "no value was returned"),
            });
        };
        let result = deep_equality(&expected, actual);
        if !result.are_equal() {
            return Err(MvcTestError::ActionResultAssertion {
                message: context.failure_message("action result to be the given model", &difference(&result)),
            });
        }
        Ok(self.parent)
    }

    /// The returned value satisfies `predicate`.
    ///
    /// # Errors
    ///
    /// `ActionResultAssertion` when the predicate rejects the value.
    pub fn value_matching(self, predicate: impl FnOnce(&P::Output) -> bool) -> MvcTestResult<P>
    where
        P::Output: Reflect,
    {
        let context = self.parent.test_context();
        let passed = context
            .action_result()
            .and_then(|value| value.as_any().downcast_ref::<P::Output>())
            .is_some_and(predicate);
        if passed {
            return Ok(self.parent);
        }
        Err(MvcTestError::ActionResultAssertion {
            message: context.failure_message("action result to pass the given predicate", "it failed"),
        })
    }

    /// The returned value has runtime type `T`
    pub fn result_of_type<T: Reflect>(self) -> MvcTestResult<P> {
        verify_value_of_type::<T>(
            &self.parent.failure_context(),
            "action result",
            self.parent.test_context().action_result(),
            |message| MvcTestError::ActionResultAssertion { message },
        )?;
        Ok(self.parent)
    }

    /// The action returned nothing: `()`, `None` or a null-shaped value
    pub fn null(self) -> MvcTestResult<P> {
        let context = self.parent.test_context();
        match context.action_result() {
            Some(value) if !is_null(value) && !value.as_any().is::<()>() => Err(MvcTestError::ActionResultAssertion {
                message: context.failure_message(
                    "action result to be null",
                    &format!("instead received {}", crate::reflection::describe(value)),
                ),
            }),
            _ => Ok(self.parent),
        }
    }

    /// `OkResult` or `OkObjectResult`
    pub fn ok(self) -> MvcTestResult<OkTestBuilder<P>> {
        self.expect("OkResult", |result| matches!(result, ActionResult::Ok(_)))?;
        Ok(OkTestBuilder::new(self.parent))
    }

    /// `JsonResult`
    pub fn json(self) -> MvcTestResult<JsonTestBuilder<P>> {
        self.expect("JsonResult", |result| matches!(result, ActionResult::Json(_)))?;
        Ok(JsonTestBuilder::new(self.parent))
    }

    /// `ViewResult`
    pub fn view(self) -> MvcTestResult<ViewTestBuilder<P>> {
        self.expect("ViewResult", |result| matches!(result, ActionResult::View(_)))?;
        Ok(ViewTestBuilder::new(self.parent, false))
    }

    /// `PartialViewResult`
    pub fn partial_view(self) -> MvcTestResult<ViewTestBuilder<P>> {
        self.expect("PartialViewResult", |result| matches!(result, ActionResult::PartialView(_)))?;
        Ok(ViewTestBuilder::new(self.parent, true))
    }

    /// `ContentResult`
    pub fn content(self) -> MvcTestResult<ContentTestBuilder<P>> {
        self.expect("ContentResult", |result| matches!(result, ActionResult::Content(_)))?;
        Ok(ContentTestBuilder::new(self.parent))
    }

    /// Any redirect: URL, local URL, action or route
    pub fn redirect(self) -> MvcTestResult<RedirectTestBuilder<P>> {
        self.expect("RedirectResult", |result| {
            matches!(
                result,
                ActionResult::Redirect(_) | ActionResult::RedirectToAction(_) | ActionResult::RedirectToRoute(_)
            )
        })?;
        Ok(RedirectTestBuilder::new(self.parent))
    }

    /// Any created result: at a location, an action or a route
    pub fn created(self) -> MvcTestResult<CreatedTestBuilder<P>> {
        self.expect("CreatedResult", |result| {
            matches!(
                result,
                ActionResult::Created(_) | ActionResult::CreatedAtAction(_) | ActionResult::CreatedAtRoute(_)
            )
        })?;
        Ok(CreatedTestBuilder::new(self.parent))
    }

    /// Any result whose effective status code is `expected`.
    ///
    /// # Errors
    ///
    /// `HttpStatusCodeAssertion` on a different status code.
    pub fn status_code(self, expected: StatusCode) -> MvcTestResult<StatusCodeTestBuilder<P>> {
        let result = returned_action_result(&self.parent)?;
        verify_status_code(&self.parent.failure_context(), "action result", expected, result.status_code())?;
        Ok(StatusCodeTestBuilder::new(self.parent))
    }

    /// `NotFoundResult` or `NotFoundObjectResult`
    pub fn not_found(self) -> MvcTestResult<StatusCodeTestBuilder<P>> {
        self.expect("NotFoundResult", |result| matches!(result, ActionResult::NotFound(_)))?;
        Ok(StatusCodeTestBuilder::new(self.parent))
    }

    /// `BadRequestResult` or `BadRequestObjectResult`
    pub fn bad_request(self) -> MvcTestResult<StatusCodeTestBuilder<P>> {
        self.expect("BadRequestResult", |result| matches!(result, ActionResult::BadRequest(_)))?;
        Ok(StatusCodeTestBuilder::new(self.parent))
    }

    /// `NoContentResult`
    pub fn no_content(self) -> MvcTestResult<P> {
        self.expect("NoContentResult", |result| matches!(result, ActionResult::NoContent))?;
        Ok(self.parent)
    }

    /// `UnauthorizedResult`
    pub fn unauthorized(self) -> MvcTestResult<P> {
        self.expect("UnauthorizedResult", |result| matches!(result, ActionResult::Unauthorized))?;
        Ok(self.parent)
    }

    /// `ForbidResult`
    pub fn forbid(self) -> MvcTestResult<P> {
        self.expect("ForbidResult", |result| matches!(result, ActionResult::Forbid(_)))?;
        Ok(self.parent)
    }

    /// `EmptyResult`
    pub fn empty(self) -> MvcTestResult<P> {
        self.expect("EmptyResult", |result| matches!(result, ActionResult::Empty))?;
        Ok(self.parent)
    }

    fn expect(&self, expected: &str, accepts: impl FnOnce(&ActionResult) -> bool) -> MvcTestResult<()> {
        let result = returned_action_result(&self.parent)?;
        if accepts(result) {
            Ok(())
        } else {
            Err(unexpected_result(&self.parent, expected, result))
        }
    }
}

impl<P: fmt::Debug> fmt::Debug for ShouldReturnTestBuilder<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShouldReturnTestBuilder").field("parent", &self.parent).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::invoked;
    use crate::mvc::results::{ActionResult, ObjectResult, ViewResult};
    use http::StatusCode;

    #[test]
    fn test_value_equality() {
        assert!(invoked(vec![1, 2, 3]).should_return().unwrap().value(vec![1, 2, 3]).is_ok());
        let error = invoked(vec![1, 2, 3]).should_return().unwrap().value(vec![1, 2, 4]).unwrap_err();
        assert_eq!(
            error.to_string(),
            "When calling index action in HomeController expected action result to be the given model, but in fact it was different. Difference occurs at '[2]'. Expected a value of '4', but in fact it was '3'."
        );
    }

    #[test]
    fn test_value_matching() {
        assert!(invoked(7_i32).should_return().unwrap().value_matching(|value| *value > 5).is_ok());
        assert!(invoked(3_i32).should_return().unwrap().value_matching(|value| *value > 5).is_err());
    }

    #[test]
    fn test_result_of_type() {
        assert!(invoked(String::from("x")).should_return().unwrap().result_of_type::<String>().is_ok());
        let error = invoked(1_u8).should_return().unwrap().result_of_type::<String>().unwrap_err();
        assert_eq!(
            error.to_string(),
            "When calling index action in HomeController expected action result to be of String type, but instead received u8."
        );
    }

    #[test]
    fn test_kind_mismatch() {
        let error = invoked(ActionResult::View(ViewResult::new())).should_return().unwrap().ok().unwrap_err();
        assert_eq!(
            error.to_string(),
            "When calling index action in HomeController expected action result to be OkResult, but instead received ViewResult."
        );
    }

    #[test]
    fn test_non_action_result() {
        let error = invoked(5_i32).should_return().unwrap().ok().unwrap_err();
        assert_eq!(
            error.to_string(),
            "When calling index action in HomeController expected action result, but instead received i32."
        );
    }

    #[test]
    fn test_result_inside_ok_variant() {
        let returned: Result<ActionResult, String> = Ok(ActionResult::NoContent);
        assert!(invoked(returned).should_return().unwrap().no_content().is_ok());
    }

    #[test]
    fn test_status_code() {
        let result = ActionResult::NotFound(ObjectResult::default());
        assert!(invoked(result).should_return().unwrap().status_code(StatusCode::NOT_FOUND).is_ok());
        let error = invoked(ActionResult::Ok(ObjectResult::default()))
            .should_return()
            .unwrap()
            .status_code(StatusCode::NOT_FOUND)
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "When calling index action in HomeController expected action result to have 404 (Not Found) status code, but instead received 200 (OK)."
        );
    }

    #[test]
    fn test_null() {
        assert!(invoked(None::<i32>).should_return().unwrap().null().is_ok());
        assert!(invoked(Some(1)).should_return().unwrap().null().is_err());
        assert!(invoked(()).should_return().unwrap().null().is_ok());
    }
}
