//! Redirect result assertions.

use super::{returned_action_result, unexpected_result, verify_route_values, InvokedAction};
use crate::mvc::results::{route_values, ActionResult, RouteValues};
use crate::result::{MvcTestError, MvcTestResult};
use std::fmt;

fn redirect_error(message: String) -> MvcTestError {
    MvcTestError::RedirectResultAssertion { message }
}

/// The parts every redirect shares
struct Redirect<'a> {
    url: Option<&'a str>,
    action_name: Option<&'a str>,
    controller_name: Option<&'a str>,
    route_name: Option<&'a str>,
    route_values: Option<&'a RouteValues>,
    permanent: bool,
    preserve_method: bool,
    local: bool,
}

impl<'a> Redirect<'a> {
    fn of(result: &'a ActionResult) -> Option<Self> {
        let redirect = match result {
            ActionResult::Redirect(result) => Self {
                url: Some(&result.url),
                action_name: None,
                controller_name: None,
                route_name: None,
                route_values: None,
                permanent: result.permanent,
                preserve_method: result.preserve_method,
                local: result.local,
            },
            ActionResult::RedirectToAction(result) => Self {
                url: None,
                action_name: result.action_name.as_deref(),
                controller_name: result.controller_name.as_deref(),
                route_name: None,
                route_values: Some(&result.route_values),
                permanent: result.permanent,
                preserve_method: result.preserve_method,
                local: true,
            },
            ActionResult::RedirectToRoute(result) => Self {
                url: None,
                action_name: None,
                controller_name: None,
                route_name: result.route_name.as_deref(),
                route_values: Some(&result.route_values),
                permanent: result.permanent,
                preserve_method: result.preserve_method,
                local: true,
            },
            _ => return None,
        };
        Some(redirect)
    }
}

/// `redirect()` assertions
pub struct RedirectTestBuilder<P> {
    parent: P,
}

impl<P: InvokedAction> RedirectTestBuilder<P> {
    pub(crate) fn new(parent: P) -> Self {
        Self { parent }
    }

    fn redirect(&self) -> MvcTestResult<Redirect<'_>> {
        let result = returned_action_result(&self.parent)?;
        Redirect::of(result).ok_or_else(|| unexpected_result(&self.parent, "RedirectResult", result))
    }

    fn expect_name(self, part: &str, expected: &str, actual: Option<&str>) -> MvcTestResult<Self> {
        if actual == Some(expected) {
            return Ok(self);
        }
        Err(redirect_error(self.parent.failure_context().message(
            &format!("redirect result to have '{expected}' {part}"),
            &format!("in fact it was '{}'", actual.unwrap_or_default()),
        )))
    }

    /// Redirects to `url`
    pub fn to_url(self, url: &str) -> MvcTestResult<Self> {
        let actual = self.redirect()?.url.map(ToString::to_string);
        self.expect_name("URL", url, actual.as_deref())
    }

    /// Redirects to the `action` action
    pub fn to_action(self, action: &str) -> MvcTestResult<Self> {
        let actual = self.redirect()?.action_name.map(ToString::to_string);
        self.expect_name("action name", action, actual.as_deref())
    }

    /// Redirects to an action in `controller`
    pub fn to_controller(self, controller: &str) -> MvcTestResult<Self> {
        let actual = self.redirect()?.controller_name.map(ToString::to_string);
        self.expect_name("controller name", controller, actual.as_deref())
    }

    /// Redirects to the route named `route`
    pub fn to_route(self, route: &str) -> MvcTestResult<Self> {
        let actual = self.redirect()?.route_name.map(ToString::to_string);
        self.expect_name("route name", route, actual.as_deref())
    }

    /// 301 or 308 rather than 302 or 307
    pub fn permanent(self) -> MvcTestResult<Self> {
        self.expect_flag("to be permanent", |redirect| redirect.permanent)
    }

    /// 307 or 308, keeping the request method
    pub fn preserving_method(self) -> MvcTestResult<Self> {
        self.expect_flag("to preserve the request method", |redirect| redirect.preserve_method)
    }

    /// Local redirect, including action and route redirects
    pub fn local(self) -> MvcTestResult<Self> {
        self.expect_flag("to be local", |redirect| redirect.local)
    }

    fn expect_flag(self, expectation: &str, flag: impl FnOnce(&Redirect<'_>) -> bool) -> MvcTestResult<Self> {
        if flag(&self.redirect()?) {
            return Ok(self);
        }
        Err(redirect_error(self.parent.failure_context().message(
            &format!("redirect result {expectation}"),
            "in fact it was not",
        )))
    }

    /// One route value
    pub fn with_route_value(self, key: &str, value: impl ToString) -> MvcTestResult<Self> {
        let expected = value.to_string();
        let actual = self
            .redirect()?
            .route_values
            .and_then(|values| values.get(key))
            .cloned();
        match actual {
            Some(found) if found == expected => Ok(self),
            Some(found) => Err(redirect_error(self.parent.failure_context().message(
                &format!("redirect result route values to contain '{key}' with '{expected}' value"),
                &format!("in fact found '{found}'"),
            ))),
            None => Err(redirect_error(self.parent.failure_context().message(
                &format!("redirect result route values to contain '{key}' key"),
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
        let actual = self.redirect()?.route_values.cloned().unwrap_or_default();
        verify_route_values(
            &self.parent.failure_context(),
            "redirect result",
            &expected,
            &actual,
            redirect_error,
        )?;
        Ok(self)
    }

    /// Back to the invoked action
    pub fn and_also(self) -> P {
        self.parent
    }
}

impl<P: fmt::Debug> fmt::Debug for RedirectTestBuilder<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectTestBuilder").field("parent", &self.parent).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::invoked;
    use crate::mvc::results::{route_values, ActionResult, RedirectResult, RedirectToActionResult};

    #[test]
    fn test_redirect_url() {
        let result = ActionResult::Redirect(RedirectResult {
            url: "/home".to_string(),
            permanent: true,
            ..RedirectResult::default()
        });
        let builder = invoked(result).should_return().unwrap().redirect().unwrap();
        let builder = builder.permanent().unwrap();
        let error = builder.to_url("/login").unwrap_err();
        assert_eq!(
            error.to_string(),
            "When calling index action in HomeController expected redirect result to have '/login' URL, but in fact it was '/home'."
        );
    }

    #[test]
    fn test_not_preserving_method() {
        let result = ActionResult::Redirect(RedirectResult {
            url: "/home".to_string(),
            ..RedirectResult::default()
        });
        let error = invoked(result)
            .should_return()
            .unwrap()
            .redirect()
            .unwrap()
            .preserving_method()
            .unwrap_err();
        assert!(error.to_string().ends_with("expected redirect result to preserve the request method, but in fact it was not."));
    }

    #[test]
    fn test_redirect_to_action() {
        let result = ActionResult::RedirectToAction(RedirectToActionResult {
            action_name: Some("details".to_string()),
            controller_name: Some("Articles".to_string()),
            route_values: route_values([("id", 7)]),
            ..RedirectToActionResult::default()
        });
        let builder = invoked(result).should_return().unwrap().redirect().unwrap();
        let builder = builder.to_action("details").unwrap().to_controller("Articles").unwrap();
        let builder = builder.with_route_value("id", 7).unwrap();
        assert!(builder.with_route_values([("id", 7)]).is_ok());
    }

    #[test]
    fn test_route_value_missing() {
        let result = ActionResult::RedirectToAction(RedirectToActionResult {
            action_name: Some("details".to_string()),
            ..RedirectToActionResult::default()
        });
        let error = invoked(result)
            .should_return()
            .unwrap()
            .redirect()
            .unwrap()
            .with_route_value("id", 1)
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "When calling index action in HomeController expected redirect result route values to contain 'id' key, but such was not found."
        );
    }
}
