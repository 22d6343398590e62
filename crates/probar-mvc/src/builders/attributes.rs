//! Controller and action attribute assertions.

use super::verify_collection;
use crate::context::FailureContext;
use crate::mvc::attributes::ActionAttribute;
use crate::result::{MvcTestError, MvcTestResult};
use http::Method;

fn attribute_error(message: String) -> MvcTestError {
    MvcTestError::AttributeAssertion { message }
}

/// Checks over the attributes of a controller or an action
#[derive(Debug, Clone)]
pub struct AttributesTestBuilder {
    subject: &'static str,
    attributes: Vec<ActionAttribute>,
    failure: FailureContext,
}

impl AttributesTestBuilder {
    pub(crate) const fn new(subject: &'static str, attributes: Vec<ActionAttribute>, failure: FailureContext) -> Self {
        Self {
            subject,
            attributes,
            failure,
        }
    }

    /// Attributes under test
    #[must_use]
    pub fn attributes(&self) -> &[ActionAttribute] {
        &self.attributes
    }

    fn expect(self, attribute: &str, present: impl Fn(&ActionAttribute) -> bool) -> MvcTestResult<Self> {
        if self.attributes.iter().any(present) {
            return Ok(self);
        }
        Err(attribute_error(self.failure.message(
            &format!("{} to have {attribute}", self.subject),
            "in fact such was not found",
        )))
    }

    /// Same kind of attribute with a different value: report the value found
    fn expect_value(
        self,
        attribute: &str,
        expected: &str,
        value_of: impl Fn(&ActionAttribute) -> Option<Option<&str>>,
    ) -> MvcTestResult<Self> {
        let values: Vec<Option<&str>> = self.attributes.iter().filter_map(&value_of).collect();
        if values.iter().any(|value| *value == Some(expected)) {
            return Ok(self);
        }
        let actual = match values.first() {
            Some(value) => format!("in fact found '{}'", value.unwrap_or_default()),
            None => "in fact such was not found".to_string(),
        };
        Err(attribute_error(self.failure.message(
            &format!("{} to have {attribute} with '{expected}' value", self.subject),
            &actual,
        )))
    }

    /// An attribute with the given name, e.g. `AuthorizeAttribute`
    pub fn containing_attribute_named(self, name: &str) -> MvcTestResult<Self> {
        self.expect(name, |attribute| attribute.name() == name)
    }

    /// An attribute equal to `expected`
    pub fn containing_attribute(self, expected: &ActionAttribute) -> MvcTestResult<Self> {
        self.expect(&expected.name(), |attribute| attribute == expected)
    }

    /// The attributes satisfy `predicate`
    pub fn passing(self, predicate: impl FnOnce(&[ActionAttribute]) -> bool) -> MvcTestResult<Self> {
        if predicate(&self.attributes) {
            return Ok(self);
        }
        Err(attribute_error(self.failure.message(
            &format!("{} attributes to pass the given predicate", self.subject),
            "they failed",
        )))
    }

    /// Restricted to `method`
    pub fn restricting_for_http_method(self, method: Method) -> MvcTestResult<Self> {
        let expected = ActionAttribute::HttpMethod(method);
        self.expect(&expected.name(), |attribute| *attribute == expected)
    }

    /// Restricted to exactly these methods
    pub fn restricting_for_http_methods(self, methods: &[Method]) -> MvcTestResult<Self> {
        let actual: Vec<Method> = self
            .attributes
            .iter()
            .filter_map(|attribute| match attribute {
                ActionAttribute::HttpMethod(method) => Some(method.clone()),
                _ => None,
            })
            .collect();
        verify_collection(&self.failure, self.subject, "HTTP method", methods, &actual, attribute_error)?;
        Ok(self)
    }

    /// Attribute route with `template`
    pub fn specifying_route(self, template: &str) -> MvcTestResult<Self> {
        self.expect_value("RouteAttribute", template, |attribute| match attribute {
            ActionAttribute::Route { template, .. } => Some(Some(template.as_str())),
            _ => None,
        })
    }

    /// Attribute route named `name`
    pub fn specifying_route_name(self, name: &str) -> MvcTestResult<Self> {
        self.expect_value("RouteAttribute", name, |attribute| match attribute {
            ActionAttribute::Route { name, .. } => Some(name.as_deref()),
            _ => None,
        })
    }

    /// Requires an authenticated user
    pub fn restricting_for_authorized_requests(self) -> MvcTestResult<Self> {
        self.expect("AuthorizeAttribute", |attribute| {
            matches!(attribute, ActionAttribute::Authorize { .. })
        })
    }

    /// Requires one of `roles`, written as in the attribute
    pub fn restricting_for_authorized_requests_with_roles(self, roles: &str) -> MvcTestResult<Self> {
        self.expect_value("AuthorizeAttribute", roles, |attribute| match attribute {
            ActionAttribute::Authorize { roles, .. } => Some(roles.as_deref()),
            _ => None,
        })
    }

    /// Requires `policy`
    pub fn restricting_for_authorized_requests_with_policy(self, policy: &str) -> MvcTestResult<Self> {
        self.expect_value("AuthorizeAttribute", policy, |attribute| match attribute {
            ActionAttribute::Authorize { policy, .. } => Some(policy.as_deref()),
            _ => None,
        })
    }

    /// Lifts authorization
    pub fn allowing_anonymous_requests(self) -> MvcTestResult<Self> {
        self.expect("AllowAnonymousAttribute", |attribute| {
            matches!(attribute, ActionAttribute::AllowAnonymous)
        })
    }

    /// Renames the action to `name`
    pub fn changing_action_name_to(self, name: &str) -> MvcTestResult<Self> {
        self.expect_value("ActionNameAttribute", name, |attribute| match attribute {
            ActionAttribute::ActionName(name) => Some(Some(name.as_str())),
            _ => None,
        })
    }

    /// Requires an anti-forgery token
    pub fn validating_anti_forgery_token(self) -> MvcTestResult<Self> {
        self.expect("ValidateAntiForgeryTokenAttribute", |attribute| {
            matches!(attribute, ActionAttribute::ValidateAntiForgeryToken)
        })
    }

    /// Placed in `area`
    pub fn specifying_area(self, area: &str) -> MvcTestResult<Self> {
        self.expect_value("AreaAttribute", area, |attribute| match attribute {
            ActionAttribute::Area(area) => Some(Some(area.as_str())),
            _ => None,
        })
    }

    /// Marked as not an action
    pub fn disabling_action_call(self) -> MvcTestResult<Self> {
        self.expect("NonActionAttribute", |attribute| matches!(attribute, ActionAttribute::NonAction))
    }

    /// Exactly `count` attributes
    pub fn with_total_number_of(self, count: usize) -> MvcTestResult<Self> {
        if self.attributes.len() == count {
            return Ok(self);
        }
        let noun = if count == 1 { "attribute" } else { "attributes" };
        Err(attribute_error(self.failure.message(
            &format!("{} to have {count} {noun}", self.subject),
            &format!("in fact found {}", self.attributes.len()),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(attributes: Vec<ActionAttribute>) -> AttributesTestBuilder {
        AttributesTestBuilder::new(
            "action",
            attributes,
            FailureContext {
                controller: "AccountController".to_string(),
                action: Some("login".to_string()),
            },
        )
    }

    #[test]
    fn test_missing_attribute_message() {
        let error = action(vec![ActionAttribute::AllowAnonymous])
            .restricting_for_http_method(Method::POST)
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "When calling login action in AccountController expected action to have HttpPostAttribute, but in fact such was not found."
        );
    }

    #[test]
    fn test_chained_checks() {
        let builder = action(vec![
            ActionAttribute::HttpMethod(Method::POST),
            ActionAttribute::AllowAnonymous,
            ActionAttribute::ValidateAntiForgeryToken,
            ActionAttribute::route("account/login"),
        ]);
        let result = builder
            .restricting_for_http_method(Method::POST)
            .and_then(AttributesTestBuilder::allowing_anonymous_requests)
            .and_then(AttributesTestBuilder::validating_anti_forgery_token)
            .and_then(|builder| builder.specifying_route("account/login"))
            .and_then(|builder| builder.with_total_number_of(4));
        assert!(result.is_ok());
    }

    #[test]
    fn test_value_mismatch_reports_found_value() {
        let error = action(vec![ActionAttribute::authorize_roles("Admin")])
            .restricting_for_authorized_requests_with_roles("Editor")
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "When calling login action in AccountController expected action to have AuthorizeAttribute with 'Editor' value, but in fact found 'Admin'."
        );
    }

    #[test]
    fn test_http_methods_count_first() {
        let error = action(vec![ActionAttribute::HttpMethod(Method::GET)])
            .restricting_for_http_methods(&[Method::GET, Method::HEAD])
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "When calling login action in AccountController expected action to have 2 HTTP methods, but in fact found 1."
        );
    }

    #[test]
    fn test_total_number_controller_level() {
        let builder = AttributesTestBuilder::new(
            "controller",
            vec![ActionAttribute::authorize()],
            FailureContext {
                controller: "AccountController".to_string(),
                action: None,
            },
        );
        let error = builder.with_total_number_of(0).unwrap_err();
        assert_eq!(
            error.to_string(),
            "When testing AccountController expected controller to have 0 attributes, but in fact found 1."
        );
    }
}
