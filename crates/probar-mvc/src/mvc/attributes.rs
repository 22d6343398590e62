//! Controller and action attributes plus action descriptors.

use http::Method;
use std::fmt;

/// Attribute applied to a controller or an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionAttribute {
    /// Restricts the action to an HTTP method
    HttpMethod(Method),
    /// Attribute route template
    Route {
        /// Template, e.g. `api/[controller]/{id}`
        template: String,
        /// Route name
        name: Option<String>,
    },
    /// Overrides the action name
    ActionName(String),
    /// Requires an authenticated user
    Authorize {
        /// Comma-separated roles
        roles: Option<String>,
        /// Policy name
        policy: Option<String>,
    },
    /// Lifts authorization
    AllowAnonymous,
    /// Marks a public method as not an action
    NonAction,
    /// Requires an anti-forgery token
    ValidateAntiForgeryToken,
    /// Places the controller in an area
    Area(String),
    /// Any other named attribute
    Custom(String),
}

impl ActionAttribute {
    /// Route attribute without a name
    #[must_use]
    pub fn route(template: impl Into<String>) -> Self {
        Self::Route {
            template: template.into(),
            name: None,
        }
    }

    /// Authorize attribute without roles or policy
    #[must_use]
    pub const fn authorize() -> Self {
        Self::Authorize {
            roles: None,
            policy: None,
        }
    }

    /// Authorize attribute restricted to roles
    #[must_use]
    pub fn authorize_roles(roles: impl Into<String>) -> Self {
        Self::Authorize {
            roles: Some(roles.into()),
            policy: None,
        }
    }

    /// Attribute name as the framework spells it
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::HttpMethod(method) => {
                let lower = method.as_str().to_ascii_lowercase();
                let mut chars = lower.chars();
                let capitalized: String = chars
                    .next()
                    .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
                    .unwrap_or_default();
                format!("Http{capitalized}Attribute")
            }
            Self::Route { .. } => "RouteAttribute".to_string(),
            Self::ActionName(_) => "ActionNameAttribute".to_string(),
            Self::Authorize { .. } => "AuthorizeAttribute".to_string(),
            Self::AllowAnonymous => "AllowAnonymousAttribute".to_string(),
            Self::NonAction => "NonActionAttribute".to_string(),
            Self::ValidateAntiForgeryToken => "ValidateAntiForgeryTokenAttribute".to_string(),
            Self::Area(_) => "AreaAttribute".to_string(),
            Self::Custom(name) => name.clone(),
        }
    }
}

impl fmt::Display for ActionAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// A parameter of an action method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionParameter {
    /// Parameter name
    pub name: &'static str,
    /// Declared type, as written in source
    pub type_name: &'static str,
}

/// Metadata of one action method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    /// Rust method name
    pub method_name: &'static str,
    /// Action name used by routing and messages
    pub action_name: String,
    /// Parameters in declaration order, excluding the receiver
    pub parameters: Vec<ActionParameter>,
    /// Attributes applied to the method
    pub attributes: Vec<ActionAttribute>,
    /// Whether the method is `async`
    pub is_async: bool,
}

impl ActionDescriptor {
    /// Descriptor whose action name is the method name
    #[must_use]
    pub fn new(method_name: &'static str) -> Self {
        Self {
            method_name,
            action_name: method_name.to_string(),
            parameters: Vec::new(),
            attributes: Vec::new(),
            is_async: false,
        }
    }

    /// Add a parameter
    #[must_use]
    pub fn with_parameter(mut self, name: &'static str, type_name: &'static str) -> Self {
        self.parameters.push(ActionParameter { name, type_name });
        self
    }

    /// Add an attribute; an `ActionName` attribute also renames the action
    #[must_use]
    pub fn with_attribute(mut self, attribute: ActionAttribute) -> Self {
        if let ActionAttribute::ActionName(name) = &attribute {
            self.action_name.clone_from(name);
        }
        self.attributes.push(attribute);
        self
    }

    /// Mark the method as `async`
    #[must_use]
    pub fn asynchronous(mut self) -> Self {
        self.is_async = true;
        self
    }

    /// HTTP methods the action is restricted to
    #[must_use]
    pub fn http_methods(&self) -> Vec<&Method> {
        self.attributes
            .iter()
            .filter_map(|attribute| match attribute {
                ActionAttribute::HttpMethod(method) => Some(method),
                _ => None,
            })
            .collect()
    }

    /// Attribute route templates
    #[must_use]
    pub fn route_templates(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter_map(|attribute| match attribute {
                ActionAttribute::Route { template, .. } => Some(template.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Name of the parameter at a position
    #[must_use]
    pub fn parameter_name(&self, position: usize) -> Option<&'static str> {
        self.parameters.get(position).map(|parameter| parameter.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_names() {
        assert_eq!(ActionAttribute::HttpMethod(Method::POST).name(), "HttpPostAttribute");
        assert_eq!(ActionAttribute::authorize().name(), "AuthorizeAttribute");
        assert_eq!(ActionAttribute::Custom("CacheAttribute".into()).to_string(), "CacheAttribute");
    }

    #[test]
    fn test_action_name_attribute_renames() {
        let descriptor = ActionDescriptor::new("index")
            .with_attribute(ActionAttribute::ActionName("Home".into()))
            .with_attribute(ActionAttribute::HttpMethod(Method::GET))
            .with_attribute(ActionAttribute::route("home/{id}"))
            .with_parameter("id", "u32");
        assert_eq!(descriptor.action_name, "Home");
        assert_eq!(descriptor.http_methods(), [&Method::GET]);
        assert_eq!(descriptor.route_templates(), ["home/{id}"]);
        assert_eq!(descriptor.parameter_name(0), Some("id"));
    }
}
