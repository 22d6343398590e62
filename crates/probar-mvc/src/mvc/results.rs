//! Action results produced by controller actions.

use crate::Reflect;
use http::StatusCode;
use std::collections::BTreeMap;

/// Route values attached to redirect and created results
pub type RouteValues = BTreeMap<String, String>;

/// Build route values from pairs
#[must_use]
pub fn route_values<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> RouteValues
where
    K: Into<String>,
    V: ToString,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.to_string()))
        .collect()
}

fn boxed<T: Reflect>(value: T) -> Box<dyn Reflect> {
    Box::new(value)
}

/// A result carrying an optional object value (Ok, NotFound, BadRequest, status)
#[derive(Debug, Default, Reflect)]
pub struct ObjectResult {
    /// Response value
    pub value: Option<Box<dyn Reflect>>,
    /// Status code, if set explicitly
    pub status_code: Option<StatusCode>,
    /// Content types restricting the response formatters
    pub content_types: Vec<String>,
    /// Output formatter names
    pub formatters: Vec<String>,
}

impl ObjectResult {
    /// Result with a status code and no value
    #[must_use]
    pub fn new(status_code: StatusCode) -> Self {
        Self {
            status_code: Some(status_code),
            ..Self::default()
        }
    }

    /// Set the value
    #[must_use]
    pub fn with_value<T: Reflect>(mut self, value: T) -> Self {
        self.value = Some(boxed(value));
        self
    }

    /// Add a content type
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_types.push(content_type.into());
        self
    }

    /// Add an output formatter
    #[must_use]
    pub fn with_formatter(mut self, formatter: impl Into<String>) -> Self {
        self.formatters.push(formatter.into());
        self
    }
}

/// Formatting of serialized JSON
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
pub enum Formatting {
    /// Compact output
    #[default]
    None,
    /// Indented output
    Indented,
}

/// Handling of null members
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
pub enum NullValueHandling {
    /// Write null members
    #[default]
    Include,
    /// Skip null members
    Ignore,
}

/// Handling of members holding their default value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
pub enum DefaultValueHandling {
    /// Write default members
    #[default]
    Include,
    /// Skip default members
    Ignore,
    /// Populate missing members with defaults
    Populate,
}

/// Handling of reference loops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
pub enum ReferenceLoopHandling {
    /// Fail on a loop
    #[default]
    Error,
    /// Skip looping references
    Ignore,
    /// Serialize looping references
    Serialize,
}

/// Emission of type names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
pub enum TypeNameHandling {
    /// Never
    #[default]
    None,
    /// For objects
    Objects,
    /// For arrays
    Arrays,
    /// Always
    All,
    /// When the declared type differs
    Auto,
}

/// Serializer settings attached to a JSON result
#[derive(Debug, Clone, PartialEq, Reflect)]
pub struct JsonSerializerSettings {
    /// Output formatting
    pub formatting: Formatting,
    /// Null member handling
    pub null_value_handling: NullValueHandling,
    /// Default member handling
    pub default_value_handling: DefaultValueHandling,
    /// Reference loop handling
    pub reference_loop_handling: ReferenceLoopHandling,
    /// Type name handling
    pub type_name_handling: TypeNameHandling,
    /// Date format string
    pub date_format_string: String,
    /// Culture name
    pub culture: String,
    /// Maximum nesting depth
    pub max_depth: Option<u32>,
    /// Whether trailing content is an error
    pub check_additional_content: bool,
}

impl Default for JsonSerializerSettings {
    fn default() -> Self {
        Self {
            formatting: Formatting::None,
            null_value_handling: NullValueHandling::Include,
            default_value_handling: DefaultValueHandling::Include,
            reference_loop_handling: ReferenceLoopHandling::Error,
            type_name_handling: TypeNameHandling::None,
            date_format_string: "yyyy'-'MM'-'dd'T'HH':'mm':'ss.FFFFFFFK".to_string(),
            culture: "invariant".to_string(),
            max_depth: None,
            check_additional_content: false,
        }
    }
}

/// JSON result
#[derive(Debug, Default, Reflect)]
pub struct JsonResult {
    /// Serialized value
    pub value: Option<Box<dyn Reflect>>,
    /// Serializer settings, when not the defaults
    pub serializer_settings: Option<JsonSerializerSettings>,
    /// Status code, if set explicitly
    pub status_code: Option<StatusCode>,
    /// Content type, if set explicitly
    pub content_type: Option<String>,
}

impl JsonResult {
    /// JSON result over a value
    #[must_use]
    pub fn new<T: Reflect>(value: T) -> Self {
        Self {
            value: Some(boxed(value)),
            ..Self::default()
        }
    }

    /// Set serializer settings
    #[must_use]
    pub fn with_serializer_settings(mut self, settings: JsonSerializerSettings) -> Self {
        self.serializer_settings = Some(settings);
        self
    }

    /// Set the status code
    #[must_use]
    pub fn with_status_code(mut self, status_code: StatusCode) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Set the content type
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// View or partial view result
#[derive(Debug, Default, Reflect)]
pub struct ViewResult {
    /// View name; `None` means the action's default view
    pub view_name: Option<String>,
    /// View model
    pub model: Option<Box<dyn Reflect>>,
    /// Status code, if set explicitly
    pub status_code: Option<StatusCode>,
    /// Content type, if set explicitly
    pub content_type: Option<String>,
}

impl ViewResult {
    /// Default view
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the view name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.view_name = Some(name.into());
        self
    }

    /// Set the model
    #[must_use]
    pub fn with_model<T: Reflect>(mut self, model: T) -> Self {
        self.model = Some(boxed(model));
        self
    }

    /// Set the status code
    #[must_use]
    pub fn with_status_code(mut self, status_code: StatusCode) -> Self {
        self.status_code = Some(status_code);
        self
    }
}

/// Text content result
#[derive(Debug, Clone, Default, PartialEq, Reflect)]
pub struct ContentResult {
    /// Response body
    pub content: Option<String>,
    /// Content type
    pub content_type: Option<String>,
    /// Status code, if set explicitly
    pub status_code: Option<StatusCode>,
}

/// Redirect to a URL
#[derive(Debug, Clone, Default, PartialEq, Eq, Reflect)]
pub struct RedirectResult {
    /// Target URL
    pub url: String,
    /// 301/308 instead of 302/307
    pub permanent: bool,
    /// 307/308 instead of 301/302
    pub preserve_method: bool,
    /// Restricted to local URLs
    pub local: bool,
}

/// Redirect to a controller action
#[derive(Debug, Clone, Default, PartialEq, Eq, Reflect)]
pub struct RedirectToActionResult {
    /// Target action; `None` means the current action
    pub action_name: Option<String>,
    /// Target controller; `None` means the current controller
    pub controller_name: Option<String>,
    /// Route values
    pub route_values: RouteValues,
    /// Permanent redirect
    pub permanent: bool,
    /// Preserve the request method
    pub preserve_method: bool,
    /// URL fragment
    pub fragment: Option<String>,
}

/// Redirect to a named route
#[derive(Debug, Clone, Default, PartialEq, Eq, Reflect)]
pub struct RedirectToRouteResult {
    /// Route name
    pub route_name: Option<String>,
    /// Route values
    pub route_values: RouteValues,
    /// Permanent redirect
    pub permanent: bool,
    /// Preserve the request method
    pub preserve_method: bool,
}

/// 201 Created result, located by URL, action or route
#[derive(Debug, Default, Reflect)]
pub struct CreatedResult {
    /// Location URL
    pub location: Option<String>,
    /// Action producing the location
    pub action_name: Option<String>,
    /// Controller producing the location
    pub controller_name: Option<String>,
    /// Route producing the location
    pub route_name: Option<String>,
    /// Route values
    pub route_values: RouteValues,
    /// Created value
    pub value: Option<Box<dyn Reflect>>,
    /// Content types
    pub content_types: Vec<String>,
    /// Output formatter names
    pub formatters: Vec<String>,
}

impl CreatedResult {
    /// Created at a URL
    #[must_use]
    pub fn at_location<T: Reflect>(location: impl Into<String>, value: T) -> Self {
        Self {
            location: Some(location.into()),
            value: Some(boxed(value)),
            ..Self::default()
        }
    }

    /// Created at an action
    #[must_use]
    pub fn at_action<T: Reflect>(action_name: impl Into<String>, route_values: RouteValues, value: T) -> Self {
        Self {
            action_name: Some(action_name.into()),
            route_values,
            value: Some(boxed(value)),
            ..Self::default()
        }
    }

    /// Created at a named route
    #[must_use]
    pub fn at_route<T: Reflect>(route_name: impl Into<String>, route_values: RouteValues, value: T) -> Self {
        Self {
            route_name: Some(route_name.into()),
            route_values,
            value: Some(boxed(value)),
            ..Self::default()
        }
    }

    /// Set the controller name
    #[must_use]
    pub fn with_controller_name(mut self, controller_name: impl Into<String>) -> Self {
        self.controller_name = Some(controller_name.into());
        self
    }

    /// Add a content type
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_types.push(content_type.into());
        self
    }

    /// Add an output formatter
    #[must_use]
    pub fn with_formatter(mut self, formatter: impl Into<String>) -> Self {
        self.formatters.push(formatter.into());
        self
    }
}

/// Forbid result
#[derive(Debug, Clone, Default, PartialEq, Eq, Reflect)]
pub struct ForbidResult {
    /// Authentication schemes challenged
    pub authentication_schemes: Vec<String>,
}

/// Outcome of a controller action.
#[derive(Debug, Reflect)]
pub enum ActionResult {
    /// 200, with or without a value
    Ok(ObjectResult),
    /// JSON payload
    Json(JsonResult),
    /// Rendered view
    View(ViewResult),
    /// Rendered partial view
    PartialView(ViewResult),
    /// Text content
    Content(ContentResult),
    /// Redirect to a URL
    Redirect(RedirectResult),
    /// Redirect to an action
    RedirectToAction(RedirectToActionResult),
    /// Redirect to a route
    RedirectToRoute(RedirectToRouteResult),
    /// Created at a URL
    Created(CreatedResult),
    /// Created at an action
    CreatedAtAction(CreatedResult),
    /// Created at a route
    CreatedAtRoute(CreatedResult),
    /// Arbitrary status code
    StatusCode(ObjectResult),
    /// 404
    NotFound(ObjectResult),
    /// 400
    BadRequest(ObjectResult),
    /// 204
    NoContent,
    /// 401
    Unauthorized,
    /// 403
    Forbid(ForbidResult),
    /// Nothing
    Empty,
}

impl ActionResult {
    /// Result type name as the framework spells it
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Ok(result) if result.value.is_some() => "OkObjectResult",
            Self::Ok(_) => "OkResult",
            Self::Json(_) => "JsonResult",
            Self::View(_) => "ViewResult",
            Self::PartialView(_) => "PartialViewResult",
            Self::Content(_) => "ContentResult",
            Self::Redirect(result) if result.local => "LocalRedirectResult",
            Self::Redirect(_) => "RedirectResult",
            Self::RedirectToAction(_) => "RedirectToActionResult",
            Self::RedirectToRoute(_) => "RedirectToRouteResult",
            Self::Created(_) => "CreatedResult",
            Self::CreatedAtAction(_) => "CreatedAtActionResult",
            Self::CreatedAtRoute(_) => "CreatedAtRouteResult",
            Self::StatusCode(result) if result.value.is_some() => "ObjectResult",
            Self::StatusCode(_) => "StatusCodeResult",
            Self::NotFound(result) if result.value.is_some() => "NotFoundObjectResult",
            Self::NotFound(_) => "NotFoundResult",
            Self::BadRequest(result) if result.value.is_some() => "BadRequestObjectResult",
            Self::BadRequest(_) => "BadRequestResult",
            Self::NoContent => "NoContentResult",
            Self::Unauthorized => "UnauthorizedResult",
            Self::Forbid(_) => "ForbidResult",
            Self::Empty => "EmptyResult",
        }
    }

    /// Effective status code
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Ok(result) => Some(result.status_code.unwrap_or(StatusCode::OK)),
            Self::StatusCode(result) => result.status_code,
            Self::NotFound(result) => Some(result.status_code.unwrap_or(StatusCode::NOT_FOUND)),
            Self::BadRequest(result) => Some(result.status_code.unwrap_or(StatusCode::BAD_REQUEST)),
            Self::Json(result) => result.status_code,
            Self::View(result) | Self::PartialView(result) => result.status_code,
            Self::Content(result) => result.status_code,
            Self::Created(_) | Self::CreatedAtAction(_) | Self::CreatedAtRoute(_) => Some(StatusCode::CREATED),
            Self::NoContent => Some(StatusCode::NO_CONTENT),
            Self::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            Self::Forbid(_) => Some(StatusCode::FORBIDDEN),
            Self::Redirect(result) => Some(redirect_status(result.permanent, result.preserve_method)),
            Self::RedirectToAction(result) => Some(redirect_status(result.permanent, result.preserve_method)),
            Self::RedirectToRoute(result) => Some(redirect_status(result.permanent, result.preserve_method)),
            Self::Empty => None,
        }
    }

    /// Object value carried by the result (model, JSON value, created value)
    #[must_use]
    pub fn value(&self) -> Option<&dyn Reflect> {
        match self {
            Self::Ok(result) | Self::StatusCode(result) | Self::NotFound(result) | Self::BadRequest(result) => {
                result.value.as_deref()
            }
            Self::Json(result) => result.value.as_deref(),
            Self::View(result) | Self::PartialView(result) => result.model.as_deref(),
            Self::Created(result) | Self::CreatedAtAction(result) | Self::CreatedAtRoute(result) => {
                result.value.as_deref()
            }
            _ => None,
        }
    }
}

const fn redirect_status(permanent: bool, preserve_method: bool) -> StatusCode {
    match (permanent, preserve_method) {
        (false, false) => StatusCode::FOUND,
        (true, false) => StatusCode::MOVED_PERMANENTLY,
        (false, true) => StatusCode::TEMPORARY_REDIRECT,
        (true, true) => StatusCode::PERMANENT_REDIRECT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::{are_deeply_equal, describe};

    #[test]
    fn test_kind_names() {
        assert_eq!(ActionResult::Ok(ObjectResult::default()).kind_name(), "OkResult");
        assert_eq!(
            ActionResult::Ok(ObjectResult::default().with_value(1)).kind_name(),
            "OkObjectResult"
        );
        assert_eq!(ActionResult::NoContent.kind_name(), "NoContentResult");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ActionResult::Ok(ObjectResult::default()).status_code(), Some(StatusCode::OK));
        assert_eq!(
            ActionResult::Redirect(RedirectResult {
                url: "/".into(),
                permanent: true,
                ..RedirectResult::default()
            })
            .status_code(),
            Some(StatusCode::MOVED_PERMANENTLY)
        );
        assert_eq!(ActionResult::Empty.status_code(), None);
    }

    #[test]
    fn test_value_access() {
        let result = ActionResult::Json(JsonResult::new(vec![1, 2]));
        let value = result.value().unwrap();
        assert!(are_deeply_equal(&vec![1, 2], value));
        assert!(ActionResult::NoContent.value().is_none());
    }

    #[test]
    fn test_route_values_builder() {
        let values = route_values([("id", 5)]);
        assert_eq!(values["id"], "5");
    }

    #[test]
    fn test_results_reflect_structurally() {
        let left = ActionResult::View(ViewResult::new().with_name("Index").with_model(3));
        let right = ActionResult::View(ViewResult::new().with_name("Index").with_model(3));
        assert!(are_deeply_equal(&left, &right));
        assert_eq!(describe(&Formatting::Indented), "Indented");
    }
}
