//! Controller trait and controller context.
//!
//! Controllers are usually declared with the `#[controller]` attribute on
//! their inherent impl block, which implements [`Controller`] from the
//! methods and `#[mvc(...)]` attributes found there.

use super::attributes::{ActionAttribute, ActionDescriptor};
use super::http::{HttpContext, HttpRequest};
use super::model_state::ModelStateDictionary;
use super::results::{
    ActionResult, ContentResult, CreatedResult, ForbidResult, JsonResult, JsonSerializerSettings, ObjectResult,
    RedirectResult, RedirectToActionResult, RedirectToRouteResult, RouteValues, ViewResult,
};
use super::routing::RouteData;
use super::state::{Session, TempData};
use super::user::ClaimsPrincipal;
use crate::reflection::cache::{self, CacheKind};
use crate::reflection::{Constructor, Reflect};
use http::StatusCode;
use std::any::TypeId;
use std::sync::Arc;

/// Everything a controller knows about the current action invocation
#[derive(Debug, Clone, Default)]
pub struct ControllerContext {
    /// HTTP context
    pub http_context: HttpContext,
    /// Route data
    pub route_data: RouteData,
    /// Model state
    pub model_state: ModelStateDictionary,
    /// Temp data
    pub temp_data: TempData,
    /// Descriptor of the action being invoked
    pub action_descriptor: Option<ActionDescriptor>,
}

impl ControllerContext {
    /// Fresh context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// A controller under test.
pub trait Controller: Sized + 'static {
    /// Context of the current invocation
    fn controller_context(&self) -> &ControllerContext;

    /// Mutable context of the current invocation
    fn controller_context_mut(&mut self) -> &mut ControllerContext;

    /// Ways to build the controller
    fn constructors() -> Vec<Constructor<Self>>;

    /// Controller-level attributes
    fn attributes() -> Vec<ActionAttribute> {
        Vec::new()
    }

    /// Action descriptors
    fn actions() -> Vec<ActionDescriptor> {
        Vec::new()
    }

    /// HTTP context
    fn http_context(&self) -> &HttpContext {
        &self.controller_context().http_context
    }

    /// Mutable HTTP context
    fn http_context_mut(&mut self) -> &mut HttpContext {
        &mut self.controller_context_mut().http_context
    }

    /// Current request
    fn request(&self) -> &HttpRequest {
        &self.http_context().request
    }

    /// Model state
    fn model_state(&self) -> &ModelStateDictionary {
        &self.controller_context().model_state
    }

    /// Mutable model state
    fn model_state_mut(&mut self) -> &mut ModelStateDictionary {
        &mut self.controller_context_mut().model_state
    }

    /// Session
    fn session(&self) -> &Session {
        &self.http_context().session
    }

    /// Temp data
    fn temp_data(&self) -> &TempData {
        &self.controller_context().temp_data
    }

    /// Current user
    fn user(&self) -> &ClaimsPrincipal {
        &self.http_context().user
    }

    /// Route data
    fn route_data(&self) -> &RouteData {
        &self.controller_context().route_data
    }

    /// 200 without a value
    fn ok(&self) -> ActionResult {
        ActionResult::Ok(ObjectResult::default())
    }

    /// 200 with a value
    fn ok_with<T: Reflect>(&self, value: T) -> ActionResult {
        ActionResult::Ok(ObjectResult::default().with_value(value))
    }

    /// JSON result
    fn json<T: Reflect>(&self, value: T) -> ActionResult {
        ActionResult::Json(JsonResult::new(value))
    }

    /// JSON result with serializer settings
    fn json_with_settings<T: Reflect>(&self, value: T, settings: JsonSerializerSettings) -> ActionResult {
        ActionResult::Json(JsonResult::new(value).with_serializer_settings(settings))
    }

    /// Default view
    fn view(&self) -> ActionResult {
        ActionResult::View(ViewResult::new())
    }

    /// Named view
    fn view_named(&self, name: &str) -> ActionResult {
        ActionResult::View(ViewResult::new().with_name(name))
    }

    /// Default view with a model
    fn view_with<T: Reflect>(&self, model: T) -> ActionResult {
        ActionResult::View(ViewResult::new().with_model(model))
    }

    /// Default partial view
    fn partial_view(&self) -> ActionResult {
        ActionResult::PartialView(ViewResult::new())
    }

    /// Named partial view with a model
    fn partial_view_with<T: Reflect>(&self, name: &str, model: T) -> ActionResult {
        ActionResult::PartialView(ViewResult::new().with_name(name).with_model(model))
    }

    /// Plain text content
    fn content(&self, content: &str) -> ActionResult {
        self.content_with_type(content, "text/plain; charset=utf-8")
    }

    /// Content with a content type
    fn content_with_type(&self, content: &str, content_type: &str) -> ActionResult {
        ActionResult::Content(ContentResult {
            content: Some(content.to_string()),
            content_type: Some(content_type.to_string()),
            status_code: None,
        })
    }

    /// 302 to a URL
    fn redirect(&self, url: &str) -> ActionResult {
        ActionResult::Redirect(RedirectResult {
            url: url.to_string(),
            ..RedirectResult::default()
        })
    }

    /// 301 to a URL
    fn redirect_permanent(&self, url: &str) -> ActionResult {
        ActionResult::Redirect(RedirectResult {
            url: url.to_string(),
            permanent: true,
            ..RedirectResult::default()
        })
    }

    /// 302 to a local URL
    fn local_redirect(&self, url: &str) -> ActionResult {
        ActionResult::Redirect(RedirectResult {
            url: url.to_string(),
            local: true,
            ..RedirectResult::default()
        })
    }

    /// Redirect to an action of this controller
    fn redirect_to_action(&self, action_name: &str) -> ActionResult {
        ActionResult::RedirectToAction(RedirectToActionResult {
            action_name: Some(action_name.to_string()),
            ..RedirectToActionResult::default()
        })
    }

    /// Redirect to an action of another controller
    fn redirect_to_action_in(&self, action_name: &str, controller_name: &str, route_values: RouteValues) -> ActionResult {
        ActionResult::RedirectToAction(RedirectToActionResult {
            action_name: Some(action_name.to_string()),
            controller_name: Some(controller_name.to_string()),
            route_values,
            ..RedirectToActionResult::default()
        })
    }

    /// Redirect to a named route
    fn redirect_to_route(&self, route_name: &str, route_values: RouteValues) -> ActionResult {
        ActionResult::RedirectToRoute(RedirectToRouteResult {
            route_name: Some(route_name.to_string()),
            route_values,
            ..RedirectToRouteResult::default()
        })
    }

    /// 201 at a URL
    fn created<T: Reflect>(&self, location: &str, value: T) -> ActionResult {
        ActionResult::Created(CreatedResult::at_location(location, value))
    }

    /// 201 at an action
    fn created_at_action<T: Reflect>(&self, action_name: &str, route_values: RouteValues, value: T) -> ActionResult {
        ActionResult::CreatedAtAction(CreatedResult::at_action(action_name, route_values, value))
    }

    /// 201 at a named route
    fn created_at_route<T: Reflect>(&self, route_name: &str, route_values: RouteValues, value: T) -> ActionResult {
        ActionResult::CreatedAtRoute(CreatedResult::at_route(route_name, route_values, value))
    }

    /// Arbitrary status code
    fn status_code(&self, status_code: StatusCode) -> ActionResult {
        ActionResult::StatusCode(ObjectResult::new(status_code))
    }

    /// Arbitrary status code with a value
    fn status_code_with<T: Reflect>(&self, status_code: StatusCode, value: T) -> ActionResult {
        ActionResult::StatusCode(ObjectResult::new(status_code).with_value(value))
    }

    /// 404
    fn not_found(&self) -> ActionResult {
        ActionResult::NotFound(ObjectResult::default())
    }

    /// 404 with a value
    fn not_found_with<T: Reflect>(&self, value: T) -> ActionResult {
        ActionResult::NotFound(ObjectResult::default().with_value(value))
    }

    /// 400
    fn bad_request(&self) -> ActionResult {
        ActionResult::BadRequest(ObjectResult::default())
    }

    /// 400 with a value
    fn bad_request_with<T: Reflect>(&self, value: T) -> ActionResult {
        ActionResult::BadRequest(ObjectResult::default().with_value(value))
    }

    /// 400 carrying the model state errors by key
    fn bad_request_with_model_state(&self) -> ActionResult {
        ActionResult::BadRequest(ObjectResult::default().with_value(self.model_state().to_error_map()))
    }

    /// 204
    fn no_content(&self) -> ActionResult {
        ActionResult::NoContent
    }

    /// 401
    fn unauthorized(&self) -> ActionResult {
        ActionResult::Unauthorized
    }

    /// 403
    fn forbid(&self) -> ActionResult {
        ActionResult::Forbid(ForbidResult::default())
    }
}

/// Friendly name of a controller type, cached
#[must_use]
pub fn controller_name<C: Controller>() -> String {
    cache::friendly_name(TypeId::of::<C>(), std::any::type_name::<C>())
}

/// Cached constructors of a controller
#[must_use]
pub fn cached_constructors<C: Controller>() -> Arc<Vec<Constructor<C>>> {
    cache::get_or_insert(CacheKind::Constructors, TypeId::of::<C>(), C::constructors)
}

/// Cached action descriptors of a controller
#[must_use]
pub fn cached_actions<C: Controller>() -> Arc<Vec<ActionDescriptor>> {
    cache::get_or_insert(CacheKind::Actions, TypeId::of::<C>(), C::actions)
}

/// Cached controller-level attributes
#[must_use]
pub fn cached_attributes<C: Controller>() -> Arc<Vec<ActionAttribute>> {
    cache::get_or_insert(CacheKind::Attributes, TypeId::of::<C>(), C::attributes)
}

/// Descriptor of the action implemented by `method_name`
#[must_use]
pub fn find_action<C: Controller>(method_name: &str) -> Option<ActionDescriptor> {
    cached_actions::<C>()
        .iter()
        .find(|action| action.method_name == method_name)
        .cloned()
}
