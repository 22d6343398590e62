//! Test double of the host MVC framework.
//!
//! Controllers, action results, HTTP context, model state, session, temp data,
//! memory cache, routing and service registration: the object model the
//! builders drive and assert against.

pub mod attributes;
pub mod cache;
pub mod controller;
pub mod http;
pub mod model_state;
pub mod results;
pub mod routing;
pub mod services;
pub mod state;
pub mod user;
pub mod validation;

pub use attributes::{ActionAttribute, ActionDescriptor, ActionParameter};
pub use cache::{CacheEntry, CacheEntryOptions, CacheItemPriority, MemoryCache};
pub use controller::{Controller, ControllerContext};
pub use self::http::{HttpContext, HttpRequest, HttpResponse};
pub use model_state::{ModelError, ModelStateDictionary, ModelStateEntry};
pub use results::{
    route_values, ActionResult, ContentResult, CreatedResult, DefaultValueHandling, ForbidResult, Formatting,
    JsonResult, JsonSerializerSettings, NullValueHandling, ObjectResult, RedirectResult, RedirectToActionResult,
    RedirectToRouteResult, ReferenceLoopHandling, RouteValues, TypeNameHandling, ViewResult,
};
pub use routing::{RouteData, RouteTemplate, Router};
pub use services::{RequestServices, RequestServicesGuard, ServiceLifetime, ServiceProvider};
pub use state::{Session, TempData};
pub use user::{Claim, ClaimsIdentity, ClaimsPrincipal, UserBuilder};
pub use validation::{validate_object, ValidationContext};
