//! Test application: services, routes and configuration shared by tests.
//!
//! The current application is held per thread. [`TestApplicationBuilder::establish`]
//! installs one for the lifetime of the returned guard; everything else sees
//! a default application with the conventional route and no services.
//!
//! ```ignore
//! let _app = TestApplication::builder()
//!     .with_services(|services| {
//!         services.add_singleton(Clock::fixed());
//!     })
//!     .establish()?;
//! ```

use crate::mvc::routing::{Router, DEFAULT_ROUTE_NAME, DEFAULT_ROUTE_TEMPLATE};
use crate::mvc::services::ServiceProvider;
use crate::result::MvcTestResult;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use tracing::debug;

/// `General` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GeneralConfiguration {
    /// Hosting environment name
    pub environment: String,
    /// Application name
    pub application_name: Option<String>,
}

impl Default for GeneralConfiguration {
    fn default() -> Self {
        Self {
            environment: "Test".to_string(),
            application_name: None,
        }
    }
}

/// `Controllers` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ControllersConfiguration {
    /// Validate resolved action arguments into model state
    pub model_state_validation: bool,
    /// Resolve route values for every call
    pub resolve_route_values: bool,
}

impl Default for ControllersConfiguration {
    fn default() -> Self {
        Self {
            model_state_validation: true,
            resolve_route_values: false,
        }
    }
}

/// A conventional route in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouteConfiguration {
    /// Route name
    pub name: String,
    /// Route template
    pub template: String,
}

/// `Routing` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RoutingConfiguration {
    /// Conventional routes, replacing the default route when present
    pub routes: Vec<RouteConfiguration>,
}

/// Test configuration, usually read from a `testconfig.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TestConfiguration {
    /// General settings
    pub general: GeneralConfiguration,
    /// Controller test defaults
    pub controllers: ControllersConfiguration,
    /// Routes
    pub routing: RoutingConfiguration,
}

impl TestConfiguration {
    /// Parse from JSON text
    pub fn from_json_str(json: &str) -> MvcTestResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> MvcTestResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let configuration = Self::from_json_str(&json)?;
        debug!(path = %path.display(), "loaded test configuration");
        Ok(configuration)
    }

    /// Router built from the configured routes
    pub fn router(&self) -> MvcTestResult<Router> {
        if self.routing.routes.is_empty() {
            return Ok(Router::new());
        }
        let mut router = Router::empty();
        for route in &self.routing.routes {
            router.map_route(route.name.clone(), &route.template)?;
        }
        Ok(router)
    }
}

/// Services, routes and configuration shared by the tests of a thread.
#[derive(Debug, Clone)]
pub struct TestApplication {
    services: ServiceProvider,
    router: Router,
    configuration: TestConfiguration,
}

impl Default for TestApplication {
    fn default() -> Self {
        Self {
            services: ServiceProvider::new(),
            router: Router::new(),
            configuration: TestConfiguration::default(),
        }
    }
}

thread_local! {
    static CURRENT: RefCell<Option<Rc<TestApplication>>> = const { RefCell::new(None) };
}

impl TestApplication {
    /// Start building an application
    #[must_use]
    pub fn builder() -> TestApplicationBuilder {
        TestApplicationBuilder::default()
    }

    /// The application established on this thread, or the default one
    #[must_use]
    pub fn current() -> Rc<Self> {
        CURRENT.with(|current| current.borrow().clone()).unwrap_or_default()
    }

    /// Whether an application is established on this thread
    #[must_use]
    pub fn is_established() -> bool {
        CURRENT.with(|current| current.borrow().is_some())
    }

    /// Drop the established application, back to the default
    pub fn reset() {
        CURRENT.with(|current| current.borrow_mut().take());
    }

    /// Registered services
    #[must_use]
    pub fn services(&self) -> &ServiceProvider {
        &self.services
    }

    /// Routes
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Configuration
    #[must_use]
    pub fn configuration(&self) -> &TestConfiguration {
        &self.configuration
    }
}

/// Builder for [`TestApplication`]
#[derive(Debug, Default)]
pub struct TestApplicationBuilder {
    services: ServiceProvider,
    router: Option<Router>,
    configuration: TestConfiguration,
}

impl TestApplicationBuilder {
    /// Register services
    #[must_use]
    pub fn with_services(mut self, register: impl FnOnce(&mut ServiceProvider)) -> Self {
        register(&mut self.services);
        self
    }

    /// Configure routes, starting from the default conventional route
    pub fn with_routes(mut self, configure: impl FnOnce(&mut Router) -> MvcTestResult<()>) -> MvcTestResult<Self> {
        let mut router = self.router.take().unwrap_or_default();
        configure(&mut router)?;
        self.router = Some(router);
        Ok(self)
    }

    /// Apply a configuration; configured routes are used unless routes were
    /// set explicitly
    #[must_use]
    pub fn with_configuration(mut self, configuration: TestConfiguration) -> Self {
        self.configuration = configuration;
        self
    }

    /// Build without establishing
    pub fn build(self) -> MvcTestResult<TestApplication> {
        let router = match self.router {
            Some(router) => router,
            None => self.configuration.router()?,
        };
        Ok(TestApplication {
            services: self.services,
            router,
            configuration: self.configuration,
        })
    }

    /// Build and make current on this thread until the guard drops
    pub fn establish(self) -> MvcTestResult<TestApplicationGuard> {
        let application = Rc::new(self.build()?);
        debug!(
            services = application.services.len(),
            routes = application.router.routes().len(),
            environment = %application.configuration.general.environment,
            "test application established"
        );
        let previous = CURRENT.with(|current| current.borrow_mut().replace(application));
        Ok(TestApplicationGuard { previous })
    }
}

/// Restores the previously established application on drop
#[derive(Debug)]
#[must_use = "the application is reset when the guard is dropped"]
pub struct TestApplicationGuard {
    previous: Option<Rc<TestApplication>>,
}

impl Drop for TestApplicationGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}

/// Default route, as it would appear in configuration
#[must_use]
pub fn default_route_configuration() -> RouteConfiguration {
    RouteConfiguration {
        name: DEFAULT_ROUTE_NAME.to_string(),
        template: DEFAULT_ROUTE_TEMPLATE.to_string(),
    }
}
