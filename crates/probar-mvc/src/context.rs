//! Test context: the unit of work of one controller test.
//!
//! ## State machine
//!
//! ```text
//! Unconfigured -> Configuring -> ControllerBuilt -> Invoked
//!                                                \-> Faulted
//! ```
//!
//! The controller is built at most once. The outcome of an invocation is
//! written by a single [`TestContext::apply`], so assertions never observe an
//! action name without its result.

use crate::application::TestApplication;
use crate::expression::MethodCallInfo;
use crate::invoker::CaughtException;
use crate::mvc::cache::MemoryCache;
use crate::mvc::controller::{cached_constructors, controller_name, Controller, ControllerContext};
use crate::mvc::http::HttpContext;
use crate::mvc::model_state::ModelStateDictionary;
use crate::mvc::routing::RouteData;
use crate::mvc::services::ServiceProvider;
use crate::reflection::{create_instance, describe, DependencyBag, Reflect};
use crate::result::{MvcTestError, MvcTestResult};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Lifecycle state of a [`TestContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestState {
    /// Nothing configured yet
    Unconfigured,
    /// Setup calls recorded
    Configuring,
    /// Controller instance exists
    ControllerBuilt,
    /// Action returned normally
    Invoked,
    /// Action raised an exception
    Faulted,
}

/// A resolved call argument, as kept after invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArgument {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub type_name: String,
    /// Rendered value; `None` when absent or ignored
    pub value: Option<String>,
    /// Whether validation skipped the argument
    pub ignored: bool,
}

/// Outcome of one action call, applied to the context as a whole
#[derive(Debug)]
pub struct ActionInvocation {
    /// Action name
    pub action_name: String,
    /// Called method
    pub call: MethodCallInfo,
    /// Resolved arguments
    pub arguments: Vec<ResolvedArgument>,
    /// Returned value; `None` when faulted
    pub result: Option<Box<dyn Reflect>>,
    /// Exception that escaped the action
    pub exception: Option<CaughtException>,
}

/// Controller and action names for assertion failure messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureContext {
    /// Friendly controller name
    pub controller: String,
    /// Invoked action; `None` for controller-level assertions
    pub action: Option<String>,
}

impl FailureContext {
    /// "When calling {action} action in {controller} expected {expected}, but {actual}."
    #[must_use]
    pub fn message(&self, expected: &str, actual: &str) -> String {
        match &self.action {
            Some(action) => format!(
                "When calling {action} action in {} expected {expected}, but {actual}.",
                self.controller
            ),
            None => format!("When testing {} expected {expected}, but {actual}.", self.controller),
        }
    }
}

/// Everything known about one controller test.
pub struct TestContext<C> {
    application: Rc<TestApplication>,
    controller: Option<C>,
    dependencies: DependencyBag,
    services: ServiceProvider,
    controller_context: ControllerContext,
    memory_cache: MemoryCache,
    route_values: BTreeMap<String, String>,
    resolve_route_values: bool,
    model_state_validation: bool,
    setups: Vec<Box<dyn FnOnce(&mut C)>>,
    action_name: Option<String>,
    call: Option<MethodCallInfo>,
    arguments: Vec<ResolvedArgument>,
    action_result: Option<Box<dyn Reflect>>,
    caught_exception: Option<CaughtException>,
    state: TestState,
}

impl<C: Controller> TestContext<C> {
    /// Context bound to the current test application
    #[must_use]
    pub fn new() -> Self {
        let application = TestApplication::current();
        let memory_cache = MemoryCache::new();
        let mut services = ServiceProvider::new();
        services.add_singleton(memory_cache.clone());
        let controllers = &application.configuration().controllers;
        Self {
            resolve_route_values: controllers.resolve_route_values,
            model_state_validation: controllers.model_state_validation,
            application,
            controller: None,
            dependencies: DependencyBag::new(),
            services,
            controller_context: ControllerContext::default(),
            memory_cache,
            route_values: BTreeMap::new(),
            setups: Vec::new(),
            action_name: None,
            call: None,
            arguments: Vec::new(),
            action_result: None,
            caught_exception: None,
            state: TestState::Unconfigured,
        }
    }

    fn configuring(&mut self) {
        if self.state == TestState::Unconfigured {
            self.state = TestState::Configuring;
        }
    }

    /// Lifecycle state
    #[must_use]
    pub fn state(&self) -> TestState {
        self.state
    }

    /// Application the context was created under
    #[must_use]
    pub fn application(&self) -> &TestApplication {
        &self.application
    }

    /// Friendly controller type name
    #[must_use]
    pub fn controller_name(&self) -> String {
        controller_name::<C>()
    }

    /// Invoked action name; empty before invocation
    #[must_use]
    pub fn action_name(&self) -> &str {
        self.action_name.as_deref().unwrap_or_default()
    }

    /// Called method
    #[must_use]
    pub fn call(&self) -> Option<&MethodCallInfo> {
        self.call.as_ref()
    }

    /// Resolved arguments of the invoked action
    #[must_use]
    pub fn arguments(&self) -> &[ResolvedArgument] {
        &self.arguments
    }

    /// Value returned by the action
    #[must_use]
    pub fn action_result(&self) -> Option<&dyn Reflect> {
        self.action_result.as_deref()
    }

    /// Exception that escaped the action
    #[must_use]
    pub fn caught_exception(&self) -> Option<&CaughtException> {
        self.caught_exception.as_ref()
    }

    /// Controller instance, once built
    #[must_use]
    pub fn controller(&self) -> Option<&C> {
        self.controller.as_ref()
    }

    /// Explicitly registered dependencies
    #[must_use]
    pub fn dependencies(&self) -> &DependencyBag {
        &self.dependencies
    }

    /// Per-test services
    #[must_use]
    pub fn services(&self) -> &ServiceProvider {
        &self.services
    }

    /// Memory cache the controller sees
    #[must_use]
    pub fn memory_cache(&self) -> &MemoryCache {
        &self.memory_cache
    }

    /// Controller context: the controller's own once built, else the pending one
    #[must_use]
    pub fn controller_context(&self) -> &ControllerContext {
        self.controller
            .as_ref()
            .map_or(&self.controller_context, Controller::controller_context)
    }

    /// Mutable controller context
    pub fn controller_context_mut(&mut self) -> &mut ControllerContext {
        self.configuring();
        match self.controller.as_mut() {
            Some(controller) => controller.controller_context_mut(),
            None => &mut self.controller_context,
        }
    }

    /// HTTP context
    #[must_use]
    pub fn http_context(&self) -> &HttpContext {
        &self.controller_context().http_context
    }

    /// Model state
    #[must_use]
    pub fn model_state(&self) -> &ModelStateDictionary {
        &self.controller_context().model_state
    }

    /// Route data
    #[must_use]
    pub fn route_data(&self) -> &RouteData {
        &self.controller_context().route_data
    }

    /// Whether action arguments are validated into model state
    #[must_use]
    pub fn model_state_validation(&self) -> bool {
        self.model_state_validation
    }

    /// Whether route values are resolved for the call
    #[must_use]
    pub fn resolves_route_values(&self) -> bool {
        self.resolve_route_values
    }

    /// Explicit route values
    #[must_use]
    pub fn route_values(&self) -> &BTreeMap<String, String> {
        &self.route_values
    }

    /// Register a dependency for construction.
    ///
    /// # Errors
    ///
    /// `DuplicateDependency` when `T` is already registered; `InvalidState`
    /// once a controller instance exists.
    pub fn add_dependency<T: Clone + 'static>(&mut self, value: T) -> MvcTestResult<()> {
        self.ensure_no_instance::<T>()?;
        if !self.dependencies.try_insert(value.clone()) {
            return Err(self.duplicate::<T>());
        }
        if let Some(cache) = (&value as &dyn std::any::Any).downcast_ref::<MemoryCache>() {
            self.memory_cache = cache.clone();
            self.services.add_singleton(cache.clone());
        }
        self.configuring();
        Ok(())
    }

    /// Register `T` as an explicitly absent dependency
    pub fn add_absent_dependency<T: 'static>(&mut self) -> MvcTestResult<()> {
        self.ensure_no_instance::<T>()?;
        if !self.dependencies.try_insert_absent::<T>() {
            return Err(self.duplicate::<T>());
        }
        self.configuring();
        Ok(())
    }

    fn ensure_no_instance<T: 'static>(&self) -> MvcTestResult<()> {
        if self.controller.is_some() {
            return Err(MvcTestError::InvalidState {
                message: format!(
                    "dependency {} cannot be registered after the {} instance was provided",
                    crate::reflection::friendly_type_name::<T>(),
                    self.controller_name()
                ),
            });
        }
        Ok(())
    }

    fn duplicate<T: 'static>(&self) -> MvcTestError {
        MvcTestError::DuplicateDependency {
            dependency: crate::reflection::friendly_type_name::<T>(),
            controller: self.controller_name(),
        }
    }

    /// Per-test services
    pub fn services_mut(&mut self) -> &mut ServiceProvider {
        self.configuring();
        &mut self.services
    }

    /// Use an existing controller instance.
    ///
    /// # Errors
    ///
    /// `InvalidState` once dependencies are registered or an instance exists.
    pub fn set_controller(&mut self, mut controller: C) -> MvcTestResult<()> {
        if !self.dependencies.is_empty() {
            return Err(MvcTestError::InvalidState {
                message: format!(
                    "{} instance cannot be provided once dependencies are registered",
                    self.controller_name()
                ),
            });
        }
        if self.controller.is_some() {
            return Err(MvcTestError::InvalidState {
                message: format!("{} instance was already built", self.controller_name()),
            });
        }
        *controller.controller_context_mut() = std::mem::take(&mut self.controller_context);
        self.controller = Some(controller);
        self.state = TestState::ControllerBuilt;
        Ok(())
    }

    /// Replace the pending controller context
    pub fn set_controller_context(&mut self, context: ControllerContext) {
        *self.controller_context_mut() = context;
    }

    /// Explicit route value
    pub fn add_route_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.configuring();
        self.route_values.insert(key.into(), value.into());
    }

    /// Toggle route value resolution
    pub fn set_resolve_route_values(&mut self, enabled: bool) {
        self.configuring();
        self.resolve_route_values = enabled;
    }

    /// Toggle argument validation
    pub fn set_model_state_validation(&mut self, enabled: bool) {
        self.configuring();
        self.model_state_validation = enabled;
    }

    /// Run `setup` on the controller right before invocation
    pub fn add_setup(&mut self, setup: impl FnOnce(&mut C) + 'static) {
        self.configuring();
        self.setups.push(Box::new(setup));
    }

    pub(crate) fn take_setups(&mut self) -> Vec<Box<dyn FnOnce(&mut C)>> {
        std::mem::take(&mut self.setups)
    }

    /// Services a request of this test resolves from: the application's,
    /// overridden by the per-test ones
    #[must_use]
    pub fn request_services(&self) -> ServiceProvider {
        let mut services = self.application.services().clone();
        services.extend_from(&self.services);
        services
    }

    /// The controller, building it on first use.
    ///
    /// With registered dependencies only those are used; otherwise the
    /// constructor with the most resolvable parameters is picked from the
    /// request services.
    ///
    /// # Errors
    ///
    /// `NoMatchingConstructor` or `UnresolvedDependencies` when no
    /// constructor fits.
    pub fn controller_mut(&mut self) -> MvcTestResult<&mut C> {
        if self.controller.is_none() {
            let built = self.build_controller()?;
            self.controller = Some(built);
            self.state = TestState::ControllerBuilt;
        }
        self.controller.as_mut().ok_or_else(|| MvcTestError::InvalidState {
            message: "controller was not built".to_string(),
        })
    }

    fn build_controller(&mut self) -> MvcTestResult<C> {
        let constructors = cached_constructors::<C>();
        let controller = if self.dependencies.is_empty() {
            let services = self.request_services();
            services.construct(&constructors).ok_or_else(|| {
                let dependencies = constructors
                    .iter()
                    .min_by_key(|constructor| services.missing_for(constructor).len())
                    .map(|constructor| services.missing_for(constructor))
                    .unwrap_or_default();
                MvcTestError::UnresolvedDependencies {
                    controller: self.controller_name(),
                    dependencies,
                }
            })?
        } else {
            create_instance(&constructors, &self.dependencies).ok_or_else(|| MvcTestError::NoMatchingConstructor {
                controller: self.controller_name(),
                dependencies: self.dependencies.type_names(),
            })?
        };
        debug!(
            controller = %self.controller_name(),
            dependencies = self.dependencies.len(),
            "controller built"
        );
        let mut controller = controller;
        *controller.controller_context_mut() = std::mem::take(&mut self.controller_context);
        Ok(controller)
    }

    /// Record the outcome of an invocation
    pub fn apply(&mut self, invocation: ActionInvocation) {
        debug!(
            controller = %self.controller_name(),
            action = %invocation.action_name,
            faulted = invocation.exception.is_some(),
            "action invoked"
        );
        self.state = if invocation.exception.is_some() {
            TestState::Faulted
        } else {
            TestState::Invoked
        };
        self.action_name = Some(invocation.action_name);
        self.call = Some(invocation.call);
        self.arguments = invocation.arguments;
        self.action_result = invocation.result;
        self.caught_exception = invocation.exception;
    }

    /// Names for failure messages
    #[must_use]
    pub fn failure_context(&self) -> FailureContext {
        FailureContext {
            controller: self.controller_name(),
            action: self.action_name.clone(),
        }
    }

    /// Failure message for the invoked action
    #[must_use]
    pub fn failure_message(&self, expected: &str, actual: &str) -> String {
        self.failure_context().message(expected, actual)
    }
}

impl<C: Controller> Default for TestContext<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for TestContext<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestContext")
            .field("controller", &std::any::type_name::<C>())
            .field("state", &self.state)
            .field("action_name", &self.action_name)
            .field("dependencies", &self.dependencies)
            .field("arguments", &self.arguments)
            .field("action_result", &self.action_result.as_deref().map(describe))
            .field("caught_exception", &self.caught_exception)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::MethodIdentity;
    use crate::reflection::{Constructor, ParameterInfo};

    #[derive(Debug, Clone, PartialEq)]
    struct Repository(&'static str);

    #[derive(Debug, Clone, PartialEq)]
    struct Clock(u8);

    #[derive(Debug, Default)]
    struct ShopController {
        context: ControllerContext,
        repository: Option<Repository>,
        clock: Option<Clock>,
    }

    impl Controller for ShopController {
        fn controller_context(&self) -> &ControllerContext {
            &self.context
        }

        fn controller_context_mut(&mut self) -> &mut ControllerContext {
            &mut self.context
        }

        fn constructors() -> Vec<Constructor<Self>> {
            vec![
                Constructor::new(vec![ParameterInfo::of::<Repository>()], |resolver| {
                    Some(Self {
                        repository: Some(resolver.resolve()?),
                        ..Self::default()
                    })
                }),
                Constructor::new(
                    vec![ParameterInfo::of::<Repository>(), ParameterInfo::of::<Clock>()],
                    |resolver| {
                        Some(Self {
                            repository: Some(resolver.resolve()?),
                            clock: Some(resolver.resolve()?),
                            ..Self::default()
                        })
                    },
                ),
            ]
        }
    }

    fn invocation(exception: Option<CaughtException>) -> ActionInvocation {
        ActionInvocation {
            action_name: "Index".to_string(),
            call: MethodCallInfo {
                method: MethodIdentity::instance("index"),
                argument_count: 0,
                source: "|c| c.index()".to_string(),
            },
            arguments: Vec::new(),
            result: exception.is_none().then(|| Box::new(1_u8) as Box<dyn Reflect>),
            exception,
        }
    }

    mod construction_tests {
        use super::*;

        #[test]
        fn test_built_once_from_dependencies() {
            let mut context = TestContext::<ShopController>::new();
            context.add_dependency(Clock(1)).unwrap();
            context.add_dependency(Repository("db")).unwrap();
            context.controller_mut().unwrap().repository = Some(Repository("changed"));
            let controller = context.controller_mut().unwrap();
            assert_eq!(controller.repository, Some(Repository("changed")));
            assert_eq!(controller.clock, Some(Clock(1)));
            assert_eq!(context.state(), TestState::ControllerBuilt);
        }

        #[test]
        fn test_duplicate_dependency() {
            let mut context = TestContext::<ShopController>::new();
            context.add_dependency(Clock(1)).unwrap();
            let error = context.add_dependency(Clock(2)).unwrap_err();
            assert_eq!(
                error.to_string(),
                "Dependency Clock is already registered for ShopController controller."
            );
        }

        #[test]
        fn test_unmatched_dependencies() {
            let mut context = TestContext::<ShopController>::new();
            context.add_dependency(Clock(1)).unwrap();
            context.add_dependency(5_u32).unwrap();
            assert!(matches!(
                context.controller_mut(),
                Err(MvcTestError::NoMatchingConstructor { .. })
            ));
        }

        #[test]
        fn test_services_pick_longest_constructor() {
            let mut context = TestContext::<ShopController>::new();
            context.services_mut().add_singleton(Repository("svc")).add_singleton(Clock(4));
            let controller = context.controller_mut().unwrap();
            assert_eq!(controller.clock, Some(Clock(4)));
        }

        #[test]
        fn test_unresolved_names_missing_types() {
            let mut context = TestContext::<ShopController>::new();
            let error = context.controller_mut().unwrap_err();
            assert_eq!(
                error.to_string(),
                "ShopController could not be instantiated because the following dependencies could not be resolved: Repository."
            );
        }

        #[test]
        fn test_instance_rejected_after_dependencies() {
            let mut context = TestContext::<ShopController>::new();
            context.add_dependency(Clock(1)).unwrap();
            assert!(context.set_controller(ShopController::default()).is_err());
        }

        #[test]
        fn test_dependency_rejected_after_instance() {
            let mut context = TestContext::<ShopController>::new();
            context.set_controller(ShopController::default()).unwrap();
            assert!(matches!(
                context.add_dependency(Clock(1)),
                Err(MvcTestError::InvalidState { .. })
            ));
        }

        #[test]
        fn test_pending_context_moves_into_controller() {
            let mut context = TestContext::<ShopController>::new();
            context.controller_context_mut().model_state.add_model_error("Name", "Required");
            context.add_dependency(Repository("db")).unwrap();
            context.controller_mut().unwrap();
            assert!(!context.controller().unwrap().model_state().is_valid());
            assert!(!context.model_state().is_valid());
        }

        #[test]
        fn test_memory_cache_dependency_replaces_handle() {
            let cache = MemoryCache::new();
            let mut context = TestContext::<ShopController>::new();
            context.add_dependency(cache.clone()).unwrap();
            assert!(context.memory_cache().same_store(&cache));
        }
    }

    mod apply_tests {
        use super::*;

        #[test]
        fn test_apply_success() {
            let mut context = TestContext::<ShopController>::new();
            assert_eq!(context.state(), TestState::Unconfigured);
            context.apply(invocation(None));
            assert_eq!(context.state(), TestState::Invoked);
            assert_eq!(context.action_name(), "Index");
            assert!(context.action_result().is_some());
            assert!(context.caught_exception().is_none());
        }

        #[test]
        fn test_controller_level_message() {
            let context = TestContext::<ShopController>::new();
            assert_eq!(
                context.failure_message("AuthorizeAttribute", "in fact none was found"),
                "When testing ShopController expected AuthorizeAttribute, but in fact none was found."
            );
        }

        #[test]
        fn test_apply_fault() {
            let mut context = TestContext::<ShopController>::new();
            context.apply(invocation(Some(CaughtException::new("panic", "boom"))));
            assert_eq!(context.state(), TestState::Faulted);
            assert!(context.action_result().is_none());
            assert_eq!(
                context.failure_message("no exception", "one was thrown"),
                "When calling Index action in ShopController expected no exception, but one was thrown."
            );
        }
    }
}
