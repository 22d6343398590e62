//! Controller configuration and call preparation.

use super::action::{ActionTestBuilder, VoidActionTestBuilder};
use super::attributes::AttributesTestBuilder;
use crate::context::{ActionInvocation, ResolvedArgument, TestContext};
use crate::expression::{ExpressionParser, LambdaExpression, MethodCallInfo};
use crate::invoker::{invoke_async, invoke_sync, CaughtException};
use crate::mvc::attributes::ActionDescriptor;
use crate::mvc::cache::MemoryCache;
use crate::mvc::controller::{cached_attributes, find_action, Controller, ControllerContext};
use crate::mvc::http::{HttpContext, HttpRequest};
use crate::mvc::services::{RequestServices, RequestServicesGuard, ServiceProvider};
use crate::mvc::state::{Session, TempData};
use crate::mvc::user::{ClaimsPrincipal, UserBuilder};
use crate::mvc::validation::validate_object;
use crate::reflection::Reflect;
use crate::result::MvcTestResult;
use futures::future::LocalBoxFuture;
use std::fmt;
use tracing::debug;

/// Configures a controller test before the action is called.
///
/// ```ignore
/// let builder = for_controller::<HomeController>()
///     .with_dependency(Repository::in_memory())?
///     .with_authenticated_user()
///     .with_route_value("culture", "en");
///
/// calling!(builder, |c| c.index())?.should_return()?.view()?;
/// ```
pub struct ControllerBuilder<C> {
    context: TestContext<C>,
}

impl<C: Controller> ControllerBuilder<C> {
    /// Builder bound to the current test application
    #[must_use]
    pub fn new() -> Self {
        Self {
            context: TestContext::new(),
        }
    }

    /// Test context accumulated so far
    #[must_use]
    pub fn test_context(&self) -> &TestContext<C> {
        &self.context
    }

    /// Register a constructor dependency.
    ///
    /// # Errors
    ///
    /// `DuplicateDependency` when a value of `T` is already registered.
    pub fn with_dependency<T: Clone + 'static>(mut self, dependency: T) -> MvcTestResult<Self> {
        self.context.add_dependency(dependency)?;
        Ok(self)
    }

    /// Register `T` as an explicitly absent dependency
    pub fn with_absent_dependency<T: 'static>(mut self) -> MvcTestResult<Self> {
        self.context.add_absent_dependency::<T>()?;
        Ok(self)
    }

    /// Register per-test services; they override the application's
    #[must_use]
    pub fn with_services(mut self, register: impl FnOnce(&mut ServiceProvider)) -> Self {
        register(self.context.services_mut());
        self
    }

    /// Test an existing controller instance.
    ///
    /// # Errors
    ///
    /// `InvalidState` once dependencies are registered.
    pub fn with_controller_instance(mut self, controller: C) -> MvcTestResult<Self> {
        self.context.set_controller(controller)?;
        Ok(self)
    }

    /// Replace the controller context
    #[must_use]
    pub fn with_controller_context(mut self, context: ControllerContext) -> Self {
        self.context.set_controller_context(context);
        self
    }

    /// Configure the HTTP context
    #[must_use]
    pub fn with_http_context(mut self, configure: impl FnOnce(&mut HttpContext)) -> Self {
        configure(&mut self.context.controller_context_mut().http_context);
        self
    }

    /// Configure the HTTP request
    #[must_use]
    pub fn with_http_request(mut self, configure: impl FnOnce(HttpRequest) -> HttpRequest) -> Self {
        let http_context = &mut self.context.controller_context_mut().http_context;
        let request = std::mem::take(&mut http_context.request);
        http_context.request = configure(request);
        self
    }

    /// Populate the session
    #[must_use]
    pub fn with_session(mut self, configure: impl FnOnce(&Session)) -> Self {
        configure(&self.context.controller_context_mut().http_context.session);
        self
    }

    /// Populate temp data
    #[must_use]
    pub fn with_temp_data(mut self, configure: impl FnOnce(&TempData)) -> Self {
        configure(&self.context.controller_context_mut().temp_data);
        self
    }

    /// Populate the memory cache the controller resolves
    #[must_use]
    pub fn with_memory_cache(self, configure: impl FnOnce(&MemoryCache)) -> Self {
        configure(self.context.memory_cache());
        self
    }

    /// Authenticate as the default test user (`TestId`, `TestUser`)
    #[must_use]
    pub fn with_authenticated_user(self) -> Self {
        self.with_user(|user| user)
    }

    /// Authenticate as a configured user
    #[must_use]
    pub fn with_user(mut self, configure: impl FnOnce(UserBuilder) -> UserBuilder) -> Self {
        self.context.controller_context_mut().http_context.user = configure(ClaimsPrincipal::builder()).build();
        self
    }

    /// Resolve route values for the called action
    #[must_use]
    pub fn with_resolved_route_values(mut self) -> Self {
        self.context.set_resolve_route_values(true);
        self
    }

    /// Add a route value, merged over resolved ones
    #[must_use]
    pub fn with_route_value(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.add_route_value(key, value.to_string());
        self
    }

    /// Skip argument validation
    #[must_use]
    pub fn without_validation(mut self) -> Self {
        self.context.set_model_state_validation(false);
        self
    }

    /// Validate arguments into model state (the default)
    #[must_use]
    pub fn with_validation(mut self) -> Self {
        self.context.set_model_state_validation(true);
        self
    }

    /// Run `setup` on the controller right before the action
    #[must_use]
    pub fn with_setup(mut self, setup: impl FnOnce(&mut C) + 'static) -> Self {
        self.context.add_setup(setup);
        self
    }

    /// Make this test's services current until the guard drops
    #[must_use = "the scope ends when the guard is dropped"]
    pub fn request_scope(&self) -> RequestServicesGuard {
        RequestServices::enter(self.context.request_services())
    }

    /// Assertions over the controller itself; builds it when needed
    pub fn should_have(mut self) -> MvcTestResult<ControllerShouldHaveTestBuilder<C>> {
        self.context.controller_mut()?;
        Ok(ControllerShouldHaveTestBuilder { context: self.context })
    }

    /// Resolve the call and get the controller ready for it.
    ///
    /// Builds the controller, installs its context, resolves route values,
    /// validates the resolved arguments and runs setups.
    ///
    /// # Errors
    ///
    /// `InvalidCallExpression` when the lambda is not an instance method
    /// call; construction and routing errors.
    pub fn prepare_call(self, call: &LambdaExpression<'_>) -> MvcTestResult<PreparedCall<C>> {
        let mut context = self.context;
        let info = ExpressionParser::parse_method_call(call)?;
        let descriptor =
            find_action::<C>(info.method_name()).unwrap_or_else(|| ActionDescriptor::new(info.method_name()));
        let arguments = ExpressionParser::resolve_arguments(call, Some(&descriptor))?;

        let route_data = if context.resolves_route_values() {
            let values: Vec<(String, String)> = arguments
                .iter()
                .filter_map(|argument| argument.rendered_value().map(|value| (argument.name.clone(), value)))
                .collect();
            let mut route_data = context.application().router().resolve(
                &context.controller_name(),
                &cached_attributes::<C>(),
                &descriptor,
                &values,
            )?;
            route_data.merge(context.route_values());
            Some(route_data)
        } else if context.route_values().is_empty() {
            None
        } else {
            let mut route_data = context.controller_context().route_data.clone();
            route_data.merge(context.route_values());
            Some(route_data)
        };
        let validate = context.model_state_validation();
        let setups = context.take_setups();

        let controller = context.controller_mut()?;
        let controller_context = controller.controller_context_mut();
        controller_context.action_descriptor = Some(descriptor.clone());
        if let Some(route_data) = route_data {
            controller_context.route_data = route_data;
        }
        if validate {
            for argument in arguments.iter().filter(|argument| !argument.is_ignored()) {
                if let Some(value) = argument.value {
                    validate_object(value, &mut controller_context.model_state);
                }
            }
            debug!(
                action = %descriptor.action_name,
                valid = controller_context.model_state.is_valid(),
                "arguments validated"
            );
        }
        for setup in setups {
            setup(controller);
        }

        let arguments = arguments
            .iter()
            .map(|argument| ResolvedArgument {
                name: argument.name.clone(),
                type_name: argument.type_name.clone(),
                value: argument.rendered_value(),
                ignored: argument.is_ignored(),
            })
            .collect();
        Ok(PreparedCall {
            context,
            action_name: descriptor.action_name,
            call: info,
            arguments,
        })
    }

    /// Surface the error of a lambda that is not an instance method call
    pub fn reject_call(self, call: &LambdaExpression<'_>) -> MvcTestResult<ActionTestBuilder<C, ()>> {
        ExpressionParser::parse_method_call(call)?;
        self.prepare_call(call)?.invoke(|_| ())
    }

    /// Void counterpart of [`Self::reject_call`]
    pub fn reject_void_call(self, call: &LambdaExpression<'_>) -> MvcTestResult<VoidActionTestBuilder<C>> {
        ExpressionParser::parse_method_call(call)?;
        self.prepare_call(call)?.invoke_void(|_| ())
    }
}

impl<C: Controller> Default for ControllerBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for ControllerBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerBuilder").field("context", &self.context).finish()
    }
}

/// A resolved call with its controller ready; invoking it records the outcome
pub struct PreparedCall<C> {
    context: TestContext<C>,
    action_name: String,
    call: MethodCallInfo,
    arguments: Vec<ResolvedArgument>,
}

impl<C: Controller> PreparedCall<C> {
    /// Action name of the call
    #[must_use]
    pub fn action_name(&self) -> &str {
        &self.action_name
    }

    /// Resolved arguments
    #[must_use]
    pub fn arguments(&self) -> &[ResolvedArgument] {
        &self.arguments
    }

    /// Invoke a value-returning action
    pub fn invoke<R: Reflect>(self, action: impl FnOnce(&mut C) -> R) -> MvcTestResult<ActionTestBuilder<C, R>> {
        let context = self.run(|controller, _| Ok(invoke_sync(|| action(controller))))?;
        Ok(ActionTestBuilder::new(context))
    }

    /// Invoke an `async` action, blocking until it completes
    pub fn invoke_async<R: Reflect>(
        self,
        action: impl for<'c> FnOnce(&'c mut C) -> LocalBoxFuture<'c, R>,
    ) -> MvcTestResult<ActionTestBuilder<C, R>> {
        let context = self.run(|controller, action_name| invoke_async(action_name, || action(controller)))?;
        Ok(ActionTestBuilder::new(context))
    }

    /// Invoke an action without a return value
    pub fn invoke_void(self, action: impl FnOnce(&mut C)) -> MvcTestResult<VoidActionTestBuilder<C>> {
        let context = self.run(|controller, _| Ok(invoke_sync(|| action(controller))))?;
        Ok(VoidActionTestBuilder::new(context))
    }

    /// Invoke an `async` action without a return value
    pub fn invoke_void_async(
        self,
        action: impl for<'c> FnOnce(&'c mut C) -> LocalBoxFuture<'c, ()>,
    ) -> MvcTestResult<VoidActionTestBuilder<C>> {
        let context = self.run(|controller, action_name| invoke_async(action_name, || action(controller)))?;
        Ok(VoidActionTestBuilder::new(context))
    }

    fn run<R: Reflect>(
        self,
        invoke: impl FnOnce(&mut C, &str) -> MvcTestResult<Result<R, CaughtException>>,
    ) -> MvcTestResult<TestContext<C>> {
        let Self {
            mut context,
            action_name,
            call,
            arguments,
        } = self;
        let _scope = RequestServices::enter(context.request_services());
        let outcome = invoke(context.controller_mut()?, &action_name)?;
        let (result, exception) = match outcome {
            Ok(value) => (Some(Box::new(value) as Box<dyn Reflect>), None),
            Err(exception) => (None, Some(exception)),
        };
        context.apply(ActionInvocation {
            action_name,
            call,
            arguments,
            result,
            exception,
        });
        Ok(context)
    }
}

impl<C> fmt::Debug for PreparedCall<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedCall")
            .field("action_name", &self.action_name)
            .field("call", &self.call)
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}

/// Controller-level assertions
pub struct ControllerShouldHaveTestBuilder<C> {
    context: TestContext<C>,
}

impl<C: Controller> ControllerShouldHaveTestBuilder<C> {
    /// Check the controller attributes
    pub fn attributes(
        self,
        check: impl FnOnce(AttributesTestBuilder) -> MvcTestResult<AttributesTestBuilder>,
    ) -> MvcTestResult<Self> {
        let attributes = cached_attributes::<C>().as_ref().clone();
        check(AttributesTestBuilder::new(
            "controller",
            attributes,
            self.context.failure_context(),
        ))?;
        Ok(self)
    }

    /// The controller has no attributes
    pub fn no_attributes(self) -> MvcTestResult<Self> {
        AttributesTestBuilder::new("controller", cached_attributes::<C>().as_ref().clone(), self.context.failure_context())
            .with_total_number_of(0)?;
        Ok(self)
    }

    /// Test context
    #[must_use]
    pub fn test_context(&self) -> &TestContext<C> {
        &self.context
    }
}

impl<C> fmt::Debug for ControllerShouldHaveTestBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerShouldHaveTestBuilder")
            .field("context", &self.context)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::for_controller;
    use crate::context::TestState;
    use crate::expression::{Expression, MethodIdentity};
    use crate::mvc::attributes::ActionAttribute;
    use crate::mvc::results::ActionResult;
    use crate::reflection::{Constructor, ParameterInfo};
    use crate::result::MvcTestError;
    use http::Method;

    #[derive(Debug, Clone, PartialEq)]
    struct Greeting(&'static str);

    #[derive(Debug, Default)]
    struct GreetingController {
        context: ControllerContext,
        greeting: Option<Greeting>,
        visits: u32,
    }

    impl GreetingController {
        fn greet(&mut self, name: &str) -> String {
            self.visits += 1;
            let greeting = self.greeting.as_ref().map_or("Hello", |greeting| greeting.0);
            format!("{greeting}, {name}")
        }

        fn index(&self) -> ActionResult {
            self.ok()
        }

        fn fail(&self) -> ActionResult {
            panic!("broken")
        }

        async fn later(&self, value: u32) -> u32 {
            value * 2
        }
    }

    impl Controller for GreetingController {
        fn controller_context(&self) -> &ControllerContext {
            &self.context
        }

        fn controller_context_mut(&mut self) -> &mut ControllerContext {
            &mut self.context
        }

        fn constructors() -> Vec<Constructor<Self>> {
            vec![
                Constructor::new(Vec::new(), |_| Some(Self::default())),
                Constructor::new(vec![ParameterInfo::of::<Greeting>()], |resolver| {
                    Some(Self {
                        greeting: Some(resolver.resolve()?),
                        ..Self::default()
                    })
                }),
            ]
        }

        fn attributes() -> Vec<ActionAttribute> {
            vec![ActionAttribute::authorize()]
        }

        fn actions() -> Vec<ActionDescriptor> {
            vec![
                ActionDescriptor::new("greet")
                    .with_parameter("name", "&str")
                    .with_attribute(ActionAttribute::HttpMethod(Method::GET)),
                ActionDescriptor::new("index"),
            ]
        }
    }

    fn lambda<'a>(method: &'static str, arguments: Vec<Expression<'a>>) -> LambdaExpression<'a> {
        LambdaExpression::new(
            "c",
            Expression::call(Expression::parameter("c"), MethodIdentity::instance(method), arguments),
        )
    }

    mod invocation_tests {
        use super::*;

        #[test]
        fn test_invoke_records_result() {
            let name = "Ivo";
            let builder = for_controller::<GreetingController>();
            let prepared = builder.prepare_call(&lambda("greet", vec![Expression::captured("name", &name)])).unwrap();
            assert_eq!(prepared.arguments()[0].name, "name");
            let action = prepared.invoke(|c| c.greet(name)).unwrap();
            let context = action.test_context();
            assert_eq!(context.state(), TestState::Invoked);
            assert_eq!(context.action_name(), "greet");
            assert_eq!(context.controller().map(|c| c.visits), Some(1));
            assert_eq!(
                context.action_result().and_then(|value| value.as_any().downcast_ref::<String>()),
                Some(&"Hello, Ivo".to_string())
            );
        }

        #[test]
        fn test_dependency_reaches_controller() {
            let builder = for_controller::<GreetingController>().with_dependency(Greeting("Hi")).unwrap();
            let action = builder
                .prepare_call(&lambda("greet", vec![Expression::constant(&"Ann")]))
                .unwrap()
                .invoke(|c| c.greet("Ann"))
                .unwrap();
            assert_eq!(
                action.test_context().action_result().and_then(|value| value.as_any().downcast_ref::<String>()),
                Some(&"Hi, Ann".to_string())
            );
        }

        #[test]
        fn test_panic_is_captured() {
            let action = for_controller::<GreetingController>()
                .prepare_call(&lambda("fail", Vec::new()))
                .unwrap()
                .invoke(|c| c.fail())
                .unwrap();
            let context = action.test_context();
            assert_eq!(context.state(), TestState::Faulted);
            assert_eq!(context.caught_exception().map(CaughtException::message), Some("broken"));
            assert!(context.action_result().is_none());
        }

        #[test]
        fn test_async_invocation() {
            let action = for_controller::<GreetingController>()
                .prepare_call(&lambda("later", vec![Expression::constant(&4_u32)]))
                .unwrap()
                .invoke_async(|c| Box::pin(c.later(4)))
                .unwrap();
            assert_eq!(
                action.test_context().action_result().and_then(|value| value.as_any().downcast_ref::<u32>()),
                Some(&8)
            );
        }

        #[test]
        fn test_setups_run_before_action() {
            let action = for_controller::<GreetingController>()
                .with_setup(|c| c.visits = 10)
                .prepare_call(&lambda("greet", vec![Expression::constant(&"x")]))
                .unwrap()
                .invoke(|c| c.greet("x"))
                .unwrap();
            assert_eq!(action.test_context().controller().map(|c| c.visits), Some(11));
        }

        #[test]
        fn test_static_call_rejected() {
            let call = LambdaExpression::new(
                "c",
                Expression::static_call(MethodIdentity::associated("GreetingController", "index"), Vec::new(), None),
            );
            let error = for_controller::<GreetingController>().reject_call(&call).unwrap_err();
            assert!(matches!(error, MvcTestError::InvalidCallExpression { .. }));
        }
    }

    mod configuration_tests {
        use super::*;

        #[test]
        fn test_route_values_resolved_and_merged() {
            let name = "Ivo".to_string();
            let action = for_controller::<GreetingController>()
                .with_resolved_route_values()
                .with_route_value("culture", "en")
                .prepare_call(&lambda("greet", vec![Expression::captured("name", &name)]))
                .unwrap()
                .invoke(|c| c.greet("Ivo"))
                .unwrap();
            let route_data = action.test_context().route_data();
            assert_eq!(route_data.get("controller"), Some("Greeting"));
            assert_eq!(route_data.get("action"), Some("greet"));
            assert_eq!(route_data.get("name"), None);
            assert_eq!(route_data.get("culture"), Some("en"));
        }

        #[test]
        fn test_authenticated_user_defaults() {
            let builder = for_controller::<GreetingController>().with_authenticated_user();
            let user = &builder.test_context().http_context().user;
            assert!(user.is_authenticated());
            assert_eq!(user.name(), Some("TestUser"));
            assert_eq!(user.identifier(), Some("TestId"));
        }

        #[test]
        fn test_session_and_request_setup() {
            let builder = for_controller::<GreetingController>()
                .with_session(|session| session.set_string("cart", "3"))
                .with_http_request(|request| request.with_method(Method::POST).with_path("/greet"));
            let http_context = builder.test_context().http_context();
            assert_eq!(http_context.session.get_string("cart").as_deref(), Some("3"));
            assert_eq!(http_context.request.method, Method::POST);
        }

        #[test]
        fn test_controller_attributes() {
            for_controller::<GreetingController>()
                .should_have()
                .unwrap()
                .attributes(AttributesTestBuilder::restricting_for_authorized_requests)
                .unwrap();
            let error = for_controller::<GreetingController>()
                .should_have()
                .unwrap()
                .no_attributes()
                .unwrap_err();
            assert!(error.to_string().starts_with("When testing GreetingController expected"));
        }
    }
}
