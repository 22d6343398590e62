//! Invoked-action fixtures for builder tests.

use super::{ActionTestBuilder, VoidActionTestBuilder};
use crate::context::{ActionInvocation, TestContext};
use crate::expression::{MethodCallInfo, MethodIdentity};
use crate::invoker::CaughtException;
use crate::mvc::attributes::{ActionAttribute, ActionDescriptor};
use crate::mvc::controller::{Controller, ControllerContext};
use crate::reflection::{Constructor, Reflect};
use http::Method;

#[derive(Debug, Default)]
pub(crate) struct HomeController {
    context: ControllerContext,
}

impl Controller for HomeController {
    fn controller_context(&self) -> &ControllerContext {
        &self.context
    }

    fn controller_context_mut(&mut self) -> &mut ControllerContext {
        &mut self.context
    }

    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(Vec::new(), |_| Some(Self::default()))]
    }

    fn attributes() -> Vec<ActionAttribute> {
        vec![ActionAttribute::authorize()]
    }

    fn actions() -> Vec<ActionDescriptor> {
        vec![ActionDescriptor::new("index").with_attribute(ActionAttribute::HttpMethod(Method::GET))]
    }
}

fn invocation(result: Option<Box<dyn Reflect>>, exception: Option<CaughtException>) -> ActionInvocation {
    ActionInvocation {
        action_name: "index".to_string(),
        call: MethodCallInfo {
            method: MethodIdentity::instance("index"),
            argument_count: 0,
            source: "|c| c.index()".to_string(),
        },
        arguments: Vec::new(),
        result,
        exception,
    }
}

/// Context of `index` after `configure` ran against the built controller
pub(crate) fn context_after(configure: impl FnOnce(&mut TestContext<HomeController>)) -> TestContext<HomeController> {
    let mut context = TestContext::<HomeController>::new();
    if let Ok(controller) = context.controller_mut() {
        controller.controller_context_mut().action_descriptor = HomeController::actions().into_iter().next();
    }
    configure(&mut context);
    context
}

/// `index` returned `value`
pub(crate) fn invoked<R: Reflect>(value: R) -> ActionTestBuilder<HomeController, R> {
    invoked_after(value, |_| {})
}

/// `index` returned `value` after `configure` changed the test state
pub(crate) fn invoked_after<R: Reflect>(
    value: R,
    configure: impl FnOnce(&mut TestContext<HomeController>),
) -> ActionTestBuilder<HomeController, R> {
    let mut context = context_after(configure);
    context.apply(invocation(Some(Box::new(value)), None));
    ActionTestBuilder::new(context)
}

/// `index` threw `exception`
pub(crate) fn thrown(exception: CaughtException) -> VoidActionTestBuilder<HomeController> {
    let mut context = context_after(|_| {});
    context.apply(invocation(None, Some(exception)));
    VoidActionTestBuilder::new(context)
}
