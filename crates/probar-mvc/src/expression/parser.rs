//! Method identity and argument resolution.

use super::placeholders::{is_ignored_argument, IGNORED};
use super::{Expression, LambdaExpression, MethodIdentity};
use crate::mvc::attributes::ActionDescriptor;
use crate::reflection::{describe, prettify_type_name, Reflect};
use crate::result::{MvcTestError, MvcTestResult};
use std::cell::Cell;
use tracing::trace;

thread_local! {
    static COMPILATIONS: Cell<usize> = const { Cell::new(0) };
}

/// Number of argument expressions evaluated through the compiled path on
/// this thread
#[must_use]
pub fn compilation_count() -> usize {
    COMPILATIONS.with(Cell::get)
}

/// The action method a lambda calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCallInfo {
    /// Called method
    pub method: MethodIdentity,
    /// Number of call arguments
    pub argument_count: usize,
    /// Rendered lambda, for messages
    pub source: String,
}

impl MethodCallInfo {
    /// Method name
    #[must_use]
    pub fn method_name(&self) -> &'static str {
        self.method.name
    }
}

/// A call-site argument with its resolved value
#[derive(Debug)]
pub struct MethodArgument<'a> {
    /// Position in the call
    pub position: usize,
    /// Parameter name
    pub name: String,
    /// Declared parameter type
    pub type_name: String,
    /// Resolved value; `None` when it cannot be resolved statically
    pub value: Option<&'a dyn Reflect>,
}

impl MethodArgument<'_> {
    /// Whether validation skips this argument
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        is_ignored_argument(self.value)
    }

    /// Rendered value, `None` when ignored
    #[must_use]
    pub fn rendered_value(&self) -> Option<String> {
        match self.value {
            Some(value) if !self.is_ignored() => Some(describe(value)),
            _ => None,
        }
    }
}

/// Reads captured call expressions.
#[derive(Debug)]
pub struct ExpressionParser;

impl ExpressionParser {
    /// Identity of the instance method the lambda body calls.
    ///
    /// # Errors
    ///
    /// `InvalidCallExpression` when the body is not a method call or the
    /// call has no receiver.
    pub fn parse_method_call(lambda: &LambdaExpression<'_>) -> MvcTestResult<MethodCallInfo> {
        match &lambda.body {
            Expression::Call {
                receiver: Some(_),
                method,
                arguments,
                ..
            } => Ok(MethodCallInfo {
                method: *method,
                argument_count: arguments.len(),
                source: format!("{lambda:?}"),
            }),
            _ => Err(MvcTestError::InvalidCallExpression {
                message: format!("Provided expression '{lambda:?}' is not a valid instance method call."),
            }),
        }
    }

    /// Resolve every call argument.
    ///
    /// Names and declared types come from `descriptor` when given.
    pub fn resolve_arguments<'a>(
        lambda: &LambdaExpression<'a>,
        descriptor: Option<&ActionDescriptor>,
    ) -> MvcTestResult<Vec<MethodArgument<'a>>> {
        Self::parse_method_call(lambda)?;
        let Expression::Call { arguments, .. } = &lambda.body else {
            return Ok(Vec::new());
        };
        Ok(arguments
            .iter()
            .enumerate()
            .map(|(position, argument)| {
                let value = Self::resolve_value(argument);
                let parameter = descriptor.and_then(|descriptor| descriptor.parameters.get(position));
                let name = parameter.map_or_else(|| format!("arg{position}"), |parameter| parameter.name.to_string());
                let type_name = match (parameter, value) {
                    (Some(parameter), _) => parameter.type_name.to_string(),
                    (None, Some(value)) if !is_ignored_argument(Some(value)) => prettify_type_name(value.type_name()),
                    _ => "_".to_string(),
                };
                trace!(position, name = %name, resolved = value.is_some(), "resolved argument");
                MethodArgument {
                    position,
                    name,
                    type_name,
                    value,
                }
            })
            .collect())
    }

    /// Resolve a single argument expression.
    ///
    /// Conversions are stripped first. Placeholder calls come next: the
    /// wildcard yields the ignore marker, default markers evaluate normally
    /// and other placeholders are absent. Constants and captured locals are
    /// read directly; anything else goes through the compiled path.
    pub fn resolve_value<'a>(expression: &Expression<'a>) -> Option<&'a dyn Reflect> {
        let node = expression.strip_conversions();
        match node {
            Expression::Call {
                receiver: None, method, ..
            } => match (method.declaring_type, method.name) {
                (Some("With"), "any") => Some(&IGNORED as &dyn Reflect),
                (Some("With"), "default" | "value") => Self::compile(node),
                _ => None,
            },
            Expression::Constant(value) => Some(*value),
            Expression::Captured { value, .. } => Some(*value),
            _ => Self::compile(node),
        }
    }

    fn compile<'a>(node: &Expression<'a>) -> Option<&'a dyn Reflect> {
        let value = match node {
            Expression::Compiled { thunk, .. } => thunk(),
            Expression::Call { value: Some(value), .. } => *value,
            _ => return None,
        };
        COMPILATIONS.with(|count| count.set(count.get() + 1));
        Some(value)
    }
}
