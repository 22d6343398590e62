//! Captured call expressions.
//!
//! `calling!(builder, |c| c.details(id, With::any::<String>()))` records the
//! call as an [`Expression`] tree before invoking it: the method identity plus
//! one node per argument, borrowing the already evaluated argument values.
//! [`ExpressionParser`] reads the tree back into the action's identity and
//! its resolved arguments.
//!
//! ```text
//! Lambda(c)
//! └── Call { receiver: Parameter(c), method: details }
//!     ├── Captured(id)
//!     └── Call { receiver: None, method: With::any }
//! ```

mod parser;
mod placeholders;

pub use parser::{compilation_count, ExpressionParser, MethodArgument, MethodCallInfo};
pub use placeholders::{is_ignored_argument, FromServices, With, IGNORED_ARGUMENT};

use crate::reflection::{describe, Reflect};
use std::fmt;

/// Identity of a called method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodIdentity {
    /// Declaring type of a static call (`With`, `FromServices`); `None` for
    /// instance calls
    pub declaring_type: Option<&'static str>,
    /// Method name
    pub name: &'static str,
}

impl MethodIdentity {
    /// Instance method
    #[must_use]
    pub const fn instance(name: &'static str) -> Self {
        Self {
            declaring_type: None,
            name,
        }
    }

    /// Associated function of a type
    #[must_use]
    pub const fn associated(declaring_type: &'static str, name: &'static str) -> Self {
        Self {
            declaring_type: Some(declaring_type),
            name,
        }
    }
}

impl fmt::Display for MethodIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.declaring_type {
            Some(declaring_type) => write!(f, "{declaring_type}::{}", self.name),
            None => f.write_str(self.name),
        }
    }
}

/// A node of a captured call expression
pub enum Expression<'a> {
    /// The lambda parameter (the controller)
    Parameter {
        /// Parameter name
        name: &'static str,
    },
    /// A literal
    Constant(&'a dyn Reflect),
    /// A local variable captured by the lambda
    Captured {
        /// Variable name
        name: &'static str,
        /// Variable value
        value: &'a dyn Reflect,
    },
    /// A widening or boxing conversion (`x as i64`, `x.into()`)
    Convert {
        /// Converted expression
        operand: Box<Expression<'a>>,
        /// Target type as written, `_` when inferred
        target: &'static str,
    },
    /// A method call
    Call {
        /// Receiver; `None` for associated function calls
        receiver: Option<Box<Expression<'a>>>,
        /// Called method
        method: MethodIdentity,
        /// Arguments
        arguments: Vec<Expression<'a>>,
        /// Value the call evaluated to, when it was evaluated ahead of time
        value: Option<&'a dyn Reflect>,
    },
    /// Any other expression, evaluated on demand
    Compiled {
        /// Source text
        source: &'static str,
        /// Evaluates the expression
        thunk: Box<dyn 'a + Fn() -> &'a dyn Reflect>,
    },
    /// An expression that depends on the lambda parameter or whose value
    /// cannot be reflected
    Unresolvable {
        /// Source text
        source: &'static str,
    },
    /// A body that is not a method call
    Unsupported {
        /// Source text
        source: &'static str,
    },
}

impl<'a> Expression<'a> {
    /// Lambda parameter
    #[must_use]
    pub const fn parameter(name: &'static str) -> Self {
        Self::Parameter { name }
    }

    /// Literal
    #[must_use]
    pub fn constant(value: &'a dyn Reflect) -> Self {
        Self::Constant(value)
    }

    /// Captured local
    #[must_use]
    pub fn captured(name: &'static str, value: &'a dyn Reflect) -> Self {
        Self::Captured { name, value }
    }

    /// Conversion
    #[must_use]
    pub fn convert(operand: Self, target: &'static str) -> Self {
        Self::Convert {
            operand: Box::new(operand),
            target,
        }
    }

    /// Instance method call
    #[must_use]
    pub fn call(receiver: Self, method: MethodIdentity, arguments: Vec<Self>) -> Self {
        Self::Call {
            receiver: Some(Box::new(receiver)),
            method,
            arguments,
            value: None,
        }
    }

    /// Associated function call, with its value when already evaluated
    #[must_use]
    pub fn static_call(method: MethodIdentity, arguments: Vec<Self>, value: Option<&'a dyn Reflect>) -> Self {
        Self::Call {
            receiver: None,
            method,
            arguments,
            value,
        }
    }

    /// Expression evaluated on demand
    #[must_use]
    pub fn compiled(source: &'static str, value: &'a dyn Reflect) -> Self {
        Self::Compiled {
            source,
            thunk: Box::new(move || value),
        }
    }

    /// Node built from a probed argument value, unresolvable when the value
    /// does not reflect
    #[must_use]
    pub fn from_probe(
        value: Option<&'a dyn Reflect>,
        source: &'static str,
        build: impl FnOnce(&'a dyn Reflect) -> Self,
    ) -> Self {
        value.map_or(Self::Unresolvable { source }, build)
    }

    /// Expression over the lambda parameter
    #[must_use]
    pub const fn unresolvable(source: &'static str) -> Self {
        Self::Unresolvable { source }
    }

    /// Non-call body
    #[must_use]
    pub const fn unsupported(source: &'static str) -> Self {
        Self::Unsupported { source }
    }

    /// The node with conversions removed
    #[must_use]
    pub fn strip_conversions(&self) -> &Self {
        let mut node = self;
        while let Self::Convert { operand, .. } = node {
            node = &**operand;
        }
        node
    }
}

impl fmt::Debug for Expression<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parameter { name } => f.write_str(name),
            Self::Constant(value) => write!(f, "{}", describe(*value)),
            Self::Captured { name, .. } => f.write_str(name),
            Self::Convert { operand, target } => write!(f, "({operand:?} as {target})"),
            Self::Call {
                receiver,
                method,
                arguments,
                ..
            } => {
                if let Some(receiver) = receiver {
                    write!(f, "{receiver:?}.")?;
                }
                write!(f, "{method}(")?;
                for (index, argument) in arguments.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{argument:?}")?;
                }
                f.write_str(")")
            }
            Self::Compiled { source, .. } | Self::Unresolvable { source } | Self::Unsupported { source } => {
                f.write_str(source)
            }
        }
    }
}

/// An argument value as seen by the call-capture macros.
///
/// `ArgumentProbe(&value).reflect_argument()` yields the value as
/// `&dyn Reflect` when its type implements [`Reflect`] and `None` otherwise;
/// both [`ReflectArgument`] and [`OpaqueArgument`] must be in scope.
#[derive(Debug)]
pub struct ArgumentProbe<'a, T>(pub &'a T);

/// Probe resolution for reflectable values
pub trait ReflectArgument<'a> {
    /// The value, erased
    fn reflect_argument(self) -> Option<&'a dyn Reflect>;
}

impl<'a, T: Reflect> ReflectArgument<'a> for ArgumentProbe<'a, T> {
    fn reflect_argument(self) -> Option<&'a dyn Reflect> {
        Some(self.0)
    }
}

/// Probe resolution for everything else
pub trait OpaqueArgument<'a> {
    /// Always `None`
    fn reflect_argument(self) -> Option<&'a dyn Reflect>;
}

impl<'a, T> OpaqueArgument<'a> for &ArgumentProbe<'a, T> {
    fn reflect_argument(self) -> Option<&'a dyn Reflect> {
        None
    }
}

/// A single-parameter lambda over the controller
pub struct LambdaExpression<'a> {
    /// Parameter name
    pub parameter: &'static str,
    /// Body
    pub body: Expression<'a>,
}

impl<'a> LambdaExpression<'a> {
    /// Create a lambda
    #[must_use]
    pub fn new(parameter: &'static str, body: Expression<'a>) -> Self {
        Self { parameter, body }
    }
}

impl fmt::Debug for LambdaExpression<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "|{}| {:?}", self.parameter, self.body)
    }
}
