//! Probar MVC: fluent controller testing with deep structural equality
//!
//! A controller test is one chain: configure the controller, capture a call
//! to one of its actions, then assert on what the action returned and on the
//! state it left behind.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    PROBAR MVC Architecture                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ calling!   │    │ Expression │    │ Test       │            │
//! │   │ (macro)    │───►│ Parser     │───►│ Context    │            │
//! │   │            │    │            │    │            │            │
//! │   └────────────┘    └────────────┘    └─────┬──────┘            │
//! │                                             │                   │
//! │   ┌────────────┐    ┌────────────┐    ┌─────▼──────┐            │
//! │   │ Deep       │◄───│ Assertion  │◄───│ Invoker    │            │
//! │   │ Equality   │    │ Builders   │    │ (catch)    │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use probar_mvc::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq, Reflect)]
//! struct Article {
//!     id: u32,
//!     title: String,
//! }
//!
//! let id = 1;
//! calling!(for_controller::<ArticlesController>(), |c| c.details(id))?
//!     .should_return()?
//!     .ok()?
//!     .with_value(Article { id: 1, title: "Rust".to_string() })?;
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

// Generated code names this crate by its absolute path, also from inside it.
extern crate self as probar_mvc;

/// Application-wide services, routes and configuration
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod application;

/// Fluent test and assertion builders
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate, clippy::missing_const_for_fn)]
pub mod builders;

/// Per-test state shared by the builders
#[allow(clippy::missing_errors_doc)]
pub mod context;

/// Captured call expressions and argument resolution
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod expression;

/// Action invocation and exception capture
pub mod invoker;

/// Host framework test double
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate, clippy::missing_const_for_fn)]
pub mod mvc;

/// Runtime shape inspection, deep equality and activation
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod reflection;

mod result;

pub use ::http;

pub use application::{TestApplication, TestApplicationBuilder, TestApplicationGuard, TestConfiguration};
pub use builders::{
    for_controller, ActionTestBuilder, ControllerBuilder, InvokedAction, PreparedCall, VoidActionTestBuilder,
};
pub use context::{TestContext, TestState};
pub use expression::{FromServices, With};
pub use invoker::{throw, CaughtException};
pub use mvc::{ActionAttribute, ActionResult, Controller, ControllerContext};
pub use probar_mvc_derive::{calling, calling_void, controller, Reflect};
pub use reflection::{are_deeply_equal, deep_equality, DeepEqualityResult, Reflect, Reflection};
pub use result::{MvcTestError, MvcTestResult};

/// Everything a controller test usually needs
pub mod prelude {
    pub use crate::application::TestApplication;
    pub use crate::builders::{for_controller, InvokedAction};
    pub use crate::expression::{FromServices, With};
    pub use crate::invoker::throw;
    pub use crate::mvc::{
        route_values, ActionAttribute, ActionDescriptor, ActionResult, Controller, ControllerContext, RouteValues,
    };
    pub use crate::reflection::{are_deeply_equal, Reflect};
    pub use crate::result::{MvcTestError, MvcTestResult};
    pub use crate::{calling, calling_void, controller};
    pub use probar_mvc_derive::Reflect;
    pub use ::http::{Method, StatusCode};
}
