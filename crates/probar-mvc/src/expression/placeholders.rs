//! Argument placeholders for captured calls.

use crate::application::TestApplication;
use crate::mvc::services::RequestServices;
use crate::reflection::Reflect;

/// Resolved value of a `With::any` argument
pub const IGNORED_ARGUMENT: &str = "__probar_mvc_ignored_argument__";

pub(crate) static IGNORED: &str = IGNORED_ARGUMENT;

/// Whether a resolved argument is skipped during validation: absent, or the
/// `With::any` marker.
#[must_use]
pub fn is_ignored_argument(value: Option<&dyn Reflect>) -> bool {
    let Some(value) = value else {
        return true;
    };
    let any = value.as_any();
    any.downcast_ref::<&'static str>()
        .map(|text| *text == IGNORED_ARGUMENT)
        .or_else(|| any.downcast_ref::<String>().map(|text| text == IGNORED_ARGUMENT))
        .unwrap_or(false)
}

/// Argument values that stand for something other than themselves.
///
/// ```ignore
/// calling!(builder, |c| c.search(With::any::<String>(), With::value(10)))
/// ```
#[derive(Debug)]
pub struct With;

impl With {
    /// Any value of `T`; the argument is skipped by validation and passed as
    /// `T::default()`
    #[must_use]
    pub fn any<T: Default>() -> T {
        T::default()
    }

    /// `T::default()`, resolved and validated like any other value
    #[must_use]
    pub fn default<T: Default>() -> T {
        T::default()
    }

    /// The value itself
    #[must_use]
    pub fn value<T>(value: T) -> T {
        value
    }
}

/// Arguments provided by the service container.
#[derive(Debug)]
pub struct FromServices;

impl FromServices {
    /// `T` from the current request services, then the test application,
    /// else `T::default()`
    #[must_use]
    pub fn resolve<T: Clone + Default + 'static>() -> T {
        RequestServices::resolve::<T>()
            .or_else(|| TestApplication::current().services().get::<T>())
            .unwrap_or_default()
    }
}
