//! End-to-end controller tests through the public fluent surface.
//!
//! Each test configures a controller, captures one action call with
//! `calling!` and asserts on the outcome.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use probar_mvc::mvc::{CacheEntryOptions, MemoryCache};
use probar_mvc::prelude::*;
use std::time::Duration;

// ============================================================================
// Controllers
// ============================================================================

#[derive(Debug, Default)]
struct HomeController {
    context: ControllerContext,
}

#[controller]
impl HomeController {
    pub fn index(&self) -> ActionResult {
        self.ok()
    }

    pub fn greeting(&self, name: String) -> ActionResult {
        self.content(&format!("Hello, {name}!"))
    }
}

#[derive(Debug, Default)]
struct ModelStateController {
    context: ControllerContext,
}

#[controller]
impl ModelStateController {
    pub fn add_error(&mut self) -> ActionResult {
        self.model_state_mut().add_model_error("Name", "Name is required.");
        self.ok()
    }

    pub fn nothing(&self) -> ActionResult {
        self.ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Clock {
    zone: String,
}

#[derive(Debug)]
struct InjectedController {
    context: ControllerContext,
    clock: Clock,
}

#[controller]
impl InjectedController {
    pub fn new(clock: Clock) -> Self {
        Self {
            context: ControllerContext::default(),
            clock,
        }
    }

    pub fn zone(&self) -> ActionResult {
        self.ok_with(self.clock.zone.clone())
    }
}

#[derive(Debug)]
struct CachingController {
    context: ControllerContext,
    cache: MemoryCache,
}

#[controller]
impl CachingController {
    pub fn new(cache: MemoryCache) -> Self {
        Self {
            context: ControllerContext::default(),
            cache,
        }
    }

    pub fn set_cache(&mut self) -> ActionResult {
        let options = CacheEntryOptions::new().with_sliding_expiration(Duration::from_secs(5 * 60));
        self.cache.set_with_options("test", "value".to_string(), options);
        self.ok()
    }
}

// ============================================================================
// Parameterless controllers
// ============================================================================

mod parameterless {
    use super::*;

    #[test]
    fn test_ok_helper_returns_ok() -> MvcTestResult<()> {
        common::init_tracing();
        let invoked = calling!(for_controller::<HomeController>(), |c| c.ok())?;
        assert!(invoked.test_context().caught_exception().is_none());
        invoked.should_return()?.ok()?;
        Ok(())
    }

    #[test]
    fn test_index_action() -> MvcTestResult<()> {
        calling!(for_controller::<HomeController>(), |c| c.index())?
            .should_return()?
            .ok()?
            .with_no_value()?;
        Ok(())
    }

    #[test]
    fn test_captured_argument_flows_into_action() -> MvcTestResult<()> {
        let name = "Ivo".to_string();
        let invoked = calling!(for_controller::<HomeController>(), |c| c.greeting(name))?;
        assert_eq!(invoked.test_context().action_name(), "greeting");
        let argument = &invoked.test_context().arguments()[0];
        assert_eq!(argument.name, "name");
        assert_eq!(argument.value.as_deref(), Some("Ivo"));
        invoked
            .should_return()?
            .content()?
            .with_content("Hello, Ivo!")?
            .containing("Ivo")?;
        Ok(())
    }

    #[test]
    fn test_wrong_result_type_names_both() {
        let error = calling!(for_controller::<HomeController>(), |c| c.index())
            .unwrap()
            .should_return()
            .unwrap()
            .json()
            .unwrap_err();
        assert!(matches!(error, MvcTestError::ActionResultAssertion { .. }));
        let message = error.to_string();
        assert!(message.starts_with("When calling index action in HomeController expected"));
        assert!(message.contains("JsonResult"));
    }
}

// ============================================================================
// Model state
// ============================================================================

mod model_state {
    use super::*;

    #[test]
    fn test_invalid_model_state_passes() -> MvcTestResult<()> {
        calling!(for_controller::<ModelStateController>(), |c| c.add_error())?
            .should_have()
            .invalid_model_state()?
            .model_state(|state| state.containing_error("Name")?.with_error_count(1))?;
        Ok(())
    }

    #[test]
    fn test_valid_model_state_fails_with_names() {
        let error = calling!(for_controller::<ModelStateController>(), |c| c.add_error())
            .unwrap()
            .should_have()
            .valid_model_state()
            .unwrap_err();
        assert!(matches!(error, MvcTestError::ModelStateAssertion { .. }));
        assert_eq!(
            error.to_string(),
            "When calling add_error action in ModelStateController expected to have valid model state with no errors, but it had some."
        );
    }

    #[test]
    fn test_untouched_model_state_is_valid() -> MvcTestResult<()> {
        calling!(for_controller::<ModelStateController>(), |c| c.nothing())?
            .should_have()
            .valid_model_state()?;
        Ok(())
    }
}

// ============================================================================
// Dependencies
// ============================================================================

mod dependencies {
    use super::*;

    fn utc() -> Clock {
        Clock {
            zone: "UTC".to_string(),
        }
    }

    #[test]
    fn test_registered_dependency_is_injected() -> MvcTestResult<()> {
        let builder = for_controller::<InjectedController>().with_dependency(utc())?;
        calling!(builder, |c| c.zone())?
            .should_return()?
            .ok()?
            .with_value("UTC".to_string())?;
        Ok(())
    }

    #[test]
    fn test_duplicate_dependency_is_rejected() {
        let error = for_controller::<InjectedController>()
            .with_dependency(utc())
            .unwrap()
            .with_dependency(Clock {
                zone: "CET".to_string(),
            })
            .unwrap_err();
        assert!(matches!(error, MvcTestError::DuplicateDependency { .. }));
        assert_eq!(
            error.to_string(),
            "Dependency Clock is already registered for InjectedController controller."
        );
    }

    #[test]
    fn test_unresolvable_constructor_parameter() {
        let error = calling!(for_controller::<InjectedController>(), |c| c.zone()).unwrap_err();
        assert!(matches!(error, MvcTestError::UnresolvedDependencies { .. }));
        assert!(error.to_string().contains("Clock"));
    }

    #[test]
    fn test_application_service_is_injected() -> MvcTestResult<()> {
        let _app = TestApplication::builder()
            .with_services(|services| {
                services.add_singleton(Clock {
                    zone: "EET".to_string(),
                });
            })
            .establish()?;
        calling!(for_controller::<InjectedController>(), |c| c.zone())?
            .should_return()?
            .ok()?
            .with_value("EET".to_string())?;
        Ok(())
    }
}

// ============================================================================
// Memory cache
// ============================================================================

mod memory_cache {
    use super::*;

    #[test]
    fn test_cache_entry_with_sliding_expiration() -> MvcTestResult<()> {
        common::init_tracing();
        calling!(for_controller::<CachingController>(), |c| c.set_cache())?
            .should_have()
            .memory_cache(|cache| {
                cache.with_number_of_entries(1)?.containing_entry("test", |entry| {
                    entry
                        .with_value("value".to_string())?
                        .with_sliding_expiration(Duration::from_secs(5 * 60))
                })
            })?
            .and_also()
            .should_return()?
            .ok()?;
        Ok(())
    }

    #[test]
    fn test_sliding_expiration_mismatch_message() {
        let error = calling!(for_controller::<CachingController>(), |c| c.set_cache())
            .unwrap()
            .should_have()
            .memory_cache(|cache| {
                cache.containing_entry("test", |entry| entry.with_sliding_expiration(Duration::from_secs(60)))
            })
            .unwrap_err();
        assert!(matches!(error, MvcTestError::DataProviderAssertion { .. }));
        assert_eq!(
            error.to_string(),
            "When calling set_cache action in CachingController expected memory cache entry with 'test' key to have sliding expiration of '00:01:00', but in fact it was '00:05:00'."
        );
    }

    #[test]
    fn test_missing_cache_key() {
        let error = calling!(for_controller::<CachingController>(), |c| c.set_cache())
            .unwrap()
            .should_have()
            .memory_cache(|cache| cache.containing_entry_with_key("other"))
            .unwrap_err();
        assert!(error.to_string().contains("'other' key"));
    }

    #[test]
    fn test_explicit_cache_dependency_is_shared() -> MvcTestResult<()> {
        let cache = MemoryCache::new();
        cache.set("seeded", 7_u32);
        let builder = for_controller::<CachingController>().with_dependency(cache.clone())?;
        calling!(builder, |c| c.set_cache())?
            .should_have()
            .memory_cache(|assertions| {
                assertions
                    .with_number_of_entries(2)?
                    .containing_entry_with_value("seeded", 7_u32)
            })?;
        assert!(cache.contains_key("test"));
        Ok(())
    }
}
