//! Test application configuration loaded from `testconfig.json` files.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use probar_mvc::prelude::*;
use probar_mvc::TestConfiguration;
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Default)]
struct ProductsController {
    context: ControllerContext,
}

#[controller]
impl ProductsController {
    pub fn details(&self, id: u32) -> ActionResult {
        self.ok_with(id)
    }
}

fn write_config(dir: &TempDir, json: &str) -> std::path::PathBuf {
    let path = dir.path().join("testconfig.json");
    fs::write(&path, json).expect("Failed to write config");
    path
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_missing_sections_use_defaults() -> MvcTestResult<()> {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, r#"{ "General": { "Environment": "Staging" } }"#);

    let configuration = TestConfiguration::from_file(&path)?;
    assert_eq!(configuration.general.environment, "Staging");
    assert!(configuration.controllers.model_state_validation);
    assert!(!configuration.controllers.resolve_route_values);
    assert!(configuration.routing.routes.is_empty());
    Ok(())
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let error = TestConfiguration::from_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(error, MvcTestError::Io(_)));
}

#[test]
fn test_malformed_file_is_json_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, "{ not json");
    let error = TestConfiguration::from_file(&path).unwrap_err();
    assert!(matches!(error, MvcTestError::Json(_)));
}

// ============================================================================
// Applying
// ============================================================================

#[test]
fn test_configured_routes_resolve_route_values() -> MvcTestResult<()> {
    common::init_tracing();
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(
        &dir,
        r#"{
            "Controllers": { "ResolveRouteValues": true },
            "Routing": {
                "Routes": [{ "Name": "catalog", "Template": "shop/{controller}/{action}/{id?}" }]
            }
        }"#,
    );

    let _app = TestApplication::builder()
        .with_configuration(TestConfiguration::from_file(&path)?)
        .establish()?;

    let id = 42;
    calling!(for_controller::<ProductsController>(), |c| c.details(id))?
        .should_pass_for()
        .the_route_data(|route| {
            assert_eq!(route.get("controller"), Some("Products"));
            assert_eq!(route.get("action"), Some("details"));
            assert_eq!(route.get("id"), Some("42"));
            assert_eq!(route.route_name.as_deref(), Some("catalog"));
        })?
        .and_also()
        .should_return()?
        .ok()?
        .with_value(42_u32)?;
    Ok(())
}

#[test]
fn test_disabled_validation_from_configuration() -> MvcTestResult<()> {
    let configuration = TestConfiguration::from_json_str(r#"{ "Controllers": { "ModelStateValidation": false } }"#)?;
    let _app = TestApplication::builder().with_configuration(configuration).establish()?;

    let builder = for_controller::<ProductsController>();
    assert!(!builder.test_context().model_state_validation());
    Ok(())
}

#[test]
fn test_application_guard_restores_default() -> MvcTestResult<()> {
    assert!(!TestApplication::is_established());
    {
        let _app = TestApplication::builder().establish()?;
        assert!(TestApplication::is_established());
    }
    assert!(!TestApplication::is_established());
    Ok(())
}
