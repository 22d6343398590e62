//! Tests for the derive and call-capture macros working together:
//! `#[derive(Reflect)]`, `#[controller]`, `calling!` and `calling_void!`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use probar_mvc::prelude::*;
use std::collections::BTreeMap;
use std::rc::Rc;

// ============================================================================
// Models
// ============================================================================

#[derive(Debug, Clone, PartialEq, Reflect)]
struct Article {
    id: u32,
    #[validate(required, length(max = 20))]
    title: String,
    #[validate(email)]
    author_email: String,
    #[validate(range(min = 0, max = 5))]
    rating: u8,
    tags: Vec<String>,
}

impl Article {
    fn sample() -> Self {
        Self {
            id: 1,
            title: "Ownership".to_string(),
            author_email: "author@example.com".to_string(),
            rating: 5,
            tags: vec!["rust".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Reflect)]
enum Status {
    Draft,
    Published,
}

#[derive(Debug, thiserror::Error)]
#[error("article {0} does not exist")]
struct MissingArticle(u32);

// ============================================================================
// Controller
// ============================================================================

#[derive(Debug, Default)]
struct ArticlesController {
    context: ControllerContext,
}

#[controller(route = "api/[controller]", authorize(roles = "Editor"))]
impl ArticlesController {
    #[mvc(http_post, validate_anti_forgery_token)]
    pub fn create(&mut self, article: Article) -> ActionResult {
        if !self.model_state().is_valid() {
            return self.bad_request_with_model_state();
        }
        self.created(&format!("/api/articles/{}", article.id), article)
    }

    #[mvc(http_get, allow_anonymous, action_name = "Show")]
    pub fn details(&self, id: u32) -> ActionResult {
        if id == 0 {
            throw(MissingArticle(id));
        }
        self.json(Article { id, ..Article::sample() })
    }

    #[mvc(http_get)]
    pub fn search(&self, query: String) -> Vec<Article> {
        vec![Article {
            title: query,
            ..Article::sample()
        }]
    }

    pub fn status(&self, published: bool) -> Status {
        if published {
            Status::Published
        } else {
            Status::Draft
        }
    }

    pub async fn load(&self, id: u32) -> ActionResult {
        self.ok_with(Article { id, ..Article::sample() })
    }

    pub fn remember(&mut self, key: String) {
        self.temp_data().set_string(key, "seen");
    }

    pub fn fail(&mut self) {
        panic!("storage offline");
    }
}

// ============================================================================
// Deep equality on derived models
// ============================================================================

mod reflect {
    use super::*;

    #[test]
    fn test_derived_records_compare_deeply() {
        assert!(are_deeply_equal(&Article::sample(), &Article::sample()));

        let mut tagged = Article::sample();
        tagged.tags.push("memory".to_string());
        assert!(!are_deeply_equal(&Article::sample(), &tagged));
    }

    #[test]
    fn test_difference_names_the_member() {
        let mut other = Article::sample();
        other.rating = 3;
        let result = probar_mvc::deep_equality(&Article::sample(), &other);
        assert!(!result.are_equal());
        assert_eq!(result.path(), "rating");
        assert_eq!(
            result.to_string(),
            "Difference occurs at 'rating'. Expected a value of '5', but in fact it was '3'."
        );
    }

    #[test]
    fn test_shared_pointers_compare_by_content() {
        let first = Rc::new(BTreeMap::from([("a".to_string(), 1)]));
        let second = Rc::new(BTreeMap::from([("a".to_string(), 1)]));
        assert!(are_deeply_equal(&first, &second));
    }

    #[test]
    fn test_enumerations() {
        assert!(are_deeply_equal(&Status::Draft, &Status::Draft));
        assert!(!are_deeply_equal(&Status::Draft, &Status::Published));
    }
}

// ============================================================================
// Controller metadata
// ============================================================================

mod metadata {
    use super::*;

    #[test]
    fn test_controller_attributes() -> MvcTestResult<()> {
        for_controller::<ArticlesController>()
            .should_have()?
            .attributes(|attributes| {
                attributes
                    .specifying_route("api/[controller]")?
                    .restricting_for_authorized_requests_with_roles("Editor")?
                    .with_total_number_of(2)
            })?;
        Ok(())
    }

    #[test]
    fn test_action_attributes() -> MvcTestResult<()> {
        calling!(for_controller::<ArticlesController>(), |c| c.details(7))?
            .should_have()
            .action_attributes(|attributes| {
                attributes
                    .restricting_for_http_method(Method::GET)?
                    .allowing_anonymous_requests()?
                    .changing_action_name_to("Show")
            })?;
        Ok(())
    }

    #[test]
    fn test_missing_attribute_message() {
        let error = calling!(for_controller::<ArticlesController>(), |c| c.create(Article::sample()))
            .unwrap()
            .should_have()
            .action_attributes(|attributes| attributes.restricting_for_http_method(Method::PUT))
            .unwrap_err();
        assert!(matches!(error, MvcTestError::AttributeAssertion { .. }));
        assert!(error.to_string().starts_with("When calling create action in ArticlesController"));
    }
}

// ============================================================================
// Invocation
// ============================================================================

mod invocation {
    use super::*;

    #[test]
    fn test_valid_argument_is_created() -> MvcTestResult<()> {
        common::init_tracing();
        let article = Article::sample();
        calling!(for_controller::<ArticlesController>(), |c| c.create(article))?
            .should_have()
            .valid_model_state()?
            .and_also()
            .should_return()?
            .created()?
            .at_location("/api/articles/1")?
            .with_value(Article::sample())?;
        Ok(())
    }

    #[test]
    fn test_invalid_argument_fills_model_state() -> MvcTestResult<()> {
        let article = Article {
            title: String::new(),
            author_email: "nobody".to_string(),
            ..Article::sample()
        };
        calling!(for_controller::<ArticlesController>(), |c| c.create(article))?
            .should_have()
            .invalid_model_state_with_errors(2)?
            .model_state(|state| {
                state
                    .containing_error_with_message("title", "The title field is required.")?
                    .containing_error("author_email")?
                    .containing_no_error("rating")
            })?
            .and_also()
            .should_return()?
            .bad_request()?;
        Ok(())
    }

    #[test]
    fn test_disabled_validation_leaves_model_state_alone() -> MvcTestResult<()> {
        let article = Article {
            title: String::new(),
            ..Article::sample()
        };
        let builder = for_controller::<ArticlesController>().without_validation();
        calling!(builder, |c| c.create(article))?
            .should_have()
            .valid_model_state()?;
        Ok(())
    }

    #[test]
    fn test_placeholder_argument_is_ignored() -> MvcTestResult<()> {
        let invoked = calling!(for_controller::<ArticlesController>(), |c| c.search(With::any::<String>()))?;
        let argument = &invoked.test_context().arguments()[0];
        assert!(argument.ignored);
        assert_eq!(argument.value, None);
        invoked
            .should_return()?
            .value_matching(|articles| articles.len() == 1 && articles[0].title.is_empty())?;
        Ok(())
    }

    #[test]
    fn test_plain_return_value() -> MvcTestResult<()> {
        calling!(for_controller::<ArticlesController>(), |c| c.status(true))?
            .should_return()?
            .value(Status::Published)?;
        Ok(())
    }

    #[test]
    fn test_json_result() -> MvcTestResult<()> {
        calling!(for_controller::<ArticlesController>(), |c| c.details(3))?
            .should_return()?
            .json()?
            .with_default_serializer_settings()?
            .with_value_matching(|article: &Article| article.id == 3)?;
        Ok(())
    }

    #[test]
    fn test_async_action_is_awaited() -> MvcTestResult<()> {
        let id = 9;
        calling!(for_controller::<ArticlesController>(), |c| c.load(id).await)?
            .should_return()?
            .ok()?
            .with_value(Article { id: 9, ..Article::sample() })?;
        Ok(())
    }

    #[test]
    fn test_thrown_error_is_caught() -> MvcTestResult<()> {
        calling!(for_controller::<ArticlesController>(), |c| c.details(0))?
            .should_throw()?
            .exception()
            .of_type::<MissingArticle>()?
            .with_message("article 0 does not exist")?;
        Ok(())
    }

    #[test]
    fn test_should_return_reports_exception() {
        let error = calling!(for_controller::<ArticlesController>(), |c| c.details(0))
            .unwrap()
            .should_return()
            .unwrap_err();
        assert!(matches!(error, MvcTestError::InvocationAssertion { .. }));
    }

    #[test]
    fn test_void_action_updates_temp_data() -> MvcTestResult<()> {
        let key = "visited".to_string();
        calling_void!(for_controller::<ArticlesController>(), |c| c.remember(key))?
            .should_return_empty()?
            .should_have()
            .temp_data(|temp_data| {
                temp_data
                    .with_number_of_entries(1)?
                    .containing_entry("visited", &"seen")
            })?;
        Ok(())
    }

    #[test]
    fn test_void_action_panic() -> MvcTestResult<()> {
        calling_void!(for_controller::<ArticlesController>(), |c| c.fail())?
            .should_throw()?
            .exception()
            .panic()?
            .with_message("storage offline")?;
        Ok(())
    }

    #[test]
    fn test_static_call_is_rejected() {
        let error = calling!(for_controller::<ArticlesController>(), |c| ArticlesController::status(c, true))
            .unwrap_err();
        assert!(matches!(error, MvcTestError::InvalidCallExpression { .. }));
    }

    #[test]
    fn test_pass_for_inspects_controller() -> MvcTestResult<()> {
        let builder = for_controller::<ArticlesController>().with_route_value("id", 4);
        calling!(builder, |c| c.details(4))?
            .should_pass_for()
            .the_route_data_matching(|route| route.get("id") == Some("4"))?
            .the_controller_matching(|controller| controller.model_state().is_valid())?;
        Ok(())
    }
}
