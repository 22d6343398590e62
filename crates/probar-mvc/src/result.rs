//! Result and error types for probar-mvc.
//!
//! Configuration errors abort a fluent chain at the point of misuse.
//! Assertion errors are the only variants meant to fail a test; each result
//! category carries its own variant so a failure names what was being checked.

use thiserror::Error;

/// Result type for probar-mvc operations
pub type MvcTestResult<T> = Result<T, MvcTestError>;

/// Errors that can occur while building or asserting a controller test
#[derive(Debug, Error)]
pub enum MvcTestError {
    /// The captured call is not an instance method call
    #[error("{message}")]
    InvalidCallExpression {
        /// Error message
        message: String,
    },

    /// The same dependency type was registered twice
    #[error("Dependency {dependency} is already registered for {controller} controller.")]
    DuplicateDependency {
        /// Friendly name of the dependency type
        dependency: String,
        /// Friendly name of the controller type
        controller: String,
    },

    /// Operation called in the wrong builder state
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// No constructor accepts the explicitly registered dependencies
    #[error(
        "{controller} could not be instantiated because it contains no constructor taking {}.",
        format_parameter_list(.dependencies)
    )]
    NoMatchingConstructor {
        /// Friendly name of the controller type
        controller: String,
        /// Friendly names of the registered dependency types
        dependencies: Vec<String>,
    },

    /// Constructor parameters could not be resolved from the services
    #[error(
        "{controller} could not be instantiated because the following dependencies could not be resolved: {}.",
        .dependencies.join(", ")
    )]
    UnresolvedDependencies {
        /// Friendly name of the controller type
        controller: String,
        /// Friendly names of the missing dependency types
        dependencies: Vec<String>,
    },

    /// An asynchronous action was invoked from inside a running async runtime
    #[error("Cannot block on {action} from inside an async runtime; run the test on a plain thread.")]
    BlockingInsideRuntime {
        /// Action name
        action: String,
    },

    /// Test configuration could not be applied
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// Action result assertion failed
    #[error("{message}")]
    ActionResultAssertion {
        /// Error message
        message: String,
    },

    /// An exception was (or was not) caught contrary to expectations
    #[error("{message}")]
    InvocationAssertion {
        /// Error message
        message: String,
    },

    /// Caught exception does not match the expectations
    #[error("{message}")]
    ExceptionAssertion {
        /// Error message
        message: String,
    },

    /// Ok result assertion failed
    #[error("{message}")]
    OkResultAssertion {
        /// Error message
        message: String,
    },

    /// JSON result assertion failed
    #[error("{message}")]
    JsonResultAssertion {
        /// Error message
        message: String,
    },

    /// View result assertion failed
    #[error("{message}")]
    ViewResultAssertion {
        /// Error message
        message: String,
    },

    /// Redirect result assertion failed
    #[error("{message}")]
    RedirectResultAssertion {
        /// Error message
        message: String,
    },

    /// Created result assertion failed
    #[error("{message}")]
    CreatedResultAssertion {
        /// Error message
        message: String,
    },

    /// Content result assertion failed
    #[error("{message}")]
    ContentResultAssertion {
        /// Error message
        message: String,
    },

    /// Status code assertion failed
    #[error("{message}")]
    HttpStatusCodeAssertion {
        /// Error message
        message: String,
    },

    /// Response model assertion failed
    #[error("{message}")]
    ResponseModelAssertion {
        /// Error message
        message: String,
    },

    /// Model state assertion failed
    #[error("{message}")]
    ModelStateAssertion {
        /// Error message
        message: String,
    },

    /// Memory cache, session or temp data assertion failed
    #[error("{message}")]
    DataProviderAssertion {
        /// Error message
        message: String,
    },

    /// Controller or action attribute assertion failed
    #[error("{message}")]
    AttributeAssertion {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MvcTestError {
    /// Whether this error is an assertion failure rather than a setup error
    #[must_use]
    pub const fn is_assertion(&self) -> bool {
        matches!(
            self,
            Self::ActionResultAssertion { .. }
                | Self::InvocationAssertion { .. }
                | Self::ExceptionAssertion { .. }
                | Self::OkResultAssertion { .. }
                | Self::JsonResultAssertion { .. }
                | Self::ViewResultAssertion { .. }
                | Self::RedirectResultAssertion { .. }
                | Self::CreatedResultAssertion { .. }
                | Self::ContentResultAssertion { .. }
                | Self::HttpStatusCodeAssertion { .. }
                | Self::ResponseModelAssertion { .. }
                | Self::ModelStateAssertion { .. }
                | Self::DataProviderAssertion { .. }
                | Self::AttributeAssertion { .. }
        )
    }
}

fn format_parameter_list(dependencies: &[String]) -> String {
    match dependencies.len() {
        0 => "no parameters".to_string(),
        1 => format!("{} as parameter", dependencies[0]),
        _ => format!("{} as parameters", dependencies.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_dependency_message() {
        let error = MvcTestError::DuplicateDependency {
            dependency: "Repository".to_string(),
            controller: "HomeController".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Dependency Repository is already registered for HomeController controller."
        );
        assert!(!error.is_assertion());
    }

    #[test]
    fn test_no_matching_constructor_message() {
        let error = MvcTestError::NoMatchingConstructor {
            controller: "HomeController".to_string(),
            dependencies: vec!["Repository".to_string(), "Clock".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "HomeController could not be instantiated because it contains no constructor taking Repository, Clock as parameters."
        );
    }

    #[test]
    fn test_assertion_variants_are_flagged() {
        let error = MvcTestError::JsonResultAssertion {
            message: "When calling Index action in HomeController expected JSON.".to_string(),
        };
        assert!(error.is_assertion());
        assert!(error.to_string().starts_with("When calling"));
    }
}
