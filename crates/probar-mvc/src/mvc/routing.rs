//! Route data and route value resolution.
//!
//! Conventional routes use templates like `{controller=Home}/{action=Index}/{id?}`.
//! Attribute routes come from `Route` attributes on the controller and the
//! action and may use the `[controller]` and `[action]` tokens.

use super::attributes::{ActionAttribute, ActionDescriptor};
use crate::reflection::names::controller_route_name;
use crate::result::{MvcTestError, MvcTestResult};
use std::collections::BTreeMap;
use tracing::debug;

/// Route values of the current request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteData {
    /// Route name that produced the values
    pub route_name: Option<String>,
    /// Values by key
    pub values: BTreeMap<String, String>,
}

impl RouteData {
    /// Empty route data
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Set a value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Overwrite values with `other`'s
    pub fn merge(&mut self, other: &BTreeMap<String, String>) {
        for (key, value) in other {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Number of values
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no values
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Parameter {
        name: String,
        default: Option<String>,
        optional: bool,
    },
}

/// A parsed route template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl RouteTemplate {
    /// Parse a template; braces must be balanced
    pub fn parse(template: &str) -> MvcTestResult<Self> {
        let segments = template
            .trim_matches('/')
            .split('/')
            .filter(|part| !part.is_empty())
            .map(parse_segment)
            .collect::<MvcTestResult<Vec<_>>>()?;
        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// Template text
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parameter names in order
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Parameter { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Default value of a parameter
    #[must_use]
    pub fn default_of(&self, parameter: &str) -> Option<&str> {
        self.segments.iter().find_map(|segment| match segment {
            Segment::Parameter { name, default, .. } if name == parameter => default.as_deref(),
            _ => None,
        })
    }

    /// Render a path from values; `None` when a required value is missing
    #[must_use]
    pub fn render(&self, values: &BTreeMap<String, String>) -> Option<String> {
        let mut parts = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => parts.push(text.clone()),
                Segment::Parameter {
                    name,
                    default,
                    optional,
                } => match values.get(name).or(default.as_ref()) {
                    Some(value) => parts.push(value.clone()),
                    None if *optional => {}
                    None => return None,
                },
            }
        }
        Some(format!("/{}", parts.join("/")))
    }
}

fn parse_segment(part: &str) -> MvcTestResult<Segment> {
    let Some(inner) = part.strip_prefix('{') else {
        if part.contains(['{', '}']) {
            return Err(invalid_template(part));
        }
        return Ok(Segment::Literal(part.to_string()));
    };
    let inner = inner.strip_suffix('}').ok_or_else(|| invalid_template(part))?;
    // Inline constraints such as `{id:int}` are accepted and ignored.
    let (inner, optional) = match inner.strip_suffix('?') {
        Some(rest) => (rest, true),
        None => (inner, false),
    };
    let (name, default) = match inner.split_once('=') {
        Some((name, default)) => (name, Some(default.to_string())),
        None => (inner, None),
    };
    let name = name.split(':').next().unwrap_or(name).trim();
    if name.is_empty() {
        return Err(invalid_template(part));
    }
    Ok(Segment::Parameter {
        name: name.to_string(),
        default,
        optional,
    })
}

fn invalid_template(part: &str) -> MvcTestError {
    MvcTestError::Configuration {
        message: format!("invalid route template segment '{part}'"),
    }
}

/// A named conventional route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Route name
    pub name: String,
    /// Parsed template
    pub template: RouteTemplate,
}

/// Registered conventional routes.
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<Route>,
}

/// Name of the route registered by [`Router::default`]
pub const DEFAULT_ROUTE_NAME: &str = "default";

/// Template of the route registered by [`Router::default`]
pub const DEFAULT_ROUTE_TEMPLATE: &str = "{controller=Home}/{action=Index}/{id?}";

impl Default for Router {
    fn default() -> Self {
        let template = RouteTemplate {
            source: DEFAULT_ROUTE_TEMPLATE.to_string(),
            segments: vec![
                Segment::Parameter {
                    name: "controller".to_string(),
                    default: Some("Home".to_string()),
                    optional: false,
                },
                Segment::Parameter {
                    name: "action".to_string(),
                    default: Some("Index".to_string()),
                    optional: false,
                },
                Segment::Parameter {
                    name: "id".to_string(),
                    default: None,
                    optional: true,
                },
            ],
        };
        Self {
            routes: vec![Route {
                name: DEFAULT_ROUTE_NAME.to_string(),
                template,
            }],
        }
    }
}

impl Router {
    /// Router with the default conventional route
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Router without routes
    #[must_use]
    pub fn empty() -> Self {
        Self { routes: Vec::new() }
    }

    /// Register a conventional route; a route with the same name is replaced
    pub fn map_route(&mut self, name: impl Into<String>, template: &str) -> MvcTestResult<&mut Self> {
        let name = name.into();
        let template = RouteTemplate::parse(template)?;
        self.routes.retain(|route| route.name != name);
        self.routes.push(Route { name, template });
        Ok(self)
    }

    /// Registered routes
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Route values for invoking an action with the given arguments.
    ///
    /// `arguments` pairs parameter names with rendered values; ignored
    /// arguments are left out by the caller.
    pub fn resolve(
        &self,
        controller_name: &str,
        controller_attributes: &[ActionAttribute],
        action: &ActionDescriptor,
        arguments: &[(String, String)],
    ) -> MvcTestResult<RouteData> {
        let controller = controller_route_name(controller_name);
        let mut data = RouteData::new();
        data.insert("controller", controller);
        data.insert("action", action.action_name.clone());

        let prefix = route_of(controller_attributes);
        let local = route_of(&action.attributes);
        let template = match (prefix, local) {
            (_, Some((template, _))) if template.starts_with('/') || template.starts_with("~/") => {
                Some(template.trim_start_matches('~').to_string())
            }
            (Some((prefix, _)), Some((template, _))) => Some(format!("{}/{}", prefix.trim_end_matches('/'), template)),
            (Some((prefix, _)), None) => Some(prefix.to_string()),
            (None, Some((template, _))) => Some(template.to_string()),
            (None, None) => None,
        };

        let template = match template {
            Some(template) => {
                data.route_name = local.or(prefix).and_then(|(_, name)| name.map(str::to_string));
                let replaced = template
                    .replace("[controller]", controller)
                    .replace("[action]", &action.action_name);
                RouteTemplate::parse(&replaced)?
            }
            None => match self.routes.first() {
                Some(route) => {
                    data.route_name = Some(route.name.clone());
                    route.template.clone()
                }
                None => return Ok(data),
            },
        };

        for parameter in template.parameter_names() {
            if parameter == "controller" || parameter == "action" {
                continue;
            }
            if let Some((_, value)) = arguments.iter().find(|(name, _)| name == parameter) {
                data.insert(parameter, value.clone());
            } else if let Some(default) = template.default_of(parameter) {
                data.insert(parameter, default);
            }
        }
        debug!(
            controller,
            action = %action.action_name,
            template = template.source(),
            values = data.len(),
            "resolved route values"
        );
        Ok(data)
    }
}

fn route_of(attributes: &[ActionAttribute]) -> Option<(&str, Option<&str>)> {
    attributes.iter().find_map(|attribute| match attribute {
        ActionAttribute::Route { template, name } => Some((template.as_str(), name.as_deref())),
        _ => None,
    })
}
