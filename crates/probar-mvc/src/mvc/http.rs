//! HTTP context double.

use super::state::Session;
use super::user::ClaimsPrincipal;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;

/// Incoming request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Request method
    pub method: Method,
    /// URL scheme
    pub scheme: String,
    /// Host
    pub host: String,
    /// Path, e.g. `/home/index`
    pub path: String,
    /// Query string values
    pub query: BTreeMap<String, String>,
    /// Headers
    pub headers: HeaderMap,
    /// Form values
    pub form: BTreeMap<String, String>,
    /// Raw body
    pub body: Option<String>,
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self {
            method: Method::GET,
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            path: "/".to_string(),
            query: BTreeMap::new(),
            headers: HeaderMap::new(),
            form: BTreeMap::new(),
            body: None,
        }
    }
}

impl HttpRequest {
    /// GET request to `/`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the method
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the path
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the host
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the scheme
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Add a query value
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Add a form value
    #[must_use]
    pub fn with_form_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.insert(key.into(), value.into());
        self
    }

    /// Set a JSON body and content type
    #[must_use]
    pub fn with_json_body(mut self, body: &Value) -> Self {
        self.body = Some(body.to_string());
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self
    }

    /// Set a raw body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Header value as text
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Whether the request uses HTTPS
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.scheme.eq_ignore_ascii_case("https")
    }
}

/// Outgoing response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code
    pub status_code: StatusCode,
    /// Headers
    pub headers: HeaderMap,
    /// Body written by the action
    pub body: Option<String>,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self {
            status_code: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

impl HttpResponse {
    /// Content type header
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok())
    }
}

/// Everything known about a single request.
#[derive(Debug, Clone)]
pub struct HttpContext {
    /// Request
    pub request: HttpRequest,
    /// Response
    pub response: HttpResponse,
    /// User
    pub user: ClaimsPrincipal,
    /// Session
    pub session: Session,
    /// Per-request items
    pub items: BTreeMap<String, Value>,
    /// Request identifier used in logs
    pub trace_identifier: String,
}

impl Default for HttpContext {
    fn default() -> Self {
        Self {
            request: HttpRequest::default(),
            response: HttpResponse::default(),
            user: ClaimsPrincipal::anonymous(),
            session: Session::new(),
            items: BTreeMap::new(),
            trace_identifier: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl HttpContext {
    /// Fresh context with an anonymous user
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
