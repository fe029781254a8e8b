//! Endpoint registry: `(method, path)` lookup table filled by services at startup.
//!
//! # Routing
//!
//! - Exact match on the lower-cased path with trailing `/` removed
//! - Method must match too; a known path under the wrong method is still a 404
//! - Query string is parsed into [`ApiRequest::query`], never part of the key
//!
//! # Used by
//!
//! - `server/services/*` - each service adds its routes via [`ApiService`]
//! - `server/api.rs` - routes every incoming request through [`EndpointRegistry::dispatch`]

use super::response::{ApiError, ApiResponse};
use indexmap::IndexMap;
use log::{debug, error, warn};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }

    pub fn parse(s: &str) -> Option<Method> {
        if s.eq_ignore_ascii_case("GET") {
            Some(Method::Get)
        } else if s.eq_ignore_ascii_case("POST") {
            Some(Method::Post)
        } else {
            None
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request as seen by handlers, detached from the HTTP library
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiRequest {
    /// Raw method name (`GET`, `POST`, ...)
    pub method: String,
    /// Path without query string
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl ApiRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self { method: method.into(), path: path.into(), ..Default::default() }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    pub fn post(path: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self { body: body.into(), ..Self::new("POST", path) }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Convert a rouille request, reading at most `max_body` bytes of body.
    pub fn from_rouille(request: &rouille::Request, max_body: usize) -> Result<Self, ApiError> {
        let mut query = HashMap::new();
        for pair in request.raw_query_string().split('&') {
            let key = pair.split('=').next().unwrap_or_default();
            if key.is_empty() || query.contains_key(key) {
                continue;
            }
            // get_param handles percent-decoding of the value
            if let Some(value) = request.get_param(key) {
                query.insert(key.to_string(), value);
            }
        }

        let mut body = Vec::new();
        if let Some(data) = request.data() {
            let limit = u64::try_from(max_body).unwrap_or(u64::MAX).saturating_add(1);
            data.take(limit)
                .read_to_end(&mut body)
                .map_err(|e| ApiError::Validation(format!("Failed to read request body: {}", e)))?;
            if body.len() > max_body {
                return Err(ApiError::Validation(format!(
                    "Request body exceeds {} bytes",
                    max_body
                )));
            }
        }

        Ok(Self {
            method: request.method().to_string(),
            path: request.url(),
            query,
            body,
        })
    }

    /// Optional query parameter; present but unparsable is a validation error
    pub fn query_param<T: FromStr>(&self, name: &str) -> Result<Option<T>, ApiError> {
        match self.query.get(name) {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| ApiError::Validation(format!("Invalid value for '{}': {}", name, raw))),
        }
    }

    /// Deserialize the JSON body. Missing or malformed body is a validation error.
    pub fn json_body<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Err(ApiError::Validation("Request body is required".into()));
        }
        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))
    }

    /// Like [`json_body`](Self::json_body) but an empty body yields `T::default()`
    pub fn json_body_or_default<T: DeserializeOwned + Default>(&self) -> Result<T, ApiError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        self.json_body()
    }
}

pub type Handler = Arc<dyn Fn(&ApiRequest) -> ApiResponse + Send + Sync>;

/// Capability implemented by every service: add its routes to the registry
pub trait ApiService: Send + Sync {
    fn name(&self) -> &'static str;
    fn register_endpoints(self: Arc<Self>, registry: &mut EndpointRegistry);
}

/// `(method, normalized path)` -> handler
#[derive(Default)]
pub struct EndpointRegistry {
    routes: IndexMap<(Method, String), Handler>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of services, in order
    pub fn with_services(services: Vec<Arc<dyn ApiService>>) -> Self {
        let mut registry = Self::new();
        for service in services {
            registry.register_service(service);
        }
        registry
    }

    pub fn register_service(&mut self, service: Arc<dyn ApiService>) {
        let before = self.routes.len();
        let name = service.name();
        service.register_endpoints(self);
        debug!("Service {} registered {} endpoint(s)", name, self.routes.len() - before);
    }

    pub fn register_get<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static,
    {
        self.register(Method::Get, path, Arc::new(handler));
    }

    pub fn register_post<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static,
    {
        self.register(Method::Post, path, Arc::new(handler));
    }

    /// Add a route. Registering the same key twice replaces the earlier handler.
    pub fn register(&mut self, method: Method, path: &str, handler: Handler) {
        let key = (method, normalize_path(path));
        if self.routes.contains_key(&key) {
            warn!("Endpoint {} {} registered twice, replacing", method, key.1);
        }
        self.routes.insert(key, handler);
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered routes in registration order
    pub fn endpoints(&self) -> impl Iterator<Item = (Method, &str)> {
        self.routes.keys().map(|(m, p)| (*m, p.as_str()))
    }

    pub fn lookup(&self, method: &str, path: &str) -> Option<&Handler> {
        let method = Method::parse(method)?;
        self.routes.get(&(method, normalize_path(path)))
    }

    /// Route and run. Always returns a response, even if the handler panics.
    pub fn dispatch(&self, request: &ApiRequest) -> ApiResponse {
        let Some(handler) = self.lookup(&request.method, &request.path) else {
            return ApiResponse::error(&ApiError::RouteNotFound {
                method: request.method.clone(),
                path: request.path.clone(),
            });
        };

        match catch_unwind(AssertUnwindSafe(|| handler(request))) {
            Ok(response) => response,
            Err(_) => {
                error!("Handler panicked: {} {}", request.method, request.path);
                ApiResponse::error(&ApiError::Internal("request handler panicked".into()))
            }
        }
    }
}

/// Lower-case, no query, no trailing slash (except root)
pub fn normalize_path(path: &str) -> String {
    let path = path.split('?').next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}
