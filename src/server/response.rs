//! Response envelope and error taxonomy.
//!
//! Every response is a JSON object with a `success` flag. Failures add
//! `error` (human readable) and `kind` (machine readable). Domain failures
//! answer HTTP 200 so a polling agent only has to look at `success`.

use crate::core::{DispatchError, NavError};
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Failure categories a handler can report
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("Endpoint not found: {method} {path}")]
    RouteNotFound { method: String, path: String },
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    MissingParameter(String),
    #[error("Player not found")]
    PlayerNotFound,
    #[error("Waypoint system not found")]
    WaypointSystemNotFound,
    #[error("Command failed: {0}")]
    CommandFailed(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Wire `kind` string
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::RouteNotFound { .. } => "route_not_found",
            ApiError::Validation(_) => "validation",
            ApiError::MissingParameter(_) => "missing_parameter",
            ApiError::PlayerNotFound => "player_not_found",
            ApiError::WaypointSystemNotFound => "waypoint_system_not_found",
            ApiError::CommandFailed(_) => "command_failed",
            ApiError::Internal(_) => "internal",
        }
    }

    /// HTTP status code
    pub fn status(&self) -> u16 {
        match self {
            ApiError::RouteNotFound { .. } => 404,
            ApiError::Validation(_) | ApiError::MissingParameter(_) => 400,
            ApiError::Internal(_) => 500,
            ApiError::PlayerNotFound
            | ApiError::WaypointSystemNotFound
            | ApiError::CommandFailed(_) => 200,
        }
    }
}

impl From<NavError> for ApiError {
    fn from(err: NavError) -> Self {
        match err {
            NavError::Unavailable => ApiError::WaypointSystemNotFound,
            e @ NavError::InvalidNode { .. } => ApiError::Validation(e.to_string()),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        ApiError::CommandFailed(err.to_string())
    }
}

/// Status code plus JSON body, independent of the HTTP library
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    /// `success:true` merged into the fields of `data`.
    ///
    /// Non-object payloads land under `data`.
    pub fn success<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self { status: 200, body: merge_flag(value, true) },
            Err(e) => Self::error(&ApiError::Internal(format!("Failed to serialize response: {}", e))),
        }
    }

    /// Live data could not be read in time; `data` holds defaults
    pub fn degraded<T: Serialize>(data: &T, message: impl Into<String>) -> Self {
        let mut response = Self::success(data);
        if let Value::Object(map) = &mut response.body {
            if map.get("success") == Some(&Value::Bool(true)) {
                map.insert("kind".into(), Value::from("degraded"));
                map.insert("message".into(), Value::from(message.into()));
            }
        }
        response
    }

    pub fn error(err: &ApiError) -> Self {
        Self {
            status: err.status(),
            body: json!({
                "success": false,
                "error": err.to_string(),
                "kind": err.kind(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.body.get("success").and_then(Value::as_bool).unwrap_or(false)
    }
}

impl From<ApiError> for ApiResponse {
    fn from(err: ApiError) -> Self {
        Self::error(&err)
    }
}

impl From<Result<ApiResponse, ApiError>> for ApiResponse {
    fn from(result: Result<ApiResponse, ApiError>) -> Self {
        result.unwrap_or_else(|e| Self::error(&e))
    }
}

fn merge_flag(value: Value, success: bool) -> Value {
    match value {
        Value::Object(mut map) => {
            map.insert("success".into(), Value::Bool(success));
            Value::Object(map)
        }
        Value::Null => {
            let mut map = Map::new();
            map.insert("success".into(), Value::Bool(success));
            Value::Object(map)
        }
        other => json!({ "success": success, "data": other }),
    }
}
