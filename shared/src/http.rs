//! HTTP helpers for Lambda functions.

use lambda_http::{Body, Request, RequestExt, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};

use crate::error::FieldErrors;
use crate::Error;

/// Error response body.
///
/// `{error}` for client errors, `{error, message}` for failures where the
/// underlying cause is worth surfacing, `{error, errors}` for validation.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
            errors: None,
        }
    }

    pub fn with_message(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: Some(message.into()),
            errors: None,
        }
    }
}

/// Create a JSON response with the given status code and data.
pub fn json_response<T: Serialize>(status: u16, data: &T) -> Result<Response<Body>, lambda_http::Error> {
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(data)?))?)
}

/// Create an error response with the given status code and message.
pub fn error_response(status: u16, message: impl Into<String>) -> Result<Response<Body>, lambda_http::Error> {
    json_response(status, &ErrorBody::new(message))
}

/// Render an [`Error`] as a response.
///
/// Server-side failures report `context` as the error and the cause as the
/// message; client errors report their own message.
pub fn failure_response(err: &Error, context: &str) -> Result<Response<Body>, lambda_http::Error> {
    let status = err.status_code();
    let body = match err {
        Error::Validation(errors) => ErrorBody {
            error: "Validation failed".to_string(),
            message: None,
            errors: Some(errors.clone()),
        },
        Error::InvalidToken(detail) => ErrorBody::with_message("Invalid token", detail.as_str()),
        _ if status >= 500 => ErrorBody::with_message(context, err.to_string()),
        _ => ErrorBody::new(err.to_string()),
    };
    json_response(status, &body)
}

/// Render a handler outcome: `data` with `status`, or the error via [`failure_response`].
pub fn respond<T: Serialize>(
    status: u16,
    result: crate::Result<T>,
    context: &str,
) -> Result<Response<Body>, lambda_http::Error> {
    match result {
        Ok(data) => json_response(status, &data),
        Err(err) => {
            if err.status_code() >= 500 {
                error!(error = %err, "{}", context);
            } else {
                warn!(status = err.status_code(), error = %err, "Request rejected");
            }
            failure_response(&err, context)
        }
    }
}

/// Parse request body as JSON, returning a 400 response on failure.
///
/// Returns `Ok(Ok(T))` on successful parse, `Ok(Err(Response))` on parse error (400),
/// or `Err(lambda_http::Error)` on serialization failure.
pub fn parse_json_body<T: DeserializeOwned>(body: &Body) -> Result<Result<T, Response<Body>>, lambda_http::Error> {
    let bytes: &[u8] = body.as_ref();
    let parsed = if bytes.is_empty() {
        serde_json::from_slice(b"{}")
    } else {
        serde_json::from_slice(bytes)
    };
    match parsed {
        Ok(parsed) => Ok(Ok(parsed)),
        Err(e) => {
            let response = error_response(400, format!("Invalid request body: {}", e))?;
            Ok(Err(response))
        }
    }
}

/// Macro to parse request body, returning early with 400 on parse error.
///
/// Usage:
/// ```ignore
/// let request: MyRequest = parse_body!(event.body());
/// ```
#[macro_export]
macro_rules! parse_body {
    ($body:expr) => {
        match shared::http::parse_json_body($body)? {
            Ok(parsed) => parsed,
            Err(response) => return Ok(response),
        }
    };
}

/// Deserialize the query string into `T`. Repeated keys keep their first value.
pub fn query_as<T: DeserializeOwned>(event: &Request) -> crate::Result<T> {
    let params = event.query_string_parameters();
    let mut map = serde_json::Map::new();
    for (key, value) in params.iter() {
        if !map.contains_key(key) {
            map.insert(key.to_string(), serde_json::Value::String(value.to_string()));
        }
    }
    Ok(serde_json::from_value(serde_json::Value::Object(map))?)
}

/// Request path with the API Gateway stage prefix stripped.
pub fn route_path(event: &Request) -> &str {
    let raw_path = event.uri().path();
    // API Gateway REST APIs include the stage in the path
    raw_path.strip_prefix("/api").unwrap_or(raw_path)
}

/// Bearer token from the `Authorization` header, if any.
pub fn bearer_token(event: &Request) -> Option<&str> {
    event
        .headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
