//! Uniform JSON response envelope
//!
//! Every response the service emits, success or failure, uses the shape
//! `{success, message, data?, errors?, timestamp}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build a full envelope response.
pub fn envelope(
    status: StatusCode,
    success: bool,
    message: &str,
    data: Option<Value>,
    errors: Option<Value>,
) -> Response {
    let mut body = json!({
        "success": success,
        "message": message,
        "timestamp": timestamp(),
    });
    if let Some(data) = data {
        body["data"] = data;
    }
    if let Some(errors) = errors {
        body["errors"] = errors;
    }
    (status, Json(body)).into_response()
}

/// 200 success envelope
pub fn ok(message: &str, data: Value) -> Response {
    envelope(StatusCode::OK, true, message, Some(data), None)
}

/// 200 success envelope without a data payload
pub fn ok_empty(message: &str) -> Response {
    envelope(StatusCode::OK, true, message, None, None)
}

/// 201 success envelope
pub fn created(message: &str, data: Value) -> Response {
    envelope(StatusCode::CREATED, true, message, Some(data), None)
}

/// Error envelope with a per-category errors object
pub fn error(status: StatusCode, message: &str, errors: Value) -> Response {
    envelope(status, false, message, None, Some(errors))
}
