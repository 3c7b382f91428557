//! Uniform JSON responses.
//!
//! Every response the toolkit produces uses the same envelope:
//!
//! ```json
//! { "error": false, "message": "uploaded", "data": [ ... ] }
//! ```
//!
//! `error` is `true` when the request failed. `data` is left out entirely when there is no
//! payload.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// The envelope wrapped around every JSON response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonEnvelope<T = serde_json::Value> {
    pub error: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl JsonEnvelope<serde_json::Value> {
    /// Failure envelope with no payload
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            data: None,
        }
    }
}

impl<T> JsonEnvelope<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            error: false,
            message: message.into(),
            data: Some(data),
        }
    }
}

/// Serialize `payload` into a response with `status` and `Content-Type: application/json`.
///
/// `extra_headers` are applied after the content type, so a caller may override it. If
/// serialization fails no response is built and the error is returned.
pub fn write_json<T: Serialize>(status: StatusCode, payload: &T, extra_headers: Option<HeaderMap>) -> Result<Response> {
    let body = serde_json::to_vec(payload)?;

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(extra) = extra_headers {
        // Caller headers replace existing values of the same name
        for name in extra.keys() {
            headers.remove(name);
        }
        for (name, value) in extra.iter() {
            headers.append(name.clone(), value.clone());
        }
    }

    Ok(response)
}

/// Failure envelope carrying `err`'s message. `status` defaults to 400.
pub fn write_error<E: std::fmt::Display + ?Sized>(err: &E, status: Option<StatusCode>) -> Result<Response> {
    let status = status.unwrap_or(StatusCode::BAD_REQUEST);
    write_json(status, &JsonEnvelope::failure(err.to_string()), None)
}
