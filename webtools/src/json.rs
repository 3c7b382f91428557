//! Strict JSON request decoding.
//!
//! [`read_json`] accepts exactly one JSON value per request body, enforces the configured size
//! limit, optionally rejects fields the target type does not declare, and turns decoder failures
//! into a fixed set of client-facing messages (see [`Error`] for the wording).
//!
//! Handlers normally use the [`StrictJson`] extractor, which pulls the [`ToolkitConfig`] out of
//! router state.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRef, FromRequest, Request},
};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::config::ToolkitConfig;
use crate::errors::{Error, Result};

/// Read and decode a request body into `T` under the policies in `config`.
pub async fn read_json<T: DeserializeOwned>(config: &ToolkitConfig, body: Body) -> Result<T> {
    let limit = config.json_limit();
    let bytes = read_limited(body, limit).await?;
    decode_strict(&bytes, config.allow_unknown_json_fields)
}

/// Collect `body`, failing as soon as more than `limit` bytes have arrived.
async fn read_limited(body: Body, limit: usize) -> Result<Bytes> {
    let mut stream = body.into_data_stream();
    let mut buf = BytesMut::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::Body { message: e.to_string() })?;
        if buf.len() + chunk.len() > limit {
            tracing::debug!(limit, "JSON body exceeds limit");
            return Err(Error::JsonTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(buf.freeze())
}

/// Decode exactly one JSON value from `bytes`.
pub fn decode_strict<T: DeserializeOwned>(bytes: &[u8], allow_unknown_fields: bool) -> Result<T> {
    if bytes.iter().all(|&b| is_json_whitespace(b)) {
        return Err(Error::EmptyBody);
    }

    let mut de = serde_json::Deserializer::from_slice(bytes);
    let mut track = serde_path_to_error::Track::new();
    let mut unknown: Option<String> = None;

    let result = serde_ignored::deserialize(serde_path_to_error::Deserializer::new(&mut de, &mut track), |path| {
        // The first unknown field is the one reported
        if unknown.is_none() {
            unknown = Some(path.to_string());
        }
    });

    let value: T = match result {
        Ok(value) => value,
        Err(err) => return Err(classify(bytes, err, track.path())),
    };

    if !allow_unknown_fields && let Some(field) = unknown {
        return Err(Error::UnknownField { field });
    }

    // Anything but trailing whitespace is a second value
    de.end().map_err(|_| Error::MultipleJsonValues)?;

    Ok(value)
}

fn is_json_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Map a decoder error onto the client-facing taxonomy.
fn classify(bytes: &[u8], err: serde_json::Error, path: serde_path_to_error::Path) -> Error {
    match err.classify() {
        Category::Syntax => Error::MalformedJson {
            offset: Some(byte_offset(bytes, err.line(), err.column())),
        },
        // Input ended in the middle of a value
        Category::Eof => Error::MalformedJson { offset: None },
        Category::Data => {
            let message = err.to_string();

            // Target types with `deny_unknown_fields` report unknown keys as data errors
            if let Some(field) = message.strip_prefix("unknown field `").and_then(|rest| rest.split('`').next()) {
                return Error::UnknownField { field: field.to_string() };
            }

            if message.starts_with("invalid type") || message.starts_with("invalid value") || message.starts_with("invalid length") {
                let field = path.iter().next().is_some().then(|| path.to_string());
                return Error::InvalidJsonValue {
                    field,
                    offset: byte_offset(bytes, err.line(), err.column()),
                };
            }

            Error::Json(err)
        }
        Category::Io => Error::Json(err),
    }
}

/// Convert serde_json's 1-based line/column into a byte offset from the start of the body.
fn byte_offset(bytes: &[u8], line: usize, column: usize) -> usize {
    let line_start: usize = bytes
        .split(|&b| b == b'\n')
        .take(line.saturating_sub(1))
        .map(|l| l.len() + 1)
        .sum();
    (line_start + column).min(bytes.len())
}

/// Extractor that decodes the body with [`read_json`].
///
/// Requires an `Arc<ToolkitConfig>` reachable from router state. Rejections render as the
/// standard JSON error envelope.
#[derive(Debug, Clone)]
pub struct StrictJson<T>(pub T);

impl<S, T> FromRequest<S> for StrictJson<T>
where
    T: DeserializeOwned,
    Arc<ToolkitConfig>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let config = Arc::<ToolkitConfig>::from_ref(state);
        read_json(&config, req.into_body()).await.map(StrictJson)
    }
}
