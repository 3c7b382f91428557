//! HTTP handler demonstrating strict JSON decoding.

use axum::{http::StatusCode, response::Response};

use crate::api::models::json::NamePayload;
use crate::errors::Result;
use crate::json::StrictJson;
use crate::response::{JsonEnvelope, write_json};

#[utoipa::path(
    post,
    path = "/json",
    tag = "json",
    summary = "Decode a JSON document",
    description = "Decode exactly one JSON object under the configured size and unknown-field policy, \
        and echo it back.",
    request_body = NamePayload,
    responses(
        (status = 200, description = "Decoded payload in the envelope's `data`", body = NamePayload),
        (status = 400, description = "Empty, malformed, or multi-value body, or a field error"),
        (status = 413, description = "Body larger than the configured limit")
    )
)]
pub async fn echo_json(StrictJson(payload): StrictJson<NamePayload>) -> Result<Response> {
    tracing::debug!(name = %payload.name, "Decoded JSON payload");
    write_json(StatusCode::OK, &JsonEnvelope::success("decoded", payload), None)
}

#[cfg(test)]
mod tests {
    use crate::api::models::json::NamePayload;
    use crate::config::ToolkitConfig;
    use crate::response::JsonEnvelope;
    use crate::test_utils::{create_test_app, create_test_config};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_echo_json() {
        let tmp = tempfile::tempdir().unwrap();
        let server = create_test_app(create_test_config(tmp.path(), ToolkitConfig::default())).await;

        let response = server.post("/json").json(&json!({"name": "test"})).await;

        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.header("content-type"), "application/json");
        let envelope: JsonEnvelope<NamePayload> = response.json();
        assert!(!envelope.error);
        assert_eq!(envelope.data.unwrap().name, "test");
    }

    #[tokio::test]
    async fn test_errors_use_envelope() {
        let tmp = tempfile::tempdir().unwrap();
        let server = create_test_app(create_test_config(tmp.path(), ToolkitConfig::default())).await;

        let cases = [
            (r#"{"name": "test"}{"name": "test"}"#, "the request body must only contain a single JSON object"),
            (r#"{"name": "test", "unknown": 1}"#, "request body contains unknown field \"unknown\""),
            ("", "request body must not be empty"),
        ];

        for (body, message) in cases {
            let response = server.post("/json").text(body).await;

            assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{body}");
            let envelope: JsonEnvelope = response.json();
            assert!(envelope.error);
            assert_eq!(envelope.message, message);
        }
    }

    #[tokio::test]
    async fn test_unknown_fields_allowed_by_config() {
        let tmp = tempfile::tempdir().unwrap();
        let toolkit = ToolkitConfig {
            allow_unknown_json_fields: true,
            ..Default::default()
        };
        let server = create_test_app(create_test_config(tmp.path(), toolkit)).await;

        let response = server.post("/json").json(&json!({"name": "test", "unknown": "test"})).await;

        assert_eq!(response.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_body_over_limit() {
        let tmp = tempfile::tempdir().unwrap();
        let toolkit = ToolkitConfig {
            max_json_bytes: 8,
            ..Default::default()
        };
        let server = create_test_app(create_test_config(tmp.path(), toolkit)).await;

        let response = server.post("/json").json(&json!({"name": "much too long"})).await;

        assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        let envelope: JsonEnvelope = response.json();
        assert_eq!(envelope.message, "request body must not be larger than 8 bytes");
    }
}
