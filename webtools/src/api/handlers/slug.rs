//! HTTP handler for slug generation.

use axum::{http::StatusCode, response::Response};

use crate::api::models::json::{SlugRequest, SlugResponse};
use crate::errors::Result;
use crate::json::StrictJson;
use crate::response::{JsonEnvelope, write_json};
use crate::slug::slugify;

#[utoipa::path(
    post,
    path = "/slug",
    tag = "slug",
    summary = "Slugify text",
    request_body = SlugRequest,
    responses(
        (status = 200, description = "Slug in the envelope's `data`", body = SlugResponse),
        (status = 400, description = "Text empty, or empty once slugified")
    )
)]
pub async fn create_slug(StrictJson(request): StrictJson<SlugRequest>) -> Result<Response> {
    let slug = slugify(&request.text)?;
    write_json(StatusCode::OK, &JsonEnvelope::success("slug created", SlugResponse { slug }), None)
}
