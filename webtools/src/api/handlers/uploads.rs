//! HTTP handlers for multipart uploads.

use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    response::Response,
};
use tracing::instrument;

use crate::AppState;
use crate::api::models::uploads::UploadQuery;
use crate::response::{JsonEnvelope, write_json};
use crate::upload::{self, UploadFailure, UploadedFile};

#[utoipa::path(
    post,
    path = "/upload",
    tag = "uploads",
    summary = "Upload files",
    description = "Store every file part of a multipart form in the upload directory. File types are \
        detected from content and checked against the configured allow-list. On failure the envelope's \
        `data` lists the files stored before the failing part.",
    params(UploadQuery),
    request_body(content_type = "multipart/form-data", description = "One or more file parts"),
    responses(
        (status = 201, description = "Files stored, listed in the envelope's `data`", body = [UploadedFile]),
        (status = 400, description = "Malformed multipart body or unusable file name"),
        (status = 413, description = "Upload larger than the configured limit"),
        (status = 415, description = "File type not permitted"),
        (status = 500, description = "Failed to write to disk")
    )
)]
#[instrument(skip_all, fields(rename = query.rename))]
pub async fn upload_files(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    request: Request,
) -> Result<Response, UploadFailure> {
    let files = upload::upload_many(&state.toolkit, request, &state.config.upload_dir, query.rename).await?;
    let message = format!("{} file(s) uploaded", files.len());

    Ok(write_json(StatusCode::CREATED, &JsonEnvelope::success(message, files), None)?)
}

#[utoipa::path(
    post,
    path = "/upload/one",
    tag = "uploads",
    summary = "Upload a single file",
    params(UploadQuery),
    request_body(content_type = "multipart/form-data", description = "A form with one file part"),
    responses(
        (status = 201, description = "File stored, returned in the envelope's `data`", body = UploadedFile),
        (status = 400, description = "No file in the form, or a malformed body"),
        (status = 413, description = "Upload larger than the configured limit"),
        (status = 415, description = "File type not permitted")
    )
)]
#[instrument(skip_all, fields(rename = query.rename))]
pub async fn upload_file(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    request: Request,
) -> Result<Response, UploadFailure> {
    let file = upload::upload_one(&state.toolkit, request, &state.config.upload_dir, query.rename).await?;

    Ok(write_json(StatusCode::CREATED, &JsonEnvelope::success("file uploaded", file), None)?)
}
