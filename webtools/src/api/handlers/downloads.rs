//! HTTP handler for forced downloads.

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument};

use crate::AppState;
use crate::api::models::downloads::DownloadQuery;
use crate::fs::base_name;
use crate::static_files::serve_static_file;

#[utoipa::path(
    get,
    path = "/download/{file}",
    tag = "downloads",
    summary = "Download a file",
    description = "Serve a file from the static directory with `Content-Disposition: attachment`.",
    params(
        ("file" = String, Path, description = "Name of the file in the static directory"),
        DownloadQuery
    ),
    responses(
        (status = 200, description = "File contents"),
        (status = 206, description = "Requested byte range"),
        (status = 404, description = "No such file")
    )
)]
#[instrument(skip(state, request))]
pub async fn download_file(
    State(state): State<AppState>,
    Path(file): Path<String>,
    Query(query): Query<DownloadQuery>,
    request: Request,
) -> Response {
    // Only plain names inside the static directory
    let Some(name) = base_name(&file).filter(|name| *name == file) else {
        debug!("Refusing download outside the static directory");
        return StatusCode::NOT_FOUND.into_response();
    };

    let display_name = query.name.as_deref().unwrap_or(name);
    serve_static_file(request, &state.config.static_dir, name, display_name).await
}
