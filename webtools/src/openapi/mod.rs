//! OpenAPI document for the demo API, served at `/openapi.json`.

use utoipa::OpenApi;

use crate::api;
use crate::upload::UploadedFile;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "webtools",
        description = "Upload, JSON, slug and download helpers exposed over HTTP. Every JSON response is \
            wrapped in `{ \"error\": bool, \"message\": string, \"data\"?: any }`."
    ),
    paths(
        api::handlers::uploads::upload_files,
        api::handlers::uploads::upload_file,
        api::handlers::json::echo_json,
        api::handlers::slug::create_slug,
        api::handlers::downloads::download_file,
    ),
    components(schemas(
        UploadedFile,
        api::models::json::NamePayload,
        api::models::json::SlugRequest,
        api::models::json::SlugResponse,
    )),
    tags(
        (name = "uploads", description = "Multipart file uploads"),
        (name = "json", description = "Strict JSON decoding"),
        (name = "slug", description = "Slug generation"),
        (name = "downloads", description = "Forced downloads"),
    )
)]
pub struct ApiDoc;
