//! Forced-download delivery of files from a directory.

use std::path::Path;

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, header},
    response::Response,
};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, warn};

/// Serve `base_dir/file_name` so that the browser saves it as `display_name`.
///
/// Content type, length, conditional and range requests, and the 404 for a missing file are all
/// handled by [`ServeFile`]. The `Content-Disposition` header is set on every response, and the
/// display name is written into it as given.
pub async fn serve_static_file(request: Request, base_dir: impl AsRef<Path>, file_name: &str, display_name: &str) -> Response {
    let path = base_dir.as_ref().join(file_name);
    debug!(path = %path.display(), display_name, "Serving file for download");

    let mut response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    };

    match HeaderValue::from_str(&format!("attachment; filename={display_name}")) {
        Ok(value) => {
            response.headers_mut().insert(header::CONTENT_DISPOSITION, value);
        }
        Err(e) => warn!(display_name, error = %e, "Display name is not a valid header value"),
    }

    response
}
