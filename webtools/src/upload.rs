//! Multipart file ingestion.
//!
//! [`upload_many`] streams every file part of a `multipart/form-data` request into a target
//! directory. Each part is sniffed from its first bytes (the client-declared content type is
//! ignored), checked against [`ToolkitConfig::allowed_content_types`], optionally given a random
//! name, and copied to disk chunk by chunk, so a part is never held in memory as a whole.
//!
//! Parts are processed in the order they arrive. The first failure stops the call, and the files
//! already written for earlier parts are handed back inside [`UploadFailure`] so the caller can
//! decide whether to keep or delete them. The file of the failing part itself is never reported,
//! though a partially written copy may remain on disk.
//!
//! A body that turns out to exceed the upload limit is the exception: files stored before the
//! limit was hit are removed and the failure carries none.

use std::path::Path;

use axum::{
    extract::Request,
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::config::ToolkitConfig;
use crate::errors::{Error, Result};
use crate::fs::{base_name, create_dir_if_not_exist, extension};
use crate::random;
use crate::response::{JsonEnvelope, write_json};
use crate::sniff::{self, SNIFF_LEN};

/// Length of the random stem given to renamed uploads.
pub const RANDOM_NAME_LEN: usize = 25;

/// A file written to disk by the upload pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UploadedFile {
    /// Name of the file inside the target directory
    pub new_name: String,
    /// File name as submitted by the client, reduced to its final path component
    pub original_name: String,
    /// Bytes written
    pub size_bytes: u64,
}

/// An upload call that stopped early.
///
/// `uploaded` holds every file completed before `error` occurred; those files are on disk and now
/// belong to the caller.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct UploadFailure {
    pub uploaded: Vec<UploadedFile>,
    pub error: Error,
}

impl From<Error> for UploadFailure {
    fn from(error: Error) -> Self {
        Self {
            uploaded: Vec::new(),
            error,
        }
    }
}

impl IntoResponse for UploadFailure {
    fn into_response(self) -> Response {
        if self.uploaded.is_empty() {
            return self.error.into_response();
        }

        let status = self.error.status_code();
        let envelope = JsonEnvelope {
            error: true,
            message: self.error.to_string(),
            data: Some(&self.uploaded),
        };
        match write_json(status, &envelope, None) {
            Ok(response) => response,
            Err(e) => e.into_response(),
        }
    }
}

/// Upload the files in `request` to `target_dir`.
///
/// With `rename` each file is stored as 25 random characters plus the original extension;
/// without it the client's file name is used as is, and an existing file of that name is
/// overwritten.
#[instrument(skip(config, request, target_dir))]
pub async fn upload_many(
    config: &ToolkitConfig,
    request: Request,
    target_dir: impl AsRef<Path>,
    rename: bool,
) -> std::result::Result<Vec<UploadedFile>, UploadFailure> {
    let target_dir = target_dir.as_ref();

    create_dir_if_not_exist(target_dir).await.map_err(Error::from)?;
    let mut multipart = open_multipart(config, request)?;

    let mut uploaded = Vec::new();
    match store_parts(config, &mut multipart, target_dir, rename, &mut uploaded).await {
        Ok(()) => {
            debug!(count = uploaded.len(), "Upload complete");
            Ok(uploaded)
        }
        Err(error @ Error::UploadTooLarge { .. }) => {
            // An oversize body is rejected as a whole
            discard(target_dir, &uploaded).await;
            warn!(error = %error, discarded = uploaded.len(), "Upload aborted");
            Err(error.into())
        }
        Err(error) => {
            warn!(error = %error, completed = uploaded.len(), "Upload aborted");
            Err(UploadFailure { uploaded, error })
        }
    }
}

async fn discard(target_dir: &Path, files: &[UploadedFile]) {
    for file in files {
        if let Err(e) = tokio::fs::remove_file(target_dir.join(&file.new_name)).await {
            warn!(new_name = %file.new_name, error = %e, "Failed to remove stored file");
        }
    }
}

/// Upload a form expected to carry a single file and return it.
///
/// Delegates to [`upload_many`]; if the form carried more than one file the rest are still
/// written but only the first is returned.
pub async fn upload_one(
    config: &ToolkitConfig,
    request: Request,
    target_dir: impl AsRef<Path>,
    rename: bool,
) -> std::result::Result<UploadedFile, UploadFailure> {
    upload_many(config, request, target_dir, rename)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::NoFileUploaded.into())
}

fn open_multipart(config: &ToolkitConfig, request: Request) -> Result<multer::Multipart<'static>> {
    let limit = config.upload_limit();
    let (parts, body) = request.into_parts();

    // Reject declared oversize bodies before reading anything
    if let Some(length) = content_length(&parts.headers)
        && length > limit
    {
        debug!(length, limit, "Declared upload size exceeds limit");
        return Err(Error::UploadTooLarge { limit });
    }

    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Multipart {
            message: "request is not multipart/form-data".to_string(),
        })?;
    let boundary = multer::parse_boundary(content_type).map_err(|e| Error::Multipart {
        message: format!("invalid multipart request: {e}"),
    })?;

    let constraints = multer::Constraints::new().size_limit(multer::SizeLimit::new().whole_stream(limit));
    Ok(multer::Multipart::with_constraints(body.into_data_stream(), boundary, constraints))
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers.get(header::CONTENT_LENGTH)?.to_str().ok()?.parse().ok()
}

fn multipart_error(err: multer::Error, limit: u64) -> Error {
    match err {
        multer::Error::StreamSizeExceeded { .. } => Error::UploadTooLarge { limit },
        other => Error::Multipart {
            message: format!("failed to parse multipart data: {other}"),
        },
    }
}

async fn store_parts(
    config: &ToolkitConfig,
    multipart: &mut multer::Multipart<'static>,
    target_dir: &Path,
    rename: bool,
    uploaded: &mut Vec<UploadedFile>,
) -> Result<()> {
    let limit = config.upload_limit();

    while let Some(mut field) = multipart.next_field().await.map_err(|e| multipart_error(e, limit))? {
        // Plain form value, or a file input the client left empty
        if field.file_name().is_none_or(str::is_empty) {
            while field.chunk().await.map_err(|e| multipart_error(e, limit))?.is_some() {}
            continue;
        }

        let file = store_part(config, field, target_dir, rename).await?;
        uploaded.push(file);
    }

    Ok(())
}

async fn store_part(config: &ToolkitConfig, mut field: multer::Field<'static>, target_dir: &Path, rename: bool) -> Result<UploadedFile> {
    let limit = config.upload_limit();
    let submitted = field.file_name().unwrap_or_default().to_string();
    let original_name = base_name(&submitted)
        .ok_or_else(|| Error::InvalidFileName { name: submitted.clone() })?
        .to_string();

    // Everything read while sniffing is written out first, so nothing is lost
    let mut head = BytesMut::with_capacity(SNIFF_LEN);
    while head.len() < SNIFF_LEN {
        match field.chunk().await.map_err(|e| multipart_error(e, limit))? {
            Some(chunk) => head.extend_from_slice(&chunk),
            None => break,
        }
    }

    let content_type = sniff::detect_content_type(&head);
    if !config.permits(content_type) {
        info!(file_name = %original_name, content_type, "Rejected upload with disallowed content type");
        return Err(Error::TypeNotPermitted {
            content_type: content_type.to_string(),
        });
    }

    let new_name = if rename {
        format!("{}{}", random::generate(RANDOM_NAME_LEN), extension(&original_name))
    } else {
        original_name.clone()
    };
    let path = target_dir.join(&new_name);

    let mut out = tokio::fs::File::create(&path).await?;
    out.write_all(&head).await?;
    let mut size_bytes = head.len() as u64;

    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limit))? {
        out.write_all(&chunk).await?;
        size_bytes += chunk.len() as u64;
    }
    // Wait for the last write to land so the size on disk matches
    out.flush().await?;

    info!(
        file_name = %original_name,
        new_name = %new_name,
        content_type,
        size_bytes,
        "Stored uploaded file"
    );

    Ok(UploadedFile {
        new_name,
        original_name,
        size_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FormPart, TINY_PNG, multipart_body, multipart_request, png_of_size};

    fn allow(types: &[&str]) -> ToolkitConfig {
        ToolkitConfig {
            allowed_content_types: types.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upload_cases() {
        // (name, allowed types, rename, expect error)
        let cases = [
            ("allowed no rename", vec!["image/jpeg", "image/png"], false, false),
            ("allowed rename", vec!["image/jpeg", "image/png"], true, false),
            ("not allowed", vec!["image/jpeg"], true, true),
        ];

        for (name, types, rename, error_expected) in cases {
            let tmp = tempfile::tempdir().unwrap();
            let request = multipart_request(&[FormPart::file("file", "./testdata/img.png", TINY_PNG)]);

            let result = upload_many(&allow(&types), request, tmp.path(), rename).await;

            match result {
                Ok(files) => {
                    assert!(!error_expected, "{name}: expected an error");
                    assert_eq!(files.len(), 1, "{name}");
                    let path = tmp.path().join(&files[0].new_name);
                    assert!(path.exists(), "{name}: expected file to exist");
                    assert_eq!(std::fs::metadata(&path).unwrap().len(), files[0].size_bytes);
                }
                Err(failure) => {
                    assert!(error_expected, "{name}: unexpected error {}", failure.error);
                    assert!(failure.uploaded.is_empty(), "{name}");
                }
            }
        }
    }

    #[tokio::test]
    async fn test_png_upload_preserves_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        // Larger than the sniff window so the copy spans it
        let data = png_of_size(10_000);
        let request = multipart_request(&[FormPart::file("file", "img.png", &data)]);

        let files = upload_many(&allow(&["image/png"]), request, tmp.path(), true).await.unwrap();

        assert_eq!(files.len(), 1);
        let file = &files[0];
        assert_eq!(file.original_name, "img.png");
        assert_eq!(file.size_bytes, data.len() as u64);
        assert_eq!(file.new_name.len(), RANDOM_NAME_LEN + ".png".len());
        assert!(file.new_name.ends_with(".png"));
        assert_eq!(std::fs::read(tmp.path().join(&file.new_name)).unwrap(), data);
    }

    #[tokio::test]
    async fn test_disallowed_type_message() {
        let tmp = tempfile::tempdir().unwrap();
        let request = multipart_request(&[FormPart::file("file", "img.png", TINY_PNG)]);

        let failure = upload_many(&allow(&["image/jpeg"]), request, tmp.path(), true).await.unwrap_err();

        assert!(failure.error.to_string().contains("not permitted"));
        assert!(matches!(failure.error, Error::TypeNotPermitted { ref content_type } if content_type == "image/png"));
        assert!(failure.uploaded.is_empty());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_allow_list_is_case_insensitive() {
        let tmp = tempfile::tempdir().unwrap();
        let request = multipart_request(&[FormPart::file("file", "img.png", TINY_PNG)]);

        let files = upload_many(&allow(&["IMAGE/PNG"]), request, tmp.path(), true).await.unwrap();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_declared_type_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        // Claims to be a PNG, but the bytes are plain text
        let part = FormPart::file("file", "fake.png", b"just some text").with_content_type("image/png");
        let request = multipart_request(&[part]);

        let failure = upload_many(&allow(&["image/png"]), request, tmp.path(), true).await.unwrap_err();
        assert!(matches!(failure.error, Error::TypeNotPermitted { .. }));
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_earlier_files() {
        let tmp = tempfile::tempdir().unwrap();
        let request = multipart_request(&[
            FormPart::file("first", "a.png", TINY_PNG),
            FormPart::file("second", "b.bin", b"\x01\x02\x03binary"),
            FormPart::file("third", "c.png", TINY_PNG),
        ]);

        let failure = upload_many(&allow(&["image/png"]), request, tmp.path(), true).await.unwrap_err();

        assert!(matches!(failure.error, Error::TypeNotPermitted { .. }));
        assert_eq!(failure.uploaded.len(), 1);
        assert_eq!(failure.uploaded[0].original_name, "a.png");
        assert!(tmp.path().join(&failure.uploaded[0].new_name).exists());
        // Processing stopped at the failing part
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_multiple_files_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let request = multipart_request(&[
            FormPart::text("title", "holiday"),
            FormPart::file("file", "one.png", TINY_PNG),
            FormPart::file("file", "two.txt", b"hello"),
        ]);

        let files = upload_many(&ToolkitConfig::default(), request, tmp.path(), false).await.unwrap();

        let names: Vec<_> = files.iter().map(|f| f.new_name.as_str()).collect();
        assert_eq!(names, vec!["one.png", "two.txt"]);
        assert_eq!(files[1].size_bytes, 5);
        assert_eq!(std::fs::read_to_string(tmp.path().join("two.txt")).unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_no_rename_strips_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let request = multipart_request(&[FormPart::file("file", "../../evil.png", TINY_PNG)]);

        let files = upload_many(&ToolkitConfig::default(), request, tmp.path(), false).await.unwrap();

        assert_eq!(files[0].new_name, "evil.png");
        assert!(tmp.path().join("evil.png").exists());
    }

    #[tokio::test]
    async fn test_rename_without_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let request = multipart_request(&[FormPart::file("file", "README", b"read me")]);

        let files = upload_many(&ToolkitConfig::default(), request, tmp.path(), true).await.unwrap();

        assert_eq!(files[0].new_name.len(), RANDOM_NAME_LEN);
        assert!(!files[0].new_name.contains('.'));
    }

    #[tokio::test]
    async fn test_unusable_file_name() {
        let tmp = tempfile::tempdir().unwrap();
        let request = multipart_request(&[FormPart::file("file", "..", TINY_PNG)]);

        let failure = upload_many(&ToolkitConfig::default(), request, tmp.path(), false).await.unwrap_err();
        assert!(matches!(failure.error, Error::InvalidFileName { .. }));
    }

    #[tokio::test]
    async fn test_empty_file_part() {
        let tmp = tempfile::tempdir().unwrap();
        let request = multipart_request(&[FormPart::file("file", "empty.txt", b"")]);

        let files = upload_many(&ToolkitConfig::default(), request, tmp.path(), true).await.unwrap();
        assert_eq!(files[0].size_bytes, 0);
    }

    #[tokio::test]
    async fn test_empty_file_input_is_not_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        // What a browser sends for a file input with nothing selected
        let request = multipart_request(&[FormPart::file("file", "", b"")]);

        let files = upload_many(&ToolkitConfig::default(), request, tmp.path(), true).await.unwrap();

        assert!(files.is_empty());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_no_rename_overwrites_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let second = png_of_size(2_000);

        let request = multipart_request(&[FormPart::file("file", "img.png", TINY_PNG)]);
        upload_many(&ToolkitConfig::default(), request, tmp.path(), false).await.unwrap();
        let request = multipart_request(&[FormPart::file("file", "img.png", &second)]);
        let files = upload_many(&ToolkitConfig::default(), request, tmp.path(), false).await.unwrap();

        assert_eq!(files[0].new_name, "img.png");
        assert_eq!(files[0].size_bytes, second.len() as u64);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
        assert_eq!(std::fs::read(tmp.path().join("img.png")).unwrap(), second);
    }

    #[tokio::test]
    async fn test_limit_hit_after_stored_file_removes_it() {
        use futures::channel::mpsc;

        let tmp = tempfile::tempdir().unwrap();
        let config = ToolkitConfig {
            max_upload_bytes: 1_024,
            ..Default::default()
        };

        let (content_type, body) = multipart_body(&[
            FormPart::file("first", "a.png", TINY_PNG),
            FormPart::file("second", "b.png", &png_of_size(4_096)),
        ]);
        // First chunk ends just after the first part; the rest arrives later
        let delimiter = b"\r\n--webtools-test-boundary\r\n";
        let split = body.windows(delimiter.len()).position(|w| w == delimiter).unwrap() + delimiter.len();
        let (tx, rx) = mpsc::unbounded::<std::result::Result<bytes::Bytes, std::io::Error>>();
        tx.unbounded_send(Ok(bytes::Bytes::copy_from_slice(&body[..split]))).unwrap();
        let rest = bytes::Bytes::copy_from_slice(&body[split..]);
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            tx.unbounded_send(Ok(rest)).unwrap();
        });

        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::CONTENT_TYPE, content_type)
            .body(axum::body::Body::from_stream(rx))
            .unwrap();

        let failure = upload_many(&config, request, tmp.path(), true).await.unwrap_err();

        assert!(matches!(failure.error, Error::UploadTooLarge { limit: 1_024 }), "got {:?}", failure.error);
        assert!(failure.uploaded.is_empty());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_zero_files() {
        let tmp = tempfile::tempdir().unwrap();
        let request = multipart_request(&[FormPart::text("title", "nothing here")]);

        let files = upload_many(&ToolkitConfig::default(), request, tmp.path(), true).await.unwrap();
        assert!(files.is_empty());

        let request = multipart_request(&[FormPart::text("title", "nothing here")]);
        let failure = upload_one(&ToolkitConfig::default(), request, tmp.path(), true).await.unwrap_err();
        assert!(matches!(failure.error, Error::NoFileUploaded));
    }

    #[tokio::test]
    async fn test_upload_one() {
        let tmp = tempfile::tempdir().unwrap();
        let request = multipart_request(&[FormPart::file("file", "./testdata/img.png", TINY_PNG)]);

        let file = upload_one(&ToolkitConfig::default(), request, tmp.path(), true).await.unwrap();

        assert!(tmp.path().join(&file.new_name).exists());
        assert_eq!(file.size_bytes, TINY_PNG.len() as u64);
    }

    #[tokio::test]
    async fn test_creates_target_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("uploads").join("nested");
        let request = multipart_request(&[FormPart::file("file", "img.png", TINY_PNG)]);

        upload_one(&ToolkitConfig::default(), request, &target, true).await.unwrap();
        assert!(target.is_dir());
    }

    #[tokio::test]
    async fn test_declared_length_over_limit() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ToolkitConfig {
            max_upload_bytes: 64,
            ..Default::default()
        };
        let mut request = multipart_request(&[FormPart::file("file", "img.png", &png_of_size(1_000))]);
        request
            .headers_mut()
            .insert(header::CONTENT_LENGTH, axum::http::HeaderValue::from_static("1200"));

        let failure = upload_many(&config, request, tmp.path(), true).await.unwrap_err();

        assert!(matches!(failure.error, Error::UploadTooLarge { limit: 64 }));
        assert_eq!(failure.error.to_string(), "the uploaded file is too big");
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_streamed_body_over_limit() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ToolkitConfig {
            max_upload_bytes: 256,
            ..Default::default()
        };
        // No Content-Length header: the limit is enforced while streaming
        let request = multipart_request(&[FormPart::file("file", "img.png", &png_of_size(4_096))]);

        let failure = upload_many(&config, request, tmp.path(), true).await.unwrap_err();
        assert!(matches!(failure.error, Error::UploadTooLarge { .. }), "got {:?}", failure.error);
    }

    #[tokio::test]
    async fn test_not_multipart() {
        let tmp = tempfile::tempdir().unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from("{}"))
            .unwrap();

        let failure = upload_many(&ToolkitConfig::default(), request, tmp.path(), true).await.unwrap_err();
        assert!(matches!(failure.error, Error::Multipart { .. }));
    }
}
