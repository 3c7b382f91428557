use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Multipart body is larger than the configured upload limit
    #[error("the uploaded file is too big")]
    UploadTooLarge { limit: u64 },

    /// Sniffed content type is not on the allow-list
    #[error("the uploaded file type is not permitted")]
    TypeNotPermitted { content_type: String },

    /// Client supplied a file name with no usable final path component
    #[error("invalid file name {name:?}")]
    InvalidFileName { name: String },

    /// `upload_one` was called on a form that carried no file part
    #[error("no file was uploaded")]
    NoFileUploaded,

    /// Body could not be parsed as multipart form data
    #[error("{message}")]
    Multipart { message: String },

    /// Syntax error or truncated JSON
    #[error("{}", malformed_message(.offset))]
    MalformedJson { offset: Option<usize> },

    /// JSON value has the wrong type for its slot in the target
    #[error("{}", invalid_value_message(.field, .offset))]
    InvalidJsonValue { field: Option<String>, offset: usize },

    #[error("request body must not be empty")]
    EmptyBody,

    #[error("request body contains unknown field \"{field}\"")]
    UnknownField { field: String },

    #[error("request body must not be larger than {limit} bytes")]
    JsonTooLarge { limit: usize },

    #[error("the request body must only contain a single JSON object")]
    MultipleJsonValues,

    /// Any other decoder failure, passed through unmodified
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Request body stream failed before it was fully read
    #[error("failed to read request body: {message}")]
    Body { message: String },

    /// Invalid request data, e.g. an unsluggable string
    #[error("{message}")]
    BadRequest { message: String },

    /// Filesystem failure, passed through verbatim
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn malformed_message(offset: &Option<usize>) -> String {
    match offset {
        Some(offset) => format!("request body contains badly-formed JSON (at position {offset})"),
        None => "request body contains badly-formed JSON".to_string(),
    }
}

fn invalid_value_message(field: &Option<String>, offset: &usize) -> String {
    match field {
        Some(field) => format!("request body contains an invalid value for the \"{field}\" field (at position {offset})"),
        None => format!("request body contains an invalid value (at position {offset})"),
    }
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::UploadTooLarge { .. } | Error::JsonTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::TypeNotPermitted { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::InvalidFileName { .. }
            | Error::NoFileUploaded
            | Error::Multipart { .. }
            | Error::MalformedJson { .. }
            | Error::InvalidJsonValue { .. }
            | Error::EmptyBody
            | Error::UnknownField { .. }
            | Error::MultipleJsonValues
            | Error::Json(_)
            | Error::Body { .. }
            | Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Io(_) | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for failures the client caused and can fix by changing the request
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.is_client_error() {
            tracing::debug!(status = status.as_u16(), "Client error: {}", self);
        } else {
            tracing::error!(status = status.as_u16(), "Internal toolkit error: {:#}", self);
        }

        match crate::response::write_error(&self, Some(status)) {
            Ok(response) => response,
            // The envelope is two plain fields; this only fires if serde_json itself breaks
            Err(_) => (status, self.to_string()).into_response(),
        }
    }
}

/// Type alias for toolkit operation results
pub type Result<T> = std::result::Result<T, Error>;
