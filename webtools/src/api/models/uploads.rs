use serde::Deserialize;
use utoipa::IntoParams;

/// Query parameters for the upload endpoints
#[derive(Debug, Deserialize, IntoParams)]
pub struct UploadQuery {
    /// Store files under random names (default true). With `false` the client's file name is
    /// kept and an existing file of that name is replaced.
    #[serde(default = "default_rename")]
    #[param(default = true)]
    pub rename: bool,
}

fn default_rename() -> bool {
    true
}
