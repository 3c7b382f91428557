use serde::Deserialize;
use utoipa::IntoParams;

/// Query parameters for downloads
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DownloadQuery {
    /// File name the browser should save the download as. Defaults to the stored name.
    pub name: Option<String>,
}
