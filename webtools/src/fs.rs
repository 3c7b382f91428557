//! Filesystem helpers shared by the upload pipeline.

use std::path::Path;

/// Permission bits for directories the toolkit creates.
pub const DIR_MODE: u32 = 0o755;

/// Create `path` and any missing parents. Succeeds if the directory already exists.
pub async fn create_dir_if_not_exist(path: impl AsRef<Path>) -> std::io::Result<()> {
    let path = path.as_ref();
    if tokio::fs::try_exists(path).await? {
        return Ok(());
    }

    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DIR_MODE);

    builder.create(path).await?;
    tracing::debug!(path = %path.display(), "Created directory");
    Ok(())
}

/// Final path component of a client-supplied file name.
///
/// Both `/` and `\` count as separators. Returns `None` when nothing usable is left (an empty
/// name, a trailing separator, `.` or `..`).
pub fn base_name(name: &str) -> Option<&str> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base {
        "" | "." | ".." => None,
        base => Some(base),
    }
}

/// Extension of `name` including the leading dot, or `""` when it has none.
///
/// The extension starts at the last `.` of the final path component, so `archive.tar.gz` yields
/// `.gz` and `.bashrc` yields `.bashrc`.
pub fn extension(name: &str) -> &str {
    let base_start = name.rfind(['/', '\\']).map_or(0, |i| i + 1);
    match name[base_start..].rfind('.') {
        Some(dot) => &name[base_start + dot..],
        None => "",
    }
}
