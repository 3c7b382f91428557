//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The file path
//! defaults to `config.yaml` and can be changed with the `-f` flag or the `WEBTOOLS_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! 1. **YAML config file** - base configuration (missing file means all defaults)
//! 2. **Environment variables** - variables prefixed with `WEBTOOLS_` override YAML values
//!
//! Nested values use double underscores, e.g. `WEBTOOLS_TOOLKIT__MAX_JSON_BYTES=4096` sets
//! `toolkit.max_json_bytes`.
//!
//! ## Example
//!
//! ```yaml
//! host: 127.0.0.1
//! port: 3000
//! upload_dir: ./uploads
//! static_dir: ./static
//! log_format: json
//! toolkit:
//!   max_upload_bytes: 10485760
//!   allowed_content_types: [image/png, image/jpeg]
//!   max_json_bytes: 1048576
//!   allow_unknown_json_fields: false
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::Error;

/// Upload limit used when none (or zero) is configured: 1 GiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 1024 * 1024 * 1024;
/// JSON body limit used when none (or zero) is configured: 1 MiB.
pub const DEFAULT_MAX_JSON_BYTES: usize = 1024 * 1024;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "WEBTOOLS_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Directory uploaded files are written to
    pub upload_dir: PathBuf,
    /// Directory downloads are served from
    pub static_dir: PathBuf,
    /// Console log format
    pub log_format: LogFormat,
    /// Limits and policies for the request helpers
    pub toolkit: ToolkitConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            upload_dir: PathBuf::from("./uploads"),
            static_dir: PathBuf::from("./static"),
            log_format: LogFormat::default(),
            toolkit: ToolkitConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Limits and policies applied by the upload pipeline and the JSON decoder.
///
/// Treat an instance as read-only once requests are in flight; share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolkitConfig {
    /// Maximum multipart body size in bytes. 0 means the 1 GiB default.
    pub max_upload_bytes: u64,
    /// Sniffed content types accepted for upload, matched case-insensitively.
    /// Empty allows every type.
    pub allowed_content_types: Vec<String>,
    /// Maximum JSON request body size in bytes. 0 means the 1 MiB default.
    pub max_json_bytes: usize,
    /// Accept JSON fields the target type does not declare
    pub allow_unknown_json_fields: bool,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_content_types: Vec::new(),
            max_json_bytes: DEFAULT_MAX_JSON_BYTES,
            allow_unknown_json_fields: false,
        }
    }
}

impl ToolkitConfig {
    /// Upload limit with the zero-means-default rule applied
    pub fn upload_limit(&self) -> u64 {
        if self.max_upload_bytes == 0 {
            DEFAULT_MAX_UPLOAD_BYTES
        } else {
            self.max_upload_bytes
        }
    }

    /// JSON body limit with the zero-means-default rule applied
    pub fn json_limit(&self) -> usize {
        if self.max_json_bytes == 0 {
            DEFAULT_MAX_JSON_BYTES
        } else {
            self.max_json_bytes
        }
    }

    /// Whether a sniffed content type may be uploaded
    pub fn permits(&self, content_type: &str) -> bool {
        self.allowed_content_types.is_empty()
            || self
                .allowed_content_types
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(content_type))
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            // WEBTOOLS_CONFIG names the file itself and is not a config key
            .merge(Env::prefixed("WEBTOOLS_").ignore(&["config"]).split("__"))
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<(), Error> {
        if self.upload_dir.as_os_str().is_empty() {
            return Err(Error::BadRequest {
                message: "Config validation: upload_dir must not be empty".to_string(),
            });
        }

        if let Some(blank) = self.toolkit.allowed_content_types.iter().position(|t| t.trim().is_empty()) {
            return Err(Error::BadRequest {
                message: format!("Config validation: toolkit.allowed_content_types[{blank}] is blank"),
            });
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
