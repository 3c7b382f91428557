//! # webtools: request-handling helpers for Axum services
//!
//! `webtools` bundles the chores most HTTP services end up writing by hand: accepting file
//! uploads safely, decoding JSON bodies strictly, answering in a consistent JSON shape, forcing
//! downloads, and a few small string and filesystem utilities. The helpers are plain async
//! functions over Axum's [`Request`](axum::extract::Request) and
//! [`Response`](axum::response::Response), so they drop into any handler.
//!
//! ## Overview
//!
//! The **upload pipeline** ([`upload`]) streams every file part of a `multipart/form-data`
//! request to a directory. The type of each file is detected from its first 512 bytes
//! ([`sniff`]), never from what the client declared, and checked against an allow-list. Files
//! can keep their (sanitized) client name or get a random one from [`random`]. When a part fails,
//! the files already stored are reported back in [`upload::UploadFailure`] rather than lost.
//!
//! The **JSON decoder** ([`json`]) accepts exactly one JSON value per body, enforces a size
//! limit, optionally rejects unknown fields, and maps decoder failures to a fixed set of
//! messages that are safe to show to clients. Handlers use it through the
//! [`StrictJson`](json::StrictJson) extractor.
//!
//! **Responses** ([`response`]) share one envelope, `{ "error", "message", "data"? }`, for
//! success and failure alike. [`errors::Error`] renders itself through it, so handlers just
//! return `Result`.
//!
//! **Downloads** ([`static_files`]) are served by `tower-http` with a
//! `Content-Disposition: attachment` header added. [`slug`] and [`fs`] hold the remaining
//! helpers.
//!
//! Limits and policies live in [`config::ToolkitConfig`], which is passed explicitly to each
//! operation and shared read-only between requests.
//!
//! ## Demo server
//!
//! The `webtools` binary mounts the helpers behind a small HTTP API (see [`api`]) configured
//! from `config.yaml` and `WEBTOOLS_*` environment variables (see [`config`]).
//!
//! ```no_run
//! use webtools::{Application, config::{Args, Config}};
//! use clap::Parser;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     // Run with graceful shutdown on Ctrl+C
//!     Application::new(config)
//!         .await?
//!         .serve(async { tokio::signal::ctrl_c().await.unwrap_or_default() })
//!         .await
//! }
//! ```

pub mod api;
pub mod config;
pub mod errors;
pub mod fs;
pub mod json;
mod openapi;
pub mod random;
pub mod response;
pub mod slug;
pub mod sniff;
pub mod static_files;
pub mod telemetry;
pub mod upload;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::FromRef,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use config::ToolkitConfig;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info};
use utoipa::OpenApi;

use crate::openapi::ApiDoc;

/// Application state shared across all request handlers.
///
/// `toolkit` is the same value as `config.toolkit`, split out so extractors such as
/// [`StrictJson`](json::StrictJson) can reach it without the rest of the config.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Arc<Config>,
    pub toolkit: Arc<ToolkitConfig>,
}

impl AppState {
    pub fn from_config(config: Config) -> Self {
        let toolkit = Arc::new(config.toolkit.clone());
        Self::builder().config(Arc::new(config)).toolkit(toolkit).build()
    }
}

impl FromRef<AppState> for Arc<ToolkitConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.toolkit.clone()
    }
}

/// Build the application router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .route("/upload", post(api::handlers::uploads::upload_files))
        .route("/upload/one", post(api::handlers::uploads::upload_file))
        .route("/json", post(api::handlers::json::echo_json))
        .route("/slug", post(api::handlers::slug::create_slug))
        .route("/download/{file}", get(api::handlers::downloads::download_file))
        .with_state(state);

    // Add tracing layer
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}

/// The demo server.
///
/// 1. **Create**: [`Application::new`] prepares the upload directory and builds the router
/// 2. **Serve**: [`Application::serve`] binds to the configured address and handles requests
///    until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting webtools with configuration: {:#?}", config);

        fs::create_dir_if_not_exist(&config.upload_dir).await?;

        let router = build_router(AppState::from_config(config.clone()));

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            upload_dir = %self.config.upload_dir.display(),
            static_dir = %self.config.static_dir.display(),
            "webtools listening on http://{}",
            bind_addr
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server stopped");
        Ok(())
    }
}
