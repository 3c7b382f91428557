//! HTTP surface over the toolkit.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! # Routes
//!
//! - `POST /upload`, `POST /upload/one`: multipart uploads into `upload_dir`
//! - `POST /json`: strict JSON decoding, echoing the payload back
//! - `POST /slug`: slug generation
//! - `GET /download/{file}`: forced download from `static_dir`
//!
//! Every JSON response, success or failure, uses the envelope from [`crate::response`].
//! The OpenAPI document is served at `/openapi.json`.

pub mod handlers;
pub mod models;
