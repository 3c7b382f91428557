//! HTTP request handlers.
//!
//! - [`downloads`]: forced downloads from the static directory
//! - [`json`]: strict JSON decoding
//! - [`slug`]: slug generation
//! - [`uploads`]: multipart uploads
//!
//! Handlers return [`crate::errors::Error`] (or [`crate::upload::UploadFailure`]), which render
//! as the JSON error envelope with a matching status code.

pub mod downloads;
pub mod json;
pub mod slug;
pub mod uploads;
