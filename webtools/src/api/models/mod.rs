//! Request and response types for the demo API.

pub mod downloads;
pub mod json;
pub mod uploads;
