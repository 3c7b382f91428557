use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body accepted and echoed by the JSON endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NamePayload {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SlugRequest {
    /// Text to turn into a slug
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SlugResponse {
    pub slug: String,
}
