pub mod handlers;
pub mod routes;


use serde::{Deserialize, Serialize};

use crate::flows::FlowDescriptor;

/// Both fields are optional so a missing `text` is reported by the handler.
#[derive(Debug, Default, Deserialize)]
pub struct SpeakRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakResponse {
    /// Base64 encoded MP3.
    pub audio_content: String,
}

#[derive(Debug, Serialize)]
pub struct FlowsResponse {
    pub flows: Vec<FlowDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
