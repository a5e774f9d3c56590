//! Hosted AI provider abstractions.
//!
//! Handlers and flows only see the traits below; `main` wires in the Google
//! REST clients and tests substitute in-memory doubles.

pub mod gemini;
pub mod google_tts;

use async_trait::async_trait;
use serde::Deserialize;

pub use gemini::GeminiClient;
pub use google_tts::GoogleTtsClient;

/// Error type for provider operations.
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{message}")]
    Api { status: Option<u16>, message: String },

    #[error("{0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Response blocked by provider safety filters")]
    ContentFiltered,

    #[error("Provider returned an empty response")]
    EmptyResponse,

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Classification name reported in logs and development error details.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "ConfigurationError",
            ProviderError::InvalidRequest(_) => "InvalidRequestError",
            ProviderError::Api { .. } => "ApiError",
            ProviderError::RateLimited(_) => "RateLimitError",
            ProviderError::Network(_) => "NetworkError",
            ProviderError::ContentFiltered => "ContentFilteredError",
            ProviderError::EmptyResponse => "EmptyResponseError",
            ProviderError::MalformedResponse(_) => "MalformedResponseError",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Network(e.to_string())
    }
}

/// One piece of model input.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    /// Base64 payload with its MIME type.
    InlineData { mime_type: String, data: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationParams {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    /// When set the model is asked for JSON matching this schema.
    pub response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub parts: Vec<Part>,
    pub params: GenerationParams,
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Returns the concatenated text of the first candidate, which may be
    /// blank; each flow decides what a blank answer means.
    async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    Mp3,
}

impl AudioEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            AudioEncoding::Mp3 => "MP3",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSelection {
    pub language_code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: VoiceSelection,
    pub encoding: AudioEncoding,
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Returns raw audio bytes, or `None` when the provider sent no audio.
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<Option<Vec<u8>>, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    message: String,
}

/// Turns a non-success Google API response into a `ProviderError`.
pub(crate) async fn error_from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<GoogleErrorBody>(&body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                body
            }
        });

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        ProviderError::RateLimited(message)
    } else {
        ProviderError::Api {
            status: Some(status.as_u16()),
            message,
        }
    }
}
