//! Cloud Text-to-Speech `text:synthesize` client.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{error_from_response, ProviderError, SpeechSynthesizer, SynthesisRequest};
use crate::config::SpeechConfig;

pub struct GoogleTtsClient {
    config: SpeechConfig,
    client: Client,
}

impl GoogleTtsClient {
    pub fn new(config: SpeechConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTtsClient {
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<Option<Vec<u8>>, ProviderError> {
        if self.config.api_key.is_empty() {
            return Err(ProviderError::NotConfigured("Text-to-Speech API key"));
        }

        let body = SynthesizeRequest {
            input: SynthesisInput {
                text: &request.text,
            },
            voice: VoiceParams {
                language_code: &request.voice.language_code,
                name: &request.voice.name,
            },
            audio_config: AudioConfig {
                audio_encoding: request.encoding.as_str(),
            },
        };

        tracing::debug!(
            text_len = request.text.len(),
            voice = %request.voice.name,
            "Text-to-Speech synthesis request"
        );

        let url = format!(
            "{}/text:synthesize",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let result: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let Some(encoded) = result.audio_content.filter(|c| !c.is_empty()) else {
            return Ok(None);
        };

        let audio = BASE64
            .decode(encoded)
            .map_err(|e| ProviderError::MalformedResponse(format!("audioContent: {}", e)))?;

        tracing::debug!(audio_bytes = audio.len(), "Text-to-Speech synthesis complete");

        Ok(Some(audio))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceParams<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceParams<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: Option<String>,
}
