//! Gemini `generateContent` client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{
    error_from_response, GenerationParams, GenerationRequest, GenerativeModel, Part,
    ProviderError,
};
use crate::config::GeminiConfig;

pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            method
        )
    }
}

fn build_generation_config(params: &GenerationParams) -> Option<GenerationConfig> {
    if *params == GenerationParams::default() {
        return None;
    }

    Some(GenerationConfig {
        temperature: params.temperature,
        max_output_tokens: params.max_output_tokens,
        response_mime_type: params
            .response_schema
            .as_ref()
            .map(|_| "application/json".to_string()),
        response_schema: params.response_schema.clone(),
    })
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError> {
        if self.config.api_key.is_empty() {
            return Err(ProviderError::NotConfigured("Gemini API key"));
        }

        let generation_config = build_generation_config(&request.params);
        let parts: Vec<ContentPart> = request.parts.into_iter().map(ContentPart::from).collect();

        tracing::debug!(
            model = %self.config.model,
            parts = parts.len(),
            "Sending request to Gemini API"
        );

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config,
        };

        let response = self
            .client
            .post(self.api_url("generateContent"))
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        if api_response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_ref())
            .is_some()
        {
            return Err(ProviderError::ContentFiltered);
        }

        let candidate = api_response
            .candidates
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?;

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(ProviderError::ContentFiltered);
        }

        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| match p {
                ContentPart::Text { text } => Some(text),
                ContentPart::InlineData { .. } => None,
            })
            .collect();

        if let Some(usage) = api_response.usage_metadata {
            tracing::debug!(
                model = %self.config.model,
                input_tokens = usage.prompt_token_count.unwrap_or(0),
                output_tokens = usage.candidates_token_count.unwrap_or(0),
                "Gemini generation complete"
            );
        }

        Ok(text)
    }
}

// Gemini wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl From<Part> for ContentPart {
    fn from(part: Part) -> Self {
        match part {
            Part::Text(text) => ContentPart::Text { text },
            Part::InlineData { mime_type, data } => ContentPart::InlineData {
                inline_data: InlineData { mime_type, data },
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}
