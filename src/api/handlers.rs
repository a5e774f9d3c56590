use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

use super::{FlowsResponse, HealthResponse, SpeakRequest, SpeakResponse};
use crate::api::routes::AppState;
use crate::error::{
    product_description_failure, speech_failure, transcription_failure, ApiError, AppError,
};
use crate::flows::product_description::ProductDescriptionOutput;
use crate::flows::transcription::TranscriptionOutput;
use crate::flows::{ProductDescriptionInput, TranscriptionInput};
use crate::providers::{AudioEncoding, ProviderError, SynthesisRequest, VoiceSelection};

/// Synthesis input ceiling of the speech provider.
const MAX_TEXT_BYTES: usize = 5000;

/// Awaits a provider call, giving up once `deadline` has elapsed.
async fn within_deadline<T, F>(deadline: Duration, call: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result.map_err(AppError::from),
        Err(_) => Err(AppError::Timeout(deadline)),
    }
}

/// `en-GB-Neural2-A` -> `en-GB`; anything not shaped like a voice name falls
/// back to `default`.
fn language_code_for(voice: &str, default: &str) -> String {
    let mut parts = voice.split('-');
    match (parts.next(), parts.next()) {
        (Some(lang), Some(region))
            if (2..=3).contains(&lang.len())
                && lang.chars().all(|c| c.is_ascii_lowercase())
                && !region.is_empty()
                && region.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            format!("{}-{}", lang, region)
        }
        _ => default.to_string(),
    }
}

pub async fn speak(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SpeakRequest>, JsonRejection>,
) -> Result<Json<SpeakResponse>, ApiError> {
    synthesize(&state, payload).await.map(Json).map_err(speech_failure)
}

async fn synthesize(
    state: &AppState,
    payload: Result<Json<SpeakRequest>, JsonRejection>,
) -> Result<SpeakResponse, AppError> {
    let Json(request) = payload?;

    // Validate input
    let text = request
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Text to speak is required.".into()))?;

    if text.len() > MAX_TEXT_BYTES {
        return Err(AppError::Validation(format!(
            "Text exceeds the {} byte synthesis limit.",
            MAX_TEXT_BYTES
        )));
    }

    let defaults = &state.speech_defaults;
    let voice = request
        .voice
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| defaults.default_voice.clone());

    let synthesis = SynthesisRequest {
        text,
        voice: VoiceSelection {
            language_code: language_code_for(&voice, &defaults.default_language_code),
            name: voice,
        },
        encoding: AudioEncoding::Mp3,
    };

    let audio = within_deadline(state.provider_timeout, state.speech.synthesize(&synthesis))
        .await?
        .filter(|bytes| !bytes.is_empty())
        .ok_or(AppError::EmptyResult("No audio content received"))?;

    Ok(SpeakResponse {
        audio_content: BASE64.encode(audio),
    })
}

pub async fn transcribe(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TranscriptionInput>, JsonRejection>,
) -> Result<Json<TranscriptionOutput>, ApiError> {
    let result: Result<TranscriptionOutput, AppError> = async {
        let Json(input) = payload?;
        input.validate()?;
        within_deadline(state.provider_timeout, state.transcription.run(&input)).await
    }
    .await;

    result
        .map(Json)
        .map_err(|e| transcription_failure(e, state.mode))
}

pub async fn describe_product(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ProductDescriptionInput>, JsonRejection>,
) -> Result<Json<ProductDescriptionOutput>, ApiError> {
    let result: Result<ProductDescriptionOutput, AppError> = async {
        let Json(input) = payload?;
        input.validate()?;
        within_deadline(state.provider_timeout, state.product_description.run(&input)).await
    }
    .await;

    result.map(Json).map_err(product_description_failure)
}

pub async fn list_flows(State(state): State<Arc<AppState>>) -> Json<FlowsResponse> {
    Json(FlowsResponse {
        flows: state.flows(),
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
