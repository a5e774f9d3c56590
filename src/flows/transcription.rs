use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::FlowDescriptor;
use crate::providers::{
    GenerationParams, GenerationRequest, GenerativeModel, Part, ProviderError,
};

/// Inline audio accepted by the model API.
const MAX_AUDIO_BYTES: usize = 20 * 1024 * 1024;

const PROMPT: &str = "Transcribe the spoken content of the attached audio verbatim. \
Return only the transcription text, without timestamps, speaker labels or commentary. \
If the audio contains no speech, return an empty line.";

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TranscriptionInput {
    /// `data:audio/<type>[;params];base64,<payload>`
    #[validate(custom(function = "validate_audio_data_uri"))]
    pub audio_data_uri: String,
    /// BCP-47 hint, e.g. `en-US`.
    #[validate(length(min = 2, max = 35, message = "language must be 2-35 characters"))]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionOutput {
    pub transcription: String,
}

#[derive(Debug, PartialEq, Eq)]
struct AudioDataUri<'a> {
    mime_type: &'a str,
    data: &'a str,
}

fn parse_audio_data_uri(uri: &str) -> Result<AudioDataUri<'_>, &'static str> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or("audioDataUri must use the data: scheme")?;
    let (mime_type, data) = rest
        .split_once(";base64,")
        .ok_or("audioDataUri must be base64 encoded")?;

    // `audio/webm;codecs=opus` -> `audio/webm`
    let mime_type = mime_type.split(';').next().unwrap_or_default().trim();
    if !mime_type.starts_with("audio/") || mime_type.len() == "audio/".len() {
        return Err("audioDataUri must carry an audio/* MIME type");
    }
    if data.is_empty() {
        return Err("audioDataUri has no audio payload");
    }

    Ok(AudioDataUri { mime_type, data })
}

fn validate_audio_data_uri(uri: &str) -> Result<(), ValidationError> {
    let invalid = |message: &'static str| {
        let mut err = ValidationError::new("audio_data_uri");
        err.message = Some(message.into());
        err
    };

    let parsed = parse_audio_data_uri(uri).map_err(invalid)?;

    // Cheap size check before decoding.
    if parsed.data.len() / 4 * 3 > MAX_AUDIO_BYTES {
        return Err(invalid("audioDataUri exceeds the 20 MiB inline audio limit"));
    }
    BASE64
        .decode(parsed.data)
        .map_err(|_| invalid("audioDataUri payload is not valid base64"))?;

    Ok(())
}

pub struct TranscriptionFlow {
    model: Arc<dyn GenerativeModel>,
}

impl TranscriptionFlow {
    pub const NAME: &'static str = "transcribeAudio";

    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    pub fn descriptor(&self) -> FlowDescriptor {
        FlowDescriptor {
            name: Self::NAME,
            model: self.model.model_name().to_string(),
        }
    }

    /// Expects input that already passed validation.
    pub async fn run(
        &self,
        input: &TranscriptionInput,
    ) -> Result<TranscriptionOutput, ProviderError> {
        let request = build_request(input)?;
        let text = self.model.generate(request).await?;

        Ok(TranscriptionOutput {
            transcription: text.trim().to_string(),
        })
    }
}

fn build_request(input: &TranscriptionInput) -> Result<GenerationRequest, ProviderError> {
    let audio = parse_audio_data_uri(&input.audio_data_uri)
        .map_err(|e| ProviderError::InvalidRequest(e.to_string()))?;

    let mut prompt = PROMPT.to_string();
    if let Some(language) = &input.language {
        prompt.push_str(&format!(" The speaker is expected to use language '{}'.", language));
    }

    Ok(GenerationRequest {
        parts: vec![
            Part::InlineData {
                mime_type: audio.mime_type.to_string(),
                data: audio.data.to_string(),
            },
            Part::Text(prompt),
        ],
        params: GenerationParams {
            temperature: Some(0.0),
            ..Default::default()
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(uri: &str) -> TranscriptionInput {
        TranscriptionInput {
            audio_data_uri: uri.to_string(),
            language: None,
        }
    }

    #[test]
    fn test_parse_data_uri() {
        let parsed = parse_audio_data_uri("data:audio/webm;base64,AAAA").unwrap();
        assert_eq!(
            parsed,
            AudioDataUri {
                mime_type: "audio/webm",
                data: "AAAA"
            }
        );
    }

    #[test]
    fn test_mime_parameters_are_dropped() {
        let parsed = parse_audio_data_uri("data:audio/webm;codecs=opus;base64,AAAA").unwrap();
        assert_eq!(parsed.mime_type, "audio/webm");
        assert_eq!(parsed.data, "AAAA");

        assert!(input("data:audio/ogg; codecs=opus;base64,AAAA").validate().is_ok());
        assert!(parse_audio_data_uri("data:image/png;charset=x;base64,AAAA").is_err());

        let request = build_request(&input("data:audio/webm;codecs=opus;base64,AAAA")).unwrap();
        assert_eq!(
            request.parts[0],
            Part::InlineData {
                mime_type: "audio/webm".to_string(),
                data: "AAAA".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_silent_audio_yields_empty_transcription() {
        use crate::config::GeminiConfig;
        use crate::providers::gemini::GeminiClient;
        use serde_json::json;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-test:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "\n" }] }, "finishReason": "STOP" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let model = GeminiClient::new(
            GeminiConfig {
                api_key: "k".to_string(),
                model: "gemini-test".to_string(),
                base_url: server.uri(),
            },
            reqwest::Client::new(),
        );
        let flow = TranscriptionFlow::new(Arc::new(model));

        let output = flow.run(&input("data:audio/wav;base64,UklGRg==")).await.unwrap();
        assert_eq!(output.transcription, "");
    }

    #[test]
    fn test_rejects_non_audio_uris() {
        assert!(parse_audio_data_uri("https://example.com/a.mp3").is_err());
        assert!(parse_audio_data_uri("data:image/png;base64,AAAA").is_err());
        assert!(parse_audio_data_uri("data:audio/;base64,AAAA").is_err());
        assert!(parse_audio_data_uri("data:audio/wav,raw").is_err());
        assert!(parse_audio_data_uri("data:audio/wav;base64,").is_err());
    }

    #[test]
    fn test_validation() {
        assert!(input("data:audio/wav;base64,UklGRg==").validate().is_ok());
        assert!(input("data:audio/wav;base64,@@@@").validate().is_err());

        let mut with_language = input("data:audio/wav;base64,UklGRg==");
        with_language.language = Some("x".to_string());
        assert!(with_language.validate().is_err());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result: Result<TranscriptionInput, _> =
            serde_json::from_str(r#"{"invalidField":"test"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_request_places_audio_before_prompt() {
        let mut transcription = input("data:audio/mpeg;base64,SUQz");
        transcription.language = Some("de-DE".to_string());

        let request = build_request(&transcription).unwrap();
        assert_eq!(
            request.parts[0],
            Part::InlineData {
                mime_type: "audio/mpeg".to_string(),
                data: "SUQz".to_string()
            }
        );
        match &request.parts[1] {
            Part::Text(prompt) => assert!(prompt.contains("'de-DE'")),
            other => panic!("unexpected part: {:?}", other),
        }
    }
}
