use std::fmt::Write as _;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::{Validate, ValidationError};

use super::FlowDescriptor;
use crate::providers::{
    GenerationParams, GenerationRequest, GenerativeModel, Part, ProviderError,
};

const DEFAULT_MAX_WORDS: u32 = 150;

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Playful,
    Luxury,
    Technical,
}

impl Tone {
    fn as_str(self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Friendly => "friendly",
            Tone::Playful => "playful",
            Tone::Luxury => "luxurious",
            Tone::Technical => "technical",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductDescriptionInput {
    #[validate(
        length(max = 200, message = "productName must be at most 200 characters"),
        custom(function = "validate_product_name")
    )]
    pub product_name: String,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[serde(default)]
    #[validate(
        length(max = 20, message = "at most 20 features are accepted"),
        custom(function = "validate_features")
    )]
    pub features: Vec<String>,
    #[validate(length(max = 200))]
    pub target_audience: Option<String>,
    pub tone: Option<Tone>,
    #[validate(range(min = 20, max = 500))]
    pub max_words: Option<u32>,
}

fn validate_product_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("product_name");
        err.message = Some("productName must not be blank".into());
        return Err(err);
    }
    Ok(())
}

fn validate_features(features: &[String]) -> Result<(), ValidationError> {
    if features.iter().any(|f| f.trim().is_empty()) {
        let mut err = ValidationError::new("features");
        err.message = Some("features must not contain empty entries".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProductDescriptionOutput {
    pub headline: String,
    pub description: String,
    #[serde(default)]
    pub highlights: Vec<String>,
}

pub struct ProductDescriptionFlow {
    model: Arc<dyn GenerativeModel>,
}

impl ProductDescriptionFlow {
    pub const NAME: &'static str = "generateProductDescription";

    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    pub fn descriptor(&self) -> FlowDescriptor {
        FlowDescriptor {
            name: Self::NAME,
            model: self.model.model_name().to_string(),
        }
    }

    pub async fn run(
        &self,
        input: &ProductDescriptionInput,
    ) -> Result<ProductDescriptionOutput, ProviderError> {
        let text = self.model.generate(build_request(input)).await?;
        parse_output(&text)
    }
}

fn output_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "headline": { "type": "STRING" },
            "description": { "type": "STRING" },
            "highlights": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["headline", "description", "highlights"]
    })
}

fn build_prompt(input: &ProductDescriptionInput) -> String {
    let tone = input.tone.unwrap_or_default();
    let max_words = input.max_words.unwrap_or(DEFAULT_MAX_WORDS);

    let mut prompt = format!(
        "Write a {} product description for \"{}\".",
        tone.as_str(),
        input.product_name.trim()
    );
    if let Some(category) = &input.category {
        let _ = write!(prompt, " Category: {}.", category);
    }
    if let Some(audience) = &input.target_audience {
        let _ = write!(prompt, " Target audience: {}.", audience);
    }
    if !input.features.is_empty() {
        prompt.push_str("\nKey features:");
        for feature in &input.features {
            let _ = write!(prompt, "\n- {}", feature.trim());
        }
    }
    let _ = write!(
        prompt,
        "\nReturn a short headline, a description of at most {} words, \
         and up to five highlight bullet points. Do not invent specifications \
         that are not listed.",
        max_words
    );
    prompt
}

fn build_request(input: &ProductDescriptionInput) -> GenerationRequest {
    GenerationRequest {
        parts: vec![Part::Text(build_prompt(input))],
        params: GenerationParams {
            temperature: Some(0.7),
            max_output_tokens: None,
            response_schema: Some(output_schema()),
        },
    }
}

fn parse_output(text: &str) -> Result<ProductDescriptionOutput, ProviderError> {
    // Some models still wrap JSON mode output in a markdown fence.
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    let output: ProductDescriptionOutput = serde_json::from_str(body.trim())
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    if output.description.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ProductDescriptionInput {
        serde_json::from_value(json!({
            "productName": "Trail Runner 2",
            "category": "Footwear",
            "features": ["Waterproof membrane", "Recycled sole"],
            "targetAudience": "weekend hikers",
            "tone": "playful",
            "maxWords": 80
        }))
        .unwrap()
    }

    #[test]
    fn test_prompt_mentions_every_field() {
        let prompt = build_prompt(&input());
        assert!(prompt.starts_with("Write a playful product description for \"Trail Runner 2\"."));
        assert!(prompt.contains("Category: Footwear."));
        assert!(prompt.contains("Target audience: weekend hikers."));
        assert!(prompt.contains("\n- Waterproof membrane\n- Recycled sole"));
        assert!(prompt.contains("at most 80 words"));
    }

    #[test]
    fn test_defaults_when_optional_fields_absent() {
        let minimal: ProductDescriptionInput =
            serde_json::from_value(json!({ "productName": "Mug" })).unwrap();
        assert!(minimal.validate().is_ok());

        let prompt = build_prompt(&minimal);
        assert!(prompt.starts_with("Write a professional product description"));
        assert!(prompt.contains("at most 150 words"));
        assert!(!prompt.contains("Key features"));
    }

    #[test]
    fn test_request_asks_for_json_schema() {
        let request = build_request(&input());
        let schema = request.params.response_schema.unwrap();
        assert_eq!(schema["required"], json!(["headline", "description", "highlights"]));
    }

    #[test]
    fn test_validation_rules() {
        let mut bad = input();
        bad.product_name = String::new();
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.product_name = "   ".to_string();
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.product_name = "x".repeat(201);
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.features.push("   ".to_string());
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.max_words = Some(5);
        assert!(bad.validate().is_err());

        let unknown_tone: Result<ProductDescriptionInput, _> =
            serde_json::from_value(json!({ "productName": "Mug", "tone": "sarcastic" }));
        assert!(unknown_tone.is_err());
    }

    #[test]
    fn test_parse_output_accepts_fenced_json() {
        let output = parse_output(
            "```json\n{\"headline\":\"H\",\"description\":\"D\",\"highlights\":[\"a\"]}\n```",
        )
        .unwrap();
        assert_eq!(output.headline, "H");
        assert_eq!(output.highlights, vec!["a".to_string()]);
    }

    #[test]
    fn test_parse_output_rejects_prose() {
        let err = parse_output("Here is your description!").unwrap_err();
        assert_eq!(err.kind(), "MalformedResponseError");
    }

    #[test]
    fn test_parse_output_blank_answer_is_empty() {
        assert!(matches!(parse_output(" \n"), Err(ProviderError::EmptyResponse)));
    }
}
