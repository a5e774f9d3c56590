use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use crate::config::{Config, RuntimeMode, SpeechConfig};
use crate::flows::{FlowDescriptor, ProductDescriptionFlow, TranscriptionFlow};
use crate::providers::{
    GeminiClient, GenerativeModel, GoogleTtsClient, ProviderError, SpeechSynthesizer,
};

/// Everything a handler needs; built once at startup and shared read-only.
pub struct AppState {
    pub mode: RuntimeMode,
    pub provider_timeout: Duration,
    pub max_body_bytes: usize,
    pub speech_defaults: SpeechConfig,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub transcription: TranscriptionFlow,
    pub product_description: ProductDescriptionFlow,
}

impl AppState {
    pub fn new(
        config: &Config,
        speech: Arc<dyn SpeechSynthesizer>,
        model: Arc<dyn GenerativeModel>,
    ) -> Self {
        Self {
            mode: config.mode,
            provider_timeout: config.provider_timeout,
            max_body_bytes: config.max_body_bytes,
            speech_defaults: config.speech.clone(),
            speech,
            transcription: TranscriptionFlow::new(Arc::clone(&model)),
            product_description: ProductDescriptionFlow::new(model),
        }
    }

    /// Wires the Google REST clients behind one shared HTTP connection pool.
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let speech = Arc::new(GoogleTtsClient::new(config.speech.clone(), client.clone()));
        let model = Arc::new(GeminiClient::new(config.gemini.clone(), client));

        Ok(Self::new(config, speech, model))
    }

    pub fn flows(&self) -> Vec<FlowDescriptor> {
        vec![
            self.transcription.descriptor(),
            self.product_description.descriptor(),
        ]
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let api_routes = Router::new()
        .route("/tts", post(handlers::speak))
        .route("/transcription", post(handlers::transcribe))
        .route("/product-description", post(handlers::describe_product))
        .route("/flows", get(handlers::list_flows))
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
