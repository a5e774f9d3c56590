use std::time::Duration;

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_TTS_API_BASE: &str = "https://texttospeech.googleapis.com/v1";
const DEFAULT_VOICE: &str = "en-US-Wavenet-D";
const DEFAULT_LANGUAGE_CODE: &str = "en-US";

/// Matches the execution ceiling the routes were historically deployed with.
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 300;

/// 25 MiB; base64 audio data URIs easily exceed axum's 2 MiB default.
const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{0} is required in production but not set")]
    Missing(&'static str),

    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Whether error details may be exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMode {
    Development,
    Production,
}

impl RuntimeMode {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => RuntimeMode::Production,
            _ => RuntimeMode::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == RuntimeMode::Production
    }
}

impl std::fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeMode::Development => f.write_str("development"),
            RuntimeMode::Production => f.write_str("production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub api_key: String,
    pub base_url: String,
    pub default_voice: String,
    pub default_language_code: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub mode: RuntimeMode,
    pub provider_timeout: Duration,
    pub max_body_bytes: usize,
    pub gemini: GeminiConfig,
    pub speech: SpeechConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mode = get("APP_ENV")
            .map(|v| RuntimeMode::parse(&v))
            .unwrap_or(RuntimeMode::Development);

        let shared_key = get("GOOGLE_API_KEY");
        let credential = |key: &'static str| -> Result<String, ConfigError> {
            match get(key).or_else(|| shared_key.clone()) {
                Some(value) => Ok(value),
                None if mode.is_production() => Err(ConfigError::Missing(key)),
                None => {
                    tracing::warn!("{} is not set; calls to that provider will fail", key);
                    Ok(String::new())
                }
            }
        };

        let gemini = GeminiConfig {
            api_key: credential("GEMINI_API_KEY")?,
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: get("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
        };

        let speech = SpeechConfig {
            api_key: credential("GOOGLE_TTS_API_KEY")?,
            base_url: get("GOOGLE_TTS_API_BASE")
                .unwrap_or_else(|| DEFAULT_TTS_API_BASE.to_string()),
            default_voice: get("TTS_DEFAULT_VOICE").unwrap_or_else(|| DEFAULT_VOICE.to_string()),
            default_language_code: get("TTS_DEFAULT_LANGUAGE_CODE")
                .unwrap_or_else(|| DEFAULT_LANGUAGE_CODE.to_string()),
        };

        let timeout_secs: u64 = parse_or(
            "PROVIDER_TIMEOUT_SECS",
            get("PROVIDER_TIMEOUT_SECS"),
            DEFAULT_PROVIDER_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "PROVIDER_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or("PORT", get("PORT"), 3000)?,
            mode,
            provider_timeout: Duration::from_secs(timeout_secs),
            max_body_bytes: parse_or(
                "MAX_BODY_BYTES",
                get("MAX_BODY_BYTES"),
                DEFAULT_MAX_BODY_BYTES,
            )?,
            gemini,
            speech,
        })
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => match value.trim().parse() {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_in_development() {
        let config = load(&[]).unwrap();
        assert_eq!(config.mode, RuntimeMode::Development);
        assert_eq!(config.port, 3000);
        assert_eq!(config.provider_timeout, Duration::from_secs(300));
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
        assert_eq!(config.speech.default_voice, "en-US-Wavenet-D");
        assert_eq!(config.speech.default_language_code, "en-US");
        assert!(config.gemini.api_key.is_empty());
    }

    #[test]
    fn test_shared_google_key_fills_both_providers() {
        let config = load(&[("GOOGLE_API_KEY", "shared")]).unwrap();
        assert_eq!(config.gemini.api_key, "shared");
        assert_eq!(config.speech.api_key, "shared");
    }

    #[test]
    fn test_specific_key_wins_over_shared() {
        let config =
            load(&[("GOOGLE_API_KEY", "shared"), ("GEMINI_API_KEY", "gemini")]).unwrap();
        assert_eq!(config.gemini.api_key, "gemini");
        assert_eq!(config.speech.api_key, "shared");
    }

    #[test]
    fn test_production_requires_credentials() {
        let err = load(&[("APP_ENV", "production")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GEMINI_API_KEY")));

        let err = load(&[("APP_ENV", "prod"), ("GEMINI_API_KEY", "k")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GOOGLE_TTS_API_KEY")));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = load(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let err = load(&[("PROVIDER_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "PROVIDER_TIMEOUT_SECS",
                ..
            }
        ));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(RuntimeMode::parse("Production"), RuntimeMode::Production);
        assert_eq!(RuntimeMode::parse("staging"), RuntimeMode::Development);
        assert_eq!(RuntimeMode::Production.to_string(), "production");
    }
}
