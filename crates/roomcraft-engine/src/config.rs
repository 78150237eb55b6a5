use std::env;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";

const API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY", "GOOGLE_AI_STUDIO_API_KEY"];

/// Tunables consumed by the normalizer, gateway and remote backends.
#[derive(Clone, PartialEq)]
pub struct StudioConfig {
    pub max_image_dim: u32,
    /// Lossy encode quality in `0.3..=1.0`.
    pub jpeg_quality: f32,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub request_timeout: Duration,
    pub image_model: String,
    pub text_model: String,
    pub api_base: String,
    pub api_key: Option<String>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            max_image_dim: 1024,
            jpeg_quality: 0.95,
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(90),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
        }
    }
}

impl StudioConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup. Unparseable values keep the default,
    /// out-of-range values are clamped.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let max_image_dim = clamped_f64(
            get("ROOMCRAFT_MAX_IMAGE_DIM").as_deref(),
            defaults.max_image_dim as f64,
            128.0,
            4096.0,
        )
        .round() as u32;
        let jpeg_quality = clamped_f64(
            get("ROOMCRAFT_JPEG_QUALITY").as_deref(),
            defaults.jpeg_quality as f64,
            0.3,
            1.0,
        ) as f32;
        let max_retries = clamped_f64(
            get("ROOMCRAFT_MAX_RETRIES").as_deref(),
            defaults.max_retries as f64,
            0.0,
            8.0,
        )
        .round() as u32;
        let base_delay_ms = clamped_f64(
            get("ROOMCRAFT_RETRY_BASE_MS").as_deref(),
            defaults.base_delay.as_millis() as f64,
            0.0,
            30_000.0,
        );
        let timeout_s = clamped_f64(
            get("ROOMCRAFT_REQUEST_TIMEOUT_S").as_deref(),
            defaults.request_timeout.as_secs_f64(),
            5.0,
            300.0,
        );

        Self {
            max_image_dim,
            jpeg_quality,
            max_retries,
            base_delay: Duration::from_millis(base_delay_ms.round() as u64),
            request_timeout: Duration::from_secs_f64(timeout_s),
            image_model: get("ROOMCRAFT_IMAGE_MODEL").unwrap_or(defaults.image_model),
            text_model: get("ROOMCRAFT_TEXT_MODEL").unwrap_or(defaults.text_model),
            api_base: get("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.api_base),
            api_key: API_KEY_VARS.iter().find_map(|key| get(key)),
        }
    }

    pub fn with_max_image_dim(mut self, value: u32) -> Self {
        self.max_image_dim = value.clamp(128, 4096);
        self
    }

    pub fn with_jpeg_quality(mut self, value: f32) -> Self {
        self.jpeg_quality = value.clamp(0.3, 1.0);
        self
    }

    pub fn with_max_retries(mut self, value: u32) -> Self {
        self.max_retries = value.min(8);
        self
    }
}

impl std::fmt::Debug for StudioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudioConfig")
            .field("max_image_dim", &self.max_image_dim)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("request_timeout", &self.request_timeout)
            .field("image_model", &self.image_model)
            .field("text_model", &self.text_model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn clamped_f64(raw: Option<&str>, default: f64, min: f64, max: f64) -> f64 {
    raw.and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(default)
        .clamp(min, max)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::{StudioConfig, DEFAULT_API_BASE};

    fn config_from(pairs: &[(&str, &str)]) -> StudioConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        StudioConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]);
        assert_eq!(config, StudioConfig::default());
        assert_eq!(config.max_image_dim, 1024);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_delay, Duration::from_secs(2));
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn values_are_parsed_and_clamped() {
        let config = config_from(&[
            ("ROOMCRAFT_MAX_IMAGE_DIM", "512"),
            ("ROOMCRAFT_JPEG_QUALITY", "1.7"),
            ("ROOMCRAFT_MAX_RETRIES", "20"),
            ("ROOMCRAFT_RETRY_BASE_MS", "250"),
            ("ROOMCRAFT_REQUEST_TIMEOUT_S", "1"),
            ("GEMINI_API_BASE", "https://proxy.test/v1beta/"),
        ]);
        assert_eq!(config.max_image_dim, 512);
        assert_eq!(config.jpeg_quality, 1.0);
        assert_eq!(config.max_retries, 8);
        assert_eq!(config.base_delay, Duration::from_millis(250));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.api_base, "https://proxy.test/v1beta");
    }

    #[test]
    fn garbage_values_fall_back_to_defaults() {
        let config = config_from(&[
            ("ROOMCRAFT_MAX_IMAGE_DIM", "huge"),
            ("ROOMCRAFT_JPEG_QUALITY", "NaN"),
        ]);
        assert_eq!(config.max_image_dim, 1024);
        assert_eq!(config.jpeg_quality, 0.95);
    }

    #[test]
    fn api_key_prefers_first_non_empty_variable() {
        let config = config_from(&[
            ("GEMINI_API_KEY", "  "),
            ("GOOGLE_API_KEY", "google-key"),
            ("GOOGLE_AI_STUDIO_API_KEY", "studio-key"),
        ]);
        assert_eq!(config.api_key.as_deref(), Some("google-key"));
        assert!(!format!("{config:?}").contains("google-key"));
    }
}
