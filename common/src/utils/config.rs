use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub gemini_api_key: String,
    #[serde(default = "default_base_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_analysis_model")]
    pub analysis_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_video_model")]
    pub video_model: String,
    #[serde(default = "default_poll_interval_ms")]
    pub video_poll_interval_ms: u64,
    #[serde(default)]
    pub video_max_poll_attempts: Option<u32>,
    #[serde(default)]
    pub video_max_wait_secs: Option<u64>,
    /// Upper bound for any single request to the generation service.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_attachment_max_bytes")]
    pub attachment_max_bytes: usize,
    /// When set, the dream endpoints require this key.
    #[serde(default)]
    pub api_access_key: Option<String>,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_analysis_model() -> String {
    "gemini-3-pro-preview".to_string()
}

fn default_image_model() -> String {
    "gemini-3-pro-image-preview".to_string()
}

fn default_video_model() -> String {
    "veo-3.1-fast-generate-preview".to_string()
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_http_port() -> u16 {
    3000
}

fn default_attachment_max_bytes() -> usize {
    10_000_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            gemini_base_url: default_base_url(),
            analysis_model: default_analysis_model(),
            image_model: default_image_model(),
            video_model: default_video_model(),
            video_poll_interval_ms: default_poll_interval_ms(),
            video_max_poll_attempts: None,
            video_max_wait_secs: None,
            request_timeout_secs: default_request_timeout_secs(),
            http_port: default_http_port(),
            attachment_max_bytes: default_attachment_max_bytes(),
            api_access_key: None,
        }
    }
}

impl AppConfig {
    /// Base URL of the OpenAI-compatible surface of the generation service.
    pub fn openai_compat_base_url(&self) -> String {
        format!("{}/openai", self.gemini_base_url.trim_end_matches('/'))
    }

    pub fn video_poll_interval(&self) -> Duration {
        Duration::from_millis(self.video_poll_interval_ms)
    }

    pub fn video_max_wait(&self) -> Option<Duration> {
        self.video_max_wait_secs.map(Duration::from_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn has_api_key(&self) -> bool {
        !self.gemini_api_key.trim().is_empty()
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
