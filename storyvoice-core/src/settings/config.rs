use crate::settings::catalog::{CharacterVoiceMap, EmotionProfiles};
use crate::voice::types::ProviderKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// ElevenLabs adapter configuration. The API key itself is never stored in
/// the settings file; only the name of the environment variable holding it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElevenLabsSettings {
    #[serde(default = "default_elevenlabs_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_elevenlabs_base_url")]
    pub base_url: String,
    #[serde(default = "default_elevenlabs_model")]
    pub model_id: String,
    #[serde(default = "CharacterVoiceMap::elevenlabs_defaults")]
    pub voices: CharacterVoiceMap,
}

fn default_elevenlabs_key_env() -> String {
    "ELEVENLABS_API_KEY".to_string()
}

fn default_elevenlabs_base_url() -> String {
    "https://api.elevenlabs.io/v1".to_string()
}

fn default_elevenlabs_model() -> String {
    "eleven_multilingual_v2".to_string()
}

impl ElevenLabsSettings {
    pub fn api_key(&self) -> Option<String> {
        api_key_from_env(&self.api_key_env)
    }
}

impl Default for ElevenLabsSettings {
    fn default() -> Self {
        Self {
            api_key_env: default_elevenlabs_key_env(),
            base_url: default_elevenlabs_base_url(),
            model_id: default_elevenlabs_model(),
            voices: CharacterVoiceMap::elevenlabs_defaults(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenAiSpeechSettings {
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_response_format")]
    pub response_format: String,
    #[serde(default = "CharacterVoiceMap::openai_defaults")]
    pub voices: CharacterVoiceMap,
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_openai_model() -> String {
    "tts-1".to_string()
}

fn default_response_format() -> String {
    "mp3".to_string()
}

impl OpenAiSpeechSettings {
    pub fn api_key(&self) -> Option<String> {
        api_key_from_env(&self.api_key_env)
    }
}

impl Default for OpenAiSpeechSettings {
    fn default() -> Self {
        Self {
            api_key_env: default_openai_key_env(),
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            response_format: default_response_format(),
            voices: CharacterVoiceMap::openai_defaults(),
        }
    }
}

fn api_key_from_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|key| !key.trim().is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderSettings {
    /// Fallback order. Providers without a configured API key are skipped.
    #[serde(default = "default_provider_order")]
    pub order: Vec<ProviderKind>,
    #[serde(default)]
    pub elevenlabs: ElevenLabsSettings,
    #[serde(default)]
    pub openai: OpenAiSpeechSettings,
}

fn default_provider_order() -> Vec<ProviderKind> {
    vec![ProviderKind::ElevenLabs, ProviderKind::OpenAi]
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            order: default_provider_order(),
            elevenlabs: ElevenLabsSettings::default(),
            openai: OpenAiSpeechSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Upper bound on a single provider attempt.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl RetrySettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheSettings {
    #[serde(default)]
    pub backend: CacheBackend,
    /// Directory for the file backend. Defaults to ~/.storyvoice/cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Entry lifetime in seconds. Zero disables expiry.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    24 * 60 * 60
}

impl CacheSettings {
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            dir: None,
            ttl_secs: default_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LimitSettings {
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
}

fn default_max_text_chars() -> usize {
    4096
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_text_chars: default_max_text_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub providers: ProviderSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub limits: LimitSettings,
    #[serde(default)]
    pub emotions: EmotionProfiles,
}
