use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Payload returned instead of audio when no network provider could answer.
/// Clients are expected to fall back to on-device speech synthesis.
pub const BROWSER_SYNTHESIS: &str = "BROWSER_SYNTHESIS";

/// The external text-to-speech vendors the service knows how to call.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::VariantArray,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderKind {
    ElevenLabs,
    OpenAi,
}

/// Inbound narration request. Every field is optional on the wire so that a
/// missing value surfaces as a validation failure rather than a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub emotion: Option<String>,
    #[serde(default)]
    pub provider_preference: Option<ProviderKind>,
}

impl VoiceRequest {
    pub fn new(
        text: impl Into<String>,
        character: impl Into<String>,
        emotion: impl Into<String>,
    ) -> Self {
        Self {
            text: Some(text.into()),
            character: Some(character.into()),
            emotion: Some(emotion.into()),
            provider_preference: None,
        }
    }

    pub fn with_preference(mut self, provider: ProviderKind) -> Self {
        self.provider_preference = Some(provider);
        self
    }
}

/// A request that passed validation and can be handed to providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub character: String,
    pub emotion: String,
    pub preference: Option<ProviderKind>,
}

/// Raw audio returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioData {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

impl AudioData {
    pub fn mpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: "audio/mpeg",
        }
    }

    pub fn to_data_uri(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{}", self.mime_type, encoded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    ValidationError,
    ProviderTransientError,
    ProviderFatalError,
    ProvidersUnavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceResult {
    pub audio_payload: String,
    pub success: bool,
    pub used_fallback: bool,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VoiceResult {
    pub fn synthesized(audio_payload: String, used_fallback: bool) -> Self {
        Self {
            audio_payload,
            success: true,
            used_fallback,
            cached: false,
            error_kind: None,
            error: None,
        }
    }

    pub fn cached(audio_payload: String) -> Self {
        Self {
            audio_payload,
            success: true,
            used_fallback: false,
            cached: true,
            error_kind: None,
            error: None,
        }
    }

    /// Terminal result when every provider failed: still a success from the
    /// caller's point of view, carrying the local synthesis sentinel.
    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            audio_payload: BROWSER_SYNTHESIS.to_string(),
            success: true,
            used_fallback: true,
            cached: false,
            error_kind: Some(ErrorKind::ProvidersUnavailable),
            error: Some(message.into()),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            audio_payload: String::new(),
            success: false,
            used_fallback: false,
            cached: false,
            error_kind: Some(ErrorKind::ValidationError),
            error: Some(message.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.audio_payload == BROWSER_SYNTHESIS
    }
}

/// Provider availability and catalog summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub available: bool,
    pub services: std::collections::BTreeMap<ProviderKind, bool>,
    pub characters: Vec<String>,
    pub emotions: Vec<String>,
}
