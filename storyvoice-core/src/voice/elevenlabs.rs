//! ElevenLabs text-to-speech implementation

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::error::SynthesisError;
use super::provider::{classify_transport, http_client, read_audio, TextToSpeech};
use super::types::{AudioData, ProviderKind};
use crate::settings::catalog::{CharacterVoiceMap, EmotionProfiles};
use crate::settings::config::ElevenLabsSettings;

#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    pub api_key: String,
    pub base_url: String,
    pub model_id: String,
    pub voices: CharacterVoiceMap,
    pub emotions: EmotionProfiles,
}

impl ElevenLabsConfig {
    pub fn new(api_key: String) -> Self {
        Self::from_settings(
            &ElevenLabsSettings::default(),
            &EmotionProfiles::default(),
            api_key,
        )
    }

    pub fn from_settings(
        settings: &ElevenLabsSettings,
        emotions: &EmotionProfiles,
        api_key: String,
    ) -> Self {
        Self {
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model_id: settings.model_id.clone(),
            voices: settings.voices.clone(),
            emotions: emotions.clone(),
        }
    }
}

pub struct ElevenLabs {
    config: ElevenLabsConfig,
    client: Client,
}

impl ElevenLabs {
    pub fn new(config: ElevenLabsConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            config,
            client: http_client(timeout)?,
        })
    }
}

#[derive(Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Serialize)]
struct VoiceSettings {
    stability: f64,
    similarity_boost: f64,
    style: f64,
    use_speaker_boost: bool,
}

#[async_trait]
impl TextToSpeech for ElevenLabs {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ElevenLabs
    }

    async fn synthesize(
        &self,
        text: &str,
        character: &str,
        emotion: &str,
    ) -> Result<AudioData, SynthesisError> {
        let voice_id = self.config.voices.resolve(character).ok_or_else(|| {
            SynthesisError::Fatal(anyhow::anyhow!(
                "no ElevenLabs voice configured for character {character:?}"
            ))
        })?;
        let profile = self.config.emotions.resolve(emotion);

        let url = format!("{}/text-to-speech/{}", self.config.base_url, voice_id);

        let request_body = SynthesizeRequest {
            text,
            model_id: &self.config.model_id,
            voice_settings: VoiceSettings {
                stability: profile.stability,
                similarity_boost: profile.similarity_boost,
                style: profile.style,
                use_speaker_boost: profile.use_speaker_boost,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.config.api_key)
            .header("Accept", "audio/mpeg")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| classify_transport(self.kind(), e))?;

        read_audio(self.kind(), response).await
    }
}
