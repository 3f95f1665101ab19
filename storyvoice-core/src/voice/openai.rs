//! OpenAI speech endpoint, used as the secondary provider.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::error::SynthesisError;
use super::provider::{classify_transport, http_client, read_audio, TextToSpeech};
use super::types::{AudioData, ProviderKind};
use crate::settings::catalog::{CharacterVoiceMap, EmotionProfiles};
use crate::settings::config::OpenAiSpeechSettings;

#[derive(Debug, Clone)]
pub struct OpenAiSpeechConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub response_format: String,
    pub voices: CharacterVoiceMap,
    pub emotions: EmotionProfiles,
}

impl OpenAiSpeechConfig {
    pub fn new(api_key: String) -> Self {
        Self::from_settings(
            &OpenAiSpeechSettings::default(),
            &EmotionProfiles::default(),
            api_key,
        )
    }

    pub fn from_settings(
        settings: &OpenAiSpeechSettings,
        emotions: &EmotionProfiles,
        api_key: String,
    ) -> Self {
        Self {
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            response_format: settings.response_format.clone(),
            voices: settings.voices.clone(),
            emotions: emotions.clone(),
        }
    }
}

pub struct OpenAiSpeech {
    config: OpenAiSpeechConfig,
    client: Client,
}

impl OpenAiSpeech {
    pub fn new(config: OpenAiSpeechConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            config,
            client: http_client(timeout)?,
        })
    }
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    speed: f64,
}

#[async_trait]
impl TextToSpeech for OpenAiSpeech {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn synthesize(
        &self,
        text: &str,
        character: &str,
        emotion: &str,
    ) -> Result<AudioData, SynthesisError> {
        let voice = self.config.voices.resolve(character).ok_or_else(|| {
            SynthesisError::Fatal(anyhow::anyhow!(
                "no OpenAI voice configured for character {character:?}"
            ))
        })?;
        let profile = self.config.emotions.resolve(emotion);

        let request_body = SpeechRequest {
            model: &self.config.model,
            input: text,
            voice,
            response_format: &self.config.response_format,
            // The endpoint accepts 0.25..=4.0
            speed: profile.speed.clamp(0.25, 4.0),
        };

        let response = self
            .client
            .post(format!("{}/v1/audio/speech", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| classify_transport(self.kind(), e))?;

        read_audio(self.kind(), response).await
    }
}
