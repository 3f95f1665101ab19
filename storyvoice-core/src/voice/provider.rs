use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::elevenlabs::{ElevenLabs, ElevenLabsConfig};
use super::error::SynthesisError;
use super::openai::{OpenAiSpeech, OpenAiSpeechConfig};
use super::types::{AudioData, ProviderKind};
use crate::settings::Settings;

/// Body fragments vendors use to signal overload while returning a non-429
/// status.
const BUSY_MARKERS: &[&str] = &[
    "system_busy",
    "too_many_concurrent_requests",
    "overloaded",
    "rate_limit",
];

/// Trait for text-to-speech providers
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Synthesize `text` in the voice mapped to `character`, tuned for
    /// `emotion`. Failures must be classified as transient or fatal.
    async fn synthesize(
        &self,
        text: &str,
        character: &str,
        emotion: &str,
    ) -> Result<AudioData, SynthesisError>;
}

/// Classify a non-2xx provider response.
pub fn classify_failure(provider: ProviderKind, status: StatusCode, body: &str) -> SynthesisError {
    let body_lower = body.to_lowercase();
    let is_transient = status == StatusCode::TOO_MANY_REQUESTS
        || BUSY_MARKERS.iter().any(|marker| body_lower.contains(marker));

    let error = anyhow::anyhow!("{} API error {}: {}", provider, status, body);
    if is_transient {
        SynthesisError::Transient(error)
    } else {
        SynthesisError::Fatal(error)
    }
}

/// Transport failures (refused, reset, timed out) are worth retrying.
pub fn classify_transport(provider: ProviderKind, error: reqwest::Error) -> SynthesisError {
    debug!(?error, %provider, "Provider call failed before a response");
    SynthesisError::Transient(anyhow::anyhow!("{} network error: {}", provider, error))
}

/// Shared response handling: audio bytes on success, a classified error
/// otherwise.
pub(crate) async fn read_audio(
    provider: ProviderKind,
    response: Response,
) -> Result<AudioData, SynthesisError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        debug!(%provider, ?status, %body, "Provider returned error");
        return Err(classify_failure(provider, status, &body));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| classify_transport(provider, e))?;

    if bytes.is_empty() {
        return Err(SynthesisError::Fatal(anyhow::anyhow!(
            "{} returned an empty audio body",
            provider
        )));
    }

    Ok(AudioData::mpeg(bytes.to_vec()))
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}

/// Build the configured providers in fallback order. Providers whose API key
/// is not present in the environment are left out.
pub fn providers_from_settings(settings: &Settings) -> Result<Vec<Arc<dyn TextToSpeech>>> {
    let timeout = settings.retry.request_timeout();
    let mut providers: Vec<Arc<dyn TextToSpeech>> = Vec::new();

    for kind in &settings.providers.order {
        if providers.iter().any(|p| p.kind() == *kind) {
            continue;
        }
        match kind {
            ProviderKind::ElevenLabs => {
                let Some(api_key) = settings.providers.elevenlabs.api_key() else {
                    tracing::warn!(provider = %kind, "No API key configured, skipping provider");
                    continue;
                };
                let config = ElevenLabsConfig::from_settings(
                    &settings.providers.elevenlabs,
                    &settings.emotions,
                    api_key,
                );
                providers.push(Arc::new(ElevenLabs::new(config, timeout)?));
            }
            ProviderKind::OpenAi => {
                let Some(api_key) = settings.providers.openai.api_key() else {
                    tracing::warn!(provider = %kind, "No API key configured, skipping provider");
                    continue;
                };
                let config = OpenAiSpeechConfig::from_settings(
                    &settings.providers.openai,
                    &settings.emotions,
                    api_key,
                );
                providers.push(Arc::new(OpenAiSpeech::new(config, timeout)?));
            }
        }
    }

    Ok(providers)
}
