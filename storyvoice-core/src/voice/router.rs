use anyhow::Result;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use strum::VariantArray;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::fallback::FallbackChain;
use super::provider::providers_from_settings;
use super::retry::RetryPolicy;
use super::types::{ProviderKind, SynthesisRequest, VoiceInfo, VoiceRequest, VoiceResult};
use crate::cache::{cache_key, VoiceCache};
use crate::settings::Settings;

type InflightMap = Arc<Mutex<HashMap<String, watch::Receiver<Option<VoiceResult>>>>>;

/// Entry point for narration requests: validate, consult the cache, and on a
/// miss run the fallback chain and write the audio through to the cache.
///
/// Identical requests that arrive while a synthesis is running join it
/// instead of starting another. Synthesis runs on its own task, so a caller
/// that goes away does not abort provider calls or the cache write.
pub struct VoiceRequestRouter {
    chain: Arc<FallbackChain>,
    cache: VoiceCache,
    inflight: InflightMap,
    max_text_chars: usize,
    characters: Vec<String>,
    emotions: Vec<String>,
}

impl VoiceRequestRouter {
    pub fn new(chain: FallbackChain, cache: VoiceCache) -> Self {
        Self {
            chain: Arc::new(chain),
            cache,
            inflight: Arc::new(Mutex::new(HashMap::new())),
            max_text_chars: usize::MAX,
            characters: Vec::new(),
            emotions: Vec::new(),
        }
    }

    /// Wire providers, retry policy, cache and catalog from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let providers = providers_from_settings(settings)?;
        let chain = FallbackChain::new(providers, RetryPolicy::from_settings(&settings.retry));
        let cache = VoiceCache::from_settings(&settings.cache)?;

        let characters: BTreeSet<String> = settings
            .providers
            .elevenlabs
            .voices
            .characters()
            .chain(settings.providers.openai.voices.characters())
            .map(str::to_string)
            .collect();

        Ok(Self::new(chain, cache)
            .with_max_text_chars(settings.limits.max_text_chars)
            .with_catalog(characters.into_iter().collect(), settings.emotions.names()))
    }

    pub fn with_max_text_chars(mut self, max_text_chars: usize) -> Self {
        self.max_text_chars = max_text_chars;
        self
    }

    pub fn with_catalog(mut self, characters: Vec<String>, emotions: Vec<String>) -> Self {
        self.characters = characters;
        self.emotions = emotions;
        self
    }

    pub async fn handle(&self, request: VoiceRequest) -> VoiceResult {
        let request = match self.validate(request) {
            Ok(request) => request,
            Err(message) => {
                warn!(%message, "Rejected voice request");
                return VoiceResult::invalid(message);
            }
        };

        let key = cache_key(&request.text, &request.character, &request.emotion);

        match self.cache.lookup(&key).await {
            Ok(Some(payload)) => {
                debug!(cache_key = %key, "Cache hit");
                return VoiceResult::cached(payload);
            }
            Ok(None) => debug!(cache_key = %key, "Cache miss"),
            Err(e) => warn!(cache_key = %key, error = %e, "Cache lookup failed, synthesizing"),
        }

        self.synthesize_once(key, request).await
    }

    fn validate(&self, request: VoiceRequest) -> Result<SynthesisRequest, String> {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        let text = present(request.text);
        let character = present(request.character);
        let emotion = present(request.emotion);

        let missing: Vec<&str> = [
            ("text", text.is_none()),
            ("character", character.is_none()),
            ("emotion", emotion.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        let (Some(text), Some(character), Some(emotion)) = (text, character, emotion) else {
            return Err(format!("Missing required fields: {}", missing.join(", ")));
        };

        let length = text.chars().count();
        if length > self.max_text_chars {
            return Err(format!(
                "Text is too long: {} characters (limit {})",
                length, self.max_text_chars
            ));
        }

        Ok(SynthesisRequest {
            text,
            character,
            emotion,
            preference: request.provider_preference,
        })
    }

    async fn synthesize_once(&self, key: String, request: SynthesisRequest) -> VoiceResult {
        let mut receiver = {
            let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            match inflight.get(&key) {
                Some(receiver) => {
                    debug!(cache_key = %key, "Joining in-flight synthesis");
                    receiver.clone()
                }
                None => {
                    let (sender, receiver) = watch::channel(None);
                    inflight.insert(key.clone(), receiver.clone());
                    self.spawn_synthesis(key, request, sender);
                    receiver
                }
            }
        };

        let result = match receiver.wait_for(Option::is_some).await {
            Ok(result) => match &*result {
                Some(result) => result.clone(),
                None => VoiceResult::degraded("synthesis finished without a result"),
            },
            Err(_) => VoiceResult::degraded("synthesis task ended without a result"),
        };
        result
    }

    fn spawn_synthesis(
        &self,
        key: String,
        request: SynthesisRequest,
        sender: watch::Sender<Option<VoiceResult>>,
    ) {
        let chain = Arc::clone(&self.chain);
        let cache = self.cache.clone();
        let guard = InflightGuard {
            inflight: Arc::clone(&self.inflight),
            key,
        };

        tokio::spawn(async move {
            let result = chain.synthesize(&request).await;

            // Only provider audio is cached, never the sentinel.
            if !result.is_degraded() {
                match cache.store(&guard.key, &result.audio_payload).await {
                    Ok(()) => info!(cache_key = %guard.key, "Cached narration"),
                    Err(e) => warn!(cache_key = %guard.key, error = %e, "Failed to cache narration"),
                }
            }

            drop(guard);
            let _ = sender.send(Some(result));
        });
    }

    /// Delete every cached narration, returning the removed keys.
    pub async fn clear_cache(&self) -> Result<Vec<String>> {
        let deleted = self.cache.clear().await?;
        info!(count = deleted.len(), "Cleared voice cache");
        Ok(deleted)
    }

    pub fn voice_info(&self) -> VoiceInfo {
        let services = ProviderKind::VARIANTS
            .iter()
            .map(|kind| {
                let configured = self.chain.providers().iter().any(|p| p.kind() == *kind);
                (*kind, configured)
            })
            .collect();

        VoiceInfo {
            available: !self.chain.providers().is_empty(),
            services,
            characters: self.characters.clone(),
            emotions: self.emotions.clone(),
        }
    }
}

/// Removes the in-flight entry when the synthesis task finishes or unwinds.
struct InflightGuard {
    inflight: InflightMap,
    key: String,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
