use std::sync::Arc;
use tracing::{info, warn};

use super::provider::TextToSpeech;
use super::retry::RetryPolicy;
use super::types::{SynthesisRequest, VoiceResult};

/// Ordered providers, each wrapped in the retry policy and tried strictly one
/// after another. When every provider gives up the chain degrades to the
/// local synthesis sentinel instead of failing.
pub struct FallbackChain {
    providers: Vec<Arc<dyn TextToSpeech>>,
    retry: RetryPolicy,
}

impl FallbackChain {
    pub fn new(providers: Vec<Arc<dyn TextToSpeech>>, retry: RetryPolicy) -> Self {
        Self { providers, retry }
    }

    pub fn providers(&self) -> &[Arc<dyn TextToSpeech>] {
        &self.providers
    }

    /// Provider order for one request: the preferred provider, when present
    /// in the chain, moves to the front.
    fn ordered(&self, request: &SynthesisRequest) -> Vec<&Arc<dyn TextToSpeech>> {
        let mut ordered: Vec<&Arc<dyn TextToSpeech>> = self.providers.iter().collect();
        if let Some(preferred) = request.preference {
            if let Some(position) = ordered.iter().position(|p| p.kind() == preferred) {
                let provider = ordered.remove(position);
                ordered.insert(0, provider);
            }
        }
        ordered
    }

    pub async fn synthesize(&self, request: &SynthesisRequest) -> VoiceResult {
        let mut failures = 0;

        for (index, provider) in self.ordered(request).into_iter().enumerate() {
            let kind = provider.kind();
            match self.retry.run(provider.as_ref(), request).await {
                Ok(audio) => {
                    info!(
                        provider = %kind,
                        used_fallback = index > 0,
                        bytes = audio.bytes.len(),
                        "Synthesized narration"
                    );
                    return VoiceResult::synthesized(audio.to_data_uri(), index > 0);
                }
                Err(error) => {
                    warn!(
                        provider = %kind,
                        error_kind = ?error.kind(),
                        error = %error,
                        "Falling through to next provider"
                    );
                    failures += 1;
                }
            }
        }

        warn!(
            providers = self.providers.len(),
            failures,
            "All providers unavailable, instructing client to synthesize locally"
        );
        // Vendor error bodies stay in the log above; clients get a fixed message.
        let message = if failures == 0 {
            "no speech providers configured"
        } else {
            "speech providers unavailable"
        };
        VoiceResult::degraded(message)
    }
}
