use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use super::error::SynthesisError;
use super::provider::TextToSpeech;
use super::types::{AudioData, SynthesisRequest};
use crate::settings::config::RetrySettings;

/// Bounded exponential backoff around a single provider. Transient failures
/// are retried `max_retries` times, sleeping `initial_backoff * multiplier^n`
/// before retry `n + 1`. Fatal failures return immediately.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub backoff_multiplier: f64,
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            backoff_multiplier: settings.backoff_multiplier,
            request_timeout: settings.request_timeout(),
        }
    }

    /// Delay before the retry following failed attempt number `attempt`
    /// (zero based): 1s, 2s, 4s with the defaults.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_backoff.as_millis() as f64;
        Duration::from_millis((base_ms * self.backoff_multiplier.powi(attempt as i32)) as u64)
    }

    /// Run one provider to success, fatal failure or exhaustion. Exhaustion is
    /// reported as [`SynthesisError::Exhausted`], never as the last transient
    /// error.
    pub async fn run(
        &self,
        provider: &dyn TextToSpeech,
        request: &SynthesisRequest,
    ) -> Result<AudioData, SynthesisError> {
        let kind = provider.kind();
        let mut attempt = 0;

        loop {
            match self.attempt(provider, request).await {
                Ok(audio) => {
                    if attempt > 0 {
                        info!(provider = %kind, "Synthesis succeeded after {} retries", attempt);
                    }
                    return Ok(audio);
                }
                Err(error) if !error.is_transient() => {
                    warn!(provider = %kind, error = %error, "Provider failed, not retrying");
                    return Err(error);
                }
                Err(error) => {
                    if attempt >= self.max_retries {
                        warn!(
                            provider = %kind,
                            attempt,
                            max_retries = self.max_retries,
                            error = %error,
                            "Provider exhausted"
                        );
                        return Err(SynthesisError::Exhausted {
                            provider: kind,
                            attempts: attempt + 1,
                        });
                    }

                    let backoff = self.backoff(attempt);
                    warn!(
                        provider = %kind,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %error,
                        "Synthesis failed, retrying after backoff"
                    );

                    sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(
        &self,
        provider: &dyn TextToSpeech,
        request: &SynthesisRequest,
    ) -> Result<AudioData, SynthesisError> {
        let call = provider.synthesize(&request.text, &request.character, &request.emotion);
        match timeout(self.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(SynthesisError::Transient(anyhow::anyhow!(
                "{} did not answer within {:?}",
                provider.kind(),
                self.request_timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
    }
}
