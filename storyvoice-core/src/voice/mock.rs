use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};

use super::error::SynthesisError;
use super::provider::TextToSpeech;
use super::types::{AudioData, ProviderKind};

/// Mock behavior for the mock provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MockBehavior {
    /// Return audio derived from the request
    #[default]
    Success,
    /// Return a transient error N times, then succeed
    TransientErrorThenSuccess { remaining_errors: usize },
    /// Always return a transient error (rate limited)
    AlwaysTransientError,
    /// Always return a fatal error (bad credentials)
    AlwaysFatalError,
    /// Never complete; exercises the per-attempt deadline
    Hang,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedCall {
    pub text: String,
    pub character: String,
    pub emotion: String,
}

/// Mock text-to-speech provider for testing. Clones share state, so a test
/// can keep a handle after moving the provider into a chain.
#[derive(Clone)]
pub struct MockProvider {
    kind: ProviderKind,
    behavior: Arc<Mutex<MockBehavior>>,
    calls: Arc<Mutex<Vec<CapturedCall>>>,
}

impl MockProvider {
    pub fn new(kind: ProviderKind, behavior: MockBehavior) -> Self {
        Self {
            kind,
            behavior: Arc::new(Mutex::new(behavior)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.lock().unwrap_or_else(PoisonError::into_inner) = behavior;
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn captured_calls(&self) -> Vec<CapturedCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The audio bytes this provider returns for `text`.
    pub fn audio_for(&self, text: &str) -> Vec<u8> {
        format!("{}:{}", self.kind, text).into_bytes()
    }

    fn next_outcome(&self) -> MockBehavior {
        let mut behavior = self.behavior.lock().unwrap_or_else(PoisonError::into_inner);
        match &mut *behavior {
            MockBehavior::TransientErrorThenSuccess { remaining_errors } => {
                if *remaining_errors > 0 {
                    *remaining_errors -= 1;
                    MockBehavior::AlwaysTransientError
                } else {
                    MockBehavior::Success
                }
            }
            other => other.clone(),
        }
    }
}

#[async_trait]
impl TextToSpeech for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn synthesize(
        &self,
        text: &str,
        character: &str,
        emotion: &str,
    ) -> Result<AudioData, SynthesisError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CapturedCall {
                text: text.to_string(),
                character: character.to_string(),
                emotion: emotion.to_string(),
            });

        match self.next_outcome() {
            MockBehavior::Success | MockBehavior::TransientErrorThenSuccess { .. } => {
                Ok(AudioData::mpeg(self.audio_for(text)))
            }
            MockBehavior::AlwaysTransientError => Err(SynthesisError::Transient(anyhow::anyhow!(
                "{} API error 429 Too Many Requests",
                self.kind
            ))),
            MockBehavior::AlwaysFatalError => Err(SynthesisError::Fatal(anyhow::anyhow!(
                "{} API error 401 Unauthorized",
                self.kind
            ))),
            MockBehavior::Hang => std::future::pending().await,
        }
    }
}
