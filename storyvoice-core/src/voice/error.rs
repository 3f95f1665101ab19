use thiserror::Error;

use crate::voice::types::{ErrorKind, ProviderKind};

/// Outcome classification for a single provider call. Retry and fallback
/// decisions are made on the variant alone.
#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Transient error: {0}")]
    Transient(anyhow::Error),

    #[error("Fatal error: {0}")]
    Fatal(anyhow::Error),

    #[error("Provider {provider} exhausted after {attempts} attempts")]
    Exhausted {
        provider: ProviderKind,
        attempts: u32,
    },
}

impl SynthesisError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Where this failure sits in the reported error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transient(_) | Self::Exhausted { .. } => ErrorKind::ProviderTransientError,
            Self::Fatal(_) => ErrorKind::ProviderFatalError,
        }
    }
}
