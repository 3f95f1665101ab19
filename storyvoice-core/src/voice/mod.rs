pub mod elevenlabs;
pub mod error;
pub mod fallback;
pub mod mock;
pub mod openai;
pub mod provider;
pub mod retry;
pub mod router;
pub mod types;

pub use error::SynthesisError;
pub use fallback::FallbackChain;
pub use provider::TextToSpeech;
pub use retry::RetryPolicy;
pub use router::VoiceRequestRouter;
pub use types::*;
