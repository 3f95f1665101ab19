pub mod cache;
pub mod settings;
pub mod voice;

// Public library API used by the server crate and by tests that assemble a
// router from fakes.
pub use cache::{cache_key, FileCache, MemoryCache, ResponseCache, VoiceCache};
pub use settings::{Settings, SettingsManager};
pub use voice::{
    FallbackChain, RetryPolicy, TextToSpeech, VoiceInfo, VoiceRequest, VoiceRequestRouter,
    VoiceResult, BROWSER_SYNTHESIS,
};
