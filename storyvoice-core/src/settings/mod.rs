pub mod catalog;
pub mod config;
pub mod manager;


pub use catalog::{CharacterVoiceMap, EmotionProfiles, SynthesisProfile};
pub use config::Settings;
pub use manager::SettingsManager;
