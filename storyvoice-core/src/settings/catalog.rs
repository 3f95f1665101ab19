use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_CHARACTER: &str = "narrator";
pub const DEFAULT_EMOTION: &str = "calm";

/// Voice tuning applied for one emotion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthesisProfile {
    pub stability: f64,
    pub similarity_boost: f64,
    pub style: f64,
    pub use_speaker_boost: bool,
    #[serde(default = "default_speed")]
    pub speed: f64,
}

fn default_speed() -> f64 {
    1.0
}

impl SynthesisProfile {
    const fn new(
        stability: f64,
        similarity_boost: f64,
        style: f64,
        use_speaker_boost: bool,
        speed: f64,
    ) -> Self {
        Self {
            stability,
            similarity_boost,
            style,
            use_speaker_boost,
            speed,
        }
    }

    /// The profile used for unknown emotions.
    pub const fn calm() -> Self {
        Self::new(0.75, 0.75, 0.2, true, 1.0)
    }
}

impl Default for SynthesisProfile {
    fn default() -> Self {
        Self::calm()
    }
}

/// Emotion name to profile. Unknown emotions resolve to `calm`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmotionProfiles(BTreeMap<String, SynthesisProfile>);

impl EmotionProfiles {
    pub fn new(profiles: BTreeMap<String, SynthesisProfile>) -> Self {
        Self(profiles)
    }

    pub fn resolve(&self, emotion: &str) -> SynthesisProfile {
        self.0
            .get(&emotion.to_lowercase())
            .or_else(|| self.0.get(DEFAULT_EMOTION))
            .copied()
            .unwrap_or_else(SynthesisProfile::calm)
    }

    pub fn names(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }
}

impl Default for EmotionProfiles {
    fn default() -> Self {
        let profiles = [
            ("calm", SynthesisProfile::calm()),
            ("happy", SynthesisProfile::new(0.5, 0.8, 0.6, true, 1.05)),
            ("excited", SynthesisProfile::new(0.3, 0.85, 0.9, true, 1.15)),
            ("sad", SynthesisProfile::new(0.8, 0.7, 0.4, false, 0.9)),
            ("scared", SynthesisProfile::new(0.35, 0.75, 0.7, true, 1.1)),
            ("angry", SynthesisProfile::new(0.4, 0.8, 0.8, true, 1.05)),
            ("mysterious", SynthesisProfile::new(0.7, 0.7, 0.5, false, 0.9)),
        ];
        Self(
            profiles
                .into_iter()
                .map(|(name, profile)| (name.to_string(), profile))
                .collect(),
        )
    }
}

/// Logical story character to a provider-specific voice identifier. Each
/// provider carries its own map; unknown characters resolve to `narrator`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterVoiceMap(BTreeMap<String, String>);

impl CharacterVoiceMap {
    pub fn new(voices: BTreeMap<String, String>) -> Self {
        Self(voices)
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(character, voice)| (character.to_string(), voice.to_string()))
                .collect(),
        )
    }

    /// Returns `None` only when neither the character nor `narrator` is mapped.
    pub fn resolve(&self, character: &str) -> Option<&str> {
        self.0
            .get(&character.to_lowercase())
            .or_else(|| self.0.get(DEFAULT_CHARACTER))
            .map(String::as_str)
    }

    pub fn characters(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// ElevenLabs premade voices.
    pub fn elevenlabs_defaults() -> Self {
        Self::from_pairs(&[
            ("narrator", "21m00Tcm4TlvDq8ikWAM"),
            ("girl", "MF3mGyEYCl7XYWbV9V6O"),
            ("wolf", "VR6AewLTigWG4xSOukaG"),
            ("grandmother", "EXAVITQu4vr4xnSDxMaL"),
            ("mother", "AZnzlk1XvdvUeBnXmlld"),
            ("hunter", "pNInz6obpgDQGcFmaJgB"),
            ("boy", "yoZ06aMxZJJ28mfd3POQ"),
        ])
    }

    pub fn openai_defaults() -> Self {
        Self::from_pairs(&[
            ("narrator", "fable"),
            ("girl", "nova"),
            ("wolf", "onyx"),
            ("grandmother", "shimmer"),
            ("mother", "alloy"),
            ("hunter", "echo"),
            ("boy", "alloy"),
        ])
    }
}
