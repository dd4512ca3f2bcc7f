//! Musical genres and their per-genre generation parameters.
//!
//! The genre is chosen locally, before any collaborator is involved, and
//! drives the instrumental prompt, the voice delivery and the video palette.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// The closed set of genres a commit song can be generated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Genre {
    Rock,
    Pop,
    Opera,
    Reggaeton,
    DeathMetal,
}

/// Voice delivery parameters passed to the speech synthesizer
#[derive(Debug, Clone, Copy)]
pub struct VoiceStyle {
    /// Phoneme length multiplier (1.0 = neutral pace)
    pub length_scale: f32,
    /// Synthesis variability
    pub noise_scale: f32,
}

/// Background gradient used by the video composition
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Palette {
    pub from: &'static str,
    pub to: &'static str,
}

impl Genre {
    pub const ALL: [Genre; 5] = [
        Genre::Rock,
        Genre::Pop,
        Genre::Opera,
        Genre::Reggaeton,
        Genre::DeathMetal,
    ];

    /// Pick a genre uniformly at random
    pub fn pick(rng: &mut impl Rng) -> Genre {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    /// Human-readable label used in prompts and titles
    pub fn label(self) -> &'static str {
        match self {
            Genre::Rock => "Rock",
            Genre::Pop => "Pop",
            Genre::Opera => "Opera lirica",
            Genre::Reggaeton => "Reggaeton",
            Genre::DeathMetal => "Death Metal",
        }
    }

    /// Prompt fed to the instrumental generator
    pub fn music_prompt(self) -> &'static str {
        match self {
            Genre::Rock => {
                "energetic rock guitar riff, driving drums, powerful bass, stadium anthem"
            }
            Genre::Pop => "catchy pop melody, upbeat synth, cheerful rhythm, dance groove",
            Genre::Opera => {
                "dramatic orchestral strings, operatic choir, classical grandeur, crescendo"
            }
            Genre::Reggaeton => "reggaeton beat, dembow rhythm, latin bass, tropical percussion",
            Genre::DeathMetal => {
                "aggressive death metal guitar, blast beat drums, dark heavy distortion"
            }
        }
    }

    /// Token budget for the instrumental take; opera gets a longer one
    pub fn max_new_tokens(self) -> u32 {
        match self {
            Genre::Opera => 750,
            _ => 500,
        }
    }

    /// Voice delivery for the sung lyrics
    pub fn voice_style(self) -> VoiceStyle {
        match self {
            Genre::Rock => VoiceStyle {
                length_scale: 0.9,
                noise_scale: 0.7,
            },
            Genre::Pop => VoiceStyle {
                length_scale: 1.0,
                noise_scale: 0.6,
            },
            Genre::Opera => VoiceStyle {
                length_scale: 1.3,
                noise_scale: 0.5,
            },
            Genre::Reggaeton => VoiceStyle {
                length_scale: 0.85,
                noise_scale: 0.7,
            },
            Genre::DeathMetal => VoiceStyle {
                length_scale: 0.8,
                noise_scale: 0.9,
            },
        }
    }

    /// Background gradient of the rendered video
    pub fn palette(self) -> Palette {
        match self {
            Genre::Rock => Palette {
                from: "#1a1a2e",
                to: "#e94560",
            },
            Genre::Pop => Palette {
                from: "#ff9a9e",
                to: "#fad0c4",
            },
            Genre::Opera => Palette {
                from: "#2c061f",
                to: "#d89216",
            },
            Genre::Reggaeton => Palette {
                from: "#0f3443",
                to: "#34e89e",
            },
            Genre::DeathMetal => Palette {
                from: "#000000",
                to: "#52057b",
            },
        }
    }
}
