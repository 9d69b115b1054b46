//! Voice-activity result policy
//!
//! Result boundaries are inferred from the engine's voice-activity flag: an
//! utterance is final on the first inactive block after at least one active
//! block. Results are handed out as small JSON envelopes.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Outcome of one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodingState {
    /// Keep feeding audio; no finalized result yet
    MoreData,
    /// An utterance has ended; read it with `result()`
    ResultReady,
}

impl DecodingState {
    /// Fold the per-block outcomes of one chunk
    pub fn merge(self, other: DecodingState) -> DecodingState {
        if self == Self::ResultReady || other == Self::ResultReady {
            Self::ResultReady
        } else {
            Self::MoreData
        }
    }
}

/// Tracks whether the previous block carried voice
#[derive(Debug, Default)]
pub struct VoiceActivityTracker {
    was_active: bool,
}

impl VoiceActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one decoded block from the engine's current voice flag
    pub fn observe(&mut self, voice_active: bool) -> DecodingState {
        match (voice_active, self.was_active) {
            (true, _) => {
                self.was_active = true;
                DecodingState::MoreData
            }
            (false, true) => {
                self.was_active = false;
                DecodingState::ResultReady
            }
            (false, false) => DecodingState::MoreData,
        }
    }
}

/// `{"partial": "<text>"}`
pub fn partial_envelope(text: &str) -> String {
    json!({ "partial": text }).to_string()
}

/// `{"text": "<text>"}`
pub fn text_envelope(text: &str) -> String {
    json!({ "text": text }).to_string()
}

/// Typed view of a final result envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub text: String,
}

/// Typed view of a partial result envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialResult {
    pub partial: String,
}
