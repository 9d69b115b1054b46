//! Sample conversion from client PCM to engine format
//!
//! Clients push 16-bit little-endian PCM at 8, 16 or 48 kHz. The engine only
//! understands normalized `f32` at 16 kHz. Rate changes are naive: 8 kHz is
//! upsampled by sample duplication and 48 kHz is decimated by keeping every
//! third sample. Neither path filters.

use crate::error::{BridgeError, BridgeResult};
use tracing::trace;

/// Rate the decoding engine runs at
pub const ENGINE_SAMPLE_RATE: u32 = 16000;

const I16_SCALE: f32 = 32768.0;

/// Declared input rate of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRate {
    /// 8 kHz, every sample emitted twice
    Narrowband,
    /// 16 kHz, pass-through
    Wideband,
    /// 48 kHz, every third sample kept
    Fullband,
}

impl InputRate {
    pub fn from_hz(hz: u32) -> BridgeResult<Self> {
        match hz {
            8000 => Ok(Self::Narrowband),
            16000 => Ok(Self::Wideband),
            48000 => Ok(Self::Fullband),
            other => Err(BridgeError::UnsupportedSampleRate(other)),
        }
    }

    pub fn hz(self) -> u32 {
        match self {
            Self::Narrowband => 8000,
            Self::Wideband => 16000,
            Self::Fullband => 48000,
        }
    }

    /// Number of engine samples produced from `input` client samples
    pub fn output_len(self, input: usize) -> usize {
        match self {
            Self::Narrowband => input * 2,
            Self::Wideband => input,
            Self::Fullband => input.div_ceil(3),
        }
    }
}

/// Decode little-endian `i16` samples; a trailing odd byte is dropped
pub fn decode_pcm16le(bytes: &[u8]) -> Vec<i16> {
    let chunks = bytes.chunks_exact(2);
    if !chunks.remainder().is_empty() {
        trace!("Dropping trailing partial sample ({} bytes total)", bytes.len());
    }
    chunks.map(|b| i16::from_le_bytes([b[0], b[1]])).collect()
}

/// Convert raw PCM bytes to engine samples
pub fn convert(bytes: &[u8], rate: InputRate) -> Vec<f32> {
    convert_samples(&decode_pcm16le(bytes), rate)
}

/// Convert decoded `i16` samples to engine samples
///
/// Decimation always starts at index 0 of `samples`; no phase is carried
/// between calls.
pub fn convert_samples(samples: &[i16], rate: InputRate) -> Vec<f32> {
    let mut out = Vec::with_capacity(rate.output_len(samples.len()));
    let normalize = |s: i16| s as f32 / I16_SCALE;

    match rate {
        InputRate::Narrowband => {
            for &s in samples {
                let v = normalize(s);
                out.push(v);
                out.push(v);
            }
        }
        InputRate::Wideband => out.extend(samples.iter().map(|&s| normalize(s))),
        InputRate::Fullband => out.extend(samples.iter().step_by(3).map(|&s| normalize(s))),
    }

    out
}

/// Calculate RMS energy of a normalized block, used for voice detection
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}
