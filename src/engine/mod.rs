//! Decoding engine seam
//!
//! The engine is single-threaded and pull-based: it lives on the decoder
//! thread and is handed one full block of 16 kHz `f32` audio at a time.
//! Everything the bridge knows about its progress comes from the busy/idle
//! counters kept by [`monitor::DecoderMonitor`].

pub mod energy;
pub mod host;
pub mod monitor;

use crate::audio::ENGINE_SAMPLE_RATE;
use std::path::PathBuf;
use std::sync::Arc;

// Re-export main types
pub use energy::EnergyEngine;
pub use host::{EngineHost, EngineLink};
pub use monitor::{Counters, DecoderMonitor};

/// Trait for decoding engines driven by the bridge
pub trait DecodingEngine: Send {
    /// Consume one full block of engine-format audio
    fn process_block(&mut self, block: &[f32]);

    /// Whether speech is currently detected
    fn voice_active(&self) -> bool;

    /// Text of the utterance in progress
    fn partial_text(&self) -> String;

    /// Text buffered since the last flush
    fn final_text(&self) -> String;

    /// Discard buffered text
    fn flush_results(&mut self);
}

/// Description of the input device the engine is pulled from
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualInputDevice {
    pub name: String,
    pub max_input_channels: u16,
    pub sample_rate: u32,
    pub frames_per_buffer: usize,
}

impl VirtualInputDevice {
    pub fn new(frames_per_buffer: usize) -> Self {
        Self {
            name: "vosk".to_string(),
            max_input_channels: 1,
            sample_rate: ENGINE_SAMPLE_RATE,
            frames_per_buffer,
        }
    }
}

/// Arguments handed to the engine entry point on the decoder thread
#[derive(Debug, Clone)]
pub struct EngineArgs {
    pub model_path: PathBuf,
    pub args: Vec<String>,
    pub device: VirtualInputDevice,
}

/// Engine entry point, invoked once per decoder thread start
pub type EngineFactory =
    Arc<dyn Fn(&EngineArgs) -> anyhow::Result<Box<dyn DecodingEngine>> + Send + Sync>;

/// Wrap a constructor for a concrete engine type as an [`EngineFactory`]
pub fn engine_factory<E, F>(make: F) -> EngineFactory
where
    E: DecodingEngine + 'static,
    F: Fn(&EngineArgs) -> anyhow::Result<E> + Send + Sync + 'static,
{
    Arc::new(
        move |args: &EngineArgs| -> anyhow::Result<Box<dyn DecodingEngine>> {
            Ok(Box::new(make(args)?))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_device_geometry() {
        let device = VirtualInputDevice::new(1600);
        assert_eq!(device.name, "vosk");
        assert_eq!(device.max_input_channels, 1);
        assert_eq!(device.sample_rate, 16000);
        assert_eq!(device.frames_per_buffer, 1600);
    }
}
