//! Energy-based reference engine
//!
//! Not a recognizer. Flags voice activity when a block's RMS energy crosses a
//! threshold, keeps it raised for a few quiet blocks (hangover), and reports
//! every finished utterance as a segment marker such as
//! `"segment 1 0.20-1.10s"`.

use super::{DecodingEngine, EngineArgs};
use crate::audio::{calculate_energy, ENGINE_SAMPLE_RATE};
use crate::config::Config;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct Segment {
    start_block: u64,
    last_voiced_block: u64,
}

/// Voice-activity-only decoding engine
#[derive(Debug)]
pub struct EnergyEngine {
    threshold: f32,
    hangover_blocks: u32,
    block_size: usize,
    blocks_seen: u64,
    quiet_blocks: u32,
    current: Option<Segment>,
    segments_done: u32,
    finished: Vec<String>,
}

impl EnergyEngine {
    pub fn new(threshold: f32, hangover_blocks: u32, block_size: usize) -> Self {
        Self {
            threshold,
            hangover_blocks,
            block_size: block_size.max(1),
            blocks_seen: 0,
            quiet_blocks: 0,
            current: None,
            segments_done: 0,
            finished: Vec::new(),
        }
    }

    /// Build from bridge config and the device geometry handed to the engine
    pub fn from_args(config: &Config, args: &EngineArgs) -> Self {
        Self::new(
            config.energy_threshold,
            config.hangover_blocks,
            args.device.frames_per_buffer,
        )
    }

    fn seconds(&self, blocks: u64) -> f64 {
        (blocks * self.block_size as u64) as f64 / ENGINE_SAMPLE_RATE as f64
    }

    fn describe(&self, number: u32, segment: Segment) -> String {
        format!(
            "segment {} {:.2}-{:.2}s",
            number,
            self.seconds(segment.start_block),
            self.seconds(segment.last_voiced_block + 1)
        )
    }

    fn close_segment(&mut self) {
        if let Some(segment) = self.current.take() {
            self.segments_done += 1;
            let text = self.describe(self.segments_done, segment);
            debug!("Utterance ended: {}", text);
            self.finished.push(text);
        }
    }
}

impl DecodingEngine for EnergyEngine {
    fn process_block(&mut self, block: &[f32]) {
        let index = self.blocks_seen;
        self.blocks_seen += 1;

        if calculate_energy(block) >= self.threshold {
            self.quiet_blocks = 0;
            match self.current.as_mut() {
                Some(segment) => segment.last_voiced_block = index,
                None => {
                    self.current = Some(Segment {
                        start_block: index,
                        last_voiced_block: index,
                    })
                }
            }
        } else if self.current.is_some() {
            self.quiet_blocks += 1;
            if self.quiet_blocks > self.hangover_blocks {
                self.close_segment();
            }
        }
    }

    fn voice_active(&self) -> bool {
        self.current.is_some()
    }

    fn partial_text(&self) -> String {
        self.current
            .map(|segment| self.describe(self.segments_done + 1, segment))
            .unwrap_or_default()
    }

    fn final_text(&self) -> String {
        self.finished.join(" ")
    }

    fn flush_results(&mut self) {
        self.finished.clear();
    }
}
