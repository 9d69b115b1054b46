//! Scripted Decoding Engine for Testing
//!
//! Replays a fixed voice-activity script, one flag per block, and records
//! every block it receives.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use vosk_bridge::engine::EngineArgs;
use vosk_bridge::DecodingEngine;

/// Shared view into every engine instance a factory has produced
#[derive(Clone, Default)]
pub struct EngineProbe {
    /// All blocks received, in order
    pub blocks: Arc<Mutex<Vec<Vec<f32>>>>,
    /// Number of times the engine entry point ran
    pub starts: Arc<AtomicUsize>,
    /// Number of flush_results calls
    pub flushes: Arc<AtomicUsize>,
    /// Device geometry seen at the last start
    pub frames_per_buffer: Arc<AtomicUsize>,
}

impl EngineProbe {
    pub fn block_count(&self) -> usize {
        self.blocks.lock().unwrap().len()
    }

    pub fn blocks(&self) -> Vec<Vec<f32>> {
        self.blocks.lock().unwrap().clone()
    }
}

/// Engine whose voice flag follows a script; runs out into silence
pub struct ScriptedEngine {
    script: VecDeque<bool>,
    voiced: bool,
    utterances: u32,
    text: String,
    probe: EngineProbe,
}

impl ScriptedEngine {
    pub fn new(script: Vec<bool>, probe: EngineProbe, args: &EngineArgs) -> Self {
        probe.starts.fetch_add(1, Ordering::SeqCst);
        probe
            .frames_per_buffer
            .store(args.device.frames_per_buffer, Ordering::SeqCst);
        Self {
            script: script.into(),
            voiced: false,
            utterances: 0,
            text: String::new(),
            probe,
        }
    }
}

impl DecodingEngine for ScriptedEngine {
    fn process_block(&mut self, block: &[f32]) {
        if let Ok(mut blocks) = self.probe.blocks.lock() {
            blocks.push(block.to_vec());
        }

        let voiced = self.script.pop_front().unwrap_or(false);
        if self.voiced && !voiced {
            self.utterances += 1;
            if !self.text.is_empty() {
                self.text.push(' ');
            }
            self.text.push_str(&format!("utterance {}", self.utterances));
        }
        self.voiced = voiced;
    }

    fn voice_active(&self) -> bool {
        self.voiced
    }

    fn partial_text(&self) -> String {
        format!("speaking {}", self.utterances + 1)
    }

    fn final_text(&self) -> String {
        self.text.clone()
    }

    fn flush_results(&mut self) {
        self.probe.flushes.fetch_add(1, Ordering::SeqCst);
        self.text.clear();
    }
}
