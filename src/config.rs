use crate::error::BridgeResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    // Decoder
    /// Samples per block handed to the engine (at 16 kHz)
    pub block_size: usize,
    /// Argument vector passed to the engine entry point
    pub engine_args: Vec<String>,

    // Arbitration
    /// How long the active session may stay silent before it can be displaced
    pub grace_period_ms: u64,

    // Energy engine
    pub energy_threshold: f32,
    pub hangover_blocks: u32,

    // Meta
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_size: 1600,
            engine_args: ["-cfg", "recognizer.cfg", "-out", "res"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            grace_period_ms: 2000,
            energy_threshold: 0.02,
            hangover_blocks: 3,
            log_level: "INFO".to_string(),
        }
    }
}

impl Config {
    /// Load config from the default location, or fall back to defaults
    pub fn load() -> BridgeResult<Self> {
        Self::load_from(&config_path())
    }

    /// Load config from `path`; a missing or corrupt file yields defaults
    pub fn load_from(path: &Path) -> BridgeResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str::<Config>(&content) {
            Ok(config) => Ok(config.sanitized()),
            Err(e) => {
                tracing::warn!("⚠️ Config file corrupted or invalid, using defaults: {}", e);
                let backup_path = path.with_extension("json.corrupt");
                let _ = std::fs::rename(path, &backup_path);
                Ok(Self::default())
            }
        }
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> BridgeResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    fn sanitized(mut self) -> Self {
        if self.block_size == 0 {
            tracing::warn!("block_size of 0 is not usable, clamping to 1");
            self.block_size = 1;
        }
        self
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vosk-bridge")
        .join("config.json")
}
