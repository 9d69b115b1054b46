#![allow(dead_code)]

pub mod mock_engine;

use mock_engine::{EngineProbe, ScriptedEngine};
use std::time::Duration;
use vosk_bridge::{engine_factory, Bridge, Config, Model};

pub const READY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn test_config(block_size: usize, grace_period_ms: u64) -> Config {
    Config {
        block_size,
        grace_period_ms,
        ..Config::default()
    }
}

/// Bridge backed by a [`ScriptedEngine`] replaying `script`
pub fn scripted_bridge(config: Config, script: Vec<bool>) -> (Bridge, EngineProbe) {
    let probe = EngineProbe::default();
    let factory_probe = probe.clone();
    let factory = engine_factory(move |args| {
        Ok(ScriptedEngine::new(
            script.clone(),
            factory_probe.clone(),
            args,
        ))
    });
    (Bridge::new(config, factory), probe)
}

/// Open a model and wait for the engine to come up
pub fn ready_model(bridge: &Bridge) -> Model {
    let model = Model::new(bridge, "test-model").expect("Failed to open model");
    assert!(model.wait_ready(READY_TIMEOUT), "engine never became ready");
    model
}

/// Little-endian PCM bytes for `samples`
pub fn pcm(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
