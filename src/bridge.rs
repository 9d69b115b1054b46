//! Recognizer API over a shared decoder
//!
//! A [`Bridge`] owns everything that is process-wide for one decoding
//! engine: the decoder thread, the block buffer, the active-session slot and
//! the voice-activity history. [`Model`] and [`Recognizer`] handles are
//! bookkeeping on top of it. The first live model starts the decoder thread
//! and the last one to go stops it.
//!
//! Nothing here fails loudly. Rejected sessions, an engine that is still
//! initializing and an engine that never came up all look like "no result
//! yet" to the caller.

use crate::accumulator::BlockAccumulator;
use crate::audio::{self, InputRate};
use crate::config::Config;
use crate::engine::{
    engine_factory, EnergyEngine, EngineArgs, EngineFactory, EngineHost, EngineLink,
    VirtualInputDevice,
};
use crate::error::{BridgeError, BridgeResult};
use crate::policy::{self, DecodingState, VoiceActivityTracker};
use crate::session::{SessionArbiter, SessionKey};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

#[derive(Default)]
struct DecoderState {
    host: Option<EngineHost>,
    live_models: usize,
}

struct Pipeline {
    accumulator: BlockAccumulator,
    tracker: VoiceActivityTracker,
}

impl Pipeline {
    /// Forget buffered audio and voice history from a previous engine
    fn reset(&mut self) {
        self.accumulator.clear();
        self.tracker = VoiceActivityTracker::new();
    }
}

struct Shared {
    config: Config,
    factory: EngineFactory,
    decoder: Mutex<DecoderState>,
    arbiter: Mutex<SessionArbiter>,
    pipeline: Mutex<Pipeline>,
    next_model_id: AtomicU64,
    next_session_id: AtomicU64,
    live_sessions: AtomicUsize,
}

/// Shared decoding resource; clones refer to the same decoder
#[derive(Clone)]
pub struct Bridge {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("block_size", &self.block_size())
            .field("live_models", &self.live_models())
            .field("live_sessions", &self.live_sessions())
            .finish()
    }
}

impl Bridge {
    pub fn new(config: Config, factory: EngineFactory) -> Self {
        let block_size = config.block_size.max(1);
        let grace_period = config.grace_period();

        Self {
            shared: Arc::new(Shared {
                config,
                factory,
                decoder: Mutex::new(DecoderState::default()),
                arbiter: Mutex::new(SessionArbiter::new(grace_period)),
                pipeline: Mutex::new(Pipeline {
                    accumulator: BlockAccumulator::new(block_size),
                    tracker: VoiceActivityTracker::new(),
                }),
                next_model_id: AtomicU64::new(1),
                next_session_id: AtomicU64::new(1),
                live_sessions: AtomicUsize::new(0),
            }),
        }
    }

    /// Bridge backed by the built-in [`EnergyEngine`]
    pub fn with_energy_engine(config: Config) -> Self {
        let engine_config = config.clone();
        let factory =
            engine_factory(move |args| Ok(EnergyEngine::from_args(&engine_config, args)));
        Self::new(config, factory)
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn block_size(&self) -> usize {
        self.shared.config.block_size.max(1)
    }

    /// Whether a decoder thread is currently up and running its loop
    pub fn decoder_running(&self) -> bool {
        matches!(self.link(), Ok(Some(link)) if link.is_running())
    }

    pub fn live_models(&self) -> usize {
        self.shared
            .decoder
            .lock()
            .map(|d| d.live_models)
            .unwrap_or(0)
    }

    pub fn live_sessions(&self) -> usize {
        self.shared.live_sessions.load(Ordering::SeqCst)
    }

    pub fn active_session(&self) -> Option<SessionKey> {
        self.shared.arbiter.lock().ok().and_then(|a| a.active())
    }

    /// Samples waiting in the shared block buffer
    pub fn pending_samples(&self) -> usize {
        self.shared
            .pipeline
            .lock()
            .map(|p| p.accumulator.pending())
            .unwrap_or(0)
    }

    fn link(&self) -> BridgeResult<Option<EngineLink>> {
        Ok(self.shared.decoder.lock()?.host.as_ref().map(EngineHost::link))
    }

    fn acquire_model(&self, path: &Path) -> BridgeResult<u64> {
        let id = self.shared.next_model_id.fetch_add(1, Ordering::SeqCst);
        // Same lock order as submission: pipeline, then decoder
        let mut pipeline = self.shared.pipeline.lock()?;
        let mut decoder = self.shared.decoder.lock()?;

        if decoder.live_models == 0 {
            pipeline.reset();
            let args = EngineArgs {
                model_path: path.to_path_buf(),
                args: self.shared.config.engine_args.clone(),
                device: VirtualInputDevice::new(self.block_size()),
            };
            match EngineHost::start(Arc::clone(&self.shared.factory), args) {
                Ok(host) => decoder.host = Some(host),
                Err(e) => error!("❌ {} (continuing without decoding)", e),
            }
        }
        decoder.live_models += 1;

        info!(
            "📦 Model {} opened from {} ({} live)",
            id,
            path.display(),
            decoder.live_models
        );
        Ok(id)
    }

    fn release_model(&self, id: u64) {
        let mut pipeline = self
            .shared
            .pipeline
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut decoder = self
            .shared
            .decoder
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        decoder.live_models = decoder.live_models.saturating_sub(1);
        info!("📦 Model {} closed ({} live)", id, decoder.live_models);

        if decoder.live_models == 0 {
            if let Some(host) = decoder.host.take() {
                if let Err(e) = host.stop() {
                    error!("❌ {}", e);
                }
            }
            if pipeline.accumulator.pending() > 0 {
                debug!(
                    "Discarding {} buffered samples",
                    pipeline.accumulator.pending()
                );
            }
            pipeline.reset();
        }
    }

    fn submit(&self, key: SessionKey, rate: InputRate, samples: &[i16]) -> DecodingState {
        match self.try_submit(key, rate, samples) {
            Ok(state) => state,
            Err(e) => {
                warn!(
                    "⚠️ Audio from session {} dropped: {}",
                    key.session_id, e
                );
                DecodingState::MoreData
            }
        }
    }

    fn try_submit(
        &self,
        key: SessionKey,
        rate: InputRate,
        samples: &[i16],
    ) -> BridgeResult<DecodingState> {
        if !self.shared.arbiter.lock()?.admit(key, Instant::now()) {
            return Ok(DecodingState::MoreData);
        }

        let mut pipeline = self.shared.pipeline.lock()?;
        let Some(link) = self.link()?.filter(EngineLink::is_ready) else {
            debug!(
                "Engine not ready, ignoring {} samples from session {}",
                samples.len(),
                key.session_id
            );
            return Ok(DecodingState::MoreData);
        };

        let converted = audio::convert_samples(samples, rate);
        let Pipeline {
            accumulator,
            tracker,
        } = &mut *pipeline;

        let mut state = DecodingState::MoreData;
        let mut failure: Option<BridgeError> = None;
        let flushed = accumulator.push(&converted, |block| {
            if failure.is_some() {
                return;
            }
            let voice = link
                .deliver(block)
                .and_then(|_| link.with_engine(|engine| engine.voice_active()));
            match voice {
                Ok(voice) => state = state.merge(tracker.observe(voice)),
                Err(e) => failure = Some(e),
            }
        });

        if let Some(e) = failure {
            return Err(e);
        }
        trace!(
            "Session {}: {} samples in, {} blocks decoded, {:?}",
            key.session_id,
            converted.len(),
            flushed,
            state
        );
        Ok(state)
    }

    /// Read engine state on behalf of the active session only
    fn read_engine<R: Default>(
        &self,
        key: SessionKey,
        read: impl FnOnce(&mut dyn crate::engine::DecodingEngine) -> R,
    ) -> BridgeResult<R> {
        if !self.shared.arbiter.lock()?.is_active(key) {
            return Ok(R::default());
        }
        let Some(link) = self.link()? else {
            return Ok(R::default());
        };
        match link.with_engine(read) {
            Err(BridgeError::EngineStopped) => Ok(R::default()),
            other => other,
        }
    }

    fn partial_text(&self, key: SessionKey) -> String {
        self.read_engine(key, |engine| {
            if engine.voice_active() {
                engine.partial_text()
            } else {
                String::new()
            }
        })
        .unwrap_or_else(|e| {
            warn!("⚠️ Partial result unavailable: {}", e);
            String::new()
        })
    }

    fn take_final_text(&self, key: SessionKey) -> String {
        self.read_engine(key, |engine| {
            let text = engine.final_text();
            engine.flush_results();
            text
        })
        .unwrap_or_else(|e| {
            warn!("⚠️ Result unavailable: {}", e);
            String::new()
        })
    }
}

/// Handle for one opened model; the decoder runs while any model is open
pub struct Model {
    bridge: Bridge,
    id: u64,
    path: PathBuf,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("id", &self.id)
            .field("path", &self.path)
            .finish()
    }
}

impl Model {
    /// Open a model; the first live model starts the decoder thread
    pub fn new(bridge: &Bridge, path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref().to_path_buf();
        let id = bridge.acquire_model(&path)?;
        Ok(Self {
            bridge: bridge.clone(),
            id,
            path,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Wait up to `timeout` for the engine to finish initializing
    pub fn wait_ready(&self, timeout: Duration) -> bool {
        match self.bridge.link() {
            Ok(Some(link)) => link.wait_ready(timeout),
            _ => false,
        }
    }

    /// Release the model; same as dropping it
    pub fn close(self) {}
}

impl Drop for Model {
    fn drop(&mut self) {
        self.bridge.release_model(self.id);
    }
}

/// One client recognition stream
pub struct Recognizer {
    bridge: Bridge,
    key: SessionKey,
    rate: InputRate,
}

impl std::fmt::Debug for Recognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recognizer")
            .field("key", &self.key)
            .field("rate", &self.rate)
            .finish()
    }
}

impl Recognizer {
    /// Open a session on `model` for audio at `sample_rate` Hz
    ///
    /// Rates other than 8000, 16000 and 48000 are logged and treated as
    /// 16 kHz.
    pub fn new(model: &Model, sample_rate: f32) -> Self {
        let bridge = model.bridge.clone();
        let session_id = bridge.shared.next_session_id.fetch_add(1, Ordering::SeqCst);
        let key = SessionKey::new(session_id, model.id);

        let hz = if sample_rate.is_finite() && sample_rate > 0.0 {
            sample_rate.round() as u32
        } else {
            0
        };
        let rate = InputRate::from_hz(hz).unwrap_or_else(|e| {
            warn!("⚠️ Session {}: {}, using pass-through", session_id, e);
            InputRate::Wideband
        });

        let live = bridge.shared.live_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "🎙️ Session {} opened on model {} at {} Hz ({} live)",
            session_id,
            model.id,
            rate.hz(),
            live
        );

        Self { bridge, key, rate }
    }

    pub fn id(&self) -> u64 {
        self.key.session_id
    }

    pub fn key(&self) -> SessionKey {
        self.key
    }

    pub fn input_rate(&self) -> InputRate {
        self.rate
    }

    /// Accepted for API compatibility, has no effect
    pub fn set_max_alternatives(&mut self, max_alternatives: u16) {
        debug!(
            "Session {}: set_max_alternatives({}) ignored",
            self.key.session_id, max_alternatives
        );
    }

    /// Accepted for API compatibility, has no effect
    pub fn set_words(&mut self, words: bool) {
        debug!(
            "Session {}: set_words({}) ignored",
            self.key.session_id, words
        );
    }

    /// Submit little-endian 16-bit PCM; an odd trailing byte is dropped
    pub fn accept_waveform(&mut self, data: &[u8]) -> DecodingState {
        debug!(
            "Session {}: accept_waveform({} bytes)",
            self.key.session_id,
            data.len()
        );
        let samples = audio::decode_pcm16le(data);
        self.bridge.submit(self.key, self.rate, &samples)
    }

    /// Submit already decoded 16-bit samples
    pub fn accept_samples(&mut self, samples: &[i16]) -> DecodingState {
        self.bridge.submit(self.key, self.rate, samples)
    }

    /// `{"partial": ..}`, empty unless this session is active and speech is
    /// in progress
    pub fn partial_result(&mut self) -> String {
        policy::partial_envelope(&self.bridge.partial_text(self.key))
    }

    /// `{"text": ..}` with everything decoded since the last read
    pub fn result(&mut self) -> String {
        policy::text_envelope(&self.bridge.take_final_text(self.key))
    }

    /// Same contract as [`Recognizer::result`]
    pub fn final_result(&mut self) -> String {
        self.result()
    }
}

impl Drop for Recognizer {
    fn drop(&mut self) {
        let live = self
            .bridge
            .shared
            .live_sessions
            .fetch_sub(1, Ordering::SeqCst)
            .saturating_sub(1);
        info!(
            "🎙️ Session {} closed ({} live)",
            self.key.session_id, live
        );
    }
}
