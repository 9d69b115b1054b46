//! Decoder thread
//!
//! Uses a channel-based architecture: one dedicated thread owns the engine,
//! runs its entry point and then pulls blocks off a command channel until told
//! to terminate.

use super::monitor::{Counters, DecoderMonitor};
use super::{DecodingEngine, EngineArgs, EngineFactory};
use crate::error::{BridgeError, BridgeResult};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{debug, error, info, warn};

type EngineSlot = Arc<Mutex<Option<Box<dyn DecodingEngine>>>>;

/// Commands sent to the decoder thread
enum EngineCommand {
    Block(Vec<f32>),
    Terminate,
}

/// Owner of the decoder thread
pub struct EngineHost {
    link: EngineLink,
    handle: Option<thread::JoinHandle<()>>,
}

/// Cheap handle for talking to a running decoder thread
#[derive(Clone)]
pub struct EngineLink {
    sender: mpsc::Sender<EngineCommand>,
    monitor: Arc<DecoderMonitor>,
    engine: EngineSlot,
}

impl std::fmt::Debug for EngineLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineLink")
            .field("monitor", &self.monitor)
            .finish()
    }
}

impl EngineHost {
    /// Spawn the decoder thread and run the engine entry point on it
    pub fn start(factory: EngineFactory, args: EngineArgs) -> BridgeResult<Self> {
        let (sender, receiver) = mpsc::channel::<EngineCommand>();
        let monitor = Arc::new(DecoderMonitor::new());
        let engine: EngineSlot = Arc::new(Mutex::new(None));

        let thread_monitor = Arc::clone(&monitor);
        let thread_engine = Arc::clone(&engine);
        let handle = thread::Builder::new()
            .name("decoder".to_string())
            .spawn(move || {
                Self::decoder_thread(factory, args, receiver, &thread_monitor, &thread_engine);
                thread_monitor.shut_down();
            })
            .map_err(BridgeError::ThreadSpawn)?;

        Ok(Self {
            link: EngineLink {
                sender,
                monitor,
                engine,
            },
            handle: Some(handle),
        })
    }

    fn decoder_thread(
        factory: EngineFactory,
        args: EngineArgs,
        receiver: mpsc::Receiver<EngineCommand>,
        monitor: &DecoderMonitor,
        slot: &Mutex<Option<Box<dyn DecodingEngine>>>,
    ) {
        debug!("Engine entry point args: {:?}", args.args);
        let engine = match factory(&args) {
            Ok(engine) => engine,
            Err(e) => {
                error!("❌ {}", BridgeError::EngineInit(e.to_string()));
                return;
            }
        };

        match slot.lock() {
            Ok(mut guard) => *guard = Some(engine),
            Err(e) => {
                error!("❌ Engine slot unusable: {}", e);
                return;
            }
        }

        if let Err(e) = monitor.mark_idle() {
            error!("❌ Decoder monitor unusable: {}", e);
            return;
        }
        info!(
            "🎛️ Decoder thread started ({} samples per block)",
            args.device.frames_per_buffer
        );

        while let Ok(cmd) = receiver.recv() {
            match cmd {
                EngineCommand::Block(block) => {
                    if let Err(e) = Self::run_block(&block, monitor, slot) {
                        error!("❌ Decoder loop aborted: {}", e);
                        break;
                    }
                }
                EngineCommand::Terminate => break,
            }
        }

        if let Ok(mut guard) = slot.lock() {
            guard.take();
        }
        info!("🛑 Decoder thread stopped");
    }

    fn run_block(
        block: &[f32],
        monitor: &DecoderMonitor,
        slot: &Mutex<Option<Box<dyn DecodingEngine>>>,
    ) -> BridgeResult<()> {
        monitor.mark_busy()?;
        if let Some(engine) = slot.lock()?.as_mut() {
            engine.process_block(block);
        }
        monitor.mark_idle()
    }

    pub fn link(&self) -> EngineLink {
        self.link.clone()
    }

    /// Signal the engine to terminate and join the decoder thread
    pub fn stop(mut self) -> BridgeResult<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> BridgeResult<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        // A closed channel means the thread already left its loop
        let _ = self.link.sender.send(EngineCommand::Terminate);

        handle.join().map_err(|panic| {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "decoder thread panicked".to_string());
            BridgeError::ThreadJoin(reason)
        })
    }
}

impl Drop for EngineHost {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("⚠️ {}", e);
        }
    }
}

impl EngineLink {
    pub fn counters(&self) -> BridgeResult<Counters> {
        self.monitor.counters()
    }

    /// Whether the decoder loop has not exited yet
    pub fn is_running(&self) -> bool {
        self.monitor.is_running()
    }

    pub fn is_ready(&self) -> bool {
        self.monitor.is_running() && self.counters().map(|c| c.is_ready()).unwrap_or(false)
    }

    pub fn wait_ready(&self, timeout: std::time::Duration) -> bool {
        self.monitor.wait_ready(timeout)
    }

    /// Hand one full block to the engine and wait until it has been decoded
    pub fn deliver(&self, block: &[f32]) -> BridgeResult<Counters> {
        let before = self.monitor.counters()?;
        self.sender
            .send(EngineCommand::Block(block.to_vec()))
            .map_err(|_| BridgeError::EngineStopped)?;
        self.monitor.wait_block_done(before)
    }

    /// Run `f` against the engine while the decoder is not touching it
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut dyn DecodingEngine) -> R) -> BridgeResult<R> {
        let mut guard = self.engine.lock()?;
        let engine = guard.as_mut().ok_or(BridgeError::EngineStopped)?;
        Ok(f(&mut **engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{engine_factory, VirtualInputDevice};

    struct CountingEngine {
        blocks: usize,
    }

    impl DecodingEngine for CountingEngine {
        fn process_block(&mut self, _block: &[f32]) {
            self.blocks += 1;
        }
        fn voice_active(&self) -> bool {
            false
        }
        fn partial_text(&self) -> String {
            String::new()
        }
        fn final_text(&self) -> String {
            self.blocks.to_string()
        }
        fn flush_results(&mut self) {
            self.blocks = 0;
        }
    }

    fn args() -> EngineArgs {
        EngineArgs {
            model_path: "model".into(),
            args: Vec::new(),
            device: VirtualInputDevice::new(4),
        }
    }

    #[test]
    fn test_deliver_waits_for_decode() {
        let factory = engine_factory(|_| Ok(CountingEngine { blocks: 0 }));
        let host = EngineHost::start(factory, args()).unwrap();
        let link = host.link();
        assert!(link.wait_ready(std::time::Duration::from_secs(5)));

        let counters = link.deliver(&[0.0; 4]).unwrap();
        assert_eq!(counters.busy, 1);
        assert_eq!(counters.idle, 2);
        link.deliver(&[0.0; 4]).unwrap();

        let text = link.with_engine(|e| e.final_text()).unwrap();
        assert_eq!(text, "2");
        host.stop().unwrap();
        assert!(!link.is_ready());
    }

    #[test]
    fn test_failed_factory_is_never_ready() {
        let factory = engine_factory(|_| Err::<CountingEngine, _>(anyhow::anyhow!("no model")));
        let host = EngineHost::start(factory, args()).unwrap();
        let link = host.link();
        host.stop().unwrap();

        assert!(!link.is_ready());
        assert!(matches!(
            link.with_engine(|e| e.voice_active()),
            Err(BridgeError::EngineStopped)
        ));
        assert!(link.deliver(&[0.0; 4]).is_err());
    }
}
