//! Busy/idle bookkeeping for the decoder thread
//!
//! The decoder loop bumps `busy` when it picks up a block and `idle` when it
//! goes back to waiting. Callers wait in two stages: first for `busy` to move
//! past the value seen before delivery, then for `idle` to move past the
//! value recorded at pickup. Reading engine state any earlier would observe
//! the previous block.

use crate::error::{BridgeError, BridgeResult};
use std::sync::{Condvar, Mutex};
use std::time::Duration;
use tracing::trace;

/// Snapshot of the decoder activity counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub busy: u64,
    pub idle: u64,
}

impl Counters {
    /// The engine reports idle once it has finished initializing
    pub fn is_ready(&self) -> bool {
        self.idle > 0
    }
}

#[derive(Debug, Default)]
struct Activity {
    counters: Counters,
    idle_at_pickup: u64,
    running: bool,
}

/// Shared counters plus the condition variable that announces changes
#[derive(Debug)]
pub struct DecoderMonitor {
    activity: Mutex<Activity>,
    changed: Condvar,
}

impl Default for DecoderMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderMonitor {
    pub fn new() -> Self {
        Self {
            activity: Mutex::new(Activity {
                running: true,
                ..Activity::default()
            }),
            changed: Condvar::new(),
        }
    }

    pub fn counters(&self) -> BridgeResult<Counters> {
        Ok(self.activity.lock()?.counters)
    }

    pub fn is_running(&self) -> bool {
        self.activity.lock().map(|a| a.running).unwrap_or(false)
    }

    /// Decoder side: a block has been picked up
    pub fn mark_busy(&self) -> BridgeResult<()> {
        let mut activity = self.activity.lock()?;
        activity.counters.busy += 1;
        activity.idle_at_pickup = activity.counters.idle;
        drop(activity);
        self.changed.notify_all();
        Ok(())
    }

    /// Decoder side: back to waiting for the next block
    pub fn mark_idle(&self) -> BridgeResult<()> {
        self.activity.lock()?.counters.idle += 1;
        self.changed.notify_all();
        Ok(())
    }

    /// Decoder side: the loop has exited, release every waiter
    pub fn shut_down(&self) {
        if let Ok(mut activity) = self.activity.lock() {
            activity.running = false;
        }
        self.changed.notify_all();
    }

    /// Wait up to `timeout` for the engine to finish initializing
    pub fn wait_ready(&self, timeout: Duration) -> bool {
        let Ok(activity) = self.activity.lock() else {
            return false;
        };
        match self.changed.wait_timeout_while(activity, timeout, |a| {
            a.running && !a.counters.is_ready()
        }) {
            Ok((activity, _)) => activity.running && activity.counters.is_ready(),
            Err(_) => false,
        }
    }

    /// Stage 1: block until the engine has picked up a block delivered after
    /// `before` was captured. Returns the idle counter at pickup.
    pub fn wait_started(&self, before: Counters) -> BridgeResult<u64> {
        let activity = self.activity.lock()?;
        let activity = self
            .changed
            .wait_while(activity, |a| a.running && a.counters.busy == before.busy)?;

        if activity.counters.busy == before.busy {
            return Err(BridgeError::EngineStopped);
        }
        trace!("Decoder picked up block (busy={})", activity.counters.busy);
        Ok(activity.idle_at_pickup)
    }

    /// Stage 2: block until the idle counter moves past `idle_at_pickup`
    pub fn wait_finished(&self, idle_at_pickup: u64) -> BridgeResult<Counters> {
        let activity = self.activity.lock()?;
        let activity = self
            .changed
            .wait_while(activity, |a| a.running && a.counters.idle == idle_at_pickup)?;

        if activity.counters.idle == idle_at_pickup {
            return Err(BridgeError::EngineStopped);
        }
        trace!("Decoder finished block (idle={})", activity.counters.idle);
        Ok(activity.counters)
    }

    /// Both stages in order
    pub fn wait_block_done(&self, before: Counters) -> BridgeResult<Counters> {
        let idle_at_pickup = self.wait_started(before)?;
        self.wait_finished(idle_at_pickup)
    }
}
