//! Active-session arbitration
//!
//! The decoding engine is not reentrant, so only one session at a time may
//! feed it. A session keeps the slot for as long as it keeps submitting; once
//! it has been silent for longer than the grace period, the next session to
//! submit takes the slot over. This is a timeout-based mutual exclusion, not
//! a queue.

use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default time the active session may stay silent before displacement
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Identity of a session for arbitration purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub session_id: u64,
    pub model_id: u64,
}

impl SessionKey {
    pub fn new(session_id: u64, model_id: u64) -> Self {
        Self {
            session_id,
            model_id,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveSlot {
    key: SessionKey,
    last_active: Instant,
}

/// Holds the single active-session slot
#[derive(Debug)]
pub struct SessionArbiter {
    grace_period: Duration,
    slot: Option<ActiveSlot>,
}

impl Default for SessionArbiter {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_PERIOD)
    }
}

impl SessionArbiter {
    pub fn new(grace_period: Duration) -> Self {
        Self {
            grace_period,
            slot: None,
        }
    }

    /// Decide whether `key` may drive the decoder at `now`
    ///
    /// The active session is refreshed and admitted. Any other session is
    /// admitted, and becomes active, only if the active one has been silent
    /// for longer than the grace period.
    pub fn admit(&mut self, key: SessionKey, now: Instant) -> bool {
        if let Some(slot) = self.slot.as_mut() {
            if slot.key == key {
                slot.last_active = now;
                return true;
            }
            if now.saturating_duration_since(slot.last_active) <= self.grace_period {
                debug!(
                    "Session {} rejected, session {} is active",
                    key.session_id, slot.key.session_id
                );
                return false;
            }
        }

        info!(
            "🎤 Session {} (model {}) is now active",
            key.session_id, key.model_id
        );
        self.slot = Some(ActiveSlot {
            key,
            last_active: now,
        });
        true
    }

    /// Whether `key` currently holds the slot; does not refresh it
    pub fn is_active(&self, key: SessionKey) -> bool {
        self.slot.is_some_and(|slot| slot.key == key)
    }

    pub fn active(&self) -> Option<SessionKey> {
        self.slot.map(|slot| slot.key)
    }
}
