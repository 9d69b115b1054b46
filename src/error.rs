//! vosk-bridge Error Types
//!
//! Every failure in this crate degrades to "no result yet" at the public
//! recognizer API; these variants carry the reason into the logs.

use thiserror::Error;

/// Central error type for the bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Unsupported input sample rate: {0} Hz (expected 8000, 16000 or 48000)")]
    UnsupportedSampleRate(u32),

    #[error("Decoding engine failed to initialize: {0}")]
    EngineInit(String),

    #[error("Decoding engine is not running")]
    EngineStopped,

    #[error("Decoder thread failed to start: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    #[error("Decoder thread failed to join: {0}")]
    ThreadJoin(String),

    #[error("Lock poisoned: {0}")]
    Lock(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Helper to convert Mutex poison errors
impl<T> From<std::sync::PoisonError<T>> for BridgeError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        BridgeError::Lock(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_unsupported_rate_display() {
        let err = BridgeError::UnsupportedSampleRate(44100);
        assert_eq!(
            err.to_string(),
            "Unsupported input sample rate: 44100 Hz (expected 8000, 16000 or 48000)"
        );
    }

    #[test]
    fn test_from_poison_error() {
        let lock = Arc::new(Mutex::new(0));
        let poisoner = Arc::clone(&lock);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        let err: BridgeError = lock.lock().unwrap_err().into();
        assert!(matches!(err, BridgeError::Lock(_)));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BridgeError>();
    }
}
