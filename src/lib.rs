//! vosk-bridge Library
//!
//! Vosk-style recognizer API on top of a single pull-based decoding engine:
//! sample-rate conversion, block accumulation, decoder synchronization and
//! active-session arbitration.

pub mod accumulator;
pub mod audio;
pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod policy;
pub mod session;

// Re-export main types
pub use bridge::{Bridge, Model, Recognizer};
pub use config::Config;
pub use engine::{engine_factory, DecodingEngine, EngineArgs, EngineFactory};
pub use error::{BridgeError, BridgeResult};
pub use policy::{DecodingState, PartialResult, RecognitionResult};
pub use session::SessionKey;
