//! vosk-bridge - stream a raw PCM file through the bridge
//!
//! Uses the built-in energy engine, so results are utterance markers rather
//! than transcripts.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vosk_bridge::{Bridge, Config, DecodingState, Model, Recognizer};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Raw mono s16le audio file
    input: PathBuf,

    /// Sample rate of the input file
    #[arg(short, long, default_value_t = 16000)]
    rate: u32,

    /// Bytes handed to the recognizer per call
    #[arg(short, long, default_value_t = 3200)]
    chunk: usize,

    /// Number of sessions fed round-robin
    #[arg(short, long, default_value_t = 1)]
    sessions: usize,

    /// Model path handed to the engine
    #[arg(short, long, default_value = "model")]
    model: PathBuf,

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print partial results after every chunk
    #[arg(short, long)]
    partial: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Setup logging
    let level = if args.verbose {
        "debug".to_string()
    } else {
        config.log_level.to_lowercase()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("🧩 vosk-bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let audio = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let bridge = Bridge::with_energy_engine(config);
    info!(
        "⚙️ Block size {} samples, grace period {:?}",
        bridge.block_size(),
        bridge.config().grace_period()
    );
    let model = Model::new(&bridge, &args.model)?;
    if !model.wait_ready(Duration::from_secs(5)) {
        warn!("⚠️ Decoding engine did not come up, no results will be produced");
    }

    let mut sessions: Vec<Recognizer> = (0..args.sessions.max(1))
        .map(|_| Recognizer::new(&model, args.rate as f32))
        .collect();

    for (i, chunk) in audio.chunks(args.chunk.max(2)).enumerate() {
        let index = i % sessions.len();
        let recognizer = &mut sessions[index];

        if recognizer.accept_waveform(chunk) == DecodingState::ResultReady {
            println!("[session {}] {}", recognizer.id(), recognizer.result());
        } else if args.partial {
            println!("[session {}] {}", recognizer.id(), recognizer.partial_result());
        }
    }

    for recognizer in &mut sessions {
        println!(
            "[session {}] final {}",
            recognizer.id(),
            recognizer.final_result()
        );
    }

    info!("✅ Processed {} bytes", audio.len());
    Ok(())
}
