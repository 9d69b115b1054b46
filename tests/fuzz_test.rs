use std::sync::atomic::Ordering;
use std::time::Instant;
use vosk_bridge::{DecodingState, Recognizer};

mod common;
use common::{ready_model, scripted_bridge, test_config};

#[test]
fn test_irregular_chunk_flood() {
    const BLOCK: usize = 37;
    let (bridge, probe) = scripted_bridge(test_config(BLOCK, 2000), vec![]);
    let model = ready_model(&bridge);
    let mut rec = Recognizer::new(&model, 16000.0);

    // Odd lengths drop their trailing byte, empty chunks are no-ops
    let lengths = [0usize, 1, 2, 3, 77, 160, 1, 999, 4096, 13, 2, 8191, 640];
    let mut total_samples = 0;

    let start = Instant::now();
    for round in 0..20 {
        for (i, &len) in lengths.iter().enumerate() {
            let chunk: Vec<u8> = (0..len).map(|b| (b * 31 + i + round) as u8).collect();
            total_samples += len / 2;
            assert_eq!(rec.accept_waveform(&chunk), DecodingState::MoreData);
        }
    }
    println!("Flooded {} samples in {:?}", total_samples, start.elapsed());

    let blocks = probe.blocks();
    assert_eq!(blocks.len(), total_samples / BLOCK);
    assert!(blocks.iter().all(|b| b.len() == BLOCK));
    assert_eq!(bridge.pending_samples(), total_samples % BLOCK);
}

#[test]
fn test_mixed_rates_flood() {
    const BLOCK: usize = 64;
    let (bridge, probe) = scripted_bridge(test_config(BLOCK, 0), vec![]);
    let model = ready_model(&bridge);

    let mut sessions = [
        Recognizer::new(&model, 8000.0),
        Recognizer::new(&model, 16000.0),
        Recognizer::new(&model, 48000.0),
        Recognizer::new(&model, 22050.0),
    ];

    // Zero grace period: any session that waits a moment takes the slot over
    let mut engine_samples = 0;
    for round in 0..50 {
        let len = 30 + round * 7;
        let samples = vec![(round as i16) * 100; len];
        for rec in sessions.iter_mut() {
            std::thread::sleep(std::time::Duration::from_millis(1));
            let before = probe.block_count() * BLOCK + bridge.pending_samples();
            rec.accept_samples(&samples);
            let after = probe.block_count() * BLOCK + bridge.pending_samples();
            assert_eq!(after, before + rec.input_rate().output_len(len));
            engine_samples = after;
        }
    }

    assert_eq!(probe.block_count(), engine_samples / BLOCK);
    assert!(probe.blocks().iter().all(|b| b.len() == BLOCK));
    assert_eq!(probe.flushes.load(Ordering::SeqCst), 0);
}
