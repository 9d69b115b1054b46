use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use vosk_bridge::Recognizer;

mod common;
use common::{ready_model, scripted_bridge, test_config};

#[test]
fn test_parallel_sessions_share_one_decoder() {
    const BLOCK: usize = 16;
    let (bridge, probe) = scripted_bridge(test_config(BLOCK, 2000), vec![]);
    let model = Arc::new(ready_model(&bridge));
    let barrier = Arc::new(Barrier::new(4));

    let workers: Vec<_> = (0..4)
        .map(|n| {
            let model = Arc::clone(&model);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut rec = Recognizer::new(&model, 16000.0);
                barrier.wait();
                for _ in 0..50 {
                    rec.accept_samples(&[n as i16 + 1; 24]);
                    let _ = rec.partial_result();
                }
                rec.key()
            })
        })
        .collect();

    let keys: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();

    // Only the first session to submit ever reached the decoder
    let active = bridge.active_session().expect("some session must be active");
    assert!(keys.contains(&active));
    let owner_value = probe.blocks()[0][0];
    assert!(probe
        .blocks()
        .iter()
        .all(|b| b.len() == BLOCK && b.iter().all(|&s| s == owner_value)));
    assert_eq!(probe.block_count(), 50 * 24 / BLOCK);
}

#[test]
fn test_closing_model_while_sessions_submit() {
    let (bridge, _probe) = scripted_bridge(test_config(8, 2000), vec![true, false].repeat(100));
    let model = ready_model(&bridge);
    let mut rec = Recognizer::new(&model, 16000.0);

    let submitter = thread::spawn(move || {
        for _ in 0..200 {
            rec.accept_samples(&[500; 8]);
            let _ = rec.result();
        }
    });

    thread::sleep(Duration::from_millis(5));
    drop(model);
    submitter.join().unwrap();

    assert!(!bridge.decoder_running());
    assert_eq!(bridge.live_sessions(), 0);
}
