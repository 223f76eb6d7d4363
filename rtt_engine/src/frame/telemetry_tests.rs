use super::*;
use std::time::{Duration, Instant};

#[test]
fn test_title_text_is_single_line() {
    let snapshot = TelemetrySnapshot { fps: 144, frame_time: 0.00694, total_time: 12.5 };
    let title = snapshot.title_text();
    assert_eq!(title, "FPS: 144 | FrameTime: 0.0069 | TotalTime: 12.50");
    assert!(!title.contains('\n'));
}

#[test]
fn test_snapshot_from_game_time() {
    let mut time = GameTime::new();
    let start = Instant::now();
    time.tick_at(start, |_| {});
    time.tick_at(start + Duration::from_millis(20), |_| {});

    let snapshot = TelemetrySnapshot::from_game_time(&time);
    assert_eq!(snapshot.fps, 0);
    assert!((snapshot.frame_time - 0.02).abs() < 1e-12);
    assert!((snapshot.total_time - 0.02).abs() < 1e-12);
}

#[test]
fn test_slot_is_last_write_wins() {
    let slot = TelemetrySlot::new();
    assert_eq!(slot.latest(), None);

    let reader = slot.clone();
    slot.publish(TelemetrySnapshot { fps: 1, ..Default::default() });
    slot.publish(TelemetrySnapshot { fps: 2, ..Default::default() });
    assert_eq!(reader.latest().map(|s| s.fps), Some(2));
}

#[test]
fn test_slot_across_threads() {
    let slot = TelemetrySlot::new();
    let writer = slot.clone();
    std::thread::spawn(move || {
        for fps in 0..100 {
            writer.publish(TelemetrySnapshot { fps, ..Default::default() });
        }
    })
    .join()
    .unwrap();
    assert_eq!(slot.latest().map(|s| s.fps), Some(99));
}

#[test]
fn test_publish_after_poisoned_lock() {
    let slot = TelemetrySlot::new();
    let holder = slot.clone();
    let _ = std::thread::spawn(move || {
        let _guard = holder.latest.lock().unwrap();
        panic!("render thread panicked while publishing");
    })
    .join();
    assert!(slot.latest.is_poisoned());

    slot.publish(TelemetrySnapshot { fps: 7, ..Default::default() });
    assert_eq!(slot.latest().map(|s| s.fps), Some(7));
}
