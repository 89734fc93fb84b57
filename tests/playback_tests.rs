// Playback scheduling invariants
//
// Start times are non-decreasing and each fragment starts at
// max(previous start + previous duration, clock now) — fragments never
// overlap, whatever the arrival pattern.

use lingua_live::{PlaybackConfig, PlaybackScheduler};
use std::time::Duration;

fn millisecond_scheduler() -> PlaybackScheduler {
    // 1kHz mono: one sample per millisecond
    PlaybackScheduler::new(PlaybackConfig {
        sample_rate: 1000,
        channels: 1,
    })
}

#[test]
fn test_burst_arrival_plays_gap_free() {
    let mut sched = millisecond_scheduler();

    // Ten 80ms fragments all arrive at once
    let fragments: Vec<_> = (0..10)
        .map(|_| sched.schedule(vec![0; 80], Duration::ZERO))
        .collect();

    for pair in fragments.windows(2) {
        assert_eq!(pair[1].start, pair[0].end(), "no gap and no overlap");
    }
    assert_eq!(sched.cursor(), Duration::from_millis(800));
}

#[test]
fn test_jittered_arrivals_never_overlap() {
    let mut sched = millisecond_scheduler();

    // (arrival_ms, fragment_ms): bursts, silences, late stragglers
    let pattern = [
        (0u64, 50usize),
        (5, 120),
        (10, 30),
        (400, 60), // silence gap: clock has passed the cursor
        (405, 60),
        (401, 10), // straggler arriving "late" relative to the last one
        (900, 200),
    ];

    let mut starts = Vec::new();
    let mut previous_end = Duration::ZERO;

    for (arrival_ms, len) in pattern {
        let now = Duration::from_millis(arrival_ms);
        let frag = sched.schedule(vec![0; len], now);

        assert_eq!(frag.start, previous_end.max(now));
        assert!(frag.start >= previous_end, "overlap");

        starts.push(frag.start);
        previous_end = frag.end();
    }

    let mut sorted = starts.clone();
    sorted.sort();
    assert_eq!(starts, sorted, "start times are non-decreasing");
}

#[test]
fn test_cursor_tracks_scheduled_audio() {
    let mut sched = millisecond_scheduler();
    assert!(sched.idle(Duration::ZERO));

    sched.schedule(vec![0; 250], Duration::from_millis(100));

    assert_eq!(sched.cursor(), Duration::from_millis(350));
    assert!(!sched.idle(Duration::from_millis(349)));
    assert!(sched.idle(Duration::from_millis(350)));
    assert_eq!(sched.scheduled_count(), 1);
}

#[test]
fn test_replay_serializes_with_live_fragments() {
    let mut sched = millisecond_scheduler();

    // Live fragment queued until 300ms
    sched.schedule(vec![0; 300], Duration::ZERO);

    // A replayed recording (16 samples at 16Hz = 1s) may not overlap it
    let replay = sched.schedule_with_format(vec![0; 16], 16, 1, Duration::from_millis(50));
    assert_eq!(replay.start, Duration::from_millis(300));
    assert_eq!(replay.duration, Duration::from_secs(1));

    // A live fragment arriving during the replay waits for it
    let after = sched.schedule(vec![0; 10], Duration::from_millis(400));
    assert_eq!(after.start, Duration::from_millis(1300));
}
