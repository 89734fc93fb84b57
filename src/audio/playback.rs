// Gap-free playback scheduling for streamed audio fragments
//
// Fragments arrive faster than real time and with jitter. A single cursor
// tracks the earliest instant the next fragment may start: each fragment is
// scheduled at max(cursor, now) and the cursor advances by the fragment's
// duration. Start times are therefore non-decreasing and fragments never
// overlap.

use std::time::Duration;

/// Configuration for the playback scheduler
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Sample rate of inbound audio fragments (Hz)
    pub sample_rate: u32,
    /// Channel count of inbound audio fragments
    pub channels: u16,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24000, // voice output rate of the live endpoint
            channels: 1,
        }
    }
}

/// One fragment with its scheduled position on the output timeline
#[derive(Debug, Clone)]
pub struct ScheduledFragment {
    /// When playback of this fragment starts, relative to the output clock
    pub start: Duration,
    /// How long the fragment plays
    pub duration: Duration,
    /// Decoded samples to hand to the output sink
    pub samples: Vec<i16>,
}

impl ScheduledFragment {
    pub fn end(&self) -> Duration {
        self.start + self.duration
    }
}

/// Sequential scheduler over one output clock
pub struct PlaybackScheduler {
    config: PlaybackConfig,
    /// Earliest time at which the next fragment may start
    cursor: Duration,
    scheduled_count: usize,
}

impl PlaybackScheduler {
    pub fn new(config: PlaybackConfig) -> Self {
        Self {
            config,
            cursor: Duration::ZERO,
            scheduled_count: 0,
        }
    }

    /// Place the next fragment on the timeline
    ///
    /// `now` is the current output clock reading. The returned fragment
    /// starts at `max(cursor, now)`; the cursor advances past its end.
    pub fn schedule(&mut self, samples: Vec<i16>, now: Duration) -> ScheduledFragment {
        let sample_rate = self.config.sample_rate;
        let channels = self.config.channels;
        self.schedule_with_format(samples, sample_rate, channels, now)
    }

    /// Place a fragment whose format differs from the configured stream
    /// (replayed recordings, synthesized speech)
    pub fn schedule_with_format(
        &mut self,
        samples: Vec<i16>,
        sample_rate: u32,
        channels: u16,
        now: Duration,
    ) -> ScheduledFragment {
        let duration = fragment_duration(samples.len(), sample_rate, channels);
        let start = self.cursor.max(now);

        self.cursor = start + duration;
        self.scheduled_count += 1;

        ScheduledFragment {
            start,
            duration,
            samples,
        }
    }

    /// Current cursor position (end of the last scheduled fragment)
    pub fn cursor(&self) -> Duration {
        self.cursor
    }

    /// Whether all scheduled audio has finished playing by `now`
    pub fn idle(&self, now: Duration) -> bool {
        now >= self.cursor
    }

    pub fn scheduled_count(&self) -> usize {
        self.scheduled_count
    }
}

fn fragment_duration(sample_count: usize, sample_rate: u32, channels: u16) -> Duration {
    if sample_rate == 0 || channels == 0 {
        return Duration::ZERO;
    }
    let secs = sample_count as f64 / (sample_rate as f64 * channels as f64);
    Duration::from_secs_f64(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> PlaybackScheduler {
        PlaybackScheduler::new(PlaybackConfig {
            sample_rate: 1000, // 1 sample = 1ms, keeps the arithmetic readable
            channels: 1,
        })
    }

    #[test]
    fn test_back_to_back_when_faster_than_real_time() {
        let mut sched = scheduler();

        // Three 100ms fragments all arriving at t=0
        let a = sched.schedule(vec![0; 100], Duration::ZERO);
        let b = sched.schedule(vec![0; 100], Duration::ZERO);
        let c = sched.schedule(vec![0; 100], Duration::ZERO);

        assert_eq!(a.start, Duration::from_millis(0));
        assert_eq!(b.start, Duration::from_millis(100));
        assert_eq!(c.start, Duration::from_millis(200));
        assert_eq!(sched.cursor(), Duration::from_millis(300));
    }

    #[test]
    fn test_late_fragment_starts_at_clock_time() {
        let mut sched = scheduler();

        let a = sched.schedule(vec![0; 100], Duration::ZERO);
        assert_eq!(a.end(), Duration::from_millis(100));

        // Next fragment arrives after a 150ms silence gap
        let b = sched.schedule(vec![0; 50], Duration::from_millis(250));
        assert_eq!(b.start, Duration::from_millis(250));
        assert_eq!(sched.cursor(), Duration::from_millis(300));
    }

    #[test]
    fn test_no_overlap_under_jitter() {
        let mut sched = scheduler();
        let arrivals_ms = [0u64, 10, 15, 300, 310, 290, 600];

        let mut previous: Option<ScheduledFragment> = None;
        for (i, arrival) in arrivals_ms.iter().enumerate() {
            let now = Duration::from_millis(*arrival);
            let frag = sched.schedule(vec![0; 40 + i], now);

            let prev_end = previous.as_ref().map(|p| p.end()).unwrap_or(Duration::ZERO);
            assert_eq!(frag.start, prev_end.max(now));

            if let Some(prev) = &previous {
                assert!(frag.start >= prev.end(), "fragments must not overlap");
                assert!(frag.start >= prev.start, "start times must be non-decreasing");
            }

            previous = Some(frag);
        }
    }

    #[test]
    fn test_start_is_max_of_cursor_and_now() {
        let mut sched = scheduler();

        sched.schedule(vec![0; 200], Duration::ZERO); // cursor at 200ms

        // Arrives at 50ms: cursor wins
        let early = sched.schedule(vec![0; 10], Duration::from_millis(50));
        assert_eq!(early.start, Duration::from_millis(200));

        // Arrives at 500ms: clock wins
        let late = sched.schedule(vec![0; 10], Duration::from_millis(500));
        assert_eq!(late.start, Duration::from_millis(500));
    }

    #[test]
    fn test_idle() {
        let mut sched = scheduler();
        assert!(sched.idle(Duration::ZERO));

        sched.schedule(vec![0; 100], Duration::ZERO);
        assert!(!sched.idle(Duration::from_millis(99)));
        assert!(sched.idle(Duration::from_millis(100)));
    }

    #[test]
    fn test_replay_payload_uses_its_own_rate() {
        let mut sched = scheduler();

        // 500 samples at 500Hz = 1s, regardless of the stream's 1kHz config
        let frag =
            sched.schedule_with_format(vec![0; 500], 500, 1, Duration::ZERO);
        assert_eq!(frag.duration, Duration::from_secs(1));
        assert_eq!(sched.cursor(), Duration::from_secs(1));
    }

    #[test]
    fn test_empty_fragment_has_zero_duration() {
        let mut sched = scheduler();
        let frag = sched.schedule(Vec::new(), Duration::from_millis(5));
        assert_eq!(frag.duration, Duration::ZERO);
        assert_eq!(sched.cursor(), Duration::from_millis(5));
    }
}
