use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds elapsed since the clock started.
    pub elapsed: f32,

    /// Seconds since the previous tick (zero on the first tick).
    pub dt: f32,

    /// Timestamp the tick was taken at.
    pub now: Instant,

    /// Monotonic frame counter, starting at 0.
    pub frame_index: u64,
}

/// Elapsed-time accumulator for one scene instance.
///
/// Unlike a game-loop clock there is no delta clamping: animation speed is
/// bound to wall-clock time, so a stalled frame simply jumps ahead. Elapsed
/// time never decreases, even if a host hands out an earlier timestamp.
#[derive(Debug, Clone)]
pub struct AnimationClock {
    start: Instant,
    last_elapsed: Duration,
    frame_index: u64,
}

impl AnimationClock {
    /// Starts a clock at `start`, normally the mount instant.
    pub fn start_at(start: Instant) -> Self {
        Self {
            start,
            last_elapsed: Duration::ZERO,
            frame_index: 0,
        }
    }

    /// Advances the clock to `now`.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let elapsed = now
            .saturating_duration_since(self.start)
            .max(self.last_elapsed);
        let dt = elapsed - self.last_elapsed;
        self.last_elapsed = elapsed;

        let ft = FrameTime {
            elapsed: elapsed.as_secs_f32(),
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);

        ft
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_has_zero_delta() {
        let t0 = Instant::now();
        let mut clock = AnimationClock::start_at(t0);
        let ft = clock.tick_at(t0);
        assert_eq!(ft.elapsed, 0.0);
        assert_eq!(ft.dt, 0.0);
        assert_eq!(ft.frame_index, 0);
    }

    #[test]
    fn elapsed_follows_wall_clock_not_frame_count() {
        let t0 = Instant::now();
        let mut clock = AnimationClock::start_at(t0);

        // One long frame and many short ones reach the same elapsed time.
        let long = clock.tick_at(t0 + Duration::from_millis(500));
        assert!((long.elapsed - 0.5).abs() < 1e-6);

        let mut fast = AnimationClock::start_at(t0);
        let mut last = None;
        for i in 1..=30 {
            last = Some(fast.tick_at(t0 + Duration::from_micros(16_667 * i)));
        }
        let last = last.unwrap();
        assert!((last.elapsed - 0.5).abs() < 1e-3);
        assert_eq!(last.frame_index, 29);
    }

    #[test]
    fn no_delta_clamping_after_stall() {
        let t0 = Instant::now();
        let mut clock = AnimationClock::start_at(t0);
        clock.tick_at(t0);
        let ft = clock.tick_at(t0 + Duration::from_secs(3));
        assert!((ft.dt - 3.0).abs() < 1e-6);
    }

    #[test]
    fn elapsed_never_goes_backwards() {
        let t0 = Instant::now();
        let mut clock = AnimationClock::start_at(t0);
        clock.tick_at(t0 + Duration::from_secs(2));
        let ft = clock.tick_at(t0 + Duration::from_secs(1));
        assert!((ft.elapsed - 2.0).abs() < 1e-6);
        assert_eq!(ft.dt, 0.0);
        assert_eq!(ft.frame_index, 1);
    }
}
