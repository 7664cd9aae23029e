use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous frame tick, in seconds.
    pub dt: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

impl FrameTime {
    /// Seconds between `start` and this tick. Zero if `start` lies in the future.
    #[inline]
    pub fn seconds_since(&self, start: Instant) -> f32 {
        self.now.saturating_duration_since(start).as_secs_f32()
    }
}

/// Frame clock producing `FrameTime` snapshots.
///
/// Delta time is clamped to `dt_max` so a stalled frame (debugger, minimized
/// window) does not report a multi-second step.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
    frame_index: u64,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_max_dt(Duration::from_millis(250))
    }

    pub fn with_max_dt(dt_max: Duration) -> Self {
        Self {
            last: None,
            frame_index: 0,
            dt_max,
        }
    }

    /// Advances the clock using the current time.
    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Advances the clock to `now`. The first tick reports `dt == 0`.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = self
            .last
            .map(|last| now.saturating_duration_since(last).min(self.dt_max))
            .unwrap_or(Duration::ZERO);

        self.last = Some(now);

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }

    /// Number of ticks so far.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frame_index
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_has_zero_dt() {
        let mut clock = FrameClock::new();
        let ft = clock.tick_at(Instant::now());
        assert_eq!(ft.dt, 0.0);
        assert_eq!(ft.frame_index, 0);
    }

    #[test]
    fn dt_is_clamped_after_stall() {
        let mut clock = FrameClock::with_max_dt(Duration::from_millis(100));
        let t0 = Instant::now();
        clock.tick_at(t0);
        let ft = clock.tick_at(t0 + Duration::from_secs(5));
        assert!((ft.dt - 0.1).abs() < 1e-6);
        assert_eq!(ft.frame_index, 1);
        assert_eq!(clock.frames(), 2);
    }

    #[test]
    fn seconds_since_saturates() {
        let t0 = Instant::now();
        let mut clock = FrameClock::new();
        let ft = clock.tick_at(t0);
        assert_eq!(ft.seconds_since(t0 + Duration::from_secs(1)), 0.0);
        let later = clock.tick_at(t0 + Duration::from_millis(1500));
        assert!((later.seconds_since(t0) - 1.5).abs() < 1e-6);
    }
}
