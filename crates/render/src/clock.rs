use std::time::{Duration, Instant};

const STATS_WINDOW: Duration = Duration::from_secs(1);

/// Measures time between frames.
///
/// Deltas are clamped to `max_delta` so a stalled frame (window drag,
/// breakpoint) does not teleport the camera.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    max_delta: f32,
    frames: u64,
    window_start: Instant,
    window_frames: u32,
    fps: f32,
}

impl FrameClock {
    pub fn new(start: Instant, max_delta: f32) -> Self {
        Self {
            last: start,
            max_delta: max_delta.max(0.0),
            frames: 0,
            window_start: start,
            window_frames: 0,
            fps: 0.0,
        }
    }

    /// Advance to `now` and return the clamped delta in seconds.
    pub fn tick(&mut self, now: Instant) -> f32 {
        let dt = now.saturating_duration_since(self.last).as_secs_f32();
        self.last = now;
        self.frames += 1;

        self.window_frames += 1;
        let window = now.saturating_duration_since(self.window_start);
        if window >= STATS_WINDOW {
            self.fps = self.window_frames as f32 / window.as_secs_f32();
            self.window_frames = 0;
            self.window_start = now;
            tracing::debug!(fps = self.fps, frames = self.frames, "frame rate");
        }

        dt.min(self.max_delta)
    }

    pub fn max_delta(&self) -> f32 {
        self.max_delta
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Frames per second over the last completed one-second window.
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_elapsed_time() {
        let start = Instant::now();
        let mut clock = FrameClock::new(start, 0.1);
        let dt = clock.tick(start + Duration::from_millis(16));
        assert!((dt - 0.016).abs() < 1e-6);
        assert_eq!(clock.frame_count(), 1);
    }

    #[test]
    fn stalls_are_clamped() {
        let start = Instant::now();
        let mut clock = FrameClock::new(start, 0.1);
        assert_eq!(clock.tick(start + Duration::from_secs(3)), 0.1);
    }

    #[test]
    fn time_going_backwards_is_zero() {
        let start = Instant::now() + Duration::from_secs(1);
        let mut clock = FrameClock::new(start, 0.1);
        assert_eq!(clock.tick(start - Duration::from_millis(5)), 0.0);
    }

    #[test]
    fn fps_over_one_second_window() {
        let start = Instant::now();
        let mut clock = FrameClock::new(start, 0.1);
        for i in 1..=50 {
            clock.tick(start + Duration::from_millis(20 * i));
        }
        assert!((clock.fps() - 50.0).abs() < 0.5, "fps = {}", clock.fps());
    }
}
