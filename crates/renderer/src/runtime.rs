use std::time::{Duration, Instant};

/// Abstraction over where frame timestamps originate from.
pub trait TimeSource: Send {
    /// Resets the source to its initial state.
    fn reset(&mut self);
    /// Milliseconds elapsed since the source started.
    fn elapsed_ms(&mut self) -> f64;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
    }

    fn elapsed_ms(&mut self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Smallest step the clock advances by when the source has not moved.
const MIN_STEP_MS: f64 = 1e-3;

/// Milliseconds since loop start, strictly increasing across samples.
pub struct FrameClock {
    source: BoxedTimeSource,
    last: Option<f64>,
}

impl FrameClock {
    pub fn new(source: BoxedTimeSource) -> Self {
        Self { source, last: None }
    }

    pub fn system() -> Self {
        Self::new(Box::new(SystemTimeSource::new()))
    }

    /// Timestamp for the next frame. The first sample after a reset is
    /// whatever the source reports; later samples never repeat or go back.
    pub fn sample(&mut self) -> f64 {
        let raw = self.source.elapsed_ms().max(0.0);
        let value = match self.last {
            Some(last) if raw <= last => last + MIN_STEP_MS,
            _ => raw,
        };
        self.last = Some(value);
        value
    }

    pub fn reset(&mut self) {
        self.source.reset();
        self.last = None;
    }
}

/// Decides when the host should issue the next redraw.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    interval: Option<Duration>,
    last_render: Option<Instant>,
}

impl FrameScheduler {
    /// `target_fps` of `None` or a non-positive value means uncapped.
    pub fn new(target_fps: Option<f32>) -> Self {
        let interval = target_fps
            .filter(|fps| *fps > 0.0 && fps.is_finite())
            .map(|fps| Duration::from_secs_f64(1.0 / fps as f64));
        Self {
            interval,
            last_render: None,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn ready_for_frame(&self, now: Instant) -> bool {
        match (self.interval, self.last_render) {
            (Some(interval), Some(last)) => now.saturating_duration_since(last) >= interval,
            _ => true,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.interval, self.last_render) {
            (Some(interval), Some(last)) => Some(last + interval),
            _ => None,
        }
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.last_render = Some(now);
    }

    pub fn reset(&mut self) {
        self.last_render = None;
    }
}
