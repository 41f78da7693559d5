//=========================================================================
// Frame Pacing
//=========================================================================
//
// Software frame-rate limiter used when vsync is not actually active.
//
// Per iteration:
// ```text
//   sleep     = target - used - oversleep
//   slept > 0 → oversleep = slept - sleep      (OS sleep granularity)
//   otherwise → oversleep = -sleep             (iteration ran long)
//   oversleep clamped to ±target
// ```
//
// Carrying the error into the next iteration makes the long-run average
// converge on the target rate even with coarse sleep granularity.
//
// Time comes from a `Clock` so pacing can be driven deterministically.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::trace;

//=== Clock ===============================================================

/// Time source for the render loop.
pub trait Clock: Send {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time and real thread sleeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Simulated clock: time only moves on `sleep` or `advance`.
///
/// Sleeps are rounded up to `granularity`, mimicking a coarse OS timer.
/// Clones share the same timeline.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    elapsed_nanos: Arc<AtomicU64>,
    granularity: Duration,
}

impl ManualClock {
    pub fn new(granularity: Duration) -> Self {
        Self {
            origin: Instant::now(),
            elapsed_nanos: Arc::new(AtomicU64::new(0)),
            granularity,
        }
    }

    /// Moves simulated time forward, e.g. to model work done.
    pub fn advance(&self, duration: Duration) {
        self.elapsed_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::AcqRel);
    }

    /// Simulated time since construction.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::Acquire))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Duration::from_millis(1))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        let step = self.granularity.as_nanos().max(1);
        let wanted = duration.as_nanos();
        let rounded = wanted.div_ceil(step) * step;
        self.advance(Duration::from_nanos(rounded as u64));
    }
}

//=== FramePacer ==========================================================

/// Oversleep-correcting frame limiter.
#[derive(Debug, Clone)]
pub struct FramePacer {
    max_fps: u32,
    vsync_active: bool,
    hidden_sleep: Duration,
    /// Signed carry-over error in nanoseconds.
    oversleep: i64,
}

impl FramePacer {
    pub fn new(max_fps: u32, vsync_active: bool, hidden_sleep: Duration) -> Self {
        Self {
            max_fps,
            vsync_active,
            hidden_sleep,
            oversleep: 0,
        }
    }

    pub fn set_max_fps(&mut self, max_fps: u32) {
        if self.max_fps != max_fps {
            self.max_fps = max_fps;
            self.oversleep = 0;
        }
    }

    /// Whether the surface really synchronizes presents to the display.
    pub fn set_vsync_active(&mut self, active: bool) {
        self.vsync_active = active;
    }

    pub fn max_fps(&self) -> u32 {
        self.max_fps
    }

    /// Software limiting applies only without real vsync and with a cap.
    pub fn is_active(&self) -> bool {
        !self.vsync_active && self.max_fps > 0
    }

    /// Target frame interval, if limiting is active.
    pub fn interval(&self) -> Option<Duration> {
        self.is_active()
            .then(|| Duration::from_nanos(self.interval_nanos() as u64))
    }

    pub fn oversleep(&self) -> Duration {
        Duration::from_nanos(self.oversleep.unsigned_abs())
    }

    fn interval_nanos(&self) -> i64 {
        1_000_000_000 / i64::from(self.max_fps.max(1))
    }

    /// Sleeps out the remainder of the iteration that began at
    /// `iteration_start`. Returns the time actually slept.
    pub fn pace(&mut self, clock: &dyn Clock, iteration_start: Instant, hidden: bool) -> Duration {
        if hidden {
            self.oversleep = 0;
            clock.sleep(self.hidden_sleep);
            return self.hidden_sleep;
        }

        if !self.is_active() {
            self.oversleep = 0;
            return Duration::ZERO;
        }

        let target = self.interval_nanos();
        let used = clock.now().saturating_duration_since(iteration_start).as_nanos() as i64;
        let sleep = target - used - self.oversleep;

        let slept = if sleep > 0 {
            let before = clock.now();
            clock.sleep(Duration::from_nanos(sleep as u64));
            let slept = clock.now().saturating_duration_since(before).as_nanos() as i64;
            self.oversleep = slept - sleep;
            slept
        } else {
            self.oversleep = -sleep;
            0
        };

        self.oversleep = self.oversleep.clamp(-target, target);

        trace!(
            target: "render::pacing",
            "used {}us, slept {}us, carry {}us",
            used / 1_000,
            slept / 1_000,
            self.oversleep / 1_000
        );

        Duration::from_nanos(slept as u64)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const HIDDEN: Duration = Duration::from_millis(100);

    fn run(pacer: &mut FramePacer, clock: &ManualClock, iterations: usize, work: impl Fn(usize) -> Duration) {
        for i in 0..iterations {
            let start = clock.now();
            clock.advance(work(i));
            pacer.pace(clock, start, false);
        }
    }

    //=====================================================================
    // Convergence
    //=====================================================================

    #[test]
    fn sixty_fps_converges_with_coarse_sleep() {
        let clock = ManualClock::new(Duration::from_millis(1));
        let mut pacer = FramePacer::new(60, false, HIDDEN);

        run(&mut pacer, &clock, 600, |_| Duration::from_millis(5));

        let total = clock.elapsed().as_secs_f64();
        assert!((total - 10.0).abs() < 0.002, "600 frames took {}s", total);
    }

    #[test]
    fn sixty_fps_converges_with_zero_cost_iterations() {
        let clock = ManualClock::new(Duration::from_millis(1));
        let mut pacer = FramePacer::new(60, false, HIDDEN);

        run(&mut pacer, &clock, 600, |_| Duration::ZERO);

        let total = clock.elapsed().as_secs_f64();
        assert!((total - 10.0).abs() < 0.002, "600 frames took {}s", total);
    }

    #[test]
    fn recovers_from_occasional_long_frames() {
        let clock = ManualClock::new(Duration::from_millis(1));
        let mut pacer = FramePacer::new(60, false, HIDDEN);

        run(&mut pacer, &clock, 600, |i| {
            if i % 100 == 50 {
                Duration::from_millis(30)
            } else {
                Duration::from_millis(3)
            }
        });

        let total = clock.elapsed().as_secs_f64();
        assert!((total - 10.0).abs() < 0.002, "600 frames took {}s", total);
    }

    #[test]
    fn oversleep_is_clamped_to_one_interval() {
        let clock = ManualClock::new(Duration::from_millis(1));
        let mut pacer = FramePacer::new(60, false, HIDDEN);

        let start = clock.now();
        clock.advance(Duration::from_millis(500));
        pacer.pace(&clock, start, false);

        assert_eq!(pacer.oversleep(), pacer.interval().unwrap());
    }

    //=====================================================================
    // Modes
    //=====================================================================

    #[test]
    fn inactive_with_vsync_or_uncapped() {
        let clock = ManualClock::default();

        let mut vsynced = FramePacer::new(60, true, HIDDEN);
        assert!(!vsynced.is_active());
        assert_eq!(vsynced.pace(&clock, clock.now(), false), Duration::ZERO);

        let mut uncapped = FramePacer::new(0, false, HIDDEN);
        assert!(uncapped.interval().is_none());
        assert_eq!(uncapped.pace(&clock, clock.now(), false), Duration::ZERO);
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn hidden_window_uses_fixed_sleep() {
        let clock = ManualClock::default();
        let mut pacer = FramePacer::new(0, true, HIDDEN);

        let slept = pacer.pace(&clock, clock.now(), true);

        assert_eq!(slept, HIDDEN);
        assert_eq!(clock.elapsed(), HIDDEN);
    }

    #[test]
    fn changing_rate_resets_carry() {
        let clock = ManualClock::new(Duration::from_millis(4));
        let mut pacer = FramePacer::new(60, false, HIDDEN);
        run(&mut pacer, &clock, 3, |_| Duration::from_millis(1));

        pacer.set_max_fps(30);
        assert_eq!(pacer.oversleep(), Duration::ZERO);
        assert_eq!(pacer.interval(), Some(Duration::from_nanos(33_333_333)));
    }

    #[test]
    fn manual_clock_rounds_sleeps_up() {
        let clock = ManualClock::new(Duration::from_millis(1));
        clock.sleep(Duration::from_micros(1_200));
        assert_eq!(clock.elapsed(), Duration::from_millis(2));
    }
}
