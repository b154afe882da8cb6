//! Frame and physics-step rates, averaged over a fixed reporting interval.

use std::sync::{Arc, Once, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::warn;

static POISON_WARNING: Once = Once::new();

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub physics_steps_per_second: f32,
    /// Mean wall-clock frame time over the interval.
    pub frame_time_ms: f32,
    pub worst_frame_ms: f32,
    /// Physics time actually simulated; falls behind wall time when steps
    /// are clamped.
    pub simulated_seconds: f32,
}

/// Shared read side of the loop metrics; clones observe the same snapshot.
///
/// A panic while the lock is held does not take the metrics down with it:
/// the last value stays readable and publishing keeps working.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    latest: Arc<RwLock<LoopMetricsSnapshot>>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        let guard = self.latest.read().unwrap_or_else(|poisoned| {
            note_poisoned("read");
            PoisonError::into_inner(poisoned)
        });
        *guard
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        let mut guard = self.latest.write().unwrap_or_else(|poisoned| {
            note_poisoned("write");
            PoisonError::into_inner(poisoned)
        });
        *guard = snapshot;
    }
}

fn note_poisoned(operation: &'static str) {
    POISON_WARNING.call_once(|| warn!(operation, "metrics_lock_poisoned"));
}

#[derive(Debug, Default)]
struct IntervalCounts {
    frames: u32,
    frame_time: Duration,
    worst_frame: Duration,
    physics_steps: u32,
    simulated_seconds: f32,
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    started_at: Instant,
    interval: Duration,
    counts: IntervalCounts,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            started_at: Instant::now(),
            interval,
            counts: IntervalCounts::default(),
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        let counts = &mut self.counts;
        counts.frames = counts.frames.saturating_add(1);
        counts.frame_time = counts.frame_time.saturating_add(frame_dt);
        counts.worst_frame = counts.worst_frame.max(frame_dt);
    }

    /// Frames whose physics step was skipped report zero and are not counted.
    pub(crate) fn record_physics_step(&mut self, stepped_seconds: f32) {
        if stepped_seconds > 0.0 {
            self.counts.physics_steps = self.counts.physics_steps.saturating_add(1);
            self.counts.simulated_seconds += stepped_seconds;
        }
    }

    /// Closes the interval once it has run its full length and starts the
    /// next one at `now`.
    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.started_at);
        if elapsed < self.interval {
            return None;
        }
        self.started_at = now;
        let counts = std::mem::take(&mut self.counts);

        let per_second = |count: u32| count as f32 / elapsed.as_secs_f32().max(f32::EPSILON);
        let mean_frame_ms = match counts.frames {
            0 => 0.0,
            frames => counts.frame_time.as_secs_f32() * 1000.0 / frames as f32,
        };
        Some(LoopMetricsSnapshot {
            fps: per_second(counts.frames),
            physics_steps_per_second: per_second(counts.physics_steps),
            frame_time_ms: mean_frame_ms,
            worst_frame_ms: counts.worst_frame.as_secs_f32() * 1000.0,
            simulated_seconds: counts.simulated_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn interval_reports_rates_mean_and_worst_frame() {
        let start = Instant::now();
        let mut metrics = MetricsAccumulator::new(Duration::from_secs(1));
        metrics.started_at = start;

        for (frame_ms, step) in [(20, 0.02), (10, 0.01), (30, 0.0)] {
            metrics.record_frame(Duration::from_millis(frame_ms));
            metrics.record_physics_step(step);
        }

        let report = metrics
            .maybe_snapshot(start + Duration::from_secs(2))
            .expect("interval elapsed");
        assert!((report.fps - 1.5).abs() < 1.0e-4);
        assert!((report.physics_steps_per_second - 1.0).abs() < 1.0e-4);
        assert!((report.frame_time_ms - 20.0).abs() < 1.0e-3);
        assert!((report.worst_frame_ms - 30.0).abs() < 1.0e-3);
        assert!((report.simulated_seconds - 0.03).abs() < 1.0e-5);
    }

    #[test]
    fn counts_restart_after_each_report() {
        let start = Instant::now();
        let mut metrics = MetricsAccumulator::new(Duration::from_millis(500));
        metrics.started_at = start;
        metrics.record_frame(Duration::from_millis(16));
        metrics.record_physics_step(0.016);

        assert!(metrics
            .maybe_snapshot(start + Duration::from_millis(499))
            .is_none());
        assert!(metrics
            .maybe_snapshot(start + Duration::from_millis(500))
            .is_some());

        let idle = metrics
            .maybe_snapshot(start + Duration::from_millis(1000))
            .expect("second interval");
        assert_eq!(idle, LoopMetricsSnapshot::default());
    }

    #[test]
    fn handle_keeps_working_after_a_panicking_writer() {
        let handle = MetricsHandle::default();
        let shared = handle.clone();
        let _ = thread::spawn(move || {
            let _guard = shared.latest.write().expect("write guard");
            panic!("writer panicked");
        })
        .join();
        assert!(handle.latest.is_poisoned());
        assert_eq!(handle.snapshot(), LoopMetricsSnapshot::default());

        let published = LoopMetricsSnapshot {
            fps: 60.0,
            physics_steps_per_second: 60.0,
            frame_time_ms: 16.6,
            worst_frame_ms: 21.0,
            simulated_seconds: 1.0,
        };
        handle.publish(published);
        assert_eq!(handle.clone().snapshot(), published);
    }
}
