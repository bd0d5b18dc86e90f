//! Windowed throughput statistics for grab loops.
//!
//! Feed the payload size of every successful `read` to
//! [`ThroughputMonitor::record_sample`]. Each time `cycle_count`
//! samples have accumulated, the monitor closes the window, computes
//! frames per second and the mean sample size, and starts over.
//!
//! The monitor is independent of any session; it only needs a
//! monotonic clock, which tests replace via
//! [`record_sample_at`](ThroughputMonitor::record_sample_at).

use std::time::Instant;

use tracing::debug;

use crate::error::{CameraError, Result};

/// Value reported before the first window closes, and for `fps` when a
/// window closed in under a millisecond.
pub const UNMEASURED: f64 = -1.0;

/// Statistics of the last closed window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputReport {
    /// Samples per second, or [`UNMEASURED`].
    pub fps: f64,
    /// Mean bytes per sample.
    pub mean_size: f64,
}

/// Fixed-count window over sample sizes.
#[derive(Debug, Clone)]
pub struct ThroughputMonitor {
    cycle_count: u32,
    count: u32,
    total_bytes: f64,
    window_start: Option<Instant>,
    fps: f64,
    mean_size: f64,
}

impl ThroughputMonitor {
    /// Create a monitor reporting every `cycle_count` samples.
    pub fn new(cycle_count: u32) -> Result<Self> {
        if cycle_count == 0 {
            return Err(CameraError::InvalidConfig(
                "cycle_count must be a positive value".into(),
            ));
        }
        Ok(Self {
            cycle_count,
            count: 0,
            total_bytes: 0.0,
            window_start: None,
            fps: UNMEASURED,
            mean_size: UNMEASURED,
        })
    }

    /// Record one sample taken now. Returns `true` when a window closed
    /// and fresh statistics are available.
    pub fn record_sample(&mut self, bytes: usize) -> bool {
        self.record_sample_at(Instant::now(), bytes)
    }

    /// Record with an explicit timestamp.
    pub fn record_sample_at(&mut self, when: Instant, bytes: usize) -> bool {
        self.count += 1;
        self.total_bytes += bytes as f64;
        if self.count == 1 {
            self.window_start = Some(when);
        }

        if self.count < self.cycle_count {
            return false;
        }

        let elapsed_ms = self
            .window_start
            .map_or(0, |start| when.saturating_duration_since(start).as_millis());

        self.mean_size = self.total_bytes / f64::from(self.count);
        self.fps = if elapsed_ms >= 1 {
            f64::from(self.count) * 1000.0 / elapsed_ms as f64
        } else {
            UNMEASURED
        };
        debug!(
            fps = self.fps,
            mean_size = self.mean_size,
            samples = self.count,
            elapsed_ms = elapsed_ms as u64,
            "throughput window closed"
        );

        self.count = 0;
        self.total_bytes = 0.0;
        self.window_start = None;
        true
    }

    /// Frames per second of the last window, or [`UNMEASURED`].
    pub fn current_fps(&self) -> f64 {
        self.fps
    }

    /// Mean sample size of the last window, or [`UNMEASURED`].
    pub fn current_mean_size(&self) -> f64 {
        self.mean_size
    }

    /// Snapshot of the last closed window, if any.
    pub fn report(&self) -> Option<ThroughputReport> {
        if self.mean_size == UNMEASURED {
            return None;
        }
        Some(ThroughputReport {
            fps: self.fps,
            mean_size: self.mean_size,
        })
    }

    pub fn cycle_count(&self) -> u32 {
        self.cycle_count
    }

    /// Samples recorded in the open window.
    pub fn pending(&self) -> u32 {
        self.count
    }

    /// Drop the open window and forget previous statistics.
    pub fn reset(&mut self) {
        self.count = 0;
        self.total_bytes = 0.0;
        self.window_start = None;
        self.fps = UNMEASURED;
        self.mean_size = UNMEASURED;
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn zero_cycle_count_rejected() {
        assert!(matches!(
            ThroughputMonitor::new(0),
            Err(CameraError::InvalidConfig(_))
        ));
    }

    #[test]
    fn sentinels_before_first_window() {
        let mut mon = ThroughputMonitor::new(3).unwrap();
        assert_eq!(mon.current_fps(), UNMEASURED);
        assert_eq!(mon.current_mean_size(), UNMEASURED);
        assert!(mon.report().is_none());

        assert!(!mon.record_sample(10));
        assert!(!mon.record_sample(10));
        assert_eq!(mon.pending(), 2);
        assert_eq!(mon.current_mean_size(), UNMEASURED);
    }

    #[test]
    fn mean_size_of_equal_samples() {
        let mut mon = ThroughputMonitor::new(120).unwrap();
        let mut reports = 0;
        for _ in 0..120 {
            if mon.record_sample(921_600) {
                reports += 1;
            }
        }
        assert_eq!(reports, 1);
        assert_eq!(mon.current_mean_size(), 921_600.0);
        assert_eq!(mon.pending(), 0);
    }

    #[test]
    fn fps_from_known_elapsed_time() {
        let mut mon = ThroughputMonitor::new(30).unwrap();
        let t0 = Instant::now();
        for i in 0..29 {
            assert!(!mon.record_sample_at(t0 + Duration::from_millis(i * 10), 100));
        }
        // 30 samples spanning 500 ms.
        assert!(mon.record_sample_at(t0 + Duration::from_millis(500), 100));
        assert_eq!(mon.current_fps(), 30.0 * 1000.0 / 500.0);
        assert_eq!(mon.current_mean_size(), 100.0);
    }

    #[test]
    fn sub_millisecond_window_reports_sentinel_fps() {
        let mut mon = ThroughputMonitor::new(2).unwrap();
        let t0 = Instant::now();
        assert!(!mon.record_sample_at(t0, 4));
        assert!(mon.record_sample_at(t0 + Duration::from_micros(300), 8));
        assert_eq!(mon.current_fps(), UNMEASURED);
        assert_eq!(mon.current_mean_size(), 6.0);
        assert_eq!(mon.pending(), 0);
    }

    #[test]
    fn windows_restart_after_report() {
        let mut mon = ThroughputMonitor::new(2).unwrap();
        let t0 = Instant::now();
        mon.record_sample_at(t0, 10);
        mon.record_sample_at(t0 + Duration::from_millis(100), 10);
        assert_eq!(mon.current_fps(), 20.0);

        // Second window starts at its own first sample.
        mon.record_sample_at(t0 + Duration::from_secs(10), 30);
        assert!(mon.record_sample_at(t0 + Duration::from_millis(10_200), 50));
        assert_eq!(mon.current_fps(), 10.0);
        assert_eq!(
            mon.report(),
            Some(ThroughputReport {
                fps: 10.0,
                mean_size: 40.0
            })
        );
    }

    #[test]
    fn reset_restores_sentinels() {
        let mut mon = ThroughputMonitor::new(1).unwrap();
        assert!(mon.record_sample(5));
        assert_eq!(mon.current_mean_size(), 5.0);

        mon.reset();
        assert_eq!(mon.current_fps(), UNMEASURED);
        assert_eq!(mon.current_mean_size(), UNMEASURED);
        assert_eq!(mon.pending(), 0);
    }
}
