//! Progress reporting for long-running stages.
//!
//! Sampling decodes every frame of the video and packaging compresses every
//! selected image, so both stages report incremental progress through a
//! [`ProgressCallback`]. Callbacks observe the work; they cannot halt it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use frameset::{ProgressCallback, ProgressInfo, SamplerOptions};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("[{:?}] {:.1}% complete", info.operation, info.ratio * 100.0);
//!     }
//! }
//!
//! let options = SamplerOptions::new().with_progress(Arc::new(PrintProgress));
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

/// The kind of work currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Decoding and filtering video frames.
    FrameSampling,
    /// Writing the selected frames into the zip archive.
    Packaging,
}

/// A snapshot of stage progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// How many items (decoded frames / archive entries) are done.
    pub current: u64,
    /// Total items expected, if the container reported it.
    pub total: Option<u64>,
    /// `current / total`, clamped to `0.0..=1.0`. An unknown or zero total
    /// counts as 1.
    pub ratio: f32,
    /// Wall-clock time elapsed since the stage started.
    pub elapsed: Duration,
    /// Decode position of the frame just processed (sampling only).
    pub current_frame: Option<u64>,
}

/// Trait for receiving progress updates.
///
/// Implementations must be [`Send`] and [`Sync`] so a single terminal
/// progress bar can be shared between stages.
pub trait ProgressCallback: Send + Sync {
    /// Called at regular intervals during a stage.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. Default when nothing is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Compute the processed/total ratio.
///
/// A missing or zero total is treated as 1 so the ratio is always defined,
/// and the result is clamped to `1.0` because frame counts reported by
/// containers are estimates.
pub fn progress_ratio(current: u64, total: Option<u64>) -> f32 {
    let total = total.filter(|&t| t > 0).unwrap_or(1);
    (current as f64 / total as f64).min(1.0) as f32
}

/// Tracks progress timing and emits callbacks every `batch_size` items.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    items_since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            items_since_last_report: 0,
        }
    }

    /// Record one completed item and fire the callback if the batch
    /// threshold is reached.
    pub(crate) fn advance(&mut self, frame_number: Option<u64>) {
        self.current += 1;
        self.items_since_last_report += 1;

        if self.items_since_last_report >= self.batch_size {
            self.report(frame_number);
            self.items_since_last_report = 0;
        }
    }

    /// Emit a final report if the last batch was not already reported.
    pub(crate) fn finish(&mut self) {
        if self.items_since_last_report > 0 || self.current == 0 {
            self.report(None);
            self.items_since_last_report = 0;
        }
    }

    fn report(&self, frame_number: Option<u64>) {
        let info = ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            ratio: progress_ratio(self.current, self.total),
            elapsed: self.start_time.elapsed(),
            current_frame: frame_number,
        };

        self.callback.on_progress(&info);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Recorder(Mutex<Vec<ProgressInfo>>);

    impl ProgressCallback for Recorder {
        fn on_progress(&self, info: &ProgressInfo) {
            self.0.lock().unwrap().push(info.clone());
        }
    }

    #[test]
    fn ratio_handles_unknown_and_zero_totals() {
        assert_eq!(progress_ratio(0, None), 0.0);
        assert_eq!(progress_ratio(5, Some(0)), 1.0);
        assert_eq!(progress_ratio(1, Some(4)), 0.25);
        assert_eq!(progress_ratio(9, Some(4)), 1.0);
    }

    #[test]
    fn tracker_reports_per_batch_and_on_finish() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let mut tracker =
            ProgressTracker::new(recorder.clone(), OperationType::FrameSampling, Some(5), 2);
        for frame in 0..5 {
            tracker.advance(Some(frame));
        }
        tracker.finish();

        let infos = recorder.0.lock().unwrap();
        let currents: Vec<u64> = infos.iter().map(|info| info.current).collect();
        assert_eq!(currents, vec![2, 4, 5]);
        assert_eq!(infos.last().unwrap().ratio, 1.0);
    }

    #[test]
    fn finish_does_not_duplicate_last_batch() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let mut tracker =
            ProgressTracker::new(recorder.clone(), OperationType::Packaging, Some(2), 1);
        tracker.advance(None);
        tracker.advance(None);
        tracker.finish();
        assert_eq!(recorder.0.lock().unwrap().len(), 2);
    }
}
