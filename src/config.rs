//! Pipeline configuration.
//!
//! Each stage takes a small builder: [`SamplerOptions`] for frame sampling,
//! [`DownloadOptions`] for video acquisition and [`WorkspaceConfig`] for the
//! transient directories and the archive destination. Defaults reproduce
//! the behaviour users expect from a plain run, so a default-constructed
//! value is always a valid configuration.
//!
//! # Example
//!
//! ```no_run
//! use frameset::{DownloadOptions, SamplerOptions};
//!
//! let sampler = SamplerOptions::new()
//!     .with_interval(25)
//!     .with_jpeg_quality(90);
//! let download = DownloadOptions::new().with_max_height(1080);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::sync::Arc;

use crate::progress::{NoOpProgress, ProgressCallback};

/// Default number of decoded frames between two retained samples.
pub const DEFAULT_FRAME_INTERVAL: u64 = 50;
/// Default dataset (archive) name.
pub const DEFAULT_DATASET_NAME: &str = "frames_dataset";

/// Configuration for [`FrameSampler`](crate::FrameSampler).
///
/// Carries the sampling interval, the brightness heuristic thresholds, the
/// JPEG quality of written frames and the progress callback.
#[derive(Clone)]
pub struct SamplerOptions {
    pub(crate) interval: u64,
    /// Luma strictly below this value counts as near-black.
    pub(crate) dark_level: u8,
    /// Luma strictly above this value counts as near-white.
    pub(crate) bright_level: u8,
    /// Fraction of near-black or near-white pixels at which a frame is
    /// rejected.
    pub(crate) coverage: f32,
    pub(crate) jpeg_quality: u8,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    /// How often to fire the progress callback (every N decoded frames).
    pub(crate) batch_size: u64,
}

impl Debug for SamplerOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SamplerOptions")
            .field("interval", &self.interval)
            .field("dark_level", &self.dark_level)
            .field("bright_level", &self.bright_level)
            .field("coverage", &self.coverage)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplerOptions {
    /// Create options with the default interval (50), thresholds 30/225 at
    /// 95% coverage, JPEG quality 95 and no progress callback.
    pub fn new() -> Self {
        Self {
            interval: DEFAULT_FRAME_INTERVAL,
            dark_level: 30,
            bright_level: 225,
            coverage: 0.95,
            jpeg_quality: 95,
            progress: Arc::new(NoOpProgress),
            batch_size: 1,
        }
    }

    /// Keep every `interval`-th decoded frame, starting at frame 0.
    ///
    /// Zero is stored as given and rejected when sampling starts with
    /// [`FramesetError::InvalidInterval`](crate::FramesetError::InvalidInterval).
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval;
        self
    }

    /// Set the near-black and near-white luma levels.
    #[must_use]
    pub fn with_levels(mut self, dark: u8, bright: u8) -> Self {
        self.dark_level = dark;
        self.bright_level = bright;
        self
    }

    /// Set the rejection coverage fraction. Clamped to `0.0..=1.0`.
    #[must_use]
    pub fn with_coverage(mut self, coverage: f32) -> Self {
        self.coverage = coverage.clamp(0.0, 1.0);
        self
    }

    /// Set the JPEG quality of written frames. Clamped to `1..=100`.
    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Set how often the progress callback fires. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// The configured sampling interval.
    pub fn interval(&self) -> u64 {
        self.interval
    }
}

/// Configuration for [`VideoDownloader`](crate::VideoDownloader).
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct DownloadOptions {
    /// Maximum stream height in pixels.
    pub max_height: u32,
    /// Maximum stream frame rate.
    pub max_fps: u32,
    /// Required container extension of the video-only stream.
    pub container: String,
    /// Downloader executable. When it cannot be started the
    /// `python3 -m yt_dlp` and `python -m yt_dlp` launchers are tried.
    pub program: String,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadOptions {
    /// Best mp4 video-only stream up to 2160p at 60 fps, fetched with
    /// `yt-dlp`.
    pub fn new() -> Self {
        Self {
            max_height: 2160,
            max_fps: 60,
            container: "mp4".to_string(),
            program: "yt-dlp".to_string(),
        }
    }

    /// Cap the stream height.
    pub fn with_max_height(mut self, height: u32) -> Self {
        self.max_height = height;
        self
    }

    /// Cap the stream frame rate.
    pub fn with_max_fps(mut self, fps: u32) -> Self {
        self.max_fps = fps;
        self
    }

    /// Use a different downloader executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// The yt-dlp format selector built from the caps.
    pub fn format_selector(&self) -> String {
        format!(
            "bestvideo[ext={}][height<={}][fps<={}]",
            self.container, self.max_height, self.max_fps
        )
    }
}

/// Locations of the transient working directories and the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct WorkspaceConfig {
    /// Where downloaded videos land.
    pub videos_dir: PathBuf,
    /// Where sampled frames are written.
    pub frames_dir: PathBuf,
    /// Where `<dataset_name>.zip` is written.
    pub output_dir: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            videos_dir: PathBuf::from("videos"),
            frames_dir: PathBuf::from("extracted_frames"),
            output_dir: PathBuf::from("."),
        }
    }
}

impl WorkspaceConfig {
    /// Default layout relative to the current directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Put both working directories and the archive under `root`.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            videos_dir: root.join("videos"),
            frames_dir: root.join("extracted_frames"),
            output_dir: root,
        }
    }

    pub fn with_videos_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.videos_dir = dir.into();
        self
    }

    pub fn with_frames_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.frames_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampler_defaults() {
        let options = SamplerOptions::new();
        let debug = format!("{options:?}");
        assert!(debug.contains("interval: 50"));
        assert!(debug.contains("dark_level: 30"));
        assert!(debug.contains("bright_level: 225"));
        assert!(debug.contains("jpeg_quality: 95"));
    }

    #[test]
    fn sampler_builder_clamps() {
        let options = SamplerOptions::new()
            .with_batch_size(0)
            .with_jpeg_quality(0)
            .with_coverage(1.5);
        assert_eq!(options.batch_size, 1);
        assert_eq!(options.jpeg_quality, 1);
        assert_eq!(options.coverage, 1.0);
    }

    #[test]
    fn format_selector_uses_caps() {
        assert_eq!(
            DownloadOptions::new().format_selector(),
            "bestvideo[ext=mp4][height<=2160][fps<=60]"
        );
        assert_eq!(
            DownloadOptions::new()
                .with_max_height(720)
                .with_max_fps(30)
                .format_selector(),
            "bestvideo[ext=mp4][height<=720][fps<=30]"
        );
    }

    #[test]
    fn workspace_rooted_layout() {
        let config = WorkspaceConfig::rooted_at("/tmp/run");
        assert_eq!(config.videos_dir, PathBuf::from("/tmp/run/videos"));
        assert_eq!(config.frames_dir, PathBuf::from("/tmp/run/extracted_frames"));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/run"));
    }
}
