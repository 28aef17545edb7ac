//! # frameset
//!
//! Turn a video link into a curated zip of still frames.
//!
//! `frameset` downloads a video with `yt-dlp`, decodes it through FFmpeg via
//! the [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate, keeps
//! every Nth frame that is not almost entirely black or white, lets the
//! user pick frames in a checkbox gallery, and packages the picks into a
//! zip archive whose entries can carry a trigger-word suffix. Working files
//! are removed once the archive is written.
//!
//! ## Quick Start
//!
//! ### Sample a Local Video
//!
//! ```no_run
//! use frameset::{FrameSampler, SamplerOptions};
//!
//! let sampler = FrameSampler::new(SamplerOptions::new().with_interval(25));
//! let report = sampler.sample_file("input.mp4", "extracted_frames")?;
//! println!("kept {} of {} candidates", report.saved.len(), report.candidates);
//! # Ok::<(), frameset::FramesetError>(())
//! ```
//!
//! ### Package a Selection
//!
//! ```no_run
//! use frameset::{Gallery, package_frames};
//!
//! let gallery = Gallery::load("extracted_frames")?;
//! let report = package_frames(
//!     gallery.folder(),
//!     &gallery.selected(),
//!     Some("mytoken"),
//!     "frames_dataset.zip",
//! )?;
//! println!("wrote {}", report.archive.display());
//! # Ok::<(), frameset::FramesetError>(())
//! ```
//!
//! ### End to End
//!
//! ```no_run
//! use frameset::{
//!     DownloadOptions, LogReporter, RunRequest, Session, Workflow, Workspace, WorkspaceConfig,
//! };
//!
//! let workflow = Workflow::new(Workspace::new(WorkspaceConfig::new()), DownloadOptions::new());
//! let mut session = Session::new();
//! let request = RunRequest::new("https://www.youtube.com/watch?v=example")
//!     .with_trigger_word(Some("mytoken".to_string()));
//! let outcome = workflow.run(&mut session, request, |gallery| Ok(gallery.selected()), &LogReporter)?;
//! println!("{} frames packaged", outcome.package.entries.len());
//! # Ok::<(), frameset::FramesetError>(())
//! ```
//!
//! ## Logging
//!
//! Diagnostics go through the [`log`](https://crates.io/crates/log) facade;
//! install any logger (the `frameset` binary uses `env_logger`). FFmpeg's
//! own stderr output is tuned separately with [`set_ffmpeg_log_level`].

pub mod config;
pub mod download;
pub mod error;
pub mod ffmpeg;
pub mod filter;
pub mod frames;
pub mod gallery;
pub mod media;
pub mod metadata;
pub mod package;
pub mod progress;
pub mod sampler;
pub mod session;
pub mod workflow;
pub mod workspace;

mod utilities;

pub use config::{
    DEFAULT_DATASET_NAME, DEFAULT_FRAME_INTERVAL, DownloadOptions, SamplerOptions,
    WorkspaceConfig,
};
pub use download::{DownloadedVideo, VideoDownloader};
pub use error::FramesetError;
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use filter::{BrightnessFilter, LumaCounts, Rejection};
pub use frames::{Frame, FrameSource, ImageFrames, VideoFrames};
pub use gallery::{Gallery, GalleryCommand, GalleryEntry};
pub use media::MediaFile;
pub use metadata::VideoMetadata;
pub use package::{PackageReport, package_frames, package_frames_with_progress};
pub use progress::{OperationType, ProgressCallback, ProgressInfo};
pub use sampler::{FrameSampler, RejectedFrame, SamplingReport};
pub use session::{RunRequest, Session, Stage, normalize_dataset_name};
pub use utilities::frame_file_name;
pub use workflow::{
    Acquire, DecodeVideo, LogReporter, Reporter, RunOutcome, Sample, Workflow,
};
pub use workspace::{CleanupWarning, Workspace};
