//! Error types for the `frameset` crate.
//!
//! This module defines [`FramesetError`], the unified error type returned by
//! every fallible stage of the pipeline. Variants carry the path, link or
//! frame name involved so the front end can report a failure without
//! additional logging at the call site.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;
use zip::result::ZipError;

use crate::session::Stage;

/// The unified error type for all `frameset` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FramesetError {
    /// The video file could not be opened for decoding.
    #[error("Failed to open video file at {path}: {reason}")]
    VideoOpen {
        /// Path that was passed to [`crate::MediaFile::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded or converted.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// A sampling interval of zero was provided.
    #[error("Frame interval must be greater than zero")]
    InvalidInterval,

    /// The downloader ran but did not produce a usable video file.
    #[error("Failed to download {url}: {reason}")]
    Download {
        /// The link that was requested.
        url: String,
        /// What went wrong, usually the downloader's stderr.
        reason: String,
    },

    /// No downloader executable could be started.
    #[error("yt-dlp is required to download videos (tried: {tried})")]
    DownloaderMissing {
        /// Launchers that were attempted, joined for display.
        tried: String,
    },

    /// Packaging was requested with nothing selected.
    #[error("No frames selected. Please select at least one frame.")]
    EmptySelection,

    /// A selected filename does not exist in the frames directory.
    #[error("Selected frame {name} does not exist in {folder}")]
    UnknownFrame {
        /// The selected filename.
        name: String,
        /// The folder that was searched.
        folder: PathBuf,
    },

    /// The filename suffix cannot be embedded in an archive entry name.
    #[error("Invalid trigger word {0:?}: must not contain path separators")]
    InvalidSuffix(String),

    /// A session operation was called in the wrong stage.
    #[error("Cannot {operation} while the session is in the {stage:?} stage")]
    InvalidStage {
        /// The operation that was attempted.
        operation: &'static str,
        /// The stage the session was in.
        stage: Stage,
    },

    /// The session was submitted without a link.
    #[error("A video link is required")]
    MissingLink,

    /// The archive would be written where cleanup removes files.
    #[error("Output directory {output} overlaps working directory {working}")]
    OverlappingDirectories {
        /// Where the archive is written.
        output: PathBuf,
        /// The videos or frames directory it overlaps.
        working: PathBuf,
    },

    /// Writing the zip archive failed.
    #[error("Archive error: {0}")]
    ArchiveError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while encoding or loading frames.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl From<FfmpegError> for FramesetError {
    fn from(error: FfmpegError) -> Self {
        FramesetError::FfmpegError(error.to_string())
    }
}

impl From<ZipError> for FramesetError {
    fn from(error: ZipError) -> Self {
        match error {
            ZipError::Io(io) => FramesetError::IoError(io),
            other => FramesetError::ArchiveError(other.to_string()),
        }
    }
}
