//! Core [`MediaFile`] implementation.
//!
//! `MediaFile` opens a downloaded video, locates its best video stream and
//! caches the stream metadata. Call [`frames`](MediaFile::frames) to decode
//! the stream sequentially.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{codec::context::Context as CodecContext, format::context::Input, media::Type};

use crate::{
    error::FramesetError,
    frames::VideoFrames,
    metadata::{VideoMetadata, estimate_frame_count},
};

/// An opened video file.
///
/// # Example
///
/// ```no_run
/// use frameset::{FramesetError, MediaFile};
///
/// let mut media = MediaFile::open("input.mp4")?;
/// println!("{} frames", media.metadata().frame_count);
/// let frames = media.frames()?;
/// # Ok::<(), FramesetError>(())
/// ```
pub struct MediaFile {
    /// The opened FFmpeg input (demuxer) context.
    pub(crate) input_context: Input,
    pub(crate) metadata: VideoMetadata,
    pub(crate) video_stream_index: usize,
    pub(crate) file_path: PathBuf,
}

impl Debug for MediaFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MediaFile")
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .field("file_path", &self.file_path)
            .finish_non_exhaustive()
    }
}

impl MediaFile {
    /// Open a video file for decoding.
    ///
    /// Initializes FFmpeg (idempotent), opens the file and reads the best
    /// video stream's geometry, frame rate and frame count.
    ///
    /// # Errors
    ///
    /// - [`FramesetError::VideoOpen`] if the file cannot be opened.
    /// - [`FramesetError::NoVideoStream`] if it has no video stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FramesetError> {
        let path = path.as_ref();
        let file_path = path.to_path_buf();

        log::debug!("Opening video file: {}", file_path.display());

        ffmpeg_next::init().map_err(|error| FramesetError::VideoOpen {
            path: file_path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| FramesetError::VideoOpen {
                path: file_path.clone(),
                reason: error.to_string(),
            })?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(FramesetError::NoVideoStream)?;
        let video_stream_index = stream.index();

        let decoder_context = CodecContext::from_parameters(stream.parameters()).map_err(
            |error| FramesetError::VideoOpen {
                path: file_path.clone(),
                reason: format!("Failed to read video codec parameters: {error}"),
            },
        )?;
        let decoder = decoder_context
            .decoder()
            .video()
            .map_err(|error| FramesetError::VideoOpen {
                path: file_path.clone(),
                reason: format!("Failed to create video decoder: {error}"),
            })?;

        let frame_rate = stream.avg_frame_rate();
        let frames_per_second = if frame_rate.denominator() != 0 {
            frame_rate.numerator() as f64 / frame_rate.denominator() as f64
        } else {
            let rate = stream.rate();
            if rate.denominator() != 0 {
                rate.numerator() as f64 / rate.denominator() as f64
            } else {
                0.0
            }
        };

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let codec = stream.parameters().id().name().to_string();

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
            frame_count: estimate_frame_count(stream.frames(), duration, frames_per_second),
            duration,
            codec,
        };

        log::debug!(
            "Video stream {video_stream_index}: {}x{} @ {:.2} fps, ~{} frames [{}]",
            metadata.width,
            metadata.height,
            metadata.frames_per_second,
            metadata.frame_count,
            metadata.codec,
        );

        Ok(Self {
            input_context,
            metadata,
            video_stream_index,
            file_path,
        })
    }

    /// Cached metadata of the video stream.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Decode the video stream from the start, one frame at a time.
    ///
    /// # Errors
    ///
    /// Returns an FFmpeg error if the decoder or scaler cannot be created.
    pub fn frames(&mut self) -> Result<VideoFrames<'_>, FramesetError> {
        VideoFrames::new(self)
    }
}
