//! Video metadata read when a file is opened.
//!
//! The sampler only needs the frame geometry and an estimate of the frame
//! count for progress reporting, so that is all that is cached.

use std::time::Duration;

/// Metadata for the best video stream of a file.
///
/// # Example
///
/// ```no_run
/// use frameset::MediaFile;
///
/// let media = MediaFile::open("input.mp4").unwrap();
/// let video = media.metadata();
/// println!("{}x{} @ {:.2} fps", video.width, video.height, video.frames_per_second);
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second (approximate for variable-frame-rate content).
    pub frames_per_second: f64,
    /// Frame count from the container, or estimated from duration and
    /// frame rate. Zero when neither is known.
    pub frame_count: u64,
    /// Container-level duration.
    pub duration: Duration,
    /// Codec name (e.g. `"h264"`, `"vp9"`, `"av1"`).
    pub codec: String,
}

impl VideoMetadata {
    /// The frame count as a progress total, `None` when unknown.
    pub fn known_frame_count(&self) -> Option<u64> {
        (self.frame_count > 0).then_some(self.frame_count)
    }
}

/// Estimate a frame count from a container count, duration and frame rate.
///
/// The container's own count wins when it is positive.
pub(crate) fn estimate_frame_count(
    container_frames: i64,
    duration: Duration,
    frames_per_second: f64,
) -> u64 {
    if container_frames > 0 {
        container_frames as u64
    } else if frames_per_second > 0.0 {
        (duration.as_secs_f64() * frames_per_second).round() as u64
    } else {
        0
    }
}
