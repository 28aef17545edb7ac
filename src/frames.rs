//! Sequential frame sources.
//!
//! The sampler pulls frames through the [`FrameSource`] trait. It tells the
//! source, for each frame, whether it needs the pixels; frames that are not
//! sampling candidates are decoded (the codec requires it) but never
//! colour-converted. [`VideoFrames`] is the FFmpeg-backed source, and
//! [`ImageFrames`] replays in-memory images, which is what the tests and
//! benchmarks use.

use std::collections::VecDeque;

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbImage};

use crate::{error::FramesetError, media::MediaFile};

/// Consecutive unreadable packets tolerated before decoding gives up.
const MAX_CONSECUTIVE_READ_ERRORS: u32 = 32;

/// One step of a frame source.
#[derive(Debug)]
pub enum Frame {
    /// The frame was decoded but its pixels were not requested.
    Skipped,
    /// The frame's pixels, converted to RGB8.
    Pixels(DynamicImage),
}

/// A source of frames in decode order.
pub trait FrameSource {
    /// Total frames the source expects to produce, when known.
    fn total_frames(&self) -> Option<u64>;

    /// Advance to the next frame. Returns `None` once the source is drained.
    ///
    /// When `want_pixels` is `false` the source may return
    /// [`Frame::Skipped`] without converting the frame.
    fn next_frame(&mut self, want_pixels: bool) -> Option<Result<Frame, FramesetError>>;
}

/// Decodes the best video stream of a [`MediaFile`] from the beginning.
///
/// Created via [`MediaFile::frames`]. The iterator borrows the media file
/// mutably; dropping it releases the borrow.
pub struct VideoFrames<'a> {
    media: &'a mut MediaFile,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    video_stream_index: usize,
    width: u32,
    height: u32,
    total: Option<u64>,
    decoded_frame: VideoFrame,
    rgb_frame: VideoFrame,
    read_errors: ReadErrorBudget,
    eof_sent: bool,
    done: bool,
}

impl<'a> VideoFrames<'a> {
    pub(crate) fn new(media: &'a mut MediaFile) -> Result<Self, FramesetError> {
        let video_stream_index = media.video_stream_index;
        let total = media.metadata.known_frame_count();

        let stream = media
            .input_context
            .stream(video_stream_index)
            .ok_or(FramesetError::NoVideoStream)?;
        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        let decoder = decoder_context.decoder().video()?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        Ok(Self {
            media,
            decoder,
            scaler,
            video_stream_index,
            width,
            height,
            total,
            decoded_frame: VideoFrame::empty(),
            rgb_frame: VideoFrame::empty(),
            read_errors: ReadErrorBudget::new(MAX_CONSECUTIVE_READ_ERRORS),
            eof_sent: false,
            done: false,
        })
    }

    fn convert_current_frame(&mut self) -> Result<DynamicImage, FramesetError> {
        self.scaler.run(&self.decoded_frame, &mut self.rgb_frame)?;
        let buffer =
            crate::utilities::frame_to_rgb_buffer(&self.rgb_frame, self.width, self.height);
        let image = RgbImage::from_raw(self.width, self.height, buffer).ok_or_else(|| {
            FramesetError::VideoDecodeError(
                "Failed to construct RGB image from decoded frame data".to_string(),
            )
        })?;
        Ok(DynamicImage::ImageRgb8(image))
    }
}

impl FrameSource for VideoFrames<'_> {
    fn total_frames(&self) -> Option<u64> {
        self.total
    }

    fn next_frame(&mut self, want_pixels: bool) -> Option<Result<Frame, FramesetError>> {
        if self.done {
            return None;
        }

        loop {
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                if !want_pixels {
                    return Some(Ok(Frame::Skipped));
                }
                return match self.convert_current_frame() {
                    Ok(image) => Some(Ok(Frame::Pixels(image))),
                    Err(error) => {
                        self.done = true;
                        Some(Err(error))
                    }
                };
            }

            if self.eof_sent {
                self.done = true;
                return None;
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.media.input_context) {
                Ok(()) => {
                    self.read_errors.reset();
                    if packet.stream() == self.video_stream_index {
                        if let Err(error) = self.decoder.send_packet(&packet) {
                            self.done = true;
                            return Some(Err(FramesetError::from(error)));
                        }
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        self.done = true;
                        return Some(Err(FramesetError::from(error)));
                    }
                    self.eof_sent = true;
                }
                Err(error) => {
                    if let Some(fatal) = self.read_errors.record(&error) {
                        self.done = true;
                        return Some(Err(fatal));
                    }
                }
            }
        }
    }
}

/// Counts packet read failures in a row.
#[derive(Debug, Clone, Copy)]
struct ReadErrorBudget {
    consecutive: u32,
    limit: u32,
}

impl ReadErrorBudget {
    fn new(limit: u32) -> Self {
        Self {
            consecutive: 0,
            limit,
        }
    }

    fn reset(&mut self) {
        self.consecutive = 0;
    }

    /// Note one failure. Returns the error to surface once the limit is hit.
    fn record(&mut self, error: &dyn std::fmt::Display) -> Option<FramesetError> {
        self.consecutive += 1;
        if self.consecutive < self.limit {
            log::debug!("Skipping unreadable packet: {error}");
            return None;
        }
        Some(FramesetError::VideoDecodeError(format!(
            "{} consecutive packets could not be read: {error}",
            self.consecutive
        )))
    }
}

/// Replays in-memory images as a frame source.
///
/// # Example
///
/// ```
/// use frameset::{FrameSource, ImageFrames};
/// use image::DynamicImage;
///
/// let mut source = ImageFrames::new(vec![DynamicImage::new_rgb8(4, 4); 3]);
/// assert_eq!(source.total_frames(), Some(3));
/// ```
#[derive(Debug, Default)]
pub struct ImageFrames {
    frames: VecDeque<DynamicImage>,
    total: u64,
}

impl ImageFrames {
    pub fn new(frames: Vec<DynamicImage>) -> Self {
        let total = frames.len() as u64;
        Self {
            frames: frames.into(),
            total,
        }
    }
}

impl FrameSource for ImageFrames {
    fn total_frames(&self) -> Option<u64> {
        Some(self.total)
    }

    fn next_frame(&mut self, want_pixels: bool) -> Option<Result<Frame, FramesetError>> {
        let image = self.frames.pop_front()?;
        Some(Ok(if want_pixels {
            Frame::Pixels(image)
        } else {
            Frame::Skipped
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_errors_give_up_after_the_limit() {
        let mut budget = ReadErrorBudget::new(3);
        let error = "Input/output error";
        assert!(budget.record(&error).is_none());
        assert!(budget.record(&error).is_none());
        match budget.record(&error) {
            Some(FramesetError::VideoDecodeError(message)) => {
                assert!(message.starts_with("3 consecutive packets could not be read"));
            }
            other => panic!("expected a decode error, got {other:?}"),
        }
    }

    #[test]
    fn successful_read_restores_the_budget() {
        let mut budget = ReadErrorBudget::new(2);
        let error = "Input/output error";
        assert!(budget.record(&error).is_none());
        budget.reset();
        assert!(budget.record(&error).is_none());
        assert!(budget.record(&error).is_some());
    }

    #[test]
    fn image_frames_skip_unwanted_pixels() {
        let mut source = ImageFrames::new(vec![DynamicImage::new_rgb8(2, 2); 2]);
        assert!(matches!(source.next_frame(false), Some(Ok(Frame::Skipped))));
        assert!(matches!(source.next_frame(true), Some(Ok(Frame::Pixels(_)))));
        assert!(source.next_frame(true).is_none());
    }
}
