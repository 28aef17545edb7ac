//! Interval sampling with near-uniform frame rejection.
//!
//! [`FrameSampler`] walks a [`FrameSource`] in decode order. Every
//! `interval`-th frame, starting with frame 0, is a candidate; candidates
//! that pass the [`BrightnessFilter`] are written as
//! `frame_00000.jpg`, `frame_00001.jpg`, … with no gaps in the numbering.
//!
//! # Example
//!
//! ```no_run
//! use frameset::{FrameSampler, FramesetError, SamplerOptions};
//!
//! let sampler = FrameSampler::new(SamplerOptions::new().with_interval(30));
//! let report = sampler.sample_file("input.mp4", "extracted_frames")?;
//! println!("Extracted {} frames from the video.", report.saved.len());
//! # Ok::<(), FramesetError>(())
//! ```

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use image::{DynamicImage, codecs::jpeg::JpegEncoder};

use crate::{
    config::SamplerOptions,
    error::FramesetError,
    filter::{BrightnessFilter, Rejection},
    frames::{Frame, FrameSource},
    media::MediaFile,
    progress::{OperationType, ProgressTracker},
    utilities::frame_file_name,
};

/// Whether the frame at decode position `index` is a sampling candidate.
pub fn is_candidate(index: u64, interval: u64) -> bool {
    interval > 0 && index % interval == 0
}

/// Number of candidates among `total` frames: `⌈total / interval⌉`.
pub fn candidate_count(total: u64, interval: u64) -> u64 {
    if interval == 0 {
        return 0;
    }
    total.div_ceil(interval)
}

/// A candidate frame that the brightness filter discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectedFrame {
    /// Decode position of the frame.
    pub position: u64,
    pub reason: Rejection,
}

/// Outcome of a sampling run.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct SamplingReport {
    /// Frames decoded from the source.
    pub frames_decoded: u64,
    /// Frames that fell on the sampling interval.
    pub candidates: u64,
    /// Paths of the written frames, in sequence order.
    pub saved: Vec<PathBuf>,
    /// Candidates discarded by the brightness filter.
    pub rejected: Vec<RejectedFrame>,
}

/// Samples frames from a video and writes the survivors as JPEGs.
#[derive(Debug, Clone, Default)]
pub struct FrameSampler {
    options: SamplerOptions,
}

impl FrameSampler {
    pub fn new(options: SamplerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SamplerOptions {
        &self.options
    }

    /// Open `video` and sample it into `output_dir`.
    ///
    /// # Errors
    ///
    /// Propagates open and decode errors from [`MediaFile`], plus the
    /// errors of [`sample`](FrameSampler::sample).
    pub fn sample_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        video: P,
        output_dir: Q,
    ) -> Result<SamplingReport, FramesetError> {
        if self.options.interval == 0 {
            return Err(FramesetError::InvalidInterval);
        }
        let mut media = MediaFile::open(video)?;
        let mut frames = media.frames()?;
        self.sample(&mut frames, output_dir.as_ref())
    }

    /// Sample any [`FrameSource`] into `output_dir`, creating the directory
    /// if needed.
    ///
    /// # Errors
    ///
    /// - [`FramesetError::InvalidInterval`] if the interval is zero.
    /// - I/O or image errors while writing frames.
    /// - Decode errors surfaced by the source.
    pub fn sample<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
        output_dir: &Path,
    ) -> Result<SamplingReport, FramesetError> {
        let interval = self.options.interval;
        if interval == 0 {
            return Err(FramesetError::InvalidInterval);
        }

        fs::create_dir_all(output_dir)?;

        let filter = BrightnessFilter::from_options(&self.options);
        let total = source.total_frames();
        let mut tracker = ProgressTracker::new(
            self.options.progress.clone(),
            OperationType::FrameSampling,
            total,
            self.options.batch_size,
        );

        log::debug!(
            "Sampling every {interval} frame(s) into {} (total: {total:?})",
            output_dir.display()
        );

        let mut report = SamplingReport::default();
        let mut position = 0_u64;

        while let Some(step) = source.next_frame(is_candidate(position, interval)) {
            match step? {
                Frame::Skipped => {}
                Frame::Pixels(image) => {
                    report.candidates += 1;
                    match filter.classify(&image) {
                        Some(reason) => {
                            log::debug!("Skipping {reason} frame at position {position}");
                            report.rejected.push(RejectedFrame { position, reason });
                        }
                        None => {
                            let path =
                                output_dir.join(frame_file_name(report.saved.len() as u64));
                            write_jpeg(&image, &path, self.options.jpeg_quality)?;
                            report.saved.push(path);
                        }
                    }
                }
            }
            report.frames_decoded += 1;
            tracker.advance(Some(position));
            position += 1;
        }
        tracker.finish();

        log::info!(
            "Extracted {} frames from the video ({} decoded, {} rejected)",
            report.saved.len(),
            report.frames_decoded,
            report.rejected.len()
        );

        Ok(report)
    }
}

fn write_jpeg(image: &DynamicImage, path: &Path, quality: u8) -> Result<(), FramesetError> {
    let mut writer = BufWriter::new(File::create(path)?);
    let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    image.to_rgb8().write_with_encoder(encoder)?;
    writer.flush()?;
    Ok(())
}
