//! One end-to-end run: download, sample, select, package, clean up.
//!
//! [`Workflow`] owns the stage configuration and drives a [`Session`]
//! through its stages. User-facing messages go through a [`Reporter`].
//! A failure that halts the run is reported once through
//! [`Reporter::error`] and then returned. Cleanup failures never halt
//! anything and are reported as warnings.

use std::{path::Path, sync::Arc};

use crate::{
    config::{DownloadOptions, SamplerOptions},
    download::{DownloadedVideo, VideoDownloader},
    error::FramesetError,
    gallery::Gallery,
    package::{PackageReport, archive_path, package_frames_with_progress},
    progress::{NoOpProgress, ProgressCallback},
    sampler::{FrameSampler, SamplingReport},
    session::{RunRequest, Session},
    workspace::Workspace,
};

/// Receives user-visible status messages.
pub trait Reporter {
    fn success(&self, message: &str);
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

/// Routes status messages to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn success(&self, message: &str) {
        log::info!("{message}");
    }

    fn info(&self, message: &str) {
        log::info!("{message}");
    }

    fn warning(&self, message: &str) {
        log::warn!("{message}");
    }

    fn error(&self, message: &str) {
        log::error!("{message}");
    }
}

/// Fetches the video for a link into a directory.
pub trait Acquire {
    fn acquire(&self, link: &str, directory: &Path) -> Result<DownloadedVideo, FramesetError>;
}

impl Acquire for VideoDownloader {
    fn acquire(&self, link: &str, directory: &Path) -> Result<DownloadedVideo, FramesetError> {
        self.download(link, directory)
    }
}

/// Turns a downloaded video into frames in a directory.
pub trait Sample {
    fn sample(
        &self,
        video: &Path,
        options: SamplerOptions,
        output_dir: &Path,
    ) -> Result<SamplingReport, FramesetError>;
}

/// Decodes the downloaded file with FFmpeg.
#[derive(Debug, Default, Clone, Copy)]
pub struct DecodeVideo;

impl Sample for DecodeVideo {
    fn sample(
        &self,
        video: &Path,
        options: SamplerOptions,
        output_dir: &Path,
    ) -> Result<SamplingReport, FramesetError> {
        FrameSampler::new(options).sample_file(video, output_dir)
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone)]
#[must_use]
pub struct RunOutcome {
    pub video_title: String,
    pub sampling: SamplingReport,
    pub package: PackageReport,
}

/// Drives a [`Session`] through a complete run.
pub struct Workflow<A = VideoDownloader, S = DecodeVideo> {
    workspace: Workspace,
    acquirer: A,
    sampler: S,
    sampler_options: SamplerOptions,
    packaging_progress: Arc<dyn ProgressCallback>,
}

impl Workflow<VideoDownloader, DecodeVideo> {
    /// A workflow that downloads with `yt-dlp` and decodes with FFmpeg.
    pub fn new(workspace: Workspace, download: DownloadOptions) -> Self {
        Self::with_acquirer(workspace, VideoDownloader::new(download))
    }
}

impl<A: Acquire> Workflow<A, DecodeVideo> {
    pub fn with_acquirer(workspace: Workspace, acquirer: A) -> Self {
        Self {
            workspace,
            acquirer,
            sampler: DecodeVideo,
            sampler_options: SamplerOptions::new(),
            packaging_progress: Arc::new(NoOpProgress),
        }
    }
}

impl<A: Acquire, S: Sample> Workflow<A, S> {
    /// Replace the sampling stage.
    pub fn with_sampler<T: Sample>(self, sampler: T) -> Workflow<A, T> {
        Workflow {
            workspace: self.workspace,
            acquirer: self.acquirer,
            sampler,
            sampler_options: self.sampler_options,
            packaging_progress: self.packaging_progress,
        }
    }

    /// Sampler settings. The interval is taken from each run's request.
    #[must_use]
    pub fn with_sampler_options(mut self, options: SamplerOptions) -> Self {
        self.sampler_options = options;
        self
    }

    #[must_use]
    pub fn with_packaging_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.packaging_progress = callback;
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Remove leftovers of a previous run, reporting failures as warnings.
    pub fn clean(&self, reporter: &dyn Reporter) {
        for warning in self.workspace.reset() {
            reporter.warning(&warning.to_string());
        }
    }

    /// Run the pipeline for `request`.
    ///
    /// `select` is handed the loaded gallery and returns the frames to keep.
    /// Every error that ends the run is passed to [`Reporter::error`]
    /// before it is returned. The session is reset after packaging and
    /// after a failed download or extraction. An empty selection leaves it
    /// in the selection stage with the frames still on disk.
    ///
    /// # Errors
    ///
    /// - [`FramesetError::OverlappingDirectories`] when cleanup would
    ///   remove the output directory. Nothing is touched.
    /// - Request validation errors from [`Session::submit`].
    /// - Download, decode and I/O errors from the stages.
    /// - [`FramesetError::EmptySelection`] when nothing was selected.
    pub fn run<F>(
        &self,
        session: &mut Session,
        request: RunRequest,
        select: F,
        reporter: &dyn Reporter,
    ) -> Result<RunOutcome, FramesetError>
    where
        F: FnMut(&mut Gallery) -> Result<Vec<String>, FramesetError>,
    {
        self.execute(session, request, select, reporter)
            .inspect_err(|error| reporter.error(&error.to_string()))
    }

    fn execute<F>(
        &self,
        session: &mut Session,
        request: RunRequest,
        mut select: F,
        reporter: &dyn Reporter,
    ) -> Result<RunOutcome, FramesetError>
    where
        F: FnMut(&mut Gallery) -> Result<Vec<String>, FramesetError>,
    {
        self.workspace.check_layout()?;
        session.submit(request)?;
        self.clean(reporter);

        let video = self
            .acquirer
            .acquire(&session.request().link, self.workspace.videos_dir())
            .map_err(|error| self.abort(session, reporter, error))?;
        reporter.success(&format!("Downloaded video: {}", video.title));

        let sampling = self.sample(session, &video, reporter);
        match self.workspace.remove_video(&video.path) {
            Ok(()) => reporter.info(&format!(
                "Deleted downloaded video file: {}",
                video.path.display()
            )),
            Err(warning) => reporter.warning(&warning.to_string()),
        }
        let sampling = sampling.map_err(|error| self.abort(session, reporter, error))?;
        session.finish_extraction()?;

        let mut gallery = Gallery::load(self.workspace.frames_dir())?;
        let selected = select(&mut gallery)?;
        session.select(selected)?;
        if session.selected().is_empty() {
            return Err(FramesetError::EmptySelection);
        }

        let archive = archive_path(self.workspace.output_dir(), &session.request().dataset_name);
        let package = package_frames_with_progress(
            self.workspace.frames_dir(),
            session.selected(),
            session.request().trigger_word.as_deref(),
            &archive,
            self.packaging_progress.clone(),
        )?;
        reporter.success(&format!(
            "Zipped selected frames: {}",
            package.archive.display()
        ));

        session.reset();
        self.clean(reporter);

        Ok(RunOutcome {
            video_title: video.title,
            sampling,
            package,
        })
    }

    /// Drop the session and working files after a failed stage.
    fn abort(
        &self,
        session: &mut Session,
        reporter: &dyn Reporter,
        error: FramesetError,
    ) -> FramesetError {
        session.reset();
        self.clean(reporter);
        error
    }

    fn sample(
        &self,
        session: &Session,
        video: &DownloadedVideo,
        reporter: &dyn Reporter,
    ) -> Result<SamplingReport, FramesetError> {
        let options = self
            .sampler_options
            .clone()
            .with_interval(session.request().interval);
        let report = self
            .sampler
            .sample(&video.path, options, self.workspace.frames_dir())?;
        for rejected in &report.rejected {
            reporter.info(&format!(
                "Skipping {} frame at position {}",
                rejected.reason, rejected.position
            ));
        }
        reporter.success(&format!(
            "Extracted {} frames from the video.",
            report.saved.len()
        ));
        Ok(report)
    }
}
