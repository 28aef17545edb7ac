//! Ephemeral per-run session state.
//!
//! A [`Session`] moves through three stages: the user fills in a
//! [`RunRequest`] (`Input`), frames are downloaded and sampled
//! (`Extraction`), and the user picks frames (`Selection`). Packaging
//! resets it back to `Input`. Nothing here is persisted.

use crate::{
    config::{DEFAULT_DATASET_NAME, DEFAULT_FRAME_INTERVAL},
    error::FramesetError,
};

/// Where a session is in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Input,
    Extraction,
    Selection,
}

/// What the user asks for when starting a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub link: String,
    pub interval: u64,
    pub dataset_name: String,
    /// Optional suffix appended to every archived filename.
    pub trigger_word: Option<String>,
}

impl RunRequest {
    /// A request for `link` with the default interval and dataset name.
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            interval: DEFAULT_FRAME_INTERVAL,
            dataset_name: DEFAULT_DATASET_NAME.to_string(),
            trigger_word: None,
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn with_dataset_name(mut self, name: impl Into<String>) -> Self {
        self.dataset_name = name.into();
        self
    }

    #[must_use]
    pub fn with_trigger_word(mut self, word: Option<String>) -> Self {
        self.trigger_word = word.filter(|word| !word.trim().is_empty());
        self
    }
}

/// Session state for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    stage: Stage,
    request: RunRequest,
    selected: Vec<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Trim a dataset name, falling back to [`DEFAULT_DATASET_NAME`] when blank.
pub fn normalize_dataset_name(raw: &str) -> String {
    match raw.trim() {
        "" => DEFAULT_DATASET_NAME.to_string(),
        name => name.to_string(),
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            stage: Stage::Input,
            request: RunRequest::new(""),
            selected: Vec::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn request(&self) -> &RunRequest {
        &self.request
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    /// Accept a run request and move to `Extraction`.
    ///
    /// # Errors
    ///
    /// [`FramesetError::InvalidStage`] outside `Input`,
    /// [`FramesetError::MissingLink`] for a blank link and
    /// [`FramesetError::InvalidInterval`] for an interval of zero.
    pub fn submit(&mut self, request: RunRequest) -> Result<(), FramesetError> {
        self.expect_stage(Stage::Input, "submit a request")?;
        if request.link.trim().is_empty() {
            return Err(FramesetError::MissingLink);
        }
        if request.interval == 0 {
            return Err(FramesetError::InvalidInterval);
        }
        self.request = RunRequest {
            link: request.link.trim().to_string(),
            dataset_name: normalize_dataset_name(&request.dataset_name),
            ..request
        };
        self.selected.clear();
        self.stage = Stage::Extraction;
        Ok(())
    }

    /// Frames are on disk: move to `Selection`.
    pub fn finish_extraction(&mut self) -> Result<(), FramesetError> {
        self.expect_stage(Stage::Extraction, "finish extraction")?;
        self.stage = Stage::Selection;
        Ok(())
    }

    /// Record the frames the user kept.
    pub fn select(&mut self, names: Vec<String>) -> Result<(), FramesetError> {
        self.expect_stage(Stage::Selection, "select frames")?;
        self.selected = names;
        Ok(())
    }

    /// Drop everything and return to `Input` with defaults.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn expect_stage(&self, stage: Stage, operation: &'static str) -> Result<(), FramesetError> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(FramesetError::InvalidStage {
                operation,
                stage: self.stage,
            })
        }
    }
}
