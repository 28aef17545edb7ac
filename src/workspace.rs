//! Transient working directories and best-effort cleanup.
//!
//! Downloaded videos and sampled frames only live for one run. Removal
//! failures never abort the pipeline: they are logged and handed back as
//! [`CleanupWarning`]s for the front end to display.

use std::{
    fmt, fs, io,
    path::{Component, Path, PathBuf},
};

use crate::{config::WorkspaceConfig, error::FramesetError};

/// A removal that did not succeed.
#[derive(Debug)]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub error: io::Error,
}

impl fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not delete {}: {}", self.path.display(), self.error)
    }
}

/// The videos and frames directories of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    config: WorkspaceConfig,
}

impl Workspace {
    pub fn new(config: WorkspaceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn videos_dir(&self) -> &Path {
        &self.config.videos_dir
    }

    pub fn frames_dir(&self) -> &Path {
        &self.config.frames_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Check that removing the working directories cannot touch the
    /// output directory.
    ///
    /// # Errors
    ///
    /// [`FramesetError::OverlappingDirectories`] when the output directory
    /// is a working directory or lies inside one.
    pub fn check_layout(&self) -> Result<(), FramesetError> {
        let output = lexical_absolute(&self.config.output_dir)?;
        for working in [&self.config.videos_dir, &self.config.frames_dir] {
            if output.starts_with(lexical_absolute(working)?) {
                return Err(FramesetError::OverlappingDirectories {
                    output: self.config.output_dir.clone(),
                    working: working.clone(),
                });
            }
        }
        Ok(())
    }

    /// Create both working directories.
    pub fn prepare(&self) -> Result<(), FramesetError> {
        fs::create_dir_all(&self.config.videos_dir)?;
        fs::create_dir_all(&self.config.frames_dir)?;
        Ok(())
    }

    /// Delete a downloaded video file.
    pub fn remove_video(&self, path: &Path) -> Result<(), CleanupWarning> {
        match fs::remove_file(path) {
            Ok(()) => {
                log::info!("Deleted downloaded video file: {}", path.display());
                Ok(())
            }
            Err(error) => Err(warn(path, error)),
        }
    }

    /// Remove the frames directory.
    pub fn remove_frames(&self) -> Result<(), CleanupWarning> {
        remove_dir_if_present(&self.config.frames_dir)
    }

    /// Remove the videos directory.
    pub fn remove_videos(&self) -> Result<(), CleanupWarning> {
        remove_dir_if_present(&self.config.videos_dir)
    }

    /// Remove both working directories, collecting every failure.
    pub fn reset(&self) -> Vec<CleanupWarning> {
        [self.remove_frames(), self.remove_videos()]
            .into_iter()
            .filter_map(Result::err)
            .collect()
    }
}

/// Remove `dir` and its contents. A directory that does not exist is not
/// a failure.
pub fn remove_dir_if_present(dir: &Path) -> Result<(), CleanupWarning> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            log::info!("Deleted directory: {}", dir.display());
            Ok(())
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(warn(dir, error)),
    }
}

/// Absolute form of `path` with `.` and `..` resolved without touching
/// the filesystem.
fn lexical_absolute(path: &Path) -> io::Result<PathBuf> {
    let mut resolved = PathBuf::new();
    for component in std::path::absolute(path)?.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    Ok(resolved)
}

fn warn(path: &Path, error: io::Error) -> CleanupWarning {
    let warning = CleanupWarning {
        path: path.to_path_buf(),
        error,
    };
    log::warn!("{warning}");
    warning
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_removes_both_directories() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(WorkspaceConfig::rooted_at(root.path()));
        workspace.prepare().unwrap();
        fs::write(workspace.frames_dir().join("frame_00000.jpg"), b"x").unwrap();

        assert!(workspace.reset().is_empty());
        assert!(!workspace.frames_dir().exists());
        assert!(!workspace.videos_dir().exists());
    }

    #[test]
    fn reset_on_missing_directories_is_quiet() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(WorkspaceConfig::rooted_at(root.path().join("absent")));
        assert!(workspace.reset().is_empty());
    }

    #[test]
    fn default_layout_is_accepted() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(WorkspaceConfig::rooted_at(root.path()));
        assert!(workspace.check_layout().is_ok());
        assert!(Workspace::new(WorkspaceConfig::new()).check_layout().is_ok());
    }

    #[test]
    fn output_inside_a_working_directory_is_refused() {
        let root = tempfile::tempdir().unwrap();
        let config = WorkspaceConfig::rooted_at(root.path());
        let frames = config.frames_dir.clone();
        let videos = config.videos_dir.clone();

        for output in [frames.clone(), frames.join("zips"), videos.join("./a/../b")] {
            let workspace = Workspace::new(config.clone().with_output_dir(output));
            assert!(matches!(
                workspace.check_layout(),
                Err(FramesetError::OverlappingDirectories { .. })
            ));
        }
    }

    #[test]
    fn working_directory_containing_the_output_is_refused() {
        let config = WorkspaceConfig::new()
            .with_frames_dir(".")
            .with_output_dir("./out/../.");
        assert!(matches!(
            Workspace::new(config).check_layout(),
            Err(FramesetError::OverlappingDirectories { .. })
        ));
    }

    #[test]
    fn sibling_with_shared_prefix_is_accepted() {
        let root = tempfile::tempdir().unwrap();
        let config = WorkspaceConfig::rooted_at(root.path())
            .with_output_dir(root.path().join("extracted_frames_out"));
        assert!(Workspace::new(config).check_layout().is_ok());
    }

    #[test]
    fn removing_a_missing_video_warns() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(WorkspaceConfig::rooted_at(root.path()));
        let warning = workspace
            .remove_video(&root.path().join("gone.mp4"))
            .unwrap_err();
        assert!(warning.to_string().starts_with("Could not delete"));
    }
}
