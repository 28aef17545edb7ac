//! Zip packaging of the selected frames.
//!
//! Each selected file is stored under its own name, or under
//! `<stem>_<suffix><ext>` when a trigger word is given. The archive is
//! written to a temporary sibling and renamed into place once it is
//! complete, so a failed run never leaves a truncated archive behind.
//!
//! # Example
//!
//! ```no_run
//! use frameset::{FramesetError, package_frames};
//!
//! let selected = vec!["frame_00000.jpg".to_string(), "frame_00003.jpg".to_string()];
//! let report = package_frames("extracted_frames", &selected, Some("mytoken"), "frames_dataset.zip")?;
//! assert_eq!(report.entries.len(), 2);
//! # Ok::<(), FramesetError>(())
//! ```

use std::{
    ffi::OsStr,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::{
    error::FramesetError,
    progress::{NoOpProgress, OperationType, ProgressCallback, ProgressTracker},
    utilities::split_extension,
};

/// Outcome of a packaging run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct PackageReport {
    /// Path of the written archive.
    pub archive: PathBuf,
    /// Entry names in the order they were written.
    pub entries: Vec<String>,
}

/// Normalise an optional trigger word: trimmed, `None` when empty.
///
/// # Errors
///
/// Returns [`FramesetError::InvalidSuffix`] when the word contains a path
/// separator.
pub fn normalize_suffix(suffix: Option<&str>) -> Result<Option<&str>, FramesetError> {
    match suffix.map(str::trim) {
        None | Some("") => Ok(None),
        Some(word) if word.contains(['/', '\\']) => {
            Err(FramesetError::InvalidSuffix(word.to_string()))
        }
        Some(word) => Ok(Some(word)),
    }
}

/// Archive entry name for `file_name`: `<stem>_<suffix><ext>` with a
/// suffix, the original name without one.
pub fn entry_name(file_name: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => {
            let (stem, extension) = split_extension(file_name);
            format!("{stem}_{suffix}{extension}")
        }
        None => file_name.to_string(),
    }
}

/// `<dataset_name>.zip` inside `output_dir`.
pub fn archive_path(output_dir: &Path, dataset_name: &str) -> PathBuf {
    output_dir.join(format!("{dataset_name}.zip"))
}

/// Zip `selected` files from `folder` into `archive`.
///
/// See [`package_frames_with_progress`].
pub fn package_frames<P: AsRef<Path>, Q: AsRef<Path>>(
    folder: P,
    selected: &[String],
    suffix: Option<&str>,
    archive: Q,
) -> Result<PackageReport, FramesetError> {
    package_frames_with_progress(folder, selected, suffix, archive, Arc::new(NoOpProgress))
}

/// Zip `selected` files from `folder` into `archive`, reporting one
/// progress step per entry.
///
/// # Errors
///
/// - [`FramesetError::EmptySelection`] when `selected` is empty. No
///   archive is created.
/// - [`FramesetError::UnknownFrame`] when a name is not a file in `folder`.
/// - [`FramesetError::InvalidSuffix`] for a suffix with path separators.
/// - I/O and zip errors while writing.
pub fn package_frames_with_progress<P: AsRef<Path>, Q: AsRef<Path>>(
    folder: P,
    selected: &[String],
    suffix: Option<&str>,
    archive: Q,
    progress: Arc<dyn ProgressCallback>,
) -> Result<PackageReport, FramesetError> {
    let folder = folder.as_ref();
    let archive = archive.as_ref();

    if selected.is_empty() {
        return Err(FramesetError::EmptySelection);
    }
    let suffix = normalize_suffix(suffix)?;

    for name in selected {
        let is_plain_name = Path::new(name).file_name() == Some(OsStr::new(name));
        if !is_plain_name || !folder.join(name).is_file() {
            return Err(FramesetError::UnknownFrame {
                name: name.clone(),
                folder: folder.to_path_buf(),
            });
        }
    }

    if let Some(parent) = archive.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    log::debug!(
        "Packaging {} frame(s) from {} into {} (suffix: {suffix:?})",
        selected.len(),
        folder.display(),
        archive.display()
    );

    let partial = partial_path(archive);
    let result = write_archive(folder, selected, suffix, &partial, progress);
    let entries = match result {
        Ok(entries) => entries,
        Err(error) => {
            let _ = fs::remove_file(&partial);
            return Err(error);
        }
    };
    fs::rename(&partial, archive)?;

    log::info!("Zipped selected frames: {}", archive.display());
    Ok(PackageReport {
        archive: archive.to_path_buf(),
        entries,
    })
}

fn write_archive(
    folder: &Path,
    selected: &[String],
    suffix: Option<&str>,
    destination: &Path,
    progress: Arc<dyn ProgressCallback>,
) -> Result<Vec<String>, FramesetError> {
    let mut zip = ZipWriter::new(BufWriter::new(File::create(destination)?));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut tracker = ProgressTracker::new(
        progress,
        OperationType::Packaging,
        Some(selected.len() as u64),
        1,
    );

    let mut entries = Vec::with_capacity(selected.len());
    for name in selected {
        let entry = entry_name(name, suffix);
        zip.start_file(entry.as_str(), options)?;
        let mut source = File::open(folder.join(name))?;
        io::copy(&mut source, &mut zip)?;
        entries.push(entry);
        tracker.advance(None);
    }

    let mut writer = zip.finish()?;
    writer.flush()?;
    tracker.finish();
    Ok(entries)
}

fn partial_path(archive: &Path) -> PathBuf {
    let mut name = archive
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    archive.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_names() {
        assert_eq!(entry_name("frame_00001.jpg", Some("sks")), "frame_00001_sks.jpg");
        assert_eq!(entry_name("frame_00001.jpg", None), "frame_00001.jpg");
        assert_eq!(entry_name("noext", Some("sks")), "noext_sks");
    }

    #[test]
    fn suffix_normalisation() {
        assert_eq!(normalize_suffix(None).unwrap(), None);
        assert_eq!(normalize_suffix(Some("   ")).unwrap(), None);
        assert_eq!(normalize_suffix(Some(" tok ")).unwrap(), Some("tok"));
        assert!(matches!(
            normalize_suffix(Some("../evil")),
            Err(FramesetError::InvalidSuffix(_))
        ));
    }

    #[test]
    fn archive_path_uses_dataset_name() {
        assert_eq!(
            archive_path(Path::new("out"), "frames_dataset"),
            PathBuf::from("out/frames_dataset.zip")
        );
    }

    #[test]
    fn partial_path_is_a_sibling() {
        assert_eq!(
            partial_path(Path::new("out/set.zip")),
            PathBuf::from("out/set.zip.partial")
        );
    }
}
