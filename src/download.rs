//! Video acquisition through `yt-dlp`.
//!
//! [`VideoDownloader`] runs `yt-dlp` as a child process and asks it for the
//! best video-only stream within the configured resolution and frame-rate
//! caps. Playlist expansion and certificate validation are both disabled.
//! `yt-dlp` prints the title and the final file path once the file is in
//! place, and those two lines are all the downloader reads from its output.
//!
//! # Example
//!
//! ```no_run
//! use frameset::{DownloadOptions, FramesetError, VideoDownloader};
//!
//! let downloader = VideoDownloader::new(DownloadOptions::new());
//! let video = downloader.download("https://www.youtube.com/watch?v=...", "videos")?;
//! println!("Downloaded video: {}", video.title);
//! # Ok::<(), FramesetError>(())
//! ```

use std::{
    ffi::OsString,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    process::{Command, Output},
};

use crate::{config::DownloadOptions, error::FramesetError};

/// A video that is on disk after a successful download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedVideo {
    pub path: PathBuf,
    pub title: String,
}

/// Downloads videos by shelling out to `yt-dlp`.
#[derive(Debug, Clone, Default)]
pub struct VideoDownloader {
    options: DownloadOptions,
}

impl VideoDownloader {
    pub fn new(options: DownloadOptions) -> Self {
        Self { options }
    }

    /// Arguments passed to the downloader for `url`, writing into `output_dir`.
    pub fn arguments(&self, url: &str, output_dir: &Path) -> Vec<OsString> {
        let template = output_dir.join("%(title)s.%(ext)s");
        vec![
            "--format".into(),
            self.options.format_selector().into(),
            "--no-playlist".into(),
            "--no-check-certificates".into(),
            "--no-simulate".into(),
            "--output".into(),
            template.into_os_string(),
            "--print".into(),
            "after_move:title".into(),
            "--print".into(),
            "after_move:filepath".into(),
            "--".into(),
            url.into(),
        ]
    }

    /// Download `url` into `output_dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// - [`FramesetError::DownloaderMissing`] when no launcher could start.
    /// - [`FramesetError::Download`] when `yt-dlp` fails, or reports a file
    ///   that is missing or empty.
    pub fn download<P: AsRef<Path>>(
        &self,
        url: &str,
        output_dir: P,
    ) -> Result<DownloadedVideo, FramesetError> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;

        log::debug!(
            "Downloading {url} into {} ({})",
            output_dir.display(),
            self.options.format_selector()
        );

        let output = spawn_first(
            url,
            &launchers(&self.options.program),
            &self.arguments(url, output_dir),
        )?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(FramesetError::Download {
                url: url.to_string(),
                reason: if stderr.is_empty() {
                    format!("yt-dlp exited with {}", output.status)
                } else {
                    stderr
                },
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (title, path) = parse_printed_output(&stdout).ok_or_else(|| {
            FramesetError::Download {
                url: url.to_string(),
                reason: "yt-dlp did not report an output file".to_string(),
            }
        })?;
        let path = if path.is_absolute() || path.starts_with(output_dir) {
            path
        } else {
            output_dir.join(path)
        };

        let size = fs::metadata(&path)
            .map_err(|_| FramesetError::Download {
                url: url.to_string(),
                reason: format!("yt-dlp reported a missing file: {}", path.display()),
            })?
            .len();
        if size == 0 {
            return Err(FramesetError::Download {
                url: url.to_string(),
                reason: format!("yt-dlp downloaded an empty file: {}", path.display()),
            });
        }

        log::info!("Downloaded \"{title}\" to {} ({size} bytes)", path.display());
        Ok(DownloadedVideo { path, title })
    }

}

/// Run the first launcher that can be started and wait for it.
fn spawn_first(
    url: &str,
    launchers: &[(String, Vec<&str>)],
    arguments: &[OsString],
) -> Result<Output, FramesetError> {
    let mut tried = Vec::new();
    for (program, prefix) in launchers {
        match Command::new(program).args(prefix).args(arguments).output() {
            Ok(output) => return Ok(output),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                log::debug!("{program} not found, trying next launcher");
                tried.push(program.as_str());
            }
            Err(error) => {
                return Err(FramesetError::Download {
                    url: url.to_string(),
                    reason: format!("{program} could not start: {error}"),
                });
            }
        }
    }
    Err(FramesetError::DownloaderMissing {
        tried: tried.join(", "),
    })
}

/// Candidate launchers: the configured program, then the Python module.
fn launchers(program: &str) -> Vec<(String, Vec<&'static str>)> {
    vec![
        (program.to_string(), Vec::new()),
        ("python3".to_string(), vec!["-m", "yt_dlp"]),
        ("python".to_string(), vec!["-m", "yt_dlp"]),
    ]
}

/// Extract `(title, filepath)` from the downloader's printed output.
///
/// The title and path are the last two non-empty lines, in that order.
pub fn parse_printed_output(stdout: &str) -> Option<(String, PathBuf)> {
    let lines = stdout.lines().map(str::trim).filter(|line| !line.is_empty());
    let mut previous = None;
    let mut last = None;
    for line in lines {
        previous = last.replace(line);
    }
    let path = last?;
    let title = previous.unwrap_or(path);
    Some((title.to_string(), PathBuf::from(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_disable_playlists_and_certificates() {
        let downloader = VideoDownloader::new(DownloadOptions::new());
        let args: Vec<String> = downloader
            .arguments("https://example.com/v", Path::new("videos"))
            .into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();

        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"--no-check-certificates".to_string()));
        let format_index = args.iter().position(|arg| arg == "--format").unwrap();
        assert_eq!(
            args[format_index + 1],
            "bestvideo[ext=mp4][height<=2160][fps<=60]"
        );
        let output_index = args.iter().position(|arg| arg == "--output").unwrap();
        assert!(args[output_index + 1].ends_with("%(title)s.%(ext)s"));
        assert_eq!(args.last().unwrap(), "https://example.com/v");
    }

    #[test]
    fn parses_title_and_path() {
        let stdout = "My Clip\nvideos/My Clip.mp4\n";
        let (title, path) = parse_printed_output(stdout).unwrap();
        assert_eq!(title, "My Clip");
        assert_eq!(path, PathBuf::from("videos/My Clip.mp4"));
    }

    #[test]
    fn ignores_leading_noise_and_blank_lines() {
        let stdout = "[info] something\n\nTitle\n  /abs/Title.mp4  \n\n";
        let (title, path) = parse_printed_output(stdout).unwrap();
        assert_eq!(title, "Title");
        assert_eq!(path, PathBuf::from("/abs/Title.mp4"));
    }

    #[test]
    fn empty_output_has_no_file() {
        assert_eq!(parse_printed_output("\n \n"), None);
    }

    #[test]
    fn configured_program_is_tried_first() {
        let order: Vec<String> = launchers("/opt/bin/yt-dlp")
            .into_iter()
            .map(|(program, _)| program)
            .collect();
        assert_eq!(order, vec!["/opt/bin/yt-dlp", "python3", "python"]);
    }

    // ── Subprocess handling ──

    #[cfg(unix)]
    mod scripted {
        use std::{fs, os::unix::fs::PermissionsExt, sync::Mutex};

        use super::*;

        /// Scripts are written and run one at a time so no child inherits
        /// a descriptor still open for writing.
        static SPAWN_LOCK: Mutex<()> = Mutex::new(());

        fn download_with(script: &str, output_dir: &Path) -> Result<DownloadedVideo, FramesetError> {
            let _guard = SPAWN_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let bin = tempfile::tempdir().unwrap();
            let program = bin.path().join("fake-yt-dlp");
            fs::write(&program, format!("#!/bin/sh\n{script}\n")).unwrap();
            fs::set_permissions(&program, fs::Permissions::from_mode(0o755)).unwrap();

            let options = DownloadOptions::new().with_program(program.to_string_lossy());
            VideoDownloader::new(options).download("https://example.com/v", output_dir)
        }

        fn reason(result: Result<DownloadedVideo, FramesetError>) -> String {
            match result {
                Err(FramesetError::Download { url, reason }) => {
                    assert_eq!(url, "https://example.com/v");
                    reason
                }
                other => panic!("expected a download error, got {other:?}"),
            }
        }

        #[test]
        fn failing_downloader_reports_its_stderr() {
            let out = tempfile::tempdir().unwrap();
            let result = download_with("echo 'ERROR: Unsupported URL' >&2\nexit 1", out.path());
            assert_eq!(reason(result), "ERROR: Unsupported URL");
        }

        #[test]
        fn silent_failure_reports_the_exit_status() {
            let out = tempfile::tempdir().unwrap();
            let result = download_with("exit 3", out.path());
            assert!(reason(result).starts_with("yt-dlp exited with"));
        }

        #[test]
        fn reported_file_must_exist() {
            let out = tempfile::tempdir().unwrap();
            let missing = out.path().join("gone.mp4");
            let script = format!("echo Gone\necho '{}'", missing.display());
            let reason = reason(download_with(&script, out.path()));
            assert!(reason.contains("missing file"), "{reason}");
        }

        #[test]
        fn reported_file_must_not_be_empty() {
            let out = tempfile::tempdir().unwrap();
            let empty = out.path().join("empty.mp4");
            fs::write(&empty, b"").unwrap();
            let script = format!("echo Empty\necho '{}'", empty.display());
            let reason = reason(download_with(&script, out.path()));
            assert!(reason.contains("empty file"), "{reason}");
        }

        #[test]
        fn relative_path_is_resolved_against_output_dir() {
            let out = tempfile::tempdir().unwrap();
            fs::write(out.path().join("clip.mp4"), b"video bytes").unwrap();
            let video = download_with("echo 'My Clip'\necho clip.mp4", out.path()).unwrap();
            assert_eq!(video.title, "My Clip");
            assert_eq!(video.path, out.path().join("clip.mp4"));
        }

        #[test]
        fn no_launcher_found_is_downloader_missing() {
            let launchers = vec![
                ("/nonexistent/frameset-yt-dlp".to_string(), Vec::new()),
                ("/nonexistent/frameset-python".to_string(), vec!["-m", "yt_dlp"]),
            ];
            let result = spawn_first("https://example.com/v", &launchers, &[]);
            match result {
                Err(FramesetError::DownloaderMissing { tried }) => assert_eq!(
                    tried,
                    "/nonexistent/frameset-yt-dlp, /nonexistent/frameset-python"
                ),
                other => panic!("expected DownloaderMissing, got {other:?}"),
            }
        }
    }
}
