use std::{
    cell::RefCell,
    error::Error,
    fmt,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use frameset::{
    DEFAULT_DATASET_NAME, DEFAULT_FRAME_INTERVAL, DownloadOptions, FfmpegLogLevel, FrameSampler,
    FramesetError, Gallery, OperationType, ProgressCallback, ProgressInfo, Reporter, RunRequest,
    SamplerOptions, Session, Workflow, Workspace, WorkspaceConfig, normalize_dataset_name,
    package::archive_path, package_frames, package_frames_with_progress,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  frameset run https://www.youtube.com/watch?v=VIDEO --interval 25 --trigger-word mytoken\n  frameset run https://youtu.be/VIDEO --yes --name my_set --progress\n  frameset sample input.mp4 --out frames --json\n  frameset pack extracted_frames --name my_set\n  frameset clean\n  frameset completions zsh > _frameset";

/// Columns and thumbnail width of the `--contact-sheet` preview.
const SHEET_COLUMNS: u32 = 3;
const SHEET_THUMBNAIL_WIDTH: u32 = 320;

#[derive(Debug, Parser)]
#[command(
    name = "frameset",
    version,
    about = "Build image datasets from the frames of online videos",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone)]
struct GlobalOptions {
    /// Show additional logging output.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar while sampling and packaging.
    #[arg(long)]
    progress: bool,

    /// Allow overwriting an existing archive.
    #[arg(long)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<String>,

    /// Directory for downloaded videos.
    #[arg(long, default_value = "videos")]
    videos_dir: PathBuf,

    /// Directory for sampled frames.
    #[arg(long, default_value = "extracted_frames")]
    frames_dir: PathBuf,

    /// Directory the archive is written to.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download, sample, select and package in one go.
    #[command(
        about = "Run the full workflow for a video link",
        after_help = "Examples:\n  frameset run https://youtu.be/VIDEO\n  frameset run https://youtu.be/VIDEO --interval 10 --contact-sheet sheet.jpg"
    )]
    Run {
        /// Video link understood by yt-dlp.
        url: String,
        /// Keep every Nth decoded frame.
        #[arg(long, default_value_t = DEFAULT_FRAME_INTERVAL)]
        interval: u64,
        /// Dataset name; the archive is written as NAME.zip.
        #[arg(long, default_value = DEFAULT_DATASET_NAME)]
        name: String,
        /// Suffix appended to every archived filename.
        #[arg(long)]
        trigger_word: Option<String>,
        /// Keep every extracted frame without prompting.
        #[arg(long)]
        yes: bool,
        /// Write a thumbnail preview of the frames before selecting.
        #[arg(long)]
        contact_sheet: Option<PathBuf>,
    },

    /// Sample a local video file.
    #[command(
        about = "Sample frames from a local video",
        after_help = "Examples:\n  frameset sample input.mp4 --out frames\n  frameset sample input.mp4 --out frames --interval 5 --json"
    )]
    Sample {
        /// Input video path.
        input: PathBuf,
        /// Output directory for the sampled frames.
        #[arg(long)]
        out: PathBuf,
        /// Keep every Nth decoded frame.
        #[arg(long, default_value_t = DEFAULT_FRAME_INTERVAL)]
        interval: u64,
        /// Output the sampling report as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Zip every frame in a directory.
    #[command(about = "Package a directory of frames")]
    Pack {
        /// Directory holding the frames.
        dir: PathBuf,
        /// Dataset name; the archive is written as NAME.zip.
        #[arg(long, default_value = DEFAULT_DATASET_NAME)]
        name: String,
        /// Suffix appended to every archived filename.
        #[arg(long)]
        trigger_word: Option<String>,
    },

    /// Remove the working directories.
    #[command(about = "Remove downloaded videos and sampled frames")]
    Clean,

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// A failure the workflow has already shown to the user.
#[derive(Debug)]
struct Reported;

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("run failed")
    }
}

impl Error for Reported {}

fn parse_log_level(value: &str) -> Option<FfmpegLogLevel> {
    match value.to_ascii_lowercase().as_str() {
        "quiet" => Some(FfmpegLogLevel::Quiet),
        "panic" => Some(FfmpegLogLevel::Panic),
        "fatal" => Some(FfmpegLogLevel::Fatal),
        "error" => Some(FfmpegLogLevel::Error),
        "warning" | "warn" => Some(FfmpegLogLevel::Warning),
        "info" => Some(FfmpegLogLevel::Info),
        "verbose" => Some(FfmpegLogLevel::Verbose),
        "debug" => Some(FfmpegLogLevel::Debug),
        "trace" => Some(FfmpegLogLevel::Trace),
        _ => None,
    }
}

fn default_log_filter(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "warn" }
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

/// Resolve the archive for a dataset name and make sure it may be written.
fn dataset_archive(
    output_dir: &Path,
    name: &str,
    overwrite: bool,
) -> Result<(String, PathBuf), Box<dyn Error>> {
    let name = normalize_dataset_name(name);
    let archive = archive_path(output_dir, &name);
    ensure_writable_path(&archive, overwrite)?;
    Ok((name, archive))
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_log_filter(global.verbose)),
    )
    .init();

    if let Some(level) = &global.log_level {
        let parsed = parse_log_level(level).ok_or(format!("unsupported --log-level: {level}"))?;
        frameset::set_ffmpeg_log_level(parsed);
    }
    Ok(())
}

fn workspace_config(global: &GlobalOptions) -> WorkspaceConfig {
    WorkspaceConfig::new()
        .with_videos_dir(&global.videos_dir)
        .with_frames_dir(&global.frames_dir)
        .with_output_dir(&global.output_dir)
}

/// Drives an indicatif bar from library progress reports.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new(label: &'static str) -> Result<Self, Box<dyn Error>> {
        let bar = ProgressBar::new(0);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        bar.set_message(label);
        Ok(Self { bar })
    }
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
        if info.total.is_some_and(|total| info.current >= total) {
            self.bar.finish_and_clear();
        }
    }
}

fn progress_callback(
    enabled: bool,
    operation: OperationType,
) -> Result<Option<Arc<dyn ProgressCallback>>, Box<dyn Error>> {
    if !enabled {
        return Ok(None);
    }
    let label = match operation {
        OperationType::FrameSampling => "sampling",
        OperationType::Packaging => "packaging",
        _ => "working",
    };
    Ok(Some(Arc::new(BarProgress::new(label)?)))
}

/// Prints workflow messages: successes to `out`, everything else to `err`.
struct TerminalReporter<O = io::Stdout, E = io::Stderr> {
    out: RefCell<O>,
    err: RefCell<E>,
}

impl TerminalReporter {
    fn new() -> Self {
        Self {
            out: RefCell::new(io::stdout()),
            err: RefCell::new(io::stderr()),
        }
    }
}

impl<O: Write, E: Write> Reporter for TerminalReporter<O, E> {
    fn success(&self, message: &str) {
        let _ = writeln!(self.out.borrow_mut(), "{} {}", "success:".green().bold(), message);
    }

    fn info(&self, message: &str) {
        let _ = writeln!(self.err.borrow_mut(), "{} {}", "info:".cyan().bold(), message);
    }

    fn warning(&self, message: &str) {
        let _ = writeln!(
            self.err.borrow_mut(),
            "{} {}",
            "warning:".yellow().bold(),
            message.yellow()
        );
    }

    fn error(&self, message: &str) {
        let _ = writeln!(self.err.borrow_mut(), "{} {}", "error:".red().bold(), message);
    }
}

fn sampler_options(global: &GlobalOptions, interval: u64) -> Result<SamplerOptions, Box<dyn Error>> {
    let mut options = SamplerOptions::new().with_interval(interval);
    if let Some(callback) = progress_callback(global.progress, OperationType::FrameSampling)? {
        options = options.with_progress(callback);
    }
    Ok(options)
}

fn select_frames(
    gallery: &mut Gallery,
    accept_all: bool,
    contact_sheet: Option<&Path>,
) -> Result<Vec<String>, FramesetError> {
    if let Some(path) = contact_sheet {
        gallery
            .contact_sheet(SHEET_COLUMNS, SHEET_THUMBNAIL_WIDTH)?
            .save(path)?;
        println!(
            "{} {}",
            "preview:".cyan().bold(),
            format!("contact sheet written to {}", path.display()).cyan()
        );
    }
    if accept_all {
        return Ok(gallery.selected());
    }
    gallery.run_interactive(io::stdin().lock(), io::stdout().lock())
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;
    let reporter = TerminalReporter::new();

    match cli.command {
        Commands::Run {
            url,
            interval,
            name,
            trigger_word,
            yes,
            contact_sheet,
        } => {
            let (name, _) = dataset_archive(&cli.global.output_dir, &name, cli.global.overwrite)?;

            let mut workflow = Workflow::new(
                Workspace::new(workspace_config(&cli.global)),
                DownloadOptions::new(),
            )
            .with_sampler_options(sampler_options(&cli.global, interval)?);
            if let Some(callback) = progress_callback(cli.global.progress, OperationType::Packaging)? {
                workflow = workflow.with_packaging_progress(callback);
            }

            let request = RunRequest::new(url)
                .with_interval(interval)
                .with_dataset_name(name)
                .with_trigger_word(trigger_word);
            let mut session = Session::new();
            let outcome = workflow
                .run(
                    &mut session,
                    request,
                    |gallery| select_frames(gallery, yes, contact_sheet.as_deref()),
                    &reporter,
                )
                .map_err(|_| Reported)?;

            if cli.global.verbose {
                eprintln!(
                    "{} {} of {} candidate frames kept from {}",
                    "info:".cyan().bold(),
                    outcome.sampling.saved.len(),
                    outcome.sampling.candidates,
                    outcome.video_title
                );
            }
        }
        Commands::Sample {
            input,
            out,
            interval,
            json,
        } => {
            let sampler = FrameSampler::new(sampler_options(&cli.global, interval)?);
            let report = sampler.sample_file(&input, &out)?;

            if json {
                let payload = json!({
                    "input": input.display().to_string(),
                    "output_dir": out.display().to_string(),
                    "interval": interval,
                    "frames_decoded": report.frames_decoded,
                    "candidates": report.candidates,
                    "saved": report
                        .saved
                        .iter()
                        .map(|path| path.display().to_string())
                        .collect::<Vec<_>>(),
                    "rejected": report
                        .rejected
                        .iter()
                        .map(|frame| json!({
                            "position": frame.position,
                            "reason": frame.reason.to_string(),
                        }))
                        .collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                reporter.success(&format!(
                    "Extracted {} frames from the video.",
                    report.saved.len()
                ));
                for frame in &report.rejected {
                    reporter.info(&format!(
                        "Skipping {} frame at position {}",
                        frame.reason, frame.position
                    ));
                }
            }
        }
        Commands::Pack {
            dir,
            name,
            trigger_word,
        } => {
            let (_, archive) = dataset_archive(&cli.global.output_dir, &name, cli.global.overwrite)?;

            let gallery = Gallery::load(&dir)?;
            let selected = gallery.selected();
            let report = match progress_callback(cli.global.progress, OperationType::Packaging)? {
                Some(progress) => package_frames_with_progress(
                    gallery.folder(),
                    &selected,
                    trigger_word.as_deref(),
                    &archive,
                    progress,
                )?,
                None => package_frames(gallery.folder(), &selected, trigger_word.as_deref(), &archive)?,
            };
            reporter.success(&format!(
                "Zipped {} frames: {}",
                report.entries.len(),
                report.archive.display()
            ));
        }
        Commands::Clean => {
            let workspace = Workspace::new(workspace_config(&cli.global));
            workspace.check_layout()?;
            let warnings = workspace.reset();
            for warning in &warnings {
                reporter.warning(&warning.to_string());
            }
            if warnings.is_empty() {
                reporter.success("Removed working directories.");
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "frameset", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        if !error.is::<Reported>() {
            eprintln!("{} {error}", "error:".red().bold());
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, fs};

    use super::{
        Cli, Commands, Reporter, TerminalReporter, dataset_archive, default_log_filter,
        parse_log_level,
    };
    use clap::Parser;

    fn captured() -> TerminalReporter<Vec<u8>, Vec<u8>> {
        TerminalReporter {
            out: RefCell::new(Vec::new()),
            err: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn parse_log_level_aliases() {
        assert!(parse_log_level("quiet").is_some());
        assert!(parse_log_level("WARN").is_some());
        assert!(parse_log_level("warning").is_some());
        assert!(parse_log_level("trace").is_some());
        assert!(parse_log_level("loud").is_none());
    }

    #[test]
    fn verbose_raises_log_filter() {
        assert_eq!(default_log_filter(true), "debug");
        assert_eq!(default_log_filter(false), "warn");
    }

    #[test]
    fn run_defaults() {
        let cli = Cli::try_parse_from(["frameset", "run", "https://youtu.be/x"]).unwrap();
        match cli.command {
            Commands::Run {
                interval,
                name,
                trigger_word,
                yes,
                ..
            } => {
                assert_eq!(interval, 50);
                assert_eq!(name, "frames_dataset");
                assert_eq!(trigger_word, None);
                assert!(!yes);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.global.frames_dir.to_str(), Some("extracted_frames"));
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "frameset",
            "--verbose",
            "--videos-dir",
            "/tmp/v",
            "pack",
            "frames",
            "--trigger-word",
            "sks",
        ])
        .unwrap();
        assert!(cli.global.verbose);
        assert_eq!(cli.global.videos_dir.to_str(), Some("/tmp/v"));
        assert!(matches!(cli.command, Commands::Pack { .. }));
    }

    #[test]
    fn info_messages_are_shown_without_verbose() {
        let reporter = captured();
        reporter.info("Skipping mostly black frame at position 100");
        reporter.success("Extracted 3 frames from the video.");

        let err = String::from_utf8(reporter.err.into_inner()).unwrap();
        let out = String::from_utf8(reporter.out.into_inner()).unwrap();
        assert!(err.contains("Skipping mostly black frame at position 100"));
        assert!(out.contains("Extracted 3 frames from the video."));
    }

    #[test]
    fn blank_name_checks_the_default_archive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("frames_dataset.zip"), b"existing").unwrap();

        assert!(dataset_archive(dir.path(), "", false).is_err());
        assert!(dataset_archive(dir.path(), "  frames_dataset ", false).is_err());

        let (name, archive) = dataset_archive(dir.path(), "", true).unwrap();
        assert_eq!(name, "frames_dataset");
        assert_eq!(archive, dir.path().join("frames_dataset.zip"));

        let (name, archive) = dataset_archive(dir.path(), " my_set ", false).unwrap();
        assert_eq!(name, "my_set");
        assert_eq!(archive, dir.path().join("my_set.zip"));
    }
}
