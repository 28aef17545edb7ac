//! Frame selection gallery.
//!
//! [`Gallery`] lists the extracted frames in frame-number order and keeps an
//! inclusion toggle per frame, on by default. The terminal front end drives
//! it through [`Gallery::run_interactive`], a small line-oriented command
//! loop over any reader and writer. For an actual look at the frames,
//! [`Gallery::contact_sheet`] composites thumbnails of every entry into one
//! image, laid out in the same order as the checkbox grid.

use std::{
    fs,
    io::{BufRead, Write},
    ops::RangeInclusive,
    path::{Path, PathBuf},
};

use image::{DynamicImage, GenericImage, imageops::FilterType};

use crate::{error::FramesetError, utilities::natural_cmp};

/// Columns used by the checkbox grid when none are specified.
pub const DEFAULT_COLUMNS: usize = 3;

/// One frame in the gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryEntry {
    pub name: String,
    pub included: bool,
}

/// A parsed gallery command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryCommand {
    /// Flip the entries in a 1-based inclusive range.
    Toggle(RangeInclusive<usize>),
    IncludeAll,
    ExcludeAll,
    Show,
    Done,
    Quit,
}

/// Parse one line of gallery input.
///
/// Accepts `N`, `A-B`, `all`, `none`, `show`, `done` (or an empty line) and
/// `quit`. Returns `None` for anything else.
pub fn parse_command(line: &str) -> Option<GalleryCommand> {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "" | "done" | "d" => return Some(GalleryCommand::Done),
        "all" | "a" => return Some(GalleryCommand::IncludeAll),
        "none" | "n" => return Some(GalleryCommand::ExcludeAll),
        "show" | "s" | "ls" => return Some(GalleryCommand::Show),
        "quit" | "q" => return Some(GalleryCommand::Quit),
        _ => {}
    }

    let (start, end) = match line.split_once('-') {
        Some((start, end)) => (
            start.trim().parse::<usize>().ok()?,
            end.trim().parse::<usize>().ok()?,
        ),
        None => {
            let index = line.parse::<usize>().ok()?;
            (index, index)
        }
    };
    if start == 0 || end < start {
        return None;
    }
    Some(GalleryCommand::Toggle(start..=end))
}

/// The extracted frames and their inclusion toggles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gallery {
    folder: PathBuf,
    entries: Vec<GalleryEntry>,
}

impl Gallery {
    /// List the regular files in `folder`, all included. Names are sorted
    /// with digit runs compared by value.
    ///
    /// # Errors
    ///
    /// I/O errors from reading the directory.
    pub fn load<P: AsRef<Path>>(folder: P) -> Result<Self, FramesetError> {
        let folder = folder.as_ref();
        let mut names = Vec::new();
        for entry in fs::read_dir(folder)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort_by(|a, b| natural_cmp(a, b));
        log::debug!("Gallery loaded {} frame(s) from {}", names.len(), folder.display());
        Ok(Self::from_names(folder, names))
    }

    /// Build a gallery from already-known names, all included.
    pub fn from_names<P: AsRef<Path>>(folder: P, names: Vec<String>) -> Self {
        Self {
            folder: folder.as_ref().to_path_buf(),
            entries: names
                .into_iter()
                .map(|name| GalleryEntry {
                    name,
                    included: true,
                })
                .collect(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flip entry `index` (0-based). Returns `false` when out of range.
    pub fn toggle(&mut self, index: usize) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                entry.included = !entry.included;
                true
            }
            None => false,
        }
    }

    /// Flip every entry of a 1-based inclusive range. Returns `false`, and
    /// changes nothing, if the range runs past the end.
    pub fn toggle_range(&mut self, range: RangeInclusive<usize>) -> bool {
        let (start, end) = (*range.start(), *range.end());
        if start == 0 || end > self.entries.len() || end < start {
            return false;
        }
        for index in start - 1..end {
            self.toggle(index);
        }
        true
    }

    pub fn set_all(&mut self, included: bool) {
        for entry in &mut self.entries {
            entry.included = included;
        }
    }

    /// Names still toggled on, in gallery order.
    pub fn selected(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.included)
            .map(|entry| entry.name.clone())
            .collect()
    }

    /// Render the checkbox grid, `columns` entries per row.
    pub fn render_grid(&self, columns: usize) -> String {
        let columns = columns.max(1);
        let number_width = self.entries.len().to_string().len();
        let cells: Vec<String> = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                format!(
                    "{:>number_width$}. [{}] {}",
                    index + 1,
                    if entry.included { 'x' } else { ' ' },
                    entry.name
                )
            })
            .collect();
        let cell_width = cells.iter().map(String::len).max().unwrap_or(0);

        let mut grid = String::new();
        for row in cells.chunks(columns) {
            let line = row
                .iter()
                .map(|cell| format!("{cell:<cell_width$}"))
                .collect::<Vec<_>>()
                .join("  ");
            grid.push_str(line.trim_end());
            grid.push('\n');
        }
        grid.push_str(&format!(
            "{} of {} frame(s) selected\n",
            self.selected().len(),
            self.entries.len()
        ));
        grid
    }

    /// Let the user toggle entries until `done`, then return the selection.
    ///
    /// End of input counts as `done`; `quit` returns an empty selection.
    ///
    /// # Errors
    ///
    /// I/O errors from `input` or `output`.
    pub fn run_interactive<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        mut output: W,
    ) -> Result<Vec<String>, FramesetError> {
        write!(output, "{}", self.render_grid(DEFAULT_COLUMNS))?;
        loop {
            write!(output, "toggle N or A-B, all, none, show, done, quit > ")?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                return Ok(self.selected());
            }

            match parse_command(&line) {
                Some(GalleryCommand::Toggle(range)) => {
                    if !self.toggle_range(range.clone()) {
                        writeln!(
                            output,
                            "no frame {}-{} (gallery has {})",
                            range.start(),
                            range.end(),
                            self.entries.len()
                        )?;
                    }
                }
                Some(GalleryCommand::IncludeAll) => self.set_all(true),
                Some(GalleryCommand::ExcludeAll) => self.set_all(false),
                Some(GalleryCommand::Show) => {
                    write!(output, "{}", self.render_grid(DEFAULT_COLUMNS))?;
                }
                Some(GalleryCommand::Done) => return Ok(self.selected()),
                Some(GalleryCommand::Quit) => return Ok(Vec::new()),
                None => writeln!(output, "unrecognised command: {}", line.trim())?,
            }
        }
    }

    /// Composite a thumbnail of every entry into one image.
    ///
    /// Thumbnails are `thumbnail_width` wide, keep the first frame's aspect
    /// ratio, and are laid out row-major over `columns` columns.
    ///
    /// # Errors
    ///
    /// Image decoding errors, or I/O errors reading the frames.
    pub fn contact_sheet(
        &self,
        columns: u32,
        thumbnail_width: u32,
    ) -> Result<DynamicImage, FramesetError> {
        let columns = columns.max(1);
        let thumbnail_width = thumbnail_width.max(1);
        if self.entries.is_empty() {
            return Ok(DynamicImage::new_rgb8(thumbnail_width, 1));
        }

        let mut thumbnail_height = None;
        let mut thumbnails = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let frame = image::open(self.folder.join(&entry.name))?;
            let height = *thumbnail_height.get_or_insert_with(|| {
                scaled_height(frame.width(), frame.height(), thumbnail_width)
            });
            thumbnails.push(frame.resize_exact(thumbnail_width, height, FilterType::Triangle));
        }

        let thumbnail_height = thumbnail_height.unwrap_or(1);
        let rows = (self.entries.len() as u32).div_ceil(columns);
        let mut sheet = DynamicImage::new_rgb8(thumbnail_width * columns, thumbnail_height * rows);
        for (index, thumbnail) in thumbnails.iter().enumerate() {
            let x = (index as u32 % columns) * thumbnail_width;
            let y = (index as u32 / columns) * thumbnail_height;
            sheet.copy_from(thumbnail, x, y)?;
        }
        Ok(sheet)
    }
}

fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == 0 {
        return target_width;
    }
    let scale = target_width as f64 / width as f64;
    ((height as f64 * scale).round() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utilities::frame_file_name;

    fn gallery(count: usize) -> Gallery {
        let names = (0..count as u64).map(frame_file_name).collect();
        Gallery::from_names("frames", names)
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("3"), Some(GalleryCommand::Toggle(3..=3)));
        assert_eq!(parse_command(" 2 - 5 "), Some(GalleryCommand::Toggle(2..=5)));
        assert_eq!(parse_command(""), Some(GalleryCommand::Done));
        assert_eq!(parse_command("ALL"), Some(GalleryCommand::IncludeAll));
        assert_eq!(parse_command("none"), Some(GalleryCommand::ExcludeAll));
        assert_eq!(parse_command("q"), Some(GalleryCommand::Quit));
        assert_eq!(parse_command("0"), None);
        assert_eq!(parse_command("5-2"), None);
        assert_eq!(parse_command("banana"), None);
    }

    #[test]
    fn everything_starts_selected() {
        let gallery = gallery(4);
        assert_eq!(gallery.selected().len(), 4);
    }

    #[test]
    fn toggles_and_ranges() {
        let mut gallery = gallery(5);
        assert!(gallery.toggle(0));
        assert!(gallery.toggle_range(3..=4));
        assert!(!gallery.toggle_range(4..=9));
        assert!(!gallery.toggle(5));
        assert_eq!(
            gallery.selected(),
            vec!["frame_00001.jpg", "frame_00004.jpg"]
        );
    }

    #[test]
    fn grid_marks_toggles() {
        let mut gallery = gallery(4);
        gallery.toggle(1);
        let grid = gallery.render_grid(3);
        let lines: Vec<&str> = grid.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("1. [x] frame_00000.jpg"));
        assert!(lines[0].contains("2. [ ] frame_00001.jpg"));
        assert!(lines[1].starts_with("4. [x] frame_00003.jpg"));
        assert_eq!(lines[2], "3 of 4 frame(s) selected");
    }

    #[test]
    fn interactive_session() {
        let mut gallery = gallery(4);
        let input = b"2\n3-4\nwhat\nshow\ndone\n".as_slice();
        let mut output = Vec::new();
        let selected = gallery.run_interactive(input, &mut output).unwrap();
        assert_eq!(selected, vec!["frame_00000.jpg"]);
        let transcript = String::from_utf8(output).unwrap();
        assert!(transcript.contains("unrecognised command: what"));
    }

    #[test]
    fn end_of_input_keeps_selection_and_quit_clears_it() {
        let mut gallery = gallery(2);
        let kept = gallery.run_interactive(b"".as_slice(), Vec::new()).unwrap();
        assert_eq!(kept.len(), 2);

        let dropped = gallery.run_interactive(b"quit\n".as_slice(), Vec::new()).unwrap();
        assert!(dropped.is_empty());
    }

    #[test]
    fn load_orders_six_digit_names_after_five() {
        let dir = tempfile::tempdir().unwrap();
        for sequence in [100_000, 10_001, 99_999, 2] {
            fs::write(dir.path().join(frame_file_name(sequence)), b"x").unwrap();
        }
        let gallery = Gallery::load(dir.path()).unwrap();
        assert_eq!(
            gallery.selected(),
            vec![
                "frame_00002.jpg",
                "frame_10001.jpg",
                "frame_99999.jpg",
                "frame_100000.jpg"
            ]
        );
    }
}
