//! Internal utility functions.
//!
//! Helpers for pixel-data copying and frame file naming that are shared by
//! the decoder, the sampler and the gallery.

use std::cmp::Ordering;

use ffmpeg_next::frame::Video as VideoFrame;

/// Copy pixel data from an FFmpeg video frame into a tightly-packed RGB buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × 3).
/// This strips that padding so the result can be passed directly to
/// [`image::RgbImage::from_raw`].
pub(crate) fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_bytes = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == row_bytes {
        data[..row_bytes * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_bytes]);
        }
        buffer
    }
}

/// Filename of the `sequence`-th saved frame: `frame_00000.jpg`, …
pub fn frame_file_name(sequence: u64) -> String {
    format!("frame_{sequence:05}.jpg")
}

/// Split a filename into stem and extension (extension includes the dot).
///
/// A leading dot does not start an extension, so `.hidden` has no extension.
pub(crate) fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(0) | None => (name, ""),
        Some(index) => name.split_at(index),
    }
}

/// Order names so that runs of digits compare by value, which keeps
/// `frame_99999.jpg` ahead of `frame_100000.jpg`.
pub(crate) fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = chunks(a);
    let mut right = chunks(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match compare_chunks(x, y) {
                Ordering::Equal => {}
                order => return order,
            },
        }
    }
}

/// Split a name into alternating digit and non-digit runs.
fn chunks(name: &str) -> impl Iterator<Item = &str> {
    let mut rest = name;
    std::iter::from_fn(move || {
        let digits = rest.chars().next()?.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != digits)
            .unwrap_or(rest.len());
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}

fn compare_chunks(a: &str, b: &str) -> Ordering {
    let numeric = |chunk: &str| chunk.starts_with(|c: char| c.is_ascii_digit());
    if numeric(a) && numeric(b) {
        let a = a.trim_start_matches('0');
        let b = b.trim_start_matches('0');
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    } else {
        a.cmp(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_names_are_zero_padded() {
        assert_eq!(frame_file_name(0), "frame_00000.jpg");
        assert_eq!(frame_file_name(42), "frame_00042.jpg");
        assert_eq!(frame_file_name(123_456), "frame_123456.jpg");
    }

    #[test]
    fn split_extension_cases() {
        assert_eq!(split_extension("frame_00001.jpg"), ("frame_00001", ".jpg"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension("README"), ("README", ""));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
    }

    #[test]
    fn digit_runs_compare_by_value() {
        assert_eq!(natural_cmp("frame_99999.jpg", "frame_100000.jpg"), Ordering::Less);
        assert_eq!(natural_cmp("frame_10001.jpg", "frame_100000.jpg"), Ordering::Less);
        assert_eq!(natural_cmp("frame_00002.jpg", "frame_00010.jpg"), Ordering::Less);
        assert_eq!(natural_cmp("frame_00002.jpg", "frame_00002.jpg"), Ordering::Equal);
        assert_eq!(natural_cmp("frame_2.jpg", "frame_02.jpg"), Ordering::Greater);
        assert_eq!(natural_cmp("a.jpg", "frame_00000.jpg"), Ordering::Less);
        assert_eq!(natural_cmp("frame", "frame_00000.jpg"), Ordering::Less);
    }
}
