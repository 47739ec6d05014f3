use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{LottiecapError, LottiecapResult};

// Printf-style integer directive: `%d`, optionally zero-padded/width-specified
// (`%012d`, `%5d`).
static FRAME_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%0?\d*d").expect("frame placeholder regex"));

/// How the rendered frames leave the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputKind {
    /// One raster image at the output path (frame 1, or an explicit override).
    StillImage,
    /// One raster image per frame, index substituted into the path pattern.
    NumberedSequence,
    /// Frames piped into a long-lived ffmpeg process producing one MP4.
    StreamingVideo,
    /// Frames staged to disk, consumed by one gifski invocation at the end.
    BatchEncodedLoop,
}

/// Per-frame raster encoding captured from the page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg,
}

#[derive(Clone, Debug)]
pub struct OutputTarget {
    pub kind: OutputKind,
    pub format: RasterFormat,
    pub path: PathBuf,
}

impl OutputTarget {
    pub fn is_multi_frame(&self) -> bool {
        !matches!(self.kind, OutputKind::StillImage)
    }
}

/// Classify the requested output path into an [`OutputTarget`].
///
/// Pure function of the path string: extension (case-insensitive) picks the
/// format, a frame placeholder turns an image output into a numbered
/// sequence. `.mp4` is always multi-frame; `.gif` always renders a staged PNG
/// sequence internally. Any other extension is rejected before any rendering
/// starts.
pub fn classify_output(path: &Path) -> LottiecapResult<OutputTarget> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let has_placeholder = contains_frame_placeholder(&path.to_string_lossy());

    let (kind, format) = match ext.as_str() {
        "png" | "jpg" | "jpeg" => {
            let format = if ext == "png" {
                RasterFormat::Png
            } else {
                RasterFormat::Jpeg
            };
            let kind = if has_placeholder {
                OutputKind::NumberedSequence
            } else {
                OutputKind::StillImage
            };
            (kind, format)
        }
        "mp4" => (OutputKind::StreamingVideo, RasterFormat::Png),
        "gif" => (OutputKind::BatchEncodedLoop, RasterFormat::Png),
        "" => {
            return Err(LottiecapError::unsupported(format!(
                "output '{}' has no file extension",
                path.display()
            )));
        }
        other => {
            return Err(LottiecapError::unsupported(format!(
                "output extension '.{other}' is not supported (expected png, jpg, jpeg, mp4 or gif)"
            )));
        }
    };

    Ok(OutputTarget {
        kind,
        format,
        path: path.to_path_buf(),
    })
}

pub fn contains_frame_placeholder(path: &str) -> bool {
    FRAME_PLACEHOLDER.is_match(path)
}

/// Substitute a frame index into the first placeholder of a path pattern
/// (`frame-%d.png`, `frame-%012d.png`). A pattern without a placeholder is
/// returned unchanged.
pub fn render_pattern(pattern: &str, frame: u64) -> String {
    let Some(m) = FRAME_PLACEHOLDER.find(pattern) else {
        return pattern.to_string();
    };

    let directive = &pattern[m.start() + 1..m.end() - 1]; // between '%' and 'd'
    let width: usize = directive.parse().unwrap_or(0);
    let formatted = if directive.starts_with('0') {
        format!("{frame:0width$}")
    } else {
        format!("{frame:width$}")
    };

    let mut out = String::with_capacity(pattern.len() + formatted.len());
    out.push_str(&pattern[..m.start()]);
    out.push_str(&formatted);
    out.push_str(&pattern[m.end()..]);
    out
}
