#![forbid(unsafe_code)]

pub mod config;
pub mod dimensions;
pub mod document;
pub mod encode_ffmpeg;
pub mod encode_gifski;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod session;
pub mod sink;

pub use config::{
    BrowserOptions, DEFAULT_PLAYER_URL, FfmpegOptions, GifskiOptions, Inject, PlayerSource,
    RenderConfig, RendererMode,
};
pub use dimensions::{ViewportSpec, resolve_dimensions};
pub use error::{LottiecapError, LottiecapResult};
pub use model::AnimationSource;
pub use output::{OutputKind, OutputTarget, RasterFormat, classify_output, render_pattern};
pub use pipeline::{RenderOutcome, render, render_with_browser};
pub use session::RenderSession;

// Re-exported so callers of `render_with_browser` can launch and share a
// browser without depending on chromiumoxide directly.
pub use chromiumoxide::browser::{Browser, BrowserConfig};
