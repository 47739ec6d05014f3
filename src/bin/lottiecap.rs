use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use lottiecap::{RenderConfig, RendererMode};

/// Render a Lottie animation to a still image (`.png`/`.jpg`), a numbered
/// image sequence (`frame-%d.png`), an MP4 video (requires `ffmpeg` on PATH)
/// or a looping GIF (requires `gifski` on PATH).
#[derive(Parser, Debug)]
#[command(name = "lottiecap", version)]
struct Cli {
    /// Input Lottie animation JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output path or pattern; the extension picks the output kind.
    #[arg(long)]
    out: PathBuf,

    /// Output width (height derived from the animation's aspect ratio when
    /// omitted).
    #[arg(long)]
    width: Option<u32>,

    /// Output height (width derived from the animation's aspect ratio when
    /// omitted).
    #[arg(long)]
    height: Option<u32>,

    /// Render this exact frame for still output instead of frame 1.
    #[arg(long)]
    frame: Option<u64>,

    /// JPEG quality for frames (ignored for PNG).
    #[arg(long, default_value_t = 90)]
    jpeg_quality: u32,

    /// Which lottie-web renderer to use.
    #[arg(long, value_enum, default_value_t = RendererChoice::Vector)]
    renderer: RendererChoice,

    /// Page device scale factor.
    #[arg(long, default_value_t = 1)]
    device_scale_factor: u32,

    /// Seconds to wait for the animation to initialize.
    #[arg(long, default_value_t = 30)]
    init_timeout_secs: u64,

    /// Explicit Chromium executable (auto-detected when omitted).
    #[arg(long)]
    chrome: Option<PathBuf>,

    /// Disable the Chromium sandbox (containers/CI).
    #[arg(long, default_value_t = false)]
    no_sandbox: bool,

    /// Suppress progress output.
    #[arg(long, default_value_t = false)]
    quiet: bool,

    /// libx264 constant rate factor for MP4 output.
    #[arg(long, default_value_t = 20)]
    crf: u32,

    /// x264 preset for MP4 output.
    #[arg(long, default_value = "medium")]
    preset: String,

    /// H.264 profile for MP4 output.
    #[arg(long, default_value = "main")]
    profile: String,

    /// Override the MP4 encode frame rate (defaults to the animation's).
    #[arg(long)]
    encode_fps: Option<u32>,

    /// GIF output quality (1-100).
    #[arg(long, default_value_t = 80)]
    gif_quality: u32,

    /// Trade GIF quality for encoding speed.
    #[arg(long, default_value_t = false)]
    gif_fast: bool,

    /// Override the GIF playback frame rate (defaults to the animation's).
    #[arg(long)]
    gif_fps: Option<u32>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RendererChoice {
    Vector,
    Raster,
    Hybrid,
}

impl From<RendererChoice> for RendererMode {
    fn from(choice: RendererChoice) -> Self {
        match choice {
            RendererChoice::Vector => Self::Vector,
            RendererChoice::Raster => Self::Raster,
            RendererChoice::Hybrid => Self::Hybrid,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if !cli.quiet {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let mut cfg = RenderConfig::new(&cli.out);
    cfg.animation_path = Some(cli.in_path);
    cfg.width = cli.width;
    cfg.height = cli.height;
    cfg.frame = cli.frame;
    cfg.jpeg_quality = cli.jpeg_quality;
    cfg.renderer = cli.renderer.into();
    cfg.device_scale_factor = cli.device_scale_factor;
    cfg.init_timeout = Duration::from_secs(cli.init_timeout_secs);
    cfg.browser.executable = cli.chrome;
    cfg.browser.no_sandbox = cli.no_sandbox;
    cfg.ffmpeg.crf = cli.crf;
    cfg.ffmpeg.preset = cli.preset;
    cfg.ffmpeg.profile = cli.profile;
    cfg.ffmpeg.fps = cli.encode_fps;
    cfg.gifski.quality = cli.gif_quality;
    cfg.gifski.fast = cli.gif_fast;
    cfg.gifski.fps = cli.gif_fps;

    let outcome = lottiecap::render(cfg)
        .await
        .with_context(|| format!("render '{}'", cli.out.display()))?;

    if !cli.quiet {
        eprintln!(
            "rendered {} frames ({:.2}s) to {}",
            outcome.num_frames,
            outcome.duration_secs,
            cli.out.display()
        );
    }

    Ok(())
}
