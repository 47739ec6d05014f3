use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use crate::error::{LottiecapError, LottiecapResult};
use crate::model::AnimationSource;

/// Default URL of the lottie-web player script injected into the render
/// document. Override via [`RenderConfig::player`] for pinned or offline
/// setups.
pub const DEFAULT_PLAYER_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/lottie-web/5.12.2/lottie.min.js";

pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Which lottie-web renderer drives the page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererMode {
    /// lottie-web `svg` renderer.
    #[default]
    Vector,
    /// lottie-web `canvas` renderer.
    Raster,
    /// lottie-web `html` renderer.
    Hybrid,
}

impl RendererMode {
    pub fn as_player_renderer(self) -> &'static str {
        match self {
            Self::Vector => "svg",
            Self::Raster => "canvas",
            Self::Hybrid => "html",
        }
    }
}

/// Where the lottie-web player script comes from.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerSource {
    /// `<script src>` pointing at a URL the browser can reach.
    Url(String),
    /// Local script file, inlined into the document.
    File(PathBuf),
    /// Script text supplied directly.
    Inline(String),
}

impl Default for PlayerSource {
    fn default() -> Self {
        Self::Url(DEFAULT_PLAYER_URL.to_string())
    }
}

/// Markup/script injection points for the render document.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Inject {
    /// Injected into the document `<head>`.
    pub head: Option<String>,
    /// Injected into a `<style>` tag within the head.
    pub style: Option<String>,
    /// Injected into the document `<body>`.
    pub body: Option<String>,
}

/// Launch options passed through to the Chromium instance.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct BrowserOptions {
    /// Explicit browser executable (auto-detected when unset).
    pub executable: Option<PathBuf>,
    /// Disable the Chromium sandbox (containers/CI).
    pub no_sandbox: bool,
    /// Extra command-line arguments.
    pub args: Vec<String>,
}

/// Streaming video encoder options (`.mp4` outputs).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FfmpegOptions {
    /// libx264 constant rate factor (0-51).
    pub crf: u32,
    pub preset: String,
    pub profile: String,
    /// Override the encode frame rate (defaults to the animation's).
    pub fps: Option<u32>,
}

impl Default for FfmpegOptions {
    fn default() -> Self {
        Self {
            crf: 20,
            preset: "medium".to_string(),
            profile: "main".to_string(),
            fps: None,
        }
    }
}

/// Batch looping-image encoder options (`.gif` outputs).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GifskiOptions {
    /// Output quality (1-100).
    pub quality: u32,
    /// Trade quality for encoding speed.
    pub fast: bool,
    /// Override the playback frame rate (defaults to the animation's).
    pub fps: Option<u32>,
}

impl Default for GifskiOptions {
    fn default() -> Self {
        Self {
            quality: 80,
            fast: false,
            fps: None,
        }
    }
}

/// Everything one pipeline run needs. Construct with [`RenderConfig::new`],
/// then set fields directly; [`validate`](Self::validate) runs before any
/// browser or subprocess is started.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    /// Output path or pattern (required). The extension decides the output
    /// kind and raster format.
    pub output: PathBuf,
    /// Inline animation JSON. Mutually exclusive with `animation_path`.
    pub animation_data: Option<Value>,
    /// Path to an animation JSON file. Mutually exclusive with
    /// `animation_data`.
    pub animation_path: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// JPEG quality for frames (ignored for PNG), 1-100.
    pub jpeg_quality: u32,
    pub device_scale_factor: u32,
    /// Render this exact frame for still output instead of frame 1.
    pub frame: Option<u64>,
    /// Override the total frame count reported by the player.
    pub num_frames_override: Option<u64>,
    pub renderer: RendererMode,
    /// Opaque lottie-web renderer settings, passed through verbatim.
    pub renderer_settings: Value,
    /// CSS declarations applied to the animation container.
    pub style: BTreeMap<String, String>,
    pub inject: Inject,
    pub player: PlayerSource,
    pub browser: BrowserOptions,
    /// How long to wait for the animation readiness marker.
    pub init_timeout: Duration,
    pub ffmpeg: FfmpegOptions,
    pub gifski: GifskiOptions,
}

impl RenderConfig {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            animation_data: None,
            animation_path: None,
            width: None,
            height: None,
            jpeg_quality: 90,
            device_scale_factor: 1,
            frame: None,
            num_frames_override: None,
            renderer: RendererMode::default(),
            renderer_settings: Value::Null,
            style: BTreeMap::new(),
            inject: Inject::default(),
            player: PlayerSource::default(),
            browser: BrowserOptions::default(),
            init_timeout: DEFAULT_INIT_TIMEOUT,
            ffmpeg: FfmpegOptions::default(),
            gifski: GifskiOptions::default(),
        }
    }

    pub fn validate(&self) -> LottiecapResult<()> {
        if self.output.as_os_str().is_empty() {
            return Err(LottiecapError::config("output path must be non-empty"));
        }
        match (&self.animation_data, &self.animation_path) {
            (Some(_), Some(_)) => {
                return Err(LottiecapError::config(
                    "'animation_data' and 'animation_path' are mutually exclusive",
                ));
            }
            (None, None) => {
                return Err(LottiecapError::config(
                    "must supply either 'animation_data' or 'animation_path'",
                ));
            }
            _ => {}
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(LottiecapError::config("jpeg_quality must be in 1..=100"));
        }
        if self.device_scale_factor == 0 {
            return Err(LottiecapError::config(
                "device_scale_factor must be a positive integer",
            ));
        }
        if self.ffmpeg.crf > 51 {
            return Err(LottiecapError::config("ffmpeg crf must be in 0..=51"));
        }
        if self.ffmpeg.fps == Some(0) {
            return Err(LottiecapError::config("ffmpeg fps override must be non-zero"));
        }
        if self.gifski.quality == 0 || self.gifski.quality > 100 {
            return Err(LottiecapError::config("gifski quality must be in 1..=100"));
        }
        if self.gifski.fps == Some(0) {
            return Err(LottiecapError::config("gifski fps override must be non-zero"));
        }
        Ok(())
    }

    /// Load and validate the animation from whichever input was supplied.
    /// Call after [`validate`](Self::validate).
    pub fn load_animation(&self) -> LottiecapResult<AnimationSource> {
        if let Some(data) = &self.animation_data {
            return AnimationSource::from_value(data.clone());
        }
        if let Some(path) = &self.animation_path {
            return AnimationSource::from_path(path);
        }
        Err(LottiecapError::config(
            "must supply either 'animation_data' or 'animation_path'",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> RenderConfig {
        let mut cfg = RenderConfig::new("out.png");
        cfg.animation_data = Some(json!({ "fr": 30, "w": 10, "h": 10 }));
        cfg
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = base();
        assert_eq!(cfg.jpeg_quality, 90);
        assert_eq!(cfg.device_scale_factor, 1);
        assert_eq!(cfg.renderer, RendererMode::Vector);
        assert_eq!(cfg.init_timeout, Duration::from_secs(30));
        assert_eq!(cfg.ffmpeg.crf, 20);
        assert_eq!(cfg.gifski.quality, 80);
        assert!(!cfg.gifski.fast);
        cfg.validate().unwrap();
    }

    #[test]
    fn animation_inputs_are_mutually_exclusive() {
        let mut cfg = base();
        cfg.animation_path = Some(PathBuf::from("anim.json"));
        assert!(matches!(
            cfg.validate(),
            Err(LottiecapError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn missing_animation_input_is_rejected() {
        let mut cfg = base();
        cfg.animation_data = None;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn out_of_range_options_are_rejected() {
        let mut cfg = base();
        cfg.jpeg_quality = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = base();
        cfg.jpeg_quality = 101;
        assert!(cfg.validate().is_err());

        let mut cfg = base();
        cfg.device_scale_factor = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = base();
        cfg.ffmpeg.crf = 99;
        assert!(cfg.validate().is_err());

        let mut cfg = base();
        cfg.gifski.quality = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = base();
        cfg.ffmpeg.fps = Some(0);
        assert!(cfg.validate().is_err());

        let mut cfg = base();
        cfg.gifski.fps = Some(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn renderer_mode_maps_to_player_strings() {
        assert_eq!(RendererMode::Vector.as_player_renderer(), "svg");
        assert_eq!(RendererMode::Raster.as_player_renderer(), "canvas");
        assert_eq!(RendererMode::Hybrid.as_player_renderer(), "html");
    }
}
