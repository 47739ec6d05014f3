use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt as _;
use tokio::process::{Child, ChildStdin, Command};

use crate::config::FfmpegOptions;
use crate::error::{LottiecapError, LottiecapResult};

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub fps: u32,
    pub out_path: PathBuf,
    pub crf: u32,
    pub preset: String,
    pub profile: String,
}

impl EncodeConfig {
    pub fn from_options(
        out_path: impl Into<PathBuf>,
        width: u32,
        fps: u32,
        opts: &FfmpegOptions,
    ) -> Self {
        Self {
            width,
            fps: opts.fps.unwrap_or(fps),
            out_path: out_path.into(),
            crf: opts.crf,
            preset: opts.preset.clone(),
            profile: opts.profile.clone(),
        }
    }

    pub fn validate(&self) -> LottiecapResult<()> {
        if self.width == 0 {
            return Err(LottiecapError::config("encode width must be non-zero"));
        }
        if self.fps == 0 {
            return Err(LottiecapError::config("encode fps must be non-zero"));
        }
        if self.crf > 51 {
            return Err(LottiecapError::config("encode crf must be in 0..=51"));
        }
        Ok(())
    }
}

pub fn ffmpeg_executable() -> OsString {
    std::env::var_os("FFMPEG_PATH").unwrap_or_else(|| OsString::from("ffmpeg"))
}

pub fn ensure_parent_dir(path: &Path) -> LottiecapResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Build the ffmpeg argument list for one streaming encode.
///
/// Frames arrive as PNG images on stdin (`image2pipe`); the scale filter pins
/// the output width and rounds the height to the nearest even value as
/// required for yuv420p H.264.
///
/// stderr must stay quiet during the encode (`-v error`, no progress
/// reporting): nothing drains the pipe until `finish`, and a chatty encoder
/// would fill it and stall the stdin writes.
pub fn ffmpeg_args(cfg: &EncodeConfig) -> Vec<String> {
    vec![
        "-v".into(),
        "error".into(),
        "-hide_banner".into(),
        "-y".into(),
        "-f".into(),
        "image2pipe".into(),
        "-c:v".into(),
        "png".into(),
        "-r".into(),
        cfg.fps.to_string(),
        "-i".into(),
        "-".into(),
        "-vf".into(),
        format!("scale={}:-2", cfg.width),
        "-c:v".into(),
        "libx264".into(),
        "-profile:v".into(),
        cfg.profile.clone(),
        "-preset".into(),
        cfg.preset.clone(),
        "-crf".into(),
        cfg.crf.to_string(),
        "-movflags".into(),
        "faststart".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-an".into(),
        cfg.out_path.to_string_lossy().into_owned(),
    ]
}

/// Long-lived ffmpeg subprocess consuming PNG frames on stdin.
///
/// Exactly one encoder exists per pipeline run. Writes apply backpressure
/// (they await the pipe) instead of dropping frames; once the pipe breaks,
/// remaining writes become no-ops and the exit status collected in
/// [`finish`](Self::finish) explains the failure. Dropping the encoder
/// without finishing kills the subprocess.
pub struct FfmpegEncoder {
    child: Child,
    stdin: Option<ChildStdin>,
    pipe_broken: bool,
}

impl FfmpegEncoder {
    pub fn spawn(cfg: EncodeConfig) -> LottiecapResult<Self> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        let mut cmd = Command::new(ffmpeg_executable());
        cmd.args(ffmpeg_args(&cfg))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            LottiecapError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| LottiecapError::encode("failed to open ffmpeg stdin (unexpected)"))?;

        Ok(Self {
            child,
            stdin: Some(stdin),
            pipe_broken: false,
        })
    }

    pub async fn write_frame(&mut self, png: &[u8]) -> LottiecapResult<()> {
        if self.pipe_broken {
            return Ok(());
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(LottiecapError::encode("ffmpeg encoder is already finalized"));
        };

        match stdin.write_all(png).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                // The encoder closed its end early; its exit status decides.
                tracing::warn!("ffmpeg closed its input pipe before the last frame");
                self.stdin = None;
                self.pipe_broken = true;
                Ok(())
            }
            Err(e) => Err(LottiecapError::encode(format!(
                "failed to write frame to ffmpeg stdin: {e}"
            ))),
        }
    }

    /// Close stdin and await the subprocess. Non-zero exit fails with the
    /// captured stderr.
    pub async fn finish(mut self) -> LottiecapResult<()> {
        drop(self.stdin.take());

        let output = self.child.wait_with_output().await.map_err(|e| {
            LottiecapError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LottiecapError::encode(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}
