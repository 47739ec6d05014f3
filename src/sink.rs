use std::path::{Path, PathBuf};

use crate::config::{GifskiOptions, RenderConfig};
use crate::dimensions::ViewportSpec;
use crate::encode_ffmpeg::{EncodeConfig, FfmpegEncoder, ensure_parent_dir};
use crate::encode_gifski;
use crate::error::{LottiecapError, LottiecapResult};
use crate::output::{OutputKind, OutputTarget, render_pattern};

/// Ephemeral directory holding staged per-frame PNGs for the batch encoder.
///
/// Owned exclusively by one pipeline run and removed in `Drop`, so the
/// directory disappears on every exit path, including render and encode
/// failures.
pub struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    pub fn create() -> LottiecapResult<Self> {
        let path = std::env::temp_dir().join(format!(
            "lottiecap_frames_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ));
        std::fs::create_dir_all(&path).map_err(|e| {
            LottiecapError::encode(format!(
                "failed to create staging directory '{}': {e}",
                path.display()
            ))
        })?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Zero-padded sequential filename so lexical order equals frame order.
    pub fn frame_path(&self, frame: u64) -> PathBuf {
        self.path.join(format!("frame-{frame:012}.png"))
    }

    /// All staged frame files, sorted into frame order.
    pub fn staged_frames(&self) -> LottiecapResult<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.path).map_err(|e| {
            LottiecapError::encode(format!(
                "failed to list staging directory '{}': {e}",
                self.path.display()
            ))
        })?;

        let mut frames = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                LottiecapError::encode(format!("failed to read staging directory entry: {e}"))
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("png") {
                frames.push(path);
            }
        }
        frames.sort();
        Ok(frames)
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// Where each captured frame buffer goes.
///
/// One variant is selected per run from the classified output target; the
/// frame loop stays free of format-specific branches. `accept` consumes one
/// buffer, `finalize` settles the output (no-op for plain files, stream close
/// plus exit await for ffmpeg, one batch invocation for gifski).
pub enum FrameSink {
    /// One buffer, one fixed path.
    File { path: PathBuf, written: bool },
    /// One file per frame, index substituted into the pattern.
    Pattern { pattern: String },
    /// Frames piped into a running ffmpeg process.
    Stream(FfmpegEncoder),
    /// Frames staged to disk for a single gifski invocation at the end.
    Batch {
        staging: StagingDir,
        out_path: PathBuf,
        fps: u32,
        gifski: GifskiOptions,
        frames_staged: u64,
    },
}

impl FrameSink {
    /// Construct the sink for a classified target. For streaming video this
    /// spawns the encoder subprocess; for the batch loop it creates the
    /// staging directory.
    pub fn for_target(
        target: &OutputTarget,
        cfg: &RenderConfig,
        viewport: &ViewportSpec,
        frame_rate: u32,
    ) -> LottiecapResult<Self> {
        match target.kind {
            OutputKind::StillImage => Ok(Self::File {
                path: target.path.clone(),
                written: false,
            }),
            OutputKind::NumberedSequence => Ok(Self::Pattern {
                pattern: target.path.to_string_lossy().into_owned(),
            }),
            OutputKind::StreamingVideo => {
                let encode = EncodeConfig::from_options(
                    &target.path,
                    viewport.width,
                    frame_rate,
                    &cfg.ffmpeg,
                );
                Ok(Self::Stream(FfmpegEncoder::spawn(encode)?))
            }
            OutputKind::BatchEncodedLoop => Ok(Self::Batch {
                staging: StagingDir::create()?,
                out_path: target.path.clone(),
                fps: frame_rate,
                gifski: cfg.gifski.clone(),
                frames_staged: 0,
            }),
        }
    }

    pub async fn accept(&mut self, frame: u64, data: &[u8]) -> LottiecapResult<()> {
        match self {
            Self::File { path, written } => {
                if *written {
                    return Err(LottiecapError::encode(
                        "single-frame sink received more than one frame",
                    ));
                }
                write_frame_file(path, data).await?;
                *written = true;
                Ok(())
            }
            Self::Pattern { pattern } => {
                let path = PathBuf::from(render_pattern(pattern, frame));
                write_frame_file(&path, data).await
            }
            Self::Stream(encoder) => encoder.write_frame(data).await,
            Self::Batch {
                staging,
                frames_staged,
                ..
            } => {
                write_frame_file(&staging.frame_path(frame), data).await?;
                *frames_staged += 1;
                Ok(())
            }
        }
    }

    pub async fn finalize(self) -> LottiecapResult<()> {
        match self {
            Self::File { .. } | Self::Pattern { .. } => Ok(()),
            Self::Stream(encoder) => encoder.finish().await,
            Self::Batch {
                staging,
                out_path,
                fps,
                gifski,
                frames_staged,
            } => {
                if frames_staged == 0 {
                    return Err(LottiecapError::encode(
                        "no frames were staged for GIF encoding",
                    ));
                }
                let frames = staging.staged_frames()?;
                encode_gifski::encode_gif(&frames, &out_path, fps, &gifski).await
                // staging dropped here, removing the directory
            }
        }
    }
}

async fn write_frame_file(path: &Path, data: &[u8]) -> LottiecapResult<()> {
    ensure_parent_dir(path)?;
    tokio::fs::write(path, data).await.map_err(|e| {
        LottiecapError::encode(format!("failed to write frame '{}': {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::classify_output;

    #[test]
    fn staging_dir_is_removed_on_drop() {
        let staging = StagingDir::create().unwrap();
        let path = staging.path().to_path_buf();
        assert!(path.is_dir());
        drop(staging);
        assert!(!path.exists());
    }

    #[test]
    fn staged_frame_names_sort_in_frame_order() {
        let staging = StagingDir::create().unwrap();
        for frame in [3u64, 1, 2, 10] {
            std::fs::write(staging.frame_path(frame), b"png").unwrap();
        }
        // a non-frame file is ignored
        std::fs::write(staging.path().join("notes.txt"), b"x").unwrap();

        let frames = staging.staged_frames().unwrap();
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[0], staging.frame_path(1));
        assert_eq!(frames[3], staging.frame_path(10));
    }

    #[tokio::test]
    async fn file_sink_writes_once_and_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.png");
        let mut sink = FrameSink::File {
            path: out.clone(),
            written: false,
        };

        sink.accept(1, b"bytes").await.unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"bytes");

        let err = sink.accept(2, b"again").await.unwrap_err();
        assert!(matches!(err, LottiecapError::Encode(_)));
    }

    #[tokio::test]
    async fn pattern_sink_substitutes_indices() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = dir
            .path()
            .join("frame-%03d.png")
            .to_string_lossy()
            .into_owned();
        let mut sink = FrameSink::Pattern { pattern };

        sink.accept(1, b"a").await.unwrap();
        sink.accept(12, b"b").await.unwrap();

        assert!(dir.path().join("frame-001.png").exists());
        assert!(dir.path().join("frame-012.png").exists());
    }

    #[tokio::test]
    async fn batch_sink_rejects_empty_finalize_and_cleans_up() {
        let sink = FrameSink::Batch {
            staging: StagingDir::create().unwrap(),
            out_path: PathBuf::from("out.gif"),
            fps: 30,
            gifski: GifskiOptions::default(),
            frames_staged: 0,
        };
        let staging_path = match &sink {
            FrameSink::Batch { staging, .. } => staging.path().to_path_buf(),
            _ => unreachable!(),
        };

        let err = sink.finalize().await.unwrap_err();
        assert!(matches!(err, LottiecapError::Encode(_)));
        // the guard ran even though finalize failed
        assert!(!staging_path.exists());
    }

    #[test]
    fn sink_selection_follows_target_kind() {
        let cfg = RenderConfig::new("out.png");
        let viewport = ViewportSpec {
            width: 10,
            height: 10,
            device_scale_factor: 1,
        };

        let target = classify_output(Path::new("out.png")).unwrap();
        assert!(matches!(
            FrameSink::for_target(&target, &cfg, &viewport, 30).unwrap(),
            FrameSink::File { .. }
        ));

        let target = classify_output(Path::new("frame-%d.png")).unwrap();
        assert!(matches!(
            FrameSink::for_target(&target, &cfg, &viewport, 30).unwrap(),
            FrameSink::Pattern { .. }
        ));

        let target = classify_output(Path::new("out.gif")).unwrap();
        assert!(matches!(
            FrameSink::for_target(&target, &cfg, &viewport, 30).unwrap(),
            FrameSink::Batch { .. }
        ));
    }
}
