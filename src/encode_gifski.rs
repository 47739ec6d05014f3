use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::config::GifskiOptions;
use crate::encode_ffmpeg::ensure_parent_dir;
use crate::error::{LottiecapError, LottiecapResult};

pub fn gifski_executable() -> OsString {
    std::env::var_os("GIFSKI_PATH").unwrap_or_else(|| OsString::from("gifski"))
}

/// Build the gifski argument list for one batch encode over the staged
/// frame files (already in frame order).
pub fn gifski_args(
    out_path: &Path,
    fps: u32,
    opts: &GifskiOptions,
    frames: &[PathBuf],
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-o".into(),
        out_path.as_os_str().to_owned(),
        "--fps".into(),
        opts.fps.unwrap_or(fps).to_string().into(),
    ];
    if opts.fast {
        args.push("--fast".into());
    }
    args.push("--quality".into());
    args.push(opts.quality.to_string().into());
    args.push("--quiet".into());
    args.extend(frames.iter().map(|p| p.as_os_str().to_owned()));
    args
}

/// Invoke gifski once over a complete set of staged frames.
///
/// Spawn failure (executable missing) and non-zero exit are both hard
/// failures.
pub async fn encode_gif(
    frames: &[PathBuf],
    out_path: &Path,
    fps: u32,
    opts: &GifskiOptions,
) -> LottiecapResult<()> {
    if frames.is_empty() {
        return Err(LottiecapError::encode(
            "no staged frames to encode into a GIF",
        ));
    }
    ensure_parent_dir(out_path)?;

    let output = Command::new(gifski_executable())
        .args(gifski_args(out_path, fps, opts, frames))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| {
            LottiecapError::encode(format!(
                "failed to spawn gifski (is it installed and on PATH?): {e}"
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(LottiecapError::encode(format!(
            "gifski exited with status {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_cover_fps_quality_and_frames() {
        let frames = vec![
            PathBuf::from("frame-000000000001.png"),
            PathBuf::from("frame-000000000002.png"),
        ];
        let args = gifski_args(Path::new("out.gif"), 30, &GifskiOptions::default(), &frames);
        let joined: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(joined[..4], ["-o", "out.gif", "--fps", "30"]);
        assert!(joined.contains(&"--quality".to_string()));
        assert!(joined.contains(&"80".to_string()));
        assert!(joined.contains(&"--quiet".to_string()));
        assert!(!joined.contains(&"--fast".to_string()));
        assert_eq!(joined.last().unwrap(), "frame-000000000002.png");
    }

    #[test]
    fn fast_flag_and_fps_override() {
        let opts = GifskiOptions {
            quality: 50,
            fast: true,
            fps: Some(12),
        };
        let args = gifski_args(Path::new("out.gif"), 30, &opts, &[PathBuf::from("f.png")]);
        let joined: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(joined[3], "12");
        assert!(joined.contains(&"--fast".to_string()));
        assert!(joined.contains(&"50".to_string()));
    }

    #[tokio::test]
    async fn empty_frame_set_is_rejected_before_spawn() {
        let err = encode_gif(&[], Path::new("out.gif"), 30, &GifskiOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LottiecapError::Encode(_)));
    }
}
