//! Configuration-stage failures must surface before any browser or encoder
//! subprocess is started. Everything here runs `render` far enough to hit the
//! validation layer only, so no Chromium, ffmpeg or gifski is required.

use serde_json::json;

use lottiecap::{LottiecapError, RenderConfig};

fn valid_animation() -> serde_json::Value {
    json!({ "fr": 30, "w": 1820, "h": 275, "layers": [] })
}

#[tokio::test]
async fn unsupported_extension_fails_before_engine_launch() {
    let mut cfg = RenderConfig::new("out.bmp");
    cfg.animation_data = Some(valid_animation());

    let err = lottiecap::render(cfg).await.unwrap_err();
    assert!(matches!(err, LottiecapError::UnsupportedFormat(_)));
    assert!(err.to_string().contains(".bmp"));
}

#[tokio::test]
async fn mutually_exclusive_inputs_are_rejected() {
    let mut cfg = RenderConfig::new("out.png");
    cfg.animation_data = Some(valid_animation());
    cfg.animation_path = Some("anim.json".into());

    let err = lottiecap::render(cfg).await.unwrap_err();
    assert!(matches!(err, LottiecapError::InvalidConfiguration(_)));
    assert!(err.to_string().contains("mutually exclusive"));
}

#[tokio::test]
async fn missing_input_is_rejected() {
    let cfg = RenderConfig::new("out.png");
    let err = lottiecap::render(cfg).await.unwrap_err();
    assert!(matches!(err, LottiecapError::InvalidConfiguration(_)));
}

#[tokio::test]
async fn invalid_animation_metadata_is_rejected() {
    let mut cfg = RenderConfig::new("out.png");
    cfg.animation_data = Some(json!({ "w": 100, "h": 100 })); // no frame rate

    let err = lottiecap::render(cfg).await.unwrap_err();
    assert!(matches!(err, LottiecapError::InvalidConfiguration(_)));
    assert!(err.to_string().contains("'fr'"));
}

#[tokio::test]
async fn unreadable_animation_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = RenderConfig::new("out.png");
    cfg.animation_path = Some(dir.path().join("missing.json"));

    let err = lottiecap::render(cfg).await.unwrap_err();
    assert!(matches!(err, LottiecapError::InvalidConfiguration(_)));
}

#[tokio::test]
async fn zero_requested_dimension_is_rejected() {
    let mut cfg = RenderConfig::new("out.png");
    cfg.animation_data = Some(valid_animation());
    cfg.width = Some(0);

    let err = lottiecap::render(cfg).await.unwrap_err();
    assert!(matches!(err, LottiecapError::InvalidDimension(_)));
}
