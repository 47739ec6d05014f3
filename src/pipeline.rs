use std::ops::RangeInclusive;

use chromiumoxide::browser::Browser;

use crate::config::RenderConfig;
use crate::dimensions::{ViewportSpec, resolve_dimensions};
use crate::error::LottiecapResult;
use crate::model::AnimationSource;
use crate::output::{OutputKind, OutputTarget, classify_output};
use crate::session::RenderSession;
use crate::sink::FrameSink;

/// What one pipeline run reports back, independent of output kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderOutcome {
    /// Total frame count reported by the player (or the configured override).
    pub num_frames: u64,
    /// Animation duration in seconds reported by the player.
    pub duration_secs: f64,
}

/// Render one animation to the configured output, launching a browser for
/// the duration of the run.
pub async fn render(cfg: RenderConfig) -> LottiecapResult<RenderOutcome> {
    let plan = RunPlan::prepare(&cfg)?;
    let session =
        RenderSession::open(&cfg, &plan.animation, &plan.viewport, plan.target.format).await?;
    run(cfg, plan, session).await
}

/// Render one animation against a caller-owned browser. The browser keeps
/// running afterwards; only the per-run page is torn down. Callers running
/// multiple pipelines against one browser must serialize them.
pub async fn render_with_browser(
    cfg: RenderConfig,
    browser: &Browser,
) -> LottiecapResult<RenderOutcome> {
    let plan = RunPlan::prepare(&cfg)?;
    let session = RenderSession::open_with(
        browser,
        &cfg,
        &plan.animation,
        &plan.viewport,
        plan.target.format,
    )
    .await?;
    run(cfg, plan, session).await
}

/// Everything derived from the configuration before any engine or subprocess
/// exists. All `InvalidConfiguration`-class failures happen here.
struct RunPlan {
    animation: AnimationSource,
    target: OutputTarget,
    viewport: ViewportSpec,
}

impl RunPlan {
    fn prepare(cfg: &RenderConfig) -> LottiecapResult<Self> {
        cfg.validate()?;
        let animation = cfg.load_animation()?;
        let target = classify_output(&cfg.output)?;
        let (width, height) = resolve_dimensions(
            cfg.width,
            cfg.height,
            animation.intrinsic_width(),
            animation.intrinsic_height(),
        )?;

        Ok(Self {
            animation,
            target,
            viewport: ViewportSpec {
                width,
                height,
                device_scale_factor: cfg.device_scale_factor,
            },
        })
    }
}

async fn run(
    cfg: RenderConfig,
    plan: RunPlan,
    mut session: RenderSession<'_>,
) -> LottiecapResult<RenderOutcome> {
    let num_frames = cfg.num_frames_override.unwrap_or(session.num_frames());
    let duration_secs = session.duration_secs();

    tracing::info!(
        kind = ?plan.target.kind,
        width = plan.viewport.width,
        height = plan.viewport.height,
        num_frames,
        "rendering '{}'",
        plan.target.path.display()
    );

    let result = drive(&mut session, &cfg, &plan, num_frames).await;

    // Teardown runs on every exit path; the run failure wins over a close
    // failure.
    let close_result = session.close().await;
    result?;
    close_result?;

    tracing::info!(num_frames, duration_secs, "render complete");
    Ok(RenderOutcome {
        num_frames,
        duration_secs,
    })
}

async fn drive(
    session: &mut RenderSession<'_>,
    cfg: &RenderConfig,
    plan: &RunPlan,
    num_frames: u64,
) -> LottiecapResult<()> {
    let mut sink = FrameSink::for_target(
        &plan.target,
        cfg,
        &plan.viewport,
        plan.animation.frame_rate(),
    )?;

    for frame in frame_plan(plan.target.kind, num_frames, cfg.frame) {
        tracing::debug!(frame, "capturing");
        let buffer = session.capture_frame(frame).await?;
        sink.accept(frame, &buffer).await?;
    }

    sink.finalize().await
}

/// The frame indices one run walks, in order. Still output renders frame 1
/// (or an explicit override); multi-frame output renders `1..=num_frames`.
fn frame_plan(
    kind: OutputKind,
    num_frames: u64,
    frame_override: Option<u64>,
) -> RangeInclusive<u64> {
    match kind {
        OutputKind::StillImage => {
            let frame = frame_override.unwrap_or(1);
            frame..=frame
        }
        OutputKind::NumberedSequence
        | OutputKind::StreamingVideo
        | OutputKind::BatchEncodedLoop => 1..=num_frames,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn still_plan_is_frame_one_or_override() {
        assert_eq!(
            frame_plan(OutputKind::StillImage, 102, None).collect::<Vec<_>>(),
            vec![1]
        );
        assert_eq!(
            frame_plan(OutputKind::StillImage, 102, Some(103)).collect::<Vec<_>>(),
            vec![103]
        );
    }

    #[test]
    fn multi_frame_plan_is_one_through_total_in_order() {
        let frames: Vec<u64> = frame_plan(OutputKind::StreamingVideo, 5, None).collect();
        assert_eq!(frames, vec![1, 2, 3, 4, 5]);

        // the still-frame override does not apply to multi-frame kinds
        let frames: Vec<u64> = frame_plan(OutputKind::NumberedSequence, 3, Some(99)).collect();
        assert_eq!(frames, vec![1, 2, 3]);

        assert_eq!(frame_plan(OutputKind::BatchEncodedLoop, 0, None).count(), 0);
    }

    #[test]
    fn plan_preparation_resolves_viewport_and_target() {
        let mut cfg = RenderConfig::new("out.png");
        cfg.animation_data = Some(json!({ "fr": 30, "w": 1820, "h": 275 }));
        cfg.width = Some(640);

        let plan = RunPlan::prepare(&cfg).unwrap();
        assert_eq!(plan.target.kind, OutputKind::StillImage);
        assert_eq!(plan.viewport.width, 640);
        assert_eq!(plan.viewport.height, 96);
        assert_eq!(plan.animation.frame_rate(), 30);
    }

    #[test]
    fn plan_preparation_fails_fast_on_bad_output() {
        let mut cfg = RenderConfig::new("out.bmp");
        cfg.animation_data = Some(json!({ "fr": 30, "w": 10, "h": 10 }));
        assert!(matches!(
            RunPlan::prepare(&cfg),
            Err(crate::error::LottiecapError::UnsupportedFormat(_))
        ));
    }
}
