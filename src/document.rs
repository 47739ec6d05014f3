use std::collections::BTreeMap;

use crate::config::{PlayerSource, RenderConfig};
use crate::dimensions::ViewportSpec;
use crate::error::{LottiecapError, LottiecapResult};
use crate::model::AnimationSource;

/// Build the HTML document the render session loads.
///
/// The document embeds the animation payload, constructs the lottie-web
/// animation with `loop`/`autoplay` off, exposes `animation`, `duration` and
/// `numFrames` to later `evaluate` calls, and appends a `.ready` marker div
/// once the animation object exists. The marker is the readiness signal the
/// session awaits before any frame is captured.
pub fn build_document(
    animation: &AnimationSource,
    cfg: &RenderConfig,
    viewport: &ViewportSpec,
) -> LottiecapResult<String> {
    let payload = serde_json::to_string(animation.payload())
        .map_err(|e| LottiecapError::config(format!("failed to serialize animation payload: {e}")))?;
    let settings = if cfg.renderer_settings.is_null() {
        "{}".to_string()
    } else {
        serde_json::to_string(&cfg.renderer_settings).map_err(|e| {
            LottiecapError::config(format!("failed to serialize renderer settings: {e}"))
        })?
    };

    let player = player_markup(&cfg.player)?;
    let head = cfg.inject.head.as_deref().unwrap_or("");
    let style_inject = cfg.inject.style.as_deref().unwrap_or("");
    let body_inject = cfg.inject.body.as_deref().unwrap_or("");
    let root_style = cssify(&cfg.style);
    let renderer = cfg.renderer.as_player_renderer();
    let width = viewport.width;
    let height = viewport.height;

    Ok(format!(
        r#"<html>
<head>
  <meta charset="UTF-8">

  {head}
  {player}

  <style>
* {{
  box-sizing: border-box;
  margin: 0;
  padding: 0;
}}

body {{
  background: transparent;
  width: {width}px;
  height: {height}px;
  overflow: hidden;
}}

#root {{
  width: 100%;
  height: 100%;
{root_style}}}

{style_inject}
  </style>
</head>

<body>
{body_inject}

<div id="root"></div>

<script>
  const animationData = {payload};
  let animation = null;
  let duration = 0;
  let numFrames = 0;

  function onReady() {{
    animation = lottie.loadAnimation({{
      container: document.getElementById('root'),
      renderer: '{renderer}',
      loop: false,
      autoplay: false,
      rendererSettings: {settings},
      animationData,
    }});

    duration = animation.getDuration();
    numFrames = animation.getDuration(true);

    const marker = document.createElement('div');
    marker.className = 'ready';
    document.body.appendChild(marker);
  }}

  document.addEventListener('DOMContentLoaded', onReady);
</script>

</body>
</html>
"#
    ))
}

fn player_markup(player: &PlayerSource) -> LottiecapResult<String> {
    match player {
        PlayerSource::Url(url) => Ok(format!(r#"<script src="{url}"></script>"#)),
        PlayerSource::Inline(script) => Ok(format!("<script>\n{script}\n</script>")),
        PlayerSource::File(path) => {
            let script = std::fs::read_to_string(path).map_err(|e| {
                LottiecapError::config(format!(
                    "failed to read player script '{}': {e}",
                    path.display()
                ))
            })?;
            Ok(format!("<script>\n{script}\n</script>"))
        }
    }
}

fn cssify(style: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (property, value) in style {
        out.push_str(&format!("  {property}: {value};\n"));
    }
    out
}
