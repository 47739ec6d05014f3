use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::dom::Rgba;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDefaultBackgroundColorOverrideParams, SetDeviceMetricsOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams, Viewport,
};
use chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled;
use chromiumoxide::page::Page;
use futures::StreamExt as _;
use tokio::task::JoinHandle;

use crate::config::{BrowserOptions, RenderConfig};
use crate::dimensions::ViewportSpec;
use crate::document::build_document;
use crate::error::{LottiecapError, LottiecapResult};
use crate::model::AnimationSource;
use crate::output::RasterFormat;

// Single-shot readiness signal: resolves once the `.ready` marker appended by
// the document's bootstrap script exists. The animation object and its
// timeline metadata are queryable from that point on.
const READY_WAIT: &str = r#"
new Promise((resolve) => {
  if (document.querySelector('.ready')) { resolve(true); return; }
  const observer = new MutationObserver(() => {
    if (document.querySelector('.ready')) {
      observer.disconnect();
      resolve(true);
    }
  });
  observer.observe(document.body, { childList: true, subtree: true });
})
"#;

enum BrowserHandle<'a> {
    /// Launched by this session; fully shut down on close.
    Owned {
        browser: Browser,
        handler: JoinHandle<()>,
    },
    /// Supplied by the caller for reuse across runs; only the page is torn
    /// down on close. Concurrent runs sharing one browser must be serialized
    /// by the caller.
    External(&'a Browser),
}

/// One rendering-engine session for the duration of a single pipeline run.
///
/// Owns a Chromium page with the animation document loaded and exposes
/// "seek to frame N, capture raster bytes". Seeks are strictly sequential
/// (`&mut self`): the page's animation state is mutated in place.
pub struct RenderSession<'a> {
    handle: BrowserHandle<'a>,
    page: Page,
    console_task: JoinHandle<()>,
    num_frames: u64,
    duration_secs: f64,
    format: CaptureScreenshotFormat,
    jpeg_quality: Option<i64>,
    clip: Viewport,
}

struct PageParts {
    page: Page,
    console_task: JoinHandle<()>,
    num_frames: u64,
    duration_secs: f64,
}

impl<'a> RenderSession<'a> {
    /// Launch a browser and open the session on it.
    pub async fn open(
        cfg: &RenderConfig,
        animation: &AnimationSource,
        viewport: &ViewportSpec,
        format: RasterFormat,
    ) -> LottiecapResult<RenderSession<'static>> {
        let (mut browser, handler) = launch_browser(&cfg.browser).await?;

        match init_page(&browser, cfg, animation, viewport).await {
            Ok(parts) => Ok(RenderSession::assemble(
                BrowserHandle::Owned { browser, handler },
                parts,
                cfg,
                viewport,
                format,
            )),
            Err(e) => {
                let _ = browser.close().await;
                handler.abort();
                Err(e)
            }
        }
    }

    /// Open the session on a caller-owned browser. The browser keeps running
    /// after [`close`](Self::close).
    pub async fn open_with(
        browser: &'a Browser,
        cfg: &RenderConfig,
        animation: &AnimationSource,
        viewport: &ViewportSpec,
        format: RasterFormat,
    ) -> LottiecapResult<RenderSession<'a>> {
        let parts = init_page(browser, cfg, animation, viewport).await?;
        Ok(RenderSession::assemble(
            BrowserHandle::External(browser),
            parts,
            cfg,
            viewport,
            format,
        ))
    }

    fn assemble(
        handle: BrowserHandle<'a>,
        parts: PageParts,
        cfg: &RenderConfig,
        viewport: &ViewportSpec,
        format: RasterFormat,
    ) -> RenderSession<'a> {
        let (format, jpeg_quality) = match format {
            RasterFormat::Png => (CaptureScreenshotFormat::Png, None),
            RasterFormat::Jpeg => (
                CaptureScreenshotFormat::Jpeg,
                Some(i64::from(cfg.jpeg_quality)),
            ),
        };

        RenderSession {
            handle,
            page: parts.page,
            console_task: parts.console_task,
            num_frames: parts.num_frames,
            duration_secs: parts.duration_secs,
            format,
            jpeg_quality,
            // The animation container fills the body at exactly the resolved
            // size, so its region is the viewport origin rectangle.
            clip: Viewport {
                x: 0.0,
                y: 0.0,
                width: f64::from(viewport.width),
                height: f64::from(viewport.height),
                scale: 1.0,
            },
        }
    }

    /// Total frame count reported by the player after initialization.
    pub fn num_frames(&self) -> u64 {
        self.num_frames
    }

    /// Animation duration in seconds reported by the player.
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Position the animation at `frame` and capture the container region as
    /// encoded raster bytes.
    pub async fn capture_frame(&mut self, frame: u64) -> LottiecapResult<Vec<u8>> {
        self.page
            .evaluate(format!("animation.goToAndStop({frame}, true)"))
            .await
            .map_err(|e| LottiecapError::render(format!("failed to seek to frame {frame}: {e}")))?;

        let mut params = CaptureScreenshotParams::builder()
            .format(self.format.clone())
            .clip(self.clip.clone());
        if let Some(quality) = self.jpeg_quality {
            params = params.quality(quality);
        }

        let response = self.page.execute(params.build()).await.map_err(|e| {
            LottiecapError::render(format!("failed to capture frame {frame}: {e}"))
        })?;

        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD
            .decode(&response.data)
            .map_err(|e| LottiecapError::render(format!("invalid screenshot payload: {e}")))
    }

    /// Tear the session down. Always closes the page; shuts the browser down
    /// only when this session launched it.
    pub async fn close(self) -> LottiecapResult<()> {
        self.console_task.abort();
        let page_result = self.page.close().await;

        let browser_result = match self.handle {
            BrowserHandle::Owned {
                mut browser,
                handler,
            } => {
                let result = browser.close().await.map(|_| ());
                handler.abort();
                result
            }
            BrowserHandle::External(_) => Ok(()),
        };

        page_result.map_err(|e| LottiecapError::render(format!("failed to close page: {e}")))?;
        browser_result
            .map_err(|e| LottiecapError::render(format!("failed to close browser: {e}")))?;
        Ok(())
    }
}

async fn launch_browser(opts: &BrowserOptions) -> LottiecapResult<(Browser, JoinHandle<()>)> {
    let mut builder = BrowserConfig::builder();
    if let Some(executable) = &opts.executable {
        builder = builder.chrome_executable(executable);
    }
    if opts.no_sandbox {
        builder = builder.no_sandbox();
    }
    if !opts.args.is_empty() {
        builder = builder.args(opts.args.clone());
    }

    let config = builder
        .build()
        .map_err(|e| LottiecapError::render(format!("invalid browser configuration: {e}")))?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| LottiecapError::render(format!("failed to launch browser: {e}")))?;

    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });

    Ok((browser, handler_task))
}

async fn init_page(
    browser: &Browser,
    cfg: &RenderConfig,
    animation: &AnimationSource,
    viewport: &ViewportSpec,
) -> LottiecapResult<PageParts> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| LottiecapError::render(format!("failed to open page: {e}")))?;

    match prepare_page(&page, cfg, animation, viewport).await {
        Ok((console_task, num_frames, duration_secs)) => Ok(PageParts {
            page,
            console_task,
            num_frames,
            duration_secs,
        }),
        Err(e) => {
            let _ = page.close().await;
            Err(e)
        }
    }
}

async fn prepare_page(
    page: &Page,
    cfg: &RenderConfig,
    animation: &AnimationSource,
    viewport: &ViewportSpec,
) -> LottiecapResult<(JoinHandle<()>, u64, f64)> {
    let metrics = SetDeviceMetricsOverrideParams::builder()
        .width(i64::from(viewport.width))
        .height(i64::from(viewport.height))
        .device_scale_factor(f64::from(viewport.device_scale_factor))
        .mobile(false)
        .build()
        .map_err(|e| LottiecapError::render(format!("invalid device metrics: {e}")))?;
    page.execute(metrics)
        .await
        .map_err(|e| LottiecapError::render(format!("failed to set viewport: {e}")))?;

    // Transparent page background so captures omit it.
    let background = SetDefaultBackgroundColorOverrideParams::builder()
        .color(
            Rgba::builder()
                .r(0)
                .g(0)
                .b(0)
                .a(0.0)
                .build()
                .map_err(|e| LottiecapError::render(format!("invalid background color: {e}")))?,
        )
        .build();
    page.execute(background)
        .await
        .map_err(|e| LottiecapError::render(format!("failed to clear background: {e}")))?;

    let console_task = forward_console(page).await?;

    let html = build_document(animation, cfg, viewport)?;
    page.set_content(html)
        .await
        .map_err(|e| LottiecapError::render(format!("failed to load document: {e}")))?;

    tokio::time::timeout(cfg.init_timeout, page.evaluate(READY_WAIT))
        .await
        .map_err(|_| {
            LottiecapError::init_timeout(format!(
                "animation readiness marker did not appear within {:.0?}",
                cfg.init_timeout
            ))
        })?
        .map_err(|e| LottiecapError::render(format!("animation failed to initialize: {e}")))?;

    let duration_secs = read_number(page, "duration").await?;
    let num_frames = read_number(page, "numFrames").await?.max(0.0).floor() as u64;

    Ok((console_task, num_frames, duration_secs))
}

/// Forward page console output to tracing while the session is alive.
async fn forward_console(page: &Page) -> LottiecapResult<JoinHandle<()>> {
    let mut events = page
        .event_listener::<EventConsoleApiCalled>()
        .await
        .map_err(|e| LottiecapError::render(format!("failed to attach console listener: {e}")))?;

    Ok(tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let message = event
                .args
                .iter()
                .map(|arg| {
                    arg.value
                        .as_ref()
                        .map(ToString::to_string)
                        .or_else(|| arg.description.clone())
                        .unwrap_or_default()
                })
                .collect::<Vec<_>>()
                .join(" ");
            tracing::debug!(target: "lottiecap::console", "{message}");
        }
    }))
}

async fn read_number(page: &Page, expression: &str) -> LottiecapResult<f64> {
    page.evaluate(expression)
        .await
        .map_err(|e| LottiecapError::render(format!("failed to evaluate '{expression}': {e}")))?
        .into_value::<f64>()
        .map_err(|e| {
            LottiecapError::render(format!("'{expression}' did not evaluate to a number: {e}"))
        })
}
