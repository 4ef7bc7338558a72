//! Per-frame render step.
//!
//! ```text
//! target? ready? ──no──> skip (pass-through)
//!   │
//!   ├── try-lock provider ──busy──> skip
//!   │     ├── clamp frame size
//!   │     ├── capture input into the input target
//!   │     └── provider.process ──none──> skip
//!   ├── unlock
//!   ├── shrink input target to 1x1
//!   └── draw output for the next filter
//! ```

use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{error, trace, warn};
use vfx_gs::{BlendStateGuard, ClearFlags, ColorFormat, Graphics, RenderState, RenderTarget, TextureBind};

use crate::host::FilterHost;
use crate::provider::DenoiseProvider;
use crate::switch::ProviderState;
use crate::DenoiseResult;

/// Why a frame passed through unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Host has no target for this filter.
    NoTarget,
    /// Target has a zero dimension.
    EmptyTarget,
    /// No provider is ready.
    NotReady,
    /// Host could not render the filter input.
    CaptureFailed,
    /// Provider produced no output.
    NoOutput,
    /// Provider or graphics call failed.
    Failed,
}

/// Result of one render step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Denoised output drawn at the given size.
    Rendered { width: u32, height: u32 },
    /// Input passed through.
    Skipped(SkipReason),
}

impl RenderOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }
}

/// Negotiated output size, readable from any thread.
pub(crate) struct FrameSize {
    width: AtomicU32,
    height: AtomicU32,
}

impl FrameSize {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self { width: AtomicU32::new(width), height: AtomicU32::new(height) }
    }

    pub(crate) fn get(&self) -> (u32, u32) {
        (self.width.load(Ordering::Relaxed), self.height.load(Ordering::Relaxed))
    }

    fn set(&self, (width, height): (u32, u32)) {
        self.width.store(width, Ordering::Relaxed);
        self.height.store(height, Ordering::Relaxed);
    }
}

/// Render-thread buffers of one instance.
pub(crate) struct FramePipeline {
    input: RenderTarget,
}

impl FramePipeline {
    /// Pre-allocate a 1x1 input target so the driver creates it up front.
    pub(crate) fn new(gs: &dyn Graphics) -> DenoiseResult<Self> {
        let mut input = RenderTarget::new(ColorFormat::Rgba8Unorm);
        drop(input.render(gs, 1, 1)?);
        Ok(Self { input })
    }

    /// Size of the input target allocation.
    pub(crate) fn input_size(&self) -> (u32, u32) {
        self.input.size()
    }

    pub(crate) fn render(&mut self, state: &ProviderState, size: &FrameSize, host: &dyn FilterHost) -> RenderOutcome {
        let gs = &*state.gs;

        let (width, height) = match host.target_size() {
            None => return skip(host, gs, SkipReason::NoTarget),
            Some((w, h)) if w == 0 || h == 0 => return skip(host, gs, SkipReason::EmptyTarget),
            Some(dims) => dims,
        };
        if !state.is_ready() {
            return skip(host, gs, SkipReason::NotReady);
        }

        let (output, frame) = {
            // Lock the provider from being changed. A switch holding the
            // lock may be inside a long SDK call; never wait for it here.
            let Some(mut active) = state.try_lock() else {
                return skip(host, gs, SkipReason::NotReady);
            };
            let Some(backend) = active.backend.as_mut() else {
                return skip(host, gs, SkipReason::NotReady);
            };

            // Allow the provider to restrict the size.
            let frame = backend.resize(width, height);
            size.set(frame);

            match self.capture(gs, host, frame) {
                Ok(true) => {}
                Ok(false) => {
                    drop(active);
                    self.shrink(gs);
                    return skip(host, gs, SkipReason::CaptureFailed);
                }
                Err(e) => {
                    error!("Failed to capture filter input: {e}");
                    return skip(host, gs, SkipReason::Failed);
                }
            }

            let Some(input) = self.input.texture().cloned() else {
                return skip(host, gs, SkipReason::Failed);
            };
            match backend.process(gs, &input, frame) {
                Ok(Some(output)) => (output, frame),
                Ok(None) => {
                    error!("Provider '{}' did not return a result.", backend.kind());
                    drop(active);
                    self.shrink(gs);
                    return skip(host, gs, SkipReason::NoOutput);
                }
                Err(e) => {
                    error!("Provider '{}' failed to process frame: {e}", backend.kind());
                    drop(active);
                    self.shrink(gs);
                    return skip(host, gs, SkipReason::Failed);
                }
            }
        };

        // The input is not needed until the next frame.
        self.shrink(gs);

        // Draw the result for the next filter to use.
        let bind = TextureBind::for_linear_srgb(gs.linear_srgb());
        if let Err(e) = gs.draw_sprite(&output, bind, frame.0, frame.1) {
            error!("Failed to draw denoised output: {e}");
            return skip(host, gs, SkipReason::Failed);
        }
        trace!(width = frame.0, height = frame.1, "frame denoised");
        RenderOutcome::Rendered { width: frame.0, height: frame.1 }
    }

    /// Render the filter input into the input target as a pure copy.
    ///
    /// The target is bound before `begin_capture`, so a successful
    /// `begin_capture` is always paired with `end_capture`.
    fn capture(&mut self, gs: &dyn Graphics, host: &dyn FilterHost, (width, height): (u32, u32)) -> DenoiseResult<bool> {
        let _op = self.input.render(gs, width, height)?;
        gs.clear(ClearFlags::COLOR_DEPTH, [0.0; 4], 0.0, 0);

        if !host.begin_capture(gs) {
            return Ok(false);
        }

        let _blend = BlendStateGuard::apply(gs, RenderState::COPY);
        let srgb = gs.framebuffer_srgb_enabled();
        gs.enable_framebuffer_srgb(gs.linear_srgb());
        host.end_capture(gs, width, height);
        gs.enable_framebuffer_srgb(srgb);
        Ok(true)
    }

    fn shrink(&mut self, gs: &dyn Graphics) {
        if let Err(e) = self.input.render(gs, 1, 1) {
            warn!("Failed to shrink input buffer: {e}");
        }
    }
}

fn skip(host: &dyn FilterHost, gs: &dyn Graphics, reason: SkipReason) -> RenderOutcome {
    trace!(?reason, "skipping video filter");
    host.skip_video_filter(gs);
    RenderOutcome::Skipped(reason)
}
