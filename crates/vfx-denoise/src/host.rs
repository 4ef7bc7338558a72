//! Host filter framework interface.
//!
//! The compositor drives the filter through [`FilterHost`]: it reports the
//! size of the next stage, renders the filter's input on request, and
//! renders it unmodified when the filter skips itself.

use std::sync::atomic::{AtomicU64, Ordering};

use vfx_gs::{ColorFormat, Graphics, RenderTarget, Texture, TextureBind};

use crate::DenoiseResult;

/// Per-frame services of the host filter chain.
pub trait FilterHost {
    /// Size of the filter's target, `None` if there is no target.
    fn target_size(&self) -> Option<(u32, u32)>;

    /// Start capturing the filter input. `false` means the input cannot be
    /// rendered this frame.
    fn begin_capture(&self, gs: &dyn Graphics) -> bool;

    /// Render the filter input into the bound target at `width` x `height`.
    fn end_capture(&self, gs: &dyn Graphics, width: u32, height: u32);

    /// Render the input unmodified in place of this filter.
    fn skip_video_filter(&self, gs: &dyn Graphics);
}

/// Host without a compositor: a fixed source frame and an output target.
pub struct HeadlessHost {
    source: Option<Texture>,
    size_override: Option<(u32, u32)>,
    capture: bool,
    skips: AtomicU64,
    captures: AtomicU64,
}

impl HeadlessHost {
    /// Host whose source is `pixels` (RGBA8, `width` x `height`).
    pub fn new(gs: &dyn Graphics, width: u32, height: u32, pixels: &[u8]) -> DenoiseResult<Self> {
        let source = gs.create_texture(width, height, ColorFormat::Rgba8Unorm)?;
        gs.update_texture(&source, pixels)?;
        Ok(Self {
            source: Some(source),
            size_override: None,
            capture: true,
            skips: AtomicU64::new(0),
            captures: AtomicU64::new(0),
        })
    }

    /// Host with no target at all.
    pub fn detached() -> Self {
        Self {
            source: None,
            size_override: None,
            capture: true,
            skips: AtomicU64::new(0),
            captures: AtomicU64::new(0),
        }
    }

    /// Report `size` as the target size regardless of the source.
    pub fn with_target_size(mut self, width: u32, height: u32) -> Self {
        self.size_override = Some((width, height));
        self
    }

    /// Make `begin_capture` fail.
    pub fn with_capture_failing(mut self) -> Self {
        self.capture = false;
        self
    }

    /// Times the filter skipped itself.
    pub fn skips(&self) -> u64 {
        self.skips.load(Ordering::Relaxed)
    }

    /// Completed input captures.
    pub fn captures(&self) -> u64 {
        self.captures.load(Ordering::Relaxed)
    }

    /// Run one frame through `render` into an output target the size of the
    /// source and read it back.
    pub fn render_frame<F>(&self, gs: &dyn Graphics, render: F) -> DenoiseResult<Vec<u8>>
    where
        F: FnOnce(&Self),
    {
        let (width, height) = self.source.as_ref().map_or((1, 1), Texture::size);
        let mut output = RenderTarget::new(ColorFormat::Rgba8Unorm);
        {
            let _op = output.render(gs, width, height)?;
            render(self);
        }
        match output.texture() {
            Some(texture) => Ok(gs.read_texture(texture)?),
            None => Ok(Vec::new()),
        }
    }

    fn draw_source(&self, gs: &dyn Graphics, width: u32, height: u32) {
        let Some(source) = &self.source else { return };
        let bind = TextureBind::for_linear_srgb(gs.linear_srgb());
        if let Err(e) = gs.draw_sprite(source, bind, width, height) {
            tracing::warn!("headless host failed to draw source: {e}");
        }
    }
}

impl FilterHost for HeadlessHost {
    fn target_size(&self) -> Option<(u32, u32)> {
        self.size_override.or_else(|| self.source.as_ref().map(Texture::size))
    }

    fn begin_capture(&self, _gs: &dyn Graphics) -> bool {
        self.capture && self.source.is_some()
    }

    fn end_capture(&self, gs: &dyn Graphics, width: u32, height: u32) {
        self.draw_source(gs, width, height);
        self.captures.fetch_add(1, Ordering::Relaxed);
    }

    fn skip_video_filter(&self, gs: &dyn Graphics) {
        self.skips.fetch_add(1, Ordering::Relaxed);
        if let Some((width, height)) = self.source.as_ref().map(Texture::size) {
            self.draw_source(gs, width, height);
        }
    }
}
