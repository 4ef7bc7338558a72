//! Lazily re-sized render target.

use tracing::trace;

use crate::{ColorFormat, Graphics, GsError, GsResult, Texture};

/// Texture that is rendered into, re-created only when its size changes.
pub struct RenderTarget {
    format: ColorFormat,
    texture: Option<Texture>,
    allocations: u64,
}

impl RenderTarget {
    pub fn new(format: ColorFormat) -> Self {
        Self { format, texture: None, allocations: 0 }
    }

    /// Bind this target at `width` x `height` until the returned op drops.
    ///
    /// The backing texture is re-created if and only if the size differs
    /// from the current allocation.
    pub fn render<'g>(&mut self, gs: &'g dyn Graphics, width: u32, height: u32) -> GsResult<RenderTargetOp<'g>> {
        if width == 0 || height == 0 {
            return Err(GsError::InvalidDimensions(width, height));
        }

        let stale = self.texture.as_ref().is_none_or(|t| t.size() != (width, height));
        if stale {
            self.texture = None;
            self.texture = Some(gs.create_texture(width, height, self.format)?);
            self.allocations += 1;
            trace!(width, height, "render target re-allocated");
        }

        let previous = gs.render_target();
        gs.set_render_target(self.texture.as_ref());
        Ok(RenderTargetOp { gs, previous })
    }

    /// Backing texture of the last render.
    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    /// Current allocation size, (0, 0) before the first render.
    pub fn size(&self) -> (u32, u32) {
        self.texture.as_ref().map_or((0, 0), Texture::size)
    }

    pub fn format(&self) -> ColorFormat {
        self.format
    }

    /// Number of texture allocations so far.
    pub fn allocations(&self) -> u64 {
        self.allocations
    }
}

/// Active render into a [`RenderTarget`]; restores the previous target on drop.
pub struct RenderTargetOp<'g> {
    gs: &'g dyn Graphics,
    previous: Option<Texture>,
}

impl Drop for RenderTargetOp<'_> {
    fn drop(&mut self) {
        self.gs.set_render_target(self.previous.as_ref());
    }
}
