//! The graphics subsystem trait and its scope guards.

use crate::{ClearFlags, ColorFormat, GsResult, RenderState, Texture, TextureBind};

/// Graphics subsystem supplied by the host compositor.
///
/// All methods take `&self`; implementations synchronize internally so a
/// filter can hold `&dyn Graphics` on the render thread and on workers.
pub trait Graphics: Send + Sync {
    /// Implementation name for logs.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Context
    // =========================================================================

    /// Make the graphics context current on this thread (nestable).
    fn enter_context(&self);

    /// Release the context entered with [`enter_context`](Self::enter_context).
    fn leave_context(&self);

    // =========================================================================
    // Resources
    // =========================================================================

    /// Allocate a texture usable as render target and copy destination.
    fn create_texture(&self, width: u32, height: u32, format: ColorFormat) -> GsResult<Texture>;

    /// Replace the full contents of a texture.
    fn update_texture(&self, texture: &Texture, data: &[u8]) -> GsResult<()>;

    /// Read back the full contents of a texture.
    fn read_texture(&self, texture: &Texture) -> GsResult<Vec<u8>>;

    /// GPU-side copy; both textures must have the same size and format.
    fn copy_texture(&self, dst: &Texture, src: &Texture) -> GsResult<()>;

    // =========================================================================
    // Render target
    // =========================================================================

    /// Currently bound render target.
    fn render_target(&self) -> Option<Texture>;

    /// Bind a render target (None unbinds).
    fn set_render_target(&self, target: Option<&Texture>);

    /// Clear the bound render target.
    fn clear(&self, flags: ClearFlags, color: [f32; 4], depth: f32, stencil: u8);

    // =========================================================================
    // Raster state
    // =========================================================================

    /// Save the current raster state.
    fn blend_state_push(&self);

    /// Restore the last saved raster state.
    fn blend_state_pop(&self);

    /// Current raster state.
    fn render_state(&self) -> RenderState;

    /// Replace the raster state.
    fn set_render_state(&self, state: RenderState);

    /// Whether framebuffer sRGB encoding is enabled.
    fn framebuffer_srgb_enabled(&self) -> bool;

    fn enable_framebuffer_srgb(&self, enable: bool);

    /// Whether the pipeline runs in linear color space with sRGB textures.
    fn linear_srgb(&self) -> bool;

    // =========================================================================
    // Drawing
    // =========================================================================

    /// Draw `texture` as a `width` x `height` sprite into the bound target.
    fn draw_sprite(&self, texture: &Texture, bind: TextureBind, width: u32, height: u32) -> GsResult<()>;
}

/// Scoped graphics context; leaves it on drop.
pub struct ContextGuard<'a> {
    gs: &'a dyn Graphics,
}

impl<'a> ContextGuard<'a> {
    pub fn enter(gs: &'a dyn Graphics) -> Self {
        gs.enter_context();
        Self { gs }
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.gs.leave_context();
    }
}

/// Scoped raster state; pushes on creation, pops on drop.
pub struct BlendStateGuard<'a> {
    gs: &'a dyn Graphics,
}

impl<'a> BlendStateGuard<'a> {
    /// Push the current state and apply `state`.
    pub fn apply(gs: &'a dyn Graphics, state: RenderState) -> Self {
        gs.blend_state_push();
        gs.set_render_state(state);
        Self { gs }
    }
}

impl Drop for BlendStateGuard<'_> {
    fn drop(&mut self) {
        self.gs.blend_state_pop();
    }
}
