//! CPU implementation of the graphics subsystem.
//!
//! Textures live in RAM; drawing is nearest-neighbour sampling. Used by
//! headless hosts and by tests that need to observe pixels.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::warn;

use crate::{
    ClearFlags, ColorFormat, Graphics, GsError, GsResult, NativeTexture, RenderState, Texture, TextureBind,
    TextureId, TextureRelease,
};

struct SoftTexture {
    width: u32,
    height: u32,
    format: ColorFormat,
    data: Vec<u8>,
}

/// Texture storage, shared with texture handles for release on drop.
struct Store {
    next_id: AtomicU64,
    textures: Mutex<HashMap<TextureId, SoftTexture>>,
}

impl TextureRelease for Store {
    fn release(&self, id: TextureId) {
        self.textures.lock().unwrap().remove(&id);
    }
}

struct SoftState {
    target: Option<Texture>,
    render_state: RenderState,
    blend_stack: Vec<RenderState>,
    framebuffer_srgb: bool,
    context_depth: usize,
}

/// Counters describing the software device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GsStats {
    /// Textures currently alive.
    pub live_textures: usize,
    /// Textures created over the device lifetime.
    pub allocations: u64,
    /// Sprite draws issued.
    pub draws: u64,
    /// Copies issued.
    pub copies: u64,
    /// Pushed, not yet popped raster states.
    pub blend_depth: usize,
    /// Entered, not yet left contexts.
    pub context_depth: usize,
}

/// CPU graphics device.
pub struct SoftwareGraphics {
    store: Arc<Store>,
    state: Mutex<SoftState>,
    linear_srgb: bool,
    allocations: AtomicU64,
    draws: AtomicU64,
    copies: AtomicU64,
}

impl SoftwareGraphics {
    /// Device running a gamma-space pipeline.
    pub fn new() -> Self {
        Self::with_linear_srgb(false)
    }

    /// Device whose pipeline runs in linear color space when `linear_srgb` is set.
    pub fn with_linear_srgb(linear_srgb: bool) -> Self {
        Self {
            store: Arc::new(Store {
                next_id: AtomicU64::new(1),
                textures: Mutex::new(HashMap::new()),
            }),
            state: Mutex::new(SoftState {
                target: None,
                render_state: RenderState::default(),
                blend_stack: Vec::new(),
                framebuffer_srgb: false,
                context_depth: 0,
            }),
            linear_srgb,
            allocations: AtomicU64::new(0),
            draws: AtomicU64::new(0),
            copies: AtomicU64::new(0),
        }
    }

    /// Snapshot of device counters.
    pub fn stats(&self) -> GsStats {
        let state = self.state.lock().unwrap();
        GsStats {
            live_textures: self.store.textures.lock().unwrap().len(),
            allocations: self.allocations.load(Ordering::Relaxed),
            draws: self.draws.load(Ordering::Relaxed),
            copies: self.copies.load(Ordering::Relaxed),
            blend_depth: state.blend_stack.len(),
            context_depth: state.context_depth,
        }
    }

    /// Read pixels by backend handle, as an interop SDK aliasing the texture would.
    pub fn read_native(&self, native: NativeTexture) -> GsResult<Vec<u8>> {
        let textures = self.store.textures.lock().unwrap();
        textures
            .get(&native.0)
            .map(|t| t.data.clone())
            .ok_or(GsError::UnknownTexture(native.0))
    }

    /// Write pixels by backend handle.
    pub fn write_native(&self, native: NativeTexture, data: &[u8]) -> GsResult<()> {
        let mut textures = self.store.textures.lock().unwrap();
        let tex = textures.get_mut(&native.0).ok_or(GsError::UnknownTexture(native.0))?;
        if tex.data.len() != data.len() {
            return Err(GsError::BufferSizeMismatch { expected: tex.data.len(), actual: data.len() });
        }
        tex.data.copy_from_slice(data);
        Ok(())
    }

    fn bound_target(&self) -> GsResult<Texture> {
        self.state.lock().unwrap().target.clone().ok_or(GsError::NoRenderTarget)
    }
}

impl Default for SoftwareGraphics {
    fn default() -> Self {
        Self::new()
    }
}

impl Graphics for SoftwareGraphics {
    fn name(&self) -> &'static str {
        "software"
    }

    fn enter_context(&self) {
        self.state.lock().unwrap().context_depth += 1;
    }

    fn leave_context(&self) {
        let mut state = self.state.lock().unwrap();
        if state.context_depth == 0 {
            warn!("leave_context without matching enter_context");
            return;
        }
        state.context_depth -= 1;
    }

    fn create_texture(&self, width: u32, height: u32, format: ColorFormat) -> GsResult<Texture> {
        if width == 0 || height == 0 {
            return Err(GsError::InvalidDimensions(width, height));
        }
        let id = self.store.next_id.fetch_add(1, Ordering::Relaxed);
        self.store.textures.lock().unwrap().insert(
            id,
            SoftTexture { width, height, format, data: vec![0; format.image_bytes(width, height)] },
        );
        self.allocations.fetch_add(1, Ordering::Relaxed);

        let owner: Arc<dyn TextureRelease> = self.store.clone();
        let owner: Weak<dyn TextureRelease> = Arc::downgrade(&owner);
        Ok(Texture::new(id, width, height, format, NativeTexture(id), owner))
    }

    fn update_texture(&self, texture: &Texture, data: &[u8]) -> GsResult<()> {
        self.write_native(texture.native(), data)
    }

    fn read_texture(&self, texture: &Texture) -> GsResult<Vec<u8>> {
        self.read_native(texture.native())
    }

    fn copy_texture(&self, dst: &Texture, src: &Texture) -> GsResult<()> {
        if dst.size() != src.size() {
            return Err(GsError::SizeMismatch {
                src_width: src.width(),
                src_height: src.height(),
                dst_width: dst.width(),
                dst_height: dst.height(),
            });
        }
        if dst.format() != src.format() {
            return Err(GsError::FormatMismatch { src: src.format(), dst: dst.format() });
        }

        let mut textures = self.store.textures.lock().unwrap();
        let data = textures.get(&src.id()).ok_or(GsError::UnknownTexture(src.id()))?.data.clone();
        textures.get_mut(&dst.id()).ok_or(GsError::UnknownTexture(dst.id()))?.data = data;
        self.copies.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn render_target(&self) -> Option<Texture> {
        self.state.lock().unwrap().target.clone()
    }

    fn set_render_target(&self, target: Option<&Texture>) {
        let previous = {
            let mut state = self.state.lock().unwrap();
            std::mem::replace(&mut state.target, target.cloned())
        };
        // Dropping the old handle may release it; do that outside the state lock.
        drop(previous);
    }

    fn clear(&self, flags: ClearFlags, color: [f32; 4], _depth: f32, _stencil: u8) {
        if !flags.color {
            return;
        }
        let Ok(target) = self.bound_target() else {
            warn!("clear without render target");
            return;
        };
        let texel = color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        let mut textures = self.store.textures.lock().unwrap();
        if let Some(tex) = textures.get_mut(&target.id()) {
            let texel = match tex.format {
                ColorFormat::Rgba8Unorm => texel,
                ColorFormat::Bgra8Unorm => [texel[2], texel[1], texel[0], texel[3]],
            };
            for px in bytemuck::cast_slice_mut::<u8, [u8; 4]>(&mut tex.data) {
                *px = texel;
            }
        }
    }

    fn blend_state_push(&self) {
        let mut state = self.state.lock().unwrap();
        let current = state.render_state;
        state.blend_stack.push(current);
    }

    fn blend_state_pop(&self) {
        let mut state = self.state.lock().unwrap();
        match state.blend_stack.pop() {
            Some(saved) => state.render_state = saved,
            None => warn!("blend_state_pop on empty stack"),
        }
    }

    fn render_state(&self) -> RenderState {
        self.state.lock().unwrap().render_state
    }

    fn set_render_state(&self, render_state: RenderState) {
        self.state.lock().unwrap().render_state = render_state;
    }

    fn framebuffer_srgb_enabled(&self) -> bool {
        self.state.lock().unwrap().framebuffer_srgb
    }

    fn enable_framebuffer_srgb(&self, enable: bool) {
        self.state.lock().unwrap().framebuffer_srgb = enable;
    }

    fn linear_srgb(&self) -> bool {
        self.linear_srgb
    }

    fn draw_sprite(&self, texture: &Texture, _bind: TextureBind, width: u32, height: u32) -> GsResult<()> {
        if width == 0 || height == 0 {
            return Err(GsError::InvalidDimensions(width, height));
        }
        let target = self.bound_target()?;
        if target.format() != texture.format() {
            return Err(GsError::FormatMismatch { src: texture.format(), dst: target.format() });
        }

        let mut textures = self.store.textures.lock().unwrap();
        let src = textures.get(&texture.id()).ok_or(GsError::UnknownTexture(texture.id()))?;
        let (sw, sh) = (src.width as u64, src.height as u64);
        let src_px: Vec<[u8; 4]> = bytemuck::cast_slice::<u8, [u8; 4]>(&src.data).to_vec();

        let dst = textures.get_mut(&target.id()).ok_or(GsError::UnknownTexture(target.id()))?;
        let (dw, dh) = (dst.width.min(width), dst.height.min(height));
        let stride = dst.width as usize;
        let dst_px = bytemuck::cast_slice_mut::<u8, [u8; 4]>(&mut dst.data);

        // Sprite spans (width, height) from the origin, clipped to the target.
        for y in 0..dh {
            let sy = (y as u64 * sh / height as u64) as usize;
            for x in 0..dw {
                let sx = (x as u64 * sw / width as u64) as usize;
                dst_px[y as usize * stride + x as usize] = src_px[sy * sw as usize + sx];
            }
        }
        self.draws.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
