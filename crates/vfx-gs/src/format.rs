//! Pixel formats and fixed-function raster state.

/// Color format of a texture or render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorFormat {
    /// 8-bit RGBA, normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit BGRA, normalized.
    Bgra8Unorm,
}

impl ColorFormat {
    /// Bytes per pixel.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Rgba8Unorm | Self::Bgra8Unorm => 4,
        }
    }

    /// Bytes required for a `width` x `height` image.
    pub fn image_bytes(&self, width: u32, height: u32) -> usize {
        (width as usize) * (height as usize) * self.bytes_per_pixel()
    }
}

/// Which buffers a clear touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClearFlags {
    pub color: bool,
    pub depth: bool,
    pub stencil: bool,
}

impl ClearFlags {
    pub const COLOR: Self = Self { color: true, depth: false, stencil: false };
    pub const COLOR_DEPTH: Self = Self { color: true, depth: true, stencil: false };
    pub const ALL: Self = Self { color: true, depth: true, stencil: true };
}

/// Triangle culling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    #[default]
    Back,
    Front,
    Neither,
}

/// Fixed-function state saved and restored by the blend state stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderState {
    /// Color write mask (r, g, b, a).
    pub color_mask: [bool; 4],
    pub blending: bool,
    pub depth_test: bool,
    pub stencil_test: bool,
    pub cull: CullMode,
}

impl RenderState {
    /// State for a pure copy: all channels written, nothing else enabled.
    pub const COPY: Self = Self {
        color_mask: [true; 4],
        blending: false,
        depth_test: false,
        stencil_test: false,
        cull: CullMode::Neither,
    };
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            color_mask: [true; 4],
            blending: true,
            depth_test: false,
            stencil_test: false,
            cull: CullMode::Back,
        }
    }
}

/// How a texture is bound for sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureBind {
    /// Sample with sRGB decode (linear color-space pipeline).
    Srgb,
    /// Sample raw values.
    Linear,
}

impl TextureBind {
    /// Pick the bind call matching the pipeline's color-space mode.
    pub fn for_linear_srgb(linear_srgb: bool) -> Self {
        if linear_srgb { Self::Srgb } else { Self::Linear }
    }
}
