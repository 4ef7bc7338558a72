//! Graphics subsystem interface for VFX filters.
//!
//! Filters never talk to a GPU API directly. They talk to a [`Graphics`]
//! implementation supplied by the host compositor, which owns the device,
//! the current render target and the blend/raster state stack.
//!
//! # Architecture
//!
//! ```text
//! Graphics (trait, host supplied)
//!     ├── Texture        ref-counted handle, released on last drop
//!     ├── RenderTarget   lazily re-sized texture + scoped render op
//!     ├── ContextGuard   enter/leave the graphics context off-thread
//!     └── BlendStateGuard push/pop of raster state
//!
//! SoftwareGraphics (CPU implementation for headless hosts and tests)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use vfx_gs::{ColorFormat, RenderTarget, SoftwareGraphics};
//!
//! let gs = SoftwareGraphics::new();
//! let mut rt = RenderTarget::new(ColorFormat::Rgba8Unorm);
//! {
//!     let _op = rt.render(&gs, 1920, 1080)?;
//!     // draw into the target
//! }
//! ```

mod format;
mod graphics;
mod render_target;
mod software;
mod texture;

pub use format::{ClearFlags, ColorFormat, CullMode, RenderState, TextureBind};
pub use graphics::{BlendStateGuard, ContextGuard, Graphics};
pub use render_target::{RenderTarget, RenderTargetOp};
pub use software::{GsStats, SoftwareGraphics};
pub use texture::{NativeTexture, Texture, TextureId, TextureRelease};

use thiserror::Error;

/// Graphics subsystem errors.
#[derive(Error, Debug)]
pub enum GsError {
    #[error("Invalid texture dimensions: {0}x{1}")]
    InvalidDimensions(u32, u32),

    #[error("Unknown texture: {0}")]
    UnknownTexture(TextureId),

    #[error("Texture size mismatch: {src_width}x{src_height} into {dst_width}x{dst_height}")]
    SizeMismatch {
        src_width: u32,
        src_height: u32,
        dst_width: u32,
        dst_height: u32,
    },

    #[error("Texture format mismatch: {src:?} into {dst:?}")]
    FormatMismatch { src: ColorFormat, dst: ColorFormat },

    #[error("Buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("No render target bound")]
    NoRenderTarget,

    #[error("Graphics operation failed: {0}")]
    OperationFailed(String),
}

pub type GsResult<T> = Result<T, GsError>;
