//! GPU-resident buffers mapped into a provider's memory space.
//!
//! A [`ResourceBuffer`] pairs a texture with the provider-native image that
//! aliases its memory. Both are torn down and rebuilt together, and only
//! when the requested size differs from the current allocation.

use tracing::{debug, error};
use vfx_gs::{ColorFormat, Graphics, Texture};

use crate::DenoiseResult;

/// Maps textures into a provider's memory space.
pub trait ResourceMapper {
    /// Provider-native image aliasing a texture.
    type Image;

    /// Create a native image over `texture` without copying.
    fn map(&self, texture: &Texture) -> DenoiseResult<Self::Image>;

    /// Unmap and deallocate a native image.
    fn unmap(&self, image: &mut Self::Image) -> DenoiseResult<()>;
}

/// Texture plus its mapped native image.
pub struct ResourceBuffer<I> {
    format: ColorFormat,
    texture: Option<Texture>,
    image: Option<I>,
    allocations: u64,
}

impl<I> ResourceBuffer<I> {
    pub fn new(format: ColorFormat) -> Self {
        Self { format, texture: None, image: None, allocations: 0 }
    }

    /// Ensure the buffer is `width` x `height` and mapped.
    ///
    /// Returns `true` if it was re-allocated. A mapping failure leaves the
    /// buffer empty so the next call retries.
    pub fn resize<M>(&mut self, gs: &dyn Graphics, mapper: &M, width: u32, height: u32) -> DenoiseResult<bool>
    where
        M: ResourceMapper<Image = I>,
    {
        if self.image.is_some() && self.size() == (width, height) {
            return Ok(false);
        }

        self.release(mapper)?;

        let texture = gs.create_texture(width, height, self.format)?;
        let image = mapper.map(&texture)?;
        self.texture = Some(texture);
        self.image = Some(image);
        self.allocations += 1;
        debug!(width, height, allocations = self.allocations, "resource buffer re-allocated");
        Ok(true)
    }

    /// Unmap and drop the buffer. The texture is dropped even if unmapping fails.
    pub fn release<M>(&mut self, mapper: &M) -> DenoiseResult<()>
    where
        M: ResourceMapper<Image = I>,
    {
        let result = match self.image.take() {
            Some(mut image) => mapper.unmap(&mut image),
            None => Ok(()),
        };
        self.texture = None;
        if let Err(e) = &result {
            error!("Failed to release resource buffer: {e}");
        }
        result
    }

    /// Allocated size, (0, 0) when empty.
    pub fn size(&self) -> (u32, u32) {
        self.texture.as_ref().map_or((0, 0), Texture::size)
    }

    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    pub fn image(&self) -> Option<&I> {
        self.image.as_ref()
    }

    pub fn is_allocated(&self) -> bool {
        self.image.is_some()
    }

    /// Number of allocations over the buffer's lifetime.
    pub fn allocations(&self) -> u64 {
        self.allocations
    }
}
