//! NVIDIA Video Effects noise removal.
//!
//! Input and output frames live in graphics textures that CUDA maps
//! directly (no host copies). The effect instance is created on `load`;
//! images are bound and the model prepared whenever the buffers are
//! re-allocated.

mod sdk;

use std::sync::Arc;

use tracing::{debug, info};
use vfx_gs::{ColorFormat, ContextGuard, Graphics, Texture};

use super::{DenoiseProvider, Provider, clamp_dominant_axis};
use crate::buffers::ResourceBuffer;
use crate::{DenoiseError, DenoiseResult};

pub use sdk::{CudaStream, CvImage, EffectHandle, NvidiaSdk, SdkStatus};
use sdk::{CudaContextGuard, CvMapper, check};

/// Effect selector for noise removal.
pub const EFFECT_SELECTOR: &str = "Denoising";

/// Supported horizontal range (80p..1080p at 16:9).
pub const WIDTH_RANGE: (u32, u32) = (142, 1920);

/// Supported vertical range. The SDK documents 80p..1080p.
pub const HEIGHT_RANGE: (u32, u32) = (80, 1080);

/// Clamp a frame size into the noise removal operating range.
pub fn clamp_size(width: u32, height: u32) -> (u32, u32) {
    clamp_dominant_axis(width, height, WIDTH_RANGE, HEIGHT_RANGE)
}

/// Noise removal provider for one filter instance.
pub struct NvidiaNoiseRemoval {
    sdk: Arc<dyn NvidiaSdk>,
    effect: Option<EffectHandle>,
    input: ResourceBuffer<CvImage>,
    output: ResourceBuffer<CvImage>,
    /// Images bound and model loaded for the current buffers.
    prepared: bool,
}

impl NvidiaNoiseRemoval {
    pub fn new(sdk: Arc<dyn NvidiaSdk>) -> Self {
        Self {
            sdk,
            effect: None,
            input: ResourceBuffer::new(ColorFormat::Rgba8Unorm),
            output: ResourceBuffer::new(ColorFormat::Rgba8Unorm),
            prepared: false,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.effect.is_some()
    }

    /// Mapped input buffer.
    pub fn input_buffer(&self) -> &ResourceBuffer<CvImage> {
        &self.input
    }

    /// Mapped output buffer.
    pub fn output_buffer(&self) -> &ResourceBuffer<CvImage> {
        &self.output
    }

    fn prepare(&mut self, effect: EffectHandle) -> DenoiseResult<bool> {
        let (Some(input), Some(output)) = (self.input.image(), self.output.image()) else {
            return Ok(false);
        };
        let sdk = &*self.sdk;
        check(sdk, "NvVFX_SetImage", sdk.effect_set_images(effect, input, output))?;
        check(sdk, "NvVFX_Load", sdk.effect_load(effect))?;
        self.prepared = true;
        Ok(true)
    }
}

impl DenoiseProvider for NvidiaNoiseRemoval {
    fn kind(&self) -> Provider {
        Provider::NvidiaVideoNoiseRemoval
    }

    fn load(&mut self, _gs: &dyn Graphics) -> DenoiseResult<()> {
        if self.effect.is_some() {
            return Ok(());
        }

        let sdk = &*self.sdk;
        let _cuda = CudaContextGuard::enter(sdk)?;
        let effect = sdk.effect_create(EFFECT_SELECTOR).or_else(|status| {
            check(sdk, "NvVFX_CreateEffect", status)?;
            Err(DenoiseError::Sdk {
                call: "NvVFX_CreateEffect",
                code: status.0,
                message: "no effect returned".into(),
            })
        })?;
        if let Err(e) = check(sdk, "NvVFX_SetCudaStream", sdk.effect_set_stream(effect, sdk.cuda_stream())) {
            sdk.effect_destroy(effect);
            return Err(e);
        }

        self.effect = Some(effect);
        self.prepared = false;
        info!("NVIDIA Video Noise Removal loaded");
        Ok(())
    }

    fn unload(&mut self, gs: &dyn Graphics) -> DenoiseResult<()> {
        let _gctx = ContextGuard::enter(gs);
        let sdk = &*self.sdk;

        // Buffers are released even without a CUDA context; unmapping then fails and is reported.
        let cuda = CudaContextGuard::enter(sdk);
        let mapper = CvMapper::new(sdk);
        let released_input = self.input.release(&mapper);
        let released_output = self.output.release(&mapper);

        if let Some(effect) = self.effect.take() {
            sdk.effect_destroy(effect);
            debug!("NVIDIA Video Noise Removal unloaded");
        }
        self.prepared = false;
        drop(cuda?);

        released_input.and(released_output)
    }

    fn resize(&self, width: u32, height: u32) -> (u32, u32) {
        clamp_size(width, height)
    }

    fn process(&mut self, gs: &dyn Graphics, input: &Texture, size: (u32, u32)) -> DenoiseResult<Option<Texture>> {
        let effect = self.effect.ok_or(DenoiseError::NotLoaded(self.kind()))?;
        let sdk = Arc::clone(&self.sdk);
        let _cuda = CudaContextGuard::enter(&*sdk)?;

        // Re-create the buffers if necessary.
        let (width, height) = size;
        let mapper = CvMapper::new(&*sdk);
        let mut reallocated = self.input.resize(gs, &mapper, width, height)?;
        reallocated |= self.output.resize(gs, &mapper, width, height)?;
        if reallocated {
            self.prepared = false;
        }
        if !self.prepared && !self.prepare(effect)? {
            return Ok(None);
        }

        // Copy the captured input into the mapped buffer.
        let Some(buffer) = self.input.texture() else {
            return Ok(None);
        };
        gs.copy_texture(buffer, input)?;

        check(&*sdk, "NvVFX_Run", sdk.effect_run(effect))?;
        Ok(self.output.texture().cloned())
    }
}
