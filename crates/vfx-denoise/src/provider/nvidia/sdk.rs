//! Handle-based interface to the NVIDIA CUDA, CVImage and Video Effects SDKs.
//!
//! The SDK is an opaque collaborator: a host binds the real libraries
//! behind [`NvidiaSdk`] and hands the registry a loader for it. Every call
//! returns an [`SdkStatus`]; anything but success is fatal to the current
//! operation and surfaces as [`DenoiseError::Sdk`].

use tracing::{error, warn};
use vfx_gs::{NativeTexture, Texture};

use crate::buffers::ResourceMapper;
use crate::{DenoiseError, DenoiseResult};

/// SDK result code. Zero is success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SdkStatus(pub i32);

impl SdkStatus {
    pub const SUCCESS: Self = Self(0);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }
}

/// CUDA stream handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CudaStream(pub u64);

/// Video effect instance handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectHandle(pub u64);

/// CVImage descriptor.
///
/// Filled by [`NvidiaSdk::image_init_from_texture`]; aliases the texture's
/// memory once mapped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CvImage {
    pub width: u32,
    pub height: u32,
    /// Row pitch in bytes.
    pub pitch: u32,
    /// Device pointer while mapped.
    pub pixels: u64,
    /// Graphics resource the image was created from.
    pub resource: Option<NativeTexture>,
    pub mapped: bool,
}

/// NVIDIA SDK entry points used by the noise removal provider.
pub trait NvidiaSdk: Send + Sync {
    // =========================================================================
    // CUDA
    // =========================================================================

    /// Make the shared CUDA context current on this thread.
    fn cuda_push_context(&self) -> SdkStatus;

    /// Undo [`cuda_push_context`](Self::cuda_push_context).
    fn cuda_pop_context(&self) -> SdkStatus;

    /// Shared CUDA stream.
    fn cuda_stream(&self) -> CudaStream;

    // =========================================================================
    // CVImage
    // =========================================================================

    /// `NvCVImage_InitFromD3D11Texture` and friends: describe `texture` in `image`.
    fn image_init_from_texture(&self, image: &mut CvImage, texture: &Texture) -> SdkStatus;

    /// `NvCVImage_MapResource`.
    fn image_map_resource(&self, image: &mut CvImage, stream: CudaStream) -> SdkStatus;

    /// `NvCVImage_UnmapResource`.
    fn image_unmap_resource(&self, image: &mut CvImage, stream: CudaStream) -> SdkStatus;

    /// `NvCVImage_Dealloc`.
    fn image_dealloc(&self, image: &mut CvImage);

    /// `NvCV_GetErrorStringFromCode`.
    fn error_string(&self, status: SdkStatus) -> String;

    // =========================================================================
    // Video Effects
    // =========================================================================

    /// `NvVFX_CreateEffect`.
    fn effect_create(&self, selector: &str) -> Result<EffectHandle, SdkStatus>;

    /// `NvVFX_DestroyEffect`.
    fn effect_destroy(&self, effect: EffectHandle);

    /// Bind the CUDA stream the effect runs on.
    fn effect_set_stream(&self, effect: EffectHandle, stream: CudaStream) -> SdkStatus;

    /// Bind source and destination images.
    fn effect_set_images(&self, effect: EffectHandle, input: &CvImage, output: &CvImage) -> SdkStatus;

    /// `NvVFX_Load`: prepare the effect for the bound image sizes.
    fn effect_load(&self, effect: EffectHandle) -> SdkStatus;

    /// `NvVFX_Run`.
    fn effect_run(&self, effect: EffectHandle) -> SdkStatus;
}

/// Turn a result code into a `Result`, logging failures.
pub(crate) fn check(sdk: &dyn NvidiaSdk, call: &'static str, status: SdkStatus) -> DenoiseResult<()> {
    if status.is_success() {
        return Ok(());
    }
    let message = sdk.error_string(status);
    error!("Failed to {call} with error: {message}");
    Err(DenoiseError::Sdk { call, code: status.0, message })
}

/// Scoped CUDA context.
pub(crate) struct CudaContextGuard<'a> {
    sdk: &'a dyn NvidiaSdk,
}

impl<'a> CudaContextGuard<'a> {
    pub(crate) fn enter(sdk: &'a dyn NvidiaSdk) -> DenoiseResult<Self> {
        check(sdk, "cuCtxPushCurrent", sdk.cuda_push_context())?;
        Ok(Self { sdk })
    }
}

impl Drop for CudaContextGuard<'_> {
    fn drop(&mut self) {
        let status = self.sdk.cuda_pop_context();
        if !status.is_success() {
            warn!("Failed to cuCtxPopCurrent with error: {}", self.sdk.error_string(status));
        }
    }
}

/// Maps textures to CVImages on the shared stream.
pub(crate) struct CvMapper<'a> {
    sdk: &'a dyn NvidiaSdk,
    stream: CudaStream,
}

impl<'a> CvMapper<'a> {
    pub(crate) fn new(sdk: &'a dyn NvidiaSdk) -> Self {
        Self { sdk, stream: sdk.cuda_stream() }
    }
}

impl ResourceMapper for CvMapper<'_> {
    type Image = CvImage;

    fn map(&self, texture: &Texture) -> DenoiseResult<CvImage> {
        let mut image = CvImage::default();
        check(self.sdk, "NvCVImage_InitFromD3D11Texture", self.sdk.image_init_from_texture(&mut image, texture))?;
        if let Err(e) = check(self.sdk, "NvCVImage_MapResource", self.sdk.image_map_resource(&mut image, self.stream)) {
            self.sdk.image_dealloc(&mut image);
            return Err(e);
        }
        Ok(image)
    }

    fn unmap(&self, image: &mut CvImage) -> DenoiseResult<()> {
        let result = check(self.sdk, "NvCVImage_UnmapResource", self.sdk.image_unmap_resource(image, self.stream));
        self.sdk.image_dealloc(image);
        result
    }
}
