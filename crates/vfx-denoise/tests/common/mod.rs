//! Shared fixtures: an in-process NVIDIA SDK over the software device.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use vfx_denoise::provider::nvidia::{CudaStream, CvImage, EffectHandle, NvidiaSdk, SdkStatus};
use vfx_denoise::settings::KEY_PROVIDER;
use vfx_denoise::{PluginConfig, Provider, ProviderSources, VideoDenoisingFactory};
use vfx_gs::{Graphics, NativeTexture, SoftwareGraphics, Texture};

pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Frame size inside the noise removal operating range, so capture is a 1:1 copy.
pub const WIDTH: u32 = 160;
pub const HEIGHT: u32 = 90;

/// SDK that "denoises" by inverting RGB, reading and writing the aliased textures.
pub struct FakeSdk {
    gs: Arc<SoftwareGraphics>,
    next_effect: AtomicU64,
    /// Bound (input, output) per effect.
    bindings: Mutex<HashMap<u64, (NativeTexture, NativeTexture)>>,
    load_delay: Mutex<Duration>,
    /// Runs inside the next `effect_create`, once.
    on_create: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    peak_effects: AtomicUsize,

    pub fail_create: AtomicBool,
    pub fail_map: AtomicBool,

    pub pushes: AtomicUsize,
    pub pops: AtomicUsize,
    pub created: AtomicUsize,
    pub destroyed: AtomicUsize,
    pub mapped: AtomicUsize,
    pub deallocated: AtomicUsize,
    pub set_images: AtomicUsize,
    pub loads: AtomicUsize,
    pub runs: AtomicUsize,
}

impl FakeSdk {
    pub fn new(gs: Arc<SoftwareGraphics>) -> Arc<Self> {
        Arc::new(Self {
            gs,
            next_effect: AtomicU64::new(1),
            bindings: Mutex::new(HashMap::new()),
            load_delay: Mutex::new(Duration::ZERO),
            on_create: Mutex::new(None),
            peak_effects: AtomicUsize::new(0),
            fail_create: AtomicBool::new(false),
            fail_map: AtomicBool::new(false),
            pushes: AtomicUsize::new(0),
            pops: AtomicUsize::new(0),
            created: AtomicUsize::new(0),
            destroyed: AtomicUsize::new(0),
            mapped: AtomicUsize::new(0),
            deallocated: AtomicUsize::new(0),
            set_images: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
            runs: AtomicUsize::new(0),
        })
    }

    /// Make effect creation take `delay`.
    pub fn set_load_delay(&self, delay: Duration) {
        *self.load_delay.lock().unwrap() = delay;
    }

    /// Run `hook` inside the next effect creation, on the loading thread.
    pub fn on_next_create(&self, hook: impl FnOnce() + Send + 'static) {
        *self.on_create.lock().unwrap() = Some(Box::new(hook));
    }

    /// Most effects alive at the same time.
    pub fn peak_effects(&self) -> usize {
        self.peak_effects.load(Ordering::SeqCst)
    }

    pub fn live_effects(&self) -> usize {
        self.created.load(Ordering::SeqCst) - self.destroyed.load(Ordering::SeqCst)
    }

    pub fn live_images(&self) -> usize {
        self.mapped.load(Ordering::SeqCst) - self.deallocated.load(Ordering::SeqCst)
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl NvidiaSdk for FakeSdk {
    fn cuda_push_context(&self) -> SdkStatus {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        SdkStatus::SUCCESS
    }

    fn cuda_pop_context(&self) -> SdkStatus {
        self.pops.fetch_add(1, Ordering::SeqCst);
        SdkStatus::SUCCESS
    }

    fn cuda_stream(&self) -> CudaStream {
        CudaStream(7)
    }

    fn image_init_from_texture(&self, image: &mut CvImage, texture: &Texture) -> SdkStatus {
        image.width = texture.width();
        image.height = texture.height();
        image.pitch = texture.width() * 4;
        image.resource = Some(texture.native());
        SdkStatus::SUCCESS
    }

    fn image_map_resource(&self, image: &mut CvImage, _stream: CudaStream) -> SdkStatus {
        if self.fail_map.load(Ordering::SeqCst) {
            return SdkStatus(2);
        }
        image.mapped = true;
        image.pixels = image.resource.map_or(0, |r| r.0);
        self.mapped.fetch_add(1, Ordering::SeqCst);
        SdkStatus::SUCCESS
    }

    fn image_unmap_resource(&self, image: &mut CvImage, _stream: CudaStream) -> SdkStatus {
        image.mapped = false;
        SdkStatus::SUCCESS
    }

    fn image_dealloc(&self, image: &mut CvImage) {
        if image.pixels != 0 {
            self.deallocated.fetch_add(1, Ordering::SeqCst);
        }
        *image = CvImage::default();
    }

    fn error_string(&self, status: SdkStatus) -> String {
        format!("fake error {}", status.0)
    }

    fn effect_create(&self, selector: &str) -> Result<EffectHandle, SdkStatus> {
        let delay = *self.load_delay.lock().unwrap();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        let hook = self.on_create.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
        if selector != "Denoising" || self.fail_create.load(Ordering::SeqCst) {
            return Err(SdkStatus(3));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        self.peak_effects.fetch_max(self.live_effects(), Ordering::SeqCst);
        Ok(EffectHandle(self.next_effect.fetch_add(1, Ordering::SeqCst)))
    }

    fn effect_destroy(&self, effect: EffectHandle) {
        self.bindings.lock().unwrap().remove(&effect.0);
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }

    fn effect_set_stream(&self, _effect: EffectHandle, stream: CudaStream) -> SdkStatus {
        if stream == CudaStream(7) { SdkStatus::SUCCESS } else { SdkStatus(4) }
    }

    fn effect_set_images(&self, effect: EffectHandle, input: &CvImage, output: &CvImage) -> SdkStatus {
        let (Some(src), Some(dst)) = (input.resource, output.resource) else {
            return SdkStatus(5);
        };
        self.bindings.lock().unwrap().insert(effect.0, (src, dst));
        self.set_images.fetch_add(1, Ordering::SeqCst);
        SdkStatus::SUCCESS
    }

    fn effect_load(&self, _effect: EffectHandle) -> SdkStatus {
        self.loads.fetch_add(1, Ordering::SeqCst);
        SdkStatus::SUCCESS
    }

    fn effect_run(&self, effect: EffectHandle) -> SdkStatus {
        let Some((src, dst)) = self.bindings.lock().unwrap().get(&effect.0).copied() else {
            return SdkStatus(6);
        };
        let Ok(pixels) = self.gs.read_native(src) else {
            return SdkStatus(6);
        };
        if self.gs.write_native(dst, &invert(&pixels)).is_err() {
            return SdkStatus(6);
        }
        self.runs.fetch_add(1, Ordering::SeqCst);
        SdkStatus::SUCCESS
    }
}

/// Invert RGB, keep alpha.
pub fn invert(pixels: &[u8]) -> Vec<u8> {
    pixels
        .chunks_exact(4)
        .flat_map(|px| [255 - px[0], 255 - px[1], 255 - px[2], px[3]])
        .collect()
}

/// Deterministic RGBA8 test frame.
pub fn gradient(width: u32, height: u32) -> Vec<u8> {
    (0..height)
        .flat_map(|y| (0..width).map(move |x| [(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255]))
        .flatten()
        .collect()
}

pub fn settings(provider: Provider) -> Value {
    json!({ KEY_PROVIDER: i64::from(provider) })
}

/// Software device, fake SDK and a factory over both.
pub struct Fixture {
    pub gs: Arc<SoftwareGraphics>,
    pub sdk: Arc<FakeSdk>,
    pub factory: Arc<VideoDenoisingFactory>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_sdk(|_| {})
    }

    /// Build with `setup` applied to the SDK before the factory probes it.
    pub fn with_sdk(setup: impl FnOnce(&FakeSdk)) -> Self {
        let gs = Arc::new(SoftwareGraphics::new());
        let sdk = FakeSdk::new(Arc::clone(&gs));
        setup(sdk.as_ref());

        let loader_sdk: Arc<dyn NvidiaSdk> = sdk.clone();
        let sources = ProviderSources::new().with_nvidia(move || Ok(loader_sdk));
        let graphics: Arc<dyn Graphics> = gs.clone();
        let factory = VideoDenoisingFactory::initialize(graphics, PluginConfig::default(), sources).unwrap();
        Self { gs, sdk, factory }
    }
}
