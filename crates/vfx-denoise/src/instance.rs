//! Filter instance lifecycle.
//!
//! An instance binds the frame pipeline to a provider. Settings changes
//! on the UI thread request provider switches; the render thread keeps
//! passing frames through until the switch completes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::host::FilterHost;
use crate::pipeline::{FramePipeline, FrameSize, RenderOutcome, SkipReason};
use crate::registry::ProviderRegistry;
use crate::settings::DenoiseSettings;
use crate::switch::{ProviderState, run_switch};
use crate::threadpool::{TaskHandle, ThreadPool};
use crate::{DenoiseError, DenoiseResult, Provider};
use vfx_gs::{ContextGuard, Graphics};

/// Switch bookkeeping, separate from the provider lock.
#[derive(Default)]
struct SwitchSlot {
    /// Last provider a switch was requested for.
    requested: Option<Provider>,
    /// Most recent switch task.
    task: Option<TaskHandle>,
    /// Switch requests issued so far.
    requests: u64,
}

/// One active video denoising filter.
pub struct VideoDenoisingInstance {
    state: Arc<ProviderState>,
    pool: Arc<ThreadPool>,
    switch: Mutex<SwitchSlot>,
    pipeline: Mutex<FramePipeline>,
    size: FrameSize,
    shutdown_timeout: Duration,
    destroyed: AtomicBool,
}

impl VideoDenoisingInstance {
    /// Create an instance and apply optional persisted settings.
    pub(crate) fn new(
        registry: Arc<ProviderRegistry>,
        gs: Arc<dyn Graphics>,
        pool: Arc<ThreadPool>,
        shutdown_timeout: Duration,
        settings: Option<&Value>,
    ) -> DenoiseResult<Self> {
        let pipeline = {
            let _gctx = ContextGuard::enter(&*gs);
            FramePipeline::new(&*gs)?
        };

        let instance = Self {
            state: Arc::new(ProviderState::new(registry, gs)),
            pool,
            switch: Mutex::new(SwitchSlot::default()),
            pipeline: Mutex::new(pipeline),
            size: FrameSize::new(1, 1),
            shutdown_timeout,
            destroyed: AtomicBool::new(false),
        };

        if let Some(data) = settings {
            instance.load(data)?;
        }
        Ok(instance)
    }

    /// Apply persisted settings.
    pub fn load(&self, data: &Value) -> DenoiseResult<()> {
        self.update(data)
    }

    /// Upgrade persisted settings from `version` in place.
    pub fn migrate(&self, data: &mut Value, version: u64) {
        DenoiseSettings::migrate(data, version);
    }

    /// Apply changed settings; may request a provider switch.
    pub fn update(&self, data: &Value) -> DenoiseResult<()> {
        let settings = DenoiseSettings::from_data(data)?;
        self.apply(&settings);
        Ok(())
    }

    /// Apply already-parsed settings. Returns the switch task if one was spawned.
    ///
    /// Compares against the switch still in flight, if any, else against the
    /// active provider, so re-applying a setting after a failed load retries.
    pub fn apply(&self, settings: &DenoiseSettings) -> Option<TaskHandle> {
        let Some(provider) = self.state.registry.resolve(settings.provider) else {
            warn!("No denoising provider available for '{}'", settings.provider);
            return None;
        };

        let in_flight = {
            let slot = self.lock_switch();
            let unsettled = slot.task.as_ref().is_some_and(|task| !task.is_settled());
            unsettled.then_some(slot.requested).flatten()
        };
        let current = match in_flight {
            Some(pending) => Some(pending),
            None => self.state.lock().provider,
        };
        if current == Some(provider) {
            return None;
        }
        // The provider is different from the current one, recreate it.
        self.switch_provider(provider)
    }

    /// Request an asynchronous switch to `provider`.
    ///
    /// A still-queued earlier switch is cancelled; a running one finishes
    /// and is then superseded by this request. Returns `None` once the
    /// instance is destroyed.
    pub fn switch_provider(&self, provider: Provider) -> Option<TaskHandle> {
        let mut slot = self.lock_switch();
        if self.destroyed.load(Ordering::Acquire) {
            return None;
        }

        if let Some(previous) = slot.task.take() {
            if self.pool.pop(&previous) {
                debug!("cancelled queued provider switch");
            }
        }

        let token = self.state.next_token();
        let state = Arc::clone(&self.state);
        let task = self.pool.push(move || {
            run_switch(&state, provider, token);
        });

        info!(%provider, token, "provider switch requested");
        slot.requested = Some(provider);
        slot.task = Some(task.clone());
        slot.requests += 1;
        Some(task)
    }

    /// Width the filter outputs.
    pub fn get_width(&self) -> u32 {
        self.size.get().0
    }

    /// Height the filter outputs.
    pub fn get_height(&self) -> u32 {
        self.size.get().1
    }

    pub fn video_tick(&self, _seconds: f32) {}

    /// Render one frame, denoised or passed through.
    pub fn video_render(&self, host: &dyn FilterHost) -> RenderOutcome {
        if self.destroyed.load(Ordering::Acquire) {
            host.skip_video_filter(&*self.state.gs);
            return RenderOutcome::Skipped(SkipReason::NotReady);
        }
        let mut pipeline = self.pipeline.lock().unwrap_or_else(PoisonError::into_inner);
        pipeline.render(&self.state, &self.size, host)
    }

    /// Tear down: supersede pending switches, then unload the active provider.
    ///
    /// Waits up to the configured shutdown timeout for a running switch
    /// before unloading. Unloading happens inline on the calling thread.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }

        // Anything still queued must not commit after this point.
        let pending = {
            let mut slot = self.lock_switch();
            self.state.next_token();
            slot.task.take()
        };
        if let Some(task) = pending {
            let settled = self.pool.pop(&task) || task.wait_timeout(self.shutdown_timeout);
            if !settled {
                warn!("{}; unloading once it releases the provider", DenoiseError::Timeout(self.shutdown_timeout));
            }
        }

        if let Err(e) = self.state.unload_active() {
            error!("Failed to unload provider during teardown: {e}");
        }
        debug!("video denoising instance destroyed");
    }

    // =========================================================================
    // State queries
    // =========================================================================

    /// Currently loaded provider, never `Automatic`.
    pub fn active_provider(&self) -> Option<Provider> {
        self.state.lock().provider
    }

    /// Whether frames are being denoised.
    pub fn is_provider_ready(&self) -> bool {
        self.state.is_ready()
    }

    /// Provider of the latest switch request.
    pub fn requested_provider(&self) -> Option<Provider> {
        self.lock_switch().requested
    }

    /// Number of switch requests issued.
    pub fn switch_requests(&self) -> u64 {
        self.lock_switch().requests
    }

    /// Latest switch task, if any.
    pub fn pending_switch(&self) -> Option<TaskHandle> {
        self.lock_switch().task.clone()
    }

    /// Block until the latest switch settles.
    pub fn wait_for_switch(&self, timeout: Duration) -> DenoiseResult<()> {
        match self.pending_switch() {
            Some(task) if !task.wait_timeout(timeout) => Err(DenoiseError::Timeout(timeout)),
            _ => Ok(()),
        }
    }

    /// Size of the input buffer allocation.
    pub fn input_buffer_size(&self) -> (u32, u32) {
        self.pipeline.lock().unwrap_or_else(PoisonError::into_inner).input_size()
    }

    fn lock_switch(&self) -> std::sync::MutexGuard<'_, SwitchSlot> {
        self.switch.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for VideoDenoisingInstance {
    fn drop(&mut self) {
        self.destroy();
    }
}
