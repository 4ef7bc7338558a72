//! Provider switching off the render thread.
//!
//! Loading a provider allocates device memory and builds compute contexts,
//! which can take far longer than a frame. Switches therefore run on the
//! worker pool while the render thread keeps passing frames through.
//!
//! Every switch request takes a token from a monotonically increasing
//! generation counter. A task only commits if its token is still the latest
//! once it holds the provider lock, so a superseded request is a no-op even
//! if the pool could not cancel it in time.
//!
//! ```text
//! Idle ──request──> Switching ──load ok──> Ready
//!                       │
//!                       └──load failed──> Idle (not ready, nothing loaded)
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use tracing::{debug, error, info, warn};
use vfx_gs::{ContextGuard, Graphics};

use crate::provider::{AnyProvider, DenoiseProvider, Provider};
use crate::registry::ProviderRegistry;
use crate::DenoiseResult;

/// The loaded provider, guarded by the provider lock.
#[derive(Default)]
pub(crate) struct ActiveProvider {
    pub(crate) provider: Option<Provider>,
    pub(crate) backend: Option<AnyProvider>,
}

/// Result of one switch task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Target loaded and active.
    Ready,
    /// Target failed to load; nothing is active.
    Failed,
    /// A newer request arrived first; nothing changed.
    Superseded,
}

/// Provider state shared between the instance, the render thread and switch tasks.
pub(crate) struct ProviderState {
    pub(crate) registry: Arc<ProviderRegistry>,
    pub(crate) gs: Arc<dyn Graphics>,
    /// Written only under the provider lock; read unlocked as a fast path.
    ready: AtomicBool,
    generation: AtomicU64,
    active: Mutex<ActiveProvider>,
}

impl ProviderState {
    pub(crate) fn new(registry: Arc<ProviderRegistry>, gs: Arc<dyn Graphics>) -> Self {
        Self {
            registry,
            gs,
            ready: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            active: Mutex::new(ActiveProvider::default()),
        }
    }

    /// Acquire the provider lock.
    pub(crate) fn lock(&self) -> MutexGuard<'_, ActiveProvider> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquire the provider lock if nobody holds it.
    pub(crate) fn try_lock(&self) -> Option<MutexGuard<'_, ActiveProvider>> {
        match self.active.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Invalidate every outstanding request and return a token for a new one.
    pub(crate) fn next_token(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn is_current(&self, token: u64) -> bool {
        self.generation.load(Ordering::Acquire) == token
    }

    /// Unload whatever is active. Used at teardown.
    pub(crate) fn unload_active(&self) -> DenoiseResult<()> {
        let mut active = self.lock();
        self.ready.store(false, Ordering::Release);
        active.provider = None;

        let Some(mut backend) = active.backend.take() else {
            return Ok(());
        };
        let _gctx = ContextGuard::enter(&*self.gs);
        backend.unload(&*self.gs)
    }
}

/// Switch task body: load `target`, then unload whatever was active.
pub(crate) fn run_switch(state: &ProviderState, target: Provider, token: u64) -> SwitchOutcome {
    let mut active = state.lock();

    if !state.is_current(token) {
        debug!(%target, token, "provider switch superseded");
        return SwitchOutcome::Superseded;
    }

    state.ready.store(false, Ordering::Release);
    let gs = &*state.gs;
    let _gctx = ContextGuard::enter(gs);

    let loaded = state.registry.create(target).and_then(|mut next| {
        match next.load(gs) {
            Ok(()) => Ok(next),
            Err(e) => {
                // Release anything the failed load acquired.
                if let Err(unload) = next.unload(gs) {
                    warn!("Failed to clean up provider '{target}' after failed load: {unload}");
                }
                Err(e)
            }
        }
    });

    // A newer request arrived during the load: keep what was active.
    if !state.is_current(token) {
        if let Ok(mut next) = loaded {
            if let Err(e) = next.unload(gs) {
                warn!("Failed to discard superseded provider '{target}': {e}");
            }
        }
        state.ready.store(active.backend.is_some(), Ordering::Release);
        debug!(%target, token, "provider switch superseded during load");
        return SwitchOutcome::Superseded;
    }

    // Previous provider is unloaded whether or not the load succeeded.
    if let Some(mut previous) = active.backend.take() {
        let kind = previous.kind();
        if let Err(e) = previous.unload(gs) {
            error!("Failed to unload provider '{kind}': {e}");
        }
    }
    active.provider = None;

    match loaded {
        Ok(next) => {
            active.backend = Some(next);
            active.provider = Some(target);
            state.ready.store(true, Ordering::Release);
            info!(%target, "denoising provider ready");
            SwitchOutcome::Ready
        }
        Err(e) => {
            error!("Failed to load provider '{target}': {e}");
            SwitchOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ProviderSources;
    use vfx_gs::SoftwareGraphics;

    fn state() -> ProviderState {
        let registry = ProviderRegistry::probe(ProviderSources::new());
        ProviderState::new(Arc::new(registry), Arc::new(SoftwareGraphics::new()))
    }

    #[test]
    fn try_lock_does_not_wait_for_holder() {
        let state = state();
        let held = state.lock();
        assert!(state.try_lock().is_none());
        drop(held);
        assert!(state.try_lock().is_some());
    }

    #[test]
    fn stale_token_is_superseded() {
        let state = state();
        let stale = state.next_token();
        state.next_token();
        assert_eq!(run_switch(&state, Provider::NvidiaVideoNoiseRemoval, stale), SwitchOutcome::Superseded);
        assert!(!state.is_ready());
    }

    #[test]
    fn unavailable_target_fails() {
        let state = state();
        let token = state.next_token();
        assert_eq!(run_switch(&state, Provider::NvidiaVideoNoiseRemoval, token), SwitchOutcome::Failed);
        assert!(!state.is_ready());
        assert!(state.lock().provider.is_none());
    }
}
