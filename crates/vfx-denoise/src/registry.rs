//! Provider probing and availability.
//!
//! The registry is built once when the plugin loads. It tries to acquire
//! each compiled-in provider's SDK; a provider whose SDK fails to load is
//! unavailable for the rest of the process and is never retried. The
//! acquired SDK handles are shared by every filter instance.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::provider::nvidia::{NvidiaNoiseRemoval, NvidiaSdk};
use crate::provider::{AnyProvider, Provider};
use crate::{DenoiseError, DenoiseResult};

/// Acquires the NVIDIA SDK handles.
pub type NvidiaSdkLoader = Box<dyn FnOnce() -> DenoiseResult<Arc<dyn NvidiaSdk>> + Send>;

/// SDK loaders for each provider, supplied by the host binding.
#[derive(Default)]
pub struct ProviderSources {
    pub nvidia: Option<NvidiaSdkLoader>,
}

impl ProviderSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nvidia<F>(mut self, loader: F) -> Self
    where
        F: FnOnce() -> DenoiseResult<Arc<dyn NvidiaSdk>> + Send + 'static,
    {
        self.nvidia = Some(Box::new(loader));
        self
    }
}

impl fmt::Debug for ProviderSources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSources")
            .field("nvidia", &self.nvidia.is_some())
            .finish()
    }
}

/// Information about a provider.
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub provider: Provider,
    /// Human-readable name.
    pub name: &'static str,
    pub available: bool,
    pub description: &'static str,
}

/// Availability of every provider, probed once.
pub struct ProviderRegistry {
    nvidia: Option<Arc<dyn NvidiaSdk>>,
}

impl ProviderRegistry {
    /// Probe every compiled-in provider.
    pub fn probe(sources: ProviderSources) -> Self {
        let nvidia = Self::probe_nvidia(sources.nvidia);
        Self { nvidia }
    }

    #[cfg(feature = "nvidia")]
    fn probe_nvidia(loader: Option<NvidiaSdkLoader>) -> Option<Arc<dyn NvidiaSdk>> {
        match loader?() {
            Ok(sdk) => Some(sdk),
            Err(e) => {
                warn!("Failed to make NVIDIA Video Effects denoising available due to error: {e}");
                None
            }
        }
    }

    #[cfg(not(feature = "nvidia"))]
    fn probe_nvidia(loader: Option<NvidiaSdkLoader>) -> Option<Arc<dyn NvidiaSdk>> {
        if loader.is_some() {
            warn!("NVIDIA Video Effects denoising was not compiled in");
        }
        None
    }

    /// Whether `provider` can be loaded. Always false for `Automatic`.
    pub fn is_provider_available(&self, provider: Provider) -> bool {
        match provider {
            Provider::Automatic => false,
            Provider::NvidiaVideoNoiseRemoval => self.nvidia.is_some(),
        }
    }

    /// Whether at least one provider loaded.
    pub fn any_available(&self) -> bool {
        Provider::ALL.iter().any(|&p| self.is_provider_available(p))
    }

    /// Available providers in priority order.
    pub fn available(&self) -> Vec<Provider> {
        Provider::PRIORITY
            .iter()
            .copied()
            .filter(|&p| self.is_provider_available(p))
            .collect()
    }

    /// Resolve `Automatic` to the first available provider by priority.
    ///
    /// Explicit providers resolve to themselves, available or not; loading
    /// an unavailable one fails later and leaves the instance passing through.
    pub fn resolve(&self, provider: Provider) -> Option<Provider> {
        match provider {
            Provider::Automatic => self.available().first().copied(),
            explicit => Some(explicit),
        }
    }

    /// Construct an unloaded provider instance.
    pub fn create(&self, provider: Provider) -> DenoiseResult<AnyProvider> {
        match provider {
            Provider::NvidiaVideoNoiseRemoval => {
                let sdk = self.nvidia.clone().ok_or(DenoiseError::ProviderUnavailable(provider))?;
                Ok(AnyProvider::Nvidia(NvidiaNoiseRemoval::new(sdk)))
            }
            Provider::Automatic => Err(DenoiseError::ProviderUnavailable(provider)),
        }
    }

    /// Every provider with its availability.
    pub fn describe(&self) -> Vec<ProviderInfo> {
        vec![ProviderInfo {
            provider: Provider::NvidiaVideoNoiseRemoval,
            name: "NVIDIA Video Noise Removal",
            available: self.is_provider_available(Provider::NvidiaVideoNoiseRemoval),
            description: "NVIDIA Video Effects SDK via CUDA",
        }]
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("available", &self.available())
            .finish()
    }
}

/// Get description of every provider, one per line.
pub fn describe_providers(registry: &ProviderRegistry) -> String {
    let mut desc = String::new();
    for info in registry.describe() {
        let status = if info.available { "+" } else { "-" };
        desc.push_str(&format!("[{}] {}: {}\n", status, info.name, info.description));
    }
    desc
}
