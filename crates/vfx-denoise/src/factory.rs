//! Host-facing filter type.
//!
//! The factory is created once when the plugin loads and dropped when it
//! unloads. It owns the provider registry and the worker pool and passes
//! both to every instance it creates; nothing here is a global.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info};
use vfx_gs::Graphics;

use crate::instance::VideoDenoisingInstance;
use crate::registry::{ProviderRegistry, ProviderSources, describe_providers};
use crate::settings::{DenoiseSettings, KEY_PROVIDER, PluginConfig};
use crate::threadpool::ThreadPool;
use crate::{DenoiseError, DenoiseResult, Provider};

/// Identifier the filter is registered under.
pub const FILTER_ID: &str = "filter-video-denoising";

/// Translation key of the filter name.
pub const FILTER_NAME_KEY: &str = "Filter.VideoDenoising";

/// Kind of source the host registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Input,
    Filter,
    Transition,
}

/// Registration record handed to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterInfo {
    pub id: &'static str,
    pub kind: SourceKind,
    /// Produces video.
    pub video: bool,
    /// Output size may differ from input size.
    pub custom_size: bool,
}

/// One option of a list property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyOption {
    /// Translation key of the label.
    pub label: &'static str,
    pub value: i64,
}

/// Integer list property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListProperty {
    /// Settings key.
    pub key: &'static str,
    /// Translation key of the label.
    pub label: &'static str,
    /// Group the property is shown in.
    pub group: &'static str,
    pub options: Vec<PropertyOption>,
}

/// Property schema of the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Properties {
    pub lists: Vec<ListProperty>,
}

/// Video denoising filter type.
pub struct VideoDenoisingFactory {
    registry: Arc<ProviderRegistry>,
    gs: Arc<dyn Graphics>,
    pool: Arc<ThreadPool>,
    config: PluginConfig,
}

impl VideoDenoisingFactory {
    /// Probe providers and build the factory.
    ///
    /// Fails with [`DenoiseError::NoProviders`] when no provider loaded; the
    /// filter must then not be registered.
    pub fn initialize(gs: Arc<dyn Graphics>, config: PluginConfig, sources: ProviderSources) -> DenoiseResult<Arc<Self>> {
        let registry = ProviderRegistry::probe(sources);
        info!("Denoising providers:\n{}", describe_providers(&registry));
        if !registry.any_available() {
            error!("All supported denoising providers failed to initialize, disabling effect.");
            return Err(DenoiseError::NoProviders);
        }

        let pool = ThreadPool::new(config.worker_threads)?;
        Ok(Arc::new(Self {
            registry: Arc::new(registry),
            gs,
            pool: Arc::new(pool),
            config,
        }))
    }

    pub fn info(&self) -> FilterInfo {
        FilterInfo {
            id: FILTER_ID,
            kind: SourceKind::Filter,
            video: true,
            custom_size: true,
        }
    }

    /// Translation key of the display name.
    pub fn name(&self) -> &'static str {
        FILTER_NAME_KEY
    }

    pub fn defaults(&self) -> Value {
        DenoiseSettings::defaults()
    }

    /// Provider selection: Automatic plus every available provider.
    pub fn properties(&self) -> Properties {
        let mut options = vec![PropertyOption {
            label: Provider::Automatic.label_key(),
            value: i64::from(Provider::Automatic),
        }];
        options.extend(self.registry.available().into_iter().map(|p| PropertyOption {
            label: p.label_key(),
            value: i64::from(p),
        }));

        Properties {
            lists: vec![ListProperty {
                key: KEY_PROVIDER,
                label: KEY_PROVIDER,
                group: "Advanced",
                options,
            }],
        }
    }

    pub fn is_provider_available(&self, provider: Provider) -> bool {
        self.registry.is_provider_available(provider)
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Create an instance, applying persisted settings if given.
    pub fn create(&self, settings: Option<&Value>) -> DenoiseResult<VideoDenoisingInstance> {
        VideoDenoisingInstance::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.gs),
            Arc::clone(&self.pool),
            self.config.shutdown_timeout(),
            settings,
        )
    }
}
