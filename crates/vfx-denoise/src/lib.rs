//! Real-time video denoising filter.
//!
//! Denoises a live video stream inside a host compositor using a GPU
//! accelerated provider. The filter is built around three threads of
//! control: the host render thread calling [`VideoDenoisingInstance::video_render`]
//! every frame, the UI thread applying settings, and a worker pool that
//! loads and unloads providers so the render thread never waits on SDK
//! initialization.
//!
//! # Architecture
//!
//! ```text
//! VideoDenoisingFactory (per plugin load)
//!     ├── ProviderRegistry   probed once, shared SDK handles
//!     ├── ThreadPool         switch tasks
//!     └── create() ──> VideoDenoisingInstance
//!                         ├── ProviderState  provider lock, ready flag, switch generation
//!                         │     └── AnyProvider ──> NvidiaNoiseRemoval
//!                         │                           └── ResourceBuffer (texture + mapped image)
//!                         └── FramePipeline  capture → process → composite
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vfx_denoise::{PluginConfig, ProviderSources, VideoDenoisingFactory};
//!
//! let factory = VideoDenoisingFactory::initialize(gs, PluginConfig::default(),
//!     ProviderSources::new().with_nvidia(load_nvidia_sdk))?;
//! let instance = factory.create(Some(&settings))?;
//!
//! // every frame, on the render thread
//! instance.video_render(&host);
//! ```

pub mod buffers;
mod error;
pub mod factory;
pub mod host;
mod instance;
pub mod pipeline;
pub mod provider;
pub mod registry;
pub mod settings;
mod switch;
pub mod threadpool;

pub use error::{DenoiseError, DenoiseResult};
pub use factory::{FILTER_ID, FilterInfo, Properties, VideoDenoisingFactory};
pub use host::{FilterHost, HeadlessHost};
pub use instance::VideoDenoisingInstance;
pub use pipeline::{RenderOutcome, SkipReason};
pub use provider::{AnyProvider, DenoiseProvider, Provider};
pub use registry::{ProviderRegistry, ProviderSources, describe_providers};
pub use settings::{DenoiseSettings, PluginConfig};
pub use switch::SwitchOutcome;
pub use threadpool::{TaskHandle, TaskState, ThreadPool};
