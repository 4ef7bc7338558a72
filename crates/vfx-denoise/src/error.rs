//! Error types for the denoising filter.

use std::time::Duration;

use thiserror::Error;
use vfx_gs::GsError;

use crate::Provider;

/// Denoising filter error.
#[derive(Debug, Error)]
pub enum DenoiseError {
    /// Every compiled-in provider failed to initialize.
    #[error("no denoising provider available")]
    NoProviders,

    /// Provider was not available at probe time.
    #[error("provider not available: {0}")]
    ProviderUnavailable(Provider),

    /// Provider used before `load` succeeded.
    #[error("provider not loaded: {0}")]
    NotLoaded(Provider),

    /// Non-success result code from a provider SDK call.
    #[error("{call} failed with code {code}: {message}")]
    Sdk {
        /// SDK entry point.
        call: &'static str,
        /// Raw result code.
        code: i32,
        /// SDK error string for the code.
        message: String,
    },

    /// Graphics subsystem failure.
    #[error("graphics error: {0}")]
    Graphics(#[from] GsError),

    /// Settings data rejected.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Settings (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Worker pool could not be built.
    #[error("thread pool error: {0}")]
    ThreadPool(String),

    /// A switch task did not settle before the deadline.
    #[error("switch task still running after {0:?}")]
    Timeout(Duration),
}

/// Result type for denoising operations.
pub type DenoiseResult<T> = Result<T, DenoiseError>;
