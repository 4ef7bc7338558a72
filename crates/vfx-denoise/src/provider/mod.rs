//! Denoising providers.
//!
//! A provider is a backend that performs the actual denoising. Each one
//! implements [`DenoiseProvider`]; [`AnyProvider`] is the dispatch table the
//! frame pipeline and the switch task call through, so adding a provider
//! never touches their control flow.
//!
//! ```text
//! Provider (settings value)
//!     ├── Automatic                → resolved by priority, never active
//!     └── NvidiaVideoNoiseRemoval  → AnyProvider::Nvidia(NvidiaNoiseRemoval)
//! ```

pub mod nvidia;

use std::fmt;

use serde::{Deserialize, Serialize};
use vfx_gs::{Graphics, Texture};

use crate::{DenoiseError, DenoiseResult};

pub use nvidia::NvidiaNoiseRemoval;

/// Denoising backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Provider {
    /// First available provider in [`Provider::PRIORITY`] order.
    #[default]
    Automatic,
    /// NVIDIA Video Effects SDK noise removal.
    NvidiaVideoNoiseRemoval,
}

impl Provider {
    /// Resolution order for [`Provider::Automatic`].
    pub const PRIORITY: &'static [Provider] = &[Provider::NvidiaVideoNoiseRemoval];

    /// Every concrete provider.
    pub const ALL: &'static [Provider] = &[Provider::NvidiaVideoNoiseRemoval];

    pub fn is_automatic(&self) -> bool {
        matches!(self, Self::Automatic)
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::NvidiaVideoNoiseRemoval => "nvidia-video-noise-removal",
        }
    }

    /// Translation key for UI labels.
    pub fn label_key(&self) -> &'static str {
        match self {
            Self::Automatic => "State.Automatic",
            Self::NvidiaVideoNoiseRemoval => "Filter.VideoDenoising.Provider.NVIDIAVideoNoiseRemoval",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Provider> for i64 {
    fn from(provider: Provider) -> Self {
        match provider {
            Provider::Automatic => 0,
            Provider::NvidiaVideoNoiseRemoval => 1,
        }
    }
}

impl TryFrom<i64> for Provider {
    type Error = DenoiseError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Automatic),
            1 => Ok(Self::NvidiaVideoNoiseRemoval),
            other => Err(DenoiseError::InvalidSettings(format!("unknown provider {other}"))),
        }
    }
}

/// Capabilities every denoising backend offers.
///
/// `load` and `unload` run on a worker thread under the provider lock;
/// `resize` and `process` run on the render thread under the same lock.
pub trait DenoiseProvider: Send {
    /// Which provider this is.
    fn kind(&self) -> Provider;

    /// Acquire backend resources (effect instance, compute context binding).
    fn load(&mut self, gs: &dyn Graphics) -> DenoiseResult<()>;

    /// Release every backend resource, including mapped buffers.
    fn unload(&mut self, gs: &dyn Graphics) -> DenoiseResult<()>;

    /// Clamp a requested frame size into the provider's operating range.
    fn resize(&self, width: u32, height: u32) -> (u32, u32);

    /// Denoise `input` (already `size`); returns the output texture, if any.
    fn process(&mut self, gs: &dyn Graphics, input: &Texture, size: (u32, u32)) -> DenoiseResult<Option<Texture>>;
}

/// Provider dispatch table.
pub enum AnyProvider {
    Nvidia(NvidiaNoiseRemoval),
}

impl DenoiseProvider for AnyProvider {
    fn kind(&self) -> Provider {
        match self {
            Self::Nvidia(p) => p.kind(),
        }
    }

    fn load(&mut self, gs: &dyn Graphics) -> DenoiseResult<()> {
        match self {
            Self::Nvidia(p) => p.load(gs),
        }
    }

    fn unload(&mut self, gs: &dyn Graphics) -> DenoiseResult<()> {
        match self {
            Self::Nvidia(p) => p.unload(gs),
        }
    }

    fn resize(&self, width: u32, height: u32) -> (u32, u32) {
        match self {
            Self::Nvidia(p) => p.resize(width, height),
        }
    }

    fn process(&mut self, gs: &dyn Graphics, input: &Texture, size: (u32, u32)) -> DenoiseResult<Option<Texture>> {
        match self {
            Self::Nvidia(p) => p.process(gs, input, size),
        }
    }
}

/// Fit (x, y) into a provider's operating range, keeping the aspect ratio.
///
/// The larger axis is clamped into its range and the other axis is derived
/// from the input aspect ratio, rounded to nearest and never below 1.
pub fn clamp_dominant_axis(x: u32, y: u32, width_range: (u32, u32), height_range: (u32, u32)) -> (u32, u32) {
    if x > y {
        let ar = y as f64 / x as f64;
        let rx = x.clamp(width_range.0, width_range.1);
        let ry = ((rx as f64 * ar).round() as u32).max(1);
        (rx, ry)
    } else {
        let ar = if y == 0 { 1.0 } else { x as f64 / y as f64 };
        let ry = y.clamp(height_range.0, height_range.1);
        let rx = ((ry as f64 * ar).round() as u32).max(1);
        (rx, ry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_integer_mapping() {
        for &p in &[Provider::Automatic, Provider::NvidiaVideoNoiseRemoval] {
            assert_eq!(Provider::try_from(i64::from(p)).unwrap(), p);
        }
        assert!(Provider::try_from(-1).is_err());
    }

    #[test]
    fn priority_has_no_automatic() {
        assert!(Provider::PRIORITY.iter().all(|p| !p.is_automatic()));
        assert!(Provider::ALL.iter().all(|p| !p.is_automatic()));
    }

    #[test]
    fn clamp_width_dominant() {
        assert_eq!(clamp_dominant_axis(3840, 2160, (142, 1920), (80, 1080)), (1920, 1080));
        assert_eq!(clamp_dominant_axis(1280, 720, (142, 1920), (80, 1080)), (1280, 720));
        assert_eq!(clamp_dominant_axis(100, 50, (142, 1920), (80, 1080)), (142, 71));
    }

    #[test]
    fn clamp_height_dominant() {
        assert_eq!(clamp_dominant_axis(1080, 1920, (142, 1920), (80, 1080)), (608, 1080));
        assert_eq!(clamp_dominant_axis(500, 500, (142, 1920), (80, 1080)), (500, 500));
        assert_eq!(clamp_dominant_axis(20, 40, (142, 1920), (80, 1080)), (40, 80));
    }

    #[test]
    fn clamp_extreme_aspect_keeps_both_axes() {
        assert_eq!(clamp_dominant_axis(5000, 1, (142, 1920), (80, 1080)), (1920, 1));
        assert_eq!(clamp_dominant_axis(1, 5000, (142, 1920), (80, 1080)), (1, 1080));
    }
}
