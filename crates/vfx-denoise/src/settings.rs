//! Instance settings and plugin configuration.
//!
//! Host settings data is a JSON object keyed by translation-style names.
//! The provider is stored as an integer so persisted scenes stay stable
//! when providers are added.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{DenoiseError, DenoiseResult, Provider};

/// Settings key holding the selected provider.
pub const KEY_PROVIDER: &str = "Filter.VideoDenoising.Provider";

/// Per-instance filter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DenoiseSettings {
    /// Requested provider; `Automatic` picks by priority.
    #[serde(rename = "Filter.VideoDenoising.Provider", default)]
    pub provider: Provider,
}

impl DenoiseSettings {
    /// Current settings format version.
    pub const VERSION: u64 = 1;

    /// Parse host settings data. Missing keys take their defaults.
    pub fn from_data(data: &Value) -> DenoiseResult<Self> {
        if data.is_null() {
            return Ok(Self::default());
        }
        Self::deserialize(data).map_err(|e| DenoiseError::InvalidSettings(e.to_string()))
    }

    /// Serialize to host settings data.
    pub fn to_data(&self) -> DenoiseResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Default settings object.
    pub fn defaults() -> Value {
        serde_json::json!({ KEY_PROVIDER: i64::from(Provider::Automatic) })
    }

    /// Bring settings persisted by an older version up to date.
    ///
    /// Version 1 is the only format so far; this fills in a missing
    /// provider key so later reads never depend on serde defaults.
    pub fn migrate(data: &mut Value, version: u64) {
        if version > Self::VERSION {
            tracing::warn!(version, "settings from a newer version, reading as-is");
        }
        if let Value::Object(map) = data {
            map.entry(KEY_PROVIDER).or_insert_with(|| Value::from(i64::from(Provider::Automatic)));
        }
    }
}

/// Process-wide plugin configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Worker threads running provider switches.
    pub worker_threads: usize,
    /// How long `destroy` waits for an in-flight switch, in milliseconds.
    pub shutdown_timeout_ms: u64,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            shutdown_timeout_ms: 5000,
        }
    }
}

impl PluginConfig {
    /// Parse from a JSON document; absent fields keep their defaults.
    pub fn from_json(text: &str) -> DenoiseResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        if config.worker_threads == 0 {
            return Err(DenoiseError::InvalidSettings("worker_threads must be at least 1".into()));
        }
        Ok(config)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn provider_read_as_integer() {
        let settings = DenoiseSettings::from_data(&json!({ KEY_PROVIDER: 1 })).unwrap();
        assert_eq!(settings.provider, Provider::NvidiaVideoNoiseRemoval);
    }

    #[test]
    fn missing_key_is_automatic() {
        let settings = DenoiseSettings::from_data(&json!({ "unrelated": true })).unwrap();
        assert_eq!(settings.provider, Provider::Automatic);
        assert_eq!(DenoiseSettings::from_data(&Value::Null).unwrap(), DenoiseSettings::default());
    }

    #[test]
    fn unknown_provider_rejected() {
        let err = DenoiseSettings::from_data(&json!({ KEY_PROVIDER: 42 })).unwrap_err();
        assert!(matches!(err, DenoiseError::InvalidSettings(_)));
    }

    #[test]
    fn defaults_round_trip() {
        let settings = DenoiseSettings::from_data(&DenoiseSettings::defaults()).unwrap();
        assert_eq!(settings, DenoiseSettings::default());
        assert_eq!(settings.to_data().unwrap(), DenoiseSettings::defaults());
    }

    #[test]
    fn migrate_fills_provider() {
        let mut data = json!({});
        DenoiseSettings::migrate(&mut data, 0);
        assert_eq!(data[KEY_PROVIDER], json!(0));

        let mut data = json!({ KEY_PROVIDER: 1 });
        DenoiseSettings::migrate(&mut data, 1);
        assert_eq!(data[KEY_PROVIDER], json!(1));
    }

    #[test]
    fn plugin_config_defaults() {
        let config = PluginConfig::from_json("{}").unwrap();
        assert_eq!(config, PluginConfig::default());
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));

        let config = PluginConfig::from_json(r#"{ "worker_threads": 4 }"#).unwrap();
        assert_eq!(config.worker_threads, 4);
        assert!(PluginConfig::from_json(r#"{ "worker_threads": 0 }"#).is_err());
    }
}
