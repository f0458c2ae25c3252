//! Gateway configuration.
//!
//! Loaded from a TOML file; every section falls back to defaults so an empty
//! file (or no file at all) yields a working local setup.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::search::{DevicePreference, DEFAULT_MODEL};

/// Default Starpoint reader endpoint.
pub const DEFAULT_VECTOR_STORE_URL: &str = "https://reader.starpoint.ai";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP API settings
    pub api: ApiSettings,
    /// Query encoder settings
    pub encoder: EncoderSettings,
    /// Vector store client settings
    pub vector_store: VectorStoreSettings,
    /// Metrics exporter settings
    pub metrics: MetricsSettings,
}

/// HTTP API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Address the server binds to
    pub listen_address: String,
    /// Whether to install the CORS layer
    pub cors_enabled: bool,
    /// Allowed origins; `*` allows any origin
    pub cors_origins: Vec<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:8080".to_string(),
            cors_enabled: true,
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Query encoder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    /// Model name (see [`crate::search::EncoderModel`])
    pub model: String,
    /// `auto`, `cpu`, `cuda` or `cuda:<id>`
    pub device: String,
    /// Where downloaded model files are kept
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,
    /// Print a progress bar while downloading the model
    pub show_download_progress: bool,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            device: "auto".to_string(),
            cache_dir: None,
            show_download_progress: false,
        }
    }
}

impl EncoderSettings {
    /// Parsed device preference.
    pub fn device_preference(&self) -> Result<DevicePreference> {
        self.device.parse()
    }
}

/// Vector store client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Base URL of the Starpoint reader API
    pub base_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_VECTOR_STORE_URL.to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// Expose the scrape endpoint
    pub enabled: bool,
    /// Route of the scrape endpoint
    pub path: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: GatewayConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.api.listen_address.trim().is_empty() {
            return Err(Error::Config("api.listen_address must not be empty".into()));
        }
        if self.encoder.model.trim().is_empty() {
            return Err(Error::Config("encoder.model must not be empty".into()));
        }
        self.encoder.device_preference()?;

        let url = self.vector_store.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "vector_store.base_url must be an http(s) URL, got '{}'",
                url
            )));
        }
        if self.vector_store.request_timeout_secs == 0 {
            return Err(Error::Config(
                "vector_store.request_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.metrics.enabled && !self.metrics.path.starts_with('/') {
            return Err(Error::Config("metrics.path must start with '/'".into()));
        }
        Ok(())
    }
}
