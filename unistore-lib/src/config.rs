//! Store configuration.
//!
//! A [`StoreConfig`] selects the backend and carries the validator and
//! per-backend options. It can be built in code, loaded from JSON, and
//! overridden from the environment.
//!
//! # Environment Variables
//!
//! [`StoreConfig::apply_env`] reads:
//! - `UNISTORE_BACKEND` - `fake`, `plugin` or `samsung`
//! - `UNISTORE_VALIDATION_URL` - enables HTTP receipt validation
//! - `UNISTORE_BUNDLE_ID` - application identifier sent to the validator
//! - `UNISTORE_USER_ID` - device identifier sent to the validator
//!
//! # Example
//!
//! ```
//! use unistore_lib::{BackendKind, StoreConfig};
//!
//! let config = StoreConfig::from_json_str(r#"{
//!     "backend": "plugin",
//!     "validation": { "url": "https://validate.example.com", "encoding": "base64" },
//!     "plugin": { "unwrap_receipt_envelope": true }
//! }"#).unwrap();
//!
//! assert_eq!(config.backend, BackendKind::Plugin);
//! assert!(config.plugin.unwrap_receipt_envelope);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backends::{BackendKind, PluginStoreOptions, SamsungStoreOptions};
use crate::validator::{encoding_from_env, ValidatorConfig};
use crate::Result;

/// Deployment configuration of a [`crate::UniversalStore`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend to build.
    #[serde(default)]
    pub backend: BackendKind,

    /// HTTP receipt validation; `None` disables validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidatorConfig>,

    #[serde(default)]
    pub plugin: PluginStoreOptions,

    #[serde(default)]
    pub samsung: SamsungStoreOptions,
}

impl StoreConfig {
    pub fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    /// Parse a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        if let Some(validation) = &config.validation {
            validation.validate()?;
        }
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// Apply `UNISTORE_*` environment overrides.
    ///
    /// An unparseable `UNISTORE_BACKEND` is reported as an error rather than
    /// silently ignored.
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(backend) = std::env::var("UNISTORE_BACKEND") {
            self.backend = backend.parse()?;
        }

        match (self.validation.take(), ValidatorConfig::from_env()) {
            (Some(mut existing), Some(from_env)) => {
                existing.url = from_env.url;
                if !from_env.bundle_id.is_empty() {
                    existing.bundle_id = from_env.bundle_id;
                }
                if !from_env.user_id.is_empty() {
                    existing.user_id = from_env.user_id;
                }
                if let Some(encoding) = encoding_from_env() {
                    existing.encoding = encoding;
                }
                self.validation = Some(existing);
            }
            (existing, from_env) => self.validation = from_env.or(existing),
        }
        Ok(self)
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_validation(mut self, validation: ValidatorConfig) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn with_plugin_options(mut self, options: PluginStoreOptions) -> Self {
        self.plugin = options;
        self
    }

    pub fn with_samsung_options(mut self, options: SamsungStoreOptions) -> Self {
        self.samsung = options;
        self
    }
}
