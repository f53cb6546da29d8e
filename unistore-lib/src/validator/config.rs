//! Configuration for the HTTP receipt validator.
//!
//! # Environment Variables
//!
//! [`ValidatorConfig::from_env`] reads:
//! - `UNISTORE_VALIDATION_URL` - validation endpoint (required)
//! - `UNISTORE_BUNDLE_ID` - application identifier sent as `bundle_id`
//! - `UNISTORE_USER_ID` - device identifier sent as `user_id`
//! - `UNISTORE_RECEIPT_ENCODING` - `raw`, `base64` or `unified_envelope`

use serde::{Deserialize, Serialize};

use super::{AcceptancePolicy, ReceiptEncoding};
use crate::{Result, UniStoreError};

/// Configuration for [`super::HttpValidator`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Validation endpoint receiving the form POST.
    pub url: String,

    /// Application identifier (`bundle_id` form field).
    #[serde(default)]
    pub bundle_id: String,

    /// Device-unique identifier (`user_id` form field).
    #[serde(default)]
    pub user_id: String,

    /// Transformation applied to the receipt before submission.
    #[serde(default)]
    pub encoding: ReceiptEncoding,

    /// Which responses accept the receipt.
    #[serde(default)]
    pub acceptance: AcceptancePolicy,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

/// `UNISTORE_RECEIPT_ENCODING`, if set to a known encoding.
pub(crate) fn encoding_from_env() -> Option<ReceiptEncoding> {
    std::env::var("UNISTORE_RECEIPT_ENCODING")
        .ok()
        .and_then(|e| e.parse().ok())
}

impl ValidatorConfig {
    /// Create a configuration submitting raw receipts.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            bundle_id: String::new(),
            user_id: String::new(),
            encoding: ReceiptEncoding::default(),
            acceptance: AcceptancePolicy::default(),
            timeout_secs: default_timeout(),
        }
    }

    /// Raw receipt, `status == "0"`.
    pub fn simple(url: impl Into<String>) -> Self {
        Self::new(url)
    }

    /// Base64-encoded receipt, as Google Play receipts are submitted.
    pub fn android(url: impl Into<String>) -> Self {
        Self::new(url).with_encoding(ReceiptEncoding::Base64)
    }

    /// Payload unwrapped from the unified receipt envelope.
    pub fn unified(url: impl Into<String>) -> Self {
        Self::new(url).with_encoding(ReceiptEncoding::UnifiedEnvelope)
    }

    /// Same receipt handling as [`Self::unified`], for payout endpoints.
    pub fn payout(url: impl Into<String>) -> Self {
        Self::unified(url)
    }

    /// Load from `UNISTORE_*` environment variables.
    ///
    /// Returns `None` if `UNISTORE_VALIDATION_URL` is unset or empty.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("UNISTORE_VALIDATION_URL").ok()?;
        if url.is_empty() {
            return None;
        }

        let mut config = Self::new(url);
        if let Ok(bundle_id) = std::env::var("UNISTORE_BUNDLE_ID") {
            config.bundle_id = bundle_id;
        }
        if let Ok(user_id) = std::env::var("UNISTORE_USER_ID") {
            config.user_id = user_id;
        }
        if let Some(encoding) = encoding_from_env() {
            config.encoding = encoding;
        }
        Some(config)
    }

    pub fn with_bundle_id(mut self, bundle_id: impl Into<String>) -> Self {
        self.bundle_id = bundle_id.into();
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_encoding(mut self, encoding: ReceiptEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_acceptance(mut self, acceptance: AcceptancePolicy) -> Self {
        self.acceptance = acceptance;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Request timeout in milliseconds, saturating on overflow.
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_secs.saturating_mul(1000)
    }

    /// Check the configuration can be used to build a validator.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(UniStoreError::invalid_data(
                "url",
                "validation URL cannot be empty",
            ));
        }
        if self.timeout_secs == 0 {
            return Err(UniStoreError::invalid_data(
                "timeout_secs",
                "timeout must be at least one second",
            ));
        }
        Ok(())
    }
}
