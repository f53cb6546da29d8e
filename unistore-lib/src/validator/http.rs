//! HTTP receipt validator.
//!
//! Submits `bundle_id`, `user_id` and the encoded receipt as a form POST and
//! reads a JSON status object back.
//!
//! # Feature Flags
//!
//! Requires the `http-validator` feature (enabled by default) for actual HTTP
//! requests. Without it, every validation is rejected with a transport reason.

use async_trait::async_trait;
#[cfg(feature = "http-validator")]
use std::time::Duration;

use super::{
    ReceiptValidator, RejectionReason, ValidationResponse, ValidationVerdict, ValidatorConfig,
};
#[cfg(feature = "http-validator")]
use crate::UniStoreError;
use crate::{ProductId, Result};

/// Validator posting receipts to a remote endpoint.
pub struct HttpValidator {
    config: ValidatorConfig,
    #[cfg(feature = "http-validator")]
    client: reqwest::Client,
}

impl HttpValidator {
    /// Create a new validator with the given configuration.
    #[cfg(feature = "http-validator")]
    pub fn new(config: ValidatorConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UniStoreError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create a new validator with the given configuration (stub when feature disabled).
    #[cfg(not(feature = "http-validator"))]
    pub fn new(config: ValidatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Receipt text as it will be submitted.
    pub fn final_receipt(&self, receipt: &str) -> String {
        self.config.encoding.encode(receipt)
    }

    fn form<'a>(&'a self, receipt: &'a str) -> [(&'static str, &'a str); 3] {
        [
            ("bundle_id", self.config.bundle_id.as_str()),
            ("user_id", self.config.user_id.as_str()),
            ("receipt", receipt),
        ]
    }

    /// POST the form and parse the response body.
    #[cfg(feature = "http-validator")]
    async fn submit(&self, receipt: &str) -> std::result::Result<ValidationResponse, RejectionReason> {
        let response = self
            .client
            .post(&self.config.url)
            .form(&self.form(receipt))
            .send()
            .await
            .map_err(|e| RejectionReason::Transport(self.map_reqwest_error(e).to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RejectionReason::Http(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RejectionReason::Transport(format!("Failed to read response: {}", e)))?;
        tracing::debug!(body = %body, "validation response");

        serde_json::from_str::<ValidationResponse>(&body)
            .map_err(|e| RejectionReason::MalformedResponse(e.to_string()))
    }

    /// POST the form (stub when feature disabled).
    #[cfg(not(feature = "http-validator"))]
    async fn submit(&self, receipt: &str) -> std::result::Result<ValidationResponse, RejectionReason> {
        let _ = self.form(receipt);
        Err(RejectionReason::Transport(
            "HTTP validator not compiled - enable the 'http-validator' feature".to_string(),
        ))
    }

    /// Map reqwest errors to UniStoreError.
    #[cfg(feature = "http-validator")]
    fn map_reqwest_error(&self, e: reqwest::Error) -> UniStoreError {
        if e.is_timeout() {
            UniStoreError::ConnectionTimeout {
                operation: "receipt validation".to_string(),
                timeout_ms: self.config.timeout_ms(),
            }
        } else if e.is_connect() {
            UniStoreError::ConnectionFailed {
                target: self.config.url.clone(),
                reason: e.to_string(),
            }
        } else {
            UniStoreError::Transport(format!("validation request failed: {}", e))
        }
    }
}

#[async_trait]
impl ReceiptValidator for HttpValidator {
    #[tracing::instrument(skip(self, receipt), fields(product_id = %product_id, receipt_len = receipt.len()))]
    async fn validate(&self, receipt: &str, product_id: &ProductId) -> ValidationVerdict {
        let receipt = self.final_receipt(receipt);

        let verdict = match self.submit(&receipt).await {
            Ok(response) => self.config.acceptance.verdict(&response),
            Err(reason) => ValidationVerdict::Rejected(reason),
        };

        match verdict.rejection() {
            None => tracing::info!("receipt accepted"),
            Some(reason @ RejectionReason::Status(_)) => {
                tracing::info!(%reason, "receipt rejected")
            }
            Some(reason) => tracing::warn!(%reason, "receipt validation failed"),
        }
        verdict
    }
}
