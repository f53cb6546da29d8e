//! Receipt validation.
//!
//! A [`ReceiptValidator`] confirms a purchase receipt with a remote service
//! before the purchase is reported as successful. Validators differ only in
//! how the raw receipt is transformed before submission ([`ReceiptEncoding`])
//! and in which response they accept ([`AcceptancePolicy`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use unistore_lib::validator::{HttpValidator, ReceiptValidator, ValidatorConfig};
//!
//! let config = ValidatorConfig::android("https://validate.example.com/receipt")
//!     .with_bundle_id("com.example.game")
//!     .with_user_id("device-42");
//! let validator = HttpValidator::new(config)?;
//!
//! let verdict = validator.validate(&receipt, &"no_ads".into()).await;
//! if verdict.is_accepted() {
//!     println!("receipt accepted");
//! }
//! ```

mod config;
mod http;

use std::fmt;

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::ProductId;

pub(crate) use config::encoding_from_env;
pub use config::ValidatorConfig;
pub use http::HttpValidator;

/// Status value the default acceptance policy treats as success.
pub const SUCCESS_STATUS: &str = "0";

/// Remote validation of purchase receipts.
///
/// `validate` resolves exactly once per call. Failures of any kind resolve to
/// a rejection; nothing is retried.
#[async_trait]
pub trait ReceiptValidator: Send + Sync {
    async fn validate(&self, receipt: &str, product_id: &ProductId) -> ValidationVerdict;
}

/// Why a receipt was not accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectionReason {
    /// The service answered with a status the policy does not accept.
    Status(String),
    /// The service answered with a non-success HTTP status.
    Http(u16),
    /// The request never produced a response.
    Transport(String),
    /// The response body did not match the expected schema.
    MalformedResponse(String),
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) if status.is_empty() => f.write_str("no status in response"),
            Self::Status(status) => write!(f, "status {status}"),
            Self::Http(code) => write!(f, "http status {code}"),
            Self::Transport(msg) => write!(f, "transport failure: {msg}"),
            Self::MalformedResponse(msg) => write!(f, "malformed response: {msg}"),
        }
    }
}

/// Outcome of a validation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationVerdict {
    Accepted,
    Rejected(RejectionReason),
}

impl ValidationVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    pub fn rejection(&self) -> Option<&RejectionReason> {
        match self {
            Self::Accepted => None,
            Self::Rejected(reason) => Some(reason),
        }
    }
}

impl From<ValidationVerdict> for bool {
    fn from(verdict: ValidationVerdict) -> bool {
        verdict.is_accepted()
    }
}

/// Transformation applied to a raw receipt before submission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptEncoding {
    /// Submit the receipt unchanged.
    #[default]
    Raw,
    /// Base64 of the receipt's UTF-8 bytes.
    Base64,
    /// Unwrap the `Payload` of a unified receipt envelope, falling back to raw.
    UnifiedEnvelope,
}

impl ReceiptEncoding {
    /// Produce the submittable form of `receipt`.
    pub fn encode(&self, receipt: &str) -> String {
        match self {
            Self::Raw => receipt.to_string(),
            Self::Base64 => base64::engine::general_purpose::STANDARD.encode(receipt.as_bytes()),
            Self::UnifiedEnvelope => {
                unwrap_unified_receipt(receipt).unwrap_or_else(|| receipt.to_string())
            }
        }
    }
}

impl std::str::FromStr for ReceiptEncoding {
    type Err = crate::UniStoreError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "raw" => Ok(Self::Raw),
            "base64" => Ok(Self::Base64),
            "unified_envelope" | "unified" | "envelope" => Ok(Self::UnifiedEnvelope),
            other => Err(crate::UniStoreError::invalid_data(
                "receipt_encoding",
                format!("unknown encoding '{other}'"),
            )),
        }
    }
}

/// Unified receipt envelope as produced by the purchasing plugin.
#[derive(Deserialize)]
struct UnifiedReceipt {
    #[serde(rename = "Payload", alias = "payload", default)]
    payload: Option<String>,
}

/// Extract the non-empty `Payload` of a unified receipt envelope.
///
/// Returns `None` when `receipt` is not an envelope or its payload is empty.
pub fn unwrap_unified_receipt(receipt: &str) -> Option<String> {
    serde_json::from_str::<UnifiedReceipt>(receipt)
        .ok()
        .and_then(|envelope| envelope.payload)
        .filter(|payload| !payload.is_empty())
}

/// Body returned by the validation service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResponse {
    /// Service status; numbers are read as their decimal text.
    #[serde(default, alias = "Status", deserialize_with = "status_as_string")]
    pub status: Option<String>,
    #[serde(default, alias = "Payload", skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

fn status_as_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Decides whether a [`ValidationResponse`] accepts the receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AcceptancePolicy {
    /// Accept when `status` equals the given value.
    StatusEquals(String),
    /// Accept when `status` is any of the given values.
    StatusIn(Vec<String>),
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self::StatusEquals(SUCCESS_STATUS.to_string())
    }
}

impl AcceptancePolicy {
    pub fn accepts(&self, response: &ValidationResponse) -> bool {
        let Some(status) = response.status.as_deref() else {
            return false;
        };
        match self {
            Self::StatusEquals(expected) => status == expected,
            Self::StatusIn(accepted) => accepted.iter().any(|s| s == status),
        }
    }

    /// Turn a parsed response into a verdict.
    pub fn verdict(&self, response: &ValidationResponse) -> ValidationVerdict {
        if self.accepts(response) {
            ValidationVerdict::Accepted
        } else {
            ValidationVerdict::Rejected(RejectionReason::Status(
                response.status.clone().unwrap_or_default(),
            ))
        }
    }
}
