//! Store events.
//!
//! Every backend reports initialization, purchase and restore outcomes as
//! [`StoreEvent`]s on a broadcast channel. Receivers obtained with
//! `subscribe()` see events emitted after they subscribed.

use std::fmt;

use tokio::sync::broadcast;

use crate::purchase::PurchaseInfo;
use crate::validator::RejectionReason;
use crate::ProductId;

/// Buffered events per subscriber before the slowest one starts lagging.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Receiving half of a store's event channel.
pub type EventReceiver = broadcast::Receiver<StoreEvent>;

/// Why a purchase ended in [`StoreEvent::PurchaseFailed`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// The purchasing provider reported the failure.
    Provider(String),
    /// The receipt validator did not accept the receipt.
    ValidationRejected(RejectionReason),
    /// The provider completed the purchase without a receipt.
    MissingReceipt,
    /// The purchase flow could not be driven to completion.
    Internal(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider(reason) => f.write_str(reason),
            Self::ValidationRejected(reason) => write!(f, "validation rejected: {reason}"),
            Self::MissingReceipt => f.write_str("purchase completed without a receipt"),
            Self::Internal(reason) => write!(f, "internal error: {reason}"),
        }
    }
}

/// Event emitted by a store backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    Initialized {
        success: bool,
    },
    PurchaseStarted {
        info: PurchaseInfo,
    },
    PurchaseSucceeded {
        info: PurchaseInfo,
        /// Receipt as validated; empty for backends without receipts.
        receipt: String,
    },
    PurchaseFailed {
        info: PurchaseInfo,
        reason: FailureReason,
    },
    Restored {
        success: bool,
    },
}

impl StoreEvent {
    /// Product the event refers to, if any.
    pub fn product_id(&self) -> Option<&ProductId> {
        match self {
            Self::PurchaseStarted { info }
            | Self::PurchaseSucceeded { info, .. }
            | Self::PurchaseFailed { info, .. } => Some(info.product_id()),
            Self::Initialized { .. } | Self::Restored { .. } => None,
        }
    }

    /// Short snake_case name of the event kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialized { .. } => "initialized",
            Self::PurchaseStarted { .. } => "purchase_started",
            Self::PurchaseSucceeded { .. } => "purchase_succeeded",
            Self::PurchaseFailed { .. } => "purchase_failed",
            Self::Restored { .. } => "restored",
        }
    }

    /// Whether this event ends a purchase.
    pub fn is_purchase_completion(&self) -> bool {
        matches!(
            self,
            Self::PurchaseSucceeded { .. } | Self::PurchaseFailed { .. }
        )
    }
}

/// Sending half of a store's event channel.
#[derive(Clone, Debug)]
pub struct EventEmitter {
    sender: broadcast::Sender<StoreEvent>,
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventEmitter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Broadcast an event. Having no subscribers is not an error.
    pub fn emit(&self, event: StoreEvent) {
        tracing::debug!(event = event.name(), "store event");
        let _ = self.sender.send(event);
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let emitter = EventEmitter::new();
        let mut rx = emitter.subscribe();

        emitter.emit(StoreEvent::Initialized { success: true });
        emitter.emit(StoreEvent::PurchaseStarted {
            info: PurchaseInfo::new("coin_100"),
        });

        assert_eq!(
            rx.recv().await.unwrap(),
            StoreEvent::Initialized { success: true }
        );
        let started = rx.recv().await.unwrap();
        assert_eq!(started.name(), "purchase_started");
        assert_eq!(started.product_id().map(ProductId::as_str), Some("coin_100"));
    }

    #[test]
    fn test_emit_without_subscribers() {
        let emitter = EventEmitter::new();
        assert_eq!(emitter.receiver_count(), 0);
        emitter.emit(StoreEvent::Restored { success: true });
    }

    #[test]
    fn test_failure_reason_display() {
        assert_eq!(
            FailureReason::Provider("UserCancelled".into()).to_string(),
            "UserCancelled"
        );
        assert_eq!(
            FailureReason::ValidationRejected(RejectionReason::Status("1".into())).to_string(),
            "validation rejected: status 1"
        );
        assert!(FailureReason::MissingReceipt.to_string().contains("receipt"));
    }

    #[test]
    fn test_completion_kinds() {
        let info = PurchaseInfo::new("no_ads");
        assert!(StoreEvent::PurchaseSucceeded {
            info: info.clone(),
            receipt: String::new()
        }
        .is_purchase_completion());
        assert!(!StoreEvent::PurchaseStarted { info }.is_purchase_completion());
    }
}
