//! Assertions over recorded event streams.

use crate::events::{FailureReason, StoreEvent};

/// Boolean checks over event sequences.
pub struct EventAssertion;

impl EventAssertion {
    /// Index of the first `PurchaseStarted` for `id`.
    pub fn started_at(events: &[StoreEvent], id: &str) -> Option<usize> {
        events.iter().position(|e| {
            matches!(e, StoreEvent::PurchaseStarted { .. }) && is_for(e, id)
        })
    }

    /// Completion events for `id`, in order.
    pub fn completions<'a>(events: &'a [StoreEvent], id: &str) -> Vec<&'a StoreEvent> {
        events
            .iter()
            .filter(|e| e.is_purchase_completion() && is_for(e, id))
            .collect()
    }

    /// Whether `events` contain no purchase events at all.
    pub fn no_purchase_events(events: &[StoreEvent]) -> bool {
        events.iter().all(|e| e.product_id().is_none())
    }
}

fn is_for(event: &StoreEvent, id: &str) -> bool {
    event.product_id().map(|p| p.as_str()) == Some(id)
}

/// Assert that `id` started and then completed exactly once, successfully.
///
/// Returns the receipt carried by the success event.
///
/// # Panics
/// Panics if the sequence differs.
pub fn assert_purchase_succeeded(events: &[StoreEvent], id: &str) -> String {
    let started = EventAssertion::started_at(events, id)
        .unwrap_or_else(|| panic!("no PurchaseStarted for {id} in {events:?}"));
    let completions = EventAssertion::completions(events, id);
    assert_eq!(
        completions.len(),
        1,
        "expected exactly one completion for {id}, got {completions:?}"
    );
    let completed = events
        .iter()
        .position(|e| e.is_purchase_completion() && is_for(e, id))
        .unwrap_or_default();
    assert!(completed > started, "completion for {id} came before start");

    match completions[0] {
        StoreEvent::PurchaseSucceeded { receipt, .. } => receipt.clone(),
        other => panic!("expected PurchaseSucceeded for {id}, got {other:?}"),
    }
}

/// Assert that `id` started and then failed exactly once.
///
/// Returns the failure reason.
///
/// # Panics
/// Panics if the sequence differs.
pub fn assert_purchase_failed(events: &[StoreEvent], id: &str) -> FailureReason {
    assert!(
        EventAssertion::started_at(events, id).is_some(),
        "no PurchaseStarted for {id} in {events:?}"
    );
    let completions = EventAssertion::completions(events, id);
    assert_eq!(
        completions.len(),
        1,
        "expected exactly one completion for {id}, got {completions:?}"
    );
    match completions[0] {
        StoreEvent::PurchaseFailed { reason, .. } => reason.clone(),
        other => panic!("expected PurchaseFailed for {id}, got {other:?}"),
    }
}

/// Assert that no purchase was started or completed.
///
/// # Panics
/// Panics if any purchase event is present.
pub fn assert_no_purchase_events(events: &[StoreEvent]) {
    assert!(
        EventAssertion::no_purchase_events(events),
        "expected no purchase events, got {events:?}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::purchase::PurchaseInfo;

    fn started(id: &str) -> StoreEvent {
        StoreEvent::PurchaseStarted {
            info: PurchaseInfo::new(id),
        }
    }

    #[test]
    fn test_success_sequence() {
        let events = vec![
            started("coin_100"),
            StoreEvent::PurchaseSucceeded {
                info: PurchaseInfo::new("coin_100"),
                receipt: "r".into(),
            },
        ];
        assert_eq!(assert_purchase_succeeded(&events, "coin_100"), "r");
    }

    #[test]
    #[should_panic(expected = "expected PurchaseSucceeded")]
    fn test_failure_is_not_success() {
        let events = vec![
            started("coin_100"),
            StoreEvent::PurchaseFailed {
                info: PurchaseInfo::new("coin_100"),
                reason: FailureReason::MissingReceipt,
            },
        ];
        assert_purchase_succeeded(&events, "coin_100");
    }

    #[test]
    fn test_no_purchase_events() {
        assert_no_purchase_events(&[StoreEvent::Initialized { success: true }]);
        assert!(!EventAssertion::no_purchase_events(&[started("a")]));
    }
}
