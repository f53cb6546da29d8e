//! End-to-end purchase flows through every backend.

use std::sync::Arc;

use unistore_lib::backends::{
    PaymentResult, PluginStore, PluginStoreOptions, SamsungStore, FAKE_PRICE,
};
use unistore_lib::prelude::*;
use unistore_lib::test_utils::{
    assert_no_purchase_events, assert_purchase_failed, assert_purchase_succeeded, sample_catalog,
    unified_receipt, EventRecorder, FixedValidator, MockOutcome, MockPurchasingProvider,
    MockSamsungSdk, TestFixtures,
};
use unistore_lib::validator::RejectionReason;

fn coin_catalog() -> ProductCatalog {
    ProductCatalog::from_types([("coin_100", ProductType::Consumable)]).unwrap()
}

// ============================================================================
// Consumable purchase scenarios
// ============================================================================

#[tokio::test]
async fn test_consumable_without_validator() {
    let store = UniversalStore::builder(coin_catalog()).build().unwrap();
    let mut events = EventRecorder::new(store.subscribe());

    store.buy("coin_100").await;

    let recorded = events.drain();
    assert_eq!(recorded.len(), 2);
    match &recorded[0] {
        StoreEvent::PurchaseStarted { info } => assert_eq!(info.product_id().as_str(), "coin_100"),
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(assert_purchase_succeeded(&recorded, "coin_100"), "");
}

#[tokio::test]
async fn test_consumable_with_rejecting_validator() {
    let validator = Arc::new(FixedValidator::rejecting("1"));
    let store = UniversalStore::builder(coin_catalog())
        .validator(validator.clone())
        .build()
        .unwrap();
    let mut events = EventRecorder::new(store.subscribe());

    store.buy("coin_100").await;

    let recorded = events.drain();
    assert_eq!(recorded.len(), 2);
    let reason = assert_purchase_failed(&recorded, "coin_100");
    assert!(matches!(
        reason,
        FailureReason::ValidationRejected(RejectionReason::Status(_))
    ));
    assert!(!store.is_purchased("coin_100"));
    assert_eq!(validator.calls(), 1);
}

// ============================================================================
// Ownership
// ============================================================================

#[tokio::test]
async fn test_ownership_by_product_type() {
    let store = UniversalStore::builder(sample_catalog()).build().unwrap();

    for id in [
        TestFixtures::CONSUMABLE,
        TestFixtures::NON_CONSUMABLE,
        TestFixtures::SUBSCRIPTION,
    ] {
        assert!(!store.is_purchased(id));
        store.buy(id).await;
    }

    assert!(!store.is_purchased(TestFixtures::CONSUMABLE));
    assert!(store.is_purchased(TestFixtures::NON_CONSUMABLE));
    assert!(store.is_purchased(TestFixtures::SUBSCRIPTION));

    // Ownership persists for the instance lifetime.
    store.buy(TestFixtures::CONSUMABLE).await;
    assert!(store.is_purchased(TestFixtures::NON_CONSUMABLE));
}

#[tokio::test]
async fn test_unknown_product_is_ignored() {
    let store = UniversalStore::builder(sample_catalog()).build().unwrap();
    let mut events = EventRecorder::new(store.subscribe());

    store.buy("gems_9000").await;

    assert_no_purchase_events(&events.drain());
    assert!(!store.is_purchased("gems_9000"));
}

// ============================================================================
// Plugin backend
// ============================================================================

fn plugin_store(provider: Arc<MockPurchasingProvider>) -> UniversalStore {
    UniversalStore::builder(sample_catalog())
        .config(StoreConfig::new(BackendKind::Plugin))
        .plugin_provider(provider)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_buy_before_initialize_emits_nothing() {
    let provider = Arc::new(MockPurchasingProvider::new());
    let store = plugin_store(provider.clone());
    let mut events = EventRecorder::new(store.subscribe());

    store.buy(TestFixtures::NON_CONSUMABLE).await;

    assert!(events.drain().is_empty());
    assert!(provider.purchases().is_empty());
}

#[tokio::test]
async fn test_plugin_full_flow() {
    let provider = Arc::new(
        MockPurchasingProvider::new().with_price(TestFixtures::NON_CONSUMABLE, "2,99 €", "EUR"),
    );
    let store = plugin_store(provider.clone());
    let mut events = EventRecorder::new(store.subscribe());

    store.initialize().await;
    assert!(store.is_initialized());
    assert_eq!(store.price(TestFixtures::NON_CONSUMABLE), "2,99 €");

    store.buy(TestFixtures::NON_CONSUMABLE).await;

    let recorded = events.drain();
    assert_eq!(recorded[0], StoreEvent::Initialized { success: true });
    let receipt = assert_purchase_succeeded(&recorded, TestFixtures::NON_CONSUMABLE);
    assert_eq!(receipt, "receipt-no_ads");
    assert_eq!(provider.purchases().len(), 1);
    assert!(store.is_purchased(TestFixtures::NON_CONSUMABLE));
}

#[tokio::test]
async fn test_plugin_provider_error_becomes_failure_event() {
    let provider = Arc::new(MockPurchasingProvider::new());
    provider.set_outcome(
        TestFixtures::SUBSCRIPTION,
        MockOutcome::Error("billing service disconnected".into()),
    );
    let store = plugin_store(provider);
    store.initialize().await;
    let mut events = EventRecorder::new(store.subscribe());

    store.buy(TestFixtures::SUBSCRIPTION).await;

    let reason = assert_purchase_failed(&events.drain(), TestFixtures::SUBSCRIPTION);
    assert!(reason.to_string().contains("billing service disconnected"));
}

#[tokio::test]
async fn test_plugin_unwraps_envelope_before_validation() {
    let provider = Arc::new(MockPurchasingProvider::new());
    provider.set_outcome(
        TestFixtures::NON_CONSUMABLE,
        MockOutcome::Receipt(unified_receipt(TestFixtures::SAMPLE_RECEIPT)),
    );
    let validator = Arc::new(FixedValidator::accepting());
    let store = PluginStore::new(
        Arc::new(sample_catalog()),
        Some(validator.clone()),
        provider,
    )
    .with_options(PluginStoreOptions {
        unwrap_receipt_envelope: true,
    });
    store.initialize().await;
    let mut events = EventRecorder::new(store.subscribe());

    store.buy(TestFixtures::NON_CONSUMABLE).await;

    let receipt = assert_purchase_succeeded(&events.drain(), TestFixtures::NON_CONSUMABLE);
    assert_eq!(receipt, TestFixtures::SAMPLE_RECEIPT);
    assert_eq!(validator.receipts(), vec![TestFixtures::SAMPLE_RECEIPT.to_string()]);
}

#[tokio::test]
async fn test_plugin_without_validator_reports_raw_receipt() {
    let provider = Arc::new(MockPurchasingProvider::new());
    let envelope = unified_receipt(TestFixtures::SAMPLE_RECEIPT);
    provider.set_outcome(
        TestFixtures::NON_CONSUMABLE,
        MockOutcome::Receipt(envelope.clone()),
    );
    let store = UniversalStore::builder(sample_catalog())
        .config(
            StoreConfig::new(BackendKind::Plugin).with_plugin_options(PluginStoreOptions {
                unwrap_receipt_envelope: true,
            }),
        )
        .plugin_provider(provider)
        .build()
        .unwrap();
    store.initialize().await;
    let mut events = EventRecorder::new(store.subscribe());

    store.buy(TestFixtures::NON_CONSUMABLE).await;

    assert_eq!(
        assert_purchase_succeeded(&events.drain(), TestFixtures::NON_CONSUMABLE),
        envelope
    );
}

// ============================================================================
// Restore
// ============================================================================

#[tokio::test]
async fn test_restore_without_capability() {
    let store = UniversalStore::builder(sample_catalog()).build().unwrap();
    let mut events = EventRecorder::new(store.subscribe());

    assert!(store.try_restore_purchases().await);
    assert!(events.drain().is_empty());

    store.restore_purchases().await;
    assert_eq!(events.drain(), vec![StoreEvent::Restored { success: true }]);
}

#[tokio::test]
async fn test_plugin_restore_failure() {
    let provider = Arc::new(
        MockPurchasingProvider::new().with_restore(Err("store unreachable".to_string())),
    );
    let store = plugin_store(provider);
    store.initialize().await;
    let mut events = EventRecorder::new(store.subscribe());

    store.restore_purchases().await;

    assert_eq!(events.drain(), vec![StoreEvent::Restored { success: false }]);
}

#[tokio::test]
async fn test_plugin_restore_before_initialize() {
    let store = plugin_store(Arc::new(MockPurchasingProvider::new().with_restore(Ok(true))));
    assert!(!store.try_restore_purchases().await);
}

// ============================================================================
// Samsung backend
// ============================================================================

#[tokio::test]
async fn test_samsung_flow() {
    let sdk = Arc::new(MockSamsungSdk::new());
    let store = UniversalStore::builder(sample_catalog())
        .config(StoreConfig::new(BackendKind::Samsung))
        .samsung_sdk(sdk.clone())
        .build()
        .unwrap();
    let mut events = EventRecorder::new(store.subscribe());

    store.buy(TestFixtures::CONSUMABLE).await;
    assert!(events.drain().is_empty());

    store.initialize().await;
    assert_eq!(store.price(TestFixtures::CONSUMABLE), "₩1,200");

    store.buy(TestFixtures::CONSUMABLE).await;
    store.buy(TestFixtures::NON_CONSUMABLE).await;

    let recorded = events.drain();
    assert_eq!(recorded[0], StoreEvent::Initialized { success: true });
    assert_eq!(assert_purchase_succeeded(&recorded, TestFixtures::CONSUMABLE), "");
    assert_purchase_succeeded(&recorded, TestFixtures::NON_CONSUMABLE);
    assert_eq!(sdk.consumed().len(), 1);
    assert_eq!(sdk.payments().len(), 2);
    assert!(store.is_purchased(TestFixtures::NON_CONSUMABLE));
    assert!(!store.is_purchased(TestFixtures::CONSUMABLE));
}

#[tokio::test]
async fn test_samsung_payment_without_results_fails() {
    let sdk = Arc::new(MockSamsungSdk::new());
    sdk.fail_payment(TestFixtures::NON_CONSUMABLE, PaymentResult::default());
    let store = SamsungStore::new(Arc::new(sample_catalog()), None, sdk);
    store.initialize().await;
    let mut events = EventRecorder::new(store.subscribe());

    store.buy(TestFixtures::NON_CONSUMABLE).await;

    let reason = assert_purchase_failed(&events.drain(), TestFixtures::NON_CONSUMABLE);
    assert!(matches!(reason, FailureReason::Provider(_)));
}

#[tokio::test]
async fn test_samsung_fallback_price_before_details() {
    let store = SamsungStore::new(
        Arc::new(sample_catalog()),
        None,
        Arc::new(MockSamsungSdk::new()),
    );
    assert_eq!(store.price(TestFixtures::NON_CONSUMABLE), FAKE_PRICE);
    assert!(store.product_info(TestFixtures::NON_CONSUMABLE).is_none());
}
