//! End-to-end tests for the saga node.

use std::time::Duration;

use domain::{Money, OrderService, PaymentStatus};
use event_store::{EventStore, InMemoryEventStore};
use saga::SagaState;
use saga_node::{AppError, Config, System};

fn config() -> Config {
    Config {
        card_approval_limit: Money::new(10_000),
        card_reply_timeout: Duration::from_secs(2),
        saga_settle_timeout: Duration::from_secs(5),
        ..Config::default()
    }
}

#[tokio::test]
async fn test_order_completes_over_the_broker() {
    let system = System::start(config()).await.unwrap();

    let (order_id, saga) = system
        .place_order("P-100", 2, Money::new(5000), Money::new(3000))
        .await
        .unwrap();

    assert_eq!(saga.state(), SagaState::Succeeded);
    assert!(system.stock().is_deducted(order_id));
    assert_eq!(system.coupon().applied_amount(order_id), Some(Money::new(3000)));

    system.shutdown();
}

#[tokio::test]
async fn test_declined_card_rolls_back_coupon_and_stock() {
    let system = System::start(config()).await.unwrap();

    let (order_id, saga) = system
        .place_order("P-100", 2, Money::new(50_000), Money::new(3000))
        .await
        .unwrap();

    assert_eq!(saga.state(), SagaState::Failed);
    assert_eq!(saga.failed_step(), Some("charge_card"));
    assert_eq!(saga.compensated_steps(), &["apply_coupon", "deduct_stock"]);
    assert!(!system.stock().is_deducted(order_id));
    assert_eq!(system.coupon().applied_amount(order_id), None);

    system.shutdown();
}

#[tokio::test]
async fn test_foreign_payment_over_limit_is_cancelled() {
    let system = System::start(config()).await.unwrap();

    let (settled_id, settled) = system
        .request_payment("user-1", Money::new(1000), "EUR")
        .await
        .unwrap();
    let (refused_id, refused) = system
        .request_payment("user-1", Money::new(1001), "EUR")
        .await
        .unwrap();

    assert_eq!(settled.state(), SagaState::Succeeded);
    assert!(system.foreign().is_settled(settled_id));
    assert_eq!(refused.state(), SagaState::Failed);

    let payment = system.payments().get_payment(refused_id).await.unwrap().unwrap();
    assert_eq!(payment.status(), PaymentStatus::Cancelled);
    assert_eq!(payment.cancellation_reason(), Some("Foreign payment failed"));

    system.shutdown();
}

#[tokio::test]
async fn test_invalid_order_is_rejected_before_any_saga() {
    let system = System::start(config()).await.unwrap();

    let err = system
        .place_order("P-100", 0, Money::new(5000), Money::new(3000))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Domain(_)));
    assert!(
        system
            .store()
            .get_events_by_type("SagaStarted")
            .await
            .unwrap()
            .is_empty()
    );

    system.shutdown();
}

#[tokio::test]
async fn test_startup_catches_up_on_stored_orders() {
    let store = InMemoryEventStore::new();
    let orders = OrderService::new(store.clone());
    orders
        .place_order("P-100", 1, Money::new(100), Money::new(0))
        .await
        .unwrap();

    let system = System::start_with_store(config(), store.clone()).await.unwrap();

    let started = store.get_events_by_type("SagaStarted").await.unwrap();
    assert_eq!(started.len(), 1);
    assert_eq!(store.get_events_by_type("SagaCompleted").await.unwrap().len(), 1);

    system.shutdown();
}
