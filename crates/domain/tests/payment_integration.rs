//! Integration tests for the Payment aggregate.

use common::AggregateId;
use domain::{
    Aggregate, CancelPayment, CreatePayment, DomainError, Money, PaymentError, PaymentService,
    PaymentStatus,
};
use event_store::{EventStore, InMemoryEventStore, Version};

fn create_service() -> (PaymentService<InMemoryEventStore>, InMemoryEventStore) {
    let store = InMemoryEventStore::new();
    (PaymentService::new(store.clone()), store)
}

#[tokio::test]
async fn create_then_cancel() {
    let (service, store) = create_service();
    let cmd = CreatePayment::new("user-7", Money::new(1500), "USD");
    let payment_id = cmd.payment_id;

    let created = service.create_payment(cmd).await.unwrap();
    assert_eq!(created.aggregate.status(), PaymentStatus::Created);

    let cancelled = service
        .cancel_payment(CancelPayment::new(payment_id, "Foreign payment failed"))
        .await
        .unwrap();
    assert_eq!(cancelled.new_version, Version::new(2));
    assert_eq!(cancelled.aggregate.status(), PaymentStatus::Cancelled);
    assert_eq!(cancelled.aggregate.amount(), Money::new(1500));

    let types: Vec<_> = store
        .get_events_for_aggregate(payment_id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(types, vec!["PaymentCreated", "PaymentCancelled"]);

    let loaded = service.get_payment(payment_id).await.unwrap().unwrap();
    assert_eq!(loaded, cancelled.aggregate);
    assert_eq!(loaded.cancellation_reason(), Some("Foreign payment failed"));
}

#[tokio::test]
async fn cancel_unknown_payment_is_not_found() {
    let (service, store) = create_service();

    let result = service
        .cancel_payment(CancelPayment::new(AggregateId::new(), "nothing to cancel"))
        .await;

    assert!(matches!(result, Err(DomainError::AggregateNotFound { .. })));
    assert_eq!(store.event_count().await, 0);
}

#[tokio::test]
async fn cancel_twice_is_rejected() {
    let (service, store) = create_service();
    let created = service
        .request_payment("user-7", Money::new(10), "KRW")
        .await
        .unwrap();
    let payment_id = created.aggregate.id().unwrap();

    service
        .cancel_payment(CancelPayment::new(payment_id, "first"))
        .await
        .unwrap();
    let second = service
        .cancel_payment(CancelPayment::new(payment_id, "second"))
        .await;

    assert!(matches!(
        second,
        Err(DomainError::Payment(PaymentError::AlreadyCancelled))
    ));
    assert_eq!(store.event_count().await, 2);
}

#[tokio::test]
async fn invalid_currency_is_rejected() {
    let (service, store) = create_service();

    let result = service.request_payment("user-7", Money::new(10), "us").await;

    assert!(matches!(
        result,
        Err(DomainError::Payment(PaymentError::InvalidCurrency { .. }))
    ));
    assert_eq!(store.event_count().await, 0);
}
