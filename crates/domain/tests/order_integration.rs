//! Integration tests for the Order aggregate.
//!
//! These tests verify order creation through the service, event persistence,
//! aggregate reconstruction, and rejection behavior.

use common::AggregateId;
use domain::{
    Aggregate, CreateOrder, DomainError, DomainEvent, Money, Order, OrderError, OrderEvent,
    OrderService,
};
use event_store::{EventStore, InMemoryEventStore, Version};

/// Helper to create a test order service
fn create_service() -> (OrderService<InMemoryEventStore>, InMemoryEventStore) {
    let store = InMemoryEventStore::new();
    (OrderService::new(store.clone()), store)
}

mod order_creation {
    use super::*;

    #[tokio::test]
    async fn price_is_derived_from_card_and_coupon() {
        let (service, _) = create_service();

        let result = service
            .place_order("P-100", 2, Money::new(5000), Money::new(3000))
            .await
            .unwrap();

        assert_eq!(result.aggregate.price(), Money::new(8000));
        assert_eq!(result.aggregate.card_payment(), Money::new(5000));
        assert_eq!(result.aggregate.coupon_payment(), Money::new(3000));
        assert_eq!(result.new_version, Version::first());
        assert_eq!(result.event.event_type(), "OrderCreated");
    }

    #[tokio::test]
    async fn created_event_is_persisted_with_full_snapshot() {
        let (service, store) = create_service();
        let cmd = CreateOrder::new("P-200", 4, Money::new(700), Money::new(300)).unwrap();
        let order_id = cmd.order_id();

        service.create_order(cmd).await.unwrap();

        let stored = store.get_events_for_aggregate(order_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].aggregate_type, "Order");
        assert_eq!(stored[0].event_type, "OrderCreated");

        let OrderEvent::OrderCreated(data) = stored[0].decode::<OrderEvent>().unwrap();
        assert_eq!(data.order_id, order_id);
        assert_eq!(data.product_code, "P-200");
        assert_eq!(data.quantity, 4);
        assert_eq!(data.price, Money::new(1000));
    }

    #[tokio::test]
    async fn get_order_returns_none_for_unknown_id() {
        let (service, _) = create_service();
        assert!(service.get_order(AggregateId::new()).await.unwrap().is_none());
    }
}

mod replay {
    use super::*;

    #[tokio::test]
    async fn loading_twice_yields_identical_state() {
        let (service, store) = create_service();
        let result = service
            .place_order("P-100", 1, Money::new(5000), Money::new(3000))
            .await
            .unwrap();
        let order_id = result.aggregate.id().unwrap();

        let first = service.get_order(order_id).await.unwrap().unwrap();
        let second = service.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(first, result.aggregate);

        let events: Vec<OrderEvent> = store
            .get_events_for_aggregate(order_id)
            .await
            .unwrap()
            .iter()
            .map(|e| e.decode().unwrap())
            .collect();
        let mut folded = Order::replay(&events);
        folded.set_version(Version::first());
        assert_eq!(folded, first);
    }
}

mod error_handling {
    use super::*;

    #[tokio::test]
    async fn rejected_order_leaves_no_trace() {
        let (service, store) = create_service();
        let cmd = CreateOrder::new("P-100", 0, Money::new(5000), Money::zero()).unwrap();
        let order_id = cmd.order_id();

        let result = service.create_order(cmd).await;

        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::InvalidQuantity { .. }))
        ));
        assert_eq!(store.event_count().await, 0);
        assert!(service.get_order(order_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replaying_a_create_command_is_rejected() {
        let (service, store) = create_service();
        let cmd = CreateOrder::new("P-100", 1, Money::new(10), Money::zero()).unwrap();

        service.create_order(cmd.clone()).await.unwrap();
        let result = service.create_order(cmd).await;

        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::AlreadyCreated))
        ));
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn concurrent_duplicate_creates_keep_one_stream() {
        let (service, store) = create_service();
        let cmd = CreateOrder::new("P-100", 1, Money::new(10), Money::zero()).unwrap();

        let (a, b) = tokio::join!(
            service.create_order(cmd.clone()),
            service.create_order(cmd.clone())
        );

        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert_eq!(
            store
                .get_events_for_aggregate(cmd.order_id())
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
