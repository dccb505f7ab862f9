//! Single-process node running the order and payment sagas.
//!
//! Wires the in-memory event store, the message broker with its simulated
//! card gateway, and both saga runners behind one dispatcher that follows
//! the store's event feed.

pub mod config;
pub mod error;

use std::sync::Arc;
use std::time::Duration;

use broker::{CorrelationClient, InMemoryBroker, MessageBroker, Responder};
use common::AggregateId;
use domain::{CreateOrder, CreatePayment, DomainError, Money, OrderService, PaymentService};
use event_store::{EventStore, InMemoryEventStore};
use saga::ports::{CARD_REQUEST_TOPIC, CARD_RESULT_TOPIC};
use saga::{
    BrokerCardPort, CardGatewaySimulator, InMemoryCouponPort, InMemoryForeignPaymentPort,
    InMemoryStockPort, OrderSaga, PaymentSaga, SagaDefinition, SagaDispatcher, SagaInstance,
    SagaRunner,
};
use tokio::task::JoinHandle;

pub use config::{Config, LogFormat};
pub use error::{AppError, Result};

const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(10);

type OrderRunner = SagaRunner<InMemoryEventStore, OrderSaga>;
type PaymentRunner = SagaRunner<InMemoryEventStore, PaymentSaga<InMemoryEventStore>>;

/// Everything the node runs, plus the background tasks that drive it.
pub struct System {
    config: Config,
    store: InMemoryEventStore,
    orders: OrderService<InMemoryEventStore>,
    payments: PaymentService<InMemoryEventStore>,
    card_client: CorrelationClient,
    order_runner: Arc<OrderRunner>,
    payment_runner: Arc<PaymentRunner>,
    stock: InMemoryStockPort,
    coupon: InMemoryCouponPort,
    foreign: InMemoryForeignPaymentPort,
    tasks: Vec<JoinHandle<()>>,
}

impl System {
    /// Starts a node over an empty store.
    pub async fn start(config: Config) -> Result<Self> {
        Self::start_with_store(config, InMemoryEventStore::new()).await
    }

    /// Starts a node over an existing store.
    ///
    /// The event feed is subscribed before catch-up runs, so triggers
    /// appended during catch-up are not lost. Triggers already handled are
    /// skipped as duplicates.
    #[tracing::instrument(skip_all)]
    pub async fn start_with_store(config: Config, store: InMemoryEventStore) -> Result<Self> {
        let mut tasks = Vec::new();

        let broker: Arc<dyn MessageBroker> = Arc::new(InMemoryBroker::new());
        let card_client = CorrelationClient::new(Arc::clone(&broker), CARD_REQUEST_TOPIC);
        tasks.push(card_client.spawn_reply_listener(CARD_RESULT_TOPIC));
        tasks.push(
            Responder::new(broker, CARD_REQUEST_TOPIC, CARD_RESULT_TOPIC).spawn(Arc::new(
                CardGatewaySimulator::new(config.card_approval_limit),
            )),
        );

        let stock = InMemoryStockPort::new();
        let coupon = InMemoryCouponPort::new();
        let foreign = InMemoryForeignPaymentPort::with_limit(config.foreign_approval_limit);
        let card = BrokerCardPort::new(card_client.clone(), config.card_reply_timeout);

        let order_runner = Arc::new(SagaRunner::new(
            store.clone(),
            OrderSaga::new(
                Arc::new(stock.clone()),
                Arc::new(coupon.clone()),
                Arc::new(card),
            ),
        ));
        let payment_runner = Arc::new(SagaRunner::new(
            store.clone(),
            PaymentSaga::new(store.clone(), Arc::new(foreign.clone())),
        ));
        let dispatcher = Arc::new(
            SagaDispatcher::new()
                .saga(Arc::clone(&order_runner))
                .saga(Arc::clone(&payment_runner)),
        );

        let feed = store.subscribe();
        let caught_up = dispatcher.run_catch_up(&store).await?;
        tasks.push(dispatcher.spawn(store.clone(), feed));

        tracing::info!(caught_up, "saga node started");

        Ok(Self {
            orders: OrderService::new(store.clone()),
            payments: PaymentService::new(store.clone()),
            config,
            store,
            card_client,
            order_runner,
            payment_runner,
            stock,
            coupon,
            foreign,
            tasks,
        })
    }

    /// Places an order and waits for its saga to finish.
    #[tracing::instrument(skip_all, fields(quantity, %card_payment, %coupon_payment))]
    pub async fn place_order(
        &self,
        product_code: impl Into<String>,
        quantity: u32,
        card_payment: Money,
        coupon_payment: Money,
    ) -> Result<(AggregateId, SagaInstance)> {
        let cmd = CreateOrder::new(product_code, quantity, card_payment, coupon_payment)
            .map_err(DomainError::from)?;
        let order_id = cmd.order_id();
        self.orders.create_order(cmd).await?;
        let saga = self.settle(&self.order_runner, order_id).await?;
        Ok((order_id, saga))
    }

    /// Requests a payment and waits for its saga to finish.
    #[tracing::instrument(skip_all, fields(%amount))]
    pub async fn request_payment(
        &self,
        user_id: impl Into<String>,
        amount: Money,
        currency: impl Into<String>,
    ) -> Result<(AggregateId, SagaInstance)> {
        let cmd = CreatePayment::new(user_id, amount, currency);
        let payment_id = cmd.payment_id;
        self.payments.create_payment(cmd).await?;
        let saga = self.settle(&self.payment_runner, payment_id).await?;
        Ok((payment_id, saga))
    }

    async fn settle<D: SagaDefinition>(
        &self,
        runner: &SagaRunner<InMemoryEventStore, D>,
        key: AggregateId,
    ) -> Result<SagaInstance> {
        let after = self.config.saga_settle_timeout;
        tokio::time::timeout(after, until_terminal(runner, key))
            .await
            .map_err(|_| AppError::SettleTimeout { key, after })?
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &InMemoryEventStore {
        &self.store
    }

    pub fn payments(&self) -> &PaymentService<InMemoryEventStore> {
        &self.payments
    }

    pub fn stock(&self) -> &InMemoryStockPort {
        &self.stock
    }

    pub fn coupon(&self) -> &InMemoryCouponPort {
        &self.coupon
    }

    pub fn foreign(&self) -> &InMemoryForeignPaymentPort {
        &self.foreign
    }

    /// Fails outstanding card requests and stops background tasks.
    pub fn shutdown(self) {
        let cancelled = self.card_client.cancel_all();
        for task in &self.tasks {
            task.abort();
        }
        tracing::info!(cancelled, tasks = self.tasks.len(), "saga node stopped");
    }
}

async fn until_terminal<D: SagaDefinition>(
    runner: &SagaRunner<InMemoryEventStore, D>,
    key: AggregateId,
) -> Result<SagaInstance> {
    loop {
        if let Some(saga) = runner.find_by_association(key).await? {
            if saga.state().is_terminal() {
                return Ok(saga);
            }
        }
        tokio::time::sleep(SETTLE_POLL_INTERVAL).await;
    }
}
