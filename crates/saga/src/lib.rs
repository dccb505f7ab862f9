//! Saga orchestration for orders and payments.
//!
//! A saga reacts to a stored event and drives an ordered list of steps
//! against external ports. If a step fails, the steps that already completed
//! are compensated in reverse order.
//!
//! The order saga follows these steps:
//! 1. Deduct stock
//! 2. Apply coupon
//! 3. Charge card
//!
//! The payment saga settles a foreign-currency payment and cancels the
//! payment if settlement fails.
//!
//! Saga progress is itself event-sourced, one stream per saga instance.

pub mod aggregate;
pub mod definition;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod order_saga;
pub mod payment_saga;
pub mod ports;
pub mod registry;
pub mod runner;
pub mod state;

pub use aggregate::{SagaAction, SagaCommand, SagaInstance};
pub use definition::{SagaDefinition, SagaStep};
pub use dispatcher::{EventHandler, SagaDispatcher};
pub use error::{PortError, Result, SagaError, TransitionError};
pub use events::{CompensationFailure, SagaEvent};
pub use order_saga::{OrderSaga, OrderSagaContext};
pub use payment_saga::{PaymentSaga, PaymentSagaContext};
pub use ports::{
    BrokerCardPort, CallJournal, CardGatewaySimulator, CardPort, CouponPort, ForeignPaymentPort,
    InMemoryCardPort, InMemoryCouponPort, InMemoryForeignPaymentPort, InMemoryStockPort, PortCall,
    StockPort,
};
pub use registry::{SagaClaim, SagaRegistry};
pub use runner::{CompensationReport, SagaOutcome, SagaRunner};
pub use state::SagaState;
