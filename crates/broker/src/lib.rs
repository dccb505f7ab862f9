//! Asynchronous messaging for the order and payment services.
//!
//! This crate provides:
//! - `MessageBroker`, a one-way topic-based channel, and an in-memory implementation
//! - `CorrelationClient`, which turns a publish plus a later reply on another
//!   topic into a single awaited call keyed by a correlation key
//! - `Responder`, a peer that consumes requests and publishes replies

pub mod broker;
pub mod correlation;
pub mod error;
pub mod memory;
pub mod message;
pub mod responder;

pub use broker::{MessageBroker, Subscription};
pub use correlation::{CorrelationClient, ReplyDisposition};
pub use error::{BrokerError, CorrelationError, Result};
pub use memory::InMemoryBroker;
pub use message::Message;
pub use responder::{RequestHandler, Responder};
