//! Shared types for the order saga workspace.

pub mod sharded;
pub mod types;

pub use sharded::ShardedMap;
pub use types::AggregateId;
