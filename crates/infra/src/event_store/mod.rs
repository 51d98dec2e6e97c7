//! Append-only event store boundary.
//!
//! Streams are keyed by `(tenant_id, aggregate_id)`. The in-memory backend is the
//! only one shipped; the trait keeps the dispatcher independent of storage.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
