//! Projections (read model builders).
//!
//! Projections consume committed event envelopes and are tenant-isolated,
//! rebuildable from the event stream, and idempotent under at-least-once delivery.

pub mod product_orders;

pub use product_orders::{OrderProducts, ProductOrdersProjection, ProductOrdersProjectionError};
