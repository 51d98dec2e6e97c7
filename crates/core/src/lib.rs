//! `procura-core`: shared domain building blocks.
//!
//! Pure domain primitives only (identifiers, errors, aggregate traits). Nothing in
//! here performs IO.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, TenantId};
pub use value_object::ValueObject;
