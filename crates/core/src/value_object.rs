//! Value object trait: equality by value, not identity.

/// Marker trait for immutable values compared by their attributes.
///
/// A sort key such as an origin-name sequence is a value object: two sequences
/// holding the same integer are interchangeable.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
