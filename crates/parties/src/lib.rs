//! Parties (suppliers and customers) as seen by purchasing.
//!
//! Only identity, kind, and display name are modelled here; origin names refer to
//! suppliers purely by `PartyId`.

pub mod party;

pub use party::{Party, PartyId, PartyKind};
