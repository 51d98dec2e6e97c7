//! Origin names: supplier-qualified alternate labels for a product.

use serde::{Deserialize, Serialize};

use procura_core::{AggregateId, DomainError, DomainResult, Entity, ValueObject};
use procura_parties::PartyId;

use crate::product::ProductId;

/// Sequence assigned when none is given.
pub const DEFAULT_SEQUENCE: i32 = 10;

/// Origin name identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginNameId(pub AggregateId);

impl OriginNameId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OriginNameId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Priority sort key. Lower values sort first.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sequence(i32);

impl Sequence {
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    pub fn value(self) -> i32 {
        self.0
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self(DEFAULT_SEQUENCE)
    }
}

impl From<i32> for Sequence {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl ValueObject for Sequence {}

/// A stored origin name.
///
/// Records are only created by an `OriginNameRegistry`, which assigns the id and
/// the creation ordinal used to break sequence ties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginName {
    id: OriginNameId,
    product_id: ProductId,
    name: String,
    sequence: Sequence,
    supplier_id: Option<PartyId>,
    created_seq: u64,
}

impl OriginName {
    pub(crate) fn from_new(id: OriginNameId, new: NewOriginName, created_seq: u64) -> DomainResult<Self> {
        Ok(Self {
            id,
            product_id: new.product_id,
            name: normalize_name(&new.name)?,
            sequence: new.sequence,
            supplier_id: new.supplier_id,
            created_seq,
        })
    }

    pub fn id_typed(&self) -> OriginNameId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    pub fn supplier_id(&self) -> Option<PartyId> {
        self.supplier_id
    }

    /// Creation ordinal within the registry.
    pub fn created_seq(&self) -> u64 {
        self.created_seq
    }

    /// Retrieval ordering key: `(sequence, creation order)`.
    pub fn priority_key(&self) -> (Sequence, u64) {
        (self.sequence, self.created_seq)
    }

    /// Whether this entry is scoped to `supplier`.
    ///
    /// Compares the optional references as-is, so an order without a supplier
    /// matches supplier-agnostic entries.
    pub fn matches_supplier(&self, supplier: Option<PartyId>) -> bool {
        self.supplier_id == supplier
    }

    /// Apply an update in place; the registry re-checks uniqueness beforehand.
    pub(crate) fn apply_update(&mut self, update: OriginNameUpdate) -> DomainResult<()> {
        if let Some(name) = update.name {
            self.name = normalize_name(&name)?;
        }
        if let Some(sequence) = update.sequence {
            self.sequence = sequence;
        }
        if let Some(supplier_id) = update.supplier_id {
            self.supplier_id = supplier_id;
        }
        Ok(())
    }
}

impl Entity for OriginName {
    type Id = OriginNameId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Insert request for the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOriginName {
    pub product_id: ProductId,
    pub name: String,
    #[serde(default)]
    pub sequence: Sequence,
    pub supplier_id: Option<PartyId>,
}

impl NewOriginName {
    /// Supplier-agnostic entry with the default sequence.
    pub fn new(product_id: ProductId, name: impl Into<String>) -> Self {
        Self {
            product_id,
            name: name.into(),
            sequence: Sequence::default(),
            supplier_id: None,
        }
    }

    pub fn with_sequence(mut self, sequence: impl Into<Sequence>) -> Self {
        self.sequence = sequence.into();
        self
    }

    pub fn for_supplier(mut self, supplier_id: PartyId) -> Self {
        self.supplier_id = Some(supplier_id);
        self
    }
}

/// Partial update. `supplier_id: Some(None)` clears the supplier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginNameUpdate {
    pub name: Option<String>,
    pub sequence: Option<Sequence>,
    pub supplier_id: Option<Option<PartyId>>,
}

impl OriginNameUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.sequence.is_none() && self.supplier_id.is_none()
    }
}

pub(crate) fn normalize_name(raw: &str) -> DomainResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("origin name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

/// Sort in retrieval order: sequence ascending, then creation order.
pub fn sort_by_priority(names: &mut [OriginName]) {
    names.sort_by_key(OriginName::priority_key);
}

/// The first entry by retrieval order, if any.
pub fn first_by_priority<'a, I>(names: I) -> Option<&'a OriginName>
where
    I: IntoIterator<Item = &'a OriginName>,
{
    names.into_iter().min_by_key(|n| n.priority_key())
}
