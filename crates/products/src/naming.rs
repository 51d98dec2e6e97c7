//! Name resolution for a single product.

use serde::{Deserialize, Serialize};

use procura_core::{DomainError, DomainResult};
use procura_parties::PartyId;

use crate::origin_name::{OriginName, OriginNameId, sort_by_priority};
use crate::product::{Product, ProductId};

/// Origin-name extension of a product, keyed by its id.
///
/// Holds the canonical name and the product's origin names in retrieval order.
/// Purchasing commands carry this snapshot so that line naming can be decided
/// without reaching into storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductNaming {
    product_id: ProductId,
    canonical_name: String,
    origin_names: Vec<OriginName>,
}

impl ProductNaming {
    /// Build a snapshot; every origin name must belong to `product_id`.
    pub fn new(
        product_id: ProductId,
        canonical_name: impl Into<String>,
        mut origin_names: Vec<OriginName>,
    ) -> DomainResult<Self> {
        if let Some(foreign) = origin_names.iter().find(|n| n.product_id() != product_id) {
            return Err(DomainError::invariant(format!(
                "origin name {} belongs to product {}, not {}",
                foreign.id_typed(),
                foreign.product_id(),
                product_id
            )));
        }
        sort_by_priority(&mut origin_names);
        Ok(Self {
            product_id,
            canonical_name: canonical_name.into(),
            origin_names,
        })
    }

    pub fn of(product: &Product, origin_names: Vec<OriginName>) -> DomainResult<Self> {
        Self::new(product.id_typed(), product.name(), origin_names)
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn canonical_name(&self) -> &str {
        &self.canonical_name
    }

    /// Origin names in retrieval order.
    pub fn origin_names(&self) -> &[OriginName] {
        &self.origin_names
    }

    pub fn has_origin_names(&self) -> bool {
        !self.origin_names.is_empty()
    }

    /// Entry with the lowest sequence (ties: earliest created).
    pub fn primary(&self) -> Option<&OriginName> {
        self.origin_names.first()
    }

    /// Primary origin name, or the canonical name when there is none.
    pub fn primary_origin_name(&self) -> &str {
        self.primary().map(OriginName::name).unwrap_or(self.canonical_name.as_str())
    }

    /// Entries scoped to `supplier`, in retrieval order.
    pub fn for_supplier(&self, supplier: Option<PartyId>) -> impl Iterator<Item = &OriginName> {
        self.origin_names
            .iter()
            .filter(move |n| n.matches_supplier(supplier))
    }

    pub fn find(&self, id: OriginNameId) -> Option<&OriginName> {
        self.origin_names.iter().find(|n| n.id_typed() == id)
    }
}
