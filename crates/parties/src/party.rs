use serde::{Deserialize, Serialize};

use procura_core::{AggregateId, DomainError, DomainResult, Entity, TenantId};

/// Party identifier (tenant-scoped via the owning `Party`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(pub AggregateId);

impl PartyId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PartyId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    Customer,
    Supplier,
}

/// A registered business partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    id: PartyId,
    tenant_id: TenantId,
    kind: PartyKind,
    name: String,
}

impl Party {
    pub fn register(
        tenant_id: TenantId,
        id: PartyId,
        kind: PartyKind,
        name: impl Into<String>,
    ) -> DomainResult<Self> {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("party name cannot be empty"));
        }
        Ok(Self {
            id,
            tenant_id,
            kind,
            name: name.to_string(),
        })
    }

    /// Shorthand for registering a supplier.
    pub fn supplier(tenant_id: TenantId, id: PartyId, name: impl Into<String>) -> DomainResult<Self> {
        Self::register(tenant_id, id, PartyKind::Supplier, name)
    }

    pub fn id_typed(&self) -> PartyId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn kind(&self) -> PartyKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_supplier(&self) -> bool {
        self.kind == PartyKind::Supplier
    }
}

impl Entity for Party {
    type Id = PartyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supplier_registration_trims_name() {
        let party = Party::supplier(TenantId::new(), PartyId::new(AggregateId::new()), "  SupplierX ")
            .unwrap();
        assert_eq!(party.name(), "SupplierX");
        assert!(party.is_supplier());
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = Party::register(
            TenantId::new(),
            PartyId::new(AggregateId::new()),
            PartyKind::Customer,
            "   ",
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
