//! Origin name registry: tenant-scoped storage with a `(name, product)` unique index.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use procura_core::{AggregateId, DomainError, DomainResult, TenantId};

use crate::origin_name::{
    NewOriginName, OriginName, OriginNameId, OriginNameUpdate, normalize_name, sort_by_priority,
};
use crate::product::ProductId;

/// Storage contract for origin names.
///
/// Implementations must reject inserts and updates that would duplicate a
/// `(name, product)` pair with `DomainError::ConstraintViolation`, and must return
/// `for_product` results in retrieval order (sequence, then creation order).
pub trait OriginNameRegistry: Send + Sync {
    fn insert(&self, tenant_id: TenantId, new: NewOriginName) -> DomainResult<OriginName>;

    fn update(
        &self,
        tenant_id: TenantId,
        id: OriginNameId,
        update: OriginNameUpdate,
    ) -> DomainResult<OriginName>;

    fn remove(&self, tenant_id: TenantId, id: OriginNameId) -> DomainResult<OriginName>;

    /// Cascade removal of every origin name owned by `product_id`.
    fn remove_for_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> DomainResult<Vec<OriginName>>;

    fn get(&self, tenant_id: TenantId, id: OriginNameId) -> Option<OriginName>;

    fn for_product(&self, tenant_id: TenantId, product_id: ProductId) -> Vec<OriginName>;
}

impl<S> OriginNameRegistry for Arc<S>
where
    S: OriginNameRegistry + ?Sized,
{
    fn insert(&self, tenant_id: TenantId, new: NewOriginName) -> DomainResult<OriginName> {
        (**self).insert(tenant_id, new)
    }

    fn update(
        &self,
        tenant_id: TenantId,
        id: OriginNameId,
        update: OriginNameUpdate,
    ) -> DomainResult<OriginName> {
        (**self).update(tenant_id, id, update)
    }

    fn remove(&self, tenant_id: TenantId, id: OriginNameId) -> DomainResult<OriginName> {
        (**self).remove(tenant_id, id)
    }

    fn remove_for_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> DomainResult<Vec<OriginName>> {
        (**self).remove_for_product(tenant_id, product_id)
    }

    fn get(&self, tenant_id: TenantId, id: OriginNameId) -> Option<OriginName> {
        (**self).get(tenant_id, id)
    }

    fn for_product(&self, tenant_id: TenantId, product_id: ProductId) -> Vec<OriginName> {
        (**self).for_product(tenant_id, product_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct UniqueKey {
    tenant_id: TenantId,
    product_id: ProductId,
    name: String,
}

#[derive(Debug, Default)]
struct RegistryState {
    records: HashMap<(TenantId, OriginNameId), OriginName>,
    unique: HashMap<UniqueKey, OriginNameId>,
    next_created_seq: u64,
}

/// In-memory registry for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOriginNameRegistry {
    inner: RwLock<RegistryState>,
}

impl InMemoryOriginNameRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> DomainError {
    DomainError::invariant("origin name registry lock poisoned")
}

impl OriginNameRegistry for InMemoryOriginNameRegistry {
    fn insert(&self, tenant_id: TenantId, new: NewOriginName) -> DomainResult<OriginName> {
        let mut state = self.inner.write().map_err(|_| poisoned())?;

        let key = UniqueKey {
            tenant_id,
            product_id: new.product_id,
            name: normalize_name(&new.name)?,
        };
        if state.unique.contains_key(&key) {
            return Err(DomainError::constraint(key.product_id, key.name));
        }

        state.next_created_seq += 1;
        let id = OriginNameId::new(AggregateId::new());
        let record = OriginName::from_new(id, new, state.next_created_seq)?;

        state.unique.insert(key, id);
        state.records.insert((tenant_id, id), record.clone());
        Ok(record)
    }

    fn update(
        &self,
        tenant_id: TenantId,
        id: OriginNameId,
        update: OriginNameUpdate,
    ) -> DomainResult<OriginName> {
        let mut state = self.inner.write().map_err(|_| poisoned())?;

        let current = state
            .records
            .get(&(tenant_id, id))
            .cloned()
            .ok_or_else(DomainError::not_found)?;

        let mut updated = current.clone();
        updated.apply_update(update)?;

        let old_key = UniqueKey {
            tenant_id,
            product_id: current.product_id(),
            name: current.name().to_string(),
        };
        let new_key = UniqueKey {
            tenant_id,
            product_id: updated.product_id(),
            name: updated.name().to_string(),
        };

        if new_key != old_key {
            if state.unique.contains_key(&new_key) {
                return Err(DomainError::constraint(new_key.product_id, new_key.name));
            }
            state.unique.remove(&old_key);
            state.unique.insert(new_key, id);
        }

        state.records.insert((tenant_id, id), updated.clone());
        Ok(updated)
    }

    fn remove(&self, tenant_id: TenantId, id: OriginNameId) -> DomainResult<OriginName> {
        let mut state = self.inner.write().map_err(|_| poisoned())?;

        let removed = state
            .records
            .remove(&(tenant_id, id))
            .ok_or_else(DomainError::not_found)?;
        state.unique.remove(&UniqueKey {
            tenant_id,
            product_id: removed.product_id(),
            name: removed.name().to_string(),
        });
        Ok(removed)
    }

    fn remove_for_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> DomainResult<Vec<OriginName>> {
        let mut state = self.inner.write().map_err(|_| poisoned())?;

        let mut removed = Vec::new();
        state.records.retain(|(t, _), record| {
            if *t == tenant_id && record.product_id() == product_id {
                removed.push(record.clone());
                false
            } else {
                true
            }
        });
        state
            .unique
            .retain(|key, _| !(key.tenant_id == tenant_id && key.product_id == product_id));

        sort_by_priority(&mut removed);
        Ok(removed)
    }

    fn get(&self, tenant_id: TenantId, id: OriginNameId) -> Option<OriginName> {
        let state = self.inner.read().ok()?;
        state.records.get(&(tenant_id, id)).cloned()
    }

    fn for_product(&self, tenant_id: TenantId, product_id: ProductId) -> Vec<OriginName> {
        let state = match self.inner.read() {
            Ok(s) => s,
            Err(_) => return vec![],
        };

        let mut names: Vec<OriginName> = state
            .records
            .iter()
            .filter(|((t, _), r)| *t == tenant_id && r.product_id() == product_id)
            .map(|(_, r)| r.clone())
            .collect();
        sort_by_priority(&mut names);
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procura_parties::PartyId;

    fn product() -> ProductId {
        ProductId::new(AggregateId::new())
    }

    #[test]
    fn duplicate_name_for_same_product_is_a_constraint_violation() {
        let registry = InMemoryOriginNameRegistry::new();
        let tenant = TenantId::new();
        let p = product();

        registry.insert(tenant, NewOriginName::new(p, "Acme Widget")).unwrap();
        let err = registry
            .insert(tenant, NewOriginName::new(p, "Acme Widget").with_sequence(1))
            .unwrap_err();

        match err {
            DomainError::ConstraintViolation { product, name } => {
                assert_eq!(product, p.to_string());
                assert_eq!(name, "Acme Widget");
            }
            other => panic!("Expected ConstraintViolation, got {other:?}"),
        }
        assert_eq!(registry.for_product(tenant, p).len(), 1);
    }

    #[test]
    fn uniqueness_compares_trimmed_names() {
        let registry = InMemoryOriginNameRegistry::new();
        let tenant = TenantId::new();
        let p = product();

        registry.insert(tenant, NewOriginName::new(p, "Acme")).unwrap();
        let err = registry.insert(tenant, NewOriginName::new(p, " Acme ")).unwrap_err();
        assert!(matches!(err, DomainError::ConstraintViolation { .. }));
    }

    #[test]
    fn same_name_is_allowed_on_other_products_and_tenants() {
        let registry = InMemoryOriginNameRegistry::new();
        let tenant = TenantId::new();

        registry.insert(tenant, NewOriginName::new(product(), "Acme")).unwrap();
        registry.insert(tenant, NewOriginName::new(product(), "Acme")).unwrap();

        let p = product();
        registry.insert(tenant, NewOriginName::new(p, "Acme")).unwrap();
        registry.insert(TenantId::new(), NewOriginName::new(p, "Acme")).unwrap();
    }

    #[test]
    fn for_product_orders_by_sequence_then_creation() {
        let registry = InMemoryOriginNameRegistry::new();
        let tenant = TenantId::new();
        let p = product();

        registry.insert(tenant, NewOriginName::new(p, "b").with_sequence(10)).unwrap();
        registry.insert(tenant, NewOriginName::new(p, "a").with_sequence(5)).unwrap();
        registry.insert(tenant, NewOriginName::new(p, "c").with_sequence(10)).unwrap();

        let names: Vec<String> = registry
            .for_product(tenant, p)
            .iter()
            .map(|n| n.name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn rename_onto_existing_name_is_rejected_but_self_rename_is_fine() {
        let registry = InMemoryOriginNameRegistry::new();
        let tenant = TenantId::new();
        let p = product();

        registry.insert(tenant, NewOriginName::new(p, "first")).unwrap();
        let second = registry.insert(tenant, NewOriginName::new(p, "second")).unwrap();

        let err = registry
            .update(
                tenant,
                second.id_typed(),
                OriginNameUpdate {
                    name: Some("first".to_string()),
                    ..OriginNameUpdate::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::ConstraintViolation { .. }));

        let same = registry
            .update(
                tenant,
                second.id_typed(),
                OriginNameUpdate {
                    name: Some("second".to_string()),
                    sequence: Some(1.into()),
                    ..OriginNameUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(same.sequence().value(), 1);

        // The freed name can be reused after a rename.
        registry
            .update(
                tenant,
                second.id_typed(),
                OriginNameUpdate {
                    name: Some("renamed".to_string()),
                    ..OriginNameUpdate::default()
                },
            )
            .unwrap();
        registry.insert(tenant, NewOriginName::new(p, "second")).unwrap();
    }

    #[test]
    fn update_and_remove_of_unknown_id_are_not_found() {
        let registry = InMemoryOriginNameRegistry::new();
        let tenant = TenantId::new();
        let id = OriginNameId::new(AggregateId::new());

        assert_eq!(
            registry.update(tenant, id, OriginNameUpdate::default()).unwrap_err(),
            DomainError::NotFound
        );
        assert_eq!(registry.remove(tenant, id).unwrap_err(), DomainError::NotFound);
    }

    #[test]
    fn cascade_removes_only_the_products_names() {
        let registry = InMemoryOriginNameRegistry::new();
        let tenant = TenantId::new();
        let doomed = product();
        let kept = product();
        let supplier = PartyId::new(AggregateId::new());

        registry.insert(tenant, NewOriginName::new(doomed, "x")).unwrap();
        registry
            .insert(tenant, NewOriginName::new(doomed, "y").for_supplier(supplier))
            .unwrap();
        registry.insert(tenant, NewOriginName::new(kept, "x")).unwrap();

        let removed = registry.remove_for_product(tenant, doomed).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(registry.for_product(tenant, doomed).is_empty());
        assert_eq!(registry.for_product(tenant, kept).len(), 1);

        // Unique index entries are gone too.
        registry.insert(tenant, NewOriginName::new(doomed, "x")).unwrap();
    }

    #[test]
    fn get_is_tenant_scoped() {
        let registry = InMemoryOriginNameRegistry::new();
        let tenant = TenantId::new();
        let created = registry.insert(tenant, NewOriginName::new(product(), "x")).unwrap();

        assert!(registry.get(tenant, created.id_typed()).is_some());
        assert!(registry.get(TenantId::new(), created.id_typed()).is_none());
    }
}
