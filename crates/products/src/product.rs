use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use procura_core::{Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use procura_events::Event;

/// Product identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Product.
///
/// `name` is the canonical name: the product's own label, independent of any
/// origin name. It is what internal accounting and stock records always show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    tenant_id: Option<TenantId>,
    sku: String,
    name: String,
    deleted: bool,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            tenant_id: None,
            sku: String::new(),
            name: String::new(),
            deleted: false,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    /// Canonical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Created and not deleted.
    pub fn exists(&self) -> bool {
        self.created && !self.deleted
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RenameProduct (changes the canonical name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameProduct {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteProduct {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    RenameProduct(RenameProduct),
    DeleteProduct(DeleteProduct),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductRenamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRenamed {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductDeleted.
///
/// Owners of product-scoped records (origin names) cascade on this event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDeleted {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    ProductRenamed(ProductRenamed),
    ProductDeleted(ProductDeleted),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "products.product.created",
            ProductEvent::ProductRenamed(_) => "products.product.renamed",
            ProductEvent::ProductDeleted(_) => "products.product.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::ProductRenamed(e) => e.occurred_at,
            ProductEvent::ProductDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.tenant_id = Some(e.tenant_id);
                self.sku = e.sku.clone();
                self.name = e.name.clone();
                self.deleted = false;
                self.created = true;
            }
            ProductEvent::ProductRenamed(e) => {
                self.name = e.name.clone();
            }
            ProductEvent::ProductDeleted(_) => {
                self.deleted = true;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::RenameProduct(cmd) => self.handle_rename(cmd),
            ProductCommand::DeleteProduct(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Product {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn ensure_live(&self, tenant_id: TenantId, product_id: ProductId) -> Result<(), DomainError> {
        if !self.exists() {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(tenant_id)?;
        self.ensure_product_id(product_id)
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }

        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        let sku = cmd.sku.trim();
        if sku.is_empty() {
            return Err(DomainError::validation("SKU cannot be empty"));
        }

        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            sku: sku.to_string(),
            name: name.to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_rename(&self, cmd: &RenameProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_live(cmd.tenant_id, cmd.product_id)?;

        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if name == self.name {
            return Ok(vec![]);
        }

        Ok(vec![ProductEvent::ProductRenamed(ProductRenamed {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            name: name.to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_live(cmd.tenant_id, cmd.product_id)?;

        Ok(vec![ProductEvent::ProductDeleted(ProductDeleted {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn test_product_id() -> ProductId {
        ProductId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn created(tenant_id: TenantId, product_id: ProductId, name: &str) -> Product {
        let mut product = Product::empty(product_id);
        let events = product
            .handle(&ProductCommand::CreateProduct(CreateProduct {
                tenant_id,
                product_id,
                sku: "SKU-001".to_string(),
                name: name.to_string(),
                occurred_at: test_time(),
            }))
            .unwrap();
        product.apply(&events[0]);
        product
    }

    #[test]
    fn create_product_emits_product_created_event() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let product = Product::empty(product_id);

        let events = product
            .handle(&ProductCommand::CreateProduct(CreateProduct {
                tenant_id,
                product_id,
                sku: " SKU-001 ".to_string(),
                name: " Widget ".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            ProductEvent::ProductCreated(e) => {
                assert_eq!(e.tenant_id, tenant_id);
                assert_eq!(e.product_id, product_id);
                assert_eq!(e.sku, "SKU-001");
                assert_eq!(e.name, "Widget");
            }
            _ => panic!("Expected ProductCreated event"),
        }
    }

    #[test]
    fn create_product_rejects_empty_name() {
        let product = Product::empty(test_product_id());
        let err = product
            .handle(&ProductCommand::CreateProduct(CreateProduct {
                tenant_id: test_tenant_id(),
                product_id: test_product_id(),
                sku: "SKU-001".to_string(),
                name: "   ".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn create_product_rejects_duplicate_creation() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let product = created(tenant_id, product_id, "Widget");

        let err = product
            .handle(&ProductCommand::CreateProduct(CreateProduct {
                tenant_id,
                product_id,
                sku: "SKU-002".to_string(),
                name: "Widget".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn rename_changes_canonical_name() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let mut product = created(tenant_id, product_id, "Widget");

        let events = product
            .handle(&ProductCommand::RenameProduct(RenameProduct {
                tenant_id,
                product_id,
                name: "Gadget".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap();
        product.apply(&events[0]);

        assert_eq!(product.name(), "Gadget");
        assert_eq!(product.version(), 2);
    }

    #[test]
    fn rename_to_same_name_is_a_no_op() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let product = created(tenant_id, product_id, "Widget");

        let events = product
            .handle(&ProductCommand::RenameProduct(RenameProduct {
                tenant_id,
                product_id,
                name: "Widget ".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn deleted_products_reject_further_commands() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let mut product = created(tenant_id, product_id, "Widget");

        let delete = ProductCommand::DeleteProduct(DeleteProduct {
            tenant_id,
            product_id,
            occurred_at: test_time(),
        });
        let events = product.handle(&delete).unwrap();
        product.apply(&events[0]);

        assert!(product.is_deleted());
        assert!(!product.exists());
        assert_eq!(product.handle(&delete).unwrap_err(), DomainError::NotFound);
    }

    #[test]
    fn commands_from_another_tenant_are_rejected() {
        let product_id = test_product_id();
        let product = created(test_tenant_id(), product_id, "Widget");

        let err = product
            .handle(&ProductCommand::RenameProduct(RenameProduct {
                tenant_id: test_tenant_id(),
                product_id,
                name: "Gadget".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn rename_of_missing_product_is_not_found() {
        let product_id = test_product_id();
        let product = Product::empty(product_id);

        let err = product
            .handle(&ProductCommand::RenameProduct(RenameProduct {
                tenant_id: test_tenant_id(),
                product_id,
                name: "Gadget".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Handle never mutates state, and repeated handling yields identical events.
            #[test]
            fn handle_is_deterministic(
                name in "[A-Za-z][A-Za-z0-9 ]{0,40}",
                new_name in "[A-Za-z][A-Za-z0-9 ]{0,40}"
            ) {
                let tenant_id = test_tenant_id();
                let product_id = test_product_id();
                let product = created(tenant_id, product_id, &name);
                let before = product.clone();

                let cmd = ProductCommand::RenameProduct(RenameProduct {
                    tenant_id,
                    product_id,
                    name: new_name,
                    occurred_at: Utc::now(),
                });
                let first = product.handle(&cmd);
                let second = product.handle(&cmd);

                prop_assert_eq!(&before, &product);
                prop_assert_eq!(first, second);
            }
        }
    }
}
