//! Origin-name management and purchase-line naming, end to end.
//!
//! `OriginNameService` owns the registry and the dispatcher for products and
//! purchase orders. Every registry mutation is followed by a refresh of the
//! purchase lines that reference the product, found through
//! [`ProductOrdersProjection`], unless `InfraConfig::refresh_dependent_lines`
//! is off.

use std::sync::Mutex;

use chrono::Utc;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, info, warn};

use procura_core::{AggregateId, DomainError, TenantId};
use procura_events::{EventBus, EventEnvelope, Subscription};
use procura_parties::{Party, PartyId};
use procura_products::{
    CreateProduct, DeleteProduct, NewOriginName, OriginName, OriginNameId, OriginNameRegistry,
    OriginNameUpdate, Product, ProductCommand, ProductId, ProductNaming, RenameProduct,
};
use procura_purchasing::{
    AccountMoveLineValues, AddLine, Approve, ChangeLineProduct, CreatePurchaseOrder,
    DocumentLine, PurchaseOrder, PurchaseOrderCommand, PurchaseOrderId, ReceiveGoods,
    RefreshLineNames, SelectOriginName,
};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::config::InfraConfig;
use crate::event_store::{EventStore, StoredEvent};
use crate::projections::product_orders::ORDER_AGGREGATE_TYPE;
use crate::projections::{OrderProducts, ProductOrdersProjection, ProductOrdersProjectionError};
use crate::read_model::{InMemoryTenantStore, TenantStore};

pub const PRODUCT_AGGREGATE_TYPE: &str = "products.product";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Projection(#[from] ProductOrdersProjectionError),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("purchase order {0} not found")]
    OrderNotFound(PurchaseOrderId),

    #[error("supplier {0} is not registered")]
    UnknownSupplier(PartyId),
}

impl ServiceError {
    /// Whether this is a duplicate `(name, product)` origin name.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            ServiceError::Domain(DomainError::ConstraintViolation { .. })
                | ServiceError::Dispatch(DispatchError::ConstraintViolation { .. })
        )
    }
}

pub struct OriginNameService<S, B, R> {
    dispatcher: CommandDispatcher<S, B>,
    registry: R,
    suppliers: InMemoryTenantStore<PartyId, Party>,
    product_orders: ProductOrdersProjection<InMemoryTenantStore<PurchaseOrderId, OrderProducts>>,
    subscription: Mutex<Subscription<EventEnvelope<JsonValue>>>,
    config: InfraConfig,
}

fn make_product(_: TenantId, id: AggregateId) -> Product {
    Product::empty(ProductId::new(id))
}

fn make_order(_: TenantId, id: AggregateId) -> PurchaseOrder {
    PurchaseOrder::empty(PurchaseOrderId::new(id))
}

impl<S, B, R> OriginNameService<S, B, R>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    R: OriginNameRegistry,
{
    /// Subscribes to `bus` before anything is dispatched, so the dependency
    /// index sees every order event.
    pub fn new(store: S, bus: B, registry: R, config: InfraConfig) -> Self {
        let subscription = bus.subscribe();
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            registry,
            suppliers: InMemoryTenantStore::new(),
            product_orders: ProductOrdersProjection::new(InMemoryTenantStore::new()),
            subscription: Mutex::new(subscription),
            config,
        }
    }

    pub fn config(&self) -> InfraConfig {
        self.config
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    // ---- suppliers ----

    pub fn register_supplier(
        &self,
        tenant_id: TenantId,
        name: impl Into<String>,
    ) -> Result<Party, ServiceError> {
        let party = Party::supplier(tenant_id, PartyId::new(AggregateId::new()), name)?;
        self.suppliers.upsert(tenant_id, party.id_typed(), party.clone());
        info!(tenant = %tenant_id, supplier = %party.id_typed(), name = party.name(), "supplier registered");
        Ok(party)
    }

    fn ensure_supplier(&self, tenant_id: TenantId, supplier_id: PartyId) -> Result<(), ServiceError> {
        match self.suppliers.get(tenant_id, &supplier_id) {
            Some(party) if party.is_supplier() => Ok(()),
            _ => Err(ServiceError::UnknownSupplier(supplier_id)),
        }
    }

    // ---- products ----

    pub fn create_product(
        &self,
        tenant_id: TenantId,
        sku: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<ProductId, ServiceError> {
        let product_id = ProductId::new(AggregateId::new());
        self.dispatcher.dispatch::<Product>(
            tenant_id,
            product_id.0,
            PRODUCT_AGGREGATE_TYPE,
            ProductCommand::CreateProduct(CreateProduct {
                tenant_id,
                product_id,
                sku: sku.into(),
                name: name.into(),
                occurred_at: Utc::now(),
            }),
            make_product,
        )?;
        info!(tenant = %tenant_id, product = %product_id, "product created");
        Ok(product_id)
    }

    /// A live (created, not deleted) product.
    pub fn product(&self, tenant_id: TenantId, product_id: ProductId) -> Result<Product, ServiceError> {
        let product: Product = self.dispatcher.load(tenant_id, product_id.0, make_product)?;
        if !product.exists() {
            return Err(ServiceError::ProductNotFound(product_id));
        }
        Ok(product)
    }

    /// Changing the canonical name re-derives lines that fall back to it.
    pub fn rename_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        name: impl Into<String>,
    ) -> Result<(), ServiceError> {
        let committed = self.dispatcher.dispatch::<Product>(
            tenant_id,
            product_id.0,
            PRODUCT_AGGREGATE_TYPE,
            ProductCommand::RenameProduct(RenameProduct {
                tenant_id,
                product_id,
                name: name.into(),
                occurred_at: Utc::now(),
            }),
            make_product,
        )?;
        if committed.is_empty() {
            return Ok(());
        }
        info!(tenant = %tenant_id, product = %product_id, "product renamed");
        self.refresh_dependents(tenant_id, product_id)
    }

    /// Deletes the product and, with it, all of its origin names.
    ///
    /// Lines still pointing at the product lose their selection.
    pub fn delete_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Vec<OriginName>, ServiceError> {
        self.dispatcher.dispatch::<Product>(
            tenant_id,
            product_id.0,
            PRODUCT_AGGREGATE_TYPE,
            ProductCommand::DeleteProduct(DeleteProduct {
                tenant_id,
                product_id,
                occurred_at: Utc::now(),
            }),
            make_product,
        )?;
        let removed = self.registry.remove_for_product(tenant_id, product_id)?;
        info!(
            tenant = %tenant_id,
            product = %product_id,
            origin_names = removed.len(),
            "product deleted"
        );
        self.refresh_dependents(tenant_id, product_id)?;
        Ok(removed)
    }

    /// Naming snapshot of a live product.
    pub fn product_naming(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<ProductNaming, ServiceError> {
        let product = self.product(tenant_id, product_id)?;
        Ok(ProductNaming::of(
            &product,
            self.registry.for_product(tenant_id, product_id),
        )?)
    }

    /// Naming snapshot for lines that reference `product_id`, deleted or not.
    fn line_product_naming(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<ProductNaming, ServiceError> {
        let product: Product = self.dispatcher.load(tenant_id, product_id.0, make_product)?;
        if !product.exists() && !product.is_deleted() {
            return Err(ServiceError::ProductNotFound(product_id));
        }
        Ok(ProductNaming::of(
            &product,
            self.registry.for_product(tenant_id, product_id),
        )?)
    }

    // ---- origin names ----

    pub fn add_origin_name(
        &self,
        tenant_id: TenantId,
        new: NewOriginName,
    ) -> Result<OriginName, ServiceError> {
        self.product(tenant_id, new.product_id)?;
        if let Some(supplier_id) = new.supplier_id {
            self.ensure_supplier(tenant_id, supplier_id)?;
        }

        let created = self.registry.insert(tenant_id, new).inspect_err(|err| {
            warn!(tenant = %tenant_id, error = %err, "origin name rejected");
        })?;
        info!(
            tenant = %tenant_id,
            product = %created.product_id(),
            origin_name = %created.id_typed(),
            name = created.name(),
            sequence = created.sequence().value(),
            "origin name added"
        );

        self.refresh_dependents(tenant_id, created.product_id())?;
        Ok(created)
    }

    pub fn update_origin_name(
        &self,
        tenant_id: TenantId,
        id: OriginNameId,
        update: OriginNameUpdate,
    ) -> Result<OriginName, ServiceError> {
        if let Some(Some(supplier_id)) = update.supplier_id {
            self.ensure_supplier(tenant_id, supplier_id)?;
        }

        let updated = self.registry.update(tenant_id, id, update).inspect_err(|err| {
            warn!(tenant = %tenant_id, origin_name = %id, error = %err, "origin name update rejected");
        })?;
        info!(
            tenant = %tenant_id,
            product = %updated.product_id(),
            origin_name = %id,
            name = updated.name(),
            "origin name updated"
        );

        self.refresh_dependents(tenant_id, updated.product_id())?;
        Ok(updated)
    }

    pub fn remove_origin_name(
        &self,
        tenant_id: TenantId,
        id: OriginNameId,
    ) -> Result<OriginName, ServiceError> {
        let removed = self.registry.remove(tenant_id, id)?;
        info!(
            tenant = %tenant_id,
            product = %removed.product_id(),
            origin_name = %id,
            "origin name removed"
        );

        self.refresh_dependents(tenant_id, removed.product_id())?;
        Ok(removed)
    }

    /// Origin names of a product in retrieval order.
    pub fn origin_names(&self, tenant_id: TenantId, product_id: ProductId) -> Vec<OriginName> {
        self.registry.for_product(tenant_id, product_id)
    }

    pub fn primary_origin_name(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<String, ServiceError> {
        Ok(self
            .product_naming(tenant_id, product_id)?
            .primary_origin_name()
            .to_string())
    }

    // ---- purchase orders ----

    pub fn create_order(
        &self,
        tenant_id: TenantId,
        supplier_id: PartyId,
    ) -> Result<PurchaseOrderId, ServiceError> {
        self.ensure_supplier(tenant_id, supplier_id)?;
        let order_id = PurchaseOrderId::new(AggregateId::new());
        self.dispatch_order(
            tenant_id,
            order_id,
            PurchaseOrderCommand::CreatePurchaseOrder(CreatePurchaseOrder {
                tenant_id,
                order_id,
                supplier_id,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(tenant = %tenant_id, order = %order_id, supplier = %supplier_id, "purchase order created");
        Ok(order_id)
    }

    pub fn order(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
    ) -> Result<PurchaseOrder, ServiceError> {
        let order: PurchaseOrder = self.dispatcher.load(tenant_id, order_id.0, make_order)?;
        if !order.is_created() {
            return Err(ServiceError::OrderNotFound(order_id));
        }
        Ok(order)
    }

    /// Adds a line for `product_id` and returns its line number.
    pub fn add_line(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<u32, ServiceError> {
        let product = self.product_naming(tenant_id, product_id)?;
        self.dispatch_order(
            tenant_id,
            order_id,
            PurchaseOrderCommand::AddLine(AddLine {
                tenant_id,
                order_id,
                product,
                quantity,
                occurred_at: Utc::now(),
            }),
        )?;

        let line_no = self
            .order(tenant_id, order_id)?
            .lines()
            .iter()
            .map(|l| l.line_no)
            .max()
            .ok_or_else(|| DomainError::invariant("line was not added"))?;
        debug!(tenant = %tenant_id, order = %order_id, line = line_no, product = %product_id, "line added");
        Ok(line_no)
    }

    /// Reassigns (or clears) the product of a line; the selection is re-derived.
    pub fn change_line_product(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
        line_no: u32,
        product_id: Option<ProductId>,
    ) -> Result<(), ServiceError> {
        let product = product_id
            .map(|id| self.product_naming(tenant_id, id))
            .transpose()?;
        self.dispatch_order(
            tenant_id,
            order_id,
            PurchaseOrderCommand::ChangeLineProduct(ChangeLineProduct {
                tenant_id,
                order_id,
                line_no,
                product,
                occurred_at: Utc::now(),
            }),
        )?;
        Ok(())
    }

    /// Manually picks (or clears) the origin name shown for a line.
    pub fn select_origin_name(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
        line_no: u32,
        origin_name_id: Option<OriginNameId>,
    ) -> Result<(), ServiceError> {
        let order = self.order(tenant_id, order_id)?;
        let line = order
            .line(line_no)
            .ok_or_else(|| DomainError::validation(format!("line {line_no} does not exist")))?;
        let product = line
            .product_id
            .map(|id| self.line_product_naming(tenant_id, id))
            .transpose()?;

        self.dispatch_order(
            tenant_id,
            order_id,
            PurchaseOrderCommand::SelectOriginName(SelectOriginName {
                tenant_id,
                order_id,
                line_no,
                product,
                origin_name_id,
                occurred_at: Utc::now(),
            }),
        )?;
        Ok(())
    }

    pub fn approve_order(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
    ) -> Result<(), ServiceError> {
        self.dispatch_order(
            tenant_id,
            order_id,
            PurchaseOrderCommand::Approve(Approve {
                tenant_id,
                order_id,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(tenant = %tenant_id, order = %order_id, "purchase order approved");
        Ok(())
    }

    pub fn receive_goods(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
    ) -> Result<(), ServiceError> {
        self.dispatch_order(
            tenant_id,
            order_id,
            PurchaseOrderCommand::ReceiveGoods(ReceiveGoods {
                tenant_id,
                order_id,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(tenant = %tenant_id, order = %order_id, "goods received");
        Ok(())
    }

    /// Supplier-facing lines (display names).
    pub fn document_lines(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
    ) -> Result<Vec<DocumentLine>, ServiceError> {
        Ok(self.order(tenant_id, order_id)?.document_lines())
    }

    /// Internal accounting values (canonical names).
    pub fn prepare_account_move_lines(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
    ) -> Result<Vec<AccountMoveLineValues>, ServiceError> {
        let order = self.order(tenant_id, order_id)?;

        let mut products: Vec<ProductNaming> = Vec::new();
        for product_id in order.lines().iter().filter_map(|l| l.product_id) {
            if products.iter().any(|p| p.product_id() == product_id) {
                continue;
            }
            products.push(self.line_product_naming(tenant_id, product_id)?);
        }

        Ok(order.prepare_account_move_lines(&products)?)
    }

    // ---- dependency tracking ----

    fn dispatch_order(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
        command: PurchaseOrderCommand,
    ) -> Result<Vec<StoredEvent>, ServiceError> {
        let committed = self.dispatcher.dispatch::<PurchaseOrder>(
            tenant_id,
            order_id.0,
            ORDER_AGGREGATE_TYPE,
            command,
            make_order,
        )?;
        self.sync_projections()?;
        Ok(committed)
    }

    /// Apply every envelope published since the last call.
    fn sync_projections(&self) -> Result<(), ServiceError> {
        let envelopes = {
            let subscription = self
                .subscription
                .lock()
                .map_err(|_| DomainError::invariant("projection subscription lock poisoned"))?;
            subscription.drain()
        };
        for envelope in &envelopes {
            self.product_orders.apply_envelope(envelope)?;
        }
        Ok(())
    }

    /// Re-derive the naming of every line that references `product_id`.
    fn refresh_dependents(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<(), ServiceError> {
        if !self.config.refresh_dependent_lines {
            debug!(tenant = %tenant_id, product = %product_id, "dependent line refresh disabled");
            return Ok(());
        }

        self.sync_projections()?;
        let orders = self.product_orders.orders_referencing(tenant_id, product_id);
        if orders.is_empty() {
            return Ok(());
        }

        let product = self.line_product_naming(tenant_id, product_id)?;
        let mut lines = 0;
        for order_id in &orders {
            lines += self
                .dispatch_order(
                    tenant_id,
                    *order_id,
                    PurchaseOrderCommand::RefreshLineNames(RefreshLineNames {
                        tenant_id,
                        order_id: *order_id,
                        product: product.clone(),
                        occurred_at: Utc::now(),
                    }),
                )?
                .len();
        }

        info!(
            tenant = %tenant_id,
            product = %product_id,
            orders = orders.len(),
            lines,
            "purchase line names refreshed"
        );
        Ok(())
    }
}
