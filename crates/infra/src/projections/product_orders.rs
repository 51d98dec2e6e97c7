//! Which purchase orders reference which products.
//!
//! This is the dependency index behind line-name refreshes: when a product's
//! origin names change, every order returned by
//! [`ProductOrdersProjection::orders_referencing`] gets a `RefreshLineNames`.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde_json::Value as JsonValue;
use thiserror::Error;

use procura_core::{AggregateId, TenantId};
use procura_events::EventEnvelope;
use procura_products::ProductId;
use procura_purchasing::{PurchaseOrderEvent, PurchaseOrderId};

use crate::read_model::TenantStore;

pub const ORDER_AGGREGATE_TYPE: &str = "purchasing.order";

/// Product reference of every line of one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderProducts {
    pub order_id: PurchaseOrderId,
    pub lines: BTreeMap<u32, Option<ProductId>>,
}

impl OrderProducts {
    pub fn references(&self, product_id: ProductId) -> bool {
        self.lines.values().any(|p| *p == Some(product_id))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

#[derive(Debug, Error)]
pub enum ProductOrdersProjectionError {
    #[error("failed to deserialize purchase order event: {0}")]
    Deserialize(String),
    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),
    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

#[derive(Debug)]
pub struct ProductOrdersProjection<S>
where
    S: TenantStore<PurchaseOrderId, OrderProducts>,
{
    store: S,
    cursors: RwLock<HashMap<CursorKey, u64>>,
}

impl<S> ProductOrdersProjection<S>
where
    S: TenantStore<PurchaseOrderId, OrderProducts>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    fn get_cursor(&self, tenant_id: TenantId, aggregate_id: AggregateId) -> u64 {
        match self.cursors.read() {
            Ok(cursors) => *cursors
                .get(&CursorKey {
                    tenant_id,
                    aggregate_id,
                })
                .unwrap_or(&0),
            Err(_) => 0,
        }
    }

    fn update_cursor(&self, tenant_id: TenantId, aggregate_id: AggregateId, seq: u64) {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.insert(
                CursorKey {
                    tenant_id,
                    aggregate_id,
                },
                seq,
            );
        }
    }

    pub fn get(&self, tenant_id: TenantId, order_id: &PurchaseOrderId) -> Option<OrderProducts> {
        self.store.get(tenant_id, order_id)
    }

    /// Orders with at least one line on `product_id`.
    pub fn orders_referencing(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Vec<PurchaseOrderId> {
        self.store
            .list(tenant_id)
            .into_iter()
            .filter(|o| o.references(product_id))
            .map(|o| o.order_id)
            .collect()
    }

    /// Drop the tenant's records and cursors so the stream can be replayed.
    pub fn clear_tenant(&self, tenant_id: TenantId) {
        self.store.clear_tenant(tenant_id);
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.retain(|k, _| k.tenant_id != tenant_id);
        }
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ProductOrdersProjectionError> {
        if envelope.aggregate_type() != ORDER_AGGREGATE_TYPE {
            return Ok(());
        }

        let tenant_id = envelope.tenant_id();
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        let last = self.get_cursor(tenant_id, aggregate_id);
        if seq == 0 {
            return Err(ProductOrdersProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(());
        }
        if seq != last + 1 && last != 0 {
            return Err(ProductOrdersProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let ev: PurchaseOrderEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProductOrdersProjectionError::Deserialize(e.to_string()))?;

        let (event_tenant, order_id) = match &ev {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => (e.tenant_id, e.order_id),
            PurchaseOrderEvent::PurchaseOrderLineAdded(e) => (e.tenant_id, e.order_id),
            PurchaseOrderEvent::LineProductChanged(e) => (e.tenant_id, e.order_id),
            PurchaseOrderEvent::LineOriginNameSelected(e) => (e.tenant_id, e.order_id),
            PurchaseOrderEvent::LineNamingRefreshed(e) => (e.tenant_id, e.order_id),
            PurchaseOrderEvent::PurchaseOrderApproved(e) => (e.tenant_id, e.order_id),
            PurchaseOrderEvent::GoodsReceived(e) => (e.tenant_id, e.order_id),
        };

        if event_tenant != tenant_id {
            return Err(ProductOrdersProjectionError::TenantIsolation(
                "event tenant_id does not match envelope tenant_id".to_string(),
            ));
        }
        if order_id.0 != aggregate_id {
            return Err(ProductOrdersProjectionError::TenantIsolation(
                "event order_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match ev {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => {
                self.store.upsert(
                    tenant_id,
                    e.order_id,
                    OrderProducts {
                        order_id: e.order_id,
                        lines: BTreeMap::new(),
                    },
                );
            }
            PurchaseOrderEvent::PurchaseOrderLineAdded(e) => {
                self.set_line_product(tenant_id, e.order_id, e.line_no, Some(e.product_id));
            }
            PurchaseOrderEvent::LineProductChanged(e) => {
                self.set_line_product(tenant_id, e.order_id, e.line_no, e.product_id);
            }
            // Naming and status changes do not move product references.
            PurchaseOrderEvent::LineOriginNameSelected(_)
            | PurchaseOrderEvent::LineNamingRefreshed(_)
            | PurchaseOrderEvent::PurchaseOrderApproved(_)
            | PurchaseOrderEvent::GoodsReceived(_) => {}
        }

        self.update_cursor(tenant_id, aggregate_id, seq);
        Ok(())
    }

    fn set_line_product(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
        line_no: u32,
        product_id: Option<ProductId>,
    ) {
        let mut rm = self.store.get(tenant_id, &order_id).unwrap_or(OrderProducts {
            order_id,
            lines: BTreeMap::new(),
        });
        rm.lines.insert(line_no, product_id);
        self.store.upsert(tenant_id, order_id, rm);
    }
}
