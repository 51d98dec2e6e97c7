use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use procura_core::{Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use procura_events::Event;
use procura_parties::PartyId;
use procura_products::{OriginNameId, ProductId, ProductNaming};

use crate::line::{LineNaming, PurchaseLine};

/// Purchase order identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseOrderId(pub AggregateId);

impl PurchaseOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PurchaseOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Purchase order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Draft,
    Approved,
    Received,
}

/// A line as printed on reports and the supplier portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLine {
    pub line_no: u32,
    pub description: String,
    pub quantity: i64,
}

/// Aggregate root: PurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    tenant_id: Option<TenantId>,
    supplier_id: Option<PartyId>,
    status: PurchaseOrderStatus,
    lines: Vec<PurchaseLine>,
    version: u64,
    created: bool,
}

impl PurchaseOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PurchaseOrderId) -> Self {
        Self {
            id,
            tenant_id: None,
            supplier_id: None,
            status: PurchaseOrderStatus::Draft,
            lines: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn supplier_id(&self) -> Option<PartyId> {
        self.supplier_id
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn lines(&self) -> &[PurchaseLine] {
        &self.lines
    }

    pub fn line(&self, line_no: u32) -> Option<&PurchaseLine> {
        self.lines.iter().find(|l| l.line_no == line_no)
    }

    /// Whether any line references `product_id`.
    pub fn references_product(&self, product_id: ProductId) -> bool {
        self.lines.iter().any(|l| l.product_id == Some(product_id))
    }

    /// Lines as supplier-facing documents show them (display names).
    pub fn document_lines(&self) -> Vec<DocumentLine> {
        self.lines
            .iter()
            .map(|l| DocumentLine {
                line_no: l.line_no,
                description: l.display_name.clone(),
                quantity: l.quantity,
            })
            .collect()
    }
}

impl AggregateRoot for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreatePurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePurchaseOrder {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub supplier_id: PartyId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLine (only allowed in Draft).
///
/// Carries the product's naming snapshot so the default origin name can be
/// chosen without storage access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLine {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub product: ProductNaming,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeLineProduct. `product: None` clears the line's product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLineProduct {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub line_no: u32,
    pub product: Option<ProductNaming>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SelectOriginName (manual override).
///
/// `product` is the snapshot of the line's current product; `origin_name_id`
/// must be one of its origin names, or `None` to clear the selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOriginName {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub line_no: u32,
    pub product: Option<ProductNaming>,
    pub origin_name_id: Option<OriginNameId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RefreshLineNames.
///
/// Re-derives the naming of every line on `product` after the product's origin
/// names or canonical name changed. Allowed in every status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshLineNames {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub product: ProductNaming,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Approve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approve {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReceiveGoods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveGoods {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderCommand {
    CreatePurchaseOrder(CreatePurchaseOrder),
    AddLine(AddLine),
    ChangeLineProduct(ChangeLineProduct),
    SelectOriginName(SelectOriginName),
    RefreshLineNames(RefreshLineNames),
    Approve(Approve),
    ReceiveGoods(ReceiveGoods),
}

/// Event: PurchaseOrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderCreated {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub supplier_id: PartyId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseOrderLineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderLineAdded {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub line_no: u32,
    pub product_id: ProductId,
    pub quantity: i64,
    pub naming: LineNaming,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineProductChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineProductChanged {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub line_no: u32,
    pub product_id: Option<ProductId>,
    pub naming: LineNaming,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineOriginNameSelected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineOriginNameSelected {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub line_no: u32,
    pub naming: LineNaming,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineNamingRefreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineNamingRefreshed {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub line_no: u32,
    pub naming: LineNaming,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseOrderApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderApproved {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: GoodsReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsReceived {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub supplier_id: PartyId,
    pub lines: Vec<PurchaseLine>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderEvent {
    PurchaseOrderCreated(PurchaseOrderCreated),
    PurchaseOrderLineAdded(PurchaseOrderLineAdded),
    LineProductChanged(LineProductChanged),
    LineOriginNameSelected(LineOriginNameSelected),
    LineNamingRefreshed(LineNamingRefreshed),
    PurchaseOrderApproved(PurchaseOrderApproved),
    GoodsReceived(GoodsReceived),
}

impl Event for PurchaseOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(_) => "purchasing.order.created",
            PurchaseOrderEvent::PurchaseOrderLineAdded(_) => "purchasing.order.line_added",
            PurchaseOrderEvent::LineProductChanged(_) => "purchasing.order.line_product_changed",
            PurchaseOrderEvent::LineOriginNameSelected(_) => {
                "purchasing.order.line_origin_name_selected"
            }
            PurchaseOrderEvent::LineNamingRefreshed(_) => "purchasing.order.line_naming_refreshed",
            PurchaseOrderEvent::PurchaseOrderApproved(_) => "purchasing.order.approved",
            PurchaseOrderEvent::GoodsReceived(_) => "purchasing.order.goods_received",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderLineAdded(e) => e.occurred_at,
            PurchaseOrderEvent::LineProductChanged(e) => e.occurred_at,
            PurchaseOrderEvent::LineOriginNameSelected(e) => e.occurred_at,
            PurchaseOrderEvent::LineNamingRefreshed(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderApproved(e) => e.occurred_at,
            PurchaseOrderEvent::GoodsReceived(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PurchaseOrder {
    type Command = PurchaseOrderCommand;
    type Event = PurchaseOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => {
                self.id = e.order_id;
                self.tenant_id = Some(e.tenant_id);
                self.supplier_id = Some(e.supplier_id);
                self.status = PurchaseOrderStatus::Draft;
                self.lines.clear();
                self.created = true;
            }
            PurchaseOrderEvent::PurchaseOrderLineAdded(e) => {
                self.lines.push(PurchaseLine {
                    line_no: e.line_no,
                    product_id: Some(e.product_id),
                    quantity: e.quantity,
                    selected_origin_name: e.naming.selected_origin_name,
                    display_name: e.naming.display_name.clone(),
                });
            }
            PurchaseOrderEvent::LineProductChanged(e) => {
                if let Some(line) = self.line_mut(e.line_no) {
                    line.product_id = e.product_id;
                    line.set_naming(&e.naming);
                }
            }
            PurchaseOrderEvent::LineOriginNameSelected(e) => {
                if let Some(line) = self.line_mut(e.line_no) {
                    line.set_naming(&e.naming);
                }
            }
            PurchaseOrderEvent::LineNamingRefreshed(e) => {
                if let Some(line) = self.line_mut(e.line_no) {
                    line.set_naming(&e.naming);
                }
            }
            PurchaseOrderEvent::PurchaseOrderApproved(_) => {
                self.status = PurchaseOrderStatus::Approved;
            }
            PurchaseOrderEvent::GoodsReceived(e) => {
                self.lines = e.lines.clone();
                self.status = PurchaseOrderStatus::Received;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PurchaseOrderCommand::CreatePurchaseOrder(cmd) => self.handle_create(cmd),
            PurchaseOrderCommand::AddLine(cmd) => self.handle_add_line(cmd),
            PurchaseOrderCommand::ChangeLineProduct(cmd) => self.handle_change_product(cmd),
            PurchaseOrderCommand::SelectOriginName(cmd) => self.handle_select_origin_name(cmd),
            PurchaseOrderCommand::RefreshLineNames(cmd) => self.handle_refresh(cmd),
            PurchaseOrderCommand::Approve(cmd) => self.handle_approve(cmd),
            PurchaseOrderCommand::ReceiveGoods(cmd) => self.handle_receive(cmd),
        }
    }
}

impl PurchaseOrder {
    fn line_mut(&mut self, line_no: u32) -> Option<&mut PurchaseLine> {
        self.lines.iter_mut().find(|l| l.line_no == line_no)
    }

    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_order_id(&self, order_id: PurchaseOrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_existing(&self, tenant_id: TenantId, order_id: PurchaseOrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(tenant_id)?;
        self.ensure_order_id(order_id)
    }

    fn ensure_draft(&self) -> Result<(), DomainError> {
        if self.status != PurchaseOrderStatus::Draft {
            return Err(DomainError::invariant(
                "cannot modify purchase order once approved or received",
            ));
        }
        Ok(())
    }

    fn existing_line(&self, line_no: u32) -> Result<&PurchaseLine, DomainError> {
        self.line(line_no)
            .ok_or_else(|| DomainError::validation(format!("line {line_no} does not exist")))
    }

    fn handle_create(
        &self,
        cmd: &CreatePurchaseOrder,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("purchase order already exists"));
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderCreated(
            PurchaseOrderCreated {
                tenant_id: cmd.tenant_id,
                order_id: cmd.order_id,
                supplier_id: cmd.supplier_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;
        self.ensure_draft()?;

        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        let next_line_no = self.lines.iter().map(|l| l.line_no).max().unwrap_or(0) + 1;
        let naming = LineNaming::for_product(Some(&cmd.product), self.supplier_id);

        Ok(vec![PurchaseOrderEvent::PurchaseOrderLineAdded(
            PurchaseOrderLineAdded {
                tenant_id: cmd.tenant_id,
                order_id: cmd.order_id,
                line_no: next_line_no,
                product_id: cmd.product.product_id(),
                quantity: cmd.quantity,
                naming,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_change_product(
        &self,
        cmd: &ChangeLineProduct,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;
        self.ensure_draft()?;
        self.existing_line(cmd.line_no)?;

        let naming = LineNaming::for_product(cmd.product.as_ref(), self.supplier_id);

        Ok(vec![PurchaseOrderEvent::LineProductChanged(LineProductChanged {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            line_no: cmd.line_no,
            product_id: cmd.product.as_ref().map(ProductNaming::product_id),
            naming,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_select_origin_name(
        &self,
        cmd: &SelectOriginName,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;
        self.ensure_draft()?;
        let line = self.existing_line(cmd.line_no)?;
        let product = line.ensure_product(cmd.product.as_ref())?;

        let selected = match (cmd.origin_name_id, product) {
            (None, _) => None,
            (Some(id), Some(p)) => Some(p.find(id).ok_or_else(|| {
                DomainError::validation(format!(
                    "origin name {id} does not belong to the product of line {}",
                    cmd.line_no
                ))
            })?),
            (Some(_), None) => {
                return Err(DomainError::validation(format!(
                    "line {} has no product to pick an origin name for",
                    cmd.line_no
                )));
            }
        };

        let naming = LineNaming::with_selection(product, selected);

        Ok(vec![PurchaseOrderEvent::LineOriginNameSelected(
            LineOriginNameSelected {
                tenant_id: cmd.tenant_id,
                order_id: cmd.order_id,
                line_no: cmd.line_no,
                naming,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_refresh(&self, cmd: &RefreshLineNames) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;

        let product_id = cmd.product.product_id();
        let mut events = Vec::new();
        for line in self.lines.iter().filter(|l| l.product_id == Some(product_id)) {
            let naming = line.rederive_naming(Some(&cmd.product))?;
            if naming == line.naming() {
                continue;
            }
            events.push(PurchaseOrderEvent::LineNamingRefreshed(LineNamingRefreshed {
                tenant_id: cmd.tenant_id,
                order_id: cmd.order_id,
                line_no: line.line_no,
                naming,
                occurred_at: cmd.occurred_at,
            }));
        }
        Ok(events)
    }

    fn handle_approve(&self, cmd: &Approve) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;

        if self.status != PurchaseOrderStatus::Draft {
            return Err(DomainError::invariant(
                "only draft purchase orders can be approved",
            ));
        }

        if self.lines.is_empty() {
            return Err(DomainError::validation(
                "cannot approve purchase order without lines",
            ));
        }

        if let Some(line) = self.lines.iter().find(|l| l.product_id.is_none()) {
            return Err(DomainError::validation(format!(
                "line {} has no product",
                line.line_no
            )));
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderApproved(
            PurchaseOrderApproved {
                tenant_id: cmd.tenant_id,
                order_id: cmd.order_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_receive(
        &self,
        cmd: &ReceiveGoods,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;

        if self.status != PurchaseOrderStatus::Approved {
            return Err(DomainError::invariant(
                "cannot receive goods before purchase order is approved",
            ));
        }

        let supplier_id = self
            .supplier_id
            .ok_or_else(|| DomainError::invariant("supplier must be set"))?;

        Ok(vec![PurchaseOrderEvent::GoodsReceived(GoodsReceived {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            supplier_id,
            lines: self.lines.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
