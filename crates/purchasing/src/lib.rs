//! Purchasing domain module (Purchase Orders, event-sourced).
//!
//! Purchase lines carry an origin-name selection and the display name shown on
//! supplier-facing documents; accounting entries always use the product's
//! canonical name. Everything here is deterministic domain logic (no IO, no
//! storage): product naming arrives in commands as [`ProductNaming`] snapshots.
//!
//! [`ProductNaming`]: procura_products::ProductNaming

pub mod line;
pub mod move_line;
pub mod order;

pub use line::{LineNaming, PurchaseLine, default_origin_name, display_name};
pub use move_line::AccountMoveLineValues;
pub use order::{
    AddLine, Approve, ChangeLineProduct, CreatePurchaseOrder, DocumentLine, GoodsReceived,
    LineNamingRefreshed, LineOriginNameSelected, LineProductChanged, PurchaseOrder,
    PurchaseOrderApproved, PurchaseOrderCommand, PurchaseOrderCreated, PurchaseOrderEvent,
    PurchaseOrderId, PurchaseOrderLineAdded, PurchaseOrderStatus, ReceiveGoods, RefreshLineNames,
    SelectOriginName,
};
