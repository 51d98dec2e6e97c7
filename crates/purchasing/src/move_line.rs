//! Projection of purchase lines into internal accounting records.
//!
//! Origin names are supplier-facing only. Whenever a line has a product, the
//! projected record is named after the product's canonical name.

use serde::{Deserialize, Serialize};

use procura_core::{DomainError, DomainResult};
use procura_products::{ProductId, ProductNaming};

use crate::line::PurchaseLine;
use crate::order::{PurchaseOrder, PurchaseOrderId};

/// Values of an internal accounting / stock-movement line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMoveLineValues {
    pub order_id: PurchaseOrderId,
    pub line_no: u32,
    pub product_id: Option<ProductId>,
    pub name: String,
    pub quantity: i64,
}

impl PurchaseLine {
    /// Accounting values for this line.
    ///
    /// `product` must be the snapshot of the line's product (or `None` when the
    /// line has none).
    pub fn prepare_account_move_line(
        &self,
        order_id: PurchaseOrderId,
        product: Option<&ProductNaming>,
    ) -> DomainResult<AccountMoveLineValues> {
        let product = self.ensure_product(product)?;

        let mut values = AccountMoveLineValues {
            order_id,
            line_no: self.line_no,
            product_id: self.product_id,
            name: self.display_name.clone(),
            quantity: self.quantity,
        };
        if let Some(p) = product {
            values.name = p.canonical_name().to_string();
        }
        Ok(values)
    }
}

impl PurchaseOrder {
    /// Accounting values for every line, given snapshots of the products the
    /// lines reference.
    pub fn prepare_account_move_lines(
        &self,
        products: &[ProductNaming],
    ) -> DomainResult<Vec<AccountMoveLineValues>> {
        self.lines()
            .iter()
            .map(|line| {
                let product = match line.product_id {
                    Some(id) => Some(
                        products
                            .iter()
                            .find(|p| p.product_id() == id)
                            .ok_or_else(|| {
                                DomainError::validation(format!(
                                    "missing product snapshot for line {}",
                                    line.line_no
                                ))
                            })?,
                    ),
                    None => None,
                };
                line.prepare_account_move_line(self.id_typed(), product)
            })
            .collect()
    }
}
