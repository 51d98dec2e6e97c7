//! Purchase line naming: which origin name a line shows, and why.
//!
//! Two fields are derived here, `selected_origin_name` and `display_name`. They
//! change on two triggers:
//!
//! - product assignment (`LineNaming::for_product`): picks a default selection,
//!   preferring entries scoped to the order's supplier;
//! - manual selection (`LineNaming::with_selection`): keeps the given selection.
//!
//! In both cases the display name is re-derived with [`display_name`], which is a
//! pure function of the current values and can be re-run at any time.

use serde::{Deserialize, Serialize};

use procura_core::{DomainError, DomainResult};
use procura_parties::PartyId;
use procura_products::{OriginName, OriginNameId, ProductId, ProductNaming, first_by_priority};

/// The derived naming fields of a purchase line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineNaming {
    pub selected_origin_name: Option<OriginNameId>,
    pub display_name: String,
}

impl LineNaming {
    /// Naming after the line's product changes.
    pub fn for_product(product: Option<&ProductNaming>, order_supplier: Option<PartyId>) -> Self {
        let selected = product.and_then(|p| default_origin_name(p, order_supplier));
        Self {
            selected_origin_name: selected.map(OriginName::id_typed),
            display_name: display_name(product, selected),
        }
    }

    /// Naming after the selection is set directly.
    pub fn with_selection(product: Option<&ProductNaming>, selected: Option<&OriginName>) -> Self {
        Self {
            selected_origin_name: selected.map(OriginName::id_typed),
            display_name: display_name(product, selected),
        }
    }
}

/// Default selection for a freshly assigned product.
///
/// Entries scoped to the order's supplier win; when none match, the first entry
/// overall is used, whatever its supplier.
pub fn default_origin_name(
    product: &ProductNaming,
    order_supplier: Option<PartyId>,
) -> Option<&OriginName> {
    if !product.has_origin_names() {
        return None;
    }
    first_by_priority(product.for_supplier(order_supplier))
        .or_else(|| first_by_priority(product.origin_names()))
}

/// Text shown for a line on supplier-facing documents.
///
/// Selection name, else the product's primary origin name, else its canonical
/// name; empty only without a product.
pub fn display_name(product: Option<&ProductNaming>, selected: Option<&OriginName>) -> String {
    if let Some(selected) = selected {
        return selected.name().to_string();
    }
    match product {
        Some(p) if p.has_origin_names() => first_by_priority(p.origin_names())
            .map(|n| n.name().to_string())
            .unwrap_or_else(|| p.canonical_name().to_string()),
        Some(p) => p.canonical_name().to_string(),
        None => String::new(),
    }
}

/// Purchase order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub line_no: u32,
    pub product_id: Option<ProductId>,
    pub quantity: i64,
    pub selected_origin_name: Option<OriginNameId>,
    pub display_name: String,
}

impl PurchaseLine {
    pub fn naming(&self) -> LineNaming {
        LineNaming {
            selected_origin_name: self.selected_origin_name,
            display_name: self.display_name.clone(),
        }
    }

    pub(crate) fn set_naming(&mut self, naming: &LineNaming) {
        self.selected_origin_name = naming.selected_origin_name;
        self.display_name = naming.display_name.clone();
    }

    /// Checks that `product` is the snapshot of this line's product.
    pub fn ensure_product<'a>(
        &self,
        product: Option<&'a ProductNaming>,
    ) -> DomainResult<Option<&'a ProductNaming>> {
        match (self.product_id, product) {
            (None, None) => Ok(None),
            (Some(id), Some(p)) if p.product_id() == id => Ok(Some(p)),
            _ => Err(DomainError::validation(format!(
                "product snapshot does not match line {}",
                self.line_no
            ))),
        }
    }

    /// Re-derive both fields from current values.
    ///
    /// A selection that no longer exists among the product's origin names is
    /// dropped before the display name is derived.
    pub fn rederive_naming(&self, product: Option<&ProductNaming>) -> DomainResult<LineNaming> {
        let product = self.ensure_product(product)?;
        let selected = match (self.selected_origin_name, product) {
            (Some(id), Some(p)) => p.find(id),
            _ => None,
        };
        Ok(LineNaming::with_selection(product, selected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procura_core::{AggregateId, TenantId};
    use procura_products::{InMemoryOriginNameRegistry, NewOriginName, OriginNameRegistry};

    struct Fixture {
        supplier_x: PartyId,
        supplier_y: PartyId,
        widget: ProductNaming,
    }

    /// "Widget" with a generic entry (seq 10) and a SupplierX entry (seq 5).
    fn widget() -> Fixture {
        let registry = InMemoryOriginNameRegistry::new();
        let tenant = TenantId::new();
        let product_id = ProductId::new(AggregateId::new());
        let supplier_x = PartyId::new(AggregateId::new());
        let supplier_y = PartyId::new(AggregateId::new());

        registry
            .insert(tenant, NewOriginName::new(product_id, "Acme Widget").with_sequence(10))
            .unwrap();
        registry
            .insert(
                tenant,
                NewOriginName::new(product_id, "SupplierX Widget")
                    .with_sequence(5)
                    .for_supplier(supplier_x),
            )
            .unwrap();

        let widget =
            ProductNaming::new(product_id, "Widget", registry.for_product(tenant, product_id))
                .unwrap();
        Fixture {
            supplier_x,
            supplier_y,
            widget,
        }
    }

    fn named<'a>(p: &'a ProductNaming, name: &str) -> &'a OriginName {
        p.origin_names().iter().find(|n| n.name() == name).unwrap()
    }

    #[test]
    fn matching_supplier_selects_its_entry() {
        let f = widget();
        let naming = LineNaming::for_product(Some(&f.widget), Some(f.supplier_x));

        let expected = named(&f.widget, "SupplierX Widget").id_typed();
        assert_eq!(naming.selected_origin_name, Some(expected));
        assert_eq!(naming.display_name, "SupplierX Widget");
    }

    #[test]
    fn unmatched_supplier_falls_back_to_global_first_entry() {
        let f = widget();
        let naming = LineNaming::for_product(Some(&f.widget), Some(f.supplier_y));

        // The SupplierX entry still wins on sequence, even for SupplierY.
        assert_eq!(naming.display_name, "SupplierX Widget");
    }

    #[test]
    fn supplier_match_beats_lower_sequence() {
        let registry = InMemoryOriginNameRegistry::new();
        let tenant = TenantId::new();
        let product_id = ProductId::new(AggregateId::new());
        let supplier = PartyId::new(AggregateId::new());
        registry
            .insert(tenant, NewOriginName::new(product_id, "generic").with_sequence(1))
            .unwrap();
        registry
            .insert(
                tenant,
                NewOriginName::new(product_id, "scoped").with_sequence(50).for_supplier(supplier),
            )
            .unwrap();
        let naming_source =
            ProductNaming::new(product_id, "Widget", registry.for_product(tenant, product_id))
                .unwrap();

        let naming = LineNaming::for_product(Some(&naming_source), Some(supplier));
        assert_eq!(naming.display_name, "scoped");
    }

    #[test]
    fn order_without_supplier_prefers_supplier_agnostic_entries() {
        let f = widget();
        let naming = LineNaming::for_product(Some(&f.widget), None);
        assert_eq!(naming.display_name, "Acme Widget");
    }

    #[test]
    fn product_without_origin_names_clears_selection_and_shows_canonical_name() {
        let product =
            ProductNaming::new(ProductId::new(AggregateId::new()), "Widget", vec![]).unwrap();
        let naming = LineNaming::for_product(Some(&product), None);
        assert_eq!(naming.selected_origin_name, None);
        assert_eq!(naming.display_name, "Widget");
    }

    #[test]
    fn no_product_yields_empty_display_name() {
        let naming = LineNaming::for_product(None, None);
        assert_eq!(naming, LineNaming::default());
        assert_eq!(display_name(None, None), "");
    }

    #[test]
    fn manual_selection_wins_regardless_of_supplier() {
        let f = widget();
        let acme = named(&f.widget, "Acme Widget");
        let naming = LineNaming::with_selection(Some(&f.widget), Some(acme));
        assert_eq!(naming.selected_origin_name, Some(acme.id_typed()));
        assert_eq!(naming.display_name, "Acme Widget");
    }

    #[test]
    fn cleared_selection_shows_primary_origin_name() {
        let f = widget();
        let naming = LineNaming::with_selection(Some(&f.widget), None);
        assert_eq!(naming.selected_origin_name, None);
        assert_eq!(naming.display_name, "SupplierX Widget");
    }

    #[test]
    fn rederive_drops_vanished_selection() {
        let f = widget();
        let acme = named(&f.widget, "Acme Widget").id_typed();
        let line = PurchaseLine {
            line_no: 1,
            product_id: Some(f.widget.product_id()),
            quantity: 1,
            selected_origin_name: Some(acme),
            display_name: "Acme Widget".to_string(),
        };

        let without_acme = ProductNaming::new(
            f.widget.product_id(),
            "Widget",
            f.widget
                .origin_names()
                .iter()
                .filter(|n| n.id_typed() != acme)
                .cloned()
                .collect(),
        )
        .unwrap();

        let naming = line.rederive_naming(Some(&without_acme)).unwrap();
        assert_eq!(naming.selected_origin_name, None);
        assert_eq!(naming.display_name, "SupplierX Widget");
    }

    #[test]
    fn rederive_rejects_snapshot_of_another_product() {
        let f = widget();
        let line = PurchaseLine {
            line_no: 3,
            product_id: Some(ProductId::new(AggregateId::new())),
            quantity: 1,
            selected_origin_name: None,
            display_name: String::new(),
        };
        let err = line.rederive_naming(Some(&f.widget)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// With a product set, the display name is never empty, and an automatic
            /// selection exists exactly when the product has origin names.
            #[test]
            fn product_assignment_always_names_the_line(
                entries in proptest::collection::vec((-20i32..20, any::<bool>()), 0..8),
                order_has_supplier in any::<bool>()
            ) {
                let registry = InMemoryOriginNameRegistry::new();
                let tenant = TenantId::new();
                let product_id = ProductId::new(AggregateId::new());
                let supplier = PartyId::new(AggregateId::new());

                for (i, (seq, scoped)) in entries.iter().enumerate() {
                    let mut new = NewOriginName::new(product_id, format!("name-{i}")).with_sequence(*seq);
                    if *scoped {
                        new = new.for_supplier(supplier);
                    }
                    registry.insert(tenant, new).unwrap();
                }
                let product = ProductNaming::new(
                    product_id,
                    "Widget",
                    registry.for_product(tenant, product_id),
                ).unwrap();

                let order_supplier = order_has_supplier.then_some(supplier);
                let naming = LineNaming::for_product(Some(&product), order_supplier);

                prop_assert!(!naming.display_name.is_empty());
                prop_assert_eq!(naming.selected_origin_name.is_some(), !entries.is_empty());

                if let Some(id) = naming.selected_origin_name {
                    let chosen = product.find(id).unwrap();
                    let any_match = product.for_supplier(order_supplier).next().is_some();
                    if any_match {
                        prop_assert!(chosen.matches_supplier(order_supplier));
                    } else {
                        prop_assert_eq!(Some(chosen), product.primary());
                    }
                }
            }
        }
    }
}
