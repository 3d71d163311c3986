//! Local production planning.
//!
//! Mirrors the server's suggestion algorithm over the in-memory collections,
//! so a plan can be previewed without a round-trip. Products are visited in
//! collection order and each one greedily consumes the stock it uses, so
//! earlier products take priority over later ones.

use crate::types::{Product, ProductionSuggestion, RawMaterial, RawMaterialId};
use std::collections::HashMap;

/// Compute production suggestions from the current stock
///
/// Stock comes from `raw_materials` (live records), not from the snapshots
/// embedded in products; a material absent from the collection has no stock.
/// Products without materials, or whose materials all have a non-positive
/// required quantity, are skipped.
#[must_use]
pub fn plan(products: &[Product], raw_materials: &[RawMaterial]) -> Vec<ProductionSuggestion> {
    let mut stock: HashMap<&RawMaterialId, f64> = raw_materials
        .iter()
        .map(|material| (&material.id, material.stock_quantity))
        .collect();

    let mut suggestions = Vec::new();

    for product in products {
        let Some(units) = buildable_units(product, &stock) else {
            continue;
        };
        if units == 0 {
            continue;
        }

        for entry in &product.materials {
            #[allow(clippy::cast_precision_loss)]
            let used = entry.required_quantity * units as f64;
            *stock.entry(&entry.raw_material.id).or_insert(0.0) -= used;
        }

        let quantity = u32::try_from(units).unwrap_or(u32::MAX);
        suggestions.push(ProductionSuggestion {
            product_name: product.name.clone(),
            quantity_to_produce: quantity,
            unit_price: product.price,
            total_value: product.price * f64::from(quantity),
        });
    }

    suggestions
}

/// Minimum over required materials of `floor(stock / required)`
///
/// `None` when no material constrains the product.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn buildable_units(product: &Product, stock: &HashMap<&RawMaterialId, f64>) -> Option<u64> {
    product
        .materials
        .iter()
        .filter(|entry| entry.required_quantity > 0.0)
        .map(|entry| {
            let available = stock.get(&entry.raw_material.id).copied().unwrap_or(0.0);
            let units = (available / entry.required_quantity).floor();
            if units <= 0.0 { 0 } else { units as u64 }
        })
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProductId, ProductMaterial};
    use proptest::prelude::*;

    fn material(id: &str, stock: f64) -> RawMaterial {
        RawMaterial {
            id: RawMaterialId::new(id),
            name: format!("material-{id}"),
            stock_quantity: stock,
        }
    }

    fn product(id: &str, price: f64, needs: &[(&str, f64)]) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("product-{id}"),
            price,
            materials: needs
                .iter()
                .map(|(material_id, required)| ProductMaterial {
                    raw_material: material(material_id, 0.0),
                    required_quantity: *required,
                })
                .collect(),
        }
    }

    #[test]
    fn limited_by_scarcest_material() {
        let products = vec![product("p1", 10.0, &[("iron", 2.0), ("wood", 3.0)])];
        let stock = vec![material("iron", 50.0), material("wood", 10.0)];

        let suggestions = plan(&products, &stock);
        assert_eq!(
            suggestions,
            vec![ProductionSuggestion {
                product_name: "product-p1".to_string(),
                quantity_to_produce: 3,
                unit_price: 10.0,
                total_value: 30.0,
            }]
        );
    }

    #[test]
    fn earlier_products_consume_stock_first() {
        let products = vec![
            product("p1", 5.0, &[("iron", 4.0)]),
            product("p2", 100.0, &[("iron", 1.0)]),
        ];
        let stock = vec![material("iron", 10.0)];

        let suggestions = plan(&products, &stock);
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].quantity_to_produce, 2);
        // 10 - 2 * 4 = 2 left for p2
        assert_eq!(suggestions[1].quantity_to_produce, 2);
    }

    #[test]
    fn skips_products_without_materials_or_stock() {
        let products = vec![
            product("empty", 1.0, &[]),
            product("unknown", 1.0, &[("ghost", 1.0)]),
            product("free", 1.0, &[("iron", 0.0)]),
            product("short", 1.0, &[("iron", 20.0)]),
        ];
        let stock = vec![material("iron", 10.0)];

        assert!(plan(&products, &stock).is_empty());
    }

    fn catalog() -> impl Strategy<Value = (Vec<Product>, Vec<RawMaterial>)> {
        let stock = proptest::collection::vec(0.0f64..100.0, 3);
        let products = proptest::collection::vec(
            proptest::collection::vec((0usize..3, 0.5f64..10.0), 0..3),
            0..5,
        );
        (products, stock).prop_map(|(products, stock)| {
            let names = ["a", "b", "c"];
            let raw = stock
                .iter()
                .zip(names)
                .map(|(stock, name)| material(name, *stock))
                .collect();
            let products = products
                .into_iter()
                .enumerate()
                .map(|(index, needs)| {
                    let mut seen = Vec::new();
                    let needs: Vec<(&str, f64)> = needs
                        .into_iter()
                        .filter(|(material, _)| {
                            let fresh = !seen.contains(material);
                            seen.push(*material);
                            fresh
                        })
                        .map(|(material, required)| (names[material], required))
                        .collect();
                    product(&index.to_string(), 1.0, &needs)
                })
                .collect();
            (products, raw)
        })
    }

    proptest! {
        #[test]
        fn plan_never_overdraws_stock((products, raw) in catalog()) {
            let suggestions = plan(&products, &raw);

            for material in &raw {
                let used: f64 = suggestions
                    .iter()
                    .filter_map(|suggestion| {
                        products.iter().find(|p| p.name == suggestion.product_name).map(|p| (p, suggestion))
                    })
                    .flat_map(|(p, suggestion)| {
                        p.materials
                            .iter()
                            .filter(|entry| entry.raw_material.id == material.id)
                            .map(move |entry| entry.required_quantity * f64::from(suggestion.quantity_to_produce))
                    })
                    .sum();
                prop_assert!(used <= material.stock_quantity + 1e-6);
            }
            prop_assert!(suggestions.iter().all(|s| s.quantity_to_produce > 0));
        }
    }
}
