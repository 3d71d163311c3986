//! Cross-entity reconciliation.
//!
//! Products embed snapshots of the raw materials they require. Those
//! snapshots are written in exactly two places: when the products collection
//! is fetched, and when a product's material list is replaced or trimmed
//! through the functions below. Raw material updates and deletes never
//! reach into stored snapshots.
//!
//! Instead of mutating snapshots, readers go through [`resolve_materials`]
//! (or `InventoryState::materials_of`), which joins each embedded entry with
//! the live raw materials collection and reports whether it is still
//! current.

use crate::entity_store::{find, Entity};
use crate::types::{Product, ProductId, ProductMaterial, RawMaterial, RawMaterialId};
use std::fmt;
use std::str::FromStr;

/// Reaction to a raw material delete that leaves loaded products stale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StalenessPolicy {
    /// Keep stale snapshots; readers see them flagged as missing
    #[default]
    Retain,
    /// Also reload products when a deleted material was referenced
    RefetchProducts,
}

impl FromStr for StalenessPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retain" => Ok(Self::Retain),
            "refetch" | "refetch-products" | "refetch_products" => Ok(Self::RefetchProducts),
            _ => Err(s.to_string()),
        }
    }
}

impl fmt::Display for StalenessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retain => write!(f, "retain"),
            Self::RefetchProducts => write!(f, "refetch-products"),
        }
    }
}

/// Replace a product's material list with the server-returned list
///
/// Returns `false` if the product is not loaded.
pub fn replace_materials(
    products: &mut [Product],
    product_id: &ProductId,
    materials: Vec<ProductMaterial>,
) -> bool {
    match products.iter_mut().find(|product| product.id() == product_id) {
        Some(product) => {
            product.materials = materials;
            true
        },
        None => false,
    }
}

/// Remove every entry embedding `material_id` from a product
///
/// Returns `false` if the product is not loaded or has no such entry.
pub fn remove_material(
    products: &mut [Product],
    product_id: &ProductId,
    material_id: &RawMaterialId,
) -> bool {
    let Some(product) = products.iter_mut().find(|product| product.id() == product_id) else {
        return false;
    };

    let before = product.materials.len();
    product
        .materials
        .retain(|entry| &entry.raw_material.id != material_id);
    product.materials.len() != before
}

/// Whether any loaded product embeds `material_id`
#[must_use]
pub fn is_referenced(products: &[Product], material_id: &RawMaterialId) -> bool {
    products.iter().any(|product| product.requires(material_id))
}

/// How an embedded snapshot relates to the live raw material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialStatus {
    /// Snapshot equals the live record
    Current,
    /// Live record exists but differs from the snapshot
    Outdated,
    /// No live record with this id
    Missing,
    /// Raw materials were never loaded, so nothing can be said
    Unverified,
}

/// An embedded entry joined with its live raw material
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialView<'a> {
    /// The stored entry
    pub entry: &'a ProductMaterial,
    /// Live record, if loaded and present
    pub live: Option<&'a RawMaterial>,
    /// Comparison result
    pub status: MaterialStatus,
}

impl MaterialView<'_> {
    /// Live record if present, otherwise the snapshot
    #[must_use]
    pub fn raw_material(&self) -> &RawMaterial {
        self.live.unwrap_or(&self.entry.raw_material)
    }
}

/// Join a product's embedded entries with the live collection
///
/// `live` is `None` when raw materials have not been fetched yet.
#[must_use]
pub fn resolve_materials<'a>(
    product: &'a Product,
    live: Option<&'a [RawMaterial]>,
) -> Vec<MaterialView<'a>> {
    product
        .materials
        .iter()
        .map(|entry| {
            let Some(live) = live else {
                return MaterialView {
                    entry,
                    live: None,
                    status: MaterialStatus::Unverified,
                };
            };

            let record = find(live, &entry.raw_material.id);
            let status = match record {
                None => MaterialStatus::Missing,
                Some(record) if record == &entry.raw_material => MaterialStatus::Current,
                Some(_) => MaterialStatus::Outdated,
            };
            MaterialView {
                entry,
                live: record,
                status,
            }
        })
        .collect()
}

/// An embedded entry that no longer matches the live collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleReference {
    /// Product holding the entry
    pub product_id: ProductId,
    /// Raw material the entry embeds
    pub material_id: RawMaterialId,
    /// [`MaterialStatus::Outdated`] or [`MaterialStatus::Missing`]
    pub status: MaterialStatus,
}

/// Every outdated or missing embedded entry across `products`
///
/// Empty when raw materials have not been fetched.
#[must_use]
pub fn stale_references(products: &[Product], live: Option<&[RawMaterial]>) -> Vec<StaleReference> {
    products
        .iter()
        .flat_map(|product| {
            resolve_materials(product, live)
                .into_iter()
                .filter(|view| {
                    matches!(view.status, MaterialStatus::Outdated | MaterialStatus::Missing)
                })
                .map(|view| StaleReference {
                    product_id: product.id.clone(),
                    material_id: view.entry.raw_material.id.clone(),
                    status: view.status,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material(id: &str, stock: f64) -> RawMaterial {
        RawMaterial {
            id: RawMaterialId::new(id),
            name: format!("material-{id}"),
            stock_quantity: stock,
        }
    }

    fn entry(id: &str, required: f64) -> ProductMaterial {
        ProductMaterial {
            raw_material: material(id, 10.0),
            required_quantity: required,
        }
    }

    fn product(id: &str, materials: Vec<ProductMaterial>) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("product-{id}"),
            price: 1.0,
            materials,
        }
    }

    #[test]
    fn replace_materials_overwrites_list() {
        let mut products = vec![product("p1", vec![entry("m1", 2.0)]), product("p2", vec![])];

        assert!(replace_materials(
            &mut products,
            &ProductId::new("p1"),
            vec![entry("m2", 5.0)]
        ));
        assert_eq!(products[0].materials, vec![entry("m2", 5.0)]);
        assert!(products[1].materials.is_empty());
    }

    #[test]
    fn replace_materials_for_unknown_product_is_noop() {
        let mut products = vec![product("p1", vec![entry("m1", 2.0)])];
        assert!(!replace_materials(&mut products, &ProductId::new("p9"), vec![]));
        assert_eq!(products[0].materials.len(), 1);
    }

    #[test]
    fn remove_material_drops_single_entry() {
        let mut products = vec![product("p1", vec![entry("m1", 2.0), entry("m2", 1.0)])];

        assert!(remove_material(
            &mut products,
            &ProductId::new("p1"),
            &RawMaterialId::new("m1")
        ));
        assert_eq!(products[0].materials, vec![entry("m2", 1.0)]);
        assert!(!remove_material(
            &mut products,
            &ProductId::new("p1"),
            &RawMaterialId::new("m1")
        ));
    }

    #[test]
    fn remove_material_drops_duplicate_entries() {
        let mut products = vec![product(
            "p1",
            vec![entry("m1", 2.0), entry("m2", 1.0), entry("m1", 4.0)],
        )];

        assert!(remove_material(
            &mut products,
            &ProductId::new("p1"),
            &RawMaterialId::new("m1")
        ));
        assert_eq!(products[0].materials, vec![entry("m2", 1.0)]);
    }

    #[test]
    fn remove_material_handles_empty_list() {
        let mut products = vec![product("p1", vec![])];
        assert!(!remove_material(
            &mut products,
            &ProductId::new("p1"),
            &RawMaterialId::new("m1")
        ));
    }

    #[test]
    fn resolve_reports_each_status() {
        let p = product("p1", vec![entry("m1", 1.0), entry("m2", 1.0), entry("m3", 1.0)]);
        let live = vec![material("m1", 10.0), material("m2", 3.0)];

        let statuses: Vec<_> = resolve_materials(&p, Some(live.as_slice()))
            .into_iter()
            .map(|view| view.status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                MaterialStatus::Current,
                MaterialStatus::Outdated,
                MaterialStatus::Missing
            ]
        );

        let views = resolve_materials(&p, Some(live.as_slice()));
        assert_eq!(views[1].raw_material().stock_quantity, 3.0);
        assert_eq!(views[2].raw_material().stock_quantity, 10.0);
    }

    #[test]
    fn resolve_without_live_collection_is_unverified() {
        let p = product("p1", vec![entry("m1", 1.0)]);
        let views = resolve_materials(&p, None);
        assert_eq!(views[0].status, MaterialStatus::Unverified);
        assert!(stale_references(&[p], None).is_empty());
    }

    #[test]
    fn stale_references_lists_outdated_and_missing() {
        let products = vec![
            product("p1", vec![entry("m1", 1.0)]),
            product("p2", vec![entry("m2", 1.0), entry("m1", 4.0)]),
        ];
        let live = vec![material("m1", 10.0)];

        let stale = stale_references(&products, Some(live.as_slice()));
        assert_eq!(
            stale,
            vec![StaleReference {
                product_id: ProductId::new("p2"),
                material_id: RawMaterialId::new("m2"),
                status: MaterialStatus::Missing,
            }]
        );
        assert!(is_referenced(&products, &RawMaterialId::new("m2")));
        assert!(!is_referenced(&products, &RawMaterialId::new("m3")));
    }

    #[test]
    fn staleness_policy_parses() {
        assert_eq!("refetch".parse::<StalenessPolicy>(), Ok(StalenessPolicy::RefetchProducts));
        assert_eq!("Retain".parse::<StalenessPolicy>(), Ok(StalenessPolicy::Retain));
        assert!("cascade".parse::<StalenessPolicy>().is_err());
    }
}
