//! Domain types mirrored from the inventory server.
//!
//! Wire JSON is camelCase. Identifiers are opaque strings on this side even
//! though the server emits them as JSON numbers, so both encodings are
//! accepted on input.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Either encoding of a server-assigned identifier
#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Integer(i64),
    Unsigned(u64),
}

impl From<WireId> for String {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Text(text) => text,
            WireId::Integer(n) => n.to_string(),
            WireId::Unsigned(n) => n.to_string(),
        }
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Wrap a server-assigned identifier
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The identifier as text
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                WireId::deserialize(deserializer).map(|id| Self(id.into()))
            }
        }
    };
}

entity_id!(
    /// Server-assigned raw material identifier
    RawMaterialId
);

entity_id!(
    /// Server-assigned product identifier
    ProductId
);

/// Threads a caller's command through to the action that resolves it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Create a fresh random correlation ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stocked raw material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMaterial {
    /// Immutable server-assigned identifier
    pub id: RawMaterialId,
    /// Display name
    pub name: String,
    /// Units in stock, never negative
    pub stock_quantity: f64,
}

/// One required raw material of a product
///
/// `raw_material` is a snapshot taken when the product was last fetched or
/// its materials were last replaced. It is not kept in sync with the
/// raw materials collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductMaterial {
    /// Embedded snapshot of the raw material
    pub raw_material: RawMaterial,
    /// Units consumed per product, always positive
    pub required_quantity: f64,
}

/// A product and the raw materials it is built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Immutable server-assigned identifier
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Unit price, never negative
    pub price: f64,
    /// Required materials in server order, at most one per raw material
    #[serde(default)]
    pub materials: Vec<ProductMaterial>,
}

impl Product {
    /// Whether any embedded entry refers to `material_id`
    #[must_use]
    pub fn requires(&self, material_id: &RawMaterialId) -> bool {
        self.materials
            .iter()
            .any(|entry| &entry.raw_material.id == material_id)
    }
}

/// Server-computed production suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionSuggestion {
    /// Name of the product to build
    pub product_name: String,
    /// Units that can be built from current stock
    pub quantity_to_produce: u32,
    /// Product price per unit
    pub unit_price: f64,
    /// `unit_price * quantity_to_produce`
    pub total_value: f64,
}

/// Payload for creating a raw material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRawMaterial {
    /// Display name
    pub name: String,
    /// Initial stock
    pub stock_quantity: f64,
}

/// A material reference with the amount a product needs of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialAmount {
    /// Referenced raw material
    pub material_id: RawMaterialId,
    /// Units required per product
    pub quantity: f64,
}

/// Payload for creating a product together with its materials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    /// Display name
    pub name: String,
    /// Unit price
    pub price: f64,
    /// Required materials
    #[serde(default)]
    pub materials: Vec<MaterialAmount>,
}

/// Partial product update; absent fields are left unchanged by the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    /// New name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// Replacement material list for a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialsReplacement {
    /// The complete new list
    pub materials: Vec<MaterialAmount>,
}
