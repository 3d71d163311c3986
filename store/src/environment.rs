//! Injected dependencies of the inventory reducers.
//!
//! Reducers never perform I/O themselves. They describe a network call as an
//! effect that uses the [`InventoryApi`] found in the environment; tests inject
//! [`crate::mocks::InMemoryInventoryApi`], production code injects the HTTP
//! client.

use crate::config::SyncSettings;
use crate::error::TransportFailure;
use crate::types::{
    MaterialsReplacement, NewProduct, NewRawMaterial, Product, ProductId, ProductMaterial,
    ProductPatch, ProductionSuggestion, RawMaterial, RawMaterialId,
};
use futures::future::BoxFuture;
use std::sync::Arc;

/// Boxed future returned by every [`InventoryApi`] operation
pub type ApiFuture<'a, T> = BoxFuture<'a, Result<T, TransportFailure>>;

/// The remote authority owning the collections
///
/// Each method performs exactly one round-trip and reports failures raw;
/// classification happens in the effect that awaits the call. Methods return
/// boxed futures so the trait stays usable as `Arc<dyn InventoryApi>`.
pub trait InventoryApi: Send + Sync {
    /// `GET /raw-materials`
    fn fetch_raw_materials(&self) -> ApiFuture<'_, Vec<RawMaterial>>;

    /// `POST /raw-materials`
    fn create_raw_material(&self, input: NewRawMaterial) -> ApiFuture<'_, RawMaterial>;

    /// `PUT /raw-materials/{id}` with the name and stock of `material`
    fn update_raw_material(&self, material: RawMaterial) -> ApiFuture<'_, RawMaterial>;

    /// `DELETE /raw-materials/{id}`
    fn delete_raw_material(&self, id: RawMaterialId) -> ApiFuture<'_, ()>;

    /// `GET /products`
    fn fetch_products(&self) -> ApiFuture<'_, Vec<Product>>;

    /// `POST /products`
    fn create_product(&self, input: NewProduct) -> ApiFuture<'_, Product>;

    /// `PUT /products/{id}`
    fn update_product(&self, id: ProductId, patch: ProductPatch) -> ApiFuture<'_, Product>;

    /// `DELETE /products/{id}`
    fn delete_product(&self, id: ProductId) -> ApiFuture<'_, ()>;

    /// `PUT /product-materials/{productId}`
    fn replace_product_materials(
        &self,
        product_id: ProductId,
        replacement: MaterialsReplacement,
    ) -> ApiFuture<'_, Vec<ProductMaterial>>;

    /// `DELETE /product-materials/{productId}/{materialId}`
    fn delete_product_material(
        &self,
        product_id: ProductId,
        material_id: RawMaterialId,
    ) -> ApiFuture<'_, ()>;

    /// `GET /production/suggestions`
    fn fetch_production_suggestions(&self) -> ApiFuture<'_, Vec<ProductionSuggestion>>;

    /// `GET /health/whoami`: host name of the server instance answering
    fn fetch_whoami(&self) -> ApiFuture<'_, String>;

    /// `GET /health`: whether the server reports itself up
    fn check_health(&self) -> ApiFuture<'_, bool>;
}

/// Environment of every inventory reducer
#[derive(Clone)]
pub struct InventoryEnvironment {
    /// Transport to the inventory server
    pub api: Arc<dyn InventoryApi>,
    /// Engine settings
    pub settings: SyncSettings,
}

impl InventoryEnvironment {
    /// Create an environment with default settings
    #[must_use]
    pub fn new(api: Arc<dyn InventoryApi>) -> Self {
        Self {
            api,
            settings: SyncSettings::default(),
        }
    }

    /// Replace the settings
    #[must_use]
    pub fn with_settings(mut self, settings: SyncSettings) -> Self {
        self.settings = settings;
        self
    }
}

impl std::fmt::Debug for InventoryEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryEnvironment")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
