//! In-memory inventory server.

use crate::environment::{ApiFuture, InventoryApi};
use crate::error::{ProblemDetail, TransportFailure, Violation};
use crate::planner;
use crate::types::{
    MaterialAmount, MaterialsReplacement, NewProduct, NewRawMaterial, Product, ProductId,
    ProductMaterial, ProductPatch, ProductionSuggestion, RawMaterial, RawMaterialId,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const VALIDATION_TYPE: &str = "https://autoflex.com/errors/validation-failed";
const NOT_FOUND_TYPE: &str = "https://autoflex.com/errors/not-found";

/// One operation of [`InventoryApi`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `GET /raw-materials`
    FetchRawMaterials,
    /// `POST /raw-materials`
    CreateRawMaterial,
    /// `PUT /raw-materials/{id}`
    UpdateRawMaterial,
    /// `DELETE /raw-materials/{id}`
    DeleteRawMaterial,
    /// `GET /products`
    FetchProducts,
    /// `POST /products`
    CreateProduct,
    /// `PUT /products/{id}`
    UpdateProduct,
    /// `DELETE /products/{id}`
    DeleteProduct,
    /// `PUT /product-materials/{productId}`
    ReplaceProductMaterials,
    /// `DELETE /product-materials/{productId}/{materialId}`
    DeleteProductMaterial,
    /// `GET /production/suggestions`
    ProductionSuggestions,
    /// `GET /health/whoami`
    Whoami,
    /// `GET /health`
    Health,
}

/// Host name reported before [`InMemoryInventoryApi::with_pod`]
const DEFAULT_POD: &str = "local-dev";

struct Server {
    raw_materials: Vec<RawMaterial>,
    products: Vec<Product>,
    last_id: u64,
    pod: String,
    healthy: bool,
    faults: HashMap<Endpoint, VecDeque<TransportFailure>>,
    delays: HashMap<Endpoint, VecDeque<Duration>>,
    calls: HashMap<Endpoint, usize>,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            raw_materials: Vec::new(),
            products: Vec::new(),
            last_id: 0,
            pod: DEFAULT_POD.to_string(),
            healthy: true,
            faults: HashMap::new(),
            delays: HashMap::new(),
            calls: HashMap::new(),
        }
    }
}

impl Server {
    fn next_id(&mut self) -> String {
        self.last_id += 1;
        self.last_id.to_string()
    }

    fn live_material(&self, id: &RawMaterialId) -> Option<&RawMaterial> {
        self.raw_materials.iter().find(|material| &material.id == id)
    }

    fn product_mut(&mut self, id: &ProductId) -> Result<&mut Product, TransportFailure> {
        self.products
            .iter_mut()
            .find(|product| &product.id == id)
            .ok_or_else(|| not_found(format!("/products/{id}"), "Product not found"))
    }

    fn resolve_amounts(
        &self,
        amounts: &[MaterialAmount],
        instance: &str,
    ) -> Result<Vec<ProductMaterial>, TransportFailure> {
        amounts
            .iter()
            .map(|amount| {
                let material = self
                    .live_material(&amount.material_id)
                    .ok_or_else(|| not_found(instance.to_string(), "Material not found"))?;
                Ok(ProductMaterial {
                    raw_material: material.clone(),
                    required_quantity: amount.quantity,
                })
            })
            .collect()
    }
}

/// Inventory server held in memory
///
/// Ids are assigned from a counter shared by both collections, starting
/// after the highest numeric id seeded. Failures queued with
/// [`InMemoryInventoryApi::fail_next`] and latencies queued with
/// [`InMemoryInventoryApi::delay_next`] are consumed one per call.
#[derive(Clone, Default)]
pub struct InMemoryInventoryApi {
    server: Arc<Mutex<Server>>,
}

impl InMemoryInventoryApi {
    /// Create an empty server
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed raw materials
    #[must_use]
    pub fn with_raw_materials(self, raw_materials: Vec<RawMaterial>) -> Self {
        {
            let mut server = self.lock();
            server.last_id = server.last_id.max(highest_id(raw_materials.iter().map(|m| m.id.as_str())));
            server.raw_materials = raw_materials;
        }
        self
    }

    /// Seed products
    #[must_use]
    pub fn with_products(self, products: Vec<Product>) -> Self {
        {
            let mut server = self.lock();
            server.last_id = server.last_id.max(highest_id(products.iter().map(|p| p.id.as_str())));
            server.products = products;
        }
        self
    }

    /// Host name reported by whoami
    #[must_use]
    pub fn with_pod(self, pod: impl Into<String>) -> Self {
        self.lock().pod = pod.into();
        self
    }

    /// Change what the health endpoint reports
    pub fn set_healthy(&self, healthy: bool) {
        self.lock().healthy = healthy;
    }

    /// Make the next call to `endpoint` fail with `failure`
    pub fn fail_next(&self, endpoint: Endpoint, failure: TransportFailure) {
        self.lock().faults.entry(endpoint).or_default().push_back(failure);
    }

    /// Make the next call to `endpoint` wait `delay` before it is handled
    pub fn delay_next(&self, endpoint: Endpoint, delay: Duration) {
        self.lock().delays.entry(endpoint).or_default().push_back(delay);
    }

    /// Number of calls made to `endpoint`
    #[must_use]
    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.lock().calls.get(&endpoint).copied().unwrap_or(0)
    }

    /// Current raw materials on the server
    #[must_use]
    pub fn raw_materials(&self) -> Vec<RawMaterial> {
        self.lock().raw_materials.clone()
    }

    /// Current products on the server
    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.lock().products.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Server> {
        self.server.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call, apply queued latency and failure, then run `handler`
    ///
    /// The handler sees the server as it is after the delay, so delayed calls
    /// are applied in the order they resume.
    fn handle<T, F>(&self, endpoint: Endpoint, handler: F) -> ApiFuture<'_, T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Server) -> Result<T, TransportFailure> + Send + 'static,
    {
        Box::pin(async move {
            let (delay, fault) = {
                let mut server = self.lock();
                *server.calls.entry(endpoint).or_insert(0) += 1;
                let delay = server.delays.get_mut(&endpoint).and_then(VecDeque::pop_front);
                let fault = server.faults.get_mut(&endpoint).and_then(VecDeque::pop_front);
                (delay, fault)
            };

            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(failure) = fault {
                tracing::debug!(?endpoint, %failure, "Injected failure");
                return Err(failure);
            }

            let mut server = self.lock();
            handler(&mut server)
        })
    }
}

impl std::fmt::Debug for InMemoryInventoryApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryInventoryApi").finish_non_exhaustive()
    }
}

impl InventoryApi for InMemoryInventoryApi {
    fn fetch_raw_materials(&self) -> ApiFuture<'_, Vec<RawMaterial>> {
        self.handle(Endpoint::FetchRawMaterials, |server| Ok(server.raw_materials.clone()))
    }

    fn create_raw_material(&self, input: NewRawMaterial) -> ApiFuture<'_, RawMaterial> {
        self.handle(Endpoint::CreateRawMaterial, move |server| {
            check_raw_material("create", "/raw-materials", &input.name, input.stock_quantity)?;
            let created = RawMaterial {
                id: RawMaterialId::new(server.next_id()),
                name: input.name,
                stock_quantity: input.stock_quantity,
            };
            server.raw_materials.push(created.clone());
            Ok(created)
        })
    }

    fn update_raw_material(&self, material: RawMaterial) -> ApiFuture<'_, RawMaterial> {
        self.handle(Endpoint::UpdateRawMaterial, move |server| {
            let instance = format!("/raw-materials/{}", material.id);
            check_raw_material("update", &instance, &material.name, material.stock_quantity)?;
            let stored = server
                .raw_materials
                .iter_mut()
                .find(|stored| stored.id == material.id)
                .ok_or_else(|| not_found(instance, "Raw material not found"))?;
            stored.name = material.name;
            stored.stock_quantity = material.stock_quantity;
            Ok(stored.clone())
        })
    }

    fn delete_raw_material(&self, id: RawMaterialId) -> ApiFuture<'_, ()> {
        self.handle(Endpoint::DeleteRawMaterial, move |server| {
            let before = server.raw_materials.len();
            server.raw_materials.retain(|material| material.id != id);
            if server.raw_materials.len() == before {
                tracing::warn!(%id, "Attempted to delete non-existent raw material");
                return Ok(());
            }
            // Associations go with the raw material
            for product in &mut server.products {
                product.materials.retain(|entry| entry.raw_material.id != id);
            }
            Ok(())
        })
    }

    fn fetch_products(&self) -> ApiFuture<'_, Vec<Product>> {
        self.handle(Endpoint::FetchProducts, |server| Ok(server.products.clone()))
    }

    fn create_product(&self, input: NewProduct) -> ApiFuture<'_, Product> {
        self.handle(Endpoint::CreateProduct, move |server| {
            let mut violations = Vec::new();
            if input.name.trim().is_empty() {
                violations.push(violation("create.dto.name", "The product name cannot be empty"));
            }
            if input.price <= 0.0 {
                violations.push(violation("create.dto.price", "The price must be greater than zero"));
            }
            if input.materials.is_empty() {
                violations.push(violation(
                    "create.dto.materials",
                    "The product must have at least one material",
                ));
            }
            violations.extend(amount_violations("create.dto.materials", &input.materials));
            reject("/products", violations)?;

            let materials = server.resolve_amounts(&input.materials, "/products")?;
            let created = Product {
                id: ProductId::new(server.next_id()),
                name: input.name,
                price: input.price,
                materials,
            };
            server.products.push(created.clone());
            Ok(created)
        })
    }

    fn update_product(&self, id: ProductId, patch: ProductPatch) -> ApiFuture<'_, Product> {
        self.handle(Endpoint::UpdateProduct, move |server| {
            let instance = format!("/products/{id}");
            let mut violations = Vec::new();
            if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
                violations.push(violation("update.dto.name", "If provided, the name cannot be blank"));
            }
            if patch.price.is_some_and(|price| price <= 0.0) {
                violations.push(violation(
                    "update.dto.price",
                    "If provided, the price must be greater than zero",
                ));
            }
            reject(&instance, violations)?;

            let product = server.product_mut(&id)?;
            if let Some(name) = patch.name {
                product.name = name;
            }
            if let Some(price) = patch.price {
                product.price = price;
            }
            Ok(product.clone())
        })
    }

    fn delete_product(&self, id: ProductId) -> ApiFuture<'_, ()> {
        self.handle(Endpoint::DeleteProduct, move |server| {
            server.product_mut(&id)?;
            server.products.retain(|product| product.id != id);
            Ok(())
        })
    }

    fn replace_product_materials(
        &self,
        product_id: ProductId,
        replacement: MaterialsReplacement,
    ) -> ApiFuture<'_, Vec<ProductMaterial>> {
        self.handle(Endpoint::ReplaceProductMaterials, move |server| {
            let instance = format!("/product-materials/{product_id}");
            let mut violations = Vec::new();
            if replacement.materials.is_empty() {
                violations.push(violation(
                    "update.dto.materials",
                    "You must provide at least one material to update",
                ));
            }
            violations.extend(amount_violations("update.dto.materials", &replacement.materials));
            reject(&instance, violations)?;

            server.product_mut(&product_id)?;
            let materials = server.resolve_amounts(&replacement.materials, &instance)?;
            let product = server.product_mut(&product_id)?;
            product.materials.clone_from(&materials);
            Ok(materials)
        })
    }

    fn delete_product_material(
        &self,
        product_id: ProductId,
        material_id: RawMaterialId,
    ) -> ApiFuture<'_, ()> {
        self.handle(Endpoint::DeleteProductMaterial, move |server| {
            if let Some(product) = server.products.iter_mut().find(|p| p.id == product_id) {
                product.materials.retain(|entry| entry.raw_material.id != material_id);
            }
            Ok(())
        })
    }

    fn fetch_production_suggestions(&self) -> ApiFuture<'_, Vec<ProductionSuggestion>> {
        self.handle(Endpoint::ProductionSuggestions, |server| {
            Ok(planner::plan(&server.products, &server.raw_materials))
        })
    }

    fn fetch_whoami(&self) -> ApiFuture<'_, String> {
        self.handle(Endpoint::Whoami, |server| Ok(server.pod.clone()))
    }

    fn check_health(&self) -> ApiFuture<'_, bool> {
        self.handle(Endpoint::Health, |server| Ok(server.healthy))
    }
}

fn highest_id<'a>(ids: impl Iterator<Item = &'a str>) -> u64 {
    ids.filter_map(|id| id.parse::<u64>().ok()).max().unwrap_or(0)
}

fn violation(field: &str, message: &str) -> Violation {
    Violation {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn amount_violations(path: &str, amounts: &[MaterialAmount]) -> Vec<Violation> {
    amounts
        .iter()
        .enumerate()
        .filter(|(_, amount)| amount.quantity <= 0.0)
        .map(|(index, _)| {
            violation(
                &format!("{path}[{index}].quantity"),
                "Quantity must be greater than zero",
            )
        })
        .collect()
}

fn check_raw_material(
    operation: &str,
    instance: &str,
    name: &str,
    stock_quantity: f64,
) -> Result<(), TransportFailure> {
    let mut violations = Vec::new();
    if name.trim().is_empty() {
        violations.push(violation(
            &format!("{operation}.dto.name"),
            "The raw material name cannot be empty",
        ));
    }
    if stock_quantity < 0.0 {
        violations.push(violation(
            &format!("{operation}.dto.stockQuantity"),
            "The stock quantity cannot be negative",
        ));
    }
    reject(instance, violations)
}

fn reject(instance: &str, violations: Vec<Violation>) -> Result<(), TransportFailure> {
    if violations.is_empty() {
        return Ok(());
    }
    Err(TransportFailure::problem(
        400,
        &ProblemDetail {
            kind: Some(VALIDATION_TYPE.to_string()),
            title: Some("Validation Error".to_string()),
            status: Some(400),
            detail: Some(
                "Your request contains invalid data. Please check the 'errors' list.".to_string(),
            ),
            instance: Some(instance.to_string()),
            errors: Some(violations),
        },
    ))
}

fn not_found(instance: String, detail: &str) -> TransportFailure {
    TransportFailure::problem(
        404,
        &ProblemDetail {
            kind: Some(NOT_FOUND_TYPE.to_string()),
            title: Some("Resource Not Found".to_string()),
            status: Some(404),
            detail: Some(detail.to_string()),
            instance: Some(instance),
            errors: None,
        },
    )
}
