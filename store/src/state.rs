//! Collection state and selectors.

use crate::entity_store::find;
use crate::lifecycle::{CollectionRequestState, RequestTracker};
use crate::planner;
use crate::reconciler::{self, MaterialView, StaleReference};
use crate::types::{Product, ProductId, ProductionSuggestion, RawMaterial, RawMaterialId};

/// Raw materials collection
#[derive(Debug, Clone, Default)]
pub struct RawMaterialsState {
    /// Entities in server order (creates appended)
    pub items: Vec<RawMaterial>,
    /// Set once the first fetch succeeded
    pub loaded: bool,
    /// Request lifecycle
    pub tracker: RequestTracker,
}

impl RawMaterialsState {
    /// `loading`/`error` pair
    #[must_use]
    pub const fn request(&self) -> &CollectionRequestState {
        self.tracker.state()
    }

    /// Look up by id
    #[must_use]
    pub fn get(&self, id: &RawMaterialId) -> Option<&RawMaterial> {
        find(&self.items, id)
    }
}

/// Products collection
#[derive(Debug, Clone, Default)]
pub struct ProductsState {
    /// Entities in server order (creates appended)
    pub items: Vec<Product>,
    /// Request lifecycle
    pub tracker: RequestTracker,
}

impl ProductsState {
    /// `loading`/`error` pair
    #[must_use]
    pub const fn request(&self) -> &CollectionRequestState {
        self.tracker.state()
    }

    /// Look up by id
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        find(&self.items, id)
    }
}

/// Server-computed production suggestions
#[derive(Debug, Clone, Default)]
pub struct ProductionState {
    /// Last fetched suggestions
    pub suggestions: Vec<ProductionSuggestion>,
    /// Request lifecycle
    pub tracker: RequestTracker,
}

impl ProductionState {
    /// `loading`/`error` pair
    #[must_use]
    pub const fn request(&self) -> &CollectionRequestState {
        self.tracker.state()
    }
}

/// Host name shown before the server identified itself
pub const DEFAULT_HOSTNAME: &str = "localhost";

/// Identity and health of the server
#[derive(Debug, Clone)]
pub struct SystemState {
    /// Host name of the instance that last answered whoami
    pub hostname: String,
    /// Outcome of the last health check; assumed healthy until checked
    pub healthy: bool,
    /// Request lifecycle of whoami
    pub tracker: RequestTracker,
}

impl SystemState {
    /// `loading`/`error` pair
    #[must_use]
    pub const fn request(&self) -> &CollectionRequestState {
        self.tracker.state()
    }
}

impl Default for SystemState {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_HOSTNAME.to_string(),
            healthy: true,
            tracker: RequestTracker::default(),
        }
    }
}

/// The whole mirror
#[derive(Debug, Clone, Default)]
pub struct InventoryState {
    /// Raw materials
    pub raw_materials: RawMaterialsState,
    /// Products with embedded material snapshots
    pub products: ProductsState,
    /// Production suggestions
    pub production: ProductionState,
    /// Server identity and health
    pub system: SystemState,
}

impl InventoryState {
    /// Live raw materials, or `None` before the first successful fetch
    fn live_materials(&self) -> Option<&[RawMaterial]> {
        self.raw_materials
            .loaded
            .then_some(self.raw_materials.items.as_slice())
    }

    /// A product's materials joined with the live raw materials
    ///
    /// `None` if the product is not loaded.
    #[must_use]
    pub fn materials_of(&self, product_id: &ProductId) -> Option<Vec<MaterialView<'_>>> {
        let product = self.products.get(product_id)?;
        Some(reconciler::resolve_materials(product, self.live_materials()))
    }

    /// Embedded entries that are outdated or point at deleted raw materials
    #[must_use]
    pub fn stale_references(&self) -> Vec<StaleReference> {
        reconciler::stale_references(&self.products.items, self.live_materials())
    }

    /// Production plan computed locally from the mirrored collections
    #[must_use]
    pub fn production_plan(&self) -> Vec<ProductionSuggestion> {
        planner::plan(&self.products.items, &self.raw_materials.items)
    }

    /// Whether any collection has an operation in flight
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.raw_materials.tracker.loading()
            || self.products.tracker.loading()
            || self.production.tracker.loading()
            || self.system.tracker.loading()
    }
}
