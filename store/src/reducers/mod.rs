//! Inventory reducers.
//!
//! One reducer per collection, scoped into [`InventoryState`] and combined
//! with the cross-entity [`ReconciliationReducer`] by [`InventoryReducer`].
//!
//! [`InventoryState`]: crate::state::InventoryState

mod inventory;
mod production;
mod products;
mod raw_materials;
mod system;

pub use inventory::{InventoryReducer, ReconciliationReducer};
pub use production::ProductionReducer;
pub use products::ProductsReducer;
pub use raw_materials::RawMaterialsReducer;
pub use system::SystemReducer;
