//! # Inventory Sync Store
//!
//! Client-side mirror of a server-owned inventory: raw materials, products
//! (each embedding snapshots of the raw materials it uses) and production
//! suggestions, plus the identity and health of the server.
//!
//! Every operation makes exactly one round-trip through an injected
//! [`InventoryApi`]. Its outcome is classified once
//! ([`classifier::classify`]) and applied to the mirror by the collection
//! reducers, which also track per-collection `loading`/`error` state.
//!
//! ## Layout
//!
//! - [`types`]: wire entities and payloads
//! - [`error`] / [`classifier`]: transport failures and their classification
//! - [`lifecycle`]: request tracker, tickets, resolution policy
//! - [`entity_store`]: collection appliers
//! - [`reconciler`]: embedded material snapshots versus live raw materials
//! - [`planner`]: local production plan
//! - [`actions`] / [`state`] / [`reducers`]: the reducer tree
//! - [`session`]: request/response facade over the runtime store
//! - [`mocks`]: in-memory server for tests
//!
//! ## Example
//!
//! ```
//! use inventory_sync_store::mocks::InMemoryInventoryApi;
//! use inventory_sync_store::{InventoryEnvironment, InventorySession, NewRawMaterial};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let session = InventorySession::new(InventoryEnvironment::new(Arc::new(
//!     InMemoryInventoryApi::new(),
//! )));
//!
//! session
//!     .create_raw_material(NewRawMaterial {
//!         name: "Iron".to_string(),
//!         stock_quantity: 10.0,
//!     })
//!     .await?;
//!
//! let count = session.read(|state| state.raw_materials.items.len()).await;
//! assert_eq!(count, 1);
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod classifier;
pub mod config;
pub mod entity_store;
pub mod environment;
pub mod error;
pub mod lifecycle;
pub mod mocks;
pub mod planner;
pub mod reconciler;
pub mod reducers;
pub mod session;
pub mod state;
pub mod types;

pub use actions::{
    InventoryAction, ProductionAction, ProductsAction, RawMaterialsAction, SystemAction,
};
pub use config::{ConfigError, SyncSettings};
pub use environment::{ApiFuture, InventoryApi, InventoryEnvironment};
pub use error::{
    CriticalError, ErrorEnvelope, FieldError, ProblemDetail, TransportFailure, ValidationError,
};
pub use lifecycle::ResolutionPolicy;
pub use reconciler::{MaterialStatus, StalenessPolicy};
pub use reducers::InventoryReducer;
pub use session::{InventorySession, SessionError};
pub use state::{InventoryState, SystemState};
pub use types::{
    CorrelationId, MaterialAmount, MaterialsReplacement, NewProduct, NewRawMaterial, Product,
    ProductId, ProductMaterial, ProductPatch, ProductionSuggestion, RawMaterial, RawMaterialId,
};
