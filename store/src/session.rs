//! Request/response facade over the inventory [`Store`].
//!
//! Each method dispatches one command under a fresh [`CorrelationId`] and
//! waits for the resolution carrying the same ID, so callers get the
//! classified outcome of *their* request:
//!
//! ```ignore
//! let session = InventorySession::new(InventoryEnvironment::new(api));
//!
//! match session.create_raw_material(input).await {
//!     Ok(created) => println!("created {}", created.id),
//!     Err(SessionError::Rejected(ErrorEnvelope::Validation(validation))) => {
//!         for (field, message) in validation.form_errors() {
//!             println!("{field}: {message}");
//!         }
//!     },
//!     Err(other) => eprintln!("{other}"),
//! }
//! ```
//!
//! The store is updated before the method returns. Under
//! [`crate::lifecycle::ResolutionPolicy::LastIssuedWins`] a superseded
//! resolution leaves the store untouched, but its caller still receives the
//! server's answer.

use crate::actions::{
    InventoryAction, ProductionAction, ProductsAction, RawMaterialsAction, SystemAction,
};
use crate::environment::InventoryEnvironment;
use crate::error::ErrorEnvelope;
use crate::reducers::InventoryReducer;
use crate::state::InventoryState;
use crate::types::{
    CorrelationId, MaterialsReplacement, NewProduct, NewRawMaterial, Product, ProductId,
    ProductMaterial, ProductPatch, ProductionSuggestion, RawMaterial, RawMaterialId,
};
use inventory_sync_runtime::store::DEFAULT_BROADCAST_CAPACITY;
use inventory_sync_runtime::{Store, StoreError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;

/// The store type driven by [`InventorySession`]
pub type InventoryStore = Store<InventoryState, InventoryAction, InventoryEnvironment, InventoryReducer>;

/// Number of fetches started by a refresh
const REFRESH_FETCHES: usize = 3;

/// Session error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The operation failed; the store already reflects the failure
    #[error("Request failed: {0}")]
    Rejected(ErrorEnvelope),

    /// The store refused the command or the wait ended
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A resolution with the right correlation ID but the wrong shape
    #[error("Unexpected resolution action")]
    UnexpectedResponse,
}

impl SessionError {
    /// The classified failure, when the server or network rejected the request
    #[must_use]
    pub const fn envelope(&self) -> Option<&ErrorEnvelope> {
        match self {
            Self::Rejected(envelope) => Some(envelope),
            Self::Store(_) | Self::UnexpectedResponse => None,
        }
    }
}

/// Resolution payload of a single operation
type Extract<T> = fn(InventoryAction) -> Option<Result<T, ErrorEnvelope>>;

/// Entry point for applications
///
/// Owns the store; cloning the session shares it.
#[derive(Clone)]
pub struct InventorySession {
    store: InventoryStore,
    wait_timeout: Option<Duration>,
}

impl InventorySession {
    /// Create a session with an empty mirror
    #[must_use]
    pub fn new(environment: InventoryEnvironment) -> Self {
        Self::with_broadcast_capacity(environment, DEFAULT_BROADCAST_CAPACITY)
    }

    /// Create a session whose store buffers up to `capacity` resolutions
    ///
    /// A caller that falls further behind gets [`StoreError::Lagged`].
    #[must_use]
    pub fn with_broadcast_capacity(environment: InventoryEnvironment, capacity: usize) -> Self {
        let wait_timeout = environment.settings.wait_timeout;
        tracing::info!(settings = ?environment.settings, capacity, "Starting inventory session");

        Self {
            store: Store::with_broadcast_capacity(
                InventoryState::default(),
                InventoryReducer::new(),
                environment,
                capacity,
            ),
            wait_timeout,
        }
    }

    /// The underlying store, for observers and custom commands
    #[must_use]
    pub const fn store(&self) -> &InventoryStore {
        &self.store
    }

    /// Clone of the whole mirror
    pub async fn snapshot(&self) -> InventoryState {
        self.store.state(Clone::clone).await
    }

    /// Read the mirror through a selector
    pub async fn read<F, T>(&self, selector: F) -> T
    where
        F: FnOnce(&InventoryState) -> T,
    {
        self.store.state(selector).await
    }

    /// Stop accepting commands and wait for in-flight operations
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if operations are still
    /// running after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), SessionError> {
        Ok(self.store.shutdown(timeout).await?)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Raw materials
    // ═══════════════════════════════════════════════════════════════════════

    /// Load the raw materials collection
    ///
    /// # Errors
    ///
    /// [`SessionError::Rejected`] with the classified failure, or a
    /// [`SessionError::Store`] error if the wait could not complete.
    pub async fn fetch_raw_materials(&self) -> Result<Vec<RawMaterial>, SessionError> {
        let correlation_id = CorrelationId::new();
        self.request(
            RawMaterialsAction::Fetch { correlation_id }.into(),
            correlation_id,
            |action| match action {
                InventoryAction::RawMaterials(RawMaterialsAction::Fetched { result, .. }) => {
                    Some(result)
                },
                _ => None,
            },
        )
        .await
    }

    /// Create a raw material
    ///
    /// # Errors
    ///
    /// See [`InventorySession::fetch_raw_materials`].
    pub async fn create_raw_material(
        &self,
        input: NewRawMaterial,
    ) -> Result<RawMaterial, SessionError> {
        let correlation_id = CorrelationId::new();
        self.request(
            RawMaterialsAction::Create {
                correlation_id,
                input,
            }
            .into(),
            correlation_id,
            |action| match action {
                InventoryAction::RawMaterials(RawMaterialsAction::Created { result, .. }) => {
                    Some(result)
                },
                _ => None,
            },
        )
        .await
    }

    /// Update a raw material's name and stock
    ///
    /// # Errors
    ///
    /// See [`InventorySession::fetch_raw_materials`].
    pub async fn update_raw_material(
        &self,
        material: RawMaterial,
    ) -> Result<RawMaterial, SessionError> {
        let correlation_id = CorrelationId::new();
        self.request(
            RawMaterialsAction::Update {
                correlation_id,
                material,
            }
            .into(),
            correlation_id,
            |action| match action {
                InventoryAction::RawMaterials(RawMaterialsAction::Updated { result, .. }) => {
                    Some(result)
                },
                _ => None,
            },
        )
        .await
    }

    /// Delete a raw material
    ///
    /// # Errors
    ///
    /// See [`InventorySession::fetch_raw_materials`].
    pub async fn delete_raw_material(&self, id: RawMaterialId) -> Result<(), SessionError> {
        let correlation_id = CorrelationId::new();
        self.request(
            RawMaterialsAction::Delete { correlation_id, id }.into(),
            correlation_id,
            |action| match action {
                InventoryAction::RawMaterials(RawMaterialsAction::Deleted { result, .. }) => {
                    Some(result)
                },
                _ => None,
            },
        )
        .await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Products
    // ═══════════════════════════════════════════════════════════════════════

    /// Load the products collection
    ///
    /// # Errors
    ///
    /// See [`InventorySession::fetch_raw_materials`].
    pub async fn fetch_products(&self) -> Result<Vec<Product>, SessionError> {
        let correlation_id = CorrelationId::new();
        self.request(
            ProductsAction::Fetch { correlation_id }.into(),
            correlation_id,
            |action| match action {
                InventoryAction::Products(ProductsAction::Fetched { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Create a product with its materials
    ///
    /// # Errors
    ///
    /// See [`InventorySession::fetch_raw_materials`].
    pub async fn create_product(&self, input: NewProduct) -> Result<Product, SessionError> {
        let correlation_id = CorrelationId::new();
        self.request(
            ProductsAction::Create {
                correlation_id,
                input,
            }
            .into(),
            correlation_id,
            |action| match action {
                InventoryAction::Products(ProductsAction::Created { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Update a product's name and/or price
    ///
    /// # Errors
    ///
    /// See [`InventorySession::fetch_raw_materials`].
    pub async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Product, SessionError> {
        let correlation_id = CorrelationId::new();
        self.request(
            ProductsAction::Update {
                correlation_id,
                id,
                patch,
            }
            .into(),
            correlation_id,
            |action| match action {
                InventoryAction::Products(ProductsAction::Updated { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Delete a product
    ///
    /// # Errors
    ///
    /// See [`InventorySession::fetch_raw_materials`].
    pub async fn delete_product(&self, id: ProductId) -> Result<(), SessionError> {
        let correlation_id = CorrelationId::new();
        self.request(
            ProductsAction::Delete { correlation_id, id }.into(),
            correlation_id,
            |action| match action {
                InventoryAction::Products(ProductsAction::Deleted { result, .. }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    /// Replace a product's material list
    ///
    /// # Errors
    ///
    /// See [`InventorySession::fetch_raw_materials`].
    pub async fn replace_product_materials(
        &self,
        product_id: ProductId,
        replacement: MaterialsReplacement,
    ) -> Result<Vec<ProductMaterial>, SessionError> {
        let correlation_id = CorrelationId::new();
        self.request(
            ProductsAction::ReplaceMaterials {
                correlation_id,
                product_id,
                replacement,
            }
            .into(),
            correlation_id,
            |action| match action {
                InventoryAction::Products(ProductsAction::MaterialsReplaced { result, .. }) => {
                    Some(result)
                },
                _ => None,
            },
        )
        .await
    }

    /// Remove one material from a product
    ///
    /// # Errors
    ///
    /// See [`InventorySession::fetch_raw_materials`].
    pub async fn delete_product_material(
        &self,
        product_id: ProductId,
        material_id: RawMaterialId,
    ) -> Result<(), SessionError> {
        let correlation_id = CorrelationId::new();
        self.request(
            ProductsAction::DeleteMaterial {
                correlation_id,
                product_id,
                material_id,
            }
            .into(),
            correlation_id,
            |action| match action {
                InventoryAction::Products(ProductsAction::MaterialDeleted { result, .. }) => {
                    Some(result)
                },
                _ => None,
            },
        )
        .await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Production
    // ═══════════════════════════════════════════════════════════════════════

    /// Load the server-computed production suggestions
    ///
    /// # Errors
    ///
    /// See [`InventorySession::fetch_raw_materials`].
    pub async fn fetch_production_suggestions(
        &self,
    ) -> Result<Vec<ProductionSuggestion>, SessionError> {
        let correlation_id = CorrelationId::new();
        self.request(
            ProductionAction::FetchSuggestions { correlation_id }.into(),
            correlation_id,
            |action| match action {
                InventoryAction::Production(ProductionAction::SuggestionsFetched {
                    result, ..
                }) => Some(result),
                _ => None,
            },
        )
        .await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Server
    // ═══════════════════════════════════════════════════════════════════════

    /// Ask which server instance is answering and record its host name
    ///
    /// # Errors
    ///
    /// See [`InventorySession::fetch_raw_materials`].
    pub async fn fetch_whoami(&self) -> Result<String, SessionError> {
        let correlation_id = CorrelationId::new();
        self.request(
            SystemAction::FetchWhoami { correlation_id }.into(),
            correlation_id,
            |action| match action {
                InventoryAction::System(SystemAction::WhoamiFetched { result, .. }) => {
                    Some(result)
                },
                _ => None,
            },
        )
        .await
    }

    /// Check server health and record the outcome
    ///
    /// A server that cannot be reached is reported as unhealthy, not as an
    /// error.
    ///
    /// # Errors
    ///
    /// Only [`SessionError::Store`], if the wait could not complete.
    pub async fn check_health(&self) -> Result<bool, SessionError> {
        let correlation_id = CorrelationId::new();
        self.request(
            SystemAction::CheckHealth { correlation_id }.into(),
            correlation_id,
            |action| match action {
                InventoryAction::System(SystemAction::HealthChecked { healthy, .. }) => {
                    Some(Ok(healthy))
                },
                _ => None,
            },
        )
        .await
    }

    /// Fetch all three collections concurrently
    ///
    /// Waits for every fetch to resolve; each collection records its own
    /// outcome.
    ///
    /// # Errors
    ///
    /// The first failure observed, as [`SessionError::Rejected`], or
    /// [`StoreError::Lagged`] if a resolution was dropped from the action
    /// broadcast before it could be observed.
    pub async fn refresh(&self) -> Result<(), SessionError> {
        let correlation_id = CorrelationId::new();
        let mut rx = self.store.subscribe_actions();

        self.store
            .send(InventoryAction::Refresh { correlation_id })
            .await?;

        let collect = async {
            let mut first_failure = None;
            let mut resolved = 0;

            while resolved < REFRESH_FETCHES {
                let action = match rx.recv().await {
                    Ok(action) => action,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Refresh observer lagged");
                        return Err(SessionError::Store(StoreError::Lagged(skipped)));
                    },
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(SessionError::Store(StoreError::ChannelClosed));
                    },
                };
                if !action.resolves(correlation_id) {
                    continue;
                }

                resolved += 1;
                if first_failure.is_none() {
                    first_failure = resolution_failure(action);
                }
            }

            first_failure.map_or(Ok(()), |failure| Err(SessionError::Rejected(failure)))
        };

        match self.wait_timeout {
            Some(limit) => tokio::time::timeout(limit, collect)
                .await
                .map_err(|_| SessionError::Store(StoreError::Timeout))?,
            None => collect.await,
        }
    }

    /// Send `command` and map its resolution through `extract`
    async fn request<T>(
        &self,
        command: InventoryAction,
        correlation_id: CorrelationId,
        extract: Extract<T>,
    ) -> Result<T, SessionError> {
        let resolution = self
            .store
            .send_and_wait_for(command, |action| action.resolves(correlation_id), self.wait_timeout)
            .await?;

        match extract(resolution) {
            Some(Ok(value)) => Ok(value),
            Some(Err(failure)) => Err(SessionError::Rejected(failure)),
            None => {
                tracing::error!(%correlation_id, "Resolution does not match its command");
                Err(SessionError::UnexpectedResponse)
            },
        }
    }
}

impl std::fmt::Debug for InventorySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventorySession")
            .field("wait_timeout", &self.wait_timeout)
            .finish_non_exhaustive()
    }
}

/// The failure carried by a fetch resolution, if any
fn resolution_failure(action: InventoryAction) -> Option<ErrorEnvelope> {
    match action {
        InventoryAction::RawMaterials(RawMaterialsAction::Fetched { result, .. }) => result.err(),
        InventoryAction::Products(ProductsAction::Fetched { result, .. }) => result.err(),
        InventoryAction::Production(ProductionAction::SuggestionsFetched { result, .. }) => {
            result.err()
        },
        _ => None,
    }
}
