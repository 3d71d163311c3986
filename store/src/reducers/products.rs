//! Products collection reducer.
//!
//! Besides the plain entity operations this reducer owns the two material
//! list operations, whose success is applied through [`crate::reconciler`].

use crate::actions::ProductsAction;
use crate::classifier::classify;
use crate::entity_store::{apply_create, apply_delete, apply_fetch, apply_update};
use crate::environment::InventoryEnvironment;
use crate::lifecycle::{OperationKind, RequestKey};
use crate::reconciler;
use crate::state::ProductsState;
use inventory_sync_core::effect::Effect;
use inventory_sync_core::reducer::Reducer;
use inventory_sync_core::{smallvec, SmallVec};
use std::sync::Arc;

/// Reducer for [`ProductsState`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductsReducer;

impl Reducer for ProductsReducer {
    type State = ProductsState;
    type Action = ProductsAction;
    type Environment = InventoryEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per operation
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let policy = env.settings.resolution;

        match action {
            // ═══════════════════════════════════════════════════════════════
            // Commands
            // ═══════════════════════════════════════════════════════════════
            ProductsAction::Fetch { correlation_id } => {
                let ticket = state
                    .tracker
                    .begin(correlation_id, RequestKey::collection(OperationKind::Fetch));
                let api = Arc::clone(&env.api);

                smallvec![Effect::future(async move {
                    let result = api.fetch_products().await.map_err(|failure| classify(&failure));
                    Some(ProductsAction::Fetched { ticket, result })
                })]
            },

            ProductsAction::Create {
                correlation_id,
                input,
            } => {
                let ticket = state
                    .tracker
                    .begin(correlation_id, RequestKey::collection(OperationKind::Create));
                let api = Arc::clone(&env.api);

                smallvec![Effect::future(async move {
                    let result = api
                        .create_product(input)
                        .await
                        .map_err(|failure| classify(&failure));
                    Some(ProductsAction::Created { ticket, result })
                })]
            },

            ProductsAction::Update {
                correlation_id,
                id,
                patch,
            } => {
                let ticket = state
                    .tracker
                    .begin(correlation_id, RequestKey::entity(OperationKind::Update, &id));
                let api = Arc::clone(&env.api);

                smallvec![Effect::future(async move {
                    let result = api
                        .update_product(id.clone(), patch)
                        .await
                        .map_err(|failure| classify(&failure));
                    Some(ProductsAction::Updated { ticket, id, result })
                })]
            },

            ProductsAction::Delete { correlation_id, id } => {
                let ticket = state
                    .tracker
                    .begin(correlation_id, RequestKey::entity(OperationKind::Delete, &id));
                let api = Arc::clone(&env.api);

                smallvec![Effect::future(async move {
                    let result = api
                        .delete_product(id.clone())
                        .await
                        .map_err(|failure| classify(&failure));
                    Some(ProductsAction::Deleted { ticket, id, result })
                })]
            },

            ProductsAction::ReplaceMaterials {
                correlation_id,
                product_id,
                replacement,
            } => {
                let ticket = state.tracker.begin(
                    correlation_id,
                    RequestKey::entity(OperationKind::ReplaceMaterials, &product_id),
                );
                let api = Arc::clone(&env.api);

                smallvec![Effect::future(async move {
                    let result = api
                        .replace_product_materials(product_id.clone(), replacement)
                        .await
                        .map_err(|failure| classify(&failure));
                    Some(ProductsAction::MaterialsReplaced {
                        ticket,
                        product_id,
                        result,
                    })
                })]
            },

            ProductsAction::DeleteMaterial {
                correlation_id,
                product_id,
                material_id,
            } => {
                let ticket = state.tracker.begin(
                    correlation_id,
                    RequestKey::entity(
                        OperationKind::DeleteMaterial,
                        format!("{product_id}/{material_id}"),
                    ),
                );
                let api = Arc::clone(&env.api);

                smallvec![Effect::future(async move {
                    let result = api
                        .delete_product_material(product_id.clone(), material_id.clone())
                        .await
                        .map_err(|failure| classify(&failure));
                    Some(ProductsAction::MaterialDeleted {
                        ticket,
                        product_id,
                        material_id,
                        result,
                    })
                })]
            },

            // ═══════════════════════════════════════════════════════════════
            // Resolutions
            // ═══════════════════════════════════════════════════════════════
            ProductsAction::Fetched { ticket, result } => {
                if let Some(items) = state.tracker.settle(&ticket, result, policy) {
                    tracing::debug!(count = items.len(), "Products fetched");
                    apply_fetch(&mut state.items, items);
                }
                SmallVec::new()
            },

            ProductsAction::Created { ticket, result } => {
                if let Some(created) = state.tracker.settle(&ticket, result, policy) {
                    tracing::debug!(id = %created.id, "Product created");
                    apply_create(&mut state.items, created);
                }
                SmallVec::new()
            },

            ProductsAction::Updated { ticket, id, result } => {
                if let Some(updated) = state.tracker.settle(&ticket, result, policy) {
                    let applied = apply_update(&mut state.items, &id, updated);
                    tracing::debug!(%id, applied, "Product updated");
                }
                SmallVec::new()
            },

            ProductsAction::Deleted { ticket, id, result } => {
                if state.tracker.settle(&ticket, result, policy).is_some() {
                    let applied = apply_delete(&mut state.items, &id);
                    tracing::debug!(%id, applied, "Product deleted");
                }
                SmallVec::new()
            },

            ProductsAction::MaterialsReplaced {
                ticket,
                product_id,
                result,
            } => {
                if let Some(materials) = state.tracker.settle(&ticket, result, policy) {
                    let count = materials.len();
                    let applied =
                        reconciler::replace_materials(&mut state.items, &product_id, materials);
                    tracing::debug!(%product_id, count, applied, "Product materials replaced");
                }
                SmallVec::new()
            },

            ProductsAction::MaterialDeleted {
                ticket,
                product_id,
                material_id,
                result,
            } => {
                if state.tracker.settle(&ticket, result, policy).is_some() {
                    let applied =
                        reconciler::remove_material(&mut state.items, &product_id, &material_id);
                    tracing::debug!(%product_id, %material_id, applied, "Product material removed");
                }
                SmallVec::new()
            },
        }
    }
}
