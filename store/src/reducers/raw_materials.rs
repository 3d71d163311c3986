//! Raw materials collection reducer.

use crate::actions::RawMaterialsAction;
use crate::classifier::classify;
use crate::entity_store::{apply_create, apply_delete, apply_fetch, apply_update};
use crate::environment::InventoryEnvironment;
use crate::lifecycle::{OperationKind, RequestKey};
use crate::state::RawMaterialsState;
use inventory_sync_core::effect::Effect;
use inventory_sync_core::reducer::Reducer;
use inventory_sync_core::{smallvec, SmallVec};
use std::sync::Arc;

/// Reducer for [`RawMaterialsState`]
///
/// Raw material updates and deletes only touch this collection. Snapshots
/// embedded in products are left alone (see [`crate::reconciler`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct RawMaterialsReducer;

impl Reducer for RawMaterialsReducer {
    type State = RawMaterialsState;
    type Action = RawMaterialsAction;
    type Environment = InventoryEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let policy = env.settings.resolution;

        match action {
            // ═══════════════════════════════════════════════════════════════
            // Commands: begin the request, describe the round-trip
            // ═══════════════════════════════════════════════════════════════
            RawMaterialsAction::Fetch { correlation_id } => {
                let ticket = state
                    .tracker
                    .begin(correlation_id, RequestKey::collection(OperationKind::Fetch));
                let api = Arc::clone(&env.api);

                smallvec![Effect::future(async move {
                    let result = api
                        .fetch_raw_materials()
                        .await
                        .map_err(|failure| classify(&failure));
                    Some(RawMaterialsAction::Fetched { ticket, result })
                })]
            },

            RawMaterialsAction::Create {
                correlation_id,
                input,
            } => {
                let ticket = state
                    .tracker
                    .begin(correlation_id, RequestKey::collection(OperationKind::Create));
                let api = Arc::clone(&env.api);

                smallvec![Effect::future(async move {
                    let result = api
                        .create_raw_material(input)
                        .await
                        .map_err(|failure| classify(&failure));
                    Some(RawMaterialsAction::Created { ticket, result })
                })]
            },

            RawMaterialsAction::Update {
                correlation_id,
                material,
            } => {
                let id = material.id.clone();
                let ticket = state
                    .tracker
                    .begin(correlation_id, RequestKey::entity(OperationKind::Update, &id));
                let api = Arc::clone(&env.api);

                smallvec![Effect::future(async move {
                    let result = api
                        .update_raw_material(material)
                        .await
                        .map_err(|failure| classify(&failure));
                    Some(RawMaterialsAction::Updated { ticket, id, result })
                })]
            },

            RawMaterialsAction::Delete { correlation_id, id } => {
                let ticket = state
                    .tracker
                    .begin(correlation_id, RequestKey::entity(OperationKind::Delete, &id));
                let api = Arc::clone(&env.api);

                smallvec![Effect::future(async move {
                    let result = api
                        .delete_raw_material(id.clone())
                        .await
                        .map_err(|failure| classify(&failure));
                    Some(RawMaterialsAction::Deleted { ticket, id, result })
                })]
            },

            // ═══════════════════════════════════════════════════════════════
            // Resolutions: settle the request, apply the result
            // ═══════════════════════════════════════════════════════════════
            RawMaterialsAction::Fetched { ticket, result } => {
                if let Some(items) = state.tracker.settle(&ticket, result, policy) {
                    tracing::debug!(count = items.len(), "Raw materials fetched");
                    apply_fetch(&mut state.items, items);
                    state.loaded = true;
                }
                SmallVec::new()
            },

            RawMaterialsAction::Created { ticket, result } => {
                if let Some(created) = state.tracker.settle(&ticket, result, policy) {
                    tracing::debug!(id = %created.id, "Raw material created");
                    apply_create(&mut state.items, created);
                }
                SmallVec::new()
            },

            RawMaterialsAction::Updated { ticket, id, result } => {
                if let Some(updated) = state.tracker.settle(&ticket, result, policy) {
                    let applied = apply_update(&mut state.items, &id, updated);
                    tracing::debug!(%id, applied, "Raw material updated");
                }
                SmallVec::new()
            },

            RawMaterialsAction::Deleted { ticket, id, result } => {
                if state.tracker.settle(&ticket, result, policy).is_some() {
                    let applied = apply_delete(&mut state.items, &id);
                    tracing::debug!(%id, applied, "Raw material deleted");
                }
                SmallVec::new()
            },
        }
    }
}
