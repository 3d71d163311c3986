//! Root reducer.

use super::{ProductionReducer, ProductsReducer, RawMaterialsReducer, SystemReducer};
use crate::actions::{
    InventoryAction, ProductionAction, ProductsAction, RawMaterialsAction, SystemAction,
};
use crate::environment::InventoryEnvironment;
use crate::reconciler::{self, StalenessPolicy};
use crate::state::{
    InventoryState, ProductionState, ProductsState, RawMaterialsState, SystemState,
};
use crate::types::CorrelationId;
use inventory_sync_core::composition::{combine_reducers, scope_reducer, CombinedReducer};
use inventory_sync_core::effect::Effect;
use inventory_sync_core::reducer::Reducer;
use inventory_sync_core::{smallvec, SmallVec};
use std::sync::Arc;

fn raw_materials_state(state: &mut InventoryState) -> &mut RawMaterialsState {
    &mut state.raw_materials
}

fn products_state(state: &mut InventoryState) -> &mut ProductsState {
    &mut state.products
}

fn production_state(state: &mut InventoryState) -> &mut ProductionState {
    &mut state.production
}

fn system_state(state: &mut InventoryState) -> &mut SystemState {
    &mut state.system
}

// `Refresh` fans out into one fetch per collection, sharing the caller's
// correlation ID. The root reducer runs the three fetches as one parallel
// effect.

fn raw_materials_action(action: InventoryAction) -> Option<RawMaterialsAction> {
    match action {
        InventoryAction::RawMaterials(action) => Some(action),
        InventoryAction::Refresh { correlation_id } => {
            Some(RawMaterialsAction::Fetch { correlation_id })
        },
        _ => None,
    }
}

fn products_action(action: InventoryAction) -> Option<ProductsAction> {
    match action {
        InventoryAction::Products(action) => Some(action),
        InventoryAction::Refresh { correlation_id } => Some(ProductsAction::Fetch { correlation_id }),
        _ => None,
    }
}

fn production_action(action: InventoryAction) -> Option<ProductionAction> {
    match action {
        InventoryAction::Production(action) => Some(action),
        InventoryAction::Refresh { correlation_id } => {
            Some(ProductionAction::FetchSuggestions { correlation_id })
        },
        _ => None,
    }
}

fn system_action(action: InventoryAction) -> Option<SystemAction> {
    match action {
        InventoryAction::System(action) => Some(action),
        _ => None,
    }
}

/// Cross-entity reactions, run after the collection reducers
///
/// Under [`StalenessPolicy::RefetchProducts`], an applied raw material
/// delete that some loaded product still references triggers a products
/// fetch under a fresh correlation ID. Under [`StalenessPolicy::Retain`]
/// this reducer does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconciliationReducer;

impl Reducer for ReconciliationReducer {
    type State = InventoryState;
    type Action = InventoryAction;
    type Environment = InventoryEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        if env.settings.staleness != StalenessPolicy::RefetchProducts {
            return SmallVec::new();
        }

        let InventoryAction::RawMaterials(RawMaterialsAction::Deleted {
            ticket,
            id,
            result: Ok(()),
        }) = action
        else {
            return SmallVec::new();
        };

        if !state
            .raw_materials
            .tracker
            .admits(&ticket, env.settings.resolution)
            || !reconciler::is_referenced(&state.products.items, &id)
        {
            return SmallVec::new();
        }

        let correlation_id = CorrelationId::new();
        tracing::info!(
            material_id = %id,
            %correlation_id,
            "Deleted raw material is still referenced, refetching products"
        );

        smallvec![Effect::future(async move {
            Some(InventoryAction::Products(ProductsAction::Fetch { correlation_id }))
        })]
    }
}

/// The root reducer over [`InventoryState`]
///
/// Runs the raw materials, products and production reducers, each scoped to
/// its own slice, followed by [`ReconciliationReducer`].
#[derive(Clone)]
pub struct InventoryReducer {
    inner: CombinedReducer<InventoryState, InventoryAction, InventoryEnvironment>,
}

impl InventoryReducer {
    /// Build the reducer tree
    #[must_use]
    pub fn new() -> Self {
        let inner = combine_reducers(vec![
            Arc::new(scope_reducer(
                RawMaterialsReducer,
                raw_materials_state,
                raw_materials_action,
                InventoryAction::RawMaterials,
            )),
            Arc::new(scope_reducer(
                ProductsReducer,
                products_state,
                products_action,
                InventoryAction::Products,
            )),
            Arc::new(scope_reducer(
                ProductionReducer,
                production_state,
                production_action,
                InventoryAction::Production,
            )),
            Arc::new(scope_reducer(
                SystemReducer,
                system_state,
                system_action,
                InventoryAction::System,
            )),
            Arc::new(ReconciliationReducer),
        ]);

        Self { inner }
    }
}

impl Default for InventoryReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InventoryReducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryReducer").finish_non_exhaustive()
    }
}

impl Reducer for InventoryReducer {
    type State = InventoryState;
    type Action = InventoryAction;
    type Environment = InventoryEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        if let InventoryAction::Refresh { correlation_id } = action {
            tracing::debug!(%correlation_id, "Refreshing all collections");
            let fetches = self.inner.reduce(state, InventoryAction::Refresh { correlation_id }, env);
            return smallvec![Effect::merge(fetches.into_vec())];
        }

        self.inner.reduce(state, action, env)
    }
}
