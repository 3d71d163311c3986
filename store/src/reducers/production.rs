//! Production suggestions reducer.

use crate::actions::ProductionAction;
use crate::classifier::classify;
use crate::environment::InventoryEnvironment;
use crate::lifecycle::{OperationKind, RequestKey};
use crate::state::ProductionState;
use inventory_sync_core::effect::Effect;
use inventory_sync_core::reducer::Reducer;
use inventory_sync_core::{smallvec, SmallVec};
use std::sync::Arc;

/// Reducer for [`ProductionState`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductionReducer;

impl Reducer for ProductionReducer {
    type State = ProductionState;
    type Action = ProductionAction;
    type Environment = InventoryEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            ProductionAction::FetchSuggestions { correlation_id } => {
                let ticket = state
                    .tracker
                    .begin(correlation_id, RequestKey::collection(OperationKind::Fetch));
                let api = Arc::clone(&env.api);

                smallvec![Effect::future(async move {
                    let result = api
                        .fetch_production_suggestions()
                        .await
                        .map_err(|failure| classify(&failure));
                    Some(ProductionAction::SuggestionsFetched { ticket, result })
                })]
            },

            ProductionAction::SuggestionsFetched { ticket, result } => {
                if let Some(suggestions) =
                    state.tracker.settle(&ticket, result, env.settings.resolution)
                {
                    tracing::debug!(count = suggestions.len(), "Production suggestions fetched");
                    state.suggestions = suggestions;
                }
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorEnvelope, TransportFailure};
    use crate::mocks::{Endpoint, InMemoryInventoryApi};
    use crate::types::{CorrelationId, Product, ProductId, ProductMaterial, RawMaterial, RawMaterialId};
    use inventory_sync_testing::effects::collect_actions;

    fn seeded() -> InMemoryInventoryApi {
        let iron = RawMaterial {
            id: RawMaterialId::new("1"),
            name: "Iron".to_string(),
            stock_quantity: 10.0,
        };
        InMemoryInventoryApi::new()
            .with_raw_materials(vec![iron.clone()])
            .with_products(vec![Product {
                id: ProductId::new("1"),
                name: "Bracket".to_string(),
                price: 3.0,
                materials: vec![ProductMaterial {
                    raw_material: iron,
                    required_quantity: 4.0,
                }],
            }])
    }

    async fn fetch(api: InMemoryInventoryApi) -> ProductionState {
        let env = InventoryEnvironment::new(Arc::new(api));
        let mut state = ProductionState::default();
        let effects = ProductionReducer.reduce(
            &mut state,
            ProductionAction::FetchSuggestions {
                correlation_id: CorrelationId::new(),
            },
            &env,
        );
        assert!(state.request().loading);

        for action in collect_actions(effects).await {
            let _ = ProductionReducer.reduce(&mut state, action, &env);
        }
        state
    }

    #[tokio::test]
    async fn suggestions_are_stored() {
        let state = fetch(seeded()).await;
        assert_eq!(state.suggestions.len(), 1);
        assert_eq!(state.suggestions[0].quantity_to_produce, 2);
        assert_eq!(state.suggestions[0].total_value, 6.0);
        assert!(!state.request().loading);
    }

    #[tokio::test]
    async fn failure_keeps_previous_suggestions_and_sets_error() {
        let api = seeded();
        api.fail_next(Endpoint::ProductionSuggestions, TransportFailure::network("timed out"));

        let state = fetch(api).await;
        assert!(state.suggestions.is_empty());
        assert_eq!(state.request().error.as_deref(), Some("timed out"));

        let envelope = crate::classifier::classify(&TransportFailure::network("timed out"));
        assert!(matches!(envelope, ErrorEnvelope::Critical(_)));
    }
}
