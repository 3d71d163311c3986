//! Server identity and health reducer.

use crate::actions::SystemAction;
use crate::classifier::classify;
use crate::environment::InventoryEnvironment;
use crate::lifecycle::{OperationKind, RequestKey};
use crate::state::SystemState;
use inventory_sync_core::effect::Effect;
use inventory_sync_core::reducer::Reducer;
use inventory_sync_core::{smallvec, SmallVec};
use std::sync::Arc;

/// Reducer for [`SystemState`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemReducer;

impl Reducer for SystemReducer {
    type State = SystemState;
    type Action = SystemAction;
    type Environment = InventoryEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            SystemAction::FetchWhoami { correlation_id } => {
                let ticket = state
                    .tracker
                    .begin(correlation_id, RequestKey::collection(OperationKind::Fetch));
                let api = Arc::clone(&env.api);

                smallvec![Effect::future(async move {
                    let result = api.fetch_whoami().await.map_err(|failure| classify(&failure));
                    Some(SystemAction::WhoamiFetched { ticket, result })
                })]
            },

            SystemAction::WhoamiFetched { ticket, result } => {
                if let Some(hostname) = state.tracker.settle(&ticket, result, env.settings.resolution) {
                    tracing::debug!(%hostname, "Server instance identified");
                    state.hostname = hostname;
                }
                SmallVec::new()
            },

            SystemAction::CheckHealth { correlation_id } => {
                let api = Arc::clone(&env.api);

                smallvec![Effect::future(async move {
                    let healthy = match api.check_health().await {
                        Ok(healthy) => healthy,
                        Err(failure) => {
                            tracing::debug!(%failure, "Health check failed");
                            false
                        },
                    };
                    Some(SystemAction::HealthChecked {
                        correlation_id,
                        healthy,
                    })
                })]
            },

            SystemAction::HealthChecked { healthy, .. } => {
                if state.healthy != healthy {
                    tracing::info!(healthy, "Server health changed");
                }
                state.healthy = healthy;
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportFailure;
    use crate::mocks::{Endpoint, InMemoryInventoryApi};
    use crate::state::DEFAULT_HOSTNAME;
    use crate::types::CorrelationId;
    use inventory_sync_testing::effects::collect_actions;
    use inventory_sync_testing::{assertions, ReducerTest};

    fn env(api: &InMemoryInventoryApi) -> InventoryEnvironment {
        InventoryEnvironment::new(Arc::new(api.clone()))
    }

    async fn run(api: &InMemoryInventoryApi, state: &mut SystemState, action: SystemAction) {
        let env = env(api);
        let effects = SystemReducer.reduce(state, action, &env);
        for action in collect_actions(effects).await {
            let _ = SystemReducer.reduce(state, action, &env);
        }
    }

    #[test]
    fn starts_healthy_on_localhost() {
        let state = SystemState::default();
        assert_eq!(state.hostname, DEFAULT_HOSTNAME);
        assert!(state.healthy);
        assert!(!state.request().loading);
    }

    #[test]
    fn whoami_begins_request() {
        ReducerTest::new(SystemReducer)
            .with_env(env(&InMemoryInventoryApi::new()))
            .given_state(SystemState::default())
            .when_action(SystemAction::FetchWhoami {
                correlation_id: CorrelationId::new(),
            })
            .then_state(|state| {
                assert!(state.request().loading);
                assert_eq!(state.request().error, None);
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn health_check_is_not_tracked() {
        ReducerTest::new(SystemReducer)
            .with_env(env(&InMemoryInventoryApi::new()))
            .given_state(SystemState::default())
            .when_action(SystemAction::CheckHealth {
                correlation_id: CorrelationId::new(),
            })
            .then_state(|state| assert!(!state.request().loading))
            .then_effects(|effects| assertions::assert_effects_count(effects, 1))
            .run();
    }

    #[tokio::test]
    async fn whoami_stores_hostname() {
        let api = InMemoryInventoryApi::new().with_pod("inventory-7f9c");
        let mut state = SystemState::default();

        run(
            &api,
            &mut state,
            SystemAction::FetchWhoami {
                correlation_id: CorrelationId::new(),
            },
        )
        .await;

        assert_eq!(state.hostname, "inventory-7f9c");
        assert!(!state.request().loading);
    }

    #[tokio::test]
    async fn failed_whoami_keeps_hostname_and_sets_error() {
        let api = InMemoryInventoryApi::new();
        api.fail_next(Endpoint::Whoami, TransportFailure::network("Network error"));
        let mut state = SystemState::default();

        run(
            &api,
            &mut state,
            SystemAction::FetchWhoami {
                correlation_id: CorrelationId::new(),
            },
        )
        .await;

        assert_eq!(state.hostname, DEFAULT_HOSTNAME);
        assert_eq!(state.request().error.as_deref(), Some("Network error"));
    }

    #[tokio::test]
    async fn unreachable_server_is_unhealthy() {
        let api = InMemoryInventoryApi::new();
        api.fail_next(Endpoint::Health, TransportFailure::network("connection refused"));
        let mut state = SystemState::default();

        run(
            &api,
            &mut state,
            SystemAction::CheckHealth {
                correlation_id: CorrelationId::new(),
            },
        )
        .await;
        assert!(!state.healthy);
        assert_eq!(state.request().error, None);

        run(
            &api,
            &mut state,
            SystemAction::CheckHealth {
                correlation_id: CorrelationId::new(),
            },
        )
        .await;
        assert!(state.healthy);
    }
}
