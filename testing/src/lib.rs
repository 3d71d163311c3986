//! # Inventory Sync Testing
//!
//! Testing utilities for reducers built on `inventory-sync-core`.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given-When-Then harness for a single reducer step
//! - [`assertions`]: effect assertions
//! - [`effects`]: drive returned effects to completion without a Store, so a
//!   test can feed resolutions back in whatever order it wants
//!
//! ## Example
//!
//! ```ignore
//! use inventory_sync_testing::{effects::collect_actions, ReducerTest};
//!
//! let mut state = RawMaterialsState::default();
//! let effects = reducer.reduce(&mut state, command, &env);
//! let resolutions = collect_actions(effects).await;
//!
//! // Resume out of order
//! for action in resolutions.into_iter().rev() {
//!     let _ = reducer.reduce(&mut state, action, &env);
//! }
//! ```


pub use reducer_test::{assertions, ReducerTest};

/// Helpers for executing effect descriptions inside tests
pub mod effects {
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use inventory_sync_core::Effect;

    /// Run every effect to completion and return the produced actions
    ///
    /// `Parallel` effects are flattened; actions come back in declaration
    /// order, which lets the caller choose the order they resume in.
    pub async fn collect_actions<A, I>(effects: I) -> Vec<A>
    where
        I: IntoIterator<Item = Effect<A>>,
        A: Send + 'static,
    {
        let mut actions = Vec::new();
        for effect in effects {
            actions.extend(run(effect).await);
        }
        actions
    }

    /// Run a single effect, returning its actions
    pub fn run<A>(effect: Effect<A>) -> BoxFuture<'static, Vec<A>>
    where
        A: Send + 'static,
    {
        async move {
            match effect {
                Effect::None => Vec::new(),
                Effect::Future(fut) => fut.await.into_iter().collect(),
                Effect::Parallel(effects) => {
                    let mut actions = Vec::new();
                    for effect in effects {
                        actions.extend(run(effect).await);
                    }
                    actions
                },
            }
        }
        .boxed()
    }
}

/// Install a `tracing` subscriber that writes through the test harness
///
/// Honors `RUST_LOG`. Safe to call from every test; only the first call
/// installs the subscriber.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inventory_sync=debug".into()),
        )
        .with_test_writer()
        .try_init();
}
