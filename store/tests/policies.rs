//! Resolution ordering, refresh and staleness settings.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use inventory_sync_store::mocks::{Endpoint, InMemoryInventoryApi};
use inventory_sync_store::{
    CorrelationId, ErrorEnvelope, InventoryAction, InventoryEnvironment, InventorySession,
    Product, ProductId, ProductMaterial, ProductsAction, RawMaterial, RawMaterialId,
    RawMaterialsAction, ResolutionPolicy, SessionError, StalenessPolicy, SyncSettings,
    TransportFailure,
};
use std::sync::Arc;
use std::time::Duration;

fn iron(stock: f64) -> RawMaterial {
    RawMaterial {
        id: RawMaterialId::new("1"),
        name: "Iron".to_string(),
        stock_quantity: stock,
    }
}

fn session(api: &InMemoryInventoryApi, settings: SyncSettings) -> InventorySession {
    inventory_sync_testing::init_test_tracing();
    InventorySession::new(
        InventoryEnvironment::new(Arc::new(api.clone())).with_settings(settings),
    )
}

/// Issue two updates of the same raw material; the first one resolves last
async fn racing_updates(policy: ResolutionPolicy) -> (InventorySession, Vec<InventoryAction>) {
    let api = InMemoryInventoryApi::new().with_raw_materials(vec![iron(10.0)]);
    let session = session(&api, SyncSettings::default().with_resolution(policy));
    session.fetch_raw_materials().await.unwrap();

    api.delay_next(Endpoint::UpdateRawMaterial, Duration::from_millis(100));

    let first = CorrelationId::new();
    let second = CorrelationId::new();
    let mut rx = session.store().subscribe_actions();

    for (correlation_id, stock) in [(first, 1.0), (second, 2.0)] {
        session
            .store()
            .send(
                RawMaterialsAction::Update {
                    correlation_id,
                    material: iron(stock),
                }
                .into(),
            )
            .await
            .unwrap();
    }

    let mut resolutions = Vec::new();
    while resolutions.len() < 2 {
        let action = rx.recv().await.unwrap();
        if action.resolves(first) || action.resolves(second) {
            resolutions.push(action);
        }
    }

    assert!(resolutions[0].resolves(second), "second update should resolve first");
    (session, resolutions)
}

#[tokio::test]
async fn last_resumed_wins_applies_late_resolution() {
    let (session, _) = racing_updates(ResolutionPolicy::LastResumedWins).await;

    let stock = session.read(|state| state.raw_materials.items[0].stock_quantity).await;
    assert_eq!(stock, 1.0);
}

#[tokio::test]
async fn last_issued_wins_discards_superseded_resolution() {
    let (session, _) = racing_updates(ResolutionPolicy::LastIssuedWins).await;

    let state = session.snapshot().await;
    assert_eq!(state.raw_materials.items[0].stock_quantity, 2.0);
    assert!(!state.raw_materials.request().loading);
}

#[tokio::test]
async fn superseded_caller_still_gets_server_answer() {
    let api = InMemoryInventoryApi::new().with_raw_materials(vec![iron(10.0)]);
    let session = session(
        &api,
        SyncSettings::default().with_resolution(ResolutionPolicy::LastIssuedWins),
    );
    session.fetch_raw_materials().await.unwrap();
    api.delay_next(Endpoint::UpdateRawMaterial, Duration::from_millis(100));

    let slow = {
        let session = session.clone();
        tokio::spawn(async move { session.update_raw_material(iron(1.0)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    let fast = session.update_raw_material(iron(2.0)).await.unwrap();
    let slow = slow.await.unwrap().unwrap();

    assert_eq!(fast.stock_quantity, 2.0);
    assert_eq!(slow.stock_quantity, 1.0);
    let stock = session.read(|state| state.raw_materials.items[0].stock_quantity).await;
    assert_eq!(stock, 2.0);
}

#[tokio::test]
async fn refresh_loads_every_collection() {
    let product = Product {
        id: ProductId::new("2"),
        name: "Bracket".to_string(),
        price: 4.0,
        materials: vec![ProductMaterial {
            raw_material: iron(10.0),
            required_quantity: 3.0,
        }],
    };
    let api = InMemoryInventoryApi::new()
        .with_raw_materials(vec![iron(10.0)])
        .with_products(vec![product.clone()]);
    let session = session(&api, SyncSettings::default());

    session.refresh().await.unwrap();

    let state = session.snapshot().await;
    assert_eq!(state.raw_materials.items, vec![iron(10.0)]);
    assert_eq!(state.products.items, vec![product]);
    assert_eq!(state.production.suggestions.len(), 1);
    assert_eq!(state.production.suggestions[0].quantity_to_produce, 3);
    assert!(!state.is_busy());
}

#[tokio::test]
async fn refresh_reports_failure_but_applies_the_rest() {
    let api = InMemoryInventoryApi::new().with_raw_materials(vec![iron(10.0)]);
    api.fail_next(
        Endpoint::FetchProducts,
        TransportFailure::Http {
            status: 503,
            content_type: Some("text/plain".to_string()),
            body: "unavailable".to_string(),
        },
    );
    let session = session(&api, SyncSettings::default());

    let result = session.refresh().await;
    assert!(matches!(
        result,
        Err(SessionError::Rejected(ErrorEnvelope::Critical(_)))
    ));

    let state = session.snapshot().await;
    assert_eq!(state.raw_materials.items, vec![iron(10.0)]);
    assert!(state.products.request().error.is_some());
    assert_eq!(state.raw_materials.request().error, None);
}

#[tokio::test]
async fn refetch_policy_reloads_products_after_referenced_delete() {
    let product = Product {
        id: ProductId::new("2"),
        name: "Bracket".to_string(),
        price: 4.0,
        materials: vec![ProductMaterial {
            raw_material: iron(10.0),
            required_quantity: 3.0,
        }],
    };
    let api = InMemoryInventoryApi::new()
        .with_raw_materials(vec![iron(10.0)])
        .with_products(vec![product]);
    let session = session(
        &api,
        SyncSettings::default().with_staleness(StalenessPolicy::RefetchProducts),
    );
    session.refresh().await.unwrap();

    let mut rx = session.store().subscribe_actions();
    session.delete_raw_material(RawMaterialId::new("1")).await.unwrap();

    let refetched = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let InventoryAction::Products(ProductsAction::Fetched { result, .. }) =
                rx.recv().await.unwrap()
            {
                return result;
            }
        }
    })
    .await
    .unwrap();

    assert!(refetched.is_ok());
    assert_eq!(api.calls(Endpoint::FetchProducts), 2);
    let state = session.snapshot().await;
    assert!(state.products.items[0].materials.is_empty());
    assert!(state.stale_references().is_empty());
}

#[tokio::test]
async fn retain_policy_does_not_refetch() {
    let api = InMemoryInventoryApi::new().with_raw_materials(vec![iron(10.0)]);
    let session = session(&api, SyncSettings::default());
    session.refresh().await.unwrap();

    session.delete_raw_material(RawMaterialId::new("1")).await.unwrap();
    session.shutdown(Duration::from_secs(1)).await.unwrap();

    assert_eq!(api.calls(Endpoint::FetchProducts), 1);
}
