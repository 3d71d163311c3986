//! End-to-end behaviour of the session against the in-memory server.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use inventory_sync_store::error::CRITICAL_FALLBACK_MESSAGE;
use inventory_sync_store::mocks::{Endpoint, InMemoryInventoryApi};
use inventory_sync_store::{
    ErrorEnvelope, FieldError, InventoryEnvironment, InventorySession, MaterialAmount,
    MaterialStatus, MaterialsReplacement, NewRawMaterial, Product, ProductId, ProductMaterial,
    RawMaterial, RawMaterialId, SessionError, TransportFailure,
};
use std::sync::Arc;

// ============================================================================
// Fixtures
// ============================================================================

fn material(id: &str, name: &str, stock: f64) -> RawMaterial {
    RawMaterial {
        id: RawMaterialId::new(id),
        name: name.to_string(),
        stock_quantity: stock,
    }
}

fn bracket(materials: Vec<ProductMaterial>) -> Product {
    Product {
        id: ProductId::new("p1"),
        name: "Bracket".to_string(),
        price: 12.5,
        materials,
    }
}

fn session(api: &InMemoryInventoryApi) -> InventorySession {
    inventory_sync_testing::init_test_tracing();
    InventorySession::new(InventoryEnvironment::new(Arc::new(api.clone())))
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn fetch_replaces_collection() {
    let api = InMemoryInventoryApi::new().with_raw_materials(vec![material("1", "Iron", 50.0)]);
    let session = session(&api);

    let fetched = session.fetch_raw_materials().await.unwrap();
    assert_eq!(fetched, vec![material("1", "Iron", 50.0)]);

    let state = session.snapshot().await;
    assert_eq!(state.raw_materials.items, vec![material("1", "Iron", 50.0)]);
    assert!(!state.raw_materials.request().loading);
    assert_eq!(state.raw_materials.request().error, None);
}

#[tokio::test]
async fn validation_failure_goes_to_caller_only() {
    let api = InMemoryInventoryApi::new();
    api.fail_next(
        Endpoint::CreateRawMaterial,
        TransportFailure::Http {
            status: 400,
            content_type: Some("application/json".to_string()),
            body: r#"{"status":400,"errors":[{"field":"name","message":"Must not be blank"}]}"#
                .to_string(),
        },
    );
    let session = session(&api);

    let result = session
        .create_raw_material(NewRawMaterial {
            name: String::new(),
            stock_quantity: 1.0,
        })
        .await;

    let Err(SessionError::Rejected(ErrorEnvelope::Validation(validation))) = result else {
        panic!("expected a validation rejection, got {result:?}");
    };
    assert_eq!(
        validation.field_errors,
        vec![FieldError {
            field: "name".to_string(),
            message: "Must not be blank".to_string(),
        }]
    );

    let state = session.snapshot().await;
    assert_eq!(state.raw_materials.request().error, None);
    assert!(!state.raw_materials.request().loading);
    assert!(state.raw_materials.items.is_empty());
}

#[tokio::test]
async fn unstructured_server_error_sets_fallback_message() {
    let api = InMemoryInventoryApi::new().with_raw_materials(vec![material("1", "Iron", 50.0)]);
    let session = session(&api);
    session.fetch_raw_materials().await.unwrap();

    api.fail_next(
        Endpoint::DeleteRawMaterial,
        TransportFailure::Http {
            status: 500,
            content_type: None,
            body: String::new(),
        },
    );
    let result = session.delete_raw_material(RawMaterialId::new("1")).await;
    assert!(matches!(
        result,
        Err(SessionError::Rejected(ErrorEnvelope::Critical(_)))
    ));

    let state = session.snapshot().await;
    assert_eq!(
        state.raw_materials.request().error.as_deref(),
        Some(CRITICAL_FALLBACK_MESSAGE)
    );
    assert!(!state.raw_materials.request().loading);
    assert_eq!(state.raw_materials.items.len(), 1);
}

#[tokio::test]
async fn replace_materials_overwrites_embedded_list() {
    let m1 = material("m1", "Iron", 10.0);
    let m2 = material("m2", "Steel", 8.0);
    let api = InMemoryInventoryApi::new()
        .with_raw_materials(vec![m1.clone(), m2.clone()])
        .with_products(vec![bracket(vec![ProductMaterial {
            raw_material: m1,
            required_quantity: 2.0,
        }])]);
    let session = session(&api);
    session.fetch_products().await.unwrap();

    let returned = session
        .replace_product_materials(
            ProductId::new("p1"),
            MaterialsReplacement {
                materials: vec![MaterialAmount {
                    material_id: RawMaterialId::new("m2"),
                    quantity: 5.0,
                }],
            },
        )
        .await
        .unwrap();

    let expected = vec![ProductMaterial {
        raw_material: m2,
        required_quantity: 5.0,
    }];
    assert_eq!(returned, expected);

    let product = session
        .read(|state| state.products.get(&ProductId::new("p1")).cloned())
        .await
        .unwrap();
    assert_eq!(product.materials, expected);
}

#[tokio::test]
async fn raw_material_delete_leaves_embedded_snapshot() {
    let m1 = material("m1", "Iron", 10.0);
    let api = InMemoryInventoryApi::new()
        .with_raw_materials(vec![m1.clone()])
        .with_products(vec![bracket(vec![ProductMaterial {
            raw_material: m1.clone(),
            required_quantity: 2.0,
        }])]);
    let session = session(&api);
    session.refresh().await.unwrap();

    session.delete_raw_material(RawMaterialId::new("m1")).await.unwrap();

    let state = session.snapshot().await;
    assert!(state.raw_materials.items.is_empty());
    assert_eq!(state.products.items[0].materials[0].raw_material, m1);

    let statuses: Vec<MaterialStatus> = state
        .materials_of(&ProductId::new("p1"))
        .unwrap()
        .iter()
        .map(|view| view.status)
        .collect();
    assert_eq!(statuses, vec![MaterialStatus::Missing]);
    assert_eq!(state.stale_references().len(), 1);
}

// ============================================================================
// Remaining operations
// ============================================================================

#[tokio::test]
async fn product_lifecycle() {
    let api = InMemoryInventoryApi::new().with_raw_materials(vec![material("1", "Iron", 10.0)]);
    let session = session(&api);
    session.fetch_raw_materials().await.unwrap();

    let created = session
        .create_product(inventory_sync_store::NewProduct {
            name: "Bracket".to_string(),
            price: 3.0,
            materials: vec![MaterialAmount {
                material_id: RawMaterialId::new("1"),
                quantity: 4.0,
            }],
        })
        .await
        .unwrap();

    let renamed = session
        .update_product(
            created.id.clone(),
            inventory_sync_store::ProductPatch {
                name: Some("Wide bracket".to_string()),
                price: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.price, 3.0);

    let suggestions = session.fetch_production_suggestions().await.unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].product_name, "Wide bracket");
    assert_eq!(suggestions[0].quantity_to_produce, 2);
    assert_eq!(
        session.read(inventory_sync_store::InventoryState::production_plan).await,
        suggestions
    );

    session
        .delete_product_material(created.id.clone(), RawMaterialId::new("1"))
        .await
        .unwrap();
    let materials = session
        .read(|state| state.products.items[0].materials.len())
        .await;
    assert_eq!(materials, 0);

    session.delete_product(created.id.clone()).await.unwrap();
    assert!(session.read(|state| state.products.items.is_empty()).await);

    // Deleting it again is a not-found problem; the collection shows its detail
    let result = session.delete_product(created.id).await;
    assert_eq!(
        result.as_ref().err().and_then(SessionError::envelope).and_then(ErrorEnvelope::status),
        Some(404)
    );
    assert_eq!(
        session.read(|state| state.products.request().error.clone()).await.as_deref(),
        Some("Product not found")
    );
}

#[tokio::test]
async fn server_validation_keeps_full_paths() {
    let api = InMemoryInventoryApi::new();
    let session = session(&api);

    let result = session
        .create_raw_material(NewRawMaterial {
            name: " ".to_string(),
            stock_quantity: -3.0,
        })
        .await;
    let Err(SessionError::Rejected(ErrorEnvelope::Validation(validation))) = result else {
        panic!("expected a validation rejection, got {result:?}");
    };

    let paths: Vec<&str> = validation.field_errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(paths, ["create.dto.name", "create.dto.stockQuantity"]);

    let form = validation.form_errors();
    assert_eq!(form.get("name"), Some(&"The raw material name cannot be empty"));
    assert_eq!(form.get("stockQuantity"), Some(&"The stock quantity cannot be negative"));
}
