//! Inventory sync demo binary
//!
//! Connects to the inventory server, mirrors every collection and prints the
//! server identity, the mirror, stale embedded references and the local
//! production plan.

use anyhow::Context;
use inventory_sync_client::{ClientConfig, HttpInventoryApi};
use inventory_sync_store::{InventoryEnvironment, InventorySession, SyncSettings};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inventory_sync=debug,inventory_sync_store=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::from_env().context("Invalid client configuration")?;
    let settings = SyncSettings::from_env().context("Invalid sync settings")?;
    tracing::info!(base_url = %config.base_url, "Configuration loaded");

    let api = HttpInventoryApi::new(&config).context("Failed to build HTTP client")?;
    let session = InventorySession::new(InventoryEnvironment::new(Arc::new(api)).with_settings(settings));

    if !session.check_health().await.unwrap_or(false) {
        tracing::warn!(base_url = %config.base_url, "Server health check failed");
    }
    if let Err(error) = session.fetch_whoami().await {
        tracing::warn!(%error, "Could not identify the server instance");
    }

    if let Err(error) = session.refresh().await {
        tracing::error!(%error, "Refresh failed");
    }

    let state = session.snapshot().await;

    println!(
        "=== Server {} ({}) ===",
        state.system.hostname,
        if state.system.healthy { "healthy" } else { "unhealthy" }
    );

    println!("=== Raw materials ({}) ===", state.raw_materials.items.len());
    for material in &state.raw_materials.items {
        println!("  [{}] {}: {}", material.id, material.name, material.stock_quantity);
    }

    println!("\n=== Products ({}) ===", state.products.items.len());
    for product in &state.products.items {
        println!("  [{}] {} @ {:.2}", product.id, product.name, product.price);
        for view in state.materials_of(&product.id).unwrap_or_default() {
            println!(
                "      {} x{} ({:?})",
                view.raw_material().name,
                view.entry.required_quantity,
                view.status
            );
        }
    }

    let stale = state.stale_references();
    if !stale.is_empty() {
        println!("\n=== Stale references ({}) ===", stale.len());
        for reference in &stale {
            println!(
                "  product {} -> material {} ({:?})",
                reference.product_id, reference.material_id, reference.status
            );
        }
    }

    println!("\n=== Production suggestions (server) ===");
    for suggestion in &state.production.suggestions {
        println!(
            "  {} x{} = {:.2}",
            suggestion.product_name, suggestion.quantity_to_produce, suggestion.total_value
        );
    }

    println!("\n=== Production plan (local) ===");
    for suggestion in state.production_plan() {
        println!(
            "  {} x{} = {:.2}",
            suggestion.product_name, suggestion.quantity_to_produce, suggestion.total_value
        );
    }

    for (name, request) in [
        ("raw materials", state.raw_materials.request()),
        ("products", state.products.request()),
        ("production", state.production.request()),
        ("system", state.system.request()),
    ] {
        if let Some(error) = &request.error {
            println!("\n{name}: {error}");
        }
    }

    session
        .shutdown(Duration::from_secs(5))
        .await
        .context("Shutdown did not complete")?;
    Ok(())
}
