//! # Inventory Sync HTTP Client
//!
//! [`HttpInventoryApi`] talks to the inventory REST server and plugs into
//! [`inventory_sync_store::InventoryEnvironment`].
//!
//! ## Example
//!
//! ```no_run
//! use inventory_sync_client::{ClientConfig, HttpInventoryApi};
//! use inventory_sync_store::{InventoryEnvironment, InventorySession, SyncSettings};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // INVENTORY_API_URL, defaults to http://localhost:8081
//!     let api = HttpInventoryApi::new(&ClientConfig::from_env()?)?;
//!     let environment =
//!         InventoryEnvironment::new(Arc::new(api)).with_settings(SyncSettings::from_env()?);
//!
//!     let session = InventorySession::new(environment);
//!     let materials = session.fetch_raw_materials().await?;
//!     println!("{} raw materials", materials.len());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::HttpInventoryApi;
pub use config::ClientConfig;
pub use error::ClientError;
