//! Mock implementations for testing.
//!
//! [`InMemoryInventoryApi`] behaves like the inventory server (validation
//! problems, not-found problems, cascading deletes, production suggestions)
//! and lets tests inject failures and latency per endpoint.
//!
//! **WARNING**: Do NOT use in production. This is for testing only!

mod api;

pub use api::{Endpoint, InMemoryInventoryApi};
