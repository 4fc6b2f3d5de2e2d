//! Adapters - Implementations of port interfaces.
//!
//! - `postgres` - PostgreSQL persistence and plan catalog loading
//! - `memory` - In-memory adapters for tests and local runs
//! - `http` - Axum routes for the notification endpoints

pub mod http;
pub mod memory;
pub mod postgres;
