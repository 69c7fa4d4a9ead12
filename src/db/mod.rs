//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Backend handles over sqlx pools
//! - The connection manager that owns the active connection
//! - Query execution
//! - Schema introspection
//! - Row decoding

pub mod backend;
pub mod executor;
pub mod manager;
pub mod schema;
pub mod types;

pub use backend::{Backend, PoolSettings};
pub use executor::QueryExecutor;
pub use manager::{ConnectionManager, ManagerSettings};
pub use schema::SchemaInspector;
