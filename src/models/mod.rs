//! Data models for the MCP database server.

pub mod connection;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::{ConnectionDescriptor, ConnectionInfo, DatabaseType};
pub use query::{ColumnMetadata, DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT, QueryResult};
pub use schema::{ColumnInfo, TableInventory};
