//! MCP protocol surface.
//!
//! [`DbService`] exposes the connection, schema and query tools through rmcp.
//! Every clone shares one connection manager, so all sessions see the same
//! active database.

pub mod service;

pub use service::DbService;
