//! MCP DB Server Library
//!
//! This library provides read-only MCP (Model Context Protocol) tools for AI
//! assistants to explore and query SQL databases (SQLite, PostgreSQL, MySQL).

pub mod config;
pub mod db;
pub mod error;
pub mod gate;
pub mod mcp;
pub mod models;
pub mod nl;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::DbService;
