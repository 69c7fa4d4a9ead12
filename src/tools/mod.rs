//! MCP tool implementations.
//!
//! This module contains all database tool handlers:
//! - `connection`: connect_to_database, get_current_database_info, get_connection_examples
//! - `schema`: list_tables, describe_table
//! - `query`: execute_sql and query_database (natural language)
//! - `format`: table and markdown rendering of results

pub mod connection;
pub mod format;
pub mod query;
pub mod schema;

pub use connection::{
    ConnectInput, ConnectionExamplesOutput, ConnectionToolHandler, DatabaseInfoOutput,
};
pub use format::OutputFormat;
pub use query::{
    ExecuteSqlInput, QueryDatabaseInput, QueryDatabaseOutput, QueryOutput, QueryToolHandler,
};
pub use schema::{
    DescribeTableInput, DescribeTableOutput, ListTablesInput, ListTablesOutput, SchemaResource,
    SchemaToolHandler,
};
