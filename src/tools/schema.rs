//! Schema introspection tools.
//!
//! This module implements the `list_tables` and `describe_table` MCP tools and
//! the `database://tables` and `database://schema` resources. All of them read
//! the connection's cached table inventory.

use crate::db::ConnectionManager;
use crate::error::{DbError, DbResult};
use crate::models::{ColumnInfo, TableInventory};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Input for the list_tables tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListTablesInput {
    /// Re-read the catalogs instead of using the cached inventory. Default: false
    #[serde(default)]
    pub refresh: bool,
}

/// Output from the list_tables tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListTablesOutput {
    /// Tables in name order
    pub tables: Vec<TableSummary>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct TableSummary {
    pub name: String,
    pub column_count: usize,
}

impl TableSummary {
    /// One summary per table, in inventory order.
    pub fn from_inventory(inventory: &TableInventory) -> Vec<Self> {
        inventory
            .iter()
            .map(|(name, columns)| Self {
                name: name.to_string(),
                column_count: columns.len(),
            })
            .collect()
    }
}

/// Input for the describe_table tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DescribeTableInput {
    /// Exact table name as returned by list_tables (case-sensitive)
    pub table_name: String,
}

/// Output from the describe_table tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DescribeTableOutput {
    pub table_name: String,
    /// Columns in declaration order
    pub columns: Vec<ColumnInfo>,
    pub column_count: usize,
}

/// Read-only views of the inventory published as MCP resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaResource {
    /// Table names with column counts
    Tables,
    /// Every table with its full column list
    Schema,
}

/// Body of the `database://schema` resource.
#[derive(Debug, Clone, Serialize)]
struct SchemaDocument {
    tables: Vec<DescribeTableOutput>,
    count: usize,
}

impl SchemaResource {
    pub const ALL: [Self; 2] = [Self::Tables, Self::Schema];

    pub fn uri(self) -> &'static str {
        match self {
            Self::Tables => "database://tables",
            Self::Schema => "database://schema",
        }
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.uri() == uri)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Tables => "tables",
            Self::Schema => "schema",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Tables => "Tables in the connected database with their column counts",
            Self::Schema => "Every table in the connected database with its columns",
        }
    }

    /// JSON text of this view over `inventory`.
    pub fn render(self, inventory: &TableInventory) -> DbResult<String> {
        let rendered = match self {
            Self::Tables => {
                let tables = TableSummary::from_inventory(inventory);
                serde_json::to_string_pretty(&ListTablesOutput {
                    count: tables.len(),
                    tables,
                })
            }
            Self::Schema => {
                let tables: Vec<DescribeTableOutput> = inventory
                    .iter()
                    .map(|(name, columns)| DescribeTableOutput {
                        table_name: name.to_string(),
                        column_count: columns.len(),
                        columns: columns.to_vec(),
                    })
                    .collect();
                serde_json::to_string_pretty(&SchemaDocument {
                    count: tables.len(),
                    tables,
                })
            }
        };
        rendered.map_err(|e| DbError::internal(format!("Failed to render {}: {}", self.uri(), e)))
    }
}

/// Handler for schema introspection tools.
pub struct SchemaToolHandler {
    connection_manager: Arc<ConnectionManager>,
}

impl SchemaToolHandler {
    pub fn new(connection_manager: Arc<ConnectionManager>) -> Self {
        Self { connection_manager }
    }

    pub async fn list_tables(&self, input: ListTablesInput) -> DbResult<ListTablesOutput> {
        let inventory = if input.refresh {
            self.connection_manager.refresh_inventory().await?
        } else {
            self.connection_manager.inventory().await?
        };
        let tables = TableSummary::from_inventory(&inventory);
        let count = tables.len();

        info!(count = count, refresh = input.refresh, "Listed tables");
        Ok(ListTablesOutput { tables, count })
    }

    pub async fn describe_table(&self, input: DescribeTableInput) -> DbResult<DescribeTableOutput> {
        let table_name = input.table_name.trim();
        if table_name.is_empty() {
            return Err(DbError::validation("table_name cannot be empty"));
        }
        let columns = self.connection_manager.describe_table(table_name).await?;

        info!(table = %table_name, columns = columns.len(), "Described table");
        Ok(DescribeTableOutput {
            table_name: table_name.to_string(),
            column_count: columns.len(),
            columns,
        })
    }

    pub async fn read_resource(&self, resource: SchemaResource) -> DbResult<String> {
        let inventory = self.connection_manager.inventory().await?;
        debug!(uri = resource.uri(), tables = inventory.len(), "Reading schema resource");
        resource.render(&inventory)
    }
}
