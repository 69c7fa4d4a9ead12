//! Schema-related data models.
//!
//! The [`TableInventory`] is the cached picture of the connected database's
//! tables. It is always built as a whole and replaced as a whole.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnInfo {
    pub name: String,
    /// Database-specific type as reported by the catalog (e.g., "integer", "varchar(255)")
    pub data_type: String,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            default_value: None,
        }
    }

    pub fn with_default(mut self, default_value: Option<String>) -> Self {
        self.default_value = default_value;
        self
    }
}

/// Table name to ordered column list, plus the instant it was built.
#[derive(Debug, Clone)]
pub struct TableInventory {
    tables: BTreeMap<String, Vec<ColumnInfo>>,
    built_at: Instant,
}

impl TableInventory {
    pub fn new(tables: BTreeMap<String, Vec<ColumnInfo>>) -> Self {
        Self {
            tables,
            built_at: Instant::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(BTreeMap::new())
    }

    /// Table names in sorted order.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Columns of `table`, matched case-sensitively.
    pub fn columns(&self, table: &str) -> Option<&[ColumnInfo]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ColumnInfo])> {
        self.tables
            .iter()
            .map(|(name, cols)| (name.as_str(), cols.as_slice()))
    }

    pub fn age(&self) -> Duration {
        self.built_at.elapsed()
    }

    /// A zero TTL disables caching: every read is stale.
    pub fn is_stale(&self, ttl: Duration) -> bool {
        ttl.is_zero() || self.age() > ttl
    }
}
