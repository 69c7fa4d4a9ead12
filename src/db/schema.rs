//! Schema introspection.
//!
//! Builds a complete [`TableInventory`] from the backend's catalogs in one
//! pass. The result is either whole or an error; callers never see a partial
//! inventory.
//!
//! # Architecture
//!
//! SQL queries live in the `queries` submodule. Each backend has its own
//! submodule (postgres, mysql, sqlite) providing the same `load_tables`.

use crate::db::backend::Backend;
use crate::error::DbResult;
use crate::models::{ColumnInfo, TableInventory};
use std::collections::BTreeMap;
use tracing::debug;

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// Read every user table and its columns.
    pub async fn load_inventory(backend: &Backend) -> DbResult<TableInventory> {
        let tables = match backend {
            Backend::Postgres(p) => postgres::load_tables(p).await?,
            Backend::MySql(p) => mysql::load_tables(p).await?,
            Backend::Sqlite(p) => sqlite::load_tables(p).await?,
        };
        debug!(
            db_type = %backend.db_type(),
            count = tables.len(),
            "Loaded table inventory"
        );
        Ok(TableInventory::new(tables))
    }
}

/// Group `(table, column)` rows, keeping tables that have no columns.
fn group_columns(
    table_names: Vec<String>,
    columns: Vec<(String, ColumnInfo)>,
) -> BTreeMap<String, Vec<ColumnInfo>> {
    let mut tables: BTreeMap<String, Vec<ColumnInfo>> = table_names
        .into_iter()
        .map(|name| (name, Vec::new()))
        .collect();
    for (table, column) in columns {
        // Columns of tables created between the two catalog reads are skipped.
        if let Some(cols) = tables.get_mut(&table) {
            cols.push(column);
        }
    }
    tables
}

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub mod postgres {
        pub const LIST_TABLES: &str = r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = current_schema()
            AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#;

        pub const LIST_COLUMNS: &str = r#"
            SELECT
                c.table_name::text AS table_name,
                c.column_name::text AS column_name,
                format_type(a.atttypid, a.atttypmod) AS column_type,
                c.is_nullable::text AS is_nullable,
                c.column_default::text AS column_default
            FROM information_schema.columns c
            JOIN pg_namespace n ON n.nspname = c.table_schema
            JOIN pg_class t ON t.relname = c.table_name AND t.relnamespace = n.oid
            JOIN pg_attribute a ON a.attrelid = t.oid AND a.attname = c.column_name
            WHERE c.table_schema = current_schema()
            ORDER BY c.table_name, c.ordinal_position
            "#;
    }

    pub mod mysql {
        pub const LIST_TABLES: &str = r#"
            SELECT CONVERT(TABLE_NAME USING utf8) AS TABLE_NAME
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE()
            AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
            "#;

        pub const LIST_COLUMNS: &str = r#"
            SELECT
                CONVERT(TABLE_NAME USING utf8) AS TABLE_NAME,
                CONVERT(COLUMN_NAME USING utf8) AS COLUMN_NAME,
                CONVERT(COLUMN_TYPE USING utf8) AS COLUMN_TYPE,
                CONVERT(IS_NULLABLE USING utf8) AS IS_NULLABLE,
                CONVERT(COLUMN_DEFAULT USING utf8) AS COLUMN_DEFAULT
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = DATABASE()
            ORDER BY TABLE_NAME, ORDINAL_POSITION
            "#;
    }

    pub mod sqlite {
        pub const LIST_TABLES: &str = r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table'
            AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#;

        /// Table-valued pragma, bound so names never need escaping.
        pub const TABLE_INFO: &str = r#"
            SELECT name, type, "notnull", dflt_value
            FROM pragma_table_info(?)
            ORDER BY cid
            "#;
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod postgres {
    use super::*;
    use sqlx::{PgPool, Row};

    pub async fn load_tables(pool: &PgPool) -> DbResult<BTreeMap<String, Vec<ColumnInfo>>> {
        let table_rows = sqlx::query(queries::postgres::LIST_TABLES)
            .fetch_all(pool)
            .await?;
        let table_names = table_rows
            .iter()
            .map(|row| row.try_get::<String, _>("table_name"))
            .collect::<Result<Vec<_>, _>>()?;

        let column_rows = sqlx::query(queries::postgres::LIST_COLUMNS)
            .fetch_all(pool)
            .await?;
        let mut columns = Vec::with_capacity(column_rows.len());
        for row in &column_rows {
            let table: String = row.try_get("table_name")?;
            let name: String = row.try_get("column_name")?;
            let data_type: String = row.try_get("column_type")?;
            let nullable: String = row.try_get("is_nullable")?;
            let default_value: Option<String> = row.try_get("column_default")?;
            columns.push((
                table,
                ColumnInfo::new(name, data_type, nullable == "YES").with_default(default_value),
            ));
        }

        Ok(group_columns(table_names, columns))
    }
}

mod mysql {
    use super::*;
    use sqlx::{MySqlPool, Row};

    pub async fn load_tables(pool: &MySqlPool) -> DbResult<BTreeMap<String, Vec<ColumnInfo>>> {
        let table_rows = sqlx::query(queries::mysql::LIST_TABLES)
            .fetch_all(pool)
            .await?;
        let table_names = table_rows
            .iter()
            .map(|row| row.try_get::<String, _>("TABLE_NAME"))
            .collect::<Result<Vec<_>, _>>()?;

        let column_rows = sqlx::query(queries::mysql::LIST_COLUMNS)
            .fetch_all(pool)
            .await?;
        let mut columns = Vec::with_capacity(column_rows.len());
        for row in &column_rows {
            let table: String = row.try_get("TABLE_NAME")?;
            let name: String = row.try_get("COLUMN_NAME")?;
            let data_type: String = row.try_get("COLUMN_TYPE")?;
            let nullable: String = row.try_get("IS_NULLABLE")?;
            let default_value: Option<String> = row.try_get("COLUMN_DEFAULT")?;
            columns.push((
                table,
                ColumnInfo::new(name, data_type, nullable == "YES").with_default(default_value),
            ));
        }

        Ok(group_columns(table_names, columns))
    }
}

mod sqlite {
    use super::*;
    use sqlx::{Row, SqlitePool};

    pub async fn load_tables(pool: &SqlitePool) -> DbResult<BTreeMap<String, Vec<ColumnInfo>>> {
        let table_rows = sqlx::query(queries::sqlite::LIST_TABLES)
            .fetch_all(pool)
            .await?;

        let mut tables = BTreeMap::new();
        for row in &table_rows {
            let table: String = row.try_get("name")?;
            let column_rows = sqlx::query(queries::sqlite::TABLE_INFO)
                .bind(&table)
                .fetch_all(pool)
                .await?;

            let mut columns = Vec::with_capacity(column_rows.len());
            for col in &column_rows {
                let name: String = col.try_get("name")?;
                let data_type: String = col.try_get("type")?;
                let not_null: i64 = col.try_get("notnull")?;
                let default_value: Option<String> = col.try_get("dflt_value")?;
                columns.push(
                    ColumnInfo::new(name, data_type, not_null == 0).with_default(default_value),
                );
            }
            tables.insert(table, columns);
        }

        Ok(tables)
    }
}
