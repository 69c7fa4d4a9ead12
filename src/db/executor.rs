//! Query execution engine.
//!
//! Runs one gate-approved statement and returns at most `row_limit` rows.
//! Rows are streamed and the stream is cut at `row_limit + 1`, so a large
//! result never has to be materialized just to learn that it was truncated.
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `mysql`: MySQL-specific fetching
//! - `postgres`: PostgreSQL-specific fetching
//! - `sqlite`: SQLite-specific fetching
//!
//! Each submodule provides identical functionality adapted to the database's type system.

use crate::db::backend::Backend;
use crate::db::types::RowValues;
use crate::error::{DbError, DbResult};
use crate::gate::ApprovedQuery;
use crate::models::{ColumnMetadata, QueryResult};
use futures_util::StreamExt;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Query executor that handles database query execution.
#[derive(Debug, Clone, Copy)]
pub struct QueryExecutor {
    query_timeout: Duration,
}

impl QueryExecutor {
    pub fn new(query_timeout: Duration) -> Self {
        Self { query_timeout }
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Execute an approved statement.
    ///
    /// Driver errors are returned as they are; nothing is retried.
    pub async fn execute(&self, backend: &Backend, query: &ApprovedQuery) -> DbResult<QueryResult> {
        let start = Instant::now();
        let row_limit = query.row_limit();
        let sql = query.sql();

        debug!(
            sql = %sql,
            kind = ?query.kind(),
            limit = row_limit,
            timeout_secs = self.query_timeout.as_secs(),
            "Executing query"
        );

        let fetched = match backend {
            Backend::MySql(p) => {
                let rows = mysql::fetch_rows(p, sql, row_limit, self.query_timeout).await?;
                let describe = if rows.is_empty() {
                    mysql::describe_columns(p, sql).await
                } else {
                    Vec::new()
                };
                Fetched::from_rows(&rows, describe)
            }
            Backend::Postgres(p) => {
                let rows = postgres::fetch_rows(p, sql, row_limit, self.query_timeout).await?;
                let describe = if rows.is_empty() {
                    postgres::describe_columns(p, sql).await
                } else {
                    Vec::new()
                };
                Fetched::from_rows(&rows, describe)
            }
            Backend::Sqlite(p) => {
                let rows = sqlite::fetch_rows(p, sql, row_limit, self.query_timeout).await?;
                let describe = if rows.is_empty() {
                    sqlite::describe_columns(p, sql).await
                } else {
                    Vec::new()
                };
                Fetched::from_rows(&rows, describe)
            }
        };

        Ok(fetched.into_result(row_limit, start))
    }
}

/// Decoded rows before the limit is applied.
struct Fetched {
    columns: Vec<ColumnMetadata>,
    rows: Vec<Vec<serde_json::Value>>,
}

impl Fetched {
    /// `described` supplies column names when the statement returned no rows.
    fn from_rows<R: RowValues>(rows: &[R], described: Vec<ColumnMetadata>) -> Self {
        let columns = rows
            .first()
            .map(RowValues::column_metadata)
            .unwrap_or(described);
        Self {
            columns,
            rows: rows.iter().map(RowValues::values).collect(),
        }
    }

    fn into_result(self, row_limit: u32, start: Instant) -> QueryResult {
        let execution_time_ms = start.elapsed().as_millis() as u64;
        let total_rows = self.rows.len();
        let truncated = total_rows > row_limit as usize;

        let mut rows = self.rows;
        rows.truncate(row_limit as usize);

        if truncated {
            warn!(limit = row_limit, "Query result truncated");
        }
        debug!(
            rows = rows.len(),
            execution_time_ms,
            "Query completed"
        );

        QueryResult {
            columns: self.columns,
            rows,
            truncated,
            row_limit,
            execution_time_ms,
        }
    }
}

// =============================================================================
// Common Helper Functions
// =============================================================================

fn collect_rows<R>(results: Vec<Result<R, sqlx::Error>>) -> DbResult<Vec<R>> {
    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        rows.push(result.map_err(execution_failed)?);
    }
    Ok(rows)
}

/// Any driver failure while a statement runs is an execution error, including
/// a dropped or closed connection.
fn execution_failed(err: sqlx::Error) -> DbError {
    match err {
        sqlx::Error::Database(db_err) => DbError::execution(
            db_err.message(),
            db_err.code().map(|c| c.to_string()),
            "Check the SQL syntax and referenced tables and columns",
        ),
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            DbError::execution(
                err.to_string(),
                None,
                "The connection was lost; call connect_to_database to reconnect",
            )
        }
        other => DbError::execution(other.to_string(), None, "Check the SQL statement and try again"),
    }
}

fn timeout_error(timeout: Duration) -> DbError {
    DbError::execution(
        format!("Query timed out after {} seconds", timeout.as_secs()),
        None,
        "Narrow the query with WHERE or a smaller LIMIT, or raise --query-timeout",
    )
}

fn describe_failed(e: &sqlx::Error) -> Vec<ColumnMetadata> {
    debug!(error = %e, "Could not describe empty result");
    Vec::new()
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.
// The code structure is intentionally parallel to make differences obvious.

mod mysql {
    use super::*;
    use sqlx::mysql::MySqlRow;
    use sqlx::{Column, Executor, MySqlPool, TypeInfo};

    pub async fn fetch_rows(
        pool: &MySqlPool,
        sql: &str,
        row_limit: u32,
        query_timeout: Duration,
    ) -> DbResult<Vec<MySqlRow>> {
        let fetch_limit = row_limit as usize + 1;
        let rows_future = pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>();

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error(query_timeout)),
        }
    }

    pub async fn describe_columns(pool: &MySqlPool, sql: &str) -> Vec<ColumnMetadata> {
        match pool.describe(sql).await {
            Ok(described) => described
                .columns()
                .iter()
                .map(|c| ColumnMetadata::new(c.name(), c.type_info().name()))
                .collect(),
            Err(e) => describe_failed(&e),
        }
    }
}

mod postgres {
    use super::*;
    use sqlx::postgres::PgRow;
    use sqlx::{Column, Executor, PgPool, TypeInfo};

    pub async fn fetch_rows(
        pool: &PgPool,
        sql: &str,
        row_limit: u32,
        query_timeout: Duration,
    ) -> DbResult<Vec<PgRow>> {
        let fetch_limit = row_limit as usize + 1;
        let rows_future = pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>();

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error(query_timeout)),
        }
    }

    pub async fn describe_columns(pool: &PgPool, sql: &str) -> Vec<ColumnMetadata> {
        match pool.describe(sql).await {
            Ok(described) => described
                .columns()
                .iter()
                .map(|c| ColumnMetadata::new(c.name(), c.type_info().name()))
                .collect(),
            Err(e) => describe_failed(&e),
        }
    }
}

mod sqlite {
    use super::*;
    use sqlx::sqlite::SqliteRow;
    use sqlx::{Column, Executor, SqlitePool, TypeInfo};

    pub async fn fetch_rows(
        pool: &SqlitePool,
        sql: &str,
        row_limit: u32,
        query_timeout: Duration,
    ) -> DbResult<Vec<SqliteRow>> {
        let fetch_limit = row_limit as usize + 1;
        let rows_future = pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>();

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error(query_timeout)),
        }
    }

    pub async fn describe_columns(pool: &SqlitePool, sql: &str) -> Vec<ColumnMetadata> {
        match pool.describe(sql).await {
            Ok(described) => described
                .columns()
                .iter()
                .map(|c| ColumnMetadata::new(c.name(), c.type_info().name()))
                .collect(),
            Err(e) => describe_failed(&e),
        }
    }
}
