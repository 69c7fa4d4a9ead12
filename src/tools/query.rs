//! Query tools.
//!
//! `execute_sql` runs caller-supplied SQL; `query_database` first turns a
//! question into SQL. Both go through the query gate before anything reaches
//! the database, and generated SQL gets no special trust.

use crate::db::ConnectionManager;
use crate::error::DbResult;
use crate::gate::QueryGate;
use crate::models::{ColumnMetadata, QueryResult};
use crate::nl::Translator;
use crate::tools::format::{OutputFormat, render};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::info;

/// Input for the execute_sql tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteSqlInput {
    /// One read-only statement: SELECT, WITH ... SELECT or EXPLAIN SELECT
    pub sql_query: String,
    /// Maximum rows to return. Default: 50, capped at the server maximum
    #[serde(default)]
    pub limit: Option<u32>,
    /// Output format: "json" returns structured data, "table" returns ASCII table, "markdown" returns markdown table
    #[serde(default)]
    pub format: OutputFormat,
}

/// Input for the query_database tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryDatabaseInput {
    /// Question in plain English, e.g. "how many students are there"
    pub query: String,
    /// Maximum rows to return. Default: 50, capped at the server maximum
    #[serde(default)]
    pub limit: Option<u32>,
    /// Output format: "json", "table" or "markdown"
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output from the query tools.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct QueryOutput {
    /// Statement that was executed, including any appended LIMIT
    pub sql: String,
    /// Column names and types. Empty if format is table/markdown.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnMetadata>,
    /// Result rows as column-name keyed objects. Empty if format is table/markdown.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    /// Pre-formatted output when format is table or markdown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    /// True if the statement produced more rows than row_limit
    pub truncated: bool,
    pub row_count: usize,
    pub row_limit: u32,
    pub execution_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl QueryOutput {
    pub fn from_result(
        sql: String,
        result: QueryResult,
        format: OutputFormat,
        warning: Option<String>,
    ) -> Self {
        let formatted = render(&result, format);
        let (columns, rows) = match format {
            OutputFormat::Json => (result.columns.clone(), result.rows_as_objects()),
            OutputFormat::Table | OutputFormat::Markdown => (Vec::new(), Vec::new()),
        };
        Self {
            sql,
            columns,
            rows,
            formatted,
            truncated: result.truncated,
            row_count: result.row_count(),
            row_limit: result.row_limit,
            execution_time_ms: result.execution_time_ms,
            warning,
        }
    }
}

/// Output from the query_database tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct QueryDatabaseOutput {
    /// The question as received
    pub question: String,
    #[serde(flatten)]
    pub result: QueryOutput,
}

/// Handler for the query tools.
pub struct QueryToolHandler {
    connection_manager: Arc<ConnectionManager>,
    gate: QueryGate,
    translator: Arc<dyn Translator>,
}

impl QueryToolHandler {
    pub fn new(
        connection_manager: Arc<ConnectionManager>,
        gate: QueryGate,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            connection_manager,
            gate,
            translator,
        }
    }

    /// Gate, then execute.
    async fn run(
        &self,
        sql: &str,
        limit: Option<u32>,
        format: OutputFormat,
    ) -> DbResult<QueryOutput> {
        let db_type = self.connection_manager.db_type().await?;
        let approved = self.gate.check(sql, db_type, limit)?;
        let result = self.connection_manager.execute(&approved).await?;

        info!(
            row_count = result.row_count(),
            truncated = result.truncated,
            execution_time_ms = result.execution_time_ms,
            "Query executed"
        );

        let warning = limit_warning(limit, self.gate.limits().max);
        Ok(QueryOutput::from_result(
            approved.sql().to_string(),
            result,
            format,
            warning,
        ))
    }

    pub async fn execute_sql(&self, input: ExecuteSqlInput) -> DbResult<QueryOutput> {
        self.run(&input.sql_query, input.limit, input.format).await
    }

    pub async fn query_database(&self, input: QueryDatabaseInput) -> DbResult<QueryDatabaseOutput> {
        let db_type = self.connection_manager.db_type().await?;
        let inventory = self.connection_manager.inventory().await?;
        let sql = self.translator.translate(&input.query, &inventory, db_type)?;
        info!(sql = %sql, "Translated question to SQL");

        let result = self.run(&sql, input.limit, input.format).await?;
        Ok(QueryDatabaseOutput {
            question: input.query,
            result,
        })
    }
}

fn limit_warning(requested: Option<u32>, max: u32) -> Option<String> {
    requested.filter(|l| *l > max).map(|l| {
        format!(
            "Requested limit {} exceeds maximum allowed ({}). Results capped to {} rows.",
            l, max, max
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_execute_sql_input_defaults() {
        let input: ExecuteSqlInput =
            serde_json::from_str(r#"{"sql_query": "SELECT 1"}"#).unwrap();
        assert_eq!(input.sql_query, "SELECT 1");
        assert_eq!(input.limit, None);
        assert_eq!(input.format, OutputFormat::Json);
    }

    #[test]
    fn test_query_database_input_format() {
        let input: QueryDatabaseInput =
            serde_json::from_str(r#"{"query": "count users", "limit": 5, "format": "markdown"}"#)
                .unwrap();
        assert_eq!(input.limit, Some(5));
        assert_eq!(input.format, OutputFormat::Markdown);
    }

    #[test]
    fn test_limit_warning() {
        assert!(limit_warning(Some(10), 100).is_none());
        assert!(limit_warning(None, 100).is_none());
        assert!(limit_warning(Some(500), 100).unwrap().contains("capped to 100"));
    }

    #[test]
    fn test_query_output_json_rows_are_objects() {
        let result = QueryResult {
            columns: vec![ColumnMetadata::new("id", "INTEGER")],
            rows: vec![vec![json!(1)]],
            truncated: false,
            row_limit: 50,
            execution_time_ms: 3,
        };
        let output = QueryOutput::from_result("SELECT id FROM t".into(), result, OutputFormat::Json, None);
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["rows"][0]["id"], 1);
        assert_eq!(value["row_count"], 1);
        assert!(value.get("formatted").is_none());
    }

    #[test]
    fn test_query_output_table_omits_rows() {
        let result = QueryResult {
            columns: vec![ColumnMetadata::new("id", "INTEGER")],
            rows: vec![vec![json!(1)]],
            truncated: true,
            row_limit: 1,
            execution_time_ms: 3,
        };
        let output = QueryOutput::from_result("SELECT id FROM t".into(), result, OutputFormat::Table, None);
        let value = serde_json::to_value(&output).unwrap();
        assert!(value.get("rows").is_none());
        assert!(value["formatted"].as_str().unwrap().contains("(truncated)"));
        assert_eq!(value["truncated"], true);
    }
}
