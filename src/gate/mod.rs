//! Safe Query Gate.
//!
//! Every SQL string passes through [`QueryGate`] before it can reach the
//! connection manager. Statements are tokenized with the backend's dialect, so
//! string literals, quoted identifiers and comments are single tokens and the
//! words inside them never match the deny-list.
//!
//! Only an [`ApprovedQuery`] can be executed, and only the gate creates one.

mod policy;

pub use policy::{DENIED_KEYWORDS, PolicyViolation, StatementKind, denied_keyword};

use crate::error::{DbError, DbResult};
use crate::models::{DEFAULT_ROW_LIMIT, DatabaseType, MAX_ROW_LIMIT};
use policy::EXPLAIN_OPTIONS;
use serde::Serialize;
use sqlparser::tokenizer::{Token, Tokenizer};
use tracing::{debug, info};

/// Default and maximum number of rows a statement may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLimits {
    pub default: u32,
    pub max: u32,
}

impl RowLimits {
    pub fn new(default: u32, max: u32) -> Self {
        let max = max.max(1);
        Self {
            default: default.clamp(1, max),
            max,
        }
    }

    /// Effective limit for a caller's optional override.
    pub fn resolve(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.default).clamp(1, self.max)
    }
}

impl Default for RowLimits {
    fn default() -> Self {
        Self::new(DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT)
    }
}

/// Outcome of inspecting one SQL string.
#[derive(Debug, Clone, Serialize)]
pub struct QueryPlan {
    /// Statement to run. Carries an appended `LIMIT` when the caller's SQL had none.
    pub sql: String,
    pub row_limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<PolicyViolation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_kind: Option<StatementKind>,
    /// The statement already had a top-level LIMIT or FETCH clause.
    pub has_limit: bool,
}

impl QueryPlan {
    pub fn is_allowed(&self) -> bool {
        self.blocked_reason.is_none()
    }

    pub fn approve(self) -> DbResult<ApprovedQuery> {
        match (self.blocked_reason, self.statement_kind) {
            (Some(violation), _) => Err(violation.into()),
            (None, Some(kind)) => Ok(ApprovedQuery {
                sql: self.sql,
                row_limit: self.row_limit,
                kind,
            }),
            (None, None) => Err(DbError::internal("Query plan has no statement kind")),
        }
    }
}

/// A statement the gate accepted, ready for execution.
#[derive(Debug, Clone)]
pub struct ApprovedQuery {
    sql: String,
    row_limit: u32,
    kind: StatementKind,
}

impl ApprovedQuery {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn row_limit(&self) -> u32 {
        self.row_limit
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QueryGate {
    limits: RowLimits,
}

impl QueryGate {
    pub fn new(limits: RowLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> RowLimits {
        self.limits
    }

    /// Inspect `sql` without executing anything.
    ///
    /// Policy refusals are reported through `blocked_reason`; only input the
    /// tokenizer cannot read (e.g. an unterminated string) is an error.
    pub fn plan(
        &self,
        sql: &str,
        db_type: DatabaseType,
        row_limit: Option<u32>,
    ) -> DbResult<QueryPlan> {
        let row_limit = self.limits.resolve(row_limit);
        let dialect = db_type.sql_dialect();
        let tokens = Tokenizer::new(dialect.as_ref(), sql)
            .with_unescape(false)
            .tokenize()
            .map_err(|e| DbError::validation(format!("Could not read SQL statement: {}", e)))?;

        let blocked = |reason: PolicyViolation| -> DbResult<QueryPlan> {
            info!(reason = %reason, "Query blocked by read-only policy");
            Ok(QueryPlan {
                sql: sql.trim().to_string(),
                row_limit,
                blocked_reason: Some(reason),
                statement_kind: None,
                has_limit: false,
            })
        };

        let statement = match single_statement(&tokens) {
            Ok(statement) => statement,
            Err(reason) => return blocked(reason),
        };
        if let Some(keyword) = find_denied_keyword(statement) {
            return blocked(PolicyViolation::DeniedKeyword {
                keyword: keyword.to_string(),
            });
        }
        let kind = match classify(statement) {
            Ok(kind) => kind,
            Err(reason) => return blocked(reason),
        };

        let has_limit = has_top_level_limit(statement);
        let mut text = if tokens.iter().any(|t| matches!(t, Token::SemiColon)) {
            render(statement)
        } else {
            sql.trim().to_string()
        };
        // One row past the limit tells the executor whether it truncated.
        if !has_limit && kind != StatementKind::Explain {
            let limit = format!("LIMIT {}", u64::from(row_limit) + 1);
            text = match locking_clause_start(statement) {
                Some(idx) => format!(
                    "{}\n{}\n{}",
                    render(&statement[..idx]).trim_end(),
                    limit,
                    render(&statement[idx..])
                ),
                None => format!("{}\n{}", text, limit),
            };
        }

        debug!(kind = ?kind, row_limit, has_limit, "Query approved");
        Ok(QueryPlan {
            sql: text,
            row_limit,
            blocked_reason: None,
            statement_kind: Some(kind),
            has_limit,
        })
    }

    /// Plan and approve in one step.
    pub fn check(
        &self,
        sql: &str,
        db_type: DatabaseType,
        row_limit: Option<u32>,
    ) -> DbResult<ApprovedQuery> {
        self.plan(sql, db_type, row_limit)?.approve()
    }
}

fn is_significant(token: &Token) -> bool {
    !matches!(token, Token::Whitespace(_) | Token::EOF)
}

fn bare_word(token: &Token) -> Option<String> {
    match token {
        Token::Word(w) if w.quote_style.is_none() => Some(w.value.to_ascii_uppercase()),
        _ => None,
    }
}

fn trim_insignificant(tokens: &[Token]) -> &[Token] {
    let start = tokens.iter().position(is_significant).unwrap_or(tokens.len());
    let end = tokens
        .iter()
        .rposition(is_significant)
        .map_or(start, |i| i + 1);
    &tokens[start..end]
}

/// The one non-empty fragment between `;` separators.
fn single_statement(tokens: &[Token]) -> Result<&[Token], PolicyViolation> {
    let mut statement = None;
    for fragment in tokens.split(|t| matches!(t, Token::SemiColon)) {
        let fragment = trim_insignificant(fragment);
        if fragment.is_empty() {
            continue;
        }
        if statement.is_some() {
            return Err(PolicyViolation::MultiStatement);
        }
        statement = Some(fragment);
    }
    statement.ok_or(PolicyViolation::Empty)
}

fn find_denied_keyword(tokens: &[Token]) -> Option<&'static str> {
    tokens.iter().find_map(|t| match t {
        Token::Word(w) if w.quote_style.is_none() => denied_keyword(&w.value),
        _ => None,
    })
}

fn has_top_level_word(tokens: &[&Token], word: &str) -> bool {
    let mut depth = 0usize;
    for token in tokens {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            _ if depth == 0 && bare_word(token).as_deref() == Some(word) => return true,
            _ => {}
        }
    }
    false
}

fn has_top_level_limit(statement: &[Token]) -> bool {
    let tokens: Vec<&Token> = statement.iter().collect();
    has_top_level_word(&tokens, "LIMIT") || has_top_level_word(&tokens, "FETCH")
}

/// Index of a top-level row-locking clause (`FOR SHARE`, `LOCK IN SHARE MODE`).
/// MySQL only accepts LIMIT before it.
fn locking_clause_start(statement: &[Token]) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, token) in statement.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            _ if depth == 0 && matches!(bare_word(token).as_deref(), Some("FOR" | "LOCK")) => {
                return Some(idx);
            }
            _ => {}
        }
    }
    None
}

fn classify(statement: &[Token]) -> Result<StatementKind, PolicyViolation> {
    let tokens: Vec<&Token> = statement.iter().filter(|t| is_significant(t)).collect();
    let start = tokens
        .iter()
        .position(|t| !matches!(t, Token::LParen))
        .unwrap_or(tokens.len());
    let parenthesized = start > 0;
    let Some(first) = tokens.get(start) else {
        return Err(PolicyViolation::Empty);
    };
    let rest = &tokens[start + 1..];

    match bare_word(first).as_deref() {
        Some("SELECT") => Ok(StatementKind::Select),
        Some("WITH") if !parenthesized => {
            if has_top_level_word(rest, "SELECT") {
                Ok(StatementKind::With)
            } else {
                Err(PolicyViolation::NotSelect {
                    found: "WITH without a final SELECT".to_string(),
                })
            }
        }
        Some("EXPLAIN") if !parenthesized => explained_query(rest),
        Some(word) => Err(PolicyViolation::NotSelect {
            found: word.to_string(),
        }),
        None => Err(PolicyViolation::NotSelect {
            found: first.to_string(),
        }),
    }
}

/// Skip EXPLAIN options (`QUERY PLAN`, `ANALYZE`, `(FORMAT JSON)`, `FORMAT=JSON`)
/// and require the explained statement to be a query.
fn explained_query(tokens: &[&Token]) -> Result<StatementKind, PolicyViolation> {
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            Token::Eq | Token::Comma => {}
            _ => match bare_word(token).as_deref() {
                Some("SELECT") => return Ok(StatementKind::Explain),
                Some("WITH") if has_top_level_word(&tokens[idx + 1..], "SELECT") => {
                    return Ok(StatementKind::Explain);
                }
                Some(word) if EXPLAIN_OPTIONS.contains(&word) => {}
                Some(word) => {
                    return Err(PolicyViolation::NotSelect {
                        found: format!("EXPLAIN {}", word),
                    });
                }
                None => {
                    return Err(PolicyViolation::NotSelect {
                        found: format!("EXPLAIN {}", token),
                    });
                }
            },
        }
    }
    Err(PolicyViolation::NotSelect {
        found: "EXPLAIN".to_string(),
    })
}

fn render(tokens: &[Token]) -> String {
    tokens.iter().map(ToString::to_string).collect()
}
