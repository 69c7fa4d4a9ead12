//! Natural-language questions to SQL.
//!
//! The translator only proposes a statement. Whatever it returns goes through
//! the query gate like any other SQL.

use crate::error::{DbError, DbResult};
use crate::models::{DatabaseType, TableInventory};
use regex::Regex;
use tracing::debug;

/// Rows returned by "top"/"first" questions that name no number.
pub const DEFAULT_TOP_ROWS: u32 = 10;

/// Turns a question about the connected database into one SQL statement.
pub trait Translator: Send + Sync {
    fn translate(
        &self,
        question: &str,
        inventory: &TableInventory,
        db_type: DatabaseType,
    ) -> DbResult<String>;
}

/// Which rule produced a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Count,
    Top(u32),
    ListAll,
    Fallback,
}

/// Literal keyword matcher. No model, no guessing beyond table names.
#[derive(Debug)]
pub struct KeywordTranslator {
    count: Regex,
    top: Regex,
    number: Regex,
    list_all: Regex,
    word: Regex,
}

impl KeywordTranslator {
    pub fn new() -> DbResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| DbError::internal(format!("Invalid translator pattern: {}", e)))
        };
        Ok(Self {
            count: compile(r"(?i)\b(count|how\s+many|number\s+of)\b")?,
            top: compile(r"(?i)\b(top|first|limit)\b")?,
            number: compile(r"\b(\d+)\b")?,
            list_all: compile(r"(?i)\b(show|list|all|everything|display)\b")?,
            word: compile(r"[A-Za-z0-9_]+")?,
        })
    }

    fn rule_for(&self, question: &str) -> Rule {
        if self.count.is_match(question) {
            return Rule::Count;
        }
        if self.top.is_match(question) {
            let n = self
                .number
                .captures(question)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_TOP_ROWS);
            return Rule::Top(n);
        }
        if self.list_all.is_match(question) {
            return Rule::ListAll;
        }
        Rule::Fallback
    }

    /// First table named in the question, by order of appearance.
    fn table_for<'a>(&self, question: &str, inventory: &'a TableInventory) -> Option<&'a str> {
        self.word.find_iter(question).find_map(|m| {
            let word = m.as_str().to_lowercase();
            inventory
                .iter()
                .map(|(name, _)| name)
                .find(|name| names_match(name, &word))
        })
    }
}

fn singular(word: &str) -> &str {
    match word.strip_suffix('s') {
        Some(stem) if !stem.is_empty() && !stem.ends_with('s') => stem,
        _ => word,
    }
}

/// `students` and `student` name the same table.
fn names_match(table: &str, word: &str) -> bool {
    let table = table.to_lowercase();
    table == word || singular(&table) == word || table == singular(word)
}

impl Translator for KeywordTranslator {
    fn translate(
        &self,
        question: &str,
        inventory: &TableInventory,
        db_type: DatabaseType,
    ) -> DbResult<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(DbError::validation("Question cannot be empty"));
        }
        let default_table = inventory
            .iter()
            .next()
            .map(|(name, _)| name)
            .ok_or_else(|| {
                DbError::validation("The connected database has no tables to query")
            })?;

        let table = self.table_for(question, inventory).unwrap_or(default_table);
        let quoted = db_type.quote_identifier(table);
        let rule = self.rule_for(question);

        let sql = match rule {
            Rule::Count => format!("SELECT COUNT(*) AS count FROM {}", quoted),
            Rule::Top(n) => format!("SELECT * FROM {} LIMIT {}", quoted, n),
            Rule::ListAll | Rule::Fallback => format!("SELECT * FROM {}", quoted),
        };
        debug!(rule = ?rule, table = %table, sql = %sql, "Translated question");
        Ok(sql)
    }
}
