//! Read-only policy: the keyword deny-list and the reasons a statement is refused.

use serde::{Deserialize, Serialize};

/// Keywords that may never appear as a bare (unquoted) token.
///
/// Matched case-insensitively against whole tokens, so identifiers such as
/// `updated_at` or `"drop"` are unaffected.
pub const DENIED_KEYWORDS: &[&str] = &[
    "DROP", "DELETE", "UPDATE", "INSERT", "ALTER", "CREATE", "TRUNCATE", "GRANT", "REVOKE",
    "ATTACH", "REPLACE", // write or privilege statements
    "DETACH", "MERGE", "CALL", "EXEC", "EXECUTE", // procedures and SQLite database handles
    "INTO", // SELECT ... INTO creates tables or writes files
];

/// Option words allowed between `EXPLAIN` and the explained query.
pub(crate) const EXPLAIN_OPTIONS: &[&str] = &[
    "QUERY", "PLAN", "ANALYZE", "VERBOSE", "FORMAT", "JSON", "TEXT", "TREE", "TRADITIONAL",
    "EXTENDED",
];

pub fn denied_keyword(word: &str) -> Option<&'static str> {
    DENIED_KEYWORDS
        .iter()
        .copied()
        .find(|denied| denied.eq_ignore_ascii_case(word))
}

/// Why the gate refused a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyViolation {
    /// Nothing but whitespace and comments.
    Empty,
    /// More than one non-empty statement.
    MultiStatement,
    DeniedKeyword { keyword: String },
    /// Statement does not start with SELECT, WITH ... SELECT or EXPLAIN SELECT.
    NotSelect { found: String },
}

impl PolicyViolation {
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Empty => "Provide a SELECT statement",
            Self::MultiStatement => "Send one statement per call",
            Self::DeniedKeyword { .. } => {
                "Only read-only queries are allowed. Quote the word if it is an identifier"
            }
            Self::NotSelect { .. } => "Only SELECT, WITH ... SELECT and EXPLAIN SELECT are allowed",
        }
    }
}

impl std::fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty statement"),
            Self::MultiStatement => write!(f, "multiple statements are not allowed"),
            Self::DeniedKeyword { keyword } => write!(f, "keyword {} is not allowed", keyword),
            Self::NotSelect { found } => {
                write!(f, "only read-only SELECT queries are allowed (found {})", found)
            }
        }
    }
}

/// Shape of an accepted statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Select,
    /// Common table expression ending in SELECT
    With,
    Explain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denied_keyword_is_case_insensitive() {
        assert_eq!(denied_keyword("drop"), Some("DROP"));
        assert_eq!(denied_keyword("Truncate"), Some("TRUNCATE"));
        assert_eq!(denied_keyword("dropped"), None);
        assert_eq!(denied_keyword("SELECT"), None);
    }

    #[test]
    fn test_violation_display() {
        let v = PolicyViolation::DeniedKeyword {
            keyword: "DELETE".to_string(),
        };
        assert_eq!(v.to_string(), "keyword DELETE is not allowed");
        assert_eq!(PolicyViolation::Empty.to_string(), "empty statement");
    }

    #[test]
    fn test_violation_serializes_with_tag() {
        let v = PolicyViolation::NotSelect {
            found: "VALUES".to_string(),
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["type"], "not_select");
        assert_eq!(json["found"], "VALUES");
        let json = serde_json::to_value(PolicyViolation::MultiStatement).unwrap();
        assert_eq!(json["type"], "multi_statement");
    }
}
