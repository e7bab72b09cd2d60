//! Heuristic statement classification.
//!
//! Statement kind and target table are read off the leading tokens of the raw
//! SQL text. There is no parser behind this: for `SELECT` the table is the
//! token after the first `FROM ` found anywhere in the text, so a subquery or
//! an alias containing `FROM ` wins over the real table.

/// Table name reported when no target table can be derived.
pub const UNKNOWN_TABLE: &str = "<unknown>";

/// Only this many leading whitespace-separated tokens are inspected.
const TOKEN_WINDOW: usize = 20;

const FROM_KEYWORD: &[u8] = b"FROM ";

/// Result of classifying one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Uppercased first token (`SELECT`, `INSERT`, `PRAGMA`, ...). Empty for blank input.
    pub kind: String,
    /// Best-effort target table, uppercased, or [`UNKNOWN_TABLE`].
    pub target_table: String,
    /// Text used in reports. For `SELECT ... FROM` this is rewritten to
    /// `SELECT FROM ...`, otherwise it is the raw text.
    pub display_text: String,
}

impl Classification {
    /// `"<kind> <table>"`, the key used when grouping by kind and table together.
    pub fn kind_and_table(&self) -> String {
        format!("{} {}", self.kind, self.target_table)
    }
}

/// Classify a raw SQL statement. Never fails.
pub fn classify(sql: &str) -> Classification {
    let tokens: Vec<String> = sql
        .split_whitespace()
        .take(TOKEN_WINDOW)
        .map(str::to_uppercase)
        .collect();
    let token = |i: usize| tokens.get(i).map(String::as_str);

    let kind = token(0).unwrap_or_default().to_string();
    let mut display_text = None;

    let target_table = match (token(0), token(1)) {
        (Some("SELECT"), _) => match find_from_keyword(sql) {
            Some(idx) => {
                let tail = &sql[idx..];
                display_text = Some(format!("{kind} {tail}"));
                tail.split_whitespace().nth(1).map(str::to_uppercase)
            }
            // No FROM: the first selected expression stands in for the table.
            None => token(1).map(str::to_string),
        },
        (Some("INSERT"), Some("INTO")) | (Some("DELETE"), Some("FROM")) => {
            token(2).map(str::to_string)
        }
        (Some("UPDATE"), _) => token(1).map(str::to_string),
        _ => None,
    };

    Classification {
        kind,
        target_table: target_table.unwrap_or_else(|| UNKNOWN_TABLE.to_string()),
        display_text: display_text.unwrap_or_else(|| sql.to_string()),
    }
}

/// Byte offset of the first case-insensitive `FROM ` (with the trailing space).
///
/// A match at offset 0 does not count.
fn find_from_keyword(sql: &str) -> Option<usize> {
    sql.as_bytes()
        .windows(FROM_KEYWORD.len())
        .position(|w| w.eq_ignore_ascii_case(FROM_KEYWORD))
        .filter(|&idx| idx > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_table(sql: &str) -> (String, String) {
        let c = classify(sql);
        (c.kind, c.target_table)
    }

    #[test]
    fn canonical_statements() {
        assert_eq!(
            kind_table("SELECT * FROM users WHERE id = ?"),
            ("SELECT".into(), "USERS".into())
        );
        assert_eq!(
            kind_table("INSERT INTO users (a,b) VALUES (?,?)"),
            ("INSERT".into(), "USERS".into())
        );
        assert_eq!(
            kind_table("UPDATE users SET a=?"),
            ("UPDATE".into(), "USERS".into())
        );
        assert_eq!(
            kind_table("DELETE FROM users WHERE id=?"),
            ("DELETE".into(), "USERS".into())
        );
    }

    #[test]
    fn select_without_from_uses_second_token() {
        let c = classify("select 'x'");
        assert_eq!(c.kind, "SELECT");
        assert_eq!(c.target_table, "'X'");
        assert_eq!(c.display_text, "select 'x'");
    }

    #[test]
    fn select_display_starts_at_from() {
        let c = classify("SELECT users.id AS users_id \nFROM users \nWHERE users.id = ?");
        assert_eq!(c.target_table, "USERS");
        assert_eq!(c.display_text, "SELECT FROM users \nWHERE users.id = ?");
    }

    #[test]
    fn lowercase_from_is_found() {
        let c = classify("select a from Orders");
        assert_eq!(c.target_table, "ORDERS");
        assert_eq!(c.display_text, "SELECT from Orders");
    }

    #[test]
    fn subquery_from_is_taken_literally() {
        let c = classify(
            "SELECT count(*) AS count_1 \nFROM (SELECT users.id AS users_id \nFROM users) AS anon_1",
        );
        assert_eq!(c.target_table, "(SELECT");
        assert_eq!(
            c.display_text,
            "SELECT FROM (SELECT users.id AS users_id \nFROM users) AS anon_1"
        );
        assert_eq!(c.kind_and_table(), "SELECT (SELECT");
    }

    #[test]
    fn from_needs_trailing_space() {
        // "FROM\n" does not count, so the second token is used.
        let c = classify("SELECT a\nFROM\nusers");
        assert_eq!(c.target_table, "A");
        assert_eq!(c.display_text, "SELECT a\nFROM\nusers");
    }

    #[test]
    fn dangling_from_yields_unknown_table() {
        let c = classify("SELECT 1 FROM ");
        assert_eq!(c.target_table, UNKNOWN_TABLE);
        assert_eq!(c.display_text, "SELECT FROM ");
    }

    #[test]
    fn insert_table_keeps_attached_column_list() {
        assert_eq!(
            kind_table("insert into users(a) values (1)").1,
            "USERS(A)".to_string()
        );
    }

    #[test]
    fn other_statements_are_unknown() {
        assert_eq!(
            kind_table("CREATE TABLE t (id INT)"),
            ("CREATE".into(), UNKNOWN_TABLE.into())
        );
        assert_eq!(kind_table("INSERT t VALUES (1)").1, UNKNOWN_TABLE);
        assert_eq!(kind_table("DELETE t").1, UNKNOWN_TABLE);
        assert_eq!(kind_table("COMMIT").1, UNKNOWN_TABLE);
    }

    #[test]
    fn short_statements_do_not_panic() {
        assert_eq!(kind_table(""), (String::new(), UNKNOWN_TABLE.into()));
        assert_eq!(kind_table("   \n "), (String::new(), UNKNOWN_TABLE.into()));
        assert_eq!(kind_table("SELECT"), ("SELECT".into(), UNKNOWN_TABLE.into()));
        assert_eq!(kind_table("UPDATE"), ("UPDATE".into(), UNKNOWN_TABLE.into()));
        assert_eq!(kind_table("INSERT INTO"), ("INSERT".into(), UNKNOWN_TABLE.into()));
    }

    #[test]
    fn non_ascii_text_is_handled() {
        let c = classify("SELECT 'straße' FROM übersicht");
        assert_eq!(c.target_table, "ÜBERSICHT");
        assert_eq!(c.display_text, "SELECT FROM übersicht");
    }
}
