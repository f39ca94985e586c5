use crate::error::{Result, TabletalkError};
use std::fmt;

pub const FORBIDDEN_KEYWORDS: [&str; 6] = ["INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE"];

const LIMIT_KEYWORD: &str = "LIMIT";

/// a statement that passed [`check_read_only`] and carries a bound clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedStatement(String);

impl ValidatedStatement {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ValidatedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// reject text containing any mutating keyword, in any position
///
/// plain substring test on the uppercased text, no sql parser behind it:
/// literals, quoted identifiers and comments count as code, identifiers
/// that merely contain a keyword (`created_at`) are rejected, and
/// `ATTACH` or `PRAGMA` pass. trailing statements are refused by
/// [`crate::store::Store::execute`].
pub fn check_read_only(candidate: &str) -> Result<()> {
    let upper = candidate.to_uppercase();

    match FORBIDDEN_KEYWORDS.iter().find(|k| upper.contains(*k)) {
        Some(keyword) => Err(TabletalkError::SafetyRejection {
            keyword: keyword.to_string(),
        }),
        None => Ok(()),
    }
}

/// append `LIMIT n;` on its own line unless the text already mentions
/// LIMIT anywhere, including inside a name like `credit_limit`
///
/// the new line keeps a trailing `--` comment from swallowing the bound
pub fn enforce_limit(statement: &str, limit: usize) -> String {
    if statement.to_uppercase().contains(LIMIT_KEYWORD) {
        return statement.to_string();
    }

    let body = statement.trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    format!("{}\n{} {};", body, LIMIT_KEYWORD, limit)
}

#[tracing::instrument(skip(candidate), fields(candidate_len = candidate.len()))]
pub fn validate(candidate: &str, limit: usize) -> Result<ValidatedStatement> {
    if let Err(e) = check_read_only(candidate) {
        tracing::warn!("unsafe statement blocked: {}", e);
        return Err(e);
    }

    Ok(ValidatedStatement(enforce_limit(candidate, limit)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_keyword_rejected_in_any_case_and_position() {
        for keyword in FORBIDDEN_KEYWORDS {
            for text in [
                format!("{} INTO t VALUES (1)", keyword),
                format!("select 1; {}", keyword.to_lowercase()),
                format!("SELECT * FROM t WHERE note = 'x{}y'", keyword.to_lowercase()),
            ] {
                match check_read_only(&text) {
                    Err(TabletalkError::SafetyRejection { keyword: found }) => {
                        assert_eq!(found, keyword)
                    }
                    other => panic!("expected rejection for {:?}, got {:?}", text, other),
                }
            }
        }
    }

    #[test]
    fn test_plain_select_accepted() {
        assert!(check_read_only("SELECT id, status FROM uploaded_data").is_ok());
    }

    #[test]
    fn test_identifier_containing_keyword_is_rejected() {
        // substring screening, no tokenizer
        let result = check_read_only("SELECT created_at FROM events");
        assert!(matches!(
            result,
            Err(TabletalkError::SafetyRejection { ref keyword }) if keyword == "CREATE"
        ));
    }

    #[test]
    fn test_side_effecting_pragma_not_detected() {
        assert!(check_read_only("PRAGMA journal_mode = WAL").is_ok());
        assert!(check_read_only("ATTACH DATABASE 'x.db' AS x").is_ok());
    }

    #[test]
    fn test_limit_appended_with_terminator() {
        assert_eq!(
            enforce_limit("SELECT * FROM t;", 10),
            "SELECT * FROM t\nLIMIT 10;"
        );
        assert_eq!(enforce_limit("SELECT * FROM t", 10), "SELECT * FROM t\nLIMIT 10;");
        assert_eq!(
            enforce_limit("SELECT * FROM t ;\n", 5),
            "SELECT * FROM t\nLIMIT 5;"
        );
    }

    #[test]
    fn test_limit_appended_exactly_once() {
        let bounded = enforce_limit("SELECT * FROM t WHERE a = 'b';", 10);
        assert_eq!(bounded.matches("LIMIT").count(), 1);
        assert!(bounded.starts_with("SELECT * FROM t WHERE a = 'b'"));
        assert_eq!(enforce_limit(&bounded, 10), bounded);
    }

    #[test]
    fn test_existing_limit_left_unchanged() {
        let statement = "select * from t limit 3";
        assert_eq!(enforce_limit(statement, 10), statement);
    }

    #[test]
    fn test_limit_named_column_suppresses_bound() {
        let statement = "SELECT credit_limit FROM accounts";
        assert_eq!(enforce_limit(statement, 10), statement);
    }

    #[test]
    fn test_validate_bounds_accepted_statement() {
        let statement = validate("SELECT * FROM uploaded_data", 10).unwrap();
        assert_eq!(statement.as_str(), "SELECT * FROM uploaded_data\nLIMIT 10;");
        assert_eq!(statement.to_string(), statement.clone().into_string());
    }

    #[test]
    fn test_bound_survives_trailing_line_comment() {
        let bounded = enforce_limit("SELECT * FROM t -- all rows", 1);
        assert_eq!(bounded, "SELECT * FROM t -- all rows\nLIMIT 1;");
        assert!(bounded.lines().last().unwrap().starts_with("LIMIT"));
    }

    #[test]
    fn test_validate_rejects_before_bounding() {
        let result = validate("DROP TABLE uploaded_data", 10);
        assert!(matches!(result, Err(TabletalkError::SafetyRejection { .. })));
    }
}
