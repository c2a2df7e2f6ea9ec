//! Splits a SQL script into individually executable statements.
//!
//! Semicolons inside string literals, quoted identifiers, dollar-quoted bodies
//! (`$$ ... $$`, `$fn$ ... $fn$`) and comments do not end a statement.

/// Returns the statements of `script` in order, trimmed and without their
/// terminating semicolon. Fragments holding only comments are dropped.
pub fn split_statements(script: &str) -> Vec<String> {
    let bytes = script.as_bytes();
    let mut statements = Vec::new();
    let mut start = 0;
    let mut has_code = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => {
                i = skip_quoted(bytes, i, bytes[i]);
                has_code = true;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = skip_line_comment(bytes, i);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = skip_block_comment(bytes, i);
            }
            b'$' => match dollar_tag(bytes, i) {
                Some(tag_len) => {
                    i = skip_dollar_quoted(bytes, i, tag_len);
                    has_code = true;
                }
                None => {
                    i += 1;
                    has_code = true;
                }
            },
            b';' => {
                if has_code {
                    statements.push(script[start..i].trim().to_string());
                }
                i += 1;
                start = i;
                has_code = false;
            }
            c => {
                if !c.is_ascii_whitespace() {
                    has_code = true;
                }
                i += 1;
            }
        }
    }

    if has_code {
        let tail = script[start..].trim();
        if !tail.is_empty() {
            statements.push(tail.to_string());
        }
    }

    statements
}

/// Index just past the closing quote; a doubled quote is an escaped quote.
fn skip_quoted(bytes: &[u8], open: usize, quote: u8) -> usize {
    let mut i = open + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

fn skip_line_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |p| start + p + 1)
}

/// Block comments nest in PostgreSQL.
fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0;
    let mut i = start;
    while i < bytes.len() {
        if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'*') {
            depth += 1;
            i += 2;
        } else if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
            depth -= 1;
            i += 2;
            if depth == 0 {
                return i;
            }
        } else {
            i += 1;
        }
    }
    bytes.len()
}

/// Length of the `$tag$` opener at `start`, if one starts there. `$1` style
/// parameters are not tags.
fn dollar_tag(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    if let Some(first) = bytes.get(i) {
        if first.is_ascii_digit() {
            return None;
        }
    }
    while let Some(&b) = bytes.get(i) {
        if b == b'$' {
            return Some(i - start + 1);
        }
        if !(b.is_ascii_alphanumeric() || b == b'_') {
            return None;
        }
        i += 1;
    }
    None
}

fn skip_dollar_quoted(bytes: &[u8], start: usize, tag_len: usize) -> usize {
    let tag = &bytes[start..start + tag_len];
    let body = start + tag_len;
    bytes[body..]
        .windows(tag_len)
        .position(|w| w == tag)
        .map_or(bytes.len(), |p| body + p + tag_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_simple_statements() {
        let stmts = split_statements("CREATE TABLE a (id INT);\nINSERT INTO a VALUES (1);\n");
        assert_eq!(stmts, vec!["CREATE TABLE a (id INT)", "INSERT INTO a VALUES (1)"]);
    }

    #[test]
    fn keeps_trailing_statement_without_semicolon() {
        let stmts = split_statements("SELECT 1; SELECT 2");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn semicolons_in_strings_and_identifiers() {
        let stmts = split_statements(
            "INSERT INTO t (\"odd;name\") VALUES ('a;b', 'it''s; fine');SELECT 1;",
        );
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].ends_with("'it''s; fine')"));
    }

    #[test]
    fn dollar_quoted_function_body_is_one_statement() {
        let script = r#"
CREATE OR REPLACE FUNCTION app_is_admin() RETURNS boolean AS $$
BEGIN
  RETURN EXISTS (SELECT 1 FROM users WHERE id = 1 AND role = 'admin');
END;
$$ LANGUAGE plpgsql;
CREATE FUNCTION f() RETURNS int AS $body$ SELECT 1; $body$ LANGUAGE sql;
SELECT $1;
"#;
        let stmts = split_statements(script);
        assert_eq!(stmts.len(), 3);
        assert!(stmts[0].starts_with("CREATE OR REPLACE FUNCTION"));
        assert!(stmts[0].ends_with("LANGUAGE plpgsql"));
        assert!(stmts[1].contains("$body$ SELECT 1; $body$"));
        assert_eq!(stmts[2], "SELECT $1");
    }

    #[test]
    fn comments_do_not_split_or_count() {
        let script = "-- header; still a comment\n/* block; /* nested; */ */\nSELECT 1; -- trailing;\n;";
        let stmts = split_statements(script);
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].ends_with("SELECT 1"));
    }

    #[test]
    fn empty_script() {
        assert!(split_statements("  \n ;; -- nothing\n").is_empty());
    }

    #[test]
    fn bundled_scripts_split_cleanly() {
        let policies = split_statements(include_str!("../../sql/rls_policies.sql"));
        assert_eq!(policies.len(), 15);
        assert!(policies[0].contains("DO $$") && policies[0].ends_with("$$"));
        assert!(policies.iter().all(|s| !s.is_empty()));

        let schema = split_statements(include_str!("../../migrations/0001_init.sql"));
        assert_eq!(schema.len(), 24);
        assert!(schema[0].contains("CREATE TABLE IF NOT EXISTS branches"));
    }
}
