//! Shell-style glob matching over archive entry names.
//!
//! The alphabet is intentionally minimal: `*` and `?` wildcards, everything
//! else is a literal. No character classes, no `**`.

use regex::Regex;

/// Translates a glob pattern into the anchored, case-sensitive regex that
/// matches it, per the archive's glob alphabet (`*` -> `.*`, `?` -> `.`,
/// regex metacharacters escaped literally).
pub fn glob_to_regex(pattern: &str) -> Regex {
    let mut regex_pattern = String::with_capacity(pattern.len() * 2 + 2);
    regex_pattern.push('^');

    for c in pattern.chars() {
        match c {
            '*' => regex_pattern.push_str(".*"),
            '?' => regex_pattern.push('.'),
            '.' | '+' | '(' | ')' | '{' | '}' | '|' | '^' | '$' | '[' | ']' | '\\' => {
                regex_pattern.push('\\');
                regex_pattern.push(c);
            }
            other => regex_pattern.push(other),
        }
    }

    regex_pattern.push('$');
    // The alphabet above can only ever produce a valid regex.
    Regex::new(&regex_pattern).expect("glob-derived regex is always well-formed")
}

/// True iff `name` matches `pattern`. An empty pattern matches everything.
pub fn matches(pattern: &str, name: &str) -> bool {
    if pattern.is_empty() {
        return true;
    }
    glob_to_regex(pattern).is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pattern_matches_everything() {
        assert!(matches("", "anything.txt"));
    }

    #[test]
    fn star_matches_any_run() {
        assert!(matches("*.txt", "report.txt"));
        assert!(!matches("*.txt", "report.csv"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        assert!(matches("file?.txt", "file1.txt"));
        assert!(!matches("file?.txt", "file12.txt"));
    }

    #[test]
    fn metacharacters_are_literal() {
        assert!(matches("a.b", "a.b"));
        assert!(!matches("a.b", "aXb"));
    }

    #[test]
    fn is_case_sensitive() {
        assert!(!matches("*.TXT", "report.txt"));
    }

    #[test]
    fn anchors_full_name() {
        assert!(!matches("foo", "foobar"));
        assert!(matches("foo*", "foobar"));
    }
}
