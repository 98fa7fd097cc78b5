//! Compiled wildcard namespace patterns.

use regex::Regex;

use crate::error::ConfigError;

/// True when the `*` sits in the database segment of the namespace.
///
/// Database names cannot contain a period, so a database-segment wildcard
/// must not match across one. The `*` is in the database segment only when
/// it precedes the first period; a pattern without a period compiles as a
/// collection wildcard.
pub fn wildcard_in_db(namespace: &str) -> bool {
    match (namespace.find('*'), namespace.find('.')) {
        (Some(star), Some(dot)) => star < dot,
        _ => false,
    }
}

/// A namespace pattern compiled for repeated matching.
///
/// Each `*` becomes a capture group anchored inside the rest of the
/// namespace, matched literally. The group for a database-segment wildcard
/// refuses periods; a collection-segment wildcard may swallow them.
#[derive(Debug, Clone)]
pub struct NamespacePattern {
    namespace: String,
    regex: Regex,
}

impl NamespacePattern {
    /// Compile a wildcard namespace into an anchored pattern.
    pub fn compile(namespace: &str) -> Result<Self, ConfigError> {
        let group = if wildcard_in_db(namespace) {
            "([^.]*)"
        } else {
            "(.*)"
        };
        let pattern = format!(r"\A{}\z", regex::escape(namespace).replace(r"\*", group));
        Ok(Self {
            namespace: namespace.to_string(),
            regex: Regex::new(&pattern)?,
        })
    }

    /// The namespace string this pattern was compiled from.
    pub fn as_str(&self) -> &str {
        &self.namespace
    }

    /// True when `candidate` matches the whole pattern.
    pub fn matches(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }

    /// Substitute the text captured from `candidate` into `template`.
    ///
    /// `template` is the other side of a mapping entry; its `*` receives
    /// whatever this pattern's `*` matched. `resolve` calls this with the
    /// source pattern and the target template, `unmap` with the roles
    /// swapped. Returns `None` when `candidate` does not match.
    pub fn match_replace(&self, candidate: &str, template: &str) -> Option<String> {
        let captures = self.regex.captures(candidate)?;
        let captured = captures.get(1).map_or("", |group| group.as_str());
        Some(template.replacen('*', captured, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_in_db() {
        assert!(wildcard_in_db("db*.col"));
        assert!(wildcard_in_db("*.col"));
        assert!(!wildcard_in_db("db.col*"));
        assert!(!wildcard_in_db("db.*"));
        assert!(!wildcard_in_db("db.col"));

        // Without a period there is no database segment to wildcard.
        assert!(!wildcard_in_db("*"));
        assert!(!wildcard_in_db("db*"));
    }

    #[test]
    fn test_database_wildcard_does_not_cross_period() {
        let pattern = NamespacePattern::compile("db*.col").unwrap();
        assert!(pattern.matches("db2.col"));
        assert!(pattern.matches("db_long_name.col"));
        assert!(!pattern.matches("db.bar.col"));
    }

    #[test]
    fn test_collection_wildcard_may_contain_period() {
        let pattern = NamespacePattern::compile("db.col*").unwrap();
        assert!(pattern.matches("db.col"));
        assert!(pattern.matches("db.col.v2"));
        assert!(!pattern.matches("other.col"));
    }

    #[test]
    fn test_pattern_is_anchored_and_literal_outside_the_wildcard() {
        let pattern = NamespacePattern::compile("db.*").unwrap();
        assert!(pattern.matches("db.col"));
        assert!(!pattern.matches("xdb.col"));

        // The period is matched literally, not as a regex wildcard.
        let literal = NamespacePattern::compile("db.col").unwrap();
        assert!(literal.matches("db.col"));
        assert!(!literal.matches("dbxcol"));
    }

    #[test]
    fn test_match_replace_resolves_target_names() {
        let pattern = NamespacePattern::compile("db_*.foo").unwrap();
        assert_eq!(
            pattern.match_replace("db_123.foo", "db_new_*.foo"),
            Some("db_new_123.foo".to_string())
        );
        assert_eq!(pattern.match_replace("db_123.bar", "db_new_*.foo"), None);
    }

    #[test]
    fn test_match_replace_inverts_renames() {
        // The target side of "db2.*" -> "db2.f*" as the matchable pattern.
        let pattern = NamespacePattern::compile("db2.f*").unwrap();
        assert_eq!(
            pattern.match_replace("db2.foo", "db2.*"),
            Some("db2.oo".to_string())
        );
    }

    #[test]
    fn test_command_namespace_dollar_sign_is_escaped() {
        let pattern = NamespacePattern::compile("db_*.$cmd").unwrap();
        assert!(pattern.matches("db_eu.$cmd"));
        assert!(!pattern.matches("db_eu.xcmd"));
        assert_eq!(
            pattern.match_replace("db_eu.$cmd", "db_new_*.$cmd"),
            Some("db_new_eu.$cmd".to_string())
        );
    }
}
