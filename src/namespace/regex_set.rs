//! Membership set mixing literal namespaces and wildcard patterns.

use std::collections::HashSet;

use super::pattern::NamespacePattern;
use crate::error::ConfigError;

/// A set of namespaces whose members may carry a `*` wildcard.
///
/// Literal members answer membership in O(1); wildcard members are scanned.
/// The mapper uses one of these for the exclusion list, which is read-only
/// once the mapper is shared between workers.
#[derive(Debug, Default)]
pub struct RegexSet {
    literals: HashSet<String>,
    patterns: Vec<NamespacePattern>,
}

impl RegexSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Partition namespaces into literals and compiled patterns.
    ///
    /// Duplicate inputs collapse to one member.
    pub fn from_namespaces<I, S>(namespaces: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for namespace in namespaces {
            set.add(namespace.as_ref())?;
        }
        Ok(set)
    }

    /// True when `namespace` is a literal member or matches a pattern member.
    pub fn contains(&self, namespace: &str) -> bool {
        self.literals.contains(namespace)
            || self.patterns.iter().any(|pattern| pattern.matches(namespace))
    }

    /// Insert a namespace into whichever subset it belongs to.
    pub fn add(&mut self, namespace: &str) -> Result<(), ConfigError> {
        if namespace.contains('*') {
            if !self.patterns.iter().any(|p| p.as_str() == namespace) {
                self.patterns.push(NamespacePattern::compile(namespace)?);
            }
        } else {
            self.literals.insert(namespace.to_string());
        }
        Ok(())
    }

    /// Remove a namespace; absent members are a no-op.
    pub fn discard(&mut self, namespace: &str) {
        if namespace.contains('*') {
            self.patterns.retain(|p| p.as_str() != namespace);
        } else {
            self.literals.remove(namespace);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty() && self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.literals.len() + self.patterns.len()
    }
}
