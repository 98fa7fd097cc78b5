//! Construction-time validation of the user mapping table.

use super::pattern::wildcard_in_db;
use crate::error::ConfigError;

/// Check every source-to-target rename pair before registration.
///
/// Rejects wildcards that cannot be resolved unambiguously and duplicate
/// targets. Pairs of patterns that merely have a chance of matching the
/// same namespace log warnings instead, since whether they collide depends
/// on which namespaces actually flow through the stream.
pub(crate) fn validate_target_namespaces(renames: &[(String, String)]) -> Result<(), ConfigError> {
    for (source, target) in renames {
        if source.matches('*').count() > 1 || target.matches('*').count() > 1 {
            return Err(ConfigError::TooManyWildcards {
                source_ns: source.clone(),
                target: target.clone(),
            });
        }
        if source.matches('*').count() != target.matches('*').count() {
            return Err(ConfigError::WildcardArityMismatch {
                source_ns: source.clone(),
                target: target.clone(),
            });
        }
        if !source.contains('*') {
            continue;
        }
        // A wildcard may not move between the database and collection
        // segments, otherwise the target databases of a source database
        // could not be enumerated for database-wide operations.
        if wildcard_in_db(source) != wildcard_in_db(target) {
            return Err(ConfigError::WildcardSegmentMismatch {
                source_ns: source.clone(),
                target: target.clone(),
            });
        }
    }

    for (index, (source1, target1)) in renames.iter().enumerate() {
        for (source2, target2) in &renames[index + 1..] {
            if wildcards_overlap(source1, source2) {
                tracing::warn!(
                    "Namespace patterns '{}' and '{}' may match the same source namespace",
                    source1,
                    source2
                );
            }
            if target1 == target2 {
                return Err(ConfigError::DuplicateTarget {
                    source_ns: source2.clone(),
                    target: target2.clone(),
                    existing: source1.clone(),
                });
            }
            if wildcards_overlap(target1, target2) {
                tracing::warn!(
                    "Mapping to '{}' from '{}' might overlap with the mapping to '{}' from '{}'",
                    target2,
                    source2,
                    target1,
                    source1
                );
            }
        }
    }
    Ok(())
}

/// True when two wildcard patterns can match the same namespace.
pub(crate) fn wildcards_overlap(left: &str, right: &str) -> bool {
    overlap(left.as_bytes(), right.as_bytes())
}

fn overlap(left: &[u8], right: &[u8]) -> bool {
    match (left.is_empty(), right.is_empty()) {
        (true, true) => return true,
        (true, false) | (false, true) => return false,
        (false, false) => {}
    }
    // A `*` consumes any number of the other pattern's characters in one step.
    if left[0] == b'*' && (0..=right.len()).any(|taken| overlap(&left[1..], &right[taken..])) {
        return true;
    }
    if right[0] == b'*' && (0..=left.len()).any(|taken| overlap(&left[taken..], &right[1..])) {
        return true;
    }
    left[0] == right[0] && overlap(&left[1..], &right[1..])
}
