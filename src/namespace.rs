//! Namespace routing for change-stream replication.
//!
//! A tailer worker asks the [`NamespaceMapper`] how to route every observed
//! source namespace before forwarding an operation downstream: whether the
//! namespace is dropped, which target namespace it lands on, and which
//! fields survive. Mappings come from configuration as exact names or
//! single-`*` patterns; a pattern match is learned into the exact table on
//! first resolution, so a source namespace keeps resolving to the same
//! target for the rest of the process lifetime.
//!
//! One mapper instance is shared by all tailer workers. The learned tables
//! sit behind a single mutex and grow monotonically; the wildcard entries,
//! exclusion set, and field defaults are immutable after construction.

mod pattern;
mod regex_set;
mod validate;

pub use pattern::{wildcard_in_db, NamespacePattern};
pub use regex_set::RegexSet;

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use bson::{doc, Document};

use crate::config::{MappingTarget, NamespaceConfig};
use crate::error::ConfigError;

/// A resolved target namespace plus its field restrictions.
///
/// At most one of `include_fields` and `exclude_fields` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedNamespace {
    /// Concrete target namespace.
    pub name: String,
    /// Fields to keep; everything else is dropped (`_id` always survives).
    pub include_fields: Option<BTreeSet<String>>,
    /// Fields to drop; everything else is kept.
    pub exclude_fields: Option<BTreeSet<String>>,
}

impl MappedNamespace {
    /// A mapping with no field restriction.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            include_fields: None,
            exclude_fields: None,
        }
    }

    fn has_fields(&self) -> bool {
        self.include_fields.is_some() || self.exclude_fields.is_some()
    }
}

/// One wildcard mapping entry.
///
/// Both sides are compiled up front: `source` matches for `resolve`,
/// `target` matches for `unmap`, and `mapped.name` keeps the target
/// pattern text used as the substitution template.
#[derive(Debug)]
struct WildcardEntry {
    source: NamespacePattern,
    target: NamespacePattern,
    mapped: MappedNamespace,
}

/// Learned mapper state, all guarded by one mutex.
#[derive(Debug, Default)]
struct MapperInner {
    /// Exact source namespace to its mapped target.
    plain: HashMap<String, MappedNamespace>,
    /// Exact target namespace back to its source, kept injective.
    reverse_plain: HashMap<String, String>,
    /// Source database to every target database it has mapped into.
    db_fanout: HashMap<String, BTreeSet<String>>,
}

impl MapperInner {
    /// Register a concrete source-to-target association.
    ///
    /// Keeps the reverse index injective: a target already claimed by a
    /// different source is a configuration error. Re-registering the same
    /// pair is a no-op that returns the stored entry, which is what makes
    /// repeated resolution of one namespace return identical values.
    fn register_plain(
        &mut self,
        source: &str,
        mapped: MappedNamespace,
        learned: bool,
    ) -> Result<MappedNamespace, ConfigError> {
        if let Some(existing) = self.reverse_plain.get(&mapped.name) {
            if existing != source {
                return Err(if learned {
                    ConfigError::LearnedDuplicateTarget {
                        source_ns: source.to_string(),
                        target: mapped.name.clone(),
                        existing: existing.clone(),
                    }
                } else {
                    ConfigError::DuplicateTarget {
                        source_ns: source.to_string(),
                        target: mapped.name.clone(),
                        existing: existing.clone(),
                    }
                });
            }
        }
        self.reverse_plain
            .insert(mapped.name.clone(), source.to_string());
        self.db_fanout
            .entry(database_of(source).to_string())
            .or_default()
            .insert(database_of(&mapped.name).to_string());
        Ok(self.plain.entry(source.to_string()).or_insert(mapped).clone())
    }
}

/// Routes source namespaces to target namespaces.
///
/// Constructed once from [`NamespaceConfig`] and shared by every tailer
/// worker for the process lifetime. All operations are synchronous; only
/// forward resolution mutates state (it learns wildcard matches), and it
/// does so under the internal lock.
#[derive(Debug)]
pub struct NamespaceMapper {
    wildcard: Vec<WildcardEntry>,
    exclusions: RegexSet,
    default_include_fields: Option<BTreeSet<String>>,
    default_exclude_fields: Option<BTreeSet<String>>,
    /// True when no mapping was configured at all; every namespace then
    /// routes to itself. The tables grow monotonically, so this cannot
    /// change after construction.
    passthrough: bool,
    inner: Mutex<MapperInner>,
}

impl NamespaceMapper {
    /// Build a mapper from its configuration.
    ///
    /// Field-scope conflicts, unresolvable wildcards, and target collisions
    /// between configured mappings are rejected here. Collisions introduced
    /// later by learned wildcard matches surface from the `resolve` call
    /// that learns them.
    pub fn new(config: NamespaceConfig) -> Result<Self, ConfigError> {
        let NamespaceConfig {
            namespace_set,
            ex_namespace_set,
            user_mapping,
            include_fields,
            exclude_fields,
        } = config;

        if !namespace_set.is_empty() && !ex_namespace_set.is_empty() {
            return Err(ConfigError::ExclusiveNamespaceLists);
        }

        let default_include_fields = field_set(include_fields);
        let default_exclude_fields = field_set(exclude_fields);
        if default_include_fields.is_some() && default_exclude_fields.is_some() {
            return Err(ConfigError::MixedDefaultFieldSelectors);
        }

        let exclusions = RegexSet::from_namespaces(&ex_namespace_set)?;

        // Inclusion-list entries without an explicit mapping map to themselves.
        let mut mapping = user_mapping;
        for namespace in namespace_set {
            mapping
                .entry(namespace.clone())
                .or_insert_with(|| MappingTarget::Rename(namespace));
        }

        let mut entries = Vec::with_capacity(mapping.len());
        for (source, target) in mapping {
            let (name, include, exclude) = match target {
                MappingTarget::Rename(name) => (name, None, None),
                MappingTarget::Descriptor(descriptor) => (
                    descriptor.rename.unwrap_or_else(|| source.clone()),
                    field_set(descriptor.fields),
                    field_set(descriptor.exclude_fields),
                ),
            };
            if include.is_some() && exclude.is_some() {
                return Err(ConfigError::MixedFieldSelectors { namespace: source });
            }
            if include.is_some() && default_exclude_fields.is_some() {
                return Err(ConfigError::FieldScopeConflict {
                    namespace: source,
                    local: "include",
                    global: "exclude",
                });
            }
            if exclude.is_some() && default_include_fields.is_some() {
                return Err(ConfigError::FieldScopeConflict {
                    namespace: source,
                    local: "exclude",
                    global: "include",
                });
            }
            entries.push((
                source,
                MappedNamespace {
                    name,
                    include_fields: include,
                    exclude_fields: exclude,
                },
            ));
        }

        let renames: Vec<(String, String)> = entries
            .iter()
            .map(|(source, mapped)| (source.clone(), mapped.name.clone()))
            .collect();
        validate::validate_target_namespaces(&renames)?;

        let mut wildcard = Vec::new();
        let mut inner = MapperInner::default();
        for (source, mapped) in entries {
            add_collection(&mut wildcard, &mut inner, &source, mapped)?;
        }

        let passthrough = wildcard.is_empty() && inner.plain.is_empty();
        Ok(Self {
            wildcard,
            exclusions,
            default_include_fields,
            default_exclude_fields,
            passthrough,
            inner: Mutex::new(inner),
        })
    }

    /// Resolve a source namespace to its mapped target.
    ///
    /// Excluded namespaces resolve to `None` regardless of any mapping.
    /// With no mapping configured every namespace maps to itself. Otherwise
    /// exact entries win, then wildcard entries are scanned in registration
    /// order; the first match is learned into the exact table so later
    /// lookups are O(1) and every lookup agrees on one target.
    pub fn resolve(&self, namespace: &str) -> Result<Option<MappedNamespace>, ConfigError> {
        if self.exclusions.contains(namespace) {
            tracing::debug!("Dropping excluded namespace {}", namespace);
            return Ok(None);
        }
        if self.passthrough {
            return Ok(Some(MappedNamespace::new(namespace)));
        }

        let mut inner = self.inner.lock().unwrap();
        if let Some(mapped) = inner.plain.get(namespace) {
            return Ok(Some(mapped.clone()));
        }
        for entry in &self.wildcard {
            if let Some(name) = entry.source.match_replace(namespace, &entry.mapped.name) {
                // Miss and learn happen under one lock acquisition, so
                // concurrent resolvers of an unseen namespace agree on
                // the entry the first one stored.
                let learned = inner.register_plain(
                    namespace,
                    MappedNamespace {
                        name,
                        include_fields: entry.mapped.include_fields.clone(),
                        exclude_fields: entry.mapped.exclude_fields.clone(),
                    },
                    true,
                )?;
                tracing::debug!(
                    "Learned wildcard namespace mapping {} -> {}",
                    namespace,
                    learned.name
                );
                return Ok(Some(learned));
            }
        }
        Ok(None)
    }

    /// Target namespace for a source namespace, or `None` when the source
    /// is not routed.
    pub fn map_namespace(&self, namespace: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.resolve(namespace)?.map(|mapped| mapped.name))
    }

    /// Every target database the source database has mapped into.
    ///
    /// Database-wide operations fan out to all of them. The database's
    /// command namespace is resolved first, so the fanout is populated even
    /// when no collection under the source database was ever observed.
    /// Returns an empty list for a database that is unknown or entirely
    /// excluded.
    pub fn map_database(&self, database: &str) -> Result<Vec<String>, ConfigError> {
        if self.passthrough {
            return Ok(vec![database.to_string()]);
        }
        self.resolve(&format!("{}.$cmd", database))?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .db_fanout
            .get(database)
            .map(|databases| databases.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Source namespace for a target namespace, or `None` when no mapping
    /// can produce the target.
    ///
    /// The inverse of `resolve`: the wildcard entries' target patterns are
    /// the matchable side and their source patterns the substitution
    /// template. Unlike forward resolution this never learns anything.
    pub fn unmap(&self, target: &str) -> Option<String> {
        if self.passthrough {
            return Some(target.to_string());
        }
        {
            let inner = self.inner.lock().unwrap();
            if let Some(source) = inner.reverse_plain.get(target) {
                return Some(source.clone());
            }
        }
        for entry in &self.wildcard {
            if let Some(source) = entry.target.match_replace(target, entry.source.as_str()) {
                return Some(source);
            }
        }
        None
    }

    /// Effective include and exclude field lists for a source namespace.
    ///
    /// The resolved namespace's own lists win; the global defaults apply
    /// only when it carries none. A namespace that does not route yields
    /// `(None, None)`.
    pub fn fields(
        &self,
        namespace: &str,
    ) -> Result<(Option<BTreeSet<String>>, Option<BTreeSet<String>>), ConfigError> {
        match self.resolve(namespace)? {
            Some(mapped) => Ok(self.effective_fields(mapped)),
            None => Ok((None, None)),
        }
    }

    /// Projection document for reads against a source namespace.
    ///
    /// An include list yields `{"_id": 1, field: 1, ...}`, an exclude list
    /// `{field: 0, ...}`. Entries in `caller` are merged over the mandatory
    /// set and win on key collision. With no field restriction the caller's
    /// projection passes through unmodified; a namespace that does not
    /// route yields `None`.
    pub fn projection(
        &self,
        namespace: &str,
        caller: Option<Document>,
    ) -> Result<Option<Document>, ConfigError> {
        let Some(mapped) = self.resolve(namespace)? else {
            return Ok(None);
        };
        let mut projection = match self.effective_fields(mapped) {
            (Some(fields), _) => {
                let mut mandatory = doc! { "_id": 1 };
                for field in fields {
                    mandatory.insert(field, 1);
                }
                mandatory
            }
            (None, Some(fields)) => {
                let mut mandatory = Document::new();
                for field in fields {
                    mandatory.insert(field, 0);
                }
                mandatory
            }
            (None, None) => return Ok(caller),
        };
        if let Some(caller) = caller {
            for (field, value) in caller {
                projection.insert(field, value);
            }
        }
        Ok(Some(projection))
    }

    fn effective_fields(
        &self,
        mapped: MappedNamespace,
    ) -> (Option<BTreeSet<String>>, Option<BTreeSet<String>>) {
        if mapped.has_fields() {
            (mapped.include_fields, mapped.exclude_fields)
        } else {
            (
                self.default_include_fields.clone(),
                self.default_exclude_fields.clone(),
            )
        }
    }
}

/// Register one mapping plus the command-namespace companion for its
/// database, so database-level commands route to the target database even
/// before any collection under the source database is observed.
fn add_collection(
    wildcard: &mut Vec<WildcardEntry>,
    inner: &mut MapperInner,
    source: &str,
    mapped: MappedNamespace,
) -> Result<(), ConfigError> {
    let command_source = format!("{}.$cmd", database_of(source));
    let command_target = format!("{}.$cmd", database_of(&mapped.name));
    add_namespace(wildcard, inner, source, mapped)?;
    add_namespace(
        wildcard,
        inner,
        &command_source,
        MappedNamespace::new(command_target),
    )?;
    Ok(())
}

fn add_namespace(
    wildcard: &mut Vec<WildcardEntry>,
    inner: &mut MapperInner,
    source: &str,
    mapped: MappedNamespace,
) -> Result<(), ConfigError> {
    if source.contains('*') {
        // Mappings under one database repeat the same command companion;
        // keep one copy.
        if wildcard
            .iter()
            .any(|entry| entry.source.as_str() == source && entry.mapped == mapped)
        {
            return Ok(());
        }
        wildcard.push(WildcardEntry {
            source: NamespacePattern::compile(source)?,
            target: NamespacePattern::compile(&mapped.name)?,
            mapped,
        });
    } else {
        inner.register_plain(source, mapped, false)?;
    }
    Ok(())
}

/// The database segment of a namespace (everything before the first `.`,
/// or the whole string when there is none).
fn database_of(namespace: &str) -> &str {
    namespace
        .split_once('.')
        .map_or(namespace, |(database, _)| database)
}

/// Normalized field list: an empty or missing list means no restriction.
fn field_set(fields: Option<Vec<String>>) -> Option<BTreeSet<String>> {
    fields.and_then(|fields| {
        if fields.is_empty() {
            None
        } else {
            Some(fields.into_iter().collect())
        }
    })
}
