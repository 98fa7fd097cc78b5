//! Error types for the namespace mapping engine.

/// Error raised for invalid namespace mapping configuration.
///
/// Explicit conflicts surface when the mapper is constructed; collisions
/// introduced by learned wildcard matches surface from the `resolve` call
/// that learns them.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A namespace descriptor sets both include and exclude fields
    #[error("namespace '{namespace}' cannot specify both include and exclude fields")]
    MixedFieldSelectors { namespace: String },

    /// The global include and exclude field lists are both set
    #[error("global include and exclude field lists cannot both be set")]
    MixedDefaultFieldSelectors,

    /// A namespace field list contradicts the global default's polarity
    #[error(
        "namespace '{namespace}' cannot specify {local} fields because a \
         global {global}-fields list is set"
    )]
    FieldScopeConflict {
        namespace: String,
        local: &'static str,
        global: &'static str,
    },

    /// Two configured source namespaces share one target namespace
    #[error(
        "multiple namespaces cannot be combined into one target namespace: \
         trying to map '{source_ns}' to '{target}' but '{existing}' already \
         maps to '{target}'"
    )]
    DuplicateTarget {
        source_ns: String,
        target: String,
        existing: String,
    },

    /// A learned wildcard match produced an already-claimed target namespace
    #[error(
        "multiple namespaces cannot be combined into one target namespace: \
         resolving '{source_ns}' to '{target}' but '{existing}' already maps \
         to '{target}'"
    )]
    LearnedDuplicateTarget {
        source_ns: String,
        target: String,
        existing: String,
    },

    /// Inclusion and exclusion namespace lists were both given
    #[error("namespace inclusion and exclusion lists cannot both be non-empty")]
    ExclusiveNamespaceLists,

    /// A mapping side contains more than one `*`
    #[error(
        "the namespace mapping from '{source_ns}' to '{target}' cannot \
         contain more than one '*' character"
    )]
    TooManyWildcards { source_ns: String, target: String },

    /// A mapping's source and target disagree on wildcard count
    #[error(
        "the namespace mapping from '{source_ns}' to '{target}' must contain \
         the same number of '*' characters"
    )]
    WildcardArityMismatch { source_ns: String, target: String },

    /// A wildcard moved between the database and collection segments
    #[error(
        "the namespace mapping from '{source_ns}' to '{target}' is invalid: \
         a '*' in the source database name must appear in the target \
         database name, and a '*' in the source collection name must appear \
         in the target collection name"
    )]
    WildcardSegmentMismatch { source_ns: String, target: String },

    /// A namespace pattern failed to compile
    #[error("invalid namespace pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Error reading a configuration file
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing YAML configuration
    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Error parsing JSON configuration
    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
}
