//! Oplog Sync Library
//!
//! Namespace routing and checkpoint persistence for oplog-based
//! replication pipelines.
//!
//! # Features
//!
//! - Namespace mapping: route `database.collection` namespaces through
//!   exact names or single-`*` wildcard patterns
//! - Inclusion and exclusion lists: replicate only the configured
//!   namespaces, drop the rest
//! - Field restrictions: per-namespace or global include/exclude lists,
//!   exposed as MongoDB projection documents
//! - Reliable checkpointing: resume tailing from the last committed
//!   oplog timestamp after restarts and crashes
//!
//! # Usage
//!
//! ```
//! use oplog_sync::{NamespaceConfig, NamespaceMapper};
//!
//! # fn main() -> Result<(), oplog_sync::ConfigError> {
//! let config = NamespaceConfig::from_yaml(
//!     "user_mapping:\n  analytics_*.events: warehouse_*.events\n",
//! )?;
//! let mapper = NamespaceMapper::new(config)?;
//!
//! let target = mapper.map_namespace("analytics_7.events")?;
//! assert_eq!(target.as_deref(), Some("warehouse_7.events"));
//! assert_eq!(mapper.unmap("warehouse_7.events").as_deref(), Some("analytics_7.events"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod namespace;

// Re-export the checkpoint crate for convenience
pub use checkpoint::{self, CheckpointStore};

pub use config::{MappingDescriptor, MappingTarget, NamespaceConfig};
pub use error::ConfigError;
pub use namespace::{wildcard_in_db, MappedNamespace, NamespaceMapper, NamespacePattern, RegexSet};
