//! Deserializable configuration for the namespace mapper.
//!
//! The mapper is constructed from a [`NamespaceConfig`], typically loaded
//! from a YAML or JSON file. All sections are optional; an empty
//! configuration puts the mapper in passthrough mode.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Namespace routing configuration.
///
/// `namespace_set` and `ex_namespace_set` are mutually exclusive; mixing
/// them is rejected when the mapper is built. `user_mapping` is a
/// `BTreeMap` so mappings register in a deterministic order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    /// Source namespaces to replicate, as exact names or single-`*`
    /// patterns. Entries without a `user_mapping` entry map to themselves.
    pub namespace_set: Vec<String>,

    /// Source namespaces to drop, as exact names or single-`*` patterns.
    pub ex_namespace_set: Vec<String>,

    /// Source namespace to target namespace mappings.
    pub user_mapping: BTreeMap<String, MappingTarget>,

    /// Default fields to keep for namespaces without their own field list.
    pub include_fields: Option<Vec<String>>,

    /// Default fields to drop for namespaces without their own field list.
    pub exclude_fields: Option<Vec<String>>,
}

/// Right-hand side of a `user_mapping` entry.
///
/// Either a bare target namespace string or a descriptor carrying field
/// restrictions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingTarget {
    /// Target namespace, e.g. `"db2.*": "db2.f*"`.
    Rename(String),

    /// Target descriptor with optional rename and field lists.
    Descriptor(MappingDescriptor),
}

/// Mapping descriptor form of a `user_mapping` entry.
///
/// A missing `rename` maps the source namespace to itself. `fields` and
/// `excludeFields` are mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingDescriptor {
    /// Target namespace.
    pub rename: Option<String>,

    /// Fields to keep for this namespace.
    pub fields: Option<Vec<String>>,

    /// Fields to drop for this namespace.
    #[serde(rename = "excludeFields")]
    pub exclude_fields: Option<Vec<String>>,
}

impl NamespaceConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
