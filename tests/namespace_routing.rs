//! End-to-end namespace routing: configuration text in, routing decisions out.

use bson::doc;
use oplog_sync::{ConfigError, NamespaceConfig, NamespaceMapper};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .try_init();
}

fn mapper_from_yaml(yaml: &str) -> NamespaceMapper {
    let config = NamespaceConfig::from_yaml(yaml).unwrap();
    NamespaceMapper::new(config).unwrap()
}

#[test]
fn test_inclusion_list_routing() {
    init_tracing();

    let mapper = mapper_from_yaml(
        r#"
namespace_set:
  - db1.col1
  - db1.col2
"#,
    );

    assert_eq!(
        mapper.map_namespace("db1.col1").unwrap().as_deref(),
        Some("db1.col1")
    );
    assert_eq!(mapper.map_namespace("db1.col4").unwrap(), None);
    assert_eq!(mapper.map_database("db1").unwrap(), vec!["db1"]);
    assert!(mapper.map_database("other").unwrap().is_empty());
}

#[test]
fn test_exclusion_list_blocks_forward_mapping_only() {
    init_tracing();

    let mapper = mapper_from_yaml(
        r#"
ex_namespace_set:
  - ex.*
"#,
    );

    assert_eq!(mapper.map_namespace("ex.clude").unwrap(), None);
    assert_eq!(mapper.map_namespace("ex.clude2").unwrap(), None);
    // Everything else passes through untouched.
    assert_eq!(
        mapper.map_namespace("kept.col").unwrap().as_deref(),
        Some("kept.col")
    );
    // Exclusion does not apply to the reverse direction.
    assert_eq!(mapper.unmap("ex.clude").as_deref(), Some("ex.clude"));
}

#[test]
fn test_wildcard_renames_unmap_to_their_sources() {
    init_tracing();

    let mapper = mapper_from_yaml(
        r#"
user_mapping:
  db2.*: db2.f*
  db_*.foo: db_new_*.foo
"#,
    );

    assert_eq!(mapper.unmap("db2.foo").as_deref(), Some("db2.oo"));
    assert_eq!(
        mapper.unmap("db_new_123.foo").as_deref(),
        Some("db_123.foo")
    );
}

#[test]
fn test_conflicting_targets_rejected_at_construction() {
    init_tracing();

    let config = NamespaceConfig::from_yaml(
        r#"
user_mapping:
  db1.col1: newdb.newcol
  db2.col1: newdb.newcol
"#,
    )
    .unwrap();

    assert!(matches!(
        NamespaceMapper::new(config),
        Err(ConfigError::DuplicateTarget { .. })
    ));
}

#[test]
fn test_projection_from_global_include_fields() {
    init_tracing();

    let mapper = mapper_from_yaml(
        r#"
namespace_set:
  - db.*

include_fields:
  - foo
  - nested.field
"#,
    );

    assert_eq!(
        mapper.projection("db.foo", None).unwrap(),
        Some(doc! { "_id": 1, "foo": 1, "nested.field": 1 })
    );
    assert_eq!(mapper.projection("ignored.name", None).unwrap(), None);
}

#[test]
fn test_wildcard_rename_with_field_restrictions() {
    init_tracing();

    let mapper = mapper_from_yaml(
        r#"
user_mapping:
  tenants_*.orders:
    rename: archive_*.orders
    fields:
      - status
      - total
"#,
    );

    let mapped = mapper.resolve("tenants_acme.orders").unwrap().unwrap();
    assert_eq!(mapped.name, "archive_acme.orders");

    let (include, exclude) = mapper.fields("tenants_acme.orders").unwrap();
    assert_eq!(
        include,
        Some(["status".to_string(), "total".to_string()].into())
    );
    assert_eq!(exclude, None);

    assert_eq!(
        mapper.projection("tenants_acme.orders", None).unwrap(),
        Some(doc! { "_id": 1, "status": 1, "total": 1 })
    );

    // A learned mapping is reversible and feeds database fanout.
    assert_eq!(
        mapper.unmap("archive_acme.orders").as_deref(),
        Some("tenants_acme.orders")
    );
    assert_eq!(
        mapper.map_database("tenants_acme").unwrap(),
        vec!["archive_acme"]
    );
}
