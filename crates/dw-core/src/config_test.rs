use super::*;

#[test]
fn test_parse_minimal_config() {
    let config: Config = serde_yaml::from_str("name: retail").unwrap();
    config.validate().unwrap();
    assert_eq!(config.name, "retail");
    assert_eq!(config.layers, Layers::default());
    assert_eq!(config.database.path, "warehouse.duckdb");
    assert_eq!(config.source_system, "dwflow");

    let root = std::path::PathBuf::from("/tmp/proj");
    assert_eq!(config.target_path_absolute(&root), root.join("target"));
    assert_eq!(config.schema_paths_absolute(&root), vec![root.join("schema")]);
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
name: retail
database:
  path: ./warehouse.duckdb
layers:
  warehouse: star
source_system: erp
sources:
  - name: erp
    kind: csv
    path: data/erp
    tables: [customers, orders]
  - name: crm
    kind: duckdb
    path: data/crm.duckdb
    schema: public
transforms:
  - name: customers
    sql: transforms/customers.sql
  - name: orders
    sql: transforms/orders.sql
    depends_on: [customers]
summaries:
  - name: sum_sales
    sql: summaries/sum_sales.sql
targets:
  prod:
    database:
      path: /data/prod.duckdb
    source_system: erp_prod
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    config.validate().unwrap();
    assert_eq!(config.layers.warehouse, "star");
    assert_eq!(config.layers.extract, "ext");
    assert_eq!(config.sources[1].kind, SourceKind::DuckDb);
    assert_eq!(config.transforms[1].depends_on[0], "customers");
    assert_eq!(config.layers.for_kind(TableKind::Fact), "star");
    assert_eq!(config.layers.for_kind(TableKind::Summary), "sum");
}

#[test]
fn test_target_overrides() {
    let yaml = r#"
name: retail
targets:
  prod:
    database:
      path: /data/prod.duckdb
    source_system: erp_prod
  dev: {}
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(
        config.get_database_config(Some("prod")).unwrap().path,
        "/data/prod.duckdb"
    );
    assert_eq!(
        config.get_database_config(Some("dev")).unwrap().path,
        "warehouse.duckdb"
    );
    assert_eq!(config.get_source_system(Some("prod")), "erp_prod");
    assert_eq!(config.get_source_system(None), "dwflow");

    assert!(config.get_merged_vars(Some("dev")).is_empty());

    let err = config.get_database_config(Some("qa")).unwrap_err();
    assert!(err.to_string().contains("Available targets: dev, prod"));
}

#[test]
fn test_unknown_field_rejected() {
    let result: Result<Config, _> = serde_yaml::from_str("name: x\nmaterialization: table");
    assert!(result.is_err());
}

#[test]
fn test_empty_name_rejected() {
    let config: Config = serde_yaml::from_str("name: \"  \"").unwrap();
    assert!(matches!(
        config.validate(),
        Err(CoreError::ConfigInvalid { .. })
    ));
}

#[test]
fn test_shared_layer_name_rejected() {
    let config: Config =
        serde_yaml::from_str("name: x\nlayers:\n  staging: dwh\n").unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("more than one layer"));
}

#[test]
fn test_unknown_transform_dependency_rejected() {
    let yaml = r#"
name: x
transforms:
  - name: orders
    sql: orders.sql
    depends_on: [customers]
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("unknown transform 'customers'"));
}

#[test]
fn test_duplicate_source_rejected() {
    let yaml = r#"
name: x
sources:
  - { name: erp, kind: csv, path: a }
  - { name: erp, kind: parquet, path: b }
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert!(matches!(
        config.validate(),
        Err(CoreError::Duplicate { .. })
    ));
}

#[test]
fn test_load_from_dir() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Config::load_from_dir(dir.path()),
        Err(CoreError::ConfigNotFound { .. })
    ));

    std::fs::write(dir.path().join("dwflow.yaml"), "name: from_yaml").unwrap();
    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.name, "from_yaml");
}

#[test]
fn test_target_vars_override_base_vars() {
    let yaml = r#"
name: retail
vars:
  region: emea
  cutoff: "2024-01-01"
targets:
  prod:
    vars:
      region: apac
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    let merged = config.get_merged_vars(Some("prod"));
    assert_eq!(merged["region"], serde_yaml::Value::from("apac"));
    assert_eq!(merged["cutoff"], serde_yaml::Value::from("2024-01-01"));
    assert!(matches!(config.get_merged_vars(None), Cow::Borrowed(_)));
}

#[test]
#[serial_test::serial]
fn test_resolve_target_prefers_cli_flag() {
    std::env::set_var("DW_TARGET", "prod");
    assert_eq!(Config::resolve_target(Some("dev")).as_deref(), Some("dev"));
    assert_eq!(Config::resolve_target(None).as_deref(), Some("prod"));
    std::env::remove_var("DW_TARGET");
    assert_eq!(Config::resolve_target(None), None);
}

#[test]
fn test_database_config_takes_only_a_path() {
    let config: Config =
        serde_yaml::from_str("name: x\ndatabase:\n  path: data/wh.duckdb\n").unwrap();
    assert_eq!(config.database.path, "data/wh.duckdb");

    let result: Result<Config, _> =
        serde_yaml::from_str("name: x\ndatabase:\n  path: wh.duckdb\n  name: main\n");
    assert!(result.is_err());
}
