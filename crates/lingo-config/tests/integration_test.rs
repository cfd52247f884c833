//! Integration tests for lingo-config crate.

use lingo_common::test_utils::create_temp_dir;
use lingo_config::{Config, ConfigLoader, DatabaseBackend, CURRENT_CONFIG_VERSION};

#[test]
fn test_default_config_validation() {
    let config = Config::default();
    assert!(config.validate_all().is_ok());
}

#[test]
fn test_load_or_create_writes_defaults() {
    let dir = create_temp_dir();
    let path = dir.path().join("nested").join("lingo.yaml");

    let config = ConfigLoader::load_or_create(&path).expect("Failed to create config");
    assert!(path.exists());
    assert_eq!(config.version, CURRENT_CONFIG_VERSION);

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("backend: mysql"));
    assert!(written.contains("directory: languages"));
}

#[test]
fn test_load_or_create_keeps_existing_values() {
    let dir = create_temp_dir();
    let path = dir.path().join("lingo.yaml");
    std::fs::write(
        &path,
        "version: 1\ndatabase:\n  backend: sqlite\n  database: prefs.db\ncatalog:\n  directory: lang\n",
    )
    .unwrap();

    let config = ConfigLoader::load_or_create(&path).unwrap();
    assert_eq!(config.database.backend, DatabaseBackend::Sqlite);
    assert_eq!(config.database.database, "prefs.db");
    assert_eq!(config.catalog.directory, std::path::PathBuf::from("lang"));
}

#[test]
fn test_load_or_create_upgrades_old_version() {
    let dir = create_temp_dir();
    let path = dir.path().join("lingo.yaml");
    std::fs::write(&path, "version: 0\ndatabase:\n  port: 3307\n").unwrap();

    let config = ConfigLoader::load_or_create(&path).unwrap();
    assert_eq!(config.version, CURRENT_CONFIG_VERSION);
    assert_eq!(config.database.port, 3307);

    let rewritten = ConfigLoader::parse_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(rewritten.version, CURRENT_CONFIG_VERSION);
    assert_eq!(rewritten.database.port, 3307);
}

#[test]
fn test_save_and_reload() {
    let dir = create_temp_dir();
    let path = dir.path().join("saved.yaml");

    let mut config = Config::default();
    config.database.max_connections = 7;
    ConfigLoader::save(&path, &config).unwrap();

    let loaded = ConfigLoader::parse_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(loaded.database.max_connections, 7);
    assert!(!dir.path().join("saved.yaml.tmp").exists());
}
