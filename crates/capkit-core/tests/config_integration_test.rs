use capkit_core::{CapkitConfig, ConfigError, ConfigManager};
use tempfile::TempDir;

#[test]
fn test_default_config_file_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("nested").join("config.toml");

    ConfigManager::create_default_config(&config_path).unwrap();
    assert!(config_path.exists());

    let content = std::fs::read_to_string(&config_path).unwrap();
    let loaded: CapkitConfig = toml::from_str(&content).unwrap();
    let defaults = CapkitConfig::default();
    assert_eq!(loaded.store, defaults.store);
    assert_eq!(loaded.engine, defaults.engine);
    assert_eq!(loaded.logging, defaults.logging);
    assert!(ConfigManager::validate_config(&loaded).is_ok());
}

#[test]
fn test_missing_config_file_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("absent.toml");

    match ConfigManager::from_path(&missing) {
        Err(ConfigError::NotFound(path)) => assert!(path.ends_with("absent.toml")),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("expected a missing-file error"),
    }
}

#[test]
fn test_malformed_config_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "[engine\nmax_concurrent_users = ").unwrap();

    assert!(matches!(
        ConfigManager::from_path(&path),
        Err(ConfigError::ParseError(_))
    ));
}
