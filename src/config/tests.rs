use super::*;
use crate::chunker::ChunkerConfig;
use tempfile::TempDir;

fn test_config(base_dir: &Path) -> Config {
    Config {
        ollama: OllamaConfig::default(),
        chunker: ChunkerConfig::default(),
        rate_limit: RateLimitConfig::default(),
        base_dir: base_dir.to_path_buf(),
    }
}

#[test]
fn load_missing_file_returns_defaults() {
    let temp_dir = TempDir::new().expect("can create temp dir");

    let config = Config::load(temp_dir.path()).expect("load should succeed");
    assert_eq!(config.ollama, OllamaConfig::default());
    assert_eq!(config.chunker, ChunkerConfig::default());
    assert_eq!(config.base_dir, temp_dir.path());
}

#[test]
fn save_and_load_round_trip() {
    let temp_dir = TempDir::new().expect("can create temp dir");

    let mut config = test_config(temp_dir.path());
    config.ollama.model = "mxbai-embed-large".to_string();
    config.chunker.max_chunk_size = 800;
    config.chunker.repack_chunk_size = 900;
    config.rate_limit.max_requests = 10;
    config.save().expect("save should succeed");

    let loaded = Config::load(temp_dir.path()).expect("load should succeed");
    assert_eq!(loaded, config);
}

#[test]
fn rejects_invalid_protocol() {
    let temp_dir = TempDir::new().expect("can create temp dir");

    let mut config = test_config(temp_dir.path());
    config.ollama.protocol = "ftp".to_string();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidProtocol(_))
    ));
}

#[test]
fn rejects_empty_model() {
    let temp_dir = TempDir::new().expect("can create temp dir");

    let mut config = test_config(temp_dir.path());
    config.ollama.model = "  ".to_string();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidModel(_))
    ));
}

#[test]
fn rejects_repack_budget_below_first_pass_budget() {
    let temp_dir = TempDir::new().expect("can create temp dir");

    let mut config = test_config(temp_dir.path());
    config.chunker.max_chunk_size = 1000;
    config.chunker.repack_chunk_size = 500;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::RepackChunkSizeTooSmall(500, 1000))
    ));
}

#[test]
fn rejects_out_of_range_oversize_factor() {
    let temp_dir = TempDir::new().expect("can create temp dir");

    let mut config = test_config(temp_dir.path());
    config.chunker.oversize_factor = 0.5;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidOversizeFactor(_))
    ));
}

#[test]
fn rejects_zero_rate_limit_window() {
    let temp_dir = TempDir::new().expect("can create temp dir");

    let mut config = test_config(temp_dir.path());
    config.rate_limit.window_seconds = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidRateLimit(_, 0))
    ));
}

#[test]
fn derived_paths_live_under_base_dir() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let config = test_config(temp_dir.path());

    assert_eq!(config.config_file_path(), temp_dir.path().join("config.toml"));
    assert_eq!(config.database_path(), temp_dir.path().join("registry.db"));
    assert_eq!(
        config.vector_database_path(),
        temp_dir.path().join("vectors")
    );
}
