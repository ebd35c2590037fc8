use super::*;
use tempfile::TempDir;

fn valid_config(base_dir: &Path) -> Config {
    Config {
        ollama: OllamaConfig::default(),
        chunking: ChunkingConfig::default(),
        ingest: IngestConfig::default(),
        cache: CacheConfig::default(),
        search: SearchConfig::default(),
        base_dir: base_dir.to_path_buf(),
    }
}

#[test]
fn defaults_are_valid() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let config = valid_config(temp_dir.path());
    assert!(config.validate().is_ok());
}

#[test]
fn load_missing_file_returns_defaults() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let config = Config::load(temp_dir.path()).expect("load should succeed");

    assert_eq!(config.ollama.model, "nomic-embed-text:latest");
    assert_eq!(config.chunking.chunk_size, 1000);
    assert_eq!(config.chunking.overlap, 200);
    assert_eq!(config.search.result_limit, 10);
    assert_eq!(config.base_dir, temp_dir.path());
}

#[test]
fn save_and_reload_round_trip() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let mut config = valid_config(temp_dir.path());
    config.ollama.model = "custom-model".to_string();
    config.chunking.chunk_size = 500;
    config.chunking.overlap = 100;
    config.cache.enabled = false;

    config.save().expect("save should succeed");

    let reloaded = Config::load(temp_dir.path()).expect("load should succeed");
    assert_eq!(reloaded, config);
}

#[test]
fn rejects_overlap_not_smaller_than_chunk_size() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let mut config = valid_config(temp_dir.path());
    config.chunking.chunk_size = 100;
    config.chunking.overlap = 100;

    assert!(matches!(
        config.validate(),
        Err(ConfigError::OverlapTooLarge(100, 100))
    ));
}

#[test]
fn rejects_invalid_protocol() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let mut config = valid_config(temp_dir.path());
    config.ollama.protocol = "ftp".to_string();

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidProtocol(_))
    ));
}

#[test]
fn rejects_out_of_range_threshold() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let mut config = valid_config(temp_dir.path());
    config.search.similarity_threshold = 1.5;

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidThreshold(_))
    ));
}

#[test]
fn rejects_zero_result_limit() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let mut config = valid_config(temp_dir.path());
    config.search.result_limit = 0;

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidResultLimit(0))
    ));
}

#[test]
fn zero_capacity_allowed_when_cache_disabled() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let mut config = valid_config(temp_dir.path());
    config.cache.enabled = false;
    config.cache.max_entries = 0;

    assert!(config.validate().is_ok());
}

#[test]
fn endpoint_url_built_from_parts() {
    let ollama = OllamaConfig {
        host: "embeddings.internal".to_string(),
        port: 8080,
        ..OllamaConfig::default()
    };
    let url = ollama.endpoint_url().expect("valid URL");
    assert_eq!(url.as_str(), "http://embeddings.internal:8080/");
}
