use crate::ENV_MUTEX;
use clap::Parser;
use dedupe::cli::Cli;
use dedupe::config::{Config, ConfigError};
use dedupe::output::OutputFormat;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_figment_layers_match_loader() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "min_size = 512\n[compare]\nname = true\n").unwrap();

    std::env::set_var("DEDUPE_PIPELINE__SCANNERS", "7");
    let by_hand: Result<Config, _> = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("DEDUPE_").split("__"))
        .extract();
    let loaded = Config::load(Some(&path));
    std::env::remove_var("DEDUPE_PIPELINE__SCANNERS");

    let by_hand = by_hand.unwrap();
    assert_eq!(by_hand, loaded.unwrap());
    assert_eq!(by_hand.min_size, 512);
    assert!(by_hand.compare.name);
    assert_eq!(by_hand.pipeline.scanners, 7);
}

#[test]
fn test_printed_config_loads_back() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let dir = TempDir::new().unwrap();
    let original = Config {
        roots: vec![PathBuf::from("/photos"), PathBuf::from("/backup")],
        trash: Some(PathBuf::from("/trash")),
        min_size: 4096,
        output: OutputFormat::Json,
        ..Config::default()
    };
    let path = dir.path().join("printed.toml");
    fs::write(&path, original.to_toml().unwrap()).unwrap();

    assert_eq!(Config::load(Some(&path)).unwrap(), original);
}

#[test]
fn test_full_precedence_chain() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "min_size = 10\nfollow_symlinks = true\n[pipeline]\nmatchers = 2\nmovers = 2\n",
    )
    .unwrap();
    let path_arg = path.to_string_lossy().into_owned();

    std::env::set_var("DEDUPE_MIN_SIZE", "20");
    std::env::set_var("DEDUPE_PIPELINE__MATCHERS", "3");
    let cli = Cli::try_parse_from([
        "dedupe",
        "--config",
        path_arg.as_str(),
        "--min-size",
        "1K",
        "--follow-symlinks=false",
    ])
    .unwrap();
    let config = Config::from_cli(&cli);
    std::env::remove_var("DEDUPE_MIN_SIZE");
    std::env::remove_var("DEDUPE_PIPELINE__MATCHERS");

    let config = config.unwrap();
    assert_eq!(config.min_size, 1024, "flag beats env and file");
    assert!(!config.follow_symlinks, "explicit false flag beats file");
    assert_eq!(config.pipeline.matchers, 3, "env beats file");
    assert_eq!(config.pipeline.movers, 2, "file beats default");
    assert_eq!(config.pipeline.scanners, 2, "default survives");
}

#[test]
fn test_bad_env_value_is_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.toml");
    fs::write(&path, "").unwrap();

    std::env::set_var("DEDUPE_PIPELINE__MOVERS", "several");
    let result = Config::load(Some(&path));
    std::env::remove_var("DEDUPE_PIPELINE__MOVERS");

    assert!(matches!(result, Err(ConfigError::Load(_))));
}

#[test]
fn test_validated_roots_are_canonical_and_ordered() {
    let high = TempDir::new().unwrap();
    let low = TempDir::new().unwrap();
    fs::create_dir(low.path().join("sub")).unwrap();
    let config = Config {
        roots: vec![high.path().to_path_buf(), low.path().join("sub/..")],
        ..Config::default()
    };

    let run = config.validate().unwrap();
    assert_eq!(
        run.pipeline.roots,
        vec![
            high.path().canonicalize().unwrap(),
            low.path().canonicalize().unwrap()
        ]
    );
}
