use std::io::Write;

use husk_config::{ConfigError, HuskConfig, ParseModeSetting};

#[test]
fn loads_config_file_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[parser]\nmode = \"full\"\n\n[logging]\nstderr = false").unwrap();

    let config = HuskConfig::load_from_path(file.path()).unwrap();
    assert_eq!(config.parser.mode, ParseModeSetting::Full);
    assert!(!config.logging.stderr);
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = HuskConfig::load_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.toml"), "{err}");
}

#[test]
fn toml_errors_do_not_echo_source_snippets() {
    let err = HuskConfig::load_from_str("[logging]\nlevel = 12\n").unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("failed to parse toml config"), "{message}");
    assert!(!message.contains("level = 12"), "{message}");
}
