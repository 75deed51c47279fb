//! Configuration loading, precedence and store resolution tests

use ethpm_config::{
    resolve_packages_dir, ConfigError, ConfigLoader, GlobalConfig, IpfsConfig, StoreConfig,
    DEFAULT_IPFS_GATEWAY, PACKAGES_DIR_NAME,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ENV_VARS: [&str; 4] = [
    "ETHPM_IPFS_GATEWAY",
    "ETHPM_IPFS_API",
    "ETHPM_PACKAGES_DIR",
    "GITHUB_TOKEN",
];

fn clear_env() {
    for var in ENV_VARS {
        env::remove_var(var);
    }
}

fn create_config_file(dir: &Path, content: &str) -> PathBuf {
    let config_path = dir.join("config.toml");
    fs::write(&config_path, content).unwrap();
    config_path
}

// ============================================================================
// Config Loading Tests
// ============================================================================

#[test]
#[serial]
fn test_load_full_config() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        r#"
[ipfs]
gateway = "https://ipfs.io"
api = "http://127.0.0.1:5001"

[github]
api_token = "token"

[store]
packages_dir = "/projects/wallet/ethpm_packages"
"#,
    );

    let config = ConfigLoader::with_root(temp_dir.path()).load().unwrap();

    assert_eq!(
        config,
        GlobalConfig {
            ipfs: Some(IpfsConfig {
                gateway: Some("https://ipfs.io".to_string()),
                api: Some("http://127.0.0.1:5001".to_string()),
            }),
            github: config.github.clone(),
            store: Some(StoreConfig {
                packages_dir: Some(PathBuf::from("/projects/wallet/ethpm_packages")),
            }),
        }
    );
    assert_eq!(config.github_token(), Some("token"));
}

#[test]
#[serial]
fn test_effective_config_serializes_to_toml() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        r#"
[ipfs]
gateway = "https://gateway.example"
"#,
    );
    env::set_var("ETHPM_IPFS_API", "http://127.0.0.1:5001");
    env::set_var("GITHUB_TOKEN", "token");

    let config = ConfigLoader::with_root(temp_dir.path()).load().unwrap();
    clear_env();

    insta::assert_snapshot!(toml::to_string(&config).unwrap(), @r###"
    [ipfs]
    gateway = "https://gateway.example"
    api = "http://127.0.0.1:5001"

    [github]
    api_token = "token"
    "###);
}

#[test]
#[serial]
fn test_load_with_empty_config() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "");

    let config = ConfigLoader::with_root(temp_dir.path()).load().unwrap();
    assert_eq!(config.ipfs_gateway(), DEFAULT_IPFS_GATEWAY);
    assert_eq!(config.ipfs_api(), None);
}

#[test]
#[serial]
fn test_invalid_toml_reports_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "[ipfs\ngateway = ");

    match ConfigLoader::with_root(temp_dir.path()).load() {
        Err(ConfigError::TomlParseError { file, .. }) => assert_eq!(file, path),
        other => panic!("expected TomlParseError, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_unknown_section_rejected() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[registry]\naddress = \"0x0\"\n");

    assert!(ConfigLoader::with_root(temp_dir.path()).load().is_err());
}

#[rstest]
#[case("ipfs.io")]
#[case("ftp://ipfs.io")]
#[case("ws://127.0.0.1:5001")]
#[serial]
fn test_non_http_api_rejected(#[case] api: &str) {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), &format!("[ipfs]\napi = \"{}\"\n", api));

    assert!(matches!(
        ConfigLoader::with_root(temp_dir.path()).load(),
        Err(ConfigError::InvalidValue { .. })
    ));
}

// ============================================================================
// Precedence Tests
// ============================================================================

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        r#"
[ipfs]
api = "http://127.0.0.1:5001"

[store]
packages_dir = "/from/file/ethpm_packages"
"#,
    );

    env::set_var("ETHPM_IPFS_API", "http://10.0.0.2:5001");
    env::set_var("ETHPM_PACKAGES_DIR", "/from/env/ethpm_packages");
    let config = ConfigLoader::with_root(temp_dir.path()).load();
    env::remove_var("ETHPM_IPFS_API");
    env::remove_var("ETHPM_PACKAGES_DIR");

    let config = config.unwrap();
    assert_eq!(config.ipfs_api(), Some("http://10.0.0.2:5001"));
    assert_eq!(
        config.packages_dir(),
        Some(Path::new("/from/env/ethpm_packages"))
    );
}

#[test]
#[serial]
fn test_empty_env_value_is_ignored() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[github]\napi_token = \"from-file\"\n");

    env::set_var("GITHUB_TOKEN", "");
    let config = ConfigLoader::with_root(temp_dir.path()).load();
    env::remove_var("GITHUB_TOKEN");

    assert_eq!(config.unwrap().github_token(), Some("from-file"));
}

#[test]
#[serial]
fn test_caller_override_wins() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[ipfs]\ngateway = \"https://ipfs.io\"\n");

    let mut config = ConfigLoader::with_root(temp_dir.path()).load().unwrap();
    config.merge(&GlobalConfig {
        ipfs: Some(IpfsConfig {
            gateway: Some("http://localhost:8080".to_string()),
            api: None,
        }),
        ..Default::default()
    });

    assert_eq!(config.ipfs_gateway(), "http://localhost:8080");
}

#[test]
#[serial]
fn test_config_path_under_ethpmcli_root() {
    env::set_var("XDG_ETHPMCLI_ROOT", "/tmp/ethpmcli-test-root");
    let path = ConfigLoader::new().config_path();
    env::remove_var("XDG_ETHPMCLI_ROOT");

    assert_eq!(
        path.unwrap(),
        PathBuf::from("/tmp/ethpmcli-test-root/config.toml")
    );
}

// ============================================================================
// Packages Directory Tests
// ============================================================================

#[test]
fn test_existing_default_dir_is_reused() {
    let temp_dir = TempDir::new().unwrap();
    let existing = temp_dir.path().join(PACKAGES_DIR_NAME);
    fs::create_dir(&existing).unwrap();
    fs::write(existing.join("ethpm.lock"), "{}\n").unwrap();

    let dir = resolve_packages_dir(None, temp_dir.path()).unwrap();
    assert_eq!(dir, existing);
    assert!(dir.join("ethpm.lock").exists());
}

#[test]
fn test_explicit_dir_is_accepted() {
    let temp_dir = TempDir::new().unwrap();
    let explicit = temp_dir.path().join("nested").join(PACKAGES_DIR_NAME);
    fs::create_dir_all(&explicit).unwrap();

    let dir = resolve_packages_dir(Some(&explicit), Path::new("/does/not/matter")).unwrap();
    assert_eq!(dir, explicit);
}

#[test]
fn test_explicit_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join(PACKAGES_DIR_NAME);
    fs::write(&file, "").unwrap();

    let err = resolve_packages_dir(Some(&file), temp_dir.path()).unwrap_err();
    assert!(err.to_string().contains("not an existing directory"));
}
