//! Global Configuration (`<ethpmcli root>/config.toml`)

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Read gateway used when nothing else is configured
pub const DEFAULT_IPFS_GATEWAY: &str = "https://ipfs.io";

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// IPFS endpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipfs: Option<IpfsConfig>,

    /// GitHub blob API credentials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubConfig>,

    /// Package store location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreConfig>,
}

/// IPFS endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct IpfsConfig {
    /// Read gateway (`<gateway>/ipfs/<cid>`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,

    /// HTTP API used for pinning (`<api>/api/v0/add`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
}

/// GitHub settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GithubConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

/// Package store settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Explicit `ethpm_packages` directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packages_dir: Option<PathBuf>,
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(ipfs) = &self.ipfs {
            if let Some(gateway) = &ipfs.gateway {
                validate_url("ipfs.gateway", gateway)?;
            }
            if let Some(api) = &ipfs.api {
                validate_url("ipfs.api", api)?;
            }
        }
        Ok(())
    }

    /// Effective IPFS read gateway
    pub fn ipfs_gateway(&self) -> &str {
        self.ipfs
            .as_ref()
            .and_then(|i| i.gateway.as_deref())
            .unwrap_or(DEFAULT_IPFS_GATEWAY)
    }

    /// IPFS API url, if pinning is configured
    pub fn ipfs_api(&self) -> Option<&str> {
        self.ipfs.as_ref().and_then(|i| i.api.as_deref())
    }

    pub fn github_token(&self) -> Option<&str> {
        self.github.as_ref().and_then(|g| g.api_token.as_deref())
    }

    pub fn packages_dir(&self) -> Option<&Path> {
        self.store.as_ref().and_then(|s| s.packages_dir.as_deref())
    }

    /// Merge another global config into this one
    /// Other config takes precedence for non-None values
    pub fn merge(&mut self, other: &GlobalConfig) {
        if let Some(other_ipfs) = &other.ipfs {
            let ipfs = self.ipfs.get_or_insert_with(IpfsConfig::default);
            if other_ipfs.gateway.is_some() {
                ipfs.gateway = other_ipfs.gateway.clone();
            }
            if other_ipfs.api.is_some() {
                ipfs.api = other_ipfs.api.clone();
            }
        }
        if let Some(github) = &other.github {
            if github.api_token.is_some() {
                self.github = Some(github.clone());
            }
        }
        if let Some(store) = &other.store {
            if store.packages_dir.is_some() {
                self.store = Some(store.clone());
            }
        }
    }
}

fn validate_url(field: &str, value: &str) -> ConfigResult<()> {
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("must be an http(s) url, got '{}'", value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_global_config() {
        let toml = r#"
[ipfs]
gateway = "https://cloudflare-ipfs.com"
"#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.ipfs_gateway(), "https://cloudflare-ipfs.com");
        assert_eq!(config.ipfs_api(), None);
    }

    #[test]
    fn test_parse_full_global_config() {
        let toml = r#"
[ipfs]
gateway = "https://ipfs.io"
api = "http://127.0.0.1:5001"

[github]
api_token = "ghp_example"

[store]
packages_dir = "/work/ethpm_packages"
"#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.ipfs_api(), Some("http://127.0.0.1:5001"));
        assert_eq!(config.github_token(), Some("ghp_example"));
        assert_eq!(
            config.packages_dir(),
            Some(Path::new("/work/ethpm_packages"))
        );
    }

    #[test]
    fn test_default_gateway() {
        assert_eq!(GlobalConfig::default().ipfs_gateway(), DEFAULT_IPFS_GATEWAY);
    }

    #[test]
    fn test_invalid_gateway_url() {
        let config = GlobalConfig {
            ipfs: Some(IpfsConfig {
                gateway: Some("ftp://gateway".to_string()),
                api: None,
            }),
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
[ipfs]
gatway = "https://ipfs.io"
"#;
        assert!(toml::from_str::<GlobalConfig>(toml).is_err());
    }

    #[test]
    fn test_merge_configs() {
        let mut base = GlobalConfig {
            ipfs: Some(IpfsConfig {
                gateway: Some("https://ipfs.io".to_string()),
                api: Some("http://127.0.0.1:5001".to_string()),
            }),
            ..Default::default()
        };
        let override_config = GlobalConfig {
            ipfs: Some(IpfsConfig {
                gateway: Some("https://dweb.link".to_string()),
                api: None,
            }),
            ..Default::default()
        };

        base.merge(&override_config);
        assert_eq!(base.ipfs_gateway(), "https://dweb.link");
        assert_eq!(base.ipfs_api(), Some("http://127.0.0.1:5001"));
    }
}
