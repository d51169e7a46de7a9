use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::codec::CredentialResource;

fn default_tmp_dir() -> PathBuf {
    std::env::temp_dir()
}

/// Cluster access settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Only secrets labelled `<sync_label>=true` are listed and fetched.
    /// When unset, secrets are addressed by name with no label filter.
    pub sync_label: Option<String>,

    /// Where YAML files are written before being handed to the cluster client.
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: PathBuf,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            sync_label: None,
            tmp_dir: default_tmp_dir(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session file location. `~` is expanded; defaults to `~/.ccli/session`.
    pub session_file: Option<PathBuf>,

    /// Which remote collection records are written to.
    pub credential_resource: CredentialResource,

    #[serde(default)]
    pub cluster: ClusterConfig,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Configuration with paths expanded and defaults filled in.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub session_file: PathBuf,
    pub credential_resource: CredentialResource,
    pub sync_label: Option<String>,
    pub tmp_dir: PathBuf,
}

impl ResolvedConfig {
    pub fn resolve(config: Config) -> Result<Self> {
        let session_file = match config.session_file {
            Some(path) => expand_home(&path)?,
            None => crate::session::SessionStore::default_path()
                .context("Could not find home directory for the session file")?,
        };

        Ok(Self {
            session_file,
            credential_resource: config.credential_resource,
            sync_label: config.cluster.sync_label.filter(|l| !l.is_empty()),
            tmp_dir: expand_home(&config.cluster.tmp_dir)?,
        })
    }

    /// Load and resolve the config at `config_path`, using defaults when
    /// the file does not exist.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        Self::resolve(Config::load_or_default(config_path)?)
    }
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./ccli.toml` if it exists in current directory
/// 2. `<config dir>/ccli/ccli.toml`
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("ccli.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("ccli").join("ccli.toml");
    }

    local_config
}

fn expand_home(path: &Path) -> Result<PathBuf> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_load_config() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("ccli.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "session_file = \"/var/ccli/session\"")?;
        writeln!(file, "credential_resource = \"accounts\"")?;
        writeln!(file, "[cluster]")?;
        writeln!(file, "sync_label = \"cryptopus-sync\"")?;
        writeln!(file, "tmp_dir = \"/var/tmp\"")?;

        let config = Config::load(&config_path)?;
        assert_eq!(config.session_file, Some(PathBuf::from("/var/ccli/session")));
        assert_eq!(config.credential_resource, CredentialResource::Accounts);
        assert_eq!(config.cluster.sync_label.as_deref(), Some("cryptopus-sync"));
        assert_eq!(config.cluster.tmp_dir, PathBuf::from("/var/tmp"));

        Ok(())
    }

    #[test]
    fn test_load_empty_config() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("ccli.toml");

        std::fs::File::create(&config_path)?;

        let config = Config::load(&config_path)?;
        assert_eq!(config.session_file, None);
        assert_eq!(config.credential_resource, CredentialResource::Encryptables);
        assert_eq!(config.cluster.sync_label, None);

        Ok(())
    }

    #[test]
    fn test_missing_config_uses_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let resolved = ResolvedConfig::load_or_default(&dir.path().join("missing.toml"))?;

        assert!(resolved.session_file.ends_with(".ccli/session"));
        assert_eq!(resolved.sync_label, None);
        assert_eq!(resolved.tmp_dir, std::env::temp_dir());

        Ok(())
    }

    #[test]
    fn test_invalid_config_is_reported() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("ccli.toml");
        std::fs::write(&config_path, "credential_resource = \"folders\"")?;

        let err = Config::load(&config_path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));

        Ok(())
    }

    #[test]
    fn test_expand_home() -> Result<()> {
        assert_eq!(
            expand_home(Path::new("/etc/ccli"))?,
            PathBuf::from("/etc/ccli")
        );
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/.ccli/session"))?, home.join(".ccli/session"));
        }
        Ok(())
    }

    #[test]
    fn test_empty_label_means_no_filter() -> Result<()> {
        let config = Config {
            session_file: Some(PathBuf::from("/tmp/session")),
            cluster: ClusterConfig {
                sync_label: Some(String::new()),
                ..Default::default()
            },
            ..Default::default()
        };

        let resolved = ResolvedConfig::resolve(config)?;
        assert_eq!(resolved.sync_label, None);
        assert_eq!(resolved.session_file, PathBuf::from("/tmp/session"));
        Ok(())
    }
}
