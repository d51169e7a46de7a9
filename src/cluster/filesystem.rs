use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::codec::build_secret_yaml;
use crate::error::{Error, Result};

use super::{check_secret_name, FetchedSecret, SecretSource};

/// Directory names must contain this to be read as a secrets directory.
pub const SECRETS_DIRECTORY_MARKER: &str = "ose-secrets";

/// Reads secrets laid out on disk as `<dir>/<secret>/<key>[.ext]`.
///
/// Each file holds one plain-text value; surrounding whitespace is dropped.
/// The generated documents look like what the cluster would return, with
/// values base64-encoded.
#[derive(Debug, Clone)]
pub struct DirectorySecretSource {
    path: PathBuf,
}

impl DirectorySecretSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn checked_root(&self) -> Result<PathBuf> {
        let not_secrets = || Error::NotAClusterSecretDirectory(self.path.clone());

        let root = self.path.canonicalize().map_err(|_| not_secrets())?;
        let is_marked = root
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains(SECRETS_DIRECTORY_MARKER));

        if root.is_dir() && is_marked {
            Ok(root)
        } else {
            Err(not_secrets())
        }
    }

    fn read_secret(dir: &Path, name: &str) -> Result<String> {
        let mut data = BTreeMap::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let value = std::fs::read_to_string(&path)?;
            data.insert(key.to_string(), value.trim().to_string());
        }

        build_secret_yaml(name, &data, &BTreeMap::new())
    }
}

#[async_trait]
impl SecretSource for DirectorySecretSource {
    async fn fetch_secret(&self, name: &str) -> Result<String> {
        check_secret_name(name)?;
        let root = self.checked_root()?;
        let dir = root.join(name);
        if !dir.is_dir() {
            return Err(Error::ClusterSecretNotFound {
                location: root.display().to_string(),
                name: name.to_string(),
            });
        }
        Self::read_secret(&dir, name)
    }

    async fn fetch_all_secrets(&self) -> Result<Vec<FetchedSecret>> {
        let root = self.checked_root()?;

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&root)? {
            let entry = entry?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();

        Ok(names
            .into_iter()
            .map(|name| {
                let yaml = Self::read_secret(&root.join(&name), &name);
                FetchedSecret { name, yaml }
            })
            .collect())
    }
}
