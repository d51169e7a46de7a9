//! Access to cluster secret stores through their command-line clients.
//!
//! Two flavors are supported, differing only in the binary that is driven
//! and the command used to probe for a logged-in session. A read-only
//! directory source is available for importing secrets kept on disk.

mod client;
mod filesystem;
mod runner;

pub use client::ClusterClient;
pub use filesystem::{DirectorySecretSource, SECRETS_DIRECTORY_MARKER};
pub use runner::{CommandOutput, CommandRunner, SystemCommandRunner};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterFlavor {
    /// OpenShift, driven through `oc`.
    OpenShift,
    /// Plain Kubernetes, driven through `kubectl`.
    Kubernetes,
}

impl ClusterFlavor {
    pub fn binary(self) -> &'static str {
        match self {
            ClusterFlavor::OpenShift => "oc",
            ClusterFlavor::Kubernetes => "kubectl",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ClusterFlavor::OpenShift => "openshift",
            ClusterFlavor::Kubernetes => "kubernetes",
        }
    }

    /// Cheap read used to check that the client has a usable login.
    pub fn auth_probe(self) -> &'static [&'static str] {
        match self {
            ClusterFlavor::OpenShift => &["project"],
            ClusterFlavor::Kubernetes => &["get", "secret"],
        }
    }
}

/// Whether `name` can be used as a single path segment.
pub fn is_path_safe(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    !name.chars().any(|c| c == '/' || c == '\\' || c == '\0')
}

/// Rejects names that would leave the directory they are joined onto.
pub(crate) fn check_secret_name(name: &str) -> Result<()> {
    if is_path_safe(name) {
        Ok(())
    } else {
        Err(Error::InvalidSecretName(name.to_string()))
    }
}

/// One entry of a bulk fetch.
#[derive(Debug)]
pub struct FetchedSecret {
    pub name: String,
    /// The document, or why this secret alone could not be read.
    pub yaml: Result<String>,
}

/// Somewhere secret documents can be read from.
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// YAML of the single secret called `name`.
    async fn fetch_secret(&self, name: &str) -> Result<String>;

    /// Every visible secret, one document per entry. Only failures that
    /// prevent listing fail the whole call.
    async fn fetch_all_secrets(&self) -> Result<Vec<FetchedSecret>>;
}

/// Somewhere secret documents can be written to.
#[async_trait]
pub trait SecretSink: Send + Sync {
    /// Create or replace the secret `name` with the given document.
    async fn insert_secret(&self, name: &str, yaml: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_safe_names() {
        assert!(is_path_safe("app_secret"));
        assert!(is_path_safe("db.prod"));
        assert!(!is_path_safe(""));
        assert!(!is_path_safe("."));
        assert!(!is_path_safe(".."));
        assert!(!is_path_safe("../escaped"));
        assert!(!is_path_safe("prod/db"));
        assert!(!is_path_safe("prod\\db"));
        assert!(!is_path_safe("nul\0byte"));
    }

    #[test]
    fn test_unsafe_name_is_item_scoped() {
        let err = check_secret_name("prod/db").unwrap_err();
        assert!(matches!(err, Error::InvalidSecretName(ref name) if name == "prod/db"));
        assert!(err.is_item_scoped());
    }
}
