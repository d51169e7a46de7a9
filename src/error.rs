use std::path::PathBuf;

use crate::cluster::ClusterFlavor;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the sync core.
///
/// Transport and process errors are converted into one of these exactly once,
/// at the boundary of the adapter that hit them. Nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no session found, log in first (cry login <token>@<url>)")]
    SessionMissing,

    #[error("session file {path:?} could not be used: {reason}")]
    Session { path: PathBuf, reason: String },

    #[error("login token could not be decoded, expected base64 of <username>;<token>")]
    InvalidToken,

    #[error("authentication failed for {username}: unauthorized")]
    Unauthorized { username: String },

    #[error("access to {path} is forbidden")]
    Forbidden { path: String },

    #[error("could not connect to {url}: {source}")]
    ConnectionFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response from {path}: {reason}")]
    InvalidResponse { path: String, reason: String },

    #[error("{} is not installed or not in PATH", .flavor.binary())]
    ClusterClientMissing { flavor: ClusterFlavor },

    #[error("{} is not logged in to a cluster", .flavor.binary())]
    ClusterClientNotLoggedIn { flavor: ClusterFlavor },

    #[error("secret {name:?} not found in {location}")]
    ClusterSecretNotFound { location: String, name: String },

    #[error("`{command}` failed: {stderr}")]
    ClusterCommand { command: String, stderr: String },

    #[error("invalid secret document: {reason}")]
    InvalidSecret { reason: String },

    #[error("secret name {0:?} cannot be used as a file name")]
    InvalidSecretName(String),

    #[error("credential {name:?} not found in folder {folder}")]
    CredentialNotFound { name: String, folder: String },

    #[error("no folder selected, run `cry use <team>/<folder>` or `cry folder <id>`")]
    FolderNotSelected,

    #[error("team {0:?} not found")]
    TeamNotFound(String),

    #[error("folder {0:?} not found")]
    FolderNotFound(String),

    #[error("{0:?} is not an ose-secrets directory")]
    NotAClusterSecretDirectory(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this failure only concerns the batch item being processed.
    ///
    /// Authentication, connectivity and local setup failures affect every
    /// remaining item as well, so batch loops stop on them.
    pub fn is_item_scoped(&self) -> bool {
        matches!(
            self,
            Error::ClusterSecretNotFound { .. }
                | Error::CredentialNotFound { .. }
                | Error::ClusterCommand { .. }
                | Error::InvalidSecret { .. }
                | Error::InvalidSecretName(_)
                | Error::InvalidResponse { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = Error::ClusterSecretNotFound {
            location: "openshift".to_string(),
            name: "app_secret".to_string(),
        };
        assert_eq!(err.to_string(), "secret \"app_secret\" not found in openshift");

        let err = Error::ClusterClientMissing {
            flavor: ClusterFlavor::Kubernetes,
        };
        assert_eq!(err.to_string(), "kubectl is not installed or not in PATH");

        let err = Error::CredentialNotFound {
            name: "db".to_string(),
            folder: "4".to_string(),
        };
        assert_eq!(err.to_string(), "credential \"db\" not found in folder 4");
    }

    #[test]
    fn test_item_scope() {
        assert!(Error::CredentialNotFound {
            name: "a".to_string(),
            folder: "1".to_string()
        }
        .is_item_scoped());
        assert!(!Error::Unauthorized {
            username: "bob".to_string()
        }
        .is_item_scoped());
        assert!(!Error::FolderNotSelected.is_item_scoped());
        assert!(!Error::ClusterClientNotLoggedIn {
            flavor: ClusterFlavor::OpenShift
        }
        .is_item_scoped());
    }
}
