use crate::error::{Error, Result};

use super::{Credential, Id};

/// A folder in the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub id: Id,
    pub name: String,
    /// Populated only when the folder was fetched with its records included.
    pub credentials: Vec<Credential>,
}

impl Folder {
    pub fn new(id: impl Into<Id>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            credentials: Vec::new(),
        }
    }

    /// First record whose name matches case-insensitively.
    pub fn find_credential(&self, name: &str) -> Option<&Credential> {
        self.credentials.iter().find(|c| c.has_name(name))
    }
}

/// A team and the folders it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub id: Id,
    pub name: String,
    pub folders: Vec<Folder>,
}

impl Team {
    pub fn new(id: impl Into<Id>, name: impl Into<String>, folders: Vec<Folder>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            folders,
        }
    }
}

/// Normalizes a team or folder name to the form typed after `cry use`.
pub fn slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

/// Resolve a `<team>/<folder>` selector against the known teams.
pub fn resolve_folder<'a>(teams: &'a [Team], selector: &str) -> Result<&'a Folder> {
    let Some((team_name, folder_name)) = selector.split_once('/') else {
        return Err(Error::FolderNotFound(selector.to_string()));
    };

    let team_slug = slug(team_name);
    let team = teams
        .iter()
        .find(|t| slug(&t.name) == team_slug)
        .ok_or_else(|| Error::TeamNotFound(team_name.to_string()))?;

    let folder_slug = slug(folder_name);
    team.folders
        .iter()
        .find(|f| slug(&f.name) == folder_slug)
        .ok_or_else(|| Error::FolderNotFound(selector.to_string()))
}
