use super::Id;

/// Category assigned to records that were created without one.
pub const DEFAULT_KIND: &str = "credentials";

/// Category assigned to records imported from a cluster secret.
pub const CLUSTER_SECRET_KIND: &str = "ose_secret";

/// One record in the remote password manager.
///
/// Every field except the name is optional so that both the older account
/// schema and the newer encryptable schema map onto the same type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Assigned by the remote store, absent until persisted.
    pub id: Option<Id>,
    pub name: String,
    pub kind: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub pin: Option<String>,
    pub token: Option<String>,
    pub email: Option<String>,
    pub custom_attr: Option<String>,
    /// Folder the record belongs to. Only sent on create/update.
    pub folder: Option<Id>,
    /// Complete YAML of the cluster secret this record was imported from.
    pub cluster_secret: Option<String>,
}

impl Credential {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            kind: DEFAULT_KIND.to_string(),
            username: None,
            password: None,
            pin: None,
            token: None,
            email: None,
            custom_attr: None,
            folder: None,
            cluster_secret: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<Id>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_folder(mut self, folder: impl Into<Id>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn with_cluster_secret(mut self, yaml: impl Into<String>) -> Self {
        self.cluster_secret = Some(yaml.into());
        self
    }

    /// Case-insensitive name comparison, the way the remote store scopes
    /// uniqueness within a folder.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    /// Look up a single field by the name used on the command line.
    pub fn field(&self, field: &str) -> Option<&str> {
        match field {
            "id" => self.id.as_ref().map(Id::as_str),
            "name" | "accountname" => Some(self.name.as_str()),
            "type" | "category" => Some(self.kind.as_str()),
            "username" => self.username.as_deref(),
            "password" => self.password.as_deref(),
            "pin" => self.pin.as_deref(),
            "token" => self.token.as_deref(),
            "email" => self.email.as_deref(),
            "custom_attr" => self.custom_attr.as_deref(),
            "ose_secret" | "cluster_secret" => self.cluster_secret.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_credentials_kind() {
        let credential = Credential::new("db");
        assert_eq!(credential.kind, "credentials");
        assert!(credential.id.is_none());
    }

    #[test]
    fn test_name_match_ignores_case() {
        let credential = Credential::new("App_Secret");
        assert!(credential.has_name("app_secret"));
        assert!(!credential.has_name("app-secret"));
    }

    #[test]
    fn test_field_lookup() {
        let credential = Credential::new("db")
            .with_id(3)
            .with_username("admin")
            .with_password("hunter2");
        assert_eq!(credential.field("password"), Some("hunter2"));
        assert_eq!(credential.field("username"), Some("admin"));
        assert_eq!(credential.field("id"), Some("3"));
        assert_eq!(credential.field("pin"), None);
        assert_eq!(credential.field("unknown"), None);
    }
}
