//! JSON:API documents exchanged with the remote store.
//!
//! Secret-bearing attributes travel as `cleartext_*`; the server encrypts
//! them at rest and decrypts them for the owner on read.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::models::{Credential, Folder, Id, Team, DEFAULT_KIND};

/// Which collection holds credential records on the server.
///
/// Older servers expose `accounts` with an `accountname`/`category` pair,
/// newer ones `encryptables` with `name`/`type`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialResource {
    Accounts,
    #[default]
    Encryptables,
}

impl CredentialResource {
    pub fn collection(self) -> &'static str {
        match self {
            CredentialResource::Accounts => "accounts",
            CredentialResource::Encryptables => "encryptables",
        }
    }

    fn name_attribute(self) -> &'static str {
        match self {
            CredentialResource::Accounts => "accountname",
            CredentialResource::Encryptables => "name",
        }
    }

    fn kind_attribute(self) -> &'static str {
        match self {
            CredentialResource::Accounts => "category",
            CredentialResource::Encryptables => "type",
        }
    }
}

fn is_credential_type(kind: &str) -> bool {
    kind == "accounts" || kind == "encryptables"
}

/// A top-level document. Bare resources without a `data` envelope are
/// accepted as well.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub data: PrimaryData,
    #[serde(default)]
    pub included: Vec<Resource>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Many(Vec<Resource>),
    One(Resource),
}

impl PrimaryData {
    pub fn into_vec(self) -> Vec<Resource> {
        match self {
            PrimaryData::Many(resources) => resources,
            PrimaryData::One(resource) => vec![resource],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub id: Option<Id>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub relationships: BTreeMap<String, Relationship>,
}

impl Resource {
    fn attribute(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|key| self.attributes.get(*key))
            .find_map(|value| match value {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }

    fn related_ids(&self, relationship: &str) -> Vec<Id> {
        match self.relationships.get(relationship).map(|r| &r.data) {
            Some(Some(Linkage::One(reference))) => vec![reference.id.clone()],
            Some(Some(Linkage::Many(references))) => {
                references.iter().map(|r| r.id.clone()).collect()
            }
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub data: Option<Linkage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
    Many(Vec<ResourceRef>),
    One(ResourceRef),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceRef {
    pub id: Id,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Parse a response body, accepting both enveloped and bare resources.
pub fn parse_document(body: &str) -> serde_json::Result<Document> {
    let value: Value = serde_json::from_str(body)?;
    if value.get("data").is_some() {
        serde_json::from_value(value)
    } else {
        Ok(Document {
            data: PrimaryData::One(serde_json::from_value(value)?),
            included: Vec::new(),
        })
    }
}

/// Build the create/update payload for a record.
///
/// Absent fields are left out entirely rather than sent as `null`, so an
/// update never clears attributes this client does not know about.
pub fn credential_document(credential: &Credential, resource: CredentialResource) -> Value {
    let mut attributes = Map::new();
    attributes.insert(resource.name_attribute().to_string(), json!(credential.name));
    attributes.insert(resource.kind_attribute().to_string(), json!(credential.kind));

    let secrets = [
        ("cleartext_username", &credential.username),
        ("cleartext_password", &credential.password),
        ("cleartext_pin", &credential.pin),
        ("cleartext_token", &credential.token),
        ("cleartext_email", &credential.email),
        ("cleartext_custom_attr", &credential.custom_attr),
        ("cleartext_ose_secret", &credential.cluster_secret),
    ];
    for (key, value) in secrets {
        if let Some(value) = value {
            attributes.insert(key.to_string(), json!(value));
        }
    }

    let mut data = Map::new();
    data.insert("type".to_string(), json!(resource.collection()));
    if let Some(id) = &credential.id {
        data.insert("id".to_string(), json!(id));
    }
    data.insert("attributes".to_string(), Value::Object(attributes));
    if let Some(folder) = &credential.folder {
        data.insert(
            "relationships".to_string(),
            json!({ "folder": { "data": { "id": folder, "type": "folders" } } }),
        );
    }

    json!({ "data": Value::Object(data) })
}

pub fn credential_from_resource(resource: &Resource) -> Credential {
    let name = resource
        .attribute(&["name", "accountname"])
        .unwrap_or_default();
    let kind = resource
        .attribute(&["type", "category"])
        .unwrap_or_else(|| DEFAULT_KIND.to_string());

    Credential {
        id: resource.id.clone(),
        name,
        kind,
        username: resource.attribute(&["cleartext_username"]),
        password: resource.attribute(&["cleartext_password"]),
        pin: resource.attribute(&["cleartext_pin"]),
        token: resource.attribute(&["cleartext_token"]),
        email: resource.attribute(&["cleartext_email"]),
        custom_attr: resource.attribute(&["cleartext_custom_attr"]),
        folder: resource.related_ids("folder").into_iter().next(),
        cluster_secret: resource.attribute(&["cleartext_ose_secret", "ose_secret"]),
    }
}

/// The folder in `data` together with the credential records in `included`.
pub fn folder_from_document(document: Document) -> Option<Folder> {
    let primary = document.data.into_vec().into_iter().next()?;
    let id = primary.id.clone()?;
    let name = primary.attribute(&["name"]).unwrap_or_default();

    let credentials = document
        .included
        .iter()
        .filter(|r| is_credential_type(&r.kind))
        .map(credential_from_resource)
        .collect();

    Some(Folder {
        id,
        name,
        credentials,
    })
}

/// Teams in `data`, each resolved against the folders in `included`.
pub fn teams_from_document(document: Document) -> Vec<Team> {
    let folders: Vec<Folder> = document
        .included
        .iter()
        .filter(|r| r.kind == "folders")
        .filter_map(|r| {
            let id = r.id.clone()?;
            Some(Folder::new(id, r.attribute(&["name"]).unwrap_or_default()))
        })
        .collect();

    document
        .data
        .into_vec()
        .into_iter()
        .filter_map(|team| {
            let id = team.id.clone()?;
            let folder_ids = team.related_ids("folders");
            let team_folders = folders
                .iter()
                .filter(|f| folder_ids.contains(&f.id))
                .cloned()
                .collect();
            Some(Team::new(
                id,
                team.attribute(&["name"]).unwrap_or_default(),
                team_folders,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_document_is_compact() {
        let credential = Credential::new("db_account")
            .with_username("ccli_account")
            .with_password("gfClNjq21D")
            .with_folder(2);

        let document = credential_document(&credential, CredentialResource::Encryptables);
        let data = &document["data"];

        assert_eq!(data["type"], "encryptables");
        assert!(data.get("id").is_none());
        assert_eq!(data["attributes"]["name"], "db_account");
        assert_eq!(data["attributes"]["type"], "credentials");
        assert_eq!(data["attributes"]["cleartext_username"], "ccli_account");
        assert_eq!(data["attributes"]["cleartext_password"], "gfClNjq21D");
        assert!(data["attributes"].get("cleartext_pin").is_none());
        assert!(data["attributes"].get("cleartext_ose_secret").is_none());
        assert_eq!(data["relationships"]["folder"]["data"]["id"], "2");
        assert_eq!(data["relationships"]["folder"]["data"]["type"], "folders");
    }

    #[test]
    fn test_account_document_uses_legacy_names() {
        let credential = Credential::new("db_account")
            .with_id(1)
            .with_kind("regular")
            .with_cluster_secret("kind: Secret\n");

        let document = credential_document(&credential, CredentialResource::Accounts);
        let data = &document["data"];

        assert_eq!(data["type"], "accounts");
        assert_eq!(data["id"], "1");
        assert_eq!(data["attributes"]["accountname"], "db_account");
        assert_eq!(data["attributes"]["category"], "regular");
        assert_eq!(data["attributes"]["cleartext_ose_secret"], "kind: Secret\n");
        assert!(data.get("relationships").is_none());
    }

    #[test]
    fn test_credential_from_account_json() {
        let body = r#"{
            "data": {
                "type": "accounts",
                "id": 1,
                "attributes": {
                    "accountname": "db_account",
                    "category": "regular",
                    "cleartext_username": "db_account",
                    "cleartext_password": "xAherfEDa21)sd"
                },
                "relationships": {
                    "folder": { "data": { "id": 2, "type": "folders" } }
                }
            }
        }"#;

        let document = parse_document(body).unwrap();
        let resource = document.data.into_vec().remove(0);
        let credential = credential_from_resource(&resource);

        assert_eq!(credential.id, Some(Id::from(1)));
        assert_eq!(credential.name, "db_account");
        assert_eq!(credential.kind, "regular");
        assert_eq!(credential.username.as_deref(), Some("db_account"));
        assert_eq!(credential.password.as_deref(), Some("xAherfEDa21)sd"));
        assert_eq!(credential.folder, Some(Id::from(2)));
    }

    #[test]
    fn test_bare_resource_is_accepted() {
        let body = r#"{ "id": "5", "type": "encryptables", "attributes": { "name": "x" } }"#;
        let document = parse_document(body).unwrap();
        let credential = credential_from_resource(&document.data.into_vec()[0]);
        assert_eq!(credential.name, "x");
        assert_eq!(credential.kind, "credentials");
    }

    #[test]
    fn test_folder_keeps_only_credential_records() {
        let body = r#"{
            "data": { "id": 1, "type": "folders", "attributes": { "name": "ruby" } },
            "included": [
                { "id": 10, "type": "encryptables", "attributes": { "name": "App_Secret" } },
                { "id": 11, "type": "accounts", "attributes": { "accountname": "legacy" } },
                { "id": 3, "type": "teams", "attributes": { "name": "bbt" } }
            ]
        }"#;

        let folder = folder_from_document(parse_document(body).unwrap()).unwrap();
        assert_eq!(folder.name, "ruby");
        assert_eq!(folder.credentials.len(), 2);
        assert_eq!(folder.credentials[1].name, "legacy");
    }

    #[test]
    fn test_teams_resolve_included_folders() {
        let body = r#"{
            "data": [{
                "id": 1,
                "type": "teams",
                "attributes": { "name": "bbt" },
                "relationships": { "folders": { "data": [{ "id": 2 }, { "id": 3 }] } }
            }],
            "included": [
                { "type": "folders", "id": 2, "attributes": { "name": "ruby" } },
                { "type": "folders", "id": 3, "attributes": { "name": "java" } },
                { "type": "folders", "id": 4, "attributes": { "name": "other" } }
            ]
        }"#;

        let teams = teams_from_document(parse_document(body).unwrap());
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].name, "bbt");
        let names: Vec<_> = teams[0].folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["ruby", "java"]);
    }
}
