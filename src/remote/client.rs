use reqwest::{Client, Method, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::codec::encoding;
use crate::codec::jsonapi::{
    credential_document, credential_from_resource, folder_from_document, parse_document,
    teams_from_document, Document,
};
use crate::codec::CredentialResource;
use crate::error::{Error, Result};
use crate::models::{Credential, Folder, Id, Team};
use crate::session::SessionData;

const JSON_API: &str = "application/vnd.api+json";

/// HTTP client for the Cryptopus API.
///
/// Every request carries the username and the base64-encoded token. Bodies
/// are returned as text by the verb methods; the domain methods parse them
/// as JSON:API documents.
pub struct CryptopusClient {
    http: Client,
    root_url: String,
    username: String,
    token: SecretString,
    folder: Option<Id>,
    resource: CredentialResource,
}

impl CryptopusClient {
    /// Build a client from the stored session.
    ///
    /// Fails with `SessionMissing` when no server URL has been recorded.
    pub fn from_session(session: &SessionData, resource: CredentialResource) -> Result<Self> {
        let url = session
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or(Error::SessionMissing)?;

        Ok(Self {
            http: Client::new(),
            root_url: root_url(url)?,
            username: session.username.clone().unwrap_or_default(),
            token: SecretString::from(session.token.clone().unwrap_or_default()),
            folder: session.folder.clone(),
            resource,
        })
    }

    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    pub fn resource(&self) -> CredentialResource {
        self.resource
    }

    pub fn selected_folder(&self) -> Result<&Id> {
        self.folder.as_ref().ok_or(Error::FolderNotSelected)
    }

    pub async fn get(&self, path: &str) -> Result<String> {
        self.send(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<String> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<String> {
        self.send(Method::PATCH, path, Some(body)).await
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<String> {
        let url = format!("{}/{}", self.root_url, path.trim_start_matches('/'));
        tracing::debug!(%method, %url, "remote request");

        let mut request = self
            .http
            .request(method, &url)
            .header("Authorization-User", &self.username)
            .header(
                "Authorization-Password",
                encoding::encode(self.token.expose_secret()),
            );
        if let Some(body) = body {
            request = request
                .header("Content-Type", "application/json")
                .header("Accept", JSON_API)
                .body(body.to_string());
        }

        let response = request.send().await.map_err(|source| Error::ConnectionFailed {
            url: url.clone(),
            source,
        })?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                return Err(Error::Unauthorized {
                    username: self.username.clone(),
                })
            }
            StatusCode::FORBIDDEN => {
                return Err(Error::Forbidden {
                    path: path.to_string(),
                })
            }
            _ => {}
        }

        response
            .text()
            .await
            .map_err(|source| Error::ConnectionFailed { url, source })
    }

    async fn get_document(&self, path: &str) -> Result<Document> {
        let body = self.get(path).await?;
        parse_document(&body).map_err(|e| Error::InvalidResponse {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Record `id` of the configured collection.
    pub async fn fetch_credential(&self, id: &Id) -> Result<Credential> {
        let path = format!("{}/{id}", self.resource.collection());
        let document = self.get_document(&path).await?;
        let resource = document
            .data
            .into_vec()
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidResponse {
                path,
                reason: "document has no data".to_string(),
            })?;
        Ok(credential_from_resource(&resource))
    }

    /// Folder `id` with its records.
    pub async fn fetch_folder(&self, id: &Id) -> Result<Folder> {
        let path = format!("folders/{id}");
        let document = self.get_document(&path).await?;
        folder_from_document(document).ok_or_else(|| Error::InvalidResponse {
            path,
            reason: "document has no folder".to_string(),
        })
    }

    /// First record in folder `folder_id` whose name matches case-insensitively.
    pub async fn find_credential_by_name(&self, name: &str, folder_id: &Id) -> Result<Credential> {
        let folder = self.fetch_folder(folder_id).await?;
        folder
            .find_credential(name)
            .cloned()
            .ok_or_else(|| Error::CredentialNotFound {
                name: name.to_string(),
                folder: folder_id.to_string(),
            })
    }

    /// Create or update `credential` in the selected folder, matched by name.
    ///
    /// Returns the id of the record that was written.
    pub async fn save_credential(&self, credential: &Credential) -> Result<Id> {
        let folder = self.selected_folder()?.clone();

        let mut credential = credential.clone();
        credential.folder = Some(folder.clone());

        let collection = self.resource.collection();
        let body = match self.find_credential_by_name(&credential.name, &folder).await {
            Ok(existing) => {
                let id = existing.id.ok_or_else(|| Error::InvalidResponse {
                    path: format!("folders/{folder}"),
                    reason: format!("record {:?} has no id", existing.name),
                })?;
                credential.id = Some(id.clone());
                tracing::info!(name = %credential.name, %id, "updating record");
                let path = format!("{collection}/{id}");
                self.patch(&path, &credential_document(&credential, self.resource))
                    .await?
            }
            Err(Error::CredentialNotFound { .. }) => {
                credential.id = None;
                tracing::info!(name = %credential.name, folder = %folder, "creating record");
                self.post(collection, &credential_document(&credential, self.resource))
                    .await?
            }
            Err(e) => return Err(e),
        };

        let written = parse_document(&body)
            .ok()
            .and_then(|d| d.data.into_vec().into_iter().next())
            .and_then(|r| r.id);
        match (written, credential.id) {
            (Some(id), _) | (None, Some(id)) => Ok(id),
            (None, None) => Err(Error::InvalidResponse {
                path: collection.to_string(),
                reason: "created record has no id".to_string(),
            }),
        }
    }

    /// Every team visible to the user, with its folders.
    pub async fn list_teams(&self) -> Result<Vec<Team>> {
        let document = self.get_document("teams").await?;
        Ok(teams_from_document(document))
    }

    /// Fetch a fresh token for the logged-in user.
    ///
    /// Used right after login so that bad credentials fail immediately.
    pub async fn renew_auth_token(&self) -> Result<String> {
        let users = self.get_document("api_users").await?;
        let user_id = users
            .data
            .into_vec()
            .into_iter()
            .find(|user| {
                user.attributes
                    .get("username")
                    .and_then(Value::as_str)
                    .is_some_and(|name| name == self.username)
            })
            .and_then(|user| user.id)
            .ok_or_else(|| Error::Unauthorized {
                username: self.username.clone(),
            })?;

        let path = format!("api_users/{user_id}/token");
        let body = self.get(&path).await?;
        let value: Value = serde_json::from_str(&body).map_err(|e| Error::InvalidResponse {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        value
            .get("token")
            .or_else(|| value.pointer("/data/attributes/token"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::InvalidResponse {
                path,
                reason: "response has no token".to_string(),
            })
    }
}

/// `<url>/api`, with the scheme chosen by port: 443 is TLS, anything else
/// is plain HTTP.
fn root_url(url: &str) -> Result<String> {
    let url = url.trim().trim_end_matches('/');
    let with_scheme = if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{url}")
    };

    let invalid = |reason: String| Error::InvalidResponse {
        path: url.to_string(),
        reason,
    };
    let mut parsed = Url::parse(&with_scheme).map_err(|e| invalid(e.to_string()))?;
    let scheme = match parsed.port_or_known_default() {
        Some(443) => "https",
        _ => "http",
    };
    if parsed.scheme() != scheme {
        let original = parsed.scheme().to_string();
        parsed
            .set_scheme(scheme)
            .map_err(|_| invalid(format!("unsupported scheme {original:?}")))?;
    }

    Ok(format!("{}/api", parsed.as_str().trim_end_matches('/')))
}
