use std::collections::BTreeMap;

use crate::cluster::{SecretSink, SecretSource};
use crate::codec::{credential_to_secret_yaml, parse_secret, secret_to_credential};
use crate::error::Result;
use crate::models::Credential;
use crate::remote::CryptopusClient;

use super::{SyncAction, SyncReport};

/// Moves secrets between a cluster and the selected remote folder.
pub struct SyncEngine {
    remote: CryptopusClient,
    labels: BTreeMap<String, String>,
}

impl SyncEngine {
    pub fn new(remote: CryptopusClient) -> Self {
        Self {
            remote,
            labels: BTreeMap::new(),
        }
    }

    /// Label secrets synthesized on push with `<label>=true` so that a
    /// label-filtered cluster client still sees them.
    pub fn with_sync_label(mut self, label: Option<String>) -> Self {
        self.labels = label
            .into_iter()
            .map(|label| (label, "true".to_string()))
            .collect();
        self
    }

    pub fn remote(&self) -> &CryptopusClient {
        &self.remote
    }

    /// Copy cluster secret `name` into the selected folder.
    pub async fn pull_secret(&self, source: &dyn SecretSource, name: &str) -> Result<SyncAction> {
        self.remote.selected_folder()?;
        let yaml = source.fetch_secret(name).await?;
        self.save_secret_yaml(&yaml).await
    }

    /// Copy every secret the source exposes.
    pub async fn pull_all(&self, source: &dyn SecretSource) -> Result<SyncReport> {
        self.remote.selected_folder()?;
        let fetched = source.fetch_all_secrets().await?;
        tracing::info!(count = fetched.len(), "pulling secrets");

        let mut report = SyncReport::default();
        for secret in fetched {
            let result = match secret.yaml {
                Ok(yaml) => self.save_secret_yaml(&yaml).await,
                Err(err) => Err(err),
            };
            report.record(secret.name, result)?;
        }
        Ok(report)
    }

    async fn save_secret_yaml(&self, yaml: &str) -> Result<SyncAction> {
        let secret = parse_secret(yaml)?;
        let credential = secret_to_credential(&secret);
        let id = self.remote.save_credential(&credential).await?;
        Ok(SyncAction::Saved { id })
    }

    /// Write the record called `name` from the selected folder to the cluster.
    pub async fn push_credential(&self, sink: &dyn SecretSink, name: &str) -> Result<SyncAction> {
        let folder = self.remote.selected_folder()?;
        let found = self.remote.find_credential_by_name(name, folder).await?;
        self.push_found(sink, found).await
    }

    /// Write every record of the selected folder to the cluster.
    pub async fn push_all(&self, sink: &dyn SecretSink) -> Result<SyncReport> {
        let folder_id = self.remote.selected_folder()?;
        let folder = self.remote.fetch_folder(folder_id).await?;
        tracing::info!(folder = %folder.name, count = folder.credentials.len(), "pushing records");

        let mut report = SyncReport::default();
        for credential in folder.credentials {
            let name = credential.name.clone();
            let result = self.push_found(sink, credential).await;
            report.record(name, result)?;
        }
        Ok(report)
    }

    /// Folder listings may omit secret attributes, so the full record is
    /// fetched by id before it is converted.
    async fn push_found(&self, sink: &dyn SecretSink, found: Credential) -> Result<SyncAction> {
        let credential = match &found.id {
            Some(id) => self.remote.fetch_credential(id).await?,
            None => found,
        };

        let yaml = credential_to_secret_yaml(&credential, &self.labels)?;
        sink.insert_secret(&credential.name, &yaml).await?;
        tracing::info!(name = %credential.name, "secret pushed");
        Ok(SyncAction::Inserted)
    }
}
