//! Conversions between cluster secret YAML and the in-memory types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::models::{ClusterSecret, Credential, CLUSTER_SECRET_KIND};

use super::encoding;

/// Data key used when a record without a cluster payload is pushed.
pub const SYNTHESIZED_DATA_KEY: &str = "password";

/// Metadata written by the cluster itself; `create` rejects objects that
/// still carry it, and the namespace is left to the client's current one.
const SERVER_MANAGED_METADATA: &[&str] = &[
    "creationTimestamp",
    "managedFields",
    "namespace",
    "resourceVersion",
    "selfLink",
    "uid",
];

/// Minimal secret manifest, used when there is no original document to
/// round-trip.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretManifest {
    api_version: String,
    kind: String,
    #[serde(rename = "type")]
    secret_type: String,
    metadata: ManifestMetadata,
    #[serde(default)]
    data: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ManifestMetadata {
    name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,
}

/// Render a fresh `v1/Secret` with already-decoded `data` values.
pub fn build_secret_yaml(
    name: &str,
    data: &BTreeMap<String, String>,
    labels: &BTreeMap<String, String>,
) -> Result<String> {
    let manifest = SecretManifest {
        api_version: "v1".to_string(),
        kind: "Secret".to_string(),
        secret_type: "Opaque".to_string(),
        metadata: ManifestMetadata {
            name: name.to_string(),
            labels: labels.clone(),
        },
        data: encoding::encode_map(data),
    };
    to_yaml(&manifest)
}

/// Parse one secret document.
pub fn parse_secret(yaml: &str) -> Result<ClusterSecret> {
    let document: Value = serde_yaml::from_str(yaml).map_err(invalid)?;

    let name = document
        .get("metadata")
        .and_then(|m| m.get("name"))
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidSecret {
            reason: "metadata.name is missing".to_string(),
        })?
        .to_string();

    let mut data = BTreeMap::new();
    if let Some(Value::Mapping(entries)) = document.get("data") {
        for (key, value) in entries {
            let (Some(key), Some(value)) = (scalar_to_string(key), scalar_to_string(value)) else {
                continue;
            };
            data.insert(key, encoding::decode_lenient(&value));
        }
    }

    Ok(ClusterSecret {
        name,
        raw_yaml: yaml.to_string(),
        data,
    })
}

/// Split a `kind: List` document into one YAML text per item.
pub fn split_list(yaml: &str) -> Result<Vec<String>> {
    let document: Value = serde_yaml::from_str(yaml).map_err(invalid)?;
    match document.get("items") {
        Some(Value::Sequence(items)) => items.iter().map(to_yaml).collect(),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(_) => Err(Error::InvalidSecret {
            reason: "items is not a list".to_string(),
        }),
    }
}

/// Render a secret with its (possibly edited) `data` re-encoded.
pub fn secret_to_yaml(secret: &ClusterSecret) -> Result<String> {
    let mut document: Value = serde_yaml::from_str(&secret.raw_yaml).map_err(invalid)?;
    let Value::Mapping(root) = &mut document else {
        return Err(Error::InvalidSecret {
            reason: "document is not a mapping".to_string(),
        });
    };

    let data: Mapping = encoding::encode_map(&secret.data)
        .into_iter()
        .map(|(k, v)| (Value::String(k), Value::String(v)))
        .collect();
    root.insert(Value::from("data"), Value::Mapping(data));
    set_name(root, &secret.name);

    to_yaml(&document)
}

/// Import path: the whole document travels as an opaque payload.
pub fn secret_to_credential(secret: &ClusterSecret) -> Credential {
    Credential::new(&secret.name)
        .with_kind(CLUSTER_SECRET_KIND)
        .with_cluster_secret(&secret.raw_yaml)
}

/// Export path: the record's name always wins as `metadata.name`.
///
/// Records imported from a cluster are written back from their payload.
/// Anything else becomes a single-entry secret holding the password.
pub fn credential_to_secret_yaml(
    credential: &Credential,
    labels: &BTreeMap<String, String>,
) -> Result<String> {
    if let Some(payload) = &credential.cluster_secret {
        return restore_payload(payload, &credential.name);
    }

    let mut data = BTreeMap::new();
    data.insert(
        SYNTHESIZED_DATA_KEY.to_string(),
        credential.password.clone().unwrap_or_default(),
    );
    build_secret_yaml(&credential.name, &data, labels)
}

fn restore_payload(payload: &str, name: &str) -> Result<String> {
    let mut document: Value = serde_yaml::from_str(payload).map_err(invalid)?;
    let Value::Mapping(root) = &mut document else {
        return Err(Error::InvalidSecret {
            reason: format!("stored payload for {name:?} is not a mapping"),
        });
    };

    set_name(root, name);
    if let Some(Value::Mapping(metadata)) = root.get_mut("metadata") {
        for key in SERVER_MANAGED_METADATA {
            metadata.remove(*key);
        }
    }

    to_yaml(&document)
}

fn set_name(root: &mut Mapping, name: &str) {
    let metadata = root
        .entry(Value::from("metadata"))
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if !metadata.is_mapping() {
        *metadata = Value::Mapping(Mapping::new());
    }
    if let Value::Mapping(metadata) = metadata {
        metadata.insert(Value::from("name"), Value::from(name));
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn to_yaml<T: Serialize>(value: &T) -> Result<String> {
    serde_yaml::to_string(value).map_err(invalid)
}

fn invalid(err: serde_yaml::Error) -> Error {
    Error::InvalidSecret {
        reason: err.to_string(),
    }
}
