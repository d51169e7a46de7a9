//! Conversions between the three shapes a credential takes: cluster secret
//! YAML, the in-memory models, and the remote store's JSON:API documents.

pub mod encoding;
pub mod jsonapi;
pub mod secret_yaml;

pub use jsonapi::CredentialResource;
pub use secret_yaml::{
    build_secret_yaml, credential_to_secret_yaml, parse_secret, secret_to_credential,
    secret_to_yaml, split_list,
};
