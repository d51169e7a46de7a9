mod cluster_secret;
mod credential;
mod id;
mod team;

pub use cluster_secret::ClusterSecret;
pub use credential::{Credential, CLUSTER_SECRET_KIND, DEFAULT_KIND};
pub use id::Id;
pub use team::{resolve_folder, slug, Folder, Team};
