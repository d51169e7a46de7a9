use std::collections::BTreeMap;

/// A secret object as read from, or written to, a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSecret {
    /// `metadata.name`, also the join key against `Credential::name`.
    pub name: String,
    /// The serialized object exactly as the cluster returned it.
    pub raw_yaml: String,
    /// `data` with every value base64-decoded where possible.
    pub data: BTreeMap<String, String>,
}
