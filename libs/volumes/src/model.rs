//! Claim, volume and manifest records.
//!
//! These mirror the subset of the resource store's records that the resize
//! engine reads. Annotation maps carry the provisioner identity that resize
//! backends use to decide ownership.

use std::collections::BTreeMap;

use pgvr_quantity::Quantity;
use serde::{Deserialize, Serialize};

/// Annotation set on a volume by the provisioner that created it.
pub const PROVISIONED_BY_ANNOTATION: &str = "pv.kubernetes.io/provisioned-by";

/// Annotation set on a claim naming the provisioner expected to fulfil it.
pub const STORAGE_PROVISIONER_ANNOTATION: &str = "volume.beta.kubernetes.io/storage-provisioner";

/// A name scoped to a namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Equality-based label selector.
///
/// Renders as comma-joined `key=value` pairs sorted by key, which is the
/// form the resource store accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSelector(BTreeMap<String, String>);

impl LabelSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required label.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Returns true if every selector label is present with the same value.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.0
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSelector {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl std::fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (key, value) in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
            first = false;
        }
        Ok(())
    }
}

/// A storage request bound to one replica slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeClaim {
    /// Claim name; replica claims end in `-<ordinal>`.
    pub name: String,

    pub namespace: String,

    /// Name of the bound volume.
    pub volume_name: String,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl VolumeClaim {
    /// Provisioner requested for this claim, if annotated.
    pub fn provisioner(&self) -> Option<&str> {
        self.annotations
            .get(STORAGE_PROVISIONER_ANNOTATION)
            .map(String::as_str)
    }

    pub fn namespaced_name(&self) -> NamespacedName {
        NamespacedName::new(&self.namespace, &self.name)
    }
}

/// A physical storage unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,

    /// Recorded storage capacity.
    pub capacity: Quantity,

    /// The claim this volume is bound to.
    #[serde(default)]
    pub claim_ref: Option<NamespacedName>,

    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl Volume {
    /// Provisioner that created this volume, if annotated.
    pub fn provisioner(&self) -> Option<&str> {
        self.annotations
            .get(PROVISIONED_BY_ANNOTATION)
            .map(String::as_str)
    }

    /// Returns true if the volume was created by `provisioner`.
    pub fn is_provisioned_by(&self, provisioner: &str) -> bool {
        self.provisioner() == Some(provisioner)
    }

    /// Recorded capacity in whole gigabytes.
    pub fn size_gb(&self) -> u64 {
        self.capacity.to_gigabytes()
    }
}

/// Volume section of a cluster manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSpec {
    /// Desired size as a quantity string, e.g. `10Gi`.
    pub size: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

impl VolumeSpec {
    pub fn new(size: impl Into<String>) -> Self {
        Self {
            size: size.into(),
            storage_class: None,
        }
    }
}
