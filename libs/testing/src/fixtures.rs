//! Builders for claims, volumes and cluster contexts.

use std::collections::BTreeMap;

use pgvr_quantity::Quantity;
use pgvr_volumes::model::PROVISIONED_BY_ANNOTATION;
use pgvr_volumes::{ClusterContext, LabelSelector, NamespacedName, Volume, VolumeClaim};

/// Namespace used by all fixtures.
pub const TEST_NAMESPACE: &str = "default";

/// Provisioner annotation value for EBS-style test volumes.
pub const EBS_PROVISIONER: &str = "kubernetes.io/aws-ebs";

/// Provisioner annotation value for GCE-style test volumes.
pub const GCE_PROVISIONER: &str = "kubernetes.io/gce-pd";

/// Labels carried by every claim of `cluster`.
pub fn cluster_labels(cluster: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("application".to_string(), "spilo".to_string()),
        ("cluster-name".to_string(), cluster.to_string()),
    ])
}

/// Selector matching [`cluster_labels`].
pub fn cluster_selector(cluster: &str) -> LabelSelector {
    cluster_labels(cluster).into_iter().collect()
}

/// Context for `cluster` with `replicas` running pods and default settings.
pub fn cluster_context(cluster: &str, replicas: i32) -> ClusterContext {
    ClusterContext::new(cluster, TEST_NAMESPACE, cluster_selector(cluster), replicas)
}

/// Claim of replica `ordinal`, named `pgdata-<cluster>-<ordinal>`.
pub fn claim(cluster: &str, ordinal: u32) -> VolumeClaim {
    VolumeClaim {
        name: format!("pgdata-{cluster}-{ordinal}"),
        namespace: TEST_NAMESPACE.to_string(),
        volume_name: volume_name(cluster, ordinal),
        labels: cluster_labels(cluster),
        annotations: BTreeMap::new(),
    }
}

/// Volume bound to [`claim`]`(cluster, ordinal)`.
pub fn volume(cluster: &str, ordinal: u32, size_gb: u64, provisioner: &str) -> Volume {
    Volume {
        name: volume_name(cluster, ordinal),
        capacity: Quantity::from_gigabytes(size_gb),
        claim_ref: Some(NamespacedName::new(
            TEST_NAMESPACE,
            format!("pgdata-{cluster}-{ordinal}"),
        )),
        annotations: BTreeMap::from([(
            PROVISIONED_BY_ANNOTATION.to_string(),
            provisioner.to_string(),
        )]),
    }
}

/// Name of the volume bound to replica `ordinal`.
pub fn volume_name(cluster: &str, ordinal: u32) -> String {
    format!("pv-{cluster}-{ordinal}")
}
