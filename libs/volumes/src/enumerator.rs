//! Enumeration of the volumes that belong to a cluster.

use tracing::{debug, warn};

use crate::config::ClusterContext;
use crate::error::VolumeError;
use crate::model::{Volume, VolumeClaim};
use crate::naming::{is_running_ordinal, parse_claim_ordinal};
use crate::store::VolumeStoreAdapter;

/// Outcome of a claim deletion sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimCleanup {
    /// Claims deleted, as `namespace/name`.
    pub deleted: Vec<String>,

    /// Claims that could not be deleted, as `namespace/name`.
    pub failed: Vec<String>,
}

/// Resolves a cluster's claims into the volumes backing its running replicas.
#[derive(Clone)]
pub struct VolumeEnumerator {
    store: VolumeStoreAdapter,
}

impl VolumeEnumerator {
    pub fn new(store: VolumeStoreAdapter) -> Self {
        Self { store }
    }

    /// List all claims labelled as belonging to the cluster.
    pub async fn list_claims(
        &self,
        cluster: &ClusterContext,
    ) -> Result<Vec<VolumeClaim>, VolumeError> {
        self.store
            .list_claims(&cluster.selector, &cluster.namespace)
            .await
    }

    /// List the volumes of the cluster's running replicas, in claim order.
    ///
    /// Claims for ordinals at or beyond the replica count are skipped: their
    /// pods are not running and their volumes may not exist yet. A malformed
    /// ordinal or an unresolvable volume fails the whole listing.
    pub async fn list_eligible_volumes(
        &self,
        cluster: &ClusterContext,
    ) -> Result<Vec<Volume>, VolumeError> {
        let claims = self.list_claims(cluster).await?;
        let mut volumes = Vec::with_capacity(claims.len());

        for claim in claims {
            if let Some(ordinal) = parse_claim_ordinal(&claim.name)? {
                if !is_running_ordinal(ordinal, cluster.replicas) {
                    debug!(
                        claim = %claim.name,
                        ordinal,
                        replicas = cluster.replicas,
                        "skipping persistent volume of a non-running pod"
                    );
                    continue;
                }
            }

            let volume = self.store.get_volume(&claim.volume_name).await?;
            debug!(
                claim = %claim.name,
                volume = %volume.name,
                requested_provisioner = claim.provisioner().unwrap_or("unknown"),
                provisioner = volume.provisioner().unwrap_or("unknown"),
                size_gb = volume.size_gb(),
                "resolved persistent volume"
            );
            volumes.push(volume);
        }

        Ok(volumes)
    }

    /// Delete every claim of the cluster.
    ///
    /// Best effort: a failed deletion is logged and the sweep continues.
    /// Only a failure to list the claims is returned as an error.
    pub async fn delete_claims(
        &self,
        cluster: &ClusterContext,
    ) -> Result<ClaimCleanup, VolumeError> {
        debug!(cluster = %cluster.name, "deleting persistent volume claims");
        let claims = self.list_claims(cluster).await?;
        let mut cleanup = ClaimCleanup::default();

        for claim in claims {
            let name = claim.namespaced_name().to_string();
            debug!(claim = %name, "deleting persistent volume claim");

            match self.store.delete_claim(&claim.namespace, &claim.name).await {
                Ok(()) => cleanup.deleted.push(name),
                Err(e) => {
                    warn!(claim = %name, error = %e, "could not delete persistent volume claim");
                    cleanup.failed.push(name);
                }
            }
        }

        if cleanup.deleted.is_empty() && cleanup.failed.is_empty() {
            debug!(cluster = %cluster.name, "no persistent volume claims to delete");
        } else {
            debug!(
                cluster = %cluster.name,
                deleted = cleanup.deleted.len(),
                failed = cleanup.failed.len(),
                "persistent volume claims have been deleted"
            );
        }

        Ok(cleanup)
    }
}
