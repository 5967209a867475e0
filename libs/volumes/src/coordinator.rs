//! Grow-only resize of a cluster's volumes.
//!
//! One call to [`ResizeCoordinator::resize_volumes`] is one reconciliation
//! batch. For every eligible volume below the manifest size it:
//!
//! 1. picks the single backend that owns the volume,
//! 2. connects to it on first use in the batch,
//! 3. grows the block device,
//! 4. grows the filesystem inside the owning pod,
//! 5. records the new capacity.
//!
//! Volumes are processed one at a time. Each completed volume is durable
//! before the next one starts, so an aborted batch leaves finished volumes
//! resized and a later pass picks up the rest.

use std::sync::Arc;

use pgvr_quantity::Quantity;
use tracing::{debug, info, instrument, warn};

use crate::config::ClusterContext;
use crate::connection::{DisconnectFailure, ProviderSessions};
use crate::enumerator::VolumeEnumerator;
use crate::error::VolumeError;
use crate::filesystem::FilesystemResizeBackend;
use crate::model::{Volume, VolumeSpec};
use crate::naming::pod_name_from_volume;
use crate::provider::VolumeResizer;
use crate::store::{VolumeStore, VolumeStoreAdapter};

/// Outcome of a successful resize batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResizeReport {
    /// Volumes grown to the target size.
    pub resized: Vec<String>,

    /// Volumes already at the target size.
    pub unchanged: Vec<String>,

    /// Providers that failed to disconnect after the batch.
    pub disconnect_failures: Vec<DisconnectFailure>,
}

/// Reconciles a cluster's volume sizes against its manifest.
pub struct ResizeCoordinator {
    cluster: ClusterContext,
    store: VolumeStoreAdapter,
    enumerator: VolumeEnumerator,
    filesystem: Arc<dyn FilesystemResizeBackend>,
}

impl ResizeCoordinator {
    pub fn new(
        cluster: ClusterContext,
        store: Arc<dyn VolumeStore>,
        filesystem: Arc<dyn FilesystemResizeBackend>,
    ) -> Self {
        let store = VolumeStoreAdapter::new(store);
        Self {
            cluster,
            enumerator: VolumeEnumerator::new(store.clone()),
            store,
            filesystem,
        }
    }

    pub fn cluster(&self) -> &ClusterContext {
        &self.cluster
    }

    pub fn enumerator(&self) -> &VolumeEnumerator {
        &self.enumerator
    }

    /// Returns true if any eligible volume differs from the manifest size.
    ///
    /// Performs no mutation.
    pub async fn needs_resize(&self, spec: &VolumeSpec) -> Result<bool, VolumeError> {
        let (volumes, target) = self.volumes_with_manifest_size(spec).await?;
        let target_gb = target.to_gigabytes();
        Ok(volumes.iter().any(|volume| volume.size_gb() != target_gb))
    }

    /// Grow every eligible volume to the manifest size.
    ///
    /// Provider connections opened by this call are closed before it
    /// returns, whether it succeeds or fails.
    #[instrument(
        skip(self, spec, resizers),
        fields(cluster = %self.cluster.name, namespace = %self.cluster.namespace, size = %spec.size)
    )]
    pub async fn resize_volumes(
        &self,
        spec: &VolumeSpec,
        resizers: &[Arc<dyn VolumeResizer>],
    ) -> Result<ResizeReport, VolumeError> {
        let (volumes, target) = self.volumes_with_manifest_size(spec).await?;

        let mut sessions = ProviderSessions::new();
        let outcome = self
            .resize_batch(&volumes, &target, resizers, &mut sessions)
            .await;
        let disconnect_failures = sessions.release().await;

        let mut report = outcome?;
        report.disconnect_failures = disconnect_failures;
        Ok(report)
    }

    async fn volumes_with_manifest_size(
        &self,
        spec: &VolumeSpec,
    ) -> Result<(Vec<Volume>, Quantity), VolumeError> {
        let target = Quantity::parse(&spec.size).map_err(|source| VolumeError::InvalidSizeSpec {
            size: spec.size.clone(),
            source,
        })?;
        let volumes = self.enumerator.list_eligible_volumes(&self.cluster).await?;
        Ok((volumes, target))
    }

    async fn resize_batch(
        &self,
        volumes: &[Volume],
        target: &Quantity,
        resizers: &[Arc<dyn VolumeResizer>],
        sessions: &mut ProviderSessions,
    ) -> Result<ResizeReport, VolumeError> {
        let target_gb = target.to_gigabytes();

        // Reject shrinking before touching any volume so replicas never end
        // up with a mix of old and new sizes.
        if let Some(volume) = volumes.iter().find(|v| v.size_gb() > target_gb) {
            return Err(VolumeError::ShrinkNotSupported {
                volume: volume.name.clone(),
                current_gb: volume.size_gb(),
                target_gb,
            });
        }

        let mut report = ResizeReport::default();
        let mut unmanaged = Vec::new();

        for volume in volumes {
            if volume.size_gb() == target_gb {
                debug!(volume = %volume.name, size_gb = target_gb, "volume already at target size");
                report.unchanged.push(volume.name.clone());
                continue;
            }

            let Some(resizer) = select_resizer(volume, resizers)? else {
                warn!(
                    volume = %volume.name,
                    provisioner = volume.provisioner().unwrap_or("unknown"),
                    "no resizing provider manages this volume"
                );
                unmanaged.push(volume.name.clone());
                continue;
            };

            sessions.ensure_connected(resizer).await?;
            self.resize_volume(volume, target, resizer.as_ref()).await?;
            report.resized.push(volume.name.clone());
        }

        if !unmanaged.is_empty() {
            return Err(VolumeError::NoCompatibleProvider { volumes: unmanaged });
        }

        Ok(report)
    }

    async fn resize_volume(
        &self,
        volume: &Volume,
        target: &Quantity,
        resizer: &dyn VolumeResizer,
    ) -> Result<(), VolumeError> {
        let provider = resizer.provider_name();
        let target_gb = target.to_gigabytes();

        // Resolve the pod first: a bad claim reference must not leave a grown
        // device behind with an un-grown filesystem.
        let pod = pod_name_from_volume(volume, &self.cluster.settings.data_volume_name)?;

        let volume_id = resizer.provider_volume_id(volume).await.map_err(|source| {
            VolumeError::ProviderConnection {
                provider: provider.to_string(),
                detail: format!("could not resolve the volume id of {:?}", volume.name),
                source,
            }
        })?;

        debug!(volume = %volume.name, provider, volume_id = %volume_id, target_gb, "resizing block device");
        resizer
            .resize_volume(&volume_id, target_gb)
            .await
            .map_err(|source| VolumeError::BlockResize {
                provider: provider.to_string(),
                volume_id: volume_id.clone(),
                source,
            })?;

        debug!(volume = %volume.name, pod = %pod, "resizing the filesystem on the volume");
        self.filesystem
            .resize_filesystem(&pod)
            .await
            .map_err(|source| VolumeError::FilesystemResize {
                pod: pod.clone(),
                source,
            })?;

        self.store
            .update_volume_capacity(volume, target.clone())
            .await?;

        info!(
            volume = %volume.name,
            provider,
            pod = %pod,
            from_gb = volume.size_gb(),
            to_gb = target_gb,
            "persistent volume resized"
        );
        Ok(())
    }
}

/// Pick the one backend that owns `volume`.
///
/// Returns `Ok(None)` if no backend owns it and an error if several do.
fn select_resizer<'r>(
    volume: &Volume,
    resizers: &'r [Arc<dyn VolumeResizer>],
) -> Result<Option<&'r Arc<dyn VolumeResizer>>, VolumeError> {
    let owners: Vec<&Arc<dyn VolumeResizer>> = resizers
        .iter()
        .filter(|resizer| resizer.volume_belongs_to_provider(volume))
        .collect();

    match owners.as_slice() {
        [] => Ok(None),
        [owner] => Ok(Some(*owner)),
        _ => Err(VolumeError::AmbiguousProvider {
            volume: volume.name.clone(),
            providers: owners
                .iter()
                .map(|r| r.provider_name().to_string())
                .collect(),
        }),
    }
}
