//! Resource store interface and adapter.
//!
//! The store holds claim and volume records. The adapter adds no business
//! logic: it wraps every store error with the intent of the operation that
//! failed and hands it back unchanged in kind.

use std::sync::Arc;

use async_trait::async_trait;
use pgvr_quantity::Quantity;
use thiserror::Error;
use tracing::debug;

use crate::error::VolumeError;
use crate::model::{LabelSelector, Volume, VolumeClaim};

/// Errors reported by a resource store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Claim and volume records, keyed by name.
#[async_trait]
pub trait VolumeStore: Send + Sync {
    /// List claims in `namespace` whose labels match `selector`.
    async fn list_claims(
        &self,
        selector: &LabelSelector,
        namespace: &str,
    ) -> Result<Vec<VolumeClaim>, StoreError>;

    /// Fetch a volume by name. Volumes are not namespaced.
    async fn get_volume(&self, name: &str) -> Result<Volume, StoreError>;

    /// Replace a volume record, returning the stored version.
    async fn update_volume(&self, volume: &Volume) -> Result<Volume, StoreError>;

    /// Delete a claim.
    async fn delete_claim(&self, namespace: &str, name: &str) -> Result<(), StoreError>;
}

/// Intent-wrapping adapter over a [`VolumeStore`].
#[derive(Clone)]
pub struct VolumeStoreAdapter {
    store: Arc<dyn VolumeStore>,
}

impl VolumeStoreAdapter {
    pub fn new(store: Arc<dyn VolumeStore>) -> Self {
        Self { store }
    }

    pub async fn list_claims(
        &self,
        selector: &LabelSelector,
        namespace: &str,
    ) -> Result<Vec<VolumeClaim>, VolumeError> {
        self.store
            .list_claims(selector, namespace)
            .await
            .map_err(|source| VolumeError::StoreAccess {
                intent: format!(
                    "list persistent volume claims in {namespace:?} matching \"{selector}\""
                ),
                source,
            })
    }

    pub async fn get_volume(&self, name: &str) -> Result<Volume, VolumeError> {
        self.store
            .get_volume(name)
            .await
            .map_err(|source| VolumeError::StoreAccess {
                intent: format!("get persistent volume {name:?}"),
                source,
            })
    }

    /// Record a new capacity for `volume` and return the stored record.
    pub async fn update_volume_capacity(
        &self,
        volume: &Volume,
        capacity: Quantity,
    ) -> Result<Volume, VolumeError> {
        debug!(
            volume = %volume.name,
            from = %volume.capacity,
            to = %capacity,
            "updating persistent volume capacity"
        );

        let mut updated = volume.clone();
        updated.capacity = capacity;

        self.store
            .update_volume(&updated)
            .await
            .map_err(|source| VolumeError::StoreAccess {
                intent: format!("update persistent volume {:?}", volume.name),
                source,
            })
    }

    pub async fn delete_claim(&self, namespace: &str, name: &str) -> Result<(), VolumeError> {
        self.store
            .delete_claim(namespace, name)
            .await
            .map_err(|source| VolumeError::StoreAccess {
                intent: format!("delete persistent volume claim {namespace}/{name}"),
                source,
            })
    }
}
