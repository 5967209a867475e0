//! Cloud block-storage resize backends.
//!
//! A backend grows block devices for the volumes it owns. Several backends
//! can be supplied together; each volume must be owned by exactly one.

use anyhow::Result;
use async_trait::async_trait;

use crate::model::Volume;

/// Resize capability of one block-storage provider.
#[async_trait]
pub trait VolumeResizer: Send + Sync {
    /// Short provider name used in logs and errors.
    fn provider_name(&self) -> &str;

    /// Returns true if this provider manages `volume`.
    fn volume_belongs_to_provider(&self, volume: &Volume) -> bool;

    /// Returns true if a provider connection is currently open.
    fn is_connected(&self) -> bool;

    /// Open a provider connection.
    async fn connect(&self) -> Result<()>;

    /// Close the provider connection.
    async fn disconnect(&self) -> Result<()>;

    /// Resolve the provider-native identifier of `volume`.
    async fn provider_volume_id(&self, volume: &Volume) -> Result<String>;

    /// Grow the block device to `new_size_gb` gigabytes.
    async fn resize_volume(&self, volume_id: &str, new_size_gb: u64) -> Result<()>;
}
