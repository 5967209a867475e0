//! Recording block-storage backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{bail, Result};
use async_trait::async_trait;
use pgvr_volumes::{Volume, VolumeResizer};

/// Calls received by a [`RecordingResizer`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResizerCalls {
    pub ownership_checks: usize,
    pub connect: usize,
    pub disconnect: usize,
    /// Volumes whose provider id was resolved.
    pub volume_ids: Vec<String>,
    /// `(volume id, new size in GB)` per block resize.
    pub resizes: Vec<(String, u64)>,
}

impl ResizerCalls {
    /// Returns true if nothing but ownership checks happened.
    pub fn is_untouched(&self) -> bool {
        self.connect == 0
            && self.disconnect == 0
            && self.volume_ids.is_empty()
            && self.resizes.is_empty()
    }
}

/// Backend owning volumes annotated with one provisioner.
///
/// Provider volume ids are `vol-<volume name>`.
pub struct RecordingResizer {
    name: String,
    provisioner: String,
    connected: AtomicBool,
    calls: Mutex<ResizerCalls>,
    fail_connect: bool,
    fail_disconnect: bool,
    fail_volume_id: bool,
    fail_resize: bool,
}

impl RecordingResizer {
    pub fn new(name: &str, provisioner: &str) -> Self {
        Self {
            name: name.to_string(),
            provisioner: provisioner.to_string(),
            connected: AtomicBool::new(false),
            calls: Mutex::new(ResizerCalls::default()),
            fail_connect: false,
            fail_disconnect: false,
            fail_volume_id: false,
            fail_resize: false,
        }
    }

    /// Start with a connection opened by someone else.
    #[must_use]
    pub fn already_connected(self) -> Self {
        self.connected.store(true, Ordering::SeqCst);
        self
    }

    #[must_use]
    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    #[must_use]
    pub fn failing_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }

    #[must_use]
    pub fn failing_volume_id(mut self) -> Self {
        self.fail_volume_id = true;
        self
    }

    #[must_use]
    pub fn failing_resize(mut self) -> Self {
        self.fail_resize = true;
        self
    }

    /// Snapshot of the calls received so far.
    pub fn calls(&self) -> ResizerCalls {
        self.record().clone()
    }

    fn record(&self) -> MutexGuard<'_, ResizerCalls> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl VolumeResizer for RecordingResizer {
    fn provider_name(&self) -> &str {
        &self.name
    }

    fn volume_belongs_to_provider(&self, volume: &Volume) -> bool {
        self.record().ownership_checks += 1;
        volume.is_provisioned_by(&self.provisioner)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn connect(&self) -> Result<()> {
        self.record().connect += 1;
        if self.fail_connect {
            bail!("{}: credentials rejected", self.name);
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.record().disconnect += 1;
        self.connected.store(false, Ordering::SeqCst);
        if self.fail_disconnect {
            bail!("{}: session already closed", self.name);
        }
        Ok(())
    }

    async fn provider_volume_id(&self, volume: &Volume) -> Result<String> {
        self.record().volume_ids.push(volume.name.clone());
        if self.fail_volume_id {
            bail!("{}: volume {} has no provider id", self.name, volume.name);
        }
        Ok(format!("vol-{}", volume.name))
    }

    async fn resize_volume(&self, volume_id: &str, new_size_gb: u64) -> Result<()> {
        self.record()
            .resizes
            .push((volume_id.to_string(), new_size_gb));
        if self.fail_resize {
            bail!("{}: VolumeModificationRateExceeded", self.name);
        }
        Ok(())
    }
}
