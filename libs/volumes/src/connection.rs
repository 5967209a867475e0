//! Provider connection lifecycle within one reconciliation batch.
//!
//! [`ProviderSessions`] opens each provider connection lazily, at most once
//! per batch, and closes every connection it opened when the batch ends.
//! Connections that were already open before the batch belong to someone
//! else and are left alone.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::error::VolumeError;
use crate::provider::VolumeResizer;

/// A provider that could not be disconnected cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectFailure {
    pub provider: String,
    pub message: String,
}

/// Connections opened during one batch.
///
/// Call [`ProviderSessions::release`] on every exit path of the batch.
#[derive(Default)]
pub struct ProviderSessions {
    opened: Vec<Arc<dyn VolumeResizer>>,
}

impl ProviderSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `resizer` is connected, connecting it on first use.
    pub async fn ensure_connected(
        &mut self,
        resizer: &Arc<dyn VolumeResizer>,
    ) -> Result<(), VolumeError> {
        if self.is_open(resizer) {
            return Ok(());
        }
        if resizer.is_connected() {
            debug!(
                provider = resizer.provider_name(),
                "provider already connected outside this batch"
            );
            return Ok(());
        }

        debug!(provider = resizer.provider_name(), "connecting to volume provider");
        resizer
            .connect()
            .await
            .map_err(|source| VolumeError::ProviderConnection {
                provider: resizer.provider_name().to_string(),
                detail: "could not connect to the volume provider".to_string(),
                source,
            })?;

        self.opened.push(Arc::clone(resizer));
        Ok(())
    }

    /// Returns true if this batch opened the connection of `resizer`.
    pub fn is_open(&self, resizer: &Arc<dyn VolumeResizer>) -> bool {
        self.opened
            .iter()
            .any(|open| std::ptr::addr_eq(Arc::as_ptr(open), Arc::as_ptr(resizer)))
    }

    /// Number of connections opened by this batch and not yet released.
    pub fn open_count(&self) -> usize {
        self.opened.len()
    }

    /// Disconnect every provider this batch connected.
    ///
    /// Failures are logged and returned, never escalated.
    pub async fn release(mut self) -> Vec<DisconnectFailure> {
        let mut failures = Vec::new();

        for resizer in self.opened.drain(..) {
            match resizer.disconnect().await {
                Ok(()) => {
                    debug!(provider = resizer.provider_name(), "disconnected from volume provider");
                }
                Err(e) => {
                    error!(
                        provider = resizer.provider_name(),
                        error = %e,
                        "could not disconnect from volume provider"
                    );
                    failures.push(DisconnectFailure {
                        provider: resizer.provider_name().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        failures
    }
}

impl Drop for ProviderSessions {
    fn drop(&mut self) {
        if !self.opened.is_empty() {
            let providers: Vec<&str> = self.opened.iter().map(|r| r.provider_name()).collect();
            warn!(
                providers = ?providers,
                "provider sessions dropped without release, connections left open"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use anyhow::{bail, Result};
    use async_trait::async_trait;

    use super::*;
    use crate::model::Volume;

    #[derive(Default)]
    struct CountingResizer {
        connected: AtomicBool,
        connects: AtomicUsize,
        disconnects: AtomicUsize,
        fail_connect: bool,
        fail_disconnect: bool,
    }

    #[async_trait]
    impl VolumeResizer for CountingResizer {
        fn provider_name(&self) -> &str {
            "counting"
        }

        fn volume_belongs_to_provider(&self, _volume: &Volume) -> bool {
            true
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn connect(&self) -> Result<()> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.fail_connect {
                bail!("connection refused");
            }
            self.connected.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn disconnect(&self) -> Result<()> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            self.connected.store(false, Ordering::SeqCst);
            if self.fail_disconnect {
                bail!("session expired");
            }
            Ok(())
        }

        async fn provider_volume_id(&self, volume: &Volume) -> Result<String> {
            Ok(volume.name.clone())
        }

        async fn resize_volume(&self, _volume_id: &str, _new_size_gb: u64) -> Result<()> {
            Ok(())
        }
    }

    fn resizer(inner: CountingResizer) -> (Arc<CountingResizer>, Arc<dyn VolumeResizer>) {
        let concrete = Arc::new(inner);
        let shared: Arc<dyn VolumeResizer> = concrete.clone();
        (concrete, shared)
    }

    #[tokio::test]
    async fn test_connects_once_per_batch() {
        let (counting, shared) = resizer(CountingResizer::default());
        let mut sessions = ProviderSessions::new();

        sessions.ensure_connected(&shared).await.unwrap();
        sessions.ensure_connected(&shared).await.unwrap();

        assert_eq!(counting.connects.load(Ordering::SeqCst), 1);
        assert!(sessions.is_open(&shared));
        assert_eq!(sessions.open_count(), 1);

        assert!(sessions.release().await.is_empty());
        assert_eq!(counting.disconnects.load(Ordering::SeqCst), 1);
        assert!(!counting.is_connected());
    }

    #[tokio::test]
    async fn test_existing_connection_is_not_owned() {
        let (counting, shared) = resizer(CountingResizer::default());
        counting.connected.store(true, Ordering::SeqCst);
        let mut sessions = ProviderSessions::new();

        sessions.ensure_connected(&shared).await.unwrap();

        assert!(!sessions.is_open(&shared));
        assert_eq!(sessions.open_count(), 0);
        sessions.release().await;
        assert_eq!(counting.connects.load(Ordering::SeqCst), 0);
        assert_eq!(counting.disconnects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_connect_is_not_released() {
        let (counting, shared) = resizer(CountingResizer {
            fail_connect: true,
            ..Default::default()
        });
        let mut sessions = ProviderSessions::new();

        let err = sessions.ensure_connected(&shared).await.unwrap_err();
        assert_eq!(err.reason_code(), "provider_connection_failed");
        assert_eq!(sessions.open_count(), 0);

        sessions.release().await;
        assert_eq!(counting.disconnects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_release_collects_disconnect_failures() {
        let (_, failing) = resizer(CountingResizer {
            fail_disconnect: true,
            ..Default::default()
        });
        let (healthy_counting, healthy) = resizer(CountingResizer::default());
        let mut sessions = ProviderSessions::new();
        sessions.ensure_connected(&failing).await.unwrap();
        sessions.ensure_connected(&healthy).await.unwrap();
        assert_eq!(sessions.open_count(), 2);

        let failures = sessions.release().await;

        assert_eq!(
            failures,
            vec![DisconnectFailure {
                provider: "counting".to_string(),
                message: "session expired".to_string(),
            }]
        );
        assert_eq!(healthy_counting.disconnects.load(Ordering::SeqCst), 1);
    }
}
