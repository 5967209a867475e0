//! # pgvr-volumes
//!
//! Persistent volume resize reconciliation for database clusters.
//!
//! Grows the volumes of a cluster's running replicas to the size declared in
//! the cluster manifest: block device first, through the cloud backend that
//! owns the volume, then the filesystem inside the pod, then the recorded
//! capacity.
//!
//! ## Components
//!
//! - `store`: resource store interface and intent-wrapping adapter
//! - `enumerator`: claims to eligible volumes, plus claim cleanup
//! - `connection`: per-batch provider connection lifecycle
//! - `coordinator`: the grow-only resize protocol
//! - `filesystem`: in-pod filesystem resize strategies
//!
//! ## Invariants
//!
//! - Recorded capacity never decreases; shrinking is rejected up front
//! - Every volume that needs work is owned by exactly one backend
//! - Provider connections opened in a batch are closed when it ends
//! - Re-running a batch is safe: converged volumes are skipped

pub mod config;
pub mod connection;
pub mod coordinator;
pub mod enumerator;
pub mod error;
pub mod filesystem;
pub mod model;
pub mod naming;
pub mod provider;
pub mod store;

pub use config::{ClusterContext, ResizeSettings};
pub use connection::{DisconnectFailure, ProviderSessions};
pub use coordinator::{ResizeCoordinator, ResizeReport};
pub use enumerator::{ClaimCleanup, VolumeEnumerator};
pub use error::VolumeError;
pub use filesystem::{
    Ext234Resize, FilesystemResizeBackend, FilesystemResizer, PodCommandExecutor,
    PodFilesystemResizer, PodShell,
};
pub use model::{LabelSelector, NamespacedName, Volume, VolumeClaim, VolumeSpec};
pub use provider::VolumeResizer;
pub use store::{StoreError, VolumeStore, VolumeStoreAdapter};

/// Re-export for callers building volume records.
pub use pgvr_quantity::Quantity;
