//! # pgvr-testing
//!
//! Test doubles for the volume resize engine.
//!
//! - `store`: an in-memory resource store with injectable failures
//! - `resizer`: a block-storage backend that records every call
//! - `filesystem`: recording filesystem backend and scripted pod executor
//! - `fixtures`: builders for claims and volumes

pub mod filesystem;
pub mod fixtures;
pub mod resizer;
pub mod store;

pub use filesystem::{ExecutedCommand, RecordingFilesystem, ScriptedExecutor};
pub use fixtures::{claim, volume};
pub use resizer::{RecordingResizer, ResizerCalls};
pub use store::InMemoryVolumeStore;
