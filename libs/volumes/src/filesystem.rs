//! Filesystem resizing inside database pods.
//!
//! After a block device grows, the filesystem on it must be grown from
//! inside the pod that mounts it. [`PodFilesystemResizer`] finds the device
//! and filesystem type of the data mount with `df -T`, then hands the
//! device to the first [`FilesystemResizer`] strategy that accepts the
//! filesystem type.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::config::ResizeSettings;
use crate::model::NamespacedName;

/// Filesystem resize capability invoked once per resized volume.
#[async_trait]
pub trait FilesystemResizeBackend: Send + Sync {
    /// Grow the data filesystem mounted in `pod` to fill its device.
    async fn resize_filesystem(&self, pod: &NamespacedName) -> Result<()>;
}

/// Runs commands inside pod containers.
#[async_trait]
pub trait PodCommandExecutor: Send + Sync {
    /// Run `command` in `container` of `pod` and return its stdout.
    async fn exec(&self, pod: &NamespacedName, container: &str, command: &[&str])
        -> Result<String>;
}

/// A shell in one container of one pod.
pub struct PodShell<'a> {
    executor: &'a dyn PodCommandExecutor,
    pod: &'a NamespacedName,
    container: &'a str,
}

impl<'a> PodShell<'a> {
    pub fn new(
        executor: &'a dyn PodCommandExecutor,
        pod: &'a NamespacedName,
        container: &'a str,
    ) -> Self {
        Self {
            executor,
            pod,
            container,
        }
    }

    /// Run a shell command line through `bash -c`.
    pub async fn run(&self, command: &str) -> Result<String> {
        debug!(pod = %self.pod, container = self.container, command, "executing in pod");
        self.executor
            .exec(self.pod, self.container, &["bash", "-c", command])
            .await
    }
}

/// A filesystem-type specific resize strategy.
#[async_trait]
pub trait FilesystemResizer: Send + Sync {
    /// Returns true if this strategy handles `fs_type`.
    fn can_resize(&self, fs_type: &str) -> bool;

    /// Grow the filesystem on `device`.
    async fn resize(&self, device: &str, shell: &PodShell<'_>) -> Result<()>;
}

/// Online resize for the ext2/ext3/ext4 family via `resize2fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ext234Resize;

#[async_trait]
impl FilesystemResizer for Ext234Resize {
    fn can_resize(&self, fs_type: &str) -> bool {
        matches!(fs_type, "ext2" | "ext3" | "ext4")
    }

    async fn resize(&self, device: &str, shell: &PodShell<'_>) -> Result<()> {
        // resize2fs reports on stderr
        let output = shell.run(&format!("resize2fs {device} 2>&1")).await?;
        if resize2fs_succeeded(&output) {
            return Ok(());
        }
        bail!("unrecognized resize2fs output {output:?}, assuming error")
    }
}

/// Interpret `resize2fs` output.
///
/// Success is either "Nothing to do" or an online resize that reports the
/// new block count.
pub fn resize2fs_succeeded(output: &str) -> bool {
    if output.contains("Nothing to do") {
        return true;
    }
    output.contains("on-line resizing required") && output.lines().any(is_new_size_line)
}

/// Matches `The filesystem on <dev> is now <blocks> (<size>) blocks long.`
fn is_new_size_line(line: &str) -> bool {
    let Some(start) = line.find("The filesystem on ") else {
        return false;
    };
    let rest = &line[start + "The filesystem on ".len()..];

    let Some((device, rest)) = rest.split_once(" is now ") else {
        return false;
    };
    let Some((blocks, rest)) = rest.split_once(" (") else {
        return false;
    };
    let Some((block_size, _)) = rest.split_once(") blocks long.") else {
        return false;
    };

    let device_ok = !device.is_empty()
        && device
            .chars()
            .all(|c| c == '/' || c.is_ascii_lowercase() || c.is_ascii_digit());
    let blocks_ok = !blocks.is_empty() && blocks.chars().all(|c| c.is_ascii_digit());
    let size_digits = block_size.trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '_');
    let size_ok = !size_digits.is_empty()
        && size_digits.len() < block_size.len()
        && size_digits.chars().all(|c| c.is_ascii_digit());

    device_ok && blocks_ok && size_ok
}

/// Split the last line of `df -T` into device and filesystem type.
pub fn parse_df_output(output: &str) -> Result<(&str, &str)> {
    let mut fields = output.split_whitespace();
    match (fields.next(), fields.next()) {
        (Some(device), Some(fs_type)) => Ok((device, fs_type)),
        _ => bail!("could not parse df output {output:?}"),
    }
}

/// Filesystem resize through commands executed in the database pod.
pub struct PodFilesystemResizer {
    executor: Arc<dyn PodCommandExecutor>,
    resizers: Vec<Box<dyn FilesystemResizer>>,
    data_mount_path: String,
    container_name: String,
}

impl PodFilesystemResizer {
    /// Create a resizer with the ext2/3/4 strategy.
    pub fn new(executor: Arc<dyn PodCommandExecutor>, settings: &ResizeSettings) -> Self {
        Self {
            executor,
            resizers: vec![Box::new(Ext234Resize)],
            data_mount_path: settings.data_mount_path.clone(),
            container_name: settings.container_name.clone(),
        }
    }

    /// Replace the strategy list. Strategies are tried in order.
    #[must_use]
    pub fn with_resizers(mut self, resizers: Vec<Box<dyn FilesystemResizer>>) -> Self {
        self.resizers = resizers;
        self
    }
}

#[async_trait]
impl FilesystemResizeBackend for PodFilesystemResizer {
    async fn resize_filesystem(&self, pod: &NamespacedName) -> Result<()> {
        let shell = PodShell::new(self.executor.as_ref(), pod, &self.container_name);

        let df = shell
            .run(&format!("df -T {}|tail -1", self.data_mount_path))
            .await?;
        let (device, fs_type) = parse_df_output(&df)?;
        debug!(pod = %pod, device, fs_type, "found data filesystem");

        for resizer in &self.resizers {
            if resizer.can_resize(fs_type) {
                return resizer.resize(device, &shell).await;
            }
        }

        bail!("could not resize filesystem: no compatible resizers for the filesystem of type {fs_type:?}")
    }
}
