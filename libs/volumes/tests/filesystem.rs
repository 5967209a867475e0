//! Integration tests for in-pod filesystem resizing.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use pgvr_testing::ScriptedExecutor;
use pgvr_volumes::{
    FilesystemResizeBackend, FilesystemResizer, NamespacedName, PodFilesystemResizer, PodShell,
    ResizeSettings,
};

const DF_EXT4: &str =
    "/dev/nvme1n1   ext4  10190100 36888  9612540   1% /home/postgres/pgdata\n";

const DF_XFS: &str = "/dev/nvme1n1   xfs  10190100 36888  9612540   1% /home/postgres/pgdata\n";

const RESIZE2FS_ONLINE_STDERR: &str = "resize2fs 1.45.5 (07-Jan-2020)\n\
    Filesystem at /dev/nvme1n1 is mounted on /home/postgres/pgdata; on-line resizing required\n\
    old_desc_blocks = 2, new_desc_blocks = 3\n";

const RESIZE2FS_ONLINE_STDOUT: &str =
    "The filesystem on /dev/nvme1n1 is now 5242880 (4k) blocks long.\n\n";

const RESIZE2FS_NOTHING_TO_DO_STDERR: &str = "resize2fs 1.47.0 (5-Feb-2023)\n\
    The filesystem is already 5242880 (4k) blocks long.  Nothing to do!\n\n";

fn pod() -> NamespacedName {
    NamespacedName::new("default", "acid-0")
}

fn resizer(executor: &Arc<ScriptedExecutor>) -> PodFilesystemResizer {
    PodFilesystemResizer::new(executor.clone(), &ResizeSettings::default())
}

#[tokio::test]
async fn test_ext4_online_resize() {
    let executor = Arc::new(
        ScriptedExecutor::new()
            .respond("df -T", DF_EXT4)
            .respond_with_stderr("resize2fs", RESIZE2FS_ONLINE_STDOUT, RESIZE2FS_ONLINE_STDERR),
    );

    resizer(&executor).resize_filesystem(&pod()).await.unwrap();

    let executed = executor.executed();
    assert_eq!(executed.len(), 2);
    assert_eq!(executed[0].script(), "df -T /home/postgres/pgdata|tail -1");
    assert_eq!(executed[1].script(), "resize2fs /dev/nvme1n1 2>&1");

    for command in &executed {
        assert_eq!(command.pod, pod());
        assert_eq!(command.container, "postgres");
        assert_eq!(command.command[..2], ["bash", "-c"]);
    }
}

#[tokio::test]
async fn test_already_grown_filesystem_is_success() {
    // resize2fs writes "Nothing to do!" to stderr and nothing to stdout.
    let executor = Arc::new(
        ScriptedExecutor::new()
            .respond("df -T", DF_EXT4)
            .respond_with_stderr("resize2fs", "", RESIZE2FS_NOTHING_TO_DO_STDERR),
    );

    resizer(&executor).resize_filesystem(&pod()).await.unwrap();

    let executed = executor.executed();
    assert_eq!(executed[1].script(), "resize2fs /dev/nvme1n1 2>&1");
}

#[tokio::test]
async fn test_stderr_is_not_captured_without_redirect() {
    let executor = Arc::new(ScriptedExecutor::new().respond_with_stderr(
        "resize2fs",
        "",
        RESIZE2FS_NOTHING_TO_DO_STDERR,
    ));
    let pod = pod();
    let shell = PodShell::new(executor.as_ref(), &pod, "postgres");

    assert_eq!(shell.run("resize2fs /dev/nvme1n1").await.unwrap(), "");
    assert!(shell
        .run("resize2fs /dev/nvme1n1 2>&1")
        .await
        .unwrap()
        .contains("Nothing to do!"));
}

#[tokio::test]
async fn test_unrecognized_resize2fs_output_fails() {
    let executor = Arc::new(
        ScriptedExecutor::new()
            .respond("df -T", DF_EXT4)
            .respond_with_stderr(
                "resize2fs",
                "",
                "resize2fs: Device or resource busy while trying to open /dev/nvme1n1\n",
            ),
    );

    let err = resizer(&executor)
        .resize_filesystem(&pod())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("unrecognized resize2fs output"));
}

#[tokio::test]
async fn test_unsupported_filesystem_type() {
    let executor = Arc::new(ScriptedExecutor::new().respond("df -T", DF_XFS));

    let err = resizer(&executor)
        .resize_filesystem(&pod())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("no compatible resizers"));
    assert!(err.to_string().contains("xfs"));
    assert_eq!(executor.executed().len(), 1);
}

#[tokio::test]
async fn test_exec_failure_is_propagated() {
    let executor = Arc::new(ScriptedExecutor::new().fail("df -T", "container not running"));

    let err = resizer(&executor)
        .resize_filesystem(&pod())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("container not running"));
}

#[tokio::test]
async fn test_empty_df_output_fails() {
    let executor = Arc::new(ScriptedExecutor::new().respond("df -T", ""));

    let err = resizer(&executor)
        .resize_filesystem(&pod())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("could not parse df output"));
}

#[tokio::test]
async fn test_settings_choose_mount_and_container() {
    let executor = Arc::new(
        ScriptedExecutor::new()
            .respond("df -T", "/dev/sdb ext3 1 1 1 1% /data\n")
            .respond_with_stderr("resize2fs", "", "Nothing to do!"),
    );
    let settings = ResizeSettings {
        data_mount_path: "/data".to_string(),
        container_name: "database".to_string(),
        ..ResizeSettings::default()
    };

    PodFilesystemResizer::new(executor.clone(), &settings)
        .resize_filesystem(&pod())
        .await
        .unwrap();

    let executed = executor.executed();
    assert_eq!(executed[0].script(), "df -T /data|tail -1");
    assert_eq!(executed[1].script(), "resize2fs /dev/sdb 2>&1");
    assert!(executed.iter().all(|c| c.container == "database"));
}

/// Strategy that accepts xfs and records the device it was given.
struct XfsGrow;

#[async_trait]
impl FilesystemResizer for XfsGrow {
    fn can_resize(&self, fs_type: &str) -> bool {
        fs_type == "xfs"
    }

    async fn resize(&self, device: &str, shell: &PodShell<'_>) -> Result<()> {
        let output = shell.run(&format!("xfs_growfs {device}")).await?;
        if output.contains("data blocks changed") {
            return Ok(());
        }
        bail!("xfs_growfs did not grow {device}")
    }
}

#[tokio::test]
async fn test_custom_strategies_are_tried_in_order() {
    let executor = Arc::new(
        ScriptedExecutor::new()
            .respond("df -T", DF_XFS)
            .respond("xfs_growfs", "data blocks changed from 2621440 to 5242880\n"),
    );

    resizer(&executor)
        .with_resizers(vec![
            Box::new(pgvr_volumes::Ext234Resize),
            Box::new(XfsGrow),
        ])
        .resize_filesystem(&pod())
        .await
        .unwrap();

    let executed = executor.executed();
    assert_eq!(executed[1].script(), "xfs_growfs /dev/nvme1n1");
}
