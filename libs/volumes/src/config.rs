//! Configuration for volume resizing.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::model::LabelSelector;

/// Process-wide resize settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeSettings {
    /// Name of the data volume in the pod template. Claims are named
    /// `<data_volume_name>-<pod name>`.
    pub data_volume_name: String,

    /// Mount point of the data volume inside the database container.
    pub data_mount_path: String,

    /// Container that runs filesystem commands.
    pub container_name: String,
}

impl Default for ResizeSettings {
    fn default() -> Self {
        Self {
            data_volume_name: "pgdata".to_string(),
            data_mount_path: "/home/postgres/pgdata".to_string(),
            container_name: "postgres".to_string(),
        }
    }
}

impl ResizeSettings {
    /// Load settings from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let data_volume_name =
            std::env::var("PGVR_DATA_VOLUME_NAME").unwrap_or(defaults.data_volume_name);
        let data_mount_path =
            std::env::var("PGVR_DATA_MOUNT_PATH").unwrap_or(defaults.data_mount_path);
        let container_name =
            std::env::var("PGVR_CONTAINER_NAME").unwrap_or(defaults.container_name);

        let settings = Self {
            data_volume_name,
            data_mount_path,
            container_name,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings that would make pod names or commands meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.data_volume_name.is_empty() {
            bail!("data volume name must not be empty");
        }
        if !self.data_mount_path.starts_with('/') {
            bail!(
                "data mount path must be absolute, got {:?}",
                self.data_mount_path
            );
        }
        if self.container_name.is_empty() {
            bail!("container name must not be empty");
        }
        Ok(())
    }
}

/// The cluster a reconciliation pass operates on.
///
/// Passed explicitly into the enumerator and coordinator so independent
/// clusters never share state.
#[derive(Debug, Clone)]
pub struct ClusterContext {
    /// Cluster name, used for log context.
    pub name: String,

    pub namespace: String,

    /// Labels carried by every claim of this cluster.
    pub selector: LabelSelector,

    /// Number of replicas currently configured to run.
    pub replicas: i32,

    pub settings: ResizeSettings,
}

impl ClusterContext {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        selector: LabelSelector,
        replicas: i32,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            selector,
            replicas,
            settings: ResizeSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ResizeSettings) -> Self {
        self.settings = settings;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = ResizeSettings::default();
        assert_eq!(settings.data_volume_name, "pgdata");
        assert_eq!(settings.data_mount_path, "/home/postgres/pgdata");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_settings_deserialize() {
        let settings: ResizeSettings =
            serde_json::from_str(r#"{"data_volume_name": "data"}"#).unwrap();
        assert_eq!(settings.data_volume_name, "data");
        assert_eq!(settings.container_name, "postgres");
    }

    #[test]
    fn test_validate_rejects_relative_mount() {
        let settings = ResizeSettings {
            data_mount_path: "pgdata".to_string(),
            ..ResizeSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_from_env() {
        // Only test touching the PGVR_* variables.
        std::env::remove_var("PGVR_DATA_VOLUME_NAME");
        std::env::remove_var("PGVR_DATA_MOUNT_PATH");
        std::env::remove_var("PGVR_CONTAINER_NAME");
        assert_eq!(ResizeSettings::from_env().unwrap(), ResizeSettings::default());

        std::env::set_var("PGVR_DATA_VOLUME_NAME", "data");
        std::env::set_var("PGVR_DATA_MOUNT_PATH", "/var/lib/postgresql/data");
        std::env::set_var("PGVR_CONTAINER_NAME", "database");
        let settings = ResizeSettings::from_env().unwrap();
        assert_eq!(settings.data_volume_name, "data");
        assert_eq!(settings.data_mount_path, "/var/lib/postgresql/data");
        assert_eq!(settings.container_name, "database");

        std::env::set_var("PGVR_DATA_MOUNT_PATH", "pgdata");
        let err = ResizeSettings::from_env().unwrap_err();
        assert!(err.to_string().contains("must be absolute"));

        std::env::remove_var("PGVR_DATA_VOLUME_NAME");
        std::env::remove_var("PGVR_DATA_MOUNT_PATH");
        std::env::remove_var("PGVR_CONTAINER_NAME");
    }

    #[test]
    fn test_cluster_context() {
        let ctx = ClusterContext::new(
            "acid-main",
            "default",
            LabelSelector::new().with("cluster-name", "acid-main"),
            3,
        );
        assert_eq!(ctx.replicas, 3);
        assert_eq!(ctx.settings, ResizeSettings::default());
    }
}
