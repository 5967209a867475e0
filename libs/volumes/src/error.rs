//! Error types for volume resize reconciliation.

use pgvr_quantity::QuantityError;
use thiserror::Error;

use crate::model::NamespacedName;
use crate::store::StoreError;

/// Errors from enumerating or resizing a cluster's volumes.
///
/// Every variant is fatal for the current reconciliation batch. Volumes
/// resized before the error stay resized and recorded.
#[derive(Debug, Error)]
pub enum VolumeError {
    /// The resource store rejected a list, get, update or delete.
    #[error("could not {intent}: {source}")]
    StoreAccess {
        intent: String,
        #[source]
        source: StoreError,
    },

    /// A claim or claim reference name does not follow the naming convention.
    #[error("malformed identifier {name:?}: {reason}")]
    MalformedIdentifier { name: String, reason: &'static str },

    /// A volume carries no claim back-reference, so its pod is unknown.
    #[error("persistent volume {volume:?} has no claim reference")]
    MissingClaimRef { volume: String },

    /// The manifest size could not be parsed.
    #[error("could not parse volume size {size:?}: {source}")]
    InvalidSizeSpec {
        size: String,
        #[source]
        source: QuantityError,
    },

    /// The manifest asks for less than a volume already has.
    #[error("cannot shrink persistent volume {volume:?} from {current_gb}GB to {target_gb}GB")]
    ShrinkNotSupported {
        volume: String,
        current_gb: u64,
        target_gb: u64,
    },

    /// Connecting to a provider, or resolving its volume id, failed.
    #[error("volume provider {provider}: {detail}: {source}")]
    ProviderConnection {
        provider: String,
        detail: String,
        #[source]
        source: anyhow::Error,
    },

    /// More than one provider claims the same volume.
    #[error("persistent volume {volume:?} is claimed by several providers: {}", .providers.join(", "))]
    AmbiguousProvider {
        volume: String,
        providers: Vec<String>,
    },

    /// The provider failed to grow the block device.
    #[error("could not resize {provider} volume {volume_id:?}: {source}")]
    BlockResize {
        provider: String,
        volume_id: String,
        #[source]
        source: anyhow::Error,
    },

    /// The block device grew but the filesystem on it did not.
    #[error("could not resize the filesystem on pod {pod}: {source}")]
    FilesystemResize {
        pod: NamespacedName,
        #[source]
        source: anyhow::Error,
    },

    /// Volumes need resizing but no provider manages them.
    #[error(
        "persistent volumes are not compatible with existing resizing providers: {}",
        .volumes.join(", ")
    )]
    NoCompatibleProvider { volumes: Vec<String> },
}

impl VolumeError {
    /// Stable reason code for status reporting.
    pub fn reason_code(&self) -> &'static str {
        match self {
            VolumeError::StoreAccess { .. } => "store_access_failed",
            VolumeError::MalformedIdentifier { .. } => "malformed_identifier",
            VolumeError::MissingClaimRef { .. } => "missing_claim_ref",
            VolumeError::InvalidSizeSpec { .. } => "invalid_size_spec",
            VolumeError::ShrinkNotSupported { .. } => "shrink_not_supported",
            VolumeError::ProviderConnection { .. } => "provider_connection_failed",
            VolumeError::AmbiguousProvider { .. } => "ambiguous_provider",
            VolumeError::BlockResize { .. } => "block_resize_failed",
            VolumeError::FilesystemResize { .. } => "filesystem_resize_failed",
            VolumeError::NoCompatibleProvider { .. } => "no_compatible_provider",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = VolumeError::ShrinkNotSupported {
            volume: "pv-1".to_string(),
            current_gb: 20,
            target_gb: 10,
        };
        assert_eq!(
            err.to_string(),
            "cannot shrink persistent volume \"pv-1\" from 20GB to 10GB"
        );
        assert_eq!(err.reason_code(), "shrink_not_supported");

        let err = VolumeError::NoCompatibleProvider {
            volumes: vec!["pv-1".to_string(), "pv-2".to_string()],
        };
        assert!(err.to_string().ends_with("pv-1, pv-2"));
    }

    #[test]
    fn test_source_is_preserved() {
        let err = VolumeError::BlockResize {
            provider: "ebs".to_string(),
            volume_id: "vol-1".to_string(),
            source: anyhow::anyhow!("RequestLimitExceeded"),
        };
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "RequestLimitExceeded");
    }
}
