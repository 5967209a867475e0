//! Naming conventions linking claims, replicas and pods.
//!
//! Replica claims are named `<base>-<ordinal>`, where the ordinal is the
//! last `-` separated token. A volume's claim reference is named
//! `<data volume name>-<pod name>`.

use crate::error::VolumeError;
use crate::model::{NamespacedName, Volume};

/// Parse the replica ordinal from a claim name.
///
/// Returns `Ok(None)` when the name has no ordinal: no `-` at all, a `-`
/// only in the first position, or a trailing `-`. Such claims are always
/// eligible. Fails with [`VolumeError::MalformedIdentifier`] when the last
/// token is present but not an unsigned integer.
pub fn parse_claim_ordinal(name: &str) -> Result<Option<u32>, VolumeError> {
    let Some(last_dash) = name.rfind('-') else {
        return Ok(None);
    };
    if last_dash == 0 || last_dash == name.len() - 1 {
        return Ok(None);
    }

    name[last_dash + 1..]
        .parse::<u32>()
        .map(Some)
        .map_err(|_| VolumeError::MalformedIdentifier {
            name: name.to_string(),
            reason: "last part of the claim name is not a replica ordinal",
        })
}

/// Returns true if `ordinal` belongs to one of the first `replicas` pods.
pub fn is_running_ordinal(ordinal: u32, replicas: i32) -> bool {
    i64::from(ordinal) < i64::from(replicas)
}

/// Derive the owning pod from a claim reference.
///
/// Strips `<data_volume_name>-` from the claim name; the pod lives in the
/// claim's namespace.
pub fn pod_name_from_claim_ref(
    claim_ref: &NamespacedName,
    data_volume_name: &str,
) -> Result<NamespacedName, VolumeError> {
    let pod = claim_ref
        .name
        .strip_prefix(data_volume_name)
        .and_then(|rest| rest.strip_prefix('-'))
        .filter(|pod| !pod.is_empty())
        .ok_or_else(|| VolumeError::MalformedIdentifier {
            name: claim_ref.name.clone(),
            reason: "claim name does not start with the data volume prefix",
        })?;

    Ok(NamespacedName::new(&claim_ref.namespace, pod))
}

/// Derive the owning pod of a volume through its claim reference.
pub fn pod_name_from_volume(
    volume: &Volume,
    data_volume_name: &str,
) -> Result<NamespacedName, VolumeError> {
    let claim_ref = volume
        .claim_ref
        .as_ref()
        .ok_or_else(|| VolumeError::MissingClaimRef {
            volume: volume.name.clone(),
        })?;
    pod_name_from_claim_ref(claim_ref, data_volume_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("db-cluster-2", Some(2))]
    #[case("pgdata-acid-main-0", Some(0))]
    #[case("legacy", None)]
    #[case("-7", None)]
    #[case("trailing-", None)]
    fn test_parse_claim_ordinal(#[case] name: &str, #[case] expected: Option<u32>) {
        assert_eq!(parse_claim_ordinal(name).unwrap(), expected);
    }

    #[rstest]
    #[case("pgdata-acid-main-x")]
    #[case("pgdata-acid-1a")]
    #[case("pgdata-acid-99999999999")]
    fn test_parse_claim_ordinal_malformed(#[case] name: &str) {
        let err = parse_claim_ordinal(name).unwrap_err();
        assert!(matches!(err, VolumeError::MalformedIdentifier { .. }));
    }

    #[rstest]
    #[case(2, 2, false)]
    #[case(2, 3, true)]
    #[case(0, 1, true)]
    #[case(0, 0, false)]
    #[case(0, -1, false)]
    fn test_is_running_ordinal(#[case] ordinal: u32, #[case] replicas: i32, #[case] running: bool) {
        assert_eq!(is_running_ordinal(ordinal, replicas), running);
    }

    #[test]
    fn test_pod_name_from_claim_ref() {
        let claim_ref = NamespacedName::new("default", "pgdata-mycluster-0");
        let pod = pod_name_from_claim_ref(&claim_ref, "pgdata").unwrap();
        assert_eq!(pod, NamespacedName::new("default", "mycluster-0"));
    }

    #[rstest]
    #[case("data-mycluster-0")]
    #[case("pgdatamycluster-0")]
    #[case("pgdata-")]
    #[case("pgdata")]
    fn test_pod_name_from_claim_ref_rejects(#[case] name: &str) {
        let claim_ref = NamespacedName::new("default", name);
        let err = pod_name_from_claim_ref(&claim_ref, "pgdata").unwrap_err();
        assert!(matches!(err, VolumeError::MalformedIdentifier { .. }));
    }

    #[test]
    fn test_pod_name_from_volume_without_claim_ref() {
        let volume = Volume {
            name: "pv-1".to_string(),
            capacity: pgvr_quantity::Quantity::from_gigabytes(1),
            claim_ref: None,
            annotations: Default::default(),
        };
        let err = pod_name_from_volume(&volume, "pgdata").unwrap_err();
        assert_eq!(err.reason_code(), "missing_claim_ref");
    }

    proptest! {
        #[test]
        fn prop_ordinal_roundtrip(base in "[a-z][a-z0-9-]{0,20}[a-z]", ordinal in any::<u32>()) {
            let name = format!("{base}-{ordinal}");
            prop_assert_eq!(parse_claim_ordinal(&name).unwrap(), Some(ordinal));
        }

        #[test]
        fn prop_pod_name_strips_prefix(pod in "[a-z][a-z0-9-]{0,30}") {
            let claim_ref = NamespacedName::new("ns", format!("pgdata-{pod}"));
            let derived = pod_name_from_claim_ref(&claim_ref, "pgdata").unwrap();
            prop_assert_eq!(derived.name, pod);
        }
    }
}
