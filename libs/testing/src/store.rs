//! In-memory resource store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use pgvr_volumes::{LabelSelector, NamespacedName, StoreError, Volume, VolumeClaim, VolumeStore};

#[derive(Default)]
struct State {
    claims: Vec<VolumeClaim>,
    volumes: BTreeMap<String, Volume>,
    updates: Vec<Volume>,
    deleted: Vec<NamespacedName>,
    list_failure: Option<String>,
    get_failures: BTreeSet<String>,
    update_failure: Option<String>,
    delete_failures: BTreeSet<String>,
}

/// Resource store backed by in-memory maps.
///
/// Records every volume update and claim deletion so tests can assert on
/// exactly what was written.
#[derive(Default)]
pub struct InMemoryVolumeStore {
    state: Mutex<State>,
}

impl InMemoryVolumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a claim and the volume bound to it.
    #[must_use]
    pub fn with_replica(self, claim: VolumeClaim, volume: Volume) -> Self {
        self.insert_claim(claim);
        self.insert_volume(volume);
        self
    }

    pub fn insert_claim(&self, claim: VolumeClaim) {
        self.state().claims.push(claim);
    }

    pub fn insert_volume(&self, volume: Volume) {
        self.state().volumes.insert(volume.name.clone(), volume);
    }

    /// Current record of a volume.
    pub fn volume(&self, name: &str) -> Option<Volume> {
        self.state().volumes.get(name).cloned()
    }

    /// Every volume record written through `update_volume`, in order.
    pub fn updates(&self) -> Vec<Volume> {
        self.state().updates.clone()
    }

    /// Claims removed through `delete_claim`, in order.
    pub fn deleted_claims(&self) -> Vec<NamespacedName> {
        self.state().deleted.clone()
    }

    pub fn claim_count(&self) -> usize {
        self.state().claims.len()
    }

    /// Make `list_claims` fail.
    pub fn fail_list(&self, message: &str) {
        self.state().list_failure = Some(message.to_string());
    }

    /// Make `get_volume` fail for `name`.
    pub fn fail_get(&self, name: &str) {
        self.state().get_failures.insert(name.to_string());
    }

    /// Make every `update_volume` fail.
    pub fn fail_updates(&self, message: &str) {
        self.state().update_failure = Some(message.to_string());
    }

    /// Let `update_volume` succeed again after [`Self::fail_updates`].
    pub fn allow_updates(&self) {
        self.state().update_failure = None;
    }

    /// Make `delete_claim` fail for the claim called `name`.
    pub fn fail_delete(&self, name: &str) {
        self.state().delete_failures.insert(name.to_string());
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl VolumeStore for InMemoryVolumeStore {
    async fn list_claims(
        &self,
        selector: &LabelSelector,
        namespace: &str,
    ) -> Result<Vec<VolumeClaim>, StoreError> {
        let state = self.state();
        if let Some(message) = &state.list_failure {
            return Err(StoreError::Unavailable(message.clone()));
        }

        Ok(state
            .claims
            .iter()
            .filter(|claim| claim.namespace == namespace && selector.matches(&claim.labels))
            .cloned()
            .collect())
    }

    async fn get_volume(&self, name: &str) -> Result<Volume, StoreError> {
        let state = self.state();
        if state.get_failures.contains(name) {
            return Err(StoreError::Unavailable(format!("get {name} failed")));
        }

        state
            .volumes
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("persistent volume {name}")))
    }

    async fn update_volume(&self, volume: &Volume) -> Result<Volume, StoreError> {
        let mut state = self.state();
        if let Some(message) = &state.update_failure {
            return Err(StoreError::Conflict(message.clone()));
        }
        if !state.volumes.contains_key(&volume.name) {
            return Err(StoreError::NotFound(format!(
                "persistent volume {}",
                volume.name
            )));
        }

        state.volumes.insert(volume.name.clone(), volume.clone());
        state.updates.push(volume.clone());
        Ok(volume.clone())
    }

    async fn delete_claim(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.delete_failures.contains(name) {
            return Err(StoreError::Unavailable(format!("delete {name} failed")));
        }

        let index = state
            .claims
            .iter()
            .position(|claim| claim.namespace == namespace && claim.name == name)
            .ok_or_else(|| StoreError::NotFound(format!("claim {namespace}/{name}")))?;
        state.claims.remove(index);
        state.deleted.push(NamespacedName::new(namespace, name));
        Ok(())
    }
}
