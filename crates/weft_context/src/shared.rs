//! The process-wide store for shared scopes.

use std::sync::Arc;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, warn};

use weft_registry::component::ComponentInstance;
use weft_registry::descriptor::{ComponentDescriptor, DescriptorId};
use weft_registry::scope::ScopeKind;

use crate::activation::{ActivationId, ActivationState, StoredInstance};
use crate::store::{ContextError, ContextStore, Creator, EndError};

/// A context store with one process-wide activation.
///
/// Used for application-like scopes: every thread sees the same activation
/// and the same instances. Creation of a given descriptor is serialized per
/// descriptor so unrelated components never block each other, and the
/// activation state transition is guarded by a single `RwLock` so `end`
/// and creation commits are mutually exclusive.
pub struct SharedStore {
    scope: ScopeKind,
    state: RwLock<Option<ActivationState>>,
    creation_locks: Mutex<HashMap<DescriptorId, Arc<Mutex<()>>>>,
}

impl SharedStore {
    /// Creates an inactive store for the given scope kind.
    #[must_use]
    pub fn new(scope: ScopeKind) -> Self {
        Self {
            scope,
            state: RwLock::new(None),
            creation_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the per-descriptor creation lock, allocating it on first use.
    fn creation_lock(&self, id: &DescriptorId) -> Arc<Mutex<()>> {
        let mut locks = self.creation_locks.lock();
        Arc::clone(locks.entry(id.clone()).or_default())
    }
}

impl ContextStore for SharedStore {
    fn scope(&self) -> ScopeKind {
        self.scope
    }

    fn is_active(&self) -> bool {
        self.state.read().is_some()
    }

    fn start(&self) -> ActivationId {
        let mut state = self.state.write();
        match &*state {
            Some(active) => {
                warn!(scope = %self.scope, activation = %active.id, "scope already active, keeping existing instances");
                active.id.clone()
            }
            None => {
                let fresh = ActivationState::new();
                let id = fresh.id.clone();
                debug!(scope = %self.scope, activation = %id, "scope started");
                *state = Some(fresh);
                id
            }
        }
    }

    fn end(&self) -> Result<(), EndError> {
        let Some(active) = self.state.write().take() else {
            debug!(scope = %self.scope, "end on inactive scope, nothing to do");
            return Ok(());
        };

        debug!(scope = %self.scope, activation = %active.id, "scope ending");

        // Destruction runs with the state lock released: disposers may
        // re-enter the container.
        let failures = active.destroy_all();
        if failures.is_empty() {
            return Ok(());
        }
        for failure in &failures {
            error!(scope = %self.scope, component = %failure.component, "teardown failed: {}", failure.error);
        }
        Err(EndError {
            scope: self.scope,
            failures,
        })
    }

    fn get(&self, id: &DescriptorId) -> Result<Option<ComponentInstance>, ContextError> {
        match &*self.state.read() {
            None => Err(ContextError::NotActive { scope: self.scope }),
            Some(active) => Ok(active.get(id)),
        }
    }

    fn get_or_create(
        &self,
        descriptor: &Arc<ComponentDescriptor>,
        create: Creator<'_>,
    ) -> Result<ComponentInstance, ContextError> {
        // Fast path: already stored.
        if let Some(instance) = self.get(descriptor.id())? {
            return Ok(instance);
        }

        // Serialize construction per descriptor, then re-check: the race
        // loser finds the winner's instance here and never constructs.
        let creation_lock = self.creation_lock(descriptor.id());
        let _creating = creation_lock.lock();

        if let Some(instance) = self.get(descriptor.id())? {
            return Ok(instance);
        }

        // Construct with no state lock held; the creator may recursively
        // resolve other components against this same store.
        let (instance, session) = create()?;
        let fresh = StoredInstance {
            descriptor: Arc::clone(descriptor),
            instance: instance.clone(),
            session,
        };

        // Commit under the state lock. The activation may have ended while
        // we were constructing: in that case the fresh instance is ours to
        // destroy, and the caller sees the inactive context. Insert-if-absent
        // keeps a prior committer's instance and discards ours.
        enum Commit {
            Stored,
            Ended(StoredInstance),
            Lost(ComponentInstance, StoredInstance),
        }

        let commit = {
            let mut state = self.state.write();
            match state.as_mut() {
                None => Commit::Ended(fresh),
                Some(active) => match active.instances.entry(descriptor.id().clone()) {
                    Entry::Occupied(existing) => {
                        Commit::Lost(existing.get().instance.clone(), fresh)
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(fresh);
                        Commit::Stored
                    }
                },
            }
        };

        match commit {
            Commit::Stored => Ok(instance),
            Commit::Ended(orphan) => {
                let mut failures = Vec::new();
                orphan.destroy(&mut failures);
                for failure in &failures {
                    error!(scope = %self.scope, component = %failure.component, "teardown of orphaned instance failed: {}", failure.error);
                }
                Err(ContextError::NotActive { scope: self.scope })
            }
            Commit::Lost(winner, loser) => {
                let mut failures = Vec::new();
                loser.destroy(&mut failures);
                for failure in &failures {
                    error!(scope = %self.scope, component = %failure.component, "teardown of race-losing instance failed: {}", failure.error);
                }
                Ok(winner)
            }
        }
    }
}

impl core::fmt::Debug for SharedStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedStore")
            .field("scope", &self.scope)
            .field("active", &self.is_active())
            .finish()
    }
}
