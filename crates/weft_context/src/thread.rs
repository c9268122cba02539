//! The thread-affine store for request-like scopes.

use core::cell::RefCell;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use tracing::{debug, error, warn};

use weft_registry::component::ComponentInstance;
use weft_registry::descriptor::{ComponentDescriptor, DescriptorId};
use weft_registry::scope::ScopeKind;

use crate::activation::{ActivationId, ActivationState, StoredInstance};
use crate::store::{ContextError, ContextStore, Creator, EndError};

/// Source of unique per-store tokens keying the thread-local slots.
static NEXT_STORE_TOKEN: AtomicU64 = AtomicU64::new(0);

thread_local! {
    /// Activations of every thread-affine store on this thread, keyed by
    /// store token.
    static ACTIVATIONS: RefCell<HashMap<u64, ActivationState>> = RefCell::new(HashMap::new());
}

/// A context store whose activation lives in thread-local storage.
///
/// The activation's identity is the current thread: `start` on one thread is
/// invisible to every other thread. Request and session scopes serve the
/// thread driving that unit of work, so their instance maps need no locking
/// at all.
///
/// The store itself is freely shareable across threads; only the activations
/// are thread-local.
pub struct ThreadLocalStore {
    scope: ScopeKind,
    token: u64,
}

impl ThreadLocalStore {
    /// Creates a store for the given scope kind.
    #[must_use]
    pub fn new(scope: ScopeKind) -> Self {
        Self {
            scope,
            token: NEXT_STORE_TOKEN.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl ContextStore for ThreadLocalStore {
    fn scope(&self) -> ScopeKind {
        self.scope
    }

    fn is_active(&self) -> bool {
        ACTIVATIONS.with(|slots| slots.borrow().contains_key(&self.token))
    }

    fn start(&self) -> ActivationId {
        ACTIVATIONS.with(|slots| {
            let mut slots = slots.borrow_mut();
            match slots.entry(self.token) {
                Entry::Occupied(active) => {
                    warn!(scope = %self.scope, activation = %active.get().id, "scope already active on this thread, keeping existing instances");
                    active.get().id.clone()
                }
                Entry::Vacant(slot) => {
                    let fresh = ActivationState::new();
                    let id = fresh.id.clone();
                    debug!(scope = %self.scope, activation = %id, "scope started on this thread");
                    slot.insert(fresh);
                    id
                }
            }
        })
    }

    fn end(&self) -> Result<(), EndError> {
        let Some(active) = ACTIVATIONS.with(|slots| slots.borrow_mut().remove(&self.token)) else {
            debug!(scope = %self.scope, "end on inactive scope, nothing to do");
            return Ok(());
        };

        debug!(scope = %self.scope, activation = %active.id, "scope ending on this thread");

        // The slot is already vacated, so disposers that re-enter this store
        // observe an inactive scope instead of a half-destroyed one.
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
        ACTIVATIONS.with(|slots| match slots.borrow().get(&self.token) {
            None => Err(ContextError::NotActive { scope: self.scope }),
            Some(active) => Ok(active.get(id)),
        })
    }

    fn get_or_create(
        &self,
        descriptor: &Arc<ComponentDescriptor>,
        create: Creator<'_>,
    ) -> Result<ComponentInstance, ContextError> {
        if let Some(instance) = self.get(descriptor.id())? {
            return Ok(instance);
        }

        // Construct with the slot released: the creator may recursively
        // create sibling components in this same scope on this thread.
        let (instance, session) = create()?;
        let fresh = StoredInstance {
            descriptor: Arc::clone(descriptor),
            instance: instance.clone(),
            session,
        };

        // Commit with insert-if-absent semantics. The creator (or a
        // reentrant call) may have ended the scope while we were
        // constructing; the fresh instance is then ours to destroy.
        let (stored, orphan) = ACTIVATIONS.with(|slots| {
            let mut slots = slots.borrow_mut();
            match slots.get_mut(&self.token) {
                None => (None, Some(fresh)),
                Some(active) => match active.instances.entry(descriptor.id().clone()) {
                    Entry::Occupied(existing) => {
                        (Some(existing.get().instance.clone()), Some(fresh))
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(fresh);
                        (Some(instance), None)
                    }
                },
            }
        });

        if let Some(orphan) = orphan {
            let mut failures = Vec::new();
            orphan.destroy(&mut failures);
            for failure in &failures {
                error!(scope = %self.scope, component = %failure.component, "teardown of orphaned instance failed: {}", failure.error);
            }
        }

        stored.ok_or(ContextError::NotActive { scope: self.scope })
    }
}

impl core::fmt::Debug for ThreadLocalStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ThreadLocalStore")
            .field("scope", &self.scope)
            .field("active_on_this_thread", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CreationSession;

    struct Payload;

    fn descriptor(id: &str) -> Arc<ComponentDescriptor> {
        Arc::new(
            ComponentDescriptor::builder()
                .id(id)
                .scope(ScopeKind::Request)
                .produce(|_| Ok(Payload))
                .build()
                .unwrap(),
        )
    }

    fn fresh(descriptor: &Arc<ComponentDescriptor>) -> (ComponentInstance, CreationSession) {
        (
            ComponentInstance::new(Payload),
            CreationSession::new(descriptor.id().clone()),
        )
    }

    #[test]
    fn activation_is_per_thread() {
        let store = Arc::new(ThreadLocalStore::new(ScopeKind::Request));
        store.start();
        assert!(store.is_active());

        // Another thread does not see this thread's activation.
        let remote = Arc::clone(&store);
        std::thread::spawn(move || {
            assert!(!remote.is_active());
            assert!(matches!(
                remote.get(&DescriptorId::new("a")),
                Err(ContextError::NotActive { .. })
            ));
        })
        .join()
        .expect("thread panicked");

        store.end().unwrap();
    }

    #[test]
    fn same_instance_within_one_activation() {
        let store = ThreadLocalStore::new(ScopeKind::Request);
        let d = descriptor("a");
        store.start();

        let first = store.get_or_create(&d, &mut || Ok(fresh(&d))).unwrap();
        let second = store.get_or_create(&d, &mut || Ok(fresh(&d))).unwrap();
        assert!(first.ptr_eq(&second));

        store.end().unwrap();
    }

    #[test]
    fn separate_activations_yield_separate_instances() {
        let store = ThreadLocalStore::new(ScopeKind::Request);
        let d = descriptor("a");

        store.start();
        let first = store.get_or_create(&d, &mut || Ok(fresh(&d))).unwrap();
        store.end().unwrap();

        store.start();
        let second = store.get_or_create(&d, &mut || Ok(fresh(&d))).unwrap();
        store.end().unwrap();

        assert!(!first.ptr_eq(&second));
    }

    #[test]
    fn two_stores_on_one_thread_do_not_collide() {
        let request = ThreadLocalStore::new(ScopeKind::Request);
        let session = ThreadLocalStore::new(ScopeKind::Session);

        request.start();
        assert!(request.is_active());
        assert!(!session.is_active());

        request.end().unwrap();
    }

    #[test]
    fn recursive_creation_of_siblings_is_supported() {
        let store = ThreadLocalStore::new(ScopeKind::Request);
        let outer = descriptor("outer");
        let inner = descriptor("inner");
        store.start();

        // The outer creator resolves the inner component against the same
        // store, mid-creation.
        let outer_instance = store
            .get_or_create(&outer, &mut || {
                let inner_instance = store.get_or_create(&inner, &mut || Ok(fresh(&inner)))?;
                assert!(inner_instance.is::<Payload>());
                Ok(fresh(&outer))
            })
            .unwrap();

        assert!(outer_instance.is::<Payload>());
        assert!(store.get(inner.id()).unwrap().is_some());

        store.end().unwrap();
    }
}
