//! One activation's instance map and teardown.
//!
//! An [`ActivationState`] is the live half of a scope activation: at most
//! one instance per descriptor, each paired with the creation session that
//! owns its dependents. Stores hold exactly one of these per activation and
//! discard it wholesale on `end`.

use hashbrown::HashMap;
use std::sync::Arc;

use weft_registry::component::ComponentInstance;
use weft_registry::descriptor::{ComponentDescriptor, DescriptorId};

use crate::session::{CreationSession, TeardownFailure};

/// Opaque identity of one scope activation, for diagnostics and logging.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActivationId(Arc<str>);

impl ActivationId {
    /// Creates a fresh activation id.
    #[must_use]
    pub fn new() -> Self {
        Self(nanoid::nanoid!().into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ActivationId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ActivationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One stored instance together with its dependent bookkeeping.
pub(crate) struct StoredInstance {
    pub(crate) descriptor: Arc<ComponentDescriptor>,
    pub(crate) instance: ComponentInstance,
    pub(crate) session: CreationSession,
}

impl StoredInstance {
    /// Destroys this instance: disposer first, then the dependents in
    /// reverse creation order. Failures are collected, never propagated
    /// mid-teardown.
    pub(crate) fn destroy(mut self, failures: &mut Vec<TeardownFailure>) {
        if let Err(error) = self.descriptor.dispose(&self.instance) {
            failures.push(TeardownFailure {
                component: self.descriptor.id().clone(),
                error,
            });
        }
        if let Err(release) = self.session.release_all() {
            failures.extend(release.failures);
        }
    }
}

/// The live state of one scope activation.
pub(crate) struct ActivationState {
    pub(crate) id: ActivationId,
    pub(crate) instances: HashMap<DescriptorId, StoredInstance>,
}

impl ActivationState {
    pub(crate) fn new() -> Self {
        Self {
            id: ActivationId::new(),
            instances: HashMap::new(),
        }
    }

    /// Returns the stored instance for a descriptor, if present.
    pub(crate) fn get(&self, id: &DescriptorId) -> Option<ComponentInstance> {
        self.instances.get(id).map(|stored| stored.instance.clone())
    }

    /// Destroys every stored instance, collecting all failures.
    ///
    /// Cross-descriptor order is unspecified; within one dependent tree the
    /// session guarantees reverse-of-creation.
    pub(crate) fn destroy_all(self) -> Vec<TeardownFailure> {
        let mut failures = Vec::new();
        for (_, stored) in self.instances {
            stored.destroy(&mut failures);
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn activation_ids_are_unique() {
        assert_ne!(ActivationId::new(), ActivationId::new());
    }

    #[test]
    fn destroy_runs_disposer_then_dependents() {
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

        let root_log = Arc::clone(&log);
        let root = Arc::new(
            ComponentDescriptor::builder()
                .id("root")
                .produce(|_| Ok(()))
                .dispose_instance(move |_| {
                    root_log.lock().unwrap().push("root");
                    Ok(())
                })
                .build()
                .unwrap(),
        );

        let dep_log = Arc::clone(&log);
        let dependent = Arc::new(
            ComponentDescriptor::builder()
                .id("dependent")
                .produce(|_| Ok(()))
                .dispose_instance(move |_| {
                    dep_log.lock().unwrap().push("dependent");
                    Ok(())
                })
                .build()
                .unwrap(),
        );

        let mut session = CreationSession::new(root.id().clone());
        session.record(dependent, ComponentInstance::new(()));

        let stored = StoredInstance {
            descriptor: root,
            instance: ComponentInstance::new(()),
            session,
        };

        let mut failures = Vec::new();
        stored.destroy(&mut failures);

        assert!(failures.is_empty());
        // The root's disposer runs before its dependents are released.
        assert_eq!(*log.lock().unwrap(), ["root", "dependent"]);
    }
}
