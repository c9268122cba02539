//! Creation sessions: dependent tracking and cycle detection.
//!
//! A [`CreationSession`] is owned by exactly one root instantiation — the
//! outermost creation of a component. Every dependent-scoped instance built
//! while satisfying the root's dependency graph is recorded here, so that
//! destroying the root cascades to its dependents in reverse creation order.
//!
//! The session also carries the in-progress descriptor stack. A
//! dependent-scoped chain that recurses into itself is reported as a
//! [`CycleError`] instead of overflowing the call stack; cacheable scopes
//! never hit this because their dependencies are handed out as deferred
//! proxies rather than constructed inline.
//!
//! Sessions never cross threads: they belong to the single creation that is
//! in flight.

use std::sync::Arc;

use weft_registry::component::ComponentInstance;
use weft_registry::descriptor::{
    ComponentDescriptor, DescriptorId, DisposeError, WiringError,
};

/// One failed teardown, kept for aggregate reporting.
#[derive(Debug, Clone)]
pub struct TeardownFailure {
    /// The component whose disposer failed.
    pub component: DescriptorId,
    /// The failure itself.
    pub error: DisposeError,
}

impl core::fmt::Display for TeardownFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.component, self.error)
    }
}

fn render_chain(chain: &[DescriptorId]) -> String {
    chain
        .iter()
        .map(DescriptorId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// A dependent-scoped chain recursed into itself.
#[derive(Debug, Clone, thiserror::Error)]
#[error("circular dependent-scoped chain: {}", render_chain(.chain))]
pub struct CycleError {
    /// The creation chain, root first, ending at the repeated component.
    pub chain: Vec<DescriptorId>,
}

impl From<CycleError> for WiringError {
    fn from(err: CycleError) -> Self {
        WiringError::CircularDependency { chain: err.chain }
    }
}

/// One or more dependent teardowns failed during release.
///
/// Every remaining dependent is still released before this is reported.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{} dependent teardown failure(s) for '{root}'", .failures.len())]
pub struct ReleaseError {
    /// The root component whose dependents were being released.
    pub root: DescriptorId,
    /// The collected failures, in release order.
    pub failures: Vec<TeardownFailure>,
}

/// Tracks every dependent-scoped instance created under one root.
///
/// Dropping a session without [`release_all`](Self::release_all) drops the
/// instances without running their disposers; owners of a session (context
/// stores, owned handles) are responsible for releasing it exactly once.
pub struct CreationSession {
    root: DescriptorId,
    dependents: Vec<(Arc<ComponentDescriptor>, ComponentInstance)>,
    in_progress: Vec<DescriptorId>,
    released: bool,
}

impl CreationSession {
    /// Creates a session for the given root instantiation.
    #[must_use]
    pub fn new(root: DescriptorId) -> Self {
        Self {
            root,
            dependents: Vec::new(),
            in_progress: Vec::new(),
            released: false,
        }
    }

    /// Returns the root descriptor id.
    #[must_use]
    pub fn root(&self) -> &DescriptorId {
        &self.root
    }

    /// Marks a descriptor as being created.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError`] if the descriptor is already in progress in
    /// this session — a dependent-scoped cycle.
    pub fn enter(&mut self, id: &DescriptorId) -> Result<(), CycleError> {
        if self.in_progress.contains(id) {
            let mut chain = self.in_progress.clone();
            chain.push(id.clone());
            return Err(CycleError { chain });
        }
        self.in_progress.push(id.clone());
        Ok(())
    }

    /// Unmarks the most recently entered descriptor.
    pub fn exit(&mut self) {
        self.in_progress.pop();
    }

    /// Records a dependent-scoped instance created under the root.
    pub fn record(&mut self, descriptor: Arc<ComponentDescriptor>, instance: ComponentInstance) {
        self.dependents.push((descriptor, instance));
    }

    /// Returns the number of tracked dependents.
    #[must_use]
    pub fn dependent_count(&self) -> usize {
        self.dependents.len()
    }

    /// Destroys every tracked dependent in reverse creation order.
    ///
    /// Each disposer runs exactly once; a failure is collected and the
    /// remaining dependents are still released. Releasing an already
    /// released session is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError`] aggregating every teardown failure.
    pub fn release_all(&mut self) -> Result<(), ReleaseError> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let mut failures = Vec::new();
        for (descriptor, instance) in self.dependents.drain(..).rev() {
            if let Err(error) = descriptor.dispose(&instance) {
                failures.push(TeardownFailure {
                    component: descriptor.id().clone(),
                    error,
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ReleaseError {
                root: self.root.clone(),
                failures,
            })
        }
    }
}

impl core::fmt::Debug for CreationSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CreationSession")
            .field("root", &self.root)
            .field("dependents", &self.dependents.len())
            .field("in_progress", &self.in_progress)
            .field("released", &self.released)
            .finish()
    }
}
