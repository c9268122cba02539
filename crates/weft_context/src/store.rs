//! The context-store contract shared by all scope stores.

use std::sync::Arc;

use weft_registry::component::ComponentInstance;
use weft_registry::descriptor::{ComponentDescriptor, DescriptorId, WiringError};
use weft_registry::scope::ScopeKind;

use crate::activation::ActivationId;
use crate::session::{CreationSession, TeardownFailure};

/// Builds a fresh instance together with the session owning its dependents.
///
/// Stores invoke this with no internal locks held (beyond per-descriptor
/// creation serialization), so the closure may recursively resolve further
/// components — including against the same store.
pub type Creator<'a> = &'a mut dyn FnMut() -> Result<(ComponentInstance, CreationSession), WiringError>;

/// Failures observable on the lookup path of a context store.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// The store's activation is not currently ACTIVE.
    #[error("context for {scope} scope is not active")]
    NotActive {
        /// The scope whose context was required.
        scope: ScopeKind,
    },

    /// The creator closure failed while building a fresh instance.
    #[error(transparent)]
    Creation(#[from] WiringError),
}

impl From<ContextError> for WiringError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::NotActive { scope } => WiringError::ContextNotActive { scope },
            ContextError::Creation(inner) => inner,
        }
    }
}

/// One or more teardowns failed while ending an activation.
///
/// Every stored instance is still destroyed before this is reported.
#[derive(Debug, thiserror::Error)]
#[error("{} teardown failure(s) while ending {scope} scope", .failures.len())]
pub struct EndError {
    /// The scope being ended.
    pub scope: ScopeKind,
    /// The collected failures.
    pub failures: Vec<TeardownFailure>,
}

/// Holds the live instances of one scope kind.
///
/// A store is either ACTIVE or INACTIVE per activation. Implementations
/// differ in where the activation lives: process-wide behind a lock
/// ([`SharedStore`](crate::shared::SharedStore)) or in thread-local storage
/// ([`ThreadLocalStore`](crate::thread::ThreadLocalStore)).
///
/// # Invariants
///
/// - lookups against an INACTIVE activation fail with
///   [`ContextError::NotActive`];
/// - an activation holds at most one instance per descriptor;
/// - `end` destroys every held instance exactly once, then discards the
///   instance map;
/// - `end` racing an in-flight creation never destroys the instance being
///   built — the creation observes the ended activation at commit time and
///   cleans up after itself.
pub trait ContextStore: Send + Sync {
    /// The scope kind this store serves.
    fn scope(&self) -> ScopeKind;

    /// Returns `true` if the activation visible to this call is ACTIVE.
    fn is_active(&self) -> bool;

    /// Transitions the activation to ACTIVE.
    ///
    /// Starting an already-active activation keeps the existing instances
    /// and logs a warning; the existing activation id is returned.
    fn start(&self) -> ActivationId;

    /// Transitions the activation to INACTIVE and destroys all instances.
    ///
    /// Ending an inactive activation is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`EndError`] aggregating teardown failures; destruction of
    /// the remaining instances is never interrupted.
    fn end(&self) -> Result<(), EndError>;

    /// Returns the stored instance for a descriptor, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Fails with [`ContextError::NotActive`] when the activation is down.
    fn get(&self, id: &DescriptorId) -> Result<Option<ComponentInstance>, ContextError>;

    /// Returns the stored instance, creating and storing it if absent.
    ///
    /// Creation is race-free for shared stores: when two threads race on
    /// the same descriptor, exactly one construction wins and both observe
    /// the same instance; the loser's instance and dependents are destroyed.
    ///
    /// # Errors
    ///
    /// Fails with [`ContextError::NotActive`] when the activation is down
    /// (including an activation ended mid-creation), or propagates the
    /// creator's failure.
    fn get_or_create(
        &self,
        descriptor: &Arc<ComponentDescriptor>,
        create: Creator<'_>,
    ) -> Result<ComponentInstance, ContextError>;
}
