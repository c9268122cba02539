//! Lookup handles and the recursive instantiation machinery.
//!
//! [`Handle`] is what a programmatic lookup returns: a shared client proxy
//! for cacheable scopes, or an [`OwnedInstance`] for the dependent scope.
//! The owned form carries the instance's one-off creation session;
//! releasing the handle tears the instance and its dependents down. `Drop`
//! is a logged best-effort backstop, so a forgotten handle cannot leak its
//! dependents — use [`OwnedInstance::release`] for error-aware teardown.
//!
//! [`WiringView`] is the [`Wiring`] implementation handed to producers. The
//! in-flight creation session is threaded through it explicitly — no
//! thread-local "current creation" state exists anywhere in the runtime.

use core::cell::RefCell;
use core::fmt;
use std::sync::Arc;

use tracing::error;

use weft_context::session::{CreationSession, ReleaseError, TeardownFailure};
use weft_proxy::proxy::{ClientProxy, ProxyError};
use weft_registry::component::{Component, ComponentInstance};
use weft_registry::descriptor::{
    ComponentDescriptor, ContextualRef, Dependency, ProducerError, Wiring, WiringError,
};
use weft_registry::key::TypeKey;
use weft_registry::qualifier::QualifierSet;

use crate::container::Container;

/// Failures of a programmatic lookup.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// Resolution, context, or construction failed.
    #[error(transparent)]
    Wiring(#[from] WiringError),

    /// Client proxy creation failed.
    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

/// The result of a programmatic lookup.
pub enum Handle {
    /// A shared client proxy for a cacheable-scoped component.
    Proxied(Arc<ClientProxy>),
    /// A fresh dependent-scoped instance, owned by this handle.
    Owned(OwnedInstance),
}

impl Handle {
    /// Resolves the instance backing this handle right now.
    ///
    /// # Errors
    ///
    /// A proxied handle fails when its scope's context is not active.
    pub fn current(&self) -> Result<ComponentInstance, WiringError> {
        match self {
            Self::Proxied(proxy) => proxy.current(),
            Self::Owned(owned) => Ok(owned.instance().clone()),
        }
    }

    /// Runs `f` against the typed backing instance.
    ///
    /// # Errors
    ///
    /// Fails when the backing instance cannot be resolved or does not
    /// expose `T`.
    pub fn with<T: Component, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, WiringError> {
        let instance = self.current()?;
        let actual = instance.type_name();
        instance.with(f).ok_or(WiringError::ContractMismatch {
            expected: core::any::type_name::<T>(),
            actual,
        })
    }

    /// Returns the proxy of a cacheable-scoped lookup.
    #[must_use]
    pub fn proxy(&self) -> Option<&Arc<ClientProxy>> {
        match self {
            Self::Proxied(proxy) => Some(proxy),
            Self::Owned(_) => None,
        }
    }

    /// Returns the owned instance of a dependent-scoped lookup.
    #[must_use]
    pub fn owned(&self) -> Option<&OwnedInstance> {
        match self {
            Self::Proxied(_) => None,
            Self::Owned(owned) => Some(owned),
        }
    }

    /// Releases an owned handle, tearing down the instance and its
    /// dependents. A proxied handle has nothing to release.
    ///
    /// # Errors
    ///
    /// Returns the aggregated teardown failures; every dependent is still
    /// released.
    pub fn release(self) -> Result<(), ReleaseError> {
        match self {
            Self::Proxied(_) => Ok(()),
            Self::Owned(owned) => owned.release(),
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proxied(proxy) => f.debug_tuple("Proxied").field(proxy).finish(),
            Self::Owned(owned) => f.debug_tuple("Owned").field(owned).finish(),
        }
    }
}

/// A dependent-scoped instance together with its one-off creation session.
///
/// The session records every dependent-scoped instance created while this
/// one was built. [`release`](Self::release) runs the instance's disposer
/// and then the dependents' in reverse creation order; dropping the handle
/// does the same best-effort, logging failures instead of returning them.
pub struct OwnedInstance {
    descriptor: Arc<ComponentDescriptor>,
    instance: ComponentInstance,
    session: Option<CreationSession>,
}

impl OwnedInstance {
    pub(crate) fn new(
        descriptor: Arc<ComponentDescriptor>,
        instance: ComponentInstance,
        session: CreationSession,
    ) -> Self {
        Self {
            descriptor,
            instance,
            session: Some(session),
        }
    }

    /// Returns the descriptor of the owned instance.
    #[must_use]
    pub fn descriptor(&self) -> &Arc<ComponentDescriptor> {
        &self.descriptor
    }

    /// Returns the owned instance.
    #[must_use]
    pub fn instance(&self) -> &ComponentInstance {
        &self.instance
    }

    /// Recovers a typed shared handle to the instance.
    #[must_use]
    pub fn downcast_arc<T: Component>(&self) -> Option<Arc<T>> {
        self.instance.downcast_arc::<T>()
    }

    /// Runs `f` against the typed instance.
    pub fn with<T: Component, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.instance.with(f)
    }

    /// Tears down the instance and its dependents.
    ///
    /// The disposer runs first, then every tracked dependent in reverse
    /// creation order; failures are aggregated, and teardown of the
    /// remaining entries always continues.
    ///
    /// # Errors
    ///
    /// Returns the aggregated teardown failures.
    pub fn release(mut self) -> Result<(), ReleaseError> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<(), ReleaseError> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        let mut failures = Vec::new();
        if let Err(err) = self.descriptor.dispose(&self.instance) {
            failures.push(TeardownFailure {
                component: self.descriptor.id().clone(),
                error: err,
            });
        }
        if let Err(release) = session.release_all() {
            failures.extend(release.failures);
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ReleaseError {
                root: self.descriptor.id().clone(),
                failures,
            })
        }
    }
}

impl Drop for OwnedInstance {
    fn drop(&mut self) {
        if let Err(err) = self.release_inner() {
            error!(component = %err.root, "teardown failures while dropping owned instance: {err}");
        }
    }
}

impl fmt::Debug for OwnedInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedInstance")
            .field("component", &self.descriptor.id())
            .field("released", &self.session.is_none())
            .finish()
    }
}

/// The [`Wiring`] implementation handed to producers.
///
/// Carries the container plus the in-flight creation session of the root
/// instantiation. Dependent-scoped dependencies are constructed inline and
/// recorded in that session; cacheable dependencies are handed out as
/// deferred proxies without touching their scope's context.
pub(crate) struct WiringView<'a> {
    container: &'a Container,
    session: RefCell<&'a mut CreationSession>,
}

impl<'a> WiringView<'a> {
    pub(crate) fn new(container: &'a Container, session: &'a mut CreationSession) -> Self {
        Self {
            container,
            session: RefCell::new(session),
        }
    }
}

impl Wiring for WiringView<'_> {
    fn dependency(
        &self,
        ty: TypeKey,
        qualifiers: &QualifierSet,
    ) -> Result<Dependency, WiringError> {
        let descriptor = self.container.resolve(ty, qualifiers)?;

        if descriptor.scope().is_cacheable() {
            // Hand back the proxy without instantiating: construction is
            // deferred to first use, which is also what lets cacheable
            // components reference each other cyclically.
            let proxy = self
                .container
                .proxy_for(&descriptor)
                .map_err(|err| match err {
                    ProxyError::Wiring(inner) => inner,
                    other => WiringError::Construction {
                        component: descriptor.id().clone(),
                        source: Box::new(ProducerError::failed(other.to_string())),
                    },
                })?;
            let reference: Arc<dyn ContextualRef> = proxy;
            return Ok(Dependency::Deferred(reference));
        }

        // Dependent scope: construct inline under the same session so the
        // root's release cascades here, and so cycles are detected.
        let mut guard = self.session.borrow_mut();
        let session: &mut CreationSession = &mut **guard;
        let instance = self.container.instantiate(&descriptor, session)?;
        session.record(Arc::clone(&descriptor), instance.clone());
        Ok(Dependency::Direct(instance))
    }
}
