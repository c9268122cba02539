//! The container and its entry points.
//!
//! The [`Container`] is the runtime that the host application talks to:
//! programmatic lookups, scope lifecycle signals, and the per-call
//! instance resolution behind every client proxy. It owns the frozen
//! catalog, one context store per scope kind, and the per-descriptor proxy
//! and invocation-chain caches.

use std::sync::{Arc, Weak};

use hashbrown::HashMap;
use parking_lot::RwLock;
use tracing::{debug, trace};

use weft_context::activation::ActivationId;
use weft_context::session::CreationSession;
use weft_context::store::{ContextStore, EndError};
use weft_proxy::binding::ChainRegistry;
use weft_proxy::invoke::InvocationChain;
use weft_proxy::proxy::{ClientProxy, InstanceSource, ProxyError};
use weft_registry::catalog::Catalog;
use weft_registry::component::ComponentInstance;
use weft_registry::descriptor::{
    ComponentDescriptor, DescriptorId, ProducerError, WiringError,
};
use weft_registry::key::TypeKey;
use weft_registry::qualifier::QualifierSet;
use weft_registry::resolver::{ResolveError, Resolver};
use weft_registry::scope::ScopeKind;

use crate::wiring::{Handle, LookupError, OwnedInstance, WiringView};

/// Failures of the scope lifecycle entry points.
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    /// No context store was registered for the scope.
    #[error("no context store is registered for {scope} scope")]
    Unregistered {
        /// The scope named in the request.
        scope: ScopeKind,
    },

    /// Teardown failures while ending the scope.
    #[error(transparent)]
    Teardown(#[from] EndError),
}

/// The runtime container.
///
/// Built once via [`ContainerBuilder`](crate::builder::ContainerBuilder) and
/// shared behind an `Arc`. All entry points take `&self`; interior state is
/// limited to the per-descriptor proxy and chain caches, both race-tolerant.
pub struct Container {
    /// Self-reference handed to proxies as their instance source.
    self_ref: Weak<Container>,
    resolver: Resolver,
    stores: HashMap<ScopeKind, Arc<dyn ContextStore>>,
    bindings: ChainRegistry,
    proxies: RwLock<HashMap<DescriptorId, Arc<ClientProxy>>>,
    chains: RwLock<HashMap<DescriptorId, Arc<InvocationChain>>>,
}

impl Container {
    pub(crate) fn new_shared(
        resolver: Resolver,
        stores: HashMap<ScopeKind, Arc<dyn ContextStore>>,
        bindings: ChainRegistry,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            resolver,
            stores,
            bindings,
            proxies: RwLock::new(HashMap::new()),
            chains: RwLock::new(HashMap::new()),
        })
    }

    /// Returns an owning handle to this container.
    fn shared(&self) -> Arc<Container> {
        self.self_ref
            .upgrade()
            .expect("container is alive while its methods run")
    }

    /// Returns the frozen catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        self.resolver.catalog()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Resolution and lookup
    // ─────────────────────────────────────────────────────────────────────

    /// Resolves the single descriptor for a request.
    ///
    /// Pure over the catalog; see
    /// [`Resolver::resolve`](weft_registry::resolver::Resolver::resolve).
    ///
    /// # Errors
    ///
    /// Unsatisfied and ambiguous resolutions are surfaced, never defaulted.
    pub fn resolve(
        &self,
        ty: TypeKey,
        qualifiers: &QualifierSet,
    ) -> Result<Arc<ComponentDescriptor>, ResolveError> {
        self.resolver.resolve(ty, qualifiers)
    }

    /// Programmatic lookup by contract type.
    ///
    /// Cacheable scopes yield a [`Handle::Proxied`] client proxy; the
    /// dependent scope yields a [`Handle::Owned`] instance whose dependents
    /// are released when the handle is.
    ///
    /// # Errors
    ///
    /// Propagates resolution, context, and construction failures.
    pub fn lookup<T: ?Sized + 'static>(
        &self,
        qualifiers: &QualifierSet,
    ) -> Result<Handle, LookupError> {
        self.lookup_key(TypeKey::of::<T>(), qualifiers)
    }

    /// Programmatic lookup by explicit type key.
    ///
    /// # Errors
    ///
    /// Propagates resolution, context, and construction failures.
    pub fn lookup_key(
        &self,
        ty: TypeKey,
        qualifiers: &QualifierSet,
    ) -> Result<Handle, LookupError> {
        let descriptor = self
            .resolve(ty, qualifiers)
            .map_err(WiringError::from)
            .map_err(LookupError::from)?;

        if descriptor.scope().is_cacheable() {
            let proxy = self.proxy_for(&descriptor)?;
            return Ok(Handle::Proxied(proxy));
        }

        // A bare dependent-scoped lookup: the fresh instance owns a one-off
        // session, released through the handle (explicitly or on drop).
        let mut session = CreationSession::new(descriptor.id().clone());
        let instance = self
            .instantiate(&descriptor, &mut session)
            .map_err(LookupError::from)?;
        Ok(Handle::Owned(OwnedInstance::new(
            descriptor, instance, session,
        )))
    }

    /// Returns the cached client proxy for a cacheable descriptor.
    ///
    /// One proxy exists per descriptor; proxies are immutable and freely
    /// shared.
    ///
    /// # Errors
    ///
    /// Fails with [`ProxyError::DependentScope`] for non-cacheable scopes.
    pub fn proxy_for(
        &self,
        descriptor: &Arc<ComponentDescriptor>,
    ) -> Result<Arc<ClientProxy>, ProxyError> {
        if let Some(proxy) = self.proxies.read().get(descriptor.id()) {
            return Ok(Arc::clone(proxy));
        }

        let source: Arc<dyn InstanceSource> = self.shared();
        let proxy = Arc::new(ClientProxy::new(Arc::clone(descriptor), source)?);

        let mut proxies = self.proxies.write();
        Ok(Arc::clone(
            proxies.entry(descriptor.id().clone()).or_insert(proxy),
        ))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Scope lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Activates the given scope.
    ///
    /// Starting an already-active scope keeps its instances; see
    /// [`ContextStore::start`].
    ///
    /// # Errors
    ///
    /// Fails when no store is registered for the scope.
    pub fn start_scope(&self, scope: ScopeKind) -> Result<ActivationId, ScopeError> {
        let store = self
            .store_for(scope)
            .ok_or(ScopeError::Unregistered { scope })?;
        Ok(store.start())
    }

    /// Deactivates the given scope, destroying every instance it holds.
    ///
    /// # Errors
    ///
    /// Fails when no store is registered, or with the aggregated teardown
    /// failures; sibling teardown is never interrupted.
    pub fn end_scope(&self, scope: ScopeKind) -> Result<(), ScopeError> {
        let store = self
            .store_for(scope)
            .ok_or(ScopeError::Unregistered { scope })?;
        store.end().map_err(ScopeError::from)
    }

    /// Returns `true` if the scope's activation visible to this thread is
    /// ACTIVE.
    #[must_use]
    pub fn scope_active(&self, scope: ScopeKind) -> bool {
        self.store_for(scope).is_some_and(|store| store.is_active())
    }

    fn store_for(&self, scope: ScopeKind) -> Option<&Arc<dyn ContextStore>> {
        self.stores.get(&scope)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Instantiation
    // ─────────────────────────────────────────────────────────────────────

    /// Builds one instance of a descriptor, threading the creation session
    /// through the producer for dependent tracking and cycle detection.
    pub(crate) fn instantiate(
        &self,
        descriptor: &Arc<ComponentDescriptor>,
        session: &mut CreationSession,
    ) -> Result<ComponentInstance, WiringError> {
        session.enter(descriptor.id())?;
        let produced = {
            let view = WiringView::new(self, &mut *session);
            descriptor.create(&view)
        };
        session.exit();

        match produced {
            Ok(instance) => {
                trace!(component = %descriptor.id(), scope = %descriptor.scope(), "instance created");
                Ok(instance)
            }
            // A wiring failure of a transitive dependency keeps its own
            // taxonomy; a plain producer failure is wrapped with the
            // component it belongs to.
            Err(ProducerError::Wiring(inner)) => Err(inner),
            Err(failure @ ProducerError::Failed(_)) => Err(WiringError::Construction {
                component: descriptor.id().clone(),
                source: Box::new(failure),
            }),
        }
    }
}

impl InstanceSource for Container {
    fn current_instance(
        &self,
        descriptor: &Arc<ComponentDescriptor>,
    ) -> Result<ComponentInstance, WiringError> {
        let scope = descriptor.scope();
        let store = self
            .store_for(scope)
            .ok_or(WiringError::ContextNotActive { scope })?;

        store
            .get_or_create(descriptor, &mut || {
                debug!(component = %descriptor.id(), scope = %scope, "creating cacheable instance");
                let mut session = CreationSession::new(descriptor.id().clone());
                let instance = self.instantiate(descriptor, &mut session)?;
                Ok((instance, session))
            })
            .map_err(WiringError::from)
    }

    fn chain_for(&self, descriptor: &Arc<ComponentDescriptor>) -> Arc<InvocationChain> {
        if let Some(chain) = self.chains.read().get(descriptor.id()) {
            return Arc::clone(chain);
        }

        // Binding resolution happens once per descriptor; a racing miss
        // recomputes the same chain and the first insert wins.
        let resolved = Arc::new(self.bindings.chain_for(descriptor));
        let mut chains = self.chains.write();
        Arc::clone(
            chains
                .entry(descriptor.id().clone())
                .or_insert(resolved),
        )
    }
}

impl core::fmt::Debug for Container {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Container")
            .field("descriptors", &self.catalog().len())
            .field("scopes", &self.stores.keys().collect::<Vec<_>>())
            .field("cached_proxies", &self.proxies.read().len())
            .finish_non_exhaustive()
    }
}
