//! The client proxy.
//!
//! A [`ClientProxy`] is the stable stand-in injected for a cacheable-scoped
//! component. It pairs the descriptor with an [`InstanceSource`] and holds
//! no instance state: every access asks the source for the *current* backing
//! instance, so the same injected reference keeps working across any number
//! of end/start cycles of the target scope.
//!
//! # Identity semantics
//!
//! Equality, hashing, and display are **descriptor-keyed**, never forwarded
//! to the backing instance: two proxies for the same descriptor compare
//! equal even though they may forward to different backing instances over
//! time, and comparing a proxy never touches (or creates) the backing
//! instance. Value-semantic forwarding would make equality depend on which
//! activation happens to be live.

use core::fmt;
use core::hash::{Hash, Hasher};
use std::sync::Arc;

use weft_registry::component::{Component, ComponentInstance};
use weft_registry::descriptor::{
    ComponentDescriptor, ContextualRef, DescriptorId, WiringError,
};

use crate::invoke::{InvocationChain, InvocationError};

/// Where a proxy finds the current backing instance and its chain.
///
/// Implemented by the container: `current_instance` is a `get_or_create`
/// against the active context of the descriptor's scope, and `chain_for`
/// returns the descriptor's cached invocation chain.
pub trait InstanceSource: Send + Sync {
    /// Resolves the current backing instance, creating it if absent.
    fn current_instance(
        &self,
        descriptor: &Arc<ComponentDescriptor>,
    ) -> Result<ComponentInstance, WiringError>;

    /// Returns the resolved invocation chain for the descriptor.
    fn chain_for(&self, descriptor: &Arc<ComponentDescriptor>) -> Arc<InvocationChain>;
}

/// Failures observable through a client proxy.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Proxies are never created for non-cacheable scopes.
    #[error(
        "client proxies are not created for the dependent scope (component '{component}')"
    )]
    DependentScope {
        /// The offending component.
        component: DescriptorId,
    },

    /// Resolving the backing instance failed.
    #[error(transparent)]
    Wiring(#[from] WiringError),

    /// The chain machinery failed.
    #[error(transparent)]
    Invocation(#[from] InvocationError),

    /// The backing instance does not expose the requested contract.
    #[error("component '{component}' does not expose contract '{contract}'")]
    ContractMismatch {
        /// The component behind the proxy.
        component: DescriptorId,
        /// The contract the caller asked for.
        contract: &'static str,
    },

    /// An invocation returned something other than the expected result type
    /// (an interceptor short-circuited with a foreign value).
    #[error("invocation of '{method}' returned an unexpected result type, expected '{expected}'")]
    ResultMismatch {
        /// The invoked method.
        method: &'static str,
        /// The expected result type.
        expected: &'static str,
    },
}

/// A stable stand-in forwarding every call to the current backing instance.
///
/// Immutable and freely shared across threads; the container caches one
/// proxy per descriptor.
pub struct ClientProxy {
    descriptor: Arc<ComponentDescriptor>,
    source: Arc<dyn InstanceSource>,
}

impl ClientProxy {
    /// Creates a proxy for a cacheable-scoped descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::DependentScope`] for non-cacheable scopes:
    /// those have no caching hand-off problem to solve and are injected as
    /// direct instances.
    pub fn new(
        descriptor: Arc<ComponentDescriptor>,
        source: Arc<dyn InstanceSource>,
    ) -> Result<Self, ProxyError> {
        if !descriptor.scope().is_cacheable() {
            return Err(ProxyError::DependentScope {
                component: descriptor.id().clone(),
            });
        }
        Ok(Self { descriptor, source })
    }

    /// Returns the descriptor this proxy targets.
    #[must_use]
    pub fn descriptor(&self) -> &Arc<ComponentDescriptor> {
        &self.descriptor
    }

    /// Resolves the current backing instance.
    ///
    /// Never cached beyond this single call.
    ///
    /// # Errors
    ///
    /// Fails with [`WiringError::ContextNotActive`] when the target scope's
    /// context is down.
    pub fn current(&self) -> Result<ComponentInstance, WiringError> {
        self.source.current_instance(&self.descriptor)
    }

    /// Forwards one call directly to the current backing instance.
    ///
    /// # Errors
    ///
    /// Fails when the backing instance cannot be resolved or does not
    /// expose `T`.
    pub fn with<T: Component, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, ProxyError> {
        let instance = self.current()?;
        instance.with(f).ok_or_else(|| ProxyError::ContractMismatch {
            component: self.descriptor.id().clone(),
            contract: core::any::type_name::<T>(),
        })
    }

    /// Forwards one call through the descriptor's invocation chain.
    ///
    /// The chain was resolved once for this descriptor; interceptors run in
    /// order, then decorators, then `f` on the current backing instance.
    /// The call's result (or error) propagates unchanged.
    ///
    /// # Errors
    ///
    /// Fails when the backing instance cannot be resolved, the chain
    /// machinery errors, or an interceptor short-circuits with a value of
    /// the wrong type.
    pub fn invoke<T, R>(
        &self,
        method: &'static str,
        f: impl FnOnce(&T) -> R,
    ) -> Result<R, ProxyError>
    where
        T: Component,
        R: Send + 'static,
    {
        let instance = self.current()?;
        let chain = self.source.chain_for(&self.descriptor);

        let component = self.descriptor.id().clone();
        let outcome = chain.invoke(
            method,
            &instance,
            Box::new(move |target: &ComponentInstance| match target.with(f) {
                Some(result) => Ok(Box::new(result) as Box<dyn core::any::Any + Send>),
                None => Err(InvocationError::new(
                    method,
                    format!(
                        "component '{}' does not expose contract '{}'",
                        component,
                        core::any::type_name::<T>()
                    ),
                )),
            }),
        )?;

        outcome
            .downcast::<R>()
            .map(|boxed| *boxed)
            .map_err(|_| ProxyError::ResultMismatch {
                method,
                expected: core::any::type_name::<R>(),
            })
    }
}

impl ContextualRef for ClientProxy {
    fn descriptor(&self) -> &Arc<ComponentDescriptor> {
        &self.descriptor
    }

    fn current(&self) -> Result<ComponentInstance, WiringError> {
        ClientProxy::current(self)
    }
}

// Identity is descriptor-keyed: proxies for the same descriptor are equal
// regardless of which backing instance either would resolve to right now.
impl PartialEq for ClientProxy {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor.id() == other.descriptor.id()
    }
}

impl Eq for ClientProxy {}

impl Hash for ClientProxy {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.descriptor.id().hash(state);
    }
}

impl fmt::Debug for ClientProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientProxy")
            .field("component", &self.descriptor.id())
            .field("scope", &self.descriptor.scope())
            .finish()
    }
}

impl fmt::Display for ClientProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "proxy for component '{}' ({} scope)",
            self.descriptor.id(),
            self.descriptor.scope()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoke::{Interceptor, InvocationContext, InvocationOutcome};
    use parking_lot::RwLock;
    use weft_registry::scope::ScopeKind;

    struct Greeter {
        greeting: &'static str,
    }

    impl Greeter {
        fn greet(&self) -> String {
            format!("{}!", self.greeting)
        }
    }

    /// A source with a swappable backing instance, standing in for a scope
    /// that gets ended and restarted.
    struct SwappableSource {
        instance: RwLock<Option<ComponentInstance>>,
        chain: Arc<InvocationChain>,
    }

    impl SwappableSource {
        fn new(chain: InvocationChain) -> Self {
            Self {
                instance: RwLock::new(None),
                chain: Arc::new(chain),
            }
        }

        fn swap(&self, instance: ComponentInstance) {
            *self.instance.write() = Some(instance);
        }

        fn clear(&self) {
            *self.instance.write() = None;
        }
    }

    impl InstanceSource for SwappableSource {
        fn current_instance(
            &self,
            _descriptor: &Arc<ComponentDescriptor>,
        ) -> Result<ComponentInstance, WiringError> {
            self.instance
                .read()
                .clone()
                .ok_or(WiringError::ContextNotActive {
                    scope: ScopeKind::Session,
                })
        }

        fn chain_for(&self, _descriptor: &Arc<ComponentDescriptor>) -> Arc<InvocationChain> {
            Arc::clone(&self.chain)
        }
    }

    fn session_descriptor(id: &str) -> Arc<ComponentDescriptor> {
        Arc::new(
            ComponentDescriptor::builder()
                .id(id)
                .scope(ScopeKind::Session)
                .produce(|_| {
                    Ok(Greeter {
                        greeting: "unused",
                    })
                })
                .build()
                .unwrap(),
        )
    }

    fn proxy_over(source: &Arc<SwappableSource>, id: &str) -> ClientProxy {
        ClientProxy::new(
            session_descriptor(id),
            Arc::clone(source) as Arc<dyn InstanceSource>,
        )
        .unwrap()
    }

    #[test]
    fn dependent_scope_is_rejected() {
        let source = Arc::new(SwappableSource::new(InvocationChain::empty()));
        let dependent = Arc::new(
            ComponentDescriptor::builder()
                .id("dep")
                .scope(ScopeKind::Dependent)
                .produce(|_| Ok(()))
                .build()
                .unwrap(),
        );

        let result = ClientProxy::new(dependent, source as Arc<dyn InstanceSource>);
        assert!(matches!(result, Err(ProxyError::DependentScope { .. })));
    }

    #[test]
    fn proxy_follows_the_current_backing_instance() {
        let source = Arc::new(SwappableSource::new(InvocationChain::empty()));
        let proxy = proxy_over(&source, "greeter");

        source.swap(ComponentInstance::new(Greeter { greeting: "hello" }));
        assert_eq!(proxy.with(Greeter::greet).unwrap(), "hello!");

        // The scope cycles: the old instance is gone, a new one appears.
        // The same proxy keeps working and sees the new instance.
        source.swap(ComponentInstance::new(Greeter { greeting: "goodbye" }));
        assert_eq!(proxy.with(Greeter::greet).unwrap(), "goodbye!");
    }

    #[test]
    fn inactive_context_surfaces_per_call() {
        let source = Arc::new(SwappableSource::new(InvocationChain::empty()));
        let proxy = proxy_over(&source, "greeter");

        source.clear();
        let err = proxy.with(Greeter::greet).unwrap_err();
        assert!(matches!(
            err,
            ProxyError::Wiring(WiringError::ContextNotActive { .. })
        ));

        // Comparing proxies while the context is down still works: identity
        // never touches the backing instance.
        let other = proxy_over(&source, "greeter");
        assert_eq!(proxy, other);
    }

    #[test]
    fn proxies_for_the_same_descriptor_are_equal() {
        use std::collections::hash_map::DefaultHasher;

        let source = Arc::new(SwappableSource::new(InvocationChain::empty()));
        let a = proxy_over(&source, "greeter");
        let b = proxy_over(&source, "greeter");
        let c = proxy_over(&source, "other");

        assert_eq!(a, b);
        assert_ne!(a, c);

        let hash = |p: &ClientProxy| {
            let mut hasher = DefaultHasher::new();
            p.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(hash(&a), hash(&b));
    }

    #[test]
    fn invoke_routes_through_the_chain() {
        struct Counting {
            calls: Arc<RwLock<u32>>,
        }

        impl Interceptor for Counting {
            fn around_invoke(&self, ctx: &mut InvocationContext<'_>) -> InvocationOutcome {
                *self.calls.write() += 1;
                ctx.proceed()
            }
        }

        let calls = Arc::new(RwLock::new(0));
        let chain = InvocationChain::new(
            vec![Arc::new(Counting {
                calls: Arc::clone(&calls),
            })],
            Vec::new(),
        );

        let source = Arc::new(SwappableSource::new(chain));
        let proxy = proxy_over(&source, "greeter");
        source.swap(ComponentInstance::new(Greeter { greeting: "hi" }));

        let result: String = proxy.invoke("greet", Greeter::greet).unwrap();
        assert_eq!(result, "hi!");
        assert_eq!(*calls.read(), 1);
    }

    #[test]
    fn contract_mismatch_is_reported() {
        let source = Arc::new(SwappableSource::new(InvocationChain::empty()));
        let proxy = proxy_over(&source, "greeter");
        source.swap(ComponentInstance::new(42_u64));

        let err = proxy.with(Greeter::greet).unwrap_err();
        assert!(matches!(err, ProxyError::ContractMismatch { .. }));
    }
}
