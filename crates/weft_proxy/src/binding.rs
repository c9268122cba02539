//! Binding registration and per-descriptor chain resolution.
//!
//! Interceptors register under a *binding tag*; a descriptor opts in by
//! declaring the tag. Decorators register against a *delegate contract*; a
//! descriptor opts in by exposing that contract. [`ChainRegistry::chain_for`]
//! resolves the resulting [`InvocationChain`] for one descriptor — callers
//! cache the result per descriptor, so binding resolution happens once, not
//! per call.

use std::borrow::Cow;
use std::sync::Arc;

use weft_registry::descriptor::ComponentDescriptor;
use weft_registry::key::TypeKey;

use crate::invoke::{Decorator, Interceptor, InvocationChain};

struct InterceptorRegistration {
    tag: Cow<'static, str>,
    priority: i32,
    interceptor: Arc<dyn Interceptor>,
}

struct DecoratorRegistration {
    delegate: TypeKey,
    decorator: Arc<dyn Decorator>,
}

/// The registered interceptors and decorators of one container.
///
/// Populated at boot, frozen afterwards.
#[derive(Default)]
pub struct ChainRegistry {
    interceptors: Vec<InterceptorRegistration>,
    decorators: Vec<DecoratorRegistration>,
}

impl ChainRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an interceptor under a binding tag.
    ///
    /// Ordering across interceptors of one descriptor is ascending priority
    /// (lower priority wraps outermost), then registration order.
    pub fn register_interceptor(
        &mut self,
        tag: impl Into<Cow<'static, str>>,
        priority: i32,
        interceptor: Arc<dyn Interceptor>,
    ) {
        self.interceptors.push(InterceptorRegistration {
            tag: tag.into(),
            priority,
            interceptor,
        });
    }

    /// Registers a decorator against a delegate contract.
    ///
    /// The decorator applies to every descriptor exposing the contract, in
    /// registration order.
    pub fn register_decorator(&mut self, delegate: TypeKey, decorator: Arc<dyn Decorator>) {
        self.decorators.push(DecoratorRegistration {
            delegate,
            decorator,
        });
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty() && self.decorators.is_empty()
    }

    /// Resolves the chain for one descriptor.
    ///
    /// Callers cache the result per descriptor; bindings are never
    /// re-resolved on the call path.
    #[must_use]
    pub fn chain_for(&self, descriptor: &ComponentDescriptor) -> InvocationChain {
        let mut matched: Vec<&InterceptorRegistration> = self
            .interceptors
            .iter()
            .filter(|reg| descriptor.has_binding(&reg.tag))
            .collect();
        // Stable sort keeps registration order within one priority.
        matched.sort_by_key(|reg| reg.priority);

        let interceptors = matched
            .into_iter()
            .map(|reg| Arc::clone(&reg.interceptor))
            .collect();

        let decorators = self
            .decorators
            .iter()
            .filter(|reg| descriptor.exposes(&reg.delegate))
            .map(|reg| Arc::clone(&reg.decorator))
            .collect();

        InvocationChain::new(interceptors, decorators)
    }
}

impl core::fmt::Debug for ChainRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChainRegistry")
            .field("interceptors", &self.interceptors.len())
            .field("decorators", &self.decorators.len())
            .finish()
    }
}
