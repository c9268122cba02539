//! The container builder.
//!
//! Collects descriptors, enabled alternatives, scope stores, and
//! interceptor/decorator registrations, then boots the container. Default
//! stores are registered for the built-in scopes: request and session are
//! thread-affine, application is process-wide. Hosts with their own logical
//! units register a store per custom scope.

use std::sync::Arc;

use hashbrown::HashMap;

use weft_context::shared::SharedStore;
use weft_context::store::ContextStore;
use weft_context::thread::ThreadLocalStore;
use weft_proxy::binding::ChainRegistry;
use weft_proxy::invoke::{Decorator, Interceptor};
use weft_registry::catalog::{CatalogBuilder, CatalogError};
use weft_registry::descriptor::{ComponentDescriptor, DescriptorId};
use weft_registry::key::TypeKey;
use weft_registry::resolver::Resolver;
use weft_registry::scope::ScopeKind;

use crate::container::Container;

/// Errors raised while booting a container.
#[derive(Debug, thiserror::Error)]
pub enum BootError {
    /// Catalog validation failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A descriptor declares a cacheable scope with no registered store.
    #[error("component '{component}' declares {scope} scope but no context store is registered for it")]
    MissingScopeStore {
        /// The offending component.
        component: DescriptorId,
        /// Its declared scope.
        scope: ScopeKind,
    },
}

/// Builder for [`Container`].
///
/// # Example
///
/// ```
/// use weft_registry::descriptor::ComponentDescriptor;
/// use weft_registry::scope::ScopeKind;
/// use weft_runtime::builder::ContainerBuilder;
///
/// struct Cache;
///
/// let container = ContainerBuilder::new()
///     .register(
///         ComponentDescriptor::builder()
///             .id("cache")
///             .scope(ScopeKind::Application)
///             .produce(|_| Ok(Cache))
///             .build()
///             .unwrap(),
///     )
///     .build()
///     .unwrap();
///
/// assert_eq!(container.catalog().len(), 1);
/// ```
pub struct ContainerBuilder {
    catalog: CatalogBuilder,
    stores: HashMap<ScopeKind, Arc<dyn ContextStore>>,
    bindings: ChainRegistry,
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerBuilder {
    /// Creates a builder with the default stores for the built-in scopes.
    #[must_use]
    pub fn new() -> Self {
        let mut stores: HashMap<ScopeKind, Arc<dyn ContextStore>> = HashMap::new();
        stores.insert(
            ScopeKind::Request,
            Arc::new(ThreadLocalStore::new(ScopeKind::Request)),
        );
        stores.insert(
            ScopeKind::Session,
            Arc::new(ThreadLocalStore::new(ScopeKind::Session)),
        );
        stores.insert(
            ScopeKind::Application,
            Arc::new(SharedStore::new(ScopeKind::Application)),
        );

        Self {
            catalog: CatalogBuilder::new(),
            stores,
            bindings: ChainRegistry::new(),
        }
    }

    /// Registers a descriptor.
    #[must_use]
    pub fn register(mut self, descriptor: ComponentDescriptor) -> Self {
        self.catalog = self.catalog.register(descriptor);
        self
    }

    /// Enables an alternative by id.
    #[must_use]
    pub fn enable_alternative(mut self, id: impl AsRef<str>) -> Self {
        self.catalog = self.catalog.enable_alternative(id);
        self
    }

    /// Registers (or replaces) the context store serving a scope.
    ///
    /// The scope kind is taken from the store itself. Use this to install a
    /// store for a [`CustomScope`](weft_registry::scope::CustomScope), or to
    /// swap a built-in scope onto a different store flavor.
    #[must_use]
    pub fn register_scope(mut self, store: Arc<dyn ContextStore>) -> Self {
        self.stores.insert(store.scope(), store);
        self
    }

    /// Registers an interceptor under a binding tag.
    ///
    /// Applies to every descriptor declaring the tag; ascending priority
    /// wraps outermost.
    #[must_use]
    pub fn intercept(
        mut self,
        tag: impl Into<std::borrow::Cow<'static, str>>,
        priority: i32,
        interceptor: Arc<dyn Interceptor>,
    ) -> Self {
        self.bindings.register_interceptor(tag, priority, interceptor);
        self
    }

    /// Registers a decorator for every descriptor exposing the contract `T`.
    #[must_use]
    pub fn decorate<T: ?Sized + 'static>(self, decorator: Arc<dyn Decorator>) -> Self {
        self.decorate_key(TypeKey::of::<T>(), decorator)
    }

    /// Registers a decorator by explicit delegate key.
    #[must_use]
    pub fn decorate_key(mut self, delegate: TypeKey, decorator: Arc<dyn Decorator>) -> Self {
        self.bindings.register_decorator(delegate, decorator);
        self
    }

    /// Validates everything and boots the container.
    ///
    /// # Errors
    ///
    /// - catalog validation failures ([`CatalogError`])
    /// - [`BootError::MissingScopeStore`] when a descriptor's cacheable
    ///   scope has no registered store
    pub fn build(self) -> Result<Arc<Container>, BootError> {
        let catalog = self.catalog.build()?;

        // The dependent scope needs no store; every cacheable scope in use
        // must have one before the first lookup, not after.
        for descriptor in catalog.iter() {
            let scope = descriptor.scope();
            if scope.is_cacheable() && !self.stores.contains_key(&scope) {
                return Err(BootError::MissingScopeStore {
                    component: descriptor.id().clone(),
                    scope,
                });
            }
        }

        Ok(Container::new_shared(
            Resolver::new(Arc::new(catalog)),
            self.stores,
            self.bindings,
        ))
    }
}

impl core::fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("scopes", &self.stores.keys().collect::<Vec<_>>())
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_registry::scope::CustomScope;

    struct Job;

    #[test]
    fn custom_scope_without_store_fails_boot() {
        let batch = ScopeKind::Custom(CustomScope::new("batch", true));

        let result = ContainerBuilder::new()
            .register(
                ComponentDescriptor::builder()
                    .id("job")
                    .scope(batch)
                    .produce(|_| Ok(Job))
                    .build()
                    .unwrap(),
            )
            .build();

        assert!(matches!(result, Err(BootError::MissingScopeStore { .. })));
    }

    #[test]
    fn custom_scope_with_store_boots() {
        let batch = ScopeKind::Custom(CustomScope::new("batch", true));

        let container = ContainerBuilder::new()
            .register(
                ComponentDescriptor::builder()
                    .id("job")
                    .scope(batch)
                    .produce(|_| Ok(Job))
                    .build()
                    .unwrap(),
            )
            .register_scope(Arc::new(SharedStore::new(batch)))
            .build()
            .unwrap();

        assert!(!container.scope_active(batch));
        container.start_scope(batch).unwrap();
        assert!(container.scope_active(batch));
        container.end_scope(batch).unwrap();
    }

    #[test]
    fn dependent_descriptors_need_no_store() {
        let container = ContainerBuilder::new()
            .register(
                ComponentDescriptor::builder()
                    .id("job")
                    .scope(ScopeKind::Dependent)
                    .produce(|_| Ok(Job))
                    .build()
                    .unwrap(),
            )
            .build();

        assert!(container.is_ok());
    }
}
