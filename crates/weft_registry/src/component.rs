//! Type-erased component instances.
//!
//! A [`ComponentInstance`] is the unit of value managed by the container:
//! a reference-counted, type-erased handle to whatever a descriptor's
//! producer built. Typed access is recovered by downcasting, mirroring the
//! way the request-side only knows the contract it asked for.

use core::fmt;
use std::sync::Arc;

use downcast_rs::{DowncastSync, impl_downcast};

/// A value that can be managed by the container.
///
/// Any type that is `Send + Sync + 'static` automatically implements
/// `Component`. The trait exists so instances can be stored type-erased and
/// recovered through downcasting at the injection site.
pub trait Component: DowncastSync {
    /// Returns the type name for diagnostics.
    fn type_name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

impl_downcast!(sync Component);

// Blanket implementation for all compatible types
impl<T: Send + Sync + 'static> Component for T {}

/// A shared, type-erased handle to one live component instance.
///
/// Cloning is cheap (reference counted) and never duplicates the underlying
/// component. Two handles refer to the same instance exactly when
/// [`ptr_eq`](Self::ptr_eq) returns `true`; the container's identity
/// guarantees are all phrased in terms of this reference equality.
#[derive(Clone)]
pub struct ComponentInstance {
    inner: Arc<dyn Component>,
}

impl ComponentInstance {
    /// Wraps a freshly constructed component.
    pub fn new<T: Component>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Wraps an already shared component.
    pub fn from_arc<T: Component>(value: Arc<T>) -> Self {
        Self { inner: value }
    }

    /// Returns `true` if the underlying component is of type `T`.
    #[must_use]
    pub fn is<T: Component>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Recovers a typed shared handle, or `None` on a type mismatch.
    #[must_use]
    pub fn downcast_arc<T: Component>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast_arc::<T>().ok()
    }

    /// Runs `f` against the typed component, or returns `None` on a type
    /// mismatch.
    pub fn with<T: Component, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.inner.downcast_ref::<T>().map(f)
    }

    /// Returns the concrete type name of the underlying component.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    /// Returns `true` if both handles refer to the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("type", &self.type_name())
            .finish()
    }
}
