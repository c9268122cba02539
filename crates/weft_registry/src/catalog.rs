//! The immutable descriptor catalog.
//!
//! The catalog is the registry's boot product: every descriptor the
//! discovery layer produced, validated and indexed, then frozen. Nothing
//! mutates it afterwards, which is what lets the resolver memoize without an
//! invalidation path and lets every other layer read it lock-free.

use core::any::TypeId;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use indexmap::IndexMap;

use crate::descriptor::{ComponentDescriptor, DescriptorId};

/// Errors raised during catalog boot validation.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Two descriptors declared the same id.
    #[error("duplicate descriptor id '{id}'")]
    DuplicateDescriptor {
        /// The colliding id.
        id: DescriptorId,
    },

    /// An enabled alternative id does not exist in the catalog.
    #[error("cannot enable unknown alternative '{id}'")]
    UnknownAlternative {
        /// The missing id.
        id: DescriptorId,
    },

    /// An enabled id exists but is not flagged as an alternative.
    #[error("descriptor '{id}' is not flagged as an alternative")]
    NotAnAlternative {
        /// The offending id.
        id: DescriptorId,
    },
}

/// Builder collecting descriptors until [`build()`](Self::build) freezes them.
///
/// # Example
///
/// ```
/// use weft_registry::catalog::CatalogBuilder;
/// use weft_registry::descriptor::ComponentDescriptor;
///
/// struct Clock;
///
/// let catalog = CatalogBuilder::new()
///     .register(
///         ComponentDescriptor::builder()
///             .id("clock")
///             .produce(|_| Ok(Clock))
///             .build()
///             .unwrap(),
///     )
///     .build()
///     .unwrap();
///
/// assert_eq!(catalog.len(), 1);
/// ```
#[derive(Default)]
pub struct CatalogBuilder {
    descriptors: Vec<ComponentDescriptor>,
    enabled_alternatives: HashSet<DescriptorId>,
}

impl CatalogBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
            enabled_alternatives: HashSet::new(),
        }
    }

    /// Registers a descriptor.
    #[must_use]
    pub fn register(mut self, descriptor: ComponentDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Enables an alternative by id.
    ///
    /// Alternatives that are never enabled do not participate in resolution.
    #[must_use]
    pub fn enable_alternative(mut self, id: impl AsRef<str>) -> Self {
        self.enabled_alternatives.insert(DescriptorId::new(id));
        self
    }

    /// Validates and freezes the catalog.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::DuplicateDescriptor`] on id collisions
    /// - [`CatalogError::UnknownAlternative`] when an enabled id is absent
    /// - [`CatalogError::NotAnAlternative`] when an enabled id is not flagged
    pub fn build(self) -> Result<Catalog, CatalogError> {
        let mut descriptors: IndexMap<DescriptorId, Arc<ComponentDescriptor>> =
            IndexMap::with_capacity(self.descriptors.len());
        let mut by_type: HashMap<TypeId, Vec<DescriptorId>> = HashMap::new();

        for descriptor in self.descriptors {
            let id = descriptor.id().clone();
            if descriptors.contains_key(&id) {
                return Err(CatalogError::DuplicateDescriptor { id });
            }
            for key in descriptor.types() {
                by_type.entry(key.type_id()).or_default().push(id.clone());
            }
            descriptors.insert(id, Arc::new(descriptor));
        }

        for id in &self.enabled_alternatives {
            match descriptors.get(id) {
                None => return Err(CatalogError::UnknownAlternative { id: id.clone() }),
                Some(descriptor) if !descriptor.is_alternative() => {
                    return Err(CatalogError::NotAnAlternative { id: id.clone() });
                }
                Some(_) => {}
            }
        }

        Ok(Catalog {
            descriptors,
            by_type,
            enabled_alternatives: self.enabled_alternatives,
        })
    }
}

/// The immutable, indexed set of component descriptors.
///
/// Registration order is preserved for deterministic iteration and
/// diagnostics.
pub struct Catalog {
    descriptors: IndexMap<DescriptorId, Arc<ComponentDescriptor>>,
    by_type: HashMap<TypeId, Vec<DescriptorId>>,
    enabled_alternatives: HashSet<DescriptorId>,
}

impl Catalog {
    /// Returns the number of descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Looks up a descriptor by id.
    #[must_use]
    pub fn get(&self, id: &DescriptorId) -> Option<&Arc<ComponentDescriptor>> {
        self.descriptors.get(id)
    }

    /// Iterates descriptors exposing a contract with the given `TypeId`, in
    /// registration order.
    pub fn candidates_for(&self, type_id: TypeId) -> impl Iterator<Item = &Arc<ComponentDescriptor>> {
        self.by_type
            .get(&type_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.descriptors.get(id))
    }

    /// Returns `true` if the descriptor participates in resolution.
    ///
    /// Non-alternatives always do; alternatives only when enabled.
    #[must_use]
    pub fn is_enabled(&self, descriptor: &ComponentDescriptor) -> bool {
        !descriptor.is_alternative() || self.enabled_alternatives.contains(descriptor.id())
    }

    /// Iterates all descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ComponentDescriptor>> {
        self.descriptors.values()
    }
}

impl core::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Catalog")
            .field("descriptors", &self.descriptors.keys().collect::<Vec<_>>())
            .field("enabled_alternatives", &self.enabled_alternatives)
            .finish()
    }
}
