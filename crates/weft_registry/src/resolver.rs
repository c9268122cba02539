//! The type+qualifier resolution algorithm.
//!
//! [`Resolver::resolve`] picks exactly one descriptor for a requested
//! contract and qualifier set, or fails loudly:
//!
//! 1. filter the catalog to descriptors exposing a contract assignable to
//!    the request (a membership test over exposed type keys);
//! 2. keep descriptors whose qualifier set is a superset of the requested
//!    set, comparing binding attributes only;
//! 3. tie-break: enabled alternatives displace non-alternatives, then only
//!    the maximum-priority subset survives;
//! 4. zero candidates is *unsatisfied*, more than one survivor is
//!    *ambiguous* — neither is ever defaulted.
//!
//! Resolution is pure over the catalog and memoized per request. Because the
//! catalog is immutable after boot, the cache needs no invalidation: a miss
//! racing another thread recomputes the same answer and the last write wins.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::catalog::Catalog;
use crate::descriptor::{ComponentDescriptor, DescriptorId};
use crate::key::TypeKey;
use crate::qualifier::{Qualifier, QualifierSet};

/// Resolution failures. Always surfaced to the caller, never defaulted.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    /// No descriptor matches the request.
    #[error("no component satisfies type '{requested_type}' with qualifiers [{qualifiers}]")]
    Unsatisfied {
        /// The requested contract name.
        requested_type: &'static str,
        /// The requested qualifiers, rendered.
        qualifiers: String,
    },

    /// More than one descriptor survived tie-breaking.
    #[error("ambiguous resolution for type '{requested_type}': candidates [{}]", .candidates.join(", "))]
    Ambiguous {
        /// The requested contract name.
        requested_type: &'static str,
        /// Ids of the surviving candidates.
        candidates: Vec<String>,
    },
}

impl ResolveError {
    /// Creates an unsatisfied-resolution error for the given request.
    #[must_use]
    pub fn unsatisfied(ty: TypeKey, qualifiers: &QualifierSet) -> Self {
        Self::Unsatisfied {
            requested_type: ty.type_name(),
            qualifiers: qualifiers.to_string(),
        }
    }

    fn ambiguous<'a>(ty: TypeKey, survivors: impl Iterator<Item = &'a DescriptorId>) -> Self {
        let mut candidates: Vec<String> = survivors.map(|id| id.as_str().to_string()).collect();
        candidates.sort();
        Self::Ambiguous {
            requested_type: ty.type_name(),
            candidates,
        }
    }
}

/// Cache key for a memoized resolution.
#[derive(Clone, PartialEq, Eq, Hash)]
struct ResolutionKey {
    type_id: core::any::TypeId,
    qualifiers: QualifierSet,
}

/// Picks exactly one descriptor per (type, qualifiers) request.
///
/// Cheap to share behind an `Arc`; the memoization map is the only interior
/// state and its population is race-tolerant.
pub struct Resolver {
    catalog: Arc<Catalog>,
    cache: RwLock<HashMap<ResolutionKey, DescriptorId>>,
}

impl Resolver {
    /// Creates a resolver over a frozen catalog.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the underlying catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Resolves the single descriptor for a request.
    ///
    /// Deterministic: repeated calls with the same arguments return the same
    /// descriptor while the catalog is unchanged.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::Unsatisfied`] when nothing matches
    /// - [`ResolveError::Ambiguous`] when tie-breaking leaves several
    pub fn resolve(
        &self,
        ty: TypeKey,
        qualifiers: &QualifierSet,
    ) -> Result<Arc<ComponentDescriptor>, ResolveError> {
        // An empty request implicitly asks for the standard marker, so the
        // unqualified component wins over explicitly qualified ones.
        let requested = if qualifiers.is_empty() {
            QualifierSet::new().with(Qualifier::standard())
        } else {
            qualifiers.clone()
        };

        let key = ResolutionKey {
            type_id: ty.type_id(),
            qualifiers: requested.clone(),
        };

        if let Some(id) = self.cache.read().get(&key)
            && let Some(descriptor) = self.catalog.get(id)
        {
            return Ok(Arc::clone(descriptor));
        }

        let descriptor = self.compute(ty, &requested)?;
        self.cache.write().insert(key, descriptor.id().clone());
        Ok(descriptor)
    }

    /// Runs the full algorithm, bypassing the cache.
    fn compute(
        &self,
        ty: TypeKey,
        requested: &QualifierSet,
    ) -> Result<Arc<ComponentDescriptor>, ResolveError> {
        // Steps 1-2: type membership, qualifier superset, and enablement.
        // Disabled alternatives never participate.
        let candidates: Vec<&Arc<ComponentDescriptor>> = self
            .catalog
            .candidates_for(ty.type_id())
            .filter(|d| self.catalog.is_enabled(d))
            .filter(|d| d.qualifiers().is_superset_of(requested))
            .collect();

        if candidates.is_empty() {
            return Err(ResolveError::Unsatisfied {
                requested_type: ty.type_name(),
                qualifiers: requested.to_string(),
            });
        }

        // Step 3a: enabled alternatives displace non-alternatives.
        let survivors: Vec<&Arc<ComponentDescriptor>> =
            if candidates.iter().any(|d| d.is_alternative()) {
                candidates
                    .iter()
                    .filter(|d| d.is_alternative())
                    .copied()
                    .collect()
            } else {
                candidates
            };

        // Step 3b: keep only the maximum-priority subset.
        let max_priority = survivors
            .iter()
            .map(|d| d.priority())
            .max()
            .unwrap_or_default();
        let survivors: Vec<&Arc<ComponentDescriptor>> = survivors
            .into_iter()
            .filter(|d| d.priority() == max_priority)
            .collect();

        match survivors.as_slice() {
            [single] => Ok(Arc::clone(single)),
            many => Err(ResolveError::ambiguous(ty, many.iter().map(|d| d.id()))),
        }
    }
}

impl core::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Resolver")
            .field("cached_requests", &self.cache.read().len())
            .finish_non_exhaustive()
    }
}
