//! Component descriptors, qualifiers, and typesafe resolution for Weft (Layer 1).
//!
//! `weft_registry` provides the static half of the container: the data model
//! describing injectable components and the algorithm that picks exactly one
//! of them for a request.
//!
//! - [`component`] - Type-erased component instances
//! - [`key`] - Type identity for exposed and requested contracts
//! - [`qualifier`] - Qualifiers narrowing resolution
//! - [`scope`] - Lifecycle scope kinds
//! - [`descriptor`] - Immutable component descriptors and the wiring seam
//! - [`catalog`] - The immutable, boot-validated descriptor catalog
//! - [`resolver`] - The type+qualifier resolution algorithm
//!
//! # Architecture
//!
//! This crate is Layer 1 of the Weft architecture:
//!
//! - **Layer 1** (`weft_registry`, `weft_context`): descriptors, resolution,
//!   and scope stores
//! - **Layer 2** (`weft_proxy`): client proxies and the invocation chain
//! - **Layer 3** (`weft_runtime`): the container wiring everything together
//!
//! # Example
//!
//! ```
//! use weft_registry::catalog::CatalogBuilder;
//! use weft_registry::descriptor::ComponentDescriptor;
//! use weft_registry::qualifier::{Qualifier, QualifierSet};
//! use weft_registry::resolver::Resolver;
//! use weft_registry::key::TypeKey;
//! use weft_registry::scope::ScopeKind;
//! use std::sync::Arc;
//!
//! struct Greeter;
//!
//! let descriptor = ComponentDescriptor::builder()
//!     .id("greeter")
//!     .scope(ScopeKind::Application)
//!     .produce(|_| Ok(Greeter))
//!     .build()
//!     .unwrap();
//!
//! let catalog = CatalogBuilder::new().register(descriptor).build().unwrap();
//! let resolver = Resolver::new(Arc::new(catalog));
//!
//! let found = resolver
//!     .resolve(TypeKey::of::<Greeter>(), &QualifierSet::new())
//!     .unwrap();
//! assert_eq!(found.id().as_str(), "greeter");
//! ```

/// Type-erased component instances.
pub mod component;

/// Type identity for exposed and requested contracts.
pub mod key;

/// Qualifiers narrowing which component satisfies a request.
pub mod qualifier;

/// Lifecycle scope kinds.
pub mod scope;

/// Immutable component descriptors and the wiring seam.
pub mod descriptor;

/// The immutable descriptor catalog.
pub mod catalog;

/// The type+qualifier resolution algorithm.
pub mod resolver;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::catalog::{Catalog, CatalogBuilder, CatalogError};
    pub use crate::component::{Component, ComponentInstance};
    pub use crate::descriptor::{
        ComponentDescriptor, ContextualRef, Dependency, DescriptorBuilder, DescriptorId,
        DisposeError, ProducerError, Wiring, WiringError,
    };
    pub use crate::key::TypeKey;
    pub use crate::qualifier::{Qualifier, QualifierSet};
    pub use crate::resolver::{ResolveError, Resolver};
    pub use crate::scope::{CustomScope, ScopeKind};
}
