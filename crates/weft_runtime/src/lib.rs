//! The container runtime for Weft (Layer 3).
//!
//! `weft_runtime` wires the layers together: the catalog and resolver from
//! `weft_registry`, the scope stores from `weft_context`, and the proxies
//! and invocation chains from `weft_proxy`.
//!
//! - [`container`] - The [`Container`](container::Container) and its entry points
//! - [`wiring`] - Lookup handles and the recursive instantiation machinery
//! - [`builder`] - The [`ContainerBuilder`](builder::ContainerBuilder)
//! - [`observe`] - Tracing configuration
//!
//! # Example
//!
//! ```
//! use weft_registry::descriptor::ComponentDescriptor;
//! use weft_registry::qualifier::QualifierSet;
//! use weft_registry::scope::ScopeKind;
//! use weft_runtime::builder::ContainerBuilder;
//!
//! struct Clock;
//!
//! impl Clock {
//!     fn now(&self) -> u64 {
//!         42
//!     }
//! }
//!
//! let container = ContainerBuilder::new()
//!     .register(
//!         ComponentDescriptor::builder()
//!             .id("clock")
//!             .scope(ScopeKind::Application)
//!             .produce(|_| Ok(Clock))
//!             .build()
//!             .unwrap(),
//!     )
//!     .build()
//!     .unwrap();
//!
//! container.start_scope(ScopeKind::Application).unwrap();
//!
//! let handle = container.lookup::<Clock>(&QualifierSet::new()).unwrap();
//! let now = handle.with(Clock::now).unwrap();
//! assert_eq!(now, 42);
//!
//! container.end_scope(ScopeKind::Application).unwrap();
//! ```

/// The container and its entry points.
pub mod container;

/// Lookup handles and the recursive instantiation machinery.
pub mod wiring;

/// The container builder.
pub mod builder;

/// Tracing configuration.
pub mod observe;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::builder::{BootError, ContainerBuilder};
    pub use crate::container::{Container, ScopeError};
    pub use crate::observe::{ObserveConfig, ObserveFormat, init_observability};
    pub use crate::wiring::{Handle, LookupError, OwnedInstance};
}
