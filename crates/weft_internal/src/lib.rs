//! # Weft Internal Library
//!
//! Re-exports the core Weft crates for convenience.

/// Layer 1: descriptors, qualifiers, and resolution.
pub use weft_registry;

/// Layer 1: scope stores and creation sessions.
pub use weft_context;

/// Layer 2: client proxies and the invocation chain.
pub use weft_proxy;

/// Layer 3: the container runtime.
pub use weft_runtime;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use weft_context::prelude::*;
    pub use weft_proxy::prelude::*;
    pub use weft_registry::prelude::*;
    pub use weft_runtime::prelude::*;
}
