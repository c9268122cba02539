//! A runtime container that wires loosely-coupled components by type and
//! qualifier, manages instance lifetimes per scope, and hands out stable
//! client proxies across scope boundaries.

pub use weft_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use weft_internal::prelude::*;
}
