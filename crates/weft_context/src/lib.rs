//! Per-scope instance stores and creation sessions for Weft (Layer 1).
//!
//! `weft_context` provides the dynamic half of Layer 1: the stores that hold
//! live component instances for each scope activation, and the bookkeeping
//! that cascades destruction of dependent-scoped instances.
//!
//! - [`session`] - Creation sessions: dependent tracking and cycle detection
//! - [`activation`] - One activation's instance map and teardown
//! - [`store`] - The [`ContextStore`](store::ContextStore) contract
//! - [`shared`] - The process-wide store for shared scopes
//! - [`thread`] - The thread-affine store for request-like scopes
//!
//! # Lifecycle
//!
//! A store is ACTIVE between `start` and `end`. Lookups against an inactive
//! store fail loudly; `end` destroys every instance the activation held
//! exactly once, running each descriptor's disposer and then releasing that
//! instance's creation session (its dependents, in reverse creation order).
//! Teardown failures are collected and reported in aggregate — a failing
//! disposer never blocks sibling cleanup.

/// Creation sessions: dependent tracking and cycle detection.
pub mod session;

/// One activation's instance map and teardown.
pub mod activation;

/// The context-store contract shared by all scope stores.
pub mod store;

/// The process-wide store for shared scopes.
pub mod shared;

/// The thread-affine store for request-like scopes.
pub mod thread;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::activation::ActivationId;
    pub use crate::session::{CreationSession, CycleError, ReleaseError, TeardownFailure};
    pub use crate::shared::SharedStore;
    pub use crate::store::{ContextError, ContextStore, Creator, EndError};
    pub use crate::thread::ThreadLocalStore;
}
