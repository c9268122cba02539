//! Client proxies and the invocation chain for Weft (Layer 2).
//!
//! A cacheable-scoped component is injected as a [`ClientProxy`](proxy::ClientProxy):
//! a stable stand-in that re-resolves the current backing instance from the
//! target scope's context on every access. One injected reference thereby
//! survives any number of create/destroy cycles of the scope it targets.
//!
//! Calls may be routed through an [`InvocationChain`](invoke::InvocationChain):
//! interceptors wrap the call in order, then decorators delegate toward the
//! concrete instance. Which interceptors and decorators apply to a
//! descriptor is resolved once and cached, never per call.
//!
//! - [`invoke`] - The invocation context, interceptors, and decorators
//! - [`binding`] - Binding registration and per-descriptor chain resolution
//! - [`proxy`] - The client proxy itself

/// The invocation context, interceptors, and decorators.
pub mod invoke;

/// Binding registration and per-descriptor chain resolution.
pub mod binding;

/// The client proxy.
pub mod proxy;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::binding::ChainRegistry;
    pub use crate::invoke::{
        Decorator, Interceptor, InvocationChain, InvocationContext, InvocationError,
        InvocationOutcome,
    };
    pub use crate::proxy::{ClientProxy, InstanceSource, ProxyError};
}
