//! The invocation context, interceptors, and decorators.
//!
//! An [`InvocationChain`] is the ordered wrapping applied to one method
//! call: each [`Interceptor`] runs in order and may short-circuit, observe,
//! or map the outcome; each [`Decorator`] then delegates toward the concrete
//! instance; the terminal call runs last. Progress through the chain is
//! driven by [`InvocationContext::proceed`] — an interceptor that never
//! calls it short-circuits the rest of the chain.
//!
//! Results are type-erased (`Box<dyn Any + Send>`); the typed call site
//! supplies the terminal closure and recovers the result. No reflection and
//! no code generation are involved.

use core::any::Any;
use core::fmt;
use std::sync::Arc;

use weft_registry::component::ComponentInstance;

/// Failure of the chain machinery itself.
///
/// Outcomes of the underlying method are whatever the terminal closure
/// returns; they pass through the chain unchanged.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invocation of '{method}' failed: {message}")]
pub struct InvocationError {
    /// The invoked method name.
    pub method: String,
    /// What went wrong.
    pub message: String,
}

impl InvocationError {
    /// Creates an invocation failure.
    #[must_use]
    pub fn new(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            message: message.into(),
        }
    }
}

/// The type-erased result of one invocation.
pub type InvocationOutcome = Result<Box<dyn Any + Send>, InvocationError>;

/// The terminal call on the concrete instance.
pub type Terminal<'a> = Box<dyn FnOnce(&ComponentInstance) -> InvocationOutcome + 'a>;

/// A wrapping behavior around a method call.
///
/// Interceptors run before decorators and the terminal call. Each receives
/// the [`InvocationContext`] and decides whether to
/// [`proceed`](InvocationContext::proceed); skipping `proceed`
/// short-circuits everything downstream.
pub trait Interceptor: Send + Sync {
    /// Returns a name for diagnostics.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    /// Wraps the invocation.
    fn around_invoke(&self, ctx: &mut InvocationContext<'_>) -> InvocationOutcome;
}

/// A delegating wrapper for a contract.
///
/// Decorators run after all interceptors, in order, each delegating to the
/// next via [`proceed`](InvocationContext::proceed) and ending at the
/// concrete instance.
pub trait Decorator: Send + Sync {
    /// Returns a name for diagnostics.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    /// Wraps the delegated call.
    fn decorate(&self, ctx: &mut InvocationContext<'_>) -> InvocationOutcome;
}

/// The resolved, ordered wrapping for one descriptor.
///
/// Immutable once resolved; cached per descriptor and shared across calls.
#[derive(Clone, Default)]
pub struct InvocationChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
    decorators: Vec<Arc<dyn Decorator>>,
}

impl InvocationChain {
    /// Creates a chain from ordered interceptors and decorators.
    #[must_use]
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>, decorators: Vec<Arc<dyn Decorator>>) -> Self {
        Self {
            interceptors,
            decorators,
        }
    }

    /// The chain that wraps nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` if the chain wraps nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty() && self.decorators.is_empty()
    }

    /// Runs one invocation through the chain.
    pub fn invoke(
        &self,
        method: &str,
        target: &ComponentInstance,
        terminal: Terminal<'_>,
    ) -> InvocationOutcome {
        let mut ctx = InvocationContext {
            chain: self,
            method,
            target,
            position: 0,
            terminal: Some(terminal),
        };
        ctx.proceed()
    }
}

impl fmt::Debug for InvocationChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationChain")
            .field(
                "interceptors",
                &self.interceptors.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .field(
                "decorators",
                &self.decorators.iter().map(|d| d.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// The in-flight state of one invocation.
pub struct InvocationContext<'a> {
    chain: &'a InvocationChain,
    method: &'a str,
    target: &'a ComponentInstance,
    position: usize,
    terminal: Option<Terminal<'a>>,
}

impl InvocationContext<'_> {
    /// Returns the invoked method name.
    #[must_use]
    pub fn method(&self) -> &str {
        self.method
    }

    /// Returns the concrete instance the call will land on.
    #[must_use]
    pub fn target(&self) -> &ComponentInstance {
        self.target
    }

    /// Advances the chain: the next interceptor, then the next decorator,
    /// then the terminal call.
    ///
    /// # Errors
    ///
    /// Propagates whatever the rest of the chain returns; proceeding past a
    /// completed chain is an [`InvocationError`].
    pub fn proceed(&mut self) -> InvocationOutcome {
        let position = self.position;
        self.position += 1;

        let interceptor_count = self.chain.interceptors.len();
        if position < interceptor_count {
            let interceptor = Arc::clone(&self.chain.interceptors[position]);
            return interceptor.around_invoke(self);
        }

        let decorator_index = position - interceptor_count;
        if decorator_index < self.chain.decorators.len() {
            let decorator = Arc::clone(&self.chain.decorators[decorator_index]);
            return decorator.decorate(self);
        }

        match self.terminal.take() {
            Some(terminal) => terminal(self.target),
            None => Err(InvocationError::new(
                self.method,
                "proceed() called past the end of the chain",
            )),
        }
    }
}
