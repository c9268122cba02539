//! Immutable component descriptors and the wiring seam.
//!
//! A [`ComponentDescriptor`] is the static metadata for one injectable
//! implementation: the contracts it exposes, the qualifiers narrowing it, its
//! lifecycle scope, and the externally supplied construction and destruction
//! routines. Descriptors are built once at boot and never mutated.
//!
//! # The wiring seam
//!
//! Producers receive a [`Wiring`] handle through which they resolve their own
//! dependencies. What comes back is a [`Dependency`]:
//!
//! - [`Dependency::Direct`] - a fresh, one-shot instance of a
//!   dependent-scoped component, owned by the requesting creation session;
//! - [`Dependency::Deferred`] - a stable [`ContextualRef`] (the client proxy)
//!   for a cacheable-scoped component, whose [`current()`](ContextualRef::current)
//!   re-resolves the backing instance on every access.
//!
//! Because cacheable dependencies come back deferred, constructing them is
//! postponed until first use. This is what allows legitimate circular
//! references between cacheable components, while dependent-scoped cycles
//! are detected and reported.

use core::fmt;
use std::borrow::Cow;
use std::sync::Arc;

use crate::component::{Component, ComponentInstance};
use crate::key::TypeKey;
use crate::qualifier::{Qualifier, QualifierSet};
use crate::resolver::ResolveError;
use crate::scope::ScopeKind;

// ─────────────────────────────────────────────────────────────────────────────
// DescriptorId
// ─────────────────────────────────────────────────────────────────────────────

/// Stable identity of a descriptor.
///
/// Explicit ids are required for passivation-capable descriptors (their
/// instances may outlive the process image and must re-attach by identity).
/// Descriptors without an explicit id receive a generated one at build time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(Arc<str>);

impl DescriptorId {
    /// Creates an id from an explicit stable name.
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().into())
    }

    /// Creates a unique generated id.
    #[must_use]
    pub(crate) fn generated() -> Self {
        Self(format!("component-{}", nanoid::nanoid!(10)).into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DescriptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Error raised by a descriptor's construction routine.
#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    /// A dependency of the component could not be wired.
    #[error(transparent)]
    Wiring(#[from] WiringError),

    /// The construction routine itself failed.
    #[error("{0}")]
    Failed(String),
}

impl ProducerError {
    /// Creates a construction failure with the given message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Error raised by a descriptor's destruction routine.
///
/// Teardown failures are collected and reported in aggregate by the caller;
/// they never interrupt sibling cleanup.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct DisposeError {
    message: String,
}

impl DisposeError {
    /// Creates a teardown failure with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn render_chain(chain: &[DescriptorId]) -> String {
    chain
        .iter()
        .map(DescriptorId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Error raised while wiring a dependency graph.
///
/// Every failure mode is surfaced to the caller; there is no silent fallback.
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    /// Resolution failed (unsatisfied or ambiguous).
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The scope targeted by a lookup has no active context.
    #[error("context for {scope} scope is not active")]
    ContextNotActive {
        /// The scope whose context was required.
        scope: ScopeKind,
    },

    /// A dependent-scoped chain recursed into itself.
    #[error("circular dependent-scoped chain: {}", render_chain(.chain))]
    CircularDependency {
        /// The creation chain, root first, ending at the repeated component.
        chain: Vec<DescriptorId>,
    },

    /// Construction of a component failed.
    #[error("constructing component '{component}' failed: {source}")]
    Construction {
        /// The component whose producer failed.
        component: DescriptorId,
        /// The underlying producer failure.
        #[source]
        source: Box<ProducerError>,
    },

    /// A resolved instance does not expose the requested contract.
    #[error("resolved instance of type '{actual}' does not expose contract '{expected}'")]
    ContractMismatch {
        /// The contract the caller asked for.
        expected: &'static str,
        /// The concrete type of the resolved instance.
        actual: &'static str,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Wiring seam
// ─────────────────────────────────────────────────────────────────────────────

/// The handle a producer uses to resolve its own dependencies.
///
/// Implemented by the runtime; the in-flight creation session is threaded
/// through it explicitly, so dependent-scoped instances created here are
/// tracked by their root's session.
pub trait Wiring {
    /// Resolves and materializes one dependency.
    fn dependency(
        &self,
        ty: TypeKey,
        qualifiers: &QualifierSet,
    ) -> Result<Dependency, WiringError>;
}

/// A stable reference to a cacheable-scoped component.
///
/// Implemented by the client proxy: holds no instance state and re-resolves
/// the current backing instance on every [`current()`](Self::current) call.
pub trait ContextualRef: Send + Sync {
    /// The descriptor this reference targets.
    fn descriptor(&self) -> &Arc<ComponentDescriptor>;

    /// Resolves the current backing instance from the target scope's active
    /// context, creating it if absent.
    ///
    /// # Errors
    ///
    /// Fails with [`WiringError::ContextNotActive`] when the target scope has
    /// no active context.
    fn current(&self) -> Result<ComponentInstance, WiringError>;
}

/// A materialized dependency, as handed to a producer.
#[derive(Clone)]
pub enum Dependency {
    /// A one-shot dependent-scoped instance, owned by the requesting
    /// creation session.
    Direct(ComponentInstance),
    /// A stable reference to a cacheable-scoped component; the backing
    /// instance is resolved per access.
    Deferred(Arc<dyn ContextualRef>),
}

impl Dependency {
    /// Resolves the instance backing this dependency right now.
    ///
    /// For a direct dependency this is the owned instance; for a deferred one
    /// it consults the target scope's active context.
    ///
    /// # Errors
    ///
    /// Deferred dependencies fail when their scope's context is not active.
    pub fn current(&self) -> Result<ComponentInstance, WiringError> {
        match self {
            Self::Direct(instance) => Ok(instance.clone()),
            Self::Deferred(reference) => reference.current(),
        }
    }

    /// Runs `f` against the typed backing instance resolved right now.
    ///
    /// # Errors
    ///
    /// Fails when the backing instance cannot be resolved or does not expose
    /// `T`.
    pub fn with<T: Component, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, WiringError> {
        let instance = self.current()?;
        let actual = instance.type_name();
        instance.with(f).ok_or(WiringError::ContractMismatch {
            expected: core::any::type_name::<T>(),
            actual,
        })
    }

    /// Returns the owned instance of a direct dependency.
    #[must_use]
    pub fn direct(&self) -> Option<&ComponentInstance> {
        match self {
            Self::Direct(instance) => Some(instance),
            Self::Deferred(_) => None,
        }
    }

    /// Returns the stable reference of a deferred dependency.
    #[must_use]
    pub fn deferred(&self) -> Option<&Arc<dyn ContextualRef>> {
        match self {
            Self::Direct(_) => None,
            Self::Deferred(reference) => Some(reference),
        }
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(instance) => f.debug_tuple("Direct").field(instance).finish(),
            Self::Deferred(reference) => f
                .debug_tuple("Deferred")
                .field(&reference.descriptor().id())
                .finish(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ComponentDescriptor
// ─────────────────────────────────────────────────────────────────────────────

/// Construction routine supplied per descriptor.
pub type Producer =
    Arc<dyn Fn(&dyn Wiring) -> Result<ComponentInstance, ProducerError> + Send + Sync>;

/// Destruction routine supplied per descriptor.
pub type Disposer = Arc<dyn Fn(&ComponentInstance) -> Result<(), DisposeError> + Send + Sync>;

/// Static metadata describing one injectable implementation.
///
/// Immutable after [`build()`](DescriptorBuilder::build); shared via `Arc`
/// across the catalog, context stores, and proxies.
pub struct ComponentDescriptor {
    id: DescriptorId,
    types: Vec<TypeKey>,
    qualifiers: QualifierSet,
    scope: ScopeKind,
    alternative: bool,
    priority: i32,
    passivation_capable: bool,
    interceptor_bindings: Vec<Cow<'static, str>>,
    producer: Producer,
    disposer: Option<Disposer>,
}

impl ComponentDescriptor {
    /// Starts building a descriptor.
    #[must_use]
    pub fn builder() -> DescriptorBuilder {
        DescriptorBuilder::new()
    }

    /// Returns the stable identity.
    #[must_use]
    pub fn id(&self) -> &DescriptorId {
        &self.id
    }

    /// Returns the exposed contract keys.
    #[must_use]
    pub fn types(&self) -> &[TypeKey] {
        &self.types
    }

    /// Returns `true` if this descriptor exposes the given contract.
    #[must_use]
    pub fn exposes(&self, key: &TypeKey) -> bool {
        self.types.contains(key)
    }

    /// Returns the normalized qualifier set.
    #[must_use]
    pub fn qualifiers(&self) -> &QualifierSet {
        &self.qualifiers
    }

    /// Returns the declared scope kind.
    #[must_use]
    pub fn scope(&self) -> ScopeKind {
        self.scope
    }

    /// Returns `true` if this descriptor is an alternative.
    #[must_use]
    pub fn is_alternative(&self) -> bool {
        self.alternative
    }

    /// Returns the declared priority (higher wins during tie-breaks).
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns `true` if instances may be passivated and re-attached.
    #[must_use]
    pub fn is_passivation_capable(&self) -> bool {
        self.passivation_capable
    }

    /// Returns the interceptor binding tags.
    #[must_use]
    pub fn interceptor_bindings(&self) -> &[Cow<'static, str>] {
        &self.interceptor_bindings
    }

    /// Returns `true` if the given binding tag is declared.
    #[must_use]
    pub fn has_binding(&self, tag: &str) -> bool {
        self.interceptor_bindings.iter().any(|t| t == tag)
    }

    /// Runs the construction routine.
    ///
    /// # Errors
    ///
    /// Propagates the producer's failure, including wiring failures of
    /// transitive dependencies.
    pub fn create(&self, wiring: &dyn Wiring) -> Result<ComponentInstance, ProducerError> {
        (self.producer)(wiring)
    }

    /// Runs the destruction routine, if one was supplied.
    ///
    /// # Errors
    ///
    /// Propagates the disposer's failure. Callers collect these and continue
    /// with sibling teardown.
    pub fn dispose(&self, instance: &ComponentInstance) -> Result<(), DisposeError> {
        match &self.disposer {
            Some(disposer) => disposer(instance),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("id", &self.id)
            .field("types", &self.types)
            .field("qualifiers", &self.qualifiers)
            .field("scope", &self.scope)
            .field("alternative", &self.alternative)
            .field("priority", &self.priority)
            .field("passivation_capable", &self.passivation_capable)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DescriptorBuilder
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised when a descriptor definition is invalid.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// No construction routine was supplied.
    #[error("descriptor '{id}' has no producer")]
    MissingProducer {
        /// The offending descriptor.
        id: DescriptorId,
    },

    /// A passivation-capable descriptor needs an explicit stable id.
    #[error("passivation-capable descriptors require an explicit id")]
    PassivationRequiresId,
}

/// Builder for [`ComponentDescriptor`].
///
/// # Example
///
/// ```
/// use weft_registry::descriptor::ComponentDescriptor;
/// use weft_registry::qualifier::Qualifier;
/// use weft_registry::scope::ScopeKind;
///
/// struct AuditLog;
/// trait Sink: Send + Sync {}
/// impl Sink for AuditLog {}
///
/// let descriptor = ComponentDescriptor::builder()
///     .id("audit-log")
///     .scope(ScopeKind::Application)
///     .qualify(Qualifier::new("channel").attr("name", "audit"))
///     .expose::<dyn Sink>()
///     .produce(|_| Ok(AuditLog))
///     .build()
///     .unwrap();
///
/// assert!(descriptor.exposes(&weft_registry::key::TypeKey::of::<dyn Sink>()));
/// ```
pub struct DescriptorBuilder {
    id: Option<DescriptorId>,
    types: Vec<TypeKey>,
    qualifiers: QualifierSet,
    scope: ScopeKind,
    alternative: bool,
    priority: i32,
    passivation_capable: bool,
    interceptor_bindings: Vec<Cow<'static, str>>,
    producer: Option<Producer>,
    disposer: Option<Disposer>,
}

impl Default for DescriptorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorBuilder {
    /// Creates a builder with dependent scope and default priority.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: None,
            types: Vec::new(),
            qualifiers: QualifierSet::new(),
            scope: ScopeKind::Dependent,
            alternative: false,
            priority: 0,
            passivation_capable: false,
            interceptor_bindings: Vec::new(),
            producer: None,
            disposer: None,
        }
    }

    /// Sets the stable id.
    #[must_use]
    pub fn id(mut self, id: impl AsRef<str>) -> Self {
        self.id = Some(DescriptorId::new(id));
        self
    }

    /// Exposes a contract this component can satisfy.
    ///
    /// The concrete type passed to [`produce`](Self::produce) is exposed
    /// automatically; list trait-object contracts here.
    #[must_use]
    pub fn expose<T: ?Sized + 'static>(self) -> Self {
        self.expose_key(TypeKey::of::<T>())
    }

    /// Exposes a contract by key.
    #[must_use]
    pub fn expose_key(mut self, key: TypeKey) -> Self {
        if !self.types.contains(&key) {
            self.types.push(key);
        }
        self
    }

    /// Adds a qualifier.
    #[must_use]
    pub fn qualify(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.insert(qualifier);
        self
    }

    /// Sets the lifecycle scope.
    #[must_use]
    pub fn scope(mut self, scope: ScopeKind) -> Self {
        self.scope = scope;
        self
    }

    /// Flags this descriptor as an alternative.
    ///
    /// Alternatives only participate in resolution once enabled on the
    /// catalog; an enabled alternative displaces non-alternative candidates.
    #[must_use]
    pub fn alternative(mut self) -> Self {
        self.alternative = true;
        self
    }

    /// Sets the tie-break priority (higher wins).
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Flags instances as passivation-capable.
    ///
    /// Requires an explicit [`id`](Self::id); the serialization mechanism
    /// itself is an external concern.
    #[must_use]
    pub fn passivation_capable(mut self) -> Self {
        self.passivation_capable = true;
        self
    }

    /// Declares an interceptor binding tag.
    #[must_use]
    pub fn bind_interceptor(mut self, tag: impl Into<Cow<'static, str>>) -> Self {
        self.interceptor_bindings.push(tag.into());
        self
    }

    /// Supplies the construction routine for a typed component.
    ///
    /// The concrete type `T` is exposed automatically.
    #[must_use]
    pub fn produce<T, F>(self, f: F) -> Self
    where
        T: Component,
        F: Fn(&dyn Wiring) -> Result<T, ProducerError> + Send + Sync + 'static,
    {
        self.expose::<T>()
            .produce_instance(move |wiring| f(wiring).map(ComponentInstance::new))
    }

    /// Supplies a type-erased construction routine.
    ///
    /// Prefer [`produce`](Self::produce); this variant exists for producers
    /// that decide the concrete type at runtime. Exposed types must be listed
    /// explicitly.
    #[must_use]
    pub fn produce_instance<F>(mut self, f: F) -> Self
    where
        F: Fn(&dyn Wiring) -> Result<ComponentInstance, ProducerError> + Send + Sync + 'static,
    {
        self.producer = Some(Arc::new(f));
        self
    }

    /// Supplies the destruction routine for a typed component.
    #[must_use]
    pub fn dispose<T, F>(self, f: F) -> Self
    where
        T: Component,
        F: Fn(&T) -> Result<(), DisposeError> + Send + Sync + 'static,
    {
        self.dispose_instance(move |instance: &ComponentInstance| {
            match instance.with::<T, _>(&f) {
                Some(result) => result,
                None => Err(DisposeError::new(format!(
                    "disposer expected '{}' but instance is '{}'",
                    core::any::type_name::<T>(),
                    instance.type_name()
                ))),
            }
        })
    }

    /// Supplies a type-erased destruction routine.
    #[must_use]
    pub fn dispose_instance<F>(mut self, f: F) -> Self
    where
        F: Fn(&ComponentInstance) -> Result<(), DisposeError> + Send + Sync + 'static,
    {
        self.disposer = Some(Arc::new(f));
        self
    }

    /// Finalizes the descriptor.
    ///
    /// Normalization happens here: a descriptor that declared no qualifiers
    /// receives the implicit standard marker, and every descriptor receives
    /// the universal marker.
    ///
    /// # Errors
    ///
    /// - [`DescriptorError::MissingProducer`] if no producer was supplied
    /// - [`DescriptorError::PassivationRequiresId`] if passivation-capable
    ///   without an explicit id
    pub fn build(self) -> Result<ComponentDescriptor, DescriptorError> {
        if self.passivation_capable && self.id.is_none() {
            return Err(DescriptorError::PassivationRequiresId);
        }

        let id = self.id.unwrap_or_else(DescriptorId::generated);

        let Some(producer) = self.producer else {
            return Err(DescriptorError::MissingProducer { id });
        };

        let mut qualifiers = self.qualifiers;
        if qualifiers.is_empty() {
            qualifiers.insert(Qualifier::standard());
        }
        qualifiers.insert(Qualifier::universal());

        Ok(ComponentDescriptor {
            id,
            types: self.types,
            qualifiers,
            scope: self.scope,
            alternative: self.alternative,
            priority: self.priority,
            passivation_capable: self.passivation_capable,
            interceptor_bindings: self.interceptor_bindings,
            producer,
            disposer: self.disposer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qualifier::STANDARD;

    struct NoDeps;

    /// A wiring stub for descriptors with no dependencies.
    struct EmptyWiring;

    impl Wiring for EmptyWiring {
        fn dependency(
            &self,
            ty: TypeKey,
            qualifiers: &QualifierSet,
        ) -> Result<Dependency, WiringError> {
            Err(WiringError::Resolve(ResolveError::unsatisfied(
                ty, qualifiers,
            )))
        }
    }

    #[test]
    fn produce_exposes_concrete_type() {
        let descriptor = ComponentDescriptor::builder()
            .id("no-deps")
            .produce(|_| Ok(NoDeps))
            .build()
            .unwrap();

        assert!(descriptor.exposes(&TypeKey::of::<NoDeps>()));

        let instance = descriptor.create(&EmptyWiring).unwrap();
        assert!(instance.is::<NoDeps>());
    }

    #[test]
    fn unqualified_descriptor_gets_standard_marker() {
        let descriptor = ComponentDescriptor::builder()
            .produce(|_| Ok(NoDeps))
            .build()
            .unwrap();

        assert!(descriptor.qualifiers().contains(&Qualifier::standard()));
        assert!(descriptor.qualifiers().contains(&Qualifier::universal()));
    }

    #[test]
    fn qualified_descriptor_lacks_standard_marker() {
        let descriptor = ComponentDescriptor::builder()
            .qualify(Qualifier::new("tag").attr("value", "x"))
            .produce(|_| Ok(NoDeps))
            .build()
            .unwrap();

        assert!(!descriptor.qualifiers().contains(&Qualifier::standard()));
        assert!(descriptor.qualifiers().contains(&Qualifier::universal()));
        assert!(
            descriptor
                .qualifiers()
                .iter()
                .any(|q| q.name() != STANDARD && q.name() == "tag")
        );
    }

    #[test]
    fn missing_producer_is_rejected() {
        let result = ComponentDescriptor::builder().id("empty").build();
        assert!(matches!(
            result,
            Err(DescriptorError::MissingProducer { .. })
        ));
    }

    #[test]
    fn passivation_capable_requires_explicit_id() {
        let result = ComponentDescriptor::builder()
            .passivation_capable()
            .produce(|_| Ok(NoDeps))
            .build();

        assert!(matches!(result, Err(DescriptorError::PassivationRequiresId)));

        let ok = ComponentDescriptor::builder()
            .id("stable")
            .passivation_capable()
            .produce(|_| Ok(NoDeps))
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn dispose_downcasts_to_the_declared_type() {
        use std::sync::atomic::{AtomicBool, Ordering};

        static DISPOSED: AtomicBool = AtomicBool::new(false);

        let descriptor = ComponentDescriptor::builder()
            .id("disposable")
            .produce(|_| Ok(NoDeps))
            .dispose(|_: &NoDeps| {
                DISPOSED.store(true, Ordering::SeqCst);
                Ok(())
            })
            .build()
            .unwrap();

        let instance = descriptor.create(&EmptyWiring).unwrap();
        descriptor.dispose(&instance).unwrap();
        assert!(DISPOSED.load(Ordering::SeqCst));

        // A mismatched instance is a teardown failure, not a panic.
        let stranger = ComponentInstance::new(7_u32);
        assert!(descriptor.dispose(&stranger).is_err());
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = ComponentDescriptor::builder()
            .produce(|_| Ok(NoDeps))
            .build()
            .unwrap();
        let b = ComponentDescriptor::builder()
            .produce(|_| Ok(NoDeps))
            .build()
            .unwrap();

        assert_ne!(a.id(), b.id());
    }
}
