//! Lifecycle scope kinds.
//!
//! A scope kind is a lifecycle policy: it decides how long a component
//! instance lives and how widely it is shared. The one distinction the rest
//! of the runtime cares about is *cacheability*:
//!
//! - **Cacheable** scopes share one instance across all lookups while an
//!   activation is live (request, session, application, and custom scopes).
//!   Injection points targeting them receive a client proxy.
//! - **Non-cacheable** ([`ScopeKind::Dependent`]) produces a fresh instance
//!   per lookup, owned by its creator's creation session. No proxy is ever
//!   generated for it.
//!
//! Thread affinity is a property of the context store registered for a kind,
//! not of the kind itself; see `weft_context`.

use core::fmt;

/// A custom, host-defined scope.
///
/// Hosts that manage their own logical units (a conversation, a batch job, a
/// transaction) declare a custom scope and register a context store for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CustomScope {
    name: &'static str,
    cacheable: bool,
}

impl CustomScope {
    /// Declares a custom scope.
    #[must_use]
    pub const fn new(name: &'static str, cacheable: bool) -> Self {
        Self { name, cacheable }
    }

    /// Returns the scope name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if one instance is shared per activation.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.cacheable
    }
}

/// The lifecycle scope a descriptor declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// A fresh instance per lookup, tied to its creator's lifetime.
    Dependent,
    /// One instance per logical unit of work, thread-affine by default.
    Request,
    /// One instance per session, thread-affine by default.
    Session,
    /// One process-wide instance per application activation.
    Application,
    /// A host-defined scope.
    Custom(CustomScope),
}

impl ScopeKind {
    /// Returns `true` if one instance is shared per activation.
    ///
    /// Non-cacheable scopes never get a client proxy; they are injected as
    /// direct, one-shot instances instead.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        match self {
            Self::Dependent => false,
            Self::Request | Self::Session | Self::Application => true,
            Self::Custom(custom) => custom.is_cacheable(),
        }
    }

    /// Returns the scope name for diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dependent => "dependent",
            Self::Request => "request",
            Self::Session => "session",
            Self::Application => "application",
            Self::Custom(custom) => custom.name(),
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependent_is_the_only_builtin_non_cacheable_scope() {
        assert!(!ScopeKind::Dependent.is_cacheable());
        assert!(ScopeKind::Request.is_cacheable());
        assert!(ScopeKind::Session.is_cacheable());
        assert!(ScopeKind::Application.is_cacheable());
    }

    #[test]
    fn custom_scope_chooses_cacheability() {
        let conversation = ScopeKind::Custom(CustomScope::new("conversation", true));
        let ephemeral = ScopeKind::Custom(CustomScope::new("ephemeral", false));

        assert!(conversation.is_cacheable());
        assert!(!ephemeral.is_cacheable());
        assert_eq!(conversation.name(), "conversation");
    }

    #[test]
    fn display_uses_scope_name() {
        assert_eq!(ScopeKind::Application.to_string(), "application");
    }
}
