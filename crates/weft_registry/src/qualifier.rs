//! Qualifiers narrowing which component satisfies a request.
//!
//! A [`Qualifier`] is a tagged key plus a set of attribute values. Attributes
//! default to *binding*: they participate in matching. Attributes added via
//! [`Qualifier::nonbinding_attr`] are carried for documentation but excluded
//! from equality, hashing, and ordering.
//!
//! # Matching
//!
//! A descriptor satisfies a request when its qualifier set is a superset of
//! the requested set, comparing binding attributes only. Two markers make the
//! common cases work without ceremony:
//!
//! - [`Qualifier::standard()`] - implicitly carried by descriptors that
//!   declare no qualifiers of their own, and implicitly requested by empty
//!   qualifier sets. A descriptor that declares an explicit qualifier does
//!   *not* carry the standard marker, so it never shadows the unqualified
//!   component on a bare request.
//! - [`Qualifier::universal()`] - carried by every descriptor; requesting it
//!   matches all descriptors of a type.

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Name of the implicit marker carried by otherwise unqualified descriptors.
pub const STANDARD: &str = "standard";

/// Name of the marker carried by every descriptor.
pub const UNIVERSAL: &str = "universal";

/// One attribute value with its binding flag.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Attribute {
    value: String,
    binding: bool,
}

/// A typed tag narrowing which descriptor satisfies a request.
///
/// Equality, hashing, and ordering cover the qualifier name and *binding*
/// attributes only.
///
/// # Example
///
/// ```
/// use weft_registry::qualifier::Qualifier;
///
/// let a = Qualifier::new("backend").attr("flavor", "postgres");
/// let b = Qualifier::new("backend")
///     .attr("flavor", "postgres")
///     .nonbinding_attr("note", "primary replica");
///
/// // The non-binding attribute does not participate in matching.
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone)]
pub struct Qualifier {
    name: Cow<'static, str>,
    attributes: BTreeMap<String, Attribute>,
}

impl Qualifier {
    /// Creates a qualifier with the given tag name and no attributes.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// The implicit marker carried by descriptors that declare no qualifiers,
    /// and requested by empty qualifier sets.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(STANDARD)
    }

    /// The marker carried by every descriptor. Requesting it matches all
    /// descriptors of a type.
    #[must_use]
    pub fn universal() -> Self {
        Self::new(UNIVERSAL)
    }

    /// Adds a binding attribute (participates in matching).
    #[must_use]
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(
            key.into(),
            Attribute {
                value: value.into(),
                binding: true,
            },
        );
        self
    }

    /// Adds a non-binding attribute (carried, but excluded from matching).
    #[must_use]
    pub fn nonbinding_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(
            key.into(),
            Attribute {
                value: value.into(),
                binding: false,
            },
        );
        self
    }

    /// Returns the tag name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns an attribute value, binding or not.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|a| a.value.as_str())
    }

    /// Iterates binding attributes in key order.
    fn binding_attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .filter(|(_, a)| a.binding)
            .map(|(k, a)| (k.as_str(), a.value.as_str()))
    }
}

impl PartialEq for Qualifier {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.binding_attrs().eq(other.binding_attrs())
    }
}

impl Eq for Qualifier {}

impl Hash for Qualifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        for (key, value) in self.binding_attrs() {
            key.hash(state);
            value.hash(state);
        }
    }
}

impl PartialOrd for Qualifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Qualifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.binding_attrs().cmp(other.binding_attrs()))
    }
}

// Renders the name plus binding attributes, e.g. `backend(flavor=postgres)`.
impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        let mut attrs = self.binding_attrs().peekable();
        if attrs.peek().is_some() {
            write!(f, "(")?;
            let mut first = true;
            for (key, value) in attrs {
                if !first {
                    write!(f, ", ")?;
                }
                first = false;
                write!(f, "{key}={value}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// A sorted, deduplicated set of qualifiers.
///
/// Supports the superset test at the heart of resolution and is hashable so
/// resolved requests can be memoized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QualifierSet {
    items: Vec<Qualifier>,
}

impl QualifierSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Builder-style insertion.
    #[must_use]
    pub fn with(mut self, qualifier: Qualifier) -> Self {
        self.insert(qualifier);
        self
    }

    /// Inserts a qualifier, keeping the set sorted and deduplicated.
    pub fn insert(&mut self, qualifier: Qualifier) {
        if let Err(pos) = self.items.binary_search(&qualifier) {
            self.items.insert(pos, qualifier);
        }
    }

    /// Returns `true` if the set holds an equal qualifier (binding attributes
    /// only).
    #[must_use]
    pub fn contains(&self, qualifier: &Qualifier) -> bool {
        self.items.binary_search(qualifier).is_ok()
    }

    /// Returns `true` if every qualifier in `requested` is present here.
    #[must_use]
    pub fn is_superset_of(&self, requested: &QualifierSet) -> bool {
        requested.items.iter().all(|q| self.contains(q))
    }

    /// Returns the number of qualifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates qualifiers in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &Qualifier> {
        self.items.iter()
    }
}

impl FromIterator<Qualifier> for QualifierSet {
    fn from_iter<I: IntoIterator<Item = Qualifier>>(iter: I) -> Self {
        let mut set = Self::new();
        for qualifier in iter {
            set.insert(qualifier);
        }
        set
    }
}

impl fmt::Display for QualifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for qualifier in &self.items {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{qualifier}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(q: &Qualifier) -> u64 {
        let mut hasher = DefaultHasher::new();
        q.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn binding_attributes_participate_in_equality() {
        let a = Qualifier::new("tag").attr("value", "x");
        let b = Qualifier::new("tag").attr("value", "x");
        let c = Qualifier::new("tag").attr("value", "y");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn nonbinding_attributes_are_ignored_for_matching() {
        let plain = Qualifier::new("backend").attr("flavor", "postgres");
        let annotated = Qualifier::new("backend")
            .attr("flavor", "postgres")
            .nonbinding_attr("description", "primary store");

        assert_eq!(plain, annotated);
        assert_eq!(hash_of(&plain), hash_of(&annotated));
        // The value is still retrievable.
        assert_eq!(annotated.attribute("description"), Some("primary store"));
    }

    #[test]
    fn set_insert_is_sorted_and_deduplicated() {
        let mut set = QualifierSet::new();
        set.insert(Qualifier::new("b"));
        set.insert(Qualifier::new("a"));
        set.insert(Qualifier::new("b"));

        let names: Vec<_> = set.iter().map(Qualifier::name).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn superset_matching() {
        let declared = QualifierSet::new()
            .with(Qualifier::new("tag").attr("value", "x"))
            .with(Qualifier::universal());

        let requested = QualifierSet::new().with(Qualifier::new("tag").attr("value", "x"));
        assert!(declared.is_superset_of(&requested));

        let mismatched = QualifierSet::new().with(Qualifier::new("tag").attr("value", "y"));
        assert!(!declared.is_superset_of(&mismatched));

        // The empty request is a subset of everything.
        assert!(declared.is_superset_of(&QualifierSet::new()));
    }

    #[test]
    fn display_renders_binding_attributes_only() {
        let q = Qualifier::new("backend")
            .attr("flavor", "postgres")
            .nonbinding_attr("note", "hidden");

        assert_eq!(q.to_string(), "backend(flavor=postgres)");
    }
}
