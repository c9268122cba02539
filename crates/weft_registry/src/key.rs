//! Type identity for exposed and requested contracts.

use core::any::TypeId;
use core::fmt;

/// Identity of a contract a component exposes or a request asks for.
///
/// A `TypeKey` pairs the [`TypeId`] used for matching with the type name used
/// in diagnostics. Both concrete types and trait objects are valid keys:
/// `TypeKey::of::<MyService>()` and `TypeKey::of::<dyn MyContract>()`.
///
/// A descriptor exposes the set of keys it can satisfy; resolution is a
/// membership test against that set. This renders assignability explicitly:
/// a component that can serve a contract lists that contract's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl TypeKey {
    /// Creates a `TypeKey` for the given type.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Concrete;

    trait Contract {}

    #[test]
    fn same_type_yields_equal_keys() {
        assert_eq!(TypeKey::of::<Concrete>(), TypeKey::of::<Concrete>());
    }

    #[test]
    fn distinct_types_yield_distinct_keys() {
        assert_ne!(TypeKey::of::<Concrete>(), TypeKey::of::<dyn Contract>());
    }

    #[test]
    fn trait_objects_are_valid_keys() {
        let key = TypeKey::of::<dyn Contract>();
        assert_eq!(key.type_id(), TypeId::of::<dyn Contract>());
        assert!(key.type_name().contains("Contract"));
    }
}
