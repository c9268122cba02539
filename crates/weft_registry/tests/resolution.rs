//! Resolution properties over generated catalogs.

use std::sync::Arc;

use proptest::prelude::*;

use weft_registry::catalog::CatalogBuilder;
use weft_registry::descriptor::ComponentDescriptor;
use weft_registry::key::TypeKey;
use weft_registry::qualifier::{Qualifier, QualifierSet};
use weft_registry::resolver::{ResolveError, Resolver};
use weft_registry::scope::ScopeKind;

trait Service: Send + Sync {}

struct Impl;
impl Service for Impl {}

/// One generated descriptor definition: tag value and priority.
#[derive(Debug, Clone)]
struct Def {
    tag: Option<u8>,
    priority: i32,
}

fn def_strategy() -> impl Strategy<Value = Def> {
    (proptest::option::of(0u8..4), -2i32..3).prop_map(|(tag, priority)| Def { tag, priority })
}

fn build_resolver(defs: &[Def]) -> Resolver {
    let mut builder = CatalogBuilder::new();
    for (index, def) in defs.iter().enumerate() {
        let mut descriptor = ComponentDescriptor::builder()
            .id(format!("svc-{index}"))
            .expose::<dyn Service>()
            .scope(ScopeKind::Application)
            .priority(def.priority);
        if let Some(tag) = def.tag {
            descriptor = descriptor.qualify(Qualifier::new("tag").attr("value", tag.to_string()));
        }
        builder = builder.register(descriptor.produce(|_| Ok(Impl)).build().unwrap());
    }
    Resolver::new(Arc::new(builder.build().unwrap()))
}

fn request(tag: Option<u8>) -> QualifierSet {
    match tag {
        Some(tag) => {
            QualifierSet::new().with(Qualifier::new("tag").attr("value", tag.to_string()))
        }
        None => QualifierSet::new(),
    }
}

proptest! {
    /// Repeated resolution of the same request returns the same descriptor
    /// (or the same error kind) while the catalog is unchanged.
    #[test]
    fn resolution_is_deterministic(defs in proptest::collection::vec(def_strategy(), 0..8), tag in proptest::option::of(0u8..4)) {
        let resolver = build_resolver(&defs);
        let ty = TypeKey::of::<dyn Service>();
        let quals = request(tag);

        let first = resolver.resolve(ty, &quals);
        for _ in 0..4 {
            let again = resolver.resolve(ty, &quals);
            match (&first, &again) {
                (Ok(a), Ok(b)) => prop_assert_eq!(a.id(), b.id()),
                (Err(ResolveError::Unsatisfied { .. }), Err(ResolveError::Unsatisfied { .. })) => {}
                (Err(ResolveError::Ambiguous { .. }), Err(ResolveError::Ambiguous { .. })) => {}
                (a, b) => prop_assert!(false, "unstable outcome: {a:?} vs {b:?}"),
            }
        }
    }

    /// A successful resolution always returns a qualifier-compatible,
    /// maximum-priority candidate.
    #[test]
    fn winner_is_compatible_and_maximal(defs in proptest::collection::vec(def_strategy(), 1..8), tag in proptest::option::of(0u8..4)) {
        let resolver = build_resolver(&defs);
        let quals = request(tag);

        if let Ok(found) = resolver.resolve(TypeKey::of::<dyn Service>(), &quals) {
            prop_assert!(found.qualifiers().is_superset_of(&quals));

            // No compatible candidate declares a strictly higher priority.
            let compatible_max = defs
                .iter()
                .filter(|d| d.tag == tag)
                .map(|d| d.priority)
                .max();
            if let Some(max) = compatible_max {
                prop_assert!(found.priority() >= max);
            }
        }
    }
}

/// The canonical two-descriptor scenario: an unqualified session-scoped
/// component and a tagged dependent-scoped one.
#[test]
fn qualified_and_unqualified_descriptors_resolve_independently() {
    struct SessionImpl;
    impl Service for SessionImpl {}

    struct TaggedImpl;
    impl Service for TaggedImpl {}

    let catalog = CatalogBuilder::new()
        .register(
            ComponentDescriptor::builder()
                .id("session-service")
                .expose::<dyn Service>()
                .scope(ScopeKind::Session)
                .produce(|_| Ok(SessionImpl))
                .build()
                .unwrap(),
        )
        .register(
            ComponentDescriptor::builder()
                .id("tagged-service")
                .expose::<dyn Service>()
                .scope(ScopeKind::Dependent)
                .qualify(Qualifier::new("tag").attr("value", "x"))
                .produce(|_| Ok(TaggedImpl))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let resolver = Resolver::new(Arc::new(catalog));
    let ty = TypeKey::of::<dyn Service>();

    let plain = resolver.resolve(ty, &QualifierSet::new()).unwrap();
    assert_eq!(plain.id().as_str(), "session-service");

    let tagged = resolver
        .resolve(
            ty,
            &QualifierSet::new().with(Qualifier::new("tag").attr("value", "x")),
        )
        .unwrap();
    assert_eq!(tagged.id().as_str(), "tagged-service");
}
