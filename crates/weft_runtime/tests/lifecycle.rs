//! Scope lifecycle tests: instance identity, teardown, and cascades.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use weft_registry::descriptor::{ComponentDescriptor, Dependency, WiringError};
use weft_registry::key::TypeKey;
use weft_registry::qualifier::QualifierSet;
use weft_registry::scope::ScopeKind;
use weft_runtime::builder::ContainerBuilder;

struct SessionThing;

#[test]
fn session_scope_identity_and_teardown() {
    let disposals = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&disposals);

    let container = ContainerBuilder::new()
        .register(
            ComponentDescriptor::builder()
                .id("session-thing")
                .scope(ScopeKind::Session)
                .produce(|_| Ok(SessionThing))
                .dispose_instance(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    container.start_scope(ScopeKind::Session).unwrap();

    let handle = container.lookup::<SessionThing>(&QualifierSet::new()).unwrap();
    assert!(handle.proxy().is_some());

    // Two resolutions within the same activation: the identical instance.
    let first = handle.current().unwrap();
    let second = handle.current().unwrap();
    assert!(first.ptr_eq(&second));

    container.end_scope(ScopeKind::Session).unwrap();
    assert_eq!(disposals.load(Ordering::SeqCst), 1);

    // Without a new start, the context is gone and says which scope.
    let err = handle.current().unwrap_err();
    assert!(matches!(
        err,
        WiringError::ContextNotActive {
            scope: ScopeKind::Session
        }
    ));
    assert!(err.to_string().contains("session"));

    // A fresh activation yields a fresh instance through the same handle.
    container.start_scope(ScopeKind::Session).unwrap();
    let third = handle.current().unwrap();
    assert!(!first.ptr_eq(&third));

    container.end_scope(ScopeKind::Session).unwrap();
    assert_eq!(disposals.load(Ordering::SeqCst), 2);
}

#[test]
fn start_then_end_with_no_lookups_destroys_nothing() {
    let disposals = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&disposals);

    let container = ContainerBuilder::new()
        .register(
            ComponentDescriptor::builder()
                .id("session-thing")
                .scope(ScopeKind::Session)
                .produce(|_| Ok(SessionThing))
                .dispose_instance(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    container.start_scope(ScopeKind::Session).unwrap();
    container.end_scope(ScopeKind::Session).unwrap();

    assert_eq!(disposals.load(Ordering::SeqCst), 0);
    assert!(!container.scope_active(ScopeKind::Session));
}

struct Helper;

struct Worker {
    helper: Dependency,
}

impl Worker {
    fn helper_alive(&self) -> bool {
        self.helper.with(|_: &Helper| ()).is_ok()
    }
}

#[test]
fn destroying_a_component_cascades_to_its_dependents() {
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let helper_order = Arc::clone(&order);
    let worker_order = Arc::clone(&order);

    let container = ContainerBuilder::new()
        .register(
            ComponentDescriptor::builder()
                .id("helper")
                .scope(ScopeKind::Dependent)
                .produce(|_| Ok(Helper))
                .dispose_instance(move |_| {
                    helper_order.lock().unwrap().push("helper");
                    Ok(())
                })
                .build()
                .unwrap(),
        )
        .register(
            ComponentDescriptor::builder()
                .id("worker")
                .scope(ScopeKind::Session)
                .produce(|wiring| {
                    let helper =
                        wiring.dependency(TypeKey::of::<Helper>(), &QualifierSet::new())?;
                    Ok(Worker { helper })
                })
                .dispose_instance(move |_| {
                    worker_order.lock().unwrap().push("worker");
                    Ok(())
                })
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    container.start_scope(ScopeKind::Session).unwrap();

    let handle = container.lookup::<Worker>(&QualifierSet::new()).unwrap();
    assert!(handle.with(Worker::helper_alive).unwrap());
    assert!(order.lock().unwrap().is_empty());

    // Ending the session destroys the worker; its dependent helper goes
    // with it — after the worker's disposer, never before.
    container.end_scope(ScopeKind::Session).unwrap();
    assert_eq!(*order.lock().unwrap(), ["worker", "helper"]);
}

#[test]
fn bare_dependent_lookup_is_released_through_its_handle() {
    let disposals = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&disposals);
    let container = ContainerBuilder::new()
        .register(
            ComponentDescriptor::builder()
                .id("helper")
                .scope(ScopeKind::Dependent)
                .produce(|_| Ok(Helper))
                .dispose_instance(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    // Two dependent lookups always yield distinct instances.
    let first = container.lookup::<Helper>(&QualifierSet::new()).unwrap();
    let second = container.lookup::<Helper>(&QualifierSet::new()).unwrap();
    assert!(
        !first
            .current()
            .unwrap()
            .ptr_eq(&second.current().unwrap())
    );

    // Explicit release tears down with an error report.
    first.release().unwrap();
    assert_eq!(disposals.load(Ordering::SeqCst), 1);

    // Dropping the handle is the best-effort backstop.
    drop(second);
    assert_eq!(disposals.load(Ordering::SeqCst), 2);
}

#[test]
fn teardown_failures_are_aggregated_not_swallowed() {
    let disposals = Arc::new(AtomicUsize::new(0));

    let failing_counter = Arc::clone(&disposals);
    let healthy_counter = Arc::clone(&disposals);

    let container = ContainerBuilder::new()
        .register(
            ComponentDescriptor::builder()
                .id("failing")
                .scope(ScopeKind::Session)
                .produce(|_| Ok(SessionThing))
                .dispose_instance(move |_| {
                    failing_counter.fetch_add(1, Ordering::SeqCst);
                    Err(weft_registry::descriptor::DisposeError::new(
                        "resource refused to close",
                    ))
                })
                .build()
                .unwrap(),
        )
        .register(
            ComponentDescriptor::builder()
                .id("healthy")
                .scope(ScopeKind::Session)
                .produce(|_| Ok(Helper))
                .dispose_instance(move |_| {
                    healthy_counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    container.start_scope(ScopeKind::Session).unwrap();
    container
        .lookup::<SessionThing>(&QualifierSet::new())
        .unwrap()
        .current()
        .unwrap();
    container
        .lookup::<Helper>(&QualifierSet::new())
        .unwrap()
        .current()
        .unwrap();

    // The failing disposer does not stop the healthy one; the aggregate
    // failure is reported once cleanup completes.
    let err = container.end_scope(ScopeKind::Session).unwrap_err();
    assert_eq!(disposals.load(Ordering::SeqCst), 2);
    assert!(err.to_string().contains("1 teardown failure"));
}
