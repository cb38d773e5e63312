use ferrous_lifecycle::{
    into_instance, shared, Blueprint, ComponentType, ContainerError, ContainerSettings, LifecycleEngine,
    LifecycleHook, Resolver, Scope, Shared,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct A {
    b: Option<Shared<B>>,
}

#[derive(Default)]
struct B {
    a: Option<Shared<A>>,
}

fn register_pair(engine: &LifecycleEngine, scope: Scope) {
    let a = ComponentType::builder::<A>()
        .reference("b", |a: &mut A, b: Shared<B>| a.b = Some(b))
        .build();
    let b = ComponentType::builder::<B>()
        .reference("a", |b: &mut B, a: Shared<A>| b.a = Some(a))
        .build();
    engine
        .register("a", Blueprint::new(a).with_scope(scope).with_reference("b", "b"))
        .unwrap();
    engine
        .register("b", Blueprint::new(b).with_scope(scope).with_reference("a", "a"))
        .unwrap();
}

#[test]
fn test_singleton_cycle_resolves_to_same_instances() {
    let engine = LifecycleEngine::new();
    register_pair(&engine, Scope::Singleton);

    let a = engine.get_bean_as::<A>("a").unwrap();
    let b = engine.get_bean_as::<B>("b").unwrap();

    assert!(Arc::ptr_eq(a.read().b.as_ref().unwrap(), &b));
    assert!(Arc::ptr_eq(b.read().a.as_ref().unwrap(), &a));
}

#[test]
fn test_singleton_cycle_from_either_end() {
    let engine = LifecycleEngine::new();
    register_pair(&engine, Scope::Singleton);

    let b = engine.get_bean_as::<B>("b").unwrap();
    let a = engine.get_bean_as::<A>("a").unwrap();
    assert!(Arc::ptr_eq(b.read().a.as_ref().unwrap(), &a));
}

#[test]
fn test_self_reference_resolves() {
    #[derive(Default)]
    struct Node {
        next: Option<Shared<Node>>,
    }

    let ty = ComponentType::builder::<Node>()
        .reference("next", |n: &mut Node, next: Shared<Node>| n.next = Some(next))
        .build();
    let engine = LifecycleEngine::new();
    engine.register("node", Blueprint::new(ty).with_reference("next", "node")).unwrap();

    let node = engine.get_bean_as::<Node>("node").unwrap();
    assert!(Arc::ptr_eq(node.read().next.as_ref().unwrap(), &node));
}

#[test]
fn test_prototype_cycle_is_circular_error() {
    let engine = LifecycleEngine::new();
    register_pair(&engine, Scope::Prototype);

    let err = engine.get_bean("a").unwrap_err();
    match err.root_cause() {
        ContainerError::Circular(path) => {
            assert_eq!(path, &vec!["a".to_string(), "b".to_string(), "a".to_string()]);
        }
        other => panic!("expected circular error, got {}", other),
    }
}

#[test]
fn test_cycle_fails_when_circular_references_disabled() {
    let engine = LifecycleEngine::with_settings(ContainerSettings::default().with_circular_references(false));
    register_pair(&engine, Scope::Singleton);

    let err = engine.get_bean("a").unwrap_err();
    assert!(matches!(err.root_cause(), ContainerError::Circular(_)));
    assert!(!engine.contains_singleton("a"));
    assert!(!engine.contains_singleton("b"));
}

#[test]
fn test_deep_chain_exceeds_max_depth() {
    #[derive(Default)]
    struct Link {
        next: Option<Shared<Link>>,
    }

    let ty = ComponentType::builder::<Link>()
        .reference("next", |l: &mut Link, next: Shared<Link>| l.next = Some(next))
        .build();

    let engine = LifecycleEngine::with_settings(ContainerSettings::default().with_max_creation_depth(4));
    for i in 0..8 {
        let mut bp = Blueprint::new(ty.clone());
        if i < 7 {
            bp = bp.with_reference("next", &format!("link{}", i + 1));
        }
        engine.register(&format!("link{}", i), bp).unwrap();
    }

    let err = engine.get_bean("link0").unwrap_err();
    assert!(matches!(err.root_cause(), ContainerError::DepthExceeded(4)));
}

#[test]
fn test_early_reference_hook_runs_once_per_cycle() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let engine = LifecycleEngine::new();
    register_pair(&engine, Scope::Singleton);
    engine.add_hook(LifecycleHook::new("early").early_reference(move |_, instance, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(instance)
    }));

    let a = engine.get_bean_as::<A>("a").unwrap();
    let b = engine.get_bean_as::<B>("b").unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(b.read().a.as_ref().unwrap(), &a));
}

#[test]
fn test_early_reference_wins_over_diverging_init_wrapper() {
    let engine = LifecycleEngine::new();
    register_pair(&engine, Scope::Singleton);
    engine.add_hook(LifecycleHook::new("replace-a").after_init(|_, instance, name| {
        if name == "a" {
            Ok(into_instance(shared(A::default())))
        } else {
            Ok(instance)
        }
    }));

    let a = engine.get_bean_as::<A>("a").unwrap();
    let b = engine.get_bean_as::<B>("b").unwrap();

    // `b` holds the early reference; the cached `a` must be that same one
    assert!(Arc::ptr_eq(b.read().a.as_ref().unwrap(), &a));
    assert!(a.read().b.is_some());
}

#[test]
fn test_unrelated_singleton_promise_is_not_triggered() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let engine = LifecycleEngine::new();
    engine.register("solo", Blueprint::new(ComponentType::of::<A>())).unwrap();
    engine.add_hook(LifecycleHook::new("early").early_reference(move |_, instance, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(instance)
    }));

    engine.get_bean("solo").unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
