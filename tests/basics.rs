use ferrous_lifecycle::{
    Blueprint, BoxError, ComponentType, ContainerError, ContainerSettings, DefaultConversionService,
    DuplicatePolicy, InitializingComponent, LifecycleEngine, Resolver, Scope, Shared,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Engine {
    cylinders: i64,
}

#[derive(Default)]
struct Car {
    brand: String,
    top_speed: u32,
    engine: Option<Shared<Engine>>,
}

fn engine_type() -> ComponentType {
    ComponentType::builder::<Engine>()
        .property("cylinders", |e: &mut Engine, v: i64| e.cylinders = v)
        .build()
}

fn car_type() -> ComponentType {
    ComponentType::builder::<Car>()
        .property("brand", |c: &mut Car, v: String| c.brand = v)
        .property("top_speed", |c: &mut Car, v: u32| c.top_speed = v)
        .reference("engine", |c: &mut Car, e: Shared<Engine>| c.engine = Some(e))
        .build()
}

#[test]
fn test_singleton_is_built_once() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();

    let engine = LifecycleEngine::new();
    let ty = ComponentType::builder_with(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Engine::default()
    })
    .build();
    engine.register("engine", Blueprint::new(ty)).unwrap();

    let first = engine.get_bean("engine").unwrap();
    let second = engine.get_bean("engine").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert!(engine.contains_singleton("engine"));
}

#[test]
fn test_prototype_is_built_per_lookup() {
    let engine = LifecycleEngine::new();
    engine
        .register(
            "engine",
            Blueprint::new(engine_type())
                .with_scope(Scope::Prototype)
                .with_literal("cylinders", 8),
        )
        .unwrap();

    let first = engine.get_bean_as::<Engine>("engine").unwrap();
    let second = engine.get_bean_as::<Engine>("engine").unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first.read().cylinders, 8);
    assert_eq!(first.read().cylinders, second.read().cylinders);
    assert!(!engine.contains_singleton("engine"));
}

#[test]
fn test_literals_and_references_are_populated() {
    let engine = LifecycleEngine::new();
    engine
        .register("engine", Blueprint::new(engine_type()).with_literal("cylinders", 12))
        .unwrap();
    engine
        .register(
            "car",
            Blueprint::new(car_type())
                .with_literal("brand", "lamborghini")
                .with_reference("engine", "engine"),
        )
        .unwrap();

    let car = engine.get_bean_as::<Car>("car").unwrap();
    let car = car.read();
    assert_eq!(car.brand, "lamborghini");
    assert_eq!(car.engine.as_ref().unwrap().read().cylinders, 12);

    let shared = engine.get_bean_as::<Engine>("engine").unwrap();
    assert!(Arc::ptr_eq(car.engine.as_ref().unwrap(), &shared));
}

#[test]
fn test_literal_needing_conversion_fails_without_service() {
    let engine = LifecycleEngine::new();
    engine
        .register("car", Blueprint::new(car_type()).with_literal("top_speed", "350"))
        .unwrap();

    let err = engine.get_bean("car").unwrap_err();
    assert!(matches!(err.root_cause(), ContainerError::Conversion { .. }));
}

#[test]
fn test_literal_is_converted_by_conversion_service() {
    let engine = LifecycleEngine::new();
    engine.set_conversion_service(Arc::new(DefaultConversionService::new()));
    engine
        .register("car", Blueprint::new(car_type()).with_literal("top_speed", "350"))
        .unwrap();

    assert_eq!(engine.get_bean_as::<Car>("car").unwrap().read().top_speed, 350);
}

#[test]
fn test_unknown_property_fails_build() {
    let engine = LifecycleEngine::new();
    engine
        .register("car", Blueprint::new(car_type()).with_literal("color", "red"))
        .unwrap();

    match engine.get_bean("car") {
        Err(ContainerError::Build { name, source }) => {
            assert_eq!(name, "car");
            assert!(matches!(*source, ContainerError::UnknownProperty { ref property, .. } if property == "color"));
        }
        other => panic!("expected build error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_missing_reference_is_not_found() {
    let engine = LifecycleEngine::new();
    engine
        .register("car", Blueprint::new(car_type()).with_reference("engine", "v12"))
        .unwrap();

    let err = engine.get_bean("car").unwrap_err();
    assert!(matches!(err.root_cause(), ContainerError::NotFound(name) if name == "v12"));
}

#[test]
fn test_get_bean_as_wrong_type_is_type_mismatch() {
    let engine = LifecycleEngine::new();
    engine.register("engine", Blueprint::new(engine_type())).unwrap();

    assert!(matches!(
        engine.get_bean_as::<Car>("engine"),
        Err(ContainerError::TypeMismatch { .. })
    ));
}

#[test]
fn test_init_contract_runs_before_named_operation() {
    #[derive(Default)]
    struct Pool {
        steps: Vec<&'static str>,
    }

    impl InitializingComponent for Pool {
        fn after_properties_set(&mut self) -> Result<(), BoxError> {
            self.steps.push("contract");
            Ok(())
        }
    }

    let ty = ComponentType::builder::<Pool>()
        .operation("open", |p: &mut Pool| {
            p.steps.push("open");
            Ok(())
        })
        .initializing()
        .build();

    let engine = LifecycleEngine::new();
    engine.register("pool", Blueprint::new(ty).with_init("open")).unwrap();

    assert_eq!(engine.get_bean_as::<Pool>("pool").unwrap().read().steps, vec!["contract", "open"]);
}

#[test]
fn test_init_operation_named_like_contract_runs_once() {
    #[derive(Default)]
    struct Pool {
        inits: u32,
    }

    impl InitializingComponent for Pool {
        fn after_properties_set(&mut self) -> Result<(), BoxError> {
            self.inits += 1;
            Ok(())
        }
    }

    let ty = ComponentType::builder::<Pool>()
        .operation("after_properties_set", |p: &mut Pool| p.after_properties_set())
        .initializing()
        .build();

    let engine = LifecycleEngine::new();
    engine
        .register("pool", Blueprint::new(ty).with_init("after_properties_set"))
        .unwrap();

    assert_eq!(engine.get_bean_as::<Pool>("pool").unwrap().read().inits, 1);
}

#[test]
fn test_undeclared_init_operation_fails() {
    let engine = LifecycleEngine::new();
    engine
        .register("engine", Blueprint::new(engine_type()).with_init("start"))
        .unwrap();

    let err = engine.get_bean("engine").unwrap_err();
    assert!(matches!(err.root_cause(), ContainerError::UnknownOperation { operation, .. } if operation == "start"));
}

#[test]
fn test_failing_init_is_retried_on_next_lookup() {
    let attempts = Arc::new(Mutex::new(0u32));
    let seen = attempts.clone();

    let ty = ComponentType::builder::<Engine>()
        .operation("start", move |_: &mut Engine| {
            let mut n = seen.lock();
            *n += 1;
            if *n == 1 {
                Err("cold start".into())
            } else {
                Ok(())
            }
        })
        .build();

    let engine = LifecycleEngine::new();
    engine.register("engine", Blueprint::new(ty).with_init("start")).unwrap();

    let err = engine.get_bean("engine").unwrap_err();
    assert!(matches!(err.root_cause(), ContainerError::Operation { .. }));
    assert!(!engine.contains_singleton("engine"));

    assert!(engine.get_bean("engine").is_ok());
    assert_eq!(*attempts.lock(), 2);
}

#[test]
fn test_pre_instantiate_skips_lazy_and_prototypes() {
    let engine = LifecycleEngine::new();
    engine.register("eager", Blueprint::new(engine_type())).unwrap();
    engine
        .register("lazy", Blueprint::new(engine_type()).with_lazy(true))
        .unwrap();
    engine
        .register("proto", Blueprint::new(engine_type()).with_scope(Scope::Prototype))
        .unwrap();

    engine.pre_instantiate_singletons().unwrap();

    assert!(engine.contains_singleton("eager"));
    assert!(!engine.contains_singleton("lazy"));
    assert!(!engine.contains_singleton("proto"));

    engine.get_bean("lazy").unwrap();
    assert!(engine.contains_singleton("lazy"));
}

#[test]
fn test_register_singleton_is_served_as_built() {
    let engine = LifecycleEngine::new();
    engine.register_singleton("answer", Arc::new(42u64)).unwrap();

    assert!(engine.contains_singleton("answer"));
    assert_eq!(*engine.get_bean_arc::<u64>("answer").unwrap(), 42);
}

#[test]
fn test_register_singleton_never_replaces_a_built_instance() {
    let engine = LifecycleEngine::new();
    engine.register("engine", Blueprint::new(engine_type())).unwrap();
    let built = engine.get_bean("engine").unwrap();

    let err = engine.register_singleton("engine", Arc::new(5u8)).unwrap_err();
    assert!(matches!(err, ContainerError::DuplicateName(name) if name == "engine"));
    assert!(Arc::ptr_eq(&built, &engine.get_bean("engine").unwrap()));

    engine.register_singleton("answer", Arc::new(42u64)).unwrap();
    assert!(engine.register_singleton("answer", Arc::new(7u64)).is_err());
    assert_eq!(*engine.get_bean_arc::<u64>("answer").unwrap(), 42);
}

#[test]
fn test_register_singleton_respects_reject_policy() {
    let engine = LifecycleEngine::with_settings(
        ContainerSettings::default().with_duplicate_policy(DuplicatePolicy::Reject),
    );
    engine.register("engine", Blueprint::new(engine_type())).unwrap();

    // Not built yet, but the blueprint already owns the name
    let err = engine.register_singleton("engine", Arc::new(5u8)).unwrap_err();
    assert!(matches!(err, ContainerError::DuplicateName(name) if name == "engine"));
    assert!(!engine.contains_singleton("engine"));
    assert!(engine.get_bean_as::<Engine>("engine").is_ok());
}

#[test]
fn test_unknown_name_is_not_found() {
    let engine = LifecycleEngine::new();
    assert!(!engine.contains_blueprint("nothing"));
    assert!(matches!(engine.get_bean("nothing"), Err(ContainerError::NotFound(_))));
    assert!(matches!(engine.get_bean("nothing"), Err(ContainerError::NotFound(_))));

    assert!(!engine.contains_blueprint("nothing"));
    assert!(!engine.contains_singleton("nothing"));
    assert!(engine.blueprint_names().is_empty());
}
