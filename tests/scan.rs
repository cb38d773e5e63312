use ferrous_lifecycle::{
    Blueprint, BlueprintPostProcessor, ComponentMarker, ComponentScanner, ComponentType, ContainerError,
    ContainerSettings, DuplicatePolicy, LifecycleEngine, PlaceholderConfigurer, Properties, Resolver, Scope, Shared,
    TypeCatalog, AUTOWIRED_PROCESSOR,
};

mod services {
    use super::*;

    #[derive(Default)]
    pub struct UserRepository {
        pub table: String,
    }

    #[derive(Default)]
    pub struct UserService {
        pub repository: Option<Shared<UserRepository>>,
        pub audit: Option<Shared<AuditLog>>,
        pub greeting: String,
    }

    #[derive(Default)]
    pub struct AuditLog;

    pub fn register(catalog: &mut TypeCatalog) {
        catalog.add(
            ComponentType::builder::<UserRepository>()
                .property("table", |r: &mut UserRepository, v: String| r.table = v)
                .component(ComponentMarker::default())
                .build(),
        );
        catalog.add(
            ComponentType::builder::<UserService>()
                .autowired("repository", |s: &mut UserService, r: Shared<UserRepository>| {
                    s.repository = Some(r)
                })
                .qualified("audit", "securityAudit", |s: &mut UserService, a: Shared<AuditLog>| {
                    s.audit = Some(a)
                })
                .value("greeting", "hello ${user.name}", |s: &mut UserService, v: String| s.greeting = v)
                .component(ComponentMarker {
                    name: None,
                    scope: Scope::Prototype,
                })
                .build(),
        );
        catalog.add(
            ComponentType::builder::<AuditLog>()
                .component(ComponentMarker {
                    name: Some("securityAudit".to_string()),
                    scope: Scope::Singleton,
                })
                .build(),
        );
    }
}

mod elsewhere {
    #[derive(Default)]
    pub struct Unrelated;
}

use services::{AuditLog, UserRepository, UserService};

fn namespace() -> &'static str {
    std::any::type_name::<UserService>()
        .rsplit_once("::")
        .map(|(ns, _)| ns)
        .unwrap()
}

fn catalog() -> TypeCatalog {
    let mut catalog = TypeCatalog::new();
    services::register(&mut catalog);
    catalog.add(
        ComponentType::builder::<elsewhere::Unrelated>()
            .component(ComponentMarker::default())
            .build(),
    );
    catalog
}

fn scanned_engine() -> LifecycleEngine {
    let engine = LifecycleEngine::new();
    let catalog = catalog();
    let found = ComponentScanner::new(&engine, &catalog).scan(&[namespace()]).unwrap();
    assert_eq!(found, 3);

    let mut props = Properties::new();
    props.set("user.name", "ada");
    PlaceholderConfigurer::new(props).post_process(&engine).unwrap();
    engine
}

#[test]
fn test_scan_registers_marked_types_in_namespace() {
    let engine = scanned_engine();

    assert!(engine.contains_blueprint("userRepository"));
    assert!(engine.contains_blueprint("userService"));
    assert!(engine.contains_blueprint("securityAudit"));
    assert!(!engine.contains_blueprint("unrelated"));
    assert!(engine.blueprint("userService").unwrap().is_prototype());
    assert!(engine.hook_names().contains(&AUTOWIRED_PROCESSOR.to_string()));
}

#[test]
fn test_autowiring_fills_injection_points() {
    let engine = scanned_engine();

    let service = engine.get_bean_as::<UserService>("userService").unwrap();
    let service = service.read();
    let repository = engine.get_bean_as::<UserRepository>("userRepository").unwrap();
    let audit = engine.get_bean_as::<AuditLog>("securityAudit").unwrap();

    assert!(std::sync::Arc::ptr_eq(service.repository.as_ref().unwrap(), &repository));
    assert!(std::sync::Arc::ptr_eq(service.audit.as_ref().unwrap(), &audit));
    assert_eq!(service.greeting, "hello ada");
}

#[test]
fn test_explicit_property_wins_over_injection_point() {
    let engine = scanned_engine();
    engine
        .update_blueprint("userService", |bp| {
            bp.properties_mut()
                .add(ferrous_lifecycle::PropertySpec::literal("greeting", "explicit"));
        })
        .unwrap();

    assert_eq!(engine.get_bean_as::<UserService>("userService").unwrap().read().greeting, "explicit");
}

#[test]
fn test_ambiguous_autowiring_fails() {
    let engine = scanned_engine();
    engine
        .register(
            "archiveRepository",
            Blueprint::new(engine.blueprint("userRepository").unwrap().component_type().clone()),
        )
        .unwrap();

    let err = engine.get_bean("userService").unwrap_err();
    match err.root_cause() {
        ContainerError::Processing { hook, source, .. } => {
            assert_eq!(hook, AUTOWIRED_PROCESSOR);
            assert!(source.to_string().contains("userRepository"));
            assert!(source.to_string().contains("archiveRepository"));
        }
        other => panic!("expected processing error, got {}", other),
    }
}

#[test]
fn test_unresolved_value_expression_fails() {
    let engine = LifecycleEngine::new();
    let catalog = catalog();
    ComponentScanner::new(&engine, &catalog).scan(&[namespace()]).unwrap();
    PlaceholderConfigurer::new(Properties::new()).post_process(&engine).unwrap();

    let err = engine.get_bean("userService").unwrap_err();
    assert!(matches!(err.root_cause(), ContainerError::Processing { .. }));
}

#[test]
fn test_scan_of_unknown_namespace_finds_nothing() {
    let engine = LifecycleEngine::new();
    let catalog = catalog();
    assert_eq!(ComponentScanner::new(&engine, &catalog).scan(&["no::such::module"]).unwrap(), 0);
    assert!(engine.blueprint_names().is_empty());
}

#[test]
fn test_overlapping_namespaces_register_each_type_once() {
    let engine = LifecycleEngine::with_settings(
        ContainerSettings::default().with_duplicate_policy(DuplicatePolicy::Reject),
    );
    let catalog = catalog();
    let (root, _) = namespace().rsplit_once("::").unwrap();

    let found = ComponentScanner::new(&engine, &catalog)
        .scan(&[root, namespace()])
        .unwrap();

    assert_eq!(found, 4);
    assert_eq!(
        engine.blueprint_names(),
        vec!["userRepository", "userService", "securityAudit", "unrelated"]
    );
}
