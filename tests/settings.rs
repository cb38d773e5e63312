use ferrous_lifecycle::{ContainerError, ContainerSettings, DuplicatePolicy, LifecycleEngine};
use serial_test::serial;
use std::env;

const KEYS: [&str; 3] = [
    "FERROUS_LIFECYCLE_DUPLICATE_POLICY",
    "FERROUS_LIFECYCLE_ALLOW_CIRCULAR_REFERENCES",
    "FERROUS_LIFECYCLE_MAX_CREATION_DEPTH",
];

fn clear_env() {
    for key in KEYS {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_env_defaults_when_unset() {
    clear_env();
    assert_eq!(ContainerSettings::from_env().unwrap(), ContainerSettings::default());
}

#[test]
#[serial]
fn test_env_overrides() {
    clear_env();
    env::set_var("FERROUS_LIFECYCLE_DUPLICATE_POLICY", "reject");
    env::set_var("FERROUS_LIFECYCLE_ALLOW_CIRCULAR_REFERENCES", "false");
    env::set_var("FERROUS_LIFECYCLE_MAX_CREATION_DEPTH", "32");

    let settings = ContainerSettings::from_env().unwrap();
    clear_env();

    assert_eq!(settings.duplicate_policy, DuplicatePolicy::Reject);
    assert!(!settings.allow_circular_references);
    assert_eq!(settings.max_creation_depth, 32);

    let engine = LifecycleEngine::with_settings(settings);
    assert_eq!(engine.settings().max_creation_depth, 32);
}

#[test]
#[serial]
fn test_env_bad_value_is_config_error() {
    clear_env();
    env::set_var("FERROUS_LIFECYCLE_MAX_CREATION_DEPTH", "deep");
    let result = ContainerSettings::from_env();
    clear_env();

    assert!(matches!(result, Err(ContainerError::Config(_))));
}

#[cfg(feature = "config")]
#[test]
fn test_settings_documents() {
    let json = ContainerSettings::from_json_str(r#"{ "duplicate_policy": "reject" }"#).unwrap();
    assert_eq!(json.duplicate_policy, DuplicatePolicy::Reject);
    assert_eq!(json.max_creation_depth, 1024);

    let yaml = ContainerSettings::from_yaml_str("allow_circular_references: false\nmax_creation_depth: 8\n").unwrap();
    assert!(!yaml.allow_circular_references);
    assert_eq!(yaml.max_creation_depth, 8);

    assert!(ContainerSettings::from_json_str(r#"{ "duplicate_policy": "sometimes" }"#).is_err());
}
