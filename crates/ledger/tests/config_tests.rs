use std::collections::HashMap;

use ledger::{ConfigError, SystemConfig, SystemConfigLoader};

#[test]
fn config_loader_accepts_valid_keys() {
    let input = r#"
[store]
url = "https://db.example.test"
key = "anon"
timeout_ms = 2500
[security]
admin_password = "riichi"
"#;
    let config = SystemConfigLoader::from_str(input).expect("config");
    assert_eq!(config.get_string("store.url"), "https://db.example.test");
    assert_eq!(config.get_number("store.timeout_ms"), 2500);
    assert_eq!(config.get_string("security.admin_password"), "riichi");
}

#[test]
fn missing_keys_fall_back_to_defaults() {
    let config = SystemConfig::default();
    assert_eq!(config.get_string("store.url"), "");
    assert_eq!(config.get_string("security.admin_password"), "admin123");
    assert_eq!(config.get_number("throttle.cooldown_seconds"), 600);
}

#[test]
fn config_loader_rejects_unknown_key() {
    let input = r#"
unknown = { value = "x" }
"#;
    let err = SystemConfigLoader::from_str(input).expect_err("error");
    match err {
        ConfigError::UnknownKey(key) => assert_eq!(key, "unknown.value"),
        _ => panic!("expected unknown key error"),
    }
}

#[test]
fn config_loader_rejects_type_mismatch() {
    let input = r#"
throttle = { cooldown_seconds = "ten minutes" }
"#;
    let err = SystemConfigLoader::from_str(input).expect_err("error");
    match err {
        ConfigError::TypeMismatch(key, _) => assert_eq!(key, "throttle.cooldown_seconds"),
        _ => panic!("expected type mismatch"),
    }
}

#[test]
fn environment_overrides_file_values() {
    let mut config = SystemConfigLoader::from_str("security = { admin_password = \"file\" }")
        .expect("config");
    let env: HashMap<&str, &str> = HashMap::from([
        ("ADMIN_PASSWORD", "from-env"),
        ("SUPABASE_URL", "https://env.example.test"),
    ]);
    config
        .apply_env(|key| env.get(key).map(|value| value.to_string()))
        .expect("env");
    assert_eq!(config.get_string("security.admin_password"), "from-env");
    assert_eq!(config.get_string("store.url"), "https://env.example.test");
    assert_eq!(config.get_string("store.key"), "");
}

#[test]
fn environment_numbers_are_validated() {
    let mut config = SystemConfig::default();
    let err = config
        .apply_env(|key| (key == "SUB_ADMIN_COOLDOWN_SECONDS").then(|| "soon".to_string()))
        .expect_err("error");
    assert!(matches!(err, ConfigError::TypeMismatch(key, _) if key == "SUB_ADMIN_COOLDOWN_SECONDS"));
}
