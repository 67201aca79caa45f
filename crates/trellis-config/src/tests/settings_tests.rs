use serde_json::json;

use crate::{Settings, SettingsError};

#[test]
fn merge_prefers_overriding_keys() {
    let mut merged = Settings::new().with("host", "localhost").with("port", 5000);
    let overrides = Settings::new().with("port", 6000);

    merged.merge(&overrides);

    assert_eq!(merged.get_str("host"), Some("localhost"));
    assert_eq!(merged.get_u64("port"), Some(6000));
}

#[test]
fn merge_replaces_nested_mappings_wholesale() {
    let mut base = Settings::new().with("pool", json!({"size": 5, "timeout": 30}));
    base.merge(&Settings::new().with("pool", json!({"size": 10})));

    assert_eq!(base.get("pool"), Some(&json!({"size": 10})));
}

#[test]
fn null_documents_become_empty_settings() {
    let settings = Settings::from_value(serde_json::Value::Null).expect("null converts");
    assert!(settings.is_empty());
}

#[test]
fn sequences_are_not_settings() {
    let error = Settings::from_value(json!([1, 2])).expect_err("sequence rejected");
    assert!(matches!(error, SettingsError::NotAMapping { found: "a sequence" }));
}

#[test]
fn keys_iterate_in_sorted_order() {
    let settings = Settings::new().with("b", 1).with("a", 2).with("c", 3);
    let keys: Vec<&str> = settings.keys().collect();
    assert_eq!(keys, ["a", "b", "c"]);
}
