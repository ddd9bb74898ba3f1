//! Introspection reads over the registry tables: classes, shared instances,
//! member and static function keys, and metadata blobs.

mod common;

use std::collections::HashSet;

use common::register_fixtures;
use serde_json::Value;
use tether_engine::host;

fn parse_array(json: &str) -> HashSet<String> {
    let items: Vec<String> = serde_json::from_str(json).expect("JSON array of strings");
    items.into_iter().collect()
}

#[test]
fn classes_are_enumerable() {
    register_fixtures();
    let classes = parse_array(&host::get_classes());
    assert!(classes.contains("Bar"));
    assert!(classes.contains("TestRack"));
}

#[test]
fn member_functions_list_full_keys() {
    register_fixtures();
    let members = parse_array(&host::get_member_functions("Bar"));
    let expected: HashSet<String> = [
        "addBottle-string:string:string",
        "restock-object",
        "removeBottle-string",
        "getSelection",
        "onAdd-string",
        "onRemove-string",
        "prepareDrink-string",
    ]
    .into_iter()
    .map(str::to_string)
    .collect();
    assert_eq!(members, expected);
}

#[test]
fn static_functions_include_the_synthetic_endpoints() {
    register_fixtures();
    let statics = parse_array(&host::get_static_functions("Bar"));
    for key in [
        "philosophy",
        "__createIsolated__-string",
        "__createShared__-string",
        "__createIsolated__-string:array",
        "__createShared__-string:array",
        "__delete__-string",
    ] {
        assert!(statics.contains(key), "missing {key} in {statics:?}");
    }

    let rack = parse_array(&host::get_static_functions("TestRack"));
    assert_eq!(
        rack,
        ["crazy", "crazy-string"]
            .into_iter()
            .map(str::to_string)
            .collect()
    );
}

#[test]
fn only_shared_instances_are_enumerable() {
    register_fixtures();

    host::call(r#"{"c":"Bar","f":"__createShared__","a":["introspect_shared"]}"#)
        .expect("create shared");
    host::call(r#"{"c":"Bar","f":"__createIsolated__","a":["introspect_isolated"]}"#)
        .expect("create isolated");

    let instances = parse_array(&host::get_instances("Bar"));
    assert!(instances.contains("introspect_shared"));
    assert!(!instances.contains("introspect_isolated"));

    // The isolated instance is callable all the same.
    let response = host::call(r#"{"c":"introspect_isolated","f":"getSelection","a":[]}"#)
        .expect("isolated call");
    assert!(response.contains("\"r\""));

    host::call(r#"{"c":"Bar","f":"__delete__","a":["introspect_shared"]}"#).expect("delete");
    host::call(r#"{"c":"Bar","f":"__delete__","a":["introspect_isolated"]}"#).expect("delete");

    let instances = parse_array(&host::get_instances("Bar"));
    assert!(!instances.contains("introspect_shared"));
}

#[test]
fn meta_data_serves_descriptions() {
    register_fixtures();
    let blob: Value = serde_json::from_str(&host::get_meta_data("Bar")).expect("JSON object");

    let ctor = &blob["__createShared__-string:array"];
    assert_eq!(
        ctor["ret"]["description"],
        Value::String("returns the id of the created instance".into())
    );
    assert_eq!(ctor["params"][0]["name"], Value::String("selection".into()));
    assert_eq!(ctor["params"][0]["optional"], Value::Bool(false));

    let add = &blob["addBottle-string:string:string"];
    assert_eq!(
        add["description"],
        Value::String("Adds a bottle to the selection".into())
    );
    assert_eq!(add["params"][1]["default"], Value::String("n/a".into()));
    assert_eq!(add["params"][1]["optional"], Value::Bool(true));
    assert_eq!(add["ret"]["type"], Value::String("null".into()));

    // Undescribed methods are simply absent; unknown classes yield {}.
    assert!(blob.get("getSelection").is_none());
    assert_eq!(host::get_meta_data("NoSuchClass"), "{}");
}
