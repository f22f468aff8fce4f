// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::pattern_type_mismatch
)] // validate tests unwrap/panic to assert outcomes

use crate::environment::Environment;
use crate::schema::error::{format_path, FailureKind, PathSegment};
use crate::schema::Schema;
use crate::value::Value;

use serde_json::json;

fn native(raw: serde_json::Value) -> Schema {
    Environment::native().schema(raw, None).unwrap()
}

fn json_schema(raw: serde_json::Value) -> Schema {
    Environment::json_schema().schema(raw, None).unwrap()
}

fn valid(schema: &Schema, instance: serde_json::Value) -> bool {
    schema.validate(&Value::from(instance), false).success()
}

fn leaf_paths(schema: &Schema, instance: serde_json::Value) -> Vec<String> {
    schema
        .validate(&Value::from(instance), false)
        .failures()
        .iter()
        .map(|(path, _)| format_path(path))
        .collect()
}

#[test]
fn scenario_bounded_integer() {
    let schema = native(json!({"type": "int", "maximum": 5}));
    assert!(!valid(&schema, json!(10)));
    assert!(valid(&schema, json!(5)));
    assert!(valid(&schema, json!(-3)));
}

#[test]
fn scenario_pattern() {
    let schema = native(json!({"type": "str", "pattern": "^[0-9]{3}-[0-9]{4}$"}));
    assert!(valid(&schema, json!("555-1212")));
    assert!(!valid(&schema, json!("abc")));
}

#[test]
fn scenario_positional_items() {
    let schema = native(json!({
        "items": [{"const": 1}, {"const": 2}],
        "additional_items": false,
    }));
    assert!(valid(&schema, json!([1, 2])));
    assert!(!valid(&schema, json!([1, 2, 3])));
    assert!(!valid(&schema, json!([2, 1])));
    assert!(!valid(&schema, json!([1])));
    assert_eq!(leaf_paths(&schema, json!([1, 2, 3])), vec!["items/[2]"]);
}

#[test]
fn scenario_required_entries() {
    let schema = native(json!({
        "entries": {"name": {"type": "str"}},
        "required": ["name"],
    }));
    assert!(!valid(&schema, json!({})));
    assert!(valid(&schema, json!({"name": "x"})));
    assert!(!valid(&schema, json!({"name": 1})));
    assert_eq!(
        leaf_paths(&schema, json!({"name": 1})),
        vec!["entries/{name}/type"]
    );
}

#[test]
fn scenario_if_then_else() {
    let schema = native(json!({
        "if": {"maximum": 4},
        "then": {"multiple_of": 2},
        "else": {"multiple_of": 3},
    }));
    assert!(valid(&schema, json!(4)));
    assert!(!valid(&schema, json!(5)));
    assert!(valid(&schema, json!(6)));
    assert!(!valid(&schema, json!(3)));
    assert_eq!(leaf_paths(&schema, json!(5)), vec!["if/else/multiple_of"]);
    assert_eq!(leaf_paths(&schema, json!(3)), vec!["if/then/multiple_of"]);

    let result = schema.validate(&Value::from(5), false);
    let failure = result.error("if").unwrap();
    assert_eq!(
        failure.message,
        "'else' subschema does not validate and must"
    );
}

#[test]
fn if_without_branch_passes_through() {
    let schema = native(json!({"if": {"maximum": 4}, "then": {"multiple_of": 2}}));
    assert!(valid(&schema, json!(7)));
    assert!(!valid(&schema, json!(3)));
}

#[test]
fn partial_suppresses_presence() {
    let schema = native(json!({"required": ["a"]}));
    assert!(schema.validate(&Value::from(json!({})), true).success());
    assert!(!schema.validate(&Value::from(json!({})), false).success());

    let deps = native(json!({"dependencies": {"a": ["b"]}}));
    assert!(deps.validate(&Value::from(json!({"a": 1})), true).success());
    assert!(!deps.validate(&Value::from(json!({"a": 1})), false).success());
    assert!(deps.validate(&Value::from(json!({"b": 1})), false).success());
}

#[test]
fn partial_reaches_nested_schemas() {
    let schema = native(json!({
        "entries": {"inner": {"required": ["x"]}},
    }));
    let instance = Value::from(json!({"inner": {}}));
    assert!(schema.validate(&instance, true).success());
    assert!(!schema.validate(&instance, false).success());
}

#[test]
fn one_of_requires_exactly_one() {
    let schema = json_schema(json!({
        "oneOf": [{"type": "integer"}, {"minimum": 0}],
    }));
    // Both.
    assert!(!valid(&schema, json!(5)));
    // First only.
    assert!(valid(&schema, json!(-1)));
    // Second only.
    assert!(valid(&schema, json!(1.5)));
    // Neither.
    assert!(!valid(&schema, json!(-1.5)));
}

#[test]
fn any_of_and_all_of() {
    let any = native(json!({"any_of": [{"type": "str"}, {"type": "int"}]}));
    assert!(valid(&any, json!("x")));
    assert!(valid(&any, json!(1)));
    assert!(!valid(&any, json!(true)));
    assert_eq!(
        leaf_paths(&any, json!(true)),
        vec!["any_of/[0]/type", "any_of/[1]/type"]
    );

    let all = native(json!({"all_of": [{"minimum": 0}, {"maximum": 10}, {"multiple_of": 4}]}));
    assert!(valid(&all, json!(8)));
    // Every failing branch is reported.
    assert_eq!(
        leaf_paths(&all, json!(13)),
        vec!["all_of/[1]/maximum", "all_of/[2]/multiple_of"]
    );
}

#[test]
fn not_inverts() {
    let schema = native(json!({"not": {"type": "str"}}));
    assert!(valid(&schema, json!(1)));
    assert!(!valid(&schema, json!("x")));
}

#[test]
fn boolean_sub_schemas() {
    let accept = native(json!({"items": true}));
    assert!(valid(&accept, json!([1, "a", null])));

    let reject = native(json!({"additional_entries": false, "entries": {"a": true}}));
    assert!(valid(&reject, json!({"a": 1})));
    assert!(!valid(&reject, json!({"a": 1, "b": 2})));
    assert_eq!(
        leaf_paths(&reject, json!({"a": 1, "b": 2})),
        vec!["additional_entries/{b}"]
    );
}

#[test]
fn pattern_and_additional_entries() {
    let schema = json_schema(json!({
        "type": "object",
        "properties": {"id": {"type": "integer"}},
        "patternProperties": {"^x-": {"type": "string"}, "^x-n": {"maxLength": 2}},
        "additionalProperties": {"type": "boolean"},
    }));
    assert!(valid(&schema, json!({"id": 1, "x-a": "s", "flag": true})));
    assert!(!valid(&schema, json!({"x-a": 1})));
    assert!(!valid(&schema, json!({"flag": "yes"})));
    // A key matching two patterns is checked against both.
    assert!(valid(&schema, json!({"x-n": "ab"})));
    assert!(!valid(&schema, json!({"x-n": "abc"})));
}

#[test]
fn dependency_schemas() {
    let schema = native(json!({
        "dependencies": {
            "card": {"required": ["billing"]},
            "ship": ["address", "zip"],
        },
    }));
    assert!(valid(&schema, json!({"card": 1, "billing": 2})));
    assert!(!valid(&schema, json!({"card": 1})));
    assert_eq!(
        leaf_paths(&schema, json!({"card": 1, "ship": true})),
        vec!["dependencies/{card}/required", "dependencies/{ship}"]
    );
}

#[test]
fn entry_names() {
    let schema = json_schema(json!({"propertyNames": {"pattern": "^[a-z]+$"}}));
    assert!(valid(&schema, json!({"abc": 1})));
    assert!(!valid(&schema, json!({"Abc": 1})));
}

#[test]
fn array_constraints() {
    let schema = native(json!({
        "type": "list",
        "min_items": 1,
        "max_items": 3,
        "unique_items": true,
        "contains": {"type": "str"},
    }));
    assert!(valid(&schema, json!([1, "a"])));
    assert!(!valid(&schema, json!([])));
    assert!(!valid(&schema, json!([1, 2, 3, "a"])));
    assert!(!valid(&schema, json!(["a", "a"])));
    assert!(!valid(&schema, json!([1, 2])));
}

#[test]
fn object_size() {
    let schema = json_schema(json!({"minProperties": 1, "maxProperties": 2}));
    assert!(valid(&schema, json!({"a": 1})));
    assert!(!valid(&schema, json!({})));
    assert!(!valid(&schema, json!({"a": 1, "b": 2, "c": 3})));
}

#[test]
fn enum_and_const() {
    let schema = native(json!({"enum": ["red", "green", 1]}));
    assert!(valid(&schema, json!("red")));
    assert!(valid(&schema, json!(1.0)));
    assert!(!valid(&schema, json!("blue")));

    let schema = native(json!({"const": {"a": [1, 2]}}));
    assert!(valid(&schema, json!({"a": [1, 2]})));
    assert!(!valid(&schema, json!({"a": [2, 1]})));
}

#[test]
fn exclusive_bounds() {
    let numeric = json_schema(json!({"exclusiveMaximum": 5, "exclusiveMinimum": 1}));
    assert!(valid(&numeric, json!(3)));
    assert!(!valid(&numeric, json!(5)));
    assert!(!valid(&numeric, json!(1)));

    let flagged = json_schema(json!({"maximum": 5, "exclusiveMaximum": true}));
    assert!(valid(&flagged, json!(4.9)));
    assert!(!valid(&flagged, json!(5)));
}

#[test]
fn integral_floats_are_integers() {
    let schema = json_schema(json!({"type": "integer"}));
    assert!(valid(&schema, json!(3.0)));
    assert!(!valid(&schema, json!(3.5)));
}

#[test]
fn formats() {
    let schema = json_schema(json!({"type": "string", "format": "date-time"}));
    assert!(valid(&schema, json!("2024-02-29T12:30:00Z")));
    assert!(!valid(&schema, json!("yesterday")));

    let schema = native(json!({"format": "ipv4"}));
    assert!(valid(&schema, json!("10.0.0.1")));
    assert!(!valid(&schema, json!("10.0.0.256")));
}

#[test]
fn type_failure_is_terminal() {
    let schema = native(json!({"type": "str", "min_length": 2, "max_length": 3}));
    let result = schema.validate(&Value::from(7), false);
    assert!(!result.success());
    assert_eq!(result.errors().len(), 1);
    assert!(result.error("type").is_some());

    // Other failures do not stop the scan.
    let result = schema.validate(&Value::from("abcd"), false);
    assert_eq!(result.errors().len(), 3);
    assert!(result.error("min_length").is_none());
    assert!(result.error("max_length").is_some());
}

#[test]
fn undeclared_kinds_are_checked_at_runtime() {
    // Lenient: constraints for other kinds pass.
    let lenient = json_schema(json!({"maxLength": 2, "maximum": 3}));
    assert!(valid(&lenient, json!("ab")));
    assert!(valid(&lenient, json!(3)));
    assert!(valid(&lenient, json!(true)));
    assert!(!valid(&lenient, json!("abc")));

    // Strict: an inapplicable instance is a failure of its own kind.
    let strict = native(json!({"max_length": 2}));
    let result = strict.validate(&Value::from(1), false);
    let failure = result.error("max_length").unwrap();
    assert_eq!(failure.kind, FailureKind::NotApplicable);
    assert!(failure.is_not_applicable());
}

#[test]
fn failures_are_attributed() {
    let schema = Environment::native()
        .schema(
            json!({"entries": {"port": {"type": "int", "maximum": 65535}}}),
            Some("service"),
        )
        .unwrap();
    let result = schema.validate(&Value::from(json!({"port": 70000})), false);
    assert!(!result.success());

    let failure = result.error("entries").unwrap();
    assert_eq!(failure.constraint.as_deref(), Some("entries"));
    assert_eq!(failure.schema.as_deref(), Some("service"));
    assert_eq!(failure.path, vec![PathSegment::Constraint("entries".into())]);
    assert!(failure.is_composite());

    let failures = result.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(format_path(&failures[0].0), "entries/{port}/maximum");
    assert_eq!(failures[0].1, "must be no larger than 65535");

    let rendered = result.to_string();
    assert!(rendered.starts_with("invalid against schema service"));
    assert!(rendered.contains("entries/{port}/maximum: must be no larger than 65535"));
}

#[test]
fn result_serializes() {
    let schema = Environment::native()
        .schema(json!({"type": "int", "maximum": 5}), Some("small"))
        .unwrap();
    let result = schema.validate(&Value::from(7), false);
    let report = serde_json::to_value(&result).unwrap();
    assert_eq!(report["schema"], json!("small"));
    assert_eq!(report["success"], json!(false));
    assert_eq!(report["errors"]["type"], json!(null));
    assert_eq!(report["errors"]["maximum"]["path"], json!(["maximum"]));
    assert_eq!(report["errors"]["maximum"]["kind"], json!("failed"));
}

#[test]
fn schemas_are_shared_across_threads() {
    let schema = native(json!({"type": "int", "minimum": 0, "maximum": 100}));
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let schema = schema.clone();
            std::thread::spawn(move || {
                (0..50).all(|i| {
                    let n = t * 50 + i;
                    schema.is_valid(&Value::from(n)) == (n <= 100)
                })
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
