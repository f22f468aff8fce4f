// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::unwrap_used, clippy::expect_used)] // dialect tests unwrap to assert outcomes

use anyhow::Result;
use serde_json::json;
use vellum::*;

// The same schema written in both dialects.
fn pairs() -> Vec<(serde_json::Value, serde_json::Value)> {
    vec![
        (
            json!({"type": "int", "minimum": 0, "exclusive_maximum": 10}),
            json!({"type": "integer", "minimum": 0, "exclusiveMaximum": 10}),
        ),
        (
            json!({"type": "str", "min_length": 2, "pattern": "^[a-z]+$"}),
            json!({"type": "string", "minLength": 2, "pattern": "^[a-z]+$"}),
        ),
        (
            json!({
                "type": "dict",
                "entries": {"id": {"type": "int"}, "tags": {"type": "list", "unique_items": true}},
                "required": ["id"],
                "additional_entries": false,
            }),
            json!({
                "type": "object",
                "properties": {"id": {"type": "integer"}, "tags": {"type": "array", "uniqueItems": true}},
                "required": ["id"],
                "additionalProperties": false,
            }),
        ),
        (
            json!({"any_of": [{"type": "str"}, {"type": "list", "max_items": 1}]}),
            json!({"anyOf": [{"type": "string"}, {"type": "array", "maxItems": 1}]}),
        ),
        (
            json!({"type": "number", "if": {"minimum": 0}, "then": {"multiple_of": 2}, "else": {"not": {"const": -1}}}),
            json!({"type": "number", "if": {"minimum": 0}, "then": {"multipleOf": 2}, "else": {"not": {"const": -1}}}),
        ),
    ]
}

fn instances() -> Vec<Value> {
    [
        json!(null),
        json!(true),
        json!(-1),
        json!(0),
        json!(3),
        json!(4),
        json!(12),
        json!(2.5),
        json!("a"),
        json!("ab"),
        json!("Ab"),
        json!([]),
        json!([1]),
        json!([1, 1]),
        json!({}),
        json!({"id": 1}),
        json!({"id": "1"}),
        json!({"id": 1, "tags": [1, 2]}),
        json!({"id": 1, "tags": [1, 1]}),
        json!({"id": 1, "extra": 0}),
    ]
    .into_iter()
    .map(Value::from)
    .collect()
}

#[test]
fn dialects_agree() -> Result<()> {
    let native = Environment::native();
    let json_schema = Environment::json_schema();
    for (native_raw, json_raw) in pairs() {
        // JSON Schema is lenient; compile the native side the same way.
        let a = native.schema_with_strictness(native_raw, None, false)?;
        let b = json_schema.schema(json_raw, None)?;
        for instance in instances() {
            assert_eq!(
                a.is_valid(&instance),
                b.is_valid(&instance),
                "dialects disagree on {instance} for {}",
                a.raw()
            );
            assert_eq!(
                a.convert(instance.clone(), false).ok(),
                b.convert(instance.clone(), false).ok(),
                "dialects convert {instance} differently for {}",
                a.raw()
            );
        }
    }
    Ok(())
}

#[test]
fn constraint_names_differ_only_in_spelling() {
    let native = Environment::native().settings();
    let json_schema = Environment::json_schema().settings();
    let inflect = Environment::native().inflection();

    for name in json_schema.constraints().names() {
        let definition = json_schema.constraints().get(&name).unwrap();
        let base = native
            .constraints()
            .get(&inflect(&name))
            .or_else(|| {
                // Renamed keywords keep their base spelling as an alias.
                json_schema
                    .constraints()
                    .aliases()
                    .iter()
                    .find(|(_, public)| ***public == *name)
                    .and_then(|(alias, _)| native.constraints().get(&inflect(alias)))
            })
            .unwrap_or_else(|| panic!("{name} has no native counterpart"));
        assert_eq!(definition.applicable_kinds(), base.applicable_kinds(), "{name}");
    }
}

#[test]
fn custom_dialect() -> Result<()> {
    let constraints = Environment::native().settings().constraints().clone_with(
        Some(&["type", "maximum", "minimum", "items"][..]),
        &[("upper", "maximum"), ("lower", "minimum")],
        Some(inflection::underscore),
    );
    let mut primitives = PrimitiveTypes::new();
    primitives.insert("whole", Kinds::INTEGER);
    primitives.insert("seq", Kinds::ARRAY);

    let env = Environment::new(
        "bounded",
        std::sync::Arc::new(constraints),
        primitives,
        EnvironmentConfig {
            strict: true,
            ..EnvironmentConfig::default()
        },
    );
    let schema = env.schema(
        json!({"type": "seq", "items": {"type": "whole", "lower": 1, "upper": 3}}),
        None,
    )?;
    assert!(schema.is_valid(&Value::from(json!([1, 2, 3]))));
    assert!(!schema.is_valid(&Value::from(json!([0]))));
    assert_eq!(
        schema.convert(Value::from(json!([0, "9"])), false)?,
        Value::from(json!([1, 3]))
    );

    // Only the projected constraints exist.
    assert!(matches!(
        env.schema(json!({"max_length": 3}), None),
        Err(Error::Compile(CompileError::UnknownConstraint { .. }))
    ));
    Ok(())
}
