// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use anyhow::Result;
use vellum::*;

#[test]
fn serialize_number() -> Result<()> {
    // Integers are serialized without a fractional part.
    assert_eq!(serde_json::to_string(&Value::from(1))?, "1");
    assert_eq!(serde_json::to_string(&Value::from(-1))?, "-1");

    assert_eq!(serde_json::to_string(&Value::from(1.1))?, "1.1");
    assert_eq!(serde_json::to_string(&Value::from(-1.1))?, "-1.1");

    Ok(())
}

#[test]
fn serialize_string() -> Result<()> {
    assert_eq!(
        Value::String("Hello, World\n".into()).to_json_str()?,
        "\"Hello, World\\n\""
    );
    Ok(())
}

#[test]
fn serialize_bytes() -> Result<()> {
    assert_eq!(serde_json::to_string(&Value::from(b"hi".to_vec()))?, "[104,105]");
    Ok(())
}

#[test]
fn constructors() -> Result<()> {
    assert_eq!(Value::new_object(), Value::from_json_str("{}")?);
    assert_eq!(Value::new_array(), Value::from_json_str("[]")?);
    assert_eq!(Value::Null, Value::from_json_str("null")?);
    assert_eq!(Value::from(true), Value::from_json_str("true")?);
    assert_eq!(
        Value::from(vec![Value::from(1), Value::from("a")]),
        Value::from_json_str(r#"[1, "a"]"#)?
    );
    Ok(())
}

#[test]
fn objects_keep_their_order() -> Result<()> {
    let v = Value::from_json_str(r#"{"b": 1, "a": 2, "c": {"z": 0, "y": 1}}"#)?;
    assert_eq!(serde_json::to_string(&v)?, r#"{"b":1,"a":2,"c":{"z":0,"y":1}}"#);

    let keys: Vec<&str> = v.as_object()?.keys().map(|k| &**k).collect();
    assert_eq!(keys, vec!["b", "a", "c"]);
    Ok(())
}

#[cfg(feature = "yaml")]
#[test]
fn yaml_scalar_keys() -> Result<()> {
    let v = Value::from_yaml_str("1: one\ntrue: yes\nname: x\n")?;
    let keys: Vec<&str> = v.as_object()?.keys().map(|k| &**k).collect();
    assert_eq!(keys, vec!["1", "true", "name"]);
    assert!(Value::from_yaml_str("[1, 2]: pair").is_err());
    Ok(())
}

#[test]
fn numbers_compare_by_value() {
    assert_eq!(Value::from(1), Value::from(1.0));
    assert_ne!(Value::from(1), Value::from(1.5));
    assert_ne!(Value::from(1), Value::from("1"));
    assert_eq!(Value::from(1).kind(), ValueKind::Integer);
    assert_eq!(Value::from(1.0).kind(), ValueKind::Float);
}

#[test]
fn kinds() -> Result<()> {
    let v = Value::from(serde_json::json!({"a": [1, 2.5, "s", null, true, {}]}));
    let kinds: Kinds = v["a"].as_array()?.iter().map(Value::kind).collect();
    assert_eq!(
        kinds,
        Kinds::NUMBER
            .union(Kinds::STRING)
            .union(Kinds::NULL)
            .union(Kinds::BOOLEAN)
            .union(Kinds::OBJECT)
    );
    assert!(!kinds.contains(ValueKind::Bytes));
    assert!(Kinds::INTEGER.is_subset(Kinds::NUMBER));
    assert!(!Kinds::NUMBER.is_subset(Kinds::INTEGER));
    assert!(Kinds::NUMBER.intersects(Kinds::FLOAT));
    assert!(Kinds::STRING.intersection(Kinds::NUMBER).is_empty());

    assert_eq!(Kinds::NUMBER.to_string(), "integer|float");
    assert_eq!(Kinds::ANY.to_string(), "any");
    assert_eq!(ValueKind::Bytes.to_string(), "bytes");
    Ok(())
}

#[test]
fn indexing() -> Result<()> {
    let v = Value::from_json_str(r#"{"a": [10, {"b": "x"}]}"#)?;
    assert_eq!(v["a"][0], Value::from(10));
    assert_eq!(v["a"][1]["b"], Value::from("x"));
    assert_eq!(v["missing"][3], Value::Null);
    assert_eq!(v["a"]["b"], Value::Null);
    Ok(())
}

#[test]
fn mutation_is_copy_on_write() -> Result<()> {
    let original = Value::from_json_str(r#"{"list": [1]}"#)?;
    let mut copy = original.clone();
    copy.as_object_mut()?
        .insert("extra".into(), Value::from("new"));

    let mut list = copy["list"].clone();
    list.as_array_mut()?.push(Value::from(2));

    assert_eq!(original.as_object()?.len(), 1);
    assert_eq!(copy.as_object()?.len(), 2);
    assert_eq!(original["list"], Value::from_json_str("[1]")?);
    assert_eq!(list, Value::from_json_str("[1, 2]")?);
    Ok(())
}

#[test]
fn accessors() -> Result<()> {
    assert!(*Value::from(true).as_bool()?);
    assert_eq!(&**Value::from("s").as_string()?, "s");
    assert_eq!(*Value::from(3).as_number()?, Number::from(3i64));
    assert!(Value::from(3).as_string().is_err());
    assert!(Value::Null.is_null());
    Ok(())
}
