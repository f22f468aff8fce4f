// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::constraints::handler;
use crate::number::Number;
use crate::registry::{ConstraintDefinition, ConstraintRegistry};
use crate::schema::error::{CompileError, ConstraintFailure};
use crate::schema::{CompileContext, Handler, Mode};
use crate::value::{Kinds, Map, Value, ValueKind};

use std::str::FromStr;
use std::sync::Arc;

pub fn register(m: &mut ConstraintRegistry) {
    m.define(ConstraintDefinition::new(
        "type",
        "must be of type {value}",
        compile_type,
    ));
    m.define(ConstraintDefinition::new(
        "enum",
        "must be one of: {value}",
        compile_enum,
    ));
    m.define(ConstraintDefinition::new(
        "const",
        "must be {value}",
        compile_const,
    ));

    m.define(ConstraintDefinition::new("default", "a default value", metadata));
    m.define(ConstraintDefinition::new("name", "the name of the schema", metadata));
    m.define(ConstraintDefinition::new("description", "a description of the schema", metadata));
    m.define(ConstraintDefinition::new("title", "the title of the schema", metadata));
    m.define(ConstraintDefinition::new("examples", "example values", metadata));
    m.define(ConstraintDefinition::new("deprecated", "whether the schema is deprecated", metadata));
}

/// Compiler for keys that only document the schema.
pub fn metadata(_ctx: &CompileContext<'_>, _value: &Value) -> Result<Option<Handler>, CompileError> {
    Ok(None)
}

fn compile_type(ctx: &CompileContext<'_>, value: &Value) -> Result<Option<Handler>, CompileError> {
    let kinds = ctx.kinds(value)?;
    Ok(handler(move |instance, mode, _partial| {
        if kinds.contains(instance.kind()) {
            return Ok(instance);
        }
        match mode {
            Mode::Validate if is_integral_float(kinds, &instance) => Ok(instance),
            Mode::Validate => Err(ConstraintFailure::new(format!(
                "must be of type {kinds}, got {}",
                instance.kind()
            ))),
            Mode::Convert => coerce(instance, kinds),
        }
    }))
}

// 3.0 is an acceptable integer.
fn is_integral_float(kinds: Kinds, instance: &Value) -> bool {
    match instance {
        Value::Number(n @ Number::Float(_)) => {
            kinds.contains(ValueKind::Integer) && n.as_i64().is_some()
        }
        _ => false,
    }
}

/// Convert `instance` to the first kind in `kinds` that accepts it.
pub fn coerce(instance: Value, kinds: Kinds) -> Result<Value, ConstraintFailure> {
    const ORDER: [ValueKind; 8] = [
        ValueKind::Integer,
        ValueKind::Float,
        ValueKind::String,
        ValueKind::Boolean,
        ValueKind::Bytes,
        ValueKind::Array,
        ValueKind::Object,
        ValueKind::Null,
    ];
    if kinds.contains(instance.kind()) {
        return Ok(instance);
    }
    ORDER
        .iter()
        .filter(|k| kinds.contains(**k))
        .find_map(|k| coerce_to(&instance, *k))
        .ok_or_else(|| {
            ConstraintFailure::new(format!(
                "cannot convert {} `{instance}` to {kinds}",
                instance.kind()
            ))
        })
}

fn coerce_to(instance: &Value, kind: ValueKind) -> Option<Value> {
    match (kind, instance) {
        (ValueKind::Integer, Value::Number(n)) => n.truncate().ok().map(Value::from),
        (ValueKind::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
        (ValueKind::Integer, Value::Bool(b)) => Some(Value::from(i64::from(*b))),

        (ValueKind::Float, Value::Number(n)) => Some(Value::from(n.as_f64())),
        (ValueKind::Float, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Value::from),
        (ValueKind::Float, Value::Bool(b)) => Some(Value::from(if *b { 1.0 } else { 0.0 })),

        (ValueKind::String, Value::Bool(b)) => Some(Value::from(b.to_string())),
        (ValueKind::String, Value::Number(n)) => Some(Value::from(n.to_string())),
        (ValueKind::String, Value::Bytes(b)) => {
            std::str::from_utf8(b).ok().map(Value::from)
        }

        (ValueKind::Boolean, Value::Number(n)) => Some(Value::from(!n.is_zero())),
        (ValueKind::Boolean, Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(Value::from(true)),
            "false" | "no" | "off" | "0" => Some(Value::from(false)),
            _ => None,
        },

        (ValueKind::Bytes, Value::String(s)) => Some(Value::from(s.as_bytes().to_vec())),
        (ValueKind::Bytes, Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::Number(n) => n.as_i64().and_then(|i| u8::try_from(i).ok()),
                _ => None,
            })
            .collect::<Option<Vec<u8>>>()
            .map(Value::from),

        (ValueKind::Array, Value::Bytes(b)) => Some(Value::from(
            b.iter().map(|x| Value::from(i64::from(*x))).collect::<Vec<_>>(),
        )),

        (ValueKind::Object, Value::Array(items)) => items
            .iter()
            .map(|pair| match pair {
                Value::Array(kv) if kv.len() == 2 => match &kv[0] {
                    Value::String(k) => Some((k.clone(), kv[1].clone())),
                    _ => None,
                },
                _ => None,
            })
            .collect::<Option<Map>>()
            .map(Value::from),

        _ => None,
    }
}

fn compile_enum(ctx: &CompileContext<'_>, value: &Value) -> Result<Option<Handler>, CompileError> {
    let Value::Array(choices) = value else {
        return Err(ctx.malformed("expected a list of values"));
    };
    let choices = choices.clone();
    Ok(handler(move |instance, _mode, _partial| {
        if choices.contains(&instance) {
            Ok(instance)
        } else {
            Err(ConstraintFailure::new(format!(
                "{instance} is not one of {}",
                Value::Array(choices.clone())
            )))
        }
    }))
}

fn compile_const(_ctx: &CompileContext<'_>, value: &Value) -> Result<Option<Handler>, CompileError> {
    let expected = value.clone();
    Ok(handler(move |instance, mode, _partial| match mode {
        Mode::Convert => Ok(expected.clone()),
        Mode::Validate if instance == expected => Ok(instance),
        Mode::Validate => Err(ConstraintFailure::new(format!("must be {expected}"))),
    }))
}

/// Parse a number from a constraint value, accepting numeric strings.
pub(crate) fn number_arg(ctx: &CompileContext<'_>, value: &Value) -> Result<Number, CompileError> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::String(s) => {
            Number::from_str(s.trim()).map_err(|_| ctx.malformed(format!("`{s}` is not a number")))
        }
        other => Err(ctx.malformed(format!("expected a number, got {}", other.kind()))),
    }
}

/// A non-negative integer constraint value such as a length or count.
pub(crate) fn count_arg(ctx: &CompileContext<'_>, value: &Value) -> Result<usize, CompileError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|u| usize::try_from(u).ok())
            .ok_or_else(|| ctx.malformed(format!("expected a non-negative integer, got {n}"))),
        other => Err(ctx.malformed(format!(
            "expected a non-negative integer, got {}",
            other.kind()
        ))),
    }
}

/// A list of strings, e.g. required keys.
pub(crate) fn names_arg(
    ctx: &CompileContext<'_>,
    value: &Value,
) -> Result<Vec<Arc<str>>, CompileError> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.clone()),
                other => Err(ctx.malformed(format!("`{other}` is not a key name"))),
            })
            .collect(),
        other => Err(ctx.malformed(format!("expected a list of names, got {}", other.kind()))),
    }
}
