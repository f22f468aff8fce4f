// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::constraints::core::{count_arg, metadata};
use crate::constraints::handler;
use crate::registry::{ConstraintDefinition, ConstraintRegistry};
use crate::schema::error::{CompileError, ConstraintFailure, PathSegment};
use crate::schema::{CompileContext, Handler, Mode, SubSchema};
use crate::value::{Kinds, Value};

pub fn register(m: &mut ConstraintRegistry) {
    m.define(
        ConstraintDefinition::new("items", "items must match the given schema: {value}", items)
            .require(Kinds::ARRAY),
    );
    m.define(ConstraintDefinition::new(
        "additional_items",
        "items beyond the positional schemas must match: {value}",
        metadata,
    ));
    m.define(
        ConstraintDefinition::new(
            "max_items",
            "sequence must not have more than {value} items",
            max_items,
        )
        .require(Kinds::ARRAY),
    );
    m.define(
        ConstraintDefinition::new(
            "min_items",
            "sequence must not have less than {value} items",
            min_items,
        )
        .require(Kinds::ARRAY),
    );
    m.define(
        ConstraintDefinition::new(
            "unique_items",
            "sequence must have all unique items",
            unique_items,
        )
        .require(Kinds::ARRAY),
    );
    m.define(
        ConstraintDefinition::new(
            "contains",
            "sequence must contain an item that matches the schema: {value}",
            contains,
        )
        .require(Kinds::ARRAY),
    );
}

fn instance_array(instance: &Value) -> Result<&Vec<Value>, ConstraintFailure> {
    match instance {
        Value::Array(a) => Ok(a),
        other => Err(ConstraintFailure::new(format!(
            "expected an array, got {}",
            other.kind()
        ))),
    }
}

/// How each element of an array is matched.
enum ItemSchemas {
    Each(SubSchema),
    Positional {
        schemas: Vec<SubSchema>,
        additional: SubSchema,
    },
}

impl ItemSchemas {
    fn at(&self, index: usize) -> &SubSchema {
        match self {
            ItemSchemas::Each(s) => s,
            ItemSchemas::Positional {
                schemas,
                additional,
            } => schemas.get(index).unwrap_or(additional),
        }
    }

    fn required_len(&self) -> usize {
        match self {
            ItemSchemas::Each(_) => 0,
            ItemSchemas::Positional { schemas, .. } => schemas.len(),
        }
    }
}

fn items(ctx: &CompileContext<'_>, value: &Value) -> Result<Option<Handler>, CompileError> {
    let policy = match value {
        // An empty list leaves every element to `additional_items`.
        Value::Array(list) => ItemSchemas::Positional {
            schemas: list
                .iter()
                .map(|v| ctx.subschema(v))
                .collect::<Result<_, _>>()?,
            additional: match ctx.get("additional_items") {
                Some(v) => ctx.subschema(v)?,
                None => SubSchema::Accept,
            },
        },
        _ => ItemSchemas::Each(ctx.subschema(value)?),
    };

    Ok(handler(move |instance, mode, partial| {
        let elements = instance_array(&instance)?;
        let required = policy.required_len();
        if elements.len() < required {
            return Err(ConstraintFailure::new(format!(
                "expected at least {required} items, got {}",
                elements.len()
            )));
        }

        match mode {
            Mode::Validate => {
                let errors: Vec<ConstraintFailure> = elements
                    .iter()
                    .enumerate()
                    .filter_map(|(i, item)| {
                        policy
                            .at(i)
                            .check(item, partial)
                            .err()
                            .map(|f| f.prefixed(PathSegment::Index(i)))
                    })
                    .collect();
                if errors.is_empty() {
                    Ok(instance)
                } else {
                    Err(ConstraintFailure::composite(
                        "a sub-schema does not match",
                        errors,
                    ))
                }
            }
            Mode::Convert => {
                let converted = elements
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        policy
                            .at(i)
                            .convert(item.clone(), partial)
                            .map_err(|f| f.prefixed(PathSegment::Index(i)))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::from(converted))
            }
        }
    }))
}

fn size(instance: &Value) -> Result<(usize, &'static str), ConstraintFailure> {
    match instance {
        Value::Array(a) => Ok((a.len(), "items")),
        Value::Object(o) => Ok((o.len(), "entries")),
        other => Err(ConstraintFailure::new(format!(
            "expected a collection, got {}",
            other.kind()
        ))),
    }
}

/// Upper bound on the size of an array or object. Arrays are truncated in
/// convert mode.
pub(crate) fn max_items(
    ctx: &CompileContext<'_>,
    value: &Value,
) -> Result<Option<Handler>, CompileError> {
    let limit = count_arg(ctx, value)?;
    Ok(handler(move |instance, mode, _partial| {
        let (len, noun) = size(&instance)?;
        if len <= limit {
            return Ok(instance);
        }
        match (mode, &instance) {
            (Mode::Convert, Value::Array(a)) => Ok(Value::from(a[..limit].to_vec())),
            _ => Err(ConstraintFailure::new(format!(
                "must not have more than {limit} {noun}"
            ))),
        }
    }))
}

pub(crate) fn min_items(
    ctx: &CompileContext<'_>,
    value: &Value,
) -> Result<Option<Handler>, CompileError> {
    let limit = count_arg(ctx, value)?;
    Ok(handler(move |instance, _mode, _partial| {
        let (len, noun) = size(&instance)?;
        if len >= limit {
            Ok(instance)
        } else {
            Err(ConstraintFailure::new(format!(
                "must not have less than {limit} {noun}"
            )))
        }
    }))
}

fn unique_items(ctx: &CompileContext<'_>, value: &Value) -> Result<Option<Handler>, CompileError> {
    match value {
        Value::Bool(true) => {}
        Value::Bool(false) => return Ok(None),
        _ => return Err(ctx.malformed("expected a boolean")),
    }
    Ok(handler(move |instance, mode, _partial| {
        let elements = instance_array(&instance)?;
        let mut unique: Vec<Value> = Vec::with_capacity(elements.len());
        for item in elements.iter() {
            if !unique.contains(item) {
                unique.push(item.clone());
            }
        }
        if unique.len() == elements.len() {
            return Ok(instance);
        }
        match mode {
            Mode::Convert => Ok(Value::from(unique)),
            Mode::Validate => Err(ConstraintFailure::new("items must be unique")),
        }
    }))
}

fn contains(ctx: &CompileContext<'_>, value: &Value) -> Result<Option<Handler>, CompileError> {
    let schema = ctx.subschema(value)?;
    Ok(handler(move |instance, _mode, partial| {
        if instance_array(&instance)?
            .iter()
            .any(|item| schema.is_valid(item, partial))
        {
            Ok(instance)
        } else {
            Err(ConstraintFailure::new("no item matches the schema"))
        }
    }))
}
