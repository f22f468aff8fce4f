// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::constraints::core::metadata;
use crate::constraints::handler;
use crate::registry::{ConstraintDefinition, ConstraintRegistry};
use crate::schema::error::{CompileError, ConstraintFailure, PathSegment};
use crate::schema::{CompileContext, Handler, Mode, SubSchema};
use crate::value::Value;

pub fn register(m: &mut ConstraintRegistry) {
    m.define(ConstraintDefinition::new(
        "all_of",
        "must match all of the given schemas",
        all_of,
    ));
    m.define(ConstraintDefinition::new(
        "any_of",
        "must match at least one of the given schemas",
        any_of,
    ));
    m.define(ConstraintDefinition::new(
        "one_of",
        "must match exactly one of the given schemas",
        one_of,
    ));
    m.define(ConstraintDefinition::new(
        "not",
        "must not match the given schema: {value}",
        not,
    ));
    m.define(ConstraintDefinition::new(
        "if",
        "if the instance matches {value}, it must match `then`, otherwise `else`",
        if_then_else,
    ));
    m.define(ConstraintDefinition::new(
        "then",
        "schema applied when `if` matches",
        metadata,
    ));
    m.define(ConstraintDefinition::new(
        "else",
        "schema applied when `if` does not match",
        metadata,
    ));
}

fn all_of(ctx: &CompileContext<'_>, value: &Value) -> Result<Option<Handler>, CompileError> {
    let schemas = ctx.subschemas(value)?;
    Ok(handler(move |instance, mode, partial| match mode {
        Mode::Validate => {
            let errors: Vec<ConstraintFailure> = schemas
                .iter()
                .enumerate()
                .filter_map(|(i, s)| {
                    s.check(&instance, partial)
                        .err()
                        .map(|f| f.prefixed(PathSegment::Index(i)))
                })
                .collect();
            if errors.is_empty() {
                Ok(instance)
            } else {
                Err(ConstraintFailure::composite(
                    "does not match all sub-schemas",
                    errors,
                ))
            }
        }
        Mode::Convert => schemas
            .iter()
            .enumerate()
            .try_fold(instance, |instance, (i, s)| {
                s.convert(instance, partial)
                    .map_err(|f| f.prefixed(PathSegment::Index(i)))
            }),
    }))
}

fn any_of(ctx: &CompileContext<'_>, value: &Value) -> Result<Option<Handler>, CompileError> {
    let schemas = ctx.subschemas(value)?;
    Ok(handler(move |instance, mode, partial| {
        let mut errors = Vec::with_capacity(schemas.len());
        for (i, s) in schemas.iter().enumerate() {
            let outcome = match mode {
                Mode::Validate => s.check(&instance, partial).map(|_| None),
                Mode::Convert => s.convert(instance.clone(), partial).map(Some),
            };
            match outcome {
                Ok(None) => return Ok(instance),
                Ok(Some(converted)) => return Ok(converted),
                Err(f) => errors.push(f.prefixed(PathSegment::Index(i))),
            }
        }
        Err(ConstraintFailure::composite(
            "does not match any sub-schema",
            errors,
        ))
    }))
}

fn one_of(ctx: &CompileContext<'_>, value: &Value) -> Result<Option<Handler>, CompileError> {
    let schemas = ctx.subschemas(value)?;
    Ok(handler(move |instance, mode, partial| {
        let mut errors = vec![];
        let mut matched = vec![];
        for (i, s) in schemas.iter().enumerate() {
            match s.check(&instance, partial) {
                Ok(()) => matched.push(i),
                Err(f) => errors.push(f.prefixed(PathSegment::Index(i))),
            }
        }
        match matched.as_slice() {
            [i] => match mode {
                Mode::Validate => Ok(instance),
                Mode::Convert => schemas[*i]
                    .convert(instance, partial)
                    .map_err(|f| f.prefixed(PathSegment::Index(*i))),
            },
            [] => Err(ConstraintFailure::composite(
                "does not match any sub-schema",
                errors,
            )),
            many => Err(ConstraintFailure::new(format!(
                "matches {} sub-schemas ({}), expected exactly one",
                many.len(),
                many.iter()
                    .map(|i| i.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }))
}

fn not(ctx: &CompileContext<'_>, value: &Value) -> Result<Option<Handler>, CompileError> {
    let schema = ctx.subschema(value)?;
    Ok(handler(move |instance, _mode, partial| {
        if schema.is_valid(&instance, partial) {
            Err(ConstraintFailure::new("must not match the sub-schema"))
        } else {
            Ok(instance)
        }
    }))
}

fn branch(ctx: &CompileContext<'_>, name: &str) -> Result<Option<SubSchema>, CompileError> {
    ctx.get(name).map(|v| ctx.subschema(v)).transpose()
}

fn if_then_else(
    ctx: &CompileContext<'_>,
    value: &Value,
) -> Result<Option<Handler>, CompileError> {
    let condition = ctx.subschema(value)?;
    let then = branch(ctx, "then")?;
    let otherwise = branch(ctx, "else")?;
    if then.is_none() && otherwise.is_none() {
        return Ok(None);
    }

    Ok(handler(move |instance, mode, partial| {
        // The condition never converts.
        let (label, chosen) = if condition.is_valid(&instance, partial) {
            ("then", &then)
        } else {
            ("else", &otherwise)
        };
        let Some(chosen) = chosen else {
            return Ok(instance);
        };
        chosen.apply(instance, mode, partial).map_err(|f| {
            let failure = match mode {
                Mode::Validate => ConstraintFailure::composite(
                    format!("'{label}' subschema does not validate and must"),
                    vec![f],
                ),
                Mode::Convert => f,
            };
            failure.prefixed(PathSegment::Label(label.into()))
        })
    }))
}
