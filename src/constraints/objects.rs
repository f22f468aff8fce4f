// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::pattern_type_mismatch)]

use crate::constraints::arrays::{max_items, min_items};
use crate::constraints::core::names_arg;
use crate::constraints::handler;
use crate::registry::{ConstraintDefinition, ConstraintRegistry};
use crate::schema::error::{CompileError, ConstraintFailure, PathSegment};
use crate::schema::{CompileContext, Handler, Mode, SubSchema};
use crate::value::{Kinds, Map, Value};

use std::sync::Arc;

use regex::Regex;

pub fn register(m: &mut ConstraintRegistry) {
    m.define(
        ConstraintDefinition::new(
            "min_entries",
            "must have at least {value} entries",
            min_items,
        )
        .require(Kinds::OBJECT),
    );
    m.define(
        ConstraintDefinition::new(
            "max_entries",
            "must have no more than {value} entries",
            max_items,
        )
        .require(Kinds::OBJECT),
    );
    m.define(
        ConstraintDefinition::new("required", "must have the required keys: {value}", required)
            .require(Kinds::OBJECT),
    );
    m.define(
        ConstraintDefinition::new("entries", "entries must match their schemas", entries)
            .require(Kinds::OBJECT),
    );
    m.define(
        ConstraintDefinition::new(
            "pattern_entries",
            "entries with names that match the given pattern must match the sub-schemas: {value}",
            pattern_entries,
        )
        .require(Kinds::OBJECT),
    );
    m.define(
        ConstraintDefinition::new(
            "additional_entries",
            "additional entries must match the sub-schema: {value}",
            additional_entries,
        )
        .require(Kinds::OBJECT),
    );
    m.define(
        ConstraintDefinition::new(
            "dependencies",
            "dependant schemas must validate",
            dependencies,
        )
        .require(Kinds::OBJECT),
    );
    m.define(
        ConstraintDefinition::new(
            "entry_names",
            "entry names must match the given schema",
            entry_names,
        )
        .require(Kinds::OBJECT),
    );
}

fn instance_object(instance: &Value) -> Result<&Map, ConstraintFailure> {
    match instance {
        Value::Object(m) => Ok(m),
        other => Err(ConstraintFailure::new(format!(
            "expected an object, got {}",
            other.kind()
        ))),
    }
}

fn regex_arg(ctx: &CompileContext<'_>, source: &str) -> Result<Regex, CompileError> {
    Regex::new(source).map_err(|e| ctx.malformed(format!("invalid pattern `{source}`: {e}")))
}

fn required(ctx: &CompileContext<'_>, value: &Value) -> Result<Option<Handler>, CompileError> {
    let mut keys = names_arg(ctx, value)?;
    keys.sort();
    Ok(handler(move |instance, _mode, partial| {
        if partial {
            return Ok(instance);
        }
        let map = instance_object(&instance)?;
        let missing: Vec<&str> = keys
            .iter()
            .filter(|k| !map.contains_key(*k))
            .map(|k| &**k)
            .collect();
        if missing.is_empty() {
            Ok(instance)
        } else {
            Err(ConstraintFailure::new(format!(
                "must have the required entries: {}",
                missing.join(", ")
            )))
        }
    }))
}

/// Applies the sub-schemas `matches` selects for an object's entries.
fn entry_handler<G>(matches: G) -> Option<Handler>
where
    G: Fn(&Map) -> Vec<(Arc<str>, SubSchema)> + Send + Sync + 'static,
{
    handler(move |instance, mode, partial| {
        let map = instance_object(&instance)?;
        let matched = matches(map);
        match mode {
            Mode::Validate => {
                let errors: Vec<ConstraintFailure> = matched
                    .iter()
                    .filter_map(|(key, schema)| {
                        let value = map.get(key)?;
                        schema
                            .check(value, partial)
                            .err()
                            .map(|f| f.prefixed(PathSegment::Key(key.clone())))
                    })
                    .collect();
                if errors.is_empty() {
                    Ok(instance)
                } else {
                    Err(ConstraintFailure::composite("not all entries match", errors))
                }
            }
            Mode::Convert => {
                if matched.is_empty() {
                    return Ok(instance);
                }
                let mut out = map.clone();
                for (key, schema) in matched {
                    let Some(value) = out.get(&key).cloned() else {
                        continue;
                    };
                    let converted = schema
                        .convert(value, partial)
                        .map_err(|f| f.prefixed(PathSegment::Key(key.clone())))?;
                    out.insert(key, converted);
                }
                Ok(Value::from(out))
            }
        }
    })
}

fn schema_map(
    ctx: &CompileContext<'_>,
    value: &Value,
) -> Result<Vec<(Arc<str>, SubSchema)>, CompileError> {
    let Value::Object(map) = value else {
        return Err(ctx.malformed("expected a mapping of names to schemas"));
    };
    map.iter()
        .map(|(k, v)| Ok((k.clone(), ctx.subschema(v)?)))
        .collect()
}

fn entries(ctx: &CompileContext<'_>, value: &Value) -> Result<Option<Handler>, CompileError> {
    let schemas = schema_map(ctx, value)?;
    Ok(entry_handler(move |map| {
        schemas
            .iter()
            .filter(|(name, _)| map.contains_key(name))
            .cloned()
            .collect()
    }))
}

fn compile_patterns(
    ctx: &CompileContext<'_>,
    value: &Value,
) -> Result<Vec<(Regex, SubSchema)>, CompileError> {
    schema_map(ctx, value)?
        .into_iter()
        .map(|(source, schema)| Ok((regex_arg(ctx, &source)?, schema)))
        .collect()
}

fn pattern_entries(
    ctx: &CompileContext<'_>,
    value: &Value,
) -> Result<Option<Handler>, CompileError> {
    let patterns = compile_patterns(ctx, value)?;
    Ok(entry_handler(move |map| {
        let mut matched = vec![];
        for key in map.keys() {
            for (re, schema) in &patterns {
                if re.is_match(key) {
                    matched.push((key.clone(), schema.clone()));
                }
            }
        }
        matched
    }))
}

fn additional_entries(
    ctx: &CompileContext<'_>,
    value: &Value,
) -> Result<Option<Handler>, CompileError> {
    let policy = ctx.subschema(value)?;
    let names: Vec<Arc<str>> = match ctx.get("entries") {
        Some(Value::Object(declared)) => declared.keys().cloned().collect(),
        _ => vec![],
    };
    let patterns: Vec<Regex> = match ctx.get("pattern_entries") {
        Some(Value::Object(declared)) => declared
            .keys()
            .map(|source| regex_arg(ctx, source))
            .collect::<Result<_, _>>()?,
        _ => vec![],
    };

    Ok(entry_handler(move |map| {
        map.keys()
            .filter(|key| !names.contains(key) && !patterns.iter().any(|re| re.is_match(key)))
            .map(|key| (key.clone(), policy.clone()))
            .collect()
    }))
}

enum Dependency {
    /// Keys that must appear alongside the dependant key.
    Peers(Vec<Arc<str>>),
    Schema(SubSchema),
}

fn dependencies(ctx: &CompileContext<'_>, value: &Value) -> Result<Option<Handler>, CompileError> {
    let Value::Object(map) = value else {
        return Err(ctx.malformed("expected a mapping of keys to schemas or key lists"));
    };
    let mut deps = Vec::with_capacity(map.len());
    for (key, dep) in map.iter() {
        let dep = match dep {
            Value::Array(_) => Dependency::Peers(names_arg(ctx, dep)?),
            Value::Object(_) | Value::Bool(_) => Dependency::Schema(ctx.subschema(dep)?),
            other => {
                return Err(ctx.malformed(format!(
                    "dependency of `{key}` must be a schema or a list of keys, got {}",
                    other.kind()
                )))
            }
        };
        deps.push((key.clone(), dep));
    }

    Ok(handler(move |instance, mode, partial| {
        let mut instance = instance;
        let mut errors = vec![];
        for (key, dep) in &deps {
            if !instance_object(&instance)?.contains_key(key) {
                continue;
            }
            let segment = PathSegment::Key(key.clone());
            match dep {
                // Presence requirements are suppressed for partial instances.
                Dependency::Peers(_) if partial => {}
                Dependency::Peers(peers) => {
                    let map = instance_object(&instance)?;
                    let missing: Vec<&str> = peers
                        .iter()
                        .filter(|p| !map.contains_key(*p))
                        .map(|p| &**p)
                        .collect();
                    if !missing.is_empty() {
                        let failure = ConstraintFailure::new(format!(
                            "since {key} appears, {} must also appear",
                            missing.join(", ")
                        ))
                        .prefixed(segment);
                        match mode {
                            Mode::Validate => errors.push(failure),
                            Mode::Convert => return Err(failure),
                        }
                    }
                }
                Dependency::Schema(schema) => match mode {
                    Mode::Validate => {
                        if let Err(f) = schema.check(&instance, partial) {
                            errors.push(f.prefixed(segment));
                        }
                    }
                    Mode::Convert => {
                        instance = schema
                            .convert(instance, partial)
                            .map_err(|f| f.prefixed(segment))?;
                    }
                },
            }
        }
        if errors.is_empty() {
            Ok(instance)
        } else {
            Err(ConstraintFailure::composite(
                "dependant validation failed",
                errors,
            ))
        }
    }))
}

fn entry_names(ctx: &CompileContext<'_>, value: &Value) -> Result<Option<Handler>, CompileError> {
    let schema = ctx.subschema(value)?;
    Ok(handler(move |instance, _mode, partial| {
        let errors: Vec<ConstraintFailure> = instance_object(&instance)?
            .keys()
            .filter_map(|key| {
                schema
                    .check(&Value::String(key.clone()), partial)
                    .err()
                    .map(|f| f.prefixed(PathSegment::Key(key.clone())))
            })
            .collect();
        if errors.is_empty() {
            Ok(instance)
        } else {
            Err(ConstraintFailure::composite(
                "entry names do not all match",
                errors,
            ))
        }
    }))
}
