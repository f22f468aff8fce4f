// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::constraints::core::count_arg;
use crate::constraints::handler;
use crate::registry::{ConstraintDefinition, ConstraintRegistry};
use crate::schema::error::{CompileError, ConstraintFailure};
use crate::schema::{CompileContext, Handler, Mode};
use crate::value::{Kinds, Value};

use regex::Regex;

pub fn register(m: &mut ConstraintRegistry) {
    m.define(
        ConstraintDefinition::new("max_length", "must be no longer than {value}", max_length)
            .require(Kinds::STRING),
    );
    m.define(
        ConstraintDefinition::new("min_length", "must be no shorter than {value}", min_length)
            .require(Kinds::STRING),
    );
    m.define(
        ConstraintDefinition::new("pattern", "must match the pattern {value}", pattern)
            .require(Kinds::STRING),
    );
}

fn instance_str(instance: &Value) -> Result<&str, ConstraintFailure> {
    match instance {
        Value::String(s) => Ok(s),
        other => Err(ConstraintFailure::new(format!(
            "expected a string, got {}",
            other.kind()
        ))),
    }
}

fn max_length(ctx: &CompileContext<'_>, value: &Value) -> Result<Option<Handler>, CompileError> {
    let limit = count_arg(ctx, value)?;
    Ok(handler(move |instance, mode, _partial| {
        let s = instance_str(&instance)?;
        if s.chars().count() <= limit {
            return Ok(instance);
        }
        match mode {
            Mode::Convert => Ok(Value::from(s.chars().take(limit).collect::<String>())),
            Mode::Validate => Err(ConstraintFailure::new(format!(
                "must be no longer than {limit} characters"
            ))),
        }
    }))
}

fn min_length(ctx: &CompileContext<'_>, value: &Value) -> Result<Option<Handler>, CompileError> {
    let limit = count_arg(ctx, value)?;
    Ok(handler(move |instance, _mode, _partial| {
        if instance_str(&instance)?.chars().count() >= limit {
            Ok(instance)
        } else {
            Err(ConstraintFailure::new(format!(
                "must be no shorter than {limit} characters"
            )))
        }
    }))
}

fn pattern(ctx: &CompileContext<'_>, value: &Value) -> Result<Option<Handler>, CompileError> {
    let Value::String(source) = value else {
        return Err(ctx.malformed("expected a regular expression"));
    };
    let re = Regex::new(source).map_err(|e| ctx.malformed(e.to_string()))?;
    Ok(handler(move |instance, _mode, _partial| {
        if re.is_match(instance_str(&instance)?) {
            Ok(instance)
        } else {
            Err(ConstraintFailure::new(format!(
                "must match the pattern {}",
                re.as_str()
            )))
        }
    }))
}
