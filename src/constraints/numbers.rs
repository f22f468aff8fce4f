// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::constraints::core::{metadata, number_arg};
use crate::constraints::handler;
use crate::number::Number;
use crate::registry::{ConstraintDefinition, ConstraintRegistry};
use crate::schema::error::{CompileError, ConstraintFailure};
use crate::schema::{CompileContext, Handler, Mode};
use crate::value::{Kinds, Value};

pub fn register(m: &mut ConstraintRegistry) {
    m.define(
        ConstraintDefinition::new("multiple_of", "must be a multiple of {value}", multiple_of)
            .require(Kinds::NUMBER),
    );
    m.define(
        ConstraintDefinition::new("maximum", "must be no larger than {value}", maximum)
            .require(Kinds::NUMBER),
    );
    m.define(
        ConstraintDefinition::new("minimum", "must be no smaller than {value}", minimum)
            .require(Kinds::NUMBER),
    );
    m.define(
        ConstraintDefinition::new(
            "exclusive_maximum",
            "must be smaller than {value}",
            exclusive_maximum,
        )
        .require(Kinds::NUMBER),
    );
    m.define(
        ConstraintDefinition::new(
            "exclusive_minimum",
            "must be larger than {value}",
            exclusive_minimum,
        )
        .require(Kinds::NUMBER),
    );
}

fn instance_number(instance: &Value) -> Result<Number, ConstraintFailure> {
    match instance {
        Value::Number(n) => Ok(*n),
        other => Err(ConstraintFailure::new(format!(
            "expected a number, got {}",
            other.kind()
        ))),
    }
}

fn multiple_of(ctx: &CompileContext<'_>, value: &Value) -> Result<Option<Handler>, CompileError> {
    let divisor = number_arg(ctx, value)?;
    let d = divisor.as_f64();
    if d.is_nan() || d <= 0.0 {
        return Err(ctx.malformed("must be greater than zero"));
    }
    Ok(handler(move |instance, _mode, _partial| {
        if instance_number(&instance)?.is_multiple_of(&divisor) {
            Ok(instance)
        } else {
            Err(ConstraintFailure::new(format!(
                "must be a multiple of {divisor}"
            )))
        }
    }))
}

// The boolean form of `exclusive_maximum`/`exclusive_minimum` modifies the sibling bound.
fn exclusive_flag(ctx: &CompileContext<'_>, sibling: &str) -> bool {
    matches!(ctx.get(sibling), Some(Value::Bool(true)))
}

fn maximum(ctx: &CompileContext<'_>, value: &Value) -> Result<Option<Handler>, CompileError> {
    let bound = number_arg(ctx, value)?;
    if exclusive_flag(ctx, "exclusive_maximum") {
        return Ok(strictly_below(bound));
    }
    Ok(handler(move |instance, mode, _partial| {
        let n = instance_number(&instance)?;
        if n <= bound {
            return Ok(instance);
        }
        match mode {
            Mode::Convert => Ok(Value::from(clamp(n, bound.floor(), bound))),
            Mode::Validate => Err(ConstraintFailure::new(format!(
                "must be no larger than {bound}"
            ))),
        }
    }))
}

fn minimum(ctx: &CompileContext<'_>, value: &Value) -> Result<Option<Handler>, CompileError> {
    let bound = number_arg(ctx, value)?;
    if exclusive_flag(ctx, "exclusive_minimum") {
        return Ok(strictly_above(bound));
    }
    Ok(handler(move |instance, mode, _partial| {
        let n = instance_number(&instance)?;
        if n >= bound {
            return Ok(instance);
        }
        match mode {
            Mode::Convert => Ok(Value::from(clamp(n, bound.ceil(), bound))),
            Mode::Validate => Err(ConstraintFailure::new(format!(
                "must be no smaller than {bound}"
            ))),
        }
    }))
}

// Clamping keeps the instance's representation: integers move to the nearest
// integer inside the bound.
fn clamp(n: Number, integral_bound: Number, bound: Number) -> Number {
    match (n, integral_bound) {
        (Number::Int(_), Number::Int(_)) => integral_bound,
        (Number::Int(_), _) => bound,
        (Number::Float(_), _) => Number::Float(bound.as_f64()),
    }
}

fn strictly_below(bound: Number) -> Option<Handler> {
    handler(move |instance, _mode, _partial| {
        if instance_number(&instance)? < bound {
            Ok(instance)
        } else {
            Err(ConstraintFailure::new(format!(
                "must be smaller than {bound}"
            )))
        }
    })
}

fn strictly_above(bound: Number) -> Option<Handler> {
    handler(move |instance, _mode, _partial| {
        if instance_number(&instance)? > bound {
            Ok(instance)
        } else {
            Err(ConstraintFailure::new(format!(
                "must be larger than {bound}"
            )))
        }
    })
}

fn exclusive_maximum(
    ctx: &CompileContext<'_>,
    value: &Value,
) -> Result<Option<Handler>, CompileError> {
    match value {
        Value::Bool(_) => metadata(ctx, value),
        _ => Ok(strictly_below(number_arg(ctx, value)?)),
    }
}

fn exclusive_minimum(
    ctx: &CompileContext<'_>,
    value: &Value,
) -> Result<Option<Handler>, CompileError> {
    match value {
        Value::Bool(_) => metadata(ctx, value),
        _ => Ok(strictly_above(number_arg(ctx, value)?)),
    }
}
