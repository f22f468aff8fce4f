// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::constraints::handler;
use crate::formats::normalize;
use crate::registry::{ConstraintDefinition, ConstraintRegistry};
use crate::schema::error::{CompileError, ConstraintFailure};
use crate::schema::{CompileContext, Handler};
use crate::value::{Kinds, Value};

use tracing::trace;

pub fn register(m: &mut ConstraintRegistry) {
    m.define(
        ConstraintDefinition::new("format", "must match the format {value}", format)
            .require(Kinds::STRING),
    );
}

fn format(ctx: &CompileContext<'_>, value: &Value) -> Result<Option<Handler>, CompileError> {
    let Value::String(name) = value else {
        return Err(ctx.malformed("expected a format name"));
    };
    let settings = ctx.settings();
    if settings.config().ignores_format(name) {
        trace!(format = %name, "format ignored");
        return Ok(None);
    }
    let Some(predicate) = settings.formats().get(name) else {
        if ctx.strict() {
            return Err(CompileError::UnknownFormat {
                name: normalize(name).into(),
            });
        }
        trace!(format = %name, "unknown format passes");
        return Ok(None);
    };

    let name = name.clone();
    Ok(handler(move |instance, _mode, _partial| match &instance {
        Value::String(s) if predicate(s) => Ok(instance),
        Value::String(s) => Err(ConstraintFailure::new(format!(
            "\"{s}\" does not match the format {name}"
        ))),
        other => Err(ConstraintFailure::new(format!(
            "expected a string, got {}",
            other.kind()
        ))),
    }))
}
