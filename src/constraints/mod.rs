// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub mod arrays;
pub mod conditionals;
pub mod core;
pub mod formats;
pub mod numbers;
pub mod objects;
pub mod strings;

use crate::inflection;
use crate::registry::ConstraintRegistry;
use crate::schema::error::ConstraintFailure;
use crate::schema::{Handler, Mode};
use crate::value::Value;

use std::sync::Arc;

use lazy_static::lazy_static;

/// JSON Schema names carried over from the base registry.
pub const JSON_SCHEMA_INCLUDE: &[&str] = &[
    "additionalItems",
    "allOf",
    "anyOf",
    "const",
    "contains",
    "dependencies",
    "else",
    "enum",
    "exclusiveMaximum",
    "exclusiveMinimum",
    "format",
    "if",
    "items",
    "maxItems",
    "maxLength",
    "maximum",
    "minItems",
    "minLength",
    "minimum",
    "multipleOf",
    "not",
    "oneOf",
    "pattern",
    "required",
    "then",
    "type",
    "uniqueItems",
    // metadata
    "default",
    "description",
    "title",
    "examples",
    "deprecated",
];

/// JSON Schema name, base name.
pub const JSON_SCHEMA_RENAMES: &[(&str, &str)] = &[
    ("additionalProperties", "additional_entries"),
    ("maxProperties", "max_entries"),
    ("patternProperties", "pattern_entries"),
    ("minProperties", "min_entries"),
    ("properties", "entries"),
    ("propertyNames", "entry_names"),
];

#[rustfmt::skip]
lazy_static! {
    pub static ref BASE_CONSTRAINTS: Arc<ConstraintRegistry> = {
	let mut m = ConstraintRegistry::new(inflection::underscore);

	core::register(&mut m);
	numbers::register(&mut m);
	strings::register(&mut m);
	formats::register(&mut m);
	arrays::register(&mut m);
	objects::register(&mut m);
	conditionals::register(&mut m);

	Arc::new(m)
    };

    pub static ref JSON_SCHEMA_CONSTRAINTS: Arc<ConstraintRegistry> = Arc::new(
	BASE_CONSTRAINTS.clone_with(
	    Some(JSON_SCHEMA_INCLUDE),
	    JSON_SCHEMA_RENAMES,
	    Some(inflection::lower_camel),
	)
    );
}

/// Box a closure as a compiled handler.
pub(crate) fn handler<F>(f: F) -> Option<Handler>
where
    F: Fn(Value, Mode, bool) -> Result<Value, ConstraintFailure> + Send + Sync + 'static,
{
    let h: Handler = Arc::new(f);
    Some(h)
}
