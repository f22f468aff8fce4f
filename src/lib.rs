// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

pub mod constraints;
mod environment;
mod formats;
pub mod inflection;
mod number;
mod primitives;
mod registry;
pub mod schema;
mod value;

pub use environment::{Environment, EnvironmentConfig, SchemaSource, Settings};
pub use formats::{FormatPredicate, FormatRegistry};
pub use inflection::Inflection;
pub use number::Number;
pub use primitives::PrimitiveTypes;
pub use registry::{Compiler, ConstraintDefinition, ConstraintRegistry, RegistryError};
pub use schema::error::{CompileError, ConstraintFailure, Error, FailureKind, PathSegment};
pub use schema::result::ValidationResult;
pub use schema::{CompileContext, Handler, Mode, Schema, SubSchema};
pub use value::{Kinds, Map, Value, ValueKind};
