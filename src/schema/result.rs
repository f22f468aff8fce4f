// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::schema::error::{format_path, ConstraintFailure, PathSegment};
use crate::schema::Schema;
use crate::value::Value;

use core::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

/// Outcome of [`Schema::validate`]: one entry per compiled constraint, `None`
/// where the constraint passed.
#[derive(Clone, Debug)]
pub struct ValidationResult {
    schema: Schema,
    instance: Value,
    errors: IndexMap<Arc<str>, Option<ConstraintFailure>>,
    success: bool,
}

impl ValidationResult {
    pub(crate) fn new(
        schema: Schema,
        instance: Value,
        errors: IndexMap<Arc<str>, Option<ConstraintFailure>>,
    ) -> Self {
        let success = errors.values().all(Option::is_none);
        Self {
            schema,
            instance,
            errors,
            success,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn instance(&self) -> &Value {
        &self.instance
    }

    pub fn errors(&self) -> &IndexMap<Arc<str>, Option<ConstraintFailure>> {
        &self.errors
    }

    /// Failures of the constraints that did not pass, in constraint order.
    pub fn failing(&self) -> impl Iterator<Item = &ConstraintFailure> {
        self.errors.values().flatten()
    }

    pub fn error(&self, constraint: &str) -> Option<&ConstraintFailure> {
        self.errors.get(constraint).and_then(Option::as_ref)
    }

    /// Every leaf failure with its full root-to-leaf path.
    pub fn failures(&self) -> Vec<(Vec<PathSegment>, String)> {
        self.failing().flat_map(|f| f.leaves()).collect()
    }

    /// Folds a failed result into one composite failure so an enclosing
    /// constraint can report it under its own path.
    pub fn into_failure(self) -> Option<ConstraintFailure> {
        if self.success {
            return None;
        }
        let name = self.schema.name().clone();
        let children: Vec<ConstraintFailure> = self.errors.into_values().flatten().collect();
        let mut failure = ConstraintFailure::composite(
            format!("does not satisfy schema {name}"),
            children,
        );
        failure.schema = Some(name);
        Some(failure)
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            return write!(f, "valid");
        }
        writeln!(f, "invalid against schema {}:", self.schema.name())?;
        for (path, message) in self.failures() {
            writeln!(f, "  {}: {message}", format_path(&path))?;
        }
        Ok(())
    }
}

impl Serialize for ValidationResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_struct("ValidationResult", 4)?;
        s.serialize_field("schema", &**self.schema.name())?;
        s.serialize_field("instance", &self.instance)?;
        s.serialize_field("success", &self.success)?;
        s.serialize_field("errors", &self.errors)?;
        s.end()
    }
}
