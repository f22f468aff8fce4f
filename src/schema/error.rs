// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::pattern_type_mismatch)]

use crate::registry::RegistryError;
use crate::value::{Kinds, ValueKind};

use core::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

/// Errors raised while compiling a schema document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// Key does not name a constraint known to the environment.
    #[error("unknown constraint '{name}'")]
    UnknownConstraint { name: Arc<str> },
    /// `type` names a primitive the environment does not define.
    #[error("unknown primitive type '{name}'")]
    UnknownPrimitiveType { name: Arc<str> },
    /// The value given to a constraint has the wrong shape.
    #[error("malformed value for constraint '{constraint}': {message}")]
    MalformedConstraintValue {
        constraint: Arc<str>,
        message: String,
    },
    /// Constraint cannot apply to the declared type.
    #[error("constraint '{constraint}' does not apply to values of type {declared}")]
    ConstraintNotApplicable {
        constraint: Arc<str>,
        declared: Kinds,
    },
    #[error("unknown format '{name}'")]
    UnknownFormat { name: Arc<str> },
    /// A sub-schema refers to a name that is not in the environment's cache.
    #[error("unknown schema '{name}'")]
    UnknownSchema { name: Arc<str> },
    #[error("malformed schema: {0}")]
    MalformedSchema(String),
    #[error("schema nesting exceeds the maximum depth of {depth}")]
    RecursionLimit { depth: usize },
}

impl CompileError {
    pub(crate) fn malformed(constraint: &str, message: impl Into<String>) -> Self {
        CompileError::MalformedConstraintValue {
            constraint: constraint.into(),
            message: message.into(),
        }
    }
}

/// One step of the route from a schema's root to a failing constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Constraint(Arc<str>),
    Key(Arc<str>),
    Index(usize),
    Label(Arc<str>),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Constraint(name) => write!(f, "{name}"),
            PathSegment::Key(key) => write!(f, "{{{key}}}"),
            PathSegment::Index(index) => write!(f, "[{index}]"),
            PathSegment::Label(label) => write!(f, "{label}"),
        }
    }
}

/// Renders a path as `entries/{name}/type`.
pub fn format_path(path: &[PathSegment]) -> String {
    path.iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    Failed,
    NotApplicable,
}

/// A constraint that rejected an instance.
///
/// `path` is relative to the enclosing failure; a failure with `sub_errors`
/// is a composite whose children carry their own relative paths.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Arc<str>>,
    pub message: String,
    pub path: Vec<PathSegment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_errors: Vec<ConstraintFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Arc<str>>,
    pub kind: FailureKind,
}

impl ConstraintFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            constraint: None,
            message: message.into(),
            path: vec![],
            sub_errors: vec![],
            schema: None,
            kind: FailureKind::Failed,
        }
    }

    pub fn composite(message: impl Into<String>, sub_errors: Vec<ConstraintFailure>) -> Self {
        Self {
            sub_errors,
            ..Self::new(message)
        }
    }

    pub fn not_applicable(actual: ValueKind, applicable: Kinds) -> Self {
        Self {
            kind: FailureKind::NotApplicable,
            ..Self::new(format!("not applicable to {actual}, expects {applicable}"))
        }
    }

    /// Prepends a segment identifying the delegation point.
    pub fn prefixed(mut self, segment: PathSegment) -> Self {
        self.path.insert(0, segment);
        self
    }

    /// Records the constraint and schema that produced this failure.
    pub(crate) fn attributed(mut self, constraint: &Arc<str>, schema: &Arc<str>) -> Self {
        self.constraint = Some(constraint.clone());
        if self.schema.is_none() {
            self.schema = Some(schema.clone());
        }
        self.prefixed(PathSegment::Constraint(constraint.clone()))
    }

    pub fn is_composite(&self) -> bool {
        !self.sub_errors.is_empty()
    }

    pub fn is_not_applicable(&self) -> bool {
        self.kind == FailureKind::NotApplicable
    }

    /// Flattens the tree into root-to-leaf paths with their messages.
    pub fn leaves(&self) -> Vec<(Vec<PathSegment>, String)> {
        let mut out = vec![];
        self.collect_leaves(&[], &mut out);
        out
    }

    fn collect_leaves(&self, prefix: &[PathSegment], out: &mut Vec<(Vec<PathSegment>, String)>) {
        let mut path = prefix.to_vec();
        path.extend(self.path.iter().cloned());
        if self.sub_errors.is_empty() {
            out.push((path, self.message.clone()));
        } else {
            for child in &self.sub_errors {
                child.collect_leaves(&path, out);
            }
        }
    }
}

impl fmt::Display for ConstraintFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", format_path(&self.path), self.message)
        }
    }
}

impl core::error::Error for ConstraintFailure {}

/// Top level error type.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Failure(#[from] ConstraintFailure),
}
