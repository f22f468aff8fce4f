// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::pattern_type_mismatch)]

//! A schema is an ordered mapping from constraint names to constraint values:
//!
//! {
//!   "type": "integer",
//!   "minimum": 0,
//!   "maximum": 5
//! }
//!
//! Compiling a schema binds every key to a handler, a closure that either
//! checks an instance (`Mode::Validate`) or coerces it towards conformance
//! (`Mode::Convert`). Handlers run in the order their keys appear, except
//! `type`, which always runs first: the declared type decides which of the
//! remaining constraints apply and lets `convert` coerce the instance before
//! any bound is checked. With the schema above, converting `"10"` yields `5`:
//! `type` turns the string into an integer and `maximum` clamps it.
//!
//! Constraints that hold other schemas (`items`, `entries`, `all_of`, `if`,
//! ...) compile them eagerly. A sub-schema position accepts a mapping, a
//! boolean (`true` accepts everything, `false` nothing) or the name of a
//! schema already compiled in the same environment.
//!
//! When `type` is absent the kind of an instance is only known at call time,
//! so each kind-restricted handler is wrapped in a runtime kind check. A
//! non-strict schema lets inapplicable instances pass through; a strict one
//! reports them as failures.
//!
//! Compiled schemas are immutable. Changing one produces a new revision
//! (see [`Schema::revise`]) with a fresh handler table.

pub mod error;
pub mod result;


use crate::environment::{Environment, Settings};
use crate::registry::ConstraintRegistry;
use crate::value::{Kinds, Map, Value};
use error::{CompileError, ConstraintFailure};
use result::ValidationResult;

use core::cell::RefCell;
use core::fmt;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use data_encoding::HEXLOWER;
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

/// How a handler treats the instance it is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Check only. The returned value is ignored.
    Validate,
    /// Coerce; the returned value replaces the instance for later handlers.
    Convert,
}

/// A compiled constraint: `handler(instance, mode, partial)`.
pub type Handler =
    Arc<dyn Fn(Value, Mode, bool) -> Result<Value, ConstraintFailure> + Send + Sync>;

#[derive(Clone)]
struct BoundHandler {
    name: Arc<str>,
    handler: Handler,
    // A failure here stops validation.
    terminal: bool,
}

struct SchemaInner {
    name: Arc<str>,
    named: bool,
    raw: Value,
    hash: Arc<str>,
    env_id: u64,
    env_revision: u64,
    strict: bool,
    declared: Option<Kinds>,
    handlers: Vec<BoundHandler>,
    revision: u64,
    registry: Arc<ConstraintRegistry>,
    // Named schemas this one embeds, directly or through inline sub-schemas.
    references: BTreeSet<Arc<str>>,
}

/// A compiled schema. Cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

/// What a sub-schema position compiled to.
#[derive(Clone, Debug)]
pub enum SubSchema {
    Accept,
    Reject,
    Schema(Schema),
}

impl SubSchema {
    /// Validate-only check that folds a failed result into one failure.
    pub fn check(&self, instance: &Value, partial: bool) -> Result<(), ConstraintFailure> {
        match self {
            SubSchema::Accept => Ok(()),
            SubSchema::Reject => Err(ConstraintFailure::new("no value is allowed here")),
            SubSchema::Schema(s) => match s.validate(instance, partial).into_failure() {
                None => Ok(()),
                Some(failure) => Err(failure),
            },
        }
    }

    pub fn is_valid(&self, instance: &Value, partial: bool) -> bool {
        self.check(instance, partial).is_ok()
    }

    pub fn convert(&self, instance: Value, partial: bool) -> Result<Value, ConstraintFailure> {
        match self {
            SubSchema::Accept => Ok(instance),
            SubSchema::Reject => Err(ConstraintFailure::new("no value is allowed here")),
            SubSchema::Schema(s) => s.convert(instance, partial),
        }
    }

    pub fn apply(
        &self,
        instance: Value,
        mode: Mode,
        partial: bool,
    ) -> Result<Value, ConstraintFailure> {
        match mode {
            Mode::Validate => self.check(&instance, partial).map(|_| instance),
            Mode::Convert => self.convert(instance, partial),
        }
    }
}

/// Everything a constraint compiler may look at.
pub struct CompileContext<'a> {
    env: &'a Environment,
    settings: &'a Settings,
    raw: &'a Map,
    constraint: Arc<str>,
    strict: bool,
    declared: Option<Kinds>,
    depth: usize,
    env_revision: u64,
    references: RefCell<BTreeSet<Arc<str>>>,
}

impl<'a> CompileContext<'a> {
    /// Name of the constraint being compiled.
    pub fn constraint(&self) -> &Arc<str> {
        &self.constraint
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    /// Kinds fixed by the schema's `type`, if it has one.
    pub fn declared(&self) -> Option<Kinds> {
        self.declared
    }

    pub fn settings(&self) -> &Settings {
        self.settings
    }

    /// Sibling lookup by base constraint name, independent of the dialect the
    /// schema document was written in.
    pub fn get(&self, base_name: &str) -> Option<&'a Value> {
        lookup(&self.settings.constraints, self.raw, base_name)
    }

    pub fn malformed(&self, message: impl Into<String>) -> CompileError {
        CompileError::malformed(&self.constraint, message)
    }

    /// Resolve a `type` value: a primitive name or a list of them.
    pub fn kinds(&self, value: &Value) -> Result<Kinds, CompileError> {
        match value {
            Value::String(name) => self.primitive(name),
            Value::Array(names) if !names.is_empty() => {
                let mut kinds = Kinds::NONE;
                for name in names.iter() {
                    match name {
                        Value::String(name) => kinds = kinds.union(self.primitive(name)?),
                        other => {
                            return Err(self.malformed(format!("`{other}` is not a type name")))
                        }
                    }
                }
                Ok(kinds)
            }
            other => Err(self.malformed(format!("`{other}` is not a type name"))),
        }
    }

    pub fn primitive(&self, name: &str) -> Result<Kinds, CompileError> {
        self.settings
            .primitives
            .get(name)
            .ok_or_else(|| CompileError::UnknownPrimitiveType { name: name.into() })
    }

    /// Compile the value found at a sub-schema position.
    pub fn subschema(&self, value: &Value) -> Result<SubSchema, CompileError> {
        match value {
            Value::Bool(true) => Ok(SubSchema::Accept),
            Value::Bool(false) => Ok(SubSchema::Reject),
            Value::String(name) => {
                let schema = self
                    .env
                    .resolve_reference(name, self.settings, self.depth + 1)?;
                self.references.borrow_mut().insert(name.clone());
                Ok(SubSchema::Schema(schema))
            }
            Value::Object(_) => {
                let schema = Schema::compile(
                    self.env,
                    self.settings,
                    value,
                    None,
                    self.strict,
                    self.depth + 1,
                    0,
                    self.env_revision,
                )?;
                self.references
                    .borrow_mut()
                    .extend(schema.inner.references.iter().cloned());
                Ok(SubSchema::Schema(schema))
            }
            other => Err(self.malformed(format!("expected a schema, got {}", other.kind()))),
        }
    }

    /// Compile a list of sub-schemas.
    pub fn subschemas(&self, value: &Value) -> Result<Vec<SubSchema>, CompileError> {
        match value {
            Value::Array(items) if !items.is_empty() => {
                items.iter().map(|v| self.subschema(v)).collect()
            }
            _ => Err(self.malformed("expected a non-empty list of schemas")),
        }
    }
}

fn lookup<'v>(registry: &ConstraintRegistry, raw: &'v Map, name: &str) -> Option<&'v Value> {
    match registry.resolve(name) {
        Some(target) => raw
            .iter()
            .find(|(k, _)| registry.resolve(k).as_ref() == Some(&target))
            .map(|(_, v)| v),
        None => raw.get(name),
    }
}

/// Deterministic structural hash of a schema document, hex encoded.
pub fn content_hash(env_name: &str, raw: &Value) -> Arc<str> {
    let mut hasher = Sha256::new();
    hasher.update(env_name.as_bytes());
    hasher.update([0u8]);
    hash_value(&mut hasher, raw);
    HEXLOWER.encode(&hasher.finalize()).into()
}

fn hash_len(hasher: &mut Sha256, len: usize) {
    hasher.update((len as u64).to_be_bytes());
}

fn hash_value(hasher: &mut Sha256, value: &Value) {
    match value {
        Value::Null => hasher.update(b"n"),
        Value::Bool(b) => {
            hasher.update(b"b");
            hasher.update([u8::from(*b)]);
        }
        // Equal numbers hash alike regardless of representation.
        Value::Number(n) => match n.as_i64() {
            Some(i) => {
                hasher.update(b"i");
                hasher.update(i.to_be_bytes());
            }
            None => {
                hasher.update(b"f");
                hasher.update(n.as_f64().to_bits().to_be_bytes());
            }
        },
        Value::String(s) => {
            hasher.update(b"s");
            hash_len(hasher, s.len());
            hasher.update(s.as_bytes());
        }
        Value::Bytes(b) => {
            hasher.update(b"y");
            hash_len(hasher, b.len());
            hasher.update(b.as_slice());
        }
        Value::Array(items) => {
            hasher.update(b"a");
            hash_len(hasher, items.len());
            for item in items.iter() {
                hash_value(hasher, item);
            }
        }
        Value::Object(fields) => {
            hasher.update(b"o");
            hash_len(hasher, fields.len());
            for (k, v) in fields.iter() {
                hash_len(hasher, k.len());
                hasher.update(k.as_bytes());
                hash_value(hasher, v);
            }
        }
    }
}

/// Runs `handler` only for instances of an applicable kind.
fn guarded(handler: Handler, applicable: Kinds, strict: bool) -> Handler {
    Arc::new(move |instance: Value, mode, partial| {
        let kind = instance.kind();
        if applicable.contains(kind) {
            handler(instance, mode, partial)
        } else if strict {
            Err(ConstraintFailure::not_applicable(kind, applicable))
        } else {
            Ok(instance)
        }
    })
}

impl Schema {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn compile(
        env: &Environment,
        settings: &Settings,
        raw: &Value,
        name: Option<Arc<str>>,
        strict: bool,
        depth: usize,
        revision: u64,
        env_revision: u64,
    ) -> Result<Schema, CompileError> {
        if depth > settings.config.max_depth {
            return Err(CompileError::RecursionLimit {
                depth: settings.config.max_depth,
            });
        }
        let map = match raw {
            Value::Object(map) => map.as_ref(),
            other => {
                return Err(CompileError::MalformedSchema(format!(
                    "expected a mapping, got {}",
                    other.kind()
                )))
            }
        };

        let registry = &settings.constraints;
        let hash = content_hash(env.name(), raw);
        let named = name.is_some();
        let name = name.unwrap_or_else(|| hash.clone());

        let mut ctx = CompileContext {
            env,
            settings,
            raw: map,
            constraint: "type".into(),
            strict,
            declared: None,
            depth,
            env_revision,
            references: RefCell::new(BTreeSet::new()),
        };
        let mut handlers = vec![];
        let mut seen = HashSet::new();

        // `type` goes first; it fixes the kinds every other constraint is bound against.
        let type_name = registry.resolve("type");
        if let (Some(type_name), Some(value)) = (&type_name, ctx.get("type")) {
            ctx.constraint = type_name.clone();
            let declared = ctx.kinds(value)?;
            if let Some(def) = registry.get(type_name) {
                if let Some(handler) = (def.compiler)(&ctx, value)? {
                    handlers.push(BoundHandler {
                        name: type_name.clone(),
                        handler,
                        terminal: true,
                    });
                }
            }
            ctx.declared = Some(declared);
        }

        for (key, value) in map.iter() {
            let Some(canonical) = registry.resolve(key) else {
                if strict {
                    return Err(CompileError::UnknownConstraint { name: key.clone() });
                }
                trace!(schema = %name, key = %key, "skipping unknown constraint");
                continue;
            };
            if !seen.insert(canonical.clone()) {
                return Err(CompileError::MalformedSchema(format!(
                    "constraint '{canonical}' is given more than once"
                )));
            }
            if Some(&canonical) == type_name.as_ref() {
                continue;
            }
            let Some(def) = registry.get(&canonical) else {
                continue;
            };

            let applicable = def.applicable_kinds();
            if let Some(declared) = ctx.declared {
                if !declared.intersects(applicable) {
                    if strict {
                        return Err(CompileError::ConstraintNotApplicable {
                            constraint: canonical,
                            declared,
                        });
                    }
                    trace!(schema = %name, constraint = %canonical, %declared, "skipping inapplicable constraint");
                    continue;
                }
            }

            ctx.constraint = canonical.clone();
            let Some(handler) = (def.compiler)(&ctx, value)? else {
                trace!(schema = %name, constraint = %canonical, "metadata only");
                continue;
            };
            let handler = match ctx.declared {
                Some(declared) if declared.is_subset(applicable) => handler,
                // Kinds admitted by a declared `type` but not by the
                // constraint pass through.
                _ => guarded(handler, applicable, strict && ctx.declared.is_none()),
            };
            handlers.push(BoundHandler {
                name: canonical,
                handler,
                terminal: false,
            });
        }

        debug!(
            schema = %name,
            handlers = handlers.len(),
            revision,
            depth,
            "compiled schema"
        );

        let declared = ctx.declared;
        Ok(Schema {
            inner: Arc::new(SchemaInner {
                name,
                named,
                raw: raw.clone(),
                hash,
                env_id: env.id(),
                env_revision,
                strict,
                declared,
                handlers,
                revision,
                registry: registry.clone(),
                references: ctx.references.into_inner(),
            }),
        })
    }

    /// Check `instance` against every constraint. Never fails; the result
    /// reports each constraint's outcome.
    pub fn validate(&self, instance: &Value, partial: bool) -> ValidationResult {
        let mut errors = IndexMap::with_capacity(self.inner.handlers.len());
        for bound in &self.inner.handlers {
            match (bound.handler)(instance.clone(), Mode::Validate, partial) {
                Ok(_) => {
                    errors.insert(bound.name.clone(), None);
                }
                Err(failure) => {
                    let failure = failure.attributed(&bound.name, &self.inner.name);
                    errors.insert(bound.name.clone(), Some(failure));
                    if bound.terminal {
                        break;
                    }
                }
            }
        }
        ValidationResult::new(self.clone(), instance.clone(), errors)
    }

    /// Thread `instance` through every constraint, stopping at the first
    /// failure.
    pub fn convert(&self, instance: Value, partial: bool) -> Result<Value, ConstraintFailure> {
        let mut instance = instance;
        for bound in &self.inner.handlers {
            instance = (bound.handler)(instance, Mode::Convert, partial)
                .map_err(|f| f.attributed(&bound.name, &self.inner.name))?;
        }
        Ok(instance)
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validate(instance, false).success()
    }

    pub fn name(&self) -> &Arc<str> {
        &self.inner.name
    }

    /// Whether the schema was stored under an explicit name rather than its hash.
    pub fn is_named(&self) -> bool {
        self.inner.named
    }

    pub fn raw(&self) -> &Value {
        &self.inner.raw
    }

    /// Raw value of a constraint, looked up under any spelling of its name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let map = self.inner.raw.as_object().ok()?;
        lookup(&self.inner.registry, map, key)
    }

    pub fn declared_kinds(&self) -> Option<Kinds> {
        self.inner.declared
    }

    /// Constraints with a handler, in execution order.
    pub fn constraint_names(&self) -> Vec<Arc<str>> {
        self.inner
            .handlers
            .iter()
            .map(|h| h.name.clone())
            .collect()
    }

    pub fn revision(&self) -> u64 {
        self.inner.revision
    }

    pub fn strict(&self) -> bool {
        self.inner.strict
    }

    pub fn content_hash(&self) -> &Arc<str> {
        &self.inner.hash
    }

    /// Names of the cached schemas this one was built from.
    pub fn references(&self) -> &BTreeSet<Arc<str>> {
        &self.inner.references
    }

    pub(crate) fn env_id(&self) -> u64 {
        self.inner.env_id
    }

    pub(crate) fn env_revision(&self) -> u64 {
        self.inner.env_revision
    }

    /// Produce the next revision of this schema from an edited copy of its
    /// raw mapping. `self` is left untouched; the environment's cache entry
    /// is swapped to the new revision.
    pub fn revise<F>(&self, env: &Environment, edit: F) -> Result<Schema, CompileError>
    where
        F: FnOnce(&mut Map),
    {
        let mut raw = self.inner.raw.clone();
        if let Value::Object(map) = &mut raw {
            edit(Arc::make_mut(map));
        }
        env.store_revision(self, raw)
    }

    /// Human readable description of every recognized constraint.
    pub fn describe(&self) -> Vec<(Arc<str>, String)> {
        let Ok(map) = self.inner.raw.as_object() else {
            return vec![];
        };
        map.iter()
            .filter_map(|(key, value)| {
                let def = self.inner.registry.get(key)?;
                Some((def.name.clone(), def.describe(value)))
            })
            .collect()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.inner.name)
            .field("revision", &self.inner.revision)
            .field("strict", &self.inner.strict)
            .field("declared", &self.inner.declared)
            .field("constraints", &self.constraint_names())
            .finish_non_exhaustive()
    }
}
