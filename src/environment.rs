// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::constraints::{BASE_CONSTRAINTS, JSON_SCHEMA_CONSTRAINTS};
use crate::formats::{normalize, FormatRegistry};
use crate::inflection::Inflection;
use crate::primitives::PrimitiveTypes;
use crate::registry::{validate_name, ConstraintDefinition, ConstraintRegistry, RegistryError};
use crate::schema::error::{CompileError, Error};
use crate::schema::Schema;
use crate::value::{Kinds, Value};

use core::convert::Infallible;
use core::fmt;
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};


static NEXT_ENVIRONMENT_ID: AtomicU64 = AtomicU64::new(1);

fn default_max_depth() -> usize {
    64
}

/// Tunables of an [`Environment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// Unknown or inapplicable constraints are errors rather than skipped.
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub ignore_all_formats: bool,
    /// Normalized names of formats the `format` constraint does not check.
    #[serde(default)]
    pub ignored_formats: BTreeSet<String>,
    /// Deepest sub-schema nesting a compile will follow.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            strict: false,
            ignore_all_formats: false,
            ignored_formats: BTreeSet::new(),
            max_depth: default_max_depth(),
        }
    }
}

impl EnvironmentConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(json)?;
        config.normalize();
        Ok(config)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(yaml)?;
        config.normalize();
        Ok(config)
    }

    fn normalize(&mut self) {
        self.ignored_formats = self.ignored_formats.iter().map(|f| normalize(f)).collect();
    }

    /// Whether the `format` constraint skips `name`.
    pub fn ignores_format(&self, name: &str) -> bool {
        self.ignore_all_formats || self.ignored_formats.contains(&normalize(name))
    }
}

/// Everything a compile reads from its environment, captured at one revision.
#[derive(Clone, Debug)]
pub struct Settings {
    pub(crate) constraints: Arc<ConstraintRegistry>,
    pub(crate) primitives: PrimitiveTypes,
    pub(crate) formats: FormatRegistry,
    pub(crate) config: EnvironmentConfig,
}

impl Settings {
    pub fn constraints(&self) -> &ConstraintRegistry {
        &self.constraints
    }

    pub fn primitives(&self) -> &PrimitiveTypes {
        &self.primitives
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }
}

/// What [`Environment::schema`] compiles.
#[derive(Clone, Debug)]
pub enum SchemaSource {
    Raw(Value),
    Compiled(Schema),
}

impl From<Value> for SchemaSource {
    fn from(v: Value) -> Self {
        SchemaSource::Raw(v)
    }
}

impl From<serde_json::Value> for SchemaSource {
    fn from(v: serde_json::Value) -> Self {
        SchemaSource::Raw(Value::from(v))
    }
}

impl From<Schema> for SchemaSource {
    fn from(s: Schema) -> Self {
        SchemaSource::Compiled(s)
    }
}

impl From<&Schema> for SchemaSource {
    fn from(s: &Schema) -> Self {
        SchemaSource::Compiled(s.clone())
    }
}

struct EnvironmentInner {
    id: u64,
    name: Arc<str>,
    settings: RwLock<Arc<Settings>>,
    schemas: DashMap<Arc<str>, Schema>,
    revision: AtomicU64,
}

/// A dialect's constraints, primitive types and formats together with a
/// cache of the schemas compiled against them.
///
/// Every mutator bumps the revision and recompiles the cache; a cached schema
/// that no longer compiles is evicted.
#[derive(Clone)]
pub struct Environment {
    inner: Arc<EnvironmentInner>,
}

impl Environment {
    pub fn new(
        name: &str,
        constraints: Arc<ConstraintRegistry>,
        primitives: PrimitiveTypes,
        config: EnvironmentConfig,
    ) -> Self {
        let settings = Settings {
            constraints,
            primitives,
            formats: FormatRegistry::builtin(),
            config,
        };
        Self {
            inner: Arc::new(EnvironmentInner {
                id: NEXT_ENVIRONMENT_ID.fetch_add(1, Ordering::Relaxed),
                name: name.into(),
                settings: RwLock::new(Arc::new(settings)),
                schemas: DashMap::new(),
                revision: AtomicU64::new(0),
            }),
        }
    }

    /// Underscore-named constraints and native type names. Strict.
    pub fn native() -> Self {
        Self::new(
            "native",
            BASE_CONSTRAINTS.clone(),
            PrimitiveTypes::native(),
            EnvironmentConfig {
                strict: true,
                ..EnvironmentConfig::default()
            },
        )
    }

    /// JSON Schema names and types. Lenient.
    pub fn json_schema() -> Self {
        Self::new(
            "jsonSchema",
            JSON_SCHEMA_CONSTRAINTS.clone(),
            PrimitiveTypes::json(),
            EnvironmentConfig::default(),
        )
    }

    pub fn with_config(self, config: EnvironmentConfig) -> Self {
        self.modify(|s| s.config = config);
        self
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::Acquire)
    }

    pub fn config(&self) -> EnvironmentConfig {
        self.inner.settings.read().config.clone()
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.inner.settings.read().clone()
    }

    pub fn inflection(&self) -> Inflection {
        self.inner.settings.read().constraints.inflection()
    }

    // Settings and the revision they belong to.
    fn snapshot(&self) -> (Arc<Settings>, u64) {
        let guard = self.inner.settings.read();
        (guard.clone(), self.revision())
    }

    /// Compile `source` with the environment's strictness and cache it under
    /// `name`, or under its content hash when no name is given.
    pub fn schema(
        &self,
        source: impl Into<SchemaSource>,
        name: Option<&str>,
    ) -> Result<Schema, Error> {
        self.build(source.into(), name, None)
    }

    pub fn schema_with_strictness(
        &self,
        source: impl Into<SchemaSource>,
        name: Option<&str>,
        strict: bool,
    ) -> Result<Schema, Error> {
        self.build(source.into(), name, Some(strict))
    }

    fn build(
        &self,
        source: SchemaSource,
        name: Option<&str>,
        strict: Option<bool>,
    ) -> Result<Schema, Error> {
        if let Some(name) = name {
            validate_name(name)?;
        }
        let (settings, revision) = self.snapshot();
        let strict = strict.unwrap_or(settings.config.strict);

        let (raw, name, schema_revision) = match source {
            SchemaSource::Compiled(s)
                if s.env_id() == self.id()
                    && s.env_revision() == revision
                    && s.strict() == strict
                    && name.map_or(true, |n| n == &**s.name()) =>
            {
                // Prefer the cached entry; it is rebuilt when a reference changes.
                return Ok(match self.get_schema(s.name()) {
                    Some(cached)
                        if cached.raw() == s.raw()
                            && cached.strict() == strict
                            && cached.env_revision() == revision
                            && cached.is_named() == s.is_named() =>
                    {
                        cached
                    }
                    _ => s,
                });
            }
            SchemaSource::Compiled(s) => {
                let name = name
                    .map(Arc::from)
                    .or_else(|| s.is_named().then(|| s.name().clone()));
                (s.raw().clone(), name, s.revision())
            }
            SchemaSource::Raw(raw) => {
                let name: Option<Arc<str>> = name.map(Arc::from);
                let key = match &name {
                    Some(name) => name.clone(),
                    None => crate::schema::content_hash(self.name(), &raw),
                };
                match self.get_schema(&key) {
                    Some(cached)
                        if cached.raw() == &raw
                            && cached.strict() == strict
                            && cached.env_revision() == revision
                            && cached.is_named() == name.is_some() =>
                    {
                        return Ok(cached);
                    }
                    Some(cached) => (raw, name, cached.revision() + 1),
                    None => (raw, name, 0),
                }
            }
        };

        let schema = Schema::compile(
            self,
            &settings,
            &raw,
            name,
            strict,
            0,
            schema_revision,
            revision,
        )?;
        self.inner
            .schemas
            .insert(schema.name().clone(), schema.clone());
        self.refresh_dependents(schema.name());
        Ok(schema)
    }

    /// Resolve a sub-schema given by name, recompiling it if it predates the
    /// current revision.
    pub(crate) fn resolve_reference(
        &self,
        name: &str,
        settings: &Settings,
        depth: usize,
    ) -> Result<Schema, CompileError> {
        let cached = self
            .get_schema(name)
            .ok_or_else(|| CompileError::UnknownSchema { name: name.into() })?;
        let revision = self.revision();
        if cached.env_revision() == revision {
            return Ok(cached);
        }
        let fresh = Schema::compile(
            self,
            settings,
            cached.raw(),
            cached.is_named().then(|| cached.name().clone()),
            cached.strict(),
            depth,
            cached.revision(),
            revision,
        )?;
        self.inner.schemas.insert(name.into(), fresh.clone());
        Ok(fresh)
    }

    pub(crate) fn store_revision(
        &self,
        previous: &Schema,
        raw: Value,
    ) -> Result<Schema, CompileError> {
        let (settings, revision) = self.snapshot();
        let schema = Schema::compile(
            self,
            &settings,
            &raw,
            previous.is_named().then(|| previous.name().clone()),
            previous.strict(),
            0,
            previous.revision() + 1,
            revision,
        )?;
        if !previous.is_named() && previous.env_id() == self.id() {
            self.inner.schemas.remove(previous.name());
        }
        self.inner
            .schemas
            .insert(schema.name().clone(), schema.clone());
        debug!(schema = %schema.name(), revision = schema.revision(), "revised schema");
        self.refresh_dependents(schema.name());
        Ok(schema)
    }

    /// Recompile the cached schemas that reference `name`, and those that
    /// reference them in turn, against the entry now stored under it.
    fn refresh_dependents(&self, name: &Arc<str>) {
        let (settings, revision) = self.snapshot();
        let mut pending = vec![name.clone()];
        let mut visited: HashSet<Arc<str>> = HashSet::from([name.clone()]);

        while let Some(changed) = pending.pop() {
            let dependents: Vec<(Arc<str>, Schema)> = self
                .inner
                .schemas
                .iter()
                .filter(|entry| entry.value().references().contains(&changed))
                .map(|entry| (entry.key().clone(), entry.value().clone()))
                .collect();

            for (key, schema) in dependents {
                if !visited.insert(key.clone()) {
                    continue;
                }
                match Schema::compile(
                    self,
                    &settings,
                    schema.raw(),
                    schema.is_named().then(|| schema.name().clone()),
                    schema.strict(),
                    0,
                    schema.revision(),
                    revision,
                ) {
                    Ok(fresh) => {
                        debug!(schema = %key, reference = %changed, "recompiled dependent schema");
                        self.inner.schemas.insert(key.clone(), fresh);
                    }
                    Err(e) => {
                        warn!(env = %self.name(), schema = %key, error = %e, "evicting schema that no longer compiles");
                        self.inner.schemas.remove(&key);
                    }
                }
                pending.push(key);
            }
        }
    }

    pub fn get_schema(&self, name: &str) -> Option<Schema> {
        self.inner.schemas.get(name).map(|entry| entry.value().clone())
    }

    /// Names under which schemas are cached.
    pub fn named_schemas(&self) -> Vec<Arc<str>> {
        let mut names: Vec<Arc<str>> = self
            .inner
            .schemas
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn remove_schema(&self, name: &str) -> Option<Schema> {
        self.inner.schemas.remove(name).map(|(_, v)| v)
    }

    pub fn get_primitive_type(&self, name: &str) -> Result<Kinds, CompileError> {
        self.inner
            .settings
            .read()
            .primitives
            .get(name)
            .ok_or_else(|| CompileError::UnknownPrimitiveType { name: name.into() })
    }

    pub fn get_constraint(&self, name: &str) -> Option<Arc<ConstraintDefinition>> {
        self.inner.settings.read().constraints.get(name)
    }

    /// Recompile every cached schema compiled at an older revision. Returns
    /// how many were recompiled.
    pub fn recompile_all(&self) -> usize {
        let (settings, revision) = self.snapshot();
        let keys: Vec<Arc<str>> = self
            .inner
            .schemas
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        let mut recompiled = 0;
        for key in keys {
            // Entries may have been refreshed already through a reference.
            let Some(schema) = self.get_schema(&key) else {
                continue;
            };
            if schema.env_revision() == revision {
                continue;
            }
            match Schema::compile(
                self,
                &settings,
                schema.raw(),
                schema.is_named().then(|| schema.name().clone()),
                schema.strict(),
                0,
                schema.revision(),
                revision,
            ) {
                Ok(fresh) => {
                    self.inner.schemas.insert(key, fresh);
                    recompiled += 1;
                }
                Err(e) => {
                    warn!(env = %self.name(), schema = %key, error = %e, "evicting schema that no longer compiles");
                    self.inner.schemas.remove(&key);
                }
            }
        }

        debug!(env = %self.name(), revision, recompiled, "recompiled schema cache");
        recompiled
    }

    fn try_modify<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Settings) -> Result<T, E>,
    {
        let out = {
            let mut guard = self.inner.settings.write();
            let mut next = Settings::clone(&guard);
            let out = f(&mut next)?;
            *guard = Arc::new(next);
            self.inner.revision.fetch_add(1, Ordering::AcqRel);
            out
        };
        self.recompile_all();
        Ok(out)
    }

    fn modify<F>(&self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        let _: Result<(), Infallible> = self.try_modify(|s| {
            f(s);
            Ok(())
        });
    }

    pub fn set_strict(&self, strict: bool) {
        self.modify(|s| s.config.strict = strict);
    }

    pub fn set_ignore_all_formats(&self, ignore: bool) {
        self.modify(|s| s.config.ignore_all_formats = ignore);
    }

    pub fn ignore_format(&self, name: &str) {
        self.modify(|s| {
            s.config.ignored_formats.insert(normalize(name));
        });
    }

    pub fn unignore_format(&self, name: &str) {
        self.modify(|s| {
            s.config.ignored_formats.remove(&normalize(name));
        });
    }

    pub fn set_primitive(&self, name: &str, kinds: Kinds) {
        self.modify(|s| {
            s.primitives.insert(name, kinds);
        });
    }

    pub fn register_format<F>(&self, name: &str, predicate: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.modify(|s| s.formats.register(name, predicate));
    }

    pub fn register_constraint(
        &self,
        definition: ConstraintDefinition,
        overwrite: bool,
    ) -> Result<(), RegistryError> {
        self.try_modify(|s| Arc::make_mut(&mut s.constraints).register(definition, overwrite))
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("name", &self.inner.name)
            .field("revision", &self.revision())
            .field("schemas", &self.inner.schemas.len())
            .finish_non_exhaustive()
    }
}
