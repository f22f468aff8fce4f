// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::pattern_type_mismatch)]

use crate::inflection::Inflection;
use crate::schema::error::CompileError;
use crate::schema::{CompileContext, Handler};
use crate::value::{Kinds, Value, ValueKind};

use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;


/// Names no constraint may take.
pub const RESERVED_NAMES: &[&str] = &["system", "env"];

/// Compiles the raw value of one constraint into a handler. `None` means
/// the constraint only carries metadata.
pub type Compiler = fn(&CompileContext<'_>, &Value) -> Result<Option<Handler>, CompileError>;

/// Errors that can occur when interacting with a ConstraintRegistry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("constraint registration failed: the name '{name}' is reserved or already registered")]
    NameCollision { name: Arc<str> },
    #[error("constraint registration failed: the name '{name}' is invalid (empty or whitespace-only names are not allowed)")]
    InvalidName { name: Arc<str> },
    #[error("no constraint named '{name}'")]
    UnknownConstraint { name: Arc<str> },
}

/// Validates that a name is not empty or whitespace-only.
pub fn validate_name(name: &str) -> Result<(), RegistryError> {
    if name.trim().is_empty() {
        Err(RegistryError::InvalidName { name: name.into() })
    } else {
        Ok(())
    }
}

/// A named constraint factory and the kinds of values it applies to.
#[derive(Clone)]
pub struct ConstraintDefinition {
    pub name: Arc<str>,
    /// Human readable description; `{value}` is replaced by the raw constraint value.
    pub description: Arc<str>,
    pub compiler: Compiler,
    pub require: Option<Kinds>,
    pub exclude: Option<Kinds>,
}

impl ConstraintDefinition {
    pub fn new(name: &str, description: &str, compiler: Compiler) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            compiler,
            require: None,
            exclude: None,
        }
    }

    pub fn require(mut self, kinds: Kinds) -> Self {
        self.require = Some(kinds);
        self
    }

    pub fn exclude(mut self, kinds: Kinds) -> Self {
        self.exclude = Some(kinds);
        self
    }

    /// Kinds in `require` (or any kind) that are not in `exclude`.
    pub fn applicable_kinds(&self) -> Kinds {
        let required = self.require.unwrap_or(Kinds::ANY);
        match self.exclude {
            Some(excluded) => Kinds::from_iter(required.iter().filter(|k| !excluded.contains(*k))),
            None => required,
        }
    }

    pub fn is_applicable(&self, kind: ValueKind) -> bool {
        self.applicable_kinds().contains(kind)
    }

    pub fn describe(&self, value: &Value) -> String {
        self.description.replace("{value}", &value.to_string())
    }
}

impl fmt::Debug for ConstraintDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintDefinition")
            .field("name", &self.name)
            .field("require", &self.require)
            .field("exclude", &self.exclude)
            .finish_non_exhaustive()
    }
}

/// Constraint definitions keyed by their inflected public name.
///
/// Lookups normalize the requested name with the registry's inflection, then
/// follow the alias table, so `maxLength`, `max-length` and `max_length` find
/// the same definition in an underscore registry.
#[derive(Clone)]
pub struct ConstraintRegistry {
    inflection: Inflection,
    definitions: IndexMap<Arc<str>, Arc<ConstraintDefinition>>,
    aliases: HashMap<Arc<str>, Arc<str>>,
}

impl ConstraintRegistry {
    pub fn new(inflection: Inflection) -> Self {
        Self {
            inflection,
            definitions: IndexMap::new(),
            aliases: HashMap::new(),
        }
    }

    pub fn inflection(&self) -> Inflection {
        self.inflection
    }

    pub fn inflect(&self, name: &str) -> String {
        (self.inflection)(name)
    }

    /// Register a constraint. Fails if the inflected name is reserved, or is
    /// already taken and `overwrite` is false.
    pub fn register(
        &mut self,
        definition: ConstraintDefinition,
        overwrite: bool,
    ) -> Result<(), RegistryError> {
        validate_name(&definition.name)?;
        let name: Arc<str> = self.inflect(&definition.name).into();
        if name.is_empty() {
            return Err(RegistryError::InvalidName {
                name: definition.name,
            });
        }
        if RESERVED_NAMES.contains(&name.as_ref())
            || (!overwrite && self.definitions.contains_key(&name))
        {
            return Err(RegistryError::NameCollision { name });
        }
        self.define(definition);
        Ok(())
    }

    /// Inserts a built-in definition, replacing any previous one.
    pub(crate) fn define(&mut self, mut definition: ConstraintDefinition) {
        let name: Arc<str> = self.inflect(&definition.name).into();
        definition.name = name.clone();
        self.definitions.insert(name, Arc::new(definition));
    }

    /// Make `alias` resolve to the constraint registered as `target`.
    pub fn add_alias(&mut self, alias: &str, target: &str) -> Result<(), RegistryError> {
        let target = self
            .resolve(target)
            .ok_or_else(|| RegistryError::UnknownConstraint {
                name: target.into(),
            })?;
        let alias: Arc<str> = self.inflect(alias).into();
        if self.definitions.contains_key(&alias) || RESERVED_NAMES.contains(&alias.as_ref()) {
            return Err(RegistryError::NameCollision { name: alias });
        }
        self.aliases.insert(alias, target);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<ConstraintDefinition>> {
        let name = self.resolve(name)?;
        self.aliases.retain(|_, target| *target != name);
        self.definitions.shift_remove(&name)
    }

    /// Canonical public name of `name`, if it denotes a registered constraint.
    pub fn resolve(&self, name: &str) -> Option<Arc<str>> {
        let inflected = self.inflect(name);
        if let Some((key, _)) = self.definitions.get_key_value(inflected.as_str()) {
            return Some(key.clone());
        }
        self.aliases.get(inflected.as_str()).cloned()
    }

    pub fn get(&self, name: &str) -> Option<Arc<ConstraintDefinition>> {
        let name = self.resolve(name)?;
        self.definitions.get(&name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn names(&self) -> Vec<Arc<str>> {
        self.definitions.keys().cloned().collect()
    }

    pub fn aliases(&self) -> &HashMap<Arc<str>, Arc<str>> {
        &self.aliases
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Projects this registry into another dialect.
    ///
    /// Every definition keeps its compiler. `renames` pairs a target-dialect
    /// name with the origin name it exposes; the inflected origin name stays
    /// behind as an alias. When `include` is given, only those names (in the
    /// target inflection) and the renamed constraints are carried over.
    pub fn clone_with(
        &self,
        include: Option<&[&str]>,
        renames: &[(&str, &str)],
        inflection: Option<Inflection>,
    ) -> ConstraintRegistry {
        let inflection = inflection.unwrap_or(self.inflection);
        let mut projected = ConstraintRegistry::new(inflection);

        let included: Option<Vec<String>> =
            include.map(|names| names.iter().map(|n| inflection(n)).collect());

        for (origin, definition) in &self.definitions {
            let renamed = renames
                .iter()
                .find(|(_, old)| self.inflect(old).as_str() == &**origin);
            let natural = inflection(origin);
            let public = match renamed {
                Some((new, _)) => inflection(new),
                None => natural.clone(),
            };

            let keep = renamed.is_some()
                || included
                    .as_ref()
                    .map_or(true, |names| names.iter().any(|n| *n == public));
            if !keep {
                continue;
            }

            let public: Arc<str> = public.into();
            let mut definition = definition.as_ref().clone();
            definition.name = public.clone();
            projected
                .definitions
                .insert(public.clone(), Arc::new(definition));
            if natural != *public {
                projected.aliases.insert(natural.into(), public);
            }
        }

        projected
    }
}

impl fmt::Debug for ConstraintRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintRegistry")
            .field("constraints", &self.definitions.keys().collect::<Vec<_>>())
            .field("aliases", &self.aliases)
            .finish_non_exhaustive()
    }
}
