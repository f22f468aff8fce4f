// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::value::Kinds;

use std::sync::Arc;

use indexmap::IndexMap;

/// Maps a dialect's type names onto concrete value kinds.
#[derive(Debug, Clone, Default)]
pub struct PrimitiveTypes {
    types: IndexMap<Arc<str>, Kinds>,
}

impl PrimitiveTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Type names of the native dialect.
    pub fn native() -> Self {
        let mut p = Self::new();
        p.insert("int", Kinds::INTEGER);
        p.insert("float", Kinds::FLOAT);
        p.insert("number", Kinds::NUMBER);
        p.insert("str", Kinds::STRING);
        p.insert("bytes", Kinds::BYTES);
        p.insert("list", Kinds::ARRAY);
        p.insert("sequence", Kinds::ARRAY);
        p.insert("tuple", Kinds::ARRAY);
        p.insert("dict", Kinds::OBJECT);
        p.insert("mapping", Kinds::OBJECT);
        p.insert("bool", Kinds::BOOLEAN);
        p.insert("none", Kinds::NULL);
        p.insert("object", Kinds::ANY);
        p
    }

    /// Type names of the JSON Schema dialect.
    pub fn json() -> Self {
        let mut p = Self::new();
        p.insert("number", Kinds::NUMBER);
        p.insert("integer", Kinds::INTEGER);
        p.insert("string", Kinds::STRING);
        p.insert("object", Kinds::OBJECT);
        p.insert("array", Kinds::ARRAY);
        p.insert("boolean", Kinds::BOOLEAN);
        p.insert("null", Kinds::NULL);
        p
    }

    pub fn insert(&mut self, name: &str, kinds: Kinds) -> Option<Kinds> {
        self.types.insert(name.into(), kinds)
    }

    pub fn remove(&mut self, name: &str) -> Option<Kinds> {
        self.types.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Kinds> {
        self.types.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(|k| k.as_ref())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
