// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Name-to-layout resolution for types referenced by persisted catalogs.
//!
//! A loader answers from its own table first, then delegates to its parent.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Result, SchemaError};
use crate::layout::TypeLayout;
use crate::shaped::Described;

/// Type-loading mechanism used when rebinding stored descriptors.
#[derive(Default)]
pub struct TypeLoader {
    types: RwLock<HashMap<Arc<str>, Arc<TypeLayout>>>,
    parent: Option<Arc<TypeLoader>>,
}

impl TypeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader that falls back to `parent` for unknown names.
    pub fn with_parent(parent: Arc<TypeLoader>) -> Self {
        Self {
            types: RwLock::new(HashMap::new()),
            parent: Some(parent),
        }
    }

    /// Make a derived type loadable under its catalog name.
    pub fn register<T: Described>(&self) -> &Self {
        self.register_layout(T::layout())
    }

    /// Make a runtime layout loadable; replaces any previous layout with that name.
    pub fn register_layout(&self, layout: Arc<TypeLayout>) -> &Self {
        let name = Arc::clone(layout.name_arc());
        self.types.write().insert(name, layout);
        self
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.read().contains_key(type_name)
            || self.parent.as_ref().is_some_and(|p| p.contains(type_name))
    }

    pub fn load(&self, type_name: &str) -> Result<Arc<TypeLayout>> {
        if let Some(layout) = self.types.read().get(type_name) {
            return Ok(Arc::clone(layout));
        }
        match &self.parent {
            Some(parent) => parent.load(type_name),
            None => Err(SchemaError::class_not_found(type_name)),
        }
    }
}

impl std::fmt::Debug for TypeLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.types.read().keys().map(|k| k.to_string()).collect();
        names.sort();
        f.debug_struct("TypeLoader")
            .field("types", &names)
            .field("parent", &self.parent)
            .finish()
    }
}
