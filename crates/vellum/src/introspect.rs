// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Catalog construction from a live type layout.
//!
//! The ancestor chain is walked base-first and only the fields declared at
//! each level are visited, so a field shadowed by a derived level appears
//! once per declaring level. Embedded values are resolved to their own
//! current descriptor through the session registry, which also memoizes them.

use std::collections::HashSet;
use std::sync::Arc;

use log::debug;

use crate::descriptor::{FieldAccessor, FieldEntry};
use crate::error::{Result, SchemaError};
use crate::layout::{Shape, TypeLayout};
use crate::registry::SchemaRegistry;

/// Catalog freshly built from a live layout, not yet registered.
#[derive(Debug, Clone)]
pub struct CatalogDraft {
    pub type_name: Arc<str>,
    pub fields: Vec<FieldEntry>,
    /// Live position of each entry in `fields`.
    pub accessors: Vec<FieldAccessor>,
    pub has_references: bool,
    pub layout: Arc<TypeLayout>,
}

/// Builds ordered field catalogs.
pub struct SchemaIntrospector<'r> {
    registry: &'r SchemaRegistry,
}

impl<'r> SchemaIntrospector<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Build the catalog of `layout`.
    ///
    /// Nested embedded schemas are registered as a side effect.
    pub fn build(&self, layout: &Arc<TypeLayout>) -> Result<CatalogDraft> {
        self.build_in(layout, &mut Vec::new())
    }

    /// `stack` holds the names of the embedded values currently being built.
    pub(crate) fn build_in(
        &self,
        layout: &Arc<TypeLayout>,
        stack: &mut Vec<Arc<str>>,
    ) -> Result<CatalogDraft> {
        if layout.constructor().is_none() {
            return Err(SchemaError::descriptor_failure(
                layout.name(),
                "no zero-argument constructor",
            ));
        }

        stack.push(Arc::clone(layout.name_arc()));
        let built = self.collect_fields(layout, stack);
        stack.pop();
        let (fields, accessors, has_references) = built?;

        debug!(
            "[introspect] {}: {} fields, has_references={}",
            layout.name(),
            fields.len(),
            has_references
        );

        Ok(CatalogDraft {
            type_name: Arc::clone(layout.name_arc()),
            fields,
            accessors,
            has_references,
            layout: Arc::clone(layout),
        })
    }

    fn collect_fields(
        &self,
        layout: &Arc<TypeLayout>,
        stack: &mut Vec<Arc<str>>,
    ) -> Result<(Vec<FieldEntry>, Vec<FieldAccessor>, bool)> {
        let codes = self.registry.type_codes();
        let mut fields = Vec::new();
        let mut accessors = Vec::new();
        let mut has_references = false;

        for (level, ancestor) in layout.ancestry().into_iter().enumerate() {
            let mut seen = HashSet::new();
            for (slot, field) in ancestor.declared_fields().iter().enumerate() {
                if !seen.insert(field.name()) {
                    return Err(SchemaError::descriptor_failure(
                        layout.name(),
                        format!(
                            "field {} declared twice by {}",
                            field.name(),
                            ancestor.name()
                        ),
                    ));
                }
                if !field.is_persistent() {
                    continue;
                }

                let tag = codes.classify(field.shape())?;
                let nested = if tag.is_embedded() {
                    let value_layout = self.value_layout(field.shape())?;
                    let nested = self.registry.current_schema_in(&value_layout, stack)?;
                    has_references |= nested.has_references();
                    Some(nested.id())
                } else {
                    has_references |= tag.is_reference();
                    None
                };

                fields.push(FieldEntry {
                    field_name: Arc::from(field.name()),
                    owner_type: Arc::clone(ancestor.name_arc()),
                    tag,
                    nested,
                });
                accessors.push(FieldAccessor { level, slot });
            }
        }

        Ok((fields, accessors, has_references))
    }

    /// Layout of the value embedded by a field classified as embedded.
    fn value_layout(&self, shape: &Shape) -> Result<Arc<TypeLayout>> {
        match shape {
            Shape::Value(layout) => Ok(Arc::clone(layout)),
            Shape::Array(component) => self.value_layout(component),
            // Only reachable under the implicit-value fallback.
            Shape::Opaque(name) => self.registry.storage().load_type(name),
            other => Err(SchemaError::UnsupportedType {
                shape: other.to_string(),
            }),
        }
    }
}
