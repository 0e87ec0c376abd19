// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reconciliation of a stored descriptor with the live type.
//!
//! The candidate catalog is built outside the structural lock. Confirming
//! or superseding a version is serialized, and both re-check whether the
//! stored descriptor was already superseded, by another thread or by an
//! earlier session. A superseded version is never published as current.

use std::sync::Arc;

use log::{debug, info};

use crate::descriptor::{DescriptorRecord, SchemaDescriptor, TypeBinding};
use crate::drift::diff_fields;
use crate::error::Result;
use crate::introspect::{CatalogDraft, SchemaIntrospector};
use crate::layout::TypeLayout;
use crate::rebind::FieldRebinder;
use crate::registry::SchemaRegistry;

/// Decides whether a stored descriptor still matches its live type.
pub struct SchemaEvolutionResolver<'r> {
    registry: &'r SchemaRegistry,
}

impl<'r> SchemaEvolutionResolver<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Resolve `stored` against the type its name loads to.
    ///
    /// Returns `stored` itself when the live catalog is identical, otherwise
    /// the newly registered successor. A `stored` version that was already
    /// superseded resolves its latest successor instead.
    pub fn resolve(&self, stored: &Arc<SchemaDescriptor>) -> Result<Arc<SchemaDescriptor>> {
        self.resolve_in(stored, None, &mut Vec::new())
    }

    pub(crate) fn resolve_in(
        &self,
        stored: &Arc<SchemaDescriptor>,
        live: Option<&Arc<TypeLayout>>,
        stack: &mut Vec<Arc<str>>,
    ) -> Result<Arc<SchemaDescriptor>> {
        if stored.is_resolved() {
            return Ok(Arc::clone(stored));
        }
        if let Some(newer) = self.newer_version(stored)? {
            return self.resolve_in(&newer, live, stack);
        }

        // The live layout wins over a binding installed by a legacy lookup.
        let layout = match (live, stored.binding()) {
            (Some(live), Some(binding)) => {
                if !Arc::ptr_eq(live, binding.layout()) {
                    debug!(
                        "[resolve] {} {} bound to another layout, comparing against live type",
                        stored.type_name(),
                        stored.id()
                    );
                }
                Arc::clone(live)
            }
            (None, Some(binding)) => Arc::clone(binding.layout()),
            (live, None) => {
                let layout = match live {
                    Some(layout) => Arc::clone(layout),
                    None => self.registry.storage().load_type(stored.type_name())?,
                };
                FieldRebinder::rebind(stored, &layout)?;
                layout
            }
        };

        let candidate = SchemaIntrospector::new(self.registry).build_in(&layout, stack)?;

        if candidate.fields == stored.fields() && candidate.has_references == stored.has_references()
        {
            let lock = self.registry.storage().structural_lock();
            if let Some(newer) = self.newer_version(stored)? {
                drop(lock);
                return self.resolve_in(&newer, live, stack);
            }
            stored.mark_resolved();
            self.registry.publish(stored);
            debug!(
                "[resolve] {} {} matches live type",
                stored.type_name(),
                stored.id()
            );
            return Ok(Arc::clone(stored));
        }

        let lock = self.registry.storage().structural_lock();
        if let Some(newer) = self.newer_version(stored)? {
            drop(lock);
            debug!(
                "[resolve] {} {} already superseded by {}",
                stored.type_name(),
                stored.id(),
                newer.id()
            );
            return self.resolve_in(&newer, live, stack);
        }
        self.supersede(stored, candidate)
    }

    /// Version that replaced `stored`, minted in this session or persisted
    /// by an earlier one.
    ///
    /// Versions of one type form a single chain, so any latest persisted
    /// version other than `stored` is newer.
    fn newer_version(&self, stored: &SchemaDescriptor) -> Result<Option<Arc<SchemaDescriptor>>> {
        if let Some(successor) = self.registry.successor_of(stored) {
            return Ok(Some(successor));
        }
        match self.registry.storage().lookup_descriptor(stored.type_name())? {
            Some(latest) if latest.id != stored.id() => Ok(Some(
                self.registry.version_or_insert(latest.id, latest.record),
            )),
            _ => Ok(None),
        }
    }

    /// Mint the successor of `stored`. The caller holds the structural lock.
    fn supersede(
        &self,
        stored: &Arc<SchemaDescriptor>,
        candidate: CatalogDraft,
    ) -> Result<Arc<SchemaDescriptor>> {
        let storage = self.registry.storage();
        let _lock = storage.structural_lock();

        for change in diff_fields(stored.fields(), &candidate.fields) {
            debug!("[resolve] {}: {}", stored.type_name(), change);
        }

        let record = DescriptorRecord {
            type_name: candidate.type_name,
            generation: stored.generation() + 1,
            predecessor: Some(stored.id()),
            has_references: candidate.has_references,
            fields: candidate.fields,
        };
        let id = storage.register_descriptor(&record)?;
        let accessors = candidate.accessors.into_iter().map(Some).collect();
        let desc = Arc::new(SchemaDescriptor::minted(
            id,
            record,
            TypeBinding::new(candidate.layout, accessors),
        ));

        self.registry.insert_version(&desc);
        self.registry.record_successor(stored, &desc);
        self.registry.publish(&desc);

        info!(
            "[resolve] {} evolved: {} (generation {}) supersedes {}",
            desc.type_name(),
            id,
            desc.generation(),
            stored.id()
        );
        Ok(desc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::descriptor::{DescriptorId, FieldEntry};
    use crate::layout::{Constructor, Shape};
    use crate::loader::TypeLoader;
    use crate::storage::{MemoryStorage, Storage};
    use crate::type_tag::TypeTag;

    fn point(fields: &[&str]) -> Arc<TypeLayout> {
        fields
            .iter()
            .fold(TypeLayout::builder("app::Point"), |b, name| {
                b.with(name, Shape::Int32)
            })
            .constructor(Constructor::new(|| ()))
            .build()
    }

    fn record_xy() -> DescriptorRecord {
        let entry = |name: &str| FieldEntry {
            field_name: name.into(),
            owner_type: "app::Point".into(),
            tag: TypeTag::Int32,
            nested: None,
        };
        DescriptorRecord {
            type_name: "app::Point".into(),
            generation: 1,
            predecessor: None,
            has_references: false,
            fields: vec![entry("x"), entry("y")],
        }
    }

    /// Registry over a storage holding the `{x, y}` catalog, with `layout` as the live type.
    fn reopened_with(layout: Arc<TypeLayout>) -> (SchemaRegistry, DescriptorId) {
        let original = MemoryStorage::new(Arc::new(TypeLoader::new()));
        let id = original.register_descriptor(&record_xy()).unwrap();
        let loader = TypeLoader::new();
        loader.register_layout(layout);
        let storage = original.reopen(Arc::new(loader));
        (SchemaRegistry::new(Arc::new(storage), &Config::default()), id)
    }

    #[test]
    fn resolved_descriptor_is_returned_as_is() {
        let storage = MemoryStorage::new(Arc::new(TypeLoader::new()));
        let registry = SchemaRegistry::new(Arc::new(storage), &Config::default());
        let desc = registry.current_schema(&point(&["x", "y"])).unwrap();
        let again = SchemaEvolutionResolver::new(&registry).resolve(&desc).unwrap();
        assert!(Arc::ptr_eq(&desc, &again));
    }

    #[test]
    fn matching_stored_descriptor_is_marked_resolved() {
        let (registry, id) = reopened_with(point(&["x", "y"]));
        let stored = registry.load(id).unwrap().unwrap();
        assert!(!stored.is_resolved());

        let resolved = SchemaEvolutionResolver::new(&registry).resolve(&stored).unwrap();
        assert!(Arc::ptr_eq(&stored, &resolved));
        assert!(stored.is_resolved());
        assert!(stored.is_bound());
        assert_eq!(registry.storage().catalog().unwrap().len(), 1);
    }

    #[test]
    fn drift_mints_successor_with_predecessor_link() {
        let (registry, id) = reopened_with(point(&["x", "y", "z"]));
        let stored = registry.load(id).unwrap().unwrap();
        let resolved = SchemaEvolutionResolver::new(&registry).resolve(&stored).unwrap();

        assert_ne!(resolved.id(), stored.id());
        assert_eq!(resolved.predecessor(), Some(stored.id()));
        assert_eq!(resolved.generation(), 2);
        assert_eq!(resolved.fields().len(), 3);
        assert!(resolved.is_resolved());
        assert!(!stored.is_resolved());

        // Resolving the superseded version again yields the same successor.
        let again = SchemaEvolutionResolver::new(&registry).resolve(&stored).unwrap();
        assert!(Arc::ptr_eq(&resolved, &again));
        assert_eq!(registry.storage().catalog().unwrap().len(), 2);
    }

    #[test]
    fn version_superseded_in_earlier_session_resolves_to_its_successor() {
        let base = MemoryStorage::new(Arc::new(TypeLoader::new()));
        let v1 = base.register_descriptor(&record_xy()).unwrap();
        let second = Arc::new(base.reopen(Arc::new(TypeLoader::new())));
        let v2 = SchemaRegistry::new(second.clone(), &Config::default())
            .current_schema(&point(&["x", "y", "z"]))
            .unwrap();
        assert_eq!(v2.predecessor(), Some(v1));

        // A later session, whose live type matches v2, is handed v1.
        let loader = TypeLoader::new();
        loader.register_layout(point(&["x", "y", "z"]));
        let third = SchemaRegistry::new(
            Arc::new(second.reopen(Arc::new(loader))),
            &Config::default(),
        );
        let stale = third.load(v1).unwrap().unwrap();
        let resolved = SchemaEvolutionResolver::new(&third).resolve(&stale).unwrap();

        assert_eq!(resolved.id(), v2.id());
        assert!(resolved.is_resolved());
        assert!(!stale.is_resolved());
        assert_eq!(third.cached("app::Point").unwrap().id(), v2.id());
        assert_eq!(third.storage().catalog().unwrap().len(), 2);
    }

    #[test]
    fn live_layout_takes_precedence_over_legacy_binding() {
        let (registry, id) = reopened_with(point(&["x", "y"]));
        // Bound to the loader's {x, y} layout by a legacy lookup.
        let legacy = registry.schema_for_legacy_version(id).unwrap().unwrap();
        assert!(legacy.is_bound());

        let current = registry.current_schema(&point(&["x", "y", "z"])).unwrap();
        assert_eq!(current.predecessor(), Some(id));
        assert_eq!(current.fields().len(), 3);
        assert!(!legacy.is_resolved());
    }

    #[test]
    fn reordered_fields_count_as_drift() {
        let (registry, id) = reopened_with(point(&["y", "x"]));
        let stored = registry.load(id).unwrap().unwrap();
        let resolved = SchemaEvolutionResolver::new(&registry).resolve(&stored).unwrap();
        assert_eq!(resolved.predecessor(), Some(id));
        assert_eq!(&*resolved.fields()[0].field_name, "y");
    }

    #[test]
    fn unloadable_type_is_class_not_found() {
        let storage = MemoryStorage::new(Arc::new(TypeLoader::new()));
        let id = storage.register_descriptor(&record_xy()).unwrap();
        let registry = SchemaRegistry::new(Arc::new(storage), &Config::default());
        let stored = registry.load(id).unwrap().unwrap();
        assert!(matches!(
            SchemaEvolutionResolver::new(&registry).resolve(&stored),
            Err(crate::error::SchemaError::ClassNotFound { .. })
        ));
    }
}
