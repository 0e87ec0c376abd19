// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, info};

use crate::config::Config;
use crate::descriptor::{DescriptorId, DescriptorRecord, SchemaDescriptor, TypeBinding};
use crate::error::{Result, SchemaError};
use crate::introspect::SchemaIntrospector;
use crate::layout::TypeLayout;
use crate::rebind::FieldRebinder;
use crate::resolve::SchemaEvolutionResolver;
use crate::shaped::Described;
use crate::storage::{Storage, StoredDescriptor};
use crate::type_tag::TypeCodeRegistry;

// ---------------------------------------------------------------------------
// SchemaRegistry
// ---------------------------------------------------------------------------

/// Session index of schema descriptors for one storage.
///
/// Every version seen in this session lives in an arena keyed by
/// [`DescriptorId`]. A second map points each type name at its current,
/// resolved version; it doubles as the memoization cache for embedded values.
/// Both are safe to read concurrently and only written while the storage's
/// structural lock is held.
pub struct SchemaRegistry {
    storage: Arc<dyn Storage>,
    codes: TypeCodeRegistry,
    /// Every descriptor loaded or minted in this session.
    versions: DashMap<DescriptorId, Arc<SchemaDescriptor>>,
    /// Type name -> current resolved version.
    current: DashMap<Arc<str>, DescriptorId>,
    /// Superseded version -> the version minted to replace it.
    successors: DashMap<DescriptorId, DescriptorId>,
}

impl SchemaRegistry {
    /// Open a schema session over `storage`.
    pub fn new(storage: Arc<dyn Storage>, config: &Config) -> Self {
        SchemaRegistry {
            storage,
            codes: TypeCodeRegistry::new(config.fallback),
            versions: DashMap::new(),
            current: DashMap::new(),
            successors: DashMap::new(),
        }
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn type_codes(&self) -> &TypeCodeRegistry {
        &self.codes
    }

    /// Current resolved descriptor of a live type.
    ///
    /// The first call in a session either registers the type (generation 1),
    /// confirms the stored version, or mints a successor when the type drifted.
    /// Later calls are served from the session index.
    pub fn current_schema(&self, layout: &Arc<TypeLayout>) -> Result<Arc<SchemaDescriptor>> {
        self.current_schema_in(layout, &mut Vec::new())
    }

    /// [`current_schema`](Self::current_schema) for a derived type.
    pub fn current_schema_of<T: Described>(&self) -> Result<Arc<SchemaDescriptor>> {
        self.current_schema(&T::layout())
    }

    /// Descriptor currently indexed for `type_name`, without touching storage.
    pub fn cached(&self, type_name: &str) -> Option<Arc<SchemaDescriptor>> {
        let id = *self.current.get(type_name)?;
        self.versions.get(&id).map(|d| Arc::clone(d.value()))
    }

    pub(crate) fn current_schema_in(
        &self,
        layout: &Arc<TypeLayout>,
        stack: &mut Vec<Arc<str>>,
    ) -> Result<Arc<SchemaDescriptor>> {
        if let Some(desc) = self.cached(layout.name()) {
            debug!("[registry] cache hit for {} ({})", layout.name(), desc.id());
            return Ok(desc);
        }
        if stack.iter().any(|name| &**name == layout.name()) {
            return Err(SchemaError::descriptor_failure(
                layout.name(),
                "embedded value contains itself",
            ));
        }

        match self.storage.lookup_descriptor(layout.name())? {
            Some(StoredDescriptor { id, record }) => {
                let stored = self.version_or_insert(id, record);
                SchemaEvolutionResolver::new(self).resolve_in(&stored, Some(layout), stack)
            }
            None => self.register_first(layout, stack),
        }
    }

    fn register_first(
        &self,
        layout: &Arc<TypeLayout>,
        stack: &mut Vec<Arc<str>>,
    ) -> Result<Arc<SchemaDescriptor>> {
        let draft = SchemaIntrospector::new(self).build_in(layout, stack)?;

        let _lock = self.storage.structural_lock();
        if let Some(desc) = self.cached(layout.name()) {
            return Ok(desc);
        }

        let record = DescriptorRecord {
            type_name: draft.type_name,
            generation: 1,
            predecessor: None,
            has_references: draft.has_references,
            fields: draft.fields,
        };
        let id = self.storage.register_descriptor(&record)?;
        let accessors = draft.accessors.into_iter().map(Some).collect();
        let desc = Arc::new(SchemaDescriptor::minted(
            id,
            record,
            TypeBinding::new(draft.layout, accessors),
        ));
        self.insert_version(&desc);
        self.publish(&desc);

        info!(
            "[registry] registered {} as {} ({} fields)",
            desc.type_name(),
            id,
            desc.fields().len()
        );
        Ok(desc)
    }

    /// Any persisted version by identity, unbound if it was never used in this session.
    pub fn load(&self, id: DescriptorId) -> Result<Option<Arc<SchemaDescriptor>>> {
        if let Some(desc) = self.versions.get(&id) {
            return Ok(Some(Arc::clone(desc.value())));
        }
        Ok(self
            .storage
            .load_descriptor(id)?
            .map(|record| self.version_or_insert(id, record)))
    }

    /// Descriptor for data tagged with an older identity, bound to the live type.
    ///
    /// The live layout is taken from the session index when the type is
    /// current in this session, otherwise from the storage's type loader.
    pub fn schema_for_legacy_version(
        &self,
        id: DescriptorId,
    ) -> Result<Option<Arc<SchemaDescriptor>>> {
        let Some(desc) = self.load(id)? else {
            return Ok(None);
        };
        if !desc.is_bound() {
            let live = self
                .cached(desc.type_name())
                .and_then(|current| current.binding().map(|b| Arc::clone(b.layout())));
            match live {
                Some(layout) => FieldRebinder::rebind(&desc, &layout)?,
                None => FieldRebinder::rebind_loaded(&desc, self.storage())?,
            }
        }
        Ok(Some(desc))
    }

    /// `id` followed by its predecessors, newest first.
    ///
    /// A predecessor link that revisits a version is reported as a corrupt catalog.
    pub fn version_chain(&self, id: DescriptorId) -> Result<Vec<Arc<SchemaDescriptor>>> {
        let mut chain: Vec<Arc<SchemaDescriptor>> = Vec::new();
        let mut next = Some(id);
        while let Some(id) = next {
            if chain.iter().any(|seen| seen.id() == id) {
                return Err(SchemaError::CorruptCatalog {
                    offset: 0,
                    reason: format!("version chain loops back to descriptor {}", id),
                });
            }
            let desc = self.load(id)?.ok_or_else(|| {
                SchemaError::Storage(format!("version chain references missing descriptor {}", id))
            })?;
            next = desc.predecessor();
            chain.push(desc);
        }
        Ok(chain)
    }

    /// Reconcile a descriptor with its live type.
    pub fn resolve(&self, stored: &Arc<SchemaDescriptor>) -> Result<Arc<SchemaDescriptor>> {
        SchemaEvolutionResolver::new(self).resolve(stored)
    }

    /// End the session: drop the index and every cached version.
    pub fn close(&self) {
        let _lock = self.storage.structural_lock();
        let cached = self.versions.len();
        self.current.clear();
        self.successors.clear();
        self.versions.clear();
        debug!("[registry] closed, {} cached versions dropped", cached);
    }

    // Bookkeeping used by the resolver. Callers hold the structural lock.

    pub(crate) fn successor_of(&self, stored: &SchemaDescriptor) -> Option<Arc<SchemaDescriptor>> {
        let id = *self.successors.get(&stored.id())?;
        self.versions.get(&id).map(|d| Arc::clone(d.value()))
    }

    pub(crate) fn insert_version(&self, desc: &Arc<SchemaDescriptor>) {
        self.versions.insert(desc.id(), Arc::clone(desc));
    }

    pub(crate) fn record_successor(&self, stored: &SchemaDescriptor, successor: &SchemaDescriptor) {
        self.successors.insert(stored.id(), successor.id());
    }

    /// Make `desc` the current version of its type.
    pub(crate) fn publish(&self, desc: &SchemaDescriptor) {
        self.current
            .insert(Arc::clone(&desc.record().type_name), desc.id());
    }

    pub(crate) fn version_or_insert(&self, id: DescriptorId, record: DescriptorRecord) -> Arc<SchemaDescriptor> {
        let entry = self
            .versions
            .entry(id)
            .or_insert_with(|| Arc::new(SchemaDescriptor::loaded(id, record)));
        Arc::clone(entry.value())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
