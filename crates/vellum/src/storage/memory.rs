// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-memory storage backend
//!
//! Records are kept in their encoded form so that a reopened storage goes
//! through the same decode path as an on-disk one.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, RwLock};

use super::{Storage, StoredDescriptor, StructuralLock};
use crate::codec::{decode_record, encode_record};
use crate::descriptor::{DescriptorId, DescriptorRecord};
use crate::error::{Result, SchemaError};
use crate::layout::TypeLayout;
use crate::loader::TypeLoader;

#[derive(Default, Clone)]
struct Catalog {
    /// Encoded records; identity is index + 1.
    records: Vec<Vec<u8>>,
    latest: HashMap<String, DescriptorId>,
}

/// Volatile storage, mainly for tests and embedding.
pub struct MemoryStorage {
    catalog: RwLock<Catalog>,
    loader: Arc<TypeLoader>,
    lock: ReentrantMutex<()>,
}

impl MemoryStorage {
    pub fn new(loader: Arc<TypeLoader>) -> Self {
        Self {
            catalog: RwLock::new(Catalog::default()),
            loader,
            lock: ReentrantMutex::new(()),
        }
    }

    /// Same persisted catalog, seen by a program with a different set of types.
    pub fn reopen(&self, loader: Arc<TypeLoader>) -> Self {
        Self {
            catalog: RwLock::new(self.catalog.read().clone()),
            loader,
            lock: ReentrantMutex::new(()),
        }
    }

    pub fn loader(&self) -> &Arc<TypeLoader> {
        &self.loader
    }

    /// Number of persisted versions.
    pub fn len(&self) -> usize {
        self.catalog.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn decode_at(catalog: &Catalog, id: DescriptorId) -> Result<Option<DescriptorRecord>> {
        match catalog.records.get(id.get() as usize - 1) {
            Some(bytes) => decode_record(bytes).map(Some),
            None => Ok(None),
        }
    }
}

impl Storage for MemoryStorage {
    fn lookup_descriptor(&self, type_name: &str) -> Result<Option<StoredDescriptor>> {
        let catalog = self.catalog.read();
        let Some(&id) = catalog.latest.get(type_name) else {
            return Ok(None);
        };
        Ok(Self::decode_at(&catalog, id)?.map(|record| StoredDescriptor { id, record }))
    }

    fn load_descriptor(&self, id: DescriptorId) -> Result<Option<DescriptorRecord>> {
        Self::decode_at(&self.catalog.read(), id)
    }

    fn register_descriptor(&self, record: &DescriptorRecord) -> Result<DescriptorId> {
        let bytes = encode_record(record);
        let mut catalog = self.catalog.write();
        catalog.records.push(bytes);
        let id = DescriptorId::new(catalog.records.len() as u32)
            .ok_or_else(|| SchemaError::Storage("descriptor identity overflow".into()))?;
        catalog.latest.insert(record.type_name.to_string(), id);
        Ok(id)
    }

    fn load_type(&self, type_name: &str) -> Result<Arc<TypeLayout>> {
        self.loader.load(type_name)
    }

    fn structural_lock(&self) -> StructuralLock<'_> {
        self.lock.lock()
    }

    fn catalog(&self) -> Result<Vec<StoredDescriptor>> {
        let catalog = self.catalog.read();
        catalog
            .records
            .iter()
            .enumerate()
            .map(|(i, bytes)| {
                let id = DescriptorId::new(i as u32 + 1)
                    .ok_or_else(|| SchemaError::Storage("descriptor identity overflow".into()))?;
                Ok(StoredDescriptor {
                    id,
                    record: decode_record(bytes)?,
                })
            })
            .collect()
    }
}
