// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::descriptor::{fingerprint, DescriptorId};
use crate::drift::{diff_fields, FieldChange};
use crate::error::{Result, SchemaError};
use crate::storage::{Storage, StoredDescriptor};
use crate::type_tag::TypeTag;

// ---------------------------------------------------------------------------
// Export model
// ---------------------------------------------------------------------------

/// One catalog entry as exported.
#[derive(Debug, Clone, Serialize)]
pub struct FieldExport {
    pub name: Arc<str>,
    pub owner: Arc<str>,
    pub signature: TypeTag,
    pub code: u8,
    /// Encoded width, absent for variable-size tags.
    pub size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nested: Option<DescriptorId>,
}

/// One persisted descriptor version as exported.
#[derive(Debug, Clone, Serialize)]
pub struct DescriptorExport {
    pub id: DescriptorId,
    #[serde(rename = "type")]
    pub type_name: Arc<str>,
    pub generation: u32,
    pub predecessor: Option<DescriptorId>,
    pub has_references: bool,
    pub fingerprint: String,
    pub fields: Vec<FieldExport>,
    /// Differences from the predecessor; empty for a first version.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FieldChange>,
}

/// Every persisted version of a storage, ordered by identity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogExport {
    pub versions: Vec<DescriptorExport>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Dump the whole persisted catalog of `storage`.
pub fn export_catalog(storage: &dyn Storage) -> Result<CatalogExport> {
    let stored = storage.catalog()?;
    let versions = stored
        .iter()
        .map(|desc| {
            let predecessor = desc
                .record
                .predecessor
                .and_then(|p| stored.iter().find(|s| s.id == p));
            describe(desc, predecessor)
        })
        .collect();
    Ok(CatalogExport { versions })
}

fn describe(desc: &StoredDescriptor, predecessor: Option<&StoredDescriptor>) -> DescriptorExport {
    let record = &desc.record;
    DescriptorExport {
        id: desc.id,
        type_name: Arc::clone(&record.type_name),
        generation: record.generation,
        predecessor: record.predecessor,
        has_references: record.has_references,
        fingerprint: fingerprint(&record.fields),
        fields: record
            .fields
            .iter()
            .map(|e| FieldExport {
                name: Arc::clone(&e.field_name),
                owner: Arc::clone(&e.owner_type),
                signature: e.tag,
                code: e.tag.code(),
                size: e.tag.fixed_size(),
                nested: e.nested,
            })
            .collect(),
        changes: predecessor
            .map(|p| diff_fields(&p.record.fields, &record.fields))
            .unwrap_or_default(),
    }
}

impl CatalogExport {
    /// Distinct type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let names: BTreeSet<&str> = self.versions.iter().map(|v| &*v.type_name).collect();
        names.into_iter().collect()
    }

    /// Latest version of each type, sorted by type name.
    pub fn latest(&self) -> Vec<&DescriptorExport> {
        self.type_names()
            .into_iter()
            .filter_map(|name| self.history(name).into_iter().next())
            .collect()
    }

    /// Every version of `type_name`, newest first.
    pub fn history(&self, type_name: &str) -> Vec<&DescriptorExport> {
        let mut versions: Vec<&DescriptorExport> = self
            .versions
            .iter()
            .filter(|v| &*v.type_name == type_name)
            .collect();
        versions.sort_by(|a, b| b.generation.cmp(&a.generation).then(b.id.cmp(&a.id)));
        versions
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        json.map_err(|e| SchemaError::Storage(format!("serialization error: {}", e)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
