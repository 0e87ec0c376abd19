// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema descriptors: one persisted version of a type's field layout.
//!
//! A descriptor splits into the persisted [`DescriptorRecord`] (names, tags,
//! nested identities, chain links) and session state: the `resolved` flag and
//! the one-time [`TypeBinding`] to the live type.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use md5::{Digest, Md5};
use serde::Serialize;

use crate::layout::{FieldLayout, TypeLayout};
use crate::type_tag::TypeTag;

/// Persistent identity of a descriptor version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DescriptorId(u32);

impl DescriptorId {
    /// Wrap a raw identity; 0 is reserved for "none".
    pub const fn new(raw: u32) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DescriptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One field of a catalog.
///
/// Equality covers name, owner level, tag and nested schema identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldEntry {
    pub field_name: Arc<str>,
    /// Ancestor level that declared the field.
    pub owner_type: Arc<str>,
    pub tag: TypeTag,
    /// Present iff `tag` is embedded.
    pub nested: Option<DescriptorId>,
}

/// Persisted part of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorRecord {
    pub type_name: Arc<str>,
    /// 1 for the first version of a type name.
    pub generation: u32,
    pub predecessor: Option<DescriptorId>,
    pub has_references: bool,
    /// Base-ancestor fields first.
    pub fields: Vec<FieldEntry>,
}

/// Position of a concrete field inside a live layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldAccessor {
    /// Index into [`TypeLayout::ancestry`], base first.
    pub level: usize,
    /// Index into that level's declared fields.
    pub slot: usize,
}

impl FieldAccessor {
    pub fn field<'a>(&self, layout: &'a TypeLayout) -> Option<&'a FieldLayout> {
        layout
            .ancestry()
            .get(self.level)
            .and_then(|level| level.declared_fields().get(self.slot))
    }
}

/// Connection between a descriptor and the live type of this session.
#[derive(Debug)]
pub struct TypeBinding {
    layout: Arc<TypeLayout>,
    accessors: Vec<Option<FieldAccessor>>,
}

impl TypeBinding {
    pub(crate) fn new(layout: Arc<TypeLayout>, accessors: Vec<Option<FieldAccessor>>) -> Self {
        Self { layout, accessors }
    }

    pub fn layout(&self) -> &Arc<TypeLayout> {
        &self.layout
    }

    pub fn accessors(&self) -> &[Option<FieldAccessor>] {
        &self.accessors
    }
}

/// One version of a type's on-disk layout.
#[derive(Debug)]
pub struct SchemaDescriptor {
    id: DescriptorId,
    record: DescriptorRecord,
    resolved: AtomicBool,
    binding: OnceLock<TypeBinding>,
}

impl SchemaDescriptor {
    /// Descriptor loaded from storage: unresolved, unbound.
    pub(crate) fn loaded(id: DescriptorId, record: DescriptorRecord) -> Self {
        Self {
            id,
            record,
            resolved: AtomicBool::new(false),
            binding: OnceLock::new(),
        }
    }

    /// Descriptor minted from the live type: resolved and already bound.
    pub(crate) fn minted(id: DescriptorId, record: DescriptorRecord, binding: TypeBinding) -> Self {
        let desc = Self {
            id,
            record,
            resolved: AtomicBool::new(true),
            binding: OnceLock::new(),
        };
        let _ = desc.binding.set(binding);
        desc
    }

    pub fn id(&self) -> DescriptorId {
        self.id
    }

    pub fn type_name(&self) -> &str {
        &self.record.type_name
    }

    pub fn generation(&self) -> u32 {
        self.record.generation
    }

    pub fn predecessor(&self) -> Option<DescriptorId> {
        self.record.predecessor
    }

    pub fn has_references(&self) -> bool {
        self.record.has_references
    }

    pub fn fields(&self) -> &[FieldEntry] {
        &self.record.fields
    }

    pub fn record(&self) -> &DescriptorRecord {
        &self.record
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }

    pub(crate) fn mark_resolved(&self) {
        self.resolved.store(true, Ordering::Release);
    }

    pub fn binding(&self) -> Option<&TypeBinding> {
        self.binding.get()
    }

    /// Install the binding; returns false if another pass already bound it.
    pub(crate) fn bind(&self, binding: TypeBinding) -> bool {
        self.binding.set(binding).is_ok()
    }

    pub fn is_bound(&self) -> bool {
        self.binding.get().is_some()
    }

    /// Live accessor of entry `index`, `None` when unbound or omitted.
    pub fn accessor(&self, index: usize) -> Option<FieldAccessor> {
        self.binding
            .get()
            .and_then(|b| b.accessors.get(index).copied().flatten())
    }

    /// Entries that decode into a live field, with their accessors.
    pub fn bound_fields(&self) -> Vec<(&FieldEntry, FieldAccessor)> {
        self.record
            .fields
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| self.accessor(i).map(|acc| (entry, acc)))
            .collect()
    }

    /// Hex MD5 over the ordered field list, for quick layout comparison.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.record.fields)
    }
}

pub(crate) fn fingerprint(fields: &[FieldEntry]) -> String {
    let mut hasher = Md5::new();
    for entry in fields {
        hasher.update(entry.owner_type.as_bytes());
        hasher.update([0u8]);
        hasher.update(entry.field_name.as_bytes());
        hasher.update([0u8, entry.tag.code()]);
        hasher.update(entry.nested.map_or(0, DescriptorId::get).to_le_bytes());
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Shape;

    fn entry(name: &str, owner: &str, tag: TypeTag) -> FieldEntry {
        FieldEntry {
            field_name: name.into(),
            owner_type: owner.into(),
            tag,
            nested: None,
        }
    }

    fn record(fields: Vec<FieldEntry>) -> DescriptorRecord {
        DescriptorRecord {
            type_name: "app::Point".into(),
            generation: 1,
            predecessor: None,
            has_references: false,
            fields,
        }
    }

    #[test]
    fn zero_is_not_an_identity() {
        assert_eq!(DescriptorId::new(0), None);
        assert_eq!(DescriptorId::new(3).map(DescriptorId::get), Some(3));
    }

    #[test]
    fn entry_equality_includes_owner_and_nested() {
        let a = entry("x", "app::Point", TypeTag::Int32);
        assert_eq!(a, entry("x", "app::Point", TypeTag::Int32));
        assert_ne!(a, entry("x", "app::Base", TypeTag::Int32));
        assert_ne!(a, entry("x", "app::Point", TypeTag::Int64));
        let mut nested = a.clone();
        nested.nested = DescriptorId::new(9);
        assert_ne!(a, nested);
    }

    #[test]
    fn loaded_descriptor_starts_unbound() {
        let id = DescriptorId::new(1).unwrap();
        let desc = SchemaDescriptor::loaded(id, record(vec![entry("x", "app::Point", TypeTag::Int32)]));
        assert!(!desc.is_resolved());
        assert!(!desc.is_bound());
        assert_eq!(desc.accessor(0), None);
        desc.mark_resolved();
        assert!(desc.is_resolved());
    }

    #[test]
    fn binding_is_set_once() {
        let layout = TypeLayout::builder("app::Point")
            .with("x", Shape::Int32)
            .build();
        let id = DescriptorId::new(1).unwrap();
        let desc = SchemaDescriptor::loaded(id, record(vec![entry("x", "app::Point", TypeTag::Int32)]));
        let acc = FieldAccessor { level: 0, slot: 0 };
        assert!(desc.bind(TypeBinding::new(layout.clone(), vec![Some(acc)])));
        assert!(!desc.bind(TypeBinding::new(layout.clone(), vec![None])));
        assert_eq!(desc.accessor(0), Some(acc));
        assert_eq!(acc.field(&layout).map(|f| f.name()), Some("x"));
        assert_eq!(desc.bound_fields().len(), 1);
    }

    #[test]
    fn fingerprint_is_order_sensitive() {
        let xy = vec![
            entry("x", "app::Point", TypeTag::Int32),
            entry("y", "app::Point", TypeTag::Int32),
        ];
        let yx = vec![xy[1].clone(), xy[0].clone()];
        assert_eq!(fingerprint(&xy), fingerprint(&xy.clone()));
        assert_ne!(fingerprint(&xy), fingerprint(&yx));
        assert_eq!(fingerprint(&xy).len(), 32);
    }
}
