// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reconnects loaded catalog entries to the fields of the live type.
//!
//! Two passes, entries most-derived-first:
//!
//! 1. exact owner: the field must still be declared at the level named by
//!    the entry's `owner_type`;
//! 2. hierarchy search: for entries left over, the first unclaimed field of
//!    the same name walking from the most-derived level upward.
//!
//! Each live field is claimed by at most one entry. Entries that find nothing
//! stay unbound and are skipped when decoding with this descriptor.

use std::collections::HashSet;
use std::sync::Arc;

use log::debug;

use crate::descriptor::{FieldAccessor, SchemaDescriptor, TypeBinding};
use crate::error::{Result, SchemaError};
use crate::layout::TypeLayout;
use crate::storage::Storage;

/// One-time binding of a loaded descriptor.
pub struct FieldRebinder;

impl FieldRebinder {
    /// Bind `desc` to the layout the storage's type loader knows under its name.
    pub fn rebind_loaded(desc: &SchemaDescriptor, storage: &dyn Storage) -> Result<()> {
        if desc.is_bound() {
            return Ok(());
        }
        let layout = storage.load_type(desc.type_name())?;
        Self::rebind(desc, &layout)
    }

    /// Bind `desc` to `layout`. A descriptor that is already bound is left alone.
    pub fn rebind(desc: &SchemaDescriptor, layout: &Arc<TypeLayout>) -> Result<()> {
        if desc.is_bound() {
            return Ok(());
        }
        if layout.name() != desc.type_name() {
            return Err(SchemaError::descriptor_failure(
                desc.type_name(),
                format!("cannot bind to layout of {}", layout.name()),
            ));
        }
        if layout.constructor().is_none() {
            return Err(SchemaError::descriptor_failure(
                desc.type_name(),
                "no zero-argument constructor",
            ));
        }

        let accessors = Self::match_fields(desc, layout);
        let unbound = accessors.iter().filter(|a| a.is_none()).count();
        for (entry, _) in desc
            .fields()
            .iter()
            .zip(&accessors)
            .filter(|(_, acc)| acc.is_none())
        {
            debug!(
                "[rebind] {}: {}::{} has no live field, omitted",
                desc.type_name(),
                entry.owner_type,
                entry.field_name
            );
        }

        if desc.bind(TypeBinding::new(Arc::clone(layout), accessors)) {
            debug!(
                "[rebind] {} {} bound ({} of {} fields omitted)",
                desc.type_name(),
                desc.id(),
                unbound,
                desc.fields().len()
            );
        }
        Ok(())
    }

    fn match_fields(desc: &SchemaDescriptor, layout: &TypeLayout) -> Vec<Option<FieldAccessor>> {
        let levels = layout.ancestry();
        let entries = desc.fields();
        let mut accessors = vec![None; entries.len()];
        let mut claimed: HashSet<FieldAccessor> = HashSet::new();

        for i in (0..entries.len()).rev() {
            let entry = &entries[i];
            let Some(level) = levels.iter().position(|l| l.name() == &*entry.owner_type) else {
                continue;
            };
            let slot = levels[level]
                .declared_fields()
                .iter()
                .position(|f| f.name() == &*entry.field_name && f.is_persistent());
            if let Some(slot) = slot {
                let acc = FieldAccessor { level, slot };
                if claimed.insert(acc) {
                    accessors[i] = Some(acc);
                }
            }
        }

        for i in (0..entries.len()).rev() {
            if accessors[i].is_some() {
                continue;
            }
            let entry = &entries[i];
            'levels: for level in (0..levels.len()).rev() {
                for (slot, field) in levels[level].declared_fields().iter().enumerate() {
                    if field.name() != &*entry.field_name || !field.is_persistent() {
                        continue;
                    }
                    let acc = FieldAccessor { level, slot };
                    if claimed.insert(acc) {
                        accessors[i] = Some(acc);
                        break 'levels;
                    }
                }
            }
        }

        accessors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{DescriptorId, DescriptorRecord, FieldEntry};
    use crate::layout::{Constructor, FieldLayout, Shape};
    use crate::loader::TypeLoader;
    use crate::storage::MemoryStorage;
    use crate::type_tag::TypeTag;

    fn entry(owner: &str, name: &str) -> FieldEntry {
        FieldEntry {
            field_name: name.into(),
            owner_type: owner.into(),
            tag: TypeTag::Int32,
            nested: None,
        }
    }

    fn loaded(type_name: &str, fields: Vec<FieldEntry>) -> SchemaDescriptor {
        SchemaDescriptor::loaded(
            DescriptorId::new(1).unwrap(),
            DescriptorRecord {
                type_name: type_name.into(),
                generation: 1,
                predecessor: None,
                has_references: false,
                fields,
            },
        )
    }

    fn bound_names(desc: &SchemaDescriptor) -> Vec<Option<(String, String)>> {
        let binding = desc.binding().unwrap();
        let levels = binding.layout().ancestry();
        binding
            .accessors()
            .iter()
            .map(|acc| {
                acc.map(|a| {
                    (
                        levels[a.level].name().to_string(),
                        levels[a.level].declared_fields()[a.slot].name().to_string(),
                    )
                })
            })
            .collect()
    }

    #[test]
    fn exact_owner_match_wins() {
        let base = TypeLayout::builder("app::Base")
            .with("x", Shape::Int32)
            .build();
        let derived = TypeLayout::builder("app::Derived")
            .base(base)
            .with("x", Shape::Int32)
            .constructor(Constructor::new(|| ()))
            .build();
        let desc = loaded(
            "app::Derived",
            vec![entry("app::Base", "x"), entry("app::Derived", "x")],
        );

        FieldRebinder::rebind(&desc, &derived).unwrap();
        assert_eq!(
            bound_names(&desc),
            vec![
                Some(("app::Base".into(), "x".into())),
                Some(("app::Derived".into(), "x".into())),
            ]
        );
    }

    #[test]
    fn relocated_field_is_found_in_hierarchy() {
        // `y` moved from the derived level into the base level.
        let base = TypeLayout::builder("app::Base")
            .with("x", Shape::Int32)
            .with("y", Shape::Int32)
            .build();
        let derived = TypeLayout::builder("app::Derived")
            .base(base)
            .constructor(Constructor::new(|| ()))
            .build();
        let desc = loaded(
            "app::Derived",
            vec![entry("app::Base", "x"), entry("app::Derived", "y")],
        );

        FieldRebinder::rebind(&desc, &derived).unwrap();
        assert_eq!(desc.accessor(1), Some(FieldAccessor { level: 0, slot: 1 }));
    }

    #[test]
    fn one_live_field_is_never_bound_twice() {
        // Both levels used to declare `x`; only the base keeps it now.
        let base = TypeLayout::builder("app::Base")
            .with("x", Shape::Int32)
            .build();
        let derived = TypeLayout::builder("app::Derived")
            .base(base)
            .constructor(Constructor::new(|| ()))
            .build();
        let desc = loaded(
            "app::Derived",
            vec![entry("app::Base", "x"), entry("app::Derived", "x")],
        );

        FieldRebinder::rebind(&desc, &derived).unwrap();
        assert_eq!(desc.accessor(0), Some(FieldAccessor { level: 0, slot: 0 }));
        assert_eq!(desc.accessor(1), None);
    }

    #[test]
    fn transient_fields_are_not_eligible() {
        let layout = TypeLayout::builder("app::Point")
            .field(FieldLayout::new("x", Shape::Int32).transient())
            .with("y", Shape::Int32)
            .constructor(Constructor::new(|| ()))
            .build();
        let desc = loaded("app::Point", vec![entry("app::Point", "x"), entry("app::Point", "y")]);

        FieldRebinder::rebind(&desc, &layout).unwrap();
        assert_eq!(desc.accessor(0), None);
        assert_eq!(desc.accessor(1), Some(FieldAccessor { level: 0, slot: 1 }));
        assert_eq!(desc.bound_fields().len(), 1);
    }

    #[test]
    fn missing_constructor_is_fatal() {
        let layout = TypeLayout::builder("app::Point").with("x", Shape::Int32).build();
        let desc = loaded("app::Point", vec![entry("app::Point", "x")]);
        assert!(matches!(
            FieldRebinder::rebind(&desc, &layout),
            Err(SchemaError::DescriptorFailure { .. })
        ));
        assert!(!desc.is_bound());
    }

    #[test]
    fn unknown_type_is_class_not_found() {
        let storage = MemoryStorage::new(Arc::new(TypeLoader::new()));
        let desc = loaded("app::Gone", vec![entry("app::Gone", "x")]);
        assert!(matches!(
            FieldRebinder::rebind_loaded(&desc, &storage),
            Err(SchemaError::ClassNotFound { .. })
        ));
    }
}
