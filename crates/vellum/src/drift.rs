// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::descriptor::{DescriptorId, FieldEntry};
use crate::type_tag::TypeTag;

// ---------------------------------------------------------------------------
// FieldChange
// ---------------------------------------------------------------------------

/// One difference between two versions of a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum FieldChange {
    Added {
        owner: Arc<str>,
        field: Arc<str>,
        tag: TypeTag,
    },
    Removed {
        owner: Arc<str>,
        field: Arc<str>,
    },
    /// Same owner and name, different storage tag.
    Retyped {
        owner: Arc<str>,
        field: Arc<str>,
        from: TypeTag,
        to: TypeTag,
    },
    /// Same name and tag, declared by another ancestor level.
    Relocated {
        field: Arc<str>,
        from: Arc<str>,
        to: Arc<str>,
    },
    /// Embedded value whose own schema moved to another version.
    NestedChanged {
        owner: Arc<str>,
        field: Arc<str>,
        from: Option<DescriptorId>,
        to: Option<DescriptorId>,
    },
    /// Same entries, different order.
    Reordered,
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldChange::Added { owner, field, tag } => {
                write!(f, "+ {}::{} ({})", owner, field, tag)
            }
            FieldChange::Removed { owner, field } => write!(f, "- {}::{}", owner, field),
            FieldChange::Retyped {
                owner,
                field,
                from,
                to,
            } => write!(f, "~ {}::{} {} -> {}", owner, field, from, to),
            FieldChange::Relocated { field, from, to } => {
                write!(f, "> {} moved from {} to {}", field, from, to)
            }
            FieldChange::NestedChanged {
                owner,
                field,
                from,
                to,
            } => write!(
                f,
                "~ {}::{} nested schema {} -> {}",
                owner,
                field,
                render_id(*from),
                render_id(*to)
            ),
            FieldChange::Reordered => f.write_str("~ field order changed"),
        }
    }
}

fn render_id(id: Option<DescriptorId>) -> String {
    id.map_or_else(|| "none".to_string(), |id| id.to_string())
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Changes that turn the `old` field list into the `new` one.
///
/// An empty result means the catalogs are identical.
pub fn diff_fields(old: &[FieldEntry], new: &[FieldEntry]) -> Vec<FieldChange> {
    if old == new {
        return Vec::new();
    }

    let find = |list: &[FieldEntry], e: &FieldEntry| {
        list.iter()
            .find(|o| o.owner_type == e.owner_type && o.field_name == e.field_name)
            .cloned()
    };

    let mut changes = Vec::new();
    let mut removed: Vec<&FieldEntry> = Vec::new();
    let mut added: Vec<&FieldEntry> = Vec::new();

    for before in old {
        match find(new, before) {
            None => removed.push(before),
            Some(after) if after.tag != before.tag => changes.push(FieldChange::Retyped {
                owner: Arc::clone(&before.owner_type),
                field: Arc::clone(&before.field_name),
                from: before.tag,
                to: after.tag,
            }),
            Some(after) if after.nested != before.nested => {
                changes.push(FieldChange::NestedChanged {
                    owner: Arc::clone(&before.owner_type),
                    field: Arc::clone(&before.field_name),
                    from: before.nested,
                    to: after.nested,
                })
            }
            Some(_) => {}
        }
    }
    for after in new {
        if find(old, after).is_none() {
            added.push(after);
        }
    }

    // A removal and an addition of the same name and tag is a relocation.
    removed.retain(|gone| {
        let moved = added
            .iter()
            .position(|a| a.field_name == gone.field_name && a.tag == gone.tag);
        match moved {
            Some(index) => {
                let target = added.remove(index);
                changes.push(FieldChange::Relocated {
                    field: Arc::clone(&gone.field_name),
                    from: Arc::clone(&gone.owner_type),
                    to: Arc::clone(&target.owner_type),
                });
                false
            }
            None => true,
        }
    });

    changes.extend(removed.into_iter().map(|e| FieldChange::Removed {
        owner: Arc::clone(&e.owner_type),
        field: Arc::clone(&e.field_name),
    }));
    changes.extend(added.into_iter().map(|e| FieldChange::Added {
        owner: Arc::clone(&e.owner_type),
        field: Arc::clone(&e.field_name),
        tag: e.tag,
    }));

    if changes.is_empty() {
        changes.push(FieldChange::Reordered);
    }
    changes
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(owner: &str, name: &str, tag: TypeTag) -> FieldEntry {
        FieldEntry {
            field_name: name.into(),
            owner_type: owner.into(),
            tag,
            nested: None,
        }
    }

    #[test]
    fn test_identical() {
        let fields = vec![entry("app::Point", "x", TypeTag::Int32)];
        assert!(diff_fields(&fields, &fields.clone()).is_empty());
    }

    #[test]
    fn test_added_and_removed() {
        let old = vec![
            entry("app::Point", "x", TypeTag::Int32),
            entry("app::Point", "y", TypeTag::Int32),
        ];
        let new = vec![
            entry("app::Point", "px", TypeTag::Int32),
            entry("app::Point", "y", TypeTag::Int32),
        ];
        let changes = diff_fields(&old, &new);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].to_string(), "- app::Point::x");
        assert_eq!(changes[1].to_string(), "+ app::Point::px (int)");
    }

    #[test]
    fn test_retyped() {
        let old = vec![entry("app::Point", "x", TypeTag::Int32)];
        let new = vec![entry("app::Point", "x", TypeTag::Int64)];
        assert_eq!(
            diff_fields(&old, &new),
            vec![FieldChange::Retyped {
                owner: "app::Point".into(),
                field: "x".into(),
                from: TypeTag::Int32,
                to: TypeTag::Int64,
            }]
        );
    }

    #[test]
    fn test_relocated() {
        let old = vec![entry("app::Derived", "y", TypeTag::Int32)];
        let new = vec![entry("app::Base", "y", TypeTag::Int32)];
        assert_eq!(
            diff_fields(&old, &new)[0].to_string(),
            "> y moved from app::Derived to app::Base"
        );
    }

    #[test]
    fn test_reordered() {
        let old = vec![
            entry("app::Point", "x", TypeTag::Int32),
            entry("app::Point", "y", TypeTag::Int32),
        ];
        let new = vec![old[1].clone(), old[0].clone()];
        assert_eq!(diff_fields(&old, &new), vec![FieldChange::Reordered]);
    }

    #[test]
    fn test_nested_changed() {
        let mut old = entry("app::Body", "position", TypeTag::EmbeddedValue);
        old.nested = DescriptorId::new(1);
        let mut new = old.clone();
        new.nested = DescriptorId::new(5);
        assert_eq!(
            diff_fields(&[old], &[new])[0].to_string(),
            "~ app::Body::position nested schema #1 -> #5"
        );
    }
}
