// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Storage collaborator abstraction
//!
//! The schema subsystem never touches pages or files itself. It asks the
//! enclosing storage to persist catalog records, to resolve type names, and
//! to serialize registrations through its structural lock.
//!
//! # Implementations
//!
//! - `MemoryStorage` -- encoded records kept in memory, reopenable
//! - `SqliteStorage` -- catalog table in a SQLite database

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use parking_lot::ReentrantMutexGuard;

use crate::descriptor::{DescriptorId, DescriptorRecord};
use crate::error::Result;
use crate::layout::TypeLayout;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

/// Guard proving the storage's structural lock is held.
///
/// Re-entrant: nested schema registration happens while the lock is already
/// held by the enclosing registration.
pub type StructuralLock<'a> = ReentrantMutexGuard<'a, ()>;

/// A persisted record together with its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDescriptor {
    pub id: DescriptorId,
    pub record: DescriptorRecord,
}

/// Storage trait consumed by the schema registry.
pub trait Storage: Send + Sync {
    /// Latest persisted version for a type name.
    fn lookup_descriptor(&self, type_name: &str) -> Result<Option<StoredDescriptor>>;

    /// Any persisted version by identity.
    fn load_descriptor(&self, id: DescriptorId) -> Result<Option<DescriptorRecord>>;

    /// Persist a new version and return its identity.
    fn register_descriptor(&self, record: &DescriptorRecord) -> Result<DescriptorId>;

    /// Resolve a type name through the active type loader.
    fn load_type(&self, type_name: &str) -> Result<Arc<TypeLayout>>;

    /// Acquire the structural lock.
    fn structural_lock(&self) -> StructuralLock<'_>;

    /// Every persisted version, ordered by identity.
    fn catalog(&self) -> Result<Vec<StoredDescriptor>>;
}
