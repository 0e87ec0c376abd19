// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SQLite storage backend
//!
//! Keeps the schema catalog in a single table. Records are stored as blobs in
//! the catalog wire format, so the table layout never has to follow schema
//! changes of the catalog record itself.

use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use rusqlite::{params, Connection, OptionalExtension};

use super::{Storage, StoredDescriptor, StructuralLock};
use crate::codec::{decode_record, encode_record};
use crate::descriptor::{DescriptorId, DescriptorRecord};
use crate::error::{Result, SchemaError};
use crate::layout::TypeLayout;
use crate::loader::TypeLoader;

/// SQLite-backed catalog storage
///
/// Thread-safe via internal Mutex (SQLite Connection is not Sync).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE catalog (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     type_name TEXT NOT NULL,
///     generation INTEGER NOT NULL,
///     record BLOB NOT NULL
/// );
/// CREATE INDEX idx_catalog_type ON catalog(type_name, generation);
/// ```
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    loader: Arc<TypeLoader>,
    lock: ReentrantMutex<()>,
}

impl SqliteStorage {
    /// Open (or create) a file-based catalog
    pub fn new(path: impl AsRef<Path>, loader: Arc<TypeLoader>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            SchemaError::Storage(format!("failed to open {}: {}", path.display(), e))
        })?;
        Self::with_connection(conn, loader)
    }

    /// Create an in-memory catalog (for testing)
    pub fn new_in_memory(loader: Arc<TypeLoader>) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, loader)
    }

    fn with_connection(conn: Connection, loader: Arc<TypeLoader>) -> Result<Self> {
        let storage = Self {
            conn: Mutex::new(conn),
            loader,
            lock: ReentrantMutex::new(()),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS catalog (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                type_name TEXT NOT NULL,
                generation INTEGER NOT NULL,
                record BLOB NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_catalog_type ON catalog(type_name, generation)",
            [],
        )?;

        Ok(())
    }

    fn to_id(raw: i64) -> Result<DescriptorId> {
        u32::try_from(raw)
            .ok()
            .and_then(DescriptorId::new)
            .ok_or_else(|| SchemaError::Storage(format!("invalid catalog row id {}", raw)))
    }
}

impl Storage for SqliteStorage {
    fn lookup_descriptor(&self, type_name: &str) -> Result<Option<StoredDescriptor>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, record FROM catalog
                 WHERE type_name = ?1
                 ORDER BY generation DESC, id DESC
                 LIMIT 1",
                [type_name],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?)),
            )
            .optional()?;

        match row {
            Some((id, blob)) => Ok(Some(StoredDescriptor {
                id: Self::to_id(id)?,
                record: decode_record(&blob)?,
            })),
            None => Ok(None),
        }
    }

    fn load_descriptor(&self, id: DescriptorId) -> Result<Option<DescriptorRecord>> {
        let conn = self.conn.lock();
        let blob = conn
            .query_row(
                "SELECT record FROM catalog WHERE id = ?1",
                [i64::from(id.get())],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;

        blob.map(|b| decode_record(&b)).transpose()
    }

    fn register_descriptor(&self, record: &DescriptorRecord) -> Result<DescriptorId> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO catalog (type_name, generation, record) VALUES (?1, ?2, ?3)",
            params![
                record.type_name.as_ref(),
                i64::from(record.generation),
                encode_record(record),
            ],
        )?;
        Self::to_id(conn.last_insert_rowid())
    }

    fn load_type(&self, type_name: &str) -> Result<Arc<TypeLayout>> {
        self.loader.load(type_name)
    }

    fn structural_lock(&self) -> StructuralLock<'_> {
        self.lock.lock()
    }

    fn catalog(&self) -> Result<Vec<StoredDescriptor>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, record FROM catalog ORDER BY id ASC")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, blob)| {
                Ok(StoredDescriptor {
                    id: Self::to_id(id)?,
                    record: decode_record(&blob)?,
                })
            })
            .collect()
    }
}
