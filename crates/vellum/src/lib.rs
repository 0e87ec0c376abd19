// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema descriptors and type tagging for an embedded object store.
//!
//! Discovers how an application type is laid out, encodes that layout into a
//! compact catalog record, and reconciles the catalog with the type's current
//! definition each time the store is opened by a possibly different program.
//! Added, removed, retyped and relocated fields never corrupt data written
//! under an older layout: older versions stay reachable for decoding.
//!
//! # Features
//!
//! - **Type tagging**: stable numeric tags for every storable field shape
//! - **Introspection**: ordered field catalogs over the whole ancestor chain
//! - **Schema evolution**: drift detection and a monotonically growing version chain
//! - **Rebinding**: stored catalogs reconnected to live fields, tolerating relocation
//! - **Instance factory**: blank instances through the zero-argument constructor
//! - **Storage backends**: in-memory and SQLite catalogs
//!
//! # Architecture
//!
//! ```text
//!   encoder / decoder
//!        |
//!        v
//!   SchemaRegistry (session index)
//!        |   SchemaIntrospector -> TypeCodeRegistry
//!        |   SchemaEvolutionResolver -> FieldRebinder
//!        |   InstanceFactory
//!        v
//!   Storage (MemoryStorage | SqliteStorage) + TypeLoader
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vellum::{Config, MemoryStorage, Persistent, SchemaRegistry, TypeLoader};
//!
//! #[derive(Default, Persistent)]
//! #[persist(name = "demo::Point")]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! let storage = Arc::new(MemoryStorage::new(Arc::new(TypeLoader::new())));
//! let registry = SchemaRegistry::new(storage, &Config::default());
//! let desc = registry.current_schema_of::<Point>().unwrap();
//! assert_eq!(desc.fields().len(), 2);
//! assert_eq!(desc.generation(), 1);
//! ```

// Lets the derive macros refer to `::vellum` from inside this crate.
extern crate self as vellum;

pub mod codec;
pub mod config;
pub mod descriptor;
pub mod drift;
pub mod error;
pub mod export;
pub mod factory;
pub mod introspect;
pub mod layout;
pub mod loader;
pub mod rebind;
pub mod registry;
pub mod resolve;
pub mod shaped;
pub mod storage;
pub mod type_tag;

pub use config::{Config, ConfigBuilder, FallbackPolicy};
pub use descriptor::{DescriptorId, FieldAccessor, FieldEntry, SchemaDescriptor, TypeBinding};
pub use drift::{diff_fields, FieldChange};
pub use error::{Result, SchemaError};
pub use export::{export_catalog, CatalogExport};
pub use factory::InstanceFactory;
pub use introspect::{CatalogDraft, SchemaIntrospector};
pub use layout::{Constructor, FieldLayout, Instance, Shape, TypeLayout};
pub use loader::TypeLoader;
pub use rebind::FieldRebinder;
pub use registry::SchemaRegistry;
pub use resolve::SchemaEvolutionResolver;
pub use shaped::{Described, Embedded, Link, Oid, Persistent, Ref, Shaped};
pub use storage::{MemoryStorage, SqliteStorage, Storage};
pub use type_tag::{TypeCodeRegistry, TypeTag};

pub use vellum_codegen::{Embedded, Persistent};
