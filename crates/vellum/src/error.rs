// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy for schema discovery, evolution and rebinding.

use std::fmt;

/// Boxed error produced by user-supplied construction code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by the schema subsystem.
///
/// The first four variants are unrecoverable at this layer: they are handed
/// to the caller as-is and never retried internally.
#[derive(Debug)]
pub enum SchemaError {
    /// A field or array shape cannot be classified and no fallback policy applies.
    UnsupportedType {
        /// Rendered shape that failed classification.
        shape: String,
    },
    /// The type has no usable zero-argument constructor, or its layout is malformed.
    DescriptorFailure {
        /// Type whose descriptor could not be built or bound.
        type_name: String,
        /// What went wrong.
        reason: String,
    },
    /// The type name is not known to the active type loader.
    ClassNotFound {
        /// Name that failed to load.
        type_name: String,
    },
    /// The constructor was found but failed while running.
    ConstructorFailure {
        /// Type being instantiated.
        type_name: String,
        /// Underlying failure.
        source: BoxError,
    },
    /// Persisted catalog bytes could not be decoded.
    CorruptCatalog {
        /// Byte offset where decoding stopped.
        offset: usize,
        /// What was wrong with the data.
        reason: String,
    },
    /// Storage backend failure (I/O, SQLite, ...).
    Storage(String),
    /// Invalid configuration.
    Config(String),
}

impl SchemaError {
    pub(crate) fn descriptor_failure(type_name: &str, reason: impl Into<String>) -> Self {
        SchemaError::DescriptorFailure {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn class_not_found(type_name: &str) -> Self {
        SchemaError::ClassNotFound {
            type_name: type_name.to_string(),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::UnsupportedType { shape } => {
                write!(f, "unsupported field type: {}", shape)
            }
            SchemaError::DescriptorFailure { type_name, reason } => {
                write!(f, "cannot build descriptor for {}: {}", type_name, reason)
            }
            SchemaError::ClassNotFound { type_name } => {
                write!(f, "type not found: {}", type_name)
            }
            SchemaError::ConstructorFailure { type_name, source } => {
                write!(f, "constructor of {} failed: {}", type_name, source)
            }
            SchemaError::CorruptCatalog { offset, reason } => {
                write!(f, "corrupt catalog record at offset {}: {}", offset, reason)
            }
            SchemaError::Storage(msg) => write!(f, "storage error: {}", msg),
            SchemaError::Config(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl std::error::Error for SchemaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchemaError::ConstructorFailure { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for SchemaError {
    fn from(value: rusqlite::Error) -> Self {
        SchemaError::Storage(value.to_string())
    }
}

/// Convenient alias for results carrying a [`SchemaError`].
pub type Result<T> = core::result::Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn display_names_the_type() {
        let err = SchemaError::descriptor_failure("app::Point", "no zero-argument constructor");
        assert_eq!(
            err.to_string(),
            "cannot build descriptor for app::Point: no zero-argument constructor"
        );
        assert_eq!(
            SchemaError::class_not_found("app::Gone").to_string(),
            "type not found: app::Gone"
        );
    }

    #[test]
    fn constructor_failure_exposes_source() {
        let err = SchemaError::ConstructorFailure {
            type_name: "app::Point".to_string(),
            source: "disk full".into(),
        };
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("disk full"));
        assert!(SchemaError::Storage("x".into()).source().is_none());
    }
}
