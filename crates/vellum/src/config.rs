// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema subsystem configuration

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};

/// Environment variable enabling the raw-blob fallback.
pub const ENV_RAW_BLOB: &str = "VELLUM_SERIALIZE_TRANSIENT_OBJECTS";

/// Environment variable enabling the implicit embedded-value fallback.
pub const ENV_IMPLICIT_VALUES: &str = "VELLUM_IMPLICIT_VALUES";

/// How shapes outside the native type system are classified.
///
/// The two fallbacks are mutually exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Reject unknown shapes with `UnsupportedType`.
    #[default]
    Strict,
    /// Store unknown shapes as opaque bytes.
    RawBlob,
    /// Introspect unknown shapes and embed them as values.
    ImplicitValue,
}

/// Schema subsystem configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Classification fallback for opaque field shapes
    #[serde(default)]
    pub fallback: FallbackPolicy,
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Read the fallback policy from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the fallback policy through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = |key: &str| {
            lookup(key)
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false)
        };

        let fallback = match (enabled(ENV_RAW_BLOB), enabled(ENV_IMPLICIT_VALUES)) {
            (true, true) => {
                return Err(SchemaError::Config(format!(
                    "{} and {} are mutually exclusive",
                    ENV_RAW_BLOB, ENV_IMPLICIT_VALUES
                )))
            }
            (true, false) => FallbackPolicy::RawBlob,
            (false, true) => FallbackPolicy::ImplicitValue,
            (false, false) => FallbackPolicy::Strict,
        };
        Ok(Self { fallback })
    }

    /// Parse a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SchemaError::Config(e.to_string()))
    }
}

/// Config builder for fluent API
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    fallback: Option<FallbackPolicy>,
}

impl ConfigBuilder {
    /// Set the classification fallback
    pub fn fallback(mut self, policy: FallbackPolicy) -> Self {
        self.fallback = Some(policy);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Config {
        let defaults = Config::default();

        Config {
            fallback: self.fallback.unwrap_or(defaults.fallback),
        }
    }
}
