// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Storage type tags and the classifier that maps field shapes onto them.
//!
//! Tag codes are part of the persisted catalog format and must never be
//! renumbered:
//!
//! - `0..=13` scalar, reference and embedded kinds
//! - `20..=32` arrays, always `component + ARRAY_OFFSET`
//!
//! There is no array of [`TypeTag::Link`] and no array of arrays.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::config::FallbackPolicy;
use crate::error::{Result, SchemaError};
use crate::layout::Shape;

/// Width of a persisted object identifier in bytes.
pub const OID_SIZE: usize = 4;

/// Distance between a component tag and its array tag.
pub const ARRAY_OFFSET: u8 = 20;

/// Storage shape of a single catalog field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TypeTag {
    Boolean = 0,
    Byte = 1,
    Char = 2,
    Short = 3,
    Int32 = 4,
    Int64 = 5,
    Float32 = 6,
    Float64 = 7,
    /// Variable-length UTF-8 text.
    Text = 8,
    /// Wall-clock instant, 8 bytes.
    Timestamp = 9,
    /// Reference to another persistent object.
    ObjectRef = 10,
    /// Value stored inline, described by a nested schema.
    EmbeddedValue = 11,
    /// Opaque bytes produced by the raw-blob fallback policy.
    RawBlob = 12,
    /// Variable-length array of object references.
    Link = 13,
    ArrayOfBoolean = 20,
    ArrayOfByte = 21,
    ArrayOfChar = 22,
    ArrayOfShort = 23,
    ArrayOfInt32 = 24,
    ArrayOfInt64 = 25,
    ArrayOfFloat32 = 26,
    ArrayOfFloat64 = 27,
    ArrayOfText = 28,
    ArrayOfTimestamp = 29,
    ArrayOfObjectRef = 30,
    ArrayOfEmbeddedValue = 31,
    ArrayOfRawBlob = 32,
}

impl TypeTag {
    /// Numeric code stored in the catalog.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Decode a catalog code.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(TypeTag::Boolean),
            1 => Some(TypeTag::Byte),
            2 => Some(TypeTag::Char),
            3 => Some(TypeTag::Short),
            4 => Some(TypeTag::Int32),
            5 => Some(TypeTag::Int64),
            6 => Some(TypeTag::Float32),
            7 => Some(TypeTag::Float64),
            8 => Some(TypeTag::Text),
            9 => Some(TypeTag::Timestamp),
            10 => Some(TypeTag::ObjectRef),
            11 => Some(TypeTag::EmbeddedValue),
            12 => Some(TypeTag::RawBlob),
            13 => Some(TypeTag::Link),
            20 => Some(TypeTag::ArrayOfBoolean),
            21 => Some(TypeTag::ArrayOfByte),
            22 => Some(TypeTag::ArrayOfChar),
            23 => Some(TypeTag::ArrayOfShort),
            24 => Some(TypeTag::ArrayOfInt32),
            25 => Some(TypeTag::ArrayOfInt64),
            26 => Some(TypeTag::ArrayOfFloat32),
            27 => Some(TypeTag::ArrayOfFloat64),
            28 => Some(TypeTag::ArrayOfText),
            29 => Some(TypeTag::ArrayOfTimestamp),
            30 => Some(TypeTag::ArrayOfObjectRef),
            31 => Some(TypeTag::ArrayOfEmbeddedValue),
            32 => Some(TypeTag::ArrayOfRawBlob),
            _ => None,
        }
    }

    /// Array tag whose elements have this tag.
    ///
    /// Fails with `UnsupportedType` for `Link` and for tags that are already arrays.
    pub fn array_of(self) -> Result<TypeTag> {
        if self.code() >= TypeTag::Link.code() {
            return Err(SchemaError::UnsupportedType {
                shape: format!("array of {}", self.signature()),
            });
        }
        TypeTag::from_code(self.code() + ARRAY_OFFSET).ok_or_else(|| {
            SchemaError::UnsupportedType {
                shape: format!("array of {}", self.signature()),
            }
        })
    }

    /// Element tag of an array tag, `None` for non-arrays.
    pub const fn component(self) -> Option<TypeTag> {
        if self.is_array() {
            TypeTag::from_code(self.code() - ARRAY_OFFSET)
        } else {
            None
        }
    }

    pub const fn is_array(self) -> bool {
        self.code() >= ARRAY_OFFSET
    }

    /// True for tags that hold object identifiers.
    pub const fn is_reference(self) -> bool {
        matches!(
            self,
            TypeTag::ObjectRef | TypeTag::Link | TypeTag::ArrayOfObjectRef
        )
    }

    /// True for tags whose entries carry a nested schema.
    pub const fn is_embedded(self) -> bool {
        matches!(self, TypeTag::EmbeddedValue | TypeTag::ArrayOfEmbeddedValue)
    }

    /// Encoded size in bytes for fixed-size tags, `None` for variable ones.
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            TypeTag::Boolean | TypeTag::Byte => Some(1),
            TypeTag::Char | TypeTag::Short => Some(2),
            TypeTag::Int32 | TypeTag::Float32 => Some(4),
            TypeTag::Int64 | TypeTag::Float64 | TypeTag::Timestamp => Some(8),
            TypeTag::ObjectRef => Some(OID_SIZE),
            _ => None,
        }
    }

    /// Stable human-readable name used in exports and diagnostics.
    pub const fn signature(self) -> &'static str {
        match self {
            TypeTag::Boolean => "boolean",
            TypeTag::Byte => "byte",
            TypeTag::Char => "char",
            TypeTag::Short => "short",
            TypeTag::Int32 => "int",
            TypeTag::Int64 => "long",
            TypeTag::Float32 => "float",
            TypeTag::Float64 => "double",
            TypeTag::Text => "String",
            TypeTag::Timestamp => "Date",
            TypeTag::ObjectRef => "Object",
            TypeTag::EmbeddedValue => "Value",
            TypeTag::RawBlob => "Raw",
            TypeTag::Link => "Link",
            TypeTag::ArrayOfBoolean => "ArrayOfBoolean",
            TypeTag::ArrayOfByte => "ArrayOfByte",
            TypeTag::ArrayOfChar => "ArrayOfChar",
            TypeTag::ArrayOfShort => "ArrayOfShort",
            TypeTag::ArrayOfInt32 => "ArrayOfInt",
            TypeTag::ArrayOfInt64 => "ArrayOfLong",
            TypeTag::ArrayOfFloat32 => "ArrayOfFloat",
            TypeTag::ArrayOfFloat64 => "ArrayOfDouble",
            TypeTag::ArrayOfText => "ArrayOfString",
            TypeTag::ArrayOfTimestamp => "ArrayOfDate",
            TypeTag::ArrayOfObjectRef => "ArrayOfObject",
            TypeTag::ArrayOfEmbeddedValue => "ArrayOfValue",
            TypeTag::ArrayOfRawBlob => "ArrayOfRaw",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.signature())
    }
}

impl Serialize for TypeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.signature())
    }
}

/// Maps field shapes onto [`TypeTag`]s under a fallback policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeCodeRegistry {
    policy: FallbackPolicy,
}

impl TypeCodeRegistry {
    pub fn new(policy: FallbackPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Classify a field shape.
    ///
    /// Opaque shapes are only accepted when a fallback policy is active.
    pub fn classify(&self, shape: &Shape) -> Result<TypeTag> {
        let tag = match shape {
            Shape::Boolean => TypeTag::Boolean,
            Shape::Byte => TypeTag::Byte,
            Shape::Char => TypeTag::Char,
            Shape::Short => TypeTag::Short,
            Shape::Int32 => TypeTag::Int32,
            Shape::Int64 => TypeTag::Int64,
            Shape::Float32 => TypeTag::Float32,
            Shape::Float64 => TypeTag::Float64,
            Shape::Text => TypeTag::Text,
            Shape::Timestamp => TypeTag::Timestamp,
            Shape::Object(_) => TypeTag::ObjectRef,
            Shape::Value(_) => TypeTag::EmbeddedValue,
            Shape::Link => TypeTag::Link,
            Shape::Array(component) => {
                let component = self.classify(component)?;
                return component
                    .array_of()
                    .map_err(|_| SchemaError::UnsupportedType {
                        shape: shape.to_string(),
                    });
            }
            Shape::Opaque(_) => match self.policy {
                FallbackPolicy::RawBlob => TypeTag::RawBlob,
                FallbackPolicy::ImplicitValue => TypeTag::EmbeddedValue,
                FallbackPolicy::Strict => {
                    return Err(SchemaError::UnsupportedType {
                        shape: shape.to_string(),
                    })
                }
            },
        };
        Ok(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::TypeLayout;

    #[test]
    fn codes_round_trip() {
        for code in 0u8..=40 {
            if let Some(tag) = TypeTag::from_code(code) {
                assert_eq!(tag.code(), code);
            }
        }
        assert_eq!(TypeTag::from_code(14), None);
        assert_eq!(TypeTag::from_code(33), None);
    }

    #[test]
    fn array_tags_use_fixed_offset() {
        assert_eq!(TypeTag::Byte.array_of().unwrap(), TypeTag::ArrayOfByte);
        assert_eq!(TypeTag::RawBlob.array_of().unwrap(), TypeTag::ArrayOfRawBlob);
        assert_eq!(
            TypeTag::EmbeddedValue.array_of().unwrap(),
            TypeTag::ArrayOfEmbeddedValue
        );
        assert_eq!(TypeTag::ArrayOfInt32.component(), Some(TypeTag::Int32));
        assert_eq!(TypeTag::Int32.component(), None);
    }

    #[test]
    fn array_of_link_is_unsupported() {
        assert!(matches!(
            TypeTag::Link.array_of(),
            Err(SchemaError::UnsupportedType { .. })
        ));
        assert!(matches!(
            TypeTag::ArrayOfByte.array_of(),
            Err(SchemaError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn byte_array_is_distinct_from_byte() {
        let codes = TypeCodeRegistry::default();
        let array = codes.classify(&Shape::Array(Box::new(Shape::Byte))).unwrap();
        assert_eq!(array, TypeTag::ArrayOfByte);
        assert_ne!(array, codes.classify(&Shape::Byte).unwrap());
    }

    #[test]
    fn nested_arrays_are_unsupported() {
        let codes = TypeCodeRegistry::default();
        let shape = Shape::Array(Box::new(Shape::Array(Box::new(Shape::Int32))));
        assert!(matches!(
            codes.classify(&shape),
            Err(SchemaError::UnsupportedType { .. })
        ));
        let links = Shape::Array(Box::new(Shape::Link));
        assert!(matches!(
            codes.classify(&links),
            Err(SchemaError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn opaque_shapes_follow_policy() {
        let opaque = Shape::Opaque("std::net::IpAddr".into());
        let strict = TypeCodeRegistry::new(FallbackPolicy::Strict);
        match strict.classify(&opaque) {
            Err(SchemaError::UnsupportedType { shape }) => assert_eq!(shape, "std::net::IpAddr"),
            other => panic!("unexpected {:?}", other),
        }
        let raw = TypeCodeRegistry::new(FallbackPolicy::RawBlob);
        assert_eq!(raw.classify(&opaque).unwrap(), TypeTag::RawBlob);
        assert_eq!(
            raw.classify(&Shape::Array(Box::new(opaque.clone()))).unwrap(),
            TypeTag::ArrayOfRawBlob
        );
        let implicit = TypeCodeRegistry::new(FallbackPolicy::ImplicitValue);
        assert_eq!(implicit.classify(&opaque).unwrap(), TypeTag::EmbeddedValue);
    }

    #[test]
    fn reference_and_value_shapes() {
        let codes = TypeCodeRegistry::default();
        let value = TypeLayout::builder("app::Vec3").build();
        assert_eq!(
            codes.classify(&Shape::Object("app::Node".into())).unwrap(),
            TypeTag::ObjectRef
        );
        assert_eq!(codes.classify(&Shape::Link).unwrap(), TypeTag::Link);
        assert_eq!(
            codes.classify(&Shape::Value(value)).unwrap(),
            TypeTag::EmbeddedValue
        );
        assert!(TypeTag::ObjectRef.is_reference());
        assert!(TypeTag::ArrayOfObjectRef.is_reference());
        assert!(!TypeTag::EmbeddedValue.is_reference());
    }

    #[test]
    fn fixed_sizes() {
        assert_eq!(TypeTag::Boolean.fixed_size(), Some(1));
        assert_eq!(TypeTag::Char.fixed_size(), Some(2));
        assert_eq!(TypeTag::Timestamp.fixed_size(), Some(8));
        assert_eq!(TypeTag::ObjectRef.fixed_size(), Some(OID_SIZE));
        assert_eq!(TypeTag::Text.fixed_size(), None);
    }
}
