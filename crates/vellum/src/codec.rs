// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Binary encoding of catalog records.
//!
//! The catalog is bootstrap metadata: it is read before any application
//! schema exists, so a record is described entirely by primitive tags
//! ([`DESCRIPTOR_COLUMNS`] followed by `field_count` rows of
//! [`FIELD_COLUMNS`]) and never goes through the embedded-value path.
//!
//! ```text
//! "VCAT" | format:u8 | type_name | generation | predecessor | has_references
//!        | field_count | { field_name | owner_type | tag | nested }*
//! ```
//!
//! All integers are little-endian; text is a u32 byte length plus UTF-8.

use std::sync::Arc;

use crate::descriptor::{DescriptorId, DescriptorRecord, FieldEntry};
use crate::error::{Result, SchemaError};
use crate::type_tag::TypeTag;

const MAGIC: &[u8; 4] = b"VCAT";
const FORMAT_VERSION: u8 = 1;

/// Layout of the descriptor header.
pub const DESCRIPTOR_COLUMNS: &[(&str, TypeTag)] = &[
    ("type_name", TypeTag::Text),
    ("generation", TypeTag::Int32),
    ("predecessor", TypeTag::ObjectRef),
    ("has_references", TypeTag::Boolean),
    ("field_count", TypeTag::Int32),
];

/// Layout of one catalog entry.
pub const FIELD_COLUMNS: &[(&str, TypeTag)] = &[
    ("field_name", TypeTag::Text),
    ("owner_type", TypeTag::Text),
    ("tag", TypeTag::Byte),
    ("nested", TypeTag::ObjectRef),
];

/// Growable little-endian writer.
struct CatalogWriter {
    buffer: Vec<u8>,
}

impl CatalogWriter {
    fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    fn write_u32_le(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    fn write_text(&mut self, value: &str) {
        self.write_u32_le(value.len() as u32);
        self.buffer.extend_from_slice(value.as_bytes());
    }

    fn write_ref(&mut self, value: Option<DescriptorId>) {
        self.write_u32_le(value.map_or(0, DescriptorId::get));
    }

    fn finish(self) -> Vec<u8> {
        self.buffer
    }
}

/// Bounds-checked reader reporting the failing offset.
struct CatalogReader<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> CatalogReader<'a> {
    fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    fn corrupt(&self, reason: impl Into<String>) -> SchemaError {
        SchemaError::CorruptCatalog {
            offset: self.offset,
            reason: reason.into(),
        }
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.offset + len > self.buffer.len() {
            return Err(self.corrupt("unexpected end of record"));
        }
        let slice = &self.buffer[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u32_le(&mut self) -> Result<u32> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.read_bytes(4)?);
        Ok(u32::from_le_bytes(bytes))
    }

    fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(self.corrupt(format!("invalid boolean {}", other))),
        }
    }

    fn read_text(&mut self) -> Result<Arc<str>> {
        let len = self.read_u32_le()? as usize;
        let start = self.offset;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(Arc::from)
            .map_err(|_| SchemaError::CorruptCatalog {
                offset: start,
                reason: "text is not UTF-8".into(),
            })
    }

    fn read_ref(&mut self) -> Result<Option<DescriptorId>> {
        Ok(DescriptorId::new(self.read_u32_le()?))
    }

    fn is_eof(&self) -> bool {
        self.offset >= self.buffer.len()
    }
}

/// Encode a record into its persisted byte form.
pub fn encode_record(record: &DescriptorRecord) -> Vec<u8> {
    let mut w = CatalogWriter::new();
    w.buffer.extend_from_slice(MAGIC);
    w.write_u8(FORMAT_VERSION);

    w.write_text(&record.type_name);
    w.write_u32_le(record.generation);
    w.write_ref(record.predecessor);
    w.write_bool(record.has_references);
    w.write_u32_le(record.fields.len() as u32);

    for entry in &record.fields {
        w.write_text(&entry.field_name);
        w.write_text(&entry.owner_type);
        w.write_u8(entry.tag.code());
        w.write_ref(entry.nested);
    }
    w.finish()
}

/// Decode a persisted record.
pub fn decode_record(bytes: &[u8]) -> Result<DescriptorRecord> {
    let mut r = CatalogReader::new(bytes);
    if r.read_bytes(MAGIC.len())? != MAGIC {
        return Err(SchemaError::CorruptCatalog {
            offset: 0,
            reason: "bad magic".into(),
        });
    }
    let format = r.read_u8()?;
    if format != FORMAT_VERSION {
        return Err(r.corrupt(format!("unsupported catalog format {}", format)));
    }

    let type_name = r.read_text()?;
    let generation = r.read_u32_le()?;
    if generation == 0 {
        return Err(r.corrupt("generation must start at 1"));
    }
    let predecessor = r.read_ref()?;
    let has_references = r.read_bool()?;
    let count = r.read_u32_le()? as usize;

    let mut fields = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let field_name = r.read_text()?;
        let owner_type = r.read_text()?;
        let code = r.read_u8()?;
        let tag = TypeTag::from_code(code)
            .ok_or_else(|| r.corrupt(format!("unknown type tag {}", code)))?;
        let nested = r.read_ref()?;
        if tag.is_embedded() != nested.is_some() {
            return Err(r.corrupt(format!(
                "field {} has tag {} but nested schema {:?}",
                field_name, tag, nested
            )));
        }
        fields.push(FieldEntry {
            field_name,
            owner_type,
            tag,
            nested,
        });
    }

    if !r.is_eof() {
        return Err(r.corrupt("trailing bytes after record"));
    }

    Ok(DescriptorRecord {
        type_name,
        generation,
        predecessor,
        has_references,
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DescriptorRecord {
        DescriptorRecord {
            type_name: "app::Body".into(),
            generation: 2,
            predecessor: DescriptorId::new(4),
            has_references: true,
            fields: vec![
                FieldEntry {
                    field_name: "position".into(),
                    owner_type: "app::Body".into(),
                    tag: TypeTag::EmbeddedValue,
                    nested: DescriptorId::new(3),
                },
                FieldEntry {
                    field_name: "parent".into(),
                    owner_type: "app::Body".into(),
                    tag: TypeTag::ObjectRef,
                    nested: None,
                },
            ],
        }
    }

    #[test]
    fn catalog_columns_are_primitive() {
        for (name, tag) in DESCRIPTOR_COLUMNS.iter().chain(FIELD_COLUMNS) {
            assert!(!tag.is_embedded(), "{} must not need a nested schema", name);
            assert!(!tag.is_array(), "{} must be a scalar column", name);
        }
    }

    #[test]
    fn record_survives_encoding() {
        let record = sample();
        assert_eq!(decode_record(&encode_record(&record)).unwrap(), record);
    }

    #[test]
    fn truncated_record_reports_offset() {
        let bytes = encode_record(&sample());
        match decode_record(&bytes[..bytes.len() - 2]) {
            Err(SchemaError::CorruptCatalog { offset, reason }) => {
                assert_eq!(offset, bytes.len() - 4);
                assert_eq!(reason, "unexpected end of record");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = encode_record(&sample());
        bytes[0] = b'X';
        assert!(matches!(
            decode_record(&bytes),
            Err(SchemaError::CorruptCatalog { offset: 0, .. })
        ));
    }

    #[test]
    fn nested_schema_must_match_tag() {
        let mut record = sample();
        record.fields[1].nested = DescriptorId::new(8);
        assert!(matches!(
            decode_record(&encode_record(&record)),
            Err(SchemaError::CorruptCatalog { .. })
        ));
    }
}
