//! Metadata table naming.
//!
//! Field and category definitions live in per-entity metadata tables whose
//! names derive from the entity table name. The known entity tables resolve
//! through an explicit lookup; anything else falls back to the historical
//! convention of stripping a plural trailing "S" (but never from names ending
//! in "SS", e.g. ADDRESS).

use anyhow::{bail, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKind {
    Fields,
    Categories,
}

impl MetadataKind {
    fn suffix(self) -> &'static str {
        match self {
            Self::Fields => "_FIELDS",
            Self::Categories => "_FIELD_CATEGORIES",
        }
    }
}

/// True when `s` is safe to interpolate into a DDL statement. Identifiers
/// cannot be bound as parameters, so everything interpolated must pass here.
pub fn valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Resolve the metadata table holding field or category definitions for an
/// entity table. STUDENTS keeps its historical alternate fields root
/// ("CUSTOM_FIELDS" rather than "STUDENT_FIELDS").
pub fn resolve_metadata_table(entity_table: &str, kind: MetadataKind) -> Result<String> {
    if !valid_identifier(entity_table) {
        bail!("invalid entity table identifier: {:?}", entity_table);
    }

    let root = match (entity_table, kind) {
        ("STUDENTS", MetadataKind::Fields) => "CUSTOM",
        ("STUDENTS", MetadataKind::Categories) => "STUDENT",
        ("STAFF", _) => "STAFF",
        ("SCHOOLS", _) => "SCHOOL",
        ("ADDRESS", _) => "ADDRESS",
        _ => {
            return Ok(format!("{}{}", depluralize(entity_table), kind.suffix()));
        }
    };

    Ok(format!("{}{}", root, kind.suffix()))
}

fn depluralize(table: &str) -> &str {
    if table.ends_with('S') && !table.ends_with("SS") {
        &table[..table.len() - 1]
    } else {
        table
    }
}
