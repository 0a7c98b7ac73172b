//! Storage type tags.
//!
//! Tags are dialect-agnostic mnemonics. Nothing in this crate interprets
//! them; DDL generators consume them.

use std::fmt;

/// Storage type declared by an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageType {
    // Integer with display size
    Integer(u32),

    // String types with a maximum length and the base type name
    VarChar(u32),
    Sized { base: String, size: u32 },
    Text,

    // Custom type name
    Custom(String),
}

impl StorageType {
    /// Get the mnemonic for this tag, e.g. `INTEGER(10)` or `VARCHAR(255)`.
    pub fn mnemonic(&self) -> String {
        match self {
            StorageType::Integer(size) => format!("INTEGER({})", size),
            StorageType::VarChar(len) => format!("VARCHAR({})", len),
            StorageType::Sized { base, size } => format!("{}({})", base, size),
            StorageType::Text => "TEXT".to_string(),
            StorageType::Custom(name) => name.clone(),
        }
    }

    /// Build a sized tag from a base type name, normalizing `VARCHAR`.
    pub fn sized(base: &str, size: u32) -> Self {
        if base.eq_ignore_ascii_case("VARCHAR") {
            StorageType::VarChar(size)
        } else {
            StorageType::Sized {
                base: base.to_uppercase(),
                size,
            }
        }
    }

    /// Check if this tag is integer-based.
    pub const fn is_integer(&self) -> bool {
        matches!(self, StorageType::Integer(_))
    }

    /// Check if this tag is text-based.
    pub fn is_text(&self) -> bool {
        match self {
            StorageType::VarChar(_) | StorageType::Text => true,
            StorageType::Sized { base, .. } => base.contains("CHAR") || base.contains("TEXT"),
            _ => false,
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mnemonic())
    }
}
