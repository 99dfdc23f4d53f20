//! Type resolution between the external type vocabulary and semantic types
//!
//! The external vocabulary spells four numeric types (Integer, Long, Float,
//! Double) that collapse into two semantic types at the row-engine level.
//! This module is the single translation boundary: everything downstream
//! works on a `(SemanticType, Width)` pair and never special-cases the four
//! spellings again.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use rowcast_common::error::SchemaError;

/// Semantic value type of a mapped column
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SemanticType {
    /// UTF-8 text
    String,
    /// Signed integer, 32 or 64 bit per width
    Integer,
    /// IEEE-754 float, 32 or 64 bit per width
    Number,
    /// Signed 64-bit epoch milliseconds
    Date,
    /// Boolean, stored as text or a single byte
    Boolean,
    /// Raw bytes
    Binary,
}

impl SemanticType {
    /// True for types whose filter operators are the comparison set
    /// (as opposed to the string-matching set)
    pub fn is_comparable(self) -> bool {
        matches!(
            self,
            SemanticType::Integer | SemanticType::Number | SemanticType::Date | SemanticType::Boolean
        )
    }
}

/// Storage width of a numeric column
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Width {
    /// 4-byte storage
    Narrow,
    /// 8-byte storage
    Wide,
}

impl Width {
    /// Number of bytes a value of this width occupies
    pub fn num_bytes(self) -> usize {
        match self {
            Width::Narrow => 4,
            Width::Wide => 8,
        }
    }
}

/// Resolve a declared external type name to its semantic type and width.
///
/// The four numeric spellings disambiguate width; every other recognized
/// name maps 1:1 and defaults to wide. Matching is case-insensitive.
pub fn resolve(declared: &str) -> Result<(SemanticType, Width), SchemaError> {
    let resolved = match declared.to_ascii_lowercase().as_str() {
        "integer" => (SemanticType::Integer, Width::Narrow),
        "long" => (SemanticType::Integer, Width::Wide),
        "float" => (SemanticType::Number, Width::Narrow),
        "double" => (SemanticType::Number, Width::Wide),
        "number" => (SemanticType::Number, Width::Wide),
        "string" => (SemanticType::String, Width::Wide),
        "date" => (SemanticType::Date, Width::Wide),
        "boolean" => (SemanticType::Boolean, Width::Wide),
        "binary" => (SemanticType::Binary, Width::Wide),
        _ => return Err(SchemaError::UnknownType(declared.to_string())),
    };
    Ok(resolved)
}

/// Exact inverse of [`resolve`] for the four numeric pairs; canonical name
/// for everything else.
pub fn describe(semantic: SemanticType, width: Width) -> &'static str {
    match (semantic, width) {
        (SemanticType::Integer, Width::Wide) => "Long",
        (SemanticType::Integer, Width::Narrow) => "Integer",
        (SemanticType::Number, Width::Wide) => "Double",
        (SemanticType::Number, Width::Narrow) => "Float",
        (SemanticType::String, _) => "String",
        (SemanticType::Date, _) => "Date",
        (SemanticType::Boolean, _) => "Boolean",
        (SemanticType::Binary, _) => "Binary",
    }
}

/// Type of the table key.
///
/// Keys are stored as bytes and sort lexicographically. The signed
/// Integer/Long/Date variants flip the sign bit before storage so that
/// negative values sort before positive ones; the Unsigned variants assume
/// non-negative values and store raw two's complement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum KeyType {
    String,
    Integer,
    UnsignedInteger,
    Long,
    UnsignedLong,
    Date,
    UnsignedDate,
    Binary,
}

impl KeyType {
    /// Project the key type onto the semantic type/width pair used for
    /// uniform decoding
    pub fn semantic(self) -> (SemanticType, Width) {
        match self {
            KeyType::String => (SemanticType::String, Width::Wide),
            KeyType::Integer | KeyType::UnsignedInteger => (SemanticType::Integer, Width::Narrow),
            KeyType::Long | KeyType::UnsignedLong => (SemanticType::Integer, Width::Wide),
            KeyType::Date | KeyType::UnsignedDate => (SemanticType::Date, Width::Wide),
            KeyType::Binary => (SemanticType::Binary, Width::Wide),
        }
    }

    /// Whether the sign-bit flip applies to stored key bytes
    pub fn is_signed(self) -> bool {
        matches!(self, KeyType::Integer | KeyType::Long | KeyType::Date)
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyType::String => "String",
            KeyType::Integer => "Integer",
            KeyType::UnsignedInteger => "UnsignedInteger",
            KeyType::Long => "Long",
            KeyType::UnsignedLong => "UnsignedLong",
            KeyType::Date => "Date",
            KeyType::UnsignedDate => "UnsignedDate",
            KeyType::Binary => "Binary",
        };
        f.write_str(name)
    }
}

impl FromStr for KeyType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key_type = match s.to_ascii_lowercase().as_str() {
            "string" => KeyType::String,
            "integer" => KeyType::Integer,
            "unsignedinteger" => KeyType::UnsignedInteger,
            "long" => KeyType::Long,
            "unsignedlong" => KeyType::UnsignedLong,
            "date" => KeyType::Date,
            "unsigneddate" => KeyType::UnsignedDate,
            "binary" => KeyType::Binary,
            _ => return Err(SchemaError::UnknownType(s.to_string())),
        };
        Ok(key_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_spellings_disambiguate_width() {
        assert_eq!(resolve("Integer").unwrap(), (SemanticType::Integer, Width::Narrow));
        assert_eq!(resolve("Long").unwrap(), (SemanticType::Integer, Width::Wide));
        assert_eq!(resolve("Float").unwrap(), (SemanticType::Number, Width::Narrow));
        assert_eq!(resolve("Double").unwrap(), (SemanticType::Number, Width::Wide));
    }

    #[test]
    fn describe_inverts_resolve() {
        for name in ["Integer", "Long", "Float", "Double", "String", "Date", "Boolean", "Binary"] {
            let (semantic, width) = resolve(name).unwrap();
            assert_eq!(describe(semantic, width), name);
        }
    }

    #[test]
    fn resolve_is_case_insensitive() {
        assert_eq!(resolve("long").unwrap(), resolve("LONG").unwrap());
        assert_eq!(resolve("string").unwrap(), (SemanticType::String, Width::Wide));
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(matches!(resolve("Serializable"), Err(SchemaError::UnknownType(_))));
    }

    #[test]
    fn number_defaults_to_wide() {
        assert_eq!(resolve("Number").unwrap(), (SemanticType::Number, Width::Wide));
    }

    #[test]
    fn key_type_round_trips_through_strings() {
        for name in [
            "String",
            "Integer",
            "UnsignedInteger",
            "Long",
            "UnsignedLong",
            "Date",
            "UnsignedDate",
            "Binary",
        ] {
            let parsed: KeyType = name.parse().unwrap();
            assert_eq!(parsed.to_string(), name);
        }
    }

    #[test]
    fn unsigned_key_types_are_not_sign_flipped() {
        assert!(KeyType::Integer.is_signed());
        assert!(KeyType::Date.is_signed());
        assert!(!KeyType::UnsignedInteger.is_signed());
        assert!(!KeyType::UnsignedDate.is_signed());
        assert!(!KeyType::String.is_signed());
    }
}
