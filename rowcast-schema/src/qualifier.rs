//! Qualifier encoding
//!
//! Logical mappings may reference qualifiers that are not valid UTF-8. The
//! external format marks such column names with a reserved prefix followed
//! by a hex encoding of the raw bytes. The marker is parsed exactly once,
//! here; downstream code only ever sees the decoded form.

use std::fmt;

use serde::{Deserialize, Serialize};

use rowcast_common::error::SchemaError;
use rowcast_common::types::BINARY_QUALIFIER_MARKER;

/// A physical column qualifier within a family
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub enum Qualifier {
    /// Plain UTF-8 column name
    Text(String),
    /// Binary column name, referenced as hex in the external format
    Hex(Vec<u8>),
}

impl Qualifier {
    /// Parse an external qualifier string, decoding the binary-name marker
    /// if present
    pub fn parse(raw: &str) -> Result<Self, SchemaError> {
        match raw.strip_prefix(BINARY_QUALIFIER_MARKER) {
            Some(hex_part) => {
                let bytes = hex::decode(hex_part).map_err(|e| SchemaError::BadBinaryQualifier {
                    qualifier: raw.to_string(),
                    reason: e.to_string(),
                })?;
                Ok(Qualifier::Hex(bytes))
            }
            None => Ok(Qualifier::Text(raw.to_string())),
        }
    }

    /// Physical bytes of the qualifier as stored
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Qualifier::Text(s) => s.as_bytes(),
            Qualifier::Hex(b) => b,
        }
    }

    /// True when the qualifier was declared with the binary-name marker
    pub fn is_binary(&self) -> bool {
        matches!(self, Qualifier::Hex(_))
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Qualifier::Text(s) => f.write_str(s),
            Qualifier::Hex(b) => write!(f, "{}{}", BINARY_QUALIFIER_MARKER, hex::encode(b)),
        }
    }
}

impl TryFrom<String> for Qualifier {
    type Error = SchemaError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Qualifier::parse(&raw)
    }
}

impl From<Qualifier> for String {
    fn from(q: Qualifier) -> Self {
        q.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_name_stays_text() {
        let q = Qualifier::parse("nm").unwrap();
        assert_eq!(q, Qualifier::Text("nm".to_string()));
        assert_eq!(q.as_bytes(), b"nm");
        assert!(!q.is_binary());
    }

    #[test]
    fn marker_decodes_hex() {
        let q = Qualifier::parse("@@@binary@@@00ff10").unwrap();
        assert_eq!(q, Qualifier::Hex(vec![0x00, 0xff, 0x10]));
        assert!(q.is_binary());
    }

    #[test]
    fn display_round_trips_marker_form() {
        for raw in ["nm", "@@@binary@@@cafe"] {
            let q = Qualifier::parse(raw).unwrap();
            assert_eq!(q.to_string(), raw);
        }
    }

    #[test]
    fn invalid_hex_is_rejected() {
        let err = Qualifier::parse("@@@binary@@@zz").unwrap_err();
        assert!(matches!(err, SchemaError::BadBinaryQualifier { .. }));
    }
}
