//! Scan column restriction and key-range compilation
//!
//! The output of this module is a [`ScanSpec`]: the physical column
//! restriction, the compiled predicate, the encoded key range and the
//! row-cache hint, ready for the external scan builder to consume.

use std::collections::HashSet;

use bytes::Bytes;
use tracing::debug;

use rowcast_common::error::{Result, ScanError};
use rowcast_schema::codec::{self, Value};
use rowcast_schema::{KeyType, Mapping, Qualifier, SemanticType};

use crate::filter::ScanPredicate;

/// One physical column a scan is restricted to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanColumn {
    pub family: String,
    pub qualifier: Qualifier,
}

/// Resolve selected aliases to their physical columns.
///
/// `None` emits no restriction (full-row scan). Key aliases are skipped:
/// the key is not a cell. An alias absent from the mapping fails with
/// `ColumnNotInMapping`.
pub fn restrict_columns(
    mapping: &Mapping,
    selected: Option<&[String]>,
) -> Result<HashSet<ScanColumn>> {
    let mut columns = HashSet::new();
    let Some(aliases) = selected else {
        return Ok(columns);
    };

    for alias in aliases {
        let column = mapping
            .column(alias)
            .ok_or_else(|| ScanError::ColumnNotInMapping(alias.clone()))?;
        if column.is_key {
            continue;
        }
        columns.insert(ScanColumn {
            family: column.family.clone(),
            qualifier: column.qualifier.clone(),
        });
    }

    debug!(columns = columns.len(), "restricted scan columns");
    Ok(columns)
}

/// Encoded physical key bounds for a bounded scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRange {
    /// Inclusive lower bound
    pub start: Option<Bytes>,
    /// Exclusive upper bound
    pub stop: Option<Bytes>,
}

impl KeyRange {
    /// The unbounded range
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Parse raw start/stop key literals into encoded bounds.
    ///
    /// Date and numeric literals may carry an explicit `@mask` suffix that
    /// overrides `default_mask` (the conversion mask of the key column, when
    /// the caller selected one). Binary keys are hex literals; string keys
    /// encode as UTF-8. A stop bound without a start bound is ignored.
    pub fn parse(
        start: Option<&str>,
        stop: Option<&str>,
        key_type: KeyType,
        default_mask: Option<&str>,
    ) -> Result<Self> {
        let Some(start) = start.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::unbounded());
        };

        let start_bytes = encode_bound(start, key_type, default_mask)?;
        let stop_bytes = match stop.map(str::trim).filter(|s| !s.is_empty()) {
            Some(stop) => Some(encode_bound(stop, key_type, default_mask)?),
            None => None,
        };

        debug!(key_type = %key_type, "parsed scan key range");
        Ok(Self {
            start: Some(start_bytes),
            stop: stop_bytes,
        })
    }
}

fn encode_bound(literal: &str, key_type: KeyType, default_mask: Option<&str>) -> Result<Bytes> {
    match key_type {
        KeyType::String => Ok(Bytes::copy_from_slice(literal.as_bytes())),
        KeyType::Binary => {
            // binary key literals are hex encoded
            let raw = hex::decode(literal).map_err(|e| {
                rowcast_common::error::DecodeError::BadConstant {
                    literal: literal.to_string(),
                    kind: "binary key",
                    reason: e.to_string(),
                }
            })?;
            Ok(Bytes::from(raw))
        }
        _ => {
            let (literal, mask) = split_mask(literal, default_mask);
            let (semantic, _) = key_type.semantic();
            let value = match semantic {
                SemanticType::Date => Value::Date(codec::parse_date_literal(literal, mask)?),
                _ => Value::Integer(codec::parse_integer_literal(literal, mask)?),
            };
            Ok(codec::encode_key(&value, key_type)?)
        }
    }
}

/// Split an optional `@mask` suffix off a key literal. Anything other than
/// exactly one `@` leaves the literal untouched.
fn split_mask<'a>(literal: &'a str, default_mask: Option<&'a str>) -> (&'a str, Option<&'a str>) {
    let parts: Vec<&str> = literal.split('@').collect();
    match parts.as_slice() {
        [value, mask] => (value, Some(mask)),
        _ => (literal, default_mask),
    }
}

/// Everything the external scan builder needs for one bounded,
/// column-restricted, filtered scan
#[derive(Debug, Clone)]
pub struct ScanSpec {
    /// Physical column restriction; empty means full-row scan
    pub columns: HashSet<ScanColumn>,
    /// Compiled server-side predicate
    pub predicate: ScanPredicate,
    /// Encoded key bounds
    pub key_range: KeyRange,
    /// Row-cache/batch-size hint (0 = store default)
    pub cache_size: usize,
}
