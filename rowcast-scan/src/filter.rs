//! Declarative column filters and their compilation into scan predicates
//!
//! A [`ColumnFilter`] binds a comparison to one alias. Compilation resolves
//! the alias against the mapping, sanity-checks the declared type, verifies
//! the operator is admissible for the column's semantic type, parses the
//! constant, and produces a single-column [`CellPredicate`]. The full set
//! combines with logical AND or OR into a [`ScanPredicate`] that the store
//! evaluates server-side; `CellPredicate::matches` carries the reference
//! semantics.

use std::cmp::Ordering;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use rowcast_common::error::{DecodeError, FilterError};
use rowcast_schema::codec;
use rowcast_schema::{ColumnDescriptor, Mapping, Qualifier, SemanticType, Width};

use crate::result::StoreResult;

/// Comparison operator of a column filter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Substring,
    Prefix,
    Regex,
}

impl ComparisonOp {
    /// True for the six ordering comparisons
    fn is_ordering(self) -> bool {
        !matches!(
            self,
            ComparisonOp::Substring | ComparisonOp::Prefix | ComparisonOp::Regex
        )
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComparisonOp::Equal => "EQUAL",
            ComparisonOp::NotEqual => "NOT_EQUAL",
            ComparisonOp::LessThan => "LESS_THAN",
            ComparisonOp::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
            ComparisonOp::GreaterThan => "GREATER_THAN",
            ComparisonOp::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
            ComparisonOp::Substring => "SUBSTRING",
            ComparisonOp::Prefix => "PREFIX",
            ComparisonOp::Regex => "REGEX",
        };
        f.write_str(name)
    }
}

/// A declarative predicate attached to one alias
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnFilter {
    /// Alias of the mapped column this filter binds to
    pub alias: String,
    /// Optional declared external type, sanity-checked against the mapping
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    /// Comparison operator
    #[serde(rename = "comparison_type")]
    pub operator: ComparisonOp,
    /// Literal to compare against, parsed per the column's semantic type
    pub constant: String,
    /// Whether numeric comparison decodes stored bytes rather than
    /// comparing them lexicographically
    #[serde(rename = "signed_comparison", default)]
    pub signed: bool,
    /// Optional format mask for parsing the constant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl ColumnFilter {
    pub fn new(
        alias: impl Into<String>,
        operator: ComparisonOp,
        constant: impl Into<String>,
    ) -> Self {
        Self {
            alias: alias.into(),
            field_type: None,
            operator,
            constant: constant.into(),
            signed: false,
            format: None,
        }
    }

    /// Declare the expected external type of the target column
    pub fn with_field_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = Some(field_type.into());
        self
    }

    /// Attach a format mask for constant parsing
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Use signed (decoded) numeric comparison
    pub fn signed(mut self) -> Self {
        self.signed = true;
        self
    }
}

/// The parsed comparison side of a compiled predicate
#[derive(Debug, Clone)]
enum Comparison {
    /// Lexicographic comparison against raw encoded bytes
    Raw(Bytes),
    /// Numeric comparison against the decoded stored integer/date
    SignedInteger(i64),
    /// Numeric comparison against the decoded stored float
    SignedNumber(f64),
    /// Boolean comparison against the decoded stored boolean
    Boolean(bool),
    Substring(String),
    Prefix(String),
    Regex(regex::Regex),
}

/// A compiled single-column predicate
#[derive(Debug, Clone)]
pub struct CellPredicate {
    alias: String,
    family: String,
    qualifier: Qualifier,
    operator: ComparisonOp,
    comparison: Comparison,
    semantic_type: SemanticType,
    width: Width,
}

impl CellPredicate {
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Evaluate the predicate against one fetched row. A missing cell fails
    /// the predicate, as does a stored value the comparison cannot decode.
    pub fn matches<R: StoreResult>(&self, result: &R) -> bool {
        let Some(raw) = result.cell_value(&self.family, &self.qualifier) else {
            return false;
        };

        match &self.comparison {
            Comparison::Raw(expected) => apply_op(self.operator, raw.cmp(expected.as_ref())),
            Comparison::SignedInteger(expected) => {
                match stored_integer(raw, self.semantic_type, self.width) {
                    Some(stored) => apply_op(self.operator, stored.cmp(expected)),
                    None => false,
                }
            }
            Comparison::SignedNumber(expected) => match stored_number(raw, self.width) {
                Some(stored) => stored
                    .partial_cmp(expected)
                    .is_some_and(|ord| apply_op(self.operator, ord)),
                None => false,
            },
            Comparison::Boolean(expected) => match codec::boolean_from_bytes(raw) {
                Some(stored) => apply_op(self.operator, stored.cmp(expected)),
                None => false,
            },
            Comparison::Substring(needle) => {
                std::str::from_utf8(raw).is_ok_and(|s| s.contains(needle))
            }
            Comparison::Prefix(prefix) => {
                std::str::from_utf8(raw).is_ok_and(|s| s.starts_with(prefix))
            }
            Comparison::Regex(re) => std::str::from_utf8(raw).is_ok_and(|s| re.is_match(s)),
        }
    }
}

fn apply_op(operator: ComparisonOp, ordering: Ordering) -> bool {
    match operator {
        ComparisonOp::Equal => ordering == Ordering::Equal,
        ComparisonOp::NotEqual => ordering != Ordering::Equal,
        ComparisonOp::LessThan => ordering == Ordering::Less,
        ComparisonOp::LessThanOrEqual => ordering != Ordering::Greater,
        ComparisonOp::GreaterThan => ordering == Ordering::Greater,
        ComparisonOp::GreaterThanOrEqual => ordering != Ordering::Less,
        // string-matching operators never reach ordering evaluation
        ComparisonOp::Substring | ComparisonOp::Prefix | ComparisonOp::Regex => false,
    }
}

fn stored_integer(raw: &[u8], semantic_type: SemanticType, width: Width) -> Option<i64> {
    let expected = match semantic_type {
        SemanticType::Date => 8,
        _ => width.num_bytes(),
    };
    match (expected, raw.len()) {
        (4, 4) => Some(i64::from(i32::from_be_bytes(raw.try_into().unwrap()))),
        (8, 8) => Some(i64::from_be_bytes(raw.try_into().unwrap())),
        _ => None,
    }
}

fn stored_number(raw: &[u8], width: Width) -> Option<f64> {
    match (width, raw.len()) {
        (Width::Narrow, 4) => Some(f64::from(f32::from_be_bytes(raw.try_into().unwrap()))),
        (Width::Wide, 8) => Some(f64::from_be_bytes(raw.try_into().unwrap())),
        _ => None,
    }
}

/// How compiled predicates combine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Combinator {
    /// Every predicate must pass
    All,
    /// Any passing predicate admits the row
    Any,
}

/// A compiled predicate tree for one scan. Empty means unconditionally
/// true.
#[derive(Debug, Clone)]
pub struct ScanPredicate {
    combinator: Combinator,
    predicates: Vec<CellPredicate>,
}

impl ScanPredicate {
    /// The always-true predicate
    pub fn none() -> Self {
        Self {
            combinator: Combinator::All,
            predicates: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    pub fn predicates(&self) -> &[CellPredicate] {
        &self.predicates
    }

    /// Evaluate against one fetched row
    pub fn matches<R: StoreResult>(&self, result: &R) -> bool {
        if self.predicates.is_empty() {
            return true;
        }
        match self.combinator {
            Combinator::All => self.predicates.iter().all(|p| p.matches(result)),
            Combinator::Any => self.predicates.iter().any(|p| p.matches(result)),
        }
    }
}

/// Compile declared filters into a store-side predicate.
///
/// `match_any` selects OR combination; the default is AND. A boolean filter
/// whose constant does not parse is dropped rather than failing the scan.
pub fn compile_filters(
    filters: &[ColumnFilter],
    mapping: &Mapping,
    match_any: bool,
) -> Result<ScanPredicate, rowcast_common::Error> {
    let mut predicates = Vec::with_capacity(filters.len());

    for filter in filters {
        let column = mapping
            .column(&filter.alias)
            .ok_or_else(|| FilterError::ColumnFilterNotInMapping(filter.alias.clone()))?;

        if let Some(declared) = filter.field_type.as_deref().filter(|t| !t.is_empty()) {
            let resolved = column.external_type_name();
            if !declared.eq_ignore_ascii_case(resolved) {
                return Err(FilterError::FieldTypeMismatch {
                    alias: filter.alias.clone(),
                    declared: declared.to_string(),
                    resolved: resolved.to_string(),
                }
                .into());
            }
        }

        if let Some(predicate) = compile_one(filter, column)? {
            predicates.push(predicate);
        }
    }

    let combinator = if match_any { Combinator::Any } else { Combinator::All };
    debug!(count = predicates.len(), ?combinator, "compiled scan filters");

    Ok(ScanPredicate {
        combinator,
        predicates,
    })
}

fn compile_one(
    filter: &ColumnFilter,
    column: &ColumnDescriptor,
) -> Result<Option<CellPredicate>, rowcast_common::Error> {
    let operator = filter.operator;
    let unsupported = || -> rowcast_common::Error {
        FilterError::OperatorNotSupportedForType {
            alias: filter.alias.clone(),
            operator: operator.to_string(),
            type_name: column.external_type_name().to_string(),
        }
        .into()
    };

    let constant = filter.constant.trim();
    let mask = filter.format.as_deref();

    let comparison = match column.semantic_type {
        SemanticType::Integer => {
            if !operator.is_ordering() {
                return Err(unsupported());
            }
            let n = codec::parse_integer_literal(constant, mask)?;
            if filter.signed {
                Comparison::SignedInteger(n)
            } else {
                Comparison::Raw(encode_integer_constant(n, column.width))
            }
        }
        SemanticType::Number => {
            if !operator.is_ordering() {
                return Err(unsupported());
            }
            let f = codec::parse_number_literal(constant, mask)?;
            if filter.signed {
                Comparison::SignedNumber(f)
            } else {
                Comparison::Raw(encode_number_constant(f, column.width))
            }
        }
        SemanticType::Date => {
            if !operator.is_ordering() {
                return Err(unsupported());
            }
            let millis = codec::parse_date_literal(constant, mask)?.timestamp_millis();
            if filter.signed {
                Comparison::SignedInteger(millis)
            } else {
                Comparison::Raw(Bytes::copy_from_slice(&millis.to_be_bytes()))
            }
        }
        SemanticType::Boolean => {
            if !operator.is_ordering() {
                return Err(unsupported());
            }
            match codec::boolean_from_str(constant) {
                Some(b) => Comparison::Boolean(b),
                None => {
                    // an unparseable boolean constant drops the filter
                    debug!(alias = %filter.alias, constant, "skipping boolean filter");
                    return Ok(None);
                }
            }
        }
        SemanticType::String => match operator {
            ComparisonOp::Equal | ComparisonOp::NotEqual => {
                Comparison::Raw(Bytes::copy_from_slice(constant.as_bytes()))
            }
            ComparisonOp::Substring => Comparison::Substring(constant.to_string()),
            ComparisonOp::Prefix => Comparison::Prefix(constant.to_string()),
            ComparisonOp::Regex => {
                let re = regex::Regex::new(constant).map_err(|e| {
                    rowcast_common::Error::Decode(DecodeError::BadConstant {
                        literal: constant.to_string(),
                        kind: "regex",
                        reason: e.to_string(),
                    })
                })?;
                Comparison::Regex(re)
            }
            _ => return Err(unsupported()),
        },
        SemanticType::Binary => match operator {
            // binary constants are hex literals
            ComparisonOp::Equal | ComparisonOp::NotEqual => {
                let raw = hex::decode(constant).map_err(|e| {
                    rowcast_common::Error::Decode(DecodeError::BadConstant {
                        literal: constant.to_string(),
                        kind: "binary",
                        reason: e.to_string(),
                    })
                })?;
                Comparison::Raw(Bytes::from(raw))
            }
            _ => return Err(unsupported()),
        },
    };

    Ok(Some(CellPredicate {
        alias: column.alias.clone(),
        family: column.family.clone(),
        qualifier: column.qualifier.clone(),
        operator,
        comparison,
        semantic_type: column.semantic_type,
        width: column.width,
    }))
}

fn encode_integer_constant(n: i64, width: Width) -> Bytes {
    match width {
        Width::Narrow => Bytes::copy_from_slice(&(n as i32).to_be_bytes()),
        Width::Wide => Bytes::copy_from_slice(&n.to_be_bytes()),
    }
}

fn encode_number_constant(f: f64, width: Width) -> Bytes {
    match width {
        Width::Narrow => Bytes::copy_from_slice(&(f as f32).to_be_bytes()),
        Width::Wide => Bytes::copy_from_slice(&f.to_be_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::FetchedRow;
    use rowcast_common::error::FilterError;
    use rowcast_schema::{KeyType, MappingBuilder};

    fn mapping() -> Mapping {
        MappingBuilder::new("people", "basic")
            .key("id", KeyType::Integer)
            .unwrap()
            .add_column(
                ColumnDescriptor::new("cf", Qualifier::Text("nm".into()), "name", "String")
                    .unwrap(),
            )
            .unwrap()
            .add_column(
                ColumnDescriptor::new("cf", Qualifier::Text("ag".into()), "age", "Long").unwrap(),
            )
            .unwrap()
            .add_column(
                ColumnDescriptor::new("cf", Qualifier::Text("ok".into()), "active", "Boolean")
                    .unwrap(),
            )
            .unwrap()
            .build()
            .unwrap()
    }

    fn row(age: i64, name: &str, active: &[u8]) -> FetchedRow {
        FetchedRow::new(&b"k"[..])
            .with_cell("cf", &b"ag"[..], age.to_be_bytes().to_vec(), 1)
            .with_cell("cf", &b"nm"[..], name.as_bytes().to_vec(), 1)
            .with_cell("cf", &b"ok"[..], active.to_vec(), 1)
    }

    #[test]
    fn unknown_alias_fails_compilation() {
        let filters = [ColumnFilter::new("nope", ComparisonOp::Equal, "1")];
        let err = compile_filters(&filters, &mapping(), false).unwrap_err();
        assert!(matches!(
            err,
            rowcast_common::Error::Filter(FilterError::ColumnFilterNotInMapping(_))
        ));
    }

    #[test]
    fn declared_type_must_match_the_mapping() {
        let filters = [ColumnFilter::new("age", ComparisonOp::Equal, "1").with_field_type("String")];
        let err = compile_filters(&filters, &mapping(), false).unwrap_err();
        assert!(matches!(
            err,
            rowcast_common::Error::Filter(FilterError::FieldTypeMismatch { .. })
        ));

        // case-insensitive match passes
        let filters = [ColumnFilter::new("age", ComparisonOp::Equal, "1").with_field_type("long")];
        assert!(compile_filters(&filters, &mapping(), false).is_ok());
    }

    #[test]
    fn substring_on_a_numeric_column_is_rejected() {
        let filters = [ColumnFilter::new("age", ComparisonOp::Substring, "3")];
        let err = compile_filters(&filters, &mapping(), false).unwrap_err();
        assert!(matches!(
            err,
            rowcast_common::Error::Filter(FilterError::OperatorNotSupportedForType { .. })
        ));
    }

    #[test]
    fn ordering_on_a_string_column_is_rejected() {
        let filters = [ColumnFilter::new("name", ComparisonOp::LessThan, "x")];
        let err = compile_filters(&filters, &mapping(), false).unwrap_err();
        assert!(matches!(
            err,
            rowcast_common::Error::Filter(FilterError::OperatorNotSupportedForType { .. })
        ));
    }

    #[test]
    fn signed_numeric_comparison_decodes_stored_bytes() {
        let filters = [ColumnFilter::new("age", ComparisonOp::GreaterThan, "30").signed()];
        let predicate = compile_filters(&filters, &mapping(), false).unwrap();

        assert!(predicate.matches(&row(31, "Ann", b"Y")));
        assert!(!predicate.matches(&row(-5, "Ann", b"Y")));
        assert!(!predicate.matches(&row(30, "Ann", b"Y")));
    }

    #[test]
    fn unsigned_comparison_is_lexicographic_on_raw_bytes() {
        // -5 as two's complement has its high bit set and therefore sorts
        // after 30 when compared as raw bytes
        let filters = [ColumnFilter::new("age", ComparisonOp::GreaterThan, "30")];
        let predicate = compile_filters(&filters, &mapping(), false).unwrap();
        assert!(predicate.matches(&row(-5, "Ann", b"Y")));
    }

    #[test]
    fn string_operators_match_substrings_and_prefixes() {
        let substring = compile_filters(
            &[ColumnFilter::new("name", ComparisonOp::Substring, "nn")],
            &mapping(),
            false,
        )
        .unwrap();
        assert!(substring.matches(&row(1, "Anna", b"Y")));
        assert!(!substring.matches(&row(1, "Bob", b"Y")));

        let prefix = compile_filters(
            &[ColumnFilter::new("name", ComparisonOp::Prefix, "An")],
            &mapping(),
            false,
        )
        .unwrap();
        assert!(prefix.matches(&row(1, "Anna", b"Y")));
        assert!(!prefix.matches(&row(1, "Joanne", b"Y")));

        let re = compile_filters(
            &[ColumnFilter::new("name", ComparisonOp::Regex, "^A.*a$")],
            &mapping(),
            false,
        )
        .unwrap();
        assert!(re.matches(&row(1, "Anna", b"Y")));
        assert!(!re.matches(&row(1, "Ann", b"Y")));
    }

    #[test]
    fn missing_cell_fails_the_predicate() {
        let filters = [ColumnFilter::new("name", ComparisonOp::Equal, "Ann")];
        let predicate = compile_filters(&filters, &mapping(), false).unwrap();
        let no_name = FetchedRow::new(&b"k"[..]).with_cell("cf", &b"ag"[..], 1i64.to_be_bytes().to_vec(), 1);
        assert!(!predicate.matches(&no_name));
    }

    #[test]
    fn match_any_combines_with_or() {
        let filters = [
            ColumnFilter::new("name", ComparisonOp::Equal, "Zed"),
            ColumnFilter::new("age", ComparisonOp::Equal, "31").signed(),
        ];
        let any = compile_filters(&filters, &mapping(), true).unwrap();
        assert!(any.matches(&row(31, "Ann", b"Y")));

        let all = compile_filters(&filters, &mapping(), false).unwrap();
        assert!(!all.matches(&row(31, "Ann", b"Y")));
    }

    #[test]
    fn empty_filter_list_is_unconditionally_true() {
        let predicate = compile_filters(&[], &mapping(), false).unwrap();
        assert!(predicate.is_empty());
        assert!(predicate.matches(&FetchedRow::new(&b"k"[..])));
    }

    #[test]
    fn unparseable_boolean_constant_drops_the_filter() {
        let filters = [ColumnFilter::new("active", ComparisonOp::Equal, "maybe")];
        let predicate = compile_filters(&filters, &mapping(), false).unwrap();
        assert!(predicate.is_empty());
    }

    #[test]
    fn boolean_comparison_matches_stored_forms() {
        let filters = [ColumnFilter::new("active", ComparisonOp::Equal, "true")];
        let predicate = compile_filters(&filters, &mapping(), false).unwrap();
        assert!(predicate.matches(&row(1, "Ann", b"Y")));
        assert!(!predicate.matches(&row(1, "Ann", b"N")));
        assert!(predicate.matches(&row(1, "Ann", &[1])));
    }

    #[test]
    fn filter_serde_preserves_tag_names() {
        let filter = ColumnFilter::new("age", ComparisonOp::GreaterThanOrEqual, "30")
            .with_field_type("Long")
            .signed();
        let json = serde_json::to_string(&filter).unwrap();
        assert!(json.contains("\"comparison_type\":\"GREATER_THAN_OR_EQUAL\""));
        assert!(json.contains("\"signed_comparison\":true"));
        assert!(json.contains("\"type\":\"Long\""));
        let restored: ColumnFilter = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, filter);
    }
}
