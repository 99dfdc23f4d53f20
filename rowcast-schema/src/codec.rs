//! Byte-level codec between raw cell bytes and typed values
//!
//! All multi-byte storage is big-endian. Integers are two's complement,
//! floats are IEEE-754, dates are signed 64-bit epoch milliseconds.
//! Decoding honors the column's declared storage width; the outbound
//! Number direction always narrows to a 32-bit float, for compatibility
//! with tables written by older loaders.

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use rowcast_common::error::DecodeError;

use crate::mapping::ColumnDescriptor;
use crate::types::{KeyType, SemanticType, Width};

/// A decoded, typed cell or key value
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum Value {
    /// Cell absent from the fetched row
    Null,
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    Binary(Bytes),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Human-readable name of the value's type, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
            Value::Binary(_) => "binary",
        }
    }
}

/// Decode one column's raw cell bytes into a typed value.
///
/// `None` means the cell was absent from the fetched row and decodes to an
/// explicit [`Value::Null`]; it is never an error.
pub fn decode(bytes: Option<&[u8]>, column: &ColumnDescriptor) -> Result<Value, DecodeError> {
    let Some(raw) = bytes else {
        return Ok(Value::Null);
    };

    if let Some(labels) = &column.index_values {
        return decode_indexed(raw, labels, column);
    }

    match column.semantic_type {
        SemanticType::String => decode_string(raw, column).map(Value::String),
        SemanticType::Integer => decode_integer(raw, column.width, column).map(Value::Integer),
        SemanticType::Number => decode_number(raw, column.width, column).map(Value::Number),
        SemanticType::Date => decode_date(raw, column).map(Value::Date),
        SemanticType::Boolean => decode_boolean(raw, column).map(Value::Boolean),
        SemanticType::Binary => Ok(Value::Binary(Bytes::copy_from_slice(raw))),
    }
}

/// Encode a typed value for storage.
///
/// Integers always encode wide (8 bytes) and Numbers always narrow to a
/// 32-bit float, regardless of the column's storage width.
pub fn encode(value: &Value, semantic_type: SemanticType) -> Result<Bytes, DecodeError> {
    let encoded = match (semantic_type, value) {
        (_, Value::Null) => Bytes::new(),
        (SemanticType::String, Value::String(s)) => Bytes::copy_from_slice(s.as_bytes()),
        (SemanticType::Integer, Value::Integer(i)) => Bytes::copy_from_slice(&i.to_be_bytes()),
        (SemanticType::Number, Value::Number(n)) => {
            Bytes::copy_from_slice(&(*n as f32).to_be_bytes())
        }
        (SemanticType::Number, Value::Integer(i)) => {
            Bytes::copy_from_slice(&(*i as f32).to_be_bytes())
        }
        (SemanticType::Date, Value::Date(d)) => {
            Bytes::copy_from_slice(&d.timestamp_millis().to_be_bytes())
        }
        (SemanticType::Boolean, Value::Boolean(b)) => {
            Bytes::from_static(if *b { b"Y" } else { b"N" })
        }
        (SemanticType::Binary, Value::Binary(b)) => b.clone(),
        (expected, actual) => {
            return Err(DecodeError::BadConstant {
                literal: format!("{actual:?}"),
                kind: describe_kind(expected),
                reason: "value does not match the column's semantic type".to_string(),
            })
        }
    };
    Ok(encoded)
}

fn describe_kind(semantic_type: SemanticType) -> &'static str {
    match semantic_type {
        SemanticType::String => "string",
        SemanticType::Integer => "integer",
        SemanticType::Number => "number",
        SemanticType::Date => "date",
        SemanticType::Boolean => "boolean",
        SemanticType::Binary => "binary",
    }
}

fn wrong_length(
    column: &ColumnDescriptor,
    kind: &'static str,
    expected: usize,
    actual: usize,
) -> DecodeError {
    DecodeError::WrongByteLength {
        alias: column.alias.clone(),
        family: column.family.clone(),
        qualifier: column.qualifier.to_string(),
        kind,
        expected,
        actual,
    }
}

fn decode_string(raw: &[u8], column: &ColumnDescriptor) -> Result<String, DecodeError> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|_| DecodeError::BadUtf8 {
            alias: column.alias.clone(),
        })
}

fn decode_integer(raw: &[u8], width: Width, column: &ColumnDescriptor) -> Result<i64, DecodeError> {
    match width {
        Width::Narrow => {
            let arr: [u8; 4] = raw
                .try_into()
                .map_err(|_| wrong_length(column, "integer", 4, raw.len()))?;
            Ok(i64::from(i32::from_be_bytes(arr)))
        }
        Width::Wide => {
            let arr: [u8; 8] = raw
                .try_into()
                .map_err(|_| wrong_length(column, "integer", 8, raw.len()))?;
            Ok(i64::from_be_bytes(arr))
        }
    }
}

fn decode_number(raw: &[u8], width: Width, column: &ColumnDescriptor) -> Result<f64, DecodeError> {
    match width {
        Width::Narrow => {
            let arr: [u8; 4] = raw
                .try_into()
                .map_err(|_| wrong_length(column, "float", 4, raw.len()))?;
            Ok(f64::from(f32::from_be_bytes(arr)))
        }
        Width::Wide => {
            let arr: [u8; 8] = raw
                .try_into()
                .map_err(|_| wrong_length(column, "float", 8, raw.len()))?;
            Ok(f64::from_be_bytes(arr))
        }
    }
}

fn decode_date(raw: &[u8], column: &ColumnDescriptor) -> Result<DateTime<Utc>, DecodeError> {
    let arr: [u8; 8] = raw
        .try_into()
        .map_err(|_| wrong_length(column, "date", 8, raw.len()))?;
    millis_to_date(i64::from_be_bytes(arr))
}

fn millis_to_date(millis: i64) -> Result<DateTime<Utc>, DecodeError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| DecodeError::BadConstant {
            literal: millis.to_string(),
            kind: "epoch milliseconds",
            reason: "out of range".to_string(),
        })
}

fn decode_boolean(raw: &[u8], column: &ColumnDescriptor) -> Result<bool, DecodeError> {
    boolean_from_bytes(raw).ok_or_else(|| DecodeError::BadBoolean {
        alias: column.alias.clone(),
        len: raw.len(),
    })
}

/// Interpret stored bytes as a boolean: string forms first, then a
/// single-byte number
pub fn boolean_from_bytes(raw: &[u8]) -> Option<bool> {
    if let Ok(text) = std::str::from_utf8(raw) {
        if let Some(b) = boolean_from_str(text) {
            return Some(b);
        }
    }
    match raw {
        [0] => Some(false),
        [1] => Some(true),
        _ => None,
    }
}

/// Recognized textual boolean spellings, case-insensitive
pub fn boolean_from_str(text: &str) -> Option<bool> {
    match text.trim().to_ascii_uppercase().as_str() {
        "Y" | "YES" | "T" | "TRUE" | "1" => Some(true),
        "N" | "NO" | "F" | "FALSE" | "0" => Some(false),
        _ => None,
    }
}

fn decode_indexed(
    raw: &[u8],
    labels: &[String],
    column: &ColumnDescriptor,
) -> Result<Value, DecodeError> {
    let ordinal = match raw.len() {
        4 => i64::from(i32::from_be_bytes(raw.try_into().unwrap())),
        8 => i64::from_be_bytes(raw.try_into().unwrap()),
        actual => {
            return Err(wrong_length(
                column,
                "index ordinal",
                column.width.num_bytes(),
                actual,
            ))
        }
    };

    let label = usize::try_from(ordinal)
        .ok()
        .and_then(|i| labels.get(i))
        .ok_or_else(|| DecodeError::CorruptIndexValue {
            alias: column.alias.clone(),
            ordinal,
            len: labels.len(),
        })?;
    Ok(Value::String(label.clone()))
}

// ---------------------------------------------------------------------------
// Key codec
// ---------------------------------------------------------------------------

/// Flip the sign bit of the leading byte. Two's complement sorts negative
/// values after positive ones lexicographically; flipping the sign bit
/// before storage restores the natural order.
fn flip_sign_bit(bytes: &mut [u8]) {
    if let Some(first) = bytes.first_mut() {
        *first ^= 0x80;
    }
}

/// Encode a typed key value into its stored byte form
pub fn encode_key(value: &Value, key_type: KeyType) -> Result<Bytes, DecodeError> {
    let mut encoded: Vec<u8> = match (key_type, value) {
        (KeyType::String, Value::String(s)) => s.as_bytes().to_vec(),
        (KeyType::Binary, Value::Binary(b)) => b.to_vec(),
        (KeyType::Integer | KeyType::UnsignedInteger, Value::Integer(i)) => {
            let narrowed =
                i32::try_from(*i).map_err(|_| DecodeError::BadConstant {
                    literal: i.to_string(),
                    kind: "integer key",
                    reason: "out of 32-bit range".to_string(),
                })?;
            narrowed.to_be_bytes().to_vec()
        }
        (KeyType::Long | KeyType::UnsignedLong, Value::Integer(i)) => i.to_be_bytes().to_vec(),
        (KeyType::Date | KeyType::UnsignedDate, Value::Date(d)) => {
            d.timestamp_millis().to_be_bytes().to_vec()
        }
        (_, actual) => {
            return Err(DecodeError::BadConstant {
                literal: format!("{actual:?}"),
                kind: "key",
                reason: format!("value does not match key type {key_type}"),
            })
        }
    };

    if key_type.is_signed() {
        flip_sign_bit(&mut encoded);
    }
    Ok(Bytes::from(encoded))
}

/// Decode raw key bytes into a typed value
pub fn decode_key(raw: &[u8], key_type: KeyType, key_name: &str) -> Result<Value, DecodeError> {
    let bad_key = |reason: String| DecodeError::BadKey {
        key_name: key_name.to_string(),
        reason,
    };

    let mut buf = raw.to_vec();
    if key_type.is_signed() {
        flip_sign_bit(&mut buf);
    }

    match key_type {
        KeyType::String => std::str::from_utf8(raw)
            .map(|s| Value::String(s.to_string()))
            .map_err(|_| bad_key("key bytes are not valid UTF-8".to_string())),
        KeyType::Binary => Ok(Value::Binary(Bytes::copy_from_slice(raw))),
        KeyType::Integer | KeyType::UnsignedInteger => {
            let arr: [u8; 4] = buf
                .as_slice()
                .try_into()
                .map_err(|_| bad_key(format!("expected 4 key bytes, got {}", raw.len())))?;
            Ok(Value::Integer(i64::from(i32::from_be_bytes(arr))))
        }
        KeyType::Long | KeyType::UnsignedLong => {
            let arr: [u8; 8] = buf
                .as_slice()
                .try_into()
                .map_err(|_| bad_key(format!("expected 8 key bytes, got {}", raw.len())))?;
            Ok(Value::Integer(i64::from_be_bytes(arr)))
        }
        KeyType::Date | KeyType::UnsignedDate => {
            let arr: [u8; 8] = buf
                .as_slice()
                .try_into()
                .map_err(|_| bad_key(format!("expected 8 key bytes, got {}", raw.len())))?;
            millis_to_date(i64::from_be_bytes(arr))
                .map(Value::Date)
                .map_err(|e| bad_key(e.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// Literal parsing
// ---------------------------------------------------------------------------

/// Parse an integer literal, tolerating grouping separators and a decimal
/// tail (which truncates)
pub fn parse_integer_literal(literal: &str, _mask: Option<&str>) -> Result<i64, DecodeError> {
    let cleaned: String = literal
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != ' ')
        .collect();
    if let Ok(i) = cleaned.parse::<i64>() {
        return Ok(i);
    }
    cleaned
        .parse::<f64>()
        .map(|f| f as i64)
        .map_err(|e| DecodeError::BadConstant {
            literal: literal.to_string(),
            kind: "integer",
            reason: e.to_string(),
        })
}

/// Parse a floating-point literal, tolerating grouping separators
pub fn parse_number_literal(literal: &str, _mask: Option<&str>) -> Result<f64, DecodeError> {
    let cleaned: String = literal
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != ' ')
        .collect();
    cleaned.parse::<f64>().map_err(|e| DecodeError::BadConstant {
        literal: literal.to_string(),
        kind: "number",
        reason: e.to_string(),
    })
}

/// Parse a date literal. With a mask, the mask is a chrono format string
/// tried as a datetime then a bare date; without one, common forms are
/// tried in order.
pub fn parse_date_literal(
    literal: &str,
    mask: Option<&str>,
) -> Result<DateTime<Utc>, DecodeError> {
    let literal = literal.trim();
    let bad = |reason: String| DecodeError::BadConstant {
        literal: literal.to_string(),
        kind: "date",
        reason,
    };

    if let Some(mask) = mask {
        if let Ok(dt) = NaiveDateTime::parse_from_str(literal, mask) {
            return Ok(dt.and_utc());
        }
        return NaiveDate::parse_from_str(literal, mask)
            .map(|d| d.and_hms_opt(0, 0, 0).expect("midnight is valid").and_utc())
            .map_err(|e| bad(e.to_string()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(literal) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(literal, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc());
    }
    NaiveDate::parse_from_str(literal, "%Y-%m-%d")
        .map(|d| d.and_hms_opt(0, 0, 0).expect("midnight is valid").and_utc())
        .map_err(|e| bad(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qualifier::Qualifier;
    use proptest::prelude::*;

    fn column(declared_type: &str) -> ColumnDescriptor {
        ColumnDescriptor::new("cf", Qualifier::Text("q".into()), "col", declared_type).unwrap()
    }

    #[test]
    fn null_bytes_decode_to_null_for_every_type() {
        for declared in ["String", "Integer", "Long", "Float", "Double", "Date", "Boolean", "Binary"] {
            assert_eq!(decode(None, &column(declared)).unwrap(), Value::Null);
        }
        let indexed = column("Integer").with_index_values(vec!["A".into()]);
        assert_eq!(decode(None, &indexed).unwrap(), Value::Null);
    }

    #[test]
    fn string_round_trip() {
        let encoded = encode(&Value::String("Ann".into()), SemanticType::String).unwrap();
        assert_eq!(encoded.as_ref(), b"Ann");
        assert_eq!(
            decode(Some(&encoded), &column("String")).unwrap(),
            Value::String("Ann".into())
        );
    }

    #[test]
    fn integer_widths_decode_by_declared_width() {
        let narrow = 42i32.to_be_bytes();
        assert_eq!(
            decode(Some(&narrow), &column("Integer")).unwrap(),
            Value::Integer(42)
        );

        let wide = (-7i64).to_be_bytes();
        assert_eq!(
            decode(Some(&wide), &column("Long")).unwrap(),
            Value::Integer(-7)
        );

        let err = decode(Some(&narrow), &column("Long")).unwrap_err();
        assert!(matches!(err, DecodeError::WrongByteLength { expected: 8, actual: 4, .. }));
    }

    #[test]
    fn number_encode_always_narrows_to_f32() {
        let v = Value::Number(1.5);
        let encoded = encode(&v, SemanticType::Number).unwrap();
        assert_eq!(encoded.len(), 4);
        // decoding back through a Float column recovers the value within
        // 32-bit precision
        assert_eq!(decode(Some(&encoded), &column("Float")).unwrap(), Value::Number(1.5));
    }

    #[test]
    fn date_round_trip() {
        let d = Utc.timestamp_millis_opt(1_234_567_890_123).unwrap();
        let encoded = encode(&Value::Date(d), SemanticType::Date).unwrap();
        assert_eq!(encoded.len(), 8);
        assert_eq!(decode(Some(&encoded), &column("Date")).unwrap(), Value::Date(d));
    }

    #[test]
    fn boolean_string_forms_decode_before_numeric() {
        for (raw, expected) in [
            (&b"Y"[..], true),
            (b"n", false),
            (b"TRUE", true),
            (b"false", false),
            (b"YES", true),
            (b"0", false),
        ] {
            assert_eq!(
                decode(Some(raw), &column("Boolean")).unwrap(),
                Value::Boolean(expected),
                "raw {raw:?}"
            );
        }
        // single-byte numeric fallback
        assert_eq!(decode(Some(&[1]), &column("Boolean")).unwrap(), Value::Boolean(true));
        assert_eq!(decode(Some(&[0]), &column("Boolean")).unwrap(), Value::Boolean(false));

        let err = decode(Some(&[9, 9]), &column("Boolean")).unwrap_err();
        assert!(matches!(err, DecodeError::BadBoolean { len: 2, .. }));
    }

    #[test]
    fn boolean_round_trip() {
        let encoded = encode(&Value::Boolean(true), SemanticType::Boolean).unwrap();
        assert_eq!(decode(Some(&encoded), &column("Boolean")).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn indexed_ordinal_resolves_to_label() {
        let col = column("Integer").with_index_values(vec!["RED".into(), "GREEN".into(), "BLUE".into()]);
        let stored = 1i32.to_be_bytes();
        assert_eq!(decode(Some(&stored), &col).unwrap(), Value::String("GREEN".into()));
    }

    #[test]
    fn out_of_range_ordinal_is_corrupt() {
        let col = column("Integer").with_index_values(vec!["RED".into(), "GREEN".into(), "BLUE".into()]);
        let stored = 5i32.to_be_bytes();
        let err = decode(Some(&stored), &col).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::CorruptIndexValue { ordinal: 5, len: 3, .. }
        ));

        let negative = (-1i32).to_be_bytes();
        assert!(matches!(
            decode(Some(&negative), &col).unwrap_err(),
            DecodeError::CorruptIndexValue { .. }
        ));
    }

    #[test]
    fn signed_keys_flip_the_sign_bit() {
        let neg = encode_key(&Value::Integer(-5), KeyType::Integer).unwrap();
        let pos = encode_key(&Value::Integer(5), KeyType::Integer).unwrap();
        // negative sorts before positive in the flipped encoding
        assert!(neg < pos);
        assert_eq!(
            decode_key(&neg, KeyType::Integer, "id").unwrap(),
            Value::Integer(-5)
        );

        // the unsigned variant stores raw two's complement
        let raw = encode_key(&Value::Integer(5), KeyType::UnsignedInteger).unwrap();
        assert_eq!(raw.as_ref(), &5i32.to_be_bytes());
    }

    #[test]
    fn long_key_round_trip() {
        for v in [i64::MIN, -1, 0, 1, i64::MAX] {
            let encoded = encode_key(&Value::Integer(v), KeyType::Long).unwrap();
            assert_eq!(decode_key(&encoded, KeyType::Long, "id").unwrap(), Value::Integer(v));
        }
    }

    #[test]
    fn date_key_round_trip() {
        let d = Utc.timestamp_millis_opt(-86_400_000).unwrap(); // one day before the epoch
        let encoded = encode_key(&Value::Date(d), KeyType::Date).unwrap();
        assert_eq!(decode_key(&encoded, KeyType::Date, "ts").unwrap(), Value::Date(d));

        let epoch = encode_key(&Value::Date(Utc.timestamp_millis_opt(0).unwrap()), KeyType::Date)
            .unwrap();
        assert!(encoded < epoch);
    }

    #[test]
    fn string_key_decodes_utf8() {
        assert_eq!(
            decode_key(b"row-1", KeyType::String, "k").unwrap(),
            Value::String("row-1".into())
        );
        assert!(matches!(
            decode_key(&[0xff, 0xfe], KeyType::String, "k").unwrap_err(),
            DecodeError::BadKey { .. }
        ));
    }

    #[test]
    fn integer_literals_tolerate_grouping() {
        assert_eq!(parse_integer_literal("1,234", None).unwrap(), 1234);
        assert_eq!(parse_integer_literal(" 42 ", None).unwrap(), 42);
        assert_eq!(parse_integer_literal("12.9", None).unwrap(), 12);
        assert!(parse_integer_literal("x", None).is_err());
    }

    #[test]
    fn date_literals_parse_with_and_without_mask() {
        let d = parse_date_literal("2011-07-04", None).unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2011, 7, 4, 0, 0, 0).unwrap());

        let masked = parse_date_literal("04/07/2011", Some("%d/%m/%Y")).unwrap();
        assert_eq!(masked, d);

        assert!(parse_date_literal("not-a-date", None).is_err());
    }

    proptest! {
        #[test]
        fn prop_long_round_trip(v in any::<i64>()) {
            let encoded = encode(&Value::Integer(v), SemanticType::Integer).unwrap();
            prop_assert_eq!(decode(Some(&encoded), &column("Long")).unwrap(), Value::Integer(v));
        }

        #[test]
        fn prop_number_round_trip_within_f32_precision(v in any::<f32>()) {
            prop_assume!(v.is_finite());
            let encoded = encode(&Value::Number(f64::from(v)), SemanticType::Number).unwrap();
            let decoded = decode(Some(&encoded), &column("Float")).unwrap();
            prop_assert_eq!(decoded, Value::Number(f64::from(v)));
        }

        #[test]
        fn prop_signed_long_keys_preserve_order(a in any::<i64>(), b in any::<i64>()) {
            let ka = encode_key(&Value::Integer(a), KeyType::Long).unwrap();
            let kb = encode_key(&Value::Integer(b), KeyType::Long).unwrap();
            prop_assert_eq!(a.cmp(&b), ka.cmp(&kb));
        }
    }
}
