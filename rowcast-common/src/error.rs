//! Error types for Rowcast
//!
//! Provides a unified error type hierarchy for the entire system. Every
//! variant carries enough context (alias, family/qualifier, byte lengths) to
//! diagnose a failure without re-reading the mapping it came from. None of
//! these errors are retryable at this layer; the core always propagates
//! rather than substituting defaults.

use thiserror::Error;

/// Result type alias using Rowcast's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Rowcast
#[derive(Error, Debug)]
pub enum Error {
    // Schema/Mapping assembly errors
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    // Cell/key decode errors
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    // Filter compilation errors
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    // Scan column restriction errors
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    // Projection/output-schema errors
    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    // Configuration Errors
    #[error("Configuration error: {0}")]
    Config(String),

    // IO Errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Mapping assembly and validation errors. Fatal to scan setup.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Key column \"{existing}\" already registered, cannot add key column \"{alias}\"")]
    DuplicateKeyColumn { existing: String, alias: String },

    #[error("Alias \"{0}\" already exists in the mapping")]
    DuplicateAlias(String),

    #[error("Column \"{family},{qualifier}\" is already mapped in mapping \"{mapping}\"")]
    DuplicateColumn {
        family: String,
        qualifier: String,
        mapping: String,
    },

    #[error("Mapping \"{0}\" has no key column registered")]
    MappingIncomplete(String),

    #[error("Indexed column \"{0}\" declares enumerated storage but has no labels")]
    MissingIndexLabels(String),

    #[error("Binary qualifier \"{qualifier}\" is not valid hex: {reason}")]
    BadBinaryQualifier { qualifier: String, reason: String },

    #[error("Key column \"{0}\" must be registered with a key type")]
    KeyColumnMissingType(String),
}

/// Byte-level decode/encode errors. Surfaced per row, never defaulted.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Stored ordinal {ordinal} for column \"{alias}\" has no label (table has {len} entries)")]
    CorruptIndexValue {
        alias: String,
        ordinal: i64,
        len: usize,
    },

    #[error("Column \"{alias}\" ({family},{qualifier}): expected {expected} bytes for {kind}, got {actual}")]
    WrongByteLength {
        alias: String,
        family: String,
        qualifier: String,
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Column \"{alias}\": stored bytes are not valid UTF-8")]
    BadUtf8 { alias: String },

    #[error("Column \"{alias}\": cannot interpret {len} byte(s) as a boolean")]
    BadBoolean { alias: String, len: usize },

    #[error("Key \"{key_name}\": {reason}")]
    BadKey { key_name: String, reason: String },

    #[error("Cannot parse \"{literal}\" as {kind}: {reason}")]
    BadConstant {
        literal: String,
        kind: &'static str,
        reason: String,
    },
}

/// Filter compilation errors. Fatal to scan setup.
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Column filter alias \"{0}\" is not in the mapping")]
    ColumnFilterNotInMapping(String),

    #[error("Filter on \"{alias}\" declares type {declared} but the mapping resolves it to {resolved}")]
    FieldTypeMismatch {
        alias: String,
        declared: String,
        resolved: String,
    },

    #[error("Operator {operator} is not supported for {type_name} column \"{alias}\"")]
    OperatorNotSupportedForType {
        alias: String,
        operator: String,
        type_name: String,
    },
}

/// Scan column restriction errors. Fatal to scan setup.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Selected column \"{0}\" is not in the mapping")]
    ColumnNotInMapping(String),
}

/// Projection errors. Indicate a mapping and an output schema drifting apart.
#[derive(Error, Debug)]
pub enum ProjectionError {
    #[error("Column \"{0}\" is not defined in the output schema")]
    ColumnNotDefinedInOutput(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
