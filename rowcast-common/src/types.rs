//! Common type definitions for Rowcast

/// Timestamp in milliseconds since Unix epoch, as carried on store cells
pub type Timestamp = i64;

/// Reserved qualifier prefix marking a hex-encoded binary column name
pub const BINARY_QUALIFIER_MARKER: &str = "@@@binary@@@";

/// Separator used in composite persistence fields (`family,qualifier` and
/// `key_name,fam1,fam2` forms)
pub const FIELD_SEPARATOR: char = ',';
