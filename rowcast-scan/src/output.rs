//! Output schema handling
//!
//! The output schema designates the position of each aliased column in the
//! produced row. Projection places values purely by alias lookup, which is
//! what makes the projectors order-independent.

use std::collections::HashMap;

use rowcast_common::error::ProjectionError;
use rowcast_schema::{ColumnDescriptor, Mapping};

/// Name of the family column in tuple-mode output
pub const TUPLE_FAMILY: &str = "Family";
/// Name of the qualifier column in tuple-mode output
pub const TUPLE_COLUMN: &str = "Column";
/// Name of the value column in tuple-mode output
pub const TUPLE_VALUE: &str = "Value";
/// Name of the timestamp column in tuple-mode output
pub const TUPLE_TIMESTAMP: &str = "Timestamp";

/// Ordered alias-to-position table for produced rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSchema {
    fields: Vec<String>,
    positions: HashMap<String, usize>,
}

impl OutputSchema {
    /// Build a schema from explicit field names, in output order
    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        let positions = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.clone(), i))
            .collect();
        Self { fields, positions }
    }

    /// Build the full-width schema for a mapping: the key first, then the
    /// remaining aliases in sorted order for determinism
    pub fn from_mapping(mapping: &Mapping) -> Self {
        let mut aliases: Vec<&str> = mapping
            .columns()
            .filter(|c| !c.is_key)
            .map(|c| c.alias.as_str())
            .collect();
        aliases.sort_unstable();

        let mut fields = Vec::with_capacity(aliases.len() + 1);
        fields.push(mapping.key_name().to_string());
        fields.extend(aliases.iter().map(|a| (*a).to_string()));
        Self::from_fields(fields)
    }

    /// Build a schema covering exactly the selected columns, in selection
    /// order
    pub fn from_selection(columns: &[ColumnDescriptor]) -> Self {
        Self::from_fields(columns.iter().map(|c| c.alias.clone()))
    }

    /// Build the fixed five-column tuple-mode schema
    pub fn tuple(mapping: &Mapping) -> Self {
        Self::from_fields([
            mapping.key_name(),
            TUPLE_FAMILY,
            TUPLE_COLUMN,
            TUPLE_VALUE,
            TUPLE_TIMESTAMP,
        ])
    }

    /// Position of an alias, if the schema defines it
    pub fn index_of(&self, alias: &str) -> Option<usize> {
        self.positions.get(alias).copied()
    }

    /// Position of an alias, failing when the schema and the mapping have
    /// drifted apart
    pub fn require(&self, alias: &str) -> Result<usize, ProjectionError> {
        self.index_of(alias)
            .ok_or_else(|| ProjectionError::ColumnNotDefinedInOutput(alias.to_string()))
    }

    /// Field names in output order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowcast_schema::{KeyType, MappingBuilder, Qualifier};

    fn mapping() -> Mapping {
        MappingBuilder::new("t", "m")
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
            .build()
            .unwrap()
    }

    #[test]
    fn mapping_schema_puts_key_first() {
        let schema = OutputSchema::from_mapping(&mapping());
        assert_eq!(schema.fields(), ["id", "age", "name"]);
        assert_eq!(schema.index_of("id"), Some(0));
        assert_eq!(schema.len(), 3);
    }

    #[test]
    fn missing_alias_is_a_hard_error() {
        let schema = OutputSchema::from_fields(["id"]);
        assert!(schema.index_of("name").is_none());
        assert!(matches!(
            schema.require("name"),
            Err(ProjectionError::ColumnNotDefinedInOutput(_))
        ));
    }

    #[test]
    fn tuple_schema_has_the_fixed_shape() {
        let schema = OutputSchema::tuple(&mapping());
        assert_eq!(schema.fields(), ["id", "Family", "Column", "Value", "Timestamp"]);
    }
}
