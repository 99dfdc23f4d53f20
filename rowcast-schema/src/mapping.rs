//! Mapping assembly and validation
//!
//! A mapping is the logical schema for one physical table: a named, typed
//! key plus a set of aliased column bindings. Mappings are built through
//! [`MappingBuilder`], which enforces the assembly invariants, and sealed
//! into an immutable [`Mapping`] that is shared read-only for the lifetime
//! of a scan.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use rowcast_common::error::SchemaError;
use rowcast_common::types::FIELD_SEPARATOR;

use crate::qualifier::Qualifier;
use crate::types::{self, KeyType, SemanticType, Width};

/// One physical cell binding in a mapping
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "ColumnDescriptorRepr", into = "ColumnDescriptorRepr")]
pub struct ColumnDescriptor {
    /// Column family holding the cell
    pub family: String,
    /// Qualifier within the family
    pub qualifier: Qualifier,
    /// Output name; unique within a mapping
    pub alias: String,
    /// True for the synthetic key column
    pub is_key: bool,
    /// Semantic value type
    pub semantic_type: SemanticType,
    /// Storage width for numeric types
    pub width: Width,
    /// Label table for enumerated columns; the stored bytes are an ordinal
    /// into this table
    pub index_values: Option<Vec<String>>,
    /// Display/parse format hint, opaque to the codec
    pub conversion_mask: Option<String>,
}

impl ColumnDescriptor {
    /// Create a column binding from a declared external type name
    pub fn new(
        family: impl Into<String>,
        qualifier: Qualifier,
        alias: impl Into<String>,
        declared_type: &str,
    ) -> Result<Self, SchemaError> {
        let (semantic_type, width) = types::resolve(declared_type)?;
        Ok(Self {
            family: family.into(),
            qualifier,
            alias: alias.into(),
            is_key: false,
            semantic_type,
            width,
            index_values: None,
            conversion_mask: None,
        })
    }

    /// Create the synthetic descriptor for the table key. The key has no
    /// physical family/qualifier; its bytes come from the row key.
    pub fn key(alias: impl Into<String>, key_type: KeyType) -> Self {
        let (semantic_type, width) = key_type.semantic();
        Self {
            family: String::new(),
            qualifier: Qualifier::Text(String::new()),
            alias: alias.into(),
            is_key: true,
            semantic_type,
            width,
            index_values: None,
            conversion_mask: None,
        }
    }

    /// Attach an enumeration label table; labels are trimmed
    pub fn with_index_values(mut self, labels: Vec<String>) -> Self {
        self.index_values = Some(labels.into_iter().map(|l| l.trim().to_string()).collect());
        self
    }

    /// Attach a display/parse format hint
    pub fn with_conversion_mask(mut self, mask: impl Into<String>) -> Self {
        self.conversion_mask = Some(mask.into());
        self
    }

    /// The external type name this descriptor resolves back to
    pub fn external_type_name(&self) -> &'static str {
        types::describe(self.semantic_type, self.width)
    }
}

/// Persistence shape for a column, preserving the external tag names
#[derive(Serialize, Deserialize)]
struct ColumnDescriptorRepr {
    alias: String,
    #[serde(default)]
    family: String,
    #[serde(default)]
    column: String,
    #[serde(default)]
    key: bool,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    indexed_vals: Option<String>,
}

impl TryFrom<ColumnDescriptorRepr> for ColumnDescriptor {
    type Error = SchemaError;

    fn try_from(repr: ColumnDescriptorRepr) -> Result<Self, Self::Error> {
        let (semantic_type, width) = types::resolve(&repr.type_name)?;
        let index_values = repr.indexed_vals.map(|joined| {
            joined
                .split(FIELD_SEPARATOR)
                .map(|l| l.trim().to_string())
                .collect()
        });
        Ok(Self {
            family: repr.family,
            qualifier: Qualifier::parse(&repr.column)?,
            alias: repr.alias,
            is_key: repr.key,
            semantic_type,
            width,
            index_values,
            conversion_mask: repr.format,
        })
    }
}

impl From<ColumnDescriptor> for ColumnDescriptorRepr {
    fn from(col: ColumnDescriptor) -> Self {
        Self {
            alias: col.alias,
            family: col.family,
            column: col.qualifier.to_string(),
            key: col.is_key,
            type_name: types::describe(col.semantic_type, col.width).to_string(),
            format: col.conversion_mask,
            indexed_vals: col.index_values.map(|labels| labels.join(",")),
        }
    }
}

/// Builder for [`Mapping`]; enforces the assembly invariants
#[derive(Debug, Clone, Default)]
pub struct MappingBuilder {
    table_name: String,
    mapping_name: String,
    key_type: Option<KeyType>,
    tuple_mapping: bool,
    tuple_families: Vec<String>,
    columns: Vec<ColumnDescriptor>,
}

impl MappingBuilder {
    pub fn new(table_name: impl Into<String>, mapping_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            mapping_name: mapping_name.into(),
            ..Self::default()
        }
    }

    /// Register the key column. Shorthand for adding the synthetic key
    /// descriptor through [`Self::add_column`].
    pub fn key(self, alias: impl Into<String>, key_type: KeyType) -> Result<Self, SchemaError> {
        let descriptor = ColumnDescriptor::key(alias, key_type);
        self.add_column_with_key_type(descriptor, Some(key_type))
    }

    /// Mark this mapping as a tuple mapping (one output row per cell)
    pub fn tuple_mapping(mut self, tuple: bool) -> Self {
        self.tuple_mapping = tuple;
        self
    }

    /// Restrict tuple-mode output to the given column families
    pub fn tuple_families(mut self, families: Vec<String>) -> Self {
        self.tuple_families = families;
        self
    }

    /// Add a column binding, rejecting duplicate keys, duplicate aliases,
    /// duplicate physical cells and empty enumeration tables
    pub fn add_column(self, descriptor: ColumnDescriptor) -> Result<Self, SchemaError> {
        if descriptor.is_key {
            // the signed/unsigned distinction lives on the key type, which a
            // bare descriptor cannot carry
            return Err(SchemaError::KeyColumnMissingType(descriptor.alias));
        }
        self.add_column_with_key_type(descriptor, None)
    }

    fn add_column_with_key_type(
        mut self,
        descriptor: ColumnDescriptor,
        key_type: Option<KeyType>,
    ) -> Result<Self, SchemaError> {
        if descriptor.is_key {
            if let Some(existing) = self.columns.iter().find(|c| c.is_key) {
                return Err(SchemaError::DuplicateKeyColumn {
                    existing: existing.alias.clone(),
                    alias: descriptor.alias,
                });
            }
        }

        if self.columns.iter().any(|c| c.alias == descriptor.alias) {
            return Err(SchemaError::DuplicateAlias(descriptor.alias));
        }

        // Each (family, qualifier) pair identifies a physical cell and can
        // be mapped once. Tuple-mode columns are logical, not physical, and
        // are exempt; so is the key, whose bytes come from the row key.
        if !descriptor.is_key && !self.tuple_mapping {
            let clash = self.columns.iter().any(|c| {
                !c.is_key
                    && c.family == descriptor.family
                    && c.qualifier.as_bytes() == descriptor.qualifier.as_bytes()
            });
            if clash {
                return Err(SchemaError::DuplicateColumn {
                    family: descriptor.family,
                    qualifier: descriptor.qualifier.to_string(),
                    mapping: self.mapping_name,
                });
            }
        }

        if let Some(labels) = &descriptor.index_values {
            if labels.is_empty() {
                return Err(SchemaError::MissingIndexLabels(descriptor.alias));
            }
        }

        if let Some(key_type) = key_type {
            self.key_type = Some(key_type);
        }
        self.columns.push(descriptor);
        Ok(self)
    }

    /// Seal the builder into an immutable mapping. Fails if no key column
    /// has been registered.
    pub fn build(self) -> Result<Mapping, SchemaError> {
        let key = self
            .columns
            .iter()
            .find(|c| c.is_key)
            .ok_or_else(|| SchemaError::MappingIncomplete(self.mapping_name.clone()))?;
        let key_name = key.alias.clone();
        let key_type = self
            .key_type
            .ok_or_else(|| SchemaError::MappingIncomplete(self.mapping_name.clone()))?;

        let columns: HashMap<String, ColumnDescriptor> = self
            .columns
            .into_iter()
            .map(|c| (c.alias.clone(), c))
            .collect();

        info!(
            mapping = %self.mapping_name,
            table = %self.table_name,
            columns = columns.len(),
            "mapping sealed"
        );

        Ok(Mapping {
            table_name: self.table_name,
            mapping_name: self.mapping_name,
            key_name,
            key_type,
            tuple_mapping: self.tuple_mapping,
            tuple_families: self.tuple_families,
            columns,
        })
    }
}

/// The logical schema for one physical table, immutable once built
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "MappingRepr", into = "MappingRepr")]
pub struct Mapping {
    table_name: String,
    mapping_name: String,
    key_name: String,
    key_type: KeyType,
    tuple_mapping: bool,
    tuple_families: Vec<String>,
    columns: HashMap<String, ColumnDescriptor>,
}

impl Mapping {
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn mapping_name(&self) -> &str {
        &self.mapping_name
    }

    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// True if every cell becomes its own output row instead of one row per
    /// key
    pub fn is_tuple_mapping(&self) -> bool {
        self.tuple_mapping
    }

    /// Family restriction for tuple mode; empty means all families
    pub fn tuple_families(&self) -> &[String] {
        &self.tuple_families
    }

    /// Look up a column by alias. The key participates under its alias.
    pub fn column(&self, alias: &str) -> Option<&ColumnDescriptor> {
        self.columns.get(alias)
    }

    /// The synthetic key descriptor
    pub fn key_descriptor(&self) -> &ColumnDescriptor {
        &self.columns[&self.key_name]
    }

    /// All mapped columns, key included. Iteration order is unspecified;
    /// projection places values by alias, never by position.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.values()
    }

    /// Number of mapped columns, key included
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Split the composite external key field. A tuple mapping persists its
    /// key as `"keyName,fam1,fam2"`; a plain mapping as `"keyName"`.
    pub fn parse_key_field(raw: &str) -> (String, Vec<String>, bool) {
        match raw.split_once(FIELD_SEPARATOR) {
            Some((name, families)) => {
                let families: Vec<String> = families
                    .split(FIELD_SEPARATOR)
                    .map(|f| f.trim().to_string())
                    .filter(|f| !f.is_empty())
                    .collect();
                (name.to_string(), families, true)
            }
            None => (raw.to_string(), Vec::new(), false),
        }
    }

    /// Re-join the composite key field for persistence
    pub fn key_field_for_persistence(&self) -> String {
        if self.tuple_mapping {
            let mut field = self.key_name.clone();
            field.push(FIELD_SEPARATOR);
            field.push_str(&self.tuple_families.join(","));
            field
        } else {
            self.key_name.clone()
        }
    }
}

/// Persistence shape for a mapping, preserving the external tag names
#[derive(Serialize, Deserialize)]
struct MappingRepr {
    mapping_name: String,
    table_name: String,
    key: String,
    key_type: String,
    #[serde(default)]
    mapped_columns: Vec<ColumnDescriptor>,
}

impl TryFrom<MappingRepr> for Mapping {
    type Error = SchemaError;

    fn try_from(repr: MappingRepr) -> Result<Self, Self::Error> {
        let (key_name, tuple_families, tuple_mapping) = Mapping::parse_key_field(&repr.key);
        let key_type: KeyType = repr.key_type.parse()?;

        let mut builder = MappingBuilder::new(repr.table_name, repr.mapping_name)
            .tuple_mapping(tuple_mapping)
            .tuple_families(tuple_families)
            .key(key_name, key_type)?;
        for column in repr.mapped_columns {
            if column.is_key {
                // the key is carried by the composite key field, not the
                // column list
                continue;
            }
            builder = builder.add_column(column)?;
        }
        builder.build()
    }
}

impl From<Mapping> for MappingRepr {
    fn from(mapping: Mapping) -> Self {
        let key = mapping.key_field_for_persistence();
        let mut mapped_columns: Vec<ColumnDescriptor> = mapping
            .columns
            .into_values()
            .filter(|c| !c.is_key)
            .collect();
        mapped_columns.sort_by(|a, b| a.alias.cmp(&b.alias));
        Self {
            mapping_name: mapping.mapping_name,
            table_name: mapping.table_name,
            key,
            key_type: mapping.key_type.to_string(),
            mapped_columns,
        }
    }
}
