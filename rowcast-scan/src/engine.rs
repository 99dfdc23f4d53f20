//! Per-scan projection engine
//!
//! [`ScanProjector`] binds a sealed mapping and an optional user column
//! selection for the lifetime of one scan: it validates the selection up
//! front, derives the output schema, compiles the scan spec, and projects
//! fetched rows one at a time. It holds no mutable state, so concurrent
//! scans may share a mapping freely.

use tracing::info;

use rowcast_common::config::ScanConfig;
use rowcast_common::error::{Result, ScanError};
use rowcast_schema::codec::Value;
use rowcast_schema::{ColumnDescriptor, Mapping};

use crate::filter::{self, ColumnFilter};
use crate::output::OutputSchema;
use crate::project;
use crate::result::StoreResult;
use crate::scan::{self, KeyRange, ScanSpec};
use crate::tuple;

/// The per-scan façade over projection and scan compilation
#[derive(Debug, Clone)]
pub struct ScanProjector<'a> {
    mapping: &'a Mapping,
    selected: Option<Vec<ColumnDescriptor>>,
    schema: OutputSchema,
    key_mask: Option<String>,
}

impl<'a> ScanProjector<'a> {
    /// Bind a mapping and an optional user-selected output column subset.
    ///
    /// Every selected non-key column must exist in the mapping. A selected
    /// key column contributes its conversion mask to key-range parsing.
    pub fn new(mapping: &'a Mapping, selected: Option<Vec<ColumnDescriptor>>) -> Result<Self> {
        let mut key_mask = None;

        if let Some(columns) = &selected {
            for column in columns {
                if column.is_key {
                    key_mask.clone_from(&column.conversion_mask);
                } else if mapping.column(&column.alias).is_none() {
                    return Err(ScanError::ColumnNotInMapping(column.alias.clone()).into());
                }
            }
        }

        let schema = if mapping.is_tuple_mapping() {
            OutputSchema::tuple(mapping)
        } else if let Some(columns) = &selected {
            OutputSchema::from_selection(columns)
        } else {
            OutputSchema::from_mapping(mapping)
        };

        info!(
            mapping = %mapping.mapping_name(),
            table = %mapping.table_name(),
            tuple = mapping.is_tuple_mapping(),
            output_width = schema.len(),
            "scan projector ready"
        );

        Ok(Self {
            mapping,
            selected,
            schema,
            key_mask,
        })
    }

    /// The derived output schema
    pub fn schema(&self) -> &OutputSchema {
        &self.schema
    }

    /// Project one fetched row, dispatching on the mapping's projection
    /// strategy: one row in wide mode, one row per cell in tuple mode.
    pub fn project<R: StoreResult>(&self, result: &R) -> Result<Vec<Vec<Value>>> {
        if self.mapping.is_tuple_mapping() {
            self.project_tuples(result)
        } else {
            Ok(vec![self.project_row(result)?])
        }
    }

    /// Wide-mode projection of one fetched row
    pub fn project_row<R: StoreResult>(&self, result: &R) -> Result<Vec<Value>> {
        project::project_row(result, self.selected.as_deref(), self.mapping, &self.schema)
    }

    /// Tuple-mode projection of one fetched row
    pub fn project_tuples<R: StoreResult>(&self, result: &R) -> Result<Vec<Vec<Value>>> {
        tuple::project_tuples(result, self.selected.as_deref(), self.mapping, &self.schema)
    }

    /// Compile the full scan spec for the external scan builder
    pub fn scan_spec(&self, filters: &[ColumnFilter], config: &ScanConfig) -> Result<ScanSpec> {
        // tuple mode scans whole rows; a physical restriction would drop
        // the very cells it explodes
        let columns = match (&self.selected, self.mapping.is_tuple_mapping()) {
            (Some(selected), false) => {
                let aliases: Vec<String> = selected
                    .iter()
                    .filter(|c| !c.is_key)
                    .map(|c| c.alias.clone())
                    .collect();
                scan::restrict_columns(self.mapping, Some(&aliases))?
            }
            _ => scan::restrict_columns(self.mapping, None)?,
        };

        let predicate = filter::compile_filters(filters, self.mapping, config.match_any)?;

        let default_mask = self
            .key_mask
            .as_deref()
            .or(self.mapping.key_descriptor().conversion_mask.as_deref());
        let key_range = KeyRange::parse(
            config.key_start.as_deref(),
            config.key_stop.as_deref(),
            self.mapping.key_type(),
            default_mask,
        )?;

        Ok(ScanSpec {
            columns,
            predicate,
            key_range,
            cache_size: config.cache_size,
        })
    }
}
