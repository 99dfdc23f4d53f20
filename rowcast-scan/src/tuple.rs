//! Exploded per-cell ("tuple") projection
//!
//! Some consumers need per-cell granularity rather than one flattened row
//! per key. Tuple mode emits one output row per cell present in the fetched
//! row, each carrying {key, family, column qualifier, decoded value,
//! cell timestamp}, with the key repeated on every row.

use rowcast_common::error::{Error, Result};
use rowcast_schema::codec::{self, Value};
use rowcast_schema::{ColumnDescriptor, Mapping};

use crate::output::{OutputSchema, TUPLE_COLUMN, TUPLE_FAMILY, TUPLE_TIMESTAMP, TUPLE_VALUE};
use crate::result::{Cell, StoreResult};

/// Project one fetched row into per-cell tuple rows.
///
/// With `selected` columns, only cells whose family and qualifier match a
/// selected column are emitted and each cell's value decodes with its
/// matching descriptor. Without a selection, a non-empty family restriction
/// on the mapping filters by family, and values decode with the mapping's
/// `Value` column descriptor when it declares one (UTF-8 text otherwise).
pub fn project_tuples<R: StoreResult>(
    result: &R,
    selected: Option<&[ColumnDescriptor]>,
    mapping: &Mapping,
    schema: &OutputSchema,
) -> Result<Vec<Vec<Value>>> {
    let key = codec::decode_key(result.key_bytes(), mapping.key_type(), mapping.key_name())
        .map_err(Error::Decode)?;

    let key_index = schema.index_of(mapping.key_name());
    let family_index = schema.index_of(TUPLE_FAMILY);
    let column_index = schema.index_of(TUPLE_COLUMN);
    let value_index = schema.index_of(TUPLE_VALUE);
    let timestamp_index = schema.index_of(TUPLE_TIMESTAMP);

    let value_descriptor = mapping.column(TUPLE_VALUE);

    let mut rows = Vec::new();
    for cell in result.cells() {
        let descriptor = match selected {
            Some(columns) => {
                let Some(matched) = columns.iter().find(|c| {
                    !c.is_key
                        && c.family == cell.family
                        && c.qualifier.as_bytes() == cell.qualifier.as_ref()
                }) else {
                    continue;
                };
                Some(matched)
            }
            None => {
                let families = mapping.tuple_families();
                if !families.is_empty() && !families.iter().any(|f| f == &cell.family) {
                    continue;
                }
                value_descriptor
            }
        };

        rows.push(tuple_row(
            cell,
            &key,
            descriptor,
            schema.len(),
            (key_index, family_index, column_index, value_index, timestamp_index),
        )?);
    }

    Ok(rows)
}

#[allow(clippy::type_complexity)]
fn tuple_row(
    cell: &Cell,
    key: &Value,
    value_descriptor: Option<&ColumnDescriptor>,
    width: usize,
    (key_index, family_index, column_index, value_index, timestamp_index): (
        Option<usize>,
        Option<usize>,
        Option<usize>,
        Option<usize>,
        Option<usize>,
    ),
) -> Result<Vec<Value>> {
    let mut row = vec![Value::Null; width];

    if let Some(i) = key_index {
        row[i] = key.clone();
    }
    if let Some(i) = family_index {
        row[i] = Value::String(cell.family.clone());
    }
    if let Some(i) = column_index {
        row[i] = Value::String(String::from_utf8_lossy(&cell.qualifier).into_owned());
    }
    if let Some(i) = value_index {
        row[i] = match value_descriptor {
            Some(descriptor) => {
                codec::decode(Some(&cell.value), descriptor).map_err(Error::Decode)?
            }
            None => Value::String(String::from_utf8_lossy(&cell.value).into_owned()),
        };
    }
    if let Some(i) = timestamp_index {
        row[i] = Value::Integer(cell.timestamp);
    }

    Ok(row)
}
