//! Wide-mode row projection
//!
//! One fetched row in, one typed output row out. The key is decoded first;
//! every other column is resolved from the row by family and qualifier,
//! decoded independently, and placed by alias lookup into the output
//! schema. An absent cell decodes to null; a decode failure in one column
//! propagates without touching sibling slots.

use rowcast_common::error::{Error, Result};
use rowcast_schema::codec::{self, Value};
use rowcast_schema::{ColumnDescriptor, Mapping};

use crate::output::OutputSchema;
use crate::result::StoreResult;

/// Project one fetched row into a typed output row.
///
/// With `selected` columns the output covers exactly that subset; otherwise
/// it covers every mapped column, key included.
pub fn project_row<R: StoreResult>(
    result: &R,
    selected: Option<&[ColumnDescriptor]>,
    mapping: &Mapping,
    schema: &OutputSchema,
) -> Result<Vec<Value>> {
    let mut row = vec![Value::Null; schema.len()];

    match selected {
        Some(columns) => {
            for column in columns {
                place_column(result, column, mapping, schema, &mut row)?;
            }
        }
        None => {
            for column in mapping.columns() {
                place_column(result, column, mapping, schema, &mut row)?;
            }
        }
    }

    Ok(row)
}

fn place_column<R: StoreResult>(
    result: &R,
    column: &ColumnDescriptor,
    mapping: &Mapping,
    schema: &OutputSchema,
    row: &mut [Value],
) -> Result<()> {
    let index = schema.require(&column.alias).map_err(Error::Projection)?;

    if column.is_key {
        let decoded = codec::decode_key(result.key_bytes(), mapping.key_type(), &column.alias)
            .map_err(Error::Decode)?;
        row[index] = decoded;
    } else {
        let raw = result.cell_value(&column.family, &column.qualifier);
        row[index] = codec::decode(raw, column).map_err(Error::Decode)?;
    }
    Ok(())
}
