//! Store result abstraction
//!
//! A scan cursor yields one row's worth of fetched cells at a time. The
//! core only transforms already-fetched bytes; retrieval belongs to the
//! external store collaborator. [`StoreResult`] is the shape that
//! collaborator must provide, and [`FetchedRow`] is the in-memory reference
//! implementation used by tests and simple callers.

use bytes::Bytes;

use rowcast_common::error::Result;
use rowcast_common::types::Timestamp;
use rowcast_schema::Qualifier;

use crate::scan::ScanSpec;

/// One (family, qualifier, value, timestamp) unit within a fetched row
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub family: String,
    pub qualifier: Bytes,
    pub value: Bytes,
    pub timestamp: Timestamp,
}

/// One fetched row: key bytes plus a bag of cells
pub trait StoreResult {
    /// Raw bytes of the row key
    fn key_bytes(&self) -> &[u8];

    /// Value bytes of the cell at (family, qualifier), if present
    fn cell_value(&self, family: &str, qualifier: &Qualifier) -> Option<&[u8]>;

    /// Iterate over every cell present in the row
    fn cells(&self) -> Box<dyn Iterator<Item = &Cell> + '_>;
}

/// In-memory [`StoreResult`] implementation
#[derive(Debug, Clone, Default)]
pub struct FetchedRow {
    key: Bytes,
    cells: Vec<Cell>,
}

impl FetchedRow {
    pub fn new(key: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            cells: Vec::new(),
        }
    }

    /// Add a cell with an explicit timestamp
    pub fn with_cell(
        mut self,
        family: impl Into<String>,
        qualifier: impl Into<Bytes>,
        value: impl Into<Bytes>,
        timestamp: Timestamp,
    ) -> Self {
        self.cells.push(Cell {
            family: family.into(),
            qualifier: qualifier.into(),
            value: value.into(),
            timestamp,
        });
        self
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

/// Sequential cursor over fetched rows, as provided by the store. The scan
/// is a strictly sequential pull; the caller simply stops pulling when done.
pub trait ResultScanner {
    type Row: StoreResult;

    /// Pull the next fetched row, or `None` when the scan is exhausted
    fn next_row(&mut self) -> Result<Option<Self::Row>>;
}

/// In-memory scanner over pre-fetched rows, honoring a compiled scan spec's
/// key range and predicate the way a store would server-side
pub struct MemoryScanner {
    rows: std::vec::IntoIter<FetchedRow>,
    spec: ScanSpec,
}

impl MemoryScanner {
    pub fn new(rows: Vec<FetchedRow>, spec: ScanSpec) -> Self {
        Self {
            rows: rows.into_iter(),
            spec,
        }
    }

    fn in_range(spec: &ScanSpec, key: &[u8]) -> bool {
        if let Some(start) = &spec.key_range.start {
            if key < start.as_ref() {
                return false;
            }
        }
        if let Some(stop) = &spec.key_range.stop {
            if key >= stop.as_ref() {
                return false;
            }
        }
        true
    }
}

impl ResultScanner for MemoryScanner {
    type Row = FetchedRow;

    fn next_row(&mut self) -> Result<Option<FetchedRow>> {
        loop {
            let Some(row) = self.rows.next() else {
                return Ok(None);
            };
            if Self::in_range(&self.spec, row.key_bytes()) && self.spec.predicate.matches(&row) {
                return Ok(Some(row));
            }
        }
    }
}

impl StoreResult for FetchedRow {
    fn key_bytes(&self) -> &[u8] {
        &self.key
    }

    fn cell_value(&self, family: &str, qualifier: &Qualifier) -> Option<&[u8]> {
        self.cells
            .iter()
            .find(|c| c.family == family && c.qualifier.as_ref() == qualifier.as_bytes())
            .map(|c| c.value.as_ref())
    }

    fn cells(&self) -> Box<dyn Iterator<Item = &Cell> + '_> {
        Box::new(self.cells.iter())
    }
}
