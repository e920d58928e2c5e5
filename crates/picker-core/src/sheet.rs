//! Sheet store abstraction.
//!
//! The external spreadsheet is modeled as a row-addressable table with
//! named columns: whole-table reads plus single-cell writes. Row 1 is
//! always the header; data rows start at physical row 2. All coordinates
//! are 1-based.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Sheet store contract implemented by all backends.
///
/// Read failures surface as [`Error::DataSource`]; write failures as
/// [`Error::Update`]. A `write_cell` is atomic at the store layer: there
/// is no multi-cell transaction, so callers never observe partial state.
#[async_trait]
pub trait SheetStore: Send + Sync + 'static {
    /// Reads the ordered header row (physical row 1).
    async fn read_header(&self) -> Result<Vec<String>>;

    /// Reads all data rows, in sheet order, as column-name → value maps.
    async fn read_rows(&self) -> Result<Vec<HashMap<String, String>>>;

    /// Writes a single cell at 1-based `(row, col)`.
    ///
    /// Never retried by callers: a write either fully succeeds or fully
    /// fails.
    async fn write_cell(&self, row: u32, col: u32, value: &str) -> Result<()>;
}

/// In-memory sheet backend for tests and debug runs.
///
/// Thread-safe via `RwLock`. Not suitable for production. Supports fault
/// injection so callers can exercise store-failure paths.
#[derive(Debug, Default)]
pub struct MemorySheet {
    inner: RwLock<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    fail_reads: bool,
    fail_writes: bool,
    reads_until_fail: Option<u32>,
}

impl MemoryInner {
    fn read_allowed(&mut self) -> bool {
        if self.fail_reads {
            return false;
        }
        if let Some(remaining) = self.reads_until_fail.as_mut() {
            if *remaining == 0 {
                return false;
            }
            *remaining -= 1;
        }
        true
    }
}

impl MemorySheet {
    /// Creates a sheet with the given header and data rows.
    #[must_use]
    pub fn new(header: Vec<&str>, rows: Vec<Vec<&str>>) -> Self {
        Self {
            inner: RwLock::new(MemoryInner {
                header: header.into_iter().map(str::to_string).collect(),
                rows: rows
                    .into_iter()
                    .map(|row| row.into_iter().map(str::to_string).collect())
                    .collect(),
                fail_reads: false,
                fail_writes: false,
                reads_until_fail: None,
            }),
        }
    }

    /// Creates an empty sheet carrying only the required header columns.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(crate::card::REQUIRED_COLUMNS.to_vec(), Vec::new())
    }

    /// Makes every subsequent read fail with a data source error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.write_locked().fail_reads = fail;
    }

    /// Makes every subsequent write fail with an update error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.write_locked().fail_writes = fail;
    }

    /// Allows the next `reads` read calls, then fails every read after.
    ///
    /// Useful for exercising paths where an operation's own fetch must
    /// succeed but a later best-effort refresh must fail.
    pub fn set_fail_reads_after(&self, reads: u32) {
        self.write_locked().reads_until_fail = Some(reads);
    }

    /// Clears all injected faults.
    pub fn clear_faults(&self) {
        let mut inner = self.write_locked();
        inner.fail_reads = false;
        inner.fail_writes = false;
        inner.reads_until_fail = None;
    }

    /// Returns the cell at 1-based `(row, col)`, if present.
    ///
    /// Row 1 addresses the header.
    #[must_use]
    pub fn cell(&self, row: u32, col: u32) -> Option<String> {
        let inner = self.read_locked();
        let col = usize::try_from(col).ok()?.checked_sub(1)?;
        if row == 1 {
            return inner.header.get(col).cloned();
        }
        let row = usize::try_from(row).ok()?.checked_sub(2)?;
        inner.rows.get(row)?.get(col).cloned()
    }

    /// Overwrites a cell directly, bypassing the store contract.
    ///
    /// Simulates an external writer mutating the sheet behind the
    /// service's back.
    pub fn set_cell_direct(&self, row: u32, col: u32, value: &str) {
        let mut inner = self.write_locked();
        let Some(col) = usize::try_from(col).ok().and_then(|c| c.checked_sub(1)) else {
            return;
        };
        let Some(row) = usize::try_from(row).ok().and_then(|r| r.checked_sub(2)) else {
            return;
        };
        if let Some(cell) = inner.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value.to_string();
        }
    }

    /// Replaces the header row, simulating schema drift in the sheet.
    pub fn set_header(&self, header: Vec<&str>) {
        self.write_locked().header = header.into_iter().map(str::to_string).collect();
    }

    /// Appends a data row, padding or truncating to the header width.
    pub fn push_row(&self, row: Vec<&str>) {
        let mut inner = self.write_locked();
        let width = inner.header.len();
        let mut values: Vec<String> = row.into_iter().map(str::to_string).collect();
        values.resize(width, String::new());
        inner.rows.push(values);
    }

    fn read_locked(&self) -> std::sync::RwLockReadGuard<'_, MemoryInner> {
        self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_locked(&self) -> std::sync::RwLockWriteGuard<'_, MemoryInner> {
        self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl SheetStore for MemorySheet {
    async fn read_header(&self) -> Result<Vec<String>> {
        let mut inner = self.write_locked();
        if !inner.read_allowed() {
            return Err(Error::data_source("memory sheet: injected read failure"));
        }
        Ok(inner.header.clone())
    }

    async fn read_rows(&self) -> Result<Vec<HashMap<String, String>>> {
        let mut inner = self.write_locked();
        if !inner.read_allowed() {
            return Err(Error::data_source("memory sheet: injected read failure"));
        }
        Ok(inner
            .rows
            .iter()
            .map(|row| {
                inner
                    .header
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect())
    }

    async fn write_cell(&self, row: u32, col: u32, value: &str) -> Result<()> {
        let mut inner = self.write_locked();
        if inner.fail_writes {
            return Err(Error::update("memory sheet: injected write failure"));
        }
        let col_index = usize::try_from(col)
            .ok()
            .and_then(|c| c.checked_sub(1))
            .ok_or_else(|| Error::InvalidInput(format!("column index {col} out of range")))?;
        let row_index = usize::try_from(row)
            .ok()
            .and_then(|r| r.checked_sub(2))
            .ok_or_else(|| Error::InvalidInput(format!("row index {row} is not a data row")))?;
        let cell = inner
            .rows
            .get_mut(row_index)
            .and_then(|r| r.get_mut(col_index))
            .ok_or_else(|| Error::update(format!("cell R{row}C{col} does not exist")))?;
        *cell = value.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{COL_CARD_NAME, COL_COLOR, COL_RESERVED};

    fn sheet() -> MemorySheet {
        MemorySheet::new(
            vec![COL_CARD_NAME, COL_COLOR, COL_RESERVED],
            vec![
                vec!["Lightning Bolt", "Red", ""],
                vec!["Counterspell", "Blue", "alice"],
            ],
        )
    }

    #[tokio::test]
    async fn reads_header_and_rows() {
        let sheet = sheet();
        let header = sheet.read_header().await.unwrap();
        assert_eq!(header[0], COL_CARD_NAME);

        let rows = sheet.read_rows().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][COL_RESERVED], "alice");
    }

    #[tokio::test]
    async fn write_cell_targets_one_based_coordinates() {
        let sheet = sheet();
        // First data row lives at physical row 2; Reserved is column 3.
        sheet.write_cell(2, 3, "bob").await.unwrap();
        assert_eq!(sheet.cell(2, 3).as_deref(), Some("bob"));
        assert_eq!(sheet.cell(3, 3).as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn write_to_missing_cell_is_an_update_error() {
        let sheet = sheet();
        let err = sheet.write_cell(10, 3, "bob").await.unwrap_err();
        assert!(matches!(err, Error::Update { .. }));
    }

    #[tokio::test]
    async fn injected_faults_surface_as_store_errors() {
        let sheet = sheet();
        sheet.set_fail_reads(true);
        assert!(matches!(
            sheet.read_rows().await.unwrap_err(),
            Error::DataSource { .. }
        ));

        sheet.set_fail_reads(false);
        sheet.set_fail_writes(true);
        assert!(matches!(
            sheet.write_cell(2, 3, "bob").await.unwrap_err(),
            Error::Update { .. }
        ));
    }
}
