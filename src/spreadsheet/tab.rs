use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellValue;
use std::collections::HashMap;

static EMPTY: CellValue = CellValue::Empty;

/// One worksheet materialized as a sparse grid.
///
/// Rows and columns are zero-based for every format. `row_count` is one past the last
/// populated row, so the last data row of a non-empty tab is `row_count() - 1`.
#[derive(Debug, Default)]
pub struct Tab {
    name: String,
    cells: Vec<Cell>,
    /// Index mapping from (row, column) to cell vector position
    indexes: HashMap<(usize, usize), usize>,
    row_count: usize,
    column_count: usize,
}

impl Tab {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }

    /// Builds a tab from rows of values, starting at A1. Blank values are not stored.
    pub fn from_rows<I, R>(name: &str, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = CellValue>,
    {
        let mut tab = Self::new(name);
        for (row, values) in rows.into_iter().enumerate() {
            for (col, value) in values.into_iter().enumerate() {
                tab.insert(row, col, value);
            }
        }
        tab
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stores a value; empty values are ignored so they never extend the populated area.
    pub fn insert(&mut self, row: usize, col: usize, value: CellValue) {
        if value == CellValue::Empty {
            return;
        }
        self.row_count = self.row_count.max(row + 1);
        self.column_count = self.column_count.max(col + 1);
        match self.indexes.get(&(row, col)) {
            Some(index) => self.cells[*index].value = value,
            None => {
                self.indexes.insert((row, col), self.cells.len());
                self.cells.push(Cell { row, col, value });
            }
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.indexes
            .get(&(row, col))
            .and_then(|index| self.cells.get(*index))
    }

    /// Value at a position; absent cells read as [`CellValue::Empty`].
    pub fn cell_value(&self, row: usize, col: usize) -> &CellValue {
        self.cell(row, col).map(|cell| &cell.value).unwrap_or(&EMPTY)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
