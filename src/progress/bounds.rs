//! Table discovery inside a trail tab.
//!
//! Tabs carry one loosely placed table: a header row holding "Trail Name" followed,
//! somewhere to its right, by a mileage column ("Total ...") and a remaining-mileage
//! column ("... To Do"). Nothing else about the layout is fixed between tabs or
//! editions, so every position is discovered by scanning cell text.

use crate::spreadsheet::Tab;
use std::fmt::Display;
use thiserror::Error;
use tracing::debug;

pub const NAME_HEADER: &str = "Trail Name";
pub const MILEAGE_HEADER: &str = "Total";
pub const TODO_HEADER: &str = "To Do";

/// Structural property a tab failed to satisfy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BoundsInvariant {
    NameColumn,
    MileageColumn,
    ToDoColumn,
    /// The table has no row after its header
    LastRow,
}

impl Display for BoundsInvariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NameColumn => write!(f, "could not find 'Trail Name' column"),
            Self::MileageColumn => write!(f, "could not find 'Mileage' column"),
            Self::ToDoColumn => write!(f, "could not find 'Miles To Do' column"),
            Self::LastRow => write!(f, "could not find last row of the table"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("'{tab}' tab, {invariant}")]
pub struct TableBoundsError {
    pub tab: String,
    pub invariant: BoundsInvariant,
}

/// Resolved position of the trail table. Every index is zero-based and the value only
/// exists once all structural checks have passed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TabBounds {
    pub header_row: usize,
    pub name_column: usize,
    pub mileage_column: usize,
    pub todo_column: usize,
    pub last_row: usize,
}

impl TabBounds {
    /// Locates the header row and the three significant columns of a tab.
    pub fn resolve(tab: &Tab) -> Result<TabBounds, TableBoundsError> {
        let fail = |invariant| TableBoundsError {
            tab: tab.name().to_owned(),
            invariant,
        };

        let (header_row, name_column) = find_name_header(tab).ok_or_else(|| fail(BoundsInvariant::NameColumn))?;
        let (mileage_column, todo_column) = find_mileage_headers(tab, header_row, name_column);
        let mileage_column = mileage_column.ok_or_else(|| fail(BoundsInvariant::MileageColumn))?;
        let todo_column = todo_column.ok_or_else(|| fail(BoundsInvariant::ToDoColumn))?;

        // The header itself is populated, so row_count() is at least header_row + 1.
        let last_row = tab.row_count() - 1;
        if last_row <= header_row {
            Err(fail(BoundsInvariant::LastRow))?
        }

        let bounds = TabBounds {
            header_row,
            name_column,
            mileage_column,
            todo_column,
            last_row,
        };
        debug!(tab = tab.name(), ?bounds, "resolved table bounds");
        Ok(bounds)
    }
}

/// Column-major scan for the first cell whose text is exactly "Trail Name".
fn find_name_header(tab: &Tab) -> Option<(usize, usize)> {
    (0..tab.column_count()).find_map(|col| {
        (0..tab.row_count())
            .find(|row| tab.cell_value(*row, col).as_text() == Some(NAME_HEADER))
            .map(|row| (row, col))
    })
}

/// Scans the header row right of the name column for the mileage and to-do headers.
///
/// A later matching column replaces an earlier one until both have been seen, so a
/// single header such as "Total To Do" can fill both slots.
fn find_mileage_headers(tab: &Tab, header_row: usize, name_column: usize) -> (Option<usize>, Option<usize>) {
    let mut mileage_column = None;
    let mut todo_column = None;
    for col in name_column + 1..tab.column_count() {
        if let Some(text) = tab.cell_value(header_row, col).as_text() {
            if text.contains(MILEAGE_HEADER) {
                mileage_column = Some(col);
            }
            if text.contains(TODO_HEADER) {
                todo_column = Some(col);
            }
        }
        if mileage_column.is_some() && todo_column.is_some() {
            break;
        }
    }
    (mileage_column, todo_column)
}
