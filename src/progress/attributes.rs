use crate::progress::bounds::TabBounds;
use crate::spreadsheet::CellValue;
use crate::spreadsheet::Tab;
use indexmap::IndexMap;

/// Mileage cells of one trail row, kept exactly as the workbook stores them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrailAttributes {
    pub mileage: CellValue,
    pub miles_todo: CellValue,
}

impl TrailAttributes {
    /// A trail is fully traced when its remaining mileage is numerically zero.
    pub fn is_traced(&self) -> bool {
        self.miles_todo == CellValue::Number(0.0)
    }
}

/// Composite identifier joining a spreadsheet row to its geometry record.
pub fn trail_id(tab: &str, trail_name: &str) -> String {
    format!("{tab}, {trail_name}")
}

/// Trail attributes keyed by identifier, iterated in discovery order.
///
/// Writing an identifier again replaces its attributes but keeps its original position.
#[derive(Clone, Debug, Default)]
pub struct TrailTable {
    entries: IndexMap<String, TrailAttributes>,
}

impl TrailTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, trail_id: String, attributes: TrailAttributes) {
        self.entries.insert(trail_id, attributes);
    }

    pub fn get(&self, trail_id: &str) -> Option<&TrailAttributes> {
        self.entries.get(trail_id)
    }

    pub fn contains(&self, trail_id: &str) -> bool {
        self.entries.contains_key(trail_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TrailAttributes)> {
        self.entries.iter().map(|(id, attributes)| (id.as_str(), attributes))
    }

    /// Appends another table; its entries follow this table's in iteration order.
    pub fn merge(&mut self, other: TrailTable) {
        self.entries.extend(other.entries);
    }
}

/// Walks the data rows below the header and collects one entry per named trail.
///
/// Rows with a blank name cell are skipped. Mileage cells are taken verbatim; a missing
/// cell reads as [`CellValue::Empty`].
pub fn extract_trail_attributes(tab: &Tab, bounds: &TabBounds) -> TrailTable {
    let mut table = TrailTable::new();
    for row in bounds.header_row + 1..=bounds.last_row {
        let name = tab.cell_value(row, bounds.name_column);
        if name.is_blank() {
            continue;
        }
        table.insert(
            trail_id(tab.name(), &name.to_string()),
            TrailAttributes {
                mileage: tab.cell_value(row, bounds.mileage_column).clone(),
                miles_todo: tab.cell_value(row, bounds.todo_column).clone(),
            },
        );
    }
    table
}
