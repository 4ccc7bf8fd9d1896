use crate::config::ExpectedTabs;
use crate::error::ResultMessage;
use crate::error::TrailSheetError;
use crate::progress::attributes::extract_trail_attributes;
use crate::progress::attributes::TrailTable;
use crate::progress::bounds::TabBounds;
use crate::spreadsheet::open_spreadsheet;
use crate::spreadsheet::CellValue;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use crate::spreadsheet::SpreadsheetFormat;
use crate::spreadsheet::Tab;
use std::fmt::Display;
use std::path::Path;
use tracing::info;

/// Tab holding the workbook metadata; it has no trail table.
pub const SUMMARY_TAB: &str = "Summary";

/// Position of the edition marker on the Summary tab (cell A2).
const EDITION_CELL: (usize, usize) = (1, 0);

/// Guidebook edition the workbook layout follows.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Edition {
    TwentyNinth,
    Thirtieth,
}

impl Edition {
    /// Reads the edition marker through its display text, so `30` and "30th Edition"
    /// both qualify. "30" is checked before "29".
    pub fn detect(marker: &CellValue) -> Result<Edition, SpreadsheetError> {
        let text = marker.to_string();
        if text.contains("30") {
            Ok(Edition::Thirtieth)
        } else if text.contains("29") {
            Ok(Edition::TwentyNinth)
        } else {
            Err(SpreadsheetError::UnsupportedEditionError(text))
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            Edition::TwentyNinth => 29,
            Edition::Thirtieth => 30,
        }
    }
}

impl Display for Edition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}th edition", self.number())
    }
}

/// Opened and validated hiking-progress workbook.
pub struct TracingWorkbook {
    spreadsheet: Box<dyn Spreadsheet>,
    tab_names: Vec<String>,
    edition: Edition,
}

impl TracingWorkbook {
    /// Opens a workbook and validates it against the expected tabs.
    pub fn open<P: AsRef<Path>>(path: P, expected_tabs: &ExpectedTabs) -> Result<TracingWorkbook, TrailSheetError> {
        Self::from_spreadsheet(open_spreadsheet(path)?, expected_tabs)
    }

    /// Validates an already opened spreadsheet: expected tabs present, then edition.
    pub fn from_spreadsheet(
        mut spreadsheet: Box<dyn Spreadsheet>,
        expected_tabs: &ExpectedTabs,
    ) -> Result<TracingWorkbook, TrailSheetError> {
        let tab_names = spreadsheet.tab_names();
        let mut missing: Vec<String> = expected_tabs
            .tab_names()
            .filter(|expected| !tab_names.iter().any(|name| name == expected))
            .map(str::to_owned)
            .collect();
        if !tab_names.iter().any(|name| name == SUMMARY_TAB) && !missing.iter().any(|name| name == SUMMARY_TAB) {
            missing.push(SUMMARY_TAB.to_owned());
        }
        if !missing.is_empty() {
            Err(SpreadsheetError::SchemaValidationError(missing))?
        }

        let summary = spreadsheet.read_tab(SUMMARY_TAB)?;
        let edition = Edition::detect(summary.cell_value(EDITION_CELL.0, EDITION_CELL.1))?;
        info!(workbook = %spreadsheet.name(), format = %spreadsheet.format(), %edition, "opened tracing workbook");

        Ok(TracingWorkbook {
            spreadsheet,
            tab_names,
            edition,
        })
    }

    pub fn name(&self) -> String {
        self.spreadsheet.name()
    }

    pub fn format(&self) -> SpreadsheetFormat {
        self.spreadsheet.format()
    }

    pub fn edition(&self) -> Edition {
        self.edition
    }

    /// All tab names in workbook order.
    pub fn tab_names(&self) -> &[String] {
        &self.tab_names
    }

    /// Tabs expected to hold a trail table: every tab except Summary.
    pub fn trail_tab_names(&self) -> impl Iterator<Item = &str> {
        self.tab_names
            .iter()
            .map(String::as_str)
            .filter(|name| *name != SUMMARY_TAB)
    }

    pub fn read_tab(&mut self, tab_name: &str) -> Result<Tab, TrailSheetError> {
        self.spreadsheet.read_tab(tab_name)
    }

    /// Resolves every trail tab and collects its attributes, tabs in workbook order.
    pub fn collect_trail_attributes(&mut self) -> Result<TrailTable, TrailSheetError> {
        let tab_names: Vec<String> = self.trail_tab_names().map(str::to_owned).collect();
        let mut table = TrailTable::new();
        for tab_name in tab_names {
            info!("Updating table bounds for {} tab", tab_name);
            let tab = self.read_tab(&tab_name).with_prefix(&format!("Read '{tab_name}' tab"))?;
            let bounds = TabBounds::resolve(&tab)?;
            table.merge(extract_trail_attributes(&tab, &bounds));
        }
        Ok(table)
    }
}
