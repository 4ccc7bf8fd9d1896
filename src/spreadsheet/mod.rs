//! # Spreadsheet Readers
//!
//! In-house readers for the two workbook containers accepted by the tracer:
//!
//! - `.xls`: OLE compound file holding a BIFF8 `Workbook` stream
//! - `.xlsx`: ZIP package of SpreadsheetML parts
//!
//! Both readers sit behind the [`Spreadsheet`] trait and materialize a worksheet as a
//! [`Tab`], so everything downstream is written once against that grid.
use crate::error::TrailSheetError;
use std::ffi::OsStr;
use std::fmt::Display;
use std::path::Path;
use thiserror::Error;

pub mod cell;
pub(crate) mod reference;
pub mod tab;
pub(crate) mod xls;
pub(crate) mod xlsx;

pub use cell::CellValue;
pub use tab::Tab;

/// Errors raised while opening or validating a workbook.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// The workbook extension is neither `.xls` nor `.xlsx`
    #[error("Input spreadsheet must have a '.xls' or '.xlsx' extension: '{0}'")]
    PreconditionError(String),

    /// One or more expected tabs are missing
    #[error("Tabs not found in the spreadsheet: {}", .0.iter().map(|tab| format!("'{tab}'")).collect::<Vec<_>>().join(", "))]
    SchemaValidationError(Vec<String>),

    /// The Summary version cell names neither supported edition
    #[error("Expected 29th or 30th edition in cell A2 of Summary tab, found '{0}'")]
    UnsupportedEditionError(String),

    #[error("Spreadsheet '{0}' contains no worksheets")]
    SpreadsheetEmptyError(String),

    #[error("Spreadsheet '{0}' is password protected")]
    SpreadsheetPasswordProtectedError(String),

    /// A required part of the container is missing
    #[error("Missing '{1}' in spreadsheet '{0}'")]
    FileError(String, String),

    #[error("Tab '{1}' not found in spreadsheet '{0}'")]
    TabNotFoundError(String, String),
}

/// Container format of a workbook, chosen from its file extension.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    /// Excel 97-2003 binary workbook
    Xls,
    /// Excel 2007+ zipped workbook
    Xlsx,
}

impl SpreadsheetFormat {
    /// Detects the format from the (case-insensitive) extension.
    pub fn from_path(path: &Path) -> Result<Self, SpreadsheetError> {
        let extension = path
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("xls") => Ok(Self::Xls),
            Some("xlsx") => Ok(Self::Xlsx),
            _ => Err(SpreadsheetError::PreconditionError(path.display().to_string())),
        }
    }
}

impl Display for SpreadsheetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Xls => write!(f, "xls"),
            Self::Xlsx => write!(f, "xlsx"),
        }
    }
}

/// Capability shared by the format readers.
pub trait Spreadsheet {
    /// Source file name, used in error messages
    fn name(&self) -> String;

    fn format(&self) -> SpreadsheetFormat;

    /// Worksheet names in workbook order.
    fn tab_names(&self) -> Vec<String>;

    /// Reads every populated cell of a worksheet.
    fn read_tab(&mut self, tab_name: &str) -> Result<Tab, TrailSheetError>;
}

/// Opens a workbook with the reader matching its extension.
///
/// The extension is checked before the file is touched, so an unsupported file fails
/// with [`SpreadsheetError::PreconditionError`] even if it does not exist.
pub fn open_spreadsheet<P: AsRef<Path>>(path: P) -> Result<Box<dyn Spreadsheet>, TrailSheetError> {
    let path = path.as_ref();
    match SpreadsheetFormat::from_path(path)? {
        SpreadsheetFormat::Xls => Ok(Box::new(xls::XlsSpreadsheet::open(path)?)),
        SpreadsheetFormat::Xlsx => Ok(Box::new(xlsx::XlsxSpreadsheet::open(path)?)),
    }
}
