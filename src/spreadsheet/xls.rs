use crate::error::ResultOptionChain;
use crate::error::TrailSheetError;
use crate::helpers::biff8::Biff8Reader;
use crate::helpers::cfb::CompoundFile;
use crate::match_biff8_record;
use crate::spreadsheet::cell::to_error_value;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::tab::Tab;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use crate::spreadsheet::SpreadsheetFormat;
use either::Either;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

// BIFF8 record type identifiers
const FORMULA: u16 = 6;        // Formula record with its cached result
const EOF: u16 = 10;           // End of a substream
const FILE_PASS: u16 = 47;     // Workbook is encrypted
const CODE_PAGE: u16 = 66;     // Encoding of compressed strings
const BOUND_SHEET8: u16 = 133; // Sheet name, type and stream position
const MUL_RK: u16 = 189;       // Run of RK numbers in one row
const SST: u16 = 252;          // Shared string table
const LABEL_SST: u16 = 253;    // String cell referencing the shared string table
const NUMBER: u16 = 515;       // IEEE double cell
const ARRAY: u16 = 545;        // Array formula shared by a cell range
const TABLE: u16 = 566;        // What-if data table formula
const LABEL: u16 = 516;        // Inline string cell
const BOOL_ERR: u16 = 517;     // Boolean or error cell
const STRING: u16 = 519;       // String result of the preceding formula
const RK: u16 = 638;           // Compressed number cell
const SHR_FMLA: u16 = 1212;    // Shared formula definition
const BOF: u16 = 2057;         // Beginning of a substream

/// UTF-16 code page; compressed strings never use it, so Latin-1 stays in effect.
const CODE_PAGE_UTF16: u16 = 1200;

/// Errors specific to XLS parsing
#[derive(Error, Debug)]
pub enum XlsError {
    #[error("Invalid Code page '{0}'")]
    CodePageError(u16),

    #[error("Invalid Formula value '{0}'")]
    FormulaValueError(u64),

    #[error("Shared string index {0} out of range")]
    SharedStringIndexError(usize),
}

/// Excel 97-2003 workbook with its global records already read.
pub(crate) struct XlsSpreadsheet {
    pub(crate) name: String,
    reader: Biff8Reader,
    shared_strings: Vec<String>,
    /// Worksheet names with the stream offset of their BOF record
    tabs: Vec<(String, usize)>,
}

impl XlsSpreadsheet {
    /// Opens a compound file and reads the workbook globals substream.
    pub(crate) fn open(path: &Path) -> Result<XlsSpreadsheet, TrailSheetError> {
        let file_name = path.display().to_string();
        let compound = {
            let mut buf_reader = BufReader::new(File::open(path)?);
            CompoundFile::new(&mut buf_reader)?
        };
        let mut reader = compound
            .stream("Workbook")
            .ok_none_else(|| compound.stream("Book"))?
            .map(Biff8Reader::new)
            .ok_or_else(|| SpreadsheetError::FileError(file_name.to_owned(), "Workbook".to_owned()))?;

        let mut shared_strings = Vec::new();
        let mut tabs: Vec<(String, usize)> = Vec::new();
        match_biff8_record!(reader => {
            EOF => break,
            FILE_PASS => Err(SpreadsheetError::SpreadsheetPasswordProtectedError(file_name.to_owned()))?,
            CODE_PAGE => {
                let code_page = reader.read_u16()?;
                reader.encoding = if code_page == CODE_PAGE_UTF16 {
                    None
                } else {
                    Some(codepage::to_encoding(code_page).ok_or(XlsError::CodePageError(code_page))?)
                };
            }
            SST => shared_strings = load_shared_strings(&mut reader)?,
            BOUND_SHEET8 => {
                let pointer = reader.read_u32()? as usize;
                let _visibility = reader.read_u8()?;
                let kind = reader.read_u8()?;
                let tab_name = reader.read_short_unicode_string()?;
                // Chart sheets, macro sheets and VBA modules carry no cell grid.
                if kind == 0 {
                    tabs.push((tab_name, pointer));
                }
            }
        });
        if tabs.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?
        }
        debug!(workbook = %file_name, tabs = tabs.len(), shared_strings = shared_strings.len(), "read xls globals");

        Ok(XlsSpreadsheet {
            name: file_name,
            reader,
            shared_strings,
            tabs,
        })
    }

    fn shared_string(&self, index: usize) -> Result<CellValue, TrailSheetError> {
        match self.shared_strings.get(index) {
            Some(text) => Ok(CellValue::Text(text.to_owned())),
            None => Err(XlsError::SharedStringIndexError(index))?,
        }
    }
}

impl Spreadsheet for XlsSpreadsheet {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn format(&self) -> SpreadsheetFormat {
        SpreadsheetFormat::Xls
    }

    fn tab_names(&self) -> Vec<String> {
        self.tabs.iter().map(|(name, _)| name.to_owned()).collect()
    }

    fn read_tab(&mut self, tab_name: &str) -> Result<Tab, TrailSheetError> {
        let pointer = self
            .tabs
            .iter()
            .find(|(name, _)| name == tab_name)
            .map(|(_, pointer)| *pointer)
            .ok_or_else(|| SpreadsheetError::TabNotFoundError(self.name.to_owned(), tab_name.to_owned()))?;

        self.reader.goto(pointer);
        self.reader.next()?;
        let mut tab = Tab::new(tab_name);
        while let Some(kind) = self.reader.next()? {
            match kind {
                BOF | EOF => break,
                MUL_RK => {
                    let row = self.reader.read_u16()? as usize;
                    let first_col = self.reader.read_u16()? as usize;
                    let last_col = self.reader.last_u16()? as usize;
                    for col in first_col..=last_col {
                        self.reader.skip(2)?; // XF index
                        let value = self.reader.read_rk_number()?;
                        tab.insert(row, col, CellValue::Number(value));
                    }
                }
                BOOL_ERR | NUMBER | RK | LABEL_SST | LABEL | FORMULA => {
                    let row = self.reader.read_u16()? as usize;
                    let col = self.reader.read_u16()? as usize;
                    self.reader.skip(2)?; // XF index
                    let either = match kind {
                        BOOL_ERR => read_bool_or_error_cell(&mut self.reader)?,
                        NUMBER => Either::Left(CellValue::Number(self.reader.read_f64()?)),
                        RK => Either::Left(CellValue::Number(self.reader.read_rk_number()?)),
                        LABEL_SST => Either::Right(self.reader.read_u32()? as usize),
                        LABEL => Either::Left(CellValue::Text(self.reader.read_unicode_string()?)),
                        _ => read_formula_cell(&mut self.reader)?,
                    };
                    let value = match either {
                        Either::Left(value) => value,
                        Either::Right(index) => self.shared_string(index)?,
                    };
                    tab.insert(row, col, value);
                }
                _ => (),
            }
        }
        debug!(workbook = %self.name, tab = tab_name, rows = tab.row_count(), "read xls tab");
        Ok(tab)
    }
}

/// Loads the SST record: total count, unique count, then the strings.
fn load_shared_strings(reader: &mut Biff8Reader) -> Result<Vec<String>, TrailSheetError> {
    reader.skip(4)?;
    let count = reader.read_u32()? as usize;
    let mut shared_strings = Vec::with_capacity(count);
    for _ in 0..count {
        shared_strings.push(reader.read_rich_unicode_string()?);
    }
    Ok(shared_strings)
}

/// Cell values are `Left`; `Right` holds a shared string index still to be resolved.
type CellRecord = Either<CellValue, usize>;

fn read_bool_or_error_cell(reader: &mut Biff8Reader) -> Result<CellRecord, TrailSheetError> {
    let value = reader.read_u8()?;
    let flag = reader.read_u8()?;
    Ok(Either::Left(if flag == 0 {
        CellValue::Boolean(value != 0)
    } else {
        CellValue::Error(to_error_value(value).to_owned())
    }))
}

/// Reads the cached result of a FORMULA record.
///
/// A result whose top two bytes are not `0xFFFF` is a plain double. Otherwise the low
/// byte tags the kind, and string results live in the next STRING record. Shared,
/// array and table formula definitions may sit in between.
fn read_formula_cell(reader: &mut Biff8Reader) -> Result<CellRecord, TrailSheetError> {
    let formula = reader.read_u64()?;
    if formula & 0xFFFF_0000_0000_0000 != 0xFFFF_0000_0000_0000 {
        return Ok(Either::Left(CellValue::Number(f64::from_bits(formula))));
    }
    let value = match formula & 0xFF {
        0 => loop {
            match reader.next()? {
                Some(SHR_FMLA | ARRAY | TABLE) => continue,
                Some(STRING) => break CellValue::Text(reader.read_unicode_string()?),
                _ => Err(XlsError::FormulaValueError(formula))?,
            }
        },
        1 => CellValue::Boolean(formula & 0xFF_0000 != 0),
        2 => CellValue::Error(to_error_value(((formula >> 16) & 0xFF) as u8).to_owned()),
        3 => CellValue::Text(String::new()),
        _ => Err(XlsError::FormulaValueError(formula))?,
    };
    Ok(Either::Left(value))
}
