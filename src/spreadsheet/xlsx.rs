use crate::error::TrailSheetError;
use crate::helpers::cfb::CompoundFile;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::tab::Tab;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use crate::spreadsheet::SpreadsheetFormat;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELATIONSHIPS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Leading bytes of an OLE compound file; encrypted `.xlsx` files are wrapped in one.
const COMPOUND_FILE_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

// SpreadsheetML tag names
const TAG_RELATIONSHIP: &[u8] = b"Relationship";
const TAG_SHEET: QName = QName(b"sheet");
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");
const TAG_TEXT: QName = QName(b"t");
const TAG_ROW: QName = QName(b"row");
const TAG_CELL: QName = QName(b"c");
const TAG_INLINE_STRING: QName = QName(b"is");
const TAG_VALUE: QName = QName(b"v");

/// Declared type of a `<c>` element, from its `t` attribute.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
enum CellKind {
    #[default]
    Number,
    SharedString,
    InlineString,
    Boolean,
    Error,
    /// ISO 8601 date text, kept as written
    Date,
}

impl CellKind {
    fn from_attribute(value: Option<&str>) -> CellKind {
        match value {
            Some("s") => CellKind::SharedString,
            Some("inlineStr") | Some("str") => CellKind::InlineString,
            Some("b") => CellKind::Boolean,
            Some("e") => CellKind::Error,
            Some("d") => CellKind::Date,
            _ => CellKind::Number,
        }
    }
}

/// Excel 2007+ workbook backed by its ZIP package.
pub(crate) struct XlsxSpreadsheet {
    pub(crate) name: String,
    zip: ZipArchive<BufReader<File>>,
    shared_strings: Vec<String>,
    /// Worksheet names with their part paths inside the package
    tabs: Vec<(String, String)>,
}

impl XlsxSpreadsheet {
    pub(crate) fn open(path: &Path) -> Result<XlsxSpreadsheet, TrailSheetError> {
        let file_name = path.display().to_string();
        let mut reader = BufReader::new(File::open(path)?);
        if is_password_protected(&mut reader)? {
            Err(SpreadsheetError::SpreadsheetPasswordProtectedError(file_name.to_owned()))?;
        }

        let mut zip = ZipArchive::new(reader)?;
        let tabs = load_workbook(&mut zip, &file_name)?;
        if tabs.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?
        }
        let shared_strings = load_shared_strings(&mut zip)?;
        debug!(workbook = %file_name, tabs = tabs.len(), shared_strings = shared_strings.len(), "read xlsx package");

        Ok(XlsxSpreadsheet {
            name: file_name,
            zip,
            shared_strings,
            tabs,
        })
    }
}

impl Spreadsheet for XlsxSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn format(&self) -> SpreadsheetFormat {
        SpreadsheetFormat::Xlsx
    }

    fn tab_names(&self) -> Vec<String> {
        self.tabs.iter().map(|(name, _)| name.to_owned()).collect()
    }

    fn read_tab(&mut self, tab_name: &str) -> Result<Tab, TrailSheetError> {
        let zip_path = self
            .tabs
            .iter()
            .find(|(name, _)| name == tab_name)
            .map(|(_, zip_path)| zip_path.to_owned())
            .ok_or_else(|| SpreadsheetError::TabNotFoundError(self.name.to_owned(), tab_name.to_owned()))?;
        let mut reader = self
            .zip
            .xml_reader(&zip_path)?
            .ok_or_else(|| SpreadsheetError::FileError(self.name.to_owned(), zip_path.to_owned()))?;

        let mut tab = Tab::new(tab_name);
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut position = (0usize, 0usize);
        let mut kind = CellKind::default();
        let mut value: Option<String> = None;
        match_xml_events!(reader => {
            Event::End(event) if event.name() == TAG_ROW => {
                row_count += 1;
                col_count = 0;
            }
            Event::Start(event) if event.name() == TAG_ROW => {
                if let Some(number) = event.get_attribute_value("r")? {
                    row_count = number.parse::<usize>()?.saturating_sub(1);
                }
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                position = event
                    .get_attribute_value("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((row_count, col_count));
                col_count = position.1 + 1;
                kind = CellKind::from_attribute(event.get_attribute_value("t")?.as_deref());
                value = None;
            }
            Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                value = Some(read_string_value(&mut reader, TAG_INLINE_STRING, false)?);
            }
            Event::Start(event) if event.name() == TAG_VALUE => {
                value = Some(read_string_value(&mut reader, TAG_VALUE, true)?);
            }
            Event::End(event) if event.name() == TAG_CELL => {
                if let Some(raw) = value.take() {
                    let (row, col) = position;
                    tab.insert(row, col, to_cell_value(kind, raw, &self.shared_strings, &self.name)?);
                }
            }
        });
        debug!(workbook = %self.name, tab = tab_name, rows = tab.row_count(), "read xlsx tab");
        Ok(tab)
    }
}

/// Converts the raw `<v>`/`<is>` text of a cell according to its declared type.
fn to_cell_value(kind: CellKind, raw: String, shared_strings: &[String], file_name: &str) -> Result<CellValue, TrailSheetError> {
    Ok(match kind {
        CellKind::Number if raw.is_empty() => CellValue::Empty,
        CellKind::Number => CellValue::Number(raw.trim().parse::<f64>()?),
        CellKind::SharedString => {
            let index = raw.trim().parse::<usize>()?;
            shared_strings
                .get(index)
                .map(|text| CellValue::Text(text.to_owned()))
                .ok_or_else(|| SpreadsheetError::FileError(file_name.to_owned(), format!("{SHARED_STRINGS_PART}#{index}")))?
        }
        CellKind::InlineString | CellKind::Date => CellValue::Text(raw),
        CellKind::Boolean => CellValue::Boolean(matches!(raw.trim(), "1" | "true")),
        CellKind::Error => CellValue::Error(raw),
    })
}

/// Detects an encrypted package: a compound file with an `EncryptedPackage` stream
/// instead of a ZIP archive. Leaves the reader at the start of the file.
fn is_password_protected<RS: Read + Seek>(reader: &mut RS) -> Result<bool, TrailSheetError> {
    let mut magic = [0u8; 8];
    let is_compound_file = reader.read_exact(&mut magic).is_ok() && magic == COMPOUND_FILE_MAGIC;
    reader.seek(SeekFrom::Start(0))?;
    if !is_compound_file {
        return Ok(false);
    }
    let protected = CompoundFile::new(reader)
        .map(|compound| compound.exists("EncryptedPackage"))
        .unwrap_or(false);
    reader.seek(SeekFrom::Start(0))?;
    Ok(protected)
}

/// Maps relationship ids to worksheet part paths.
fn load_relationships<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    file_name: &str,
) -> Result<HashMap<String, String>, TrailSheetError> {
    let mut reader = zip
        .xml_reader(WORKBOOK_RELATIONSHIPS_PART)?
        .ok_or_else(|| SpreadsheetError::FileError(file_name.to_owned(), WORKBOOK_RELATIONSHIPS_PART.to_owned()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Reads worksheet names in workbook order, resolved to their part paths.
fn load_workbook<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    file_name: &str,
) -> Result<Vec<(String, String)>, TrailSheetError> {
    let relationships = load_relationships(zip, file_name)?;
    let mut reader = zip
        .xml_reader(WORKBOOK_PART)?
        .ok_or_else(|| SpreadsheetError::FileError(file_name.to_owned(), WORKBOOK_PART.to_owned()))?;
    let mut tabs: Vec<(String, String)> = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.unescape_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.unescape_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(id.as_ref()) {
                    tabs.push((name.to_string(), path.to_owned()));
                }
            }
        }
    });
    Ok(tabs)
}

fn load_shared_strings<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<String>, TrailSheetError> {
    let mut shared_strings = Vec::<String>::new();
    let Some(mut reader) = zip.xml_reader(SHARED_STRINGS_PART)? else {
        return Ok(shared_strings);
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Normalizes a relationship target to a path inside the package.
fn to_zip_path(path: Cow<'_, str>) -> String {
    if let Some(stripped) = path.strip_prefix('/') {
        stripped.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Collects text up to `end_tag`, skipping phonetic runs. `<v>` content is text as-is,
/// while string items only count text inside `<t>` elements.
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, TrailSheetError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
