//! OLE Compound File Binary (CFB) container used by legacy Excel (.xls) workbooks.
//!
//! The whole container is loaded into memory up front so the caller can drop its file
//! handle before any record parsing starts.

use crate::error::TrailSheetError;
use crate::helpers::bytes::to_sector_ids;
use crate::helpers::bytes::to_u16;
use crate::helpers::bytes::to_u64;
use crate::helpers::bytes::to_usize;
use encoding_rs::UTF_16LE;
use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use thiserror::Error;

const HEADER_SIZE: usize = 512;
const SIGNATURE: u64 = 0xE11A_B1A1_E011_CFD0;
/// Sector ids at or above this value are markers (DIFSECT, FATSECT, ENDOFCHAIN, FREESECT).
const FIRST_SPECIAL_SECTOR: usize = 0xFFFF_FFFB;
const MINI_STREAM_CUTOFF: usize = 4096;
const MINI_SECTOR_SIZE: usize = 64;
const DIRECTORY_ENTRY_SIZE: usize = 128;
const ROOT_ENTRY: &str = "Root Entry";

/// Errors specific to Compound File Binary parsing
#[derive(Error, Debug)]
pub enum CfbError {
    #[error("The file is too small to be a compound file")]
    TruncatedHeaderError,

    #[error("Invalid OLE signature (not an office document?)")]
    SignatureError,

    #[error("Invalid sector size '2 ^ {1}' for major version '{0}'")]
    SectorSizeError(u16, u16),

    #[error("Sector '{0}' lies outside the file")]
    SectorRangeError(usize),

    #[error("Sector chain starting at '{0}' does not terminate")]
    SectorChainError(usize),

    #[error("Expected {expected} allocation table sectors, found {actual}")]
    AllocationTableError { expected: usize, actual: usize },

    #[error("Compound file has no directory entries")]
    EmptyDirectoryError,
}

/// In-memory compound file with its allocation tables and directory.
pub(crate) struct CompoundFile {
    entries: HashMap<String, DirectoryEntry>,
    allocation_table: Vec<usize>,
    sectors: Sectors,
    mini_allocation_table: Vec<usize>,
    mini_sectors: Sectors,
}

impl CompoundFile {
    /// Reads and indexes a complete compound file.
    pub(crate) fn new<RS: Read + Seek>(reader: &mut RS) -> Result<CompoundFile, TrailSheetError> {
        let size = reader.seek(SeekFrom::End(0))? as usize;
        if size < HEADER_SIZE {
            Err(CfbError::TruncatedHeaderError)?;
        }
        reader.seek(SeekFrom::Start(0))?;
        let mut data = vec![0u8; size];
        reader.read_exact(&mut data)?;

        let header = Header::parse(&data[..HEADER_SIZE])?;
        let sector_size = header.sector_size()?;
        let sectors = Sectors { data, size: sector_size, base: sector_size };
        let allocation_table = load_allocation_table(&sectors, &header)?;
        let entries = load_directory(&allocation_table, &sectors, header.first_directory_sector)?;

        let mini_allocation_table = if header.mini_allocation_sector_count > 0 {
            let bytes = follow_chain(&allocation_table, &sectors, header.first_mini_allocation_sector)?;
            to_sector_ids(&bytes).collect()
        } else {
            Vec::new()
        };
        let mut mini_stream = match entries.get(ROOT_ENTRY) {
            Some(root) => follow_chain(&allocation_table, &sectors, root.start)?,
            None => Vec::new(),
        };
        if let Some(root) = entries.get(ROOT_ENTRY) {
            mini_stream.truncate(root.size);
        }

        Ok(CompoundFile {
            entries,
            allocation_table,
            sectors,
            mini_allocation_table,
            mini_sectors: Sectors { data: mini_stream, size: MINI_SECTOR_SIZE, base: 0 },
        })
    }

    /// Returns true if a stream or storage with this name exists.
    pub(crate) fn exists(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Reads the complete content of a named stream.
    pub(crate) fn stream(&self, name: &str) -> Result<Option<Vec<u8>>, TrailSheetError> {
        let Some(entry) = self.entries.get(name) else {
            return Ok(None);
        };
        let mut bytes = if entry.size < MINI_STREAM_CUTOFF {
            follow_chain(&self.mini_allocation_table, &self.mini_sectors, entry.start)?
        } else {
            follow_chain(&self.allocation_table, &self.sectors, entry.start)?
        };
        bytes.truncate(entry.size);
        Ok(Some(bytes))
    }
}

/// Builds the FAT from the header DIFAT array and any chained DIFAT sectors.
fn load_allocation_table(sectors: &Sectors, header: &Header) -> Result<Vec<usize>, TrailSheetError> {
    let mut difat: Vec<usize> = to_sector_ids(&sectors.data[76..HEADER_SIZE]).collect();
    let mut next = header.first_difat_sector;
    let mut difat_sectors = 0usize;
    while next < FIRST_SPECIAL_SECTOR {
        if difat_sectors > sectors.count() {
            Err(CfbError::SectorChainError(header.first_difat_sector))?;
        }
        let ids: Vec<usize> = to_sector_ids(sectors.get(next)?).collect();
        let (last, entries) = ids.split_last().ok_or(CfbError::SectorRangeError(next))?;
        difat.extend_from_slice(entries);
        next = *last;
        difat_sectors += 1;
    }

    let mut allocation_table = Vec::new();
    let mut allocation_sectors = 0usize;
    for index in difat.into_iter().filter(|index| *index < FIRST_SPECIAL_SECTOR) {
        allocation_table.extend(to_sector_ids(sectors.get(index)?));
        allocation_sectors += 1;
    }
    if allocation_sectors != header.allocation_sector_count {
        Err(CfbError::AllocationTableError {
            expected: header.allocation_sector_count,
            actual: allocation_sectors,
        })?;
    }
    Ok(allocation_table)
}

fn load_directory(
    allocation_table: &[usize],
    sectors: &Sectors,
    first_sector: usize,
) -> Result<HashMap<String, DirectoryEntry>, TrailSheetError> {
    let bytes = follow_chain(allocation_table, sectors, first_sector)?;
    let entries: HashMap<String, DirectoryEntry> = bytes
        .chunks_exact(DIRECTORY_ENTRY_SIZE)
        .filter_map(DirectoryEntry::parse)
        .collect();
    if entries.is_empty() {
        Err(CfbError::EmptyDirectoryError)?
    }
    Ok(entries)
}

/// Concatenates the sectors of a chain, guarding against cycles.
fn follow_chain(allocation_table: &[usize], sectors: &Sectors, start: usize) -> Result<Vec<u8>, TrailSheetError> {
    let mut content = Vec::new();
    let mut index = start;
    let mut steps = 0usize;
    while index < FIRST_SPECIAL_SECTOR {
        if steps > allocation_table.len() {
            Err(CfbError::SectorChainError(start))?;
        }
        content.extend_from_slice(sectors.get(index)?);
        index = *allocation_table.get(index).ok_or(CfbError::SectorRangeError(index))?;
        steps += 1;
    }
    Ok(content)
}

/// Sector storage; `base` is the byte offset of sector 0 (the header for regular sectors).
struct Sectors {
    data: Vec<u8>,
    size: usize,
    base: usize,
}

impl Sectors {
    fn get(&self, index: usize) -> Result<&[u8], CfbError> {
        let lower = self.base + index * self.size;
        if lower >= self.data.len() {
            return Err(CfbError::SectorRangeError(index));
        }
        let upper = self.data.len().min(lower + self.size);
        Ok(&self.data[lower..upper])
    }

    fn count(&self) -> usize {
        self.data.len().saturating_sub(self.base) / self.size
    }
}

struct Header {
    major_version: u16,
    sector_shift: u16,
    allocation_sector_count: usize,
    first_directory_sector: usize,
    first_mini_allocation_sector: usize,
    mini_allocation_sector_count: usize,
    first_difat_sector: usize,
}

impl Header {
    fn parse(data: &[u8]) -> Result<Header, TrailSheetError> {
        if to_u64(&data[0..8]) != SIGNATURE {
            Err(CfbError::SignatureError)?;
        }
        Ok(Header {
            major_version: to_u16(&data[26..28]),
            sector_shift: to_u16(&data[30..32]),
            allocation_sector_count: to_usize(&data[44..48]),
            first_directory_sector: to_usize(&data[48..52]),
            first_mini_allocation_sector: to_usize(&data[60..64]),
            mini_allocation_sector_count: to_usize(&data[64..68]),
            first_difat_sector: to_usize(&data[68..72]),
        })
    }

    fn sector_size(&self) -> Result<usize, CfbError> {
        match (self.major_version, self.sector_shift) {
            (3, 9) => Ok(512),
            // Version 4 pads the 512-byte header up to a full 4096-byte sector.
            (4, 12) => Ok(4096),
            (major, shift) => Err(CfbError::SectorSizeError(major, shift)),
        }
    }
}

struct DirectoryEntry {
    start: usize,
    size: usize,
}

impl DirectoryEntry {
    /// Parses one 128-byte directory record; unused slots yield `None`.
    fn parse(bytes: &[u8]) -> Option<(String, DirectoryEntry)> {
        if bytes[66] == 0 {
            return None;
        }
        let name_size = (to_u16(&bytes[64..66]) as usize).min(64);
        let (name, _, _) = UTF_16LE.decode(&bytes[..name_size]);
        let name = name.split('\0').next().unwrap_or_default().to_owned();
        let entry = DirectoryEntry {
            start: to_usize(&bytes[116..120]),
            size: to_u64(&bytes[120..128]) as usize,
        };
        Some((name, entry))
    }
}
