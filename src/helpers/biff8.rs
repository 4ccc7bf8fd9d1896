//! Microsoft Office Binary Interchange File Format (BIFF8)
//! Record reader for the `Workbook` stream of Excel 97-2003 (.xls) files.
//! CONTINUE records are folded into the record they extend.

use crate::error::TrailSheetError;
use crate::helpers::bytes::to_f64;
use crate::helpers::bytes::to_u16;
use crate::helpers::bytes::to_u32;
use crate::helpers::bytes::to_u64;
use encoding_rs::Encoding;
use thiserror::Error;

const CONTINUE: u16 = 60;

/// Errors specific to BIFF8 record parsing
#[derive(Error, Debug)]
pub enum Biff8Error {
    #[error("Fewer than {0} bytes remaining in record")]
    NoEnoughDataError(usize),
}

/// Record reader over an in-memory BIFF8 stream.
pub(crate) struct Biff8Reader {
    /// Encoding of compressed 8-bit strings; `None` means Latin-1.
    pub(crate) encoding: Option<&'static Encoding>,
    buffer: Vec<u8>,
    /// Position of the next record header
    pointer: usize,
    /// Byte ranges of the current record and its CONTINUE records
    chunks: Vec<(usize, usize)>,
    index: usize,
    offset: usize,
}

impl Biff8Reader {
    pub(crate) fn new(data: Vec<u8>) -> Biff8Reader {
        Biff8Reader {
            encoding: None,
            buffer: data,
            pointer: 0,
            chunks: Vec::new(),
            index: 0,
            offset: 0,
        }
    }

    /// Advances to the next record and returns its type, or `None` at the end of the stream.
    pub(crate) fn next(&mut self) -> Result<Option<u16>, TrailSheetError> {
        if self.pointer + 4 > self.buffer.len() {
            return Ok(None);
        }
        self.index = 0;
        self.offset = 0;
        self.chunks.clear();

        let kind = self.u16_at(self.pointer)?;
        self.push_chunk()?;
        while self.pointer + 4 <= self.buffer.len() && self.u16_at(self.pointer)? == CONTINUE {
            self.push_chunk()?;
        }
        Ok(Some(kind))
    }

    /// Registers the record body at `pointer` and moves past it.
    fn push_chunk(&mut self) -> Result<(), TrailSheetError> {
        let size = self.u16_at(self.pointer + 2)? as usize;
        let lower = self.pointer + 4;
        let upper = (lower + size).min(self.buffer.len());
        self.chunks.push((lower, upper));
        self.pointer = lower + size;
        Ok(())
    }

    /// Positions the reader on the record header at an absolute stream offset.
    pub(crate) fn goto(&mut self, pointer: usize) {
        self.pointer = pointer;
        self.chunks.clear();
    }

    /// Takes up to `length` bytes without crossing into the next CONTINUE chunk.
    fn take(&mut self, length: usize) -> &[u8] {
        let Some((lower, upper)) = self.chunks.get(self.index).copied() else {
            return &[];
        };
        let source = upper.min(lower + self.offset);
        let target = upper.min(source + length);
        if target == upper {
            self.index += 1;
            self.offset = 0;
        } else {
            self.offset += target - source;
        }
        &self.buffer[source..target]
    }

    fn take_exact(&mut self, length: usize) -> Result<&[u8], TrailSheetError> {
        let bytes = self.take(length);
        if bytes.len() == length {
            Ok(bytes)
        } else {
            Err(Biff8Error::NoEnoughDataError(length))?
        }
    }

    /// Skips `length` bytes, crossing CONTINUE boundaries when needed.
    pub(crate) fn skip(&mut self, length: usize) -> Result<(), TrailSheetError> {
        let mut remaining = length;
        while remaining > 0 {
            let taken = self.take(remaining).len();
            if taken == 0 {
                Err(Biff8Error::NoEnoughDataError(remaining))?;
            }
            remaining -= taken;
        }
        Ok(())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, TrailSheetError> {
        self.take_exact(1).map(|bytes| bytes[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, TrailSheetError> {
        self.take_exact(2).map(to_u16)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, TrailSheetError> {
        self.take_exact(4).map(to_u32)
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64, TrailSheetError> {
        self.take_exact(8).map(to_u64)
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64, TrailSheetError> {
        self.take_exact(8).map(to_f64)
    }

    fn u16_at(&self, index: usize) -> Result<u16, TrailSheetError> {
        match self.buffer.get(index..index + 2) {
            Some(bytes) => Ok(to_u16(bytes)),
            None => Err(Biff8Error::NoEnoughDataError(2))?,
        }
    }

    /// Reads the trailing u16 of the current record (MULRK keeps its last column there).
    pub(crate) fn last_u16(&self) -> Result<u16, TrailSheetError> {
        match self.chunks.last() {
            Some((lower, upper)) if upper - lower >= 2 => self.u16_at(upper - 2),
            _ => Err(Biff8Error::NoEnoughDataError(2))?,
        }
    }

    /// Decodes an RK value: 30-bit integer or truncated IEEE double, optionally divided by 100.
    pub(crate) fn read_rk_number(&mut self) -> Result<f64, TrailSheetError> {
        let raw = self.read_u32()?;
        let mut value = if raw & 0x02 != 0 {
            ((raw as i32) >> 2) as f64
        } else {
            f64::from_bits(((raw & 0xFFFF_FFFC) as u64) << 32)
        };
        if raw & 0x01 != 0 {
            value /= 100.0;
        }
        Ok(value)
    }

    /// ShortXLUnicodeString: 8-bit character count.
    pub(crate) fn read_short_unicode_string(&mut self) -> Result<String, TrailSheetError> {
        let chars = self.read_u8()? as usize;
        let flags = self.read_u8()?;
        self.read_characters(chars, flags)
    }

    /// XLUnicodeString: 16-bit character count.
    pub(crate) fn read_unicode_string(&mut self) -> Result<String, TrailSheetError> {
        let chars = self.read_u16()? as usize;
        let flags = self.read_u8()?;
        self.read_characters(chars, flags)
    }

    /// XLUnicodeRichExtendedString as stored in the shared string table.
    pub(crate) fn read_rich_unicode_string(&mut self) -> Result<String, TrailSheetError> {
        let chars = self.read_u16()? as usize;
        let flags = self.read_u8()?;
        let runs = if flags & 0x08 != 0 { self.read_u16()? as usize } else { 0 };
        let extension = if flags & 0x04 != 0 { self.read_u32()? as usize } else { 0 };
        let text = self.read_characters(chars, flags)?;
        self.skip(4 * runs + extension)?;
        Ok(text)
    }

    /// Reads `chars` characters; a string split by CONTINUE restarts with a fresh flags byte.
    fn read_characters(&mut self, chars: usize, flags: u8) -> Result<String, TrailSheetError> {
        let mut text = String::with_capacity(chars);
        let mut remaining = chars;
        let mut is_wide = flags & 0x01 != 0;
        loop {
            let width = if is_wide { 2 } else { 1 };
            let encoding = self.encoding;
            let bytes = self.take(remaining * width);
            let read = bytes.len() / width;
            if is_wide {
                let (decoded, _, _) = encoding_rs::UTF_16LE.decode(&bytes[..read * 2]);
                text.push_str(&decoded);
            } else if let Some(encoding) = encoding {
                let (decoded, _, _) = encoding.decode(bytes);
                text.push_str(&decoded);
            } else {
                text.extend(bytes.iter().map(|byte| char::from(*byte)));
            }
            remaining -= read;
            if remaining == 0 {
                return Ok(text);
            }
            if read == 0 && self.index >= self.chunks.len() {
                Err(Biff8Error::NoEnoughDataError(remaining * width))?;
            }
            is_wide = self.read_u8()? & 0x01 != 0;
        }
    }
}

#[macro_export]
macro_rules! match_biff8_record {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(kind) = $reader.next()? {
            match kind {
                $($arms)*
                _ => (),
            }
        }
    };
}
