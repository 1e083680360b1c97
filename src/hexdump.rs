//! Fixed-width hex/ASCII rendering of a whole frame, 16 bytes per row.

use std::fmt;
use std::fmt::Write as _;

pub const BYTES_PER_LINE: usize = 16;
const SPLIT_AT: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexDumpLine {
    /// Offset of the first byte of this row; always a multiple of 16.
    pub offset: usize,
    /// ` xx` per byte with an extra space before the ninth; short rows are
    /// padded so every row has the same width.
    pub hex: String,
    /// Printable bytes as-is, everything else as `.`.
    pub ascii: String,
}

impl HexDumpLine {
    fn new(offset: usize, chunk: &[u8]) -> Self {
        let mut hex = String::with_capacity(BYTES_PER_LINE * 3 + 1);
        for (i, byte) in chunk.iter().enumerate() {
            if i == SPLIT_AT {
                hex.push(' ');
            }
            let _ = write!(hex, " {byte:02x}");
        }
        for i in chunk.len()..BYTES_PER_LINE {
            if i == SPLIT_AT {
                hex.push(' ');
            }
            hex.push_str("   ");
        }

        let mut ascii = String::with_capacity(BYTES_PER_LINE + 2);
        for (i, &byte) in chunk.iter().enumerate() {
            if i == SPLIT_AT {
                ascii.push_str("  ");
            }
            ascii.push(if (0x20..=0x7e).contains(&byte) { byte as char } else { '.' });
        }

        HexDumpLine { offset, hex, ascii }
    }
}

impl fmt::Display for HexDumpLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " {:04x}   {}   {}", self.offset, self.hex, self.ascii)
    }
}

/// Lazy row iterator over a byte slice. Cloning it restarts from the clone point.
#[derive(Debug, Clone)]
pub struct HexDump<'a> {
    bytes: &'a [u8],
    offset: usize,
}

pub fn dump(bytes: &[u8]) -> HexDump<'_> {
    HexDump { bytes, offset: 0 }
}

impl Iterator for HexDump<'_> {
    type Item = HexDumpLine;

    fn next(&mut self) -> Option<HexDumpLine> {
        let rest = &self.bytes[self.offset..];
        if rest.is_empty() {
            return None;
        }
        let chunk = &rest[..rest.len().min(BYTES_PER_LINE)];
        let line = HexDumpLine::new(self.offset, chunk);
        self.offset += chunk.len();
        Some(line)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rows = (self.bytes.len() - self.offset).div_ceil(BYTES_PER_LINE);
        (rows, Some(rows))
    }
}

impl ExactSizeIterator for HexDump<'_> {}
