//! Reader for dBase III tables, the format the BIC registry is distributed in.
//!
//! Layout: a 32 byte header, 32 byte field descriptors terminated by `0x0D`, then fixed-width
//! rows. Every row starts with a deletion marker (`' '` live, `'*'` deleted) followed by the
//! fields in descriptor order, space padded.

use crate::codepage::Codepage;
use crate::error::{Error, Result};

const HEADER_LEN: usize = 32;
const DESCRIPTOR_LEN: usize = 32;
const DESCRIPTOR_END: u8 = 0x0D;
const EOF_MARKER: u8 = 0x1A;

/// Column layout. Every value is read as text; the type byte is not interpreted.
#[derive(Debug, Clone)]
struct Field {
    name: String,
    offset: usize,
    len: usize,
}

/// Why a row was not returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSkip {
    Deleted,
    Truncated,
    BadMarker(u8),
}

#[derive(Debug)]
pub struct Table<'a> {
    fields: Vec<Field>,
    codepage: Codepage,
    declared_rows: usize,
    record_len: usize,
    data: &'a [u8],
}

impl<'a> Table<'a> {
    /// Parse the table header. Only a broken header is an error; row problems surface from
    /// [`Table::rows`].
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::document(format!(
                "dBase header needs {HEADER_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let declared_rows = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        let record_len = u16::from_le_bytes([bytes[10], bytes[11]]) as usize;
        let codepage = Codepage::from_dbase_driver(bytes[29]);

        if header_len < HEADER_LEN + 1 || header_len > bytes.len() {
            return Err(Error::document(format!(
                "dBase header length {header_len} out of bounds"
            )));
        }
        if record_len < 2 {
            return Err(Error::document(format!("dBase record length {record_len} too small")));
        }

        let mut fields = Vec::new();
        // Deletion marker occupies the first byte of each row
        let mut offset = 1;
        for descriptor in bytes[HEADER_LEN..header_len].chunks(DESCRIPTOR_LEN) {
            if descriptor[0] == DESCRIPTOR_END {
                break;
            }
            if descriptor.len() < DESCRIPTOR_LEN {
                return Err(Error::document("truncated dBase field descriptor"));
            }
            let name_end = descriptor[..11].iter().position(|&b| b == 0).unwrap_or(11);
            let name = String::from_utf8_lossy(&descriptor[..name_end])
                .trim()
                .to_ascii_uppercase();
            let len = descriptor[16] as usize;
            fields.push(Field {
                name,
                offset,
                len,
            });
            offset += len;
        }

        if fields.is_empty() {
            return Err(Error::document("dBase table declares no fields"));
        }
        if offset != record_len {
            return Err(Error::document(format!(
                "dBase fields span {offset} bytes but records are {record_len} bytes"
            )));
        }

        Ok(Table {
            fields,
            codepage,
            declared_rows,
            record_len,
            data: &bytes[header_len..],
        })
    }

    /// Position of a column, matched case-insensitively.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Resolve columns that must be present, failing on the first absent one.
    pub fn require<const N: usize>(&self, names: [&str; N]) -> Result<[usize; N]> {
        let mut columns = [0; N];
        for (slot, name) in columns.iter_mut().zip(names) {
            *slot = self.column(name).ok_or_else(|| {
                Error::document(format!("dBase table has no `{name}` column"))
            })?;
        }
        Ok(columns)
    }

    /// Rows in file order. Stops at the declared row count or the end-of-file marker, whichever
    /// comes first.
    pub fn rows(&self) -> impl Iterator<Item = std::result::Result<Row, RowSkip>> + '_ {
        self.data
            .chunks(self.record_len)
            .take(self.declared_rows)
            .take_while(|chunk| chunk[0] != EOF_MARKER)
            .map(|chunk| self.decode_row(chunk))
    }

    fn decode_row(&self, chunk: &[u8]) -> std::result::Result<Row, RowSkip> {
        if chunk.len() < self.record_len {
            return Err(RowSkip::Truncated);
        }
        match chunk[0] {
            b' ' => {}
            b'*' => return Err(RowSkip::Deleted),
            other => return Err(RowSkip::BadMarker(other)),
        }
        let values = self
            .fields
            .iter()
            .map(|field| {
                let raw = &chunk[field.offset..field.offset + field.len];
                let raw = raw.split(|&b| b == 0).next().unwrap_or_default();
                self.codepage.decode(raw).trim().to_string()
            })
            .collect();
        Ok(Row { values })
    }
}

/// One live row, values decoded and trimmed.
#[derive(Debug, Clone)]
pub struct Row {
    values: Vec<String>,
}

impl Row {
    pub fn get(&self, column: usize) -> &str {
        self.values.get(column).map(String::as_str).unwrap_or_default()
    }

    /// Value of an optional column; absent columns read as empty.
    pub fn get_opt(&self, column: Option<usize>) -> &str {
        column.map(|c| self.get(c)).unwrap_or_default()
    }
}
