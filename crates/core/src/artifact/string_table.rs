//! Mapped array of short (≤ 255 byte) strings.
//!
//! Layout, all little-endian, no padding:
//!
//! ```text
//! buffer_size   : u32        total bytes of this artifact
//! element_count : u32        number of strings
//! offsets       : u32 × N    per-entry offset into the strings region
//! strings       : packed     N records of (1-byte length, data bytes)
//! ```

use crate::buffer::{BufferReader, BufferWriter};
use crate::error::{Result, TokenizerError};

const HEADER_BYTES: usize = 8;

/// Read-only view over a string-table artifact in a borrowed buffer.
///
/// Random access returns byte slices borrowed from the buffer; nothing is
/// copied or deserialized up front.
#[derive(Debug, Clone, Copy)]
pub struct StringTable<'a> {
    element_count: u32,
    offsets: &'a [u8],
    strings: &'a [u8],
}

impl<'a> StringTable<'a> {
    /// Attach to the artifact at the start of `data`.
    ///
    /// Validates the header against the buffer bounds and returns the view
    /// together with the number of bytes the artifact occupies.
    pub fn attach(data: &'a [u8]) -> Result<(Self, usize)> {
        let mut reader = BufferReader::new(data);
        let buffer_size = reader.read_u32()? as usize;
        let element_count = reader.read_u32()?;

        if buffer_size > data.len() {
            return Err(TokenizerError::Corrupted(format!(
                "string table claims {buffer_size} bytes, buffer holds {}",
                data.len()
            )));
        }
        let offsets_size = (element_count as usize).saturating_mul(4);
        let strings_start = HEADER_BYTES
            .checked_add(offsets_size)
            .filter(|&start| start <= buffer_size)
            .ok_or_else(|| {
                TokenizerError::Corrupted(format!(
                    "string table offsets ({element_count} entries) overrun {buffer_size} bytes"
                ))
            })?;

        let table = Self {
            element_count,
            offsets: &data[HEADER_BYTES..strings_start],
            strings: &data[strings_start..buffer_size],
        };
        Ok((table, buffer_size))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.element_count as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.element_count == 0
    }

    /// Borrow the string stored at `index`.
    ///
    /// An out-of-range index is a caller bug and panics; an offset or length
    /// running past the strings region is [`TokenizerError::Corrupted`].
    pub fn get(&self, index: u32) -> Result<&'a [u8]> {
        assert!(
            index < self.element_count,
            "string index {index} out of range ({} entries)",
            self.element_count
        );

        let offset_pos = index as usize * 4;
        let offset =
            BufferReader::new(&self.offsets[offset_pos..offset_pos + 4]).read_u32()? as usize;
        let record = self.strings.get(offset..).ok_or_else(|| {
            TokenizerError::Corrupted(format!(
                "string {index} offset {offset} outside strings region of {} bytes",
                self.strings.len()
            ))
        })?;
        BufferReader::new(record).read_short_bytes()
    }

    /// Iterate the stored strings in index order.
    pub fn iter(&self) -> impl Iterator<Item = Result<&'a [u8]>> + '_ {
        (0..self.element_count).map(|index| self.get(index))
    }

    /// Serialize `items` as a string-table artifact appended to `buffer`;
    /// returns the artifact's size in bytes.
    pub fn write_to_buffer<S: AsRef<[u8]>>(items: &[S], buffer: &mut Vec<u8>) -> usize {
        let mut offsets = Vec::with_capacity(items.len());
        let mut strings_size = 0usize;
        for item in items {
            offsets.push(strings_size as u32);
            strings_size += item.as_ref().len() + 1;
        }

        let buffer_size = HEADER_BYTES + items.len() * 4 + strings_size;

        let mut writer = BufferWriter::new(buffer);
        writer.write_u32(buffer_size as u32);
        writer.write_u32(items.len() as u32);
        for offset in offsets {
            writer.write_u32(offset);
        }
        for item in items {
            writer.write_short_bytes(item.as_ref());
        }

        buffer_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_attach_get() {
        let items: Vec<&[u8]> = vec![b"hello", b"", b" world", b"!"];
        let mut buffer = Vec::new();
        let written = StringTable::write_to_buffer(&items, &mut buffer);
        assert_eq!(written, buffer.len());

        let (table, consumed) = StringTable::attach(&buffer).unwrap();
        assert_eq!(consumed, written);
        assert_eq!(table.len(), 4);
        for (index, item) in items.iter().enumerate() {
            assert_eq!(table.get(index as u32).unwrap(), *item);
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_index_panics() {
        let mut buffer = Vec::new();
        StringTable::write_to_buffer(&[b"one".as_slice()], &mut buffer);
        let (table, _) = StringTable::attach(&buffer).unwrap();

        let _ = table.get(1);
    }

    #[test]
    fn test_max_length_entry() {
        let long = vec![b'x'; 255];
        let mut buffer = Vec::new();
        StringTable::write_to_buffer(&[long.clone()], &mut buffer);
        let (table, _) = StringTable::attach(&buffer).unwrap();
        assert_eq!(table.get(0).unwrap(), long.as_slice());
    }

    #[test]
    fn test_empty_table() {
        let mut buffer = Vec::new();
        let written = StringTable::write_to_buffer::<&[u8]>(&[], &mut buffer);
        let (table, consumed) = StringTable::attach(&buffer).unwrap();
        assert_eq!(consumed, written);
        assert!(table.is_empty());
    }

    #[test]
    fn test_attach_rejects_truncated_buffer() {
        let mut buffer = Vec::new();
        StringTable::write_to_buffer(&[b"hello".as_slice()], &mut buffer);
        buffer.truncate(buffer.len() - 3);
        assert!(StringTable::attach(&buffer).is_err());
    }

    #[test]
    fn test_attach_consumes_only_own_artifact() {
        let mut buffer = Vec::new();
        let first = StringTable::write_to_buffer(&[b"a".as_slice(), b"b"], &mut buffer);
        StringTable::write_to_buffer(&[b"tail".as_slice()], &mut buffer);

        let (_, consumed) = StringTable::attach(&buffer).unwrap();
        assert_eq!(consumed, first);
        let (second, _) = StringTable::attach(&buffer[consumed..]).unwrap();
        assert_eq!(second.get(0).unwrap(), b"tail");
    }

    #[test]
    fn test_iter() {
        let items: Vec<&[u8]> = vec![b"a", b"bc", b"def"];
        let mut buffer = Vec::new();
        StringTable::write_to_buffer(&items, &mut buffer);
        let (table, _) = StringTable::attach(&buffer).unwrap();

        let collected: Result<Vec<_>> = table.iter().collect();
        assert_eq!(collected.unwrap(), items);
    }
}
