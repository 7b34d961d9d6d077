use crate::jvm::{Error, Serialize};
use crate::util::{Blob, BlobBuilder};

/// Width of the count that prefixes a table
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CountWidth {
    U1,
    U2,
}

impl CountWidth {
    pub fn limit(self) -> usize {
        match self {
            CountWidth::U1 => u8::MAX as usize,
            CountWidth::U2 => u16::MAX as usize,
        }
    }
}

/// Count-prefixed table of entries
///
/// The count is reserved up front and re-patched after every entry, so the table is well-formed
/// at all times and entries can be streamed in without knowing how many there will be.
pub struct TableEncoder<'a> {
    buffer: &'a mut BlobBuilder,
    count: Blob,
    width: CountWidth,
    len: usize,

    /// Name of the table, for error messages
    table: &'static str,
}

impl<'a> TableEncoder<'a> {
    pub fn new(buffer: &'a mut BlobBuilder, width: CountWidth, table: &'static str) -> Self {
        let count = match width {
            CountWidth::U1 => buffer.reserve_bytes(1),
            CountWidth::U2 => buffer.reserve_bytes(2),
        };
        TableEncoder {
            buffer,
            count,
            width,
            len: 0,
            table,
        }
    }

    /// Number of entries so far
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Start a new entry, returning the buffer into which the entry should be written
    pub fn entry(&mut self) -> Result<&mut BlobBuilder, Error> {
        if self.len >= self.width.limit() {
            return Err(Error::TableOverflow {
                table: self.table,
                limit: self.width.limit(),
            });
        }
        self.len += 1;
        match self.width {
            CountWidth::U1 => self.buffer.patch_u8(self.count, self.len as u8),
            CountWidth::U2 => self.buffer.patch_u16(self.count, self.len as u16),
        }
        Ok(&mut *self.buffer)
    }

    /// Add an entry with a fixed shape
    pub fn push<T: Serialize + ?Sized>(&mut self, entry: &T) -> Result<(), Error> {
        entry.serialize(self.entry()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn count_tracks_entries() -> Result<(), Error> {
        let mut buffer = BlobBuilder::new();
        let mut table = TableEncoder::new(&mut buffer, CountWidth::U2, "test");
        assert!(table.is_empty());
        table.push(&7u16)?;
        table.entry()?.push_u8(9);
        assert_eq!(table.len(), 2);
        assert_eq!(buffer.to_vec(), vec![0, 2, 0, 7, 9]);
        Ok(())
    }

    #[test]
    fn empty_table_has_zero_count() {
        let mut buffer = BlobBuilder::new();
        TableEncoder::new(&mut buffer, CountWidth::U1, "test");
        assert_eq!(buffer.to_vec(), vec![0]);
    }

    #[test]
    fn narrow_count_overflow() -> Result<(), Error> {
        let mut buffer = BlobBuilder::new();
        let mut table = TableEncoder::new(&mut buffer, CountWidth::U1, "parameters");
        for i in 0..255u8 {
            table.push(&i)?;
        }
        let err = table.push(&0u8).unwrap_err();
        assert!(matches!(
            err,
            Error::TableOverflow {
                table: "parameters",
                limit: 255
            }
        ));
        assert!(err.is_format_error());
        assert_eq!(buffer.to_vec()[0], 255);
        Ok(())
    }
}
