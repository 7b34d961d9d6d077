use super::{names, CountWidth, TableEncoder};
use crate::jvm::constants::{ConstantsPool, Utf8ConstantIndex};
use crate::jvm::{Error, Serialize};
use crate::util::{Blob, BlobBuilder};

/// Table of attributes (used in classes, fields, methods, and even on some attributes)
///
/// Every attribute is stored in the same way: a name, a `u4` length, and then the body. The body
/// of an attribute is built up in its own [`BlobBuilder`] and then linked in, so the length is
/// known without copying anything. The `u2` count in front of the table is kept up to date as
/// attributes are added.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7
pub struct AttributeTableEncoder<'a> {
    buffer: &'a mut BlobBuilder,
    count: Blob,
    len: u16,
}

impl<'a> AttributeTableEncoder<'a> {
    pub fn new(buffer: &'a mut BlobBuilder) -> AttributeTableEncoder<'a> {
        let count = buffer.reserve_bytes(2);
        AttributeTableEncoder {
            buffer,
            count,
            len: 0,
        }
    }

    /// Continue adding to a table whose count was reserved earlier
    pub(crate) fn resume(
        buffer: &'a mut BlobBuilder,
        count: Blob,
        len: u16,
    ) -> AttributeTableEncoder<'a> {
        AttributeTableEncoder { buffer, count, len }
    }

    /// Number of attributes so far
    pub fn len(&self) -> u16 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Add an attribute with an arbitrary body
    pub fn attribute(&mut self, name: Utf8ConstantIndex, body: BlobBuilder) -> Result<(), Error> {
        if self.len == u16::MAX {
            return Err(Error::TableOverflow {
                table: "attributes",
                limit: u16::MAX as usize,
            });
        }
        let length = u32::try_from(body.len()).map_err(|_| Error::TableOverflow {
            table: "attribute_info",
            limit: u32::MAX as usize,
        })?;

        self.buffer.push_u16(name.slot());
        self.buffer.push_u32(length);
        self.buffer.link_suffix(body);
        self.len += 1;
        self.buffer.patch_u16(self.count, self.len);
        Ok(())
    }

    /// Add an attribute that isn't one of the predefined ones
    pub fn custom(
        &mut self,
        pool: &mut ConstantsPool,
        name: &str,
        body: BlobBuilder,
    ) -> Result<(), Error> {
        let name = pool.get_utf8(name)?;
        self.attribute(name, body)
    }

    /// Add an attribute whose body is a single fixed-shape value
    pub(super) fn fixed<T: Serialize + ?Sized>(
        &mut self,
        pool: &mut ConstantsPool,
        name: &str,
        value: &T,
    ) -> Result<(), Error> {
        let name = pool.get_utf8(name)?;
        let mut body = BlobBuilder::new();
        value.serialize(&mut body)?;
        self.attribute(name, body)
    }

    /// Add an attribute whose body is just a count-prefixed table
    pub(super) fn table<T, I>(
        &mut self,
        pool: &mut ConstantsPool,
        name: &'static str,
        width: CountWidth,
        entries: I,
    ) -> Result<(), Error>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        let name_index = pool.get_utf8(name)?;
        let mut body = BlobBuilder::new();
        let mut table = TableEncoder::new(&mut body, width, name);
        for entry in entries {
            table.push(&entry)?;
        }
        self.attribute(name_index, body)
    }

    /// Mark something as not appearing in source code
    pub fn synthetic(&mut self, pool: &mut ConstantsPool) -> Result<(), Error> {
        self.custom(pool, names::SYNTHETIC, BlobBuilder::new())
    }

    pub fn deprecated(&mut self, pool: &mut ConstantsPool) -> Result<(), Error> {
        self.custom(pool, names::DEPRECATED, BlobBuilder::new())
    }

    /// Generic signature of a class, method, field, or record component
    pub fn signature(&mut self, pool: &mut ConstantsPool, signature: &str) -> Result<(), Error> {
        let signature = pool.get_utf8(signature)?;
        self.fixed(pool, names::SIGNATURE, &signature)
    }
}
