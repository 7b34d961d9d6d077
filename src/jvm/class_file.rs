//! Whole class files
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.1

use super::attributes::AttributeTableEncoder;
use super::constants::{ClassConstantIndex, ConstantsPool};
use super::{
    ClassAccessFlags, Error, FieldAccessFlags, MethodAccessFlags, Serialize, Version,
};
use crate::util::{Blob, BlobBuilder};
use std::fs;
use std::path::Path;

/// Magic header bytes that go at the front of the serialized class file
pub const MAGIC: [u8; 4] = [0xCA, 0xFE, 0xBA, 0xBE];

/// Members (fields or methods) of a class, each written out as soon as it is declared
struct MemberTable {
    buffer: BlobBuilder,
    count: Blob,
    len: u16,

    /// Name of the table, for error messages
    table: &'static str,
}

impl MemberTable {
    fn new(table: &'static str) -> MemberTable {
        let mut buffer = BlobBuilder::new();
        let count = buffer.reserve_bytes(2);
        MemberTable {
            buffer,
            count,
            len: 0,
            table,
        }
    }

    fn member<F>(
        &mut self,
        pool: &mut ConstantsPool,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        attributes: F,
    ) -> Result<(), Error>
    where
        F: FnOnce(&mut AttributeTableEncoder, &mut ConstantsPool) -> Result<(), Error>,
    {
        if self.len == u16::MAX {
            return Err(Error::TableOverflow {
                table: self.table,
                limit: u16::MAX as usize,
            });
        }
        let name = pool.get_utf8(name)?;
        let descriptor = pool.get_utf8(descriptor)?;

        // Only linked in once the attributes are complete, so a failed member leaves no trace
        let mut member = BlobBuilder::new();
        member.push_u16(access_flags);
        member.push_u16(name.slot());
        member.push_u16(descriptor.slot());
        attributes(&mut AttributeTableEncoder::new(&mut member), pool)?;

        self.buffer.link_suffix(member);
        self.len += 1;
        self.buffer.patch_u16(self.count, self.len);
        Ok(())
    }
}

/// Builder for a single class file
///
/// The constant pool is owned by the builder and shared by every field, method, and attribute
/// added. Fields and methods are written out as they get added, so the only thing left to do when
/// finishing is to stitch the pieces together behind the constant pool.
pub struct ClassFileBuilder {
    pub constants: ConstantsPool,
    access_flags: ClassAccessFlags,
    this_class: ClassConstantIndex,
    super_class: ClassConstantIndex,
    interfaces: Vec<ClassConstantIndex>,
    fields: MemberTable,
    methods: MemberTable,
    attributes: BlobBuilder,
    attributes_count: Blob,
    attributes_len: u16,
}

impl ClassFileBuilder {
    /// Start a new class
    ///
    /// Only `java/lang/Object` (and `module-info`) has no superclass.
    pub fn new(
        version: Version,
        access_flags: ClassAccessFlags,
        this_class: &str,
        super_class: Option<&str>,
    ) -> Result<ClassFileBuilder, Error> {
        let mut constants = ConstantsPool::new(version);
        let this_class = constants.get_class(this_class)?;
        let super_class = match super_class {
            Some(super_class) => constants.get_class(super_class)?,
            None => ClassConstantIndex::NONE,
        };

        let mut attributes = BlobBuilder::new();
        let attributes_count = attributes.reserve_bytes(2);

        Ok(ClassFileBuilder {
            constants,
            access_flags,
            this_class,
            super_class,
            interfaces: vec![],
            fields: MemberTable::new("fields"),
            methods: MemberTable::new("methods"),
            attributes,
            attributes_count,
            attributes_len: 0,
        })
    }

    pub fn this_class(&self) -> ClassConstantIndex {
        self.this_class
    }

    pub fn super_class(&self) -> ClassConstantIndex {
        self.super_class
    }

    /// Add an interface implemented by the class (or extended by the interface)
    pub fn interface(&mut self, name: &str) -> Result<ClassConstantIndex, Error> {
        if self.interfaces.len() >= u16::MAX as usize {
            return Err(Error::TableOverflow {
                table: "interfaces",
                limit: u16::MAX as usize,
            });
        }
        let interface = self.constants.get_class(name)?;
        self.interfaces.push(interface);
        Ok(interface)
    }

    /// Declare a field, with its attributes added by the callback
    pub fn field<F>(
        &mut self,
        access_flags: FieldAccessFlags,
        name: &str,
        descriptor: &str,
        attributes: F,
    ) -> Result<(), Error>
    where
        F: FnOnce(&mut AttributeTableEncoder, &mut ConstantsPool) -> Result<(), Error>,
    {
        log::trace!("Adding field {} {}", name, descriptor);
        self.fields.member(
            &mut self.constants,
            access_flags.bits(),
            name,
            descriptor,
            attributes,
        )
    }

    /// Declare a method, with its attributes (including `Code`) added by the callback
    pub fn method<F>(
        &mut self,
        access_flags: MethodAccessFlags,
        name: &str,
        descriptor: &str,
        attributes: F,
    ) -> Result<(), Error>
    where
        F: FnOnce(&mut AttributeTableEncoder, &mut ConstantsPool) -> Result<(), Error>,
    {
        log::trace!("Adding method {}{}", name, descriptor);
        self.methods.member(
            &mut self.constants,
            access_flags.bits(),
            name,
            descriptor,
            attributes,
        )
    }

    /// Add class attributes (this can be called more than once)
    pub fn attributes<F>(&mut self, attributes: F) -> Result<(), Error>
    where
        F: FnOnce(&mut AttributeTableEncoder, &mut ConstantsPool) -> Result<(), Error>,
    {
        let mut table = AttributeTableEncoder::resume(
            &mut self.attributes,
            self.attributes_count,
            self.attributes_len,
        );
        let result = attributes(&mut table, &mut self.constants);
        self.attributes_len = table.len();
        result
    }

    /// Stitch together the final class file
    pub fn finish(self) -> Result<ClassFile, Error> {
        let mut output = BlobBuilder::new();
        output.push_bytes(&MAGIC);
        self.constants.version().serialize(&mut output)?;

        let constants_len = self.constants.len();
        self.constants.serialize_into(&mut output);

        self.access_flags.push_to(&mut output);
        output.push_u16(self.this_class.slot());
        output.push_u16(self.super_class.slot());
        self.interfaces[..].serialize(&mut output)?;
        let (fields, methods) = (self.fields.len, self.methods.len);
        output.link_suffix(self.fields.buffer);
        output.link_suffix(self.methods.buffer);
        output.link_suffix(self.attributes);

        log::debug!(
            "Finished class: {} constants, {} fields, {} methods, {} attributes, {} bytes",
            constants_len,
            fields,
            methods,
            self.attributes_len,
            output.len()
        );
        Ok(ClassFile {
            bytes: output.to_vec(),
        })
    }
}

/// Serialized class file
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ClassFile {
    bytes: Vec<u8>,
}

impl ClassFile {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Write the class file to disk
    pub fn save_to_path<P: AsRef<Path>>(
        &self,
        path: P,
        create_missing_directories: bool,
    ) -> std::io::Result<()> {
        let path = path.as_ref();
        if create_missing_directories {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, &self.bytes)
    }
}
