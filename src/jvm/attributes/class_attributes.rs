use super::{names, write_table, AttributeTableEncoder, CountWidth};
use crate::jvm::constants::{
    encode_modified_utf8_unbounded, ClassConstantIndex, ConstantIndex, ConstantsPool,
    MethodHandleConstantIndex, NameAndTypeConstantIndex, PackageConstantIndex, Utf8ConstantIndex,
};
use crate::jvm::{Error, InnerClassAccessFlags, Serialize};
use crate::util::BlobBuilder;
use byteorder::WriteBytesExt;

/// Entry in the `InnerClasses` attribute
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.6
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct InnerClass {
    pub inner_class: ClassConstantIndex,

    /// Enclosing class (`NONE` for local and anonymous classes)
    pub outer_class: ClassConstantIndex,

    /// Simple name (`NONE` for anonymous classes)
    pub inner_name: Utf8ConstantIndex,
    pub access_flags: InnerClassAccessFlags,
}

impl Serialize for InnerClass {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.inner_class.serialize(writer)?;
        self.outer_class.serialize(writer)?;
        self.inner_name.serialize(writer)?;
        self.access_flags.serialize(writer)?;
        Ok(())
    }
}

/// Entry in the `BootstrapMethods` attribute
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.23
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BootstrapMethod {
    pub method: MethodHandleConstantIndex,
    pub arguments: Vec<ConstantIndex>,
}

/// Attributes found on classes
impl<'a> AttributeTableEncoder<'a> {
    pub fn inner_classes<I>(&mut self, pool: &mut ConstantsPool, classes: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = InnerClass>,
    {
        self.table(pool, names::INNER_CLASSES, CountWidth::U2, classes)
    }

    /// Add an `EnclosingMethod` attribute (for local and anonymous classes)
    ///
    /// The method is `NONE` if the class isn't immediately enclosed by a method or constructor.
    pub fn enclosing_method(
        &mut self,
        pool: &mut ConstantsPool,
        class: ClassConstantIndex,
        method: NameAndTypeConstantIndex,
    ) -> Result<(), Error> {
        let name = pool.get_utf8(names::ENCLOSING_METHOD)?;
        let mut body = BlobBuilder::new();
        body.push_u16(class.slot());
        body.push_u16(method.slot());
        self.attribute(name, body)
    }

    pub fn source_file(&mut self, pool: &mut ConstantsPool, file_name: &str) -> Result<(), Error> {
        let file_name = pool.get_utf8(file_name)?;
        self.fixed(pool, names::SOURCE_FILE, &file_name)
    }

    /// Add a `SourceDebugExtension` attribute
    ///
    /// The contents are stored in modified UTF-8, but with no `u2` length prefix (the attribute
    /// length is the only length).
    pub fn source_debug_extension(
        &mut self,
        pool: &mut ConstantsPool,
        debug_extension: &str,
    ) -> Result<(), Error> {
        let name = pool.get_utf8(names::SOURCE_DEBUG_EXTENSION)?;
        let mut body = BlobBuilder::new();
        body.push_bytes(&encode_modified_utf8_unbounded(
            debug_extension,
            pool.version(),
        ));
        self.attribute(name, body)
    }

    pub fn bootstrap_methods<I>(
        &mut self,
        pool: &mut ConstantsPool,
        methods: I,
    ) -> Result<(), Error>
    where
        I: IntoIterator<Item = BootstrapMethod>,
    {
        let name = pool.get_utf8(names::BOOTSTRAP_METHODS)?;
        let mut body = BlobBuilder::new();
        write_table(
            &mut body,
            CountWidth::U2,
            names::BOOTSTRAP_METHODS,
            methods,
            |buffer, method| {
                buffer.push_u16(method.method.slot());
                write_table(
                    buffer,
                    CountWidth::U2,
                    "bootstrap_arguments",
                    method.arguments,
                    |buffer, argument| {
                        buffer.push_u16(argument.slot());
                        Ok(())
                    },
                )
            },
        )?;
        self.attribute(name, body)
    }

    pub fn nest_host(
        &mut self,
        pool: &mut ConstantsPool,
        host: ClassConstantIndex,
    ) -> Result<(), Error> {
        self.fixed(pool, names::NEST_HOST, &host)
    }

    pub fn nest_members<I>(&mut self, pool: &mut ConstantsPool, members: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = ClassConstantIndex>,
    {
        self.table(pool, names::NEST_MEMBERS, CountWidth::U2, members)
    }

    /// Add a `PermittedSubclasses` attribute (for sealed classes)
    pub fn permitted_subclasses<I>(
        &mut self,
        pool: &mut ConstantsPool,
        subclasses: I,
    ) -> Result<(), Error>
    where
        I: IntoIterator<Item = ClassConstantIndex>,
    {
        self.table(pool, names::PERMITTED_SUBCLASSES, CountWidth::U2, subclasses)
    }

    /// Add a `ModulePackages` attribute, listing every package of a module
    pub fn module_packages<I>(&mut self, pool: &mut ConstantsPool, packages: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = PackageConstantIndex>,
    {
        self.table(pool, names::MODULE_PACKAGES, CountWidth::U2, packages)
    }

    pub fn module_main_class(
        &mut self,
        pool: &mut ConstantsPool,
        main_class: ClassConstantIndex,
    ) -> Result<(), Error> {
        self.fixed(pool, names::MODULE_MAIN_CLASS, &main_class)
    }
}
