use super::{names, AttributeTableEncoder, CountWidth, TableEncoder};
use crate::jvm::code::{write_exception_table, MethodBody};
use crate::jvm::constants::{
    ClassConstantIndex, ConstantIndex, ConstantKind, ConstantsPool, Utf8ConstantIndex,
};
use crate::jvm::{Error, MethodParameterAccessFlags, Serialize};
use crate::util::BlobBuilder;
use byteorder::WriteBytesExt;
use std::convert::TryFrom;

/// Entry in the `MethodParameters` attribute
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.24
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct MethodParameter {
    /// Name of the parameter (`NONE` for a nameless parameter)
    pub name: Utf8ConstantIndex,
    pub access_flags: MethodParameterAccessFlags,
}

impl Serialize for MethodParameter {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.name.serialize(writer)?;
        self.access_flags.serialize(writer)?;
        Ok(())
    }
}

/// Entry in the `LineNumberTable` attribute
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct LineNumber {
    /// Offset in the code at which the line starts
    pub start_pc: u16,
    pub line_number: u16,
}

impl Serialize for LineNumber {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.start_pc.serialize(writer)?;
        self.line_number.serialize(writer)?;
        Ok(())
    }
}

/// Entry in the `LocalVariableTable` or `LocalVariableTypeTable` attributes
///
/// In the type table, `descriptor` is a generic signature instead of a field descriptor.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct LocalVariable {
    pub start_pc: u16,
    pub length: u16,
    pub name: Utf8ConstantIndex,
    pub descriptor: Utf8ConstantIndex,

    /// Local variable slot
    pub index: u16,
}

impl Serialize for LocalVariable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.start_pc.serialize(writer)?;
        self.length.serialize(writer)?;
        self.name.serialize(writer)?;
        self.descriptor.serialize(writer)?;
        self.index.serialize(writer)?;
        Ok(())
    }
}

/// Attributes found on fields, methods, and inside of `Code`
impl<'a> AttributeTableEncoder<'a> {
    /// Add a `Code` attribute
    ///
    /// The `nested` callback gets to add attributes to the table that is inside the code
    /// attribute (line numbers, local variables, stack map frames, ...).
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.3
    pub fn code<F>(
        &mut self,
        pool: &mut ConstantsPool,
        max_stack: u16,
        max_locals: u16,
        body: MethodBody,
        nested: F,
    ) -> Result<(), Error>
    where
        F: FnOnce(&mut AttributeTableEncoder, &mut ConstantsPool) -> Result<(), Error>,
    {
        let name = pool.get_utf8(names::CODE)?;
        let code_len = u32::try_from(body.code_len())
            .ok()
            .filter(|len| *len <= u16::MAX as u32)
            .ok_or(Error::MethodCodeOverflow(body.code_len()))?;

        let mut buffer = BlobBuilder::new();
        buffer.push_u16(max_stack);
        buffer.push_u16(max_locals);
        buffer.push_u32(code_len);
        buffer.link_suffix(body.code);
        write_exception_table(&body.exception_table, &mut buffer)?;
        nested(&mut AttributeTableEncoder::new(&mut buffer), pool)?;

        log::trace!("Code attribute with {} bytes of code", code_len);
        self.attribute(name, buffer)
    }

    /// Add a `ConstantValue` attribute (for `static final` fields)
    pub fn constant_value<K: ConstantKind>(
        &mut self,
        pool: &mut ConstantsPool,
        value: ConstantIndex<K>,
    ) -> Result<(), Error> {
        self.fixed(pool, names::CONSTANT_VALUE, &value)
    }

    /// Add an `Exceptions` attribute, listing the checked exceptions a method may throw
    pub fn exceptions<I>(&mut self, pool: &mut ConstantsPool, exceptions: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = ClassConstantIndex>,
    {
        self.table(pool, names::EXCEPTIONS, CountWidth::U2, exceptions)
    }

    /// Add a `MethodParameters` attribute (at most 255 parameters)
    pub fn method_parameters<I>(
        &mut self,
        pool: &mut ConstantsPool,
        parameters: I,
    ) -> Result<(), Error>
    where
        I: IntoIterator<Item = MethodParameter>,
    {
        self.table(pool, names::METHOD_PARAMETERS, CountWidth::U1, parameters)
    }

    pub fn line_number_table<I>(&mut self, pool: &mut ConstantsPool, lines: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = LineNumber>,
    {
        self.table(pool, names::LINE_NUMBER_TABLE, CountWidth::U2, lines)
    }

    pub fn local_variable_table<I>(
        &mut self,
        pool: &mut ConstantsPool,
        variables: I,
    ) -> Result<(), Error>
    where
        I: IntoIterator<Item = LocalVariable>,
    {
        self.table(pool, names::LOCAL_VARIABLE_TABLE, CountWidth::U2, variables)
    }

    pub fn local_variable_type_table<I>(
        &mut self,
        pool: &mut ConstantsPool,
        variables: I,
    ) -> Result<(), Error>
    where
        I: IntoIterator<Item = LocalVariable>,
    {
        self.table(
            pool,
            names::LOCAL_VARIABLE_TYPE_TABLE,
            CountWidth::U2,
            variables,
        )
    }
}

/// Write a table of entries whose serialization needs a callback
pub(super) fn write_table<T, I, F>(
    buffer: &mut BlobBuilder,
    width: CountWidth,
    table: &'static str,
    entries: I,
    mut write: F,
) -> Result<(), Error>
where
    I: IntoIterator<Item = T>,
    F: FnMut(&mut BlobBuilder, T) -> Result<(), Error>,
{
    let mut encoder = TableEncoder::new(buffer, width, table);
    for entry in entries {
        write(encoder.entry()?, entry)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{InstructionEncoder, Opcode};
    use crate::jvm::Version;

    #[test]
    fn code_attribute() -> Result<(), Error> {
        let mut pool = ConstantsPool::new(Version::JAVA8);
        let mut code = InstructionEncoder::new();
        let start = code.here()?;
        let end = code.define_label();
        code.op(Opcode::IConst1)?;
        code.op(Opcode::IReturn)?;
        code.mark_label(end)?;
        code.op(Opcode::Nop)?;
        code.add_exception_handler(start, end, end, ClassConstantIndex::NONE)?;
        let body = code.finish()?;

        let mut buffer = BlobBuilder::new();
        let mut attributes = AttributeTableEncoder::new(&mut buffer);
        attributes.code(&mut pool, 1, 2, body, |nested, pool| {
            nested.line_number_table(
                pool,
                vec![LineNumber {
                    start_pc: 0,
                    line_number: 42,
                }],
            )
        })?;

        let code_name = pool.get_utf8(names::CODE)?.slot() as u8;
        let lines_name = pool.get_utf8(names::LINE_NUMBER_TABLE)?.slot() as u8;
        assert_eq!(
            buffer.to_vec(),
            vec![
                0, 1, // attribute count
                0, code_name, 0, 0, 0, 35, // Code header
                0, 1, 0, 2, // max stack, max locals
                0, 0, 0, 3, 0x04, 0xac, 0x00, // code
                0, 1, 0, 0, 0, 2, 0, 2, 0, 0, // exception table
                0, 1, // nested attribute count
                0, lines_name, 0, 0, 0, 6, 0, 1, 0, 0, 0, 42, // line numbers
            ]
        );
        Ok(())
    }

    #[test]
    fn member_tables() -> Result<(), Error> {
        let mut pool = ConstantsPool::new(Version::JAVA8);
        let exception = pool.get_class("java/io/IOException")?;
        let value = pool.get_integer(7)?;
        let param = pool.get_utf8("x")?;

        let mut buffer = BlobBuilder::new();
        let mut attributes = AttributeTableEncoder::new(&mut buffer);
        attributes.exceptions(&mut pool, vec![exception])?;
        attributes.constant_value(&mut pool, value)?;
        attributes.method_parameters(
            &mut pool,
            vec![MethodParameter {
                name: param,
                access_flags: MethodParameterAccessFlags::FINAL,
            }],
        )?;
        assert_eq!(attributes.len(), 3);

        let bytes = buffer.to_vec();
        let exceptions = pool.get_utf8(names::EXCEPTIONS)?.slot() as u8;
        assert_eq!(
            &bytes[2..12],
            &[0, exceptions, 0, 0, 0, 4, 0, 1, 0, exception.slot() as u8]
        );
        assert_eq!(&bytes[14..20], &[0, 0, 0, 2, 0, value.slot() as u8]);
        // `u1` parameter count
        assert_eq!(&bytes[22..], &[0, 0, 0, 5, 1, 0, param.slot() as u8, 0, 0x10]);
        Ok(())
    }

    #[test]
    fn too_many_parameters() -> Result<(), Error> {
        let mut pool = ConstantsPool::new(Version::JAVA8);
        let mut buffer = BlobBuilder::new();
        let mut attributes = AttributeTableEncoder::new(&mut buffer);
        let parameter = MethodParameter {
            name: Utf8ConstantIndex::NONE,
            access_flags: MethodParameterAccessFlags::empty(),
        };
        let result = attributes.method_parameters(&mut pool, vec![parameter; 256]);
        assert!(matches!(
            result,
            Err(Error::TableOverflow {
                table: names::METHOD_PARAMETERS,
                limit: 255
            })
        ));
        assert!(attributes.is_empty());
        Ok(())
    }
}
