//! Re-encode method bodies from one constant pool into another
//!
//! Copying a method out of an existing class file into a new class means that every reference to
//! the old constant pool has to be rewritten into a reference to the new pool. This happens in the
//! instructions, in the exception table, and in the attributes nested inside `Code` that are
//! understood here. Unknown nested attributes are copied as-is with a warning.
//!
//! Instructions keep their size, so branch offsets and switch padding stay valid and can be copied
//! as-is. The one wrinkle is `ldc`: its operand is a single byte, and widening it to `ldc_w` would
//! shift every instruction after it. Instead, translation fails if the constant lands past slot
//! 255 of the new pool.

use super::attributes::{
    names, Annotation, AttributeTableEncoder, ElementValue, LineNumber, LocalVariable,
    LocalVariableTarget, StackMapFrame, TargetInfo, TypeAnnotation, TypePathEntry,
    VerificationType,
};
use super::code::{Opcode, OpcodeKind, MAX_CODE_LEN};
use super::constants::{kind, ConstantData, ConstantPoolTag, ConstantView, ConstantsPool};
use super::Error;
use crate::util::BlobBuilder;
use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use std::convert::TryFrom;
use std::io::Cursor;

/// Translate the body of a `Code` attribute (everything after the attribute length)
///
/// Returns the body of the equivalent `Code` attribute for the `target` pool.
pub fn translate_code<V: ConstantView + ?Sized>(
    source: &V,
    body: &[u8],
    target: &mut ConstantsPool,
) -> Result<BlobBuilder, Error> {
    let mut reader = Reader::new(body, names::CODE);
    let max_stack = reader.u2()?;
    let max_locals = reader.u2()?;
    let code_len = reader.u4()? as usize;
    if code_len > MAX_CODE_LEN {
        return Err(Error::MethodCodeOverflow(code_len));
    }
    let code = reader.bytes(code_len)?;

    let mut output = BlobBuilder::new();
    output.push_u16(max_stack);
    output.push_u16(max_locals);
    output.push_u32(code_len as u32);
    translate_instructions(source, code, target, &mut output)?;

    // Exception table
    let handler_count = reader.u2()?;
    output.push_u16(handler_count);
    for _ in 0..handler_count {
        output.push_bytes(reader.bytes(6)?);
        let catch_type = target.import_as::<kind::Class, V>(source, reader.u2()?)?;
        output.push_u16(catch_type.slot());
    }

    // Nested attributes
    let attribute_count = reader.u2()?;
    let mut attributes = AttributeTableEncoder::new(&mut output);
    for _ in 0..attribute_count {
        let name_index = reader.u2()?;
        let length = reader.u4()? as usize;
        let info = reader.bytes(length)?;
        let name = match source.constant(name_index)? {
            ConstantData::Utf8(name) => name,
            other => {
                return Err(Error::BadConstantKind {
                    index: name_index,
                    expected: ConstantPoolTag::Utf8,
                    actual: other.tag(),
                })
            }
        };
        translate_nested_attribute(source, &name, info, target, &mut attributes)?;
    }
    reader.finish()?;

    log::debug!(
        "Translated {} bytes of code, {} exception handlers, {} nested attributes",
        code_len,
        handler_count,
        attribute_count
    );
    Ok(output)
}

fn malformed_code(offset: usize, reason: impl Into<String>) -> Error {
    Error::MalformedCode {
        offset,
        reason: reason.into(),
    }
}

/// Length of the instruction starting at `pc`
fn instruction_len(code: &[u8], pc: usize, opcode: Opcode) -> Result<usize, Error> {
    if let Some(operands) = opcode.operands_len() {
        return Ok(1 + operands);
    }

    let read_i32 = |offset: usize| -> Result<i32, Error> {
        code.get(offset..offset + 4)
            .map(BigEndian::read_i32)
            .ok_or_else(|| malformed_code(pc, "truncated switch"))
    };
    let padding = (4 - (pc + 1) % 4) % 4;
    let operands = pc + 1 + padding;

    match opcode.kind() {
        OpcodeKind::WidePrefix => match code.get(pc + 1).copied().and_then(Opcode::from_u8) {
            Some(Opcode::IInc) => Ok(6),
            Some(modified) if modified.kind() == OpcodeKind::LocalIndex => Ok(4),
            _ => Err(malformed_code(pc, "`wide` does not modify a local instruction")),
        },
        OpcodeKind::TableSwitch => {
            let low = read_i32(operands + 4)? as i64;
            let high = read_i32(operands + 8)? as i64;
            if high < low - 1 {
                return Err(malformed_code(pc, "tableswitch high is below low"));
            }
            Ok(1 + padding + 12 + 4 * (high - low + 1) as usize)
        }
        OpcodeKind::LookupSwitch => {
            let npairs = usize::try_from(read_i32(operands + 4)?)
                .map_err(|_| malformed_code(pc, "negative lookupswitch npairs"))?;
            Ok(1 + padding + 8 + 8 * npairs)
        }
        _ => unreachable!("instruction with fixed length"),
    }
}

fn translate_instructions<V: ConstantView + ?Sized>(
    source: &V,
    code: &[u8],
    target: &mut ConstantsPool,
    output: &mut BlobBuilder,
) -> Result<(), Error> {
    let mut pc = 0;
    while pc < code.len() {
        let opcode = Opcode::from_u8(code[pc])
            .ok_or_else(|| malformed_code(pc, format!("unknown opcode 0x{:02x}", code[pc])))?;
        let len = instruction_len(code, pc, opcode)?;
        let instruction = code
            .get(pc..pc + len)
            .ok_or_else(|| malformed_code(pc, format!("truncated `{}`", opcode)))?;

        match opcode.kind() {
            OpcodeKind::ConstantRef
            | OpcodeKind::MultiANewArray
            | OpcodeKind::InvokeInterface
            | OpcodeKind::InvokeDynamic => {
                let index = BigEndian::read_u16(&instruction[1..3]);
                let remapped = target.import(source, index)?;
                output.push_u8(instruction[0]);
                output.push_u16(remapped.slot());
                output.push_bytes(&instruction[3..]);
            }
            OpcodeKind::NarrowConstantRef => {
                let remapped = target.import(source, instruction[1] as u16)?;
                let index = u8::try_from(remapped.slot()).map_err(|_| {
                    Error::NarrowConstantOverflow {
                        opcode,
                        index: remapped.slot(),
                    }
                })?;
                output.push_u8(instruction[0]);
                output.push_u8(index);
            }

            // Offsets are relative and nothing moves, so the rest is copied
            _ => output.push_bytes(instruction),
        }
        pc += len;
    }
    Ok(())
}

fn translate_nested_attribute<V: ConstantView + ?Sized>(
    source: &V,
    name: &str,
    info: &[u8],
    target: &mut ConstantsPool,
    attributes: &mut AttributeTableEncoder,
) -> Result<(), Error> {
    match name {
        names::LINE_NUMBER_TABLE => {
            let mut reader = Reader::new(info, names::LINE_NUMBER_TABLE);
            let mut lines = vec![];
            for _ in 0..reader.u2()? {
                lines.push(LineNumber {
                    start_pc: reader.u2()?,
                    line_number: reader.u2()?,
                });
            }
            reader.finish()?;
            attributes.line_number_table(target, lines)
        }
        names::LOCAL_VARIABLE_TABLE | names::LOCAL_VARIABLE_TYPE_TABLE => {
            let table = if name == names::LOCAL_VARIABLE_TABLE {
                names::LOCAL_VARIABLE_TABLE
            } else {
                names::LOCAL_VARIABLE_TYPE_TABLE
            };
            let mut reader = Reader::new(info, table);
            let mut variables = vec![];
            for _ in 0..reader.u2()? {
                variables.push(LocalVariable {
                    start_pc: reader.u2()?,
                    length: reader.u2()?,
                    name: target.import_as::<kind::Utf8, V>(source, reader.u2()?)?,
                    descriptor: target.import_as::<kind::Utf8, V>(source, reader.u2()?)?,
                    index: reader.u2()?,
                });
            }
            reader.finish()?;
            if table == names::LOCAL_VARIABLE_TABLE {
                attributes.local_variable_table(target, variables)
            } else {
                attributes.local_variable_type_table(target, variables)
            }
        }
        names::STACK_MAP_TABLE => {
            let mut reader = Reader::new(info, names::STACK_MAP_TABLE);
            let mut frames = vec![];
            for _ in 0..reader.u2()? {
                frames.push(read_frame(&mut reader, source, target)?);
            }
            reader.finish()?;
            attributes.stack_map_table(target, &frames)
        }
        names::RUNTIME_VISIBLE_TYPE_ANNOTATIONS | names::RUNTIME_INVISIBLE_TYPE_ANNOTATIONS => {
            let table = if name == names::RUNTIME_VISIBLE_TYPE_ANNOTATIONS {
                names::RUNTIME_VISIBLE_TYPE_ANNOTATIONS
            } else {
                names::RUNTIME_INVISIBLE_TYPE_ANNOTATIONS
            };
            let mut reader = Reader::new(info, table);
            let mut annotations = vec![];
            for _ in 0..reader.u2()? {
                annotations.push(read_type_annotation(&mut reader, source, target)?);
            }
            reader.finish()?;
            if table == names::RUNTIME_VISIBLE_TYPE_ANNOTATIONS {
                attributes.runtime_visible_type_annotations(target, &annotations)
            } else {
                attributes.runtime_invisible_type_annotations(target, &annotations)
            }
        }
        _ => {
            log::warn!("Copying unrecognized `{}` attribute in `Code` as-is", name);
            let mut body = BlobBuilder::new();
            body.push_bytes(info);
            attributes.custom(target, name, body)
        }
    }
}

fn read_frame<V: ConstantView + ?Sized>(
    reader: &mut Reader,
    source: &V,
    target: &mut ConstantsPool,
) -> Result<StackMapFrame, Error> {
    let frame_type = reader.u1()?;
    let frame = match frame_type {
        0..=63 => StackMapFrame::SameLocalsNoStack {
            offset_delta: frame_type as u16,
        },
        64..=127 => StackMapFrame::SameLocalsOneStack {
            offset_delta: (frame_type - 64) as u16,
            stack_verification: read_verification_type(reader, source, target)?,
        },
        247 => StackMapFrame::SameLocalsOneStack {
            offset_delta: reader.u2()?,
            stack_verification: read_verification_type(reader, source, target)?,
        },
        248..=250 => StackMapFrame::ChoppedFrameNoStack {
            offset_delta: reader.u2()?,
            chopped_k: 251 - frame_type,
        },
        251 => StackMapFrame::SameLocalsNoStack {
            offset_delta: reader.u2()?,
        },
        252..=254 => StackMapFrame::AppendFrameNoStack {
            offset_delta: reader.u2()?,
            local_verifications: (0..frame_type - 251)
                .map(|_| read_verification_type(reader, source, target))
                .collect::<Result<Vec<_>, Error>>()?,
        },
        255 => {
            let offset_delta = reader.u2()?;
            let local_verifications = (0..reader.u2()?)
                .map(|_| read_verification_type(reader, source, target))
                .collect::<Result<Vec<_>, Error>>()?;
            let stack_verifications = (0..reader.u2()?)
                .map(|_| read_verification_type(reader, source, target))
                .collect::<Result<Vec<_>, Error>>()?;
            StackMapFrame::FullFrame {
                offset_delta,
                local_verifications,
                stack_verifications,
            }
        }
        _ => return Err(reader.malformed(format!("reserved frame type {}", frame_type))),
    };
    Ok(frame)
}

fn read_verification_type<V: ConstantView + ?Sized>(
    reader: &mut Reader,
    source: &V,
    target: &mut ConstantsPool,
) -> Result<VerificationType, Error> {
    let verification_type = match reader.u1()? {
        0 => VerificationType::Top,
        1 => VerificationType::Integer,
        2 => VerificationType::Float,
        3 => VerificationType::Double,
        4 => VerificationType::Long,
        5 => VerificationType::Null,
        6 => VerificationType::UninitializedThis,
        7 => VerificationType::Object(target.import_as::<kind::Class, V>(source, reader.u2()?)?),
        8 => VerificationType::Uninitialized(reader.u2()?),
        tag => return Err(reader.malformed(format!("unknown verification type {}", tag))),
    };
    Ok(verification_type)
}

fn read_type_annotation<V: ConstantView + ?Sized>(
    reader: &mut Reader,
    source: &V,
    target: &mut ConstantsPool,
) -> Result<TypeAnnotation, Error> {
    let target_type = reader.u1()?;
    let target_info = match target_type {
        0x00 | 0x01 => TargetInfo::TypeParameter { index: reader.u1()? },
        0x10 => TargetInfo::Supertype { index: reader.u2()? },
        0x11 | 0x12 => TargetInfo::TypeParameterBound {
            type_parameter_index: reader.u1()?,
            bound_index: reader.u1()?,
        },
        0x13..=0x15 => TargetInfo::Empty,
        0x16 => TargetInfo::FormalParameter { index: reader.u1()? },
        0x17 => TargetInfo::Throws { index: reader.u2()? },
        0x40 | 0x41 => {
            let mut ranges = vec![];
            for _ in 0..reader.u2()? {
                ranges.push(LocalVariableTarget {
                    start_pc: reader.u2()?,
                    length: reader.u2()?,
                    index: reader.u2()?,
                });
            }
            TargetInfo::LocalVariable(ranges)
        }
        0x42 => TargetInfo::Catch {
            exception_table_index: reader.u2()?,
        },
        0x43..=0x46 => TargetInfo::Offset { offset: reader.u2()? },
        0x47..=0x4b => TargetInfo::TypeArgument {
            offset: reader.u2()?,
            type_argument_index: reader.u1()?,
        },
        _ => return Err(reader.malformed(format!("unknown target type {:#04x}", target_type))),
    };

    let mut target_path = vec![];
    for _ in 0..reader.u1()? {
        target_path.push(TypePathEntry {
            type_path_kind: reader.u1()?,
            type_argument_index: reader.u1()?,
        });
    }
    Ok(TypeAnnotation {
        target_type,
        target_info,
        target_path,
        annotation: read_annotation(reader, source, target)?,
    })
}

fn read_annotation<V: ConstantView + ?Sized>(
    reader: &mut Reader,
    source: &V,
    target: &mut ConstantsPool,
) -> Result<Annotation, Error> {
    let type_index = target.import_as::<kind::Utf8, V>(source, reader.u2()?)?;
    let mut elements = vec![];
    for _ in 0..reader.u2()? {
        let name = target.import_as::<kind::Utf8, V>(source, reader.u2()?)?;
        elements.push((name, read_element_value(reader, source, target)?));
    }
    Ok(Annotation {
        type_index,
        elements,
    })
}

fn read_element_value<V: ConstantView + ?Sized>(
    reader: &mut Reader,
    source: &V,
    target: &mut ConstantsPool,
) -> Result<ElementValue, Error> {
    let value = match reader.u1()? {
        b'B' => ElementValue::Byte(target.import_as::<kind::Integer, V>(source, reader.u2()?)?),
        b'C' => ElementValue::Char(target.import_as::<kind::Integer, V>(source, reader.u2()?)?),
        b'D' => ElementValue::Double(target.import_as::<kind::Double, V>(source, reader.u2()?)?),
        b'F' => ElementValue::Float(target.import_as::<kind::Float, V>(source, reader.u2()?)?),
        b'I' => ElementValue::Int(target.import_as::<kind::Integer, V>(source, reader.u2()?)?),
        b'J' => ElementValue::Long(target.import_as::<kind::Long, V>(source, reader.u2()?)?),
        b'S' => ElementValue::Short(target.import_as::<kind::Integer, V>(source, reader.u2()?)?),
        b'Z' => ElementValue::Boolean(target.import_as::<kind::Integer, V>(source, reader.u2()?)?),
        b's' => ElementValue::String(target.import_as::<kind::Utf8, V>(source, reader.u2()?)?),
        b'e' => ElementValue::Enum {
            type_name: target.import_as::<kind::Utf8, V>(source, reader.u2()?)?,
            const_name: target.import_as::<kind::Utf8, V>(source, reader.u2()?)?,
        },
        b'c' => ElementValue::Class(target.import_as::<kind::Utf8, V>(source, reader.u2()?)?),
        b'@' => ElementValue::Annotation(read_annotation(reader, source, target)?),
        b'[' => {
            let mut values = vec![];
            for _ in 0..reader.u2()? {
                values.push(read_element_value(reader, source, target)?);
            }
            ElementValue::Array(values)
        }
        tag => return Err(reader.malformed(format!("unknown element value tag {}", tag))),
    };
    Ok(value)
}

/// Big-endian reader over the body of an attribute
struct Reader<'a> {
    cursor: Cursor<&'a [u8]>,

    /// Attribute being read, for error messages
    attribute: &'static str,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8], attribute: &'static str) -> Reader<'a> {
        Reader {
            cursor: Cursor::new(bytes),
            attribute,
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> Error {
        Error::MalformedAttribute {
            name: self.attribute.to_owned(),
            reason: reason.into(),
        }
    }

    fn truncated(&self) -> Error {
        self.malformed(format!("truncated at byte {}", self.cursor.position()))
    }

    fn u1(&mut self) -> Result<u8, Error> {
        self.cursor.read_u8().map_err(|_| self.truncated())
    }

    fn u2(&mut self) -> Result<u16, Error> {
        self.cursor
            .read_u16::<BigEndian>()
            .map_err(|_| self.truncated())
    }

    fn u4(&mut self) -> Result<u32, Error> {
        self.cursor
            .read_u32::<BigEndian>()
            .map_err(|_| self.truncated())
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], Error> {
        let bytes: &'a [u8] = *self.cursor.get_ref();
        let start = self.cursor.position() as usize;
        let slice = start
            .checked_add(len)
            .and_then(|end| bytes.get(start..end))
            .ok_or_else(|| self.truncated())?;
        self.cursor.set_position((start + len) as u64);
        Ok(slice)
    }

    /// Check that all of the attribute was consumed
    fn finish(&self) -> Result<(), Error> {
        let remaining = self.cursor.get_ref().len() as u64 - self.cursor.position();
        if remaining > 0 {
            return Err(self.malformed(format!("{} trailing bytes", remaining)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::InstructionEncoder;
    use crate::jvm::Version;

    /// Encode a method into a standalone `Code` attribute body
    fn code_body<F>(pool: &mut ConstantsPool, emit: F) -> Result<Vec<u8>, Error>
    where
        F: FnOnce(&mut InstructionEncoder, &mut ConstantsPool) -> Result<(), Error>,
    {
        let mut code = InstructionEncoder::new();
        emit(&mut code, pool)?;
        let body = code.finish()?;

        let mut buffer = BlobBuilder::new();
        let mut attributes = AttributeTableEncoder::new(&mut buffer);
        let string = pool.get_class("java/lang/String")?;
        let local = pool.get_utf8("s")?;
        let descriptor = pool.get_utf8("Ljava/lang/String;")?;
        attributes.code(pool, 2, 1, body, |nested, pool| {
            nested.line_number_table(
                pool,
                vec![LineNumber {
                    start_pc: 0,
                    line_number: 3,
                }],
            )?;
            nested.local_variable_table(
                pool,
                vec![LocalVariable {
                    start_pc: 0,
                    length: 1,
                    name: local,
                    descriptor,
                    index: 0,
                }],
            )?;
            nested.stack_map_table(
                pool,
                &[StackMapFrame::FullFrame {
                    offset_delta: 0,
                    local_verifications: vec![VerificationType::Object(string)],
                    stack_verifications: vec![],
                }],
            )?;
            nested.custom(pool, "Custom", BlobBuilder::new())
        })?;

        // Skip attribute count, name, and length
        Ok(buffer.to_vec()[8..].to_vec())
    }

    #[test]
    fn remaps_constants() -> Result<(), Error> {
        let mut source = ConstantsPool::new(Version::JAVA8);
        let body = code_body(&mut source, |code, pool| {
            let field = pool.get_field_ref("java/lang/System", "out", "Ljava/io/PrintStream;")?;
            let hello = pool.get_string("hello")?;
            let end = code.define_label();
            code.constant(Opcode::GetStatic, field)?;
            code.ldc(hello)?;
            code.branch(Opcode::Goto, end)?;
            code.mark_label(end)?;
            code.op(Opcode::Return)?;
            Ok(())
        })?;

        // Different constants already in the target pool, so every index has to move
        let mut target = ConstantsPool::new(Version::JAVA8);
        target.get_integer(1)?;
        target.get_long(2)?;
        let translated = translate_code(&source, &body, &mut target)?.to_vec();

        let field = target.get_field_ref("java/lang/System", "out", "Ljava/io/PrintStream;")?;
        let hello = target.get_string("hello")?;
        assert_eq!(&translated[..8], &[0, 2, 0, 1, 0, 0, 0, 9]);
        assert_eq!(
            &translated[8..17],
            &[
                0xb2,
                0,
                field.slot() as u8,
                0x12,
                hello.slot() as u8,
                0xa7,
                0,
                3,
                0xb1
            ]
        );

        // Exception table (empty) and the nested attributes
        assert_eq!(&translated[17..21], &[0, 0, 0, 4]);
        let translated_again = translate_code(&source, &body, &mut target)?.to_vec();
        assert_eq!(translated, translated_again);

        let string = target.get_class("java/lang/String")?;
        let stack_map = target.get_utf8(names::STACK_MAP_TABLE)?;
        let frame = [255, 0, 0, 0, 1, 7, 0, string.slot() as u8, 0, 0];
        let position = translated
            .windows(frame.len())
            .position(|window| window == frame)
            .expect("stack map frame");
        assert_eq!(
            &translated[position - 8..position],
            &[0, stack_map.slot() as u8, 0, 0, 0, 12, 0, 1]
        );
        Ok(())
    }

    #[test]
    fn switches_are_copied() -> Result<(), Error> {
        let mut source = ConstantsPool::new(Version::JAVA8);
        let body = code_body(&mut source, |code, _| {
            let default = code.define_label();
            let case = code.define_label();
            code.op(Opcode::IConst0)?;
            code.table_switch(0, default)?.case(case)?.case(default)?;
            code.op(Opcode::IConst0)?;
            code.lookup_switch(default)?.case(-1, case)?;
            code.mark_label(case)?;
            code.mark_label(default)?;
            code.op(Opcode::Return)?;
            Ok(())
        })?;

        let mut target = ConstantsPool::new(Version::JAVA8);
        let translated = translate_code(&source, &body, &mut target)?.to_vec();
        let code_len = BigEndian::read_u32(&body[4..8]) as usize;
        assert_eq!(&translated[..8 + code_len], &body[..8 + code_len]);
        Ok(())
    }

    #[test]
    fn ldc_cannot_be_widened() -> Result<(), Error> {
        let mut source = ConstantsPool::new(Version::JAVA8);
        let body = code_body(&mut source, |code, pool| {
            code.ldc(pool.get_integer(1_000_000)?)?;
            code.op(Opcode::Pop)?;
            code.op(Opcode::Return)?;
            Ok(())
        })?;

        let mut target = ConstantsPool::new(Version::JAVA8);
        for i in 0..300 {
            target.get_integer(i)?;
        }
        assert!(matches!(
            translate_code(&source, &body, &mut target),
            Err(Error::NarrowConstantOverflow {
                opcode: Opcode::Ldc,
                index: 301
            })
        ));
        Ok(())
    }

    #[test]
    fn type_annotations_are_remapped() -> Result<(), Error> {
        let mut source = ConstantsPool::new(Version::JAVA8);
        let mut code = InstructionEncoder::new();
        code.op(Opcode::AConstNull)?;
        code.op(Opcode::AStore0)?;
        code.op(Opcode::Return)?;
        let body = code.finish()?;

        let non_null = source.get_utf8("Lme/NonNull;")?;
        let reason = source.get_utf8("reason")?;
        let text = source.get_utf8("never")?;
        let annotations = [TypeAnnotation {
            target_type: 0x40,
            target_info: TargetInfo::LocalVariable(vec![LocalVariableTarget {
                start_pc: 2,
                length: 1,
                index: 0,
            }]),
            target_path: vec![],
            annotation: Annotation {
                type_index: non_null,
                elements: vec![(reason, ElementValue::String(text))],
            },
        }];
        let mut buffer = BlobBuilder::new();
        AttributeTableEncoder::new(&mut buffer).code(&mut source, 1, 1, body, |nested, pool| {
            nested.runtime_invisible_type_annotations(pool, &annotations)
        })?;
        let body = buffer.to_vec()[8..].to_vec();

        let mut target = ConstantsPool::new(Version::JAVA8);
        target.get_utf8("unrelated")?;
        target.get_integer(7)?;
        let translated = translate_code(&source, &body, &mut target)?.to_vec();
        assert_eq!(translated.len(), body.len());

        // Code length 3, no exceptions, then one nested attribute
        let nested = &translated[11 + 2..];
        assert_eq!(BigEndian::read_u16(&nested[..2]), 1);
        let name = BigEndian::read_u16(&nested[2..4]);
        assert_eq!(
            target.constant(name)?,
            ConstantData::Utf8(names::RUNTIME_INVISIBLE_TYPE_ANNOTATIONS.to_owned())
        );

        // count, target type, local variable range, empty path
        let annotation = &nested[8..];
        assert_eq!(&annotation[..12], &[0, 1, 0x40, 0, 1, 0, 2, 0, 1, 0, 0, 0]);
        let utf8 = |offset: usize| -> Result<ConstantData, Error> {
            target.constant(BigEndian::read_u16(&annotation[offset..offset + 2]))
        };
        assert_ne!(BigEndian::read_u16(&annotation[12..14]), non_null.slot());
        assert_eq!(utf8(12)?, ConstantData::Utf8("Lme/NonNull;".to_owned()));
        assert_eq!(&annotation[14..16], &[0, 1]);
        assert_eq!(utf8(16)?, ConstantData::Utf8("reason".to_owned()));
        assert_eq!(annotation[18], b's');
        assert_eq!(utf8(19)?, ConstantData::Utf8("never".to_owned()));
        Ok(())
    }

    #[test]
    fn malformed_type_annotation() -> Result<(), Error> {
        let mut source = ConstantsPool::new(Version::JAVA8);
        let name = source.get_utf8(names::RUNTIME_VISIBLE_TYPE_ANNOTATIONS)?;

        // One annotation with the reserved target type 0x20
        let mut body = vec![0, 0, 0, 0, 0, 0, 0, 1, 0xb1, 0, 0, 0, 1];
        body.extend_from_slice(&name.slot().to_be_bytes());
        body.extend_from_slice(&[0, 0, 0, 3, 0, 1, 0x20]);

        let mut target = ConstantsPool::new(Version::JAVA8);
        match translate_code(&source, &body, &mut target) {
            Err(Error::MalformedAttribute { name, .. }) => {
                assert_eq!(name, names::RUNTIME_VISIBLE_TYPE_ANNOTATIONS)
            }
            other => panic!("expected a malformed attribute, got {:?}", other.map(|_| ())),
        }
        Ok(())
    }

    #[test]
    fn malformed_input() {
        let mut target = ConstantsPool::new(Version::JAVA8);
        let source = ConstantsPool::new(Version::JAVA8);

        // Truncated header
        assert!(matches!(
            translate_code(&source, &[0, 1, 0], &mut target),
            Err(Error::MalformedAttribute { .. })
        ));

        // Opcode 0xff is reserved
        let body = [0, 0, 0, 0, 0, 0, 0, 1, 0xff, 0, 0, 0, 0];
        assert!(matches!(
            translate_code(&source, &body, &mut target),
            Err(Error::MalformedCode { offset: 0, .. })
        ));

        // Constant index that doesn't exist in the source
        let body = [0, 0, 0, 0, 0, 0, 0, 3, 0xbb, 0, 9, 0, 0, 0, 0];
        assert!(matches!(
            translate_code(&source, &body, &mut target),
            Err(Error::BadConstantIndex { index: 9, .. })
        ));
    }
}
