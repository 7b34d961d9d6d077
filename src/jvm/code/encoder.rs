use super::{
    ArrayType, ExceptionHandler, ExceptionRegion, Fixup, JumpWidth, Label, LabelState,
    LookupSwitchEncoder, Opcode, OpcodeKind, OpenExceptionBlock, TableSwitchEncoder,
};
use crate::jvm::constants::{
    ClassConstantIndex, ConstantIndex, ConstantKind, InterfaceMethodRefConstantIndex,
    InvokeDynamicConstantIndex, LoadableConstant, WideLoadableConstant,
};
use crate::jvm::Error;
use crate::util::BlobBuilder;
use std::convert::TryFrom;

/// Largest number of bytes of code a method can have
pub const MAX_CODE_LEN: usize = u16::MAX as usize;

/// Encoder for the bytecode of a single method
///
/// Instructions are appended in order. Jumps can target labels that have not been marked yet: the
/// offset is reserved and patched once the label is marked. Every jump is relative to the start of
/// the instruction doing the jumping.
///
/// Labels and exception regions are local to one encoder.
pub struct InstructionEncoder {
    pub(super) code: BlobBuilder,
    labels: Vec<LabelState>,
    open_blocks: Vec<OpenExceptionBlock>,
    regions: Vec<ExceptionRegion>,
}

/// Encoded method body, with all jumps resolved
pub struct MethodBody {
    pub code: BlobBuilder,
    pub exception_table: Vec<ExceptionHandler>,
    label_offsets: Vec<Option<usize>>,
}

impl MethodBody {
    /// Offset at which a label was marked
    pub fn label_offset(&self, label: Label) -> Option<usize> {
        self.label_offsets.get(label.0 as usize).copied().flatten()
    }

    pub fn code_len(&self) -> usize {
        self.code.len()
    }
}

impl InstructionEncoder {
    pub fn new() -> InstructionEncoder {
        InstructionEncoder {
            code: BlobBuilder::new(),
            labels: vec![],
            open_blocks: vec![],
            regions: vec![],
        }
    }

    /// Offset of the next instruction
    pub fn offset(&self) -> usize {
        self.code.len()
    }

    /// Make a fresh label, not yet marked
    pub fn define_label(&mut self) -> Label {
        let label = Label(self.labels.len() as u32);
        self.labels.push(LabelState::default());
        label
    }

    pub fn label_offset(&self, label: Label) -> Option<usize> {
        self.labels.get(label.0 as usize).and_then(|state| state.offset)
    }

    fn label_state(&mut self, label: Label) -> Result<&mut LabelState, Error> {
        self.labels
            .get_mut(label.0 as usize)
            .ok_or(Error::UnknownLabel(label))
    }

    /// Mark the label at the current offset and resolve every jump waiting on it
    pub fn mark_label(&mut self, label: Label) -> Result<(), Error> {
        let offset = self.offset();
        let state = self.label_state(label)?;
        if state.offset.is_some() {
            return Err(Error::DuplicateLabel(label));
        }
        state.offset = Some(offset);
        let fixups = std::mem::take(&mut state.fixups);

        log::trace!("Marking {:?} at {} ({} fixups)", label, offset, fixups.len());
        for fixup in fixups {
            Self::resolve(&mut self.code, &fixup, offset)?;
        }
        Ok(())
    }

    /// Mark a fresh label at the current offset
    pub fn here(&mut self) -> Result<Label, Error> {
        let label = self.define_label();
        self.mark_label(label)?;
        Ok(label)
    }

    fn resolve(code: &mut BlobBuilder, fixup: &Fixup, target: usize) -> Result<(), Error> {
        let offset = target as isize - fixup.instruction as isize;
        match fixup.width {
            JumpWidth::Narrow => {
                let narrow = i16::try_from(offset).map_err(|_| Error::BranchOutOfRange {
                    opcode: fixup.opcode,
                    offset,
                })?;
                code.patch_i16(fixup.blob, narrow);
            }
            JumpWidth::Wide => code.patch_i32(fixup.blob, offset as i32),
        }
        Ok(())
    }

    /// Reserve a jump offset to a label, relative to the instruction at `instruction`
    pub(super) fn push_jump(
        &mut self,
        opcode: Opcode,
        instruction: usize,
        label: Label,
        width: JumpWidth,
    ) -> Result<(), Error> {
        let target = self.label_state(label)?.offset;
        let blob = self.code.reserve_bytes(width.bytes());
        let fixup = Fixup {
            blob,
            instruction,
            width,
            opcode,
        };
        match target {
            Some(target) => Self::resolve(&mut self.code, &fixup, target),
            None => {
                self.label_state(label)?.fixups.push(fixup);
                Ok(())
            }
        }
    }

    /// Check that `len` more bytes of code still fit in the method, returning the current offset
    pub(super) fn ensure_room(&self, len: usize) -> Result<usize, Error> {
        let offset = self.offset();
        if offset + len > MAX_CODE_LEN {
            return Err(Error::MethodCodeOverflow(offset + len));
        }
        Ok(offset)
    }

    fn expect_kind(opcode: Opcode, expected: OpcodeKind) -> Result<(), Error> {
        if opcode.kind() != expected {
            return Err(Error::WrongOpcodeKind { opcode, expected });
        }
        Ok(())
    }

    /// Emit an instruction that has no operands
    pub fn op(&mut self, opcode: Opcode) -> Result<(), Error> {
        Self::expect_kind(opcode, OpcodeKind::Simple)?;
        self.ensure_room(1)?;
        self.code.push_u8(opcode as u8);
        Ok(())
    }

    /// Emit a load, store, or `ret` of a local variable
    ///
    /// The load/store instructions follow the same pattern:
    ///
    ///   - short form (0-3) have special bytes (except for `ret`)
    ///   - normal form (0-255) use `iload` plus a byte operand
    ///   - wide form (255-65535) use `wide iload` plus two byte operands
    pub fn local(&mut self, opcode: Opcode, index: u16) -> Result<(), Error> {
        Self::expect_kind(opcode, OpcodeKind::LocalIndex)?;
        let short_form_start = match opcode {
            Opcode::ILoad | Opcode::LLoad | Opcode::FLoad | Opcode::DLoad | Opcode::ALoad => {
                Some(Opcode::ILoad0 as u8 + (opcode as u8 - Opcode::ILoad as u8) * 4)
            }
            Opcode::IStore | Opcode::LStore | Opcode::FStore | Opcode::DStore | Opcode::AStore => {
                Some(Opcode::IStore0 as u8 + (opcode as u8 - Opcode::IStore as u8) * 4)
            }
            _ => None,
        };

        match (u8::try_from(index), short_form_start) {
            (Ok(n @ 0..=3), Some(start)) => {
                self.ensure_room(1)?;
                self.code.push_u8(start + n);
            }
            (Ok(n), _) => {
                self.ensure_room(2)?;
                self.code.push_u8(opcode as u8);
                self.code.push_u8(n);
            }
            (Err(_), _) => {
                self.ensure_room(4)?;
                self.code.push_u8(Opcode::Wide as u8);
                self.code.push_u8(opcode as u8);
                self.code.push_u16(index);
            }
        }
        Ok(())
    }

    /// Emit `iinc`, using the wide form only if the operands need it
    pub fn iinc(&mut self, index: u16, delta: i16) -> Result<(), Error> {
        match (u8::try_from(index), i8::try_from(delta)) {
            (Ok(index), Ok(delta)) => {
                self.ensure_room(3)?;
                self.code.push_u8(Opcode::IInc as u8);
                self.code.push_u8(index);
                self.code.push_i8(delta);
            }
            _ => {
                self.ensure_room(6)?;
                self.code.push_u8(Opcode::Wide as u8);
                self.code.push_u8(Opcode::IInc as u8);
                self.code.push_u16(index);
                self.code.push_i16(delta);
            }
        }
        Ok(())
    }

    /// Emit an instruction with a `u2` constant pool operand
    ///
    /// This covers field access, most invocations, `new`, `anewarray`, `checkcast`, `instanceof`,
    /// `ldc_w`, and `ldc2_w`. The kind of `index` has to be one the instruction accepts (eg. a
    /// field reference for `getstatic`), otherwise this fails with [`Error::BadConstantKind`].
    /// Erased indices can't be checked here and are let through.
    pub fn constant<K: ConstantKind>(
        &mut self,
        opcode: Opcode,
        index: ConstantIndex<K>,
    ) -> Result<(), Error> {
        Self::expect_kind(opcode, OpcodeKind::ConstantRef)?;
        if let Some(actual) = K::TAG {
            let allowed = opcode.constant_tags();
            if !allowed.contains(&actual) {
                return Err(Error::BadConstantKind {
                    index: index.slot(),
                    expected: allowed[0],
                    actual,
                });
            }
        }
        self.ensure_room(3)?;
        self.code.push_u8(opcode as u8);
        self.code.push_u16(index.slot());
        Ok(())
    }

    /// Push a single-width constant, using `ldc` if the index fits in a byte and `ldc_w` otherwise
    pub fn ldc<K: LoadableConstant>(&mut self, index: ConstantIndex<K>) -> Result<(), Error> {
        match u8::try_from(index.slot()) {
            Ok(narrow) => {
                self.ensure_room(2)?;
                self.code.push_u8(Opcode::Ldc as u8);
                self.code.push_u8(narrow);
                Ok(())
            }
            Err(_) => self.constant(Opcode::LdcW, index),
        }
    }

    /// Push a `long` or `double` constant (always `ldc2_w`)
    pub fn ldc2<K: WideLoadableConstant>(&mut self, index: ConstantIndex<K>) -> Result<(), Error> {
        self.constant(Opcode::Ldc2W, index)
    }

    pub fn bipush(&mut self, value: i8) -> Result<(), Error> {
        self.ensure_room(2)?;
        self.code.push_u8(Opcode::BiPush as u8);
        self.code.push_i8(value);
        Ok(())
    }

    pub fn sipush(&mut self, value: i16) -> Result<(), Error> {
        self.ensure_room(3)?;
        self.code.push_u8(Opcode::SiPush as u8);
        self.code.push_i16(value);
        Ok(())
    }

    pub fn newarray(&mut self, element: ArrayType) -> Result<(), Error> {
        self.ensure_room(2)?;
        self.code.push_u8(Opcode::NewArray as u8);
        self.code.push_u8(element as u8);
        Ok(())
    }

    pub fn multianewarray(
        &mut self,
        class: ClassConstantIndex,
        dimensions: u8,
    ) -> Result<(), Error> {
        self.ensure_room(4)?;
        self.code.push_u8(Opcode::MultiANewArray as u8);
        self.code.push_u16(class.slot());
        self.code.push_u8(dimensions);
        Ok(())
    }

    /// Emit `invokeinterface`
    ///
    /// `count` is the number of argument slots, including the receiver (longs and doubles count
    /// twice).
    pub fn invoke_interface(
        &mut self,
        method: InterfaceMethodRefConstantIndex,
        count: u8,
    ) -> Result<(), Error> {
        self.ensure_room(5)?;
        self.code.push_u8(Opcode::InvokeInterface as u8);
        self.code.push_u16(method.slot());
        self.code.push_u8(count);
        self.code.push_u8(0);
        Ok(())
    }

    pub fn invoke_dynamic(&mut self, call_site: InvokeDynamicConstantIndex) -> Result<(), Error> {
        self.ensure_room(5)?;
        self.code.push_u8(Opcode::InvokeDynamic as u8);
        self.code.push_u16(call_site.slot());
        self.code.push_u16(0);
        Ok(())
    }

    /// Emit a jump to a label
    ///
    /// Narrow jumps (`goto`, `if*`, `jsr`) whose target ends up more than 32767 bytes away fail
    /// with [`Error::BranchOutOfRange`], either here or when the label gets marked.
    pub fn branch(&mut self, opcode: Opcode, target: Label) -> Result<(), Error> {
        let width = match opcode.kind() {
            OpcodeKind::Branch => JumpWidth::Narrow,
            OpcodeKind::WideBranch => JumpWidth::Wide,
            _ => {
                return Err(Error::WrongOpcodeKind {
                    opcode,
                    expected: OpcodeKind::Branch,
                })
            }
        };
        let instruction = self.ensure_room(1 + width.bytes())?;
        self.code.push_u8(opcode as u8);
        self.push_jump(opcode, instruction, target, width)
    }

    /// Bytes of padding after a switch opcode at `offset`, to get to a multiple of four
    fn switch_padding(offset: usize) -> usize {
        (4 - (offset + 1) % 4) % 4
    }

    /// Start a `tableswitch` for keys starting at `low`
    ///
    /// Cases are added through the returned encoder, for keys `low`, `low + 1`, and so on. The
    /// `high` field is kept up to date as cases are added.
    pub fn table_switch(&mut self, low: i32, default: Label) -> Result<TableSwitchEncoder<'_>, Error> {
        let instruction = self.offset();
        let padding = Self::switch_padding(instruction);
        self.ensure_room(1 + padding + 12)?;

        self.code.push_u8(Opcode::TableSwitch as u8);
        self.code.push_bytes(&[0; 3][..padding]);
        self.push_jump(Opcode::TableSwitch, instruction, default, JumpWidth::Wide)?;
        self.code.push_i32(low);
        let high = self.code.reserve_bytes(4);
        self.code.patch_i32(high, low.wrapping_sub(1));

        Ok(TableSwitchEncoder::new(self, instruction, low, high))
    }

    /// Start a `lookupswitch`
    ///
    /// Cases are added through the returned encoder, in strictly increasing key order. The
    /// `npairs` field is kept up to date as cases are added.
    pub fn lookup_switch(&mut self, default: Label) -> Result<LookupSwitchEncoder<'_>, Error> {
        let instruction = self.offset();
        let padding = Self::switch_padding(instruction);
        self.ensure_room(1 + padding + 8)?;

        self.code.push_u8(Opcode::LookupSwitch as u8);
        self.code.push_bytes(&[0; 3][..padding]);
        self.push_jump(Opcode::LookupSwitch, instruction, default, JumpWidth::Wide)?;
        let npairs = self.code.reserve_bytes(4);

        Ok(LookupSwitchEncoder::new(self, instruction, npairs))
    }

    /// Start a region of code protected by an exception handler
    ///
    /// The region extends until the matching [`InstructionEncoder::end_exception_block`]. Blocks
    /// nest: inner blocks end first and so take priority in the exception table.
    pub fn begin_exception_block(
        &mut self,
        handler: Label,
        catch_type: ClassConstantIndex,
    ) -> Result<(), Error> {
        self.label_state(handler)?;
        let start = self.here()?;
        self.open_blocks.push(OpenExceptionBlock {
            start,
            handler,
            catch_type,
        });
        Ok(())
    }

    /// End the innermost open exception block at the current offset
    pub fn end_exception_block(&mut self) -> Result<(), Error> {
        let block = self.open_blocks.pop().ok_or(Error::NoOpenExceptionBlock)?;
        let end = self.here()?;
        self.regions.push(ExceptionRegion {
            start: block.start,
            end,
            handler: block.handler,
            catch_type: block.catch_type,
        });
        Ok(())
    }

    /// Add an exception table entry from explicit labels
    pub fn add_exception_handler(
        &mut self,
        start: Label,
        end: Label,
        handler: Label,
        catch_type: ClassConstantIndex,
    ) -> Result<(), Error> {
        for label in [start, end, handler] {
            self.label_state(label)?;
        }
        self.regions.push(ExceptionRegion {
            start,
            end,
            handler,
            catch_type,
        });
        Ok(())
    }

    /// Resolve the exception regions added so far into table entries
    pub fn exception_handlers(&self) -> Result<Vec<ExceptionHandler>, Error> {
        if !self.open_blocks.is_empty() {
            return Err(Error::OpenExceptionBlock(self.open_blocks.len()));
        }
        let pc = |label: Label| -> Result<u16, Error> {
            self.label_offset(label)
                .map(|offset| offset as u16)
                .ok_or(Error::UnmarkedLabel(label))
        };
        self.regions
            .iter()
            .map(|region| {
                Ok(ExceptionHandler {
                    start_pc: pc(region.start)?,
                    end_pc: pc(region.end)?,
                    handler_pc: pc(region.handler)?,
                    catch_type: region.catch_type,
                })
            })
            .collect()
    }

    /// Write out the exception table (`u2` count then entries)
    pub fn serialize_exceptions(&self, buffer: &mut BlobBuilder) -> Result<(), Error> {
        let handlers = self.exception_handlers()?;
        super::write_exception_table(&handlers, buffer)
    }

    /// Finish the method, checking that every jump got resolved
    pub fn finish(self) -> Result<MethodBody, Error> {
        let exception_table = self.exception_handlers()?;
        for (idx, state) in self.labels.iter().enumerate() {
            if !state.fixups.is_empty() {
                return Err(Error::UnmarkedLabel(Label(idx as u32)));
            }
        }
        log::debug!(
            "Finished method code: {} bytes, {} exception handlers",
            self.code.len(),
            exception_table.len()
        );
        Ok(MethodBody {
            code: self.code,
            exception_table,
            label_offsets: self.labels.into_iter().map(|state| state.offset).collect(),
        })
    }
}

impl Default for InstructionEncoder {
    fn default() -> InstructionEncoder {
        InstructionEncoder::new()
    }
}
