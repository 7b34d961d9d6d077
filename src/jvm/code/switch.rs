use super::{InstructionEncoder, JumpWidth, Label, Opcode};
use crate::jvm::Error;
use crate::util::Blob;

/// Cases of a `tableswitch`, added in order of increasing key
pub struct TableSwitchEncoder<'a> {
    encoder: &'a mut InstructionEncoder,
    instruction: usize,
    low: i32,

    /// `None` once a case for `i32::MAX` has been added
    next_key: Option<i32>,
    high: Blob,
}

impl<'a> TableSwitchEncoder<'a> {
    pub(super) fn new(
        encoder: &'a mut InstructionEncoder,
        instruction: usize,
        low: i32,
        high: Blob,
    ) -> TableSwitchEncoder<'a> {
        TableSwitchEncoder {
            encoder,
            instruction,
            low,
            next_key: Some(low),
            high,
        }
    }

    /// Add the jump target for the next key
    ///
    /// Keys can't go past `i32::MAX`, since `high` would wrap around below `low`.
    pub fn case(&mut self, target: Label) -> Result<&mut Self, Error> {
        let high = self.next_key.ok_or(Error::TableOverflow {
            table: "tableswitch",
            limit: (i32::MAX as i64 - self.low as i64 + 1) as usize,
        })?;
        self.encoder.ensure_room(4)?;
        self.encoder
            .push_jump(Opcode::TableSwitch, self.instruction, target, JumpWidth::Wide)?;
        self.encoder.code.patch_i32(self.high, high);
        self.next_key = high.checked_add(1);
        Ok(self)
    }
}

/// Cases of a `lookupswitch`, added in strictly increasing key order
pub struct LookupSwitchEncoder<'a> {
    encoder: &'a mut InstructionEncoder,
    instruction: usize,
    npairs: Blob,
    pairs: u32,
    last_key: Option<i32>,
}

impl<'a> LookupSwitchEncoder<'a> {
    pub(super) fn new(
        encoder: &'a mut InstructionEncoder,
        instruction: usize,
        npairs: Blob,
    ) -> LookupSwitchEncoder<'a> {
        LookupSwitchEncoder {
            encoder,
            instruction,
            npairs,
            pairs: 0,
            last_key: None,
        }
    }

    pub fn case(&mut self, key: i32, target: Label) -> Result<&mut Self, Error> {
        if let Some(previous) = self.last_key {
            if key <= previous {
                return Err(Error::UnorderedSwitchKeys { previous, key });
            }
        }
        self.encoder.ensure_room(8)?;
        self.encoder.code.push_i32(key);
        self.encoder
            .push_jump(Opcode::LookupSwitch, self.instruction, target, JumpWidth::Wide)?;
        self.last_key = Some(key);
        self.pairs += 1;
        self.encoder.code.patch_u32(self.npairs, self.pairs);
        Ok(self)
    }
}
