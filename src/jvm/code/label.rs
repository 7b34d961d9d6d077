use super::Opcode;
use crate::util::Blob;
use std::fmt;

/// Opaque label
///
/// Labels are only meaningful for the [`super::InstructionEncoder`] that defined them.
#[derive(Copy, Clone, Hash, Eq, PartialEq)]
pub struct Label(pub(super) u32);

impl fmt::Debug for Label {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("l{}", self.0))
    }
}

/// Width of a relative jump offset
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(super) enum JumpWidth {
    /// Signed 16-bit offset (`goto`, `if*`, ...)
    Narrow,

    /// Signed 32-bit offset (`goto_w`, switch targets, ...)
    Wide,
}

impl JumpWidth {
    pub fn bytes(self) -> usize {
        match self {
            JumpWidth::Narrow => 2,
            JumpWidth::Wide => 4,
        }
    }
}

/// Jump offset that is waiting on its target label to be marked
#[derive(Copy, Clone, Debug)]
pub(super) struct Fixup {
    /// Where the offset gets written
    pub blob: Blob,

    /// Offset of the instruction doing the jump (jumps are relative to this)
    pub instruction: usize,

    pub width: JumpWidth,

    pub opcode: Opcode,
}

#[derive(Default, Debug)]
pub(super) struct LabelState {
    /// Where the label has been marked, if it has
    pub offset: Option<usize>,

    /// Jumps to the label from before it was marked
    pub fixups: Vec<Fixup>,
}
