//! Bytecode generation
//!
//! The bytecode of a method is written front to back by an [`InstructionEncoder`]. Jumps to code
//! that hasn't been written yet go through [`Label`]s: the jump offset is reserved in place and
//! patched once the label gets marked, so no instruction is ever moved after being written.
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-6.html#jvms-6.5

mod encoder;
mod exceptions;
mod label;
mod opcode;
mod switch;

pub use encoder::*;
pub use exceptions::*;
pub use label::Label;
pub use opcode::*;
pub use switch::*;

use label::{Fixup, JumpWidth, LabelState};
