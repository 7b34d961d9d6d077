use super::Label;
use crate::jvm::constants::ClassConstantIndex;
use crate::jvm::{Error, Serialize};
use crate::util::BlobBuilder;
use byteorder::WriteBytesExt;

/// Entry in the exception table of a method
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ExceptionHandler {
    /// Start of exception handler range (inclusive)
    pub start_pc: u16,

    /// End of exception handler range (exclusive)
    pub end_pc: u16,

    /// Start of the exception handler
    pub handler_pc: u16,

    /// Type of exception caught (`NONE` catches everything)
    pub catch_type: ClassConstantIndex,
}

impl Serialize for ExceptionHandler {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.start_pc.serialize(writer)?;
        self.end_pc.serialize(writer)?;
        self.handler_pc.serialize(writer)?;
        self.catch_type.serialize(writer)?;
        Ok(())
    }
}

/// Exception range whose bounds are still labels
#[derive(Copy, Clone, Debug)]
pub(super) struct ExceptionRegion {
    pub start: Label,
    pub end: Label,
    pub handler: Label,
    pub catch_type: ClassConstantIndex,
}

/// Exception block that has been started but not ended
#[derive(Copy, Clone, Debug)]
pub(super) struct OpenExceptionBlock {
    pub start: Label,
    pub handler: Label,
    pub catch_type: ClassConstantIndex,
}

/// Write out a `u2` count followed by the handlers
pub fn write_exception_table(
    handlers: &[ExceptionHandler],
    buffer: &mut BlobBuilder,
) -> Result<(), Error> {
    if handlers.len() > u16::MAX as usize {
        return Err(Error::TableOverflow {
            table: "exception_table",
            limit: u16::MAX as usize,
        });
    }
    handlers.serialize(buffer)?;
    Ok(())
}
