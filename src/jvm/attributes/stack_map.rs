use super::{names, write_table, AttributeTableEncoder, CountWidth};
use crate::jvm::constants::{ClassConstantIndex, ConstantsPool};
use crate::jvm::{Error, Serialize};
use crate::util::BlobBuilder;
use byteorder::WriteBytesExt;

/// Type of a local or stack slot, as recorded in a stack map frame
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.4
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum VerificationType {
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,

    /// In the constructor, the `this` parameter starts with this type then turns into an object
    /// type after `<init>` is called
    UninitializedThis,

    /// Object type
    Object(ClassConstantIndex),

    /// State of an object after `new` has been called but `<init>` has not been called, tracked
    /// by the offset of the `new` instruction from the start of the method body
    Uninitialized(u16),
}

impl VerificationType {
    pub fn tag(self) -> u8 {
        match self {
            VerificationType::Top => 0,
            VerificationType::Integer => 1,
            VerificationType::Float => 2,
            VerificationType::Double => 3,
            VerificationType::Long => 4,
            VerificationType::Null => 5,
            VerificationType::UninitializedThis => 6,
            VerificationType::Object(_) => 7,
            VerificationType::Uninitialized(_) => 8,
        }
    }
}

impl Serialize for VerificationType {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.tag().serialize(writer)?;
        match self {
            VerificationType::Object(cls) => cls.serialize(writer)?,
            VerificationType::Uninitialized(off) => off.serialize(writer)?,
            _ => (),
        };
        Ok(())
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum StackMapFrame {
    /// Frame has the same locals as the previous frame and number of stack items is zero
    /// Tags: 0-63 or 251
    SameLocalsNoStack { offset_delta: u16 },

    /// Frame has the same locals as the previous frame and number of stack items is one
    /// Tags: 64-127 or 247
    SameLocalsOneStack {
        offset_delta: u16,
        stack_verification: VerificationType,
    },

    /// Frame is like the previous frame, but without the last `chopped_k` locals
    /// Tags: 248-250
    ChoppedFrameNoStack { offset_delta: u16, chopped_k: u8 },

    /// Frame is like the previous frame, but with an extra `locals_verifications.len()` locals
    /// Tags: 252-254
    AppendFrameNoStack {
        offset_delta: u16,
        local_verifications: Vec<VerificationType>,
    },

    /// Frame has exactly the locals and stack specified
    /// Tag: 255
    FullFrame {
        offset_delta: u16,
        local_verifications: Vec<VerificationType>,
        stack_verifications: Vec<VerificationType>,
    },
}

impl StackMapFrame {
    /// Write the frame, checking the constraints on chopped and appended locals
    pub fn write(&self, buffer: &mut BlobBuilder) -> Result<(), Error> {
        match self {
            StackMapFrame::SameLocalsNoStack {
                offset_delta: o @ 0..=63,
            } => {
                buffer.push_u8(*o as u8);
            }
            StackMapFrame::SameLocalsNoStack { offset_delta } => {
                buffer.push_u8(251);
                buffer.push_u16(*offset_delta);
            }
            StackMapFrame::SameLocalsOneStack {
                offset_delta: o @ 0..=63,
                stack_verification,
            } => {
                buffer.push_u8(*o as u8 + 64);
                stack_verification.serialize(buffer)?;
            }
            StackMapFrame::SameLocalsOneStack {
                offset_delta,
                stack_verification,
            } => {
                buffer.push_u8(247);
                buffer.push_u16(*offset_delta);
                stack_verification.serialize(buffer)?;
            }
            StackMapFrame::ChoppedFrameNoStack {
                offset_delta,
                chopped_k,
            } => {
                if !(1..=3).contains(chopped_k) {
                    return Err(Error::InvalidStackMapFrame(format!(
                        "cannot chop {} locals",
                        chopped_k
                    )));
                }
                buffer.push_u8(251 - chopped_k);
                buffer.push_u16(*offset_delta);
            }
            StackMapFrame::AppendFrameNoStack {
                offset_delta,
                local_verifications,
            } => {
                let appended = local_verifications.len();
                if !(1..=3).contains(&appended) {
                    return Err(Error::InvalidStackMapFrame(format!(
                        "cannot append {} locals",
                        appended
                    )));
                }
                buffer.push_u8(251 + appended as u8);
                buffer.push_u16(*offset_delta);
                for local in local_verifications {
                    local.serialize(buffer)?;
                }
            }
            StackMapFrame::FullFrame {
                offset_delta,
                local_verifications,
                stack_verifications,
            } => {
                buffer.push_u8(255);
                buffer.push_u16(*offset_delta);
                write_table(
                    buffer,
                    CountWidth::U2,
                    "locals",
                    local_verifications,
                    |buffer, local| Ok(local.serialize(buffer)?),
                )?;
                write_table(
                    buffer,
                    CountWidth::U2,
                    "stack",
                    stack_verifications,
                    |buffer, stack| Ok(stack.serialize(buffer)?),
                )?;
            }
        };
        Ok(())
    }
}

impl<'a> AttributeTableEncoder<'a> {
    /// Add a `StackMapTable` attribute (inside of `Code`)
    pub fn stack_map_table<'f, I>(
        &mut self,
        pool: &mut ConstantsPool,
        frames: I,
    ) -> Result<(), Error>
    where
        I: IntoIterator<Item = &'f StackMapFrame>,
    {
        let name = pool.get_utf8(names::STACK_MAP_TABLE)?;
        let mut body = BlobBuilder::new();
        write_table(
            &mut body,
            CountWidth::U2,
            names::STACK_MAP_TABLE,
            frames,
            |buffer, frame| frame.write(buffer),
        )?;
        self.attribute(name, body)
    }
}
