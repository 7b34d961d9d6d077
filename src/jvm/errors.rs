use super::code::{Label, Opcode, OpcodeKind};
use super::constants::{Constant, ConstantPoolTag, HandleKind};
use super::Version;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// The constant pool is out of slots (it is indexed by `u16`)
    ConstantPoolOverflow {
        constant: Constant,
        offset: usize,
    },

    /// Index doesn't point at a usable slot of the pool
    BadConstantIndex {
        index: u16,
        len: u16,
    },

    /// Constant at the index is not of the expected kind
    BadConstantKind {
        index: u16,
        expected: ConstantPoolTag,
        actual: ConstantPoolTag,
    },

    /// Modified UTF-8 encoding of a string doesn't fit in a `u2` length
    Utf8TooLong(usize),

    /// Method handle whose reference kind doesn't agree with its member
    InvalidMethodHandle {
        kind: HandleKind,
        member: ConstantPoolTag,
        name: String,
        version: Version,
    },

    /// Feature needs a newer class file version than the one being written
    UnsupportedByVersion {
        feature: &'static str,
        version: Version,
    },

    /// Too many entries for the count of some table
    TableOverflow {
        table: &'static str,
        limit: usize,
    },

    /// `StackMapTable` frame whose shape can't be encoded
    InvalidStackMapFrame(String),

    IoError(std::io::Error),

    /// Method code is longer than the 65535 bytes allowed
    MethodCodeOverflow(usize),

    /// Label is marked twice (indicates a bug)
    DuplicateLabel(Label),

    /// Label was never defined by this encoder
    UnknownLabel(Label),

    /// Label is used but never marked
    UnmarkedLabel(Label),

    /// Narrow (16-bit) branch to a target that is too far
    BranchOutOfRange {
        opcode: Opcode,
        offset: isize,
    },

    /// Opcode emitted through the wrong method (eg. `goto` through `op`)
    WrongOpcodeKind {
        opcode: Opcode,
        expected: OpcodeKind,
    },

    /// `lookupswitch` keys must be added in strictly increasing order
    ///
    /// Equal keys are rejected too: the JVM requires the match pairs to be sorted with no
    /// duplicates, since it may binary search them.
    UnorderedSwitchKeys {
        previous: i32,
        key: i32,
    },

    /// Exception block ended when none is open
    NoOpenExceptionBlock,

    /// Method is finished while exception blocks are still open
    OpenExceptionBlock(usize),

    /// Remapped constant doesn't fit in a single byte operand
    NarrowConstantOverflow {
        opcode: Opcode,
        index: u16,
    },

    /// Code being re-encoded is not well-formed
    MalformedCode {
        offset: usize,
        reason: String,
    },

    /// Attribute being re-encoded is not well-formed
    MalformedAttribute {
        name: String,
        reason: String,
    },
}

impl Error {
    /// Is this error a property of the data being encoded, as opposed to a mistake in how the
    /// encoders were driven?
    ///
    /// After any other error, the builder that produced it is in an unspecified state and should
    /// be dropped.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Error::ConstantPoolOverflow { .. }
                | Error::Utf8TooLong(_)
                | Error::InvalidMethodHandle { .. }
                | Error::UnsupportedByVersion { .. }
                | Error::TableOverflow { .. }
                | Error::InvalidStackMapFrame(_)
                | Error::NarrowConstantOverflow { .. }
                | Error::MalformedCode { .. }
                | Error::MalformedAttribute { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConstantPoolOverflow { constant, offset } => write!(
                f,
                "constant pool overflow at slot {} adding {:?}",
                offset, constant
            ),
            Error::BadConstantIndex { index, len } => {
                write!(f, "constant index {} is not valid in a pool of {}", index, len)
            }
            Error::BadConstantKind {
                index,
                expected,
                actual,
            } => write!(f, "constant #{} is a {} (expected {})", index, actual, expected),
            Error::Utf8TooLong(len) => {
                write!(f, "encoded string of {} bytes exceeds 65535", len)
            }
            Error::InvalidMethodHandle {
                kind,
                member,
                name,
                version,
            } => write!(
                f,
                "invalid method handle {:?} to {} `{}` for version {}",
                kind, member, name, version
            ),
            Error::UnsupportedByVersion { feature, version } => {
                write!(f, "{} is not supported by class file version {}", feature, version)
            }
            Error::TableOverflow { table, limit } => {
                write!(f, "{} has more than {} entries", table, limit)
            }
            Error::InvalidStackMapFrame(reason) => write!(f, "invalid stack map frame: {}", reason),
            Error::IoError(err) => write!(f, "{}", err),
            Error::MethodCodeOverflow(len) => {
                write!(f, "method code of {} bytes exceeds 65535", len)
            }
            Error::DuplicateLabel(label) => write!(f, "label {:?} marked twice", label),
            Error::UnknownLabel(label) => write!(f, "label {:?} is not defined", label),
            Error::UnmarkedLabel(label) => write!(f, "label {:?} is never marked", label),
            Error::BranchOutOfRange { opcode, offset } => write!(
                f,
                "branch offset {} does not fit in a `{}`",
                offset,
                opcode.mnemonic()
            ),
            Error::WrongOpcodeKind { opcode, expected } => write!(
                f,
                "`{}` is a {:?} instruction, not {:?}",
                opcode.mnemonic(),
                opcode.kind(),
                expected
            ),
            Error::UnorderedSwitchKeys { previous, key } => write!(
                f,
                "lookupswitch key {} does not follow {} in increasing order",
                key, previous
            ),
            Error::NoOpenExceptionBlock => write!(f, "no exception block is open"),
            Error::OpenExceptionBlock(open) => {
                write!(f, "{} exception block(s) still open", open)
            }
            Error::NarrowConstantOverflow { opcode, index } => write!(
                f,
                "constant #{} does not fit the operand of `{}`",
                index,
                opcode.mnemonic()
            ),
            Error::MalformedCode { offset, reason } => {
                write!(f, "malformed code at offset {}: {}", offset, reason)
            }
            Error::MalformedAttribute { name, reason } => {
                write!(f, "malformed `{}` attribute: {}", name, reason)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn format_errors_are_classified() {
        assert!(Error::Utf8TooLong(70000).is_format_error());
        assert!(Error::UnsupportedByVersion {
            feature: "CONSTANT_Dynamic",
            version: Version::JAVA8
        }
        .is_format_error());
        assert!(!Error::NoOpenExceptionBlock.is_format_error());
        assert!(!Error::MethodCodeOverflow(70000).is_format_error());
    }
}
