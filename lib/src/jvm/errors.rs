use super::class_file::{ConstantIndex, ConstantPoolOverflow};
use super::code::Label;
use crate::util::Offset;

#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    ConstantPoolOverflow(ConstantPoolOverflow),

    /// Class file does not start with `0xCAFEBABE`
    BadMagic(u32),

    /// Constant pool entry with an unknown tag
    UnknownConstantTag(u8),

    /// Constant pool index is out of bounds, or points to the unusable second half of a wide
    /// constant
    MissingConstant(ConstantIndex),

    /// Constant pool entry exists but has the wrong kind
    UnexpectedConstant {
        index: ConstantIndex,
        expected: &'static str,
    },

    BadDescriptor(String),
    BadName(String),

    /// Attribute contents don't match the attribute's format
    MalformedAttribute {
        name: &'static str,
        message: String,
    },

    /// Bytecode contains an opcode that is not defined (or not allowed after `wide`)
    UnknownOpcode { opcode: u8, offset: Offset },

    /// Jump target or code range does not land on an instruction boundary
    InvalidCodeOffset { from: Offset, target: i64 },

    /// Instruction runs past the end of the code array
    TruncatedInstruction(Offset),

    /// Label is referenced but never placed in the code
    UndefinedLabel(Label),

    /// Code array is longer than the 65535 bytes the JVM allows
    MethodCodeOverflow(usize),

    /// Conditional branch target is too far away to be encoded as a 16-bit offset
    BranchOffsetOverflow { from: Offset, distance: i64 },

    /// Two stack map frames end up at the same code offset
    ConflictingFrames(Offset),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}

impl From<ConstantPoolOverflow> for Error {
    fn from(err: ConstantPoolOverflow) -> Error {
        Error::ConstantPoolOverflow(err)
    }
}
