//! Bytecode representation
//!
//! ### Structure
//!
//! Despite being pushed off into [just another method attribute](crate::jvm::class_file::Code),
//! the bytecode is arguably the most important part of the class file - it contains the actual
//! executable instructions. We split up the [list of bytecode instructions][0] into two groups:
//!
//!   - [`Instruction`] for straight-line instructions
//!   - [`BranchInstruction`] for instructions that may branch
//!
//! Method bodies are then a flat sequence of [`CodeElement`]s, where jump targets, exception
//! ranges, and debug information refer to [`Label`]s placed in the sequence instead of to byte
//! offsets. This makes it possible to change the code (or the size of its instructions) without
//! having to fix up offsets by hand.
//!
//! ### Round trip
//!
//! Code is decoded from a byte array with [`decode_bytecode`] and laid out back into bytes with
//! [`assemble`]. Stack map frames (see [`Frame`]) are kept alongside the code.
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se18/html/jvms-6.html#jvms-6.5

mod assemble;
mod decode;
mod frame;
mod instructions;
mod label;

pub use assemble::*;
pub use decode::*;
pub use frame::*;
pub use instructions::*;
pub use label::*;

/// Element in a linear sequence of code
#[derive(Clone, Debug, PartialEq)]
pub enum CodeElement<Insn, Branch> {
    /// Marks the position of the next element
    Label(Label),
    Instruction(Insn),
    Branch(Branch),
}
