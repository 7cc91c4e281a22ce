//! Symbolic representation of classes
//!
//! This is the representation that transformations work on. Every constant pool reference is
//! resolved into names, descriptors, and literal values, and method bodies are lists of
//! instructions addressed by labels instead of offsets.
//!
//!   - __Class__ is represented using [`Class`]
//!   - __Method__ is represented using [`Method`] (with its body in [`Code`])
//!   - __Field__ is represented using [`Field`]
//!
//! Lifting goes from a [`crate::jvm::class_file::ClassFile`] to a [`Class`] and lowering goes
//! back. Attributes that aren't understood are carried along as [`RawAttribute`].

mod annotation;
mod attribute;
mod class;
mod code;
mod constant;
mod field;
mod method;
pub mod stack_depth;

pub use annotation::*;
pub use attribute::*;
pub use class::*;
pub use code::*;
pub use constant::*;
pub use field::*;
pub use method::*;
