//! Read, manipulate, and write JVM classes
//!
//! There are two representations of a class:
//!
//!   - [`class_file`] mirrors the binary format, with constant pool indices everywhere
//!   - [`model`] resolves those indices into names, descriptors, and labelled instructions
//!
//! Transformations work on the [`model`] and [`remapper`] renames classes throughout it.
//!
//! ### Simple example
//!
//! Consider the following simple Java class:
//!
//! ```java,ignore,no_run
//! public final class Greeter {
//!     public static String greeting() {
//!         return "hello";
//!     }
//! }
//! ```
//!
//! Generating an analogous class file, then reading it back, can be done as follows:
//!
//! ```
//! use platform_inject::jvm::class_file::Version;
//! use platform_inject::jvm::code::{BranchInstruction, CodeElement, Instruction};
//! use platform_inject::jvm::model::{Class, Code, ConstantData, Method};
//! use platform_inject::jvm::*;
//!
//! # fn generate_class() -> Result<(), Error> {
//! let mut class = Class::new(
//!     Version::JAVA8,
//!     ClassAccessFlags::PUBLIC | ClassAccessFlags::FINAL | ClassAccessFlags::SUPER,
//!     BinaryName::from_string(String::from("me/example/Greeter")).unwrap(),
//!     Some(BinaryName::OBJECT),
//! );
//!
//! let mut greeting = Method::new(
//!     MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
//!     UnqualifiedName::from_string(String::from("greeting")).unwrap(),
//!     MethodDescriptor {
//!         parameters: vec![],
//!         return_type: Some(FieldType::object(BinaryName::STRING)),
//!     },
//! );
//! greeting.code = Some(Code::from_instructions(vec![
//!     CodeElement::Instruction(Instruction::Ldc(ConstantData::String(String::from("hello")))),
//!     CodeElement::Branch(BranchInstruction::AReturn),
//! ]));
//! class.methods.push(greeting);
//!
//! // Encode the class into bytes (`max_stack` and `max_locals` get computed)
//! let class_bytes: Vec<u8> = class.to_bytes()?;
//!
//! // Decode it again
//! let parsed = Class::parse(&class_bytes)?;
//! assert_eq!(parsed.methods[0].code.as_ref().unwrap().max_stack, Some(1));
//! # Ok(())
//! # }
//! # generate_class().unwrap();
//! ```

mod access_flags;
pub mod class_file;
pub mod code;
mod descriptors;
mod errors;
pub mod model;
mod names;
pub mod remapper;

pub use access_flags::*;
pub use descriptors::*;
pub use errors::*;
pub use names::*;
