//! Low-level representation of class files
//!
//! Everything here mirrors the binary layout of a class file: constants are referenced by index
//! and attributes are opaque byte blobs until they are explicitly parsed. See
//! [`crate::jvm::model`] for the representation that transformations operate on.

mod annotation;
mod attribute;
mod class;
mod constants;
mod field;
mod method;
mod serialize;
mod version;

pub use annotation::*;
pub use attribute::*;
pub use class::*;
pub use constants::*;
pub use field::*;
pub use method::*;
pub use serialize::*;
pub use version::*;
