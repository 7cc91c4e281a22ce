//! Build-time rewriting of compiled JVM classes for multi-platform projects
//!
//! Methods annotated with `@ExpectPlatform` are turned into stubs that forward to an
//! implementation class for the platform being built (see [`transform::TransformExpectPlatform`]),
//! and references to the `ArchitecturyTarget` placeholder are pointed at a small synthesized class
//! that reports the current platform (see [`transform::RemapInjectables`]).

pub mod jvm;
pub mod transform;
pub mod util;
