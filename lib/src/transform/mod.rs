//! Class transforms for multi-platform builds
//!
//! There are two transforms, both configured from a shared [`InjectionConfig`]:
//!
//!   - [`TransformExpectPlatform`] replaces the bodies of `@ExpectPlatform` methods with calls to
//!     the implementation class for the current platform (see [`platform_class`])
//!
//!   - [`RemapInjectables`] synthesizes a class reporting the current platform (see
//!     [`build_platform_methods_class`]) and renames references to the `ArchitecturyTarget`
//!     placeholder so they point at it
//!
//! The [`Injector`] runs both over a build. Setting `architectury.inject.injectables` to anything
//! other than `true` turns all of this off.

mod config;
mod context;
mod diagnostics;
mod errors;
mod expect_platform;
mod file_access;
mod injectables;
pub mod markers;
mod pipeline;
mod platform;
pub mod properties;

pub use config::*;
pub use context::*;
pub use diagnostics::*;
pub use errors::*;
pub use expect_platform::*;
pub use file_access::*;
pub use injectables::*;
pub use pipeline::*;
pub use platform::*;
pub use properties::Properties;

use crate::jvm::model::Class;

/// Transform which can be configured with properties of its own
pub trait Transformer {
    /// Receive the transformer-level properties, before any editing happens
    fn supply_properties(&mut self, _properties: &Properties) {}
}

/// Transform which rewrites classes one at a time
pub trait ClassTransformer: Transformer {
    fn edit_class(
        &self,
        config: &InjectionConfig,
        class: Class,
        diagnostics: &mut Diagnostics,
    ) -> Result<Class, Error>;
}

/// Transform which emits new files into the output
pub trait AssetTransformer: Transformer {
    fn edit_assets(
        &self,
        config: &InjectionConfig,
        context: &dyn TransformerContext,
        output: &mut dyn FileAccess,
    ) -> Result<(), Error>;
}
