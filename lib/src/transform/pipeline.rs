use crate::jvm::model::Class;
use crate::jvm::Name;
use crate::transform::properties::Properties;
use crate::transform::{
    AssetTransformer, ClassTransformer, Diagnostics, Error, FileAccess, InjectionConfig,
    RemapInjectables, TransformExpectPlatform, Transformer, TransformerContext,
};

/// Every transform of a build, sharing one configuration
#[derive(Debug, Clone)]
pub struct Injector {
    config: InjectionConfig,
    pub expect_platform: TransformExpectPlatform,
    pub remap_injectables: RemapInjectables,
}

impl Injector {
    /// Configure from the global properties of the build
    pub fn new(properties: &Properties) -> Injector {
        Injector::with_config(InjectionConfig::from_properties(properties))
    }

    pub fn with_config(config: InjectionConfig) -> Injector {
        Injector {
            config,
            expect_platform: TransformExpectPlatform::new(),
            remap_injectables: RemapInjectables::new(),
        }
    }

    pub fn config(&self) -> &InjectionConfig {
        &self.config
    }

    /// Hand transformer-level properties to every transform
    pub fn supply_properties(&mut self, properties: &Properties) {
        self.expect_platform.supply_properties(properties);
        self.remap_injectables.supply_properties(properties);
    }

    /// Run the class transforms, in order
    pub fn transform_class(
        &self,
        class: Class,
        diagnostics: &mut Diagnostics,
    ) -> Result<Class, Error> {
        let class = self
            .expect_platform
            .edit_class(&self.config, class, diagnostics)?;
        self.remap_injectables
            .edit_class(&self.config, class, diagnostics)
    }

    /// Run the class transforms over the bytes of a class
    ///
    /// Returns `None` if the class is left as it is, in which case the original bytes should be
    /// used unchanged.
    pub fn transform_class_bytes(
        &self,
        bytes: &[u8],
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<Vec<u8>>, Error> {
        if !self.config.inject_enabled {
            return Ok(None);
        }

        let original = Class::parse(bytes)?;
        let transformed = self.transform_class(original.clone(), diagnostics)?;
        if transformed == original {
            return Ok(None);
        }

        log::debug!("Rewrote {}", transformed.name.as_str());
        Ok(Some(transformed.to_bytes()?))
    }

    /// Emit the classes the transformed classes depend on
    pub fn inject_assets(
        &self,
        context: &dyn TransformerContext,
        output: &mut dyn FileAccess,
    ) -> Result<(), Error> {
        self.remap_injectables
            .edit_assets(&self.config, context, output)
    }
}
