use crate::jvm::class_file::Version;
use crate::jvm::code::{BranchInstruction, CodeElement, Instruction};
use crate::jvm::model::{Class, Code, ConstantData, Method};
use crate::jvm::remapper::{mentions_class, remap_class, SimpleRemapper};
use crate::jvm::{
    BinaryName, ClassAccessFlags, FieldType, MethodAccessFlags, MethodDescriptor, Name,
    UnqualifiedName,
};
use crate::transform::markers::ARCHITECTURY_TARGET;
use crate::transform::properties::{Properties, UNIQUE_IDENTIFIER};
use crate::transform::{
    AssetTransformer, ClassTransformer, Diagnostics, Error, FileAccess, InjectionConfig,
    Transformer, TransformerContext,
};

/// Class reporting which platform it was built for
///
/// ```java,ignore,no_run
/// public final class PlatformMethods {
///     public static String getCurrentTarget() {
///         return "<platform>";
///     }
/// }
/// ```
pub fn build_platform_methods_class(class_name: BinaryName, platform: &str) -> Class {
    let mut class = Class::new(
        Version::JAVA8,
        ClassAccessFlags::PUBLIC | ClassAccessFlags::FINAL,
        class_name,
        Some(BinaryName::OBJECT),
    );

    let mut get_current_target = Method::new(
        MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
        UnqualifiedName::GETCURRENTTARGET,
        MethodDescriptor {
            parameters: vec![],
            return_type: Some(FieldType::object(BinaryName::STRING)),
        },
    );
    let mut code = Code::from_instructions(vec![
        CodeElement::Instruction(Instruction::Ldc(ConstantData::String(platform.to_owned()))),
        CodeElement::Branch(BranchInstruction::AReturn),
    ]);
    code.max_stack = Some(1);
    code.max_locals = Some(0);
    get_current_target.code = Some(code);
    class.methods.push(get_current_target);

    class
}

/// Points references to the `ArchitecturyTarget` placeholder at a synthesized class
///
/// As an asset transform, this emits the synthesized class. As a class transform, it renames the
/// placeholder everywhere it appears in a class.
#[derive(Debug, Default, Clone)]
pub struct RemapInjectables {
    /// Overrides the configured unique identifier
    pub unique_identifier: Option<String>,
}

impl RemapInjectables {
    pub fn new() -> RemapInjectables {
        RemapInjectables::default()
    }

    pub fn platform_methods_class(&self, config: &InjectionConfig) -> Result<BinaryName, Error> {
        config.platform_methods_class(self.unique_identifier.as_deref())
    }
}

impl Transformer for RemapInjectables {
    fn supply_properties(&mut self, properties: &Properties) {
        if let Some(unique_identifier) = properties.get(UNIQUE_IDENTIFIER) {
            self.unique_identifier = Some(unique_identifier.to_owned());
        }
    }
}

impl AssetTransformer for RemapInjectables {
    fn edit_assets(
        &self,
        config: &InjectionConfig,
        context: &dyn TransformerContext,
        output: &mut dyn FileAccess,
    ) -> Result<(), Error> {
        if !config.inject_enabled {
            return Ok(());
        }
        if !context.can_add_classes() {
            log::warn!("Adding classes is not allowed by the build, but injectables need it");
        }

        let class_name = self.platform_methods_class(config)?;
        let platform = config.platform_name()?;
        let class = build_platform_methods_class(class_name.clone(), platform);
        output.add_class(&class_name, &class.to_bytes()?)?;
        log::info!(
            "Injected {} reporting platform '{}'",
            class_name.as_str(),
            platform
        );
        Ok(())
    }
}

impl ClassTransformer for RemapInjectables {
    fn edit_class(
        &self,
        config: &InjectionConfig,
        class: Class,
        _diagnostics: &mut Diagnostics,
    ) -> Result<Class, Error> {
        // The target class is only needed (and so only has to be configured) once it is used
        if !config.inject_enabled || !mentions_class(&class, ARCHITECTURY_TARGET) {
            return Ok(class);
        }

        let mut remapper = SimpleRemapper::new();
        remapper.add(ARCHITECTURY_TARGET, self.platform_methods_class(config)?);
        Ok(remap_class(&remapper, &class))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transform::properties::{INJECT_INJECTABLES, PLATFORM_NAME};
    use crate::transform::{MemoryAccess, SimpleTransformerContext};

    fn config(properties: &[(&str, &str)]) -> InjectionConfig {
        let mut bag = Properties::new();
        for (key, value) in properties {
            bag.set(*key, *value);
        }
        InjectionConfig::from_properties(&bag)
    }

    #[test]
    fn synthesized_class_shape() {
        let name = BinaryName::from_string("gen/mymod/PlatformMethods".to_owned()).unwrap();
        let class = Class::parse(
            &build_platform_methods_class(name.clone(), "fabric")
                .to_bytes()
                .unwrap(),
        )
        .unwrap();

        assert_eq!(class.version, Version::JAVA8);
        assert_eq!(
            class.access_flags,
            ClassAccessFlags::PUBLIC | ClassAccessFlags::FINAL
        );
        assert_eq!(class.name, name);
        assert_eq!(class.super_name, Some(BinaryName::OBJECT));
        assert!(class.fields.is_empty());
        assert_eq!(class.methods.len(), 1);

        let method = &class.methods[0];
        assert_eq!(method.name, UnqualifiedName::GETCURRENTTARGET);
        assert!(method.is_static());
        let code = method.code.as_ref().unwrap();
        assert_eq!(code.max_stack, Some(1));
        assert_eq!(code.max_locals, Some(0));
        assert_eq!(
            code.instructions,
            vec![
                CodeElement::Instruction(Instruction::Ldc(ConstantData::String(
                    "fabric".to_owned()
                ))),
                CodeElement::Branch(BranchInstruction::AReturn),
            ]
        );
    }

    #[test]
    fn emits_class_when_enabled() {
        let context = SimpleTransformerContext::new(|_: &[String]| (), false, false, true);
        let mut output = MemoryAccess::new();
        let config = config(&[(PLATFORM_NAME, "forge"), (UNIQUE_IDENTIFIER, "gen/mymod")]);

        RemapInjectables::new()
            .edit_assets(&config, &context, &mut output)
            .unwrap();
        let bytes = output.classes.get("gen/mymod/PlatformMethods").unwrap();
        assert_eq!(
            Class::parse(bytes).unwrap().name.as_str(),
            "gen/mymod/PlatformMethods"
        );
    }

    #[test]
    fn nothing_emitted_when_disabled() {
        let context = SimpleTransformerContext::new(|_: &[String]| (), true, true, true);
        let mut output = MemoryAccess::new();
        let config = config(&[(INJECT_INJECTABLES, "false")]);

        RemapInjectables::new()
            .edit_assets(&config, &context, &mut output)
            .unwrap();
        assert!(output.classes.is_empty());
    }

    #[test]
    fn missing_configuration() {
        let context = SimpleTransformerContext::new(|_: &[String]| (), true, true, true);
        let mut output = MemoryAccess::new();

        let no_platform = config(&[(UNIQUE_IDENTIFIER, "gen/mymod")]);
        assert!(matches!(
            RemapInjectables::new().edit_assets(&no_platform, &context, &mut output),
            Err(Error::MissingProperty(PLATFORM_NAME))
        ));

        let no_identifier = config(&[(PLATFORM_NAME, "forge")]);
        assert!(matches!(
            RemapInjectables::new().edit_assets(&no_identifier, &context, &mut output),
            Err(Error::MissingProperty(UNIQUE_IDENTIFIER))
        ));
        assert!(output.classes.is_empty());
    }

    #[test]
    fn identifier_only_needed_by_users_of_the_placeholder() {
        let config = config(&[(PLATFORM_NAME, "fabric")]);
        let mut diagnostics = Diagnostics::new();

        let plain = build_platform_methods_class(
            BinaryName::from_string("com/foo/Plain".to_owned()).unwrap(),
            "fabric",
        );
        let result = RemapInjectables::new()
            .edit_class(&config, plain.clone(), &mut diagnostics)
            .unwrap();
        assert_eq!(result, plain);

        let mut user = plain;
        user.interfaces
            .push(BinaryName::from_string(ARCHITECTURY_TARGET.to_owned()).unwrap());
        assert!(matches!(
            RemapInjectables::new().edit_class(&config, user, &mut diagnostics),
            Err(Error::MissingProperty(UNIQUE_IDENTIFIER))
        ));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn transformer_identifier_wins() {
        let mut transform = RemapInjectables::new();
        let mut properties = Properties::new();
        properties.set(UNIQUE_IDENTIFIER, "gen/local");
        transform.supply_properties(&properties);

        let config = config(&[(UNIQUE_IDENTIFIER, "gen/global")]);
        assert_eq!(
            transform.platform_methods_class(&config).unwrap().as_str(),
            "gen/local/PlatformMethods"
        );
    }
}
