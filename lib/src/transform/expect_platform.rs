use crate::jvm::code::{BranchInstruction, CodeElement, Instruction, InvokeType};
use crate::jvm::model::{
    Annotation, Class, Code, CodeBranchInstruction, CodeInstruction, Element, Method, MethodRef,
};
use crate::jvm::{BaseType, BinaryName, FieldType, MethodDescriptor, Name, RefType, RenderDescriptor};
use crate::transform::markers::{ExpectPlatform, EXPECT_PLATFORM_TRANSFORMED};
use crate::transform::properties::{Properties, PLATFORM_PACKAGE};
use crate::transform::{
    platform_class, ClassTransformer, Diagnostic, Diagnostics, Error, InjectionConfig,
    Transformer,
};
use crate::util::Width;

/// Turns `@ExpectPlatform` methods into stubs forwarding to the current platform's implementation
///
/// Given
///
/// ```java,ignore,no_run
/// package com.foo;
///
/// public class Bar {
///     @ExpectPlatform
///     public static int answer(long seed, String salt) {
///         throw new AssertionError();
///     }
/// }
/// ```
///
/// the body of `answer` becomes `return com.foo.fabric.BarImpl.answer(seed, salt);` when building
/// for Fabric.
#[derive(Debug, Default, Clone)]
pub struct TransformExpectPlatform {
    /// Overrides the configured platform package
    pub platform_package: Option<String>,
}

impl TransformExpectPlatform {
    pub fn new() -> TransformExpectPlatform {
        TransformExpectPlatform::default()
    }

    /// Does the method carry the annotation (in any spelling)?
    pub fn is_expect_platform(method: &Method) -> bool {
        method
            .annotations
            .iter()
            .any(|annotation| ExpectPlatform::from_descriptor(&annotation.type_descriptor).is_some())
    }
}

impl Transformer for TransformExpectPlatform {
    fn supply_properties(&mut self, properties: &Properties) {
        self.platform_package = properties.get(PLATFORM_PACKAGE).map(String::from);
    }
}

impl ClassTransformer for TransformExpectPlatform {
    fn edit_class(
        &self,
        config: &InjectionConfig,
        mut class: Class,
        diagnostics: &mut Diagnostics,
    ) -> Result<Class, Error> {
        if !config.inject_enabled {
            return Ok(class);
        }

        // Only resolve the platform class when something needs it, so that classes without
        // annotated methods go through even if the platform isn't configured
        let mut target: Option<BinaryName> = None;

        for method in &mut class.methods {
            if !TransformExpectPlatform::is_expect_platform(method) {
                continue;
            }
            if !method.is_static() {
                diagnostics.report(Diagnostic::NonStaticExpectPlatform {
                    class: class.name.clone(),
                    method: method.name.clone(),
                    descriptor: method.descriptor.render(),
                });
                continue;
            }

            let target = match target.clone() {
                Some(target) => target,
                None => {
                    let resolved =
                        platform_class(config, self.platform_package.as_deref(), &class.name)?;
                    target = Some(resolved.clone());
                    resolved
                }
            };

            let body = forwarding_body(method, target.clone());
            let already_forwarding = matches!(&method.code, Some(code) if code.instructions == body);
            if !already_forwarding {
                log::debug!(
                    "Forwarding {}.{}{} to {}",
                    class.name.as_str(),
                    method.name.as_str(),
                    method.descriptor.render(),
                    target.as_str()
                );
                let max_locals = method.code.as_ref().and_then(|code| code.max_locals);
                let mut code = Code::from_instructions(body);
                code.max_locals = max_locals;
                method.code = Some(code);
            }

            if !method.annotations.contains(EXPECT_PLATFORM_TRANSFORMED) {
                method
                    .annotations
                    .invisible
                    .push(Annotation::marker(EXPECT_PLATFORM_TRANSFORMED));
            }
        }

        Ok(class)
    }
}

/// Load every parameter, call the same method on `target`, and return the result
fn forwarding_body(method: &Method, target: BinaryName) -> Vec<Element> {
    let descriptor: &MethodDescriptor<BinaryName> = &method.descriptor;
    let mut body = Vec::with_capacity(descriptor.parameters.len() + 2);

    let mut slot: u16 = 0;
    for parameter in &descriptor.parameters {
        body.push(CodeElement::Instruction(load(parameter, slot)));
        slot += parameter.width() as u16;
    }

    body.push(CodeElement::Instruction(Instruction::Invoke(
        InvokeType::Static,
        MethodRef {
            owner: RefType::Object(target),
            name: method.name.clone(),
            descriptor: descriptor.clone(),
            is_interface: false,
        },
    )));
    body.push(CodeElement::Branch(return_instruction(
        descriptor.return_type.as_ref(),
    )));
    body
}

fn load(field_type: &FieldType<BinaryName>, slot: u16) -> CodeInstruction {
    match field_type {
        FieldType::Base(BaseType::Long) => Instruction::LLoad(slot),
        FieldType::Base(BaseType::Float) => Instruction::FLoad(slot),
        FieldType::Base(BaseType::Double) => Instruction::DLoad(slot),
        FieldType::Base(_) => Instruction::ILoad(slot),
        FieldType::Ref(_) => Instruction::ALoad(slot),
    }
}

fn return_instruction(return_type: Option<&FieldType<BinaryName>>) -> CodeBranchInstruction {
    match return_type {
        None => BranchInstruction::Return,
        Some(FieldType::Base(BaseType::Long)) => BranchInstruction::LReturn,
        Some(FieldType::Base(BaseType::Float)) => BranchInstruction::FReturn,
        Some(FieldType::Base(BaseType::Double)) => BranchInstruction::DReturn,
        Some(FieldType::Base(_)) => BranchInstruction::IReturn,
        Some(FieldType::Ref(_)) => BranchInstruction::AReturn,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::Version;
    use crate::jvm::{ClassAccessFlags, MethodAccessFlags, ParseDescriptor, UnqualifiedName};
    use crate::transform::properties::PLATFORM_NAME;

    fn config(platform: &str) -> InjectionConfig {
        let mut properties = Properties::new();
        properties.set(PLATFORM_NAME, platform);
        InjectionConfig::from_properties(&properties)
    }

    fn method(flags: MethodAccessFlags, name: &str, descriptor: &str) -> Method {
        Method::new(
            flags,
            UnqualifiedName::from_string(name.to_owned()).unwrap(),
            MethodDescriptor::parse(descriptor).unwrap(),
        )
    }

    fn class_with(methods: Vec<Method>) -> Class {
        let mut class = Class::new(
            Version::JAVA8,
            ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            BinaryName::from_string("com/foo/Bar".to_owned()).unwrap(),
            Some(BinaryName::OBJECT),
        );
        class.methods = methods;
        class
    }

    #[test]
    fn forwarding_loads_by_slot() {
        let mut annotated = method(
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            "mix",
            "(IJLjava/lang/String;DF[I)D",
        );
        annotated
            .annotations
            .invisible
            .push(Annotation::marker(ExpectPlatform::Current.descriptor()));

        let mut diagnostics = Diagnostics::new();
        let class = TransformExpectPlatform::new()
            .edit_class(&config("forge"), class_with(vec![annotated]), &mut diagnostics)
            .unwrap();
        assert!(diagnostics.is_empty());

        let code = class.methods[0].code.as_ref().unwrap();
        let target = RefType::Object(BinaryName::from_string("com/foo/forge/BarImpl".to_owned()).unwrap());
        let expected: Vec<Element> = vec![
            CodeElement::Instruction(Instruction::ILoad(0)),
            CodeElement::Instruction(Instruction::LLoad(1)),
            CodeElement::Instruction(Instruction::ALoad(3)),
            CodeElement::Instruction(Instruction::DLoad(4)),
            CodeElement::Instruction(Instruction::FLoad(6)),
            CodeElement::Instruction(Instruction::ALoad(7)),
            CodeElement::Instruction(Instruction::Invoke(
                InvokeType::Static,
                MethodRef {
                    owner: target,
                    name: UnqualifiedName::from_string("mix".to_owned()).unwrap(),
                    descriptor: MethodDescriptor::parse("(IJLjava/lang/String;DF[I)D").unwrap(),
                    is_interface: false,
                },
            )),
            CodeElement::Branch(BranchInstruction::DReturn),
        ];
        assert_eq!(code.instructions, expected);
        assert_eq!(code.max_stack, None);
        assert!(class.methods[0].annotations.contains(EXPECT_PLATFORM_TRANSFORMED));
    }

    #[test]
    fn instance_methods_are_reported() {
        let mut annotated = method(MethodAccessFlags::PUBLIC, "instance", "()V");
        annotated
            .annotations
            .visible
            .push(Annotation::marker(ExpectPlatform::Legacy.descriptor()));
        let original = class_with(vec![annotated]);

        let mut diagnostics = Diagnostics::new();
        let class = TransformExpectPlatform::new()
            .edit_class(&config("fabric"), original.clone(), &mut diagnostics)
            .unwrap();
        assert_eq!(class, original);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics
            .iter()
            .next()
            .unwrap()
            .to_string()
            .starts_with("@ExpectPlatform can only apply to static methods!"));
    }

    #[test]
    fn unannotated_classes_need_no_platform() {
        let plain = class_with(vec![method(
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            "plain",
            "()V",
        )]);
        let class = TransformExpectPlatform::new()
            .edit_class(&InjectionConfig::default(), plain.clone(), &mut Diagnostics::new())
            .unwrap();
        assert_eq!(class, plain);
    }

    #[test]
    fn transformer_package_wins() {
        let mut annotated = method(
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            "name",
            "()Ljava/lang/String;",
        );
        annotated
            .annotations
            .invisible
            .push(Annotation::marker(ExpectPlatform::LegacyAnnotations.descriptor()));

        let mut transform = TransformExpectPlatform::new();
        let mut properties = Properties::new();
        properties.set(PLATFORM_PACKAGE, "neoforge");
        transform.supply_properties(&properties);

        let class = transform
            .edit_class(&config("forge"), class_with(vec![annotated]), &mut Diagnostics::new())
            .unwrap();
        let code = class.methods[0].code.as_ref().unwrap();
        match &code.instructions[0] {
            CodeElement::Instruction(Instruction::Invoke(InvokeType::Static, method_ref)) => {
                assert_eq!(
                    method_ref.owner,
                    RefType::Object(BinaryName::from_string("com/foo/neoforge/BarImpl".to_owned()).unwrap())
                );
            }
            other => panic!("expected invokestatic, got {:?}", other),
        }
        assert_eq!(
            code.instructions[1],
            CodeElement::Branch(BranchInstruction::AReturn)
        );
    }
}
