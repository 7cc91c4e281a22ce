mod common;

use common::*;
use platform_inject::jvm::code::{BranchInstruction, CodeElement, Instruction, InvokeType};
use platform_inject::jvm::model::{
    Class, Code, CodeBranchInstruction, ConstantData, Element, Method, MethodRef,
};
use platform_inject::jvm::{MethodAccessFlags, MethodDescriptor, Name, ParseDescriptor, RefType};
use platform_inject::transform::markers::{
    EXPECT_PLATFORM, EXPECT_PLATFORM_LEGACY, EXPECT_PLATFORM_LEGACY2,
    EXPECT_PLATFORM_TRANSFORMED,
};
use platform_inject::transform::properties::{INJECT_INJECTABLES, PLATFORM_NAME};
use platform_inject::transform::{Diagnostic, Diagnostics, Error, Injector, Properties};

/// Body which doesn't forward anywhere (`throw new AssertionError()`)
fn placeholder_body() -> Code {
    Code::from_instructions(vec![
        CodeElement::Instruction(Instruction::New(RefType::Object(binary_name(
            "java/lang/AssertionError",
        )))),
        CodeElement::Instruction(Instruction::Dup),
        CodeElement::Instruction(Instruction::Invoke(
            InvokeType::Special,
            MethodRef {
                owner: RefType::Object(binary_name("java/lang/AssertionError")),
                name: unqualified_name("<init>"),
                descriptor: MethodDescriptor::parse("()V").unwrap(),
                is_interface: false,
            },
        )),
        CodeElement::Branch(BranchInstruction::AThrow),
    ])
}

fn expect_platform(name: &str, descriptor: &str) -> Method {
    let mut method = annotated(static_method(name, descriptor), EXPECT_PLATFORM, false);
    method.code = Some(placeholder_body());
    method
}

/// Transform the class through its bytes, and parse the result back
fn rewrite(injector: &Injector, class: &Class) -> (Class, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let bytes = injector
        .transform_class_bytes(&class.to_bytes().unwrap(), &mut diagnostics)
        .unwrap()
        .expect("class should be rewritten");
    (Class::parse(&bytes).unwrap(), diagnostics)
}

fn invoke(owner: &str, name: &str, descriptor: &str) -> Element {
    CodeElement::Instruction(Instruction::Invoke(
        InvokeType::Static,
        MethodRef {
            owner: RefType::Object(binary_name(owner)),
            name: unqualified_name(name),
            descriptor: MethodDescriptor::parse(descriptor).unwrap(),
            is_interface: false,
        },
    ))
}

#[test]
fn parameters_are_loaded_by_slot() {
    let descriptor = "(ZBCSIJFDLjava/lang/Object;[[J)J";
    let mut class = class("com/foo/Bar");
    class.methods.push(expect_platform("everything", descriptor));

    let (rewritten, diagnostics) = rewrite(&injector(&[]), &class);
    assert!(diagnostics.is_empty());

    let code = rewritten.methods[0].code.as_ref().unwrap();
    let expected: Vec<Element> = vec![
        CodeElement::Instruction(Instruction::ILoad(0)),
        CodeElement::Instruction(Instruction::ILoad(1)),
        CodeElement::Instruction(Instruction::ILoad(2)),
        CodeElement::Instruction(Instruction::ILoad(3)),
        CodeElement::Instruction(Instruction::ILoad(4)),
        CodeElement::Instruction(Instruction::LLoad(5)),
        CodeElement::Instruction(Instruction::FLoad(7)),
        CodeElement::Instruction(Instruction::DLoad(8)),
        CodeElement::Instruction(Instruction::ALoad(10)),
        CodeElement::Instruction(Instruction::ALoad(11)),
        invoke("com/foo/fabric/BarImpl", "everything", descriptor),
        CodeElement::Branch(BranchInstruction::LReturn),
    ];
    assert_eq!(code.instructions, expected);
    assert_eq!(code.max_stack, Some(12));
    assert_eq!(code.max_locals, Some(12));
    assert!(code.exception_handlers.is_empty());
}

#[test]
fn return_matches_descriptor() {
    let cases: [(&str, CodeBranchInstruction); 9] = [
        ("()V", BranchInstruction::Return),
        ("()I", BranchInstruction::IReturn),
        ("()Z", BranchInstruction::IReturn),
        ("()C", BranchInstruction::IReturn),
        ("()J", BranchInstruction::LReturn),
        ("()F", BranchInstruction::FReturn),
        ("()D", BranchInstruction::DReturn),
        ("()Ljava/lang/String;", BranchInstruction::AReturn),
        ("()[I", BranchInstruction::AReturn),
    ];

    let mut class = class("com/foo/Returns");
    for (idx, (descriptor, _)) in cases.iter().enumerate() {
        class
            .methods
            .push(expect_platform(&format!("m{}", idx), descriptor));
    }

    let (rewritten, _) = rewrite(&injector(&[]), &class);
    for (method, (descriptor, expected_return)) in rewritten.methods.iter().zip(cases) {
        let code = method.code.as_ref().unwrap();
        assert_eq!(
            code.instructions,
            vec![
                invoke("com/foo/fabric/ReturnsImpl", method.name.as_str(), descriptor),
                CodeElement::Branch(expected_return),
            ],
            "wrong body for {}",
            descriptor
        );
    }
}

#[test]
fn every_spelling_in_either_list() {
    let mut class = class("com/foo/Legacy$Nested");
    for (idx, spelling) in [EXPECT_PLATFORM, EXPECT_PLATFORM_LEGACY, EXPECT_PLATFORM_LEGACY2]
        .iter()
        .enumerate()
    {
        for visible in [false, true] {
            let mut method = annotated(
                static_method(&format!("m{}_{}", idx, visible), "()I"),
                spelling,
                visible,
            );
            method.code = Some(placeholder_body());
            class.methods.push(method);
        }
    }

    let (rewritten, _) = rewrite(&injector(&[]), &class);
    for method in &rewritten.methods {
        let code = method.code.as_ref().unwrap();
        assert_eq!(
            code.instructions[0],
            invoke(
                "com/foo/fabric/LegacyNestedImpl",
                method.name.as_str(),
                "()I"
            )
        );

        // The marker is always class-file retained, never runtime visible
        assert!(method
            .annotations
            .invisible
            .iter()
            .any(|annotation| annotation.type_descriptor == EXPECT_PLATFORM_TRANSFORMED));
        assert!(!method
            .annotations
            .visible
            .iter()
            .any(|annotation| annotation.type_descriptor == EXPECT_PLATFORM_TRANSFORMED));
    }
}

#[test]
fn unannotated_methods_are_untouched() {
    let mut class = class("com/foo/Mixed");
    let mut plain = static_method("plain", "()Ljava/lang/String;");
    plain.code = Some(Code::from_instructions(vec![
        CodeElement::Instruction(Instruction::Ldc(ConstantData::String("common".to_owned()))),
        CodeElement::Branch(BranchInstruction::AReturn),
    ]));
    class.methods.push(plain);
    class.methods.push(expect_platform("special", "()V"));

    let original = Class::parse(&class.to_bytes().unwrap()).unwrap();
    let (rewritten, _) = rewrite(&injector(&[]), &class);
    assert_eq!(rewritten.methods[0], original.methods[0]);
    assert_ne!(rewritten.methods[1], original.methods[1]);
}

#[test]
fn instance_methods_are_reported() {
    let mut class = class("com/foo/Instance");
    let mut method = annotated(static_method("notStatic", "(I)I"), EXPECT_PLATFORM, false);
    method.access_flags.remove(MethodAccessFlags::STATIC);
    method.code = Some(placeholder_body());
    class.methods.push(method);

    let mut diagnostics = Diagnostics::new();
    let result = injector(&[])
        .transform_class_bytes(&class.to_bytes().unwrap(), &mut diagnostics)
        .unwrap();
    assert_eq!(result, None);

    let reported: Vec<&Diagnostic> = diagnostics.iter().collect();
    assert_eq!(reported.len(), 1);
    match reported[0] {
        Diagnostic::NonStaticExpectPlatform {
            class,
            method,
            descriptor,
        } => {
            assert_eq!(class.as_str(), "com/foo/Instance");
            assert_eq!(method.as_str(), "notStatic");
            assert_eq!(descriptor, "(I)I");
        }
    }
}

#[test]
fn rewriting_twice_changes_nothing() {
    let mut class = class("com/foo/Twice");
    class
        .methods
        .push(expect_platform("value", "(JLjava/lang/String;)D"));
    let injector = injector(&[]);

    let mut diagnostics = Diagnostics::new();
    let once = injector
        .transform_class_bytes(&class.to_bytes().unwrap(), &mut diagnostics)
        .unwrap()
        .unwrap();
    let twice = injector
        .transform_class_bytes(&once, &mut diagnostics)
        .unwrap();
    assert_eq!(twice, None);

    let reparsed = Class::parse(&once).unwrap();
    let method = &reparsed.methods[0];
    let markers = method
        .annotations
        .iter()
        .filter(|annotation| annotation.type_descriptor == EXPECT_PLATFORM_TRANSFORMED)
        .count();
    assert_eq!(markers, 1);
}

#[test]
fn disabled_injection_leaves_bytes() {
    let mut class = class("com/foo/Disabled");
    class.methods.push(expect_platform("value", "()I"));

    for value in ["false", "no", "TRUE"] {
        let result = injector(&[(INJECT_INJECTABLES, value)])
            .transform_class_bytes(&class.to_bytes().unwrap(), &mut Diagnostics::new())
            .unwrap();
        assert_eq!(result, None, "injection should be off for '{}'", value);
    }
}

#[test]
fn missing_platform_is_fatal() {
    let mut class = class("com/foo/Bar");
    class.methods.push(expect_platform("value", "()I"));

    let injector = Injector::new(&Properties::new());
    let result = injector.transform_class_bytes(&class.to_bytes().unwrap(), &mut Diagnostics::new());
    match result {
        Err(Error::MissingProperty(key)) => assert_eq!(key, PLATFORM_NAME),
        other => panic!("expected a missing property, got {:?}", other),
    }
}

#[test]
fn quilt_builds_call_fabric() {
    let mut class = class("com/foo/Bar");
    class.methods.push(expect_platform("value", "()I"));

    let (rewritten, _) = rewrite(&injector(&[(PLATFORM_NAME, "quilt")]), &class);
    let code = rewritten.methods[0].code.as_ref().unwrap();
    assert_eq!(
        code.instructions[0],
        invoke("com/foo/fabric/BarImpl", "value", "()I")
    );
}
