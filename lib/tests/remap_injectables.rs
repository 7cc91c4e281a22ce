mod common;

use common::*;
use platform_inject::jvm::class_file::HandleKind;
use platform_inject::jvm::code::{
    BranchInstruction, CodeElement, Frame, Instruction, InvokeType, Label, VerificationType,
};
use platform_inject::jvm::model::{
    Annotation, BootstrapMethod, Class, Code, ConstantData, ElementValue, ExceptionHandler, Field,
    HandleMember, InnerClass, InvokeDynamic, LocalVariable, MethodHandle, MethodRef, RawAttribute,
};
use platform_inject::jvm::{
    FieldAccessFlags, FieldType, InnerClassAccessFlags, MethodDescriptor, Name, ParseDescriptor,
    RefType,
};
use platform_inject::transform::properties::INJECT_INJECTABLES;
use platform_inject::transform::Diagnostics;

fn target_method(name: &str, descriptor: &str) -> MethodRef {
    MethodRef {
        owner: RefType::Object(binary_name(TARGET)),
        name: unqualified_name(name),
        descriptor: MethodDescriptor::parse(descriptor).unwrap(),
        is_interface: false,
    }
}

/// Class mentioning the placeholder in as many places as possible
fn uses_target() -> Class {
    let mut class = class("com/foo/UsesTarget");
    class.interfaces.push(binary_name(TARGET));
    class.signature = Some(format!(
        "Ljava/lang/Object;Ljava/util/function/Supplier<{}>;",
        TARGET_DESCRIPTOR
    ));
    class.inner_classes.push(InnerClass {
        inner_class: binary_name(TARGET),
        outer_class: Some(binary_name("dev/architectury/injectables/targets/Holder")),
        inner_name: Some("Target".to_owned()),
        access_flags: InnerClassAccessFlags::PUBLIC | InnerClassAccessFlags::STATIC,
    });

    let mut field = Field::new(
        FieldAccessFlags::PRIVATE | FieldAccessFlags::STATIC,
        unqualified_name("cached"),
        FieldType::object(binary_name(TARGET)),
    );
    field.signature = Some(format!("Ljava/util/List<{}>;", TARGET_DESCRIPTOR));
    field.annotations.visible.push(Annotation {
        type_descriptor: TARGET_DESCRIPTOR.to_owned(),
        elements: vec![
            (
                "value".to_owned(),
                ElementValue::Class(TARGET_DESCRIPTOR.to_owned()),
            ),
            (
                "kinds".to_owned(),
                ElementValue::Array(vec![ElementValue::Enum {
                    type_descriptor: TARGET_DESCRIPTOR.to_owned(),
                    const_name: "FIRST".to_owned(),
                }]),
            ),
        ],
    });
    class.fields.push(field);

    // Catches the placeholder, and has a frame and local variable mentioning it
    let (start, end, handler) = (Label(0), Label(1), Label(2));
    let mut current = static_method(
        "current",
        &format!("({})Ljava/lang/String;", TARGET_DESCRIPTOR),
    );
    current.exceptions.push(binary_name(TARGET));
    current.code = Some(Code {
        exception_handlers: vec![ExceptionHandler {
            start,
            end,
            handler,
            catch_type: Some(binary_name(TARGET)),
        }],
        local_variables: vec![LocalVariable {
            start,
            end,
            name: "target".to_owned(),
            descriptor: TARGET_DESCRIPTOR.to_owned(),
            index: 0,
        }],
        frames: vec![(
            handler,
            Frame {
                locals: vec![VerificationType::Object(RefType::Object(binary_name(TARGET)))],
                stack: vec![VerificationType::Object(RefType::Object(binary_name(TARGET)))],
            },
        )],
        ..Code::from_instructions(vec![
            CodeElement::Label(start),
            CodeElement::Instruction(Instruction::Ldc(ConstantData::Class(RefType::Object(
                binary_name(TARGET),
            )))),
            CodeElement::Instruction(Instruction::Pop),
            CodeElement::Instruction(Instruction::Invoke(
                InvokeType::Static,
                target_method("getCurrentTarget", "()Ljava/lang/String;"),
            )),
            CodeElement::Label(end),
            CodeElement::Branch(BranchInstruction::AReturn),
            CodeElement::Label(handler),
            CodeElement::Instruction(Instruction::Pop),
            CodeElement::Instruction(Instruction::AConstNull),
            CodeElement::Branch(BranchInstruction::AReturn),
        ])
    });
    class.methods.push(current);

    // Method reference to the placeholder, through a lambda
    let mut supplier = static_method("supplier", "()Ljava/util/function/Supplier;");
    let metafactory = MethodHandle {
        kind: HandleKind::InvokeStatic,
        member: HandleMember::Method(MethodRef {
            owner: RefType::Object(binary_name("java/lang/invoke/LambdaMetafactory")),
            name: unqualified_name("metafactory"),
            descriptor: MethodDescriptor::parse(
                "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodHandle;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;",
            )
            .unwrap(),
            is_interface: false,
        }),
    };
    supplier.code = Some(Code::from_instructions(vec![
        CodeElement::Instruction(Instruction::InvokeDynamic(InvokeDynamic {
            bootstrap: BootstrapMethod {
                handle: metafactory,
                arguments: vec![
                    ConstantData::MethodType(MethodDescriptor::parse("()Ljava/lang/Object;").unwrap()),
                    ConstantData::MethodHandle(MethodHandle {
                        kind: HandleKind::InvokeStatic,
                        member: HandleMember::Method(target_method(
                            "getCurrentTarget",
                            "()Ljava/lang/String;",
                        )),
                    }),
                    ConstantData::MethodType(MethodDescriptor::parse("()Ljava/lang/String;").unwrap()),
                ],
            },
            name: unqualified_name("get"),
            descriptor: MethodDescriptor::parse("()Ljava/util/function/Supplier;").unwrap(),
        })),
        CodeElement::Branch(BranchInstruction::AReturn),
    ]));
    class.methods.push(supplier);

    class
}

fn rewrite(class: &Class) -> Vec<u8> {
    injector(&[])
        .transform_class_bytes(&class.to_bytes().unwrap(), &mut Diagnostics::new())
        .unwrap()
        .expect("class should be rewritten")
}

fn rewritten() -> Class {
    Class::parse(&rewrite(&uses_target())).unwrap()
}

fn mentions(bytes: &[u8], needle: &str) -> bool {
    bytes
        .windows(needle.len())
        .any(|window| window == needle.as_bytes())
}

#[test]
fn placeholder_is_gone() {
    let bytes = rewrite(&uses_target());
    assert!(!mentions(&bytes, "ArchitecturyTarget"));
    assert!(mentions(&bytes, PLATFORM_METHODS));

    let shown = format!("{:?}", Class::parse(&bytes).unwrap());
    assert!(!shown.contains("ArchitecturyTarget"), "{}", shown);
}

#[test]
fn bootstrap_table_is_remapped_in_place() {
    // A verbatim attribute pins the old constant pool
    let mut class = Class::parse(&uses_target().to_bytes().unwrap()).unwrap();
    class.attributes.push(RawAttribute {
        name: "Deprecated".to_owned(),
        info: vec![],
    });
    assert_eq!(class.bootstrap_methods.len(), 1);

    let rewritten = Class::parse(&rewrite(&class)).unwrap();
    assert!(rewritten.constant_pool.is_some());
    assert_eq!(rewritten.attributes, class.attributes);

    let table = format!("{:?}", rewritten.bootstrap_methods);
    assert!(!table.contains("ArchitecturyTarget"), "{}", table);
    assert!(table.contains(PLATFORM_METHODS), "{}", table);

    // The call site shares the remapped entry instead of appending another one
    assert_eq!(rewritten.bootstrap_methods.len(), 1);
}

#[test]
fn class_level_positions() {
    let class = rewritten();
    assert_eq!(class.name.as_str(), "com/foo/UsesTarget");
    assert_eq!(class.interfaces, vec![binary_name(PLATFORM_METHODS)]);
    assert_eq!(
        class.signature.as_deref(),
        Some("Ljava/lang/Object;Ljava/util/function/Supplier<Lgen/mymod/PlatformMethods;>;")
    );

    // Only the placeholder itself is renamed
    let inner_class = &class.inner_classes[0];
    assert_eq!(inner_class.inner_class, binary_name(PLATFORM_METHODS));
    assert_eq!(
        inner_class.outer_class,
        Some(binary_name("dev/architectury/injectables/targets/Holder"))
    );
    assert_eq!(inner_class.inner_name.as_deref(), Some("Target"));
}

#[test]
fn field_positions() {
    let class = rewritten();
    let field = &class.fields[0];
    let renamed = "Lgen/mymod/PlatformMethods;";
    assert_eq!(field.descriptor, FieldType::object(binary_name(PLATFORM_METHODS)));
    assert_eq!(
        field.signature.as_deref(),
        Some("Ljava/util/List<Lgen/mymod/PlatformMethods;>;")
    );

    let annotation = &field.annotations.visible[0];
    assert_eq!(annotation.type_descriptor, renamed);
    assert_eq!(
        annotation.elements[0].1,
        ElementValue::Class(renamed.to_owned())
    );
    assert_eq!(
        annotation.elements[1].1,
        ElementValue::Array(vec![ElementValue::Enum {
            type_descriptor: renamed.to_owned(),
            const_name: "FIRST".to_owned(),
        }])
    );
}

#[test]
fn method_body_positions() {
    let class = rewritten();
    let method = &class.methods[0];
    assert_eq!(
        method.descriptor,
        MethodDescriptor::parse("(Lgen/mymod/PlatformMethods;)Ljava/lang/String;").unwrap()
    );
    assert_eq!(method.exceptions, vec![binary_name(PLATFORM_METHODS)]);

    let code = method.code.as_ref().unwrap();
    let renamed = RefType::Object(binary_name(PLATFORM_METHODS));
    let instructions: Vec<_> = code
        .instructions
        .iter()
        .filter_map(|element| match element {
            CodeElement::Instruction(instruction) => Some(instruction),
            _ => None,
        })
        .collect();
    assert_eq!(
        instructions[0],
        &Instruction::Ldc(ConstantData::Class(renamed.clone()))
    );
    match instructions[2] {
        Instruction::Invoke(InvokeType::Static, method_ref) => {
            assert_eq!(method_ref.owner, renamed);
            assert_eq!(method_ref.name.as_str(), "getCurrentTarget");
        }
        other => panic!("expected invokestatic, got {:?}", other),
    }

    assert_eq!(
        code.exception_handlers[0].catch_type,
        Some(binary_name(PLATFORM_METHODS))
    );
    assert_eq!(
        code.local_variables[0].descriptor,
        "Lgen/mymod/PlatformMethods;"
    );
    let (_, frame) = &code.frames[0];
    assert_eq!(
        frame.stack,
        vec![VerificationType::Object(renamed.clone())]
    );
    assert_eq!(frame.locals, vec![VerificationType::Object(renamed)]);
}

#[test]
fn bootstrap_arguments() {
    let class = rewritten();
    let code = class.methods[1].code.as_ref().unwrap();
    let indy = match &code.instructions[0] {
        CodeElement::Instruction(Instruction::InvokeDynamic(indy)) => indy,
        other => panic!("expected invokedynamic, got {:?}", other),
    };
    match &indy.bootstrap.handle.member {
        HandleMember::Method(method_ref) => assert_eq!(
            method_ref.owner,
            RefType::Object(binary_name("java/lang/invoke/LambdaMetafactory"))
        ),
        other => panic!("expected a method handle, got {:?}", other),
    }
    match &indy.bootstrap.arguments[1] {
        ConstantData::MethodHandle(MethodHandle {
            member: HandleMember::Method(method_ref),
            ..
        }) => assert_eq!(method_ref.owner, RefType::Object(binary_name(PLATFORM_METHODS))),
        other => panic!("expected a method handle, got {:?}", other),
    }
}

#[test]
fn disabled_leaves_placeholder() {
    let result = injector(&[(INJECT_INJECTABLES, "false")])
        .transform_class_bytes(&uses_target().to_bytes().unwrap(), &mut Diagnostics::new())
        .unwrap();
    assert_eq!(result, None);
}
