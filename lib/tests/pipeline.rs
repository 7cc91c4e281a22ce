mod common;

use common::*;
use platform_inject::jvm::code::{BranchInstruction, CodeElement, Instruction};
use platform_inject::jvm::model::{Class, Code, ConstantData};
use platform_inject::jvm::{MethodAccessFlags, UnqualifiedName};
use platform_inject::transform::markers::EXPECT_PLATFORM;
use platform_inject::transform::properties::{
    INJECT_INJECTABLES, PLATFORM_PACKAGE, UNIQUE_IDENTIFIER,
};
use platform_inject::transform::{
    Diagnostics, Injector, MemoryAccess, Properties, SimpleTransformerContext,
};
use std::cell::Cell;

fn plain_class() -> Class {
    let mut class = class("com/foo/Plain");
    let mut method = static_method("answer", "()I");
    method.code = Some(Code::from_instructions(vec![
        CodeElement::Instruction(Instruction::BiPush(42)),
        CodeElement::Branch(BranchInstruction::IReturn),
    ]));
    class.methods.push(method);
    class
}

#[test]
fn untouched_classes_keep_their_bytes() {
    let bytes = plain_class().to_bytes().unwrap();
    let mut diagnostics = Diagnostics::new();
    assert_eq!(
        injector(&[]).transform_class_bytes(&bytes, &mut diagnostics).unwrap(),
        None
    );
    assert!(diagnostics.is_empty());

    // Even without any configuration, since nothing needs it
    assert_eq!(
        Injector::new(&Properties::new())
            .transform_class_bytes(&bytes, &mut diagnostics)
            .unwrap(),
        None
    );
}

#[test]
fn malformed_classes_are_errors() {
    let mut bytes = plain_class().to_bytes().unwrap();
    bytes.truncate(bytes.len() / 2);
    assert!(injector(&[])
        .transform_class_bytes(&bytes, &mut Diagnostics::new())
        .is_err());
}

#[test]
fn injects_platform_methods() {
    let asked_to_add = Cell::new(false);
    let context = SimpleTransformerContext::new(
        |_: &[String]| asked_to_add.set(true),
        true,
        true,
        true,
    );
    let mut output = MemoryAccess::new();
    injector(&[]).inject_assets(&context, &mut output).unwrap();
    assert!(!asked_to_add.get());

    let names: Vec<&str> = output.classes.keys().map(String::as_str).collect();
    assert_eq!(names, vec![PLATFORM_METHODS]);

    let class = Class::parse(&output.classes[PLATFORM_METHODS]).unwrap();
    assert_eq!(class.methods.len(), 1);
    let method = &class.methods[0];
    assert_eq!(method.name, UnqualifiedName::GETCURRENTTARGET);
    assert_eq!(
        method.access_flags,
        MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC
    );
    assert_eq!(
        method.code.as_ref().unwrap().instructions[0],
        CodeElement::Instruction(Instruction::Ldc(ConstantData::String("fabric".to_owned())))
    );
}

#[test]
fn disabled_injects_nothing() {
    let context = SimpleTransformerContext::new(|_: &[String]| (), true, true, true);
    let mut output = MemoryAccess::new();
    injector(&[(INJECT_INJECTABLES, "false")])
        .inject_assets(&context, &mut output)
        .unwrap();
    assert!(output.classes.is_empty());
}

#[test]
fn transformer_properties_override_global_ones() {
    let mut injector = injector(&[]);
    injector.supply_properties(&properties(&[
        (PLATFORM_PACKAGE, "neoforge"),
        (UNIQUE_IDENTIFIER, "gen/other"),
    ]));

    let mut class = class("com/foo/Bar");
    class
        .methods
        .push(annotated(static_method("value", "()I"), EXPECT_PLATFORM, false));
    let bytes = injector
        .transform_class_bytes(&class.to_bytes().unwrap(), &mut Diagnostics::new())
        .unwrap()
        .unwrap();
    let rewritten = Class::parse(&bytes).unwrap();
    let shown = format!("{:?}", rewritten.methods[0].code);
    assert!(shown.contains("com/foo/neoforge/BarImpl"), "{}", shown);

    let context = SimpleTransformerContext::new(|_: &[String]| (), true, true, true);
    let mut output = MemoryAccess::new();
    injector.inject_assets(&context, &mut output).unwrap();
    assert!(output.classes.contains_key("gen/other/PlatformMethods"));
    assert_eq!(injector.config().unique_identifier.as_deref(), Some("gen/mymod"));
    assert_eq!(injector.config().platform_name.as_deref(), Some("fabric"));
}
