//! Renaming classes everywhere they are referenced
//!
//! A [`Remapper`] decides the new name of a class. [`remap_class`] then produces a copy of a class
//! in which every structured position that mentions a class name (member descriptors, generic
//! signatures, instruction operands, annotations, stack map frames, etc.) uses the new names.
//! Verbatim attributes are opaque, so they are copied as-is.

use crate::jvm::code::CodeElement;
use crate::jvm::model::{
    Annotation, Annotations, BootstrapMethod, Class, Code, CodeFrame, ConstantData,
    DynamicConstant, ElementValue, EnclosingMethod, ExceptionHandler, Field, FieldRef,
    HandleMember, InnerClass, InvokeDynamic, LocalVariable, Method, MethodHandle, MethodRef,
    ParameterAnnotations, RecordComponent,
};
use crate::jvm::{
    BinaryName, FieldType, MethodDescriptor, Name, ParseDescriptor, RefType, RenderDescriptor,
};
use std::cell::Cell;
use std::collections::HashMap;
use std::convert::Infallible;

pub trait Remapper {
    /// New name for a class, or `None` if the class keeps its name
    fn map_class_name(&self, name: &str) -> Option<BinaryName>;

    fn map_binary_name(&self, name: &BinaryName) -> BinaryName {
        self.map_class_name(name.as_str())
            .unwrap_or_else(|| name.clone())
    }

    fn map_ref_type(&self, ref_type: &RefType<BinaryName>) -> RefType<BinaryName> {
        ref_type.map(|name| self.map_binary_name(name))
    }

    fn map_field_type(&self, field_type: &FieldType<BinaryName>) -> FieldType<BinaryName> {
        field_type.map(|name| self.map_binary_name(name))
    }

    fn map_method_descriptor(
        &self,
        descriptor: &MethodDescriptor<BinaryName>,
    ) -> MethodDescriptor<BinaryName> {
        descriptor.map(|name| self.map_binary_name(name))
    }

    /// Remap a field descriptor (or `V`) held as a string
    ///
    /// Malformed descriptors are left alone.
    fn map_descriptor(&self, descriptor: &str) -> String {
        if descriptor == "V" {
            return descriptor.to_owned();
        }
        match FieldType::<BinaryName>::parse(descriptor) {
            Ok(field_type) => self.map_field_type(&field_type).render(),
            Err(_) => {
                log::warn!("Not remapping malformed descriptor '{}'", descriptor);
                descriptor.to_owned()
            }
        }
    }

    /// Remap a class, method, or field generic signature
    ///
    /// Malformed signatures are left alone.
    fn map_signature(&self, signature: &str) -> String {
        let mut remapper = SignatureRemapper {
            remapper: self,
            signature,
            position: 0,
            output: String::with_capacity(signature.len()),
        };
        match remapper.signature() {
            Some(()) => remapper.output,
            None => {
                log::warn!("Not remapping malformed signature '{}'", signature);
                signature.to_owned()
            }
        }
    }
}

/// Doesn't rename anything
pub struct IdentityRemapper;

impl Remapper for IdentityRemapper {
    fn map_class_name(&self, _name: &str) -> Option<BinaryName> {
        None
    }
}

/// Renames the classes in a fixed table
pub struct SimpleRemapper(HashMap<String, BinaryName>);

impl SimpleRemapper {
    pub fn new() -> SimpleRemapper {
        SimpleRemapper(HashMap::new())
    }

    pub fn add(&mut self, from: impl Into<String>, to: BinaryName) {
        self.0.insert(from.into(), to);
    }
}

impl Default for SimpleRemapper {
    fn default() -> Self {
        SimpleRemapper::new()
    }
}

impl Remapper for SimpleRemapper {
    fn map_class_name(&self, name: &str) -> Option<BinaryName> {
        self.0.get(name).cloned()
    }
}

/// Single pass over a generic signature, copying it to the output with class names remapped
///
/// Follows the grammar in section 4.7.9.1 of the JVM specification. Every method returns `None`
/// on a malformed signature.
struct SignatureRemapper<'a, R: ?Sized> {
    remapper: &'a R,
    signature: &'a str,
    position: usize,
    output: String,
}

impl<'a, R: Remapper + ?Sized> SignatureRemapper<'a, R> {
    fn peek(&self) -> Option<u8> {
        self.signature.as_bytes().get(self.position).copied()
    }

    /// Copy the next character, which must be `expected`
    fn expect(&mut self, expected: u8) -> Option<()> {
        if self.peek()? != expected {
            return None;
        }
        self.output.push(expected as char);
        self.position += 1;
        Some(())
    }

    /// Read an identifier (possibly with `/` separators when `allow_slash`)
    fn identifier(&mut self, allow_slash: bool) -> Option<&'a str> {
        let start = self.position;
        while let Some(c) = self.peek() {
            match c {
                b'.' | b';' | b'[' | b'<' | b'>' | b':' => break,
                b'/' if !allow_slash => break,
                _ => self.position += 1,
            }
        }
        let signature = self.signature;
        if start == self.position {
            None
        } else {
            Some(&signature[start..self.position])
        }
    }

    /// Class, method, or field signature, which must be consumed entirely
    fn signature(&mut self) -> Option<()> {
        if self.peek()? == b'<' {
            self.type_parameters()?;
        }
        if self.peek()? == b'(' {
            self.expect(b'(')?;
            while self.peek()? != b')' {
                self.java_type()?;
            }
            self.expect(b')')?;
            self.java_type()?;
            while self.peek() == Some(b'^') {
                self.expect(b'^')?;
                self.reference_type()?;
            }
        } else {
            while self.peek().is_some() {
                self.reference_type()?;
            }
        }
        if self.position == self.signature.len() {
            Some(())
        } else {
            None
        }
    }

    fn type_parameters(&mut self) -> Option<()> {
        self.expect(b'<')?;
        while self.peek()? != b'>' {
            let name = self.identifier(false)?;
            self.output.push_str(name);

            // Class bound (possibly empty), then interface bounds
            self.expect(b':')?;
            if matches!(self.peek()?, b'L' | b'T' | b'[') {
                self.reference_type()?;
            }
            while self.peek()? == b':' {
                self.expect(b':')?;
                self.reference_type()?;
            }
        }
        self.expect(b'>')
    }

    fn java_type(&mut self) -> Option<()> {
        match self.peek()? {
            c @ (b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b'V') => self.expect(c),
            _ => self.reference_type(),
        }
    }

    fn reference_type(&mut self) -> Option<()> {
        match self.peek()? {
            b'L' => self.class_type(),
            b'T' => {
                self.expect(b'T')?;
                let name = self.identifier(false)?;
                self.output.push_str(name);
                self.expect(b';')
            }
            b'[' => {
                self.expect(b'[')?;
                self.java_type()
            }
            _ => None,
        }
    }

    fn class_type(&mut self) -> Option<()> {
        self.expect(b'L')?;
        let mut class_name = self.identifier(true)?.to_owned();
        let mapped = self.remapper.map_class_name(&class_name);
        match &mapped {
            Some(mapped) => self.output.push_str(mapped.as_str()),
            None => self.output.push_str(&class_name),
        }

        loop {
            match self.peek()? {
                b'<' => self.type_arguments()?,
                b'.' => {
                    self.expect(b'.')?;
                    let inner_name = self.identifier(false)?;

                    // The inner class keeps the suffix after its (renamed) outer class
                    let outer_prefix = format!(
                        "{}$",
                        self.remapper
                            .map_class_name(&class_name)
                            .as_ref()
                            .map_or(class_name.as_str(), |name| name.as_str())
                    );
                    class_name = format!("{}${}", class_name, inner_name);
                    match self.remapper.map_class_name(&class_name) {
                        None => self.output.push_str(inner_name),
                        Some(mapped) => {
                            let mapped = mapped.as_str();
                            let suffix = match mapped.strip_prefix(outer_prefix.as_str()) {
                                Some(suffix) => suffix,
                                None => &mapped[mapped.rfind('$').map_or(0, |idx| idx + 1)..],
                            };
                            self.output.push_str(suffix);
                        }
                    }
                }
                b';' => return self.expect(b';'),
                _ => return None,
            }
        }
    }

    fn type_arguments(&mut self) -> Option<()> {
        self.expect(b'<')?;
        while self.peek()? != b'>' {
            match self.peek()? {
                b'*' => self.expect(b'*')?,
                c @ (b'+' | b'-') => {
                    self.expect(c)?;
                    self.reference_type()?;
                }
                _ => self.reference_type()?,
            }
        }
        self.expect(b'>')
    }
}

/// Copy of the class, with every class name passed through the remapper
///
/// The old constant pool is only carried over when a verbatim attribute may still index into it.
/// Otherwise the copy is lowered onto a fresh pool, so no stale constant survives.
pub fn remap_class<R: Remapper + ?Sized>(remapper: &R, class: &Class) -> Class {
    let (constant_pool, bootstrap_methods) = if class.has_raw_attributes() {
        let bootstrap_methods = class
            .bootstrap_methods
            .iter()
            .map(|bootstrap| remap_bootstrap_method(remapper, bootstrap))
            .collect();
        (class.constant_pool.clone(), bootstrap_methods)
    } else {
        (None, vec![])
    };

    Class {
        version: class.version,
        access_flags: class.access_flags,
        name: remapper.map_binary_name(&class.name),
        super_name: class
            .super_name
            .as_ref()
            .map(|name| remapper.map_binary_name(name)),
        interfaces: remap_names(remapper, &class.interfaces),
        fields: class
            .fields
            .iter()
            .map(|field| remap_field(remapper, field))
            .collect(),
        methods: class
            .methods
            .iter()
            .map(|method| remap_method(remapper, method))
            .collect(),
        source_file: class.source_file.clone(),
        signature: remap_signature(remapper, &class.signature),
        inner_classes: class
            .inner_classes
            .iter()
            .map(|inner| InnerClass {
                inner_class: remapper.map_binary_name(&inner.inner_class),
                outer_class: inner
                    .outer_class
                    .as_ref()
                    .map(|name| remapper.map_binary_name(name)),
                inner_name: inner.inner_name.clone(),
                access_flags: inner.access_flags,
            })
            .collect(),
        enclosing_method: class
            .enclosing_method
            .as_ref()
            .map(|enclosing| EnclosingMethod {
                class: remapper.map_binary_name(&enclosing.class),
                method: enclosing.method.as_ref().map(|(name, descriptor)| {
                    (name.clone(), remapper.map_method_descriptor(descriptor))
                }),
            }),
        nest_host: class
            .nest_host
            .as_ref()
            .map(|name| remapper.map_binary_name(name)),
        nest_members: remap_names(remapper, &class.nest_members),
        permitted_subclasses: remap_names(remapper, &class.permitted_subclasses),
        record_components: class.record_components.as_ref().map(|components| {
            components
                .iter()
                .map(|component| RecordComponent {
                    name: component.name.clone(),
                    descriptor: remapper.map_field_type(&component.descriptor),
                    signature: remap_signature(remapper, &component.signature),
                    annotations: remap_annotations(remapper, &component.annotations),
                    attributes: component.attributes.clone(),
                })
                .collect()
        }),
        annotations: remap_annotations(remapper, &class.annotations),
        attributes: class.attributes.clone(),
        constant_pool,
        bootstrap_methods,
    }
}

fn remap_names<R: Remapper + ?Sized>(remapper: &R, names: &[BinaryName]) -> Vec<BinaryName> {
    names
        .iter()
        .map(|name| remapper.map_binary_name(name))
        .collect()
}

fn remap_signature<R: Remapper + ?Sized>(
    remapper: &R,
    signature: &Option<String>,
) -> Option<String> {
    signature
        .as_ref()
        .map(|signature| remapper.map_signature(signature))
}

fn remap_field<R: Remapper + ?Sized>(remapper: &R, field: &Field) -> Field {
    Field {
        access_flags: field.access_flags,
        name: field.name.clone(),
        descriptor: remapper.map_field_type(&field.descriptor),
        signature: remap_signature(remapper, &field.signature),
        constant_value: field
            .constant_value
            .as_ref()
            .map(|constant| remap_constant(remapper, constant)),
        annotations: remap_annotations(remapper, &field.annotations),
        attributes: field.attributes.clone(),
    }
}

fn remap_method<R: Remapper + ?Sized>(remapper: &R, method: &Method) -> Method {
    let remap_parameters = |parameters: &Option<Vec<Vec<Annotation>>>| {
        parameters.as_ref().map(|parameters| {
            parameters
                .iter()
                .map(|annotations| remap_annotation_list(remapper, annotations))
                .collect::<Vec<_>>()
        })
    };
    Method {
        access_flags: method.access_flags,
        name: method.name.clone(),
        descriptor: remapper.map_method_descriptor(&method.descriptor),
        signature: remap_signature(remapper, &method.signature),
        exceptions: remap_names(remapper, &method.exceptions),
        annotations: remap_annotations(remapper, &method.annotations),
        parameter_annotations: ParameterAnnotations {
            visible: remap_parameters(&method.parameter_annotations.visible),
            invisible: remap_parameters(&method.parameter_annotations.invisible),
        },
        annotation_default: method
            .annotation_default
            .as_ref()
            .map(|value| remap_element_value(remapper, value)),
        code: method.code.as_ref().map(|code| remap_code(remapper, code)),
        attributes: method.attributes.clone(),
    }
}

fn remap_annotations<R: Remapper + ?Sized>(remapper: &R, annotations: &Annotations) -> Annotations {
    Annotations {
        visible: remap_annotation_list(remapper, &annotations.visible),
        invisible: remap_annotation_list(remapper, &annotations.invisible),
    }
}

fn remap_annotation_list<R: Remapper + ?Sized>(
    remapper: &R,
    annotations: &[Annotation],
) -> Vec<Annotation> {
    annotations
        .iter()
        .map(|annotation| remap_annotation(remapper, annotation))
        .collect()
}

fn remap_annotation<R: Remapper + ?Sized>(remapper: &R, annotation: &Annotation) -> Annotation {
    Annotation {
        type_descriptor: remapper.map_descriptor(&annotation.type_descriptor),
        elements: annotation
            .elements
            .iter()
            .map(|(name, value)| (name.clone(), remap_element_value(remapper, value)))
            .collect(),
    }
}

fn remap_element_value<R: Remapper + ?Sized>(remapper: &R, value: &ElementValue) -> ElementValue {
    match value {
        ElementValue::Enum {
            type_descriptor,
            const_name,
        } => ElementValue::Enum {
            type_descriptor: remapper.map_descriptor(type_descriptor),
            const_name: const_name.clone(),
        },
        ElementValue::Class(class) => ElementValue::Class(remapper.map_descriptor(class)),
        ElementValue::Annotation(annotation) => {
            ElementValue::Annotation(remap_annotation(remapper, annotation))
        }
        ElementValue::Array(values) => ElementValue::Array(
            values
                .iter()
                .map(|value| remap_element_value(remapper, value))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn remap_code<R: Remapper + ?Sized>(remapper: &R, code: &Code) -> Code {
    let remap_local = |local: &LocalVariable, signature: bool| LocalVariable {
        start: local.start,
        end: local.end,
        name: local.name.clone(),
        descriptor: if signature {
            remapper.map_signature(&local.descriptor)
        } else {
            remapper.map_descriptor(&local.descriptor)
        },
        index: local.index,
    };

    let instructions = code
        .instructions
        .iter()
        .map(|element| match element {
            CodeElement::Instruction(instruction) => {
                let mapped = instruction.map(
                    &mut (),
                    |_, class| Ok::<_, Infallible>(remapper.map_ref_type(class)),
                    |_, constant| Ok(remap_constant(remapper, constant)),
                    |_, field| Ok(remap_field_ref(remapper, field)),
                    |_, method| Ok(remap_method_ref(remapper, method)),
                    |_, indy| Ok(remap_invoke_dynamic(remapper, indy)),
                );
                match mapped {
                    Ok(instruction) => CodeElement::Instruction(instruction),
                    Err(never) => match never {},
                }
            }
            other => other.clone(),
        })
        .collect();

    Code {
        max_stack: code.max_stack,
        max_locals: code.max_locals,
        instructions,
        exception_handlers: code
            .exception_handlers
            .iter()
            .map(|handler| ExceptionHandler {
                start: handler.start,
                end: handler.end,
                handler: handler.handler,
                catch_type: handler
                    .catch_type
                    .as_ref()
                    .map(|name| remapper.map_binary_name(name)),
            })
            .collect(),
        line_numbers: code.line_numbers.clone(),
        local_variables: code
            .local_variables
            .iter()
            .map(|local| remap_local(local, false))
            .collect(),
        local_variable_types: code
            .local_variable_types
            .iter()
            .map(|local| remap_local(local, true))
            .collect(),
        frames: code
            .frames
            .iter()
            .map(|(label, frame)| (*label, remap_frame(remapper, frame)))
            .collect(),
        attributes: code.attributes.clone(),
    }
}

fn remap_frame<R: Remapper + ?Sized>(remapper: &R, frame: &CodeFrame) -> CodeFrame {
    let mapped: Result<CodeFrame, Infallible> = frame.map(
        |class| Ok(remapper.map_ref_type(class)),
        |label| Ok(*label),
    );
    match mapped {
        Ok(frame) => frame,
        Err(never) => match never {},
    }
}

fn remap_constant<R: Remapper + ?Sized>(remapper: &R, constant: &ConstantData) -> ConstantData {
    match constant {
        ConstantData::Class(class) => ConstantData::Class(remapper.map_ref_type(class)),
        ConstantData::MethodType(descriptor) => {
            ConstantData::MethodType(remapper.map_method_descriptor(descriptor))
        }
        ConstantData::MethodHandle(handle) => {
            ConstantData::MethodHandle(remap_method_handle(remapper, handle))
        }
        ConstantData::Dynamic(dynamic) => ConstantData::Dynamic(DynamicConstant {
            bootstrap: remap_bootstrap_method(remapper, &dynamic.bootstrap),
            name: dynamic.name.clone(),
            descriptor: remapper.map_field_type(&dynamic.descriptor),
        }),
        other => other.clone(),
    }
}

fn remap_field_ref<R: Remapper + ?Sized>(remapper: &R, field: &FieldRef) -> FieldRef {
    FieldRef {
        owner: remapper.map_binary_name(&field.owner),
        name: field.name.clone(),
        descriptor: remapper.map_field_type(&field.descriptor),
    }
}

fn remap_method_ref<R: Remapper + ?Sized>(remapper: &R, method: &MethodRef) -> MethodRef {
    MethodRef {
        owner: remapper.map_ref_type(&method.owner),
        name: method.name.clone(),
        descriptor: remapper.map_method_descriptor(&method.descriptor),
        is_interface: method.is_interface,
    }
}

fn remap_method_handle<R: Remapper + ?Sized>(remapper: &R, handle: &MethodHandle) -> MethodHandle {
    MethodHandle {
        kind: handle.kind,
        member: match &handle.member {
            HandleMember::Field(field) => HandleMember::Field(remap_field_ref(remapper, field)),
            HandleMember::Method(method) => {
                HandleMember::Method(remap_method_ref(remapper, method))
            }
        },
    }
}

fn remap_bootstrap_method<R: Remapper + ?Sized>(
    remapper: &R,
    bootstrap: &BootstrapMethod,
) -> BootstrapMethod {
    BootstrapMethod {
        handle: remap_method_handle(remapper, &bootstrap.handle),
        arguments: bootstrap
            .arguments
            .iter()
            .map(|argument| remap_constant(remapper, argument))
            .collect(),
    }
}

fn remap_invoke_dynamic<R: Remapper + ?Sized>(
    remapper: &R,
    indy: &InvokeDynamic,
) -> InvokeDynamic {
    InvokeDynamic {
        bootstrap: remap_bootstrap_method(remapper, &indy.bootstrap),
        name: indy.name.clone(),
        descriptor: remapper.map_method_descriptor(&indy.descriptor),
    }
}

/// Whether any position [`remap_class`] would rename mentions the given class
pub fn mentions_class(class: &Class, name: &str) -> bool {
    let finder = ClassFinder {
        name,
        found: Cell::new(false),
    };
    remap_class(&finder, class);
    finder.found.get()
}

struct ClassFinder<'a> {
    name: &'a str,
    found: Cell<bool>,
}

impl Remapper for ClassFinder<'_> {
    fn map_class_name(&self, name: &str) -> Option<BinaryName> {
        if name == self.name {
            self.found.set(true);
        }
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::Version;
    use crate::jvm::model::RawAttribute;
    use crate::jvm::{ClassAccessFlags, FieldAccessFlags, UnqualifiedName};

    fn remapper() -> SimpleRemapper {
        let mut remapper = SimpleRemapper::new();
        remapper.add(
            "dev/example/Target",
            BinaryName::from_string("gen/Renamed".to_owned()).unwrap(),
        );
        remapper.add(
            "dev/example/Outer$Inner",
            BinaryName::from_string("gen/Renamed$Nested".to_owned()).unwrap(),
        );
        remapper.add(
            "dev/example/Outer",
            BinaryName::from_string("gen/Renamed".to_owned()).unwrap(),
        );
        remapper
    }

    #[test]
    fn descriptors() {
        let remapper = remapper();
        assert_eq!(
            remapper.map_descriptor("[Ldev/example/Target;"),
            "[Lgen/Renamed;"
        );
        assert_eq!(remapper.map_descriptor("I"), "I");
        assert_eq!(remapper.map_descriptor("V"), "V");
        assert_eq!(remapper.map_descriptor("Lbroken"), "Lbroken");

        let descriptor = MethodDescriptor::parse("(JLdev/example/Target;)Ldev/example/Target;")
            .unwrap();
        assert_eq!(
            remapper.map_method_descriptor(&descriptor).render(),
            "(JLgen/Renamed;)Lgen/Renamed;"
        );
    }

    #[test]
    fn field_signatures() {
        let remapper = remapper();
        assert_eq!(
            remapper.map_signature("Ljava/util/List<+Ldev/example/Target;>;"),
            "Ljava/util/List<+Lgen/Renamed;>;"
        );
        assert_eq!(
            remapper.map_signature("Ljava/util/Map<TK;[Ldev/example/Target;>;"),
            "Ljava/util/Map<TK;[Lgen/Renamed;>;"
        );
        assert_eq!(remapper.map_signature("TT;"), "TT;");
    }

    #[test]
    fn class_and_method_signatures() {
        let remapper = remapper();
        assert_eq!(
            remapper.map_signature(
                "<T:Ljava/lang/Object;U::Ljava/lang/Comparable<TU;>;>Ljava/lang/Object;Ljava/util/function/Supplier<Ldev/example/Target;>;"
            ),
            "<T:Ljava/lang/Object;U::Ljava/lang/Comparable<TU;>;>Ljava/lang/Object;Ljava/util/function/Supplier<Lgen/Renamed;>;"
        );

        // Wildcards are only allowed in type arguments, so this is left alone
        assert_eq!(
            remapper.map_signature("<E:Ljava/lang/Exception;>(Ldev/example/Target;*)V^TE;"),
            "<E:Ljava/lang/Exception;>(Ldev/example/Target;*)V^TE;"
        );
        assert_eq!(
            remapper.map_signature("(Ljava/util/List<*>;I)Ldev/example/Target;^TE;"),
            "(Ljava/util/List<*>;I)Lgen/Renamed;^TE;"
        );
    }

    #[test]
    fn inner_class_signatures() {
        let remapper = remapper();
        assert_eq!(
            remapper.map_signature("Ldev/example/Outer<TT;>.Inner<TT;>;"),
            "Lgen/Renamed<TT;>.Nested<TT;>;"
        );
        assert_eq!(
            remapper.map_signature("Ldev/example/Other<TT;>.Inner;"),
            "Ldev/example/Other<TT;>.Inner;"
        );
    }

    fn sample_class() -> Class {
        let mut class = Class::new(
            Version::JAVA8,
            ClassAccessFlags::PUBLIC,
            BinaryName::from_string("dev/example/Holder".to_owned()).unwrap(),
            Some(BinaryName::OBJECT),
        );
        class.fields.push(Field::new(
            FieldAccessFlags::PRIVATE,
            UnqualifiedName::from_string("target".to_owned()).unwrap(),
            FieldType::parse("Ldev/example/Target;").unwrap(),
        ));
        class
    }

    #[test]
    fn finds_mentioned_classes() {
        let class = sample_class();
        assert!(mentions_class(&class, "dev/example/Target"));
        assert!(mentions_class(&class, "dev/example/Holder"));
        assert!(!mentions_class(&class, "dev/example/Outer"));
    }

    #[test]
    fn fresh_pool_unless_pinned() {
        let parsed = Class::parse(&sample_class().to_bytes().unwrap()).unwrap();
        assert!(parsed.constant_pool.is_some());
        assert!(remap_class(&remapper(), &parsed).constant_pool.is_none());

        let mut pinned = parsed;
        pinned.attributes.push(RawAttribute {
            name: "Synthetic".to_owned(),
            info: vec![],
        });
        assert!(remap_class(&remapper(), &pinned).constant_pool.is_some());
    }

    #[test]
    fn identity_keeps_everything() {
        let signature = "<T:Ljava/lang/Object;>(TT;)Ljava/util/List<TT;>;";
        assert_eq!(IdentityRemapper.map_signature(signature), signature);
    }
}
