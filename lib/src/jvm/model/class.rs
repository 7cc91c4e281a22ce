use crate::jvm::class_file::{
    self, BootstrapMethods, ClassFile, Constant, ConstantsPool, ConstantsReader, ConstantsWriter,
    EnclosingMethod as EnclosingMethodAttribute, InnerClasses, NestHost, NestMembers,
    PermittedSubclasses, Record, Serialize, Signature, SourceFile, Version,
};
use crate::jvm::model::{
    parse_method_descriptor, serialize_raw_attributes, Annotations, ConstantResolver, Field,
    BootstrapMethod, Method, RawAttribute,
};
use crate::jvm::{
    BinaryName, ClassAccessFlags, Error, FieldType, InnerClassAccessFlags, MethodDescriptor, Name,
    RenderDescriptor, UnqualifiedName,
};
use crate::util::OffsetVec;

/// Class, interface, enum, record, or annotation interface
///
/// Every constant pool reference is resolved, except inside the verbatim `attributes` (on the
/// class and its members). Those are only kept meaningful by lowering the class on top of the
/// constant pool it was parsed from, which is why that pool is retained.
#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub version: Version,
    pub access_flags: ClassAccessFlags,
    pub name: BinaryName,

    /// Only `java/lang/Object` (and `module-info`) have no superclass
    pub super_name: Option<BinaryName>,
    pub interfaces: Vec<BinaryName>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,

    pub source_file: Option<String>,
    pub signature: Option<String>,
    pub inner_classes: Vec<InnerClass>,
    pub enclosing_method: Option<EnclosingMethod>,
    pub nest_host: Option<BinaryName>,
    pub nest_members: Vec<BinaryName>,
    pub permitted_subclasses: Vec<BinaryName>,

    /// Components of a record class (`None` if the class is not a record)
    pub record_components: Option<Vec<RecordComponent>>,
    pub annotations: Annotations,

    /// Every other attribute, kept verbatim
    pub attributes: Vec<RawAttribute>,

    /// Constants of the class file this was parsed from
    ///
    /// Lowering starts from these constants (at their original indices) and only appends to them.
    pub constant_pool: Option<OffsetVec<Constant>>,

    /// `BootstrapMethods` table of the class file this was parsed from
    ///
    /// Dynamic constants in [`Class::constant_pool`] index into this, so lowering puts every entry
    /// back at its original index. Bootstrap methods used by the code of the class are tracked
    /// symbolically and re-added as needed on lowering.
    pub bootstrap_methods: Vec<BootstrapMethod>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InnerClass {
    pub inner_class: BinaryName,

    /// Absent for local and anonymous classes
    pub outer_class: Option<BinaryName>,

    /// Absent for anonymous classes
    pub inner_name: Option<String>,
    pub access_flags: InnerClassAccessFlags,
}

/// Innermost method or class enclosing a local or anonymous class
#[derive(Debug, Clone, PartialEq)]
pub struct EnclosingMethod {
    pub class: BinaryName,
    pub method: Option<(UnqualifiedName, MethodDescriptor<BinaryName>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordComponent {
    pub name: UnqualifiedName,
    pub descriptor: FieldType<BinaryName>,
    pub signature: Option<String>,
    pub annotations: Annotations,
    pub attributes: Vec<RawAttribute>,
}

impl Class {
    /// Empty class, with no members or attributes
    pub fn new(
        version: Version,
        access_flags: ClassAccessFlags,
        name: BinaryName,
        super_name: Option<BinaryName>,
    ) -> Class {
        Class {
            version,
            access_flags,
            name,
            super_name,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            source_file: None,
            signature: None,
            inner_classes: vec![],
            enclosing_method: None,
            nest_host: None,
            nest_members: vec![],
            permitted_subclasses: vec![],
            record_components: None,
            annotations: Annotations::default(),
            attributes: vec![],
            constant_pool: None,
            bootstrap_methods: vec![],
        }
    }

    /// Lift a class from the bytes of a class file
    pub fn parse(bytes: &[u8]) -> Result<Class, Error> {
        let class_file = ClassFile::from_bytes(bytes)?;
        Class::parse_class(class_file)
    }

    /// Lower the class into the bytes of a class file
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let class_file = self.serialize_class()?;
        let mut bytes = vec![];
        class_file.serialize(&mut bytes)?;
        Ok(bytes)
    }

    pub fn parse_class(class_file: ClassFile) -> Result<Class, Error> {
        let constants = ConstantsReader::new(&class_file.constants);

        // Bootstrap methods are needed before anything else can be resolved
        let mut bootstrap_methods = vec![];
        for attribute in &class_file.attributes {
            if constants.utf8(attribute.name_index)? == "BootstrapMethods" {
                bootstrap_methods = attribute.parse::<BootstrapMethods>()?.0;
            }
        }
        let resolver = ConstantResolver::new(constants, &bootstrap_methods);

        let name = resolver.class_name(class_file.this_class)?;
        let super_name = match class_file.super_class {
            None => None,
            Some(super_class) => Some(resolver.class_name(super_class)?),
        };
        let mut class = Class::new(class_file.version, class_file.access_flags, name, super_name);
        class.interfaces = parse_class_names(&class_file.interfaces, &resolver)?;
        class.fields = class_file
            .fields
            .iter()
            .map(|field| Field::parse_field(field, &resolver))
            .collect::<Result<_, _>>()?;
        class.methods = class_file
            .methods
            .iter()
            .map(|method| Method::parse_method(method, &resolver, &class.name))
            .collect::<Result<_, _>>()?;

        for attribute in &class_file.attributes {
            let name = constants.utf8(attribute.name_index)?;
            if class
                .annotations
                .parse_attribute(name, attribute, &resolver)?
            {
                continue;
            }
            match name {
                "BootstrapMethods" => (),
                "SourceFile" => {
                    let source_file = attribute.parse::<SourceFile>()?.0;
                    class.source_file = Some(resolver.utf8(source_file)?);
                }
                "Signature" => {
                    let signature = attribute.parse::<Signature>()?.signature;
                    class.signature = Some(resolver.utf8(signature)?);
                }
                "InnerClasses" => {
                    for inner_class in attribute.parse::<InnerClasses>()?.0 {
                        class
                            .inner_classes
                            .push(InnerClass::parse_inner_class(&inner_class, &resolver)?);
                    }
                }
                "EnclosingMethod" => {
                    let enclosing = attribute.parse::<EnclosingMethodAttribute>()?;
                    let method = match enclosing.method {
                        None => None,
                        Some(name_and_type) => {
                            let (name, descriptor) = constants.name_and_type(name_and_type)?;
                            Some((
                                UnqualifiedName::from_string(name.to_owned())
                                    .map_err(Error::BadName)?,
                                parse_method_descriptor(descriptor)?,
                            ))
                        }
                    };
                    class.enclosing_method = Some(EnclosingMethod {
                        class: resolver.class_name(enclosing.class)?,
                        method,
                    });
                }
                "NestHost" => {
                    let nest_host = attribute.parse::<NestHost>()?.0;
                    class.nest_host = Some(resolver.class_name(nest_host)?);
                }
                "NestMembers" => {
                    let members = attribute.parse::<NestMembers>()?.0;
                    class.nest_members = parse_class_names(&members, &resolver)?;
                }
                "PermittedSubclasses" => {
                    let subclasses = attribute.parse::<PermittedSubclasses>()?.0;
                    class.permitted_subclasses = parse_class_names(&subclasses, &resolver)?;
                }
                "Record" => {
                    let components = attribute
                        .parse::<Record>()?
                        .0
                        .iter()
                        .map(|component| RecordComponent::parse_component(component, &resolver))
                        .collect::<Result<_, _>>()?;
                    class.record_components = Some(components);
                }
                _ => class
                    .attributes
                    .push(RawAttribute::parse_raw(attribute, &constants)?),
            }
        }

        class.bootstrap_methods = resolver.bootstrap_methods()?;
        class.constant_pool = Some(class_file.constants);
        Ok(class)
    }

    /// Lower the class into a class file
    ///
    /// Attributes are always emitted in the same order, so lowering is deterministic.
    pub fn serialize_class(&self) -> Result<ClassFile, Error> {
        let mut constants_pool = match &self.constant_pool {
            Some(constants) => ConstantsPool::from_existing(constants.clone()),
            None => ConstantsPool::new(),
        };
        let first = constants_pool.reserve_bootstrap_methods(self.bootstrap_methods.len());
        for (offset, bootstrap) in self.bootstrap_methods.iter().enumerate() {
            let handle = bootstrap.handle.constant_index(&mut constants_pool)?;
            let arguments = bootstrap
                .arguments
                .iter()
                .map(|argument| argument.constant_index(&mut constants_pool))
                .collect::<Result<Vec<_>, _>>()?;
            constants_pool.set_bootstrap_method(first + offset as u16, handle, arguments);
        }

        let this_class = self.name.constant_index(&mut constants_pool)?;
        let super_class = match &self.super_name {
            None => None,
            Some(super_name) => Some(super_name.constant_index(&mut constants_pool)?),
        };
        let interfaces = serialize_class_names(&self.interfaces, &mut constants_pool)?;
        let fields = self
            .fields
            .iter()
            .map(|field| field.serialize_field(&mut constants_pool))
            .collect::<Result<Vec<_>, Error>>()?;
        let methods = self
            .methods
            .iter()
            .map(|method| method.serialize_method(&mut constants_pool, &self.name))
            .collect::<Result<Vec<_>, Error>>()?;

        let mut attributes = vec![];
        if let Some(source_file) = &self.source_file {
            let source_file = constants_pool.get_utf8(source_file.as_str())?;
            attributes.push(constants_pool.get_attribute(SourceFile(source_file))?);
        }
        if let Some(signature) = &self.signature {
            let signature = constants_pool.get_utf8(signature.as_str())?;
            attributes.push(constants_pool.get_attribute(Signature { signature })?);
        }
        if !self.inner_classes.is_empty() {
            let inner_classes = self
                .inner_classes
                .iter()
                .map(|inner_class| inner_class.serialize_inner_class(&mut constants_pool))
                .collect::<Result<Vec<_>, Error>>()?;
            attributes.push(constants_pool.get_attribute(InnerClasses(inner_classes))?);
        }
        if let Some(enclosing) = &self.enclosing_method {
            let class = enclosing.class.constant_index(&mut constants_pool)?;
            let method = match &enclosing.method {
                None => None,
                Some((name, descriptor)) => {
                    let name = constants_pool.get_utf8(name.as_str())?;
                    let descriptor = constants_pool.get_utf8(descriptor.render())?;
                    Some(constants_pool.get_name_and_type(name, descriptor)?)
                }
            };
            attributes.push(
                constants_pool.get_attribute(EnclosingMethodAttribute { class, method })?,
            );
        }
        if let Some(nest_host) = &self.nest_host {
            let nest_host = nest_host.constant_index(&mut constants_pool)?;
            attributes.push(constants_pool.get_attribute(NestHost(nest_host))?);
        }
        if !self.nest_members.is_empty() {
            let members = serialize_class_names(&self.nest_members, &mut constants_pool)?;
            attributes.push(constants_pool.get_attribute(NestMembers(members))?);
        }
        if !self.permitted_subclasses.is_empty() {
            let subclasses = serialize_class_names(&self.permitted_subclasses, &mut constants_pool)?;
            attributes.push(constants_pool.get_attribute(PermittedSubclasses(subclasses))?);
        }
        if let Some(components) = &self.record_components {
            let components = components
                .iter()
                .map(|component| component.serialize_component(&mut constants_pool))
                .collect::<Result<Vec<_>, Error>>()?;
            attributes.push(constants_pool.get_attribute(Record(components))?);
        }
        self.annotations
            .serialize_annotations(&mut constants_pool, &mut attributes)?;
        serialize_raw_attributes(&self.attributes, &mut constants_pool, &mut attributes)?;

        // `BootstrapMethods` goes last, once nothing else can add entries to it
        let bootstrap_methods_name = if constants_pool.bootstrap_methods().is_empty() {
            None
        } else {
            Some(constants_pool.get_utf8(<BootstrapMethods as class_file::AttributeLike>::NAME)?)
        };
        let (constants, bootstrap_methods) = constants_pool.into_parts();
        if let Some(name_index) = bootstrap_methods_name {
            let mut info = vec![];
            BootstrapMethods(bootstrap_methods).serialize(&mut info)?;
            attributes.push(class_file::Attribute { name_index, info });
        }

        Ok(ClassFile {
            version: self.version,
            constants,
            access_flags: self.access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    /// Whether the class or any of its members carries a verbatim attribute
    ///
    /// Verbatim attributes may hold indices into [`Class::constant_pool`].
    pub fn has_raw_attributes(&self) -> bool {
        !self.attributes.is_empty()
            || self.fields.iter().any(|field| !field.attributes.is_empty())
            || self.methods.iter().any(|method| {
                !method.attributes.is_empty()
                    || method
                        .code
                        .as_ref()
                        .map_or(false, |code| !code.attributes.is_empty())
            })
            || self.record_components.iter().flatten().any(|component| {
                !component.attributes.is_empty()
            })
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }
}

fn parse_class_names(
    classes: &[class_file::ClassConstantIndex],
    resolver: &ConstantResolver,
) -> Result<Vec<BinaryName>, Error> {
    classes
        .iter()
        .map(|class| resolver.class_name(*class))
        .collect()
}

fn serialize_class_names(
    classes: &[BinaryName],
    constants_pool: &mut ConstantsPool,
) -> Result<Vec<class_file::ClassConstantIndex>, Error> {
    let mut indices = Vec::with_capacity(classes.len());
    for class in classes {
        indices.push(class.constant_index(constants_pool)?);
    }
    Ok(indices)
}

impl InnerClass {
    fn parse_inner_class(
        inner_class: &class_file::InnerClass,
        resolver: &ConstantResolver,
    ) -> Result<InnerClass, Error> {
        Ok(InnerClass {
            inner_class: resolver.class_name(inner_class.inner_class)?,
            outer_class: match inner_class.outer_class {
                None => None,
                Some(outer_class) => Some(resolver.class_name(outer_class)?),
            },
            inner_name: match inner_class.inner_name {
                None => None,
                Some(inner_name) => Some(resolver.utf8(inner_name)?),
            },
            access_flags: inner_class.access_flags,
        })
    }

    fn serialize_inner_class(
        &self,
        constants_pool: &mut ConstantsPool,
    ) -> Result<class_file::InnerClass, Error> {
        Ok(class_file::InnerClass {
            inner_class: self.inner_class.constant_index(constants_pool)?,
            outer_class: match &self.outer_class {
                None => None,
                Some(outer_class) => Some(outer_class.constant_index(constants_pool)?),
            },
            inner_name: match &self.inner_name {
                None => None,
                Some(inner_name) => Some(constants_pool.get_utf8(inner_name.as_str())?),
            },
            access_flags: self.access_flags,
        })
    }
}

impl RecordComponent {
    fn parse_component(
        component: &class_file::RecordComponent,
        resolver: &ConstantResolver,
    ) -> Result<RecordComponent, Error> {
        let mut parsed = RecordComponent {
            name: resolver.unqualified_name(component.name)?,
            descriptor: resolver.field_type(component.descriptor)?,
            signature: None,
            annotations: Annotations::default(),
            attributes: vec![],
        };
        for attribute in &component.attributes {
            let name = resolver.constants.utf8(attribute.name_index)?;
            if parsed
                .annotations
                .parse_attribute(name, attribute, resolver)?
            {
                continue;
            }
            if name == "Signature" {
                let signature = attribute.parse::<Signature>()?.signature;
                parsed.signature = Some(resolver.utf8(signature)?);
            } else {
                parsed
                    .attributes
                    .push(RawAttribute::parse_raw(attribute, &resolver.constants)?);
            }
        }
        Ok(parsed)
    }

    fn serialize_component(
        &self,
        constants_pool: &mut ConstantsPool,
    ) -> Result<class_file::RecordComponent, Error> {
        let name = constants_pool.get_utf8(self.name.as_str())?;
        let descriptor = constants_pool.get_utf8(self.descriptor.render())?;
        let mut attributes = vec![];
        if let Some(signature) = &self.signature {
            let signature = constants_pool.get_utf8(signature.as_str())?;
            attributes.push(constants_pool.get_attribute(Signature { signature })?);
        }
        self.annotations
            .serialize_annotations(constants_pool, &mut attributes)?;
        serialize_raw_attributes(&self.attributes, constants_pool, &mut attributes)?;
        Ok(class_file::RecordComponent {
            name,
            descriptor,
            attributes,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{BranchInstruction, CodeElement, Instruction, InvokeType, Label};
    use crate::jvm::model::{
        Annotation, Code, ConstantData, ElementValue, ExceptionHandler, FieldRef, MethodRef,
    };
    use crate::jvm::{FieldAccessFlags, MethodAccessFlags, RefType};

    fn name(name: &str) -> BinaryName {
        BinaryName::from_string(name.to_owned()).unwrap()
    }

    fn member(name: &str) -> UnqualifiedName {
        UnqualifiedName::from_string(name.to_owned()).unwrap()
    }

    fn sample_class() -> Class {
        let mut class = Class::new(
            Version::JAVA8,
            ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            name("me/example/Sample"),
            Some(BinaryName::OBJECT),
        );
        class.interfaces.push(name("java/lang/Runnable"));
        class.source_file = Some("Sample.java".to_owned());
        class.inner_classes.push(InnerClass {
            inner_class: name("me/example/Sample$Inner"),
            outer_class: Some(name("me/example/Sample")),
            inner_name: Some("Inner".to_owned()),
            access_flags: InnerClassAccessFlags::PUBLIC | InnerClassAccessFlags::STATIC,
        });
        class.annotations.invisible.push(Annotation {
            type_descriptor: "Lme/example/Tag;".to_owned(),
            elements: vec![(
                "value".to_owned(),
                ElementValue::Array(vec![
                    ElementValue::Int(3),
                    ElementValue::Class("Lme/example/Other;".to_owned()),
                ]),
            )],
        });

        let mut counter = Field::new(
            FieldAccessFlags::PRIVATE | FieldAccessFlags::STATIC | FieldAccessFlags::FINAL,
            member("COUNTER"),
            FieldType::long(),
        );
        counter.constant_value = Some(ConstantData::Long(42));
        class.fields.push(counter);

        let (start, end, handler) = (Label(0), Label(1), Label(2));
        let mut run = Method::new(
            MethodAccessFlags::PUBLIC,
            member("run"),
            MethodDescriptor {
                parameters: vec![],
                return_type: None,
            },
        );
        let mut code = Code::from_instructions(vec![
            CodeElement::Label(start),
            CodeElement::Instruction(Instruction::GetStatic(FieldRef {
                owner: name("java/lang/System"),
                name: member("out"),
                descriptor: FieldType::object(name("java/io/PrintStream")),
            })),
            CodeElement::Instruction(Instruction::Ldc(ConstantData::String(
                "hello".to_owned(),
            ))),
            CodeElement::Instruction(Instruction::Invoke(
                InvokeType::Virtual,
                MethodRef {
                    owner: RefType::Object(name("java/io/PrintStream")),
                    name: member("println"),
                    descriptor: MethodDescriptor {
                        parameters: vec![FieldType::object(BinaryName::STRING)],
                        return_type: None,
                    },
                    is_interface: false,
                },
            )),
            CodeElement::Label(end),
            CodeElement::Branch(BranchInstruction::Return),
            CodeElement::Label(handler),
            CodeElement::Instruction(Instruction::Pop),
            CodeElement::Branch(BranchInstruction::Return),
        ]);
        code.exception_handlers.push(ExceptionHandler {
            start,
            end,
            handler,
            catch_type: Some(name("java/lang/RuntimeException")),
        });
        code.frames.push((
            handler,
            crate::jvm::code::Frame {
                locals: vec![crate::jvm::code::VerificationType::Object(RefType::Object(
                    name("me/example/Sample"),
                ))],
                stack: vec![crate::jvm::code::VerificationType::Object(RefType::Object(
                    name("java/lang/RuntimeException"),
                ))],
            },
        ));
        run.code = Some(code);
        class.methods.push(run);

        class
    }

    #[test]
    fn lift_lowered_class() {
        let class = sample_class();
        let bytes = class.to_bytes().unwrap();
        let parsed = Class::parse(&bytes).unwrap();

        assert_eq!(parsed.name, class.name);
        assert_eq!(parsed.super_name, class.super_name);
        assert_eq!(parsed.interfaces, class.interfaces);
        assert_eq!(parsed.source_file, class.source_file);
        assert_eq!(parsed.inner_classes, class.inner_classes);
        assert_eq!(parsed.annotations, class.annotations);
        assert_eq!(parsed.fields, class.fields);
        assert!(parsed.constant_pool.is_some());

        let run = &parsed.methods[0];
        let code = run.code.as_ref().unwrap();
        assert_eq!(code.max_stack, Some(2));
        assert_eq!(code.max_locals, Some(1));
        assert_eq!(code.exception_handlers.len(), 1);
        assert_eq!(
            code.exception_handlers[0].catch_type,
            Some(name("java/lang/RuntimeException"))
        );
        assert_eq!(code.frames.len(), 1);
    }

    #[test]
    fn lowering_is_deterministic() {
        let class = Class::parse(&sample_class().to_bytes().unwrap()).unwrap();
        let first = class.to_bytes().unwrap();
        let second = class.to_bytes().unwrap();
        assert_eq!(first, second);

        // Lowering on top of the original pool adds nothing new
        let reparsed = Class::parse(&first).unwrap();
        assert_eq!(reparsed.to_bytes().unwrap(), first);
    }

    #[test]
    fn unknown_attributes_are_kept() {
        let mut class = sample_class();
        class.attributes.push(RawAttribute {
            name: "me.example.Custom".to_owned(),
            info: vec![1, 2, 3],
        });
        let parsed = Class::parse(&class.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed.attributes, class.attributes);
    }

    #[test]
    fn reject_bad_magic() {
        let bytes = [0xDE, 0xAD, 0xBE, 0xEF, 0, 0, 0, 52];
        assert!(matches!(Class::parse(&bytes), Err(Error::BadMagic(_))));
    }
}
