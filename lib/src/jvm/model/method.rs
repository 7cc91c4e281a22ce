use crate::jvm::class_file::{self, ConstantsPool, ConstantsWriter, Exceptions, Signature};
use crate::jvm::model::{
    serialize_raw_attributes, Annotations, Code, ConstantResolver, ElementValue, MethodContext,
    ParameterAnnotations, RawAttribute,
};
use crate::jvm::{
    BinaryName, Error, MethodAccessFlags, MethodDescriptor, Name, RenderDescriptor,
    UnqualifiedName,
};

/// Method declared by a class
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub access_flags: MethodAccessFlags,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,

    /// Generic signature
    pub signature: Option<String>,

    /// Checked exceptions declared in the `throws` clause
    pub exceptions: Vec<BinaryName>,
    pub annotations: Annotations,
    pub parameter_annotations: ParameterAnnotations,

    /// Default value of an annotation interface element
    pub annotation_default: Option<ElementValue>,

    /// Body of the method (absent for `abstract` and `native` methods)
    pub code: Option<Code>,

    /// Every other attribute, kept verbatim
    pub attributes: Vec<RawAttribute>,
}

impl Method {
    /// Method with no body and no attributes
    pub fn new(
        access_flags: MethodAccessFlags,
        name: UnqualifiedName,
        descriptor: MethodDescriptor<BinaryName>,
    ) -> Method {
        Method {
            access_flags,
            name,
            descriptor,
            signature: None,
            exceptions: vec![],
            annotations: Annotations::default(),
            parameter_annotations: ParameterAnnotations::default(),
            annotation_default: None,
            code: None,
            attributes: vec![],
        }
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    /// Information needed to lift or lower the body of this method
    pub fn context<'a>(&'a self, class_name: &'a BinaryName) -> MethodContext<'a> {
        MethodContext {
            class_name,
            method_name: &self.name,
            descriptor: &self.descriptor,
            is_static: self.is_static(),
        }
    }

    pub fn parse_method(
        method: &class_file::Method,
        resolver: &ConstantResolver,
        class_name: &BinaryName,
    ) -> Result<Method, Error> {
        let mut parsed = Method::new(
            method.access_flags,
            resolver.unqualified_name(method.name_index)?,
            resolver.method_descriptor(method.descriptor_index)?,
        );

        // The body is lifted last, since it needs the name and descriptor
        let mut code_attribute = None;
        for attribute in &method.attributes {
            let name = resolver.constants.utf8(attribute.name_index)?;
            if parsed
                .annotations
                .parse_attribute(name, attribute, resolver)?
                || parsed
                    .parameter_annotations
                    .parse_attribute(name, attribute, resolver)?
            {
                continue;
            }
            match name {
                "Code" => code_attribute = Some(attribute.parse::<class_file::Code>()?),
                "Exceptions" => {
                    parsed.exceptions = attribute
                        .parse::<Exceptions>()?
                        .0
                        .into_iter()
                        .map(|exception| resolver.class_name(exception))
                        .collect::<Result<_, _>>()?;
                }
                "Signature" => {
                    let signature = attribute.parse::<Signature>()?.signature;
                    parsed.signature = Some(resolver.utf8(signature)?);
                }
                "AnnotationDefault" => {
                    let value = attribute.parse::<class_file::AnnotationDefault>()?.0;
                    parsed.annotation_default =
                        Some(ElementValue::parse_element_value(&value, resolver)?);
                }
                _ => parsed
                    .attributes
                    .push(RawAttribute::parse_raw(attribute, &resolver.constants)?),
            }
        }

        if let Some(code) = code_attribute {
            let context = parsed.context(class_name);
            let code = Code::parse_code(&code, resolver, &context)?;
            parsed.code = Some(code);
        }

        Ok(parsed)
    }

    pub fn serialize_method(
        &self,
        constants_pool: &mut ConstantsPool,
        class_name: &BinaryName,
    ) -> Result<class_file::Method, Error> {
        let name_index = constants_pool.get_utf8(self.name.as_str())?;
        let descriptor_index = constants_pool.get_utf8(&self.descriptor.render())?;

        let mut attributes = vec![];
        if let Some(code) = &self.code {
            let code = code.serialize_code(constants_pool, &self.context(class_name))?;
            attributes.push(constants_pool.get_attribute(code)?);
        }
        if !self.exceptions.is_empty() {
            let exceptions = self
                .exceptions
                .iter()
                .map(|exception| exception.constant_index(constants_pool))
                .collect::<Result<_, _>>()?;
            attributes.push(constants_pool.get_attribute(Exceptions(exceptions))?);
        }
        if let Some(signature) = &self.signature {
            let signature = constants_pool.get_utf8(signature.as_str())?;
            attributes.push(constants_pool.get_attribute(Signature { signature })?);
        }
        self.annotations
            .serialize_annotations(constants_pool, &mut attributes)?;
        self.parameter_annotations
            .serialize_annotations(constants_pool, &mut attributes)?;
        if let Some(default) = &self.annotation_default {
            let default = default.serialize_element_value(constants_pool)?;
            attributes.push(constants_pool.get_attribute(class_file::AnnotationDefault(default))?);
        }
        serialize_raw_attributes(&self.attributes, constants_pool, &mut attributes)?;

        Ok(class_file::Method {
            access_flags: self.access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }
}
