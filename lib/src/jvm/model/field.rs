use crate::jvm::class_file::{self, ConstantsPool, ConstantsWriter, Signature};
use crate::jvm::model::{
    serialize_raw_attributes, Annotations, ConstantData, ConstantResolver, RawAttribute,
};
use crate::jvm::{
    BinaryName, Error, FieldAccessFlags, FieldType, Name, RenderDescriptor, UnqualifiedName,
};

/// Field declared by a class
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub access_flags: FieldAccessFlags,
    pub name: UnqualifiedName,
    pub descriptor: FieldType<BinaryName>,

    /// Generic signature, if the field type mentions type variables or parameters
    pub signature: Option<String>,

    /// Initial value of a `static final` field
    pub constant_value: Option<ConstantData>,
    pub annotations: Annotations,

    /// Every other attribute, kept verbatim
    pub attributes: Vec<RawAttribute>,
}

impl Field {
    pub fn new(
        access_flags: FieldAccessFlags,
        name: UnqualifiedName,
        descriptor: FieldType<BinaryName>,
    ) -> Field {
        Field {
            access_flags,
            name,
            descriptor,
            signature: None,
            constant_value: None,
            annotations: Annotations::default(),
            attributes: vec![],
        }
    }

    pub fn parse_field(
        field: &class_file::Field,
        resolver: &ConstantResolver,
    ) -> Result<Field, Error> {
        let mut parsed = Field::new(
            field.access_flags,
            resolver.unqualified_name(field.name_index)?,
            resolver.field_type(field.descriptor_index)?,
        );

        for attribute in &field.attributes {
            let name = resolver.constants.utf8(attribute.name_index)?;
            if parsed
                .annotations
                .parse_attribute(name, attribute, resolver)?
            {
                continue;
            }
            match name {
                "ConstantValue" => {
                    let index = attribute.parse::<class_file::ConstantValue>()?.0;
                    parsed.constant_value = Some(resolver.constant_data(index)?);
                }
                "Signature" => {
                    let signature = attribute.parse::<Signature>()?.signature;
                    parsed.signature = Some(resolver.utf8(signature)?);
                }
                _ => parsed
                    .attributes
                    .push(RawAttribute::parse_raw(attribute, &resolver.constants)?),
            }
        }

        Ok(parsed)
    }

    pub fn serialize_field(
        &self,
        constants_pool: &mut ConstantsPool,
    ) -> Result<class_file::Field, Error> {
        let name_index = constants_pool.get_utf8(self.name.as_str())?;
        let descriptor_index = constants_pool.get_utf8(&self.descriptor.render())?;

        let mut attributes = vec![];
        if let Some(constant_value) = &self.constant_value {
            let index = constant_value.constant_index(constants_pool)?;
            attributes.push(constants_pool.get_attribute(class_file::ConstantValue(index))?);
        }
        if let Some(signature) = &self.signature {
            let signature = constants_pool.get_utf8(signature.as_str())?;
            attributes.push(constants_pool.get_attribute(Signature { signature })?);
        }
        self.annotations
            .serialize_annotations(constants_pool, &mut attributes)?;
        serialize_raw_attributes(&self.attributes, constants_pool, &mut attributes)?;

        Ok(class_file::Field {
            access_flags: self.access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }
}
