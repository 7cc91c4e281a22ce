use crate::jvm::class_file::{Attribute, ConstantPoolOverflow, ConstantsPool, ConstantsReader};
use crate::jvm::Error;

/// Attribute which is not interpreted, and is copied byte for byte
///
/// The payload may contain constant pool indices. These only stay meaningful when the class is
/// lowered with the constant pool it was read from (see [`crate::jvm::model::Class::constant_pool`]).
#[derive(Debug, Clone, PartialEq)]
pub struct RawAttribute {
    pub name: String,
    pub info: Vec<u8>,
}

impl RawAttribute {
    pub fn parse_raw(attribute: &Attribute, constants: &ConstantsReader) -> Result<RawAttribute, Error> {
        Ok(RawAttribute {
            name: constants.utf8(attribute.name_index)?.to_owned(),
            info: attribute.info.clone(),
        })
    }

    pub fn serialize_raw(
        &self,
        constants_pool: &mut ConstantsPool,
    ) -> Result<Attribute, ConstantPoolOverflow> {
        Ok(Attribute {
            name_index: constants_pool.get_utf8(self.name.as_str())?,
            info: self.info.clone(),
        })
    }
}

/// Lower a list of verbatim attributes, appending them after the structured ones
pub fn serialize_raw_attributes(
    raw_attributes: &[RawAttribute],
    constants_pool: &mut ConstantsPool,
    attributes: &mut Vec<Attribute>,
) -> Result<(), ConstantPoolOverflow> {
    for raw_attribute in raw_attributes {
        attributes.push(raw_attribute.serialize_raw(constants_pool)?);
    }
    Ok(())
}
