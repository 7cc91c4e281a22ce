use crate::jvm::class_file::{
    self, Attribute, ConstantPoolOverflow, ConstantsPool, RuntimeInvisibleAnnotations,
    RuntimeInvisibleParameterAnnotations, RuntimeVisibleAnnotations,
    RuntimeVisibleParameterAnnotations,
};
use crate::jvm::model::ConstantResolver;
use crate::jvm::Error;

/// Annotation on a class, field, method, parameter, or record component
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Field descriptor of the annotation interface (eg. `Ljava/lang/Deprecated;`)
    pub type_descriptor: String,

    /// Element names and their values, in declaration order
    pub elements: Vec<(String, ElementValue)>,
}

impl Annotation {
    /// Annotation without any elements
    pub fn marker(type_descriptor: impl Into<String>) -> Annotation {
        Annotation {
            type_descriptor: type_descriptor.into(),
            elements: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Byte(i32),
    Char(i32),
    Short(i32),
    Boolean(i32),
    Int(i32),
    Long(i64),
    Float([u8; 4]),
    Double([u8; 8]),
    String(String),
    Enum {
        /// Field descriptor of the enum type
        type_descriptor: String,
        const_name: String,
    },

    /// Class literal, as a return descriptor (so `V` is allowed)
    Class(String),
    Annotation(Annotation),
    Array(Vec<ElementValue>),
}

/// Visible and invisible annotations attached to the same element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    /// Retained at runtime
    pub visible: Vec<Annotation>,

    /// Only retained in the class file
    pub invisible: Vec<Annotation>,
}

impl Annotations {
    /// Iterate over both lists (visible ones first)
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.visible.iter().chain(self.invisible.iter())
    }

    /// Is there an annotation of this type in either list?
    pub fn contains(&self, type_descriptor: &str) -> bool {
        self.iter()
            .any(|annotation| annotation.type_descriptor == type_descriptor)
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty() && self.invisible.is_empty()
    }

    /// Lift the attribute into these annotations, if it is a (non-parameter) annotation attribute
    ///
    /// Returns whether the attribute was consumed.
    pub fn parse_attribute(
        &mut self,
        name: &str,
        attribute: &Attribute,
        resolver: &ConstantResolver,
    ) -> Result<bool, Error> {
        match name {
            "RuntimeVisibleAnnotations" => {
                let annotations = attribute.parse::<RuntimeVisibleAnnotations>()?.0;
                self.visible = Annotation::parse_list(&annotations, resolver)?;
            }
            "RuntimeInvisibleAnnotations" => {
                let annotations = attribute.parse::<RuntimeInvisibleAnnotations>()?.0;
                self.invisible = Annotation::parse_list(&annotations, resolver)?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Encode the non-empty lists as attributes (visible first)
    pub fn serialize_annotations(
        &self,
        constants_pool: &mut ConstantsPool,
        attributes: &mut Vec<Attribute>,
    ) -> Result<(), Error> {
        if !self.visible.is_empty() {
            let annotations = serialize_list(&self.visible, constants_pool)?;
            attributes.push(constants_pool.get_attribute(RuntimeVisibleAnnotations(annotations))?);
        }
        if !self.invisible.is_empty() {
            let annotations = serialize_list(&self.invisible, constants_pool)?;
            attributes
                .push(constants_pool.get_attribute(RuntimeInvisibleAnnotations(annotations))?);
        }
        Ok(())
    }
}

/// Per-parameter annotations of a method
///
/// The lists are kept exactly as they are in the class file: they need not have one entry per
/// descriptor parameter (`javac` skips synthetic parameters).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterAnnotations {
    pub visible: Option<Vec<Vec<Annotation>>>,
    pub invisible: Option<Vec<Vec<Annotation>>>,
}

impl ParameterAnnotations {
    /// Lift the attribute into these annotations, if it is a parameter annotation attribute
    ///
    /// Returns whether the attribute was consumed.
    pub fn parse_attribute(
        &mut self,
        name: &str,
        attribute: &Attribute,
        resolver: &ConstantResolver,
    ) -> Result<bool, Error> {
        let parse_parameters = |parameters: Vec<Vec<class_file::Annotation>>| {
            parameters
                .iter()
                .map(|annotations| Annotation::parse_list(annotations, resolver))
                .collect::<Result<Vec<_>, Error>>()
        };
        match name {
            "RuntimeVisibleParameterAnnotations" => {
                let parameters = attribute.parse::<RuntimeVisibleParameterAnnotations>()?.0;
                self.visible = Some(parse_parameters(parameters)?);
            }
            "RuntimeInvisibleParameterAnnotations" => {
                let parameters = attribute.parse::<RuntimeInvisibleParameterAnnotations>()?.0;
                self.invisible = Some(parse_parameters(parameters)?);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    pub fn serialize_annotations(
        &self,
        constants_pool: &mut ConstantsPool,
        attributes: &mut Vec<Attribute>,
    ) -> Result<(), Error> {
        if let Some(visible) = &self.visible {
            let parameters = visible
                .iter()
                .map(|annotations| serialize_list(annotations, constants_pool))
                .collect::<Result<_, _>>()?;
            let attribute = RuntimeVisibleParameterAnnotations(parameters);
            attributes.push(constants_pool.get_attribute(attribute)?);
        }
        if let Some(invisible) = &self.invisible {
            let parameters = invisible
                .iter()
                .map(|annotations| serialize_list(annotations, constants_pool))
                .collect::<Result<_, _>>()?;
            let attribute = RuntimeInvisibleParameterAnnotations(parameters);
            attributes.push(constants_pool.get_attribute(attribute)?);
        }
        Ok(())
    }
}

fn serialize_list(
    annotations: &[Annotation],
    constants_pool: &mut ConstantsPool,
) -> Result<Vec<class_file::Annotation>, ConstantPoolOverflow> {
    annotations
        .iter()
        .map(|annotation| annotation.serialize_annotation(constants_pool))
        .collect()
}

impl Annotation {
    pub fn parse_annotation(
        annotation: &class_file::Annotation,
        resolver: &ConstantResolver,
    ) -> Result<Annotation, Error> {
        let elements = annotation
            .element_value_pairs
            .iter()
            .map(|pair| -> Result<_, Error> {
                Ok((
                    resolver.utf8(pair.element_name)?,
                    ElementValue::parse_element_value(&pair.value, resolver)?,
                ))
            })
            .collect::<Result<_, Error>>()?;
        Ok(Annotation {
            type_descriptor: resolver.utf8(annotation.type_index)?,
            elements,
        })
    }

    pub fn parse_list(
        annotations: &[class_file::Annotation],
        resolver: &ConstantResolver,
    ) -> Result<Vec<Annotation>, Error> {
        annotations
            .iter()
            .map(|annotation| Annotation::parse_annotation(annotation, resolver))
            .collect()
    }

    pub fn serialize_annotation(
        &self,
        constants_pool: &mut ConstantsPool,
    ) -> Result<class_file::Annotation, ConstantPoolOverflow> {
        let type_index = constants_pool.get_utf8(self.type_descriptor.as_str())?;
        let element_value_pairs = self
            .elements
            .iter()
            .map(|(name, value)| -> Result<_, ConstantPoolOverflow> {
                Ok(class_file::ElementValuePair {
                    element_name: constants_pool.get_utf8(name.as_str())?,
                    value: value.serialize_element_value(constants_pool)?,
                })
            })
            .collect::<Result<_, ConstantPoolOverflow>>()?;
        Ok(class_file::Annotation {
            type_index,
            element_value_pairs,
        })
    }
}

impl ElementValue {
    pub fn parse_element_value(
        value: &class_file::ElementValue,
        resolver: &ConstantResolver,
    ) -> Result<ElementValue, Error> {
        let constants = &resolver.constants;
        Ok(match value {
            class_file::ElementValue::Const { tag, value } => match tag {
                b'B' => ElementValue::Byte(constants.integer(*value)?),
                b'C' => ElementValue::Char(constants.integer(*value)?),
                b'S' => ElementValue::Short(constants.integer(*value)?),
                b'Z' => ElementValue::Boolean(constants.integer(*value)?),
                b'I' => ElementValue::Int(constants.integer(*value)?),
                b'J' => ElementValue::Long(constants.long(*value)?),
                b'F' => ElementValue::Float(constants.float(*value)?.to_le_bytes()),
                b'D' => ElementValue::Double(constants.double(*value)?.to_le_bytes()),
                _ => ElementValue::String(
                    resolver.utf8(class_file::Utf8ConstantIndex(*value))?,
                ),
            },
            class_file::ElementValue::Enum {
                type_name,
                const_name,
            } => ElementValue::Enum {
                type_descriptor: resolver.utf8(*type_name)?,
                const_name: resolver.utf8(*const_name)?,
            },
            class_file::ElementValue::Class(class) => ElementValue::Class(resolver.utf8(*class)?),
            class_file::ElementValue::Annotation(annotation) => {
                ElementValue::Annotation(Annotation::parse_annotation(annotation, resolver)?)
            }
            class_file::ElementValue::Array(values) => ElementValue::Array(
                values
                    .iter()
                    .map(|value| ElementValue::parse_element_value(value, resolver))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    pub fn serialize_element_value(
        &self,
        constants_pool: &mut ConstantsPool,
    ) -> Result<class_file::ElementValue, ConstantPoolOverflow> {
        let constant = |tag: u8, value| class_file::ElementValue::Const { tag, value };
        Ok(match self {
            ElementValue::Byte(value) => constant(b'B', constants_pool.get_integer(*value)?),
            ElementValue::Char(value) => constant(b'C', constants_pool.get_integer(*value)?),
            ElementValue::Short(value) => constant(b'S', constants_pool.get_integer(*value)?),
            ElementValue::Boolean(value) => constant(b'Z', constants_pool.get_integer(*value)?),
            ElementValue::Int(value) => constant(b'I', constants_pool.get_integer(*value)?),
            ElementValue::Long(value) => constant(b'J', constants_pool.get_long(*value)?),
            ElementValue::Float(value) => constant(b'F', constants_pool.get_float(*value)?),
            ElementValue::Double(value) => constant(b'D', constants_pool.get_double(*value)?),
            ElementValue::String(value) => {
                constant(b's', constants_pool.get_utf8(value.as_str())?.into())
            }
            ElementValue::Enum {
                type_descriptor,
                const_name,
            } => class_file::ElementValue::Enum {
                type_name: constants_pool.get_utf8(type_descriptor.as_str())?,
                const_name: constants_pool.get_utf8(const_name.as_str())?,
            },
            ElementValue::Class(class) => {
                class_file::ElementValue::Class(constants_pool.get_utf8(class.as_str())?)
            }
            ElementValue::Annotation(annotation) => {
                class_file::ElementValue::Annotation(annotation.serialize_annotation(constants_pool)?)
            }
            ElementValue::Array(values) => class_file::ElementValue::Array(
                values
                    .iter()
                    .map(|value| value.serialize_element_value(constants_pool))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}
