use crate::jvm::class_file::{
    AttributeLike, ConstantIndex, Deserialize, Serialize, Utf8ConstantIndex,
};
use crate::jvm::Error;
use byteorder::{ReadBytesExt, WriteBytesExt};

/// Annotation, as it is stored in annotation attributes
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.16
#[derive(Debug, Clone)]
pub struct Annotation {
    /// Field descriptor of the annotation interface
    pub type_index: Utf8ConstantIndex,
    pub element_value_pairs: Vec<ElementValuePair>,
}

#[derive(Debug, Clone)]
pub struct ElementValuePair {
    pub element_name: Utf8ConstantIndex,
    pub value: ElementValue,
}

#[derive(Debug, Clone)]
pub enum ElementValue {
    /// Constant of a primitive type or a string
    ///
    /// The tag is one of `B`, `C`, `D`, `F`, `I`, `J`, `S`, `Z`, or `s`.
    Const { tag: u8, value: ConstantIndex },

    /// Enum constant
    Enum {
        type_name: Utf8ConstantIndex,
        const_name: Utf8ConstantIndex,
    },

    /// Class literal, stored as a return descriptor
    Class(Utf8ConstantIndex),

    /// Nested annotation
    Annotation(Annotation),

    Array(Vec<ElementValue>),
}

impl Serialize for Annotation {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.type_index.serialize(writer)?;
        self.element_value_pairs.serialize(writer)?;
        Ok(())
    }
}

impl Deserialize for Annotation {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(Annotation {
            type_index: Utf8ConstantIndex::deserialize(reader)?,
            element_value_pairs: Vec::deserialize(reader)?,
        })
    }
}

impl Serialize for ElementValuePair {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.element_name.serialize(writer)?;
        self.value.serialize(writer)?;
        Ok(())
    }
}

impl Deserialize for ElementValuePair {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(ElementValuePair {
            element_name: Utf8ConstantIndex::deserialize(reader)?,
            value: ElementValue::deserialize(reader)?,
        })
    }
}

impl Serialize for ElementValue {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            ElementValue::Const { tag, value } => {
                tag.serialize(writer)?;
                value.serialize(writer)?;
            }
            ElementValue::Enum {
                type_name,
                const_name,
            } => {
                b'e'.serialize(writer)?;
                type_name.serialize(writer)?;
                const_name.serialize(writer)?;
            }
            ElementValue::Class(class_info) => {
                b'c'.serialize(writer)?;
                class_info.serialize(writer)?;
            }
            ElementValue::Annotation(annotation) => {
                b'@'.serialize(writer)?;
                annotation.serialize(writer)?;
            }
            ElementValue::Array(values) => {
                b'['.serialize(writer)?;
                values.serialize(writer)?;
            }
        }
        Ok(())
    }
}

impl Deserialize for ElementValue {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let value = match u8::deserialize(reader)? {
            tag @ (b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's') => {
                ElementValue::Const {
                    tag,
                    value: ConstantIndex::deserialize(reader)?,
                }
            }
            b'e' => ElementValue::Enum {
                type_name: Utf8ConstantIndex::deserialize(reader)?,
                const_name: Utf8ConstantIndex::deserialize(reader)?,
            },
            b'c' => ElementValue::Class(Utf8ConstantIndex::deserialize(reader)?),
            b'@' => ElementValue::Annotation(Annotation::deserialize(reader)?),
            b'[' => ElementValue::Array(Vec::deserialize(reader)?),
            other => {
                return Err(Error::MalformedAttribute {
                    name: "RuntimeVisibleAnnotations",
                    message: format!("Unknown element value tag {:?}", other as char),
                })
            }
        };
        Ok(value)
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.16
#[derive(Debug)]
pub struct RuntimeVisibleAnnotations(pub Vec<Annotation>);

/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.17
#[derive(Debug)]
pub struct RuntimeInvisibleAnnotations(pub Vec<Annotation>);

/// One list of annotations per formal parameter
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.18
#[derive(Debug)]
pub struct RuntimeVisibleParameterAnnotations(pub Vec<Vec<Annotation>>);

/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.19
#[derive(Debug)]
pub struct RuntimeInvisibleParameterAnnotations(pub Vec<Vec<Annotation>>);

/// Default value of an annotation interface element
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.22
#[derive(Debug)]
pub struct AnnotationDefault(pub ElementValue);

macro_rules! annotations_attribute {
    ($attr:ident, $name:literal) => {
        impl AttributeLike for $attr {
            const NAME: &'static str = $name;
        }

        impl Serialize for $attr {
            fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
                self.0.serialize(writer)
            }
        }

        impl Deserialize for $attr {
            fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
                Ok($attr(Deserialize::deserialize(reader)?))
            }
        }
    };
}

annotations_attribute!(RuntimeVisibleAnnotations, "RuntimeVisibleAnnotations");
annotations_attribute!(RuntimeInvisibleAnnotations, "RuntimeInvisibleAnnotations");
annotations_attribute!(AnnotationDefault, "AnnotationDefault");

/// Parameter annotations are prefixed by a `u8` parameter count (instead of the usual `u16`)
macro_rules! parameter_annotations_attribute {
    ($attr:ident, $name:literal) => {
        impl AttributeLike for $attr {
            const NAME: &'static str = $name;
        }

        impl Serialize for $attr {
            fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
                (self.0.len() as u8).serialize(writer)?;
                for annotations in &self.0 {
                    annotations.serialize(writer)?;
                }
                Ok(())
            }
        }

        impl Deserialize for $attr {
            fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
                let num_parameters = u8::deserialize(reader)?;
                let mut parameters = Vec::with_capacity(num_parameters as usize);
                for _ in 0..num_parameters {
                    parameters.push(Vec::deserialize(reader)?);
                }
                Ok($attr(parameters))
            }
        }
    };
}

parameter_annotations_attribute!(
    RuntimeVisibleParameterAnnotations,
    "RuntimeVisibleParameterAnnotations"
);
parameter_annotations_attribute!(
    RuntimeInvisibleParameterAnnotations,
    "RuntimeInvisibleParameterAnnotations"
);
