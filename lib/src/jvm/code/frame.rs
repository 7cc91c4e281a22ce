use crate::jvm::class_file::{
    ClassConstantIndex, Deserialize, Serialize, StackMapFrame,
};
use crate::jvm::{BaseType, Error, FieldType, RefType};
use crate::util::Width;
use byteorder::{ReadBytesExt, WriteBytesExt};

/// These types are from [this hierarchy][0]
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-4.html#jvms-4.10.1.2
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum VerificationType<Cls, U> {
    /// Unusable local (eg. one which is assigned on only some paths)
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,

    /// In the constructor, the `this` parameter starts with this type then turns into an object
    /// type after `<init>` is called
    UninitializedThis,

    /// Object type
    Object(Cls),

    /// State of an object after `new` has been called by `<init>` has not been called
    ///
    ///   - in the class model, `U` is the label of the `new` instruction
    ///   - when serializing into a classfile, we use `u16` for `U`, corresponding to the offset of
    ///     the `new` instruction from the start of the method body
    Uninitialized(U),
}

impl<Cls, U> VerificationType<Cls, U> {
    /// Is this type is a reference type?
    pub fn is_reference(&self) -> bool {
        match self {
            VerificationType::Top
            | VerificationType::Integer
            | VerificationType::Float
            | VerificationType::Double
            | VerificationType::Long => false,

            VerificationType::Null
            | VerificationType::UninitializedThis
            | VerificationType::Object(_)
            | VerificationType::Uninitialized(_) => true,
        }
    }

    pub fn map<C2, U2, E>(
        &self,
        map_class: impl FnOnce(&Cls) -> Result<C2, E>,
        map_uninitialized: impl FnOnce(&U) -> Result<U2, E>,
    ) -> Result<VerificationType<C2, U2>, E> {
        Ok(match self {
            VerificationType::Top => VerificationType::Top,
            VerificationType::Integer => VerificationType::Integer,
            VerificationType::Float => VerificationType::Float,
            VerificationType::Long => VerificationType::Long,
            VerificationType::Double => VerificationType::Double,
            VerificationType::Null => VerificationType::Null,
            VerificationType::UninitializedThis => VerificationType::UninitializedThis,
            VerificationType::Object(cls) => VerificationType::Object(map_class(cls)?),
            VerificationType::Uninitialized(uninit) => {
                VerificationType::Uninitialized(map_uninitialized(uninit)?)
            }
        })
    }
}

impl<C, U> From<FieldType<C>> for VerificationType<RefType<C>, U> {
    fn from(field_type: FieldType<C>) -> Self {
        match field_type {
            FieldType::Base(BaseType::Int)
            | FieldType::Base(BaseType::Char)
            | FieldType::Base(BaseType::Short)
            | FieldType::Base(BaseType::Byte)
            | FieldType::Base(BaseType::Boolean) => VerificationType::Integer,
            FieldType::Base(BaseType::Float) => VerificationType::Float,
            FieldType::Base(BaseType::Long) => VerificationType::Long,
            FieldType::Base(BaseType::Double) => VerificationType::Double,
            FieldType::Ref(ref_type) => VerificationType::Object(ref_type),
        }
    }
}

impl Serialize for VerificationType<ClassConstantIndex, u16> {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            VerificationType::Top => 0u8.serialize(writer)?,
            VerificationType::Integer => 1u8.serialize(writer)?,
            VerificationType::Float => 2u8.serialize(writer)?,
            VerificationType::Double => 3u8.serialize(writer)?,
            VerificationType::Long => 4u8.serialize(writer)?,
            VerificationType::Null => 5u8.serialize(writer)?,
            VerificationType::UninitializedThis => 6u8.serialize(writer)?,
            VerificationType::Object(cls) => {
                7u8.serialize(writer)?;
                cls.serialize(writer)?;
            }
            VerificationType::Uninitialized(off) => {
                8u8.serialize(writer)?;
                off.serialize(writer)?;
            }
        };
        Ok(())
    }
}

impl Deserialize for VerificationType<ClassConstantIndex, u16> {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(match u8::deserialize(reader)? {
            0 => VerificationType::Top,
            1 => VerificationType::Integer,
            2 => VerificationType::Float,
            3 => VerificationType::Double,
            4 => VerificationType::Long,
            5 => VerificationType::Null,
            6 => VerificationType::UninitializedThis,
            7 => VerificationType::Object(ClassConstantIndex::deserialize(reader)?),
            8 => VerificationType::Uninitialized(u16::deserialize(reader)?),
            other => {
                return Err(Error::MalformedAttribute {
                    name: "StackMapTable",
                    message: format!("Unknown verification type tag {}", other),
                })
            }
        })
    }
}

impl<Cls, A> Width for VerificationType<Cls, A> {
    fn width(&self) -> usize {
        match self {
            VerificationType::Double | VerificationType::Long => 2,
            _ => 1,
        }
    }
}

/// Snapshot of the stack and local variables at a point in the bytecode
///
/// Both lists are in the form used by the stack map table: a `long` or `double` is a single entry
/// (even though it occupies two slots at runtime).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Frame<Cls, U> {
    /// Local variables in scope
    pub locals: Vec<VerificationType<Cls, U>>,

    /// Types of values on the stack
    pub stack: Vec<VerificationType<Cls, U>>,
}

impl<Cls, U> Default for Frame<Cls, U> {
    fn default() -> Self {
        Frame {
            locals: vec![],
            stack: vec![],
        }
    }
}

impl<Cls, U> Frame<Cls, U> {
    /// Convert the class and uninitialized types in every local and stack entry
    pub fn map<C2, U2, E>(
        &self,
        map_class: impl Fn(&Cls) -> Result<C2, E>,
        map_uninitialized: impl Fn(&U) -> Result<U2, E>,
    ) -> Result<Frame<C2, U2>, E> {
        let map_all = |types: &[VerificationType<Cls, U>]| {
            types
                .iter()
                .map(|typ| typ.map(&map_class, &map_uninitialized))
                .collect::<Result<Vec<_>, E>>()
        };
        Ok(Frame {
            locals: map_all(&self.locals)?,
            stack: map_all(&self.stack)?,
        })
    }
}

impl<Cls: Clone + PartialEq, U: Clone + PartialEq> Frame<Cls, U> {
    /// Compute the frame described by a stack map table entry, given the previous frame
    pub fn apply(&self, entry: StackMapFrame<VerificationType<Cls, U>>) -> Result<Self, Error> {
        Ok(match entry {
            StackMapFrame::SameLocalsNoStack { .. } => Frame {
                locals: self.locals.clone(),
                stack: vec![],
            },
            StackMapFrame::SameLocalsOneStack { stack, .. } => Frame {
                locals: self.locals.clone(),
                stack: vec![stack],
            },
            StackMapFrame::ChopLocalsNoStack { chopped_k, .. } => {
                let chopped_k = chopped_k as usize;
                if chopped_k > self.locals.len() {
                    return Err(Error::MalformedAttribute {
                        name: "StackMapTable",
                        message: format!(
                            "Cannot chop {} locals from a frame with {}",
                            chopped_k,
                            self.locals.len()
                        ),
                    });
                }
                Frame {
                    locals: self.locals[..self.locals.len() - chopped_k].to_vec(),
                    stack: vec![],
                }
            }
            StackMapFrame::AppendLocalsNoStack { locals, .. } => {
                let mut all_locals = self.locals.clone();
                all_locals.extend(locals);
                Frame {
                    locals: all_locals,
                    stack: vec![],
                }
            }
            StackMapFrame::Full { locals, stack, .. } => Frame { locals, stack },
        })
    }

    /// Pick the most compact stack map table entry which turns the previous frame into this one
    pub fn compress(
        &self,
        previous: &Self,
        offset_delta: u16,
    ) -> StackMapFrame<VerificationType<Cls, U>> {
        let prev_locals = &previous.locals;
        let locals = &self.locals;

        if self.stack.is_empty() {
            if locals == prev_locals {
                return StackMapFrame::SameLocalsNoStack { offset_delta };
            }
            if locals.len() < prev_locals.len()
                && prev_locals.len() - locals.len() <= 3
                && prev_locals.starts_with(locals)
            {
                return StackMapFrame::ChopLocalsNoStack {
                    offset_delta,
                    chopped_k: (prev_locals.len() - locals.len()) as u8,
                };
            }
            if locals.len() > prev_locals.len()
                && locals.len() - prev_locals.len() <= 3
                && locals.starts_with(prev_locals)
            {
                return StackMapFrame::AppendLocalsNoStack {
                    offset_delta,
                    locals: locals[prev_locals.len()..].to_vec(),
                };
            }
        } else if self.stack.len() == 1 && locals == prev_locals {
            return StackMapFrame::SameLocalsOneStack {
                offset_delta,
                stack: self.stack[0].clone(),
            };
        }

        StackMapFrame::Full {
            offset_delta,
            locals: locals.clone(),
            stack: self.stack.clone(),
        }
    }
}
