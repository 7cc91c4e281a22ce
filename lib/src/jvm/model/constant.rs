use crate::jvm::class_file::{
    self, ClassConstantIndex, Constant, ConstantIndex, ConstantPoolOverflow, ConstantsPool,
    ConstantsReader, ConstantsWriter, FieldRefConstantIndex, HandleKind,
    InvokeDynamicConstantIndex, MethodRefConstantIndex, NameAndTypeConstantIndex,
    Utf8ConstantIndex,
};
use crate::jvm::{
    BinaryName, Error, FieldType, MethodDescriptor, Name, ParseDescriptor, RefType,
    RenderDescriptor, UnqualifiedName,
};

/// Loadable constant, with every constant pool reference resolved
///
/// Float and double constants are kept as (little endian) bytes so that every `NaN` payload
/// survives a round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantData {
    String(String),
    Integer(i32),
    Float([u8; 4]),
    Long(i64),
    Double([u8; 8]),
    Class(RefType<BinaryName>),
    MethodType(MethodDescriptor<BinaryName>),
    MethodHandle(MethodHandle),
    Dynamic(DynamicConstant),
}

impl ConstantData {
    /// Does this constant take two stack slots (and so get loaded with `ldc2_w`)?
    pub fn is_wide(&self) -> bool {
        match self {
            ConstantData::Long(_) | ConstantData::Double(_) => true,
            ConstantData::Dynamic(dynamic) => matches!(
                dynamic.descriptor,
                FieldType::Base(crate::jvm::BaseType::Long | crate::jvm::BaseType::Double)
            ),
            _ => false,
        }
    }
}

/// Symbolic reference to a field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRef {
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: FieldType<BinaryName>,
}

/// Symbolic reference to a method
#[derive(Debug, Clone, PartialEq)]
pub struct MethodRef {
    /// Methods can be called on arrays (eg. `clone`), hence the reference type
    pub owner: RefType<BinaryName>,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,

    /// Whether the owner is an interface (`InterfaceMethodref` as opposed to `Methodref`)
    pub is_interface: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodHandle {
    pub kind: HandleKind,
    pub member: HandleMember,
}

/// Member a method handle points to
#[derive(Debug, Clone, PartialEq)]
pub enum HandleMember {
    Field(FieldRef),
    Method(MethodRef),
}

/// Bootstrap method along with its static arguments
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapMethod {
    pub handle: MethodHandle,
    pub arguments: Vec<ConstantData>,
}

/// Dynamically-computed constant
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicConstant {
    pub bootstrap: BootstrapMethod,
    pub name: UnqualifiedName,
    pub descriptor: FieldType<BinaryName>,
}

/// Call site of an `invokedynamic` instruction
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeDynamic {
    pub bootstrap: BootstrapMethod,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,
}

/// Bootstrap arguments can refer to other dynamic constants. The JVM rejects cycles, but malformed
/// classes can still contain them.
const MAX_DYNAMIC_NESTING: usize = 64;

/// Resolves constant pool references of a parsed class file into symbolic values
#[derive(Copy, Clone)]
pub struct ConstantResolver<'a> {
    pub constants: ConstantsReader<'a>,
    bootstrap_methods: &'a [class_file::BootstrapMethod],
}

impl<'a> ConstantResolver<'a> {
    pub fn new(
        constants: ConstantsReader<'a>,
        bootstrap_methods: &'a [class_file::BootstrapMethod],
    ) -> ConstantResolver<'a> {
        ConstantResolver {
            constants,
            bootstrap_methods,
        }
    }

    pub fn utf8(&self, index: Utf8ConstantIndex) -> Result<String, Error> {
        self.constants.utf8(index).map(String::from)
    }

    pub fn unqualified_name(&self, index: Utf8ConstantIndex) -> Result<UnqualifiedName, Error> {
        parse_unqualified_name(self.constants.utf8(index)?)
    }

    pub fn field_type(&self, index: Utf8ConstantIndex) -> Result<FieldType<BinaryName>, Error> {
        parse_field_type(self.constants.utf8(index)?)
    }

    pub fn method_descriptor(
        &self,
        index: Utf8ConstantIndex,
    ) -> Result<MethodDescriptor<BinaryName>, Error> {
        parse_method_descriptor(self.constants.utf8(index)?)
    }

    /// Class constant which must be a class or interface (not an array)
    pub fn class_name(&self, index: ClassConstantIndex) -> Result<BinaryName, Error> {
        parse_binary_name(self.constants.class(index)?)
    }

    /// Class constant which may also be an array type
    pub fn ref_type(&self, index: ClassConstantIndex) -> Result<RefType<BinaryName>, Error> {
        let name = self.constants.class(index)?;
        if name.starts_with('[') {
            RefType::parse(name).map_err(|_| Error::BadDescriptor(name.to_owned()))
        } else {
            Ok(RefType::Object(parse_binary_name(name)?))
        }
    }

    fn name_and_type(
        &self,
        index: NameAndTypeConstantIndex,
    ) -> Result<(&'a str, &'a str), Error> {
        self.constants.name_and_type(index)
    }

    pub fn field_ref(&self, index: FieldRefConstantIndex) -> Result<FieldRef, Error> {
        match self.constants.get(index)? {
            Constant::FieldRef(class, name_and_type) => {
                let (name, descriptor) = self.name_and_type(*name_and_type)?;
                Ok(FieldRef {
                    owner: self.class_name(*class)?,
                    name: parse_unqualified_name(name)?,
                    descriptor: parse_field_type(descriptor)?,
                })
            }
            _ => Err(Error::UnexpectedConstant {
                index: index.into(),
                expected: "Fieldref",
            }),
        }
    }

    pub fn method_ref(&self, index: MethodRefConstantIndex) -> Result<MethodRef, Error> {
        match self.constants.get(index)? {
            Constant::MethodRef {
                class,
                name_and_type,
                is_interface,
            } => {
                let (name, descriptor) = self.name_and_type(*name_and_type)?;
                Ok(MethodRef {
                    owner: self.ref_type(*class)?,
                    name: parse_unqualified_name(name)?,
                    descriptor: parse_method_descriptor(descriptor)?,
                    is_interface: *is_interface,
                })
            }
            _ => Err(Error::UnexpectedConstant {
                index: index.into(),
                expected: "Methodref",
            }),
        }
    }

    pub fn method_handle(&self, index: ConstantIndex) -> Result<MethodHandle, Error> {
        match self.constants.get(index)? {
            Constant::MethodHandle {
                handle_kind,
                member,
            } => {
                let member = if handle_kind.is_field() {
                    HandleMember::Field(self.field_ref(FieldRefConstantIndex(*member))?)
                } else {
                    HandleMember::Method(self.method_ref(MethodRefConstantIndex(*member))?)
                };
                Ok(MethodHandle {
                    kind: *handle_kind,
                    member,
                })
            }
            _ => Err(Error::UnexpectedConstant {
                index,
                expected: "MethodHandle",
            }),
        }
    }

    /// Every entry of the `BootstrapMethods` table, in order
    pub fn bootstrap_methods(&self) -> Result<Vec<BootstrapMethod>, Error> {
        (0..self.bootstrap_methods.len())
            .map(|index| self.bootstrap_method(index as u16, 0))
            .collect()
    }

    fn bootstrap_method(&self, index: u16, depth: usize) -> Result<BootstrapMethod, Error> {
        let bootstrap_method = self
            .bootstrap_methods
            .get(index as usize)
            .ok_or_else(|| Error::MalformedAttribute {
                name: "BootstrapMethods",
                message: format!("Missing bootstrap method {}", index),
            })?;
        let arguments = bootstrap_method
            .bootstrap_arguments
            .iter()
            .map(|argument| self.constant_data_at_depth(*argument, depth + 1))
            .collect::<Result<_, _>>()?;
        Ok(BootstrapMethod {
            handle: self.method_handle(bootstrap_method.bootstrap_method)?,
            arguments,
        })
    }

    pub fn invoke_dynamic(&self, index: InvokeDynamicConstantIndex) -> Result<InvokeDynamic, Error> {
        match self.constants.get(index)? {
            Constant::InvokeDynamic {
                bootstrap_method,
                method_descriptor,
            } => {
                let (name, descriptor) = self.name_and_type(*method_descriptor)?;
                Ok(InvokeDynamic {
                    bootstrap: self.bootstrap_method(*bootstrap_method, 0)?,
                    name: parse_unqualified_name(name)?,
                    descriptor: parse_method_descriptor(descriptor)?,
                })
            }
            _ => Err(Error::UnexpectedConstant {
                index: index.into(),
                expected: "InvokeDynamic",
            }),
        }
    }

    /// Resolve a loadable constant
    pub fn constant_data(&self, index: ConstantIndex) -> Result<ConstantData, Error> {
        self.constant_data_at_depth(index, 0)
    }

    fn constant_data_at_depth(
        &self,
        index: ConstantIndex,
        depth: usize,
    ) -> Result<ConstantData, Error> {
        if depth > MAX_DYNAMIC_NESTING {
            return Err(Error::MalformedAttribute {
                name: "BootstrapMethods",
                message: format!("Dynamic constant {:?} nests too deeply", index),
            });
        }
        Ok(match self.constants.get(index)? {
            Constant::String(utf8) => ConstantData::String(self.utf8(*utf8)?),
            Constant::Integer(integer) => ConstantData::Integer(*integer),
            Constant::Float(float) => ConstantData::Float(float.to_le_bytes()),
            Constant::Long(long) => ConstantData::Long(*long),
            Constant::Double(double) => ConstantData::Double(double.to_le_bytes()),
            Constant::Class(_) => ConstantData::Class(self.ref_type(ClassConstantIndex(index))?),
            Constant::MethodType { descriptor } => {
                ConstantData::MethodType(self.method_descriptor(*descriptor)?)
            }
            Constant::MethodHandle { .. } => ConstantData::MethodHandle(self.method_handle(index)?),
            Constant::Dynamic {
                bootstrap_method,
                descriptor,
            } => {
                let (name, descriptor) = self.name_and_type(*descriptor)?;
                ConstantData::Dynamic(DynamicConstant {
                    bootstrap: self.bootstrap_method(*bootstrap_method, depth)?,
                    name: parse_unqualified_name(name)?,
                    descriptor: parse_field_type(descriptor)?,
                })
            }
            _ => {
                return Err(Error::UnexpectedConstant {
                    index,
                    expected: "loadable constant",
                })
            }
        })
    }
}

pub fn parse_binary_name(name: &str) -> Result<BinaryName, Error> {
    BinaryName::from_string(name.to_owned()).map_err(Error::BadName)
}

pub fn parse_unqualified_name(name: &str) -> Result<UnqualifiedName, Error> {
    UnqualifiedName::from_string(name.to_owned()).map_err(Error::BadName)
}

pub fn parse_field_type(descriptor: &str) -> Result<FieldType<BinaryName>, Error> {
    FieldType::parse(descriptor).map_err(|_| Error::BadDescriptor(descriptor.to_owned()))
}

pub fn parse_method_descriptor(descriptor: &str) -> Result<MethodDescriptor<BinaryName>, Error> {
    MethodDescriptor::parse(descriptor).map_err(|_| Error::BadDescriptor(descriptor.to_owned()))
}

impl ConstantsWriter<ClassConstantIndex> for BinaryName {
    fn constant_index(
        &self,
        constants: &mut ConstantsPool,
    ) -> Result<ClassConstantIndex, ConstantPoolOverflow> {
        let class_name = constants.get_utf8(self.as_str())?;
        constants.get_class(class_name)
    }
}

/// When making a `CONSTANT_Class_info`, reference types are almost always objects. However,
/// there are a handful of places where an array type needs to be fit in (eg. for a `checkcast`
/// to an array type). See section 4.4.1 for more.
impl ConstantsWriter<ClassConstantIndex> for RefType<BinaryName> {
    fn constant_index(
        &self,
        constants: &mut ConstantsPool,
    ) -> Result<ClassConstantIndex, ConstantPoolOverflow> {
        match self {
            RefType::Object(class) => class.constant_index(constants),
            other => {
                let utf8_idx = constants.get_utf8(other.render())?;
                constants.get_class(utf8_idx)
            }
        }
    }
}

impl ConstantsWriter<FieldRefConstantIndex> for FieldRef {
    fn constant_index(
        &self,
        constants: &mut ConstantsPool,
    ) -> Result<FieldRefConstantIndex, ConstantPoolOverflow> {
        let class_idx = self.owner.constant_index(constants)?;
        let field_utf8 = constants.get_utf8(self.name.as_str())?;
        let desc_utf8 = constants.get_utf8(self.descriptor.render())?;
        let name_and_type_idx = constants.get_name_and_type(field_utf8, desc_utf8)?;
        constants.get_field_ref(class_idx, name_and_type_idx)
    }
}

impl ConstantsWriter<MethodRefConstantIndex> for MethodRef {
    fn constant_index(
        &self,
        constants: &mut ConstantsPool,
    ) -> Result<MethodRefConstantIndex, ConstantPoolOverflow> {
        let class_idx = self.owner.constant_index(constants)?;
        let method_utf8 = constants.get_utf8(self.name.as_str())?;
        let desc_utf8 = constants.get_utf8(self.descriptor.render())?;
        let name_and_type_idx = constants.get_name_and_type(method_utf8, desc_utf8)?;
        constants.get_method_ref(class_idx, name_and_type_idx, self.is_interface)
    }
}

impl ConstantsWriter for MethodHandle {
    fn constant_index(
        &self,
        constants: &mut ConstantsPool,
    ) -> Result<ConstantIndex, ConstantPoolOverflow> {
        let member = match &self.member {
            HandleMember::Field(field) => field.constant_index(constants)?.into(),
            HandleMember::Method(method) => method.constant_index(constants)?.into(),
        };
        constants.get_method_handle(self.kind, member)
    }
}

impl ConstantsWriter<u16> for BootstrapMethod {
    fn constant_index(&self, constants: &mut ConstantsPool) -> Result<u16, ConstantPoolOverflow> {
        let handle = self.handle.constant_index(constants)?;
        let arguments = self
            .arguments
            .iter()
            .map(|argument| argument.constant_index(constants))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(constants.get_bootstrap_method(handle, arguments))
    }
}

impl ConstantsWriter<InvokeDynamicConstantIndex> for InvokeDynamic {
    fn constant_index(
        &self,
        constants: &mut ConstantsPool,
    ) -> Result<InvokeDynamicConstantIndex, ConstantPoolOverflow> {
        let bootstrap = self.bootstrap.constant_index(constants)?;
        let name_utf8 = constants.get_utf8(self.name.as_str())?;
        let desc_utf8 = constants.get_utf8(self.descriptor.render())?;
        let name_and_type_idx = constants.get_name_and_type(name_utf8, desc_utf8)?;
        constants.get_invoke_dynamic(bootstrap, name_and_type_idx)
    }
}

impl ConstantsWriter for ConstantData {
    fn constant_index(
        &self,
        constants: &mut ConstantsPool,
    ) -> Result<ConstantIndex, ConstantPoolOverflow> {
        match self {
            ConstantData::String(string) => {
                let str_utf8 = constants.get_utf8(string.as_str())?;
                let str_idx = constants.get_string(str_utf8)?;
                Ok(str_idx.into())
            }
            ConstantData::Integer(integer) => constants.get_integer(*integer),
            ConstantData::Float(float) => constants.get_float(*float),
            ConstantData::Long(long) => constants.get_long(*long),
            ConstantData::Double(double) => constants.get_double(*double),
            ConstantData::Class(class) => Ok(class.constant_index(constants)?.into()),
            ConstantData::MethodType(descriptor) => {
                let desc_utf8 = constants.get_utf8(descriptor.render())?;
                constants.get_method_type(desc_utf8)
            }
            ConstantData::MethodHandle(handle) => handle.constant_index(constants),
            ConstantData::Dynamic(dynamic) => {
                let bootstrap = dynamic.bootstrap.constant_index(constants)?;
                let name_utf8 = constants.get_utf8(dynamic.name.as_str())?;
                let desc_utf8 = constants.get_utf8(dynamic.descriptor.render())?;
                let name_and_type_idx = constants.get_name_and_type(name_utf8, desc_utf8)?;
                constants.get_dynamic(bootstrap, name_and_type_idx)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn name(name: &str) -> BinaryName {
        BinaryName::from_string(name.to_owned()).unwrap()
    }

    #[test]
    fn array_class_constants_use_descriptors() {
        let mut pool = ConstantsPool::new();
        let object = RefType::Object(name("com/foo/Bar"));
        let array = RefType::array(FieldType::object(name("com/foo/Bar")));
        let object_idx = object.constant_index(&mut pool).unwrap();
        let array_idx = array.constant_index(&mut pool).unwrap();

        let (constants, _) = pool.into_parts();
        let reader = ConstantsReader::new(&constants);
        assert_eq!(reader.class(object_idx).unwrap(), "com/foo/Bar");
        assert_eq!(reader.class(array_idx).unwrap(), "[Lcom/foo/Bar;");

        let resolver = ConstantResolver::new(reader, &[]);
        assert_eq!(resolver.ref_type(object_idx).unwrap(), object);
        assert_eq!(resolver.ref_type(array_idx).unwrap(), array);
        assert!(resolver.class_name(array_idx).is_err());
    }

    #[test]
    fn dynamic_constants_resolve_bootstrap_arguments() {
        let handle = MethodHandle {
            kind: HandleKind::InvokeStatic,
            member: HandleMember::Method(MethodRef {
                owner: RefType::Object(name("com/foo/Bootstraps")),
                name: UnqualifiedName::from_string(String::from("make")).unwrap(),
                descriptor: MethodDescriptor::parse(
                    "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/Class;I)I",
                )
                .unwrap(),
                is_interface: false,
            }),
        };
        let dynamic = ConstantData::Dynamic(DynamicConstant {
            bootstrap: BootstrapMethod {
                handle,
                arguments: vec![ConstantData::Integer(7)],
            },
            name: UnqualifiedName::from_string(String::from("value")).unwrap(),
            descriptor: FieldType::int(),
        });

        let mut pool = ConstantsPool::new();
        let idx = dynamic.constant_index(&mut pool).unwrap();
        let (constants, bootstrap_methods) = pool.into_parts();
        assert_eq!(bootstrap_methods.len(), 1);

        let resolver = ConstantResolver::new(ConstantsReader::new(&constants), &bootstrap_methods);
        assert_eq!(resolver.constant_data(idx).unwrap(), dynamic);
        assert!(!dynamic.is_wide());
    }

    #[test]
    fn non_loadable_constant() {
        let mut pool = ConstantsPool::new();
        let utf8 = pool.get_utf8("hello").unwrap();
        let (constants, _) = pool.into_parts();
        let resolver = ConstantResolver::new(ConstantsReader::new(&constants), &[]);
        assert!(matches!(
            resolver.constant_data(utf8.into()),
            Err(Error::UnexpectedConstant { .. })
        ));
    }
}
