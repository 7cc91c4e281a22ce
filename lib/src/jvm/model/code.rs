use crate::jvm::class_file::{
    self, BytecodeArray, BytecodeIndex, ConstantsPool, ConstantsWriter, LineNumberTable,
    LocalVariableTable, LocalVariableTypeTable, SerializableVerificationType, StackMapFrame,
    StackMapTable,
};
use crate::jvm::code::{
    assemble, decode_bytecode, BranchInstruction, CodeElement, Decoded, Frame, Instruction, Label,
    LayoutElement, VerificationType,
};
use crate::jvm::model::{
    stack_depth, ConstantData, ConstantResolver, FieldRef, InvokeDynamic, MethodRef, RawAttribute,
};
use crate::jvm::{BinaryName, Error, MethodDescriptor, RefType, UnqualifiedName};
use crate::util::Offset;
use std::collections::{BTreeMap, BTreeSet};

/// Non-branching instruction with symbolic operands
pub type CodeInstruction =
    Instruction<RefType<BinaryName>, ConstantData, FieldRef, MethodRef, InvokeDynamic>;

/// Branch instruction jumping to labels
pub type CodeBranchInstruction = BranchInstruction<Label, Label>;

/// Element of a method body
pub type Element = CodeElement<CodeInstruction, CodeBranchInstruction>;

/// Stack map frame, with `uninitialized` types pointing at the label of their `new` instruction
pub type CodeFrame = Frame<RefType<BinaryName>, Label>;

/// Semantic representation of a method body
#[derive(Debug, Clone, PartialEq)]
pub struct Code {
    /// Maximum operand stack depth (`None` means it gets computed when lowering)
    pub max_stack: Option<u16>,

    /// Number of local variable slots (`None` means it gets computed when lowering)
    pub max_locals: Option<u16>,

    pub instructions: Vec<Element>,
    pub exception_handlers: Vec<ExceptionHandler>,
    pub line_numbers: Vec<LineNumber>,
    pub local_variables: Vec<LocalVariable>,

    /// Same as `local_variables`, but with generic signatures in the `descriptor` field
    pub local_variable_types: Vec<LocalVariable>,

    /// Explicit stack map frames, keyed by the label where they apply
    pub frames: Vec<(Label, CodeFrame)>,

    pub attributes: Vec<RawAttribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionHandler {
    /// Start of the protected range (inclusive)
    pub start: Label,

    /// End of the protected range (exclusive)
    pub end: Label,

    pub handler: Label,

    /// Type of exception caught (`None` catches everything)
    pub catch_type: Option<BinaryName>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineNumber {
    pub start: Label,
    pub line_number: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVariable {
    pub start: Label,
    pub end: Label,
    pub name: String,
    pub descriptor: String,
    pub index: u16,
}

/// Details of the method a body belongs to
///
/// Stack map frames are stored relative to an implicit initial frame, which depends on these.
pub struct MethodContext<'a> {
    pub class_name: &'a BinaryName,
    pub method_name: &'a UnqualifiedName,
    pub descriptor: &'a MethodDescriptor<BinaryName>,
    pub is_static: bool,
}

impl<'a> MethodContext<'a> {
    /// Frame on entry to the method
    pub fn initial_frame<U>(&self) -> Frame<RefType<BinaryName>, U> {
        let mut locals = vec![];
        if !self.is_static {
            if *self.method_name == UnqualifiedName::INIT && *self.class_name != BinaryName::OBJECT
            {
                locals.push(VerificationType::UninitializedThis);
            } else {
                locals.push(VerificationType::Object(RefType::Object(
                    self.class_name.clone(),
                )));
            }
        }
        for parameter in &self.descriptor.parameters {
            locals.push(VerificationType::from(parameter.clone()));
        }
        Frame {
            locals,
            stack: vec![],
        }
    }
}

impl Code {
    /// Code made of just these instructions, with limits computed when lowering
    pub fn from_instructions(instructions: Vec<Element>) -> Code {
        Code {
            max_stack: None,
            max_locals: None,
            instructions,
            exception_handlers: vec![],
            line_numbers: vec![],
            local_variables: vec![],
            local_variable_types: vec![],
            frames: vec![],
            attributes: vec![],
        }
    }

    /// Lift a `Code` attribute
    ///
    /// Every code offset referenced (by jumps, exception ranges, debug tables, and stack map
    /// frames) becomes a label. Labels are numbered in increasing offset order.
    pub fn parse_code(
        code: &class_file::Code,
        resolver: &ConstantResolver,
        context: &MethodContext,
    ) -> Result<Code, Error> {
        let code_array = &code.code_array.0;
        let decoded = decode_bytecode(code_array)?;
        let code_length = code_array.len();

        let mut boundaries: BTreeSet<usize> =
            decoded.iter().map(|(offset, _)| offset.0).collect();
        boundaries.insert(code_length);
        let check_boundary = |from: usize, target: usize| -> Result<usize, Error> {
            if boundaries.contains(&target) {
                Ok(target)
            } else {
                Err(Error::InvalidCodeOffset {
                    from: Offset(from),
                    target: target as i64,
                })
            }
        };

        let mut line_numbers = vec![];
        let mut local_variables = vec![];
        let mut local_variable_types = vec![];
        let mut stack_map_table = None;
        let mut attributes = vec![];
        for attribute in &code.attributes {
            match resolver.constants.utf8(attribute.name_index)? {
                "LineNumberTable" => {
                    line_numbers.extend(attribute.parse::<LineNumberTable>()?.0);
                }
                "LocalVariableTable" => {
                    local_variables.extend(attribute.parse::<LocalVariableTable>()?.0);
                }
                "LocalVariableTypeTable" => {
                    local_variable_types.extend(attribute.parse::<LocalVariableTypeTable>()?.0);
                }
                "StackMapTable" => {
                    stack_map_table = Some(attribute.parse::<StackMapTable>()?);
                }
                _ => attributes.push(RawAttribute::parse_raw(attribute, &resolver.constants)?),
            }
        }

        // Every offset that needs a label
        let mut label_offsets: BTreeSet<usize> = BTreeSet::new();
        for (offset, decoded) in &decoded {
            if let Decoded::Branch(branch) = decoded {
                for target in branch.jump_targets() {
                    label_offsets.insert(check_boundary(offset.0, target.0)?);
                }
            }
        }
        for handler in &code.exception_table {
            let start = handler.start_pc.0 as usize;
            label_offsets.insert(check_boundary(start, start)?);
            label_offsets.insert(check_boundary(start, handler.end_pc.0 as usize)?);
            label_offsets.insert(check_boundary(start, handler.handler_pc.0 as usize)?);
        }

        // Debug information pointing into the middle of an instruction is dropped
        line_numbers.retain(|line_number: &class_file::LineNumber| {
            let start = line_number.start_pc.0 as usize;
            let valid = boundaries.contains(&start);
            if !valid {
                log::warn!("Dropping line number entry at invalid offset {}", start);
            }
            valid
        });
        let valid_range = |variable: &class_file::LocalVariable| {
            let start = variable.start_pc.0 as usize;
            let end = start + variable.length as usize;
            let valid = boundaries.contains(&start) && boundaries.contains(&end);
            if !valid {
                log::warn!(
                    "Dropping local variable entry for slot {} at invalid range {}..{}",
                    variable.index,
                    start,
                    end
                );
            }
            valid
        };
        local_variables.retain(valid_range);
        local_variable_types.retain(valid_range);
        for line_number in &line_numbers {
            label_offsets.insert(line_number.start_pc.0 as usize);
        }
        for variable in local_variables.iter().chain(local_variable_types.iter()) {
            let start = variable.start_pc.0 as usize;
            label_offsets.insert(start);
            label_offsets.insert(start + variable.length as usize);
        }

        // Explicit frames, with `uninitialized` types still as offsets
        let mut explicit_frames: Vec<(usize, Frame<RefType<BinaryName>, u16>)> = vec![];
        if let Some(StackMapTable(entries)) = stack_map_table {
            let mut frame: Frame<RefType<BinaryName>, u16> = context.initial_frame();
            let mut offset: Option<usize> = None;
            for entry in entries {
                let frame_offset = match offset {
                    None => entry.offset_delta() as usize,
                    Some(previous) => previous + entry.offset_delta() as usize + 1,
                };
                if frame_offset >= code_length || !boundaries.contains(&frame_offset) {
                    return Err(Error::InvalidCodeOffset {
                        from: Offset(offset.unwrap_or(0)),
                        target: frame_offset as i64,
                    });
                }
                let entry = entry.map(|verification_type: SerializableVerificationType| {
                    verification_type.map(
                        |class| resolver.ref_type(*class),
                        |uninitialized| Ok(*uninitialized),
                    )
                })?;
                frame = frame.apply(entry)?;
                label_offsets.insert(frame_offset);
                for verification_type in frame.locals.iter().chain(frame.stack.iter()) {
                    if let VerificationType::Uninitialized(new_offset) = verification_type {
                        let new_offset = *new_offset as usize;
                        label_offsets.insert(check_boundary(frame_offset, new_offset)?);
                    }
                }
                explicit_frames.push((frame_offset, frame.clone()));
                offset = Some(frame_offset);
            }
        }

        let labels: BTreeMap<usize, Label> = label_offsets
            .into_iter()
            .enumerate()
            .map(|(idx, offset)| (offset, Label(idx)))
            .collect();
        let label_at = |offset: &usize| -> Result<Label, Error> {
            labels.get(offset).copied().ok_or(Error::InvalidCodeOffset {
                from: Offset(*offset),
                target: *offset as i64,
            })
        };
        let branch_label = |offset: &Offset| label_at(&offset.0);

        // Resolve the instructions
        let mut instructions = Vec::with_capacity(decoded.len() + labels.len());
        for (offset, decoded) in &decoded {
            if let Some(label) = labels.get(&offset.0) {
                instructions.push(CodeElement::Label(*label));
            }
            let element = match decoded {
                Decoded::Instruction(instruction) => CodeElement::Instruction(instruction.map(
                    &mut (),
                    |_, class| resolver.ref_type(*class),
                    |_, constant| resolver.constant_data(*constant),
                    |_, field| resolver.field_ref(*field),
                    |_, method| resolver.method_ref(*method),
                    |_, indy| resolver.invoke_dynamic(*indy),
                )?),
                Decoded::Branch(branch) => {
                    CodeElement::Branch(branch.map_labels(branch_label, branch_label)?)
                }
            };
            instructions.push(element);
        }
        if let Some(label) = labels.get(&code_length) {
            instructions.push(CodeElement::Label(*label));
        }

        let exception_handlers = code
            .exception_table
            .iter()
            .map(|handler| -> Result<_, Error> {
                Ok(ExceptionHandler {
                    start: label_at(&(handler.start_pc.0 as usize))?,
                    end: label_at(&(handler.end_pc.0 as usize))?,
                    handler: label_at(&(handler.handler_pc.0 as usize))?,
                    catch_type: handler
                        .catch_type
                        .map(|class| resolver.class_name(class))
                        .transpose()?,
                })
            })
            .collect::<Result<_, Error>>()?;
        let line_numbers = line_numbers
            .iter()
            .map(|line_number| -> Result<_, Error> {
                Ok(LineNumber {
                    start: label_at(&(line_number.start_pc.0 as usize))?,
                    line_number: line_number.line_number,
                })
            })
            .collect::<Result<_, Error>>()?;
        let lift_variable = |variable: &class_file::LocalVariable| -> Result<LocalVariable, Error> {
            let start = variable.start_pc.0 as usize;
            Ok(LocalVariable {
                start: label_at(&start)?,
                end: label_at(&(start + variable.length as usize))?,
                name: resolver.utf8(variable.name)?,
                descriptor: resolver.utf8(variable.descriptor)?,
                index: variable.index,
            })
        };
        let local_variables = local_variables
            .iter()
            .map(lift_variable)
            .collect::<Result<_, _>>()?;
        let local_variable_types = local_variable_types
            .iter()
            .map(lift_variable)
            .collect::<Result<_, _>>()?;
        let frames = explicit_frames
            .into_iter()
            .map(|(offset, frame)| -> Result<_, Error> {
                let frame = frame.map(
                    |class| Ok(class.clone()),
                    |new_offset| label_at(&(*new_offset as usize)),
                )?;
                Ok((label_at(&offset)?, frame))
            })
            .collect::<Result<_, Error>>()?;

        Ok(Code {
            max_stack: Some(code.max_stack),
            max_locals: Some(code.max_locals),
            instructions,
            exception_handlers,
            line_numbers,
            local_variables,
            local_variable_types,
            frames,
            attributes,
        })
    }

    /// Lower the code into a `Code` attribute
    pub fn serialize_code(
        &self,
        constants_pool: &mut ConstantsPool,
        context: &MethodContext,
    ) -> Result<class_file::Code, Error> {
        let mut elements: Vec<LayoutElement> = Vec::with_capacity(self.instructions.len());
        for element in &self.instructions {
            elements.push(match element {
                CodeElement::Label(label) => CodeElement::Label(*label),
                CodeElement::Instruction(instruction) => {
                    CodeElement::Instruction(instruction.map(
                        constants_pool,
                        |pool, class| class.constant_index(pool),
                        |pool, constant| constant.constant_index(pool),
                        |pool, field| field.constant_index(pool),
                        |pool, method| method.constant_index(pool),
                        |pool, indy| indy.constant_index(pool),
                    )?)
                }
                CodeElement::Branch(branch) => CodeElement::Branch(branch.clone()),
            });
        }
        let assembled = assemble(&elements)?;

        let offset_of = |label: &Label| -> Result<u16, Error> {
            assembled
                .label_offsets
                .get(label)
                .map(|offset| offset.0 as u16)
                .ok_or(Error::UndefinedLabel(*label))
        };

        let mut exception_table = Vec::with_capacity(self.exception_handlers.len());
        for handler in &self.exception_handlers {
            exception_table.push(class_file::ExceptionHandler {
                start_pc: BytecodeIndex(offset_of(&handler.start)?),
                end_pc: BytecodeIndex(offset_of(&handler.end)?),
                handler_pc: BytecodeIndex(offset_of(&handler.handler)?),
                catch_type: match &handler.catch_type {
                    None => None,
                    Some(class) => Some(class.constant_index(constants_pool)?),
                },
            });
        }

        let mut attributes = vec![];

        if !self.line_numbers.is_empty() {
            let line_numbers = self
                .line_numbers
                .iter()
                .map(|line_number| -> Result<_, Error> {
                    Ok(class_file::LineNumber {
                        start_pc: BytecodeIndex(offset_of(&line_number.start)?),
                        line_number: line_number.line_number,
                    })
                })
                .collect::<Result<_, Error>>()?;
            attributes.push(constants_pool.get_attribute(LineNumberTable(line_numbers))?);
        }

        if !self.local_variables.is_empty() {
            let variables =
                serialize_local_variables(&self.local_variables, constants_pool, &offset_of)?;
            attributes.push(constants_pool.get_attribute(LocalVariableTable(variables))?);
        }

        if !self.local_variable_types.is_empty() {
            let variables =
                serialize_local_variables(&self.local_variable_types, constants_pool, &offset_of)?;
            attributes.push(constants_pool.get_attribute(LocalVariableTypeTable(variables))?);
        }

        if !self.frames.is_empty() {
            let mut frames: Vec<(u16, &CodeFrame)> = self
                .frames
                .iter()
                .map(|(label, frame)| -> Result<_, Error> { Ok((offset_of(label)?, frame)) })
                .collect::<Result<_, Error>>()?;
            frames.sort_by_key(|(offset, _)| *offset);
            for pair in frames.windows(2) {
                if pair[0].0 == pair[1].0 {
                    return Err(Error::ConflictingFrames(Offset(pair[0].0 as usize)));
                }
            }

            let mut entries = Vec::with_capacity(frames.len());
            let mut previous_frame: CodeFrame = context.initial_frame();
            let mut previous_offset: Option<u16> = None;
            for (offset, frame) in frames {
                let offset_delta = match previous_offset {
                    None => offset,
                    Some(previous) => offset - previous - 1,
                };
                let entry: StackMapFrame<SerializableVerificationType> = frame
                    .compress(&previous_frame, offset_delta)
                    .map(|verification_type| {
                        verification_type.map(
                            |class| -> Result<_, Error> {
                                Ok(class.constant_index(constants_pool)?)
                            },
                            |label| offset_of(label),
                        )
                    })?;
                entries.push(entry);
                previous_frame = frame.clone();
                previous_offset = Some(offset);
            }
            attributes.push(constants_pool.get_attribute(StackMapTable(entries))?);
        }

        for attribute in &self.attributes {
            attributes.push(attribute.serialize_raw(constants_pool)?);
        }

        let max_stack = match self.max_stack {
            Some(max_stack) => max_stack,
            None => stack_depth::max_stack(&self.instructions, &self.exception_handlers)?,
        };
        let max_locals = match self.max_locals {
            Some(max_locals) => max_locals,
            None => {
                stack_depth::max_locals(&self.instructions, context.descriptor, context.is_static)
            }
        };

        Ok(class_file::Code {
            max_stack,
            max_locals,
            code_array: BytecodeArray(assembled.bytes),
            exception_table,
            attributes,
        })
    }
}

fn serialize_local_variables(
    variables: &[LocalVariable],
    constants_pool: &mut ConstantsPool,
    offset_of: &impl Fn(&Label) -> Result<u16, Error>,
) -> Result<Vec<class_file::LocalVariable>, Error> {
    variables
        .iter()
        .map(|variable| -> Result<_, Error> {
            let start = offset_of(&variable.start)?;
            let end = offset_of(&variable.end)?;
            let length = end.checked_sub(start).ok_or(Error::InvalidCodeOffset {
                from: Offset(start as usize),
                target: end as i64,
            })?;
            Ok(class_file::LocalVariable {
                start_pc: BytecodeIndex(start),
                length,
                name: constants_pool.get_utf8(variable.name.as_str())?,
                descriptor: constants_pool.get_utf8(variable.descriptor.as_str())?,
                index: variable.index,
            })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::ConstantsReader;
    use crate::jvm::code::OrdComparison;
    use crate::jvm::{FieldType, Name, ParseDescriptor};

    fn round_trip(code: &Code, context: &MethodContext) -> Code {
        let mut pool = ConstantsPool::new();
        let serialized = code.serialize_code(&mut pool, context).unwrap();
        let (constants, bootstrap_methods) = pool.into_parts();
        let resolver = ConstantResolver::new(ConstantsReader::new(&constants), &bootstrap_methods);
        Code::parse_code(&serialized, &resolver, context).unwrap()
    }

    #[test]
    fn labels_frames_and_debug_tables() {
        let class_name = BinaryName::from_string(String::from("com/foo/Bar")).unwrap();
        let method_name = UnqualifiedName::from_string(String::from("pick")).unwrap();
        let descriptor = MethodDescriptor::parse("(ILjava/lang/String;)Ljava/lang/String;").unwrap();
        let context = MethodContext {
            class_name: &class_name,
            method_name: &method_name,
            descriptor: &descriptor,
            is_static: true,
        };

        let (start, other, end) = (Label(0), Label(1), Label(2));
        let code = Code {
            max_stack: None,
            max_locals: None,
            instructions: vec![
                CodeElement::Label(start),
                CodeElement::Instruction(Instruction::ILoad(0)),
                CodeElement::Branch(BranchInstruction::If(OrdComparison::EQ, other)),
                CodeElement::Instruction(Instruction::ALoad(1)),
                CodeElement::Branch(BranchInstruction::AReturn),
                CodeElement::Label(other),
                CodeElement::Instruction(Instruction::Ldc(ConstantData::String(String::from(
                    "none",
                )))),
                CodeElement::Branch(BranchInstruction::AReturn),
                CodeElement::Label(end),
            ],
            exception_handlers: vec![],
            line_numbers: vec![
                LineNumber {
                    start,
                    line_number: 3,
                },
                LineNumber {
                    start: other,
                    line_number: 4,
                },
            ],
            local_variables: vec![LocalVariable {
                start,
                end,
                name: String::from("flag"),
                descriptor: String::from("I"),
                index: 0,
            }],
            local_variable_types: vec![],
            frames: vec![(other, context.initial_frame())],
            attributes: vec![],
        };

        let lifted = round_trip(&code, &context);
        assert_eq!(lifted.max_stack, Some(1));
        assert_eq!(lifted.max_locals, Some(2));
        assert_eq!(lifted.instructions, code.instructions);
        assert_eq!(lifted.line_numbers, code.line_numbers);
        assert_eq!(lifted.local_variables, code.local_variables);
        assert_eq!(lifted.frames, code.frames);
    }

    #[test]
    fn constructor_frames_start_uninitialized() {
        let class_name = BinaryName::from_string(String::from("com/foo/Bar")).unwrap();
        let descriptor = MethodDescriptor {
            parameters: vec![FieldType::long()],
            return_type: None,
        };
        let context = MethodContext {
            class_name: &class_name,
            method_name: &UnqualifiedName::INIT,
            descriptor: &descriptor,
            is_static: false,
        };
        let frame: CodeFrame = context.initial_frame();
        assert_eq!(
            frame.locals,
            vec![VerificationType::UninitializedThis, VerificationType::Long]
        );
    }

    #[test]
    fn duplicate_frames() {
        let class_name = BinaryName::OBJECT;
        let descriptor = MethodDescriptor {
            parameters: vec![],
            return_type: None,
        };
        let context = MethodContext {
            class_name: &class_name,
            method_name: &UnqualifiedName::CLINIT,
            descriptor: &descriptor,
            is_static: true,
        };
        let mut code = Code::from_instructions(vec![
            CodeElement::Label(Label(0)),
            CodeElement::Label(Label(1)),
            CodeElement::Branch(BranchInstruction::Return),
        ]);
        code.frames = vec![
            (Label(0), Frame::default()),
            (Label(1), Frame::default()),
        ];
        let mut pool = ConstantsPool::new();
        assert!(matches!(
            code.serialize_code(&mut pool, &context),
            Err(Error::ConflictingFrames(Offset(0)))
        ));
    }
}
