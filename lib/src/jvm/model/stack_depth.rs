//! Computing `max_stack` and `max_locals` for method bodies
//!
//! The operand stack depth at every instruction is found by propagating depths along the control
//! flow graph, starting from the first instruction (with an empty stack) and from every exception
//! handler (with the thrown exception on the stack). Code that passes verification has a single
//! consistent depth at each instruction, so every element only needs to be visited once.

use crate::jvm::code::{BranchInstruction, CodeElement, Instruction, Label};
use crate::jvm::model::{CodeBranchInstruction, CodeInstruction, ExceptionHandler};
use crate::jvm::{BinaryName, Error, MethodDescriptor};
use crate::util::Width;
use std::collections::HashMap;

/// Number of stack slots popped and pushed by a non-branching instruction
fn stack_effect(instruction: &CodeInstruction) -> (usize, usize) {
    use Instruction::*;

    match instruction {
        Nop | IInc(_, _) => (0, 0),
        AConstNull | IConstM1 | IConst0 | IConst1 | IConst2 | IConst3 | IConst4 | IConst5
        | FConst0 | FConst1 | FConst2 | BiPush(_) | SiPush(_) => (0, 1),
        LConst0 | LConst1 | DConst0 | DConst1 => (0, 2),
        Ldc(_) => (0, 1),
        Ldc2(_) => (0, 2),
        ILoad(_) | FLoad(_) | ALoad(_) => (0, 1),
        LLoad(_) | DLoad(_) => (0, 2),
        IALoad | FALoad | AALoad | BALoad | CALoad | SALoad => (2, 1),
        LALoad | DALoad => (2, 2),
        IStore(_) | FStore(_) | AStore(_) => (1, 0),
        LStore(_) | DStore(_) => (2, 0),
        IAStore | FAStore | AAStore | BAStore | CAStore | SAStore => (3, 0),
        LAStore | DAStore => (4, 0),
        Pop => (1, 0),
        Pop2 => (2, 0),
        Dup => (1, 2),
        DupX1 => (2, 3),
        DupX2 => (3, 4),
        Dup2 => (2, 4),
        Dup2X1 => (3, 5),
        Dup2X2 => (4, 6),
        Swap => (2, 2),
        IAdd | FAdd | ISub | FSub | IMul | FMul | IDiv | FDiv | IRem | FRem => (2, 1),
        LAdd | DAdd | LSub | DSub | LMul | DMul | LDiv | DDiv | LRem | DRem => (4, 2),
        INeg | FNeg => (1, 1),
        LNeg | DNeg => (2, 2),
        ISh(_) => (2, 1),
        LSh(_) => (3, 2),
        IAnd | IOr | IXor => (2, 1),
        LAnd | LOr | LXor => (4, 2),
        I2F | F2I | I2B | I2C | I2S => (1, 1),
        I2L | I2D | F2L | F2D => (1, 2),
        L2I | L2F | D2I | D2F => (2, 1),
        L2D | D2L => (2, 2),
        LCmp | DCmp(_) => (4, 1),
        FCmp(_) => (2, 1),
        GetStatic(field) => (0, field.descriptor.width()),
        PutStatic(field) => (field.descriptor.width(), 0),
        GetField(field) => (1, field.descriptor.width()),
        PutField(field) => (1 + field.descriptor.width(), 0),
        Invoke(invoke_type, method) => {
            let has_this = !matches!(invoke_type, crate::jvm::code::InvokeType::Static);
            (
                method.descriptor.parameter_length(has_this),
                method.descriptor.return_width(),
            )
        }
        InvokeDynamic(indy) => (
            indy.descriptor.parameter_length(false),
            indy.descriptor.return_width(),
        ),
        New(_) => (0, 1),
        NewArray(_) | ANewArray(_) | ArrayLength | CheckCast(_) | InstanceOf(_) => (1, 1),
        MonitorEnter | MonitorExit => (1, 0),
        MultiANewArray(_, dimensions) => (*dimensions as usize, 1),
    }
}

/// Number of stack slots popped by a branch instruction
fn branch_pops(branch: &CodeBranchInstruction) -> usize {
    use BranchInstruction::*;

    match branch {
        Goto(_) | GotoW(_) | Jsr(_) | JsrW(_) | Ret(_) | Return => 0,
        If(_, _) | IfNull(_, _) | TableSwitch { .. } | LookupSwitch { .. } => 1,
        IReturn | FReturn | AReturn | AThrow => 1,
        IfICmp(_, _) | IfACmp(_, _) => 2,
        LReturn | DReturn => 2,
    }
}

/// Compute the maximum depth of the operand stack
pub fn max_stack(
    elements: &[CodeElement<CodeInstruction, CodeBranchInstruction>],
    exception_handlers: &[ExceptionHandler],
) -> Result<u16, Error> {
    let label_indices: HashMap<Label, usize> = elements
        .iter()
        .enumerate()
        .filter_map(|(idx, element)| match element {
            CodeElement::Label(label) => Some((*label, idx)),
            _ => None,
        })
        .collect();
    let index_of = |label: &Label| -> Result<usize, Error> {
        label_indices
            .get(label)
            .copied()
            .ok_or(Error::UndefinedLabel(*label))
    };

    let mut visited = vec![false; elements.len()];
    let mut worklist: Vec<(usize, usize)> = vec![(0, 0)];
    for handler in exception_handlers {
        worklist.push((index_of(&handler.handler)?, 1));
    }

    let mut max_depth = 0;
    while let Some((start, mut depth)) = worklist.pop() {
        max_depth = max_depth.max(depth);
        for idx in start..elements.len() {
            if visited[idx] {
                break;
            }
            visited[idx] = true;

            match &elements[idx] {
                CodeElement::Label(_) => (),
                CodeElement::Instruction(instruction) => {
                    let (pops, pushes) = stack_effect(instruction);
                    depth = depth.saturating_sub(pops) + pushes;
                }
                CodeElement::Branch(branch) => {
                    depth = depth.saturating_sub(branch_pops(branch));
                    let target_depth = match branch {
                        BranchInstruction::Jsr(_) | BranchInstruction::JsrW(_) => depth + 1,
                        _ => depth,
                    };
                    for target in branch.jump_targets() {
                        worklist.push((index_of(&target)?, target_depth));
                    }
                    max_depth = max_depth.max(target_depth);
                    if !branch.falls_through() {
                        break;
                    }
                }
            }
            max_depth = max_depth.max(depth);
        }
    }

    Ok(u16::try_from(max_depth).unwrap_or(u16::MAX))
}

/// Compute the number of local variable slots, from the parameters and every local access
pub fn max_locals(
    elements: &[CodeElement<CodeInstruction, CodeBranchInstruction>],
    descriptor: &MethodDescriptor<BinaryName>,
    is_static: bool,
) -> u16 {
    use Instruction::*;

    let mut max_locals = descriptor.parameter_length(!is_static);
    for element in elements {
        let used = match element {
            CodeElement::Instruction(
                ILoad(idx) | FLoad(idx) | ALoad(idx) | IStore(idx) | FStore(idx) | AStore(idx)
                | IInc(idx, _),
            ) => *idx as usize + 1,
            CodeElement::Instruction(LLoad(idx) | DLoad(idx) | LStore(idx) | DStore(idx)) => {
                *idx as usize + 2
            }
            CodeElement::Branch(BranchInstruction::Ret(idx)) => *idx as usize + 1,
            _ => 0,
        };
        max_locals = max_locals.max(used);
    }
    u16::try_from(max_locals).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::OrdComparison;
    use crate::jvm::{FieldType, ParseDescriptor};

    type Element = CodeElement<CodeInstruction, CodeBranchInstruction>;

    fn insn(instruction: CodeInstruction) -> Element {
        CodeElement::Instruction(instruction)
    }

    fn branch(branch: CodeBranchInstruction) -> Element {
        CodeElement::Branch(branch)
    }

    #[test]
    fn straight_line() {
        let code = vec![
            insn(Instruction::LLoad(0)),
            insn(Instruction::LLoad(2)),
            insn(Instruction::LAdd),
            branch(BranchInstruction::LReturn),
        ];
        assert_eq!(max_stack(&code, &[]).unwrap(), 4);

        let descriptor = MethodDescriptor::parse("(JJ)J").unwrap();
        assert_eq!(max_locals(&code, &descriptor, true), 4);
        assert_eq!(max_locals(&code, &descriptor, false), 5);
    }

    #[test]
    fn branches_and_handlers() {
        let (target, end, handler) = (Label(0), Label(1), Label(2));
        let code = vec![
            insn(Instruction::ILoad(0)),
            branch(BranchInstruction::If(OrdComparison::EQ, target)),
            insn(Instruction::IConst1),
            insn(Instruction::IConst2),
            insn(Instruction::IAdd),
            branch(BranchInstruction::IReturn),
            CodeElement::Label(target),
            insn(Instruction::IConst0),
            branch(BranchInstruction::Goto(end)),
            CodeElement::Label(handler),
            insn(Instruction::Dup),
            insn(Instruction::Dup),
            insn(Instruction::Pop2),
            insn(Instruction::Pop),
            insn(Instruction::IConst0),
            CodeElement::Label(end),
            branch(BranchInstruction::IReturn),
        ];
        let handlers = vec![ExceptionHandler {
            start: target,
            end,
            handler,
            catch_type: None,
        }];
        assert_eq!(max_stack(&code, &[]).unwrap(), 2);
        assert_eq!(max_stack(&code, &handlers).unwrap(), 3);

        let descriptor = MethodDescriptor {
            parameters: vec![FieldType::int()],
            return_type: Some(FieldType::int()),
        };
        assert_eq!(max_locals(&code, &descriptor, true), 1);
    }

    #[test]
    fn undefined_handler_label() {
        let code = vec![branch(BranchInstruction::Return)];
        let handlers = vec![ExceptionHandler {
            start: Label(0),
            end: Label(0),
            handler: Label(5),
            catch_type: None,
        }];
        assert!(matches!(
            max_stack(&code, &handlers),
            Err(Error::UndefinedLabel(Label(5)))
        ));
    }
}
