//! Laying out code into a bytecode array
//!
//! Most jumps use signed 16-bit relative offsets. When a `goto` (or `jsr`) needs to jump further
//! than that, it is switched to its 32-bit `goto_w` (or `jsr_w`) form. Since a widened jump is
//! longer, it can push other jumps out of range. The process still terminates since the set of
//! widened jumps only ever grows.
//!
//! Conditional jumps have no wide form. A conditional jump that is out of range is an error.

use super::{BranchInstruction, CodeElement, Label, SerializableInstruction};
use crate::jvm::class_file::Serialize;
use crate::jvm::Error;
use crate::util::{Offset, Width};
use std::collections::{HashMap, HashSet};
use std::convert::TryFrom;

/// Code element ready to be laid out
pub type LayoutElement = CodeElement<SerializableInstruction, BranchInstruction<Label, Label>>;

/// Largest size of the code array of a method
pub const MAX_CODE_LENGTH: usize = u16::MAX as usize;

#[derive(Debug)]
pub struct AssembledCode {
    pub bytes: Vec<u8>,

    /// Offset of every label in the code (labels at the very end map to the length of the code)
    pub label_offsets: HashMap<Label, Offset>,
}

/// Padding needed after a switch opcode at this offset to align its operands to 4 bytes
fn switch_padding(offset: usize) -> u8 {
    ((4 - (offset + 1) % 4) % 4) as u8
}

/// Width of a branch instruction at a given offset
fn branch_width(branch: &BranchInstruction<Label, Label>, offset: usize, widened: bool) -> usize {
    match branch {
        BranchInstruction::Goto(_) | BranchInstruction::Jsr(_) if widened => 5,
        BranchInstruction::TableSwitch { targets, .. } => {
            1 + switch_padding(offset) as usize + 4 * (3 + targets.len())
        }
        BranchInstruction::LookupSwitch { targets, .. } => {
            1 + switch_padding(offset) as usize + 8 * (1 + targets.len())
        }
        other => other.width(),
    }
}

/// Compute the offset of every element (and label), along with the total code length
fn layout(
    elements: &[LayoutElement],
    widened: &HashSet<usize>,
) -> (Vec<usize>, HashMap<Label, Offset>, usize) {
    let mut offsets = Vec::with_capacity(elements.len());
    let mut label_offsets = HashMap::new();
    let mut offset = 0;
    for (idx, element) in elements.iter().enumerate() {
        offsets.push(offset);
        match element {
            CodeElement::Label(label) => {
                label_offsets.insert(*label, Offset(offset));
            }
            CodeElement::Instruction(insn) => offset += insn.width(),
            CodeElement::Branch(branch) => {
                offset += branch_width(branch, offset, widened.contains(&idx))
            }
        }
    }
    (offsets, label_offsets, offset)
}

fn lookup(label_offsets: &HashMap<Label, Offset>, label: &Label) -> Result<Offset, Error> {
    label_offsets
        .get(label)
        .copied()
        .ok_or(Error::UndefinedLabel(*label))
}

/// Lay out and serialize code elements
pub fn assemble(elements: &[LayoutElement]) -> Result<AssembledCode, Error> {
    let mut widened: HashSet<usize> = HashSet::new();

    let (offsets, label_offsets, code_length) = loop {
        let (offsets, label_offsets, code_length) = layout(elements, &widened);

        let mut changed = false;
        for (idx, element) in elements.iter().enumerate() {
            if let CodeElement::Branch(BranchInstruction::Goto(target) | BranchInstruction::Jsr(target)) =
                element
            {
                if widened.contains(&idx) {
                    continue;
                }
                let distance = lookup(&label_offsets, target)?.0 as i64 - offsets[idx] as i64;
                if i16::try_from(distance).is_err() {
                    widened.insert(idx);
                    changed = true;
                }
            }
        }

        if !changed {
            break (offsets, label_offsets, code_length);
        }
    };

    if code_length > MAX_CODE_LENGTH {
        return Err(Error::MethodCodeOverflow(code_length));
    }

    let mut bytes = Vec::with_capacity(code_length);
    for (idx, element) in elements.iter().enumerate() {
        match element {
            CodeElement::Label(_) => (),
            CodeElement::Instruction(insn) => insn.serialize(&mut bytes)?,
            CodeElement::Branch(branch) => {
                let from = offsets[idx];
                let relative = |label: &Label| -> Result<i64, Error> {
                    Ok(lookup(&label_offsets, label)?.0 as i64 - from as i64)
                };
                let short = |label: &Label| -> Result<i16, Error> {
                    let distance = relative(label)?;
                    i16::try_from(distance).map_err(|_| Error::BranchOffsetOverflow {
                        from: Offset(from),
                        distance,
                    })
                };
                let wide = |label: &Label| -> Result<i32, Error> {
                    let distance = relative(label)?;
                    i32::try_from(distance).map_err(|_| Error::BranchOffsetOverflow {
                        from: Offset(from),
                        distance,
                    })
                };

                let encoded: BranchInstruction<i16, i32> = match branch {
                    BranchInstruction::Goto(target) if widened.contains(&idx) => {
                        BranchInstruction::GotoW(wide(target)?)
                    }
                    BranchInstruction::Jsr(target) if widened.contains(&idx) => {
                        BranchInstruction::JsrW(wide(target)?)
                    }
                    _ => {
                        let mut encoded = branch.map_labels(short, wide)?;
                        match &mut encoded {
                            BranchInstruction::TableSwitch { padding, .. }
                            | BranchInstruction::LookupSwitch { padding, .. } => {
                                *padding = switch_padding(from);
                            }
                            _ => (),
                        }
                        encoded
                    }
                };
                encoded.serialize(&mut bytes)?;
            }
        }
    }

    Ok(AssembledCode {
        bytes,
        label_offsets,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{Instruction, OrdComparison};

    fn nops(count: usize) -> Vec<LayoutElement> {
        (0..count)
            .map(|_| CodeElement::Instruction(Instruction::Nop))
            .collect()
    }

    #[test]
    fn short_jumps() {
        let elements = vec![
            CodeElement::Label(Label(0)),
            CodeElement::Instruction(Instruction::IConst0),
            CodeElement::Branch(BranchInstruction::If(OrdComparison::EQ, Label(1))),
            CodeElement::Branch(BranchInstruction::Goto(Label(0))),
            CodeElement::Label(Label(1)),
            CodeElement::Branch(BranchInstruction::Return),
        ];
        let assembled = assemble(&elements).unwrap();
        assert_eq!(
            assembled.bytes,
            vec![0x03, 0x99, 0x00, 0x06, 0xa7, 0xff, 0xfc, 0xb1]
        );
        assert_eq!(assembled.label_offsets[&Label(1)], Offset(7));
    }

    #[test]
    fn long_goto_is_widened() {
        let mut elements = vec![CodeElement::Branch(BranchInstruction::Goto(Label(0)))];
        elements.extend(nops(40_000));
        elements.push(CodeElement::Label(Label(0)));
        elements.push(CodeElement::Branch(BranchInstruction::Return));

        let assembled = assemble(&elements).unwrap();
        assert_eq!(&assembled.bytes[..5], &[0xc8, 0x00, 0x00, 0x9c, 0x45]);
        assert_eq!(assembled.label_offsets[&Label(0)], Offset(40_005));
        assert_eq!(assembled.bytes.len(), 40_006);
    }

    #[test]
    fn long_conditional_jump_is_an_error() {
        let mut elements = vec![
            CodeElement::Instruction(Instruction::IConst0),
            CodeElement::Branch(BranchInstruction::If(OrdComparison::NE, Label(0))),
        ];
        elements.extend(nops(40_000));
        elements.push(CodeElement::Label(Label(0)));
        elements.push(CodeElement::Branch(BranchInstruction::Return));

        assert!(matches!(
            assemble(&elements),
            Err(Error::BranchOffsetOverflow {
                from: Offset(1),
                ..
            })
        ));
    }

    #[test]
    fn undefined_label() {
        let elements = vec![CodeElement::Branch(BranchInstruction::Goto(Label(3)))];
        assert!(matches!(
            assemble(&elements),
            Err(Error::UndefinedLabel(Label(3)))
        ));
    }

    #[test]
    fn oversized_code() {
        let mut elements = nops(70_000);
        elements.push(CodeElement::Branch(BranchInstruction::Return));
        assert!(matches!(
            assemble(&elements),
            Err(Error::MethodCodeOverflow(70_001))
        ));
    }

    #[test]
    fn switch_padding_follows_position() {
        for leading in 0..4 {
            let mut elements = nops(leading);
            elements.push(CodeElement::Branch(BranchInstruction::LookupSwitch {
                padding: 0,
                default: Label(0),
                targets: vec![(1, Label(0))],
            }));
            elements.push(CodeElement::Label(Label(0)));
            elements.push(CodeElement::Branch(BranchInstruction::Return));

            let assembled = assemble(&elements).unwrap();
            let default_at = assembled.label_offsets[&Label(0)].0 - 16;
            assert_eq!(default_at % 4, 0);
        }
    }
}
