//! Decoding of raw bytecode arrays
//!
//! Decoding happens in one linear sweep over the code array. Jump targets are converted from
//! relative offsets to absolute offsets, but are not otherwise checked here (the caller is in a
//! better position to check that they land on instruction boundaries).

use super::{
    array_type_from_code, BranchInstruction, CompareMode, EqComparison, Instruction, InvokeType,
    OrdComparison, SerializableInstruction, ShiftType,
};
use crate::jvm::class_file::{
    ClassConstantIndex, ConstantIndex, FieldRefConstantIndex, InvokeDynamicConstantIndex,
    MethodRefConstantIndex,
};
use crate::jvm::Error;
use crate::util::Offset;

/// Instruction decoded from the code array
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Instruction(SerializableInstruction),

    /// Branch instruction, with absolute jump targets
    Branch(BranchInstruction<Offset, Offset>),
}

/// Cursor over the bytes of one instruction
struct CodeReader<'a> {
    code: &'a [u8],
    position: usize,

    /// Offset of the opcode of the instruction being read
    start: usize,
}

impl<'a> CodeReader<'a> {
    fn truncated(&self) -> Error {
        Error::TruncatedInstruction(Offset(self.start))
    }

    fn u8(&mut self) -> Result<u8, Error> {
        let byte = *self.code.get(self.position).ok_or_else(|| self.truncated())?;
        self.position += 1;
        Ok(byte)
    }

    fn i8(&mut self) -> Result<i8, Error> {
        Ok(self.u8()? as i8)
    }

    fn u16(&mut self) -> Result<u16, Error> {
        Ok(u16::from_be_bytes([self.u8()?, self.u8()?]))
    }

    fn i16(&mut self) -> Result<i16, Error> {
        Ok(self.u16()? as i16)
    }

    fn i32(&mut self) -> Result<i32, Error> {
        Ok(i32::from_be_bytes([self.u8()?, self.u8()?, self.u8()?, self.u8()?]))
    }

    fn constant(&mut self) -> Result<ConstantIndex, Error> {
        Ok(ConstantIndex(self.u16()?))
    }

    fn class(&mut self) -> Result<ClassConstantIndex, Error> {
        Ok(ClassConstantIndex(self.constant()?))
    }

    /// Resolve a relative jump into an absolute offset within the code array
    fn target(&self, relative: i64) -> Result<Offset, Error> {
        let target = self.start as i64 + relative;
        if target < 0 || target >= self.code.len() as i64 {
            Err(Error::InvalidCodeOffset {
                from: Offset(self.start),
                target,
            })
        } else {
            Ok(Offset(target as usize))
        }
    }

    fn short_target(&mut self) -> Result<Offset, Error> {
        let relative = self.i16()?;
        self.target(relative as i64)
    }

    fn wide_target(&mut self) -> Result<Offset, Error> {
        let relative = self.i32()?;
        self.target(relative as i64)
    }
}

fn load(kind: u8, idx: u16) -> SerializableInstruction {
    match kind {
        0 => Instruction::ILoad(idx),
        1 => Instruction::LLoad(idx),
        2 => Instruction::FLoad(idx),
        3 => Instruction::DLoad(idx),
        _ => Instruction::ALoad(idx),
    }
}

fn store(kind: u8, idx: u16) -> SerializableInstruction {
    match kind {
        0 => Instruction::IStore(idx),
        1 => Instruction::LStore(idx),
        2 => Instruction::FStore(idx),
        3 => Instruction::DStore(idx),
        _ => Instruction::AStore(idx),
    }
}

fn ord_comparison(code: u8) -> OrdComparison {
    match code {
        0 => OrdComparison::EQ,
        1 => OrdComparison::NE,
        2 => OrdComparison::LT,
        3 => OrdComparison::GE,
        4 => OrdComparison::GT,
        _ => OrdComparison::LE,
    }
}

/// Decode every instruction in a code array, along with its offset
pub fn decode_bytecode(code: &[u8]) -> Result<Vec<(Offset, Decoded)>, Error> {
    let mut decoded = vec![];
    let mut reader = CodeReader {
        code,
        position: 0,
        start: 0,
    };

    while reader.position < code.len() {
        reader.start = reader.position;
        let offset = Offset(reader.start);
        let opcode = reader.u8()?;
        let insn = decode_one(&mut reader, opcode)?;
        decoded.push((offset, insn));
    }

    Ok(decoded)
}

fn decode_one(reader: &mut CodeReader, opcode: u8) -> Result<Decoded, Error> {
    use Instruction::*;

    let insn = match opcode {
        0x00 => Nop,
        0x01 => AConstNull,
        0x02 => IConstM1,
        0x03 => IConst0,
        0x04 => IConst1,
        0x05 => IConst2,
        0x06 => IConst3,
        0x07 => IConst4,
        0x08 => IConst5,
        0x09 => LConst0,
        0x0a => LConst1,
        0x0b => FConst0,
        0x0c => FConst1,
        0x0d => FConst2,
        0x0e => DConst0,
        0x0f => DConst1,
        0x10 => BiPush(reader.i8()?),
        0x11 => SiPush(reader.i16()?),
        0x12 => Ldc(ConstantIndex(reader.u8()? as u16)),
        0x13 => Ldc(reader.constant()?),
        0x14 => Ldc2(reader.constant()?),
        0x15..=0x19 => load(opcode - 0x15, reader.u8()? as u16),
        0x1a..=0x2d => load((opcode - 0x1a) / 4, ((opcode - 0x1a) % 4) as u16),
        0x2e => IALoad,
        0x2f => LALoad,
        0x30 => FALoad,
        0x31 => DALoad,
        0x32 => AALoad,
        0x33 => BALoad,
        0x34 => CALoad,
        0x35 => SALoad,
        0x36..=0x3a => store(opcode - 0x36, reader.u8()? as u16),
        0x3b..=0x4e => store((opcode - 0x3b) / 4, ((opcode - 0x3b) % 4) as u16),
        0x4f => IAStore,
        0x50 => LAStore,
        0x51 => FAStore,
        0x52 => DAStore,
        0x53 => AAStore,
        0x54 => BAStore,
        0x55 => CAStore,
        0x56 => SAStore,
        0x57 => Pop,
        0x58 => Pop2,
        0x59 => Dup,
        0x5a => DupX1,
        0x5b => DupX2,
        0x5c => Dup2,
        0x5d => Dup2X1,
        0x5e => Dup2X2,
        0x5f => Swap,
        0x60 => IAdd,
        0x61 => LAdd,
        0x62 => FAdd,
        0x63 => DAdd,
        0x64 => ISub,
        0x65 => LSub,
        0x66 => FSub,
        0x67 => DSub,
        0x68 => IMul,
        0x69 => LMul,
        0x6a => FMul,
        0x6b => DMul,
        0x6c => IDiv,
        0x6d => LDiv,
        0x6e => FDiv,
        0x6f => DDiv,
        0x70 => IRem,
        0x71 => LRem,
        0x72 => FRem,
        0x73 => DRem,
        0x74 => INeg,
        0x75 => LNeg,
        0x76 => FNeg,
        0x77 => DNeg,
        0x78 => ISh(ShiftType::Left),
        0x79 => LSh(ShiftType::Left),
        0x7a => ISh(ShiftType::ArithmeticRight),
        0x7b => LSh(ShiftType::ArithmeticRight),
        0x7c => ISh(ShiftType::LogicalRight),
        0x7d => LSh(ShiftType::LogicalRight),
        0x7e => IAnd,
        0x7f => LAnd,
        0x80 => IOr,
        0x81 => LOr,
        0x82 => IXor,
        0x83 => LXor,
        0x84 => IInc(reader.u8()? as u16, reader.i8()? as i16),
        0x85 => I2L,
        0x86 => I2F,
        0x87 => I2D,
        0x88 => L2I,
        0x89 => L2F,
        0x8a => L2D,
        0x8b => F2I,
        0x8c => F2L,
        0x8d => F2D,
        0x8e => D2I,
        0x8f => D2L,
        0x90 => D2F,
        0x91 => I2B,
        0x92 => I2C,
        0x93 => I2S,
        0x94 => LCmp,
        0x95 => FCmp(CompareMode::L),
        0x96 => FCmp(CompareMode::G),
        0x97 => DCmp(CompareMode::L),
        0x98 => DCmp(CompareMode::G),
        0x99..=0xc9 => return decode_control(reader, opcode),
        _ => {
            return Err(Error::UnknownOpcode {
                opcode,
                offset: Offset(reader.start),
            })
        }
    };
    Ok(Decoded::Instruction(insn))
}

/// Decode opcodes in the range `0x99` to `0xc9` (branches, member accesses, object creation, and
/// the `wide` prefix)
fn decode_control(reader: &mut CodeReader, opcode: u8) -> Result<Decoded, Error> {
    use BranchInstruction as B;
    use Instruction::*;

    let branch = match opcode {
        0x99..=0x9e => B::If(ord_comparison(opcode - 0x99), reader.short_target()?),
        0x9f..=0xa4 => B::IfICmp(ord_comparison(opcode - 0x9f), reader.short_target()?),
        0xa5 => B::IfACmp(EqComparison::EQ, reader.short_target()?),
        0xa6 => B::IfACmp(EqComparison::NE, reader.short_target()?),
        0xa7 => B::Goto(reader.short_target()?),
        0xa8 => B::Jsr(reader.short_target()?),
        0xa9 => B::Ret(reader.u8()? as u16),
        0xaa | 0xab => {
            let padding = ((4 - (reader.start + 1) % 4) % 4) as u8;
            for _ in 0..padding {
                reader.u8()?;
            }
            let default = reader.wide_target()?;
            if opcode == 0xaa {
                let low = reader.i32()?;
                let high = reader.i32()?;
                if high < low {
                    return Err(Error::MalformedAttribute {
                        name: "Code",
                        message: format!("tableswitch with low {} above high {}", low, high),
                    });
                }
                let mut targets = vec![];
                for _ in low..=high {
                    targets.push(reader.wide_target()?);
                }
                B::TableSwitch {
                    padding,
                    default,
                    low,
                    targets,
                }
            } else {
                let npairs = reader.i32()?;
                if npairs < 0 {
                    return Err(Error::MalformedAttribute {
                        name: "Code",
                        message: format!("lookupswitch with {} pairs", npairs),
                    });
                }
                let mut targets = vec![];
                for _ in 0..npairs {
                    let key = reader.i32()?;
                    targets.push((key, reader.wide_target()?));
                }
                B::LookupSwitch {
                    padding,
                    default,
                    targets,
                }
            }
        }
        0xac => B::IReturn,
        0xad => B::LReturn,
        0xae => B::FReturn,
        0xaf => B::DReturn,
        0xb0 => B::AReturn,
        0xb1 => B::Return,
        0xbf => B::AThrow,
        0xc6 => B::IfNull(EqComparison::EQ, reader.short_target()?),
        0xc7 => B::IfNull(EqComparison::NE, reader.short_target()?),
        0xc8 => B::GotoW(reader.wide_target()?),
        0xc9 => B::JsrW(reader.wide_target()?),

        // Everything else is a regular instruction
        _ => {
            let insn = match opcode {
                0xb2 => GetStatic(FieldRefConstantIndex(reader.constant()?)),
                0xb3 => PutStatic(FieldRefConstantIndex(reader.constant()?)),
                0xb4 => GetField(FieldRefConstantIndex(reader.constant()?)),
                0xb5 => PutField(FieldRefConstantIndex(reader.constant()?)),
                0xb6 => Invoke(
                    InvokeType::Virtual,
                    MethodRefConstantIndex(reader.constant()?),
                ),
                0xb7 => Invoke(
                    InvokeType::Special,
                    MethodRefConstantIndex(reader.constant()?),
                ),
                0xb8 => Invoke(
                    InvokeType::Static,
                    MethodRefConstantIndex(reader.constant()?),
                ),
                0xb9 => {
                    let method = MethodRefConstantIndex(reader.constant()?);
                    let count = reader.u8()?;
                    reader.u8()?;
                    Invoke(InvokeType::Interface(count), method)
                }
                0xba => {
                    let indy = InvokeDynamicConstantIndex(reader.constant()?);
                    reader.u16()?;
                    InvokeDynamic(indy)
                }
                0xbb => New(reader.class()?),
                0xbc => {
                    let code = reader.u8()?;
                    let base_type = array_type_from_code(code).ok_or_else(|| Error::MalformedAttribute {
                        name: "Code",
                        message: format!("Unknown newarray type {}", code),
                    })?;
                    NewArray(base_type)
                }
                0xbd => ANewArray(reader.class()?),
                0xbe => ArrayLength,
                0xc0 => CheckCast(reader.class()?),
                0xc1 => InstanceOf(reader.class()?),
                0xc2 => MonitorEnter,
                0xc3 => MonitorExit,
                0xc4 => return decode_wide(reader),
                0xc5 => {
                    let class = reader.class()?;
                    MultiANewArray(class, reader.u8()?)
                }
                _ => {
                    return Err(Error::UnknownOpcode {
                        opcode,
                        offset: Offset(reader.start),
                    })
                }
            };
            return Ok(Decoded::Instruction(insn));
        }
    };
    Ok(Decoded::Branch(branch))
}

/// Decode the instruction following a `wide` prefix
fn decode_wide(reader: &mut CodeReader) -> Result<Decoded, Error> {
    let opcode = reader.u8()?;
    let decoded = match opcode {
        0x15..=0x19 => Decoded::Instruction(load(opcode - 0x15, reader.u16()?)),
        0x36..=0x3a => Decoded::Instruction(store(opcode - 0x36, reader.u16()?)),
        0x84 => Decoded::Instruction(Instruction::IInc(reader.u16()?, reader.i16()?)),
        0xa9 => Decoded::Branch(BranchInstruction::Ret(reader.u16()?)),
        _ => {
            return Err(Error::UnknownOpcode {
                opcode,
                offset: Offset(reader.start),
            })
        }
    };
    Ok(decoded)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::Serialize;
    use crate::util::Width;

    #[test]
    fn short_forms_and_wide() {
        let code = [
            0x2a, // aload_0
            0x19, 0x05, // aload 5
            0xc4, 0x36, 0x01, 0x00, // wide istore 256
            0xc4, 0x84, 0x00, 0x02, 0xff, 0xff, // wide iinc 2 -1
            0xb1, // return
        ];
        let decoded = decode_bytecode(&code).unwrap();
        let offsets: Vec<usize> = decoded.iter().map(|(off, _)| off.0).collect();
        assert_eq!(offsets, vec![0, 1, 3, 7, 13]);
        assert_eq!(decoded[0].1, Decoded::Instruction(Instruction::ALoad(0)));
        assert_eq!(decoded[1].1, Decoded::Instruction(Instruction::ALoad(5)));
        assert_eq!(decoded[2].1, Decoded::Instruction(Instruction::IStore(256)));
        assert_eq!(decoded[3].1, Decoded::Instruction(Instruction::IInc(2, -1)));
        assert_eq!(decoded[4].1, Decoded::Branch(BranchInstruction::Return));
    }

    #[test]
    fn branch_targets_are_absolute() {
        let code = [
            0x03, // iconst_0
            0x99, 0x00, 0x07, // ifeq +7
            0x04, // iconst_1
            0xa7, 0xff, 0xfb, // goto -5
            0xb1, // return
        ];
        let decoded = decode_bytecode(&code).unwrap();
        assert_eq!(
            decoded[1].1,
            Decoded::Branch(BranchInstruction::If(OrdComparison::EQ, Offset(8)))
        );
        assert_eq!(
            decoded[3].1,
            Decoded::Branch(BranchInstruction::Goto(Offset(0)))
        );
    }

    #[test]
    fn switch_padding() {
        let code = [
            0x03, // iconst_0
            0xaa, 0x00, 0x00, // tableswitch + 2 bytes of padding
            0x00, 0x00, 0x00, 0x13, // default: +19
            0x00, 0x00, 0x00, 0x00, // low: 0
            0x00, 0x00, 0x00, 0x00, // high: 0
            0x00, 0x00, 0x00, 0x13, // 0: +19
            0xb1, // return
        ];
        let decoded = decode_bytecode(&code).unwrap();
        let switch = match &decoded[1].1 {
            Decoded::Branch(branch) => branch.clone(),
            other => panic!("Expected switch, got {:?}", other),
        };
        assert_eq!(
            switch,
            BranchInstruction::TableSwitch {
                padding: 2,
                default: Offset(20),
                low: 0,
                targets: vec![Offset(20)],
            }
        );
        assert_eq!(switch.width(), 19);
        assert_eq!(decoded[2].0, Offset(20));
    }

    #[test]
    fn malformed_code() {
        assert!(matches!(
            decode_bytecode(&[0xcb]),
            Err(Error::UnknownOpcode { opcode: 0xcb, .. })
        ));
        assert!(matches!(
            decode_bytecode(&[0x11, 0x00]),
            Err(Error::TruncatedInstruction(Offset(0)))
        ));
        assert!(matches!(
            decode_bytecode(&[0xa7, 0x00, 0x10]),
            Err(Error::InvalidCodeOffset { target: 16, .. })
        ));
        assert!(matches!(
            decode_bytecode(&[0xc4, 0x2a]),
            Err(Error::UnknownOpcode { opcode: 0x2a, .. })
        ));
    }

    #[test]
    fn instructions_reencode_identically() {
        let code = [
            0x12, 0x07, // ldc #7
            0xb9, 0x00, 0x09, 0x02, 0x00, // invokeinterface #9 2
            0xbc, 0x0a, // newarray int
            0xc5, 0x00, 0x03, 0x02, // multianewarray #3 2
            0xc2, // monitorenter
        ];
        let mut reencoded = vec![];
        for (_, decoded) in decode_bytecode(&code).unwrap() {
            match decoded {
                Decoded::Instruction(insn) => insn.serialize(&mut reencoded).unwrap(),
                Decoded::Branch(_) => panic!("No branches expected"),
            }
        }
        assert_eq!(reencoded, code);
    }
}
