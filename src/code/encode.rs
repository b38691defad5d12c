//! `Code` attribute encoding

use super::annotations::write_type_annotations;
use super::frames::write_stack_map_table;
use super::insn::{switch_padding, Instruction};
use super::{CodeAttrInfo, CodeAttribute, Label, LocalVariable};
use crate::classfile::defs::MAX_CODE_LENGTH;
use crate::classfile::opcodes;
use crate::error::{Error, Result};

/// Byte offset of every instruction, with the code length appended
pub(crate) fn layout(instructions: &[Instruction]) -> Result<Vec<u32>> {
    let mut offsets = Vec::with_capacity(instructions.len() + 1);
    let mut pc = 0usize;
    for insn in instructions {
        offsets.push(pc as u32);
        pc += insn.encoded_len(pc);
        if pc > MAX_CODE_LENGTH {
            return Err(Error::CodeTooLarge { length: pc });
        }
    }
    offsets.push(pc as u32);
    Ok(offsets)
}

struct Layout {
    offsets: Vec<u32>,
}

impl Layout {
    fn pc(&self, label: Label) -> Result<u32> {
        self.offsets
            .get(label.index())
            .copied()
            .ok_or_else(|| Error::malformed(format!("label {} is past the end of code", label)))
    }

    fn relative(&self, from: usize, label: Label) -> Result<i64> {
        Ok(self.pc(label)? as i64 - self.offsets[from] as i64)
    }
}

pub(crate) fn encode_code(code: &CodeAttribute) -> Result<Vec<u8>> {
    let layout = Layout { offsets: layout(&code.instructions)? };
    let code_length = layout.offsets[code.instructions.len()];

    let mut bytes = Vec::with_capacity(code_length as usize + 32);
    bytes.extend_from_slice(&code.max_stack.to_be_bytes());
    bytes.extend_from_slice(&code.max_locals.to_be_bytes());
    bytes.extend_from_slice(&code_length.to_be_bytes());
    let code_start = bytes.len();
    for (index, insn) in code.instructions.iter().enumerate() {
        write_instruction(&mut bytes, index, insn, &layout)?;
        debug_assert_eq!((bytes.len() - code_start) as u32, layout.offsets[index + 1]);
    }

    bytes.extend_from_slice(&(code.exception_table.len() as u16).to_be_bytes());
    for handler in &code.exception_table {
        bytes.extend_from_slice(&(layout.pc(handler.start)? as u16).to_be_bytes());
        bytes.extend_from_slice(&(layout.pc(handler.end)? as u16).to_be_bytes());
        bytes.extend_from_slice(&(layout.pc(handler.handler)? as u16).to_be_bytes());
        bytes.extend_from_slice(&handler.catch_type.to_be_bytes());
    }

    bytes.extend_from_slice(&(code.attributes.len() as u16).to_be_bytes());
    for attribute in &code.attributes {
        let payload = match &attribute.info {
            CodeAttrInfo::LineNumberTable(lines) => {
                let mut payload = (lines.len() as u16).to_be_bytes().to_vec();
                for line in lines {
                    payload.extend_from_slice(&(layout.pc(line.start)? as u16).to_be_bytes());
                    payload.extend_from_slice(&line.line.to_be_bytes());
                }
                payload
            }
            CodeAttrInfo::LocalVariableTable(variables) | CodeAttrInfo::LocalVariableTypeTable(variables) => {
                local_variables_to_bytes(variables, &layout)?
            }
            CodeAttrInfo::StackMapTable(frames) => write_stack_map_table(frames, |label| layout.pc(label))?,
            CodeAttrInfo::TypeAnnotations(annotations) => write_type_annotations(annotations, |label| layout.pc(label))?,
            CodeAttrInfo::Other(payload) => payload.clone(),
        };
        bytes.extend_from_slice(&attribute.name_index.to_be_bytes());
        bytes.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&payload);
    }
    Ok(bytes)
}

fn write_instruction(bytes: &mut Vec<u8>, index: usize, insn: &Instruction, layout: &Layout) -> Result<()> {
    bytes.push(insn.opcode());
    match insn {
        Instruction::FieldRead(field) | Instruction::FieldWrite(field) => {
            bytes.extend_from_slice(&field.index.to_be_bytes());
        }
        Instruction::IndirectCall { index: cp_index, .. } => {
            bytes.extend_from_slice(&cp_index.to_be_bytes());
            bytes.extend_from_slice(&[0, 0]);
        }
        Instruction::Branch { opcode, target } => {
            let offset = layout.relative(index, *target)?;
            if opcodes::is_wide_branch(*opcode) {
                bytes.extend_from_slice(&(offset as i32).to_be_bytes());
            } else {
                let short = i16::try_from(offset).map_err(|_| Error::BranchOutOfRange { index, offset })?;
                bytes.extend_from_slice(&short.to_be_bytes());
            }
        }
        Instruction::TableSwitch { default, low, high, targets } => {
            if *high as i64 - *low as i64 + 1 != targets.len() as i64 {
                return Err(Error::malformed(format!(
                    "tableswitch range {}..{} does not match {} targets",
                    low,
                    high,
                    targets.len()
                )));
            }
            pad_switch(bytes, layout.offsets[index]);
            bytes.extend_from_slice(&(layout.relative(index, *default)? as i32).to_be_bytes());
            bytes.extend_from_slice(&low.to_be_bytes());
            bytes.extend_from_slice(&high.to_be_bytes());
            for target in targets {
                bytes.extend_from_slice(&(layout.relative(index, *target)? as i32).to_be_bytes());
            }
        }
        Instruction::LookupSwitch { default, pairs } => {
            pad_switch(bytes, layout.offsets[index]);
            bytes.extend_from_slice(&(layout.relative(index, *default)? as i32).to_be_bytes());
            bytes.extend_from_slice(&(pairs.len() as i32).to_be_bytes());
            for (key, target) in pairs {
                bytes.extend_from_slice(&key.to_be_bytes());
                bytes.extend_from_slice(&(layout.relative(index, *target)? as i32).to_be_bytes());
            }
        }
        Instruction::Other { operands, .. } => bytes.extend_from_slice(operands),
    }
    Ok(())
}

fn pad_switch(bytes: &mut Vec<u8>, pc: u32) {
    bytes.extend(std::iter::repeat(0).take(switch_padding(pc as usize)));
}

fn local_variables_to_bytes(variables: &[LocalVariable], layout: &Layout) -> Result<Vec<u8>> {
    let mut payload = (variables.len() as u16).to_be_bytes().to_vec();
    for variable in variables {
        let start = layout.pc(variable.start)?;
        let end = layout.pc(variable.end)?;
        let length = end
            .checked_sub(start)
            .ok_or_else(|| Error::malformed("local variable range ends before it starts"))?;
        payload.extend_from_slice(&(start as u16).to_be_bytes());
        payload.extend_from_slice(&(length as u16).to_be_bytes());
        payload.extend_from_slice(&variable.name_index.to_be_bytes());
        payload.extend_from_slice(&variable.descriptor_index.to_be_bytes());
        payload.extend_from_slice(&variable.index.to_be_bytes());
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::descriptor::FieldType;
    use crate::classfile::opcodes::*;
    use crate::code::insn::FieldInsn;

    fn field_read() -> Instruction {
        Instruction::FieldRead(FieldInsn {
            index: 7,
            owner: "p/X".into(),
            name: "f".into(),
            value_type: FieldType::Int,
            is_static: false,
        })
    }

    fn code_bytes(code: &CodeAttribute) -> Vec<u8> {
        let bytes = encode_code(code).unwrap();
        let length = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        bytes[8..8 + length].to_vec()
    }

    #[test]
    fn test_offsets_follow_instruction_sizes() {
        let code = CodeAttribute::new(
            1,
            1,
            vec![
                Instruction::Other { opcode: ALOAD_0, operands: vec![] },
                field_read(),
                Instruction::Other { opcode: IRETURN, operands: vec![] },
            ],
        );
        assert_eq!(code.offsets().unwrap(), vec![0, 1, 4, 5]);
        assert_eq!(code_bytes(&code), vec![ALOAD_0, GETFIELD, 0, 7, IRETURN]);
    }

    #[test]
    fn test_switch_padding_moves_with_layout() {
        let switch = Instruction::LookupSwitch { default: Label(2), pairs: vec![(5, Label(2))] };
        let ret = Instruction::Other { opcode: RETURN, operands: vec![] };
        let load = Instruction::Other { opcode: ILOAD_0, operands: vec![] };

        let at_one = CodeAttribute::new(1, 1, vec![load.clone(), switch.clone(), ret.clone()]);
        let bytes = code_bytes(&at_one);
        // opcode at 1, two pad bytes, default at 4
        assert_eq!(&bytes[..4], &[ILOAD_0, LOOKUPSWITCH, 0, 0]);
        assert_eq!(&bytes[4..8], &19i32.to_be_bytes());

        let at_zero = CodeAttribute::new(1, 1, vec![switch, ret]);
        let bytes = code_bytes(&at_zero);
        assert_eq!(&bytes[..4], &[LOOKUPSWITCH, 0, 0, 0]);
        assert_eq!(&bytes[4..8], &20i32.to_be_bytes());
    }

    #[test]
    fn test_branch_overflow_is_reported() {
        let mut instructions = vec![Instruction::Branch { opcode: GOTO, target: Label(0) }];
        instructions.extend((0..11_000).map(|_| field_read()));
        instructions.push(Instruction::Branch { opcode: GOTO, target: Label(0) });
        let code = CodeAttribute::new(1, 1, instructions);
        assert!(matches!(
            encode_code(&code),
            Err(Error::BranchOutOfRange { index: 11_001, offset: -33_003 })
        ));
    }

    #[test]
    fn test_code_too_large() {
        let code = CodeAttribute::new(1, 1, (0..22_000).map(|_| field_read()).collect());
        assert!(matches!(encode_code(&code), Err(Error::CodeTooLarge { .. })));
    }
}
