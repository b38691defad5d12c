//! Instruction records

use std::fmt;

use super::Label;
use crate::classfile::descriptor::{FieldType, MethodDescriptor};
use crate::classfile::opcodes::{self, GETFIELD, GETSTATIC, INVOKEDYNAMIC, PUTFIELD, PUTSTATIC};

/// A direct field instruction as declared in the code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInsn {
    /// `CONSTANT_Fieldref` index of the instruction
    pub index: u16,
    /// Internal (slash-separated) owner name
    pub owner: String,
    pub name: String,
    pub value_type: FieldType,
    pub is_static: bool,
}

/// Which accessor bootstrap an indirect call links through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootstrapKind {
    Getter,
    Setter,
}

impl BootstrapKind {
    pub fn entry_point(self) -> &'static str {
        match self {
            BootstrapKind::Getter => crate::consts::GETTER_BOOTSTRAP_NAME,
            BootstrapKind::Setter => crate::consts::SETTER_BOOTSTRAP_NAME,
        }
    }
}

impl fmt::Display for BootstrapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapKind::Getter => f.write_str("getter"),
            BootstrapKind::Setter => f.write_str("setter"),
        }
    }
}

/// An accessor call site: `invokedynamic` through one of the two field bootstraps
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndirectCall {
    pub callee_name: String,
    pub signature: MethodDescriptor,
    /// Dotted owner name, passed as the first bound argument
    pub owner_type_name: String,
    /// Field name, passed as the second bound argument
    pub field_name: String,
    pub kind: BootstrapKind,
    /// Internal name of the class declaring the bootstrap methods
    pub bootstrap_owner: String,
}

impl IndirectCall {
    /// Bound arguments in the order the bootstrap receives them
    pub fn bound_args(&self) -> [&str; 2] {
        [&self.owner_type_name, &self.field_name]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `getfield` / `getstatic`
    FieldRead(FieldInsn),
    /// `putfield` / `putstatic`
    FieldWrite(FieldInsn),
    /// `invokedynamic`; `index` is its `CONSTANT_InvokeDynamic` entry
    IndirectCall { call: IndirectCall, index: u16 },
    /// Conditional and unconditional jumps, including `jsr` and the `_w` forms
    Branch { opcode: u8, target: Label },
    TableSwitch { default: Label, low: i32, high: i32, targets: Vec<Label> },
    LookupSwitch { default: Label, pairs: Vec<(i32, Label)> },
    /// Everything else, operands kept as raw bytes
    Other { opcode: u8, operands: Vec<u8> },
}

impl Instruction {
    pub fn opcode(&self) -> u8 {
        match self {
            Instruction::FieldRead(f) if f.is_static => GETSTATIC,
            Instruction::FieldRead(_) => GETFIELD,
            Instruction::FieldWrite(f) if f.is_static => PUTSTATIC,
            Instruction::FieldWrite(_) => PUTFIELD,
            Instruction::IndirectCall { .. } => INVOKEDYNAMIC,
            Instruction::Branch { opcode, .. } => *opcode,
            Instruction::TableSwitch { .. } => opcodes::TABLESWITCH,
            Instruction::LookupSwitch { .. } => opcodes::LOOKUPSWITCH,
            Instruction::Other { opcode, .. } => *opcode,
        }
    }

    pub fn is_field_access(&self) -> bool {
        matches!(self, Instruction::FieldRead(_) | Instruction::FieldWrite(_))
    }

    pub fn is_indirect_call(&self) -> bool {
        matches!(self, Instruction::IndirectCall { .. })
    }

    /// Encoded size when the instruction starts at `pc`
    pub fn encoded_len(&self, pc: usize) -> usize {
        match self {
            Instruction::FieldRead(_) | Instruction::FieldWrite(_) => 3,
            Instruction::IndirectCall { .. } => 5,
            Instruction::Branch { opcode, .. } => {
                if opcodes::is_wide_branch(*opcode) {
                    5
                } else {
                    3
                }
            }
            Instruction::TableSwitch { targets, .. } => 1 + switch_padding(pc) + 12 + 4 * targets.len(),
            Instruction::LookupSwitch { pairs, .. } => 1 + switch_padding(pc) + 8 + 8 * pairs.len(),
            Instruction::Other { operands, .. } => 1 + operands.len(),
        }
    }
}

/// Zero bytes between a switch opcode at `pc` and its 4-byte aligned operands
pub fn switch_padding(pc: usize) -> usize {
    (4 - (pc + 1) % 4) % 4
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = opcodes::mnemonic(self.opcode()).unwrap_or("???");
        match self {
            Instruction::FieldRead(insn) | Instruction::FieldWrite(insn) => {
                write!(f, "{} {}.{}:{}", name, insn.owner, insn.name, insn.value_type)
            }
            Instruction::IndirectCall { call, index } => write!(
                f,
                "{} #{} {}{} [{} {}, {}]",
                name, index, call.callee_name, call.signature, call.kind, call.owner_type_name, call.field_name
            ),
            Instruction::Branch { target, .. } => write!(f, "{} {}", name, target),
            Instruction::TableSwitch { default, low, high, .. } => {
                write!(f, "{} {}..{} default {}", name, low, high, default)
            }
            Instruction::LookupSwitch { default, pairs } => {
                write!(f, "{} {} keys default {}", name, pairs.len(), default)
            }
            Instruction::Other { opcode: opcodes::WIDE, operands } => {
                let inner = operands.first().and_then(|op| opcodes::mnemonic(*op)).unwrap_or("???");
                write!(f, "wide {}", inner)
            }
            Instruction::Other { operands, .. } if operands.is_empty() => f.write_str(name),
            Instruction::Other { operands, .. } => write!(f, "{} {:?}", name, operands),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_padding() {
        assert_eq!(switch_padding(0), 3);
        assert_eq!(switch_padding(1), 2);
        assert_eq!(switch_padding(2), 1);
        assert_eq!(switch_padding(3), 0);
        assert_eq!(switch_padding(7), 0);
    }

    #[test]
    fn test_opcode_follows_static_flag() {
        let insn = FieldInsn {
            index: 1,
            owner: "p/X".into(),
            name: "f".into(),
            value_type: FieldType::Int,
            is_static: true,
        };
        assert_eq!(Instruction::FieldRead(insn.clone()).opcode(), GETSTATIC);
        assert_eq!(Instruction::FieldWrite(FieldInsn { is_static: false, ..insn }).opcode(), PUTFIELD);
    }

    #[test]
    fn test_encoded_lengths() {
        let table = Instruction::TableSwitch {
            default: Label(0),
            low: 0,
            high: 1,
            targets: vec![Label(0), Label(0)],
        };
        assert_eq!(table.encoded_len(0), 1 + 3 + 12 + 8);
        assert_eq!(table.encoded_len(3), 1 + 12 + 8);
        let goto_w = Instruction::Branch { opcode: opcodes::GOTO_W, target: Label(0) };
        assert_eq!(goto_w.encoded_len(0), 5);
    }
}
