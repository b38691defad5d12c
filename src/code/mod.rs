//! Method bodies as indexed instruction records.
//!
//! Every bytecode offset held by a `Code` attribute (branch targets, switch
//! tables, exception ranges, line numbers, local variable ranges, stack map
//! frames and type annotation targets) is turned into a [`Label`] on decode, so instructions can change
//! size without any offset bookkeeping. Encoding lays the code out again.

pub mod annotations;
mod decode;
mod encode;
pub mod frames;
pub mod insn;

use std::fmt;

pub use annotations::{LocalRange, TypeAnnotation, TypeTarget};
pub use decode::{decode_code, DecodeContext};
pub use frames::{FrameKind, StackMapFrame, VerificationType};
pub use insn::{BootstrapKind, FieldInsn, IndirectCall, Instruction};

use crate::classfile::opcodes::{JSR, JSR_W, RET, WIDE};
use crate::error::Result;

/// Index of an instruction within its method; the instruction count marks the end of code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(pub u32);

impl Label {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHandler {
    pub start: Label,
    pub end: Label,
    pub handler: Label,
    /// `CONSTANT_Class` index, 0 for a catch-all
    pub catch_type: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineNumber {
    pub start: Label,
    pub line: u16,
}

/// Entry of a `LocalVariableTable` or `LocalVariableTypeTable`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable {
    pub start: Label,
    pub end: Label,
    pub name_index: u16,
    /// Descriptor index, or signature index in a type table
    pub descriptor_index: u16,
    pub index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeAttrInfo {
    LineNumberTable(Vec<LineNumber>),
    LocalVariableTable(Vec<LocalVariable>),
    LocalVariableTypeTable(Vec<LocalVariable>),
    StackMapTable(Vec<StackMapFrame>),
    /// `RuntimeVisibleTypeAnnotations` or `RuntimeInvisibleTypeAnnotations`
    TypeAnnotations(Vec<TypeAnnotation>),
    Other(Vec<u8>),
}

/// Attribute nested in a `Code` attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttr {
    pub name_index: u16,
    pub info: CodeAttrInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub instructions: Vec<Instruction>,
    pub exception_table: Vec<ExceptionHandler>,
    pub attributes: Vec<CodeAttr>,
}

impl CodeAttribute {
    pub fn new(max_stack: u16, max_locals: u16, instructions: Vec<Instruction>) -> Self {
        Self { max_stack, max_locals, instructions, exception_table: Vec::new(), attributes: Vec::new() }
    }

    /// Payload of the `Code` attribute with all offsets recomputed
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode::encode_code(self)
    }

    /// Byte offset of every instruction, plus the code length as the last entry
    pub fn offsets(&self) -> Result<Vec<u32>> {
        encode::layout(&self.instructions)
    }

    /// Whether a verifier needs stack map frames for this body: any jump,
    /// switch or exception handler
    pub fn has_control_flow(&self) -> bool {
        !self.exception_table.is_empty()
            || self.instructions.iter().any(|insn| {
                matches!(
                    insn,
                    Instruction::Branch { .. } | Instruction::TableSwitch { .. } | Instruction::LookupSwitch { .. }
                )
            })
    }

    pub fn has_stack_map(&self) -> bool {
        self.attributes.iter().any(|attr| matches!(attr.info, CodeAttrInfo::StackMapTable(_)))
    }

    /// `jsr`, `jsr_w` or `ret`, all rejected in version 51 classes
    pub fn uses_subroutines(&self) -> bool {
        self.instructions.iter().any(|insn| match insn {
            Instruction::Branch { opcode, .. } => matches!(*opcode, JSR | JSR_W),
            Instruction::Other { opcode: RET, .. } => true,
            Instruction::Other { opcode: WIDE, operands } => operands.first() == Some(&RET),
            _ => false,
        })
    }

    pub fn field_access_count(&self) -> usize {
        self.instructions.iter().filter(|i| i.is_field_access()).count()
    }

    pub fn indirect_call_count(&self) -> usize {
        self.instructions.iter().filter(|i| i.is_indirect_call()).count()
    }
}
