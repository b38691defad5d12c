//! Field-access classification

use crate::classfile::descriptor::FieldType;
use crate::code::Instruction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Read,
    Write,
}

/// What a field instruction touches
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldAccessInfo {
    pub kind: AccessKind,
    /// Dotted owner name (`java.lang.String`)
    pub owner_type_name: String,
    pub field_name: String,
    /// Declared type, taken from the instruction's field reference
    pub value_type: FieldType,
    pub is_static: bool,
}

impl FieldAccessInfo {
    /// Owner as an internal (slash-separated) name
    pub fn owner_internal_name(&self) -> String {
        self.owner_type_name.replace('.', "/")
    }
}

/// Classify one instruction; `None` for anything that is not a field read or write
pub fn classify(insn: &Instruction) -> Option<FieldAccessInfo> {
    let (kind, field) = match insn {
        Instruction::FieldRead(field) => (AccessKind::Read, field),
        Instruction::FieldWrite(field) => (AccessKind::Write, field),
        _ => return None,
    };
    Some(FieldAccessInfo {
        kind,
        owner_type_name: field.owner.replace('/', "."),
        field_name: field.name.clone(),
        value_type: field.value_type.clone(),
        is_static: field.is_static,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{FieldInsn, Label};

    #[test]
    fn test_field_instructions_are_classified() {
        let insn = Instruction::FieldWrite(FieldInsn {
            index: 4,
            owner: "com/acme/Counter".into(),
            name: "count".into(),
            value_type: FieldType::Long,
            is_static: true,
        });
        let info = classify(&insn).unwrap();
        assert_eq!(info.kind, AccessKind::Write);
        assert_eq!(info.owner_type_name, "com.acme.Counter");
        assert_eq!(info.owner_internal_name(), "com/acme/Counter");
        assert_eq!(info.field_name, "count");
        assert_eq!(info.value_type, FieldType::Long);
        assert!(info.is_static);
    }

    #[test]
    fn test_other_instructions_pass() {
        assert_eq!(classify(&Instruction::Other { opcode: 0x00, operands: vec![] }), None);
        assert_eq!(classify(&Instruction::Branch { opcode: 0xa7, target: Label(0) }), None);
    }
}
