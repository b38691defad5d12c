//! Structural checks over a produced class file

pub mod constant_pool;

use crate::classfile::constpool::Constant;
use crate::classfile::ClassFile;
use crate::code::Instruction;
use crate::error::{Error, Result};

/// Verify the constant pool and every instruction's constant reference
pub fn verify(class_file: &ClassFile) -> Result<()> {
    constant_pool::verify(class_file).map_err(|e| Error::verify(e.to_string()))?;
    verify_class_index(class_file, class_file.this_class)?;
    if class_file.super_class != 0 {
        verify_class_index(class_file, class_file.super_class)?;
    }
    for method in &class_file.methods {
        let Some(code) = method.code() else { continue };
        for (position, insn) in code.instructions.iter().enumerate() {
            let (index, ok) = match insn {
                Instruction::FieldRead(f) | Instruction::FieldWrite(f) => {
                    (f.index, matches!(class_file.constant_pool.get(f.index), Ok(Constant::FieldRef(..))))
                }
                Instruction::IndirectCall { index, .. } => {
                    (*index, matches!(class_file.constant_pool.get(*index), Ok(Constant::InvokeDynamic(..))))
                }
                _ => continue,
            };
            if !ok {
                let name = method.name(&class_file.constant_pool).unwrap_or_default();
                return Err(Error::verify(format!(
                    "instruction {} of {} refers to constant {} of the wrong kind",
                    position, name, index
                )));
            }
        }
    }
    Ok(())
}

fn verify_class_index(class_file: &ClassFile, index: u16) -> Result<()> {
    match class_file.constant_pool.get(index) {
        Ok(Constant::Class(_)) => Ok(()),
        _ => Err(Error::verify(format!("class index {} is not a Class constant", index))),
    }
}
