//! Constant pool cross-reference checks

use crate::classfile::constpool::Constant;
use crate::classfile::defs::reference_kind;
use crate::classfile::ClassFile;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConstantPoolVerifyError {
    #[error("Invalid constant pool index {0}")]
    InvalidConstantPoolIndex(u16),
    #[error("Constant {0} refers to an entry of the wrong kind")]
    InvalidConstantPoolIndexType(u16),
    #[error("Invalid method handle reference kind {kind} at {index}")]
    InvalidReferenceKind { index: u16, kind: u8 },
    #[error("BootstrapMethods attribute not defined")]
    BootstrapMethodsNotDefined,
    #[error("Invalid bootstrap method index {0}")]
    InvalidBootstrapMethodIndex(usize),
}

pub type Result<T> = std::result::Result<T, ConstantPoolVerifyError>;

/// Check that every constant points at entries of the kind it requires
pub fn verify(class_file: &ClassFile) -> Result<()> {
    let pool = &class_file.constant_pool.constants;
    let bootstrap_count = class_file.bootstrap_methods().len();
    let has_bootstrap = class_file
        .attributes
        .iter()
        .any(|a| matches!(a.info, crate::classfile::AttributeInfo::BootstrapMethods(_)));

    // `owner` is the index of the constant holding the reference
    let expect = |owner: u16, target: u16, accept: fn(&Constant) -> bool| -> Result<()> {
        match (target as usize).checked_sub(1).and_then(|i| pool.get(i)) {
            None | Some(Constant::Unusable) => Err(ConstantPoolVerifyError::InvalidConstantPoolIndex(owner)),
            Some(constant) if accept(constant) => Ok(()),
            Some(_) => Err(ConstantPoolVerifyError::InvalidConstantPoolIndexType(owner)),
        }
    };
    let utf8 = |c: &Constant| matches!(c, Constant::Utf8(_));
    let class = |c: &Constant| matches!(c, Constant::Class(_));
    let name_and_type = |c: &Constant| matches!(c, Constant::NameAndType(..));

    for (index, constant) in class_file.constant_pool.iter() {
        match constant {
            Constant::Class(name) | Constant::Module(name) | Constant::Package(name) => expect(index, *name, utf8)?,
            Constant::String(value) | Constant::MethodType(value) => expect(index, *value, utf8)?,
            Constant::FieldRef(owner, nat)
            | Constant::MethodRef(owner, nat)
            | Constant::InterfaceMethodRef(owner, nat) => {
                expect(index, *owner, class)?;
                expect(index, *nat, name_and_type)?;
            }
            Constant::NameAndType(name, descriptor) => {
                expect(index, *name, utf8)?;
                expect(index, *descriptor, utf8)?;
            }
            Constant::MethodHandle(kind, reference) => {
                let accept: fn(&Constant) -> bool = match *kind {
                    reference_kind::REF_GET_FIELD..=reference_kind::REF_PUT_STATIC => {
                        |c| matches!(c, Constant::FieldRef(..))
                    }
                    reference_kind::REF_INVOKE_VIRTUAL | reference_kind::REF_NEW_INVOKE_SPECIAL => {
                        |c| matches!(c, Constant::MethodRef(..))
                    }
                    reference_kind::REF_INVOKE_STATIC | reference_kind::REF_INVOKE_SPECIAL => {
                        |c| matches!(c, Constant::MethodRef(..) | Constant::InterfaceMethodRef(..))
                    }
                    reference_kind::REF_INVOKE_INTERFACE => |c| matches!(c, Constant::InterfaceMethodRef(..)),
                    kind => return Err(ConstantPoolVerifyError::InvalidReferenceKind { index, kind }),
                };
                expect(index, *reference, accept)?;
            }
            Constant::Dynamic(bootstrap, nat) | Constant::InvokeDynamic(bootstrap, nat) => {
                if !has_bootstrap {
                    return Err(ConstantPoolVerifyError::BootstrapMethodsNotDefined);
                }
                if *bootstrap as usize >= bootstrap_count {
                    return Err(ConstantPoolVerifyError::InvalidBootstrapMethodIndex(*bootstrap as usize));
                }
                expect(index, *nat, name_and_type)?;
            }
            _ => {}
        }
    }

    for (position, method) in class_file.bootstrap_methods().iter().enumerate() {
        let owner = position as u16;
        expect(owner, method.method_ref, |c| matches!(c, Constant::MethodHandle(..)))
            .map_err(|_| ConstantPoolVerifyError::InvalidBootstrapMethodIndex(position))?;
        for argument in &method.arguments {
            expect(owner, *argument, |c| {
                matches!(
                    c,
                    Constant::String(_)
                        | Constant::Class(_)
                        | Constant::Integer(_)
                        | Constant::Float(_)
                        | Constant::Long(_)
                        | Constant::Double(_)
                        | Constant::MethodHandle(..)
                        | Constant::MethodType(_)
                        | Constant::Dynamic(..)
                )
            })
            .map_err(|_| ConstantPoolVerifyError::InvalidBootstrapMethodIndex(position))?;
        }
    }
    Ok(())
}
