//! MethodInfo structure

use super::attribute::{AttributeInfo, NamedAttribute};
use super::constpool::ConstantPool;
use super::defs::access_flags::ACC_STATIC;
use super::descriptor::MethodDescriptor;
use crate::code::CodeAttribute;
use crate::error::Result;

/// A method: name, signature and (through its `Code` attribute) its instructions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<NamedAttribute>,
}

impl MethodInfo {
    pub fn new(access_flags: u16, name_index: u16, descriptor_index: u16) -> Self {
        Self { access_flags, name_index, descriptor_index, attributes: Vec::new() }
    }

    pub fn is_static(&self) -> bool {
        self.access_flags & ACC_STATIC != 0
    }

    pub fn name(&self, constant_pool: &ConstantPool) -> Result<String> {
        constant_pool.utf8(self.name_index)
    }

    pub fn descriptor(&self, constant_pool: &ConstantPool) -> Result<MethodDescriptor> {
        MethodDescriptor::parse(&constant_pool.utf8(self.descriptor_index)?)
    }

    pub fn code(&self) -> Option<&CodeAttribute> {
        self.attributes.iter().find_map(|a| match &a.info {
            AttributeInfo::Code(code) => Some(code),
            _ => None,
        })
    }

    pub fn code_mut(&mut self) -> Option<&mut CodeAttribute> {
        self.attributes.iter_mut().find_map(|a| match &mut a.info {
            AttributeInfo::Code(code) => Some(code),
            _ => None,
        })
    }
}
