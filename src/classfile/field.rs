//! FieldInfo structure

use super::attribute::NamedAttribute;
use super::constpool::ConstantPool;
use super::defs::access_flags::ACC_STATIC;
use super::descriptor::FieldType;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<NamedAttribute>,
}

impl FieldInfo {
    pub fn new(access_flags: u16, name_index: u16, descriptor_index: u16) -> Self {
        Self { access_flags, name_index, descriptor_index, attributes: Vec::new() }
    }

    pub fn is_static(&self) -> bool {
        self.access_flags & ACC_STATIC != 0
    }

    pub fn name(&self, constant_pool: &ConstantPool) -> Result<String> {
        constant_pool.utf8(self.name_index)
    }

    pub fn field_type(&self, constant_pool: &ConstantPool) -> Result<FieldType> {
        FieldType::parse(&constant_pool.utf8(self.descriptor_index)?)
    }
}
