//! Trait-based serialization for classfile structures

use std::io::Write;

use super::attribute::NamedAttribute;
use super::class::ClassFile;
use super::constpool::ConstantPool;
use super::field::FieldInfo;
use super::method::MethodInfo;
use crate::error::Result;

/// An object which can be written into a classfile
pub trait ClassfileWritable {
    /// Writes the bytes of this object into the given buffer
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> Result<()>;

    /// Writes the bytes of this object into a newly created buffer
    fn to_classfile_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write_to_classfile(&mut buffer)?;
        Ok(buffer)
    }
}

impl ClassfileWritable for ClassFile {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> Result<()> {
        buffer.write_all(&self.magic.to_be_bytes())?;
        buffer.write_all(&self.minor_version.to_be_bytes())?;
        buffer.write_all(&self.major_version.to_be_bytes())?;
        self.constant_pool.write_to_classfile(buffer)?;
        buffer.write_all(&self.access_flags.to_be_bytes())?;
        buffer.write_all(&self.this_class.to_be_bytes())?;
        buffer.write_all(&self.super_class.to_be_bytes())?;

        buffer.write_all(&(self.interfaces.len() as u16).to_be_bytes())?;
        for interface in &self.interfaces {
            buffer.write_all(&interface.to_be_bytes())?;
        }

        buffer.write_all(&(self.fields.len() as u16).to_be_bytes())?;
        for field in &self.fields {
            field.write_to_classfile(buffer)?;
        }

        buffer.write_all(&(self.methods.len() as u16).to_be_bytes())?;
        for method in &self.methods {
            method.write_to_classfile(buffer)?;
        }

        write_attributes(buffer, &self.attributes)
    }
}

impl ClassfileWritable for ConstantPool {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> Result<()> {
        buffer.write_all(&self.to_bytes())?;
        Ok(())
    }
}

impl ClassfileWritable for FieldInfo {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> Result<()> {
        buffer.write_all(&self.access_flags.to_be_bytes())?;
        buffer.write_all(&self.name_index.to_be_bytes())?;
        buffer.write_all(&self.descriptor_index.to_be_bytes())?;
        write_attributes(buffer, &self.attributes)
    }
}

impl ClassfileWritable for MethodInfo {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> Result<()> {
        buffer.write_all(&self.access_flags.to_be_bytes())?;
        buffer.write_all(&self.name_index.to_be_bytes())?;
        buffer.write_all(&self.descriptor_index.to_be_bytes())?;
        write_attributes(buffer, &self.attributes)
    }
}

impl ClassfileWritable for NamedAttribute {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> Result<()> {
        buffer.write_all(&self.to_bytes()?)?;
        Ok(())
    }
}

fn write_attributes<W: Write>(buffer: &mut W, attributes: &[NamedAttribute]) -> Result<()> {
    buffer.write_all(&(attributes.len() as u16).to_be_bytes())?;
    for attribute in attributes {
        attribute.write_to_classfile(buffer)?;
    }
    Ok(())
}

