//! Core classfile structure and decoding

use super::attribute::{parse_bootstrap_methods, AttributeInfo, BootstrapMethod, NamedAttribute};
use super::constpool::ConstantPool;
use super::defs::{attribute_names, major_versions, MAGIC};
use super::field::FieldInfo;
use super::method::MethodInfo;
use super::reader::ByteReader;
use super::writer::ClassfileWritable;
use crate::code::{decode_code, DecodeContext};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFile {
    pub magic: u32,
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Vec<NamedAttribute>,
}

impl Default for ClassFile {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassFile {
    pub fn new() -> Self {
        Self {
            magic: MAGIC,
            minor_version: 0,
            major_version: major_versions::JAVA_8,
            constant_pool: ConstantPool::new(),
            access_flags: 0,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Decode a class file.
    ///
    /// Method bodies are decoded after the `BootstrapMethods` attribute so that
    /// `invokedynamic` instructions can be recognized as accessor call sites.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        let magic = reader.u4()?;
        if magic != MAGIC {
            return Err(Error::malformed(format!("bad magic 0x{:08X}", magic)));
        }
        let minor_version = reader.u2()?;
        let major_version = reader.u2()?;
        let constant_pool = ConstantPool::read(&mut reader)?;
        let access_flags = reader.u2()?;
        let this_class = reader.u2()?;
        let super_class = reader.u2()?;
        let interface_count = reader.u2()?;
        let interfaces = (0..interface_count)
            .map(|_| reader.u2())
            .collect::<Result<Vec<_>>>()?;

        let field_count = reader.u2()?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let mut field = FieldInfo::new(reader.u2()?, reader.u2()?, reader.u2()?);
            field.attributes = NamedAttribute::read_list(&mut reader)?
                .into_iter()
                .map(|(name_index, payload)| NamedAttribute::new(name_index, AttributeInfo::Other(payload)))
                .collect();
            fields.push(field);
        }

        let method_count = reader.u2()?;
        let mut raw_methods = Vec::with_capacity(method_count as usize);
        for _ in 0..method_count {
            let method = MethodInfo::new(reader.u2()?, reader.u2()?, reader.u2()?);
            raw_methods.push((method, NamedAttribute::read_list(&mut reader)?));
        }

        let raw_attributes = NamedAttribute::read_list(&mut reader)?;
        reader.expect_end("class file")?;

        let mut attributes = Vec::with_capacity(raw_attributes.len());
        let mut bootstrap_methods: Vec<BootstrapMethod> = Vec::new();
        for (name_index, payload) in raw_attributes {
            let info = if constant_pool.utf8(name_index)? == attribute_names::BOOTSTRAP_METHODS {
                let parsed = parse_bootstrap_methods(&payload)?;
                bootstrap_methods.extend(parsed.iter().cloned());
                AttributeInfo::BootstrapMethods(parsed)
            } else {
                AttributeInfo::Other(payload)
            };
            attributes.push(NamedAttribute::new(name_index, info));
        }

        let context = DecodeContext::new(&constant_pool, &bootstrap_methods);
        let mut methods = Vec::with_capacity(raw_methods.len());
        for (mut method, raw) in raw_methods {
            for (name_index, payload) in raw {
                let info = if constant_pool.utf8(name_index)? == attribute_names::CODE {
                    let name = method.name(&constant_pool)?;
                    let code = decode_code(&payload, &context)
                        .map_err(|e| Error::malformed(format!("method {}: {}", name, e)))?;
                    AttributeInfo::Code(code)
                } else {
                    AttributeInfo::Other(payload)
                };
                method.attributes.push(NamedAttribute::new(name_index, info));
            }
            methods.push(method);
        }

        Ok(Self {
            magic,
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        self.to_classfile_bytes()
    }

    /// Internal name of this class
    pub fn name(&self) -> Result<String> {
        self.constant_pool.class_name(self.this_class)
    }

    /// Internal name of the superclass, `None` for `java/lang/Object`
    pub fn super_name(&self) -> Result<Option<String>> {
        if self.super_class == 0 {
            return Ok(None);
        }
        self.constant_pool.class_name(self.super_class).map(Some)
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| {
            m.name(&self.constant_pool).map_or(false, |n| n == name)
                && self.constant_pool.utf8(m.descriptor_index).map_or(false, |d| d == descriptor)
        })
    }

    /// Entries of the `BootstrapMethods` attribute, empty when absent
    pub fn bootstrap_methods(&self) -> &[BootstrapMethod] {
        self.attributes
            .iter()
            .find_map(|a| match &a.info {
                AttributeInfo::BootstrapMethods(methods) => Some(methods.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Append a bootstrap method, creating the attribute on first use.
    /// Identical entries are shared. Returns the entry's index.
    pub fn add_bootstrap_method(&mut self, method: BootstrapMethod) -> Result<u16> {
        let position = self
            .attributes
            .iter()
            .position(|a| matches!(a.info, AttributeInfo::BootstrapMethods(_)));
        let position = match position {
            Some(position) => position,
            None => {
                let name_index = self.constant_pool.add_utf8(attribute_names::BOOTSTRAP_METHODS)?;
                self.attributes.push(NamedAttribute::new(
                    name_index,
                    AttributeInfo::BootstrapMethods(Vec::new()),
                ));
                self.attributes.len() - 1
            }
        };
        let methods = match &mut self.attributes[position].info {
            AttributeInfo::BootstrapMethods(methods) => methods,
            _ => return Err(Error::malformed("BootstrapMethods attribute vanished")),
        };
        if let Some(index) = methods.iter().position(|m| *m == method) {
            return Ok(index as u16);
        }
        if methods.len() >= u16::MAX as usize {
            return Err(Error::malformed("too many bootstrap methods"));
        }
        methods.push(method);
        Ok((methods.len() - 1) as u16)
    }
}
