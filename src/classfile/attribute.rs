//! Class, field and method level attributes

use super::constpool::ConstantPool;
use super::reader::ByteReader;
use crate::code::CodeAttribute;
use crate::error::{Error, Result};

/// An attribute together with its `name_index`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedAttribute {
    pub name_index: u16,
    pub info: AttributeInfo,
}

/// Attribute payloads. Only `Code` and `BootstrapMethods` are decoded; everything
/// else is carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeInfo {
    Code(CodeAttribute),
    BootstrapMethods(Vec<BootstrapMethod>),
    Other(Vec<u8>),
}

/// One `BootstrapMethods` entry: a `MethodHandle` index and its static argument indices
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BootstrapMethod {
    pub method_ref: u16,
    pub arguments: Vec<u16>,
}

impl NamedAttribute {
    pub fn new(name_index: u16, info: AttributeInfo) -> Self {
        Self { name_index, info }
    }

    /// Read `name_index`, `length` and the raw payload
    pub(crate) fn read_raw(reader: &mut ByteReader<'_>) -> Result<(u16, Vec<u8>)> {
        let name_index = reader.u2()?;
        let length = reader.u4()? as usize;
        let payload = reader.take(length)?.to_vec();
        Ok((name_index, payload))
    }

    pub(crate) fn read_list(reader: &mut ByteReader<'_>) -> Result<Vec<(u16, Vec<u8>)>> {
        let count = reader.u2()?;
        (0..count).map(|_| Self::read_raw(reader)).collect()
    }

    pub fn name(&self, constant_pool: &ConstantPool) -> Result<String> {
        constant_pool.utf8(self.name_index)
    }

    /// Serialized payload, without the name and length header
    pub fn payload(&self) -> Result<Vec<u8>> {
        match &self.info {
            AttributeInfo::Code(code) => code.to_bytes(),
            AttributeInfo::BootstrapMethods(methods) => Ok(bootstrap_methods_to_bytes(methods)),
            AttributeInfo::Other(bytes) => Ok(bytes.clone()),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = self.payload()?;
        let mut bytes = Vec::with_capacity(payload.len() + 6);
        bytes.extend_from_slice(&self.name_index.to_be_bytes());
        bytes.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }
}

pub(crate) fn parse_bootstrap_methods(payload: &[u8]) -> Result<Vec<BootstrapMethod>> {
    let mut reader = ByteReader::new(payload);
    let count = reader.u2()?;
    let mut methods = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let method_ref = reader.u2()?;
        let arg_count = reader.u2()?;
        let arguments = (0..arg_count)
            .map(|_| reader.u2())
            .collect::<Result<Vec<_>>>()?;
        methods.push(BootstrapMethod { method_ref, arguments });
    }
    reader
        .expect_end("BootstrapMethods")
        .map_err(|e| Error::malformed(format!("BootstrapMethods attribute: {}", e)))?;
    Ok(methods)
}

fn bootstrap_methods_to_bytes(methods: &[BootstrapMethod]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(methods.len() as u16).to_be_bytes());
    for method in methods {
        bytes.extend_from_slice(&method.method_ref.to_be_bytes());
        bytes.extend_from_slice(&(method.arguments.len() as u16).to_be_bytes());
        for argument in &method.arguments {
            bytes.extend_from_slice(&argument.to_be_bytes());
        }
    }
    bytes
}
