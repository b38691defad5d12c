//! Constant pool and constants for Java class files

use super::reader::ByteReader;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// One constant pool slot.
///
/// UTF-8 payloads stay in their on-disk (modified UTF-8) form and floating point
/// values are kept as raw bits, so decoding and re-encoding is lossless.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Utf8(Vec<u8>),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
    NameAndType(u16, u16),
    MethodHandle(u8, u16),
    MethodType(u16),
    Dynamic(u16, u16),
    InvokeDynamic(u16, u16),
    Module(u16),
    Package(u16),
    /// Second slot occupied by a preceding `Long` or `Double`
    Unusable,
}

pub(crate) mod constant_tags {
    pub const CONSTANT_UTF8: u8 = 1;
    pub const CONSTANT_INTEGER: u8 = 3;
    pub const CONSTANT_FLOAT: u8 = 4;
    pub const CONSTANT_LONG: u8 = 5;
    pub const CONSTANT_DOUBLE: u8 = 6;
    pub const CONSTANT_CLASS: u8 = 7;
    pub const CONSTANT_STRING: u8 = 8;
    pub const CONSTANT_FIELDREF: u8 = 9;
    pub const CONSTANT_METHODREF: u8 = 10;
    pub const CONSTANT_INTERFACEMETHODREF: u8 = 11;
    pub const CONSTANT_NAMEANDTYPE: u8 = 12;
    pub const CONSTANT_METHODHANDLE: u8 = 15;
    pub const CONSTANT_METHODTYPE: u8 = 16;
    pub const CONSTANT_DYNAMIC: u8 = 17;
    pub const CONSTANT_INVOKEDYNAMIC: u8 = 18;
    pub const CONSTANT_MODULE: u8 = 19;
    pub const CONSTANT_PACKAGE: u8 = 20;
}

impl Constant {
    /// Number of pool slots this constant occupies
    pub fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Constant::Utf8(_) => "Utf8",
            Constant::Integer(_) => "Integer",
            Constant::Float(_) => "Float",
            Constant::Long(_) => "Long",
            Constant::Double(_) => "Double",
            Constant::Class(_) => "Class",
            Constant::String(_) => "String",
            Constant::FieldRef(..) => "Fieldref",
            Constant::MethodRef(..) => "Methodref",
            Constant::InterfaceMethodRef(..) => "InterfaceMethodref",
            Constant::NameAndType(..) => "NameAndType",
            Constant::MethodHandle(..) => "MethodHandle",
            Constant::MethodType(_) => "MethodType",
            Constant::Dynamic(..) => "Dynamic",
            Constant::InvokeDynamic(..) => "InvokeDynamic",
            Constant::Module(_) => "Module",
            Constant::Package(_) => "Package",
            Constant::Unusable => "unusable slot",
        }
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        use constant_tags::*;
        let offset = reader.position();
        let tag = reader.u1()?;
        let constant = match tag {
            CONSTANT_UTF8 => {
                let len = reader.u2()? as usize;
                Constant::Utf8(reader.take(len)?.to_vec())
            }
            CONSTANT_INTEGER => Constant::Integer(reader.i4()?),
            CONSTANT_FLOAT => Constant::Float(reader.u4()?),
            CONSTANT_LONG => Constant::Long(reader.u8()? as i64),
            CONSTANT_DOUBLE => Constant::Double(reader.u8()?),
            CONSTANT_CLASS => Constant::Class(reader.u2()?),
            CONSTANT_STRING => Constant::String(reader.u2()?),
            CONSTANT_FIELDREF => Constant::FieldRef(reader.u2()?, reader.u2()?),
            CONSTANT_METHODREF => Constant::MethodRef(reader.u2()?, reader.u2()?),
            CONSTANT_INTERFACEMETHODREF => Constant::InterfaceMethodRef(reader.u2()?, reader.u2()?),
            CONSTANT_NAMEANDTYPE => Constant::NameAndType(reader.u2()?, reader.u2()?),
            CONSTANT_METHODHANDLE => Constant::MethodHandle(reader.u1()?, reader.u2()?),
            CONSTANT_METHODTYPE => Constant::MethodType(reader.u2()?),
            CONSTANT_DYNAMIC => Constant::Dynamic(reader.u2()?, reader.u2()?),
            CONSTANT_INVOKEDYNAMIC => Constant::InvokeDynamic(reader.u2()?, reader.u2()?),
            CONSTANT_MODULE => Constant::Module(reader.u2()?),
            CONSTANT_PACKAGE => Constant::Package(reader.u2()?),
            other => {
                return Err(Error::malformed_at(offset, format!("unknown constant tag {}", other)));
            }
        };
        Ok(constant)
    }

    /// Serialized form; `Unusable` slots produce nothing
    pub fn to_bytes(&self) -> Vec<u8> {
        use constant_tags::*;
        let mut bytes = Vec::new();
        match self {
            Constant::Utf8(value) => {
                bytes.push(CONSTANT_UTF8);
                bytes.extend_from_slice(&(value.len() as u16).to_be_bytes());
                bytes.extend_from_slice(value);
            }
            Constant::Integer(value) => {
                bytes.push(CONSTANT_INTEGER);
                bytes.extend_from_slice(&value.to_be_bytes());
            }
            Constant::Float(bits) => {
                bytes.push(CONSTANT_FLOAT);
                bytes.extend_from_slice(&bits.to_be_bytes());
            }
            Constant::Long(value) => {
                bytes.push(CONSTANT_LONG);
                bytes.extend_from_slice(&value.to_be_bytes());
            }
            Constant::Double(bits) => {
                bytes.push(CONSTANT_DOUBLE);
                bytes.extend_from_slice(&bits.to_be_bytes());
            }
            Constant::Class(index) => push_u2(&mut bytes, CONSTANT_CLASS, *index),
            Constant::String(index) => push_u2(&mut bytes, CONSTANT_STRING, *index),
            Constant::FieldRef(a, b) => push_u2_u2(&mut bytes, CONSTANT_FIELDREF, *a, *b),
            Constant::MethodRef(a, b) => push_u2_u2(&mut bytes, CONSTANT_METHODREF, *a, *b),
            Constant::InterfaceMethodRef(a, b) => {
                push_u2_u2(&mut bytes, CONSTANT_INTERFACEMETHODREF, *a, *b)
            }
            Constant::NameAndType(a, b) => push_u2_u2(&mut bytes, CONSTANT_NAMEANDTYPE, *a, *b),
            Constant::MethodHandle(kind, index) => {
                bytes.push(CONSTANT_METHODHANDLE);
                bytes.push(*kind);
                bytes.extend_from_slice(&index.to_be_bytes());
            }
            Constant::MethodType(index) => push_u2(&mut bytes, CONSTANT_METHODTYPE, *index),
            Constant::Dynamic(a, b) => push_u2_u2(&mut bytes, CONSTANT_DYNAMIC, *a, *b),
            Constant::InvokeDynamic(a, b) => push_u2_u2(&mut bytes, CONSTANT_INVOKEDYNAMIC, *a, *b),
            Constant::Module(index) => push_u2(&mut bytes, CONSTANT_MODULE, *index),
            Constant::Package(index) => push_u2(&mut bytes, CONSTANT_PACKAGE, *index),
            Constant::Unusable => {}
        }
        bytes
    }
}

fn push_u2(bytes: &mut Vec<u8>, tag: u8, a: u16) {
    bytes.push(tag);
    bytes.extend_from_slice(&a.to_be_bytes());
}

fn push_u2_u2(bytes: &mut Vec<u8>, tag: u8, a: u16, b: u16) {
    push_u2(bytes, tag, a);
    bytes.extend_from_slice(&b.to_be_bytes());
}

/// A resolved `Fieldref`/`Methodref`/`InterfaceMethodref`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

/// A resolved `InvokeDynamic` constant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeDynamicRef {
    pub bootstrap_index: u16,
    pub name: String,
    pub descriptor: String,
}

/// The pool itself. Index `i` (1-based, as in the class file) lives at `constants[i - 1]`.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    pub(crate) constants: Vec<Constant>,
    lookup: HashMap<Constant, u16>,
}

impl PartialEq for ConstantPool {
    fn eq(&self, other: &Self) -> bool {
        self.constants == other.constants
    }
}

impl Eq for ConstantPool {}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let count = reader.u2()? as usize;
        if count == 0 {
            return Err(Error::malformed_at(reader.position(), "constant pool count is zero"));
        }
        let mut pool = Self::new();
        while pool.constants.len() + 1 < count {
            let constant = Constant::read(reader)?;
            let width = constant.width();
            if pool.constants.len() + width > count - 1 {
                return Err(Error::malformed_at(
                    reader.position(),
                    "wide constant overruns the constant pool",
                ));
            }
            pool.push_slot(constant);
        }
        Ok(pool)
    }

    fn push_slot(&mut self, constant: Constant) -> u16 {
        let index = (self.constants.len() + 1) as u16;
        let width = constant.width();
        self.lookup.entry(constant.clone()).or_insert(index);
        self.constants.push(constant);
        if width == 2 {
            self.constants.push(Constant::Unusable);
        }
        index
    }

    /// Number of slots, not counting the unused slot 0
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Iterate `(index, constant)` pairs, skipping the unusable halves of wide constants
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.constants
            .iter()
            .enumerate()
            .filter(|(_, c)| !matches!(c, Constant::Unusable))
            .map(|(i, c)| ((i + 1) as u16, c))
    }

    /// Add a constant, reusing an identical existing slot
    pub fn add(&mut self, constant: Constant) -> Result<u16> {
        if let Some(&index) = self.lookup.get(&constant) {
            return Ok(index);
        }
        let needed = self.constants.len() + constant.width();
        if needed >= u16::MAX as usize {
            return Err(Error::ConstantPoolFull { count: self.constants.len() });
        }
        Ok(self.push_slot(constant))
    }

    pub fn add_utf8(&mut self, value: &str) -> Result<u16> {
        self.add(Constant::Utf8(encode_modified_utf8(value)))
    }

    pub fn add_class(&mut self, name: &str) -> Result<u16> {
        let name_index = self.add_utf8(name)?;
        self.add(Constant::Class(name_index))
    }

    pub fn add_string(&mut self, value: &str) -> Result<u16> {
        let utf8_index = self.add_utf8(value)?;
        self.add(Constant::String(utf8_index))
    }

    pub fn add_integer(&mut self, value: i32) -> Result<u16> {
        self.add(Constant::Integer(value))
    }

    pub fn add_float(&mut self, value: f32) -> Result<u16> {
        self.add(Constant::Float(value.to_bits()))
    }

    pub fn add_long(&mut self, value: i64) -> Result<u16> {
        self.add(Constant::Long(value))
    }

    pub fn add_double(&mut self, value: f64) -> Result<u16> {
        self.add(Constant::Double(value.to_bits()))
    }

    pub fn add_name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let name_index = self.add_utf8(name)?;
        let descriptor_index = self.add_utf8(descriptor)?;
        self.add(Constant::NameAndType(name_index, descriptor_index))
    }

    pub fn add_field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> Result<u16> {
        let class_index = self.add_class(class)?;
        let name_and_type_index = self.add_name_and_type(name, descriptor)?;
        self.add(Constant::FieldRef(class_index, name_and_type_index))
    }

    pub fn add_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> Result<u16> {
        let class_index = self.add_class(class)?;
        let name_and_type_index = self.add_name_and_type(name, descriptor)?;
        self.add(Constant::MethodRef(class_index, name_and_type_index))
    }

    pub fn add_method_handle(&mut self, reference_kind: u8, reference_index: u16) -> Result<u16> {
        self.add(Constant::MethodHandle(reference_kind, reference_index))
    }

    pub fn add_method_type(&mut self, descriptor: &str) -> Result<u16> {
        let descriptor_index = self.add_utf8(descriptor)?;
        self.add(Constant::MethodType(descriptor_index))
    }

    pub fn add_invoke_dynamic(
        &mut self,
        bootstrap_index: u16,
        name: &str,
        descriptor: &str,
    ) -> Result<u16> {
        let name_and_type_index = self.add_name_and_type(name, descriptor)?;
        self.add(Constant::InvokeDynamic(bootstrap_index, name_and_type_index))
    }

    /// Entry at a class-file index; slot 0 and unusable halves are rejected
    pub fn get(&self, index: u16) -> Result<&Constant> {
        match (index as usize).checked_sub(1).and_then(|i| self.constants.get(i)) {
            Some(Constant::Unusable) | None => Err(Error::malformed(format!(
                "invalid constant pool index {}",
                index
            ))),
            Some(constant) => Ok(constant),
        }
    }

    fn mismatch(index: u16, expected: &str, found: &Constant) -> Error {
        Error::malformed(format!(
            "constant #{} is {}, expected {}",
            index,
            found.kind_name(),
            expected
        ))
    }

    pub fn utf8(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            Constant::Utf8(bytes) => decode_modified_utf8(bytes).ok_or_else(|| {
                Error::malformed(format!("constant #{} is not valid modified UTF-8", index))
            }),
            other => Err(Self::mismatch(index, "Utf8", other)),
        }
    }

    /// Whether the `Utf8` at `index` decodes to a string that encodes back to
    /// the same bytes
    fn utf8_is_exact(&self, index: u16) -> bool {
        match self.get(index) {
            Ok(Constant::Utf8(bytes)) => {
                decode_modified_utf8(bytes).map_or(false, |text| encode_modified_utf8(&text) == *bytes)
            }
            _ => false,
        }
    }

    /// Whether the owner, name and descriptor of a member reference all
    /// survive a trip through `String`
    pub fn member_is_exact(&self, index: u16) -> bool {
        let (class_index, nat_index) = match self.get(index) {
            Ok(Constant::FieldRef(class_index, nat_index))
            | Ok(Constant::MethodRef(class_index, nat_index))
            | Ok(Constant::InterfaceMethodRef(class_index, nat_index)) => (*class_index, *nat_index),
            _ => return false,
        };
        let owner_exact = matches!(self.get(class_index), Ok(Constant::Class(name)) if self.utf8_is_exact(*name));
        let nat_exact = matches!(
            self.get(nat_index),
            Ok(Constant::NameAndType(name, descriptor)) if self.utf8_is_exact(*name) && self.utf8_is_exact(*descriptor)
        );
        owner_exact && nat_exact
    }

    pub fn class_name(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            Constant::Class(name_index) => self.utf8(*name_index),
            other => Err(Self::mismatch(index, "Class", other)),
        }
    }

    pub fn string(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            Constant::String(utf8_index) => self.utf8(*utf8_index),
            other => Err(Self::mismatch(index, "String", other)),
        }
    }

    pub fn name_and_type(&self, index: u16) -> Result<(String, String)> {
        match self.get(index)? {
            Constant::NameAndType(name, descriptor) => Ok((self.utf8(*name)?, self.utf8(*descriptor)?)),
            other => Err(Self::mismatch(index, "NameAndType", other)),
        }
    }

    fn member(&self, class_index: u16, nat_index: u16) -> Result<MemberRef> {
        let owner = self.class_name(class_index)?;
        let (name, descriptor) = self.name_and_type(nat_index)?;
        Ok(MemberRef { owner, name, descriptor })
    }

    pub fn field_ref(&self, index: u16) -> Result<MemberRef> {
        match self.get(index)? {
            Constant::FieldRef(class_index, nat_index) => self.member(*class_index, *nat_index),
            other => Err(Self::mismatch(index, "Fieldref", other)),
        }
    }

    /// `Methodref` or `InterfaceMethodref`
    pub fn method_ref(&self, index: u16) -> Result<MemberRef> {
        match self.get(index)? {
            Constant::MethodRef(class_index, nat_index)
            | Constant::InterfaceMethodRef(class_index, nat_index) => {
                self.member(*class_index, *nat_index)
            }
            other => Err(Self::mismatch(index, "Methodref", other)),
        }
    }

    pub fn method_handle(&self, index: u16) -> Result<(u8, u16)> {
        match self.get(index)? {
            Constant::MethodHandle(kind, reference) => Ok((*kind, *reference)),
            other => Err(Self::mismatch(index, "MethodHandle", other)),
        }
    }

    pub fn invoke_dynamic(&self, index: u16) -> Result<InvokeDynamicRef> {
        match self.get(index)? {
            Constant::InvokeDynamic(bootstrap_index, nat_index) => {
                let (name, descriptor) = self.name_and_type(*nat_index)?;
                Ok(InvokeDynamicRef {
                    bootstrap_index: *bootstrap_index,
                    name,
                    descriptor,
                })
            }
            other => Err(Self::mismatch(index, "InvokeDynamic", other)),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&((self.constants.len() + 1) as u16).to_be_bytes());
        for constant in &self.constants {
            bytes.extend_from_slice(&constant.to_bytes());
        }
        bytes
    }
}

/// Decode the JVM's modified UTF-8 (two-byte NUL, surrogate pairs as two 3-byte sequences).
///
/// Unpaired surrogates are legal in class files but not in a `String`; they
/// come back as U+FFFD. `None` only for byte sequences the format forbids.
pub fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let a = bytes[i] as u16;
        if a == 0 {
            return None;
        }
        if a < 0x80 {
            units.push(a);
            i += 1;
        } else if a & 0xE0 == 0xC0 {
            let b = *bytes.get(i + 1)? as u16;
            if b & 0xC0 != 0x80 {
                return None;
            }
            units.push(((a & 0x1F) << 6) | (b & 0x3F));
            i += 2;
        } else if a & 0xF0 == 0xE0 {
            let b = *bytes.get(i + 1)? as u16;
            let c = *bytes.get(i + 2)? as u16;
            if b & 0xC0 != 0x80 || c & 0xC0 != 0x80 {
                return None;
            }
            units.push(((a & 0x0F) << 12) | ((b & 0x3F) << 6) | (c & 0x3F));
            i += 3;
        } else {
            return None;
        }
    }
    Some(String::from_utf16_lossy(&units))
}

pub fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}
