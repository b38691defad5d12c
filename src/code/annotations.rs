//! Type annotations attached to a `Code` attribute.
//!
//! Only the target is decoded. The type path and the annotation itself carry
//! no bytecode offsets and are kept as encoded.

use super::decode::PcMap;
use super::Label;
use crate::classfile::reader::ByteReader;
use crate::error::{Error, Result};

pub mod target_types {
    pub const LOCAL_VARIABLE: u8 = 0x40;
    pub const RESOURCE_VARIABLE: u8 = 0x41;
    pub const EXCEPTION_PARAMETER: u8 = 0x42;
    pub const INSTANCEOF: u8 = 0x43;
    pub const NEW: u8 = 0x44;
    pub const CONSTRUCTOR_REFERENCE: u8 = 0x45;
    pub const METHOD_REFERENCE: u8 = 0x46;
    pub const CAST: u8 = 0x47;
    pub const METHOD_REFERENCE_TYPE_ARGUMENT: u8 = 0x4B;
}

/// Live range of an annotated local variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRange {
    pub start: Label,
    pub end: Label,
    pub index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTarget {
    /// `localvar_target` (local or resource variable)
    LocalVariable { target_type: u8, ranges: Vec<LocalRange> },
    /// `catch_target`: index into the exception table
    Catch { exception_table_index: u16 },
    /// `offset_target` (instanceof, new, method and constructor references)
    Offset { target_type: u8, at: Label },
    /// `type_argument_target` (casts and generic invocations)
    TypeArgument { target_type: u8, at: Label, type_argument_index: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAnnotation {
    pub target: TypeTarget,
    /// `type_path` followed by the annotation body
    pub rest: Vec<u8>,
}

pub(crate) fn read_type_annotations(body: &[u8], pcs: &PcMap) -> Result<Vec<TypeAnnotation>> {
    let mut reader = ByteReader::new(body);
    let count = reader.u2()?;
    let mut annotations = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let target = read_target(&mut reader, pcs)?;
        let start = reader.position();
        let path_length = reader.u1()?;
        reader.take(path_length as usize * 2)?;
        skip_annotation(&mut reader)?;
        annotations.push(TypeAnnotation { target, rest: body[start..reader.position()].to_vec() });
    }
    reader.expect_end("type annotations")?;
    Ok(annotations)
}

fn read_target(reader: &mut ByteReader<'_>, pcs: &PcMap) -> Result<TypeTarget> {
    use target_types::*;

    let target_type = reader.u1()?;
    Ok(match target_type {
        LOCAL_VARIABLE | RESOURCE_VARIABLE => {
            let count = reader.u2()?;
            let mut ranges = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let start_pc = reader.u2()? as i64;
                let length = reader.u2()? as i64;
                ranges.push(LocalRange {
                    start: pcs.label(start_pc)?,
                    end: pcs.label(start_pc + length)?,
                    index: reader.u2()?,
                });
            }
            TypeTarget::LocalVariable { target_type, ranges }
        }
        EXCEPTION_PARAMETER => TypeTarget::Catch { exception_table_index: reader.u2()? },
        INSTANCEOF..=METHOD_REFERENCE => TypeTarget::Offset { target_type, at: pcs.label(reader.u2()? as i64)? },
        CAST..=METHOD_REFERENCE_TYPE_ARGUMENT => TypeTarget::TypeArgument {
            target_type,
            at: pcs.label(reader.u2()? as i64)?,
            type_argument_index: reader.u1()?,
        },
        other => {
            return Err(Error::malformed(format!("type annotation target 0x{:02x} cannot appear in code", other)))
        }
    })
}

fn skip_annotation(reader: &mut ByteReader<'_>) -> Result<()> {
    let _type_index = reader.u2()?;
    let pairs = reader.u2()?;
    for _ in 0..pairs {
        let _name_index = reader.u2()?;
        skip_element_value(reader)?;
    }
    Ok(())
}

fn skip_element_value(reader: &mut ByteReader<'_>) -> Result<()> {
    match reader.u1()? {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' | b'c' => {
            reader.u2()?;
        }
        b'e' => {
            reader.take(4)?;
        }
        b'@' => skip_annotation(reader)?,
        b'[' => {
            for _ in 0..reader.u2()? {
                skip_element_value(reader)?;
            }
        }
        tag => return Err(Error::malformed(format!("unknown element value tag '{}'", tag as char))),
    }
    Ok(())
}

pub(crate) fn write_type_annotations(
    annotations: &[TypeAnnotation],
    pc_of: impl Fn(Label) -> Result<u32>,
) -> Result<Vec<u8>> {
    let mut bytes = (annotations.len() as u16).to_be_bytes().to_vec();
    for annotation in annotations {
        match &annotation.target {
            TypeTarget::LocalVariable { target_type, ranges } => {
                bytes.push(*target_type);
                bytes.extend_from_slice(&(ranges.len() as u16).to_be_bytes());
                for range in ranges {
                    let start = pc_of(range.start)?;
                    let length = pc_of(range.end)?
                        .checked_sub(start)
                        .ok_or_else(|| Error::malformed("annotated variable range ends before it starts"))?;
                    bytes.extend_from_slice(&(start as u16).to_be_bytes());
                    bytes.extend_from_slice(&(length as u16).to_be_bytes());
                    bytes.extend_from_slice(&range.index.to_be_bytes());
                }
            }
            TypeTarget::Catch { exception_table_index } => {
                bytes.push(target_types::EXCEPTION_PARAMETER);
                bytes.extend_from_slice(&exception_table_index.to_be_bytes());
            }
            TypeTarget::Offset { target_type, at } => {
                bytes.push(*target_type);
                bytes.extend_from_slice(&(pc_of(*at)? as u16).to_be_bytes());
            }
            TypeTarget::TypeArgument { target_type, at, type_argument_index } => {
                bytes.push(*target_type);
                bytes.extend_from_slice(&(pc_of(*at)? as u16).to_be_bytes());
                bytes.push(*type_argument_index);
            }
        }
        bytes.extend_from_slice(&annotation.rest);
    }
    Ok(bytes)
}
