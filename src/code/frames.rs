//! `StackMapTable` frames with label targets

use super::decode::PcMap;
use super::Label;
use crate::classfile::reader::ByteReader;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationType {
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,
    UninitializedThis,
    /// `CONSTANT_Class` index
    Object(u16),
    /// Value created by the `new` instruction at the label
    Uninitialized(Label),
}

/// Frame shape as encoded. `Same` and `SameLocals1` widen to their extended
/// forms when the offset delta outgrows the compact encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    Same,
    SameLocals1(VerificationType),
    SameLocals1Extended(VerificationType),
    /// Drop the last 1 to 3 locals
    Chop(u8),
    SameExtended,
    Append(Vec<VerificationType>),
    Full { locals: Vec<VerificationType>, stack: Vec<VerificationType> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackMapFrame {
    pub target: Label,
    pub kind: FrameKind,
}

fn read_verification_type(reader: &mut ByteReader<'_>, pcs: &PcMap) -> Result<VerificationType> {
    Ok(match reader.u1()? {
        0 => VerificationType::Top,
        1 => VerificationType::Integer,
        2 => VerificationType::Float,
        3 => VerificationType::Double,
        4 => VerificationType::Long,
        5 => VerificationType::Null,
        6 => VerificationType::UninitializedThis,
        7 => VerificationType::Object(reader.u2()?),
        8 => VerificationType::Uninitialized(pcs.label(reader.u2()? as i64)?),
        tag => return Err(Error::malformed(format!("unknown verification type tag {}", tag))),
    })
}

fn read_verification_types(reader: &mut ByteReader<'_>, pcs: &PcMap, count: usize) -> Result<Vec<VerificationType>> {
    (0..count).map(|_| read_verification_type(reader, pcs)).collect()
}

pub(crate) fn read_stack_map_table(body: &[u8], pcs: &PcMap) -> Result<Vec<StackMapFrame>> {
    let mut reader = ByteReader::new(body);
    let count = reader.u2()?;
    let mut frames = Vec::with_capacity(count as usize);
    let mut previous: Option<i64> = None;
    for _ in 0..count {
        let tag = reader.u1()?;
        let (delta, kind) = match tag {
            0..=63 => (tag as u16, FrameKind::Same),
            64..=127 => (tag as u16 - 64, FrameKind::SameLocals1(read_verification_type(&mut reader, pcs)?)),
            247 => {
                let delta = reader.u2()?;
                (delta, FrameKind::SameLocals1Extended(read_verification_type(&mut reader, pcs)?))
            }
            248..=250 => (reader.u2()?, FrameKind::Chop(251 - tag)),
            251 => (reader.u2()?, FrameKind::SameExtended),
            252..=254 => {
                let delta = reader.u2()?;
                let locals = read_verification_types(&mut reader, pcs, (tag - 251) as usize)?;
                (delta, FrameKind::Append(locals))
            }
            255 => {
                let delta = reader.u2()?;
                let local_count = reader.u2()? as usize;
                let locals = read_verification_types(&mut reader, pcs, local_count)?;
                let stack_count = reader.u2()? as usize;
                let stack = read_verification_types(&mut reader, pcs, stack_count)?;
                (delta, FrameKind::Full { locals, stack })
            }
            _ => return Err(Error::malformed(format!("reserved stack map frame type {}", tag))),
        };
        let pc = match previous {
            None => delta as i64,
            Some(previous) => previous + delta as i64 + 1,
        };
        frames.push(StackMapFrame { target: pcs.label(pc)?, kind });
        previous = Some(pc);
    }
    reader.expect_end("StackMapTable")?;
    Ok(frames)
}

fn write_verification_type(
    bytes: &mut Vec<u8>,
    ty: &VerificationType,
    pc_of: &impl Fn(Label) -> Result<u32>,
) -> Result<()> {
    match ty {
        VerificationType::Top => bytes.push(0),
        VerificationType::Integer => bytes.push(1),
        VerificationType::Float => bytes.push(2),
        VerificationType::Double => bytes.push(3),
        VerificationType::Long => bytes.push(4),
        VerificationType::Null => bytes.push(5),
        VerificationType::UninitializedThis => bytes.push(6),
        VerificationType::Object(index) => {
            bytes.push(7);
            bytes.extend_from_slice(&index.to_be_bytes());
        }
        VerificationType::Uninitialized(label) => {
            bytes.push(8);
            bytes.extend_from_slice(&(pc_of(*label)? as u16).to_be_bytes());
        }
    }
    Ok(())
}

fn write_verification_types(
    bytes: &mut Vec<u8>,
    types: &[VerificationType],
    pc_of: &impl Fn(Label) -> Result<u32>,
) -> Result<()> {
    bytes.extend_from_slice(&(types.len() as u16).to_be_bytes());
    for ty in types {
        write_verification_type(bytes, ty, pc_of)?;
    }
    Ok(())
}

pub(crate) fn write_stack_map_table(
    frames: &[StackMapFrame],
    pc_of: impl Fn(Label) -> Result<u32>,
) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(frames.len() as u16).to_be_bytes());
    let mut previous: Option<u32> = None;
    for frame in frames {
        let pc = pc_of(frame.target)?;
        let delta = match previous {
            None => pc,
            Some(previous) if pc > previous => pc - previous - 1,
            Some(_) => return Err(Error::malformed("stack map frames are not in code order")),
        };
        previous = Some(pc);
        let delta_bytes = (delta as u16).to_be_bytes();
        match &frame.kind {
            FrameKind::Same if delta <= 63 => bytes.push(delta as u8),
            FrameKind::Same | FrameKind::SameExtended => {
                bytes.push(251);
                bytes.extend_from_slice(&delta_bytes);
            }
            FrameKind::SameLocals1(ty) if delta <= 63 => {
                bytes.push(64 + delta as u8);
                write_verification_type(&mut bytes, ty, &pc_of)?;
            }
            FrameKind::SameLocals1(ty) | FrameKind::SameLocals1Extended(ty) => {
                bytes.push(247);
                bytes.extend_from_slice(&delta_bytes);
                write_verification_type(&mut bytes, ty, &pc_of)?;
            }
            FrameKind::Chop(k @ 1..=3) => {
                bytes.push(251 - k);
                bytes.extend_from_slice(&delta_bytes);
            }
            FrameKind::Append(locals) if (1..=3).contains(&locals.len()) => {
                bytes.push(251 + locals.len() as u8);
                bytes.extend_from_slice(&delta_bytes);
                for ty in locals {
                    write_verification_type(&mut bytes, ty, &pc_of)?;
                }
            }
            FrameKind::Full { locals, stack } => {
                bytes.push(255);
                bytes.extend_from_slice(&delta_bytes);
                write_verification_types(&mut bytes, locals, &pc_of)?;
                write_verification_types(&mut bytes, stack, &pc_of)?;
            }
            FrameKind::Chop(_) | FrameKind::Append(_) => {
                return Err(Error::malformed("chop and append frames cover 1 to 3 locals"));
            }
        }
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(target: u32, kind: FrameKind) -> StackMapFrame {
        StackMapFrame { target: Label(target), kind }
    }

    #[test]
    fn test_compact_frames_widen_when_delta_grows() {
        let frames = vec![frame(1, FrameKind::Same), frame(2, FrameKind::SameLocals1(VerificationType::Integer))];

        let compact = write_stack_map_table(&frames, |label| Ok(label.0 * 10)).unwrap();
        assert_eq!(compact, vec![0, 2, 10, 64 + 9, 1]);

        let wide = write_stack_map_table(&frames, |label| Ok(label.0 * 100)).unwrap();
        assert_eq!(wide, vec![0, 2, 251, 0, 100, 247, 0, 99, 1]);
    }

    #[test]
    fn test_out_of_order_frames_are_rejected() {
        let frames = vec![frame(2, FrameKind::Same), frame(1, FrameKind::Same)];
        assert!(write_stack_map_table(&frames, |label| Ok(label.0)).is_err());

        let frames = vec![frame(1, FrameKind::Chop(4))];
        assert!(write_stack_map_table(&frames, |label| Ok(label.0)).is_err());
    }
}
