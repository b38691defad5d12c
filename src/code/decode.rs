//! `Code` attribute decoding

use log::trace;

use super::annotations::read_type_annotations;
use super::frames::read_stack_map_table;
use super::insn::{BootstrapKind, FieldInsn, IndirectCall, Instruction};
use super::{CodeAttr, CodeAttrInfo, CodeAttribute, ExceptionHandler, Label, LineNumber, LocalVariable};
use crate::classfile::attribute::BootstrapMethod;
use crate::classfile::constpool::ConstantPool;
use crate::classfile::defs::{attribute_names, reference_kind, MAX_CODE_LENGTH};
use crate::classfile::descriptor::{FieldType, MethodDescriptor};
use crate::classfile::opcodes::{self, *};
use crate::classfile::reader::ByteReader;
use crate::consts::{BOOTSTRAP_DESCRIPTOR, GETTER_BOOTSTRAP_NAME, SETTER_BOOTSTRAP_NAME};
use crate::error::{Error, Result};

/// Class-level information needed to interpret instructions
pub struct DecodeContext<'a> {
    pool: &'a ConstantPool,
    bootstrap_methods: &'a [BootstrapMethod],
}

impl<'a> DecodeContext<'a> {
    pub fn new(pool: &'a ConstantPool, bootstrap_methods: &'a [BootstrapMethod]) -> Self {
        Self { pool, bootstrap_methods }
    }

    fn field_insn(&self, index: u16, is_static: bool) -> Result<FieldInsn> {
        let member = self.pool.field_ref(index)?;
        Ok(FieldInsn {
            index,
            value_type: FieldType::parse(&member.descriptor)?,
            owner: member.owner,
            name: member.name,
            is_static,
        })
    }

    /// Recognize an `invokedynamic` bootstrapped by a field accessor entry point.
    /// Foreign call sites yield `None`.
    fn accessor_call(&self, index: u16) -> Result<Option<IndirectCall>> {
        let indy = self.pool.invoke_dynamic(index)?;
        let bootstrap = self
            .bootstrap_methods
            .get(indy.bootstrap_index as usize)
            .ok_or_else(|| Error::malformed(format!("bootstrap method {} does not exist", indy.bootstrap_index)))?;
        let (kind, reference) = self.pool.method_handle(bootstrap.method_ref)?;
        if kind != reference_kind::REF_INVOKE_STATIC {
            return Ok(None);
        }
        let target = self.pool.method_ref(reference)?;
        let kind = match target.name.as_str() {
            GETTER_BOOTSTRAP_NAME => BootstrapKind::Getter,
            SETTER_BOOTSTRAP_NAME => BootstrapKind::Setter,
            _ => return Ok(None),
        };
        if target.descriptor != BOOTSTRAP_DESCRIPTOR {
            return Ok(None);
        }
        let (owner_type_name, field_name) = match bootstrap.arguments.as_slice() {
            [owner, field] => match (self.pool.string(*owner), self.pool.string(*field)) {
                (Ok(owner), Ok(field)) => (owner, field),
                _ => return Ok(None),
            },
            _ => return Ok(None),
        };
        Ok(Some(IndirectCall {
            callee_name: indy.name,
            signature: MethodDescriptor::parse(&indy.descriptor)?,
            owner_type_name,
            field_name,
            kind,
            bootstrap_owner: target.owner,
        }))
    }
}

/// Maps bytecode offsets to instruction labels
pub(crate) struct PcMap {
    /// `u32::MAX` for offsets inside an instruction
    labels: Vec<u32>,
}

impl PcMap {
    pub(crate) fn new(starts: &[usize], code_length: usize) -> Self {
        let mut labels = vec![u32::MAX; code_length + 1];
        for (index, pc) in starts.iter().enumerate() {
            labels[*pc] = index as u32;
        }
        labels[code_length] = starts.len() as u32;
        Self { labels }
    }

    pub(crate) fn label(&self, pc: i64) -> Result<Label> {
        let slot = usize::try_from(pc).ok().and_then(|pc| self.labels.get(pc).copied());
        match slot {
            Some(index) if index != u32::MAX => Ok(Label(index)),
            _ => Err(Error::malformed(format!("offset {} is not an instruction boundary", pc))),
        }
    }
}

/// Instruction with offsets not yet converted to labels
enum RawInsn {
    Ready(Instruction),
    Branch { opcode: u8, target: i64 },
    TableSwitch { default: i64, low: i32, high: i32, targets: Vec<i64> },
    LookupSwitch { default: i64, pairs: Vec<(i32, i64)> },
}

/// Decode the payload of a `Code` attribute
pub fn decode_code(payload: &[u8], context: &DecodeContext<'_>) -> Result<CodeAttribute> {
    let mut reader = ByteReader::new(payload);
    let max_stack = reader.u2()?;
    let max_locals = reader.u2()?;
    let code_length = reader.u4()? as usize;
    if code_length == 0 || code_length > MAX_CODE_LENGTH {
        return Err(Error::malformed(format!("invalid code length {}", code_length)));
    }
    let code = reader.take(code_length)?;

    let mut starts = Vec::new();
    let mut raw = Vec::new();
    let mut code_reader = ByteReader::new(code);
    while !code_reader.is_empty() {
        let pc = code_reader.position();
        starts.push(pc);
        raw.push(read_instruction(&mut code_reader, pc as i64, context)?);
    }

    let pcs = PcMap::new(&starts, code_length);
    let instructions = raw
        .into_iter()
        .map(|insn| resolve_labels(insn, &pcs))
        .collect::<Result<Vec<_>>>()?;

    let handler_count = reader.u2()?;
    let mut exception_table = Vec::with_capacity(handler_count as usize);
    for _ in 0..handler_count {
        exception_table.push(ExceptionHandler {
            start: pcs.label(reader.u2()? as i64)?,
            end: pcs.label(reader.u2()? as i64)?,
            handler: pcs.label(reader.u2()? as i64)?,
            catch_type: reader.u2()?,
        });
    }

    let attribute_count = reader.u2()?;
    let mut attributes = Vec::with_capacity(attribute_count as usize);
    for _ in 0..attribute_count {
        let name_index = reader.u2()?;
        let length = reader.u4()? as usize;
        let body = reader.take(length)?;
        let name = context.pool.utf8(name_index)?;
        let info = match name.as_str() {
            attribute_names::LINE_NUMBER_TABLE => CodeAttrInfo::LineNumberTable(read_line_numbers(body, &pcs)?),
            attribute_names::LOCAL_VARIABLE_TABLE => {
                CodeAttrInfo::LocalVariableTable(read_local_variables(body, &pcs)?)
            }
            attribute_names::LOCAL_VARIABLE_TYPE_TABLE => {
                CodeAttrInfo::LocalVariableTypeTable(read_local_variables(body, &pcs)?)
            }
            attribute_names::STACK_MAP_TABLE => CodeAttrInfo::StackMapTable(read_stack_map_table(body, &pcs)?),
            attribute_names::RUNTIME_VISIBLE_TYPE_ANNOTATIONS | attribute_names::RUNTIME_INVISIBLE_TYPE_ANNOTATIONS => {
                CodeAttrInfo::TypeAnnotations(read_type_annotations(body, &pcs)?)
            }
            _ => CodeAttrInfo::Other(body.to_vec()),
        };
        attributes.push(CodeAttr { name_index, info });
    }
    reader.expect_end("Code attribute")?;

    trace!("decoded {} instructions ({} bytes)", instructions.len(), code_length);
    Ok(CodeAttribute { max_stack, max_locals, instructions, exception_table, attributes })
}

fn read_instruction(reader: &mut ByteReader<'_>, pc: i64, context: &DecodeContext<'_>) -> Result<RawInsn> {
    let opcode = reader.u1()?;
    let insn = match opcode {
        GETFIELD | GETSTATIC => {
            let index = reader.u2()?;
            Instruction::FieldRead(context.field_insn(index, opcode == GETSTATIC)?)
        }
        PUTFIELD | PUTSTATIC => {
            let index = reader.u2()?;
            Instruction::FieldWrite(context.field_insn(index, opcode == PUTSTATIC)?)
        }
        INVOKEDYNAMIC => {
            let operands = reader.take(4)?;
            let index = u16::from_be_bytes([operands[0], operands[1]]);
            match context.accessor_call(index)? {
                Some(call) if operands[2] == 0 && operands[3] == 0 => Instruction::IndirectCall { call, index },
                _ => Instruction::Other { opcode, operands: operands.to_vec() },
            }
        }
        GOTO_W | JSR_W => return Ok(RawInsn::Branch { opcode, target: pc + reader.i4()? as i64 }),
        op if opcodes::is_branch(op) => return Ok(RawInsn::Branch { opcode, target: pc + reader.i2()? as i64 }),
        TABLESWITCH => {
            reader.align4()?;
            let default = pc + reader.i4()? as i64;
            let low = reader.i4()?;
            let high = reader.i4()?;
            if high < low {
                return Err(Error::malformed(format!("tableswitch at {} has high {} < low {}", pc, high, low)));
            }
            let count = (high as i64 - low as i64 + 1) as usize;
            if count * 4 > reader.remaining() {
                return Err(Error::malformed(format!("tableswitch at {} overruns the code", pc)));
            }
            let targets = (0..count)
                .map(|_| reader.i4().map(|offset| pc + offset as i64))
                .collect::<Result<Vec<_>>>()?;
            return Ok(RawInsn::TableSwitch { default, low, high, targets });
        }
        LOOKUPSWITCH => {
            reader.align4()?;
            let default = pc + reader.i4()? as i64;
            let count = reader.i4()?;
            if count < 0 || count as usize * 8 > reader.remaining() {
                return Err(Error::malformed(format!("lookupswitch at {} has bad pair count {}", pc, count)));
            }
            let mut pairs = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let key = reader.i4()?;
                pairs.push((key, pc + reader.i4()? as i64));
            }
            return Ok(RawInsn::LookupSwitch { default, pairs });
        }
        WIDE => {
            let inner = reader.u1()?;
            let length = match inner {
                IINC => 4,
                ILOAD..=ALOAD | ISTORE..=ASTORE | RET => 2,
                _ => return Err(Error::malformed(format!("wide cannot modify opcode 0x{:02x}", inner))),
            };
            let mut operands = vec![inner];
            operands.extend_from_slice(reader.take(length)?);
            Instruction::Other { opcode, operands }
        }
        _ => {
            let length = opcodes::operand_length(opcode)
                .ok_or_else(|| Error::malformed(format!("invalid opcode 0x{:02x} at {}", opcode, pc)))?;
            Instruction::Other { opcode, operands: reader.take(length)?.to_vec() }
        }
    };
    Ok(RawInsn::Ready(insn))
}

fn resolve_labels(insn: RawInsn, pcs: &PcMap) -> Result<Instruction> {
    Ok(match insn {
        RawInsn::Ready(insn) => insn,
        RawInsn::Branch { opcode, target } => Instruction::Branch { opcode, target: pcs.label(target)? },
        RawInsn::TableSwitch { default, low, high, targets } => Instruction::TableSwitch {
            default: pcs.label(default)?,
            low,
            high,
            targets: targets.into_iter().map(|t| pcs.label(t)).collect::<Result<_>>()?,
        },
        RawInsn::LookupSwitch { default, pairs } => Instruction::LookupSwitch {
            default: pcs.label(default)?,
            pairs: pairs
                .into_iter()
                .map(|(key, target)| pcs.label(target).map(|label| (key, label)))
                .collect::<Result<_>>()?,
        },
    })
}

fn read_line_numbers(body: &[u8], pcs: &PcMap) -> Result<Vec<LineNumber>> {
    let mut reader = ByteReader::new(body);
    let count = reader.u2()?;
    let mut lines = Vec::with_capacity(count as usize);
    for _ in 0..count {
        lines.push(LineNumber { start: pcs.label(reader.u2()? as i64)?, line: reader.u2()? });
    }
    reader.expect_end("LineNumberTable")?;
    Ok(lines)
}

fn read_local_variables(body: &[u8], pcs: &PcMap) -> Result<Vec<LocalVariable>> {
    let mut reader = ByteReader::new(body);
    let count = reader.u2()?;
    let mut variables = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let start_pc = reader.u2()? as i64;
        let length = reader.u2()? as i64;
        variables.push(LocalVariable {
            start: pcs.label(start_pc)?,
            end: pcs.label(start_pc + length)?,
            name_index: reader.u2()?,
            descriptor_index: reader.u2()?,
            index: reader.u2()?,
        });
    }
    reader.expect_end("LocalVariableTable")?;
    Ok(variables)
}
