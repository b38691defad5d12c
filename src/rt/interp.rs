//! A small bytecode interpreter for method bodies of defined types.
//!
//! The operand stack and locals use JVM slot accounting: a long or double is
//! followed by a `Value::Top` slot, so the `dup`/`pop` family can work on raw
//! slots exactly as the JVM specifies.

use log::trace;

use super::bootstrap;
use super::callsite::SiteId;
use super::types::TypeHandle;
use super::value::{Object, Value};
use super::Runtime;
use crate::classfile::constpool::Constant;
use crate::classfile::defs::{CONSTRUCTOR_METHOD_NAME, OBJECT_CLASS_NAME};
use crate::classfile::descriptor::MethodDescriptor;
use crate::classfile::opcodes::*;
use crate::code::{FieldInsn, IndirectCall, Instruction};
use crate::consts::MAX_CALL_DEPTH;
use crate::error::{Error, Result};

struct Frame {
    locals: Vec<Value>,
    stack: Vec<Value>,
}

impl Frame {
    fn new(max_locals: usize, args: Vec<Value>) -> Result<Self> {
        let mut locals = vec![Value::Top; max_locals];
        let mut slot = 0;
        for arg in args {
            let width = if arg.is_wide() { 2 } else { 1 };
            if slot + width > max_locals {
                return Err(Error::execution("arguments do not fit in max_locals"));
            }
            locals[slot] = arg;
            slot += width;
        }
        Ok(Self { locals, stack: Vec::new() })
    }

    fn push(&mut self, value: Value) {
        let wide = value.is_wide();
        self.stack.push(value);
        if wide {
            self.stack.push(Value::Top);
        }
    }

    fn pop(&mut self) -> Result<Value> {
        match self.pop_slot()? {
            Value::Top => self.pop_slot(),
            value => Ok(value),
        }
    }

    fn pop_slot(&mut self) -> Result<Value> {
        self.stack.pop().ok_or_else(|| Error::execution("operand stack underflow"))
    }

    fn pop_int(&mut self) -> Result<i32> {
        self.pop()?.as_int()
    }

    fn pop_long(&mut self) -> Result<i64> {
        self.pop()?.as_long()
    }

    fn pop_float(&mut self) -> Result<f32> {
        self.pop()?.as_float()
    }

    fn pop_double(&mut self) -> Result<f64> {
        self.pop()?.as_double()
    }

    /// Pop `count` values, returned in push order
    fn pop_args(&mut self, count: usize) -> Result<Vec<Value>> {
        let mut args = (0..count).map(|_| self.pop()).collect::<Result<Vec<_>>>()?;
        args.reverse();
        Ok(args)
    }

    fn load(&self, index: usize) -> Result<Value> {
        self.locals
            .get(index)
            .cloned()
            .ok_or_else(|| Error::execution(format!("local {} out of range", index)))
    }

    fn store(&mut self, index: usize, value: Value) -> Result<()> {
        let width = if value.is_wide() { 2 } else { 1 };
        if index + width > self.locals.len() {
            return Err(Error::execution(format!("local {} out of range", index)));
        }
        self.locals[index] = value;
        if width == 2 {
            self.locals[index + 1] = Value::Top;
        }
        Ok(())
    }
}

enum Flow {
    Next,
    Jump(usize),
    Return(Option<Value>),
}

pub(crate) struct Interpreter<'r> {
    runtime: &'r Runtime,
    steps: usize,
    depth: usize,
}

impl<'r> Interpreter<'r> {
    pub(crate) fn new(runtime: &'r Runtime) -> Self {
        Self { runtime, steps: 0, depth: 0 }
    }

    /// Run a method with arguments in declaration order, receiver first
    pub(crate) fn call(&mut self, ty: &TypeHandle, method_index: usize, args: Vec<Value>) -> Result<Option<Value>> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(Error::execution("java.lang.StackOverflowError"));
        }
        let method = ty.method_at(method_index)?;
        let code = method.code.as_ref().ok_or_else(|| {
            Error::execution(format!("{}.{} has no code", ty.name(), method.signature()))
        })?;
        trace!("enter {}.{}", ty.name(), method.signature());
        self.depth += 1;
        let result = self.run(ty, method_index, &code.instructions, Frame::new(code.max_locals as usize, args)?);
        self.depth -= 1;
        result
    }

    fn run(
        &mut self,
        ty: &TypeHandle,
        method_index: usize,
        instructions: &[Instruction],
        mut frame: Frame,
    ) -> Result<Option<Value>> {
        let mut pc = 0usize;
        loop {
            self.steps += 1;
            if self.steps > self.runtime.config().max_steps {
                return Err(Error::execution(format!(
                    "step budget of {} instructions exhausted",
                    self.runtime.config().max_steps
                )));
            }
            let insn = instructions
                .get(pc)
                .ok_or_else(|| Error::execution(format!("{}: execution fell off the end of code", ty.name())))?;
            let flow = match insn {
                Instruction::FieldRead(field) => {
                    let value = self.read_field(&mut frame, field)?;
                    frame.push(value);
                    Flow::Next
                }
                Instruction::FieldWrite(field) => {
                    self.write_field(&mut frame, field)?;
                    Flow::Next
                }
                Instruction::IndirectCall { call, .. } => {
                    self.call_site(ty, SiteId { method: method_index, instruction: pc }, call, &mut frame)?;
                    Flow::Next
                }
                Instruction::Branch { opcode, target } => {
                    if branch_taken(*opcode, &mut frame)? {
                        Flow::Jump(target.index())
                    } else {
                        Flow::Next
                    }
                }
                Instruction::TableSwitch { default, low, high, targets } => {
                    let key = frame.pop_int()?;
                    let target = if key < *low || key > *high {
                        *default
                    } else {
                        targets[(key as i64 - *low as i64) as usize]
                    };
                    Flow::Jump(target.index())
                }
                Instruction::LookupSwitch { default, pairs } => {
                    let key = frame.pop_int()?;
                    let target = pairs.iter().find(|(k, _)| *k == key).map_or(*default, |(_, label)| *label);
                    Flow::Jump(target.index())
                }
                Instruction::Other { opcode, operands } => self.step(ty, &mut frame, *opcode, operands)?,
            };
            match flow {
                Flow::Next => pc += 1,
                Flow::Jump(target) => pc = target,
                Flow::Return(value) => return Ok(value),
            }
        }
    }

    fn read_field(&self, frame: &mut Frame, field: &FieldInsn) -> Result<Value> {
        let owner = self.runtime.require_type(&field.owner)?;
        if field.is_static {
            let (storage_owner, slot) = owner.static_field(&field.name).ok_or_else(|| no_such_field(field))?;
            let value = storage_owner.statics().read().get(slot.slot).cloned();
            value.ok_or_else(|| no_such_field(field))
        } else {
            let slot = owner.instance_field(&field.name).ok_or_else(|| no_such_field(field))?.slot;
            let receiver = frame.pop()?;
            receiver.as_object()?.load(slot)
        }
    }

    fn write_field(&self, frame: &mut Frame, field: &FieldInsn) -> Result<()> {
        let value = frame.pop()?;
        if !value.fits(&field.value_type) {
            return Err(Error::execution(format!("cannot store {:?} in {}.{}", value, field.owner, field.name)));
        }
        let value = value.narrow_to(&field.value_type);
        let owner = self.runtime.require_type(&field.owner)?;
        if field.is_static {
            let (storage_owner, slot) = owner.static_field(&field.name).ok_or_else(|| no_such_field(field))?;
            let mut statics = storage_owner.statics().write();
            let target = statics.get_mut(slot.slot).ok_or_else(|| no_such_field(field))?;
            *target = value;
            Ok(())
        } else {
            let slot = owner.instance_field(&field.name).ok_or_else(|| no_such_field(field))?.slot;
            let receiver = frame.pop()?;
            receiver.as_object()?.store(slot, value)
        }
    }

    fn call_site(&self, ty: &TypeHandle, site: SiteId, call: &IndirectCall, frame: &mut Frame) -> Result<()> {
        let binding = ty
            .call_sites()
            .bind_with(site, || {
                bootstrap::resolve(
                    self.runtime.directory(),
                    call.kind,
                    &call.signature,
                    &call.owner_type_name,
                    &call.field_name,
                )
            })
            .ok_or_else(|| Error::execution(format!("{} has no call site {:?}", ty.name(), site)))?;
        let accessor = binding.as_ref().map_err(|e| Error::Resolve(e.clone()))?;
        let args = frame.pop_args(call.signature.params.len())?;
        if let Some(value) = accessor.invoke(&args)? {
            frame.push(value);
        }
        Ok(())
    }

    fn invoke(&mut self, ty: &TypeHandle, frame: &mut Frame, opcode: u8, index: u16) -> Result<()> {
        let member = ty.class_file().constant_pool.method_ref(index)?;
        let descriptor = MethodDescriptor::parse(&member.descriptor)?;
        let mut args = frame.pop_args(descriptor.params.len())?;
        if opcode != INVOKESTATIC {
            let receiver = frame.pop()?;
            receiver.as_object()?;
            args.insert(0, receiver);
        }
        if member.owner == OBJECT_CLASS_NAME && member.name == CONSTRUCTOR_METHOD_NAME {
            return Ok(());
        }
        let start = match (opcode, args.first()) {
            (INVOKEVIRTUAL, Some(receiver)) => receiver.as_object()?.type_handle().clone(),
            _ => self.runtime.require_type(&member.owner)?,
        };
        let (target, method_index) = start.find_method(&member.name, &member.descriptor).ok_or_else(|| {
            Error::execution(format!(
                "java.lang.NoSuchMethodError: {}.{}{}",
                member.owner, member.name, member.descriptor
            ))
        })?;
        if target.method_at(method_index)?.is_static != (opcode == INVOKESTATIC) {
            return Err(Error::execution(format!(
                "java.lang.IncompatibleClassChangeError: {}.{}",
                member.owner, member.name
            )));
        }
        if let Some(value) = self.call(&target, method_index, args)? {
            frame.push(value);
        }
        Ok(())
    }

    fn step(&mut self, ty: &TypeHandle, frame: &mut Frame, opcode: u8, operands: &[u8]) -> Result<Flow> {
        match opcode {
            NOP => {}
            ACONST_NULL => frame.push(Value::NULL),
            ICONST_M1..=ICONST_5 => frame.push(Value::Int(opcode as i32 - ICONST_0 as i32)),
            LCONST_0 | LCONST_1 => frame.push(Value::Long((opcode - LCONST_0) as i64)),
            FCONST_0..=FCONST_2 => frame.push(Value::Float((opcode - FCONST_0) as f32)),
            DCONST_0 | DCONST_1 => frame.push(Value::Double((opcode - DCONST_0) as f64)),
            BIPUSH => frame.push(Value::Int(operand_u1(operands, 0)? as i8 as i32)),
            SIPUSH => frame.push(Value::Int(operand_u2(operands, 0)? as i16 as i32)),
            LDC => frame.push(self.constant(ty, operand_u1(operands, 0)? as u16)?),
            LDC_W | LDC2_W => frame.push(self.constant(ty, operand_u2(operands, 0)?)?),

            ILOAD..=ALOAD => frame.push(frame.load(operand_u1(operands, 0)? as usize)?),
            0x1a..=0x2d => frame.push(frame.load(((opcode - ILOAD_0) % 4) as usize)?),
            ISTORE..=ASTORE => {
                let value = frame.pop()?;
                frame.store(operand_u1(operands, 0)? as usize, value)?;
            }
            0x3b..=0x4e => {
                let value = frame.pop()?;
                frame.store(((opcode - ISTORE_0) % 4) as usize, value)?;
            }
            IINC => {
                let index = operand_u1(operands, 0)? as usize;
                let delta = operand_u1(operands, 1)? as i8 as i32;
                let value = frame.load(index)?.as_int()?;
                frame.store(index, Value::Int(value.wrapping_add(delta)))?;
            }
            WIDE => self.wide(frame, operands)?,

            POP => {
                frame.pop_slot()?;
            }
            POP2 => {
                frame.pop_slot()?;
                frame.pop_slot()?;
            }
            DUP..=DUP2_X2 => shuffle(frame, opcode)?,
            SWAP => {
                let top = frame.pop_slot()?;
                let below = frame.pop_slot()?;
                frame.stack.push(top);
                frame.stack.push(below);
            }

            IADD..=LXOR => arithmetic(frame, opcode)?,
            I2L..=I2S => convert(frame, opcode)?,
            LCMP => {
                let b = frame.pop_long()?;
                let a = frame.pop_long()?;
                frame.push(Value::Int(a.cmp(&b) as i32));
            }
            FCMPL | FCMPG => {
                let b = frame.pop_float()? as f64;
                let a = frame.pop_float()? as f64;
                frame.push(Value::Int(compare_floating(a, b, opcode == FCMPG)));
            }
            DCMPL | DCMPG => {
                let b = frame.pop_double()?;
                let a = frame.pop_double()?;
                frame.push(Value::Int(compare_floating(a, b, opcode == DCMPG)));
            }

            IRETURN..=ARETURN => return Ok(Flow::Return(Some(frame.pop()?))),
            RETURN => return Ok(Flow::Return(None)),

            INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC => {
                self.invoke(ty, frame, opcode, operand_u2(operands, 0)?)?;
            }
            NEW => {
                let name = ty.class_file().constant_pool.class_name(operand_u2(operands, 0)?)?;
                let handle = self.runtime.require_type(&name)?;
                frame.push(Value::from(Object::new(handle)));
            }
            ATHROW => {
                let thrown = frame.pop()?;
                let name = thrown.as_object()?.type_handle().name().to_string();
                return Err(Error::execution(format!("uncaught exception {}", name)));
            }
            _ => {
                return Err(Error::execution(format!(
                    "unsupported opcode {} in {}",
                    mnemonic(opcode).unwrap_or("???"),
                    ty.name()
                )))
            }
        }
        Ok(Flow::Next)
    }

    fn wide(&self, frame: &mut Frame, operands: &[u8]) -> Result<()> {
        let inner = operand_u1(operands, 0)?;
        let index = operand_u2(operands, 1)? as usize;
        match inner {
            ILOAD..=ALOAD => frame.push(frame.load(index)?),
            ISTORE..=ASTORE => {
                let value = frame.pop()?;
                frame.store(index, value)?;
            }
            IINC => {
                let delta = operand_u2(operands, 3)? as i16 as i32;
                let value = frame.load(index)?.as_int()?;
                frame.store(index, Value::Int(value.wrapping_add(delta)))?;
            }
            _ => return Err(Error::execution(format!("unsupported wide opcode 0x{:02x}", inner))),
        }
        Ok(())
    }

    fn constant(&self, ty: &TypeHandle, index: u16) -> Result<Value> {
        match ty.class_file().constant_pool.get(index)? {
            Constant::Integer(v) => Ok(Value::Int(*v)),
            Constant::Float(bits) => Ok(Value::Float(f32::from_bits(*bits))),
            Constant::Long(v) => Ok(Value::Long(*v)),
            Constant::Double(bits) => Ok(Value::Double(f64::from_bits(*bits))),
            other => Err(Error::execution(format!("unsupported ldc constant {:?}", other))),
        }
    }
}

fn operand_u1(operands: &[u8], at: usize) -> Result<u8> {
    operands.get(at).copied().ok_or_else(|| Error::execution("missing operand"))
}

fn operand_u2(operands: &[u8], at: usize) -> Result<u16> {
    Ok(u16::from_be_bytes([operand_u1(operands, at)?, operand_u1(operands, at + 1)?]))
}

fn no_such_field(field: &FieldInsn) -> Error {
    Error::execution(format!("java.lang.NoSuchFieldError: {}.{}", field.owner, field.name))
}

fn arithmetic_exception() -> Error {
    Error::execution("java.lang.ArithmeticException: / by zero")
}

fn compare_floating(a: f64, b: f64, nan_is_greater: bool) -> i32 {
    match a.partial_cmp(&b) {
        Some(ordering) => ordering as i32,
        None if nan_is_greater => 1,
        None => -1,
    }
}

fn branch_taken(opcode: u8, frame: &mut Frame) -> Result<bool> {
    Ok(match opcode {
        IFEQ..=IFLE => {
            let v = frame.pop_int()?;
            match opcode {
                IFEQ => v == 0,
                IFNE => v != 0,
                IFLT => v < 0,
                IFGE => v >= 0,
                IFGT => v > 0,
                _ => v <= 0,
            }
        }
        IF_ICMPEQ..=IF_ICMPLE => {
            let b = frame.pop_int()?;
            let a = frame.pop_int()?;
            match opcode {
                IF_ICMPEQ => a == b,
                IF_ICMPNE => a != b,
                IF_ICMPLT => a < b,
                IF_ICMPGE => a >= b,
                IF_ICMPGT => a > b,
                _ => a <= b,
            }
        }
        IF_ACMPEQ | IF_ACMPNE => {
            let b = frame.pop()?;
            let a = frame.pop()?;
            b.as_reference()?;
            a.as_reference()?;
            (a == b) == (opcode == IF_ACMPEQ)
        }
        IFNULL | IFNONNULL => {
            let is_null = frame.pop()?.as_reference()?.is_none();
            is_null == (opcode == IFNULL)
        }
        GOTO | GOTO_W => true,
        _ => {
            return Err(Error::execution(format!(
                "unsupported branch {}",
                mnemonic(opcode).unwrap_or("???")
            )))
        }
    })
}

/// `dup` family on raw slots
fn shuffle(frame: &mut Frame, opcode: u8) -> Result<()> {
    let take = match opcode {
        DUP => 1,
        DUP_X1 | DUP2 => 2,
        DUP_X2 | DUP2_X1 => 3,
        _ => 4,
    };
    let mut slots = (0..take).map(|_| frame.pop_slot()).collect::<Result<Vec<_>>>()?;
    slots.reverse();
    // slots are in stack order; the copied top goes beneath all of them
    let copied = if matches!(opcode, DUP | DUP_X1 | DUP_X2) { 1 } else { 2 };
    frame.stack.extend_from_slice(&slots[take - copied..]);
    frame.stack.extend(slots);
    Ok(())
}

fn arithmetic(frame: &mut Frame, opcode: u8) -> Result<()> {
    match opcode {
        INEG => {
            let v = frame.pop_int()?;
            frame.push(Value::Int(v.wrapping_neg()));
        }
        LNEG => {
            let v = frame.pop_long()?;
            frame.push(Value::Long(v.wrapping_neg()));
        }
        FNEG => {
            let v = frame.pop_float()?;
            frame.push(Value::Float(-v));
        }
        DNEG => {
            let v = frame.pop_double()?;
            frame.push(Value::Double(-v));
        }
        LSHL | LSHR | LUSHR => {
            let shift = (frame.pop_int()? & 0x3f) as u32;
            let v = frame.pop_long()?;
            frame.push(Value::Long(match opcode {
                LSHL => v.wrapping_shl(shift),
                LSHR => v.wrapping_shr(shift),
                _ => ((v as u64) >> shift) as i64,
            }));
        }
        IADD | ISUB | IMUL | IDIV | IREM | ISHL | ISHR | IUSHR | IAND | IOR | IXOR => {
            let b = frame.pop_int()?;
            let a = frame.pop_int()?;
            let shift = (b & 0x1f) as u32;
            frame.push(Value::Int(match opcode {
                IADD => a.wrapping_add(b),
                ISUB => a.wrapping_sub(b),
                IMUL => a.wrapping_mul(b),
                IDIV if b == 0 => return Err(arithmetic_exception()),
                IDIV => a.wrapping_div(b),
                IREM if b == 0 => return Err(arithmetic_exception()),
                IREM => a.wrapping_rem(b),
                ISHL => a.wrapping_shl(shift),
                ISHR => a.wrapping_shr(shift),
                IUSHR => ((a as u32) >> shift) as i32,
                IAND => a & b,
                IOR => a | b,
                _ => a ^ b,
            }));
        }
        LADD | LSUB | LMUL | LDIV | LREM | LAND | LOR | LXOR => {
            let b = frame.pop_long()?;
            let a = frame.pop_long()?;
            frame.push(Value::Long(match opcode {
                LADD => a.wrapping_add(b),
                LSUB => a.wrapping_sub(b),
                LMUL => a.wrapping_mul(b),
                LDIV if b == 0 => return Err(arithmetic_exception()),
                LDIV => a.wrapping_div(b),
                LREM if b == 0 => return Err(arithmetic_exception()),
                LREM => a.wrapping_rem(b),
                LAND => a & b,
                LOR => a | b,
                _ => a ^ b,
            }));
        }
        FADD | FSUB | FMUL | FDIV | FREM => {
            let b = frame.pop_float()?;
            let a = frame.pop_float()?;
            frame.push(Value::Float(match opcode {
                FADD => a + b,
                FSUB => a - b,
                FMUL => a * b,
                FDIV => a / b,
                _ => a % b,
            }));
        }
        _ => {
            let b = frame.pop_double()?;
            let a = frame.pop_double()?;
            frame.push(Value::Double(match opcode {
                DADD => a + b,
                DSUB => a - b,
                DMUL => a * b,
                DDIV => a / b,
                _ => a % b,
            }));
        }
    }
    Ok(())
}

fn convert(frame: &mut Frame, opcode: u8) -> Result<()> {
    let converted = match opcode {
        I2L => Value::Long(frame.pop_int()? as i64),
        I2F => Value::Float(frame.pop_int()? as f32),
        I2D => Value::Double(frame.pop_int()? as f64),
        L2I => Value::Int(frame.pop_long()? as i32),
        L2F => Value::Float(frame.pop_long()? as f32),
        L2D => Value::Double(frame.pop_long()? as f64),
        F2I => Value::Int(frame.pop_float()? as i32),
        F2L => Value::Long(frame.pop_float()? as i64),
        F2D => Value::Double(frame.pop_float()? as f64),
        D2I => Value::Int(frame.pop_double()? as i32),
        D2L => Value::Long(frame.pop_double()? as i64),
        D2F => Value::Float(frame.pop_double()? as f32),
        I2B => Value::Int(frame.pop_int()? as i8 as i32),
        I2C => Value::Int(frame.pop_int()? as u16 as i32),
        _ => Value::Int(frame.pop_int()? as i16 as i32),
    };
    frame.push(converted);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(values: &[Value]) -> Frame {
        let mut frame = Frame::new(4, vec![]).unwrap();
        for value in values {
            frame.push(value.clone());
        }
        frame
    }

    #[test]
    fn test_wide_values_take_two_slots() {
        let mut frame = frame_with(&[Value::Int(1), Value::Long(7)]);
        assert_eq!(frame.stack.len(), 3);
        assert_eq!(frame.pop().unwrap(), Value::Long(7));
        assert_eq!(frame.pop().unwrap(), Value::Int(1));

        frame.store(2, Value::Double(1.5)).unwrap();
        assert_eq!(frame.load(3).unwrap(), Value::Top);
        assert!(frame.store(3, Value::Long(1)).is_err());
    }

    #[test]
    fn test_dup_family() {
        let ints = |values: &[i32]| values.iter().map(|v| Value::Int(*v)).collect::<Vec<_>>();

        let mut frame = frame_with(&ints(&[1, 2]));
        shuffle(&mut frame, DUP_X1).unwrap();
        assert_eq!(frame.stack, ints(&[2, 1, 2]));

        let mut frame = frame_with(&ints(&[1, 2, 3]));
        shuffle(&mut frame, DUP_X2).unwrap();
        assert_eq!(frame.stack, ints(&[3, 1, 2, 3]));

        let mut frame = frame_with(&ints(&[1, 2]));
        shuffle(&mut frame, DUP2).unwrap();
        assert_eq!(frame.stack, ints(&[1, 2, 1, 2]));

        let mut frame = frame_with(&ints(&[1, 2, 3]));
        shuffle(&mut frame, DUP2_X1).unwrap();
        assert_eq!(frame.stack, ints(&[2, 3, 1, 2, 3]));

        let mut frame = frame_with(&ints(&[1, 2, 3, 4]));
        shuffle(&mut frame, DUP2_X2).unwrap();
        assert_eq!(frame.stack, ints(&[3, 4, 1, 2, 3, 4]));

        let mut frame = frame_with(&[Value::Long(5)]);
        shuffle(&mut frame, DUP2).unwrap();
        assert_eq!(frame.pop().unwrap(), Value::Long(5));
        assert_eq!(frame.pop().unwrap(), Value::Long(5));
    }

    #[test]
    fn test_integer_arithmetic_wraps() {
        let mut frame = frame_with(&[Value::Int(i32::MAX), Value::Int(1)]);
        arithmetic(&mut frame, IADD).unwrap();
        assert_eq!(frame.pop().unwrap(), Value::Int(i32::MIN));

        let mut frame = frame_with(&[Value::Int(1), Value::Int(0)]);
        assert!(arithmetic(&mut frame, IDIV).is_err());

        let mut frame = frame_with(&[Value::Long(-8), Value::Int(1)]);
        arithmetic(&mut frame, LUSHR).unwrap();
        assert_eq!(frame.pop().unwrap(), Value::Long(((-8i64 as u64) >> 1) as i64));
    }

    #[test]
    fn test_floating_compare() {
        assert_eq!(compare_floating(1.0, 2.0, false), -1);
        assert_eq!(compare_floating(f64::NAN, 2.0, true), 1);
        assert_eq!(compare_floating(f64::NAN, 2.0, false), -1);
        assert_eq!(compare_floating(2.0, 2.0, false), 0);
    }
}
