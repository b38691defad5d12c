// Common test utilities: assemble small class files with the crate's own builder
#![allow(dead_code)]

use fieldlink::classfile::defs::access_flags::{ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC, ACC_SUPER};
use fieldlink::classfile::defs::{attribute_names, major_versions, OBJECT_CLASS_NAME};
use fieldlink::classfile::opcodes::*;
use fieldlink::classfile::{AttributeInfo, ClassFile, ConstantPool, FieldInfo, FieldType, MethodInfo, NamedAttribute};
use fieldlink::code::{CodeAttribute, FieldInsn, Instruction, Label};

pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

pub struct ClassBuilder {
    class: ClassFile,
}

impl ClassBuilder {
    /// A public class extending `java/lang/Object`
    pub fn new(name: &str) -> Self {
        Self::with_super(name, OBJECT_CLASS_NAME)
    }

    pub fn with_super(name: &str, super_name: &str) -> Self {
        let mut class = ClassFile::new();
        class.access_flags = ACC_PUBLIC | ACC_SUPER;
        class.this_class = class.constant_pool.add_class(name).unwrap();
        class.super_class = class.constant_pool.add_class(super_name).unwrap();
        Self { class }
    }

    pub fn version(mut self, major: u16) -> Self {
        self.class.major_version = major;
        self
    }

    pub fn field(mut self, access_flags: u16, name: &str, descriptor: &str) -> Self {
        let pool = &mut self.class.constant_pool;
        let field = FieldInfo::new(access_flags, pool.add_utf8(name).unwrap(), pool.add_utf8(descriptor).unwrap());
        self.class.fields.push(field);
        self
    }

    pub fn method(
        self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        max_stack: u16,
        max_locals: u16,
        body: impl FnOnce(&mut ConstantPool) -> Vec<Instruction>,
    ) -> Self {
        self.method_with_code(access_flags, name, descriptor, |pool| {
            CodeAttribute::new(max_stack, max_locals, body(pool))
        })
    }

    /// A method whose `Code` attribute, handlers and nested attributes are all supplied by `body`
    pub fn method_with_code(
        mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        body: impl FnOnce(&mut ConstantPool) -> CodeAttribute,
    ) -> Self {
        let pool = &mut self.class.constant_pool;
        let mut method = MethodInfo::new(access_flags, pool.add_utf8(name).unwrap(), pool.add_utf8(descriptor).unwrap());
        let code_name = pool.add_utf8(attribute_names::CODE).unwrap();
        let code = body(pool);
        method.attributes.push(NamedAttribute::new(code_name, AttributeInfo::Code(code)));
        self.class.methods.push(method);
        self
    }

    /// `<init>()V` calling `super()`
    pub fn default_constructor(self) -> Self {
        let super_name = self.class.super_name().unwrap().unwrap();
        self.method(ACC_PUBLIC, "<init>", "()V", 1, 1, |pool| {
            vec![
                op(ALOAD_0),
                invoke(pool, INVOKESPECIAL, &super_name, "<init>", "()V"),
                op(RETURN),
            ]
        })
    }

    pub fn build(self) -> ClassFile {
        self.class
    }

    pub fn bytes(self) -> Vec<u8> {
        self.class.encode().unwrap()
    }
}

pub fn op(opcode: u8) -> Instruction {
    Instruction::Other { opcode, operands: vec![] }
}

pub fn op1(opcode: u8, operand: u8) -> Instruction {
    Instruction::Other { opcode, operands: vec![operand] }
}

pub fn branch(opcode: u8, target: u32) -> Instruction {
    Instruction::Branch { opcode, target: Label(target) }
}

pub fn invoke(pool: &mut ConstantPool, opcode: u8, owner: &str, name: &str, descriptor: &str) -> Instruction {
    let index = pool.add_method_ref(owner, name, descriptor).unwrap();
    Instruction::Other { opcode, operands: index.to_be_bytes().to_vec() }
}

pub fn new_object(pool: &mut ConstantPool, class: &str) -> Instruction {
    let index = pool.add_class(class).unwrap();
    Instruction::Other { opcode: NEW, operands: index.to_be_bytes().to_vec() }
}

fn field_insn(pool: &mut ConstantPool, owner: &str, name: &str, descriptor: &str, is_static: bool) -> FieldInsn {
    FieldInsn {
        index: pool.add_field_ref(owner, name, descriptor).unwrap(),
        owner: owner.to_string(),
        name: name.to_string(),
        value_type: FieldType::parse(descriptor).unwrap(),
        is_static,
    }
}

pub fn getfield(pool: &mut ConstantPool, owner: &str, name: &str, descriptor: &str) -> Instruction {
    Instruction::FieldRead(field_insn(pool, owner, name, descriptor, false))
}

pub fn putfield(pool: &mut ConstantPool, owner: &str, name: &str, descriptor: &str) -> Instruction {
    Instruction::FieldWrite(field_insn(pool, owner, name, descriptor, false))
}

pub fn getstatic(pool: &mut ConstantPool, owner: &str, name: &str, descriptor: &str) -> Instruction {
    Instruction::FieldRead(field_insn(pool, owner, name, descriptor, true))
}

pub fn putstatic(pool: &mut ConstantPool, owner: &str, name: &str, descriptor: &str) -> Instruction {
    Instruction::FieldWrite(field_insn(pool, owner, name, descriptor, true))
}

/// `p/Counter`: an int instance field `count` and a long static `total`
///
/// ```text
/// static { total = 1L; }
/// void increment() { count = count + 1; }
/// int get() { return count; }
/// static void bump(long n) { total = total + n; }
/// ```
pub fn counter_class() -> ClassBuilder {
    ClassBuilder::new("p/Counter")
        .field(ACC_PRIVATE, "count", "I")
        .field(ACC_PRIVATE | ACC_STATIC, "total", "J")
        .default_constructor()
        .method(ACC_STATIC, "<clinit>", "()V", 2, 0, |pool| {
            vec![op(LCONST_1), putstatic(pool, "p/Counter", "total", "J"), op(RETURN)]
        })
        .method(ACC_PUBLIC, "increment", "()V", 3, 1, |pool| {
            vec![
                op(ALOAD_0),
                op(DUP),
                getfield(pool, "p/Counter", "count", "I"),
                op(ICONST_1),
                op(IADD),
                putfield(pool, "p/Counter", "count", "I"),
                op(RETURN),
            ]
        })
        .method(ACC_PUBLIC, "get", "()I", 1, 1, |pool| {
            vec![op(ALOAD_0), getfield(pool, "p/Counter", "count", "I"), op(IRETURN)]
        })
        .method(ACC_PUBLIC | ACC_STATIC, "bump", "(J)V", 4, 2, |pool| {
            vec![
                getstatic(pool, "p/Counter", "total", "J"),
                op(LLOAD_0),
                op(LADD),
                putstatic(pool, "p/Counter", "total", "J"),
                op(RETURN),
            ]
        })
}

/// A class with methods but no field instructions
pub fn plain_class() -> ClassBuilder {
    ClassBuilder::new("p/Plain").version(major_versions::JAVA_5_0).default_constructor().method(
        ACC_PUBLIC | ACC_STATIC,
        "twice",
        "(I)I",
        2,
        1,
        |_| vec![op(ILOAD_0), op(ICONST_2), op(IMUL), op(IRETURN)],
    )
}
