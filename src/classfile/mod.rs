//! Class file model: decoding, constant pool building and encoding

pub mod attribute;
pub mod class;
pub mod constpool;
pub mod defs;
pub mod descriptor;
pub mod field;
pub mod method;
pub mod opcodes;
pub mod reader;
pub mod writer;

pub use attribute::{AttributeInfo, BootstrapMethod, NamedAttribute};
pub use class::ClassFile;
pub use constpool::{Constant, ConstantPool, InvokeDynamicRef, MemberRef};
pub use descriptor::{FieldType, MethodDescriptor};
pub use field::FieldInfo;
pub use method::MethodInfo;
pub use writer::ClassfileWritable;
