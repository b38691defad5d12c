//! Runtime values and heap objects

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::types::TypeHandle;
use crate::classfile::descriptor::FieldType;
use crate::error::{Error, Result};

/// A JVM value. `Top` fills the second local slot of a long or double.
#[derive(Clone)]
pub enum Value {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Ref(Option<ObjectRef>),
    Top,
}

pub type ObjectRef = Arc<Object>;

impl Value {
    pub const NULL: Value = Value::Ref(None);

    /// Zero value for a field of type `ty`
    pub fn default_for(ty: &FieldType) -> Self {
        match ty {
            FieldType::Long => Value::Long(0),
            FieldType::Float => Value::Float(0.0),
            FieldType::Double => Value::Double(0.0),
            FieldType::Object(_) | FieldType::Array(_) => Value::NULL,
            _ => Value::Int(0),
        }
    }

    /// True when the value may be stored in a field of type `ty`
    pub fn fits(&self, ty: &FieldType) -> bool {
        match (self, ty) {
            (Value::Int(_), FieldType::Int | FieldType::Byte | FieldType::Char | FieldType::Short | FieldType::Boolean) => {
                true
            }
            (Value::Long(_), FieldType::Long) => true,
            (Value::Float(_), FieldType::Float) => true,
            (Value::Double(_), FieldType::Double) => true,
            (Value::Ref(_), FieldType::Object(_) | FieldType::Array(_)) => true,
            _ => false,
        }
    }

    /// Narrow an int to the width of a sub-int field, as the JVM does on store
    pub fn narrow_to(self, ty: &FieldType) -> Self {
        match (self, ty) {
            (Value::Int(v), FieldType::Byte) => Value::Int(v as i8 as i32),
            (Value::Int(v), FieldType::Char) => Value::Int(v as u16 as i32),
            (Value::Int(v), FieldType::Short) => Value::Int(v as i16 as i32),
            (Value::Int(v), FieldType::Boolean) => Value::Int(v & 1),
            (value, _) => value,
        }
    }

    pub fn is_wide(&self) -> bool {
        matches!(self, Value::Long(_) | Value::Double(_))
    }

    pub fn as_int(&self) -> Result<i32> {
        match self {
            Value::Int(v) => Ok(*v),
            other => Err(type_error("int", other)),
        }
    }

    pub fn as_long(&self) -> Result<i64> {
        match self {
            Value::Long(v) => Ok(*v),
            other => Err(type_error("long", other)),
        }
    }

    pub fn as_float(&self) -> Result<f32> {
        match self {
            Value::Float(v) => Ok(*v),
            other => Err(type_error("float", other)),
        }
    }

    pub fn as_double(&self) -> Result<f64> {
        match self {
            Value::Double(v) => Ok(*v),
            other => Err(type_error("double", other)),
        }
    }

    pub fn as_reference(&self) -> Result<Option<&ObjectRef>> {
        match self {
            Value::Ref(r) => Ok(r.as_ref()),
            other => Err(type_error("reference", other)),
        }
    }

    /// Non-null object or a `NullPointerException`
    pub fn as_object(&self) -> Result<&ObjectRef> {
        self.as_reference()?
            .ok_or_else(|| Error::execution("java.lang.NullPointerException"))
    }
}

fn type_error(expected: &str, found: &Value) -> Error {
    Error::execution(format!("expected {} on the stack, found {:?}", expected, found))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Ref(None), Value::Ref(None)) => true,
            (Value::Ref(Some(a)), Value::Ref(Some(b))) => Arc::ptr_eq(a, b),
            (Value::Top, Value::Top) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "Int({})", v),
            Value::Long(v) => write!(f, "Long({})", v),
            Value::Float(v) => write!(f, "Float({})", v),
            Value::Double(v) => write!(f, "Double({})", v),
            Value::Ref(None) => f.write_str("null"),
            Value::Ref(Some(object)) => write!(f, "Ref({}@{:p})", object.type_handle().name(), Arc::as_ptr(object)),
            Value::Top => f.write_str("Top"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<ObjectRef> for Value {
    fn from(object: ObjectRef) -> Self {
        Value::Ref(Some(object))
    }
}

/// An instance of a defined type. Field slots follow the type's instance layout.
pub struct Object {
    type_handle: TypeHandle,
    fields: RwLock<Vec<Value>>,
}

impl Object {
    pub(crate) fn new(type_handle: TypeHandle) -> ObjectRef {
        let fields = type_handle
            .instance_fields()
            .iter()
            .map(|field| Value::default_for(&field.field_type))
            .collect();
        Arc::new(Self { type_handle, fields: RwLock::new(fields) })
    }

    pub fn type_handle(&self) -> &TypeHandle {
        &self.type_handle
    }

    pub(crate) fn load(&self, slot: usize) -> Result<Value> {
        self.fields
            .read()
            .get(slot)
            .cloned()
            .ok_or_else(|| Error::execution(format!("{} has no field slot {}", self.type_handle.name(), slot)))
    }

    pub(crate) fn store(&self, slot: usize, value: Value) -> Result<()> {
        let mut fields = self.fields.write();
        let target = fields
            .get_mut(slot)
            .ok_or_else(|| Error::execution(format!("{} has no field slot {}", self.type_handle.name(), slot)))?;
        *target = value;
        Ok(())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("type", &self.type_handle.name())
            .field("fields", &*self.fields.read())
            .finish()
    }
}

/// Static field storage of one type, shared with the accessors bound to it
pub type StaticStorage = Arc<RwLock<Vec<Value>>>;
