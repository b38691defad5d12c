//! Bound field accessors

use std::fmt;

use super::types::FieldSlot;
use super::value::{StaticStorage, Value};
use crate::classfile::descriptor::{FieldType, MethodDescriptor};
use crate::error::{Error, Result};

/// A function value that reads or writes one specific field
#[derive(Clone)]
pub enum Accessor {
    InstanceGetter { owner: String, field: FieldSlot },
    InstanceSetter { owner: String, field: FieldSlot },
    StaticGetter { owner: String, field: FieldSlot, storage: StaticStorage },
    StaticSetter { owner: String, field: FieldSlot, storage: StaticStorage },
}

impl Accessor {
    pub fn owner(&self) -> &str {
        match self {
            Accessor::InstanceGetter { owner, .. }
            | Accessor::InstanceSetter { owner, .. }
            | Accessor::StaticGetter { owner, .. }
            | Accessor::StaticSetter { owner, .. } => owner,
        }
    }

    pub fn field(&self) -> &FieldSlot {
        match self {
            Accessor::InstanceGetter { field, .. }
            | Accessor::InstanceSetter { field, .. }
            | Accessor::StaticGetter { field, .. }
            | Accessor::StaticSetter { field, .. } => field,
        }
    }

    /// Call signature: `(Owner)T`, `(Owner, T)V`, `()T` or `(T)V`
    pub fn signature(&self) -> MethodDescriptor {
        let receiver = || FieldType::object(self.owner());
        let value = self.field().field_type.clone();
        match self {
            Accessor::InstanceGetter { .. } => MethodDescriptor::new(vec![receiver()], Some(value)),
            Accessor::InstanceSetter { .. } => MethodDescriptor::new(vec![receiver(), value], None),
            Accessor::StaticGetter { .. } => MethodDescriptor::new(vec![], Some(value)),
            Accessor::StaticSetter { .. } => MethodDescriptor::new(vec![value], None),
        }
    }

    /// Invoke with arguments in signature order. Getters return the field value.
    pub fn invoke(&self, args: &[Value]) -> Result<Option<Value>> {
        match (self, args) {
            (Accessor::InstanceGetter { owner, field }, [receiver]) => {
                let object = receiver.as_object()?;
                check_receiver(owner, object.type_handle().is_subtype_of(owner), object.type_handle().name())?;
                object.load(field.slot).map(Some)
            }
            (Accessor::InstanceSetter { owner, field }, [receiver, value]) => {
                let object = receiver.as_object()?;
                check_receiver(owner, object.type_handle().is_subtype_of(owner), object.type_handle().name())?;
                object.store(field.slot, checked_value(field, value)?)?;
                Ok(None)
            }
            (Accessor::StaticGetter { field, storage, .. }, []) => storage
                .read()
                .get(field.slot)
                .cloned()
                .map(Some)
                .ok_or_else(|| missing_slot(field)),
            (Accessor::StaticSetter { field, storage, .. }, [value]) => {
                let value = checked_value(field, value)?;
                let mut statics = storage.write();
                let target = statics.get_mut(field.slot).ok_or_else(|| missing_slot(field))?;
                *target = value;
                Ok(None)
            }
            _ => Err(Error::execution(format!(
                "{:?} invoked with {} arguments, signature is {}",
                self,
                args.len(),
                self.signature()
            ))),
        }
    }
}

fn check_receiver(owner: &str, ok: bool, actual: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::execution(format!(
            "java.lang.ClassCastException: {} cannot be cast to {}",
            actual, owner
        )))
    }
}

fn checked_value(field: &FieldSlot, value: &Value) -> Result<Value> {
    if value.fits(&field.field_type) {
        Ok(value.clone().narrow_to(&field.field_type))
    } else {
        Err(Error::execution(format!(
            "cannot store {:?} in field {} of type {}",
            value, field.name, field.field_type
        )))
    }
}

fn missing_slot(field: &FieldSlot) -> Error {
    Error::execution(format!("static slot {} for {} does not exist", field.slot, field.name))
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Accessor::InstanceGetter { .. } => "InstanceGetter",
            Accessor::InstanceSetter { .. } => "InstanceSetter",
            Accessor::StaticGetter { .. } => "StaticGetter",
            Accessor::StaticSetter { .. } => "StaticSetter",
        };
        let field = self.field();
        write!(f, "{}({}.{}:{})", kind, self.owner(), field.name, field.field_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;
    use std::sync::Arc;

    fn slot(field_type: FieldType) -> FieldSlot {
        FieldSlot { name: "f".into(), field_type, slot: 1 }
    }

    #[test]
    fn test_signatures() {
        let storage: StaticStorage = Arc::new(RwLock::new(vec![]));
        let owner = "p/X".to_string();
        let cases = [
            (Accessor::InstanceGetter { owner: owner.clone(), field: slot(FieldType::Int) }, "(Lp/X;)I"),
            (Accessor::InstanceSetter { owner: owner.clone(), field: slot(FieldType::Int) }, "(Lp/X;I)V"),
            (
                Accessor::StaticGetter { owner: owner.clone(), field: slot(FieldType::Long), storage: storage.clone() },
                "()J",
            ),
            (Accessor::StaticSetter { owner, field: slot(FieldType::Long), storage }, "(J)V"),
        ];
        for (accessor, expected) in cases {
            assert_eq!(accessor.signature().descriptor(), expected);
        }
    }

    #[test]
    fn test_static_accessors_share_storage() {
        let storage: StaticStorage = Arc::new(RwLock::new(vec![Value::Int(0), Value::Int(0)]));
        let getter =
            Accessor::StaticGetter { owner: "p/X".into(), field: slot(FieldType::Short), storage: storage.clone() };
        let setter = Accessor::StaticSetter { owner: "p/X".into(), field: slot(FieldType::Short), storage };
        setter.invoke(&[Value::Int(70_000)]).unwrap();
        assert_eq!(getter.invoke(&[]).unwrap(), Some(Value::Int(70_000i32 as i16 as i32)));
        assert!(setter.invoke(&[Value::Long(1)]).is_err());
        assert!(getter.invoke(&[Value::Int(1)]).is_err());
    }

    #[test]
    fn test_null_receiver() {
        let getter = Accessor::InstanceGetter { owner: "p/X".into(), field: slot(FieldType::Int) };
        let err = getter.invoke(&[Value::NULL]).unwrap_err();
        assert!(err.to_string().contains("NullPointerException"));
    }
}
