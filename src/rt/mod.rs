//! Runtime support for rewritten classes.
//!
//! A [`Runtime`] owns a [`ClassRegistry`] of defined types and executes their
//! methods. Each `invokedynamic` accessor site is linked on its first execution
//! through [`bootstrap::resolve`] and the binding is cached in the defining
//! type's [`CallSiteTable`] for the lifetime of the runtime.

pub mod accessor;
pub mod bootstrap;
pub mod callsite;
pub mod directory;
mod interp;
pub mod types;
pub mod value;

use std::sync::Arc;

use log::{debug, info};

pub use accessor::Accessor;
pub use callsite::{CallSiteTable, SiteId};
pub use directory::{ClassRegistry, TypeDirectory};
pub use types::{FieldSlot, RuntimeMethod, RuntimeType, TypeHandle};
pub use value::{Object, ObjectRef, Value};

use crate::classfile::defs::{OBJECT_CLASS_NAME, STATIC_INITIALIZER_METHOD_NAME};
use crate::classfile::ClassFile;
use crate::config::Config;
use crate::error::{Error, Result};
use interp::Interpreter;

pub struct Runtime {
    config: Config,
    registry: Arc<ClassRegistry>,
    directory: Arc<dyn TypeDirectory>,
}

impl Runtime {
    /// A runtime whose call sites resolve against its own registry
    pub fn new(config: Config) -> Self {
        let registry = Arc::new(ClassRegistry::new());
        let directory: Arc<dyn TypeDirectory> = registry.clone();
        Self { config, registry, directory }
    }

    /// A runtime whose call sites resolve through `directory`, which should
    /// see the types defined in `registry`
    pub fn with_directory(config: Config, registry: Arc<ClassRegistry>, directory: Arc<dyn TypeDirectory>) -> Self {
        Self { config, registry, directory }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ClassRegistry> {
        &self.registry
    }

    pub fn directory(&self) -> &dyn TypeDirectory {
        self.directory.as_ref()
    }

    /// A defined type by internal or dotted name
    pub fn find_type(&self, name: &str) -> Option<TypeHandle> {
        self.registry.find_type(&name.replace('.', "/"))
    }

    pub(crate) fn require_type(&self, name: &str) -> Result<TypeHandle> {
        self.find_type(name)
            .ok_or_else(|| Error::execution(format!("java.lang.NoClassDefFoundError: {}", name)))
    }

    /// Define a type from class file bytes and run its static initializer.
    ///
    /// The superclass must be defined first unless it lies outside the runtime,
    /// in which case the type has no inherited layout.
    pub fn define_type(&self, name: &str, bytes: &[u8]) -> Result<TypeHandle> {
        let name = name.replace('.', "/");
        let class = ClassFile::decode(bytes)?;
        let declared = class.name()?;
        if declared != name {
            return Err(Error::malformed(format!("class file defines {}, expected {}", declared, name)));
        }
        if self.registry.contains(&name) {
            return Err(Error::DuplicateType { name });
        }

        let super_type = match class.super_name()? {
            Some(super_name) if super_name != OBJECT_CLASS_NAME => {
                let found = self.find_type(&super_name);
                if found.is_none() {
                    debug!("{}: superclass {} is not defined here", name, super_name);
                }
                found
            }
            _ => None,
        };

        let handle: TypeHandle = Arc::new(RuntimeType::new(class, super_type)?);
        self.registry.insert(handle.clone())?;
        info!("defined {} with {} call sites", name, handle.call_sites().len());

        if let Some((owner, index)) = handle.find_method(STATIC_INITIALIZER_METHOD_NAME, "()V") {
            if Arc::ptr_eq(&owner, &handle) {
                Interpreter::new(self).call(&handle, index, Vec::new())?;
            }
        }
        Ok(handle)
    }

    /// Allocate an instance with default field values, without running a constructor
    pub fn new_instance(&self, ty: &TypeHandle) -> ObjectRef {
        Object::new(ty.clone())
    }

    /// Invoke a method found on `ty` or its supertypes. Instance methods take
    /// the receiver as the first argument.
    pub fn invoke(&self, ty: &TypeHandle, name: &str, descriptor: &str, args: Vec<Value>) -> Result<Option<Value>> {
        let (owner, index) = ty.find_method(name, descriptor).ok_or_else(|| {
            Error::execution(format!("java.lang.NoSuchMethodError: {}.{}{}", ty.name(), name, descriptor))
        })?;
        let method = owner.method_at(index)?;
        let expected = method.descriptor.params.len() + usize::from(!method.is_static);
        if args.len() != expected {
            return Err(Error::execution(format!(
                "{}.{} takes {} arguments, got {}",
                owner.name(),
                method.signature(),
                expected,
                args.len()
            )));
        }
        Interpreter::new(self).call(&owner, index, args)
    }

    /// Read an instance field directly, bypassing call sites
    pub fn get_field(&self, object: &ObjectRef, name: &str) -> Result<Value> {
        let field = object
            .type_handle()
            .instance_field(name)
            .ok_or_else(|| no_such_field(object.type_handle().name(), name))?;
        object.load(field.slot)
    }

    /// Write an instance field directly, bypassing call sites
    pub fn set_field(&self, object: &ObjectRef, name: &str, value: Value) -> Result<()> {
        let field = object
            .type_handle()
            .instance_field(name)
            .ok_or_else(|| no_such_field(object.type_handle().name(), name))?;
        if !value.fits(&field.field_type) {
            return Err(Error::execution(format!("cannot store {:?} in {}:{}", value, name, field.field_type)));
        }
        object.store(field.slot, value.narrow_to(&field.field_type))
    }

    /// Read a static field declared on `ty` or a supertype
    pub fn get_static(&self, ty: &TypeHandle, name: &str) -> Result<Value> {
        let (owner, field) = ty.static_field(name).ok_or_else(|| no_such_field(ty.name(), name))?;
        owner.get_static(&field.name).ok_or_else(|| no_such_field(ty.name(), name))
    }
}

fn no_such_field(owner: &str, name: &str) -> Error {
    Error::execution(format!("java.lang.NoSuchFieldError: {}.{}", owner, name))
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("types", &self.registry.names())
            .finish()
    }
}
